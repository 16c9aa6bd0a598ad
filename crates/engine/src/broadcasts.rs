//! Fixed daily announcements driven by `aula-cron`.

use std::sync::Arc;

use {
    aula_channels::Embed,
    aula_config::{AulaConfig, parse_clock_time},
    aula_cron::{CronJobCreate, CronService, JobFn, daily_at},
    chrono::{Duration, NaiveTime},
    tracing::{debug, info, warn},
};

use crate::{context::CommandContext, error::Result};

pub const COLOR_INFO: u32 = 0x3498db;
pub const COLOR_SUCCESS: u32 = 0x2ecc71;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Broadcast {
    /// Class announcement plus the teacher's attendance code.
    ClassStart,
    AttendanceWarning { minutes: u32 },
    AttendanceEnd,
    ClassEnd,
    /// Today's activity, if one is due.
    ActivityOfTheDay,
}

impl Broadcast {
    fn name(self) -> String {
        match self {
            Self::ClassStart => "class-start".into(),
            Self::AttendanceWarning { minutes } => format!("attendance-warning-{minutes}m"),
            Self::AttendanceEnd => "attendance-end".into(),
            Self::ClassEnd => "class-end".into(),
            Self::ActivityOfTheDay => "activity-of-the-day".into(),
        }
    }
}

/// The daily job table derived from the class timetable. Entries whose
/// time does not parse are skipped.
pub fn schedule_jobs(config: &AulaConfig) -> Vec<CronJobCreate<Broadcast>> {
    let class = &config.class;
    let mut planned: Vec<(Broadcast, Option<NaiveTime>)> =
        vec![(Broadcast::ClassStart, parse_clock_time(&class.start_time))];
    let attendance_end = parse_clock_time(&class.attendance_end_time);
    for &minutes in &config.schedule.attendance_warning_minutes {
        let at = attendance_end.map(|t| t - Duration::minutes(i64::from(minutes)));
        planned.push((Broadcast::AttendanceWarning { minutes }, at));
    }
    planned.push((Broadcast::AttendanceEnd, attendance_end));
    let end = parse_clock_time(&class.end_time);
    planned.push((Broadcast::ClassEnd, end));
    planned.push((Broadcast::ActivityOfTheDay, end));

    planned
        .into_iter()
        .filter_map(|(broadcast, at)| match at {
            Some(at) => Some(CronJobCreate {
                id: Some(broadcast.name()),
                name: broadcast.name(),
                expr: daily_at(at),
                payload: broadcast,
            }),
            None => {
                warn!(job = %broadcast.name(), "skipping broadcast with invalid time");
                None
            },
        })
        .collect()
}

/// Post one broadcast.
pub async fn send_broadcast(ctx: &CommandContext, broadcast: Broadcast) -> Result<()> {
    let announcements = &ctx.config.channels.announcements;
    match broadcast {
        Broadcast::ClassStart => {
            let Some(session) = ctx.store.get_session(ctx.today()).await? else {
                debug!("no session today, skipping class start");
                return Ok(());
            };
            let mut embed = Embed::new("La clase esta por comenzar").color(COLOR_INFO);
            for r in &session.resources {
                embed = embed.field(&r.name, &r.value, false);
            }
            embed = embed
                .field(
                    "Unirse al canal:",
                    format!("<#{}>", ctx.config.channels.main_voice),
                    false,
                )
                .field(
                    "Mandar el attendance a:",
                    format!("<#{}>", ctx.config.channels.attendance),
                    false,
                );
            ctx.transport.send_embed(announcements, &embed).await?;

            let mut teacher_embed = Embed::new(&session.name).color(COLOR_INFO);
            for r in &session.resources {
                teacher_embed = teacher_embed.field(&r.name, &r.value, false);
            }
            teacher_embed = teacher_embed.field("Codigo:", &session.attendance_code, false);
            let dm = ctx.transport.dm_channel(ctx.teacher()).await?;
            ctx.transport.send_embed(&dm, &teacher_embed).await?;
        },
        Broadcast::AttendanceWarning { minutes } => {
            let embed = Embed::new(format!(
                "El registro de attendance esta por terminar ({minutes} minutos)."
            ))
            .color(COLOR_SUCCESS);
            ctx.transport.send_embed(announcements, &embed).await?;
        },
        Broadcast::AttendanceEnd => {
            let embed = Embed::new("El registro de attendance terminó.").color(COLOR_SUCCESS);
            ctx.transport.send_embed(announcements, &embed).await?;
        },
        Broadcast::ClassEnd => {
            let embed = Embed::new("La clase termino").color(COLOR_INFO);
            ctx.transport.send_embed(announcements, &embed).await?;
        },
        Broadcast::ActivityOfTheDay => {
            let Some(activity) = ctx.store.get_activity(ctx.today()).await? else {
                debug!("no activity due today");
                return Ok(());
            };
            let mut embed = Embed::new(format!(
                "Nueva actividad para hoy!\n{}\nFecha y hora limite: {} {}",
                activity.name, activity.date, ctx.config.class.activity_deadline
            ))
            .color(COLOR_SUCCESS);
            for r in &activity.resources {
                embed = embed.field(&r.name, &r.value, false);
            }
            ctx.transport.send_embed(announcements, &embed).await?;
        },
    }
    info!(broadcast = %broadcast.name(), "broadcast sent");
    Ok(())
}

/// Build and start the scheduler, or `None` when broadcasts are disabled.
pub async fn start_scheduler(
    ctx: &Arc<CommandContext>,
) -> anyhow::Result<Option<Arc<CronService<Broadcast>>>> {
    if !ctx.config.schedule.enabled {
        info!("scheduled broadcasts disabled");
        return Ok(None);
    }
    let job_ctx = Arc::clone(ctx);
    let on_run: JobFn<Broadcast> = Arc::new(move |broadcast| {
        let ctx = Arc::clone(&job_ctx);
        Box::pin(async move {
            send_broadcast(&ctx, broadcast)
                .await
                .map_err(|e| anyhow::anyhow!("{}: {e}", broadcast.name()))
        })
    });
    let cron = CronService::new(ctx.clock.tz(), on_run);
    for job in schedule_jobs(&ctx.config) {
        cron.add(job).await?;
    }
    cron.start().await;
    let status = cron.status().await;
    info!(jobs = status.job_count, next_run_at = ?status.next_run_at, "broadcast scheduler started");
    Ok(Some(cron))
}
