//! Commands any registered student can run.

use std::sync::Arc;

use {
    aula_channels::Embed,
    chrono::SecondsFormat,
    tracing::info,
};

use super::require_window;
use crate::{
    approvals::{ApprovalKind, PendingApproval},
    broadcasts::{COLOR_INFO, COLOR_SUCCESS},
    classify::CommandInvocation,
    context::CommandContext,
    error::{CommandError, Result},
    grades,
    report::{code_block, render_table},
    sink::Ack,
};

pub async fn register(ctx: Arc<CommandContext>, inv: CommandInvocation) -> Result<Ack> {
    // Without an id there is nothing to do, and nothing to complain about.
    let Some(university_id) = inv.args.first() else {
        return Ok(Ack::Silent);
    };
    ctx.store.register_user(&inv.sender, university_id).await?;
    info!(user = %inv.sender, university_id, "student registered");

    let dm = ctx.transport.dm_channel(&inv.sender).await?;
    ctx.transport
        .send_message(&dm, "Registro en bot correcto!")
        .await?;
    let form = &ctx.config.registration;
    if let (Some(title), Some(url)) = (&form.form_title, &form.form_url) {
        let embed = Embed::new("Para completar tu registro a la materia, llena el siguiente formulario:")
            .color(COLOR_INFO)
            .field(title, url, false);
        ctx.transport.send_embed(&dm, &embed).await?;
    }
    Ok(Ack::Success)
}

pub async fn attendance(ctx: Arc<CommandContext>, inv: CommandInvocation) -> Result<Ack> {
    let class = &ctx.config.class;
    require_window(
        &ctx,
        &class.start_time,
        &class.attendance_end_time,
        "El registro de asistencia no está habilitado en este horario.",
    )?;
    ctx.check_presence(&inv.sender)?;

    let today = ctx.today();
    let session = ctx
        .store
        .get_session(today)
        .await?
        .ok_or_else(|| CommandError::validation("No hay sesión registrada para hoy."))?;
    let code = inv.args.first().map(String::as_str).unwrap_or_default();
    if session.attendance_code != code {
        return Err(CommandError::validation("Codigo de asistencia invalido."));
    }
    ctx.store.record_attendance(&inv.sender, today).await?;
    info!(user = %inv.sender, date = %today, "attendance recorded");
    Ok(Ack::Success)
}

/// Marks the request and waits for the teacher's approval gesture; the
/// credit is written by the approval router.
pub async fn participation(ctx: Arc<CommandContext>, inv: CommandInvocation) -> Result<Ack> {
    let class = &ctx.config.class;
    require_window(
        &ctx,
        &class.start_time,
        &class.end_time,
        "Las participaciones solo se registran durante la clase.",
    )?;
    ctx.check_presence(&inv.sender)?;

    ctx.approvals.register(PendingApproval {
        target: inv.origin.clone(),
        subject: inv.sender.clone(),
        kind: ApprovalKind::Participation { date: ctx.today() },
    });
    Ok(Ack::Emoji(ctx.config.emojis.participation_request.clone()))
}

pub async fn activity(ctx: Arc<CommandContext>, inv: CommandInvocation) -> Result<Ack> {
    let class = &ctx.config.class;
    require_window(
        &ctx,
        &class.end_time,
        &class.activity_deadline,
        "Las actividades se presentan despues de clase y antes de la hora limite.",
    )?;
    if inv.attachments.is_empty() && inv.args.is_empty() {
        return Err(CommandError::missing_arguments());
    }
    let today = ctx.today();
    if ctx.store.get_activity(today).await?.is_none() {
        return Err(CommandError::validation("No hay actividad para hoy."));
    }

    let raw = inv.args.join(" ");
    let presentation = inv
        .attachments
        .first()
        .map_or_else(|| raw.clone(), |a| a.url.clone());
    ctx.store
        .record_activity_submission(&inv.sender, today, &presentation)
        .await?;

    let now = ctx.clock.local_now();
    let mut embed = Embed::new(ctx.name_of(&inv.sender)).color(COLOR_SUCCESS);
    for attachment in &inv.attachments {
        embed = embed.field("attachment", &attachment.url, false);
    }
    embed = embed
        .field("raw-content", if raw.is_empty() { "-" } else { raw.as_str() }, false)
        .field("discordId", inv.sender.as_str(), false)
        .field("Activity", today.to_string(), false)
        .field("Time", now.to_rfc3339_opts(SecondsFormat::Secs, false), false);
    let posted = ctx
        .transport
        .send_embed(&ctx.config.channels.activities_presented, &embed)
        .await?;
    ctx.approvals.register(PendingApproval {
        target: posted,
        subject: inv.sender.clone(),
        kind: ApprovalKind::ActivityGrade { activity: today },
    });
    info!(user = %inv.sender, activity = %today, "activity submitted");

    ctx.sink.on_success(&inv.origin).await;
    ctx.reply(&inv, "Actividad registrada correctamente!").await?;
    Ok(Ack::Silent)
}

pub async fn my_absences(ctx: Arc<CommandContext>, inv: CommandInvocation) -> Result<Ack> {
    let student = ctx
        .store
        .get_user(&inv.sender)
        .await?
        .ok_or_else(|| CommandError::from(aula_store::Error::not_registered(&inv.sender)))?;
    let held = grades::sessions_until(ctx.store.list_sessions().await?, ctx.today()).len();
    let absences = held.saturating_sub(student.attendance.len());
    ctx.dm(&inv.sender, &format!("Total ausencias: {absences}"))
        .await?;
    Ok(Ack::Success)
}

pub async fn my_grades(ctx: Arc<CommandContext>, inv: CommandInvocation) -> Result<Ack> {
    let student = ctx
        .store
        .get_user(&inv.sender)
        .await?
        .ok_or_else(|| CommandError::from(aula_store::Error::not_registered(&inv.sender)))?;
    let activities = ctx.store.list_activities().await?;

    let mut table = vec![vec![
        "Actividad".to_string(),
        "Fecha".to_string(),
        "Presentado".to_string(),
        "Calificación".to_string(),
    ]];
    for row in grades::activity_rows(&activities, &student) {
        table.push(vec![
            row.name,
            row.date.to_string(),
            if row.presented { "YES" } else { "NO" }.to_string(),
            row.grade.map_or_else(|| "-".to_string(), |g| g.to_string()),
        ]);
    }
    ctx.reply(&inv, &code_block(&ctx.name_of(&inv.sender))).await?;
    ctx.reply(&inv, &code_block(&render_table(&table, "  "))).await?;
    Ok(Ack::Success)
}
