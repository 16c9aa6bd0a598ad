//! Teacher-only record keeping.

use std::sync::Arc;

use {
    aula_channels::Embed,
    aula_store::{Activity, ClassSession},
    tracing::info,
};

use super::{require_args, user_arg};
use crate::{
    broadcasts::COLOR_INFO,
    classify::CommandInvocation,
    context::CommandContext,
    dates::{parse_date_arg, parse_grade, parse_resource},
    error::Result,
    sink::Ack,
};

/// `name date code [name|value...]`
pub async fn new_session(ctx: Arc<CommandContext>, inv: CommandInvocation) -> Result<Ack> {
    require_args(&inv, 3)?;
    let date = parse_date_arg(&inv.args[1], ctx.today())?;
    let session = ClassSession {
        name: inv.args[0].clone(),
        date,
        attendance_code: inv.args[2].clone(),
        resources: inv.args[3..].iter().map(|t| parse_resource(t)).collect(),
        attendance: Vec::new(),
    };
    let session = ctx.store.create_session(session).await?;
    info!(name = %session.name, date = %session.date, "session created");
    Ok(Ack::Success)
}

/// `date name [optional] [name|value...]`
pub async fn new_activity(ctx: Arc<CommandContext>, inv: CommandInvocation) -> Result<Ack> {
    require_args(&inv, 2)?;
    let date = parse_date_arg(&inv.args[0], ctx.today())?;
    let mut rest = &inv.args[2..];
    let optional = rest
        .first()
        .is_some_and(|flag| flag.eq_ignore_ascii_case("optional"));
    if optional {
        rest = &rest[1..];
    }
    let activity = ctx
        .store
        .create_activity(Activity {
            name: inv.args[1].clone(),
            date,
            optional,
            resources: rest.iter().map(|t| parse_resource(t)).collect(),
        })
        .await?;
    info!(name = %activity.name, date = %activity.date, optional, "activity created");

    let mut embed = Embed::new("New Activity!")
        .description(format!("{}\nDue Date: {}", activity.name, activity.date))
        .color(COLOR_INFO);
    for r in &activity.resources {
        embed = embed.field(&r.name, &r.value, false);
    }
    ctx.transport
        .send_embed(&ctx.config.channels.activities, &embed)
        .await?;
    Ok(Ack::Success)
}

/// `user date`
pub async fn manual_participation(ctx: Arc<CommandContext>, inv: CommandInvocation) -> Result<Ack> {
    require_args(&inv, 2)?;
    let user = user_arg(&inv.args[0]);
    let date = parse_date_arg(&inv.args[1], ctx.today())?;
    ctx.store.record_participation(&user, date).await?;
    ctx.dm(
        &user,
        &format!("Una participacion ha sido agregada para la sesión: {date}"),
    )
    .await?;
    ctx.reply(&inv, &format!("Confirmacion: {} -> {date}", ctx.name_of(&user)))
        .await?;
    Ok(Ack::Success)
}

/// `user date`
pub async fn manual_attendance(ctx: Arc<CommandContext>, inv: CommandInvocation) -> Result<Ack> {
    require_args(&inv, 2)?;
    let user = user_arg(&inv.args[0]);
    let date = parse_date_arg(&inv.args[1], ctx.today())?;
    ctx.store.record_attendance(&user, date).await?;
    ctx.dm(
        &user,
        &format!("Asistencia ha sido agregada para la sesión: {date}"),
    )
    .await?;
    Ok(Ack::Success)
}

/// `user date presentation...`
pub async fn manual_activity(ctx: Arc<CommandContext>, inv: CommandInvocation) -> Result<Ack> {
    require_args(&inv, 3)?;
    let user = user_arg(&inv.args[0]);
    let date = parse_date_arg(&inv.args[1], ctx.today())?;
    let presentation = inv.args[2..].join(" ");
    ctx.store
        .record_activity_submission(&user, date, &presentation)
        .await?;
    ctx.reply(&inv, &format!("Confirmacion: {} -> {date}", ctx.name_of(&user)))
        .await?;
    Ok(Ack::Success)
}

/// `user date grade`
pub async fn manual_activity_grade(ctx: Arc<CommandContext>, inv: CommandInvocation) -> Result<Ack> {
    require_args(&inv, 3)?;
    let user = user_arg(&inv.args[0]);
    let date = parse_date_arg(&inv.args[1], ctx.today())?;
    let grade = parse_grade(&inv.args[2])?;
    ctx.store.record_activity_grade(&user, date, grade).await?;
    Ok(Ack::Success)
}

/// `user partial grade`
pub async fn manual_exam_grade(ctx: Arc<CommandContext>, inv: CommandInvocation) -> Result<Ack> {
    require_args(&inv, 3)?;
    let user = user_arg(&inv.args[0]);
    let partial = &inv.args[1];
    let grade = parse_grade(&inv.args[2])?;
    ctx.store.record_exam_grade(&user, partial, grade).await?;
    ctx.reply(
        &inv,
        &format!("Confirmacion: {} -> {partial} -> {grade}", ctx.name_of(&user)),
    )
    .await?;
    Ok(Ack::Success)
}

/// `user`
pub async fn whois(ctx: Arc<CommandContext>, inv: CommandInvocation) -> Result<Ack> {
    require_args(&inv, 1)?;
    let user = user_arg(&inv.args[0]);
    let university_id = ctx.store.university_id_of(&user).await?;
    ctx.reply(&inv, &format!("{university_id} - {}", ctx.name_of(&user)))
        .await?;
    Ok(Ack::Success)
}
