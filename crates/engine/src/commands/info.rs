use std::sync::Arc;

use chrono::SecondsFormat;

use crate::{
    classify::{Command, CommandInvocation},
    context::CommandContext,
    error::{CommandError, Result},
    registry::CommandSpec,
    sink::Ack,
};

/// Command list, students first, then the admin-only block.
pub fn help_text(prefix: char, include_admin: bool) -> String {
    let line = |cmd: Command| {
        let usage = cmd.usage();
        if usage.is_empty() {
            format!(" {prefix}{}", cmd.keyword())
        } else {
            format!(" {prefix}{} {usage}", cmd.keyword())
        }
    };
    let (admin, student): (Vec<Command>, Vec<Command>) = Command::ALL
        .into_iter()
        .partition(|cmd| CommandSpec::default_for(*cmd).admin_only);

    let mut out = vec!["Comandos:".to_string(), String::new()];
    out.extend(student.into_iter().map(line));
    if include_admin {
        out.push(String::new());
        out.push("Docente:".into());
        out.extend(admin.into_iter().map(line));
    }
    out.join("\n")
}

pub async fn help(ctx: Arc<CommandContext>, inv: CommandInvocation) -> Result<Ack> {
    let text = help_text(ctx.config.bot.prefix, ctx.is_admin(&inv.sender));
    ctx.reply(&inv, &text).await?;
    Ok(Ack::Emoji(ctx.config.emojis.thumbs_up.clone()))
}

pub async fn server_time(ctx: Arc<CommandContext>, inv: CommandInvocation) -> Result<Ack> {
    let now = ctx.clock.now().to_rfc3339_opts(SecondsFormat::Millis, true);
    ctx.reply(&inv, &now).await?;
    Ok(Ack::Emoji(ctx.config.emojis.thumbs_up.clone()))
}

pub async fn today(ctx: Arc<CommandContext>, inv: CommandInvocation) -> Result<Ack> {
    let session = ctx
        .store
        .get_session(ctx.today())
        .await?
        .ok_or_else(|| CommandError::validation("No hay sesión registrada para hoy."))?;
    let body = serde_json::to_string(&session)
        .map_err(|e| CommandError::validation(format!("sesión ilegible: {e}")))?;
    ctx.reply(&inv, &body).await?;
    Ok(Ack::Silent)
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn help_hides_admin_commands_from_students() {
        let student = help_text('-', false);
        assert!(student.contains(" -attendance <codigo>"));
        assert!(student.contains(" -help"));
        assert!(!student.contains("summary"));

        let teacher = help_text('-', true);
        assert!(teacher.contains("Docente:"));
        assert!(teacher.contains(" -in-class-quiz "));
    }
}
