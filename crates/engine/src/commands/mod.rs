//! Command handlers, grouped by audience.
//!
//! Every handler has the same shape: `(ctx, invocation) -> Result<Ack>`.
//! Guards declared in the registry have already passed when one runs.

pub mod admin;
pub mod info;
pub mod quiz;
pub mod reports;
pub mod student;

use aula_common::UserId;

use crate::{
    classify::CommandInvocation,
    context::CommandContext,
    error::{CommandError, Result},
};

fn require_args(inv: &CommandInvocation, count: usize) -> Result<()> {
    if inv.args.len() < count {
        Err(CommandError::missing_arguments())
    } else {
        Ok(())
    }
}

/// A user argument: a raw id or a mention (`<@id>`, `<@!id>`).
fn user_arg(raw: &str) -> UserId {
    let raw = raw.trim();
    let id = raw
        .strip_prefix("<@")
        .and_then(|rest| rest.strip_suffix('>'))
        .map(|rest| rest.trim_start_matches('!'))
        .unwrap_or(raw);
    UserId::new(id)
}

/// Fails with `message` unless the local time is strictly inside the window.
fn require_window(ctx: &CommandContext, start: &str, end: &str, message: &str) -> Result<()> {
    if ctx.within(start, end)? {
        Ok(())
    } else {
        Err(CommandError::validation(message))
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    #[rstest]
    #[case("818983033838370867", "818983033838370867")]
    #[case("<@818983033838370867>", "818983033838370867")]
    #[case("<@!818983033838370867>", "818983033838370867")]
    #[case(" u2 ", "u2")]
    fn user_arguments(#[case] raw: &str, #[case] id: &str) {
        assert_eq!(user_arg(raw), UserId::new(id));
    }
}
