//! Offline driver: feeds a line script through the engine with an
//! in-memory transport and prints whatever the bot sends back.
//!
//! Script lines:
//!
//! ```text
//! # comment
//! online <user> [display name]
//! say <user> <channel|dm> <text>
//! react <user> <channel|dm> <message-id> <emoji>
//! wait <seconds>
//! ```

use std::{path::PathBuf, sync::Arc, time::Duration};

use {
    anyhow::Context,
    chrono::{DateTime, Utc},
    clap::Args,
    tokio::io::{AsyncBufReadExt, BufReader},
    tracing::{debug, info},
};

use {
    aula_channels::{
        ChatTransport, Device, Directory, DirectoryState, InMemoryTransport, InboundEvent,
        InboundMessage, OnlineStatus, OutboundCall, PresenceUpdate, ReactionEvent,
    },
    aula_common::{ChannelId, MessageId, MessageRef, UserId},
    aula_config::AulaConfig,
    aula_engine::{Clock, Collaborators, Engine, FixedClock, SystemClock},
    aula_store::{ClassroomStore, FileStore, InMemoryStore},
};

/// How long to let spawned work settle before printing its output.
const SETTLE: Duration = Duration::from_millis(150);

#[derive(Args)]
pub struct SimulateArgs {
    /// Script file; stdin when omitted.
    #[arg(long)]
    script: Option<PathBuf>,
    /// Persist to this JSON store instead of an in-memory one.
    #[arg(long)]
    store: Option<PathBuf>,
    /// Pin the clock to this RFC 3339 instant.
    #[arg(long)]
    at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptLine {
    Online {
        user: UserId,
        name: Option<String>,
    },
    Say {
        user: UserId,
        channel: String,
        text: String,
    },
    React {
        user: UserId,
        channel: String,
        message: MessageId,
        emoji: String,
    },
    Wait(Duration),
}

/// Parse one script line. Blank lines and comments yield `Ok(None)`.
pub fn parse_line(line: &str) -> anyhow::Result<Option<ScriptLine>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let (verb, rest) = line.split_once(' ').unwrap_or((line, ""));
    let rest = rest.trim();
    let parsed = match verb {
        "online" => {
            let (user, name) = rest.split_once(' ').unwrap_or((rest, ""));
            anyhow::ensure!(!user.is_empty(), "online needs a user");
            let name = name.trim();
            ScriptLine::Online {
                user: UserId::new(user),
                name: (!name.is_empty()).then(|| name.to_string()),
            }
        },
        "say" => {
            let mut parts = rest.splitn(3, ' ');
            let (Some(user), Some(channel), Some(text)) = (parts.next(), parts.next(), parts.next())
            else {
                anyhow::bail!("say needs <user> <channel> <text>");
            };
            ScriptLine::Say {
                user: UserId::new(user),
                channel: channel.to_string(),
                text: text.to_string(),
            }
        },
        "react" => {
            let parts: Vec<&str> = rest.split_whitespace().collect();
            let [user, channel, message, emoji] = parts.as_slice() else {
                anyhow::bail!("react needs <user> <channel> <message-id> <emoji>");
            };
            ScriptLine::React {
                user: UserId::new(*user),
                channel: channel.to_string(),
                message: MessageId::new(*message),
                emoji: emoji.to_string(),
            }
        },
        "wait" => {
            let secs: f64 = rest
                .parse()
                .with_context(|| format!("invalid wait: {rest}"))?;
            anyhow::ensure!(secs.is_finite() && secs >= 0.0, "invalid wait: {rest}");
            ScriptLine::Wait(Duration::from_secs_f64(secs))
        },
        other => anyhow::bail!("unknown script verb: {other}"),
    };
    Ok(Some(parsed))
}

/// One line per outbound call, the way a chat log would show it.
pub fn describe(call: &OutboundCall) -> String {
    match call {
        OutboundCall::Message { message, text } => {
            format!("[{}] #{} {text}", message.channel_id, message.message_id)
        },
        OutboundCall::Embed { message, embed } => {
            let mut line = format!(
                "[{}] #{} embed: {}",
                message.channel_id, message.message_id, embed.title
            );
            if let Some(description) = &embed.description {
                line.push_str(&format!(" | {description}"));
            }
            for field in &embed.fields {
                line.push_str(&format!(" | {}: {}", field.name, field.value));
            }
            line
        },
        OutboundCall::File {
            message,
            text,
            file_name,
            bytes,
        } => format!(
            "[{}] #{} {text} <{file_name}, {} bytes>",
            message.channel_id,
            message.message_id,
            bytes.len()
        ),
        OutboundCall::Reaction { message, emoji } => {
            format!("[{}] react {emoji} on #{}", message.channel_id, message.message_id)
        },
        OutboundCall::Edit { message, text } => {
            format!("[{}] edit #{}: {text}", message.channel_id, message.message_id)
        },
        OutboundCall::Delete { message } => {
            format!("[{}] delete #{}", message.channel_id, message.message_id)
        },
    }
}

struct Simulation {
    engine: Engine,
    transport: Arc<InMemoryTransport>,
    directory: Arc<DirectoryState>,
    next_inbound: u64,
    printed: usize,
}

impl Simulation {
    fn channel(user: &UserId, channel: &str) -> (ChannelId, bool) {
        if channel == "dm" {
            (InMemoryTransport::dm_channel_id(user), true)
        } else {
            (ChannelId::new(channel), false)
        }
    }

    async fn apply(&mut self, line: ScriptLine) {
        match line {
            ScriptLine::Online { user, name } => {
                self.directory.apply_presence(&PresenceUpdate {
                    user: user.clone(),
                    status: OnlineStatus::Online,
                    devices: vec![Device::Desktop],
                });
                if let Some(name) = name {
                    self.directory.set_display_name(user, name);
                }
            },
            ScriptLine::Say {
                user,
                channel,
                text,
            } => {
                let (channel, is_private) = Self::channel(&user, &channel);
                let id = self.next_inbound;
                self.next_inbound += 1;
                let message = MessageRef::new(channel, MessageId::new(format!("in-{id}")));
                println!("> [{}] #{} {user}: {text}", message.channel_id, message.message_id);
                let event = InboundEvent::Message(InboundMessage {
                    message,
                    author: user,
                    text,
                    is_private,
                    attachments: Vec::new(),
                });
                if let Some(task) = self.engine.handle_event(&event)
                    && let Err(e) = task.await
                {
                    debug!(error = %e, "command task ended abnormally");
                }
            },
            ScriptLine::React {
                user,
                channel,
                message,
                emoji,
            } => {
                let (channel, _) = Self::channel(&user, &channel);
                println!("> [{channel}] {user} reacts {emoji} on #{message}");
                let event = InboundEvent::Reaction(ReactionEvent {
                    emoji,
                    actor: user,
                    message: MessageRef::new(channel, message),
                });
                let _ = self.engine.handle_event(&event);
            },
            ScriptLine::Wait(duration) => tokio::time::sleep(duration).await,
        }
        tokio::time::sleep(SETTLE).await;
        self.flush();
    }

    fn flush(&mut self) {
        let calls = self.transport.calls();
        for call in calls.iter().skip(self.printed) {
            println!("{}", describe(call));
        }
        self.printed = calls.len();
    }
}

pub async fn run(config: AulaConfig, args: SimulateArgs) -> anyhow::Result<()> {
    let tz = config
        .bot
        .tz()
        .with_context(|| format!("unknown timezone: {}", config.bot.timezone))?;
    let clock: Arc<dyn Clock> = match args.at {
        Some(at) => Arc::new(FixedClock::new(at, tz)),
        None => Arc::new(SystemClock::new(tz)),
    };
    let store: Arc<dyn ClassroomStore> = match &args.store {
        Some(path) => Arc::new(FileStore::new(path.clone())),
        None => Arc::new(InMemoryStore::new()),
    };
    let transport = Arc::new(InMemoryTransport::new());
    let directory = Arc::new(DirectoryState::new());

    let mut engine = Engine::new(Arc::new(config), Collaborators {
        transport: Arc::clone(&transport) as Arc<dyn ChatTransport>,
        directory: Arc::clone(&directory) as Arc<dyn Directory>,
        store,
        clock,
    });
    engine.start().await;
    info!(store = ?args.store, "simulation started");

    let mut sim = Simulation {
        engine,
        transport,
        directory,
        next_inbound: 1,
        printed: 0,
    };

    let input: Box<dyn tokio::io::AsyncRead + Unpin> = match &args.script {
        Some(path) => Box::new(
            tokio::fs::File::open(path)
                .await
                .with_context(|| format!("failed to open {}", path.display()))?,
        ),
        None => Box::new(tokio::io::stdin()),
    };
    let mut lines = BufReader::new(input).lines();
    let mut number = 0usize;
    while let Some(raw) = lines.next_line().await? {
        number += 1;
        match parse_line(&raw) {
            Ok(Some(line)) => sim.apply(line).await,
            Ok(None) => {},
            Err(e) => eprintln!("line {number}: {e}"),
        }
    }

    sim.flush();
    sim.engine.shutdown().await;
    Ok(())
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    #[test]
    fn say_keeps_the_whole_text() {
        let line = parse_line("say 11 general -attendance  ABC").unwrap();
        assert_eq!(
            line,
            Some(ScriptLine::Say {
                user: UserId::new("11"),
                channel: "general".into(),
                text: "-attendance  ABC".into(),
            })
        );
    }

    #[test]
    fn online_name_is_optional() {
        assert_eq!(
            parse_line("online 11").unwrap(),
            Some(ScriptLine::Online {
                user: UserId::new("11"),
                name: None,
            })
        );
        assert_eq!(
            parse_line("online 11 Ana Perez").unwrap(),
            Some(ScriptLine::Online {
                user: UserId::new("11"),
                name: Some("Ana Perez".into()),
            })
        );
    }

    #[test]
    fn react_and_wait() {
        assert_eq!(
            parse_line("react 1 dm 7 ✅").unwrap(),
            Some(ScriptLine::React {
                user: UserId::new("1"),
                channel: "dm".into(),
                message: MessageId::new("7"),
                emoji: "✅".into(),
            })
        );
        assert_eq!(
            parse_line("wait 1.5").unwrap(),
            Some(ScriptLine::Wait(Duration::from_millis(1500)))
        );
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("# say 1 general hi")]
    fn blank_and_comment_lines_are_skipped(#[case] raw: &str) {
        assert_eq!(parse_line(raw).unwrap(), None);
    }

    #[rstest]
    #[case("shout 1 hi")]
    #[case("say 1 general")]
    #[case("react 1 dm 7")]
    #[case("wait soon")]
    #[case("wait -1")]
    fn malformed_lines_are_errors(#[case] raw: &str) {
        assert!(parse_line(raw).is_err());
    }

    #[test]
    fn dm_channel_is_private() {
        let user = UserId::new("5");
        assert_eq!(
            Simulation::channel(&user, "dm"),
            (ChannelId::new("dm-5"), true)
        );
        assert_eq!(
            Simulation::channel(&user, "general"),
            (ChannelId::new("general"), false)
        );
    }

    #[test]
    fn calls_read_like_a_chat_log() {
        let message = MessageRef::new(ChannelId::new("general"), MessageId::new("3"));
        let call = OutboundCall::Reaction {
            message: message.clone(),
            emoji: "✅".into(),
        };
        assert_eq!(describe(&call), "[general] react ✅ on #3");
        let call = OutboundCall::Message {
            message,
            text: "hola".into(),
        };
        assert_eq!(describe(&call), "[general] #3 hola");
    }
}
