//! Shared collaborators handed to every command handler and session.

use std::{path::PathBuf, sync::Arc};

use {
    aula_channels::{ChatTransport, Directory, ReactionEvent},
    aula_common::{ChannelId, MessageRef, UserId},
    aula_config::{AulaConfig, parse_clock_time},
    aula_store::ClassroomStore,
    chrono::{NaiveDate, NaiveTime},
};

use crate::{
    approvals::ApprovalRouter,
    bus::EventBus,
    classify::CommandInvocation,
    clock::Clock,
    error::{CommandError, Result},
    guard,
    quiz::QuizOrchestrator,
    sink::ResultSink,
};

/// External capabilities the engine is wired to.
#[derive(Clone)]
pub struct Collaborators {
    pub transport: Arc<dyn ChatTransport>,
    pub directory: Arc<dyn Directory>,
    pub store: Arc<dyn ClassroomStore>,
    pub clock: Arc<dyn Clock>,
}

pub struct CommandContext {
    pub config: Arc<AulaConfig>,
    pub transport: Arc<dyn ChatTransport>,
    pub directory: Arc<dyn Directory>,
    pub store: Arc<dyn ClassroomStore>,
    pub clock: Arc<dyn Clock>,
    pub bus: Arc<EventBus<ReactionEvent>>,
    pub approvals: Arc<ApprovalRouter>,
    pub quizzes: Arc<QuizOrchestrator>,
    pub sink: ResultSink,
    /// Where generated reports are also written to disk, if anywhere.
    pub reports_dir: Option<PathBuf>,
    admins: Vec<UserId>,
}

impl CommandContext {
    pub fn new(config: Arc<AulaConfig>, collaborators: Collaborators) -> Self {
        let sink = ResultSink::new(
            Arc::clone(&collaborators.transport),
            config.emojis.success.clone(),
            config.emojis.error.clone(),
        );
        let approvals =
            ApprovalRouter::new(&config, Arc::clone(&collaborators.store), sink.clone());
        Self {
            admins: config.admin_ids(),
            transport: collaborators.transport,
            directory: collaborators.directory,
            store: collaborators.store,
            clock: collaborators.clock,
            bus: EventBus::new(),
            approvals,
            quizzes: QuizOrchestrator::new(),
            sink,
            reports_dir: None,
            config,
        }
    }

    #[must_use]
    pub fn with_reports_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.reports_dir = Some(dir.into());
        self
    }

    pub fn is_admin(&self, user: &UserId) -> bool {
        guard::is_admin(user, &self.admins)
    }

    pub fn teacher(&self) -> &UserId {
        &self.config.teacher.id
    }

    /// Display name, falling back to the raw id.
    pub fn name_of(&self, user: &UserId) -> String {
        self.directory
            .display_name(user)
            .unwrap_or_else(|| user.to_string())
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    /// Online users other than the teacher, in a stable order.
    pub fn online_students(&self) -> Vec<UserId> {
        let teacher = self.teacher();
        self.directory
            .online_users()
            .into_iter()
            .filter(|user| user != teacher)
            .collect()
    }

    /// Whether the local time lies strictly between two `HH:MM` values.
    pub fn within(&self, start: &str, end: &str) -> Result<bool> {
        let start = configured_time(start)?;
        let end = configured_time(end)?;
        Ok(guard::is_within_window(start, end, self.clock.local_time()))
    }

    /// In-class requests need the sender online, from a desktop client
    /// unless that requirement is switched off.
    pub fn check_presence(&self, user: &UserId) -> Result<()> {
        let presence = self.directory.presence(user).unwrap_or_default();
        let ok = if self.config.presence.require_desktop {
            presence.on_desktop()
        } else {
            presence.is_online()
        };
        if ok {
            Ok(())
        } else {
            Err(CommandError::invalid_user_status())
        }
    }

    /// Send `text` to `user`'s private channel.
    pub async fn dm(&self, user: &UserId, text: &str) -> Result<MessageRef> {
        let channel = self.transport.dm_channel(user).await?;
        Ok(self.transport.send_message(&channel, text).await?)
    }

    /// Reply in the channel an invocation came from.
    pub async fn reply(&self, inv: &CommandInvocation, text: &str) -> Result<MessageRef> {
        self.send(&inv.channel.channel_id, text).await
    }

    pub async fn send(&self, channel: &ChannelId, text: &str) -> Result<MessageRef> {
        Ok(self.transport.send_message(channel, text).await?)
    }
}

fn configured_time(value: &str) -> Result<NaiveTime> {
    parse_clock_time(value)
        .ok_or_else(|| CommandError::validation(format!("Hora mal configurada: {value}")))
}
