#![allow(clippy::unwrap_used, clippy::expect_used, dead_code)]

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use {
    aula_channels::{
        ChatTransport, Device, Directory, DirectoryState, InMemoryTransport, InboundEvent,
        InboundMessage, OnlineStatus, OutboundCall, PresenceUpdate, ReactionEvent,
    },
    aula_common::{ChannelId, MessageRef, UserId},
    aula_config::AulaConfig,
    aula_engine::{Clock, Collaborators, Engine, FixedClock},
    aula_store::{ClassSession, ClassroomData, ClassroomStore, InMemoryStore, Student},
    chrono::{NaiveDate, TimeZone, Utc},
    tokio::task::JoinHandle,
};

pub const TEACHER: &str = "teacher";
pub const GENERAL: &str = "general";

pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2021, 9, 6).unwrap()
}

pub fn config() -> AulaConfig {
    let mut cfg = AulaConfig::default();
    cfg.teacher.id = UserId::new(TEACHER);
    cfg.channels.attendance = ChannelId::new("attendance");
    cfg.channels.participations = ChannelId::new("participations");
    cfg.channels.activities = ChannelId::new("activities");
    cfg.channels.activities_presented = ChannelId::new("presented");
    cfg.channels.announcements = ChannelId::new("announcements");
    cfg.channels.main_voice = ChannelId::new("voice");
    cfg.schedule.enabled = false;
    cfg
}

pub fn session(code: &str) -> ClassSession {
    ClassSession {
        name: "Intro".into(),
        date: today(),
        attendance_code: code.into(),
        resources: Vec::new(),
        attendance: Vec::new(),
    }
}

/// An engine wired to in-memory collaborators, with its lanes started.
pub struct Harness {
    pub engine: Engine,
    pub transport: Arc<InMemoryTransport>,
    pub directory: Arc<DirectoryState>,
    pub store: Arc<InMemoryStore>,
    pub clock: Arc<FixedClock>,
    next_id: AtomicU64,
}

impl Harness {
    pub async fn new(config: AulaConfig, data: ClassroomData) -> Self {
        let transport = Arc::new(InMemoryTransport::new());
        let directory = Arc::new(DirectoryState::new());
        let store = Arc::new(InMemoryStore::with_data(data));
        // 07:20, inside the attendance window.
        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2021, 9, 6, 7, 20, 0).unwrap(),
            chrono_tz::UTC,
        ));
        let mut engine = Engine::new(Arc::new(config), Collaborators {
            transport: Arc::clone(&transport) as Arc<dyn ChatTransport>,
            directory: Arc::clone(&directory) as Arc<dyn Directory>,
            store: Arc::clone(&store) as Arc<dyn ClassroomStore>,
            clock: Arc::clone(&clock) as Arc<dyn Clock>,
        });
        engine.start().await;
        Self {
            engine,
            transport,
            directory,
            store,
            clock,
            next_id: AtomicU64::new(1000),
        }
    }

    /// Students registered with ids `A00n`.
    pub fn students(users: &[&str]) -> Vec<Student> {
        users
            .iter()
            .enumerate()
            .map(|(i, u)| Student::new(UserId::new(*u), format!("A{:03}", i + 1)))
            .collect()
    }

    pub fn online(&self, user: &str, name: &str) {
        self.directory.apply_presence(&PresenceUpdate {
            user: UserId::new(user),
            status: OnlineStatus::Online,
            devices: vec![Device::Desktop],
        });
        self.directory.set_display_name(UserId::new(user), name);
    }

    /// Deliver a message and return its reference plus the command task.
    pub fn say(
        &self,
        author: &str,
        channel: &str,
        text: &str,
    ) -> (MessageRef, Option<JoinHandle<()>>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let message = MessageRef::new(channel, format!("in-{id}"));
        let handle = self.engine.handle_event(&InboundEvent::Message(InboundMessage {
            message: message.clone(),
            author: UserId::new(author),
            text: text.into(),
            is_private: channel.starts_with("dm-"),
            attachments: Vec::new(),
        }));
        (message, handle)
    }

    /// Deliver a message and wait for its command to finish.
    pub async fn run(&self, author: &str, channel: &str, text: &str) -> MessageRef {
        let (message, handle) = self.say(author, channel, text);
        if let Some(handle) = handle {
            handle.await.unwrap();
        }
        message
    }

    pub fn react(&self, actor: &str, message: &MessageRef, emoji: &str) {
        let _ = self.engine.handle_event(&InboundEvent::Reaction(ReactionEvent {
            emoji: emoji.into(),
            actor: UserId::new(actor),
            message: message.clone(),
        }));
    }

    /// Wait for a plain message in `channel` whose text satisfies `pred`.
    pub async fn message_in(&self, channel: &str, pred: impl Fn(&str) -> bool) -> MessageRef {
        let channel = ChannelId::new(channel);
        match self
            .transport
            .wait_for(|call| match call {
                OutboundCall::Message { message, text } => {
                    message.channel_id == channel && pred(text)
                },
                _ => false,
            })
            .await
        {
            OutboundCall::Message { message, .. } => message,
            other => panic!("unexpected call {other:?}"),
        }
    }

    /// Wait until `emoji` has been added to `message`.
    pub async fn reaction_on(&self, message: &MessageRef, emoji: &str) {
        self.transport
            .wait_for(|call| {
                matches!(
                    call,
                    OutboundCall::Reaction { message: m, emoji: e } if m == message && e == emoji
                )
            })
            .await;
    }

    pub fn student(&self, user: &str) -> Student {
        self.store
            .snapshot()
            .student(&UserId::new(user))
            .cloned()
            .unwrap()
    }
}
