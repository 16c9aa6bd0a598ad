//! Teacher approval gestures.
//!
//! Candidate messages (participation bids, presented activities) are
//! registered here as pending. Two independent lanes watch the reaction
//! stream: the approve gesture in the participations channel, and the grade
//! gestures in the presented-activities channel. A pending entry is claimed
//! under the table lock, so a second gesture on the same message finds
//! nothing and is ignored.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use {
    aula_channels::ReactionEvent,
    aula_common::{ChannelId, MessageId, MessageRef, UserId},
    aula_config::AulaConfig,
    aula_store::ClassroomStore,
    chrono::NaiveDate,
    tokio::task::JoinHandle,
    tracing::{debug, info, warn},
};

use crate::{bus::EventBus, error::CommandError, sink::ResultSink};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ApprovalKind {
    /// One participation credit for the given class day.
    Participation { date: NaiveDate },
    /// A grade for the activity due on the given day.
    ActivityGrade { activity: NaiveDate },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PendingApproval {
    /// Where the result reaction goes.
    pub target: MessageRef,
    pub subject: UserId,
    pub kind: ApprovalKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lane {
    Participation,
    Grade,
}

pub struct ApprovalRouter {
    pending: Mutex<HashMap<MessageId, PendingApproval>>,
    store: Arc<dyn ClassroomStore>,
    sink: ResultSink,
    approver: UserId,
    approve_emoji: String,
    grade_gestures: HashMap<String, f64>,
    participations_channel: ChannelId,
    grades_channel: ChannelId,
}

impl ApprovalRouter {
    pub fn new(config: &AulaConfig, store: Arc<dyn ClassroomStore>, sink: ResultSink) -> Arc<Self> {
        let grade_gestures = config
            .grades
            .gestures
            .iter()
            .filter_map(|(emoji, grade)| match grade.trim().parse::<f64>() {
                Ok(value) => Some((emoji.clone(), value)),
                Err(_) => {
                    warn!(emoji, grade, "ignoring grade gesture with non-numeric grade");
                    None
                },
            })
            .collect();
        Arc::new(Self {
            pending: Mutex::new(HashMap::new()),
            store,
            sink,
            approver: config.teacher.id.clone(),
            approve_emoji: config.emojis.approve.clone(),
            grade_gestures,
            participations_channel: config.channels.participations.clone(),
            grades_channel: config.channels.activities_presented.clone(),
        })
    }

    /// Track a candidate message until the teacher resolves it.
    pub fn register(&self, approval: PendingApproval) {
        debug!(message_id = %approval.target.message_id, subject = %approval.subject, kind = ?approval.kind, "approval pending");
        self.pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(approval.target.message_id.clone(), approval);
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_pending(&self, message: &MessageId) -> bool {
        self.pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(message)
    }

    /// Whether `gesture` belongs to `lane` at all.
    pub fn accepts(&self, lane: Lane, gesture: &ReactionEvent) -> bool {
        if gesture.actor != self.approver || self.approver.is_empty() {
            return false;
        }
        match lane {
            Lane::Participation => {
                gesture.emoji == self.approve_emoji
                    && gesture.message.channel_id == self.participations_channel
            },
            Lane::Grade => {
                self.grade_gestures.contains_key(&gesture.emoji)
                    && gesture.message.channel_id == self.grades_channel
            },
        }
    }

    /// Subscribe both lanes to `bus`. Lanes never finish on their own; abort
    /// the returned handles to stop them.
    pub fn start(self: &Arc<Self>, bus: &Arc<EventBus<ReactionEvent>>) -> Vec<JoinHandle<()>> {
        [Lane::Participation, Lane::Grade]
            .into_iter()
            .map(|lane| {
                let router = Arc::clone(self);
                let filter_router = Arc::clone(self);
                let mut stream = bus.subscribe(move |g| filter_router.accepts(lane, g));
                tokio::spawn(async move {
                    while let Some(gesture) = stream.recv().await {
                        if let Some((approval, grade)) = router.claim(lane, &gesture) {
                            let router = Arc::clone(&router);
                            tokio::spawn(async move { router.complete(approval, grade).await });
                        }
                    }
                    debug!(?lane, "approval lane closed");
                })
            })
            .collect()
    }

    /// Take the pending entry for the gestured message if its kind matches
    /// the lane. Returns the grade for the grade lane.
    pub fn claim(&self, lane: Lane, gesture: &ReactionEvent) -> Option<(PendingApproval, f64)> {
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        let matches = match pending.get(&gesture.message.message_id).map(|a| a.kind) {
            Some(ApprovalKind::Participation { .. }) => lane == Lane::Participation,
            Some(ApprovalKind::ActivityGrade { .. }) => lane == Lane::Grade,
            None => false,
        };
        if !matches {
            debug!(message_id = %gesture.message.message_id, emoji = %gesture.emoji, "gesture without pending approval");
            return None;
        }
        let approval = pending.remove(&gesture.message.message_id)?;
        let grade = self.grade_gestures.get(&gesture.emoji).copied().unwrap_or(0.0);
        Some((approval, grade))
    }

    /// Persist a claimed approval and report on the candidate message.
    pub async fn complete(&self, approval: PendingApproval, grade: f64) {
        let result = match approval.kind {
            ApprovalKind::Participation { date } => {
                self.store.record_participation(&approval.subject, date).await
            },
            ApprovalKind::ActivityGrade { activity } => {
                self.store
                    .record_activity_grade(&approval.subject, activity, grade)
                    .await
            },
        };
        match result {
            Ok(()) => {
                info!(subject = %approval.subject, kind = ?approval.kind, "approval recorded");
                self.sink.on_success(&approval.target).await;
            },
            Err(e) => {
                self.sink
                    .on_error(&approval.target, &CommandError::from(e))
                    .await;
            },
        }
    }
}
