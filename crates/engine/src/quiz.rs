//! Live quiz sessions.
//!
//! One session per student, fanned out in parallel. A session is a strictly
//! sequential state machine: announce, wait for an acknowledgement with no
//! deadline, count down, then ask each question as a timed wait on the
//! event bus. Sessions share nothing except the bus and the session table.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use {
    aula_channels::ReactionEvent,
    aula_common::{ChannelId, MessageRef, UserId},
    aula_config::QuizConfig,
    chrono::NaiveDate,
    tokio::{
        task::JoinHandle,
        time::{Instant, MissedTickBehavior, interval_at, sleep},
    },
    tokio_util::sync::CancellationToken,
    tracing::{debug, info, warn},
};

use crate::{
    bus::WaitOutcome,
    context::CommandContext,
    error::{CommandError, Result},
};

pub const DIVIDER: &str = "------------------------------";

const COUNTDOWN: [&str; 4] = ["Muy bien! empecemos!", "3...", "2...", "1..."];

// ── Plan ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizQuestion {
    /// 1-based position in the quiz.
    pub id: usize,
    pub content: String,
    /// Legal answer reactions.
    pub options: Vec<String>,
    pub correct: String,
}

impl QuizQuestion {
    /// Parse `content|opt opt ...|correct`.
    pub fn parse(id: usize, raw: &str) -> Result<Self> {
        let mut fields = raw.split('|');
        let (Some(content), Some(options), Some(correct)) =
            (fields.next(), fields.next(), fields.next())
        else {
            return Err(CommandError::quiz(format!(
                "Pregunta {id} mal formada, se espera: contenido|opciones|correcta"
            )));
        };
        let options: Vec<String> = options.split_whitespace().map(str::to_string).collect();
        let correct = correct.trim().to_string();
        if options.is_empty() {
            return Err(CommandError::quiz(format!("Pregunta {id} sin opciones")));
        }
        if !options.contains(&correct) {
            return Err(CommandError::quiz(format!(
                "Pregunta {id}: la respuesta {correct} no está entre las opciones"
            )));
        }
        Ok(Self {
            id,
            content: content.trim().to_string(),
            options,
            correct,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizPlan {
    pub name: String,
    /// Class day the earned participations are credited to.
    pub date: NaiveDate,
    pub max_participations: u32,
    pub questions: Vec<QuizQuestion>,
}

impl QuizPlan {
    pub fn earned(&self, correct: usize) -> u32 {
        participations_earned(correct, self.questions.len(), self.max_participations)
    }
}

/// `round(correct / total * max)`, halves rounded up.
pub fn participations_earned(correct: usize, total: usize, max: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    let total = total as u64;
    let correct = (correct as u64).min(total);
    let max_u64 = u64::from(max);
    let earned = (2 * correct * max_u64 + total) / (2 * total);
    u32::try_from(earned).unwrap_or(max)
}

#[derive(Debug, Clone)]
pub struct QuizTiming {
    pub question_time: Duration,
    pub tick_interval: Duration,
    pub countdown_step: Duration,
    pub ack_emojis: Vec<String>,
}

impl From<&QuizConfig> for QuizTiming {
    fn from(cfg: &QuizConfig) -> Self {
        Self {
            question_time: Duration::from_secs(cfg.question_time_secs),
            tick_interval: Duration::from_millis(cfg.tick_interval_ms.max(1)),
            countdown_step: Duration::from_millis(cfg.countdown_step_ms),
            ack_emojis: cfg.ack_emojis.clone(),
        }
    }
}

// ── Session state ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizStatus {
    Announced,
    AwaitingAck,
    /// Index into the plan's questions.
    InProgress { question: usize },
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionStatus {
    Waiting,
    Answered { correct: bool },
    TimedOut,
}

#[derive(Debug, Clone)]
pub struct QuestionState {
    pub question: usize,
    pub deadline: Instant,
    pub status: QuestionStatus,
}

/// Owned by the task running it.
#[derive(Debug, Clone)]
pub struct QuizSession {
    pub id: String,
    pub subject: UserId,
    pub questions: Vec<QuestionState>,
    pub correct_count: usize,
    pub status: QuizStatus,
}

impl QuizSession {
    fn new(id: String, subject: UserId) -> Self {
        Self {
            id,
            subject,
            questions: Vec::new(),
            correct_count: 0,
            status: QuizStatus::Announced,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizOutcome {
    pub session_id: String,
    pub subject: UserId,
    pub correct: usize,
    pub total: usize,
    pub earned: u32,
}

// ── Orchestrator ─────────────────────────────────────────────────────────────

struct SessionEntry {
    id: String,
    status: QuizStatus,
}

/// Table of live sessions keyed by student.
#[derive(Default)]
pub struct QuizOrchestrator {
    sessions: Mutex<HashMap<UserId, SessionEntry>>,
}

impl QuizOrchestrator {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn status_of(&self, user: &UserId) -> Option<QuizStatus> {
        self.sessions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(user)
            .map(|entry| entry.status)
    }

    pub fn active_count(&self) -> usize {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Start one session per user. Users already in a session are skipped.
    pub fn start(
        self: &Arc<Self>,
        ctx: &Arc<CommandContext>,
        plan: Arc<QuizPlan>,
        origin: &MessageRef,
        users: &[UserId],
    ) -> Vec<(UserId, JoinHandle<Option<QuizOutcome>>)> {
        let mut started = Vec::with_capacity(users.len());
        for user in users {
            let session = {
                let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
                if sessions.contains_key(user) {
                    info!(user = %user, "student already in a quiz, skipping");
                    continue;
                }
                let id = uuid::Uuid::new_v4().to_string();
                sessions.insert(user.clone(), SessionEntry {
                    id: id.clone(),
                    status: QuizStatus::Announced,
                });
                QuizSession::new(id, user.clone())
            };
            debug!(user = %user, session_id = %session.id, quiz = %plan.name, "quiz session created");
            let handle = tokio::spawn(Arc::clone(self).run(
                Arc::clone(ctx),
                Arc::clone(&plan),
                origin.clone(),
                session,
            ));
            started.push((user.clone(), handle));
        }
        started
    }

    async fn run(
        self: Arc<Self>,
        ctx: Arc<CommandContext>,
        plan: Arc<QuizPlan>,
        origin: MessageRef,
        mut session: QuizSession,
    ) -> Option<QuizOutcome> {
        let result = self.drive(&ctx, &plan, &origin, &mut session).await;
        {
            let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
            if sessions.get(&session.subject).is_some_and(|e| e.id == session.id) {
                sessions.remove(&session.subject);
            }
        }
        match result {
            Ok(outcome) => {
                info!(
                    user = %outcome.subject,
                    correct = outcome.correct,
                    total = outcome.total,
                    earned = outcome.earned,
                    "quiz session completed"
                );
                Some(outcome)
            },
            Err(err) => {
                ctx.sink.on_error(&origin, &err).await;
                None
            },
        }
    }

    fn set_status(&self, session: &mut QuizSession, status: QuizStatus) {
        session.status = status;
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(entry) = sessions.get_mut(&session.subject)
            && entry.id == session.id
        {
            entry.status = status;
        }
    }

    async fn drive(
        &self,
        ctx: &CommandContext,
        plan: &QuizPlan,
        origin: &MessageRef,
        session: &mut QuizSession,
    ) -> Result<QuizOutcome> {
        let timing = QuizTiming::from(&ctx.config.quiz);
        let subject = session.subject.clone();
        let dm = ctx.transport.dm_channel(&subject).await?;

        let announcement = ctx
            .transport
            .send_message(
                &dm,
                &format!(
                    "Comenzó el Quiz {}!\nAtento a las preguntas! Responde con las opciones que \
                     aparecen en la parte inferior de cada mensaje, Tienes un tiempo limitado ⏰!",
                    plan.name
                ),
            )
            .await?;

        // Subscribe before reacting so no acknowledgement can slip past.
        let ack = {
            let user = subject.clone();
            let target = announcement.message_id.clone();
            let emojis = timing.ack_emojis.clone();
            ctx.bus.wait_for(move |r: &ReactionEvent| {
                r.actor == user && r.message.message_id == target && emojis.contains(&r.emoji)
            })
        };
        for emoji in &timing.ack_emojis {
            ctx.transport.add_reaction(&announcement, emoji).await?;
        }
        self.set_status(session, QuizStatus::AwaitingAck);
        // No deadline: a student who never acknowledges never starts.
        if ack.wait().await.is_none() {
            return Err(CommandError::unavailable("quiz acknowledgement listener closed"));
        }
        debug!(user = %subject, "quiz acknowledged");

        for text in COUNTDOWN {
            temporary_message(ctx, &dm, text, timing.countdown_step).await;
        }

        let total = plan.questions.len();
        for (index, question) in plan.questions.iter().enumerate() {
            self.set_status(session, QuizStatus::InProgress { question: index });
            let status = ask(ctx, &timing, &dm, &subject, question, total, session).await?;
            if status == (QuestionStatus::Answered { correct: true }) {
                session.correct_count += 1;
            }
            let feedback = match status {
                QuestionStatus::Answered { correct: true } => "Respuesta correcta!".to_string(),
                QuestionStatus::Answered { correct: false } => format!(
                    "Respuesta incorrecta!\nLa respuesta correcta es: {}",
                    question.correct
                ),
                QuestionStatus::TimedOut | QuestionStatus::Waiting => {
                    format!("Timeout!\nLa respuesta correcta es: {}", question.correct)
                },
            };
            if let Err(e) = ctx.transport.send_message(&dm, &feedback).await {
                warn!(user = %subject, error = %e, "failed to send question feedback");
            }
        }

        self.set_status(session, QuizStatus::Completed);
        let correct = session.correct_count;
        let earned = plan.earned(correct);
        ctx.transport
            .send_message(
                &dm,
                &format!(
                    "{DIVIDER}\nEl quiz terminó!\n**Tu score: {correct}/{total}**\n\
                     Participaciones ganadas: {earned}\n{DIVIDER}"
                ),
            )
            .await?;

        // One credit per write; a failure part way keeps what was written.
        for _ in 0..earned {
            ctx.store.record_participation(&subject, plan.date).await?;
        }
        if earned > 0 {
            ctx.transport
                .send_message(
                    &dm,
                    &format!("{earned} participaciones han sido agregadas para hoy! ✅"),
                )
                .await?;
        }
        ctx.send(
            &origin.channel_id,
            &format!(
                "{} -> {correct}/{total} -> {earned} participaciones",
                ctx.name_of(&subject)
            ),
        )
        .await?;

        Ok(QuizOutcome {
            session_id: session.id.clone(),
            subject,
            correct,
            total,
            earned,
        })
    }
}

// ── Internal ─────────────────────────────────────────────────────────────────

fn question_text(question: &QuizQuestion, total: usize, remaining_secs: u64) -> String {
    format!(
        "{DIVIDER}\nPregunta {}/{total} | Tiempo: ->{remaining_secs}<-\n**{}**\n{DIVIDER}",
        question.id, question.content
    )
}

/// Ask one question and resolve it exactly once, by answer or by deadline.
async fn ask(
    ctx: &CommandContext,
    timing: &QuizTiming,
    dm: &ChannelId,
    subject: &UserId,
    question: &QuizQuestion,
    total: usize,
    session: &mut QuizSession,
) -> Result<QuestionStatus> {
    let secs = timing.question_time.as_secs();
    let message = ctx
        .transport
        .send_message(dm, &question_text(question, total, secs))
        .await?;
    let deadline = Instant::now() + timing.question_time;
    session.questions.push(QuestionState {
        question: question.id,
        deadline,
        status: QuestionStatus::Waiting,
    });

    let answer = {
        let user = subject.clone();
        let target = message.message_id.clone();
        let options = question.options.clone();
        ctx.bus.wait_for(move |r: &ReactionEvent| {
            r.actor == user && r.message.message_id == target && options.contains(&r.emoji)
        })
    };

    let ticker = CancellationToken::new();
    // Dropped on every exit path, which stops the ticker.
    let _stop_ticker = ticker.clone().drop_guard();
    tokio::spawn(tick(
        Arc::clone(&ctx.transport),
        message.clone(),
        question.clone(),
        total,
        deadline,
        timing.tick_interval,
        ticker,
    ));

    for option in &question.options {
        ctx.transport.add_reaction(&message, option).await?;
    }

    let status = match answer.until(deadline).await {
        WaitOutcome::Matched(reaction) => QuestionStatus::Answered {
            correct: reaction.emoji == question.correct,
        },
        WaitOutcome::TimedOut => QuestionStatus::TimedOut,
    };
    if let Some(state) = session.questions.last_mut() {
        state.status = status;
    }
    debug!(user = %subject, question = question.id, ?status, "question resolved");
    Ok(status)
}

/// Refresh the remaining-time text until cancelled or out of time. Edit
/// failures are dropped.
async fn tick(
    transport: Arc<dyn aula_channels::ChatTransport>,
    message: MessageRef,
    question: QuizQuestion,
    total: usize,
    deadline: Instant,
    every: Duration,
    stop: CancellationToken,
) {
    let mut ticks = interval_at(Instant::now() + every, every);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            biased;
            () = stop.cancelled() => break,
            _ = ticks.tick() => {
                let left = deadline.saturating_duration_since(Instant::now());
                let remaining = left.as_millis().div_ceil(1000);
                let remaining = u64::try_from(remaining).unwrap_or(0);
                if let Err(e) = transport
                    .edit_message(&message, &question_text(&question, total, remaining))
                    .await
                {
                    debug!(message_id = %message.message_id, error = %e, "tick edit failed");
                }
                if remaining == 0 {
                    break;
                }
            },
        }
    }
}

/// Post, hold, then remove a cosmetic message.
async fn temporary_message(ctx: &CommandContext, channel: &ChannelId, text: &str, hold: Duration) {
    match ctx.transport.send_message(channel, text).await {
        Ok(message) => {
            sleep(hold).await;
            if let Err(e) = ctx.transport.delete_message(&message).await {
                debug!(error = %e, "failed to delete temporary message");
            }
        },
        Err(e) => debug!(error = %e, "failed to send temporary message"),
    }
}
