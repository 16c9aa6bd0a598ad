//! Turns raw inbound events into typed intents.

use {
    aula_channels::{Attachment, InboundEvent, InboundMessage, ReactionEvent},
    aula_common::{ChannelId, MessageRef, UserId},
};

/// Every command keyword the bot understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Register,
    Attendance,
    Activity,
    Participation,
    MyAbsences,
    MyGrades,
    Help,
    ServerTime,
    Today,
    NewSession,
    NewActivity,
    ManualParticipation,
    ManualAttendance,
    ManualActivity,
    ManualActivityGrade,
    ManualExamGrade,
    TopsBottoms,
    Summary,
    Whois,
    GradesOf,
    ExportReport,
    InClassQuiz,
    SendRandomMessage,
}

impl Command {
    pub const ALL: [Self; 23] = [
        Self::Register,
        Self::Attendance,
        Self::Activity,
        Self::Participation,
        Self::MyAbsences,
        Self::MyGrades,
        Self::Help,
        Self::ServerTime,
        Self::Today,
        Self::NewSession,
        Self::NewActivity,
        Self::ManualParticipation,
        Self::ManualAttendance,
        Self::ManualActivity,
        Self::ManualActivityGrade,
        Self::ManualExamGrade,
        Self::TopsBottoms,
        Self::Summary,
        Self::Whois,
        Self::GradesOf,
        Self::ExportReport,
        Self::InClassQuiz,
        Self::SendRandomMessage,
    ];

    pub fn keyword(self) -> &'static str {
        match self {
            Self::Register => "register",
            Self::Attendance => "attendance",
            Self::Activity => "activity",
            Self::Participation => "participation",
            Self::MyAbsences => "my-absences",
            Self::MyGrades => "my-grades",
            Self::Help => "help",
            Self::ServerTime => "server-time",
            Self::Today => "today",
            Self::NewSession => "new-session",
            Self::NewActivity => "new-activity",
            Self::ManualParticipation => "manual-participation",
            Self::ManualAttendance => "manual-attendance",
            Self::ManualActivity => "manual-activity",
            Self::ManualActivityGrade => "manual-activity-grade",
            Self::ManualExamGrade => "manual-exam-grade",
            Self::TopsBottoms => "tops-bottoms",
            Self::Summary => "summary",
            Self::Whois => "whois",
            Self::GradesOf => "grades-of",
            Self::ExportReport => "export-report",
            Self::InClassQuiz => "in-class-quiz",
            Self::SendRandomMessage => "send-random-message",
        }
    }

    /// Argument synopsis shown by `help`.
    pub fn usage(self) -> &'static str {
        match self {
            Self::Register => "<CODIGO-UPB>",
            Self::Attendance => "<codigo>",
            Self::Activity => "<texto o adjunto>",
            Self::Whois | Self::GradesOf => "<usuario>",
            Self::NewSession => "<nombre> <fecha> <codigo> [nombre|valor...]",
            Self::NewActivity => "<fecha> <nombre> [optional] [nombre|valor...]",
            Self::ManualParticipation | Self::ManualAttendance => "<usuario> <fecha>",
            Self::ManualActivity => "<usuario> <fecha> <presentacion...>",
            Self::ManualActivityGrade => "<usuario> <fecha> <nota>",
            Self::ManualExamGrade => "<usuario> <parcial> <nota>",
            Self::TopsBottoms => "[n]",
            Self::InClassQuiz => "<nombre> <fecha> <max> <pregunta|opciones|correcta...>",
            Self::SendRandomMessage => "<mensaje...>",
            _ => "",
        }
    }

    /// Exact, case-insensitive keyword lookup.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|cmd| cmd.keyword().eq_ignore_ascii_case(keyword))
    }
}

/// Where a command was sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelContext {
    pub is_private: bool,
    pub channel_id: ChannelId,
}

/// A qualifying command message. Consumed by exactly one handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandInvocation {
    pub command: Command,
    pub args: Vec<String>,
    pub sender: UserId,
    pub channel: ChannelContext,
    /// The message that carried the command; feedback reactions go here.
    pub origin: MessageRef,
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Command(CommandInvocation),
    Gesture(ReactionEvent),
    Ignored,
}

/// Classify any inbound event. Presence updates only feed the directory.
pub fn classify(prefix: char, event: &InboundEvent) -> Intent {
    match event {
        InboundEvent::Message(msg) => classify_message(prefix, msg),
        InboundEvent::Reaction(reaction) => Intent::Gesture(reaction.clone()),
        InboundEvent::Presence(_) => Intent::Ignored,
    }
}

/// A message is a command when it starts with `prefix` immediately followed
/// by a known keyword.
pub fn classify_message(prefix: char, msg: &InboundMessage) -> Intent {
    let Some(rest) = msg.text.trim_start().strip_prefix(prefix) else {
        return Intent::Ignored;
    };
    if rest.starts_with(char::is_whitespace) {
        return Intent::Ignored;
    }
    let (keyword, remainder) = match rest.split_once(char::is_whitespace) {
        Some((keyword, remainder)) => (keyword, remainder),
        None => (rest, ""),
    };
    let Some(command) = Command::from_keyword(keyword) else {
        return Intent::Ignored;
    };

    Intent::Command(CommandInvocation {
        command,
        args: tokenize(remainder),
        sender: msg.author.clone(),
        channel: ChannelContext {
            is_private: msg.is_private,
            channel_id: msg.message.channel_id.clone(),
        },
        origin: msg.message.clone(),
        attachments: msg.attachments.clone(),
    })
}

/// A JSON array literal is taken verbatim; anything else is split on
/// whitespace. A malformed literal falls back to whitespace splitting.
pub fn tokenize(remainder: &str) -> Vec<String> {
    let trimmed = remainder.trim();
    if trimmed.starts_with('[')
        && let Ok(serde_json::Value::Array(items)) = serde_json::from_str(trimmed)
    {
        return items
            .into_iter()
            .map(|item| match item {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            })
            .collect();
    }
    trimmed.split_whitespace().map(str::to_string).collect()
}
