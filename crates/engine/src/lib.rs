//! Event dispatch and interactive sessions for the classroom bot.
//!
//! Inbound events are classified into commands or reaction gestures.
//! Commands pass the registry's guards and run on their own tasks; gestures
//! are published on a shared [`EventBus`] where approval lanes and quiz
//! sessions wait for them.

pub mod approvals;
pub mod broadcasts;
pub mod bus;
pub mod classify;
pub mod clock;
pub mod commands;
pub mod context;
pub mod dates;
pub mod error;
pub mod grades;
pub mod guard;
pub mod quiz;
pub mod registry;
pub mod report;
pub mod runtime;
pub mod sink;

pub use {
    approvals::{ApprovalKind, ApprovalRouter, PendingApproval},
    bus::{EventBus, WaitOutcome},
    classify::{Command, CommandInvocation, Intent, classify},
    clock::{Clock, FixedClock, SystemClock},
    context::{Collaborators, CommandContext},
    error::{CommandError, ErrorKind, Result},
    quiz::{QuizOrchestrator, QuizOutcome, QuizPlan, QuizStatus},
    registry::{CommandRegistry, CommandSpec},
    runtime::Engine,
    sink::{Ack, ResultSink},
};
