//! Command registry and dispatcher.
//!
//! Routing is synchronous and pure; execution is not. `dispatch` decides
//! which handler (if any) owns an invocation, spawns it, and returns at once.

use std::{collections::HashMap, future::Future, pin::Pin, sync::Arc};

use {
    aula_common::ChannelId,
    aula_config::ChannelsConfig,
    tokio::task::JoinHandle,
    tracing::{debug, warn},
};

use crate::{
    classify::{Command, CommandInvocation},
    commands::{admin, info, quiz, reports, student},
    context::CommandContext,
    error::{CommandError, Result},
    guard,
    sink::Ack,
};

// ── Types ────────────────────────────────────────────────────────────────────

/// A boxed async command handler.
pub type HandlerFn = Box<
    dyn Fn(Arc<CommandContext>, CommandInvocation) -> Pin<Box<dyn Future<Output = Result<Ack>> + Send>>
        + Send
        + Sync,
>;

/// Designated channel a command is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelRole {
    Attendance,
    Participations,
}

impl ChannelRole {
    pub fn id(self, channels: &ChannelsConfig) -> &ChannelId {
        match self {
            Self::Attendance => &channels.attendance,
            Self::Participations => &channels.participations,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelRequirement {
    Any,
    Private,
    Channel(ChannelRole),
}

/// Guards declared by one command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandSpec {
    pub command: Command,
    pub channel: ChannelRequirement,
    pub admin_only: bool,
    /// Still served while in maintenance mode.
    pub maintenance_exempt: bool,
}

impl CommandSpec {
    pub const fn new(command: Command) -> Self {
        Self {
            command,
            channel: ChannelRequirement::Any,
            admin_only: false,
            maintenance_exempt: false,
        }
    }

    #[must_use]
    pub const fn channel(mut self, channel: ChannelRequirement) -> Self {
        self.channel = channel;
        self
    }

    #[must_use]
    pub const fn admin_only(mut self) -> Self {
        self.admin_only = true;
        self
    }

    #[must_use]
    pub const fn maintenance_exempt(mut self) -> Self {
        self.maintenance_exempt = true;
        self
    }

    /// The built-in guard table.
    pub const fn default_for(command: Command) -> Self {
        use {ChannelRequirement as C, Command as K};
        let spec = Self::new(command);
        match command {
            K::Register | K::Attendance => spec.channel(C::Channel(ChannelRole::Attendance)),
            K::Participation => spec.channel(C::Channel(ChannelRole::Participations)),
            K::Activity | K::MyGrades => spec.channel(C::Private),
            K::Help => spec.maintenance_exempt(),
            K::MyAbsences | K::ServerTime | K::Today => spec,
            K::NewSession
            | K::NewActivity
            | K::ManualParticipation
            | K::ManualAttendance
            | K::ManualActivity
            | K::ManualActivityGrade
            | K::ManualExamGrade
            | K::TopsBottoms
            | K::Summary
            | K::Whois
            | K::GradesOf
            | K::ExportReport
            | K::InClassQuiz
            | K::SendRandomMessage => spec.admin_only(),
        }
    }

    fn check(&self, inv: &CommandInvocation, env: &RouteEnv<'_>) -> Result<()> {
        if self.admin_only && !env.sender_is_admin {
            return Err(CommandError::not_admin());
        }
        let in_place = match self.channel {
            ChannelRequirement::Any => true,
            ChannelRequirement::Private => guard::is_private(&inv.channel),
            ChannelRequirement::Channel(role) => {
                guard::is_channel(&inv.channel, role.id(env.channels))
            },
        };
        if in_place {
            Ok(())
        } else {
            Err(CommandError::wrong_channel())
        }
    }
}

/// What routing needs to know about the sender and deployment.
#[derive(Debug, Clone, Copy)]
pub struct RouteEnv<'a> {
    pub channels: &'a ChannelsConfig,
    pub maintenance: bool,
    pub sender_is_admin: bool,
}

#[derive(Debug)]
pub enum Route {
    Handle(Command),
    Reject(CommandError),
}

// ── Registry ─────────────────────────────────────────────────────────────────

pub struct CommandRegistry {
    specs: Vec<CommandSpec>,
    handlers: HashMap<Command, HandlerFn>,
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandRegistry {
    pub fn new() -> Self {
        let mut reg = Self {
            specs: Vec::new(),
            handlers: HashMap::new(),
        };
        reg.register_defaults();
        reg
    }

    /// Register or replace the handler for `spec.command`. Declaration order
    /// is kept for first registrations.
    pub fn register(&mut self, spec: CommandSpec, handler: HandlerFn) {
        self.handlers.insert(spec.command, handler);
        match self.specs.iter_mut().find(|s| s.command == spec.command) {
            Some(existing) => *existing = spec,
            None => self.specs.push(spec),
        }
    }

    pub fn specs(&self) -> &[CommandSpec] {
        &self.specs
    }

    /// Decide who owns `inv`. Maintenance is checked first, then the
    /// command's own guards in declaration order.
    pub fn route(&self, inv: &CommandInvocation, env: &RouteEnv<'_>) -> Route {
        let Some(spec) = self.specs.iter().find(|s| s.command == inv.command) else {
            return Route::Reject(CommandError::validation(format!(
                "Comando no disponible: {}",
                inv.command.keyword()
            )));
        };
        if env.maintenance && !env.sender_is_admin && !spec.maintenance_exempt {
            return Route::Reject(CommandError::maintenance());
        }
        match spec.check(inv, env) {
            Ok(()) => Route::Handle(spec.command),
            Err(err) => Route::Reject(err),
        }
    }

    /// Route and spawn. The returned handle completes once the handler and
    /// its feedback are done; callers are free to drop it.
    pub fn dispatch(&self, ctx: &Arc<CommandContext>, inv: CommandInvocation) -> JoinHandle<()> {
        let env = RouteEnv {
            channels: &ctx.config.channels,
            maintenance: ctx.config.bot.maintenance,
            sender_is_admin: ctx.is_admin(&inv.sender),
        };
        let command = inv.command.keyword();
        let origin = inv.origin.clone();
        let sink = ctx.sink.clone();

        let handler = match self.route(&inv, &env) {
            Route::Handle(cmd) => self.handlers.get(&cmd),
            Route::Reject(err) => {
                warn!(command, sender = %inv.sender, kind = ?err.kind(), "command rejected");
                return tokio::spawn(async move { sink.on_error(&origin, &err).await });
            },
        };
        let Some(handler) = handler else {
            warn!(command, "no handler registered");
            return tokio::spawn(async {});
        };

        debug!(command, sender = %inv.sender, args = inv.args.len(), "dispatching command");
        let fut = handler(Arc::clone(ctx), inv);
        tokio::spawn(async move {
            let result = fut.await;
            match &result {
                Ok(ack) => debug!(command, ?ack, "command ok"),
                Err(err) => debug!(command, kind = ?err.kind(), error = %err, "command error"),
            }
            sink.finish(&origin, &result).await;
        })
    }

    fn register_defaults(&mut self) {
        for command in Command::ALL {
            self.register(CommandSpec::default_for(command), handler_for(command));
        }
    }
}

fn boxed<F, Fut>(f: F) -> HandlerFn
where
    F: Fn(Arc<CommandContext>, CommandInvocation) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Ack>> + Send + 'static,
{
    Box::new(move |ctx, inv| Box::pin(f(ctx, inv)))
}

fn handler_for(command: Command) -> HandlerFn {
    match command {
        Command::Register => boxed(student::register),
        Command::Attendance => boxed(student::attendance),
        Command::Activity => boxed(student::activity),
        Command::Participation => boxed(student::participation),
        Command::MyAbsences => boxed(student::my_absences),
        Command::MyGrades => boxed(student::my_grades),
        Command::Help => boxed(info::help),
        Command::ServerTime => boxed(info::server_time),
        Command::Today => boxed(info::today),
        Command::NewSession => boxed(admin::new_session),
        Command::NewActivity => boxed(admin::new_activity),
        Command::ManualParticipation => boxed(admin::manual_participation),
        Command::ManualAttendance => boxed(admin::manual_attendance),
        Command::ManualActivity => boxed(admin::manual_activity),
        Command::ManualActivityGrade => boxed(admin::manual_activity_grade),
        Command::ManualExamGrade => boxed(admin::manual_exam_grade),
        Command::Whois => boxed(admin::whois),
        Command::TopsBottoms => boxed(reports::tops_bottoms),
        Command::Summary => boxed(reports::summary),
        Command::GradesOf => boxed(reports::grades_of),
        Command::ExportReport => boxed(reports::export_report),
        Command::InClassQuiz => boxed(quiz::in_class_quiz),
        Command::SendRandomMessage => boxed(quiz::send_random_message),
    }
}
