//! The event loop: one inbound event at a time, classified and handed off.
//!
//! Nothing here awaits a handler. Commands run on their own tasks and
//! reactions are fanned out through the bus, so the loop is ready for the
//! next event as soon as the current one is routed.

use std::sync::Arc;

use {
    aula_channels::InboundEvent,
    aula_config::AulaConfig,
    aula_cron::CronService,
    tokio::{sync::mpsc, task::JoinHandle},
    tracing::{debug, info, trace, warn},
};

use crate::{
    broadcasts::{self, Broadcast},
    classify::{Intent, classify},
    context::{Collaborators, CommandContext},
    registry::CommandRegistry,
};

pub struct Engine {
    ctx: Arc<CommandContext>,
    registry: CommandRegistry,
    lanes: Vec<JoinHandle<()>>,
    scheduler: Option<Arc<CronService<Broadcast>>>,
}

impl Engine {
    pub fn new(config: Arc<AulaConfig>, collaborators: Collaborators) -> Self {
        let reports_dir = config.reports.dir.clone();
        let mut ctx = CommandContext::new(config, collaborators);
        if let Some(dir) = reports_dir {
            ctx = ctx.with_reports_dir(dir);
        }
        Self::with_context(ctx, CommandRegistry::new())
    }

    /// Build around an already wired context and registry.
    pub fn with_context(ctx: CommandContext, registry: CommandRegistry) -> Self {
        Self {
            ctx: Arc::new(ctx),
            registry,
            lanes: Vec::new(),
            scheduler: None,
        }
    }

    pub fn context(&self) -> &Arc<CommandContext> {
        &self.ctx
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    /// Start the approval lanes and, when enabled, the broadcast scheduler.
    /// A scheduler that fails to start is logged and left off.
    pub async fn start(&mut self) {
        if self.lanes.is_empty() {
            self.lanes = self.ctx.approvals.start(&self.ctx.bus);
        }
        if self.scheduler.is_none() {
            match broadcasts::start_scheduler(&self.ctx).await {
                Ok(scheduler) => self.scheduler = scheduler,
                Err(e) => warn!(error = %e, "failed to start broadcast scheduler"),
            }
        }
        info!(
            commands = self.registry.specs().len(),
            prefix = %self.ctx.config.bot.prefix,
            maintenance = self.ctx.config.bot.maintenance,
            "engine started"
        );
    }

    /// Route one event. Returns the command task when one was spawned.
    pub fn handle_event(&self, event: &InboundEvent) -> Option<JoinHandle<()>> {
        match classify(self.ctx.config.bot.prefix, event) {
            Intent::Command(inv) => Some(self.registry.dispatch(&self.ctx, inv)),
            Intent::Gesture(gesture) => {
                let delivered = self.ctx.bus.publish(&gesture);
                trace!(emoji = %gesture.emoji, actor = %gesture.actor, delivered, "gesture published");
                None
            },
            Intent::Ignored => None,
        }
    }

    /// Serve events until the channel closes.
    pub async fn run(&mut self, mut events: mpsc::Receiver<InboundEvent>) {
        self.start().await;
        while let Some(event) = events.recv().await {
            let _ = self.handle_event(&event);
        }
        debug!("event stream closed");
        self.shutdown().await;
    }

    pub async fn shutdown(&mut self) {
        for lane in self.lanes.drain(..) {
            lane.abort();
        }
        if let Some(scheduler) = self.scheduler.take() {
            scheduler.stop().await;
        }
        info!(
            pending_approvals = self.ctx.approvals.pending_count(),
            active_quizzes = self.ctx.quizzes.active_count(),
            "engine stopped"
        );
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        for lane in &self.lanes {
            lane.abort();
        }
    }
}
