//! Class-wide tables and per-student report files.

use std::sync::Arc;

use {
    aula_store::{ClassSession, Student},
    tracing::{info, warn},
};

use super::{require_args, user_arg};
use crate::{
    classify::CommandInvocation,
    context::CommandContext,
    error::{CommandError, Result},
    grades::{self, Partial},
    report::{self, StudentReport, StudentSummary},
    sink::Ack,
};

const DEFAULT_TOPS: usize = 3;
const SECTION_GAP: &str = "\n\n\n\n";

async fn class_rows(ctx: &CommandContext) -> Result<(Vec<Student>, Vec<StudentSummary>)> {
    let students = ctx.store.list_users().await?;
    let held = grades::sessions_until(ctx.store.list_sessions().await?, ctx.today()).len();
    let rows = students
        .iter()
        .map(|s| StudentSummary::new(s, ctx.name_of(&s.discord_id), held))
        .collect();
    Ok((students, rows))
}

pub async fn summary(ctx: Arc<CommandContext>, inv: CommandInvocation) -> Result<Ack> {
    let (_, rows) = class_rows(&ctx).await?;
    let (table, averages) = report::summary_tables(&rows);
    ctx.reply(&inv, &table).await?;
    ctx.reply(&inv, &averages).await?;
    Ok(Ack::Success)
}

/// `[n]`
pub async fn tops_bottoms(ctx: Arc<CommandContext>, inv: CommandInvocation) -> Result<Ack> {
    let n = match inv.args.first() {
        Some(raw) => raw
            .parse::<usize>()
            .map_err(|_| CommandError::validation(format!("Numero invalido: {raw}")))?,
        None => DEFAULT_TOPS,
    };
    let (_, rows) = class_rows(&ctx).await?;
    ctx.reply(&inv, &report::tops_bottoms(&rows, n)).await?;
    Ok(Ack::Success)
}

struct ReportInputs {
    sessions: Vec<ClassSession>,
    activities: Vec<aula_store::Activity>,
    partials: Vec<Partial>,
    generated_at: String,
}

impl ReportInputs {
    async fn load(ctx: &CommandContext) -> Result<Self> {
        Ok(Self {
            sessions: grades::sessions_until(ctx.store.list_sessions().await?, ctx.today()),
            activities: ctx.store.list_activities().await?,
            partials: Partial::from_config(&ctx.config.partials),
            generated_at: ctx.clock.local_now().format("%Y-%m-%d %H:%M").to_string(),
        })
    }

    fn render(&self, ctx: &CommandContext, name: &str, student: &Student) -> String {
        StudentReport {
            name,
            generated_at: &self.generated_at,
            student,
            sessions: &self.sessions,
            activities: &self.activities,
            partials: &self.partials,
            today: ctx.today(),
        }
        .render()
    }
}

fn timestamp(ctx: &CommandContext) -> String {
    ctx.clock.local_now().format("%Y%m%d%H%M%S").to_string()
}

/// Upload the report and keep a copy in the reports directory when one is
/// configured. A failed disk copy is only logged.
async fn deliver(
    ctx: &CommandContext,
    inv: &CommandInvocation,
    text: &str,
    file_name: &str,
    body: String,
) -> Result<()> {
    if let Some(dir) = &ctx.reports_dir {
        let path = dir.join(file_name);
        let written = async {
            tokio::fs::create_dir_all(dir).await?;
            tokio::fs::write(&path, body.as_bytes()).await
        }
        .await;
        match written {
            Ok(()) => info!(path = %path.display(), "report written"),
            Err(e) => warn!(path = %path.display(), error = %e, "failed to write report"),
        }
    }
    ctx.transport
        .send_file(&inv.channel.channel_id, text, file_name, body.into_bytes())
        .await?;
    Ok(())
}

/// `user`
pub async fn grades_of(ctx: Arc<CommandContext>, inv: CommandInvocation) -> Result<Ack> {
    require_args(&inv, 1)?;
    let user = user_arg(&inv.args[0]);
    let student = ctx
        .store
        .get_user(&user)
        .await?
        .ok_or_else(|| CommandError::from(aula_store::Error::not_registered(&user)))?;
    let name = ctx.name_of(&user);
    let inputs = ReportInputs::load(&ctx).await?;
    let body = inputs.render(&ctx, &name, &student);

    let file_name = format!(
        "grades_report_{}_{}.txt",
        report::file_stem(&name),
        timestamp(&ctx)
    );
    let text = format!("Summary report for {name} {}", inputs.generated_at);
    deliver(&ctx, &inv, &text, &file_name, body).await?;
    Ok(Ack::Success)
}

pub async fn export_report(ctx: Arc<CommandContext>, inv: CommandInvocation) -> Result<Ack> {
    let (students, rows) = class_rows(&ctx).await?;
    let inputs = ReportInputs::load(&ctx).await?;
    let (table, averages) = report::summary_tables(&rows);

    let mut sections = vec![format!("GRADES REPORT EXPORT FOR {}", ctx.today()), table, averages];
    for (student, row) in students.iter().zip(&rows) {
        sections.push(inputs.render(&ctx, &row.name, student));
    }
    let body = sections.join(SECTION_GAP);

    let file_name = format!("grades_report_export_{}.txt", timestamp(&ctx));
    let text = format!("Summary report to date {}", inputs.generated_at);
    deliver(&ctx, &inv, &text, &file_name, body).await?;
    info!(students = students.len(), "report exported");
    Ok(Ack::Success)
}
