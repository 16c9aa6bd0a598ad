//! Teacher-driven fan-out to every online student.

use std::sync::Arc;

use {
    rand::seq::IndexedRandom,
    tracing::{info, warn},
};

use super::require_args;
use crate::{
    classify::CommandInvocation,
    context::CommandContext,
    dates::parse_date_arg,
    error::{CommandError, Result},
    quiz::{QuizPlan, QuizQuestion},
    sink::Ack,
};

/// Parse `name date max_participations question...`.
pub fn parse_plan(args: &[String], today: chrono::NaiveDate) -> Result<QuizPlan> {
    let [name, date, max, questions @ ..] = args else {
        return Err(CommandError::missing_arguments());
    };
    if questions.is_empty() {
        return Err(CommandError::missing_arguments());
    }
    let max_participations = max
        .trim()
        .parse::<u32>()
        .map_err(|_| CommandError::quiz(format!("maximo de participaciones invalido: {max}")))?;
    let questions = questions
        .iter()
        .enumerate()
        .map(|(i, raw)| QuizQuestion::parse(i + 1, raw))
        .collect::<Result<Vec<_>>>()?;
    Ok(QuizPlan {
        name: name.clone(),
        date: parse_date_arg(date, today)?,
        max_participations,
        questions,
    })
}

/// `name date max_participations question...`
pub async fn in_class_quiz(ctx: Arc<CommandContext>, inv: CommandInvocation) -> Result<Ack> {
    let plan = Arc::new(parse_plan(&inv.args, ctx.today())?);
    let students = ctx.online_students();
    if students.is_empty() {
        return Err(CommandError::quiz("No students online to start the quiz!"));
    }

    let started = ctx
        .quizzes
        .start(&ctx, Arc::clone(&plan), &inv.origin, &students);
    info!(
        quiz = %plan.name,
        questions = plan.questions.len(),
        students = started.len(),
        "quiz started"
    );

    let names: Vec<String> = students.iter().map(|s| ctx.name_of(s)).collect();
    ctx.reply(&inv, &format!("Initializing Quiz for:\n{}", names.join("\n")))
        .await?;
    Ok(Ack::Success)
}

/// `message...`, one picked at random per student.
pub async fn send_random_message(ctx: Arc<CommandContext>, inv: CommandInvocation) -> Result<Ack> {
    require_args(&inv, 1)?;
    let students = ctx.online_students();
    if students.is_empty() {
        return Err(CommandError::quiz("No students online to send messages!"));
    }

    let picks: Vec<(_, String)> = {
        let mut rng = rand::rng();
        students
            .iter()
            .map(|s| {
                let text = inv.args.choose(&mut rng).cloned().unwrap_or_default();
                (s.clone(), text)
            })
            .collect()
    };
    for (student, text) in picks {
        let ctx = Arc::clone(&ctx);
        tokio::spawn(async move {
            if let Err(e) = ctx.dm(&student, &text).await {
                warn!(user = %student, error = %e, "failed to send random message");
            }
        });
    }

    let names: Vec<String> = students.iter().map(|s| ctx.name_of(s)).collect();
    ctx.reply(&inv, &format!("Sent messages to:\n{}", names.join("\n")))
        .await?;
    Ok(Ack::Success)
}
