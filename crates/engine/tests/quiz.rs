#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use std::time::Duration;

use {
    aula_channels::OutboundCall,
    aula_common::{ChannelId, MessageRef},
    aula_store::ClassroomData,
    common::{GENERAL, Harness, TEACHER, config, today},
};

const QUIZ: &str = r#"-in-class-quiz ["Quiz1","today","2","Capital de Francia?|🅰️ 🅱️|🅰️"]"#;

async fn harness(users: &[(&str, &str)]) -> Harness {
    let ids: Vec<&str> = users.iter().map(|(id, _)| *id).collect();
    let data = ClassroomData {
        students: Harness::students(&ids),
        ..ClassroomData::default()
    };
    let h = Harness::new(config(), data).await;
    for (id, name) in users {
        h.online(id, name);
    }
    h
}

/// Wait for the announcement in `user`'s DM and acknowledge it.
async fn acknowledge(h: &Harness, user: &str) {
    let dm = format!("dm-{user}");
    let announcement = h
        .message_in(&dm, |t| t.starts_with("Comenzó el Quiz Quiz1!"))
        .await;
    // The last ack option is added after the listener is in place.
    h.reaction_on(&announcement, "🦖").await;
    h.react(user, &announcement, "✅");
}

fn edits_of(h: &Harness, message: &MessageRef) -> usize {
    h.transport
        .calls()
        .iter()
        .filter(|c| matches!(c, OutboundCall::Edit { message: m, .. } if m == message))
        .count()
}

#[tokio::test(start_paused = true)]
async fn concurrent_sessions_keep_independent_tallies() {
    let h = harness(&[("u1", "Ana"), ("u2", "Beto")]).await;

    let origin = h.run(TEACHER, GENERAL, QUIZ).await;
    assert_eq!(h.transport.reactions_on(&origin), vec!["✅".to_string()]);
    assert!(
        h.transport
            .texts_in(&ChannelId::new(GENERAL))
            .contains(&"Initializing Quiz for:\nAna\nBeto".to_string())
    );

    acknowledge(&h, "u1").await;
    acknowledge(&h, "u2").await;

    let question = h
        .message_in("dm-u1", |t| t.contains("Pregunta 1/1 | Tiempo: ->30<-"))
        .await;
    h.reaction_on(&question, "🅱️").await;
    tokio::time::sleep(Duration::from_secs(2)).await;
    h.react("u1", &question, "🅰️");

    h.message_in(GENERAL, |t| t == "Ana -> 1/1 -> 2 participaciones")
        .await;
    h.message_in(GENERAL, |t| t == "Beto -> 0/1 -> 0 participaciones")
        .await;

    let ana = h.student("u1");
    assert_eq!(ana.participations.len(), 2);
    assert!(ana.participations.iter().all(|p| p.date == today()));
    assert!(h.student("u2").participations.is_empty());

    let ana_dm = h.transport.texts_in(&ChannelId::new("dm-u1"));
    assert!(ana_dm.contains(&"Respuesta correcta!".to_string()));
    assert!(ana_dm.contains(&"2 participaciones han sido agregadas para hoy! ✅".to_string()));
    let beto_dm = h.transport.texts_in(&ChannelId::new("dm-u2"));
    assert!(beto_dm.contains(&"Timeout!\nLa respuesta correcta es: 🅰️".to_string()));
    assert!(
        !beto_dm
            .iter()
            .any(|t| t.contains("participaciones han sido agregadas"))
    );

    // Tickers stop with their question.
    let edits = edits_of(&h, &question);
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(edits_of(&h, &question), edits);
    assert_eq!(h.engine.context().quizzes.active_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn wrong_answer_earns_nothing() {
    let h = harness(&[("u1", "Ana")]).await;
    h.run(TEACHER, GENERAL, QUIZ).await;
    acknowledge(&h, "u1").await;

    let question = h.message_in("dm-u1", |t| t.contains("Pregunta 1/1")).await;
    h.reaction_on(&question, "🅱️").await;
    h.react("u1", &question, "🅱️");
    // A second answer after resolution is ignored.
    h.react("u1", &question, "🅰️");

    h.message_in(GENERAL, |t| t == "Ana -> 0/1 -> 0 participaciones")
        .await;
    let dm = h.transport.texts_in(&ChannelId::new("dm-u1"));
    assert!(dm.contains(&"Respuesta incorrecta!\nLa respuesta correcta es: 🅰️".to_string()));
    assert!(h.student("u1").participations.is_empty());
}

#[tokio::test(start_paused = true)]
async fn failed_credit_keeps_earlier_credits_and_reports_to_origin() {
    let h = harness(&[("u1", "Ana")]).await;
    h.store.fail_after("record_participation", 1);

    let origin = h.run(TEACHER, GENERAL, QUIZ).await;
    acknowledge(&h, "u1").await;
    let question = h.message_in("dm-u1", |t| t.contains("Pregunta 1/1")).await;
    h.reaction_on(&question, "🅱️").await;
    h.react("u1", &question, "🅰️");

    h.message_in(GENERAL, |t| {
        t == "Error! error de almacenamiento: record_participation failed"
    })
    .await;
    h.reaction_on(&origin, "❌").await;

    // The first of the two credits stays; nothing is rolled back.
    assert_eq!(h.student("u1").participations.len(), 1);
    let general = h.transport.texts_in(&ChannelId::new(GENERAL));
    assert!(!general.iter().any(|t| t.starts_with("Ana -> ")));
    let dm = h.transport.texts_in(&ChannelId::new("dm-u1"));
    assert!(!dm.iter().any(|t| t.contains("participaciones han sido agregadas")));
    assert_eq!(h.engine.context().quizzes.active_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn failing_ticker_edits_do_not_hold_up_the_question() {
    let h = harness(&[("u1", "Ana")]).await;
    h.transport.fail("edit_message");

    h.run(TEACHER, GENERAL, QUIZ).await;
    acknowledge(&h, "u1").await;
    let question = h.message_in("dm-u1", |t| t.contains("Pregunta 1/1")).await;

    h.message_in(GENERAL, |t| t == "Ana -> 0/1 -> 0 participaciones")
        .await;
    assert_eq!(edits_of(&h, &question), 0);
    let dm = h.transport.texts_in(&ChannelId::new("dm-u1"));
    assert!(dm.contains(&"Timeout!\nLa respuesta correcta es: 🅰️".to_string()));
    assert_eq!(h.engine.context().quizzes.active_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn student_already_in_a_quiz_is_not_restarted() {
    let h = harness(&[("u1", "Ana")]).await;
    h.run(TEACHER, GENERAL, QUIZ).await;
    h.message_in("dm-u1", |t| t.starts_with("Comenzó el Quiz")).await;

    h.run(TEACHER, GENERAL, QUIZ).await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    let announcements = h
        .transport
        .texts_in(&ChannelId::new("dm-u1"))
        .into_iter()
        .filter(|t| t.starts_with("Comenzó el Quiz"))
        .count();
    assert_eq!(announcements, 1);
    assert_eq!(h.engine.context().quizzes.active_count(), 1);
}

#[tokio::test]
async fn quiz_without_online_students_fails() {
    let h = harness(&[]).await;

    let origin = h.run(TEACHER, GENERAL, QUIZ).await;

    assert_eq!(h.transport.texts_in(&ChannelId::new(GENERAL)), vec![
        "Error! Quiz error! No students online to start the quiz!".to_string()
    ]);
    assert_eq!(h.transport.reactions_on(&origin), vec!["❌".to_string()]);
}

#[tokio::test]
async fn random_messages_reach_every_online_student() {
    let h = harness(&[("u1", "Ana"), ("u2", "Beto")]).await;

    let origin = h
        .run(TEACHER, GENERAL, "-send-random-message hola buenas")
        .await;
    assert_eq!(h.transport.reactions_on(&origin), vec!["✅".to_string()]);

    for user in ["u1", "u2"] {
        let dm = ChannelId::new(format!("dm-{user}"));
        let call = h
            .transport
            .wait_for(|c| matches!(c, OutboundCall::Message { .. }) && c.channel() == &dm)
            .await;
        let text = call.text().unwrap();
        assert!(text == "hola" || text == "buenas");
    }
}
