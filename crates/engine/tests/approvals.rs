#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use std::time::Duration;

use {
    aula_channels::OutboundCall,
    aula_common::{ChannelId, MessageRef},
    aula_store::{Activity, ClassroomData},
    chrono::{TimeZone, Utc},
    common::{Harness, TEACHER, config, session, today},
};

async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    tokio::time::sleep(Duration::from_millis(20)).await;
}

async fn harness() -> Harness {
    let data = ClassroomData {
        students: Harness::students(&["u1"]),
        sessions: vec![session("A1B2")],
        activities: Vec::new(),
    };
    let h = Harness::new(config(), data).await;
    h.online("u1", "Ana");
    h
}

#[tokio::test]
async fn participation_request_is_credited_once() {
    let h = harness().await;

    let bid = h.run("u1", "participations", "-participation").await;
    assert_eq!(h.transport.reactions_on(&bid), vec!["💬".to_string()]);
    assert!(h.engine.context().approvals.is_pending(&bid.message_id));

    // Double click: both gestures race for the same pending entry.
    h.react(TEACHER, &bid, "✅");
    h.react(TEACHER, &bid, "✅");
    h.reaction_on(&bid, "✅").await;
    settle().await;

    assert_eq!(h.student("u1").participations.len(), 1);
    assert_eq!(h.engine.context().approvals.pending_count(), 0);
    let successes = h
        .transport
        .reactions_on(&bid)
        .into_iter()
        .filter(|e| e == "✅")
        .count();
    assert_eq!(successes, 1);
}

#[tokio::test]
async fn only_the_teacher_can_approve() {
    let h = harness().await;
    let bid = h.run("u1", "participations", "-participation").await;

    h.react("u1", &bid, "✅");
    h.react("u2", &bid, "✅");
    settle().await;

    assert!(h.student("u1").participations.is_empty());
    assert!(h.engine.context().approvals.is_pending(&bid.message_id));
}

#[tokio::test]
async fn gesture_on_an_unknown_message_is_a_no_op() {
    let h = harness().await;
    let before = h.transport.calls().len();

    h.react(TEACHER, &MessageRef::new("participations", "nobody"), "✅");
    settle().await;

    assert!(h.student("u1").participations.is_empty());
    assert_eq!(h.transport.calls().len(), before);
}

#[tokio::test]
async fn participation_outside_class_is_not_registered() {
    let h = harness().await;
    h.clock.set(Utc.with_ymd_and_hms(2021, 9, 6, 10, 0, 0).unwrap());

    let bid = h.run("u1", "participations", "-participation").await;

    assert_eq!(h.transport.reactions_on(&bid), vec!["❌".to_string()]);
    assert_eq!(h.engine.context().approvals.pending_count(), 0);
}

#[tokio::test]
async fn presented_activity_is_graded_by_gesture() {
    let data = ClassroomData {
        students: Harness::students(&["u1"]),
        sessions: vec![session("A1B2")],
        activities: vec![Activity {
            name: "Tarea 1".into(),
            date: today(),
            optional: false,
            resources: Vec::new(),
        }],
    };
    let h = Harness::new(config(), data).await;
    h.clock.set(Utc.with_ymd_and_hms(2021, 9, 6, 10, 0, 0).unwrap());

    let origin = h.run("u1", "dm-u1", "-activity https://repo/tarea1").await;
    assert_eq!(h.transport.reactions_on(&origin), vec!["✅".to_string()]);
    assert_eq!(h.student("u1").activities[0].presentation, "https://repo/tarea1");

    let posted = h
        .transport
        .calls_in(&ChannelId::new("presented"))
        .into_iter()
        .find_map(|call| match call {
            OutboundCall::Embed { message, .. } => Some(message),
            _ => None,
        })
        .unwrap();

    // Wrong lane: the approve gesture means nothing on a presented activity.
    h.react(TEACHER, &posted, "✅");
    settle().await;
    assert!(h.student("u1").grade_for(today()).is_none());

    h.react(TEACHER, &posted, "🔟");
    h.reaction_on(&posted, "✅").await;
    assert_eq!(h.student("u1").grade_for(today()), Some(10.0));

    // A second activity from the same student conflicts.
    let again = h.run("u1", "dm-u1", "-activity otra").await;
    assert_eq!(h.transport.reactions_on(&again), vec!["❌".to_string()]);
}
