#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use {
    aula_channels::{InMemoryTransport, OutboundCall},
    aula_common::{ChannelId, UserId},
    aula_store::ClassroomData,
    chrono::{TimeZone, Utc},
    common::{GENERAL, Harness, TEACHER, config, session, today},
};

fn class_with(users: &[&str]) -> ClassroomData {
    ClassroomData {
        students: Harness::students(users),
        sessions: vec![session("A1B2")],
        activities: Vec::new(),
    }
}

#[tokio::test]
async fn attendance_with_the_right_code_is_recorded() {
    let h = Harness::new(config(), class_with(&["u1"])).await;
    h.online("u1", "Ana");

    let origin = h.run("u1", "attendance", "-attendance A1B2").await;

    assert_eq!(h.transport.reactions_on(&origin), vec!["✅".to_string()]);
    assert_eq!(h.student("u1").attendance, vec![today()]);
    let snapshot = h.store.snapshot();
    assert_eq!(snapshot.session(today()).unwrap().attendance, vec!["A001".to_string()]);
}

#[tokio::test]
async fn a_failed_store_write_does_not_stop_the_loop() {
    let h = Harness::new(config(), class_with(&["u1", "u2"])).await;
    h.online("u1", "Ana");
    h.online("u2", "Beto");
    h.store.fail_after("record_attendance", 0);

    let failed = h.run("u1", "attendance", "-attendance A1B2").await;
    assert_eq!(h.transport.texts_in(&ChannelId::new("attendance")), vec![
        "Error! error de almacenamiento: record_attendance failed".to_string()
    ]);
    assert_eq!(h.transport.reactions_on(&failed), vec!["❌".to_string()]);

    let help = h.run("u2", GENERAL, "-help").await;
    assert_eq!(h.transport.reactions_on(&help), vec!["👍".to_string()]);
    h.run(TEACHER, GENERAL, "-whois u2").await;
    assert!(
        h.transport
            .texts_in(&ChannelId::new(GENERAL))
            .contains(&"A002 - Beto".to_string())
    );
}

#[tokio::test]
async fn attendance_with_a_wrong_code_is_rejected() {
    let h = Harness::new(config(), class_with(&["u1"])).await;
    h.online("u1", "Ana");

    let origin = h.run("u1", "attendance", "-attendance ZZZZ").await;

    assert_eq!(h.transport.texts_in(&ChannelId::new("attendance")), vec![
        "Error! Codigo de asistencia invalido.".to_string()
    ]);
    assert_eq!(h.transport.reactions_on(&origin), vec!["❌".to_string()]);
    assert!(h.student("u1").attendance.is_empty());
}

#[tokio::test]
async fn attendance_after_the_window_is_rejected() {
    let h = Harness::new(config(), class_with(&["u1"])).await;
    h.online("u1", "Ana");
    h.clock.set(Utc.with_ymd_and_hms(2021, 9, 6, 8, 0, 0).unwrap());

    let origin = h.run("u1", "attendance", "-attendance A1B2").await;

    assert_eq!(h.transport.reactions_on(&origin), vec!["❌".to_string()]);
    assert!(h.student("u1").attendance.is_empty());
}

#[tokio::test]
async fn attendance_needs_a_desktop_presence() {
    let h = Harness::new(config(), class_with(&["u1"])).await;

    let origin = h.run("u1", "attendance", "-attendance A1B2").await;

    let texts = h.transport.texts_in(&ChannelId::new("attendance"));
    assert!(texts[0].starts_with("Error! El comando no pudo registrarse"));
    assert_eq!(h.transport.reactions_on(&origin), vec!["❌".to_string()]);
}

#[tokio::test]
async fn non_admin_never_reaches_admin_handlers() {
    let h = Harness::new(config(), class_with(&["u1"])).await;

    let origin = h.run("u1", GENERAL, "-summary").await;

    assert_eq!(h.transport.texts_in(&ChannelId::new(GENERAL)), vec![
        "Error! No autorizado! Este comando es solo para el docente.".to_string()
    ]);
    assert_eq!(h.transport.reactions_on(&origin), vec!["❌".to_string()]);
}

#[tokio::test]
async fn channel_bound_command_in_the_wrong_channel() {
    let h = Harness::new(config(), class_with(&["u1"])).await;
    h.online("u1", "Ana");

    h.run("u1", GENERAL, "-attendance A1B2").await;

    assert_eq!(h.transport.texts_in(&ChannelId::new(GENERAL)), vec![
        "Error! Este comando no está disponible en este canal.".to_string()
    ]);
    assert!(h.student("u1").attendance.is_empty());
}

#[tokio::test]
async fn plain_text_and_unknown_keywords_are_ignored() {
    let h = Harness::new(config(), class_with(&["u1"])).await;

    assert!(h.say("u1", GENERAL, "hola a todos").1.is_none());
    assert!(h.say("u1", GENERAL, "-").1.is_none());
    assert!(h.say("u1", GENERAL, "-bailar").1.is_none());
    assert!(h.transport.calls().is_empty());
}

#[tokio::test]
async fn maintenance_blocks_students_except_help() {
    let mut cfg = config();
    cfg.bot.maintenance = true;
    let h = Harness::new(cfg, class_with(&["u1"])).await;
    h.online("u1", "Ana");

    let blocked = h.run("u1", "attendance", "-attendance A1B2").await;
    assert_eq!(h.transport.texts_in(&ChannelId::new("attendance")), vec![
        "Error! El bot está en mantenimiento, intenta más tarde.".to_string()
    ]);
    assert_eq!(h.transport.reactions_on(&blocked), vec!["❌".to_string()]);
    assert!(h.student("u1").attendance.is_empty());

    let help = h.run("u1", GENERAL, "-help").await;
    assert_eq!(h.transport.reactions_on(&help), vec!["👍".to_string()]);

    let summary = h.run(TEACHER, GENERAL, "-summary").await;
    assert_eq!(h.transport.reactions_on(&summary), vec!["✅".to_string()]);
}

#[tokio::test]
async fn teacher_creates_a_session_and_records_by_hand() {
    let data = ClassroomData {
        students: Harness::students(&["u1"]),
        ..ClassroomData::default()
    };
    let h = Harness::new(config(), data).await;
    h.online("u1", "Ana");

    let origin = h
        .run(TEACHER, GENERAL, "-new-session Intro today A1B2 Slides|http://slides")
        .await;
    assert_eq!(h.transport.reactions_on(&origin), vec!["✅".to_string()]);
    let created = h.store.snapshot().session(today()).cloned().unwrap();
    assert_eq!(created.attendance_code, "A1B2");
    assert_eq!(created.resources[0].name, "Slides");

    h.run(TEACHER, GENERAL, "-manual-participation <@u1> today")
        .await;
    assert_eq!(h.student("u1").participations.len(), 1);
    let dm = InMemoryTransport::dm_channel_id(&UserId::new("u1"));
    assert_eq!(h.transport.texts_in(&dm), vec![
        "Una participacion ha sido agregada para la sesión: 2021-09-06".to_string()
    ]);
    assert!(
        h.transport
            .texts_in(&ChannelId::new(GENERAL))
            .contains(&"Confirmacion: Ana -> 2021-09-06".to_string())
    );

    h.run(TEACHER, GENERAL, "-whois u1").await;
    assert!(
        h.transport
            .texts_in(&ChannelId::new(GENERAL))
            .contains(&"A001 - Ana".to_string())
    );
}

#[tokio::test]
async fn grades_report_is_uploaded_and_written() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = config();
    cfg.reports.dir = Some(dir.path().display().to_string());
    let h = Harness::new(cfg, class_with(&["u1"])).await;
    h.online("u1", "Ana Perez");

    let origin = h.run(TEACHER, GENERAL, "-grades-of u1").await;
    assert_eq!(h.transport.reactions_on(&origin), vec!["✅".to_string()]);

    let file = h
        .transport
        .calls()
        .into_iter()
        .find_map(|call| match call {
            OutboundCall::File {
                text,
                file_name,
                bytes,
                ..
            } => Some((text, file_name, bytes)),
            _ => None,
        })
        .unwrap();
    assert!(file.0.starts_with("Summary report for Ana Perez"));
    assert!(file.1.starts_with("grades_report_Ana_Perez_"));
    let body = String::from_utf8(file.2).unwrap();
    assert!(body.starts_with("Ana Perez\n"));

    let on_disk = std::fs::read_to_string(dir.path().join(&file.1)).unwrap();
    assert_eq!(on_disk, body);
}

#[tokio::test]
async fn grades_of_an_unregistered_user_fails() {
    let h = Harness::new(config(), class_with(&["u1"])).await;

    let origin = h.run(TEACHER, GENERAL, "-grades-of u9").await;

    assert_eq!(h.transport.reactions_on(&origin), vec!["❌".to_string()]);
    assert!(
        !h.transport
            .calls()
            .iter()
            .any(|c| matches!(c, OutboundCall::File { .. }))
    );
}
