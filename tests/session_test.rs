//! Upload → detect pipeline behaviour of a detection session.

mod common;

use common::*;
use seawatch::errors::SeawatchError;
use seawatch::models::ClassLabel;
use seawatch::session::{DetectionSession, SessionStatus, run_pipeline};
use std::collections::BTreeSet;
use std::sync::Mutex;
use std::time::Duration;

fn session_with_file() -> DetectionSession {
    let mut session = DetectionSession::new(locator());
    session.select_file(png_file("harbour.png")).unwrap();
    session
}

#[tokio::test]
async fn failed_upload_keeps_the_file_for_a_retry() {
    let api = FakeApi::new();
    api.push_upload(Err(SeawatchError::Upload("503".to_string())));
    let mut session = session_with_file();

    let status = session.run(&api, &ClassLabel::all()).await.unwrap();

    assert_eq!(status, SessionStatus::Failed);
    assert!(session.error().unwrap().contains("503"));
    assert_eq!(session.file().unwrap().name, "harbour.png");
    assert_eq!(api.detect_count(), 0, "detect must not follow a failed upload");

    api.push_upload(Ok("img-1.png".to_string()));
    api.push_detect(Ok(detect_response("7", "out-1.png", &[ClassLabel::Liner])));

    let status = session.run(&api, &ClassLabel::all()).await.unwrap();
    assert_eq!(status, SessionStatus::Ready);
    assert!(session.error().is_none());
    assert_eq!(api.upload_count(), 2);
}

#[tokio::test]
async fn successful_run_derives_image_urls_from_both_keys() {
    let api = FakeApi::new();
    api.push_upload(Ok("img-1.png".to_string()));
    api.push_detect(Ok(detect_response(
        "7",
        "out-1.png",
        &[ClassLabel::Liner, ClassLabel::Yacht, ClassLabel::Liner],
    )));
    let mut session = session_with_file();

    let status = session.run(&api, &ClassLabel::all()).await.unwrap();
    assert_eq!(status, SessionStatus::Ready);

    let result = session.result().unwrap();
    assert_eq!(result.detection_id, "7");
    assert_eq!(result.object_count, 3);
    assert_eq!(
        result.original_image_url,
        "http://localhost:9000/detections/img-1.png"
    );
    assert_eq!(
        result.processed_image_url,
        "http://localhost:9000/detections/out-1.png"
    );
    assert_eq!(result.count_by_class()[&ClassLabel::Liner], 2);
    assert_eq!(session.uploaded_key(), Some("img-1.png"));
}

#[tokio::test]
async fn failed_detection_ends_in_failed() {
    let api = FakeApi::new();
    api.push_upload(Ok("img-1.png".to_string()));
    api.push_detect(Err(SeawatchError::Detect("model crashed".to_string())));
    let mut session = session_with_file();

    let status = session.run(&api, &ClassLabel::all()).await.unwrap();

    assert_eq!(status, SessionStatus::Failed);
    assert!(session.result().is_none());
    assert!(session.file().is_some());
}

#[tokio::test]
async fn full_class_set_is_sent_explicitly() {
    let api = FakeApi::new();
    api.push_upload(Ok("img-1.png".to_string()));
    api.push_detect(Ok(detect_response("1", "out.png", &[])));
    let mut session = session_with_file();

    session.run(&api, &ClassLabel::all()).await.unwrap();

    let calls = api.detect_calls.lock().unwrap();
    assert_eq!(calls[0].0, "img-1.png");
    assert_eq!(calls[0].1, ClassLabel::ALL.to_vec());
}

#[tokio::test]
async fn empty_class_selection_is_still_sent() {
    let api = FakeApi::new();
    api.push_upload(Ok("img-1.png".to_string()));
    api.push_detect(Ok(detect_response("1", "out.png", &[])));
    let mut session = session_with_file();

    session.run(&api, &BTreeSet::new()).await.unwrap();

    assert!(api.detect_calls.lock().unwrap()[0].1.is_empty());
}

#[tokio::test]
async fn running_without_a_file_is_rejected() {
    let api = FakeApi::new();
    let mut session = DetectionSession::new(locator());

    let err = session.run(&api, &ClassLabel::all()).await.unwrap_err();

    assert!(matches!(err, SeawatchError::NoFileSelected));
    assert_eq!(session.status(), SessionStatus::Idle);
    assert_eq!(api.upload_count(), 0);
}

#[test]
fn second_run_while_uploading_is_rejected() {
    let mut session = session_with_file();
    let _upload = session.begin_run(&ClassLabel::all()).unwrap();

    assert!(matches!(
        session.begin_run(&ClassLabel::all()),
        Err(SeawatchError::AlreadyRunning)
    ));
    assert!(matches!(
        session.select_file(png_file("other.png")),
        Err(SeawatchError::InvalidTransition { .. })
    ));
    assert_eq!(session.status(), SessionStatus::Uploading);
    assert_eq!(session.file().unwrap().name, "harbour.png");
}

#[tokio::test]
async fn ready_session_needs_a_new_file_before_running_again() {
    let api = FakeApi::new();
    api.push_upload(Ok("img-1.png".to_string()));
    api.push_detect(Ok(detect_response("1", "out.png", &[])));
    let mut session = session_with_file();
    session.run(&api, &ClassLabel::all()).await.unwrap();

    assert!(matches!(
        session.begin_run(&ClassLabel::all()),
        Err(SeawatchError::InvalidTransition { .. })
    ));

    session.select_file(png_file("second.png")).unwrap();
    assert_eq!(session.status(), SessionStatus::FileSelected);
    assert!(session.result().is_none());
    assert!(session.uploaded_key().is_none());
}

#[test]
fn upload_result_after_reset_is_dropped() {
    let mut session = session_with_file();
    let old_id = session.id();
    let upload = session.begin_run(&ClassLabel::all()).unwrap();

    session.reset();
    assert_ne!(session.id(), old_id);

    let next = session
        .finish_upload(upload, Ok("img-1.png".to_string()))
        .unwrap();
    assert!(next.is_none());
    assert_eq!(session.status(), SessionStatus::Idle);
    assert!(session.uploaded_key().is_none());
    assert!(session.file().is_none());
}

#[test]
fn detect_result_for_a_newer_file_is_dropped() {
    let mut session = session_with_file();
    let upload = session.begin_run(&ClassLabel::all()).unwrap();
    let detect = session
        .finish_upload(upload, Ok("img-1.png".to_string()))
        .unwrap()
        .unwrap();

    session.reset();
    session.select_file(png_file("new.png")).unwrap();

    let applied = session
        .finish_detect(detect, Ok(detect_response("1", "out.png", &[])))
        .unwrap();
    assert!(!applied);
    assert_eq!(session.status(), SessionStatus::FileSelected);
    assert!(session.result().is_none());
}

#[tokio::test]
async fn shared_session_reset_during_upload_discards_the_pipeline() {
    let api = FakeApi::new();
    let gate = api.gate_upload();
    let session = Mutex::new(session_with_file());
    let classes = ClassLabel::all();

    let pipeline = run_pipeline(&session, &api, &classes);
    let operator = async {
        wait_until(|| session.lock().unwrap().status() == SessionStatus::Uploading).await;
        session.lock().unwrap().reset();
        gate.send(Ok("img-1.png".to_string())).unwrap();
    };

    let (status, ()) = tokio::join!(pipeline, operator);

    assert_eq!(status.unwrap(), SessionStatus::Idle);
    assert_eq!(api.detect_count(), 0);
}

#[tokio::test]
async fn shared_session_runs_to_ready() {
    let api = FakeApi::new();
    api.push_upload(Ok("img-1.png".to_string()));
    api.push_detect(Ok(detect_response("9", "out-9.png", &[ClassLabel::Warship])));
    let session = Mutex::new(session_with_file());

    let status = run_pipeline(&session, &api, &ClassLabel::all()).await.unwrap();

    assert_eq!(status, SessionStatus::Ready);
    let snapshot = session.lock().unwrap().snapshot();
    assert_eq!(snapshot.file_name.as_deref(), Some("harbour.png"));
    assert_eq!(snapshot.result.unwrap().detection_id, "9");
}

#[tokio::test]
async fn abandoned_pipeline_can_be_retried_with_the_same_file() {
    let api = FakeApi::new();
    let _gate = api.gate_upload();
    let session = Mutex::new(session_with_file());
    let classes = ClassLabel::all();

    let abandoned = tokio::time::timeout(
        Duration::from_millis(10),
        run_pipeline(&session, &api, &classes),
    )
    .await;
    assert!(abandoned.is_err());
    {
        let session = session.lock().unwrap();
        assert_eq!(session.status(), SessionStatus::Failed);
        assert!(session.error().is_some());
        assert_eq!(session.file().unwrap().name, "harbour.png");
    }

    api.push_upload(Ok("img-2.png".to_string()));
    api.push_detect(Ok(detect_response("2", "out-2.png", &[ClassLabel::Liner])));
    let status = run_pipeline(&session, &api, &classes).await.unwrap();

    assert_eq!(status, SessionStatus::Ready);
    let snapshot = session.lock().unwrap().snapshot();
    assert_eq!(snapshot.badges.len(), 1);
    assert_eq!(snapshot.badges[0].label, ClassLabel::Liner);
}

#[tokio::test]
async fn abandoned_exclusive_run_fails_during_detection() {
    let api = FakeApi::new();
    api.push_upload(Ok("img-1.png".to_string()));
    let _gate = api.gate_detect();
    let mut session = session_with_file();

    let abandoned = tokio::time::timeout(
        Duration::from_millis(10),
        session.run(&api, &ClassLabel::all()),
    )
    .await;

    assert!(abandoned.is_err());
    assert_eq!(session.status(), SessionStatus::Failed);
    assert_eq!(session.uploaded_key(), Some("img-1.png"));
    assert!(session.begin_run(&ClassLabel::all()).is_ok());
}

#[test]
fn reset_is_allowed_from_failed() {
    let mut session = session_with_file();
    let upload = session.begin_run(&ClassLabel::all()).unwrap();
    session
        .finish_upload(upload, Err(SeawatchError::Upload("timeout".to_string())))
        .unwrap();
    assert_eq!(session.status(), SessionStatus::Failed);

    session.reset();
    assert_eq!(session.status(), SessionStatus::Idle);
    assert!(session.error().is_none());
}
