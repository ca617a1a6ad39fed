//! Meeting and recording lifecycle against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port, then drives every facade
//! operation over real HTTP through the default `ureq` transport. The mock
//! verifies checksums, so a signing mistake shows up as a failed call here.

use std::net::SocketAddr;

use bbb_core::{
    BbbConfig, BbbError, BigBlueButton, CreateMeeting, HttpRequest, Params, Reply, Transport,
    UreqTransport,
};

const SECRET: &str = "integration-secret";

fn start_mock_server() -> SocketAddr {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener, SECRET).await
        })
        .unwrap();
    });

    addr
}

fn base_url(addr: SocketAddr) -> String {
    format!("http://{addr}{}/", mock_server::API_PATH)
}

#[test]
fn meeting_and_recording_lifecycle() {
    let addr = start_mock_server();
    let bbb = BigBlueButton::new(BbbConfig::new(&base_url(addr), SECRET).with_timeout_secs(5));

    // Step 1: nothing is running yet.
    let meetings = bbb.list_meetings().unwrap().expect("getMeetings succeeds");
    assert!(meetings.is_empty());

    // Step 2: create a recorded meeting.
    let created = bbb
        .create(&CreateMeeting {
            name: Some("Integration & Friends".to_string()),
            attendee_pw: Some("ap".to_string()),
            moderator_pw: Some("mp".to_string()),
            welcome: Some("Welcome to %%CONFNAME%%".to_string()),
            meta: vec![("origin".to_string(), "integration".to_string())],
            record: Some(true),
            ..CreateMeeting::new("lifecycle")
        })
        .unwrap();
    assert!(created);
    assert!(!bbb.is_running("lifecycle").unwrap());

    // Step 3: joining through the signed URL starts the meeting.
    let join_url = bbb.join_url("lifecycle", "Zoë Moderator", "mp").unwrap();
    let transport = UreqTransport::default();
    let response = transport.execute(&HttpRequest::get(join_url)).unwrap();
    assert!(response.is_success());
    assert!(String::from_utf8_lossy(&response.body).contains("successfullyJoined"));
    assert!(bbb.is_running("lifecycle").unwrap());

    // Step 4: meeting info reflects the join.
    let info = bbb.meeting_info("lifecycle").unwrap().expect("meeting info");
    assert_eq!(info.meeting_id, "lifecycle");
    assert_eq!(info.meeting_name, "Integration & Friends");
    assert_eq!(info.attendee_pw, "ap");
    assert_eq!(info.moderator_pw, "mp");
    assert!(info.running);
    assert_eq!(info.participant_count, 1);
    assert_eq!(info.moderator_count, 1);
    assert_eq!(info.attendees.len(), 1);
    assert_eq!(info.attendees[0].full_name, "Zoë Moderator");
    assert_eq!(info.attendees[0].role, "MODERATOR");

    // Step 5: listing fans out into per-meeting info.
    let meetings = bbb.list_meetings().unwrap().expect("getMeetings succeeds");
    assert_eq!(meetings.len(), 1);
    assert_eq!(meetings[0].meeting_id, "lifecycle");
    assert!(meetings[0].running);
    assert_eq!(meetings[0].info.as_ref(), Some(&info));

    let summaries = bbb.list_meeting_summaries().unwrap().unwrap();
    assert_eq!(summaries.len(), 1);
    assert!(summaries[0].info.is_none());

    // Step 6: only the moderator password ends it.
    assert!(!bbb.end("lifecycle", "ap").unwrap());
    assert!(bbb.end("lifecycle", "mp").unwrap());
    assert!(!bbb.is_running("lifecycle").unwrap());
    assert_eq!(bbb.meeting_info("lifecycle").unwrap(), None);

    // Step 7: the recorded meeting left a recording.
    let recordings = bbb.list_recordings("lifecycle").unwrap().expect("getRecordings");
    assert_eq!(recordings.len(), 1);
    let recording = &recordings[0];
    assert_eq!(recording.meeting_id, "lifecycle");
    assert_eq!(recording.name, "Integration & Friends");
    assert!(recording.published);
    assert_eq!(recording.playback.len(), 1);
    assert_eq!(recording.playback[0].format_type, "presentation");

    // Step 8: unpublish reports the new flag, then delete.
    assert!(!bbb.publish_recordings(&recording.record_id, false).unwrap());
    let recordings = bbb.list_recordings("lifecycle").unwrap().unwrap();
    assert!(!recordings[0].published);
    assert!(bbb.publish_recordings(&recording.record_id, true).unwrap());

    assert!(bbb.delete_recordings(&recording.record_id).unwrap());
    assert_eq!(bbb.list_recordings("lifecycle").unwrap(), Some(Vec::new()));
    assert!(!bbb.delete_recordings(&recording.record_id).unwrap());
}

#[test]
fn create_with_presentation_uploads_by_post() {
    let addr = start_mock_server();
    let bbb = BigBlueButton::new(BbbConfig::new(&base_url(addr), SECRET));

    let created = bbb
        .create(&CreateMeeting {
            moderator_pw: Some("mp".to_string()),
            pre_upload_slide_url: Some("https://cdn.example.com/deck.pdf?v=1&lang=en".to_string()),
            ..CreateMeeting::new("with-slides")
        })
        .unwrap();
    assert!(created);
    assert!(bbb.meeting_info("with-slides").unwrap().is_some());
}

#[test]
fn generic_call_exposes_failure_detail() {
    let addr = start_mock_server();
    let bbb = BigBlueButton::new(BbbConfig::new(&base_url(addr), SECRET));

    let reply = bbb
        .call("getMeetingInfo", &Params::new().push("meetingID", "ghost"))
        .unwrap();
    match reply {
        Reply::Failed(failure) => assert_eq!(failure.message_key.as_deref(), Some("notFound")),
        other => panic!("expected a failed reply, got {other:?}"),
    }
}

#[test]
fn wrong_secret_fails_checksum() {
    let addr = start_mock_server();
    let bbb = BigBlueButton::new(BbbConfig::new(&base_url(addr), "not-the-secret"));

    assert!(!bbb.create(&CreateMeeting::new("rejected")).unwrap());

    let reply = bbb.call("getMeetings", &Params::new()).unwrap();
    match reply {
        Reply::Failed(failure) => {
            assert_eq!(failure.message_key.as_deref(), Some("checksumError"))
        }
        other => panic!("expected a failed reply, got {other:?}"),
    }
    assert_eq!(bbb.list_meetings().unwrap(), None);
}

#[test]
fn closed_port_is_a_transport_error() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let bbb = BigBlueButton::new(
        BbbConfig::new(&format!("http://127.0.0.1:{port}/bigbluebutton/api/"), SECRET)
            .with_timeout_secs(2),
    );

    let err = bbb.is_running("anything").unwrap_err();
    assert!(
        matches!(err, BbbError::Transport(_) | BbbError::Timeout),
        "unexpected error: {err:?}"
    );
}
