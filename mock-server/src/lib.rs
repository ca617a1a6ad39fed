//! In-memory stand-in for the BigBlueButton API.
//!
//! Verifies checksums the way the real server does, keeps meetings and
//! recordings in memory, and answers in the server's XML dialect. Every reply
//! is HTTP 200; failures are signalled through `returncode`. `join` answers
//! with XML instead of redirecting to a client.
//!
//! Ending a meeting that was created with `record=true` produces one
//! unpublished-then-published recording for it, so the recording calls have
//! something to work on.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    body::Bytes,
    extract::{Path, Query, RawQuery, State},
    http::header,
    response::IntoResponse,
    routing::get,
    Router,
};
use quick_xml::escape::escape;
use sha1::{Digest, Sha1};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, info};
use uuid::Uuid;

pub const API_PATH: &str = "/bigbluebutton/api";

#[derive(Clone, Debug)]
pub struct Attendee {
    pub user_id: String,
    pub full_name: String,
    pub role: &'static str,
}

#[derive(Clone, Debug)]
pub struct Meeting {
    pub meeting_id: String,
    pub internal_meeting_id: String,
    pub name: String,
    pub attendee_pw: String,
    pub moderator_pw: String,
    pub voice_bridge: u32,
    pub create_time: u64,
    pub start_time: u64,
    pub running: bool,
    pub record: bool,
    pub max_participants: i64,
    pub presentation_url: Option<String>,
    pub attendees: Vec<Attendee>,
}

#[derive(Clone, Debug)]
pub struct Recording {
    pub record_id: String,
    pub meeting_id: String,
    pub internal_meeting_id: String,
    pub name: String,
    pub published: bool,
    pub start_time: u64,
    pub end_time: u64,
    pub participants: usize,
}

#[derive(Debug, Default)]
pub struct Server {
    pub secret: String,
    pub meetings: Vec<Meeting>,
    pub recordings: Vec<Recording>,
}

impl Server {
    fn meeting(&self, meeting_id: &str) -> Option<&Meeting> {
        self.meetings.iter().find(|m| m.meeting_id == meeting_id)
    }

    fn meeting_mut(&mut self, meeting_id: &str) -> Option<&mut Meeting> {
        self.meetings.iter_mut().find(|m| m.meeting_id == meeting_id)
    }
}

pub type Db = Arc<RwLock<Server>>;

pub fn db(secret: &str) -> Db {
    Arc::new(RwLock::new(Server {
        secret: secret.to_string(),
        ..Server::default()
    }))
}

pub fn app(secret: &str) -> Router {
    app_with_db(db(secret))
}

/// Router over shared state, so tests can inspect what a call changed.
pub fn app_with_db(db: Db) -> Router {
    Router::new()
        .route(
            &format!("{API_PATH}/{{call}}"),
            get(handle_get).post(handle_post),
        )
        .with_state(db)
}

pub async fn run(listener: TcpListener, secret: &str) -> Result<(), std::io::Error> {
    axum::serve(listener, app(secret)).await
}

/// `sha1(call + query + secret)` as lowercase hex.
pub fn checksum(call: &str, query: &str, secret: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(call.as_bytes());
    hasher.update(query.as_bytes());
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

type Params = HashMap<String, String>;

async fn handle_get(
    State(db): State<Db>,
    Path(call): Path<String>,
    RawQuery(raw): RawQuery,
    Query(params): Query<Params>,
) -> impl IntoResponse {
    xml(dispatch(&db, &call, raw.as_deref().unwrap_or(""), &params, None).await)
}

async fn handle_post(
    State(db): State<Db>,
    Path(call): Path<String>,
    RawQuery(raw): RawQuery,
    Query(params): Query<Params>,
    body: Bytes,
) -> impl IntoResponse {
    let body = String::from_utf8_lossy(&body).into_owned();
    xml(dispatch(&db, &call, raw.as_deref().unwrap_or(""), &params, Some(body)).await)
}

fn xml(body: String) -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/xml;charset=UTF-8")], body)
}

async fn dispatch(
    db: &Db,
    call: &str,
    raw_query: &str,
    params: &Params,
    upload: Option<String>,
) -> String {
    let mut server = db.write().await;

    if !checksum_valid(call, raw_query, &server.secret) {
        debug!(call, "checksum mismatch");
        return failed(
            "checksumError",
            "You did not pass the checksum security check",
        );
    }

    match call {
        "create" => create(&mut server, params, upload),
        "isMeetingRunning" => is_meeting_running(&server, params),
        "join" => join(&mut server, params),
        "end" => end(&mut server, params),
        "getMeetingInfo" => get_meeting_info(&server, params),
        "getMeetings" => get_meetings(&server),
        "getRecordings" => get_recordings(&server, params),
        "publishRecordings" => publish_recordings(&mut server, params),
        "deleteRecordings" => delete_recordings(&mut server, params),
        _ => failed(
            "unsupportedRequest",
            "This request is not supported.",
        ),
    }
}

/// The checksum is the last parameter and covers everything before it.
fn checksum_valid(call: &str, raw_query: &str, secret: &str) -> bool {
    let (unsigned, given) = match raw_query.rsplit_once("&checksum=") {
        Some(split) => split,
        None => match raw_query.strip_prefix("checksum=") {
            Some(given) => ("", given),
            None => return false,
        },
    };
    checksum(call, unsigned, secret) == given
}

fn create(server: &mut Server, params: &Params, upload: Option<String>) -> String {
    let Some(meeting_id) = non_empty(params, "meetingID") else {
        return failed("missingParamMeetingID", "You must specify a meeting ID for the meeting.");
    };

    if let Some(existing) = server.meeting(meeting_id) {
        return success(&format!(
            "{}<messageKey>duplicateWarning</messageKey>\
             <message>This conference was already in existence and may currently be in progress.</message>",
            created_fields(existing)
        ));
    }

    let now = now_millis();
    let meeting = Meeting {
        meeting_id: meeting_id.to_string(),
        internal_meeting_id: format!("{}-{now}", Uuid::new_v4().simple()),
        name: non_empty(params, "name").unwrap_or(meeting_id).to_string(),
        attendee_pw: non_empty(params, "attendeePW")
            .map(str::to_string)
            .unwrap_or_else(random_password),
        moderator_pw: non_empty(params, "moderatorPW")
            .map(str::to_string)
            .unwrap_or_else(random_password),
        voice_bridge: 70000 + server.meetings.len() as u32,
        create_time: now,
        start_time: 0,
        running: false,
        record: params.get("record").map(String::as_str) == Some("true"),
        max_participants: params
            .get("maxParticipants")
            .and_then(|v| v.parse().ok())
            .unwrap_or(0),
        presentation_url: upload.as_deref().and_then(document_url),
        attendees: Vec::new(),
    };
    info!(meeting_id, "meeting created");
    let reply = success(&created_fields(&meeting));
    server.meetings.push(meeting);
    reply
}

fn is_meeting_running(server: &Server, params: &Params) -> String {
    let running = non_empty(params, "meetingID")
        .and_then(|id| server.meeting(id))
        .map(|m| m.running)
        .unwrap_or(false);
    success(&element("running", running))
}

fn join(server: &mut Server, params: &Params) -> String {
    let (Some(meeting_id), Some(full_name), Some(password)) = (
        non_empty(params, "meetingID"),
        non_empty(params, "fullName"),
        non_empty(params, "password"),
    ) else {
        return failed("missingParameter", "meetingID, fullName and password are required.");
    };
    let Some(meeting) = server.meeting_mut(meeting_id) else {
        return not_found();
    };

    let role = if password == meeting.moderator_pw {
        "MODERATOR"
    } else if password == meeting.attendee_pw {
        "VIEWER"
    } else {
        return failed("invalidPassword", "You either did not supply a password or the password supplied is neither the attendee or moderator password for this conference.");
    };
    if meeting.max_participants > 0 && meeting.attendees.len() as i64 >= meeting.max_participants {
        return failed("maxParticipantsReached", "The number of participants allowed for this meeting has been reached.");
    }

    let user_id = params
        .get("userID")
        .cloned()
        .unwrap_or_else(|| format!("w_{}", &Uuid::new_v4().simple().to_string()[..12]));
    meeting.attendees.push(Attendee {
        user_id: user_id.clone(),
        full_name: full_name.to_string(),
        role,
    });
    if !meeting.running {
        meeting.running = true;
        meeting.start_time = now_millis();
    }

    success(&format!(
        "<messageKey>successfullyJoined</messageKey>\
         <message>You have joined successfully.</message>{}{}{}",
        element("meeting_id", &meeting.meeting_id),
        element("user_id", &user_id),
        element("auth_token", Uuid::new_v4().simple()),
    ))
}

fn end(server: &mut Server, params: &Params) -> String {
    let Some(meeting_id) = non_empty(params, "meetingID") else {
        return failed("missingParamMeetingID", "You must specify a meeting ID for the meeting.");
    };
    let Some(index) = server.meetings.iter().position(|m| m.meeting_id == meeting_id) else {
        return not_found();
    };
    if params.get("password") != Some(&server.meetings[index].moderator_pw) {
        return failed("invalidPassword", "You must supply the moderator password for this call.");
    }

    let meeting = server.meetings.remove(index);
    if meeting.record {
        server.recordings.push(Recording {
            record_id: meeting.internal_meeting_id.clone(),
            meeting_id: meeting.meeting_id.clone(),
            internal_meeting_id: meeting.internal_meeting_id.clone(),
            name: meeting.name.clone(),
            published: true,
            start_time: meeting.start_time.max(meeting.create_time),
            end_time: now_millis(),
            participants: meeting.attendees.len(),
        });
    }
    info!(meeting_id, "meeting ended");

    success(
        "<messageKey>sentEndMeetingRequest</messageKey>\
         <message>A request to end the meeting was sent.  Please wait a few seconds, and then use the getMeetingInfo or isMeetingRunning API calls to verify that it was ended.</message>",
    )
}

fn get_meeting_info(server: &Server, params: &Params) -> String {
    match non_empty(params, "meetingID").and_then(|id| server.meeting(id)) {
        Some(meeting) => success(&meeting_info_fields(meeting)),
        None => not_found(),
    }
}

fn get_meetings(server: &Server) -> String {
    if server.meetings.is_empty() {
        return success(
            "<meetings/><messageKey>noMeetings</messageKey>\
             <message>no meetings were found on this server</message>",
        );
    }
    let meetings: String = server
        .meetings
        .iter()
        .map(|m| format!("<meeting>{}</meeting>", meeting_info_fields(m)))
        .collect();
    success(&format!("<meetings>{meetings}</meetings>"))
}

fn get_recordings(server: &Server, params: &Params) -> String {
    let wanted = list_param(params, "meetingID");
    let recordings: String = server
        .recordings
        .iter()
        .filter(|r| wanted.is_empty() || wanted.contains(&r.meeting_id.as_str()))
        .map(recording_fields)
        .collect();

    if recordings.is_empty() {
        return success(
            "<recordings></recordings><messageKey>noRecordings</messageKey>\
             <message>There are no recordings for the meeting(s).</message>",
        );
    }
    success(&format!("<recordings>{recordings}</recordings>"))
}

fn publish_recordings(server: &mut Server, params: &Params) -> String {
    let ids = list_param(params, "recordID");
    if ids.is_empty() {
        return failed("missingParamRecordID", "You must specify a recordID.");
    }
    let Some(publish) = params.get("publish").map(|p| p == "true") else {
        return failed("missingParamPublish", "You must specify a publish value true or false.");
    };

    let mut found = false;
    for recording in server
        .recordings
        .iter_mut()
        .filter(|r| ids.contains(&r.record_id.as_str()))
    {
        recording.published = publish;
        found = true;
    }
    if !found {
        return failed("notFound", "We could not find recordings");
    }
    success(&element("published", publish))
}

fn delete_recordings(server: &mut Server, params: &Params) -> String {
    let ids = list_param(params, "recordID");
    if ids.is_empty() {
        return failed("missingParamRecordID", "You must specify a recordID.");
    }

    let before = server.recordings.len();
    server
        .recordings
        .retain(|r| !ids.contains(&r.record_id.as_str()));
    if server.recordings.len() == before {
        return failed("notFound", "We could not find recordings");
    }
    success(&element("deleted", true))
}

fn created_fields(meeting: &Meeting) -> String {
    [
        element("meetingID", &meeting.meeting_id),
        element("internalMeetingID", &meeting.internal_meeting_id),
        element("attendeePW", &meeting.attendee_pw),
        element("moderatorPW", &meeting.moderator_pw),
        element("createTime", meeting.create_time),
        element("voiceBridge", meeting.voice_bridge),
        element("hasBeenForciblyEnded", false),
    ]
    .concat()
}

fn meeting_info_fields(meeting: &Meeting) -> String {
    let moderators = meeting
        .attendees
        .iter()
        .filter(|a| a.role == "MODERATOR")
        .count();
    let attendees: String = meeting
        .attendees
        .iter()
        .map(|a| {
            format!(
                "<attendee>{}{}{}{}{}{}{}</attendee>",
                element("userID", &a.user_id),
                element("fullName", &a.full_name),
                element("role", a.role),
                element("isPresenter", a.role == "MODERATOR"),
                element("isListeningOnly", false),
                element("hasJoinedVoice", false),
                element("hasVideo", false),
            )
        })
        .collect();

    [
        element("meetingName", &meeting.name),
        element("meetingID", &meeting.meeting_id),
        element("internalMeetingID", &meeting.internal_meeting_id),
        element("createTime", meeting.create_time),
        element("voiceBridge", meeting.voice_bridge),
        element("attendeePW", &meeting.attendee_pw),
        element("moderatorPW", &meeting.moderator_pw),
        element("running", meeting.running),
        element("duration", 0),
        element("recording", meeting.record && meeting.running),
        element("hasBeenForciblyEnded", false),
        element("startTime", meeting.start_time),
        element("endTime", 0),
        element("participantCount", meeting.attendees.len()),
        element("listenerCount", 0),
        element("voiceParticipantCount", 0),
        element("videoCount", 0),
        element("maxUsers", meeting.max_participants),
        element("moderatorCount", moderators),
        format!("<attendees>{attendees}</attendees>"),
    ]
    .concat()
}

fn recording_fields(recording: &Recording) -> String {
    let state = if recording.published { "published" } else { "unpublished" };
    format!(
        "<recording>{}{}{}{}{}{}{}{}{}<playback><format>{}{}{}</format></playback></recording>",
        element("recordID", &recording.record_id),
        element("meetingID", &recording.meeting_id),
        element("internalMeetingID", &recording.internal_meeting_id),
        element("name", &recording.name),
        element("published", recording.published),
        element("state", state),
        element("startTime", recording.start_time),
        element("endTime", recording.end_time),
        element("participants", recording.participants),
        element("type", "presentation"),
        element(
            "url",
            format!("https://mock.invalid/playback/presentation/2.3/{}", recording.record_id)
        ),
        element("length", (recording.end_time - recording.start_time) / 60_000),
    )
}

fn element(name: &str, value: impl ToString) -> String {
    format!("<{name}>{}</{name}>", escape(value.to_string().as_str()))
}

fn success(fields: &str) -> String {
    format!("<response><returncode>SUCCESS</returncode>{fields}</response>")
}

fn failed(key: &str, message: &str) -> String {
    format!(
        "<response><returncode>FAILED</returncode>{}{}</response>",
        element("messageKey", key),
        element("message", message)
    )
}

fn not_found() -> String {
    failed("notFound", "We could not find a meeting with that meeting ID - perhaps the meeting is not yet running?")
}

fn non_empty<'a>(params: &'a Params, key: &str) -> Option<&'a str> {
    params
        .get(key)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
}

fn list_param<'a>(params: &'a Params, key: &str) -> Vec<&'a str> {
    non_empty(params, key)
        .map(|v| v.split(',').map(str::trim).filter(|s| !s.is_empty()).collect())
        .unwrap_or_default()
}

fn random_password() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

/// `url` attribute of the first `<document>` in an uploaded `<modules>` body.
fn document_url(body: &str) -> Option<String> {
    use quick_xml::events::Event;

    let start = body.find("<modules")?;
    let mut reader = quick_xml::Reader::from_str(&body[start..]);
    loop {
        match reader.read_event().ok()? {
            Event::Start(e) | Event::Empty(e) if e.name().as_ref() == b"document" => {
                let attr = e.try_get_attribute("url").ok()??;
                return attr.unescape_value().ok().map(|v| v.into_owned());
            }
            Event::Eof => return None,
            _ => {}
        }
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_matches_known_value() {
        assert_eq!(
            checksum("create", "name=Test&meetingID=abc123", "supersecret"),
            "d9f513db0812574b614e2fda5a46bcd68ad87e30"
        );
    }

    #[test]
    fn checksum_must_be_last_parameter() {
        let sum = checksum("isMeetingRunning", "meetingID=m1", "s");
        assert!(checksum_valid("isMeetingRunning", &format!("meetingID=m1&checksum={sum}"), "s"));
        assert!(!checksum_valid("isMeetingRunning", &format!("checksum={sum}&meetingID=m1"), "s"));
        assert!(!checksum_valid("isMeetingRunning", "meetingID=m1", "s"));
    }

    #[test]
    fn checksum_only_query() {
        let sum = checksum("getMeetings", "", "s");
        assert!(checksum_valid("getMeetings", &format!("checksum={sum}"), "s"));
    }

    #[test]
    fn element_escapes_text() {
        assert_eq!(element("name", "Tom & <Jerry>"), "<name>Tom &amp; &lt;Jerry&gt;</name>");
    }

    #[test]
    fn document_url_from_modules_body() {
        let body = "--b\r\nContent-Disposition: form-data; name=\"file\"; filename=\"\"\r\n\r\n\
                    <modules><module name=\"presentation\"><document url=\"https://x/a.pdf?a=1&amp;b=2\" /></module></modules>\r\n--b--\r\n";
        assert_eq!(document_url(body).as_deref(), Some("https://x/a.pdf?a=1&b=2"));
        assert_eq!(document_url("no modules here"), None);
    }

    #[test]
    fn list_param_splits_commas() {
        let mut params = Params::new();
        params.insert("recordID".to_string(), "r1, r2,,r3".to_string());
        assert_eq!(list_param(&params, "recordID"), ["r1", "r2", "r3"]);
        assert!(list_param(&params, "meetingID").is_empty());
    }
}
