//! Call inputs and typed results.
//!
//! Each result type pairs a static [`Shape`] describing the reply elements it
//! is read from with a `from_record` constructor. Required fields in the shape
//! are exactly the non-`Option` fields of the struct, so `from_record` only
//! fails when handed a record that was not extracted with that shape.

use serde::{Deserialize, Serialize};

use crate::shape::{FieldDef, Record, Shape};

/// Input for the `create` call.
///
/// `None` means "not sent", leaving the server default in effect:
/// random passwords, unlimited participants, no duration limit, `record`
/// false, `autoStartRecording` false, `allowStartStopRecording` true.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateMeeting {
    pub meeting_id: String,
    pub name: Option<String>,
    pub attendee_pw: Option<String>,
    pub moderator_pw: Option<String>,
    /// URL the client goes to after logout.
    pub logout_url: Option<String>,
    /// Negative for unlimited.
    pub max_participants: Option<i32>,
    /// Minutes; 0 for no limit.
    pub duration: Option<u32>,
    pub dial_number: Option<String>,
    /// Welcome message; `%%CONFNAME%%`, `%%DIALNUM%%` and `%%CONFNUM%%` are
    /// substituted by the server.
    pub welcome: Option<String>,
    pub moderator_only_msg: Option<String>,
    /// Sent as `meta_<name>=<value>`, in order.
    #[serde(default)]
    pub meta: Vec<(String, String)>,
    pub record: Option<bool>,
    pub auto_start_recording: Option<bool>,
    pub allow_start_stop_recording: Option<bool>,
    /// Presentation to pre-upload by reference.
    pub pre_upload_slide_url: Option<String>,
    /// Any other `create` parameter, appended last in order.
    #[serde(default)]
    pub extra_options: Vec<(String, String)>,
}

impl CreateMeeting {
    pub fn new(meeting_id: &str) -> Self {
        Self {
            meeting_id: meeting_id.to_string(),
            ..Self::default()
        }
    }
}

/// A participant in a running meeting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attendee {
    pub user_id: String,
    pub full_name: String,
    pub role: String,
    pub is_presenter: bool,
    pub is_listening_only: bool,
    pub has_joined_voice: bool,
    pub has_video: bool,
}

pub static ATTENDEE: Shape = Shape {
    fields: &[
        FieldDef::text("userID", "user_id"),
        FieldDef::text("fullName", "full_name"),
        FieldDef::text("role", "role"),
        FieldDef::bool("isPresenter", "is_presenter").optional(),
        FieldDef::bool("isListeningOnly", "is_listening_only").optional(),
        FieldDef::bool("hasJoinedVoice", "has_joined_voice").optional(),
        FieldDef::bool("hasVideo", "has_video").optional(),
    ],
};

impl Attendee {
    pub fn from_record(record: &Record) -> Option<Self> {
        Some(Self {
            user_id: record.text("user_id")?.to_string(),
            full_name: record.text("full_name")?.to_string(),
            role: record.text("role")?.to_string(),
            is_presenter: record.bool("is_presenter").unwrap_or(false),
            is_listening_only: record.bool("is_listening_only").unwrap_or(false),
            has_joined_voice: record.bool("has_joined_voice").unwrap_or(false),
            has_video: record.bool("has_video").unwrap_or(false),
        })
    }
}

/// Reply to `getMeetingInfo`. Times are epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeetingInfo {
    pub meeting_name: String,
    pub meeting_id: String,
    pub internal_meeting_id: Option<String>,
    pub create_time: i64,
    pub voice_bridge: i64,
    pub dial_number: Option<String>,
    pub attendee_pw: String,
    pub moderator_pw: String,
    pub running: bool,
    pub recording: bool,
    pub has_been_forcibly_ended: bool,
    pub start_time: i64,
    pub end_time: i64,
    pub duration: Option<i64>,
    pub participant_count: i64,
    pub listener_count: Option<i64>,
    pub voice_participant_count: Option<i64>,
    pub video_count: Option<i64>,
    pub max_users: i64,
    pub moderator_count: i64,
    pub attendees: Vec<Attendee>,
}

pub static MEETING_INFO: Shape = Shape {
    fields: &[
        FieldDef::text("meetingName", "meeting_name"),
        FieldDef::text("meetingID", "meeting_id"),
        FieldDef::text("internalMeetingID", "internal_meeting_id").optional(),
        FieldDef::int("createTime", "create_time"),
        FieldDef::int("voiceBridge", "voice_bridge"),
        FieldDef::text("dialNumber", "dial_number").optional(),
        FieldDef::text("attendeePW", "attendee_pw"),
        FieldDef::text("moderatorPW", "moderator_pw"),
        FieldDef::bool("running", "running"),
        FieldDef::bool("recording", "recording"),
        FieldDef::bool("hasBeenForciblyEnded", "has_been_forcibly_ended"),
        FieldDef::int("startTime", "start_time"),
        FieldDef::int("endTime", "end_time"),
        FieldDef::int("duration", "duration").optional(),
        FieldDef::int("participantCount", "participant_count"),
        FieldDef::int("listenerCount", "listener_count").optional(),
        FieldDef::int("voiceParticipantCount", "voice_participant_count").optional(),
        FieldDef::int("videoCount", "video_count").optional(),
        FieldDef::int("maxUsers", "max_users"),
        FieldDef::int("moderatorCount", "moderator_count"),
        FieldDef::group("attendees", "attendees", "attendee", &ATTENDEE).optional(),
    ],
};

impl MeetingInfo {
    pub fn from_record(record: &Record) -> Option<Self> {
        let attendees = record
            .list("attendees")
            .unwrap_or_default()
            .iter()
            .map(Attendee::from_record)
            .collect::<Option<Vec<_>>>()?;

        Some(Self {
            meeting_name: record.text("meeting_name")?.to_string(),
            meeting_id: record.text("meeting_id")?.to_string(),
            internal_meeting_id: record.text("internal_meeting_id").map(str::to_string),
            create_time: record.int("create_time")?,
            voice_bridge: record.int("voice_bridge")?,
            dial_number: record.text("dial_number").map(str::to_string),
            attendee_pw: record.text("attendee_pw")?.to_string(),
            moderator_pw: record.text("moderator_pw")?.to_string(),
            running: record.bool("running")?,
            recording: record.bool("recording")?,
            has_been_forcibly_ended: record.bool("has_been_forcibly_ended")?,
            start_time: record.int("start_time")?,
            end_time: record.int("end_time")?,
            duration: record.int("duration"),
            participant_count: record.int("participant_count")?,
            listener_count: record.int("listener_count"),
            voice_participant_count: record.int("voice_participant_count"),
            video_count: record.int("video_count"),
            max_users: record.int("max_users")?,
            moderator_count: record.int("moderator_count")?,
            attendees,
        })
    }
}

/// One entry of `getMeetings`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeetingSummary {
    pub meeting_id: String,
    pub meeting_name: Option<String>,
    pub attendee_pw: String,
    pub moderator_pw: String,
    pub has_been_forcibly_ended: bool,
    pub running: bool,
    pub create_time: i64,
    /// Filled by the per-meeting `getMeetingInfo` follow-up call, if made
    /// and successful.
    pub info: Option<MeetingInfo>,
}

pub static MEETING_SUMMARY: Shape = Shape {
    fields: &[
        FieldDef::text("meetingID", "meeting_id"),
        FieldDef::text("meetingName", "meeting_name").optional(),
        FieldDef::text("attendeePW", "attendee_pw"),
        FieldDef::text("moderatorPW", "moderator_pw"),
        FieldDef::bool("hasBeenForciblyEnded", "has_been_forcibly_ended"),
        FieldDef::bool("running", "running"),
        FieldDef::int("createTime", "create_time"),
    ],
};

/// Root of the `getMeetings` reply. The server omits `<meetings>` or sends
/// it empty when nothing is running.
pub static MEETINGS: Shape = Shape {
    fields: &[FieldDef::group("meetings", "meetings", "meeting", &MEETING_SUMMARY).optional()],
};

impl MeetingSummary {
    pub fn from_record(record: &Record) -> Option<Self> {
        Some(Self {
            meeting_id: record.text("meeting_id")?.to_string(),
            meeting_name: record.text("meeting_name").map(str::to_string),
            attendee_pw: record.text("attendee_pw")?.to_string(),
            moderator_pw: record.text("moderator_pw")?.to_string(),
            has_been_forcibly_ended: record.bool("has_been_forcibly_ended")?,
            running: record.bool("running")?,
            create_time: record.int("create_time")?,
            info: None,
        })
    }
}

/// A playback format of a recording.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackFormat {
    pub format_type: String,
    pub url: String,
    /// Minutes.
    pub length: Option<i64>,
}

pub static PLAYBACK_FORMAT: Shape = Shape {
    fields: &[
        FieldDef::text("type", "format_type"),
        FieldDef::text("url", "url"),
        FieldDef::int("length", "length").optional(),
    ],
};

impl PlaybackFormat {
    pub fn from_record(record: &Record) -> Option<Self> {
        Some(Self {
            format_type: record.text("format_type")?.to_string(),
            url: record.text("url")?.to_string(),
            length: record.int("length"),
        })
    }
}

/// One entry of `getRecordings`. Times are epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recording {
    pub record_id: String,
    pub meeting_id: String,
    pub internal_meeting_id: Option<String>,
    pub name: String,
    pub published: bool,
    pub state: Option<String>,
    pub start_time: i64,
    pub end_time: i64,
    pub participants: Option<i64>,
    pub playback: Vec<PlaybackFormat>,
}

pub static RECORDING: Shape = Shape {
    fields: &[
        FieldDef::text("recordID", "record_id"),
        FieldDef::text("meetingID", "meeting_id"),
        FieldDef::text("internalMeetingID", "internal_meeting_id").optional(),
        FieldDef::text("name", "name"),
        FieldDef::bool("published", "published"),
        FieldDef::text("state", "state").optional(),
        FieldDef::int("startTime", "start_time"),
        FieldDef::int("endTime", "end_time"),
        FieldDef::int("participants", "participants").optional(),
        FieldDef::group("playback", "playback", "format", &PLAYBACK_FORMAT).optional(),
    ],
};

/// Root of the `getRecordings` reply.
pub static RECORDINGS: Shape = Shape {
    fields: &[FieldDef::group("recordings", "recordings", "recording", &RECORDING).optional()],
};

impl Recording {
    pub fn from_record(record: &Record) -> Option<Self> {
        let playback = record
            .list("playback")
            .unwrap_or_default()
            .iter()
            .map(PlaybackFormat::from_record)
            .collect::<Option<Vec<_>>>()?;

        Some(Self {
            record_id: record.text("record_id")?.to_string(),
            meeting_id: record.text("meeting_id")?.to_string(),
            internal_meeting_id: record.text("internal_meeting_id").map(str::to_string),
            name: record.text("name")?.to_string(),
            published: record.bool("published")?,
            state: record.text("state").map(str::to_string),
            start_time: record.int("start_time")?,
            end_time: record.int("end_time")?,
            participants: record.int("participants"),
            playback,
        })
    }
}
