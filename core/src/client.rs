//! Stateless request builder and reply parser for the BigBlueButton API.
//!
//! # Design
//! `BbbClient` holds only an immutable [`BbbConfig`] and carries no state
//! between calls. Each operation is split into a `build_*` method that signs
//! and produces an `HttpRequest`, and a `parse_*` method that consumes the
//! `HttpResponse`. The caller, or [`crate::BigBlueButton`], executes the
//! round trip in between. `join_url` and `end_url` stop after signing: the
//! URL is the product, meant for a browser rather than for this library.
//!
//! Parsers never fail. A reply that is `FAILED`, unreadable, or missing a
//! required field comes back as `false` / `None`; use [`BbbClient::interpret`]
//! to see which.

use std::fmt::Display;

use crate::config::BbbConfig;
use crate::error::{BbbError, BbbResult};
use crate::http::{HttpRequest, HttpResponse};
use crate::invoker::{get_request, signed_url, upload_request};
use crate::query::Params;
use crate::response::{match_field, Reply};
use crate::shape::extract;
use crate::types::{
    CreateMeeting, MeetingInfo, MeetingSummary, Recording, MEETINGS, MEETING_INFO, RECORDINGS,
};

/// Call names understood by the server.
pub mod call {
    pub const CREATE: &str = "create";
    pub const IS_MEETING_RUNNING: &str = "isMeetingRunning";
    pub const JOIN: &str = "join";
    pub const END: &str = "end";
    pub const GET_MEETING_INFO: &str = "getMeetingInfo";
    pub const GET_MEETINGS: &str = "getMeetings";
    pub const GET_RECORDINGS: &str = "getRecordings";
    pub const PUBLISH_RECORDINGS: &str = "publishRecordings";
    pub const DELETE_RECORDINGS: &str = "deleteRecordings";
}

/// Synchronous, stateless client for one server.
#[derive(Debug, Clone)]
pub struct BbbClient {
    config: BbbConfig,
}

impl BbbClient {
    pub fn new(config: BbbConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BbbConfig {
        &self.config
    }

    /// Signed GET for an arbitrary call.
    pub fn build_call(&self, call: &str, params: &Params) -> HttpRequest {
        get_request(signed_url(&self.config, call, params))
    }

    pub fn build_create(&self, input: &CreateMeeting) -> BbbResult<HttpRequest> {
        require("meetingID", &input.meeting_id)?;

        let params = Params::new()
            .push_opt("name", input.name.as_deref())
            .push("meetingID", &input.meeting_id)
            .push_opt("attendeePW", input.attendee_pw.as_deref())
            .push_opt("moderatorPW", input.moderator_pw.as_deref())
            .push_opt("dialNumber", input.dial_number.as_deref())
            .push_opt("welcome", input.welcome.as_deref())
            .push_opt("logoutURL", input.logout_url.as_deref())
            .push_opt("maxParticipants", input.max_participants)
            .push_opt("duration", input.duration)
            .push_opt("record", input.record)
            .extend(input.meta.iter().map(|(k, v)| (format!("meta_{k}"), v)))
            .push_opt("moderatorOnlyMessage", input.moderator_only_msg.as_deref())
            .push_opt("autoStartRecording", input.auto_start_recording)
            .push_opt("allowStartStopRecording", input.allow_start_stop_recording)
            .extend(input.extra_options.iter().map(|(k, v)| (k.as_str(), v)));

        let url = signed_url(&self.config, call::CREATE, &params);
        Ok(match input.pre_upload_slide_url.as_deref() {
            Some(slide) => upload_request(url, slide),
            None => get_request(url),
        })
    }

    pub fn build_is_running(&self, meeting_id: &str) -> BbbResult<HttpRequest> {
        require("meetingID", meeting_id)?;
        let params = Params::new().push("meetingID", meeting_id);
        Ok(self.build_call(call::IS_MEETING_RUNNING, &params))
    }

    /// Signed URL that joins `name` to the meeting. No request is made.
    pub fn join_url(&self, meeting_id: &str, name: &str, password: &str) -> BbbResult<String> {
        self.join_url_with(meeting_id, name, password, std::iter::empty::<(&str, &str)>())
    }

    /// Like [`BbbClient::join_url`], with extra `join` parameters appended
    /// in order.
    pub fn join_url_with<K, V, I>(
        &self,
        meeting_id: &str,
        name: &str,
        password: &str,
        extra_options: I,
    ) -> BbbResult<String>
    where
        K: Into<String>,
        V: Display,
        I: IntoIterator<Item = (K, V)>,
    {
        require("meetingID", meeting_id)?;
        require("fullName", name)?;
        require("password", password)?;

        let params = Params::new()
            .push("fullName", name)
            .push("meetingID", meeting_id)
            .push("password", password)
            .extend(extra_options);
        Ok(signed_url(&self.config, call::JOIN, &params))
    }

    /// Signed URL that ends the meeting. No request is made.
    pub fn end_url(&self, meeting_id: &str, password: &str) -> BbbResult<String> {
        Ok(signed_url(&self.config, call::END, &end_params(meeting_id, password)?))
    }

    pub fn build_end(&self, meeting_id: &str, password: &str) -> BbbResult<HttpRequest> {
        Ok(self.build_call(call::END, &end_params(meeting_id, password)?))
    }

    pub fn build_meeting_info(&self, meeting_id: &str) -> BbbResult<HttpRequest> {
        require("meetingID", meeting_id)?;
        let params = Params::new().push("meetingID", meeting_id);
        Ok(self.build_call(call::GET_MEETING_INFO, &params))
    }

    pub fn build_get_meetings(&self) -> HttpRequest {
        self.build_call(call::GET_MEETINGS, &Params::new())
    }

    pub fn build_get_recordings(&self, meeting_id: &str) -> BbbResult<HttpRequest> {
        require("meetingID", meeting_id)?;
        let params = Params::new().push("meetingID", meeting_id);
        Ok(self.build_call(call::GET_RECORDINGS, &params))
    }

    /// `record_id` may be a comma-separated list.
    pub fn build_publish_recordings(&self, record_id: &str, publish: bool) -> BbbResult<HttpRequest> {
        require("recordID", record_id)?;
        let params = Params::new()
            .push("recordID", record_id)
            .push("publish", publish);
        Ok(self.build_call(call::PUBLISH_RECORDINGS, &params))
    }

    /// `record_id` may be a comma-separated list.
    pub fn build_delete_recordings(&self, record_id: &str) -> BbbResult<HttpRequest> {
        require("recordID", record_id)?;
        let params = Params::new().push("recordID", record_id);
        Ok(self.build_call(call::DELETE_RECORDINGS, &params))
    }

    /// Full classification of a reply, for callers that need to tell a
    /// server-side failure from an unreadable body.
    pub fn interpret(&self, response: &HttpResponse) -> Reply {
        Reply::interpret(response)
    }

    pub fn parse_create(&self, response: &HttpResponse) -> bool {
        Reply::interpret(response).is_success()
    }

    pub fn parse_is_running(&self, response: &HttpResponse) -> bool {
        match_field(Reply::interpret(response).document(), "running")
    }

    pub fn parse_end(&self, response: &HttpResponse) -> bool {
        Reply::interpret(response).is_success()
    }

    pub fn parse_meeting_info(&self, response: &HttpResponse) -> Option<MeetingInfo> {
        let reply = Reply::interpret(response);
        let record = extract(reply.document(), &MEETING_INFO)?;
        MeetingInfo::from_record(&record)
    }

    /// Summaries only; `info` is left `None`.
    pub fn parse_get_meetings(&self, response: &HttpResponse) -> Option<Vec<MeetingSummary>> {
        let reply = Reply::interpret(response);
        let record = extract(reply.document(), &MEETINGS)?;
        record
            .list("meetings")?
            .iter()
            .map(MeetingSummary::from_record)
            .collect()
    }

    pub fn parse_get_recordings(&self, response: &HttpResponse) -> Option<Vec<Recording>> {
        let reply = Reply::interpret(response);
        let record = extract(reply.document(), &RECORDINGS)?;
        record
            .list("recordings")?
            .iter()
            .map(Recording::from_record)
            .collect()
    }

    pub fn parse_publish_recordings(&self, response: &HttpResponse) -> bool {
        match_field(Reply::interpret(response).document(), "published")
    }

    pub fn parse_delete_recordings(&self, response: &HttpResponse) -> bool {
        match_field(Reply::interpret(response).document(), "deleted")
    }
}

fn end_params(meeting_id: &str, password: &str) -> BbbResult<Params> {
    require("meetingID", meeting_id)?;
    require("password", password)?;
    Ok(Params::new()
        .push("meetingID", meeting_id)
        .push("password", password))
}

fn require(name: &'static str, value: &str) -> BbbResult<()> {
    if value.trim().is_empty() {
        return Err(BbbError::MissingParameter(name));
    }
    Ok(())
}
