//! The network-performing facade.
//!
//! `BigBlueButton` pairs a [`BbbClient`] with a [`Transport`] and runs each
//! operation as build, send, parse. `Err` means the call never completed or
//! was never sent; a completed call always maps to a value, `false` / `None`
//! included.

use std::fmt::Display;
use std::time::Duration;

use tracing::{debug, info};

use crate::client::BbbClient;
use crate::config::BbbConfig;
use crate::error::BbbResult;
use crate::http::{HttpRequest, HttpResponse};
use crate::query::Params;
use crate::response::Reply;
use crate::transport::{Transport, UreqTransport};
use crate::types::{CreateMeeting, MeetingInfo, MeetingSummary, Recording};

/// Client for one BigBlueButton server.
#[derive(Debug, Clone)]
pub struct BigBlueButton<T = UreqTransport> {
    client: BbbClient,
    transport: T,
}

impl BigBlueButton<UreqTransport> {
    /// Uses a `ureq` transport with the configured timeout.
    pub fn new(config: BbbConfig) -> Self {
        let transport = UreqTransport::new(Duration::from_secs(config.timeout_secs));
        Self::with_transport(config, transport)
    }

    /// Configuration from `BBB_*` environment variables.
    pub fn from_env() -> BbbResult<Self> {
        Ok(Self::new(BbbConfig::from_env()?))
    }
}

impl<T: Transport> BigBlueButton<T> {
    pub fn with_transport(config: BbbConfig, transport: T) -> Self {
        Self {
            client: BbbClient::new(config),
            transport,
        }
    }

    pub fn client(&self) -> &BbbClient {
        &self.client
    }

    fn send(&self, request: HttpRequest) -> BbbResult<HttpResponse> {
        self.transport.execute(&request)
    }

    /// Run any call and return the classified reply.
    pub fn call(&self, call: &str, params: &Params) -> BbbResult<Reply> {
        debug!(call, "calling");
        let response = self.send(self.client.build_call(call, params))?;
        Ok(self.client.interpret(&response))
    }

    /// `true` when the server accepted the meeting. Creating an existing
    /// meeting ID with the same parameters also succeeds.
    pub fn create(&self, input: &CreateMeeting) -> BbbResult<bool> {
        let response = self.send(self.client.build_create(input)?)?;
        let created = self.client.parse_create(&response);
        info!(meeting_id = %input.meeting_id, created, "create");
        Ok(created)
    }

    /// `false` both when the meeting is not running and when the server
    /// answered with a failure. Use [`BigBlueButton::call`] to tell apart.
    pub fn is_running(&self, meeting_id: &str) -> BbbResult<bool> {
        let response = self.send(self.client.build_is_running(meeting_id)?)?;
        Ok(self.client.parse_is_running(&response))
    }

    pub fn join_url(&self, meeting_id: &str, name: &str, password: &str) -> BbbResult<String> {
        self.client.join_url(meeting_id, name, password)
    }

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
        self.client
            .join_url_with(meeting_id, name, password, extra_options)
    }

    pub fn end_url(&self, meeting_id: &str, password: &str) -> BbbResult<String> {
        self.client.end_url(meeting_id, password)
    }

    /// Ends the meeting and removes all participants. `password` must be the
    /// moderator password.
    pub fn end(&self, meeting_id: &str, password: &str) -> BbbResult<bool> {
        let response = self.send(self.client.build_end(meeting_id, password)?)?;
        let ended = self.client.parse_end(&response);
        info!(meeting_id, ended, "end");
        Ok(ended)
    }

    pub fn meeting_info(&self, meeting_id: &str) -> BbbResult<Option<MeetingInfo>> {
        let response = self.send(self.client.build_meeting_info(meeting_id)?)?;
        Ok(self.client.parse_meeting_info(&response))
    }

    /// All meetings, each followed by its own `getMeetingInfo` call.
    ///
    /// A meeting whose info reply fails or is unreadable keeps `info: None`,
    /// as does one listed with a blank ID, which is not queried. A transport
    /// failure on any call aborts the whole listing.
    pub fn list_meetings(&self) -> BbbResult<Option<Vec<MeetingSummary>>> {
        let Some(mut meetings) = self.list_meeting_summaries()? else {
            return Ok(None);
        };
        for meeting in &mut meetings {
            if meeting.meeting_id.trim().is_empty() {
                debug!("skipping info for meeting without an ID");
                continue;
            }
            meeting.info = self.meeting_info(&meeting.meeting_id)?;
        }
        Ok(Some(meetings))
    }

    /// All meetings from a single `getMeetings` call, `info` left `None`.
    pub fn list_meeting_summaries(&self) -> BbbResult<Option<Vec<MeetingSummary>>> {
        let response = self.send(self.client.build_get_meetings())?;
        Ok(self.client.parse_get_meetings(&response))
    }

    pub fn list_recordings(&self, meeting_id: &str) -> BbbResult<Option<Vec<Recording>>> {
        let response = self.send(self.client.build_get_recordings(meeting_id)?)?;
        Ok(self.client.parse_get_recordings(&response))
    }

    /// Returns the server's `published` flag, so unpublishing successfully
    /// yields `false`.
    pub fn publish_recordings(&self, record_id: &str, publish: bool) -> BbbResult<bool> {
        let response = self.send(self.client.build_publish_recordings(record_id, publish)?)?;
        Ok(self.client.parse_publish_recordings(&response))
    }

    pub fn delete_recordings(&self, record_id: &str) -> BbbResult<bool> {
        let response = self.send(self.client.build_delete_recordings(record_id)?)?;
        Ok(self.client.parse_delete_recordings(&response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BbbError;
    use crate::http::HttpMethod;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    /// Replays canned bodies in order and records every request.
    #[derive(Default)]
    struct Canned {
        replies: RefCell<VecDeque<BbbResult<HttpResponse>>>,
        sent: RefCell<Vec<HttpRequest>>,
    }

    impl Canned {
        fn new(bodies: &[&str]) -> Self {
            let canned = Self::default();
            for body in bodies {
                canned
                    .replies
                    .borrow_mut()
                    .push_back(Ok(HttpResponse::ok(*body)));
            }
            canned
        }

        fn then_fail(self, err: BbbError) -> Self {
            self.replies.borrow_mut().push_back(Err(err));
            self
        }

        fn sent_calls(&self) -> Vec<String> {
            self.sent
                .borrow()
                .iter()
                .map(|r| {
                    let path = r.url.split('?').next().unwrap_or_default();
                    path.rsplit('/').next().unwrap_or_default().to_string()
                })
                .collect()
        }
    }

    impl Transport for Canned {
        fn execute(&self, request: &HttpRequest) -> BbbResult<HttpResponse> {
            self.sent.borrow_mut().push(request.clone());
            self.replies
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| Err(BbbError::Transport("no canned reply".to_string())))
        }
    }

    fn bbb(transport: &Canned) -> BigBlueButton<&Canned> {
        BigBlueButton::with_transport(
            BbbConfig::new("https://host/bigbluebutton/api/", "supersecret"),
            transport,
        )
    }

    const SUCCESS: &str = "<response><returncode>SUCCESS</returncode></response>";

    fn info_xml(meeting_id: &str) -> String {
        format!(
            "<response><returncode>SUCCESS</returncode><meetingName>{meeting_id}</meetingName>\
             <meetingID>{meeting_id}</meetingID><createTime>1</createTime><voiceBridge>70001</voiceBridge>\
             <attendeePW>ap</attendeePW><moderatorPW>mp</moderatorPW><running>true</running>\
             <recording>false</recording><hasBeenForciblyEnded>false</hasBeenForciblyEnded>\
             <startTime>2</startTime><endTime>0</endTime><participantCount>0</participantCount>\
             <maxUsers>0</maxUsers><moderatorCount>0</moderatorCount></response>"
        )
    }

    fn meetings_xml(ids: &[&str]) -> String {
        let meetings: String = ids
            .iter()
            .map(|id| {
                format!(
                    "<meeting><meetingID>{id}</meetingID><attendeePW>ap</attendeePW>\
                     <moderatorPW>mp</moderatorPW><hasBeenForciblyEnded>false</hasBeenForciblyEnded>\
                     <running>true</running><createTime>1</createTime></meeting>"
                )
            })
            .collect();
        format!("<response><returncode>SUCCESS</returncode><meetings>{meetings}</meetings></response>")
    }

    #[test]
    fn is_running_scenario() {
        let transport = Canned::new(&[
            "<response><returncode>SUCCESS</returncode><running>true</running></response>",
        ]);
        assert!(bbb(&transport).is_running("m1").unwrap());
        assert_eq!(transport.sent_calls(), ["isMeetingRunning"]);
    }

    #[test]
    fn join_and_end_urls_make_no_requests() {
        let transport = Canned::default();
        let api = bbb(&transport);
        let join = api.join_url("m1", "Alice", "pw").unwrap();
        assert!(join.starts_with("https://host/bigbluebutton/api/join?"));
        api.join_url_with("m1", "Alice", "pw", [("redirect", "true")]).unwrap();
        api.end_url("m1", "mp").unwrap();
        assert!(transport.sent.borrow().is_empty());
    }

    #[test]
    fn create_with_slide_sends_single_post() {
        let transport = Canned::new(&[SUCCESS]);
        let input = CreateMeeting {
            pre_upload_slide_url: Some("https://files.example.com/a.pdf".to_string()),
            ..CreateMeeting::new("m1")
        };
        assert!(bbb(&transport).create(&input).unwrap());
        let sent = transport.sent.borrow();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].method, HttpMethod::Post);
    }

    #[test]
    fn invalid_input_sends_nothing() {
        let transport = Canned::new(&[SUCCESS]);
        let err = bbb(&transport).end("m1", "").unwrap_err();
        assert_eq!(err, BbbError::MissingParameter("password"));
        assert!(transport.sent.borrow().is_empty());
    }

    #[test]
    fn transport_failure_is_not_false() {
        let transport = Canned::default().then_fail(BbbError::Timeout);
        assert_eq!(bbb(&transport).is_running("m1"), Err(BbbError::Timeout));
    }

    #[test]
    fn empty_body_is_false_not_error() {
        let transport = Canned::new(&[""]);
        assert_eq!(bbb(&transport).is_running("m1"), Ok(false));
    }

    #[test]
    fn call_exposes_failure_detail() {
        let transport = Canned::new(&[
            "<response><returncode>FAILED</returncode><messageKey>notFound</messageKey>\
             <message>We could not find a meeting with that meeting ID</message></response>",
        ]);
        let params = Params::new().push("meetingID", "nope");
        let reply = bbb(&transport).call("isMeetingRunning", &params).unwrap();
        match reply {
            Reply::Failed(failure) => assert_eq!(failure.message_key.as_deref(), Some("notFound")),
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[test]
    fn list_meetings_fans_out_per_meeting() {
        let transport = Canned::new(&[
            &meetings_xml(&["m1", "m2"]),
            &info_xml("m1"),
            "<response><returncode>FAILED</returncode><messageKey>notFound</messageKey></response>",
        ]);
        let meetings = bbb(&transport).list_meetings().unwrap().unwrap();
        assert_eq!(
            transport.sent_calls(),
            ["getMeetings", "getMeetingInfo", "getMeetingInfo"]
        );
        assert_eq!(meetings.len(), 2);
        assert_eq!(meetings[0].info.as_ref().unwrap().meeting_id, "m1");
        assert!(meetings[1].info.is_none());
    }

    #[test]
    fn list_meetings_skips_info_for_blank_id() {
        let transport = Canned::new(&[&meetings_xml(&["", "m2"]), &info_xml("m2")]);
        let meetings = bbb(&transport).list_meetings().unwrap().unwrap();
        assert_eq!(transport.sent_calls(), ["getMeetings", "getMeetingInfo"]);
        assert_eq!(meetings.len(), 2);
        assert_eq!(meetings[0].meeting_id, "");
        assert!(meetings[0].info.is_none());
        assert_eq!(meetings[1].info.as_ref().unwrap().meeting_id, "m2");
    }

    #[test]
    fn list_meetings_transport_failure_aborts() {
        let transport =
            Canned::new(&[&meetings_xml(&["m1", "m2"])]).then_fail(BbbError::Transport("reset".into()));
        assert!(matches!(
            bbb(&transport).list_meetings(),
            Err(BbbError::Transport(_))
        ));
    }

    #[test]
    fn list_meeting_summaries_is_a_single_call() {
        let transport = Canned::new(&[&meetings_xml(&["m1", "m2", "m3"])]);
        let meetings = bbb(&transport).list_meeting_summaries().unwrap().unwrap();
        assert_eq!(meetings.len(), 3);
        assert_eq!(transport.sent_calls(), ["getMeetings"]);
    }

    #[test]
    fn list_meetings_failed_reply_is_none() {
        let transport = Canned::new(&["<response><returncode>FAILED</returncode></response>"]);
        assert_eq!(bbb(&transport).list_meetings(), Ok(None));
        assert_eq!(transport.sent_calls(), ["getMeetings"]);
    }

    #[test]
    fn publish_and_delete_recordings() {
        let transport = Canned::new(&[
            "<response><returncode>SUCCESS</returncode><published>true</published></response>",
            "<response><returncode>SUCCESS</returncode><deleted>true</deleted></response>",
        ]);
        let api = bbb(&transport);
        assert!(api.publish_recordings("r1", true).unwrap());
        assert!(api.delete_recordings("r1").unwrap());
        assert_eq!(transport.sent_calls(), ["publishRecordings", "deleteRecordings"]);
    }
}
