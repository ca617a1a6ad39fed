//! Client for the BigBlueButton administrative API.
//!
//! # Overview
//! Every call is a GET of `{base_url}{call}?{query}&checksum={digest}` where
//! the digest covers the call name, the encoded query and a shared secret.
//! The reply is XML with a `returncode` of `SUCCESS` or `FAILED`. This crate
//! signs the calls, performs them, and turns the replies into booleans or
//! typed records.
//!
//! # Design
//! - `BbbClient` is stateless and does no I/O: `build_*` produces an
//!   `HttpRequest`, `parse_*` consumes an `HttpResponse`.
//! - `BigBlueButton` adds a `Transport` (blocking `ureq` by default) and runs
//!   each operation end to end.
//! - Parameters are an ordered `Params` list, encoded once and used for both
//!   signing and sending.
//! - Replies are parsed into a generic element tree and read through static
//!   per-operation `Shape` descriptors.
//! - Only input, transport and configuration problems are errors. Failed or
//!   unreadable replies become `false` / `None`; `Reply` keeps the detail.
//!
//! ```no_run
//! use bbb_core::{BbbConfig, BigBlueButton, CreateMeeting};
//!
//! let bbb = BigBlueButton::new(BbbConfig::new("https://host/bigbluebutton/api/", "secret"));
//! let created = bbb.create(&CreateMeeting {
//!     name: Some("Weekly sync".to_string()),
//!     ..CreateMeeting::new("weekly-sync")
//! })?;
//! if created {
//!     let url = bbb.join_url("weekly-sync", "Alice", "moderator-password")?;
//!     println!("{url}");
//! }
//! # Ok::<(), bbb_core::BbbError>(())
//! ```

pub mod api;
pub mod checksum;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod invoker;
pub mod query;
pub mod response;
pub mod shape;
pub mod transport;
pub mod types;

pub use api::BigBlueButton;
pub use checksum::{sign, ChecksumAlgorithm};
pub use client::BbbClient;
pub use config::BbbConfig;
pub use error::{BbbError, BbbResult};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use query::Params;
pub use response::{match_field, Document, Element, Failure, ParseFailure, Reply};
pub use shape::{extract, FieldKind, FieldDef, Record, Shape, Value};
pub use transport::{Transport, UreqTransport};
pub use types::{
    Attendee, CreateMeeting, MeetingInfo, MeetingSummary, PlaybackFormat, Recording,
};
