//! Core types for dashpad.
//!
//! This crate provides everything the server binary needs that is not HTTP
//! plumbing:
//! - the device-code authentication flow (`device_code`, `manager`)
//! - the authenticated SharePoint session (`session`)
//! - normalized calendar events and the list fetch (`event`)

pub mod device_code;
pub mod error;
pub mod event;
pub mod manager;
pub mod session;
pub mod status;

pub use error::{DashError, DashResult};
pub use event::{Event, FetchSummary, fetch_events};
pub use manager::{AuthManager, StartedFlow};
pub use session::Session;
pub use status::AuthStatus;
