//! Authentication status shared between the auth task and the API.

use serde::Serialize;

/// Snapshot of the device-code handshake as seen by the dashboard.
///
/// Exactly one logical record exists per process, owned by
/// [`crate::manager::AuthManager`]. The auth task replaces the whole record
/// on every transition; readers clone it and never observe a partial write.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AuthStatus {
    pub authenticated: bool,
    pub device_code: Option<String>,
    pub user_code: Option<String>,
    pub verification_url: Option<String>,
    pub message: Option<String>,
    pub expires_in: Option<i64>,
    pub error: Option<String>,
}
