//! Device-code authentication state machine.
//!
//! `Idle -> DeviceCodeIssued -> (Authenticated | Failed)`, back to `Idle` on
//! logout. `start()` does the single bounded devicecode request and spawns
//! the long token poll on a background task, so callers are only ever blocked
//! for one round-trip. The status record is replaced wholesale under a lock
//! that is never held across an await, so `status()` always reads a
//! consistent snapshot.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{Duration, Utc};

use crate::device_code::{DeviceCodeResponse, IdentityClient, PollOutcome, scope_for_site};
use crate::error::{DashError, DashResult};
use crate::session::Session;
use crate::status::AuthStatus;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Phase {
    Idle,
    DeviceCodeIssued,
    Authenticated,
    Failed,
}

struct AuthState {
    phase: Phase,
    status: AuthStatus,
    session: Option<Arc<Session>>,
    /// Bumped on logout so a poll task from a previous run publishes nothing.
    epoch: u64,
}

impl AuthState {
    fn zero(epoch: u64) -> Self {
        AuthState {
            phase: Phase::Idle,
            status: AuthStatus::default(),
            session: None,
            epoch,
        }
    }
}

/// What `start()` hands back for the dashboard to display.
#[derive(Debug, Clone)]
pub struct StartedFlow {
    pub user_code: String,
    pub verification_url: String,
    pub expires_in: i64,
    pub message: String,
}

/// Owns the process-wide auth state. Cloning shares the same state.
#[derive(Clone)]
pub struct AuthManager {
    identity: Arc<IdentityClient>,
    state: Arc<RwLock<AuthState>>,
}

/// `start()` is only legal while no flow is running and no session is held.
fn ensure_startable(phase: Phase) -> DashResult<()> {
    match phase {
        Phase::DeviceCodeIssued => Err(DashError::AuthProvider(
            "authentication already in progress".to_string(),
        )),
        Phase::Authenticated => Err(DashError::AuthProvider(
            "already authenticated; log out first".to_string(),
        )),
        Phase::Idle | Phase::Failed => Ok(()),
    }
}

impl AuthManager {
    pub fn new() -> Self {
        Self::with_identity(IdentityClient::new())
    }

    /// Manager backed by a custom identity client (tests, self-hosted
    /// authorities).
    pub fn with_identity(identity: IdentityClient) -> Self {
        AuthManager {
            identity: Arc::new(identity),
            state: Arc::new(RwLock::new(AuthState::zero(0))),
        }
    }

    fn read_state(&self) -> RwLockReadGuard<'_, AuthState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, AuthState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Kick off the device-code handshake against `site_url`.
    ///
    /// Valid from `Idle` or `Failed`; a flow that is already running or
    /// already authenticated is an error rather than a restart.
    pub async fn start(&self, site_url: &str, list_name: &str) -> DashResult<StartedFlow> {
        ensure_startable(self.read_state().phase)?;

        let scope = scope_for_site(site_url)?;
        let issued = self.identity.request_device_code(&scope).await?;

        let epoch = {
            let mut state = self.write_state();
            // A concurrent start may have won the race during the await
            // above; only one flow gets to publish and spawn its poll task.
            ensure_startable(state.phase)?;
            state.phase = Phase::DeviceCodeIssued;
            state.session = None;
            state.status = AuthStatus {
                authenticated: false,
                device_code: Some(issued.device_code.clone()),
                user_code: Some(issued.user_code.clone()),
                verification_url: Some(issued.verification_uri.clone()),
                message: Some(issued.message.clone()),
                expires_in: Some(issued.expires_in),
                error: None,
            };
            state.epoch
        };

        let flow = StartedFlow {
            user_code: issued.user_code.clone(),
            verification_url: issued.verification_uri.clone(),
            expires_in: issued.expires_in,
            message: issued.message.clone(),
        };

        let manager = self.clone();
        let site_url = site_url.to_string();
        let list_name = list_name.to_string();
        tokio::spawn(async move {
            let result = manager
                .poll_until_complete(&issued, &site_url, &list_name)
                .await;
            manager.publish_outcome(epoch, result);
        });

        Ok(flow)
    }

    /// Non-blocking snapshot of the current status. Callable from any state.
    pub fn status(&self) -> AuthStatus {
        self.read_state().status.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        let state = self.read_state();
        state.phase == Phase::Authenticated && state.session.is_some()
    }

    /// The authenticated session, or `NotAuthenticated`.
    pub fn session(&self) -> DashResult<Arc<Session>> {
        let state = self.read_state();
        match (state.phase, &state.session) {
            (Phase::Authenticated, Some(session)) => Ok(Arc::clone(session)),
            _ => Err(DashError::NotAuthenticated),
        }
    }

    /// Drop the session and reset to the zero state, from any phase.
    pub fn logout(&self) {
        let mut state = self.write_state();
        let epoch = state.epoch + 1;
        *state = AuthState::zero(epoch);
    }

    /// Blocks until the user completes sign-in out-of-band, the code
    /// expires, or the provider rejects the grant. Runs on its own task.
    async fn poll_until_complete(
        &self,
        issued: &DeviceCodeResponse,
        site_url: &str,
        list_name: &str,
    ) -> DashResult<(Arc<Session>, String)> {
        let deadline = Utc::now() + Duration::seconds(issued.expires_in);
        let mut interval = issued.interval.max(1);

        loop {
            if Utc::now() > deadline {
                return Err(DashError::AuthTimeout);
            }

            tokio::time::sleep(std::time::Duration::from_secs(interval)).await;

            match self.identity.poll_token(&issued.device_code).await? {
                PollOutcome::Pending => {}
                PollOutcome::SlowDown => interval += 5,
                PollOutcome::Expired => return Err(DashError::AuthTimeout),
                PollOutcome::Denied(reason) => return Err(DashError::AuthProvider(reason)),
                PollOutcome::Authorized(token) => {
                    let session = Arc::new(Session::new(site_url, list_name, token.access_token));
                    let title = session.probe().await?;
                    return Ok((session, format!("Successfully connected to: {title}")));
                }
            }
        }
    }

    /// Single writer for the terminal transition. A logout since the poll
    /// task started invalidates its result.
    fn publish_outcome(&self, epoch: u64, result: DashResult<(Arc<Session>, String)>) {
        let mut state = self.write_state();

        if state.epoch != epoch {
            return;
        }

        match result {
            Ok((session, message)) => {
                println!("Authentication successful");
                state.phase = Phase::Authenticated;
                state.session = Some(session);
                state.status = AuthStatus {
                    authenticated: true,
                    message: Some(message),
                    ..AuthStatus::default()
                };
            }
            Err(e) => {
                eprintln!("Authentication failed: {e}");
                state.phase = Phase::Failed;
                state.session = None;
                state.status = AuthStatus {
                    error: Some(e.to_string()),
                    ..AuthStatus::default()
                };
            }
        }
    }
}

impl Default for AuthManager {
    fn default() -> Self {
        Self::new()
    }
}
