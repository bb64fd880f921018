use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::{
    api::{OtpApi, SendCodeRequest, VerifyCodeRequest},
    error::{FlowOperation, LoginFlowError},
    identifier::{sanitize_code_input, LoginIdentifier, OtpCode},
    scheduler::{Scheduler, TickHandle},
    session::{AttemptState, AuthenticatedSession, FlowPhase, OtpSession},
    settings::FlowSettings,
    sink::SessionSink,
};

/// Everything a presentation layer needs to render the login flow.
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FlowSnapshot {
    #[allow(missing_docs)]
    pub phase: FlowPhase,
    /// The identifier being verified, or being sent to while the first request is in flight.
    pub identifier: Option<LoginIdentifier>,
    /// `None` until a send succeeds.
    pub attempt_state: Option<AttemptState>,
    #[allow(missing_docs)]
    pub resend_cooldown_seconds: u32,
    #[allow(missing_docs)]
    pub expires_in_seconds: u32,
    /// Whether the resend action should be enabled.
    pub can_resend: bool,
    /// The expiry countdown reached zero. Advisory only.
    pub code_expired: bool,
    /// Sanitized contents of the code field.
    pub code_input: String,
    /// The failure attached to the current state.
    pub error: Option<LoginFlowError>,
    /// Code echoed back by development backends.
    pub debug_otp: Option<String>,
    /// Whether a countdown tick source is running.
    pub tick_active: bool,
}

/// Drives the two-phase OTP login: identifier entry, then code entry.
///
/// All operations take `&self`; wrap the flow in an [`Arc`] to share it with a presentation
/// layer. At most one request is outstanding at a time; calls made while one is in flight are
/// rejected with [`LoginFlowError::RequestInFlight`]. Dropping an operation's future before it
/// resolves returns the flow to the phase it was in before the request. Dropping the flow stops
/// its tick source.
pub struct LoginFlow {
    shared: Arc<Shared>,
    api: Arc<dyn OtpApi>,
    sink: Arc<dyn SessionSink>,
    scheduler: Arc<dyn Scheduler>,
    settings: FlowSettings,
}

struct Shared {
    state: Mutex<FlowState>,
    updates: watch::Sender<FlowSnapshot>,
}

struct FlowState {
    phase: FlowPhase,
    session: Option<OtpSession>,
    /// Identifier of an initial send that has not completed yet.
    pending: Option<LoginIdentifier>,
    verified: Option<LoginIdentifier>,
    error: Option<LoginFlowError>,
    code_input: String,
    debug_otp: Option<String>,
    /// Bumped whenever a request starts or the flow is reset; responses carrying an older
    /// generation are discarded.
    generation: u64,
    ticker: Option<TickHandle>,
}

impl Default for FlowState {
    fn default() -> Self {
        Self {
            phase: FlowPhase::Idle,
            session: None,
            pending: None,
            verified: None,
            error: None,
            code_input: String::new(),
            debug_otp: None,
            generation: 0,
            ticker: None,
        }
    }
}

impl FlowState {
    fn snapshot(&self) -> FlowSnapshot {
        let identifier = self
            .session
            .as_ref()
            .map(|s| s.identifier.clone())
            .or_else(|| self.pending.clone())
            .or_else(|| self.verified.clone());

        let attempt_state = match (&self.session, self.phase) {
            (Some(session), _) => Some(session.attempt_state),
            (None, FlowPhase::Verified) => Some(AttemptState::Verified),
            (None, _) => None,
        };

        FlowSnapshot {
            phase: self.phase,
            identifier,
            attempt_state,
            resend_cooldown_seconds: self
                .session
                .as_ref()
                .map_or(0, |s| s.resend_cooldown_seconds),
            expires_in_seconds: self.session.as_ref().map_or(0, |s| s.expires_in_seconds),
            can_resend: self.phase == FlowPhase::AwaitingCode
                && self.session.as_ref().is_some_and(OtpSession::can_resend),
            code_expired: self.session.as_ref().is_some_and(OtpSession::is_expired),
            code_input: self.code_input.clone(),
            error: self.error.clone(),
            debug_otp: self.debug_otp.clone(),
            tick_active: self.ticker.as_ref().is_some_and(|t| !t.is_cancelled()),
        }
    }

    fn stop_ticker(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.cancel();
        }
    }

    fn discard_session(&mut self) {
        self.stop_ticker();
        self.session = None;
        self.pending = None;
        self.code_input.clear();
        self.debug_otp = None;
    }

    fn attach(&mut self, error: &LoginFlowError) {
        debug_assert!(error.is_user_visible());
        self.error = Some(error.clone());
    }

    fn begin_request(&mut self, phase: FlowPhase) -> u64 {
        self.phase = phase;
        self.error = None;
        self.generation += 1;
        self.generation
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, FlowState> {
        self.state.lock().expect("Mutex is not poisoned")
    }

    fn publish(&self, state: &FlowState) {
        self.updates.send_replace(state.snapshot());
    }

    fn tick(&self) {
        let mut state = self.lock();
        if !matches!(
            state.phase,
            FlowPhase::AwaitingCode | FlowPhase::Verifying | FlowPhase::Sending
        ) {
            return;
        }
        let Some(session) = state.session.as_mut() else {
            return;
        };

        let outcome = session.tick();
        if outcome.resend_enabled {
            debug!("Resend cooldown elapsed");
        }
        if outcome.code_expired {
            debug!(identifier = %session.identifier.masked(), "Code expired");
        }
        self.publish(&state);
    }
}

/// Held across a request's `.await`. If the future is dropped before the response is applied,
/// the flow goes back to `restore` so it is not left waiting on a request nobody polls.
struct InFlight<'a> {
    shared: &'a Shared,
    generation: u64,
    restore: FlowPhase,
    armed: bool,
}

impl<'a> InFlight<'a> {
    fn new(shared: &'a Shared, generation: u64, restore: FlowPhase) -> Self {
        Self {
            shared,
            generation,
            restore,
            armed: true,
        }
    }

    /// The response arrived; the caller applies it. Must be called before taking the state lock.
    fn finish(mut self) {
        self.armed = false;
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let Ok(mut state) = self.shared.state.lock() else {
            return;
        };
        if state.generation != self.generation {
            return;
        }

        state.pending = None;
        if let Some(session) = state.session.as_mut() {
            if session.attempt_state == AttemptState::Verifying {
                session.attempt_state = AttemptState::AwaitingCode;
            }
        }
        state.phase = self.restore;
        state.generation += 1;
        debug!(phase = ?self.restore, "Request abandoned before completion");
        self.shared.publish(&state);
    }
}

enum SendStart {
    Fresh {
        generation: u64,
        identifier: LoginIdentifier,
    },
    Resend,
}

impl LoginFlow {
    #[allow(missing_docs)]
    pub fn new(
        api: Arc<dyn OtpApi>,
        sink: Arc<dyn SessionSink>,
        scheduler: Arc<dyn Scheduler>,
        settings: FlowSettings,
    ) -> Self {
        let state = FlowState::default();
        let (updates, _) = watch::channel(state.snapshot());

        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(state),
                updates,
            }),
            api,
            sink,
            scheduler,
            settings,
        }
    }

    /// The current state.
    pub fn snapshot(&self) -> FlowSnapshot {
        self.shared.lock().snapshot()
    }

    /// Receives a new snapshot after every transition and every tick.
    pub fn subscribe(&self) -> watch::Receiver<FlowSnapshot> {
        self.shared.updates.subscribe()
    }

    /// Validates the identifier and requests a code for it.
    ///
    /// While a code is outstanding, a different identifier discards the session and starts over;
    /// the same identifier is treated as [`LoginFlow::resend`].
    pub async fn submit_identifier(&self, input: &str) -> Result<(), LoginFlowError> {
        let start = {
            let mut state = self.shared.lock();
            match state.phase {
                FlowPhase::Sending | FlowPhase::Verifying => {
                    return Err(LoginFlowError::RequestInFlight)
                }
                FlowPhase::Verified => {
                    return Err(LoginFlowError::InvalidOperation {
                        operation: "submit an identifier",
                        phase: state.phase,
                    })
                }
                FlowPhase::Idle | FlowPhase::AwaitingCode => {}
            }

            match LoginIdentifier::parse(input) {
                Err(e) => {
                    let err = LoginFlowError::from(e);
                    state.attach(&err);
                    self.shared.publish(&state);
                    return Err(err);
                }
                Ok(identifier)
                    if state
                        .session
                        .as_ref()
                        .is_some_and(|s| s.identifier == identifier) =>
                {
                    SendStart::Resend
                }
                Ok(identifier) => {
                    state.discard_session();
                    state.pending = Some(identifier.clone());
                    let generation = state.begin_request(FlowPhase::Sending);
                    self.shared.publish(&state);
                    SendStart::Fresh {
                        generation,
                        identifier,
                    }
                }
            }
        };

        let (generation, identifier) = match start {
            SendStart::Resend => return self.resend().await,
            SendStart::Fresh {
                generation,
                identifier,
            } => (generation, identifier),
        };

        debug!(identifier = %identifier.masked(), "Requesting code");
        let in_flight = InFlight::new(&self.shared, generation, FlowPhase::Idle);
        let result = self
            .api
            .send_code(SendCodeRequest::new(identifier.clone()))
            .await;
        in_flight.finish();

        let mut state = self.shared.lock();
        if state.generation != generation {
            return Err(LoginFlowError::Superseded);
        }
        state.pending = None;

        match result {
            Ok(response) => {
                let expires_in = response
                    .expires_in
                    .unwrap_or(self.settings.default_expiry_seconds);
                debug!(identifier = %identifier.masked(), expires_in, "Code sent");

                state.session = Some(OtpSession::new(
                    identifier,
                    expires_in,
                    self.settings.resend_cooldown_seconds,
                ));
                state.debug_otp = response.debug_otp;
                state.code_input.clear();
                state.phase = FlowPhase::AwaitingCode;
                self.ensure_ticker(&mut state);
                self.shared.publish(&state);
                Ok(())
            }
            Err(e) => {
                let err = e.into_flow_error(FlowOperation::Send);
                warn!(identifier = %identifier.masked(), error = %err, "Sending code failed");

                state.phase = FlowPhase::Idle;
                state.attach(&err);
                self.shared.publish(&state);
                Err(err)
            }
        }
    }

    /// Requests a fresh code for the current identifier once the cooldown has elapsed.
    ///
    /// A failed resend keeps the outstanding session, so the previous code can still be entered.
    pub async fn resend(&self) -> Result<(), LoginFlowError> {
        let (generation, identifier) = {
            let mut state = self.shared.lock();
            match state.phase {
                FlowPhase::Sending | FlowPhase::Verifying => {
                    return Err(LoginFlowError::RequestInFlight)
                }
                FlowPhase::AwaitingCode => {}
                phase => {
                    return Err(LoginFlowError::InvalidOperation {
                        operation: "resend",
                        phase,
                    })
                }
            }

            let Some(session) = state.session.as_ref() else {
                return Err(LoginFlowError::InvalidOperation {
                    operation: "resend",
                    phase: FlowPhase::AwaitingCode,
                });
            };
            if !session.can_resend() {
                return Err(LoginFlowError::ResendUnavailable {
                    remaining_seconds: session.resend_cooldown_seconds,
                });
            }

            let identifier = session.identifier.clone();
            let generation = state.begin_request(FlowPhase::Sending);
            self.shared.publish(&state);
            (generation, identifier)
        };

        debug!(identifier = %identifier.masked(), "Resending code");
        let in_flight = InFlight::new(&self.shared, generation, FlowPhase::AwaitingCode);
        let result = self
            .api
            .send_code(SendCodeRequest::new(identifier.clone()))
            .await;
        in_flight.finish();

        let mut state = self.shared.lock();
        if state.generation != generation {
            return Err(LoginFlowError::Superseded);
        }
        state.phase = FlowPhase::AwaitingCode;

        match result {
            Ok(response) => {
                let expires_in = response
                    .expires_in
                    .unwrap_or(self.settings.default_expiry_seconds);
                if let Some(session) = state.session.as_mut() {
                    session.restart(expires_in, self.settings.resend_cooldown_seconds);
                }
                state.debug_otp = response.debug_otp;
                state.code_input.clear();
                self.ensure_ticker(&mut state);
                self.shared.publish(&state);
                Ok(())
            }
            Err(e) => {
                let err = e.into_flow_error(FlowOperation::Send);
                warn!(identifier = %identifier.masked(), error = %err, "Resending code failed");

                state.attach(&err);
                self.shared.publish(&state);
                Err(err)
            }
        }
    }

    /// Updates the code field, dropping non-digits as typed. Returns the sanitized value.
    pub fn set_code_input(&self, raw: &str) -> String {
        let sanitized = sanitize_code_input(raw);
        let mut state = self.shared.lock();
        if state.phase == FlowPhase::AwaitingCode && state.code_input != sanitized {
            state.code_input.clone_from(&sanitized);
            self.shared.publish(&state);
        }
        sanitized
    }

    /// Verifies a code. Anything other than exactly six ASCII digits is rejected locally.
    ///
    /// On success the session is handed to the [`SessionSink`] and the flow becomes terminal. On
    /// failure the flow returns to code entry with the countdowns untouched.
    pub async fn submit_code(&self, code: &str) -> Result<AuthenticatedSession, LoginFlowError> {
        let (generation, request) = {
            let mut state = self.shared.lock();
            match state.phase {
                FlowPhase::Sending | FlowPhase::Verifying => {
                    return Err(LoginFlowError::RequestInFlight)
                }
                FlowPhase::AwaitingCode => {}
                phase => {
                    return Err(LoginFlowError::InvalidOperation {
                        operation: "submit a code",
                        phase,
                    })
                }
            }

            let code = match OtpCode::parse(code) {
                Ok(code) => code,
                Err(e) => {
                    let err = LoginFlowError::from(e);
                    state.attach(&err);
                    self.shared.publish(&state);
                    return Err(err);
                }
            };

            let Some(session) = state.session.as_mut() else {
                return Err(LoginFlowError::InvalidOperation {
                    operation: "submit a code",
                    phase: FlowPhase::AwaitingCode,
                });
            };
            session.attempt_state = AttemptState::Verifying;
            let request = VerifyCodeRequest::new(session.identifier.clone(), &code);

            state.code_input = code.as_str().to_owned();
            let generation = state.begin_request(FlowPhase::Verifying);
            self.shared.publish(&state);
            (generation, request)
        };

        let identifier = request.identifier.clone();
        debug!(identifier = %identifier.masked(), "Verifying code");
        let in_flight = InFlight::new(&self.shared, generation, FlowPhase::AwaitingCode);
        let result = self.api.verify_code(request).await;
        in_flight.finish();

        let authenticated = {
            let mut state = self.shared.lock();
            if state.generation != generation {
                return Err(LoginFlowError::Superseded);
            }

            match result {
                Ok(response) => {
                    state.discard_session();
                    state.verified = Some(identifier.clone());
                    state.phase = FlowPhase::Verified;
                    self.shared.publish(&state);
                    info!(identifier = %identifier.masked(), "Login verified");

                    AuthenticatedSession {
                        identifier,
                        token: response.token,
                        user: response.user,
                    }
                }
                Err(e) => {
                    let err = e.into_flow_error(FlowOperation::Verify);
                    warn!(identifier = %identifier.masked(), error = %err, "Verifying code failed");

                    if let Some(session) = state.session.as_mut() {
                        session.attempt_state = AttemptState::Failed;
                    }
                    state.code_input.clear();
                    state.phase = FlowPhase::AwaitingCode;
                    state.attach(&err);
                    self.shared.publish(&state);
                    return Err(err);
                }
            }
        };

        self.sink.accept(authenticated.clone());
        Ok(authenticated)
    }

    /// Returns to identifier entry, discarding the session and stopping the countdown. Any
    /// request still in flight completes with [`LoginFlowError::Superseded`]. Does nothing once
    /// verified.
    pub fn back(&self) {
        let mut state = self.shared.lock();
        if state.phase == FlowPhase::Verified {
            return;
        }

        state.discard_session();
        state.phase = FlowPhase::Idle;
        state.error = None;
        state.generation += 1;
        self.shared.publish(&state);
        debug!("Login flow reset");
    }

    /// Starts the countdown unless one is already running.
    fn ensure_ticker(&self, state: &mut FlowState) {
        if state.ticker.as_ref().is_some_and(|t| !t.is_cancelled()) {
            return;
        }

        let shared = Arc::downgrade(&self.shared);
        let ticker = self.scheduler.schedule(
            self.settings.tick_interval(),
            Box::new(move || {
                if let Some(shared) = shared.upgrade() {
                    shared.tick();
                }
            }),
        );
        state.ticker = Some(ticker);
    }
}

impl std::fmt::Debug for LoginFlow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginFlow")
            .field("snapshot", &self.snapshot())
            .field("settings", &self.settings)
            .finish()
    }
}

impl Drop for LoginFlow {
    fn drop(&mut self) {
        if let Ok(mut state) = self.shared.state.lock() {
            state.stop_ticker();
        }
    }
}
