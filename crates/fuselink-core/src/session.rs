//! DMR Homebrew session state machine.
//!
//! Manages the challenge/response login, keep-alive, and failure
//! recovery against a Homebrew master. Uses the action pattern: methods
//! take time as input and return actions for the endpoint to execute.
//! This keeps the state machine pure (no I/O) and makes testing
//! straightforward.
//!
//! # State Machine
//!
//! ```text
//! ┌────────────────┐ tick: RPTL ┌───────────────┐ RPTACK(salt): RPTK
//! │ WaitingConnect │───────────>│ WaitingLogin  │──────────────────┐
//! └────────────────┘            └───────────────┘                  │
//!        ↑       ↑                     ↑ MSTNAK                    ↓
//!        │ MSTCL │ timeout             ├────────────────┬──────────────┐
//!        │       │                     │                │ WaitingAuth  │
//! ┌──────┴───────┴─┐  RPTACK   ┌───────┴───────┐ RPTACK └──────────────┘
//! │    Running     │<──────────│ WaitingOptions│<──┐ RPTACK: RPTC
//! └────────────────┘ (or direct└───────────────┘   │      ↓
//!         MSTPONG refreshes     from config when ┌─┴──────────────┐
//!         the 60 s timeout)     options empty)   │ WaitingConfig  │
//!                                                └────────────────┘
//! ```

use std::{
    ops::Sub,
    time::{Duration, Instant},
};

use fuselink_proto::homebrew::{self, RepeaterConfig, Signaling};
use tracing::{debug, info, warn};

/// Interval between retry ticks (login resends, keep-alive pings).
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(10);

/// Maximum silence from the master before the session restarts.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(60);

/// Actions returned by the session state machine.
///
/// The endpoint executes these: `Send` serializes to the master socket,
/// `Reconnect` tears the socket down and binds a fresh one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
    /// Transmit this packet to the master.
    Send(Vec<u8>),
    /// The connection timed out; reopen the socket before continuing.
    Reconnect,
}

/// Authentication progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Not yet started (or restarted after loss).
    WaitingConnect,
    /// `RPTL` sent, waiting for the salt.
    WaitingLogin,
    /// `RPTK` sent, waiting for acceptance.
    WaitingAuth,
    /// `RPTC` sent, waiting for acceptance.
    WaitingConfig,
    /// `RPTO` sent, waiting for acceptance.
    WaitingOptions,
    /// Authenticated; voice flows and pings keep the session alive.
    Running,
}

/// Session configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Repeater ID presented to the master.
    pub repeater_id: u32,
    /// Shared secret for the salted login hash.
    pub password: String,
    /// Station description sent in `RPTC`.
    pub repeater: RepeaterConfig,
    /// Master options string; empty skips the `RPTO` phase.
    pub options: String,
    /// Retry tick interval.
    pub retry_interval: Duration,
    /// Master silence tolerance.
    pub connect_timeout: Duration,
}

/// Homebrew authentication state machine.
///
/// Generic over the instant type so tests can drive virtual time.
#[derive(Debug, Clone)]
pub struct HomebrewSession<I = Instant>
where
    I: Copy + Ord + Send + Sync + Sub<Output = Duration>,
{
    config: SessionConfig,
    state: SessionState,
    salt: [u8; 4],
    /// Last packet send, for the retry tick.
    last_send: Option<I>,
    /// Last proof of life from the master.
    last_alive: Option<I>,
}

impl<I> HomebrewSession<I>
where
    I: Copy + Ord + Send + Sync + Sub<Output = Duration>,
{
    /// Create a session in `WaitingConnect`; the first [`Self::poll`]
    /// sends the login.
    #[must_use]
    pub fn new(config: SessionConfig) -> Self {
        Self { config, state: SessionState::WaitingConnect, salt: [0; 4], last_send: None, last_alive: None }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Whether voice may flow.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state == SessionState::Running
    }

    /// Drive timers. Call at least once per retry interval.
    pub fn poll(&mut self, now: I) -> Vec<SessionAction> {
        let mut actions = Vec::new();

        if self.state == SessionState::Running
            && self.last_alive.is_some_and(|t| now - t >= self.config.connect_timeout)
        {
            warn!("master silent for {:?}, restarting session", self.config.connect_timeout);
            self.state = SessionState::WaitingConnect;
            self.last_alive = None;
            actions.push(SessionAction::Reconnect);
        }

        let retry_due =
            self.last_send.is_none_or(|t| now - t >= self.config.retry_interval);
        if !retry_due {
            return actions;
        }

        match self.state {
            SessionState::WaitingConnect => {
                info!(repeater = self.config.repeater_id, "logging in to master");
                actions.push(SessionAction::Send(homebrew::login(self.config.repeater_id).to_vec()));
                // Arm the connection timeout alongside the first login
                self.last_alive = Some(now);
                self.state = SessionState::WaitingLogin;
            }
            SessionState::WaitingLogin => {
                debug!("resending login");
                actions.push(SessionAction::Send(homebrew::login(self.config.repeater_id).to_vec()));
            }
            SessionState::WaitingAuth => {
                debug!("resending authorization");
                actions.push(SessionAction::Send(
                    homebrew::auth_key(self.config.repeater_id, self.salt, &self.config.password)
                        .to_vec(),
                ));
            }
            SessionState::WaitingConfig => {
                debug!("resending configuration");
                actions.push(SessionAction::Send(homebrew::config(&self.config.repeater).to_vec()));
            }
            SessionState::WaitingOptions => {
                debug!("resending options");
                actions.push(SessionAction::Send(homebrew::options(
                    self.config.repeater_id,
                    &self.config.options,
                )));
            }
            SessionState::Running => {
                actions.push(SessionAction::Send(homebrew::ping(self.config.repeater_id).to_vec()));
            }
        }
        self.last_send = Some(now);
        actions
    }

    /// Process an inbound signaling packet.
    pub fn handle(&mut self, signaling: Signaling, now: I) -> Vec<SessionAction> {
        match signaling {
            Signaling::Ack { salt } => self.handle_ack(salt, now),
            Signaling::Nak => {
                warn!(state = ?self.state, "master rejected us, retrying login");
                self.state = SessionState::WaitingLogin;
                Vec::new()
            }
            Signaling::Pong => {
                if self.state == SessionState::Running {
                    self.last_alive = Some(now);
                }
                Vec::new()
            }
            Signaling::Closing => {
                warn!("master is closing, restarting session");
                self.state = SessionState::WaitingConnect;
                self.last_send = None;
                Vec::new()
            }
            Signaling::Dmrd | Signaling::Beacon | Signaling::Other => Vec::new(),
        }
    }

    /// Graceful shutdown: tell the master we are leaving.
    pub fn close(&mut self) -> Vec<SessionAction> {
        let was_past_login = self.state != SessionState::WaitingConnect;
        self.state = SessionState::WaitingConnect;
        self.last_send = None;
        if was_past_login {
            vec![SessionAction::Send(homebrew::close(self.config.repeater_id).to_vec())]
        } else {
            Vec::new()
        }
    }

    fn handle_ack(&mut self, salt: Option<[u8; 4]>, now: I) -> Vec<SessionAction> {
        match self.state {
            SessionState::WaitingLogin => {
                let Some(salt) = salt else {
                    debug!("login acknowledged without salt, ignoring");
                    return Vec::new();
                };
                self.salt = salt;
                self.state = SessionState::WaitingAuth;
                self.last_send = Some(now);
                vec![SessionAction::Send(
                    homebrew::auth_key(self.config.repeater_id, salt, &self.config.password)
                        .to_vec(),
                )]
            }
            SessionState::WaitingAuth => {
                info!("authorized, sending configuration");
                self.state = SessionState::WaitingConfig;
                self.last_send = Some(now);
                vec![SessionAction::Send(homebrew::config(&self.config.repeater).to_vec())]
            }
            SessionState::WaitingConfig => {
                if self.config.options.is_empty() {
                    info!("session established");
                    self.state = SessionState::Running;
                    self.last_alive = Some(now);
                    Vec::new()
                } else {
                    self.state = SessionState::WaitingOptions;
                    self.last_send = Some(now);
                    vec![SessionAction::Send(homebrew::options(
                        self.config.repeater_id,
                        &self.config.options,
                    ))]
                }
            }
            SessionState::WaitingOptions => {
                info!("session established");
                self.state = SessionState::Running;
                self.last_alive = Some(now);
                Vec::new()
            }
            SessionState::WaitingConnect | SessionState::Running => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(options: &str) -> SessionConfig {
        SessionConfig {
            repeater_id: 123_456,
            password: "TEST".into(),
            repeater: RepeaterConfig {
                repeater_id: 123_456,
                callsign: "KJ4ABC".into(),
                rx_frequency: 435_000_000,
                tx_frequency: 430_000_000,
                power: 1,
                color_code: 1,
                latitude: 0.0,
                longitude: 0.0,
                height: 0,
                location: "Nowhere".into(),
                description: "test".into(),
                slots: '2',
                url: String::new(),
                software_id: "fuselink".into(),
                package_id: "fuselink".into(),
            },
            options: options.into(),
            retry_interval: DEFAULT_RETRY_INTERVAL,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    fn send_prefix(action: &SessionAction) -> &[u8] {
        match action {
            SessionAction::Send(bytes) => &bytes[..bytes.len().min(7)],
            SessionAction::Reconnect => b"",
        }
    }

    #[test]
    fn four_acks_reach_running() {
        let mut session: HomebrewSession<Instant> = HomebrewSession::new(config("TS2=505"));
        let now = Instant::now();

        let actions = session.poll(now);
        assert!(send_prefix(&actions[0]).starts_with(b"RPTL"));
        assert_eq!(session.state(), SessionState::WaitingLogin);

        let actions = session.handle(Signaling::Ack { salt: Some([0x12, 0x34, 0x56, 0x78]) }, now);
        assert!(send_prefix(&actions[0]).starts_with(b"RPTK"));
        assert_eq!(session.state(), SessionState::WaitingAuth);

        let actions = session.handle(Signaling::Ack { salt: None }, now);
        assert!(send_prefix(&actions[0]).starts_with(b"RPTC"));
        assert_eq!(session.state(), SessionState::WaitingConfig);

        let actions = session.handle(Signaling::Ack { salt: None }, now);
        assert!(send_prefix(&actions[0]).starts_with(b"RPTO"));
        assert_eq!(session.state(), SessionState::WaitingOptions);

        let actions = session.handle(Signaling::Ack { salt: None }, now);
        assert!(actions.is_empty());
        assert!(session.is_running());
    }

    #[test]
    fn empty_options_skip_the_options_phase() {
        let mut session: HomebrewSession<Instant> = HomebrewSession::new(config(""));
        let now = Instant::now();
        session.poll(now);
        session.handle(Signaling::Ack { salt: Some([1, 2, 3, 4]) }, now);
        session.handle(Signaling::Ack { salt: None }, now);
        session.handle(Signaling::Ack { salt: None }, now);
        assert!(session.is_running());
    }

    #[test]
    fn nak_returns_to_login_from_any_phase() {
        let mut session: HomebrewSession<Instant> = HomebrewSession::new(config(""));
        let now = Instant::now();
        session.poll(now);
        session.handle(Signaling::Ack { salt: Some([1, 2, 3, 4]) }, now);
        assert_eq!(session.state(), SessionState::WaitingAuth);

        session.handle(Signaling::Nak, now);
        assert_eq!(session.state(), SessionState::WaitingLogin);
    }

    #[test]
    fn retry_tick_resends_current_phase_packet() {
        let mut session: HomebrewSession<Instant> = HomebrewSession::new(config(""));
        let start = Instant::now();
        session.poll(start);

        // Within the interval: silence
        assert!(session.poll(start + Duration::from_secs(5)).is_empty());

        // Past the interval: login again
        let actions = session.poll(start + Duration::from_secs(11));
        assert!(send_prefix(&actions[0]).starts_with(b"RPTL"));
    }

    #[test]
    fn running_session_pings_and_times_out() {
        let mut session: HomebrewSession<Instant> = HomebrewSession::new(config(""));
        let start = Instant::now();
        session.poll(start);
        session.handle(Signaling::Ack { salt: Some([1, 2, 3, 4]) }, start);
        session.handle(Signaling::Ack { salt: None }, start);
        session.handle(Signaling::Ack { salt: None }, start);
        assert!(session.is_running());

        let actions = session.poll(start + Duration::from_secs(12));
        assert!(send_prefix(&actions[0]).starts_with(b"RPTPING"));

        // Pong refreshes the timeout
        session.handle(Signaling::Pong, start + Duration::from_secs(13));
        let actions = session.poll(start + Duration::from_secs(30));
        assert!(!actions.contains(&SessionAction::Reconnect));

        // Silence past the timeout restarts the session
        let actions = session.poll(start + Duration::from_secs(80));
        assert_eq!(actions[0], SessionAction::Reconnect);
        // The same tick already starts the new login
        assert!(send_prefix(&actions[1]).starts_with(b"RPTL"));
        assert_eq!(session.state(), SessionState::WaitingLogin);
    }

    #[test]
    fn master_close_restarts() {
        let mut session: HomebrewSession<Instant> = HomebrewSession::new(config(""));
        let now = Instant::now();
        session.poll(now);
        session.handle(Signaling::Closing, now);
        assert_eq!(session.state(), SessionState::WaitingConnect);
    }

    #[test]
    fn graceful_close_notifies_master() {
        let mut session: HomebrewSession<Instant> = HomebrewSession::new(config(""));
        let now = Instant::now();
        session.poll(now);
        let actions = session.close();
        assert!(send_prefix(&actions[0]).starts_with(b"RPTCL"));
        assert_eq!(session.state(), SessionState::WaitingConnect);
    }
}
