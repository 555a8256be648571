//! Extraction handshake as a pure state machine.
//!
//! One [`Coordination`] drives a single `getContent` exchange with a page:
//!
//! ```text
//! Init -> InjectCheck -> (Injecting -> Settling) -> Sending -> Succeeded
//!                                                      |
//!                                                      +-> Injecting (retry) ... -> Failed
//! ```
//!
//! A timeout, a closed channel and an `{error}` reply all count as a failed
//! attempt. Only a refused injection ends the exchange early.
//!
//! [`step`] never performs IO; it returns [`CoordinatorEffect`]s for the
//! caller to execute and expects the outcome back as a [`CoordinatorMsg`].
use std::time::Duration;

use crate::ExtractedContent;

pub const DEFAULT_MAX_RETRIES: u32 = 2;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(100);
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_millis(500);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra `getContent` attempts after the first one.
    pub max_retries: u32,
    /// Pause after every injection before the next send.
    pub retry_delay: Duration,
    pub probe_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Init,
    InjectCheck,
    Injecting,
    Settling,
    Sending,
    Succeeded,
    Failed,
}

/// How the extractor came to be available in the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    AlreadyPresent,
    Injected,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoordinatorMsg {
    Start,
    ProbeAnswered,
    ProbeUnanswered,
    InjectionSucceeded,
    InjectionRefused { reason: String },
    DelayElapsed,
    ContentReceived(ExtractedContent),
    /// The page answered, but with an extractor error. Retried like a
    /// channel failure.
    ExtractorFailed { message: String },
    /// No usable reply: timeout, closed channel, or navigation.
    ChannelFailed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoordinatorEffect {
    Probe { timeout: Duration },
    Inject,
    Wait(Duration),
    Send { timeout: Duration },
    Finish(Result<ExtractedContent, CoordinatorError>),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoordinatorError {
    #[error("Could not connect to the page. Please refresh and try again.")]
    Connection { attempts: u32, last_failure: String },
    #[error("Failed to initialize page analysis. Please refresh and try again.")]
    Initialization { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Coordination {
    policy: RetryPolicy,
    phase: Phase,
    presence: Option<Presence>,
    sends: u32,
    injections: u32,
    last_failure: Option<String>,
}

impl Coordination {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn presence(&self) -> Option<Presence> {
        self.presence
    }

    pub fn sends(&self) -> u32 {
        self.sends
    }

    pub fn injections(&self) -> u32 {
        self.injections
    }

    fn begin_send(&mut self) -> CoordinatorEffect {
        self.phase = Phase::Sending;
        self.sends += 1;
        CoordinatorEffect::Send {
            timeout: self.policy.request_timeout,
        }
    }

    fn begin_inject(&mut self) -> CoordinatorEffect {
        self.phase = Phase::Injecting;
        self.injections += 1;
        CoordinatorEffect::Inject
    }

    fn fail(&mut self, error: CoordinatorError) -> CoordinatorEffect {
        self.phase = Phase::Failed;
        CoordinatorEffect::Finish(Err(error))
    }
}

/// Applies one message and returns the effects to run next.
///
/// Messages that do not fit the current phase are ignored, and terminal
/// phases absorb everything.
pub fn step(mut state: Coordination, msg: CoordinatorMsg) -> (Coordination, Vec<CoordinatorEffect>) {
    let effects = match (state.phase, msg) {
        (Phase::Init, CoordinatorMsg::Start) => {
            state.phase = Phase::InjectCheck;
            vec![CoordinatorEffect::Probe {
                timeout: state.policy.probe_timeout,
            }]
        }
        (Phase::InjectCheck, CoordinatorMsg::ProbeAnswered) => {
            state.presence = Some(Presence::AlreadyPresent);
            vec![state.begin_send()]
        }
        (Phase::InjectCheck, CoordinatorMsg::ProbeUnanswered) => vec![state.begin_inject()],
        (Phase::Injecting, CoordinatorMsg::InjectionSucceeded) => {
            state.presence.get_or_insert(Presence::Injected);
            state.phase = Phase::Settling;
            vec![CoordinatorEffect::Wait(state.policy.retry_delay)]
        }
        (Phase::Injecting, CoordinatorMsg::InjectionRefused { reason }) => {
            vec![state.fail(CoordinatorError::Initialization { reason })]
        }
        (Phase::Settling, CoordinatorMsg::DelayElapsed) => vec![state.begin_send()],
        (Phase::Sending, CoordinatorMsg::ContentReceived(content)) => {
            state.phase = Phase::Succeeded;
            vec![CoordinatorEffect::Finish(Ok(content))]
        }
        (Phase::Sending, CoordinatorMsg::ExtractorFailed { message: reason })
        | (Phase::Sending, CoordinatorMsg::ChannelFailed { reason }) => {
            state.last_failure = Some(reason);
            if state.sends <= state.policy.max_retries {
                vec![state.begin_inject()]
            } else {
                let error = CoordinatorError::Connection {
                    attempts: state.sends,
                    last_failure: state.last_failure.take().unwrap_or_default(),
                };
                vec![state.fail(error)]
            }
        }
        _ => Vec::new(),
    };

    (state, effects)
}
