//! Registration retry driver.
//!
//! One driver runs per process lifetime. It walks the state machine
//!
//! ```text
//! Idle -> Attempting -> Resolved(Registered | Rejected | Failed)
//!            ^    |
//!            |    v
//!        ScheduledRetry        (connection failures only)
//! ```
//!
//! and publishes every transition on a `watch` channel. Attempts never
//! overlap: the next one is scheduled only after the previous one resolved.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::ConfigHandle;
use crate::service_register_center::typos::{
    RegistrationOutcome, RegistrationRequest, RegistryCandidate,
};
use crate::service_register_center::ServiceRegister;

/// Fixed delay before re-attempting after a connection failure.
pub const REGISTRATION_RETRY_DELAY: Duration = Duration::from_millis(10_000);

/// Terminal result of the registration process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The registry accepted this service.
    Registered,
    /// The registry answered outside the success band; not retried.
    Rejected,
    /// An unexpected failure; not retried.
    Failed,
    /// Self-registration had no registry to talk to.
    Disabled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationState {
    Idle,
    Attempting { attempt: u32 },
    /// `attempt` is the number of attempts made so far.
    ScheduledRetry { attempt: u32 },
    Resolved(Resolution),
}

impl RegistrationState {
    /// State entered once attempt number `attempt` produced `outcome`.
    pub fn after(outcome: &RegistrationOutcome, attempt: u32) -> Self {
        match outcome {
            RegistrationOutcome::Success => Self::Resolved(Resolution::Registered),
            RegistrationOutcome::Rejected { .. } => Self::Resolved(Resolution::Rejected),
            RegistrationOutcome::ConnectionFailed(_) => Self::ScheduledRetry { attempt },
            RegistrationOutcome::UnknownError(_) => Self::Resolved(Resolution::Failed),
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }
}

/// Drives registration attempts against a single, pre-selected registry.
#[derive(Debug)]
pub struct RegistrationDriver {
    registry: Arc<dyn ServiceRegister>,
    config: ConfigHandle,
    target: Option<RegistryCandidate>,
    retry_delay: Duration,
    state: watch::Sender<RegistrationState>,
}

impl RegistrationDriver {
    pub fn new(
        registry: Arc<dyn ServiceRegister>,
        config: ConfigHandle,
        target: Option<RegistryCandidate>,
    ) -> Self {
        let (state, _) = watch::channel(RegistrationState::Idle);
        Self {
            registry,
            config,
            target,
            retry_delay: REGISTRATION_RETRY_DELAY,
            state,
        }
    }

    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    pub fn subscribe(&self) -> watch::Receiver<RegistrationState> {
        self.state.subscribe()
    }

    /// Runs attempts until the process is registered, rejected or hits an
    /// unexpected error. Connection failures are retried without limit.
    pub async fn run(self) -> Resolution {
        let Some(target) = self.target.clone() else {
            warn!("Self-registration is enabled but no registry service is configured, skipping");
            self.transition(RegistrationState::Resolved(Resolution::Disabled));
            return Resolution::Disabled;
        };

        let mut attempt: u32 = 0;
        loop {
            attempt = attempt.saturating_add(1);
            self.transition(RegistrationState::Attempting { attempt });

            let outcome = self.attempt(&target).await;
            self.report(&target, attempt, &outcome);

            let next = RegistrationState::after(&outcome, attempt);
            self.transition(next.clone());

            match next {
                RegistrationState::Resolved(resolution) => return resolution,
                _ => tokio::time::sleep(self.retry_delay).await,
            }
        }
    }

    /// Spawns [`RegistrationDriver::run`] on the current runtime.
    pub fn spawn(self) -> RegistrationTask {
        let state = self.subscribe();
        let handle = tokio::spawn(self.run());
        RegistrationTask { state, handle }
    }

    async fn attempt(&self, target: &RegistryCandidate) -> RegistrationOutcome {
        // 每次尝试都重新读取当前配置
        let config = self.config.current();
        match RegistrationRequest::from_config(&config) {
            Ok(request) => self.registry.register(target, &request).await,
            Err(e) => RegistrationOutcome::UnknownError(e.to_string()),
        }
    }

    fn report(&self, target: &RegistryCandidate, attempt: u32, outcome: &RegistrationOutcome) {
        let registry = &target.endpoint;
        match outcome {
            RegistrationOutcome::Success => {
                info!(%registry, attempt, "Service registered with registry");
            }
            RegistrationOutcome::Rejected { status, body } => {
                warn!(%registry, attempt, status, body = %body, "Registry rejected registration, not retrying");
            }
            RegistrationOutcome::ConnectionFailed(reason) => {
                warn!(
                    %registry,
                    attempt,
                    reason = %reason,
                    "Registry may be unreachable, retrying in {:?}",
                    self.retry_delay
                );
            }
            RegistrationOutcome::UnknownError(reason) => {
                warn!(%registry, attempt, reason = %reason, "Registration failed unexpectedly, not retrying");
            }
        }
    }

    fn transition(&self, state: RegistrationState) {
        self.state.send_replace(state);
    }
}

/// Handle to a spawned registration driver.
#[derive(Debug)]
pub struct RegistrationTask {
    state: watch::Receiver<RegistrationState>,
    handle: JoinHandle<Resolution>,
}

impl RegistrationTask {
    pub fn state(&self) -> RegistrationState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<RegistrationState> {
        self.state.clone()
    }

    /// Waits for a terminal state. `None` if the driver was torn down first.
    pub async fn resolved(&mut self) -> Option<Resolution> {
        let state = self
            .state
            .wait_for(RegistrationState::is_resolved)
            .await
            .ok()?;
        match *state {
            RegistrationState::Resolved(resolution) => Some(resolution),
            _ => None,
        }
    }

    /// Stops the driver, including any pending retry timer. Only used when the
    /// process itself is going away.
    pub fn abort(&self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}
