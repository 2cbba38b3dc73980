//! Finite State Machine for the command poll loop

use serde::{Deserialize, Serialize};

/// Poll loop state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PollState {
    /// Sleeping until the next poll
    Waiting,

    /// Poll request in flight
    Polling,

    /// Dispatching a batch of commands
    Dispatching,

    /// The brain answered 409, the deployment was already over
    ConflictTerminal,

    /// A finished command reported success
    FinishedTerminal,

    /// A finished command reported a failed deployment
    FinishedFailed,

    /// The time budget ran out
    Timeout,

    /// The caller cancelled the wait
    Cancelled,
}

impl PollState {
    /// Whether no further transition can happen
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PollState::ConflictTerminal
                | PollState::FinishedTerminal
                | PollState::FinishedFailed
                | PollState::Timeout
                | PollState::Cancelled
        )
    }
}

/// Poll loop event
#[derive(Debug, Clone)]
pub enum PollEvent {
    /// Issue a poll request
    Poll,

    /// Poll returned no commands
    NoCommands,

    /// Poll returned commands
    CommandsReceived(usize),

    /// Every command of the batch was dispatched
    BatchDispatched,

    /// Poll returned 409
    Conflict,

    /// Deployment finished successfully
    Finished,

    /// Deployment finished unsuccessfully
    FinishedFailed(String),

    /// Deadline exceeded
    DeadlineExceeded,

    /// Cancellation observed
    Cancel,
}

/// Poll loop FSM
#[derive(Debug, Clone)]
pub struct PollFsm {
    state: PollState,
    error: Option<String>,
    polls: u32,
}

impl PollFsm {
    /// Create a new FSM in waiting state
    pub fn new() -> Self {
        Self {
            state: PollState::Waiting,
            error: None,
            polls: 0,
        }
    }

    /// Get current state
    pub fn state(&self) -> PollState {
        self.state
    }

    /// Get the failure reason of a failed deployment, if any
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Number of poll requests issued so far
    pub fn polls(&self) -> u32 {
        self.polls
    }

    /// Process an event and transition state
    pub fn process(&mut self, event: PollEvent) -> Result<(), String> {
        let new_state = match (&self.state, &event) {
            // From Waiting
            (PollState::Waiting, PollEvent::Poll) => {
                self.polls += 1;
                PollState::Polling
            }

            // From Polling
            (PollState::Polling, PollEvent::NoCommands) => PollState::Waiting,
            (PollState::Polling, PollEvent::CommandsReceived(n)) if *n > 0 => {
                PollState::Dispatching
            }
            (PollState::Polling, PollEvent::Conflict) => PollState::ConflictTerminal,

            // From Dispatching
            (PollState::Dispatching, PollEvent::BatchDispatched) => PollState::Waiting,
            (PollState::Dispatching, PollEvent::Finished) => PollState::FinishedTerminal,
            (PollState::Dispatching, PollEvent::FinishedFailed(err)) => {
                self.error = Some(err.clone());
                PollState::FinishedFailed
            }

            // Deadline and cancellation interrupt any live state
            (state, PollEvent::DeadlineExceeded) if !state.is_terminal() => PollState::Timeout,
            (state, PollEvent::Cancel) if !state.is_terminal() => PollState::Cancelled,

            // Invalid transitions
            (state, event) => {
                return Err(format!("Invalid transition: {:?} -> {:?}", state, event));
            }
        };

        self.state = new_state;
        Ok(())
    }
}

impl Default for PollFsm {
    fn default() -> Self {
        Self::new()
    }
}
