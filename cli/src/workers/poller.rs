//! Command poller: waits for a deployment to finish while serving its commands

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use brain_client::CliPollRequest;
use secrecy::{ExposeSecret, SecretString};
use tokio::time::Instant;
use tracing::{debug, info};

use crate::deploy::dispatcher::{Dispatched, Dispatcher};
use crate::deploy::fsm::{PollEvent, PollFsm};
use crate::errors::CliError;
use crate::http::deployments::{Orchestrator, PollResponse};
use crate::models::command::Command;
use crate::storage::settings::ExecTokenPolicy;

/// Poller options
#[derive(Debug, Clone)]
pub struct Options {
    /// Polling interval
    pub interval: Duration,

    /// Total time budget for the wait
    pub expiry: Duration,

    /// Sleep one interval before the very first poll
    pub wait_before_first_poll: bool,

    /// Whether the exec token goes out with every poll or the first one only
    pub exec_token: ExecTokenPolicy,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            expiry: Duration::from_secs(60 * 60),
            wait_before_first_poll: true,
            exec_token: ExecTokenPolicy::EveryPoll,
        }
    }
}

/// How a wait ended successfully
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitOutcome {
    /// A `DEPLOYMENT_FINISHED` command arrived
    Finished(Command),

    /// The brain answered 409, the deployment had already finished
    AlreadyFinished,
}

/// Per-wait polling state; each [`wait`] call owns exactly one
#[derive(Debug, Default)]
struct PollSession {
    cursor: Option<String>,
    highest_seq: Option<i64>,
    first_pass: bool,
    token_sent: bool,
    fsm: PollFsm,
}

impl PollSession {
    fn new() -> Self {
        Self {
            first_pass: true,
            ..Default::default()
        }
    }

    fn request(&mut self, exec_token: Option<&SecretString>, policy: ExecTokenPolicy) -> CliPollRequest {
        let send_token = match policy {
            ExecTokenPolicy::EveryPoll => true,
            ExecTokenPolicy::FirstPollOnly => !self.token_sent,
        };
        let exec_token = exec_token
            .filter(|_| send_token)
            .map(|token| token.expose_secret().to_string());
        if exec_token.is_some() {
            self.token_sent = true;
        }

        CliPollRequest {
            command_id: self.cursor.clone(),
            exec_token,
        }
    }

    /// Move the cursor forward; commands older than the newest seen leave it alone
    fn advance(&mut self, command: &Command) {
        if self.highest_seq.map_or(true, |seq| command.seq_order >= seq) {
            self.highest_seq = Some(command.seq_order);
            self.cursor = Some(command.id.clone());
        }
    }

    fn transition(&mut self, event: PollEvent) -> Result<(), CliError> {
        self.fsm.process(event).map_err(CliError::Internal)
    }

    fn timeout(&mut self, expiry: Duration) -> CliError {
        let _ = self.fsm.process(PollEvent::DeadlineExceeded);
        CliError::Timeout(expiry)
    }

    fn cancel(&mut self) -> CliError {
        let _ = self.fsm.process(PollEvent::Cancel);
        info!("Stopped waiting for the deployment");
        CliError::Cancelled
    }
}

/// Poll the brain for `deployment_id` until it finishes, `options.expiry`
/// elapses or `shutdown_signal` resolves.
///
/// Sleeps, poll requests and command dispatch all race `shutdown_signal` and
/// the deadline, so nothing new is started once either fires.
///
/// Poll errors are returned as-is, never retried here. A finished command
/// that reports a failed deployment yields [`CliError::DeploymentFailed`].
pub async fn wait<S, F>(
    options: &Options,
    orchestrator: &dyn Orchestrator,
    dispatcher: &Dispatcher,
    deployment_id: &str,
    exec_token: Option<&SecretString>,
    sleep_fn: S,
    mut shutdown_signal: Pin<Box<dyn Future<Output = ()> + Send>>,
) -> Result<WaitOutcome, CliError>
where
    S: Fn(Duration) -> F,
    F: Future<Output = ()>,
{
    let deadline = Instant::now() + options.expiry;
    let mut session = PollSession::new();

    loop {
        if !session.first_pass || options.wait_before_first_poll {
            tokio::select! {
                biased;
                _ = &mut shutdown_signal => return Err(session.cancel()),
                _ = tokio::time::sleep_until(deadline) => return Err(session.timeout(options.expiry)),
                _ = sleep_fn(options.interval) => {}
            }
        }
        session.first_pass = false;

        if Instant::now() >= deadline {
            return Err(session.timeout(options.expiry));
        }

        session.transition(PollEvent::Poll)?;
        let request = session.request(exec_token, options.exec_token);
        debug!(
            "Polling {} (poll #{}, cursor {:?})",
            deployment_id,
            session.fsm.polls(),
            request.command_id
        );

        let response = tokio::select! {
            biased;
            _ = &mut shutdown_signal => return Err(session.cancel()),
            _ = tokio::time::sleep_until(deadline) => return Err(session.timeout(options.expiry)),
            response = orchestrator.poll_for_commands(deployment_id, request) => response?,
        };

        let mut commands = match response {
            PollResponse::Conflict => {
                session.transition(PollEvent::Conflict)?;
                println!("\nDeployment {} has already finished.", deployment_id);
                return Ok(WaitOutcome::AlreadyFinished);
            }
            PollResponse::Commands(commands) if commands.is_empty() => {
                session.transition(PollEvent::NoCommands)?;
                println!("\nWaiting for new commands...");
                continue;
            }
            PollResponse::Commands(commands) => commands,
        };

        commands.sort_by_key(|command| command.seq_order);
        session.transition(PollEvent::CommandsReceived(commands.len()))?;
        print_batch_header();

        for command in commands {
            print_command(&command);

            // dropping the dispatch future abandons the push and its remaining attempts
            let dispatched = tokio::select! {
                biased;
                _ = &mut shutdown_signal => return Err(session.cancel()),
                _ = tokio::time::sleep_until(deadline) => return Err(session.timeout(options.expiry)),
                dispatched = dispatcher.dispatch(&command) => dispatched?,
            };
            session.advance(&command);

            if let Dispatched::Finished(finished) = dispatched {
                if finished.is_failure() {
                    let reason = finished.failure_reason();
                    session.transition(PollEvent::FinishedFailed(reason.clone()))?;
                    return Err(CliError::DeploymentFailed(reason));
                }

                session.transition(PollEvent::Finished)?;
                println!("\nDeployment {} finished.", deployment_id);
                return Ok(WaitOutcome::Finished(command));
            }
        }

        session.transition(PollEvent::BatchDispatched)?;
        println!("\nWaiting for new commands...");
    }
}

fn print_batch_header() {
    println!("\n-----------------------");
    println!("New commands received:");
    println!("-----------------------");
}

fn print_command(command: &Command) {
    println!("\nCommand order: {}", command.seq_order);
    println!("Command type: {}", command.cmd_type);
    println!("\n-----------------------");
}
