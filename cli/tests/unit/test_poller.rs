//! Command poll loop

use std::sync::Arc;
use std::time::{Duration, Instant};

use brain_client::NotifyUploadCompleteRequest;
use futures::FutureExt;
use secrecy::SecretString;
use tokio_test::{assert_err, assert_ok};

use noops::errors::CliError;
use noops::http::deployments::PollResponse;
use noops::models::command::CommandType;
use noops::storage::settings::ExecTokenPolicy;
use noops::workers::poller::{self, WaitOutcome};

use crate::common::{
    app, batch, command, dispatcher, fast_poller, finished, never, push, FakeOrchestrator,
    FakeRegistry, FakeUploader,
};

fn token() -> SecretString {
    SecretString::from("T1".to_string())
}

async fn run_wait(
    orchestrator: &Arc<FakeOrchestrator>,
    registry: &Arc<FakeRegistry>,
    options: &poller::Options,
) -> Result<WaitOutcome, CliError> {
    let token = token();
    poller::wait(
        options,
        orchestrator.as_ref(),
        &dispatcher(orchestrator, registry),
        "D1",
        Some(&token),
        tokio::time::sleep,
        never(),
    )
    .await
}

#[tokio::test]
async fn test_conflict_ends_wait_successfully() {
    let orchestrator = Arc::new(FakeOrchestrator::new().with_polls(vec![Ok(PollResponse::Conflict)]));
    let registry = Arc::new(FakeRegistry::new());

    let outcome = assert_ok!(run_wait(&orchestrator, &registry, &fast_poller()).await);

    assert_eq!(outcome, WaitOutcome::AlreadyFinished);
    assert_eq!(orchestrator.poll_requests().len(), 1);
    assert!(registry.ops().is_empty());
}

#[tokio::test]
async fn test_cursor_follows_last_command_of_previous_batch() {
    let orchestrator = Arc::new(FakeOrchestrator::new().with_polls(vec![
        batch(vec![
            command("1", 1, CommandType::UploadStaticFile, ""),
            command("2", 2, CommandType::Other("RUN_MIGRATIONS".to_string()), "{}"),
        ]),
        batch(Vec::new()),
        batch(vec![command("3", 3, CommandType::UploadStaticFile, "")]),
        batch(vec![finished("4", 4)]),
    ]));
    let registry = Arc::new(FakeRegistry::new());

    let outcome = assert_ok!(run_wait(&orchestrator, &registry, &fast_poller()).await);
    assert!(matches!(outcome, WaitOutcome::Finished(ref c) if c.id == "4"));

    let cursors: Vec<Option<String>> = orchestrator
        .poll_requests()
        .into_iter()
        .map(|request| request.command_id)
        .collect();
    assert_eq!(
        cursors,
        vec![
            None,
            Some("2".to_string()),
            Some("2".to_string()),
            Some("3".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_batch_is_dispatched_in_sequence_order() {
    let orchestrator = Arc::new(FakeOrchestrator::new().with_polls(vec![
        batch(vec![
            command("b", 2, CommandType::UploadStaticFile, ""),
            command("a", 1, CommandType::UploadStaticFile, ""),
        ]),
        batch(vec![finished("c", 3)]),
    ]));
    let registry = Arc::new(FakeRegistry::new());

    assert_ok!(run_wait(&orchestrator, &registry, &fast_poller()).await);

    let polls = orchestrator.poll_requests();
    assert_eq!(polls[1].command_id.as_deref(), Some("b"));
}

#[tokio::test]
async fn test_finished_command_stops_the_batch() {
    let orchestrator = Arc::new(FakeOrchestrator::new().with_polls(vec![batch(vec![
        finished("1", 1),
        push("2", 2),
    ])]));
    let registry = Arc::new(FakeRegistry::new());

    let outcome = assert_ok!(run_wait(&orchestrator, &registry, &fast_poller()).await);

    assert!(matches!(outcome, WaitOutcome::Finished(ref c) if c.id == "1"));
    assert_eq!(orchestrator.credential_requests(), 0);
    assert!(registry.ops().is_empty());
    assert_eq!(orchestrator.poll_requests().len(), 1);
}

#[tokio::test]
async fn test_finished_with_failed_status_is_an_error() {
    let orchestrator = Arc::new(FakeOrchestrator::new().with_polls(vec![batch(vec![command(
        "1",
        1,
        CommandType::DeploymentFinished,
        r#"{"status":"FAILED","error":"stack file is invalid"}"#,
    )])]));
    let registry = Arc::new(FakeRegistry::new());

    let err = assert_err!(run_wait(&orchestrator, &registry, &fast_poller()).await);

    assert!(matches!(err, CliError::DeploymentFailed(ref reason) if reason == "stack file is invalid"));
}

#[tokio::test]
async fn test_push_command_then_continue_polling() {
    let orchestrator = Arc::new(FakeOrchestrator::new().with_polls(vec![
        batch(vec![push("1", 1)]),
        batch(vec![finished("2", 2)]),
    ]));
    let registry = Arc::new(FakeRegistry::new());

    assert_ok!(run_wait(&orchestrator, &registry, &fast_poller()).await);

    assert_eq!(
        registry.ops(),
        vec![
            "tag foo:bar registry.example.com/app:bar".to_string(),
            "login registry.example.com AWS secret".to_string(),
            "push registry.example.com/app:bar".to_string(),
        ]
    );
    assert_eq!(
        orchestrator.docker_notifications(),
        vec![NotifyUploadCompleteRequest::succeeded()]
    );

    let polls = orchestrator.poll_requests();
    assert_eq!(polls.len(), 2);
    assert_eq!(polls[1].command_id.as_deref(), Some("1"));
    assert_eq!(polls[1].exec_token.as_deref(), Some("T1"));
}

#[tokio::test]
async fn test_failed_push_aborts_the_wait() {
    let orchestrator = Arc::new(FakeOrchestrator::new().with_polls(vec![
        batch(vec![push("1", 1)]),
        batch(vec![finished("2", 2)]),
    ]));
    let registry = Arc::new(FakeRegistry::failing(10));

    let err = assert_err!(run_wait(&orchestrator, &registry, &fast_poller()).await);

    assert!(matches!(err, CliError::RegistryError(_)));
    assert_eq!(registry.pushes(), 3);
    let notifications = orchestrator.docker_notifications();
    assert_eq!(notifications.len(), 1);
    assert!(!notifications[0].success);
    assert_eq!(orchestrator.poll_requests().len(), 1);
}

#[tokio::test]
async fn test_bad_push_payload_is_reported_and_aborts() {
    let orchestrator = Arc::new(FakeOrchestrator::new().with_polls(vec![batch(vec![command(
        "1",
        1,
        CommandType::PushDockerImage,
        "{not json",
    )])]));
    let registry = Arc::new(FakeRegistry::new());

    let err = assert_err!(run_wait(&orchestrator, &registry, &fast_poller()).await);

    assert!(matches!(err, CliError::DecodeError(_)));
    assert_eq!(orchestrator.docker_notifications().len(), 1);
    assert_eq!(orchestrator.credential_requests(), 0);
}

#[tokio::test]
async fn test_poll_errors_are_not_retried() {
    let orchestrator = Arc::new(FakeOrchestrator::new().with_polls(vec![Err(CliError::ApiError {
        status: 500,
        body: "boom".to_string(),
    })]));
    let registry = Arc::new(FakeRegistry::new());

    let err = assert_err!(run_wait(&orchestrator, &registry, &fast_poller()).await);

    assert!(matches!(err, CliError::ApiError { status: 500, .. }));
    assert_eq!(orchestrator.poll_requests().len(), 1);
}

#[tokio::test]
async fn test_timeout_overshoot_is_bounded() {
    let orchestrator = Arc::new(FakeOrchestrator::new());
    let registry = Arc::new(FakeRegistry::new());
    let options = poller::Options {
        interval: Duration::from_millis(200),
        expiry: Duration::from_millis(300),
        wait_before_first_poll: true,
        exec_token: ExecTokenPolicy::EveryPoll,
    };

    let started = Instant::now();
    let err = assert_err!(run_wait(&orchestrator, &registry, &options).await);
    let elapsed = started.elapsed();

    assert!(matches!(err, CliError::Timeout(expiry) if expiry == options.expiry));
    assert!(elapsed >= options.expiry, "returned early: {:?}", elapsed);
    assert!(elapsed < options.expiry + options.interval, "overshot: {:?}", elapsed);
    assert_eq!(orchestrator.poll_requests().len(), 1);
}

#[tokio::test]
async fn test_first_poll_waits_for_interval_by_default() {
    let orchestrator = Arc::new(FakeOrchestrator::new().with_polls(vec![Ok(PollResponse::Conflict)]));
    let registry = Arc::new(FakeRegistry::new());
    let options = poller::Options {
        interval: Duration::from_millis(100),
        ..poller::Options::default()
    };

    let started = Instant::now();
    assert_ok!(run_wait(&orchestrator, &registry, &options).await);
    assert!(started.elapsed() >= Duration::from_millis(100));
}

#[tokio::test]
async fn test_cancellation_stops_the_loop() {
    let orchestrator = Arc::new(FakeOrchestrator::new());
    let registry = Arc::new(FakeRegistry::new());
    let options = poller::Options {
        interval: Duration::from_millis(20),
        expiry: Duration::from_secs(30),
        ..fast_poller()
    };
    let token = token();

    let started = Instant::now();
    let err = assert_err!(
        poller::wait(
            &options,
            orchestrator.as_ref(),
            &dispatcher(&orchestrator, &registry),
            "D1",
            Some(&token),
            tokio::time::sleep,
            tokio::time::sleep(Duration::from_millis(100)).boxed(),
        )
        .await
    );

    assert!(matches!(err, CliError::Cancelled));
    assert!(started.elapsed() < Duration::from_secs(5));

    // nothing goes out once cancellation is seen
    let polls = orchestrator.poll_requests().len();
    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(orchestrator.poll_requests().len(), polls);
}

#[tokio::test]
async fn test_exec_token_first_poll_only() {
    let orchestrator = Arc::new(FakeOrchestrator::new().with_polls(vec![
        batch(Vec::new()),
        batch(vec![finished("1", 1)]),
    ]));
    let registry = Arc::new(FakeRegistry::new());
    let options = poller::Options {
        exec_token: ExecTokenPolicy::FirstPollOnly,
        ..fast_poller()
    };

    assert_ok!(run_wait(&orchestrator, &registry, &options).await);

    let tokens: Vec<Option<String>> = orchestrator
        .poll_requests()
        .into_iter()
        .map(|request| request.exec_token)
        .collect();
    assert_eq!(tokens, vec![Some("T1".to_string()), None]);
}

#[tokio::test]
async fn test_watch_sends_no_exec_token() {
    let orchestrator = Arc::new(FakeOrchestrator::new().with_polls(vec![batch(vec![finished("9", 9)])]));
    let registry = Arc::new(FakeRegistry::new());
    let uploader = Arc::new(FakeUploader::new());

    assert_ok!(
        app(&orchestrator, &registry, &uploader)
            .watch("D7", never())
            .await
    );

    let polls = orchestrator.poll_requests();
    assert_eq!(polls.len(), 1);
    assert_eq!(polls[0].exec_token, None);
    assert_eq!(uploader.attempts(), 0);
}

#[tokio::test]
async fn test_sessions_do_not_share_cursors() {
    let first = Arc::new(FakeOrchestrator::new().with_polls(vec![
        batch(vec![command("5", 5, CommandType::UploadStaticFile, "")]),
        batch(vec![finished("6", 6)]),
    ]));
    let second = Arc::new(FakeOrchestrator::new().with_polls(vec![batch(vec![finished("1", 1)])]));
    let registry = Arc::new(FakeRegistry::new());

    assert_ok!(run_wait(&first, &registry, &fast_poller()).await);
    assert_ok!(run_wait(&second, &registry, &fast_poller()).await);

    assert_eq!(second.poll_requests()[0].command_id, None);
}

#[tokio::test]
async fn test_cancellation_during_push_stops_further_attempts() {
    let orchestrator = Arc::new(FakeOrchestrator::new().with_polls(vec![batch(vec![push("1", 1)])]));
    let registry =
        Arc::new(FakeRegistry::failing(10).with_push_delay(Duration::from_millis(300)));
    let token = token();

    let started = Instant::now();
    let err = assert_err!(
        poller::wait(
            &fast_poller(),
            orchestrator.as_ref(),
            &dispatcher(&orchestrator, &registry),
            "D1",
            Some(&token),
            tokio::time::sleep,
            tokio::time::sleep(Duration::from_millis(50)).boxed(),
        )
        .await
    );

    assert!(matches!(err, CliError::Cancelled));
    assert!(started.elapsed() < Duration::from_millis(300), "took {:?}", started.elapsed());

    // the abandoned push must not come back for another attempt or a notification
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(registry.pushes(), 1);
    assert!(orchestrator.docker_notifications().is_empty());
}

#[tokio::test]
async fn test_deadline_during_push_is_a_timeout() {
    let orchestrator = Arc::new(FakeOrchestrator::new().with_polls(vec![batch(vec![push("1", 1)])]));
    let registry =
        Arc::new(FakeRegistry::failing(10).with_push_delay(Duration::from_millis(300)));
    let options = poller::Options {
        interval: Duration::from_millis(100),
        expiry: Duration::from_millis(150),
        ..fast_poller()
    };

    let started = Instant::now();
    let err = assert_err!(run_wait(&orchestrator, &registry, &options).await);
    let elapsed = started.elapsed();

    assert!(matches!(err, CliError::Timeout(_)));
    assert!(elapsed >= options.expiry, "returned early: {:?}", elapsed);
    assert!(elapsed < options.expiry + options.interval, "overshot: {:?}", elapsed);
    assert_eq!(registry.pushes(), 1);
}
