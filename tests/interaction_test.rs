//! Integration tests for the interactive destination prompt
//!
//! Run with: cargo test --test interaction_test

mod common;
mod mocks;

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use tempfile::TempDir;

use common::{pipeline_config, requester, RecordingNotifier, ALBUM_URL};
use mocks::mock_runner::downloader_creating;
use mocks::ScriptedRunner;
use tidalbot::pipeline::{DestinationSource, DownloadService, Orchestrator, PendingReplies, RequestOutcome, Requester};

const PROMPT_TIMEOUT: Duration = Duration::from_secs(60);

fn interactive_service(jobs: &TempDir, runner: Arc<ScriptedRunner>) -> Arc<DownloadService> {
    Arc::new(DownloadService::new(
        Orchestrator::new(pipeline_config(jobs.path(), "listener"), runner),
        DestinationSource::Prompt {
            timeout: PROMPT_TIMEOUT,
        },
        PendingReplies::new(),
    ))
}

/// Starts `/download` in the background, as the bot handler does
fn spawn_download(
    service: &Arc<DownloadService>,
    who: Requester,
    notifier: &Arc<RecordingNotifier>,
) -> tokio::task::JoinHandle<RequestOutcome> {
    let service = Arc::clone(service);
    let notifier = Arc::clone(notifier);
    tokio::spawn(async move { service.handle_download(who, ALBUM_URL, &*notifier).await })
}

async fn wait_until_pending(service: &DownloadService, who: &Requester) {
    while !service.replies().is_pending(who) {
        tokio::task::yield_now().await;
    }
}

#[tokio::test(start_paused = true)]
async fn test_prompt_timeout_runs_nothing() {
    let jobs = TempDir::new().unwrap();
    let runner = Arc::new(ScriptedRunner::new());
    let service = interactive_service(&jobs, runner.clone());
    let notifier = RecordingNotifier::new();

    let outcome = service.handle_download(requester(1), ALBUM_URL, &notifier).await;

    assert!(matches!(outcome, RequestOutcome::PromptTimedOut));
    assert!(runner.invocations().is_empty());
    assert!(!service.replies().is_pending(&requester(1)));

    let messages = notifier.messages();
    assert_eq!(messages.len(), 2);
    assert!(messages[0].contains("Where should it be uploaded?"));
    assert!(messages[1].contains("60s"), "got: {}", messages[1]);
}

#[tokio::test]
async fn test_reply_becomes_destination() {
    let jobs = TempDir::new().unwrap();
    let runner = Arc::new(ScriptedRunner::new().on("orpheusdl", downloader_creating("123")));
    let service = interactive_service(&jobs, runner.clone());
    let notifier = Arc::new(RecordingNotifier::new());

    let task = spawn_download(&service, requester(1), &notifier);
    wait_until_pending(&service, &requester(1)).await;
    assert!(service.replies().resolve(&requester(1), "  gdrive:Albums  "));

    let outcome = task.await.unwrap();
    let RequestOutcome::Finished(report) = outcome else {
        panic!("expected the download to run, got {:?}", outcome);
    };
    assert!(report.succeeded());

    let calls = runner.invocations();
    assert_eq!(calls[1].spec.args[2], "gdrive:Albums/123");
    assert_eq!(notifier.last().unwrap(), "✅ Upload to gdrive:Albums completed!");
}

#[tokio::test]
async fn test_second_download_while_waiting_is_rejected() {
    let jobs = TempDir::new().unwrap();
    let runner = Arc::new(ScriptedRunner::new());
    let service = interactive_service(&jobs, runner.clone());
    let notifier = Arc::new(RecordingNotifier::new());

    let first = spawn_download(&service, requester(1), &notifier);
    wait_until_pending(&service, &requester(1)).await;

    let second = service.handle_download(requester(1), ALBUM_URL, &*notifier).await;
    assert!(matches!(second, RequestOutcome::PromptAlreadyPending));
    assert!(notifier.contains("still waiting"));

    // The first prompt is untouched and can still be cancelled
    assert!(service.replies().cancel(&requester(1)));
    assert!(matches!(first.await.unwrap(), RequestOutcome::PromptCancelled));
    assert_eq!(notifier.last().unwrap(), "🚫 Download cancelled.");
    assert!(runner.invocations().is_empty());
}

#[tokio::test]
async fn test_prompts_are_isolated_per_requester() {
    let jobs = TempDir::new().unwrap();
    let runner = Arc::new(ScriptedRunner::new().on("orpheusdl", downloader_creating("123")));
    let service = interactive_service(&jobs, runner.clone());
    let (notify_a, notify_b) = (Arc::new(RecordingNotifier::new()), Arc::new(RecordingNotifier::new()));

    let a = spawn_download(&service, requester(1), &notify_a);
    let b = spawn_download(&service, requester(2), &notify_b);
    wait_until_pending(&service, &requester(1)).await;
    wait_until_pending(&service, &requester(2)).await;

    // B answers first; A keeps waiting
    assert!(service.replies().resolve(&requester(2), "remote:b"));
    assert!(matches!(b.await.unwrap(), RequestOutcome::Finished(_)));
    assert!(service.replies().is_pending(&requester(1)));

    assert!(service.replies().cancel(&requester(1)));
    assert!(matches!(a.await.unwrap(), RequestOutcome::PromptCancelled));

    assert!(notify_b.contains("✅ Upload to remote:b completed!"));
    assert!(!notify_a.contains("remote:b"));
}

#[tokio::test]
async fn test_empty_reply_aborts() {
    let jobs = TempDir::new().unwrap();
    let runner = Arc::new(ScriptedRunner::new());
    let service = interactive_service(&jobs, runner.clone());
    let notifier = Arc::new(RecordingNotifier::new());

    let task = spawn_download(&service, requester(1), &notifier);
    wait_until_pending(&service, &requester(1)).await;
    assert!(service.replies().resolve(&requester(1), "   \n"));

    assert!(matches!(task.await.unwrap(), RequestOutcome::EmptyDestination));
    assert!(runner.invocations().is_empty());
}
