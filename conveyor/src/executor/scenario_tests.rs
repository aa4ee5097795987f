//! End-to-end scenarios over the executor: gating, retries, timeouts,
//! cancellation, and notification.

use super::{Executor, ExecutorConfig};
use crate::collaborators::{
    BuildPushAction, DeployAction, HostRef, ImageRef, QualityScanAction, RegistryCredentials,
    SourceRef, StageAction, VulnScanAction,
};
use crate::core::{RunStatus, StageStatus};
use crate::errors::StageError;
use crate::events::CollectingEventSink;
use crate::notify::CollectingNotifier;
use crate::pipeline::{PipelineGraph, StageSpec};
use crate::retry::{JitterStrategy, RetryConfig};
use crate::run::RunIdentity;
use crate::testing::{
    MockAction, RecordingDeployTarget, RecordingImageBuilder, StaticQualityScanner,
    StaticVulnScanner,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;

fn fast_retry() -> RetryConfig {
    RetryConfig::new()
        .with_base_delay_ms(1)
        .with_jitter(JitterStrategy::None)
}

fn stage(id: &str, action: Arc<dyn StageAction>) -> StageSpec {
    StageSpec::new(id, action).with_retry(fast_retry())
}

/// quality -> build -> deploy, security -> build.
fn readme_graph(
    quality: Arc<dyn StageAction>,
    security: Arc<dyn StageAction>,
    build: Arc<dyn StageAction>,
    deploy: Arc<dyn StageAction>,
) -> PipelineGraph {
    PipelineGraph::build(
        "ci",
        vec![
            stage("quality", quality),
            stage("security", security),
            stage("build", build).with_needs(["quality", "security"]),
            stage("deploy", deploy).with_need("build"),
        ],
    )
    .unwrap()
}

#[tokio::test]
async fn test_quality_failure_skips_build_and_deploy() {
    let build = Arc::new(MockAction::succeeding());
    let deploy = Arc::new(MockAction::succeeding());
    let graph = readme_graph(
        Arc::new(MockAction::failing("quality gate failed")),
        Arc::new(MockAction::succeeding()),
        build.clone(),
        deploy.clone(),
    );

    let report = Executor::default().run(&graph, RunIdentity::new()).await;

    assert_eq!(report.status, RunStatus::Failed);
    let status = |id: &str| {
        report
            .stages
            .iter()
            .find(|r| r.stage == id)
            .unwrap()
            .clone()
    };
    assert_eq!(status("quality").status, StageStatus::Failed);
    assert_eq!(status("security").status, StageStatus::Succeeded);
    assert_eq!(status("build").status, StageStatus::Skipped);
    assert_eq!(status("build").blocked_by.as_deref(), Some("quality"));
    assert_eq!(status("deploy").status, StageStatus::Skipped);
    assert_eq!(status("deploy").blocked_by.as_deref(), Some("quality"));

    // Skipped means never dispatched.
    assert_eq!(build.calls(), 0);
    assert_eq!(deploy.calls(), 0);
}

#[tokio::test]
async fn test_security_failure_skips_build() {
    let build = Arc::new(MockAction::succeeding());
    let graph = readme_graph(
        Arc::new(MockAction::succeeding()),
        Arc::new(MockAction::failing("CVE above threshold")),
        build.clone(),
        Arc::new(MockAction::succeeding()),
    );

    let report = Executor::default().run(&graph, RunIdentity::new()).await;

    assert_eq!(report.status, RunStatus::Failed);
    let build_result = report.stages.iter().find(|r| r.stage == "build").unwrap();
    assert_eq!(build_result.status, StageStatus::Skipped);
    assert_eq!(build_result.blocked_by.as_deref(), Some("security"));
    assert_eq!(build.calls(), 0);
}

#[tokio::test]
async fn test_full_success_path_tags_and_notifies() {
    let sha = "abc123def4567890";
    let builder = Arc::new(RecordingImageBuilder::new("registry.example.com/app"));
    let target = Arc::new(RecordingDeployTarget::new());
    let source = SourceRef::new("git@example.com:app.git", sha);

    let graph = readme_graph(
        Arc::new(QualityScanAction::new(
            Arc::new(StaticQualityScanner::passing("https://sonar/42")),
            source.clone(),
        )),
        Arc::new(VulnScanAction::new(
            Arc::new(StaticVulnScanner::clean()),
            ImageRef::new("registry.example.com/base", vec!["stable".to_string()]),
        )),
        Arc::new(BuildPushAction::new(
            builder.clone(),
            source,
            RegistryCredentials::new("ci-bot", "token"),
        )),
        Arc::new(DeployAction::new(target.clone(), HostRef::new("10.0.0.5"))),
    );

    let notifier = Arc::new(CollectingNotifier::new());
    let executor = Executor::default().with_notifier(notifier.clone());
    let report = executor
        .run(&graph, RunIdentity::new().with_commit_sha(sha))
        .await;

    assert_eq!(report.status, RunStatus::Succeeded);
    assert!(report.is_success());
    assert!(report.notify_warning.is_none());

    // Image carries both tags.
    let builds = builder.builds();
    assert_eq!(builds.len(), 1);
    assert_eq!(builds[0].1, vec!["latest".to_string(), sha.to_string()]);
    assert_eq!(builder.pushes().len(), 1);

    // The deploy stage received the pushed image.
    let deploys = target.deploys();
    assert_eq!(deploys.len(), 1);
    assert_eq!(deploys[0].0.repository, "registry.example.com/app");

    // Exactly one notification, with the succeeded summary.
    assert_eq!(notifier.attempts(), 1);
    assert_eq!(notifier.sent()[0].status, RunStatus::Succeeded);
    assert_eq!(notifier.sent()[0].stages.len(), 4);
}

#[tokio::test]
async fn test_persistent_error_finalized_after_retries_plus_one() {
    let action = Arc::new(MockAction::erroring("registry unreachable"));
    let graph = PipelineGraph::build(
        "ci",
        vec![stage("push", action.clone()).with_retries(3)],
    )
    .unwrap();

    let report = Executor::default().run(&graph, RunIdentity::new()).await;

    let result = &report.stages[0];
    assert_eq!(result.status, StageStatus::Failed);
    assert_eq!(result.attempts, 4);
    assert_eq!(action.calls(), 4);
    assert_eq!(report.status, RunStatus::Failed);
}

#[tokio::test]
async fn test_transient_errors_then_success() {
    let action = Arc::new(MockAction::succeeding().with_script([
        Err(StageError::Other("transient".to_string())),
        Err(StageError::Other("transient".to_string())),
    ]));
    let graph =
        PipelineGraph::build("ci", vec![stage("flaky", action.clone()).with_retries(2)]).unwrap();

    let report = Executor::default().run(&graph, RunIdentity::new()).await;

    let result = &report.stages[0];
    assert_eq!(result.status, StageStatus::Succeeded);
    assert_eq!(result.attempts, 3);
    assert_eq!(report.status, RunStatus::Succeeded);
}

#[tokio::test]
async fn test_definitive_failure_is_not_retried() {
    let action = Arc::new(MockAction::failing("quality gate failed"));
    let graph =
        PipelineGraph::build("ci", vec![stage("quality", action.clone()).with_retries(5)])
            .unwrap();

    let report = Executor::default().run(&graph, RunIdentity::new()).await;

    assert_eq!(report.stages[0].status, StageStatus::Failed);
    assert_eq!(action.calls(), 1);
}

#[tokio::test]
async fn test_notifier_failure_never_changes_run_status() {
    let graph =
        PipelineGraph::build("ci", vec![stage("quality", Arc::new(MockAction::succeeding()))])
            .unwrap();

    let notifier = Arc::new(CollectingNotifier::failing("mailbox full"));
    let executor = Executor::default().with_notifier(notifier.clone());
    let report = executor.run(&graph, RunIdentity::new()).await;

    assert_eq!(report.status, RunStatus::Succeeded);
    assert_eq!(report.notify_warning.as_deref().map(|w| w.contains("mailbox full")), Some(true));
    assert_eq!(notifier.attempts(), 1);
}

#[tokio::test]
async fn test_notifier_invoked_exactly_once_on_failed_run() {
    let graph = readme_graph(
        Arc::new(MockAction::failing("no")),
        Arc::new(MockAction::succeeding()),
        Arc::new(MockAction::succeeding()),
        Arc::new(MockAction::succeeding()),
    );

    let notifier = Arc::new(CollectingNotifier::new());
    let executor = Executor::default().with_notifier(notifier.clone());
    let report = executor.run(&graph, RunIdentity::new()).await;

    assert_eq!(report.status, RunStatus::Failed);
    assert_eq!(notifier.attempts(), 1);
    // The summary enumerates every stage, skips included.
    assert_eq!(notifier.sent()[0].stages.len(), 4);
}

#[tokio::test]
async fn test_attempt_timeout_marks_timed_out_and_blocks_dependents() {
    let slow = Arc::new(MockAction::succeeding().with_delay(Duration::from_millis(500)));
    let downstream = Arc::new(MockAction::succeeding());
    let graph = PipelineGraph::build(
        "ci",
        vec![
            stage("scan", slow).with_timeout(Duration::from_millis(20)),
            stage("build", downstream.clone()).with_need("scan"),
        ],
    )
    .unwrap();

    let report = Executor::default().run(&graph, RunIdentity::new()).await;

    let scan = report.stages.iter().find(|r| r.stage == "scan").unwrap();
    assert_eq!(scan.status, StageStatus::TimedOut);

    let build = report.stages.iter().find(|r| r.stage == "build").unwrap();
    assert_eq!(build.status, StageStatus::Skipped);
    assert_eq!(build.blocked_by.as_deref(), Some("scan"));
    assert_eq!(downstream.calls(), 0);
    assert_eq!(report.status, RunStatus::Failed);
}

#[tokio::test]
async fn test_global_timeout_cancels_in_flight_and_skips_pending() {
    let hung = Arc::new(MockAction::succeeding().with_delay(Duration::from_secs(30)));
    let graph = PipelineGraph::build(
        "ci",
        vec![
            stage("deploy", hung),
            stage("notify-cleanup", Arc::new(MockAction::succeeding())).with_need("deploy"),
        ],
    )
    .unwrap();

    let executor = Executor::new(ExecutorConfig {
        max_concurrency: 4,
        run_timeout: Duration::from_millis(50),
        cancel_grace: Duration::from_millis(200),
    });
    let report = executor.run(&graph, RunIdentity::new()).await;

    let deploy = report.stages.iter().find(|r| r.stage == "deploy").unwrap();
    assert_eq!(deploy.status, StageStatus::TimedOut);

    let pending = report
        .stages
        .iter()
        .find(|r| r.stage == "notify-cleanup")
        .unwrap();
    assert_eq!(pending.status, StageStatus::Skipped);
    assert_eq!(report.status, RunStatus::Failed);
}

#[tokio::test]
async fn test_deadline_starved_stage_emits_terminal_event() {
    let events = Arc::new(CollectingEventSink::new());
    let graph = PipelineGraph::build(
        "ci",
        vec![
            stage(
                "deploy",
                Arc::new(MockAction::succeeding().with_delay(Duration::from_secs(30))),
            ),
            stage("cleanup", Arc::new(MockAction::succeeding())).with_need("deploy"),
        ],
    )
    .unwrap();

    let executor = Executor::new(ExecutorConfig {
        max_concurrency: 4,
        run_timeout: Duration::from_millis(50),
        cancel_grace: Duration::from_millis(200),
    })
    .with_events(events.clone());
    let report = executor.run(&graph, RunIdentity::new()).await;

    let cleanup = report.stages.iter().find(|r| r.stage == "cleanup").unwrap();
    assert_eq!(cleanup.status, StageStatus::Skipped);

    // The never-dispatched stage still gets a terminal event.
    let starved = events.events().into_iter().any(|event| {
        matches!(
            event,
            crate::events::RunEvent::StageFinished { ref stage, status, .. }
                if stage == "cleanup" && status == StageStatus::Skipped
        )
    });
    assert!(starved, "no terminal event for the starved stage");
}

#[tokio::test]
async fn test_zero_concurrency_is_clamped_to_one() {
    let action = Arc::new(MockAction::succeeding());
    let graph = PipelineGraph::build("ci", vec![stage("quality", action.clone())]).unwrap();

    let executor = Executor::new(ExecutorConfig {
        max_concurrency: 0,
        ..ExecutorConfig::default()
    });
    let report = executor.run(&graph, RunIdentity::new()).await;

    assert_eq!(report.status, RunStatus::Succeeded);
    assert_eq!(report.stages[0].status, StageStatus::Succeeded);
    assert_eq!(action.calls(), 1);
}

#[tokio::test]
async fn test_advisory_gate_does_not_block_dependents() {
    let build = Arc::new(MockAction::succeeding());
    let graph = PipelineGraph::build(
        "ci",
        vec![
            stage("lint", Arc::new(MockAction::failing("style issues"))).advisory(),
            stage("build", build.clone()).with_need("lint"),
        ],
    )
    .unwrap();

    let report = Executor::default().run(&graph, RunIdentity::new()).await;

    let lint = report.stages.iter().find(|r| r.stage == "lint").unwrap();
    assert_eq!(lint.status, StageStatus::Failed);

    let built = report.stages.iter().find(|r| r.stage == "build").unwrap();
    assert_eq!(built.status, StageStatus::Succeeded);
    assert_eq!(build.calls(), 1);

    // The advisory failure still fails the run overall.
    assert_eq!(report.status, RunStatus::Failed);
}

#[tokio::test]
async fn test_event_stream_brackets_the_run() {
    let events = Arc::new(CollectingEventSink::new());
    let graph = readme_graph(
        Arc::new(MockAction::succeeding()),
        Arc::new(MockAction::succeeding()),
        Arc::new(MockAction::succeeding()),
        Arc::new(MockAction::succeeding()),
    );

    let executor = Executor::default().with_events(events.clone());
    let report = executor.run(&graph, RunIdentity::new()).await;
    assert_eq!(report.status, RunStatus::Succeeded);

    let kinds = events.kinds();
    assert_eq!(kinds.first(), Some(&"run.started"));
    assert_eq!(kinds.last(), Some(&"run.finished"));
    assert_eq!(events.count_of("stage.dispatched"), 4);
    assert_eq!(events.count_of("stage.finished"), 4);
    assert_eq!(events.count_of("stage.skipped"), 0);
}

#[tokio::test]
async fn test_concurrency_limit_serializes_dispatch() {
    let events = Arc::new(CollectingEventSink::new());
    let graph = PipelineGraph::build(
        "ci",
        vec![
            stage("a", Arc::new(MockAction::succeeding())),
            stage("b", Arc::new(MockAction::succeeding())),
            stage("c", Arc::new(MockAction::succeeding())),
        ],
    )
    .unwrap();

    let executor = Executor::new(ExecutorConfig {
        max_concurrency: 1,
        ..ExecutorConfig::default()
    })
    .with_events(events.clone());
    let report = executor.run(&graph, RunIdentity::new()).await;
    assert_eq!(report.status, RunStatus::Succeeded);

    // With one slot, a dispatch is always followed by its finish before
    // the next dispatch.
    let interesting: Vec<&str> = events
        .kinds()
        .into_iter()
        .filter(|k| k.starts_with("stage."))
        .collect();
    assert_eq!(
        interesting,
        vec![
            "stage.dispatched",
            "stage.finished",
            "stage.dispatched",
            "stage.finished",
            "stage.dispatched",
            "stage.finished",
        ]
    );
}

#[tokio::test]
async fn test_results_recorded_once_per_stage() {
    let graph = readme_graph(
        Arc::new(MockAction::failing("no")),
        Arc::new(MockAction::failing("also no")),
        Arc::new(MockAction::succeeding()),
        Arc::new(MockAction::succeeding()),
    );

    let report = Executor::default().run(&graph, RunIdentity::new()).await;

    // Both roots fail; build and deploy are skipped exactly once even
    // though two blocking ancestors cover them.
    assert_eq!(report.stages.len(), 4);
    let mut ids: Vec<&str> = report.stages.iter().map(|r| r.stage.as_str()).collect();
    ids.sort_unstable();
    assert_eq!(ids, vec!["build", "deploy", "quality", "security"]);
}
