//! Test doubles: scripted stage actions and in-memory collaborators.

use crate::collaborators::{
    ActionContext, ActionOutcome, DeployTarget, Finding, HostRef, ImageBuilder, ImageRef,
    QualityReport, QualityScanner, RegistryCredentials, ScanReport, SourceRef, StageAction,
    VulnScanner,
};
use crate::errors::StageError;
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

/// A scripted stage action that counts its calls.
///
/// A script entry is consumed per call; once the script is exhausted the
/// default outcome repeats.
#[derive(Debug)]
pub struct MockAction {
    script: Mutex<VecDeque<Result<ActionOutcome, StageError>>>,
    default: Result<ActionOutcome, StageError>,
    delay: Option<Duration>,
    calls: AtomicU32,
}

impl MockAction {
    fn with_default(default: Result<ActionOutcome, StageError>) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            default,
            delay: None,
            calls: AtomicU32::new(0),
        }
    }

    /// An action that always passes.
    #[must_use]
    pub fn succeeding() -> Self {
        Self::with_default(Ok(ActionOutcome::passed()))
    }

    /// An action whose collaborator call always errors (retryable).
    #[must_use]
    pub fn erroring(message: impl Into<String>) -> Self {
        Self::with_default(Err(StageError::Other(message.into())))
    }

    /// An action that always reports a definitive failure.
    #[must_use]
    pub fn failing(detail: impl Into<String>) -> Self {
        Self::with_default(Ok(ActionOutcome::failed().with_detail(detail)))
    }

    /// Prepends scripted results consumed before the default applies.
    #[must_use]
    pub fn with_script(
        self,
        script: impl IntoIterator<Item = Result<ActionOutcome, StageError>>,
    ) -> Self {
        *self.script.lock() = script.into_iter().collect();
        self
    }

    /// Adds a delay to every call, to exercise timeouts and cancellation.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// How many times the action has been called.
    #[must_use]
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StageAction for MockAction {
    async fn run(&self, _ctx: &ActionContext) -> Result<ActionOutcome, StageError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match self.script.lock().pop_front() {
            Some(result) => result,
            None => self.default.clone(),
        }
    }
}

/// A quality scanner with a fixed verdict.
#[derive(Debug, Clone)]
pub struct StaticQualityScanner {
    passed: bool,
    report_url: Option<String>,
}

impl StaticQualityScanner {
    /// A scanner whose gate always passes, with a report link.
    #[must_use]
    pub fn passing(report_url: impl Into<String>) -> Self {
        Self {
            passed: true,
            report_url: Some(report_url.into()),
        }
    }

    /// A scanner whose gate always fails.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            passed: false,
            report_url: None,
        }
    }
}

#[async_trait]
impl QualityScanner for StaticQualityScanner {
    async fn run(&self, _source: &SourceRef) -> Result<QualityReport, StageError> {
        Ok(QualityReport {
            passed: self.passed,
            report_url: self.report_url.clone(),
        })
    }
}

/// A vulnerability scanner with a fixed report.
#[derive(Debug, Clone)]
pub struct StaticVulnScanner {
    passed: bool,
    findings: Vec<Finding>,
}

impl StaticVulnScanner {
    /// A scanner that finds nothing.
    #[must_use]
    pub fn clean() -> Self {
        Self {
            passed: true,
            findings: Vec::new(),
        }
    }

    /// A scanner that fails with the given `(id, severity)` findings.
    #[must_use]
    pub fn failing_with(findings: Vec<(&str, &str)>) -> Self {
        Self {
            passed: false,
            findings: findings
                .into_iter()
                .map(|(id, severity)| Finding {
                    id: id.to_string(),
                    severity: severity.to_string(),
                    title: String::new(),
                })
                .collect(),
        }
    }
}

#[async_trait]
impl VulnScanner for StaticVulnScanner {
    async fn run(&self, _image: &ImageRef) -> Result<ScanReport, StageError> {
        Ok(ScanReport {
            passed: self.passed,
            findings: self.findings.clone(),
        })
    }
}

/// An image builder that records builds and pushes in memory.
#[derive(Debug, Default)]
pub struct RecordingImageBuilder {
    repository: String,
    builds: RwLock<Vec<(SourceRef, Vec<String>)>>,
    pushes: RwLock<Vec<ImageRef>>,
}

impl RecordingImageBuilder {
    /// Creates a builder producing images in the given repository.
    #[must_use]
    pub fn new(repository: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
            ..Self::default()
        }
    }

    /// Returns the recorded `(source, tags)` build calls.
    #[must_use]
    pub fn builds(&self) -> Vec<(SourceRef, Vec<String>)> {
        self.builds.read().clone()
    }

    /// Returns the pushed images.
    #[must_use]
    pub fn pushes(&self) -> Vec<ImageRef> {
        self.pushes.read().clone()
    }
}

#[async_trait]
impl ImageBuilder for RecordingImageBuilder {
    async fn build(&self, source: &SourceRef, tags: &[String]) -> Result<ImageRef, StageError> {
        self.builds.write().push((source.clone(), tags.to_vec()));
        Ok(ImageRef::new(self.repository.clone(), tags.to_vec()))
    }

    async fn push(&self, image: &ImageRef, _creds: &RegistryCredentials) -> Result<(), StageError> {
        self.pushes.write().push(image.clone());
        Ok(())
    }
}

/// A deploy target that records deployments in memory.
#[derive(Debug, Default)]
pub struct RecordingDeployTarget {
    deploys: RwLock<Vec<(ImageRef, HostRef)>>,
    fail_with: Option<String>,
}

impl RecordingDeployTarget {
    /// Creates a target that accepts every deployment.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a target whose every deployment fails.
    #[must_use]
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            deploys: RwLock::new(Vec::new()),
            fail_with: Some(message.into()),
        }
    }

    /// Returns the recorded deployments.
    #[must_use]
    pub fn deploys(&self) -> Vec<(ImageRef, HostRef)> {
        self.deploys.read().clone()
    }
}

#[async_trait]
impl DeployTarget for RecordingDeployTarget {
    async fn deploy(&self, image: &ImageRef, host: &HostRef) -> Result<(), StageError> {
        self.deploys.write().push((image.clone(), host.clone()));
        match &self.fail_with {
            Some(message) => Err(StageError::Deploy(message.clone())),
            None => Ok(()),
        }
    }
}
