//! Adapter actions bridging the collaborator ports to the stage seam.

use super::ports::{DeployTarget, ImageBuilder, QualityScanner, VulnScanner};
use super::refs::{HostRef, ImageRef, RegistryCredentials, SourceRef};
use super::{ActionContext, ActionOutcome, StageAction};
use crate::errors::StageError;
use async_trait::async_trait;
use std::sync::Arc;

/// Runs a code-quality scan over the source tree.
///
/// A scan that runs but fails its gate is a definitive failure; only
/// transport errors from the scanner are retried.
#[derive(Debug, Clone)]
pub struct QualityScanAction {
    scanner: Arc<dyn QualityScanner>,
    source: SourceRef,
}

impl QualityScanAction {
    /// Creates the action.
    #[must_use]
    pub fn new(scanner: Arc<dyn QualityScanner>, source: SourceRef) -> Self {
        Self { scanner, source }
    }
}

#[async_trait]
impl StageAction for QualityScanAction {
    async fn run(&self, _ctx: &ActionContext) -> Result<ActionOutcome, StageError> {
        let report = self.scanner.run(&self.source).await?;
        let outcome = if report.passed {
            ActionOutcome::passed()
        } else {
            ActionOutcome::failed().with_detail("quality gate failed")
        };
        Ok(match report.report_url {
            Some(url) => outcome.with_detail(url),
            None => outcome,
        })
    }
}

/// Runs a vulnerability scan against a configured image reference
/// (typically the base image the build will layer onto).
#[derive(Debug, Clone)]
pub struct VulnScanAction {
    scanner: Arc<dyn VulnScanner>,
    image: ImageRef,
}

impl VulnScanAction {
    /// Creates the action.
    #[must_use]
    pub fn new(scanner: Arc<dyn VulnScanner>, image: ImageRef) -> Self {
        Self { scanner, image }
    }
}

#[async_trait]
impl StageAction for VulnScanAction {
    async fn run(&self, _ctx: &ActionContext) -> Result<ActionOutcome, StageError> {
        let report = self.scanner.run(&self.image).await?;
        if report.passed {
            Ok(ActionOutcome::passed()
                .with_detail(format!("{} finding(s) below threshold", report.findings.len())))
        } else {
            let worst = report
                .findings
                .first()
                .map_or_else(|| "unspecified".to_string(), |f| f.id.clone());
            Ok(ActionOutcome::failed().with_detail(format!(
                "{} finding(s), first: {worst}",
                report.findings.len()
            )))
        }
    }
}

/// Builds the image, tags it `latest` plus the commit SHA, pushes it, and
/// records the image reference for downstream stages.
#[derive(Debug, Clone)]
pub struct BuildPushAction {
    builder: Arc<dyn ImageBuilder>,
    source: SourceRef,
    creds: RegistryCredentials,
}

impl BuildPushAction {
    /// Creates the action.
    #[must_use]
    pub fn new(
        builder: Arc<dyn ImageBuilder>,
        source: SourceRef,
        creds: RegistryCredentials,
    ) -> Self {
        Self {
            builder,
            source,
            creds,
        }
    }
}

#[async_trait]
impl StageAction for BuildPushAction {
    async fn run(&self, ctx: &ActionContext) -> Result<ActionOutcome, StageError> {
        let mut tags = vec!["latest".to_string()];
        if let Some(sha) = ctx.identity.commit_sha.clone() {
            tags.push(sha);
        }

        let image = self.builder.build(&self.source, &tags).await?;
        self.builder.push(&image, &self.creds).await?;
        ctx.artifacts.record_image(&image)?;

        Ok(ActionOutcome::passed().with_detail(format!("pushed {image}")))
    }
}

/// Deploys the image recorded by the build stage to the target host.
#[derive(Debug, Clone)]
pub struct DeployAction {
    target: Arc<dyn DeployTarget>,
    host: HostRef,
}

impl DeployAction {
    /// Creates the action.
    #[must_use]
    pub fn new(target: Arc<dyn DeployTarget>, host: HostRef) -> Self {
        Self { target, host }
    }
}

#[async_trait]
impl StageAction for DeployAction {
    async fn run(&self, ctx: &ActionContext) -> Result<ActionOutcome, StageError> {
        let image = ctx.artifacts.image()?;
        self.target.deploy(&image, &self.host).await?;
        Ok(ActionOutcome::passed().with_detail(format!("deployed {image} to {}", self.host.address)))
    }
}
