//! Narrow async contracts for each external tool.
//!
//! The engine never shells into SonarQube, Trivy, Docker, or SSH directly;
//! it only sees these traits. Implementations are assumed idempotent or
//! safely retriable within a stage's configured retry count.

use super::refs::{HostRef, ImageRef, QualityReport, RegistryCredentials, ScanReport, SourceRef};
use crate::errors::StageError;
use async_trait::async_trait;

/// A code-quality scanner (e.g. a SonarQube-style analysis).
#[async_trait]
pub trait QualityScanner: Send + Sync + std::fmt::Debug {
    /// Scans the source tree and reports whether the quality gate passed.
    async fn run(&self, source: &SourceRef) -> Result<QualityReport, StageError>;
}

/// An image vulnerability scanner (e.g. a Trivy-style scan).
#[async_trait]
pub trait VulnScanner: Send + Sync + std::fmt::Debug {
    /// Scans an image and reports findings against the severity threshold.
    async fn run(&self, image: &ImageRef) -> Result<ScanReport, StageError>;
}

/// Builds and pushes container images.
#[async_trait]
pub trait ImageBuilder: Send + Sync + std::fmt::Debug {
    /// Builds an image from the source tree with the given tags.
    async fn build(&self, source: &SourceRef, tags: &[String]) -> Result<ImageRef, StageError>;

    /// Pushes a built image to its registry.
    async fn push(&self, image: &ImageRef, creds: &RegistryCredentials) -> Result<(), StageError>;
}

/// A deployment target.
#[async_trait]
pub trait DeployTarget: Send + Sync + std::fmt::Debug {
    /// Deploys the image to the host.
    async fn deploy(&self, image: &ImageRef, host: &HostRef) -> Result<(), StageError>;
}
