//! Reference types passed across the collaborator contracts.

use serde::{Deserialize, Serialize};

/// A source tree reference: repository plus revision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRef {
    /// Repository locator.
    pub repo: String,
    /// Commit SHA or ref name.
    pub revision: String,
}

impl SourceRef {
    /// Creates a source reference.
    #[must_use]
    pub fn new(repo: impl Into<String>, revision: impl Into<String>) -> Self {
        Self {
            repo: repo.into(),
            revision: revision.into(),
        }
    }
}

/// A built container image reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    /// Registry repository, e.g. `registry.example.com/app`.
    pub repository: String,
    /// Tags applied to the image.
    pub tags: Vec<String>,
    /// Content digest, when the builder reports one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

impl ImageRef {
    /// Creates an image reference.
    #[must_use]
    pub fn new(repository: impl Into<String>, tags: Vec<String>) -> Self {
        Self {
            repository: repository.into(),
            tags,
            digest: None,
        }
    }

    /// Sets the digest.
    #[must_use]
    pub fn with_digest(mut self, digest: impl Into<String>) -> Self {
        self.digest = Some(digest.into());
        self
    }
}

impl std::fmt::Display for ImageRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.tags.first() {
            Some(tag) => write!(f, "{}:{tag}", self.repository),
            None => write!(f, "{}", self.repository),
        }
    }
}

/// A deployment target host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostRef {
    /// Host address.
    pub address: String,
    /// Service name on the host.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
}

impl HostRef {
    /// Creates a host reference.
    #[must_use]
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            service: None,
        }
    }

    /// Sets the service name.
    #[must_use]
    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = Some(service.into());
        self
    }
}

/// Credentials for pushing to an image registry.
#[derive(Clone, Serialize, Deserialize)]
pub struct RegistryCredentials {
    /// Registry username.
    pub username: String,
    /// Registry token or password.
    pub secret: String,
}

impl RegistryCredentials {
    /// Creates registry credentials.
    #[must_use]
    pub fn new(username: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            secret: secret.into(),
        }
    }
}

// The secret never appears in logs or debug output.
impl std::fmt::Debug for RegistryCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryCredentials")
            .field("username", &self.username)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// The outcome of a code-quality scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityReport {
    /// Whether the quality gate passed.
    pub passed: bool,
    /// Link to the full report.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_url: Option<String>,
}

/// A single vulnerability finding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    /// Advisory identifier, e.g. a CVE.
    pub id: String,
    /// Severity label as reported by the scanner.
    pub severity: String,
    /// Short description.
    pub title: String,
}

/// The outcome of an image vulnerability scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    /// Whether the scan passed the configured severity threshold.
    pub passed: bool,
    /// Findings above the reporting threshold.
    pub findings: Vec<Finding>,
}
