//! CI environment detection.
//!
//! Recorded into the report header so downstream consumers can tell local
//! runs from gated ones.

use serde::Serialize;

/// Known CI environments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CiEnvironment {
    GitHubActions,
    GitLabCi,
    Jenkins,
    CircleCi,
    Buildkite,
    AzureDevOps,
    Generic,
}

impl CiEnvironment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GitHubActions => "github_actions",
            Self::GitLabCi => "gitlab_ci",
            Self::Jenkins => "jenkins",
            Self::CircleCi => "circleci",
            Self::Buildkite => "buildkite",
            Self::AzureDevOps => "azure_devops",
            Self::Generic => "generic",
        }
    }
}

/// Detect the CI environment from environment variables.
pub fn detect_ci_environment() -> Option<CiEnvironment> {
    if std::env::var("GITHUB_ACTIONS").is_ok() {
        Some(CiEnvironment::GitHubActions)
    } else if std::env::var("GITLAB_CI").is_ok() {
        Some(CiEnvironment::GitLabCi)
    } else if std::env::var("JENKINS_URL").is_ok() {
        Some(CiEnvironment::Jenkins)
    } else if std::env::var("CIRCLECI").is_ok() {
        Some(CiEnvironment::CircleCi)
    } else if std::env::var("BUILDKITE").is_ok() {
        Some(CiEnvironment::Buildkite)
    } else if std::env::var("TF_BUILD").is_ok() {
        Some(CiEnvironment::AzureDevOps)
    } else if std::env::var("CI").is_ok() {
        Some(CiEnvironment::Generic)
    } else {
        None
    }
}

/// Check if running in any CI environment.
pub fn is_ci() -> bool {
    detect_ci_environment().is_some()
}
