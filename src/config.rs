//! Reporter configuration loaded from environment variables.

use std::env;
use std::path::PathBuf;

use secrecy::SecretString;

use crate::models::LedgerId;

/// Default values used when the environment leaves a setting unset.
pub mod defaults {
    pub const API_URL: &str = "https://app-api.testledger.dev";
    pub const APP_VERSION: &str = "0.0.1";
    pub const MAX_CONCURRENT_TRANSFERS: usize = 1;
}

/// How the aggregator treats a `.log` file that does not follow the
/// `wdio-<N>-<M>-` naming convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilenamePolicy {
    /// Abort the whole aggregation.
    #[default]
    Strict,
    /// Skip the file and record a diagnostic.
    Lenient,
}

/// Ledger API connection settings.
#[derive(Debug, Clone)]
pub struct LedgerSettings {
    /// Normalized base URL, without trailing slash
    pub api_url: String,
    /// Bearer token
    pub api_token: SecretString,
    /// Project the runs are filed under
    pub project_id: Option<LedgerId>,
}

/// Artifact upload settings.
#[derive(Debug, Clone)]
pub struct ArtifactSettings {
    /// Whether screenshots/videos are uploaded after the run is submitted
    pub enabled: bool,
    /// Screenshot directory (scanned recursively)
    pub screenshot_dir: Option<PathBuf>,
    /// Video directory (scanned recursively)
    pub video_dir: Option<PathBuf>,
    /// Upper bound on in-flight object-storage transfers
    pub max_concurrent_transfers: usize,
}

/// Run metadata supplied by the CI environment.
#[derive(Debug, Clone, Default)]
pub struct RunSettings {
    /// Passed through verbatim; CI systems may use any opaque id
    pub run_uuid: Option<String>,
    pub group_uuid: Option<String>,
    pub main_run: Option<i64>,
    pub title: Option<String>,
    pub site: Option<String>,
    pub build_url: Option<String>,
    pub version: String,
    pub suites: Vec<String>,
    pub repeat_run: bool,
    pub issue_user: Option<String>,
    pub issue_summary: Option<String>,
    pub enable_flaky: i64,
}

impl RunSettings {
    /// Descriptor of the suites this run executed.
    pub fn suites_ran(&self) -> String {
        if !self.suites.is_empty() {
            self.suites.join(", ")
        } else if self.repeat_run {
            "RepeatRun".to_string()
        } else {
            String::new()
        }
    }
}

/// Reporter configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding the per-worker log files
    pub output_dir: PathBuf,
    /// Drop suites whose own verdict is passed
    pub skip_passed: bool,
    /// Handling of non-conforming log filenames
    pub filename_policy: FilenamePolicy,
    pub ledger: LedgerSettings,
    pub artifacts: ArtifactSettings,
    pub run: RunSettings,
}

impl Config {
    /// Load configuration from the process environment.
    ///
    /// Environment variables:
    /// - `TESTLEDGER_OUTPUT_DIR`: log directory (required)
    /// - `TESTLEDGER_API_TOKEN`: bearer token (required)
    /// - `TESTLEDGER_API_URL`: ledger base URL (default: https://app-api.testledger.dev)
    /// - `TESTLEDGER_PROJECT_ID`: project identifier
    /// - `TESTLEDGER_UPLOAD_ARTIFACTS`: upload screenshots/videos (default: false)
    /// - `TESTLEDGER_SCREENSHOT_DIR` / `TESTLEDGER_VIDEO_DIR`: artifact directories
    /// - `TESTLEDGER_MAX_CONCURRENT_TRANSFERS`: in-flight uploads (default: 1)
    /// - `TESTLEDGER_LENIENT_LOG_NAMES`: skip badly named log files instead of failing
    /// - `SKIP_PASSED_UPLOADS`: leave passing suites out of the report
    /// - `RUN_UUID`, `GROUP_UUID`, `MAIN_RUN`, `RUN_TITLE`, `SITE`, `BUILD_URL`,
    ///   `APP_VERSION`, `CODE_VERSION`, `TESTLEDGER_APP_VERSION`, `ISSUE_USER`,
    ///   `ISSUE_SUMMARY`, `ENABLE_FLAKY`, `TESTLEDGER_SUITES`, `TESTLEDGER_REPEAT_RUN`
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let output_dir = var("TESTLEDGER_OUTPUT_DIR")
            .map(PathBuf::from)
            .ok_or(ConfigError::MissingEnvVar("TESTLEDGER_OUTPUT_DIR"))?;

        let api_token = var("TESTLEDGER_API_TOKEN")
            .map(SecretString::from)
            .ok_or(ConfigError::MissingEnvVar("TESTLEDGER_API_TOKEN"))?;

        let api_url = normalize_api_url(
            var("TESTLEDGER_API_URL")
                .as_deref()
                .unwrap_or(defaults::API_URL),
        );

        let project_id = var("TESTLEDGER_PROJECT_ID").map(|v| LedgerId::parse(&v));

        let max_concurrent_transfers = match var("TESTLEDGER_MAX_CONCURRENT_TRANSFERS") {
            Some(v) => v
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|n| *n >= 1)
                .ok_or(ConfigError::InvalidValue(
                    "TESTLEDGER_MAX_CONCURRENT_TRANSFERS must be a positive number",
                ))?,
            None => defaults::MAX_CONCURRENT_TRANSFERS,
        };

        let artifacts = ArtifactSettings {
            enabled: var("TESTLEDGER_UPLOAD_ARTIFACTS").is_some_and(|v| parse_flag(&v)),
            screenshot_dir: var("TESTLEDGER_SCREENSHOT_DIR").map(PathBuf::from),
            video_dir: var("TESTLEDGER_VIDEO_DIR").map(PathBuf::from),
            max_concurrent_transfers,
        };

        let run = RunSettings {
            run_uuid: var("RUN_UUID").map(|v| v.trim().to_string()),
            group_uuid: var("GROUP_UUID").map(|v| v.trim().to_string()),
            main_run: var("MAIN_RUN").and_then(|v| v.trim().parse().ok()),
            title: var("RUN_TITLE"),
            site: var("SITE"),
            build_url: var("BUILD_URL"),
            version: var("APP_VERSION")
                .or_else(|| var("CODE_VERSION"))
                .or_else(|| var("TESTLEDGER_APP_VERSION"))
                .unwrap_or_else(|| defaults::APP_VERSION.to_string()),
            suites: var("TESTLEDGER_SUITES")
                .map(|v| {
                    v.split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_default(),
            repeat_run: var("TESTLEDGER_REPEAT_RUN").is_some_and(|v| parse_flag(&v)),
            issue_user: var("ISSUE_USER"),
            issue_summary: var("ISSUE_SUMMARY"),
            enable_flaky: var("ENABLE_FLAKY")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(0),
        };

        let filename_policy = if var("TESTLEDGER_LENIENT_LOG_NAMES").is_some_and(|v| parse_flag(&v))
        {
            FilenamePolicy::Lenient
        } else {
            FilenamePolicy::Strict
        };

        Ok(Config {
            output_dir,
            skip_passed: var("SKIP_PASSED_UPLOADS").is_some_and(|v| parse_flag(&v)),
            filename_policy,
            ledger: LedgerSettings {
                api_url,
                api_token,
                project_id,
            },
            artifacts,
            run,
        })
    }
}

/// Normalize a ledger base URL: default to https, keep an explicit scheme,
/// drop trailing slashes.
pub fn normalize_api_url(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.starts_with("https://") || trimmed.starts_with("http://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes"
    )
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(&'static str),
}
