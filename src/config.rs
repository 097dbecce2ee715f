//! Configuration types for every pipeline stage.
//!
//! Each stage gets its own struct so a caller that only searches never has
//! to provide OCR credentials:
//!
//! * [`LocatorConfig`] + [`SearchQuery`]: archive search form scraping
//! * [`CloudOcrConfig`]: credentials and polling bounds for the cloud OCR
//!   service, with the recognised options enumerated by [`CloudOcrOption`]
//! * [`AuditConfig`]: one end-to-end page audit
//!
//! Nothing here reads ambient process state implicitly.
//! [`CloudOcrConfig::from_env`] exists for the CLI, and every other
//! constructor is deterministic.

use crate::error::AuditError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Desktop browser identity sent to archive servers.
///
/// Some archive front-ends serve a stripped results page to unknown agents.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

// ── Locator ──────────────────────────────────────────────────────────────

/// How to find and read an archive's search form and results page.
///
/// Selectors are CSS selectors as understood by `lol_html`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocatorConfig {
    /// Client identity string. Default: [`DEFAULT_USER_AGENT`].
    pub user_agent: String,

    /// Per-request timeout in seconds. Default: 60.
    pub request_timeout_secs: u64,

    /// Structural query for candidate search forms. Default: `form`.
    pub form_selector: String,

    /// Name of the free-text keyword input. Default: `q`.
    pub keyword_field: String,

    /// Name of the field-scope selector. Default: `field`.
    pub scope_field: String,

    /// Element wrapping the whole result list; its absence means the page
    /// format drifted. Default: `#results`.
    pub results_selector: String,

    /// One element per hit, relative to `results_selector`. Default: `.result`.
    pub item_selector: String,

    /// Snippet element inside each hit. Default: `.snippet`.
    pub context_selector: String,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            request_timeout_secs: 60,
            form_selector: "form".to_string(),
            keyword_field: "q".to_string(),
            scope_field: "field".to_string(),
            results_selector: "#results".to_string(),
            item_selector: ".result".to_string(),
            context_selector: ".snippet".to_string(),
        }
    }
}

/// A keyword search against one archive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchQuery {
    /// Page that hosts the search form.
    pub base_url: String,
    pub keywords: String,
    /// Value for the field-scope selector, e.g. `all` or `title`.
    pub field: String,
}

impl SearchQuery {
    pub fn new(
        base_url: impl Into<String>,
        keywords: impl Into<String>,
        field: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            keywords: keywords.into(),
            field: field.into(),
        }
    }
}

// ── Cloud OCR ────────────────────────────────────────────────────────────

/// Result format requested from the cloud service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ExportFormat {
    /// Plain text. (default)
    #[default]
    Txt,
    /// Structured page → block → region → paragraph → line → character
    /// description with per-variant confidences. Saved verbatim, never parsed.
    Xml,
}

impl ExportFormat {
    /// Value of the `exportFormat` query parameter.
    pub fn as_param(self) -> &'static str {
        match self {
            ExportFormat::Txt => "txt",
            ExportFormat::Xml => "xml",
        }
    }

    /// File extension for saved results.
    pub fn extension(self) -> &'static str {
        self.as_param()
    }
}

/// How the client decides a submitted job has completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CompletionCheck {
    /// Query the status of the submitted job directly. (default)
    #[default]
    TaskStatus,
    /// Scan the account's finished-job list for the submitted job id.
    FinishedTaskList,
}

/// Options recognised by [`CloudOcrConfig::set`] and
/// [`CloudOcrConfig::from_pairs`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CloudOcrOption {
    ApplicationId,
    Secret,
    PollIntervalMs,
    TimeoutMs,
}

impl CloudOcrOption {
    pub const ALL: [CloudOcrOption; 4] = [
        CloudOcrOption::ApplicationId,
        CloudOcrOption::Secret,
        CloudOcrOption::PollIntervalMs,
        CloudOcrOption::TimeoutMs,
    ];

    /// Stable key used in option maps.
    pub fn key(self) -> &'static str {
        match self {
            CloudOcrOption::ApplicationId => "applicationId",
            CloudOcrOption::Secret => "secret",
            CloudOcrOption::PollIntervalMs => "pollIntervalMs",
            CloudOcrOption::TimeoutMs => "timeoutMs",
        }
    }

    /// Environment variable read by [`CloudOcrConfig::from_env`].
    pub fn env_var(self) -> &'static str {
        match self {
            CloudOcrOption::ApplicationId => "CLOUD_OCR_APPLICATION_ID",
            CloudOcrOption::Secret => "CLOUD_OCR_SECRET",
            CloudOcrOption::PollIntervalMs => "CLOUD_OCR_POLL_INTERVAL_MS",
            CloudOcrOption::TimeoutMs => "CLOUD_OCR_TIMEOUT_MS",
        }
    }
}

impl FromStr for CloudOcrOption {
    type Err = AuditError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CloudOcrOption::ALL
            .into_iter()
            .find(|o| o.key() == s)
            .ok_or_else(|| AuditError::Configuration(format!("unknown cloud OCR option '{s}'")))
    }
}

/// Settings for [`crate::pipeline::ocr::CloudOcrClient`].
#[derive(Clone)]
pub struct CloudOcrConfig {
    /// Application identifier issued by the service. Required.
    pub application_id: Option<String>,

    /// Secret paired with the application identifier. Required.
    pub secret: Option<String>,

    /// Delay between status polls in milliseconds. Default: 3000.
    ///
    /// The service rate-limits status calls; a few seconds between polls
    /// keeps a single job well under the limit.
    pub poll_interval_ms: u64,

    /// Upper bound on the whole wait, in milliseconds. Default: 120000.
    pub timeout_ms: u64,

    /// Service base URL. Default: `https://cloud.ocrsdk.com`.
    pub endpoint: String,

    /// Recognition language. Default: `English`.
    pub language: String,

    /// Default: [`ExportFormat::Txt`].
    pub export_format: ExportFormat,

    /// Default: [`CompletionCheck::TaskStatus`].
    pub completion_check: CompletionCheck,

    /// Per-HTTP-request timeout in seconds. Default: 60.
    pub request_timeout_secs: u64,
}

impl Default for CloudOcrConfig {
    fn default() -> Self {
        Self {
            application_id: None,
            secret: None,
            poll_interval_ms: 3000,
            timeout_ms: 120_000,
            endpoint: "https://cloud.ocrsdk.com".to_string(),
            language: "English".to_string(),
            export_format: ExportFormat::default(),
            completion_check: CompletionCheck::default(),
            request_timeout_secs: 60,
        }
    }
}

impl fmt::Debug for CloudOcrConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CloudOcrConfig")
            .field("application_id", &self.application_id)
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .field("poll_interval_ms", &self.poll_interval_ms)
            .field("timeout_ms", &self.timeout_ms)
            .field("endpoint", &self.endpoint)
            .field("language", &self.language)
            .field("export_format", &self.export_format)
            .field("completion_check", &self.completion_check)
            .finish()
    }
}

impl CloudOcrConfig {
    /// Create a new builder for `CloudOcrConfig`.
    pub fn builder() -> CloudOcrConfigBuilder {
        CloudOcrConfigBuilder {
            config: Self::default(),
        }
    }

    /// Set one recognised option from its string form.
    pub fn set(&mut self, option: CloudOcrOption, value: &str) -> Result<(), AuditError> {
        match option {
            CloudOcrOption::ApplicationId => self.application_id = Some(value.to_string()),
            CloudOcrOption::Secret => self.secret = Some(value.to_string()),
            CloudOcrOption::PollIntervalMs => self.poll_interval_ms = parse_ms(option, value)?,
            CloudOcrOption::TimeoutMs => self.timeout_ms = parse_ms(option, value)?,
        }
        Ok(())
    }

    /// Build from `(key, value)` pairs; unknown keys are rejected.
    pub fn from_pairs<'a, I>(pairs: I) -> Result<Self, AuditError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut config = Self::default();
        for (key, value) in pairs {
            config.set(key.parse()?, value)?;
        }
        Ok(config)
    }

    /// Read every [`CloudOcrOption`] that is set in the environment.
    ///
    /// Missing variables keep their defaults; credential presence is checked
    /// later by [`CloudOcrConfig::validate`].
    pub fn from_env() -> Result<Self, AuditError> {
        let mut config = Self::default();
        for option in CloudOcrOption::ALL {
            if let Ok(value) = std::env::var(option.env_var()) {
                if !value.is_empty() {
                    config.set(option, &value)?;
                }
            }
        }
        Ok(config)
    }

    /// Check credentials and bounds. Runs before any network call.
    pub fn validate(&self) -> Result<(), AuditError> {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        if !present(&self.application_id) {
            return Err(AuditError::Configuration(format!(
                "application id is missing (set {})",
                CloudOcrOption::ApplicationId.env_var()
            )));
        }
        if !present(&self.secret) {
            return Err(AuditError::Configuration(format!(
                "secret is missing (set {})",
                CloudOcrOption::Secret.env_var()
            )));
        }
        if self.poll_interval_ms == 0 {
            return Err(AuditError::Configuration(
                "poll interval must be > 0 ms".into(),
            ));
        }
        if self.timeout_ms == 0 {
            return Err(AuditError::Configuration("timeout must be > 0 ms".into()));
        }
        Ok(())
    }
}

fn parse_ms(option: CloudOcrOption, value: &str) -> Result<u64, AuditError> {
    value.trim().parse().map_err(|_| {
        AuditError::Configuration(format!(
            "{} must be a whole number of milliseconds, got '{value}'",
            option.key()
        ))
    })
}

/// Builder for [`CloudOcrConfig`].
#[derive(Debug)]
pub struct CloudOcrConfigBuilder {
    config: CloudOcrConfig,
}

impl CloudOcrConfigBuilder {
    pub fn application_id(mut self, id: impl Into<String>) -> Self {
        self.config.application_id = Some(id.into());
        self
    }

    pub fn secret(mut self, secret: impl Into<String>) -> Self {
        self.config.secret = Some(secret.into());
        self
    }

    pub fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.poll_interval_ms = ms;
        self
    }

    pub fn timeout_ms(mut self, ms: u64) -> Self {
        self.config.timeout_ms = ms;
        self
    }

    pub fn endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.endpoint = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.config.language = language.into();
        self
    }

    pub fn export_format(mut self, format: ExportFormat) -> Self {
        self.config.export_format = format;
        self
    }

    pub fn completion_check(mut self, check: CompletionCheck) -> Self {
        self.config.completion_check = check;
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<CloudOcrConfig, AuditError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

// ── Audit ────────────────────────────────────────────────────────────────

/// Settings for one end-to-end page audit.
#[derive(Clone)]
pub struct AuditConfig {
    /// 1-indexed page to audit. Default: 1.
    pub page: usize,

    /// Literal phrase searched in both text sources.
    pub phrase: String,

    /// Characters of context kept on each side of a match. Default: 10.
    pub context_window: usize,

    /// Directory receiving downloads, page images and OCR results.
    /// Default: `./ocr-audit-work`.
    pub work_dir: PathBuf,

    /// Longest edge of the rendered page in pixels. Default: 3000.
    ///
    /// Newspaper pages carry small print; the cloud service accepts images
    /// well above this size.
    pub max_rendered_pixels: u32,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Stage events, plus job submission and poll events of the OCR stage
    /// (these replace the OCR client's own callback for this audit).
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            page: 1,
            phrase: String::new(),
            context_window: 10,
            work_dir: PathBuf::from("ocr-audit-work"),
            max_rendered_pixels: 3000,
            password: None,
            download_timeout_secs: 120,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for AuditConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuditConfig")
            .field("page", &self.page)
            .field("phrase", &self.phrase)
            .field("context_window", &self.context_window)
            .field("work_dir", &self.work_dir)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn AuditProgressCallback>"),
            )
            .finish()
    }
}

impl AuditConfig {
    pub fn builder() -> AuditConfigBuilder {
        AuditConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`AuditConfig`].
#[derive(Debug)]
pub struct AuditConfigBuilder {
    config: AuditConfig,
}

impl AuditConfigBuilder {
    pub fn page(mut self, page: usize) -> Self {
        self.config.page = page;
        self
    }

    pub fn phrase(mut self, phrase: impl Into<String>) -> Self {
        self.config.phrase = phrase.into();
        self
    }

    pub fn context_window(mut self, chars: usize) -> Self {
        self.config.context_window = chars;
        self
    }

    pub fn work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.work_dir = dir.into();
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<AuditConfig, AuditError> {
        let c = &self.config;
        if c.page == 0 {
            return Err(AuditError::Configuration(
                "pages are 1-indexed, got 0".into(),
            ));
        }
        if c.phrase.is_empty() {
            return Err(AuditError::Configuration(
                "a target phrase is required".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn option_keys_round_trip() {
        for option in CloudOcrOption::ALL {
            assert_eq!(option.key().parse::<CloudOcrOption>().unwrap(), option);
        }
        assert!("pollInterval".parse::<CloudOcrOption>().is_err());
    }

    #[test]
    fn from_pairs_sets_known_options() {
        let config = CloudOcrConfig::from_pairs([
            ("applicationId", "app"),
            ("secret", "s3cret"),
            ("pollIntervalMs", "250"),
            ("timeoutMs", "1000"),
        ])
        .expect("valid pairs");
        assert_eq!(config.application_id.as_deref(), Some("app"));
        assert_eq!(config.poll_interval_ms, 250);
        assert_eq!(config.timeout_ms, 1000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn from_pairs_rejects_unknown_key_and_bad_number() {
        assert!(matches!(
            CloudOcrConfig::from_pairs([("password", "x")]),
            Err(AuditError::Configuration(_))
        ));
        assert!(matches!(
            CloudOcrConfig::from_pairs([("timeoutMs", "soon")]),
            Err(AuditError::Configuration(_))
        ));
    }

    #[test]
    fn validate_requires_both_credentials() {
        let missing_secret = CloudOcrConfig::builder().application_id("app").build();
        match missing_secret {
            Err(AuditError::Configuration(msg)) => assert!(msg.contains("secret")),
            other => panic!("expected Configuration error, got {other:?}"),
        }

        let missing_id = CloudOcrConfig::builder().secret("s").build();
        match missing_id {
            Err(AuditError::Configuration(msg)) => assert!(msg.contains("application id")),
            other => panic!("expected Configuration error, got {other:?}"),
        }

        let blank = CloudOcrConfig::builder()
            .application_id("  ")
            .secret("s")
            .build();
        assert!(blank.is_err());
    }

    #[test]
    fn validate_rejects_zero_bounds() {
        let zero_poll = CloudOcrConfig::builder()
            .application_id("a")
            .secret("s")
            .poll_interval_ms(0)
            .build();
        assert!(zero_poll.is_err());
    }

    #[test]
    fn debug_redacts_secret() {
        let config = CloudOcrConfig::builder()
            .application_id("app")
            .secret("hunter2")
            .build()
            .unwrap();
        let dbg = format!("{config:?}");
        assert!(!dbg.contains("hunter2"));
        assert!(dbg.contains("<redacted>"));
    }

    #[test]
    fn endpoint_trailing_slash_trimmed() {
        let config = CloudOcrConfig::builder()
            .application_id("a")
            .secret("s")
            .endpoint("http://127.0.0.1:9000/")
            .build()
            .unwrap();
        assert_eq!(config.endpoint, "http://127.0.0.1:9000");
    }

    #[test]
    fn audit_builder_validates() {
        assert!(AuditConfig::builder().phrase("x").page(0).build().is_err());
        assert!(AuditConfig::builder().build().is_err());
        let c = AuditConfig::builder()
            .phrase("James Meredith")
            .page(3)
            .build()
            .unwrap();
        assert_eq!(c.context_window, 10);
        assert_eq!(c.page, 3);
    }
}
