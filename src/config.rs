//! Configuration types for the summarisation workflow.
//!
//! Two structs split the knobs by concern:
//!
//! * [`ApiConfig`]: where the remote prompt-tools service lives and how to
//!   authenticate against it (base URL, bearer token, app id, timeout).
//! * [`SummarizeConfig`]: what the workflow asks of that service (object
//!   names, prompt template, progress callback).
//!
//! Both are built through builders that validate on `build()`, with
//! well-documented defaults for every field the caller leaves alone.

use crate::error::SummarizeError;
use crate::progress::ProgressCallback;
use std::fmt;

/// Default base URL of the prompt-tools API.
pub const DEFAULT_BASE_URL: &str = "https://builder.impromptu-labs.com/api_tools";

/// Default name of the object holding the uploaded document.
pub const DEFAULT_UPLOAD_OBJECT: &str = "uploaded_document";

/// Default name of the object the summary is materialised into.
pub const DEFAULT_SUMMARY_OBJECT: &str = "document_summary";

/// Environment variable holding the API base URL.
pub const ENV_BASE_URL: &str = "DOCSUM_API_BASE";
/// Environment variable holding the bearer token.
pub const ENV_TOKEN: &str = "DOCSUM_API_TOKEN";
/// Environment variable holding the application identifier.
pub const ENV_APP_ID: &str = "DOCSUM_APP_ID";
/// Environment variable holding the request timeout in seconds.
pub const ENV_TIMEOUT: &str = "DOCSUM_TIMEOUT";

// ── ApiConfig ────────────────────────────────────────────────────────────

/// Connection settings for the remote prompt-tools service.
///
/// Every request carries `Authorization: Bearer {token}` and
/// `X-Generated-App-ID: {app_id}` alongside the JSON content type.
///
/// # Example
/// ```rust
/// use docsum::ApiConfig;
///
/// let api = ApiConfig::builder()
///     .base_url("http://localhost:8080/api_tools")
///     .token("secret")
///     .app_id("demo-app")
///     .build()
///     .unwrap();
/// assert_eq!(api.endpoint("input_data"), "http://localhost:8080/api_tools/input_data");
/// ```
#[derive(Clone)]
pub struct ApiConfig {
    /// Base URL, without trailing slash. Default: [`DEFAULT_BASE_URL`].
    pub base_url: String,

    /// Static bearer credential. Required.
    pub token: String,

    /// Value of the `X-Generated-App-ID` header. Default: empty.
    pub app_id: String,

    /// Per-request timeout in seconds. Default: 120.
    ///
    /// The transform call waits on a model completion, which can take tens
    /// of seconds on a large document.
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            token: String::new(),
            app_id: String::new(),
            timeout_secs: 120,
        }
    }
}

impl fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiConfig")
            .field("base_url", &self.base_url)
            .field("token", &"<redacted>")
            .field("app_id", &self.app_id)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl ApiConfig {
    /// Create a new builder for `ApiConfig`.
    pub fn builder() -> ApiConfigBuilder {
        ApiConfigBuilder {
            config: Self::default(),
        }
    }

    /// Build a config from `DOCSUM_API_BASE`, `DOCSUM_API_TOKEN`,
    /// `DOCSUM_APP_ID` and `DOCSUM_TIMEOUT`.
    pub fn from_env() -> Result<Self, SummarizeError> {
        let mut builder = Self::builder();
        if let Some(base) = non_empty_var(ENV_BASE_URL) {
            builder = builder.base_url(base);
        }
        if let Some(token) = non_empty_var(ENV_TOKEN) {
            builder = builder.token(token);
        }
        if let Some(app_id) = non_empty_var(ENV_APP_ID) {
            builder = builder.app_id(app_id);
        }
        if let Some(secs) = non_empty_var(ENV_TIMEOUT) {
            let secs = secs.parse::<u64>().map_err(|_| {
                SummarizeError::InvalidConfig(format!(
                    "{ENV_TIMEOUT} must be a whole number of seconds, got '{secs}'"
                ))
            })?;
            builder = builder.timeout_secs(secs);
        }
        builder.build()
    }

    /// Join an endpoint path onto the base URL.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Builder for [`ApiConfig`].
#[derive(Debug)]
pub struct ApiConfigBuilder {
    config: ApiConfig,
}

impl ApiConfigBuilder {
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.config.token = token.into();
        self
    }

    pub fn app_id(mut self, app_id: impl Into<String>) -> Self {
        self.config.app_id = app_id.into();
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.config.timeout_secs = secs.max(1);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ApiConfig, SummarizeError> {
        let c = &self.config;
        if c.token.trim().is_empty() {
            return Err(SummarizeError::InvalidConfig(format!(
                "an API token is required (set {ENV_TOKEN} or pass --token)"
            )));
        }
        if !(c.base_url.starts_with("http://") || c.base_url.starts_with("https://")) {
            return Err(SummarizeError::InvalidConfig(format!(
                "base URL must be http(s), got '{}'",
                c.base_url
            )));
        }
        Ok(self.config)
    }
}

// ── SummarizeConfig ──────────────────────────────────────────────────────

/// Workflow settings: which remote objects to create and which prompt to run.
///
/// Built via [`SummarizeConfig::builder()`] or [`SummarizeConfig::default()`].
#[derive(Clone)]
pub struct SummarizeConfig {
    /// Name of the object the document content is stored under.
    /// Default: `"uploaded_document"`.
    pub upload_object_name: String,

    /// Name of the object the transform materialises the summary into.
    /// Default: `"document_summary"`.
    pub summary_object_name: String,

    /// Custom prompt template. If None, uses [`crate::prompts::summary_prompt`].
    ///
    /// The template must contain the `{<upload_object_name>}` placeholder;
    /// the remote service substitutes the document content there.
    pub prompt_template: Option<String>,

    /// Optional progress callback for phase and percentage events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for SummarizeConfig {
    fn default() -> Self {
        Self {
            upload_object_name: DEFAULT_UPLOAD_OBJECT.to_string(),
            summary_object_name: DEFAULT_SUMMARY_OBJECT.to_string(),
            prompt_template: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for SummarizeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SummarizeConfig")
            .field("upload_object_name", &self.upload_object_name)
            .field("summary_object_name", &self.summary_object_name)
            .field("prompt_template", &self.prompt_template)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn WorkflowProgressCallback>"),
            )
            .finish()
    }
}

impl SummarizeConfig {
    /// Create a new builder for `SummarizeConfig`.
    pub fn builder() -> SummarizeConfigBuilder {
        SummarizeConfigBuilder {
            config: Self::default(),
        }
    }

    /// The prompt sent to `apply_prompt`: the custom template, or the
    /// built-in two-bullet prompt over the upload object.
    pub fn prompt(&self) -> String {
        match self.prompt_template {
            Some(ref t) => t.clone(),
            None => crate::prompts::summary_prompt(&self.upload_object_name),
        }
    }
}

/// Builder for [`SummarizeConfig`].
#[derive(Debug)]
pub struct SummarizeConfigBuilder {
    config: SummarizeConfig,
}

impl SummarizeConfigBuilder {
    pub fn upload_object_name(mut self, name: impl Into<String>) -> Self {
        self.config.upload_object_name = name.into();
        self
    }

    pub fn summary_object_name(mut self, name: impl Into<String>) -> Self {
        self.config.summary_object_name = name.into();
        self
    }

    pub fn prompt_template(mut self, template: impl Into<String>) -> Self {
        self.config.prompt_template = Some(template.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<SummarizeConfig, SummarizeError> {
        let c = &self.config;
        for (label, name) in [
            ("upload object name", &c.upload_object_name),
            ("summary object name", &c.summary_object_name),
        ] {
            if name.trim().is_empty() {
                return Err(SummarizeError::InvalidConfig(format!("{label} is empty")));
            }
            if name.contains('/') {
                return Err(SummarizeError::InvalidConfig(format!(
                    "{label} must not contain '/', got '{name}'"
                )));
            }
        }
        if c.upload_object_name == c.summary_object_name {
            return Err(SummarizeError::InvalidConfig(format!(
                "upload and summary objects must differ, both are '{}'",
                c.upload_object_name
            )));
        }
        if let Some(ref template) = c.prompt_template {
            let placeholder = crate::prompts::placeholder(&c.upload_object_name);
            if !template.contains(&placeholder) {
                return Err(SummarizeError::InvalidConfig(format!(
                    "prompt template must reference the document as {placeholder}"
                )));
            }
        }
        Ok(self.config)
    }
}
