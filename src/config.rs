//! Configuration management for Shopfront.
//!
//! Non-secret settings come from CLI arguments, environment variables and an
//! optional JSON file. Provider credentials are kept apart in a
//! [`CredentialStore`], resolved from the process environment and `.env`-style
//! files, and never serialized.

use crate::error::{Result, ShopfrontError};
use clap::Parser;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::convert::Infallible;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

/// Upper bound for the free-inference retry count.
pub const MAX_RETRIES_CAP: u32 = 5;

/// Lower bound for the paid-prediction inter-call delay.
pub const MIN_REPLICATE_DELAY: Duration = Duration::from_secs(10);

/// Parse the leading digits of a numeric override.
///
/// Values without leading digits become 0, which [`Config::normalize`] turns
/// into the default, so a malformed environment value never aborts startup.
fn lenient_number<T: FromStr + Default>(value: &str) -> std::result::Result<T, Infallible> {
    let digits: String = value
        .trim()
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    Ok(digits.parse().unwrap_or_default())
}

/// CLI arguments for the Shopfront client.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "shopfront",
    version,
    about = "Generate e-commerce marketing images from prompts",
    long_about = "Shopfront sends a batch of image prompts to the first configured provider\n\
                  (SiliconFlow, then Hugging Face, then Replicate), one call at a time,\n\
                  and reports one result per prompt in input order.",
    after_help = "EXAMPLES:\n    \
        shopfront --prompt \"white background product shot of a cat bowl\"\n    \
        shopfront -i prompts.json -o results.json\n    \
        shopfront -i prompts.txt --env-file sili.env --dry-run"
)]
pub struct Args {
    /// Prompt file: JSON array, {\"prompts\": [...]}, image-kind map, or one prompt per line
    #[arg(short, long, env = "SHOPFRONT_INPUT")]
    pub input: Option<PathBuf>,

    /// Prompt given inline (repeatable, appended after --input prompts)
    #[arg(short = 'p', long = "prompt", value_name = "TEXT")]
    pub prompts: Vec<String>,

    /// Path to write the JSON report (stdout when omitted)
    #[arg(short, long, env = "SHOPFRONT_OUTPUT")]
    pub output: Option<PathBuf>,

    /// Path to a JSON configuration file
    #[arg(short, long, env = "SHOPFRONT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Env files consulted for provider credentials, in priority order
    #[arg(long = "env-file", value_name = "PATH", default_values = [".env", "sili.env"])]
    pub env_files: Vec<PathBuf>,

    /// SiliconFlow API base URL
    #[arg(long, env = "SILICONFLOW_API_BASE")]
    pub siliconflow_base_url: Option<String>,

    /// SiliconFlow image model
    #[arg(long, env = "SILICONFLOW_IMAGE_MODEL")]
    pub siliconflow_model: Option<String>,

    /// Hugging Face inference model
    #[arg(long, env = "HF_IMAGE_MODEL")]
    pub hf_model: Option<String>,

    /// Maximum attempts per Hugging Face call (capped at 5)
    #[arg(long, env = "HF_MAX_RETRIES", value_parser = lenient_number::<u32>)]
    pub hf_max_retries: Option<u32>,

    /// Delay between Hugging Face attempts, in milliseconds
    #[arg(long, env = "HF_RETRY_DELAY_MS", value_parser = lenient_number::<u64>)]
    pub hf_retry_delay_ms: Option<u64>,

    /// Delay between Replicate calls, in milliseconds (at least 10000)
    #[arg(long, env = "REPLICATE_DELAY_MS", value_parser = lenient_number::<u64>)]
    pub replicate_delay_ms: Option<u64>,

    /// Enable verbose logging
    #[arg(short, long, env = "SHOPFRONT_VERBOSE")]
    pub verbose: bool,

    /// Output logs as JSON
    #[arg(long, env = "SHOPFRONT_JSON_LOGS")]
    pub json_logs: bool,

    /// Disable progress bar
    #[arg(long, env = "SHOPFRONT_NO_PROGRESS")]
    pub no_progress: bool,

    /// Dry run - resolve provider and pacing without generating images
    #[arg(long)]
    pub dry_run: bool,
}

impl Args {
    /// Parse CLI arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

/// Full application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// SiliconFlow (domestic, fast) settings.
    #[serde(default)]
    pub siliconflow: SiliconFlowConfig,

    /// Hugging Face inference (free) settings.
    #[serde(default)]
    pub huggingface: HuggingFaceConfig,

    /// Replicate prediction (paid) settings.
    #[serde(default)]
    pub replicate: ReplicateConfig,

    /// Retry settings for the free-inference provider.
    #[serde(default)]
    pub retry: RetryConfig,

    /// Inter-call pacing.
    #[serde(default)]
    pub pacing: PacingConfig,
}

/// SiliconFlow image generation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiliconFlowConfig {
    /// API base URL, without a trailing slash.
    #[serde(default = "default_siliconflow_base_url")]
    pub base_url: String,

    /// Image model identifier.
    #[serde(default = "default_siliconflow_model")]
    pub model: String,

    /// Requested image size.
    #[serde(default = "default_image_size")]
    pub image_size: String,

    /// Diffusion steps.
    #[serde(default = "default_inference_steps")]
    pub num_inference_steps: u32,

    /// Classifier-free guidance scale.
    #[serde(default = "default_guidance_scale")]
    pub guidance_scale: f64,

    /// Per-call timeout.
    #[serde(with = "humantime_serde", default = "default_long_timeout")]
    pub timeout: Duration,
}

impl Default for SiliconFlowConfig {
    fn default() -> Self {
        Self {
            base_url: default_siliconflow_base_url(),
            model: default_siliconflow_model(),
            image_size: default_image_size(),
            num_inference_steps: default_inference_steps(),
            guidance_scale: default_guidance_scale(),
            timeout: default_long_timeout(),
        }
    }
}

fn default_siliconflow_base_url() -> String {
    "https://api.siliconflow.cn".to_string()
}

fn default_siliconflow_model() -> String {
    "Kwai-Kolors/Kolors".to_string()
}

fn default_image_size() -> String {
    "1024x1024".to_string()
}

fn default_inference_steps() -> u32 {
    20
}

fn default_guidance_scale() -> f64 {
    7.5
}

fn default_long_timeout() -> Duration {
    Duration::from_secs(120)
}

/// Hugging Face inference settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HuggingFaceConfig {
    /// Inference API base URL, without a trailing slash.
    #[serde(default = "default_huggingface_base_url")]
    pub base_url: String,

    /// Model repository id.
    #[serde(default = "default_huggingface_model")]
    pub model: String,

    /// Per-attempt timeout.
    #[serde(with = "humantime_serde", default = "default_long_timeout")]
    pub timeout: Duration,
}

impl Default for HuggingFaceConfig {
    fn default() -> Self {
        Self {
            base_url: default_huggingface_base_url(),
            model: default_huggingface_model(),
            timeout: default_long_timeout(),
        }
    }
}

fn default_huggingface_base_url() -> String {
    "https://api-inference.huggingface.co".to_string()
}

fn default_huggingface_model() -> String {
    "runwayml/stable-diffusion-v1-5".to_string()
}

/// Replicate prediction settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplicateConfig {
    /// API base URL, without a trailing slash.
    #[serde(default = "default_replicate_base_url")]
    pub base_url: String,

    /// Model version submitted with each prediction.
    #[serde(default = "default_replicate_model")]
    pub model: String,

    /// Server-side wait hint sent as `Prefer: wait=N`.
    #[serde(default = "default_wait_seconds")]
    pub wait_seconds: u32,

    /// Per-call timeout.
    #[serde(with = "humantime_serde", default = "default_replicate_timeout")]
    pub timeout: Duration,
}

impl Default for ReplicateConfig {
    fn default() -> Self {
        Self {
            base_url: default_replicate_base_url(),
            model: default_replicate_model(),
            wait_seconds: default_wait_seconds(),
            timeout: default_replicate_timeout(),
        }
    }
}

fn default_replicate_base_url() -> String {
    "https://api.replicate.com".to_string()
}

fn default_replicate_model() -> String {
    "black-forest-labs/flux-schnell".to_string()
}

fn default_wait_seconds() -> u32 {
    60
}

fn default_replicate_timeout() -> Duration {
    Duration::from_secs(70)
}

/// Retry configuration for the free-inference provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts per call (0 means default, capped at 5).
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Fixed pause between attempts.
    #[serde(with = "humantime_serde", default = "default_retry_delay")]
    pub retry_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_delay: default_retry_delay(),
        }
    }
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay() -> Duration {
    Duration::from_millis(4000)
}

/// Delay inserted between consecutive provider calls of one batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PacingConfig {
    /// Delay for SiliconFlow and Hugging Face.
    #[serde(with = "humantime_serde", default = "default_pacing_delay")]
    pub delay: Duration,

    /// Delay for Replicate, floored at ten seconds.
    #[serde(with = "humantime_serde", default = "default_replicate_delay")]
    pub replicate_delay: Duration,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            delay: default_pacing_delay(),
            replicate_delay: default_replicate_delay(),
        }
    }
}

fn default_pacing_delay() -> Duration {
    Duration::from_millis(2000)
}

fn default_replicate_delay() -> Duration {
    Duration::from_millis(15000)
}

impl Config {
    /// Load configuration from a file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ShopfrontError::ConfigFileRead {
                path: path.to_path_buf(),
                source: e,
            })?;

        serde_json::from_str(&content).map_err(|e| ShopfrontError::JsonParse { line: 0, source: e })
    }

    /// Create configuration from CLI arguments.
    pub fn from_args(args: &Args) -> Result<Self> {
        let mut config = match &args.config {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        // Override with CLI args / environment
        if let Some(base_url) = &args.siliconflow_base_url {
            config.siliconflow.base_url.clone_from(base_url);
        }
        if let Some(model) = &args.siliconflow_model {
            config.siliconflow.model = model.trim().to_string();
        }
        if let Some(model) = &args.hf_model {
            config.huggingface.model = model.trim().to_string();
        }
        if let Some(max_retries) = args.hf_max_retries {
            config.retry.max_retries = max_retries;
        }
        if let Some(delay_ms) = args.hf_retry_delay_ms {
            config.retry.retry_delay = Duration::from_millis(delay_ms);
        }
        if let Some(delay_ms) = args.replicate_delay_ms {
            config.pacing.replicate_delay = Duration::from_millis(delay_ms);
        }

        config.normalize();
        config.validate()?;
        Ok(config)
    }

    /// Apply fallbacks and bounds to loosely specified values.
    pub fn normalize(&mut self) {
        for base_url in [
            &mut self.siliconflow.base_url,
            &mut self.huggingface.base_url,
            &mut self.replicate.base_url,
        ] {
            let trimmed = base_url.trim().trim_end_matches('/').to_string();
            *base_url = trimmed;
        }

        if self.retry.max_retries == 0 {
            self.retry.max_retries = default_max_retries();
        }
        self.retry.max_retries = self.retry.max_retries.min(MAX_RETRIES_CAP);

        if self.retry.retry_delay.is_zero() {
            self.retry.retry_delay = default_retry_delay();
        }

        if self.pacing.replicate_delay.is_zero() {
            self.pacing.replicate_delay = default_replicate_delay();
        }
        self.pacing.replicate_delay = self.pacing.replicate_delay.max(MIN_REPLICATE_DELAY);
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        let urls = [
            ("siliconflow", &self.siliconflow.base_url),
            ("huggingface", &self.huggingface.base_url),
            ("replicate", &self.replicate.base_url),
        ];
        for (provider, url) in urls {
            if url.is_empty() {
                return Err(ShopfrontError::InvalidConfig(format!(
                    "{provider} base URL cannot be empty"
                )));
            }
        }

        let models = [
            ("siliconflow", &self.siliconflow.model),
            ("huggingface", &self.huggingface.model),
            ("replicate", &self.replicate.model),
        ];
        for (provider, model) in models {
            if model.trim().is_empty() {
                return Err(ShopfrontError::InvalidConfig(format!(
                    "{provider} model cannot be empty"
                )));
            }
        }

        let timeouts = [
            ("siliconflow", self.siliconflow.timeout),
            ("huggingface", self.huggingface.timeout),
            ("replicate", self.replicate.timeout),
        ];
        for (provider, timeout) in timeouts {
            if timeout.is_zero() {
                return Err(ShopfrontError::InvalidConfig(format!(
                    "{provider} timeout must be greater than 0"
                )));
            }
        }

        Ok(())
    }
}

/// API keys and tokens for the image providers.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    /// SiliconFlow API key.
    pub siliconflow_api_key: Option<String>,
    /// Hugging Face access token.
    pub hf_token: Option<String>,
    /// Replicate API token.
    pub replicate_token: Option<String>,
}

const SILICONFLOW_KEYS: &[&str] = &["SILICONFLOW_API_KEY"];
const HF_KEYS: &[&str] = &["HF_TOKEN", "HUGGINGFACE_TOKEN"];
const REPLICATE_KEYS: &[&str] = &["REPLICATE_API_TOKEN"];

impl Credentials {
    /// Whether no provider credential is present at all.
    pub fn is_empty(&self) -> bool {
        self.siliconflow_api_key.is_none() && self.hf_token.is_none() && self.replicate_token.is_none()
    }

    /// Resolve credentials from the process environment, then the given env files.
    pub fn from_environment(env_files: &[PathBuf]) -> Self {
        Self::resolve(|name| std::env::var(name).ok(), env_files)
    }

    /// Resolve credentials with `lookup` taking precedence over env files.
    ///
    /// Files are consulted in order; the first non-empty value wins. All
    /// whitespace is stripped from values, and empty values count as absent.
    pub fn resolve<F>(lookup: F, env_files: &[PathBuf]) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let files: Vec<HashMap<String, String>> =
            env_files.iter().filter_map(|path| read_env_file(path)).collect();

        let find = |names: &[&str]| -> Option<String> {
            let from_process = names.iter().find_map(|name| lookup(*name).and_then(clean_secret));
            from_process.or_else(|| {
                files.iter().find_map(|vars| {
                    names
                        .iter()
                        .find_map(|name| vars.get(*name).cloned().and_then(clean_secret))
                })
            })
        };

        Self {
            siliconflow_api_key: find(SILICONFLOW_KEYS),
            hf_token: find(HF_KEYS),
            replicate_token: find(REPLICATE_KEYS),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |value: &Option<String>| value.as_ref().map(|_| "<redacted>");
        f.debug_struct("Credentials")
            .field("siliconflow_api_key", &redact(&self.siliconflow_api_key))
            .field("hf_token", &redact(&self.hf_token))
            .field("replicate_token", &redact(&self.replicate_token))
            .finish()
    }
}

fn clean_secret(value: String) -> Option<String> {
    let cleaned: String = value.chars().filter(|c| !c.is_whitespace()).collect();
    (!cleaned.is_empty()).then_some(cleaned)
}

fn read_env_file(path: &Path) -> Option<HashMap<String, String>> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "Env file not readable, skipping");
            return None;
        }
    };
    let content = raw.strip_prefix('\u{feff}').unwrap_or(&raw);

    let vars = dotenvy::from_read_iter(content.as_bytes())
        .filter_map(std::result::Result::ok)
        .collect();
    Some(vars)
}

/// Loader invoked by the [`CredentialStore`] on construction and reload.
pub type CredentialLoader = dyn Fn() -> Credentials + Send + Sync;

/// Process-wide credential cache.
///
/// The loader runs once on construction. Readers take a snapshot per batch;
/// if nothing was configured at the last load the loader runs again first, so
/// keys added to an env file after start-up are picked up without a restart.
pub struct CredentialStore {
    loader: Box<CredentialLoader>,
    cached: RwLock<Credentials>,
}

impl CredentialStore {
    /// Create a store backed by an arbitrary loader.
    pub fn new<F>(loader: F) -> Self
    where
        F: Fn() -> Credentials + Send + Sync + 'static,
    {
        let initial = loader();
        Self {
            loader: Box::new(loader),
            cached: RwLock::new(initial),
        }
    }

    /// Create a store reading the process environment and the given env files.
    pub fn from_environment(env_files: Vec<PathBuf>) -> Self {
        Self::new(move || Credentials::from_environment(&env_files))
    }

    /// Create a store that always yields the same credentials.
    pub fn fixed(credentials: Credentials) -> Self {
        Self::new(move || credentials.clone())
    }

    /// Current credentials, reloading first when none are cached.
    pub fn snapshot(&self) -> Credentials {
        {
            let cached = self.cached.read();
            if !cached.is_empty() {
                return cached.clone();
            }
        }
        self.reload()
    }

    /// Re-run the loader and replace the cached credentials.
    pub fn reload(&self) -> Credentials {
        let fresh = (self.loader)();
        info!(
            siliconflow = fresh.siliconflow_api_key.is_some(),
            huggingface = fresh.hf_token.is_some(),
            replicate = fresh.replicate_token.is_some(),
            "Credentials loaded"
        );
        *self.cached.write() = fresh.clone();
        fresh
    }
}

impl fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialStore")
            .field("cached", &*self.cached.read())
            .finish_non_exhaustive()
    }
}

/// Custom serde module for humantime Duration parsing.
mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("{}ms", duration.as_millis()))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let s = s.trim();
        // "ms" must be checked before "s"
        if let Some(ms) = s.strip_suffix("ms") {
            ms.trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(serde::de::Error::custom)
        } else if let Some(secs) = s.strip_suffix('s') {
            secs.trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(serde::de::Error::custom)
        } else {
            s.parse::<u64>()
                .map(Duration::from_secs)
                .map_err(serde::de::Error::custom)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["shopfront"];
        argv.extend_from_slice(extra);
        Args::parse_from(argv)
    }

    #[test]
    fn test_defaults_match_provider_contracts() {
        let config = Config::default();
        assert_eq!(config.siliconflow.base_url, "https://api.siliconflow.cn");
        assert_eq!(config.siliconflow.model, "Kwai-Kolors/Kolors");
        assert_eq!(config.huggingface.model, "runwayml/stable-diffusion-v1-5");
        assert_eq!(config.replicate.wait_seconds, 60);
        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(config.retry.retry_delay, Duration::from_millis(4000));
        assert_eq!(config.pacing.delay, Duration::from_millis(2000));
        assert_eq!(config.pacing.replicate_delay, Duration::from_millis(15000));
    }

    #[test]
    fn test_normalize_clamps_retry_and_pacing() {
        let mut config = Config::default();
        config.retry.max_retries = 9;
        config.pacing.replicate_delay = Duration::from_millis(3000);
        config.siliconflow.base_url = "https://sf.test/".to_string();
        config.normalize();

        assert_eq!(config.retry.max_retries, MAX_RETRIES_CAP);
        assert_eq!(config.pacing.replicate_delay, MIN_REPLICATE_DELAY);
        assert_eq!(config.siliconflow.base_url, "https://sf.test");

        config.retry.max_retries = 0;
        config.retry.retry_delay = Duration::ZERO;
        config.normalize();
        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(config.retry.retry_delay, Duration::from_millis(4000));
    }

    #[test]
    fn test_from_args_applies_overrides() {
        let config = from_args_ok(&args(&[
            "--hf-max-retries",
            "4",
            "--hf-retry-delay-ms",
            "250",
            "--replicate-delay-ms",
            "20000",
            "--siliconflow-model",
            " custom/model ",
        ]));

        assert_eq!(config.retry.max_retries, 4);
        assert_eq!(config.retry.retry_delay, Duration::from_millis(250));
        assert_eq!(config.pacing.replicate_delay, Duration::from_secs(20));
        assert_eq!(config.siliconflow.model, "custom/model");
    }

    #[test]
    fn test_malformed_numeric_overrides_fall_back() {
        let config = from_args_ok(&args(&[
            "--hf-max-retries",
            "abc",
            "--hf-retry-delay-ms=-1",
            "--replicate-delay-ms",
            "soon",
        ]));
        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(config.retry.retry_delay, Duration::from_millis(4000));
        assert_eq!(config.pacing.replicate_delay, Duration::from_secs(15));

        let config = from_args_ok(&args(&[
            "--hf-max-retries",
            "12abc",
            "--replicate-delay-ms",
            "2500ms",
        ]));
        assert_eq!(config.retry.max_retries, MAX_RETRIES_CAP);
        assert_eq!(config.pacing.replicate_delay, MIN_REPLICATE_DELAY);
    }

    #[test]
    fn test_lenient_number_reads_leading_digits() {
        assert_eq!(lenient_number::<u64>(" 4000 "), Ok(4000));
        assert_eq!(lenient_number::<u64>("15000ms"), Ok(15000));
        assert_eq!(lenient_number::<u32>("-1"), Ok(0));
        assert_eq!(lenient_number::<u32>("99999999999"), Ok(0));
    }

    fn from_args_ok(args: &Args) -> Config {
        match Config::from_args(args) {
            Ok(config) => config,
            Err(e) => panic!("config should load: {e}"),
        }
    }

    #[test]
    fn test_config_file_with_durations() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "huggingface": {{"model": "stabilityai/sdxl", "timeout": "45s"}},
                "retry": {{"max_retries": 2, "retry_delay": "1500ms"}},
                "pacing": {{"delay": "1"}}
            }}"#
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.huggingface.model, "stabilityai/sdxl");
        assert_eq!(config.huggingface.timeout, Duration::from_secs(45));
        assert_eq!(config.retry.max_retries, 2);
        assert_eq!(config.retry.retry_delay, Duration::from_millis(1500));
        assert_eq!(config.pacing.delay, Duration::from_secs(1));
        assert_eq!(config.siliconflow, SiliconFlowConfig::default());
    }

    #[test]
    fn test_validate_rejects_empty_model() {
        let mut config = Config::default();
        config.replicate.model = "  ".to_string();
        assert!(matches!(
            config.validate(),
            Err(ShopfrontError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_credentials_prefer_process_env_and_strip_whitespace() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "\u{feff}SILICONFLOW_API_KEY=from-file").unwrap();
        writeln!(file, "HUGGINGFACE_TOKEN=\"hf_ abc\"").unwrap();
        writeln!(file, "REPLICATE_API_TOKEN=").unwrap();

        let lookup = |name: &str| match name {
            "SILICONFLOW_API_KEY" => Some(" sk-\tprocess \n".to_string()),
            _ => None,
        };
        let creds = Credentials::resolve(lookup, &[file.path().to_path_buf()]);

        assert_eq!(creds.siliconflow_api_key.as_deref(), Some("sk-process"));
        assert_eq!(creds.hf_token.as_deref(), Some("hf_abc"));
        assert_eq!(creds.replicate_token, None);
    }

    #[test]
    fn test_credentials_first_env_file_wins() {
        let mut first = tempfile::NamedTempFile::new().unwrap();
        writeln!(first, "REPLICATE_API_TOKEN=r8_first").unwrap();
        let mut second = tempfile::NamedTempFile::new().unwrap();
        writeln!(second, "REPLICATE_API_TOKEN=r8_second").unwrap();
        writeln!(second, "HF_TOKEN=hf_second").unwrap();

        let files = vec![
            PathBuf::from("/nonexistent/.env"),
            first.path().to_path_buf(),
            second.path().to_path_buf(),
        ];
        let creds = Credentials::resolve(|_| None, &files);

        assert_eq!(creds.replicate_token.as_deref(), Some("r8_first"));
        assert_eq!(creds.hf_token.as_deref(), Some("hf_second"));
    }

    #[test]
    fn test_credentials_debug_is_redacted() {
        let creds = Credentials {
            siliconflow_api_key: Some("sk-secret".to_string()),
            ..Credentials::default()
        };
        let rendered = format!("{creds:?}");
        assert!(!rendered.contains("sk-secret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_store_reloads_only_when_empty() {
        let loads = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&loads);
        let store = CredentialStore::new(move || {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            if n == 0 {
                Credentials::default()
            } else {
                Credentials {
                    hf_token: Some("hf_late".to_string()),
                    ..Credentials::default()
                }
            }
        });
        assert_eq!(loads.load(Ordering::SeqCst), 1);

        // First miss triggers a reload
        let creds = store.snapshot();
        assert_eq!(creds.hf_token.as_deref(), Some("hf_late"));
        assert_eq!(loads.load(Ordering::SeqCst), 2);

        // Cached afterwards
        store.snapshot();
        assert_eq!(loads.load(Ordering::SeqCst), 2);
    }
}
