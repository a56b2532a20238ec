//! Configuration types for batch-export

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main configuration for the export engine
///
/// Fields are organized into logical sub-configs:
/// - [`retry`](RetryConfig) — request gateway backoff behavior
/// - [`export`](ExportConfig) — spreadsheet packaging
/// - [`delivery`](DeliveryConfig) — descriptor resolution (media downloads)
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Retry behavior for remote fetches
    #[serde(default)]
    pub retry: RetryConfig,

    /// Spreadsheet packaging settings
    #[serde(default)]
    pub export: ExportConfig,

    /// Delivery-side download settings
    #[serde(default)]
    pub delivery: DeliveryConfig,
}

/// Retry configuration for transient fetch failures
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (default: 5)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial delay before first retry (default: 1 second)
    #[serde(default = "default_initial_delay", with = "duration_serde")]
    pub initial_delay: Duration,

    /// Maximum delay between retries (default: 60 seconds)
    #[serde(default = "default_max_delay", with = "duration_serde")]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: true)
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

/// Spreadsheet packaging configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Worksheet name in the generated workbook (default: "Sheet1")
    #[serde(default = "default_sheet_name")]
    pub sheet_name: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            sheet_name: default_sheet_name(),
        }
    }
}

/// Delivery-side download configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeliveryConfig {
    /// Per-request timeout for media downloads (default: 30 seconds)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub request_timeout: Duration,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            request_timeout: default_request_timeout(),
        }
    }
}

/// Per-item failure handling for a processor's fetch loop
///
/// An explicit configuration point on each adapter, not a hidden global.
/// `Skip` is the recommended default so one bad id does not lose all prior
/// progress; a skipped id still advances the completed counter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Skip the failed item and continue the loop (default)
    #[default]
    Skip,
    /// Abort the whole task, surfacing the error to the caller
    Abort,
}

/// Ordering of a platform's image resolution variant lists
///
/// Platforms document different orderings for the variant URLs they return
/// per image. An adapter must state which ordering its platform uses rather
/// than assume one universally; the quality selector picks accordingly.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariantOrder {
    /// The last list entry is the highest-resolution variant (default)
    #[default]
    HighestLast,
    /// The first list entry is the highest-resolution variant
    HighestFirst,
}

impl VariantOrder {
    /// Select the highest-quality variant from an ordered list
    pub fn pick_best<'a, T>(&self, variants: &'a [T]) -> Option<&'a T> {
        match self {
            VariantOrder::HighestLast => variants.last(),
            VariantOrder::HighestFirst => variants.first(),
        }
    }
}

fn default_max_attempts() -> u32 {
    5
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(60)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_true() -> bool {
    true
}

fn default_sheet_name() -> String {
    "Sheet1".to_string()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
