//! Configuration types for the dyndns system
//!
//! The configuration is built once at startup and handed to each component.
//! Nothing in the crate reads process-wide state.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Legacy Cloudflare client API endpoint
pub const DEFAULT_API_URL: &str = "https://www.cloudflare.com/api_json.html";

/// Default public IP lookup service (returns plain text IP)
pub const DEFAULT_IP_LOOKUP_URL: &str = "https://api.ipify.org";

/// Main dyndns configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DdnsConfig {
    /// Public IP lookup configuration
    pub ip_lookup: IpLookupConfig,

    /// DNS provider configuration
    pub provider: ProviderConfig,

    /// Optional engine settings
    #[serde(default)]
    pub engine: EngineConfig,
}

impl DdnsConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.ip_lookup.validate()?;
        self.provider.validate()?;
        self.engine.validate()?;
        Ok(())
    }
}

/// Public IP lookup configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IpLookupConfig {
    /// Plain-text HTTP lookup service
    Http {
        /// URL to fetch the IP from
        url: String,
        /// Reject bodies that do not parse as an IP address
        #[serde(default = "default_validate")]
        validate: bool,
    },
}

impl IpLookupConfig {
    /// Create an HTTP lookup with validation enabled
    pub fn http(url: impl Into<String>) -> Self {
        IpLookupConfig::Http {
            url: url.into(),
            validate: true,
        }
    }

    /// Registry key for this lookup type
    pub fn type_name(&self) -> &str {
        match self {
            IpLookupConfig::Http { .. } => "http",
        }
    }

    /// Validate the IP lookup configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            IpLookupConfig::Http { url, .. } => {
                if url.is_empty() {
                    return Err(crate::Error::config("IP lookup URL cannot be empty"));
                }
                if !url.starts_with("https://") && !url.starts_with("http://") {
                    return Err(crate::Error::config(format!(
                        "IP lookup URL must use HTTP or HTTPS scheme. Got: {}",
                        url
                    )));
                }
                Ok(())
            }
        }
    }
}

impl Default for IpLookupConfig {
    fn default() -> Self {
        IpLookupConfig::http(DEFAULT_IP_LOOKUP_URL)
    }
}

/// DNS provider configuration
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderConfig {
    /// Cloudflare legacy client API (`rec_load_all` / `rec_edit`)
    Cloudflare {
        /// Account e-mail address associated with the API key
        email: String,
        /// API key from the account page
        api_token: String,
        /// Zone that holds the record (e.g. "example.com")
        domain: String,
        /// Fully qualified record name (e.g. "home.example.com")
        target: String,
        /// TTL in seconds; 1 = automatic, otherwise 120..=86400 per the provider
        #[serde(default = "default_ttl")]
        ttl: u32,
        /// API endpoint
        #[serde(default = "default_api_url")]
        api_url: String,
        /// Resolve the record but only log the edit
        #[serde(default)]
        dry_run: bool,
    },
}

impl ProviderConfig {
    /// Create a Cloudflare configuration with default TTL and endpoint
    pub fn cloudflare(
        email: impl Into<String>,
        api_token: impl Into<String>,
        domain: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        ProviderConfig::Cloudflare {
            email: email.into(),
            api_token: api_token.into(),
            domain: domain.into(),
            target: target.into(),
            ttl: default_ttl(),
            api_url: default_api_url(),
            dry_run: false,
        }
    }

    /// Validate the provider configuration
    ///
    /// The TTL range is enforced by the provider, not here.
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            ProviderConfig::Cloudflare {
                email,
                api_token,
                domain,
                target,
                api_url,
                ..
            } => {
                if email.is_empty() {
                    return Err(crate::Error::config("Cloudflare account e-mail cannot be empty"));
                }
                if api_token.is_empty() {
                    return Err(crate::Error::config("Cloudflare API token cannot be empty"));
                }
                if domain.is_empty() {
                    return Err(crate::Error::config("DNS domain cannot be empty"));
                }
                if target.is_empty() {
                    return Err(crate::Error::config("Target hostname cannot be empty"));
                }
                if api_url.is_empty() {
                    return Err(crate::Error::config("Cloudflare API URL cannot be empty"));
                }
                Ok(())
            }
        }
    }

    /// Get the provider type name
    pub fn type_name(&self) -> &str {
        match self {
            ProviderConfig::Cloudflare { .. } => "cloudflare",
        }
    }

    /// The record name this configuration targets
    pub fn target(&self) -> &str {
        match self {
            ProviderConfig::Cloudflare { target, .. } => target,
        }
    }
}

// Custom Debug implementation that hides the API token
impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderConfig::Cloudflare {
                email,
                domain,
                target,
                ttl,
                api_url,
                dry_run,
                ..
            } => f
                .debug_struct("Cloudflare")
                .field("email", email)
                .field("api_token", &"<REDACTED>")
                .field("domain", domain)
                .field("target", target)
                .field("ttl", ttl)
                .field("api_url", api_url)
                .field("dry_run", dry_run)
                .finish(),
        }
    }
}

/// What the engine does when a record edit fails in steady state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteFailurePolicy {
    /// Log, keep the baseline, try again on the next tick
    #[default]
    Retry,
    /// Stop the engine with a fatal exit reason
    Exit,
}

impl std::str::FromStr for WriteFailurePolicy {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "retry" => Ok(WriteFailurePolicy::Retry),
            "exit" | "fatal" => Ok(WriteFailurePolicy::Exit),
            other => Err(crate::Error::config(format!(
                "Unknown write failure policy '{}'. Valid: retry, exit",
                other
            ))),
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Seconds between ticks
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Behaviour after a failed record edit
    #[serde(default)]
    pub write_failure_policy: WriteFailurePolicy,

    /// Capacity of the monitoring event channel
    ///
    /// When full, new events are dropped with a warning log.
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl EngineConfig {
    /// Validate the engine configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.interval_secs == 0 {
            return Err(crate::Error::config("Polling interval must be > 0"));
        }
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("Event channel capacity must be > 0"));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            write_failure_policy: WriteFailurePolicy::default(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

fn default_validate() -> bool {
    true
}

fn default_ttl() -> u32 {
    120
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_interval_secs() -> u64 {
    5
}

fn default_event_channel_capacity() -> usize {
    64
}
