// # DNS Provider Trait
//
// Defines the interface for reading and editing the target DNS record.
//
// ## Implementations
//
// - Cloudflare legacy client API: `dyndns-provider-cloudflare` crate
//
// ## Usage
//
// ```rust,ignore
// use dyndns_core::DnsProvider;
//
// let record = provider.get_record().await?;
// provider.set_record("203.0.113.7", record.id).await?;
// ```

use async_trait::async_trait;

/// Record type this system manages
pub const RECORD_TYPE_A: &str = "A";

/// A DNS record as published by the provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsRecord {
    /// Provider-assigned identifier
    pub id: u64,
    /// Fully qualified record name
    pub name: String,
    /// Record type (always "A" for records returned by `get_record`)
    pub record_type: String,
    /// Published value
    pub content: String,
}

/// Trait for DNS provider implementations
///
/// The provider is bound to one domain and one target hostname at
/// construction time. Both calls are single-shot: no retry, no backoff,
/// no caching. Those decisions belong to the engine.
///
/// # Thread Safety
///
/// Implementations must be thread-safe and usable across async tasks.
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// Resolve the target "A" record
    ///
    /// # Returns
    ///
    /// - `Ok(DnsRecord)`: First record whose name and type match
    /// - `Err(Error::NotFound)`: No such record
    /// - `Err(Error::Transport)`: Request failed or non-success status
    /// - `Err(Error::Decode)`: Malformed payload or unparsable identifier
    async fn get_record(&self) -> Result<DnsRecord, crate::Error>;

    /// Publish `new_ip` on the record identified by `record_id`
    ///
    /// Success means the provider answered with a success status. There
    /// is no read-back.
    async fn set_record(&self, new_ip: &str, record_id: u64) -> Result<(), crate::Error>;

    /// Get the provider name
    fn provider_name(&self) -> &'static str;
}

/// Helper trait for constructing DNS providers from configuration
pub trait DnsProviderFactory: Send + Sync {
    /// Create a DnsProvider instance from configuration
    fn create(
        &self,
        config: &crate::config::ProviderConfig,
    ) -> Result<Box<dyn DnsProvider>, crate::Error>;
}
