// # IP Source Trait
//
// Defines the interface for discovering the caller's current public IP.
//
// ## Implementations
//
// - HTTP lookup service: `dyndns-ip-http` crate
//
// ## Usage
//
// ```rust,ignore
// use dyndns_core::IpSource;
//
// let ip = source.current().await?;
// tracing::info!("public IP is {}", ip);
// ```

use async_trait::async_trait;

/// Trait for IP source implementations
///
/// An IP source is an **observer**: it answers "what is my address right
/// now" and nothing else. It does not poll, cache, or decide when DNS gets
/// updated; the engine's timer owns scheduling.
///
/// The returned value is a string because the engine compares it textually
/// against the content published by the DNS provider.
#[async_trait]
pub trait IpSource: Send + Sync {
    /// Get the current public IP address
    ///
    /// One lookup per call, no retry.
    ///
    /// # Returns
    ///
    /// - `Ok(String)`: The current IP address, trimmed
    /// - `Err(Error)`: Transport failure, non-success status, or (when the
    ///   source validates) a body that is not an IP address
    async fn current(&self) -> Result<String, crate::Error>;

    /// Short name used in logs
    fn source_name(&self) -> &'static str;
}

/// Helper trait for constructing IP sources from configuration
pub trait IpSourceFactory: Send + Sync {
    /// Create an IpSource instance from configuration
    fn create(
        &self,
        config: &crate::config::IpLookupConfig,
    ) -> Result<Box<dyn IpSource>, crate::Error>;
}
