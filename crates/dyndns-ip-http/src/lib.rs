// # HTTP IP Source
//
// This crate provides an HTTP-based IP source for the dyndns system.
//
// ## Architecture
//
// Fetches the current IP from an external "what is my IP" service
// (e.g. api.ipify.org, icanhazip.com) whose whole response body is the
// caller's address as plain text. One request per `current()` call; the
// engine's timer decides how often that happens.

use dyndns_core::config::IpLookupConfig;
use dyndns_core::http::{HttpRequest, HttpTransport};
use dyndns_core::traits::{IpSource, IpSourceFactory};
use dyndns_core::{Error, ProviderRegistry, Result};

use std::net::IpAddr;
use std::sync::Arc;

/// HTTP-based public IP lookup
pub struct HttpIpSource {
    /// URL to fetch IP from
    url: String,

    /// Reject bodies that are not an IP address
    validate: bool,

    /// HTTP transport
    transport: Arc<dyn HttpTransport>,
}

impl HttpIpSource {
    /// Create a new HTTP IP source
    ///
    /// # Parameters
    ///
    /// - `url`: URL to fetch IP from (e.g., "https://api.ipify.org")
    /// - `validate`: Whether the body must parse as an IP address
    /// - `transport`: HTTP transport to send the lookup through
    pub fn new(url: impl Into<String>, validate: bool, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            url: url.into(),
            validate,
            transport,
        }
    }
}

#[async_trait::async_trait]
impl IpSource for HttpIpSource {
    async fn current(&self) -> Result<String> {
        let response = self.transport.send(HttpRequest::get(&self.url)).await?;

        if !response.is_success() {
            return Err(Error::bad_status(
                response.status,
                format!("IP lookup at {} failed", self.url),
            ));
        }

        let ip = response.body.trim();

        if self.validate && ip.parse::<IpAddr>().is_err() {
            return Err(Error::InvalidIp(ip.to_string()));
        }

        tracing::trace!("Lookup at {} returned {}", self.url, ip);
        Ok(ip.to_string())
    }

    fn source_name(&self) -> &'static str {
        "http"
    }
}

/// Factory for creating HTTP IP sources
pub struct HttpFactory {
    transport: Arc<dyn HttpTransport>,
}

impl HttpFactory {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport }
    }
}

impl IpSourceFactory for HttpFactory {
    fn create(&self, config: &IpLookupConfig) -> Result<Box<dyn IpSource>> {
        config.validate()?;

        match config {
            IpLookupConfig::Http { url, validate } => Ok(Box::new(HttpIpSource::new(
                url.clone(),
                *validate,
                Arc::clone(&self.transport),
            ))),
        }
    }
}

/// Register the HTTP IP source with a registry
pub fn register(registry: &ProviderRegistry, transport: Arc<dyn HttpTransport>) {
    registry.register_ip_source("http", Box::new(HttpFactory::new(transport)));
}
