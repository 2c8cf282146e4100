//! Core traits for the dyndns system
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`IpSource`]: Look up the current public IP address
//! - [`DnsProvider`]: Read and edit the target DNS record

pub mod dns_provider;
pub mod ip_source;

pub use dns_provider::{DnsProvider, DnsProviderFactory, DnsRecord};
pub use ip_source::{IpSource, IpSourceFactory};
