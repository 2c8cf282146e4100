// # dyndns-core
//
// Core library for the dyndns reconcile loop.
//
// ## Architecture Overview
//
// - **HttpTransport**: Injected "send request, get status + body" capability
// - **IpSource**: Trait for looking up the current public IP
// - **DnsProvider**: Trait for reading and editing the target DNS record
// - **ReconcileEngine**: Timer-driven loop that keeps the record in sync
// - **ProviderRegistry**: Plugin-based registry for IP sources and providers
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Core logic is separate from implementations
// 2. **Single Flight**: One tick at a time, never overlapping
// 3. **Plugin-Based**: Providers are registered dynamically, no hard-coded if-else
// 4. **Library-First**: All core functionality can be used as a library
// 5. **No Optimism**: The baseline only moves after a confirmed write

pub mod config;
pub mod engine;
pub mod error;
pub mod http;
pub mod registry;
pub mod traits;

// Re-export core types for convenience
pub use config::{DdnsConfig, EngineConfig, IpLookupConfig, ProviderConfig, WriteFailurePolicy};
pub use engine::{EngineEvent, ExitReason, ReconcileEngine, TickOutcome};
pub use error::{Error, Result};
pub use http::{HttpRequest, HttpResponse, HttpTransport, Method, ReqwestTransport};
pub use registry::ProviderRegistry;
pub use traits::{DnsProvider, DnsRecord, IpSource};
