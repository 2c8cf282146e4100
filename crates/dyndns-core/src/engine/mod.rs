//! Core reconcile engine
//!
//! The ReconcileEngine is responsible for:
//! - Resolving the target record once at startup
//! - Looking up the public IP on every tick
//! - Editing the record when the IP diverges from the baseline
//! - Moving the baseline only after a successful edit
//!
//! ## Architecture
//!
//! ```text
//!                 ┌──────────────────┐
//!   timer tick ──▶│ ReconcileEngine  │──── EngineEvent ───▶ (monitoring)
//!                 └──────────────────┘
//!                   │              │
//!                   ▼              ▼
//!           ┌─────────────┐  ┌─────────────┐
//!           │  IpSource   │  │ DnsProvider │
//!           │ (current)   │  │ (get / set) │
//!           └─────────────┘  └─────────────┘
//! ```
//!
//! ## State Machine
//!
//! ```text
//! Initializing ──get_record ok──▶ Steady ──shutdown / fatal──▶ Stopped
//!      │
//!      └──get_record err──▶ Stopped (StartupFailed)
//! ```
//!
//! ## Tick Flow
//!
//! 1. Look up the public IP; on failure skip the tick
//! 2. Compare with the baseline (exact string equality)
//! 3. If different, edit the record
//! 4. On success, move the baseline; on failure apply the write policy

use crate::config::{DdnsConfig, WriteFailurePolicy};
use crate::error::{Error, Result};
use crate::traits::{DnsProvider, IpSource};
use std::future::Future;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Events emitted by the ReconcileEngine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Engine started, about to resolve the record
    Started {
        record_name: String,
    },

    /// Startup lookup found the record
    RecordResolved {
        record_id: u64,
        content: String,
    },

    /// Public IP lookup failed, tick skipped
    LookupFailed {
        error: String,
    },

    /// Public IP matches the baseline
    IpUnchanged {
        ip: String,
    },

    /// Record edit succeeded
    UpdateSucceeded {
        previous_ip: String,
        new_ip: String,
    },

    /// Record edit failed
    UpdateFailed {
        new_ip: String,
        error: String,
    },

    /// Engine stopped
    Stopped {
        reason: String,
    },
}

/// The last value known to be published, and where it lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Baseline {
    pub record_id: u64,
    pub ip: String,
}

/// Engine lifecycle state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineState {
    Initializing,
    Steady(Baseline),
    Stopped,
}

/// Result of one tick
#[derive(Debug)]
pub enum TickOutcome {
    /// Public IP equals the baseline; the provider was not contacted
    Unchanged,
    /// Record edited and baseline moved
    Updated { previous: String, current: String },
    /// Public IP lookup failed; baseline unchanged
    LookupFailed(Error),
    /// Record edit failed; baseline unchanged
    WriteFailed { new_ip: String, error: Error },
    /// Tick requested outside the Steady state
    NotReady,
}

/// Why the engine stopped
#[derive(Debug)]
pub enum ExitReason {
    /// Shutdown signal received
    Shutdown,
    /// The record could not be resolved at startup
    StartupFailed(Error),
    /// A record edit failed under [`WriteFailurePolicy::Exit`]
    WriteFailed(Error),
}

impl ExitReason {
    /// Whether the engine stopped because of an error
    pub fn is_fatal(&self) -> bool {
        !matches!(self, ExitReason::Shutdown)
    }

    /// The error that stopped the engine, if any
    pub fn error(&self) -> Option<&Error> {
        match self {
            ExitReason::Shutdown => None,
            ExitReason::StartupFailed(e) | ExitReason::WriteFailed(e) => Some(e),
        }
    }
}

/// Core reconcile engine
///
/// ## Lifecycle
///
/// 1. Create with [`ReconcileEngine::new()`]
/// 2. Start with [`ReconcileEngine::run_until()`] and a shutdown future
/// 3. Inspect the returned [`ExitReason`]
///
/// ## Threading
///
/// The engine runs on a single task. A tick's body is awaited before the
/// timer is polled again, so ticks never overlap and the baseline needs no
/// locking.
pub struct ReconcileEngine {
    /// Public IP lookup
    ip_source: Box<dyn IpSource>,

    /// DNS provider for reading and editing the record
    provider: Box<dyn DnsProvider>,

    /// Record name, for logs and events
    record_name: String,

    /// Time between ticks
    interval: Duration,

    /// What to do when an edit fails
    write_failure_policy: WriteFailurePolicy,

    /// Lifecycle state, holding the baseline once Steady
    state: EngineState,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<EngineEvent>,
}

impl ReconcileEngine {
    /// Create a new engine
    ///
    /// # Returns
    ///
    /// A tuple of (engine, event_receiver) where event_receiver yields engine events
    pub fn new(
        ip_source: Box<dyn IpSource>,
        provider: Box<dyn DnsProvider>,
        config: &DdnsConfig,
    ) -> Result<(Self, mpsc::Receiver<EngineEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.engine.event_channel_capacity);

        let engine = Self {
            ip_source,
            provider,
            record_name: config.provider.target().to_string(),
            interval: Duration::from_secs(config.engine.interval_secs),
            write_failure_policy: config.engine.write_failure_policy,
            state: EngineState::Initializing,
            event_tx: tx,
        };

        Ok((engine, rx))
    }

    /// Current lifecycle state
    pub fn state(&self) -> &EngineState {
        &self.state
    }

    /// Baseline, once the engine is Steady
    pub fn baseline(&self) -> Option<&Baseline> {
        match &self.state {
            EngineState::Steady(baseline) => Some(baseline),
            _ => None,
        }
    }

    /// Run until `shutdown` completes or a fatal error occurs
    ///
    /// A shutdown that arrives mid-tick takes effect once that tick's
    /// network calls have finished.
    pub async fn run_until<F>(&mut self, shutdown: F) -> ExitReason
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        self.emit_event(EngineEvent::Started {
            record_name: self.record_name.clone(),
        });

        let init = tokio::select! {
            res = self.initialize() => res,
            _ = &mut shutdown => return self.stop(ExitReason::Shutdown),
        };
        if let Err(e) = init {
            error!("Unable to resolve DNS record {}: {}", self.record_name, e);
            return self.stop(ExitReason::StartupFailed(e));
        }

        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let TickOutcome::WriteFailed { error, .. } = self.tick().await {
                        if self.write_failure_policy == WriteFailurePolicy::Exit {
                            return self.stop(ExitReason::WriteFailed(error));
                        }
                    }
                }

                _ = &mut shutdown => {
                    info!("Shutdown signal received");
                    return self.stop(ExitReason::Shutdown);
                }
            }
        }
    }

    /// Resolve the record and enter the Steady state
    ///
    /// Called once by the run loop. Calling it again re-reads the record
    /// and resets the baseline.
    pub async fn initialize(&mut self) -> Result<Baseline> {
        info!("Resolving DNS record {}", self.record_name);

        let record = self.provider.get_record().await?;
        info!("Found record {} = {}", record.id, record.content);

        self.emit_event(EngineEvent::RecordResolved {
            record_id: record.id,
            content: record.content.clone(),
        });

        let baseline = Baseline {
            record_id: record.id,
            ip: record.content,
        };
        self.state = EngineState::Steady(baseline.clone());

        Ok(baseline)
    }

    /// Run one Steady-state tick
    pub async fn tick(&mut self) -> TickOutcome {
        let (record_id, previous) = match &self.state {
            EngineState::Steady(baseline) => (baseline.record_id, baseline.ip.clone()),
            state => {
                warn!("Tick requested in state {:?}, ignoring", state);
                return TickOutcome::NotReady;
            }
        };

        let ip = match self.ip_source.current().await {
            Ok(ip) => ip,
            Err(e) => {
                warn!("IP lookup via {} failed: {}", self.ip_source.source_name(), e);
                self.emit_event(EngineEvent::LookupFailed {
                    error: e.to_string(),
                });
                return TickOutcome::LookupFailed(e);
            }
        };

        if ip == previous {
            debug!("IP unchanged: {}", ip);
            self.emit_event(EngineEvent::IpUnchanged { ip });
            return TickOutcome::Unchanged;
        }

        info!("IP changed: {} -> {}, updating {}", previous, ip, self.record_name);

        if let Err(e) = self.provider.set_record(&ip, record_id).await {
            error!(
                "Unable to set {} on {} via {}: {}",
                ip,
                self.record_name,
                self.provider.provider_name(),
                e
            );
            self.emit_event(EngineEvent::UpdateFailed {
                new_ip: ip.clone(),
                error: e.to_string(),
            });
            return TickOutcome::WriteFailed { new_ip: ip, error: e };
        }

        info!("Updated {} to {}", self.record_name, ip);
        self.state = EngineState::Steady(Baseline {
            record_id,
            ip: ip.clone(),
        });
        self.emit_event(EngineEvent::UpdateSucceeded {
            previous_ip: previous.clone(),
            new_ip: ip.clone(),
        });

        TickOutcome::Updated {
            previous,
            current: ip,
        }
    }

    fn stop(&mut self, reason: ExitReason) -> ExitReason {
        let description = match reason.error() {
            Some(e) => e.to_string(),
            None => "Shutdown signal".to_string(),
        };
        self.state = EngineState::Stopped;
        self.emit_event(EngineEvent::Stopped {
            reason: description,
        });
        info!("Engine stopped");
        reason
    }

    /// Emit an engine event
    fn emit_event(&self, event: EngineEvent) {
        // A full channel means nobody is keeping up; drop rather than block the loop
        if self.event_tx.try_send(event).is_err() {
            debug!("Event channel full or closed, dropping event");
        }
    }
}
