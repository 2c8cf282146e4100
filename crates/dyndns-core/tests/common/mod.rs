//! Test doubles and common utilities for contract tests
//!
//! These doubles count every call so tests can assert exactly which
//! collaborators a tick touched. Cloning a double shares its counters, so a
//! test keeps one handle and boxes the other into the engine.

#![allow(dead_code)]

use dyndns_core::config::{DdnsConfig, EngineConfig, IpLookupConfig, ProviderConfig, WriteFailurePolicy};
use dyndns_core::engine::{EngineEvent, ExitReason};
use dyndns_core::error::{Error, Result};
use dyndns_core::traits::{DnsProvider, DnsRecord, IpSource};
use dyndns_core::ReconcileEngine;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

pub const TARGET: &str = "home.example.com";
pub const RECORD_ID: u64 = 372_118_594;

/// One scripted answer from the IP source
#[derive(Debug, Clone)]
pub enum IpStep {
    Ip(&'static str),
    Fail,
}

/// An IpSource that replays a script; the last step repeats forever
#[derive(Clone)]
pub struct ScriptedIpSource {
    script: Arc<Mutex<VecDeque<IpStep>>>,
    last: Arc<Mutex<IpStep>>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedIpSource {
    pub fn new(steps: Vec<IpStep>) -> Self {
        let last = steps.last().cloned().unwrap_or(IpStep::Fail);
        Self {
            script: Arc::new(Mutex::new(steps.into())),
            last: Arc::new(Mutex::new(last)),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Always answer with `ip`
    pub fn fixed(ip: &'static str) -> Self {
        Self::new(vec![IpStep::Ip(ip)])
    }

    /// Number of times current() was called
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl IpSource for ScriptedIpSource {
    async fn current(&self) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let step = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.last.lock().unwrap().clone());

        match step {
            IpStep::Ip(ip) => Ok(ip.to_string()),
            IpStep::Fail => Err(Error::transport("connection reset by peer")),
        }
    }

    fn source_name(&self) -> &'static str {
        "scripted"
    }
}

/// How the mock answers the startup read
#[derive(Debug, Clone)]
pub enum ReadBehavior {
    Found(&'static str),
    BadStatus(u16),
    Missing,
}

/// A DnsProvider that records reads and writes
#[derive(Clone)]
pub struct MockDnsProvider {
    read: ReadBehavior,
    /// Scripted write results (`true` = success); empty means success
    write_results: Arc<Mutex<VecDeque<bool>>>,
    read_calls: Arc<AtomicUsize>,
    writes: Arc<Mutex<Vec<(String, u64)>>>,
}

impl MockDnsProvider {
    /// Provider whose record currently publishes `ip`
    pub fn publishing(ip: &'static str) -> Self {
        Self::with_read(ReadBehavior::Found(ip))
    }

    pub fn with_read(read: ReadBehavior) -> Self {
        Self {
            read,
            write_results: Arc::new(Mutex::new(VecDeque::new())),
            read_calls: Arc::new(AtomicUsize::new(0)),
            writes: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Script the outcome of upcoming writes
    pub fn failing_writes(self, results: Vec<bool>) -> Self {
        *self.write_results.lock().unwrap() = results.into();
        self
    }

    /// Number of times get_record() was called
    pub fn read_count(&self) -> usize {
        self.read_calls.load(Ordering::SeqCst)
    }

    /// Every set_record() call, successful or not
    pub fn writes(&self) -> Vec<(String, u64)> {
        self.writes.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl DnsProvider for MockDnsProvider {
    async fn get_record(&self) -> Result<DnsRecord> {
        self.read_calls.fetch_add(1, Ordering::SeqCst);
        match &self.read {
            ReadBehavior::Found(ip) => Ok(DnsRecord {
                id: RECORD_ID,
                name: TARGET.to_string(),
                record_type: "A".to_string(),
                content: ip.to_string(),
            }),
            ReadBehavior::BadStatus(status) => {
                Err(Error::bad_status(*status, "rec_load_all failed"))
            }
            ReadBehavior::Missing => Err(Error::not_found(TARGET)),
        }
    }

    async fn set_record(&self, new_ip: &str, record_id: u64) -> Result<()> {
        self.writes
            .lock()
            .unwrap()
            .push((new_ip.to_string(), record_id));

        let ok = self.write_results.lock().unwrap().pop_front().unwrap_or(true);
        if ok {
            Ok(())
        } else {
            Err(Error::bad_status(500, "rec_edit failed"))
        }
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

/// Helper to create a minimal DdnsConfig for testing
pub fn minimal_config(policy: WriteFailurePolicy) -> DdnsConfig {
    DdnsConfig {
        ip_lookup: IpLookupConfig::http("https://ip.example.test"),
        provider: ProviderConfig::cloudflare("admin@example.com", "test-token", "example.com", TARGET),
        engine: EngineConfig {
            interval_secs: 5,
            write_failure_policy: policy,
            event_channel_capacity: 100,
        },
    }
}

/// A running engine and the handles a test needs to drive it
pub struct RunningEngine {
    pub shutdown: oneshot::Sender<()>,
    pub handle: JoinHandle<(ReconcileEngine, ExitReason)>,
    pub events: mpsc::Receiver<EngineEvent>,
}

/// Spawn an engine running until the returned shutdown sender fires
pub fn spawn_engine(
    ip_source: ScriptedIpSource,
    provider: MockDnsProvider,
    config: DdnsConfig,
) -> RunningEngine {
    let (mut engine, events) = ReconcileEngine::new(Box::new(ip_source), Box::new(provider), &config)
        .expect("engine construction succeeds");

    let (shutdown, shutdown_rx) = oneshot::channel::<()>();

    let handle = tokio::spawn(async move {
        let reason = engine
            .run_until(async {
                let _ = shutdown_rx.await;
            })
            .await;
        (engine, reason)
    });

    RunningEngine {
        shutdown,
        handle,
        events,
    }
}

/// Sleep for `secs` seconds of (usually paused) tokio time
pub async fn advance_secs(secs: u64) {
    tokio::time::sleep(Duration::from_secs(secs)).await;
}

/// Drain every event currently buffered
pub fn drain_events(events: &mut mpsc::Receiver<EngineEvent>) -> Vec<EngineEvent> {
    let mut out = Vec::new();
    while let Ok(event) = events.try_recv() {
        out.push(event);
    }
    out
}
