//! Session-scoped dedup state for failure telemetry.
//!
//! The state is an explicit object rather than module-level globals so that its clock,
//! window and memory bound can be chosen (and tested) by whoever owns the gateway.

use lru::LruCache;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Time source for dedup decisions.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    offset: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        }
    }

    pub fn advance(&self, by: Duration) {
        if let Ok(mut offset) = self.offset.lock() {
            *offset += by;
        }
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        let offset = self.offset.lock().map(|o| *o).unwrap_or_default();
        self.origin + offset
    }
}

fn default_dedup_window_ms() -> u64 {
    60_000
}

fn default_session_cap() -> u32 {
    100
}

fn default_max_fingerprints() -> usize {
    1024
}

fn default_aux_text_limit() -> usize {
    256
}

fn default_sink_timeout_ms() -> u64 {
    1_000
}

/// Telemetry limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Identical fingerprints are reported at most once per window
    #[serde(default = "default_dedup_window_ms")]
    pub dedup_window_ms: u64,
    /// Total reports allowed per session; 0 disables reporting
    #[serde(default = "default_session_cap")]
    pub session_cap: u32,
    /// Upper bound on remembered fingerprints; least recently sent are dropped first
    #[serde(default = "default_max_fingerprints")]
    pub max_fingerprints: usize,
    /// Characters of auxiliary text that take part in the fingerprint
    #[serde(default = "default_aux_text_limit")]
    pub aux_text_limit: usize,
    /// How long a failing call waits for its audit report before detaching it
    #[serde(default = "default_sink_timeout_ms")]
    pub sink_timeout_ms: u64,
}

impl TelemetryConfig {
    pub fn dedup_window(&self) -> Duration {
        Duration::from_millis(self.dedup_window_ms)
    }

    pub fn sink_timeout(&self) -> Duration {
        Duration::from_millis(self.sink_timeout_ms)
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            dedup_window_ms: default_dedup_window_ms(),
            session_cap: default_session_cap(),
            max_fingerprints: default_max_fingerprints(),
            aux_text_limit: default_aux_text_limit(),
            sink_timeout_ms: default_sink_timeout_ms(),
        }
    }
}

/// Dedup key derived from (level, message, truncated auxiliary text).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    pub fn compute(level: &str, message: &str, aux: &str, aux_limit: usize) -> Self {
        let aux: String = aux.chars().take(aux_limit).collect();
        let mut hasher = Sha256::new();
        for part in [level, message, aux.as_str()] {
            hasher.update((part.len() as u64).to_le_bytes());
            hasher.update(part.as_bytes());
        }
        Self(hasher.finalize().into())
    }

    /// Short hex form for logs and payloads.
    pub fn short(&self) -> String {
        self.0[..6].iter().map(|b| format!("{:02x}", b)).collect()
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self.short())
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.short())
    }
}

/// Outcome of asking whether a report may be sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Send,
    /// Same fingerprint already sent within the window
    Duplicate,
    /// Session cap exhausted; nothing more is sent until `reset`
    CapReached,
}

struct Inner {
    last_sent: LruCache<Fingerprint, Instant>,
    sent: u32,
}

/// Fingerprint → last-sent map plus the session counter.
pub struct TelemetryState {
    config: TelemetryConfig,
    clock: Arc<dyn Clock>,
    inner: Mutex<Inner>,
}

impl TelemetryState {
    pub fn new(config: TelemetryConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: TelemetryConfig, clock: Arc<dyn Clock>) -> Self {
        let capacity = NonZeroUsize::new(config.max_fingerprints.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            config,
            clock,
            inner: Mutex::new(Inner {
                last_sent: LruCache::new(capacity),
                sent: 0,
            }),
        }
    }

    pub fn config(&self) -> &TelemetryConfig {
        &self.config
    }

    pub fn fingerprint(&self, level: &str, message: &str, aux: &str) -> Fingerprint {
        Fingerprint::compute(level, message, aux, self.config.aux_text_limit)
    }

    /// Decides whether a report with `fingerprint` goes out, and records it if so.
    pub fn admit(&self, fingerprint: Fingerprint) -> Admission {
        let now = self.clock.now();
        let window = self.config.dedup_window();
        let mut inner = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        evict_older_than(&mut inner.last_sent, now, window);

        if inner.last_sent.peek(&fingerprint).is_some() {
            return Admission::Duplicate;
        }
        if inner.sent >= self.config.session_cap {
            return Admission::CapReached;
        }

        inner.sent += 1;
        inner.last_sent.put(fingerprint, now);
        Admission::Send
    }

    /// Drops fingerprints whose window has elapsed. Returns how many were dropped.
    pub fn evict_expired(&self) -> usize {
        let now = self.clock.now();
        let window = self.config.dedup_window();
        match self.inner.lock() {
            Ok(mut inner) => evict_older_than(&mut inner.last_sent, now, window),
            Err(_) => 0,
        }
    }

    /// Starts a new session: forgets every fingerprint and zeroes the counter.
    pub fn reset(&self) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.last_sent.clear();
            inner.sent = 0;
        }
    }

    pub fn sent_count(&self) -> u32 {
        self.inner.lock().map(|i| i.sent).unwrap_or(0)
    }

    pub fn tracked_fingerprints(&self) -> usize {
        self.inner.lock().map(|i| i.last_sent.len()).unwrap_or(0)
    }
}

impl Default for TelemetryState {
    fn default() -> Self {
        Self::new(TelemetryConfig::default())
    }
}

fn evict_older_than(
    map: &mut LruCache<Fingerprint, Instant>,
    now: Instant,
    window: Duration,
) -> usize {
    let expired: Vec<Fingerprint> = map
        .iter()
        .filter(|(_, sent_at)| now.saturating_duration_since(**sent_at) >= window)
        .map(|(fp, _)| *fp)
        .collect();
    for fp in &expired {
        map.pop(fp);
    }
    expired.len()
}
