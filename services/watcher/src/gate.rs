//! Cooldown rate limiting.
//!
//! The gate is the watcher's only backpressure mechanism: a single slot
//! that admits one dispatch per cooldown interval. Event bursts queue in
//! the journal's own buffer and drain at the gated rate, trading repair
//! latency for bounded load on the store.

use tokio::time::{sleep_until, Duration, Instant};

/// Single-slot rate limiter: at most one admission per cooldown.
#[derive(Debug)]
pub struct RateGate {
    cooldown: Duration,
    last_admit: Option<Instant>,
}

impl RateGate {
    /// Create a gate with the given cooldown between admissions.
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last_admit: None,
        }
    }

    /// Wait until a dispatch may proceed, then claim the slot.
    ///
    /// The first admission is immediate; each subsequent one waits out
    /// the remainder of the cooldown since the previous admission.
    pub async fn admit(&mut self) {
        if let Some(last) = self.last_admit {
            let ready_at = last + self.cooldown;
            if ready_at > Instant::now() {
                sleep_until(ready_at).await;
            }
        }
        self.last_admit = Some(Instant::now());
    }
}
