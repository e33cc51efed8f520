use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Hold supervisor tuning.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SupervisorCfg {
    /// Durable wake-up interval. Finer wastes wake-ups; coarser overshoots
    /// the hold by up to one interval.
    pub poll_interval_secs: u64,
    /// How long a completion claim blocks other wake-ups. A claim older than
    /// this belongs to a crashed process and may be taken over, so it must
    /// exceed the host's worst-case recheck latency: a recheck still running
    /// past the lease can be issued a second time.
    pub claim_lease_secs: u64,
    /// `None` retries the recheck forever. `Some(n)` marks the hold `error`
    /// after `n` failed attempts.
    pub max_recheck_attempts: Option<u32>,
}

impl Default for SupervisorCfg {
    fn default() -> Self {
        Self {
            poll_interval_secs: 60,
            claim_lease_secs: 120,
            max_recheck_attempts: None,
        }
    }
}

impl SupervisorCfg {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    pub fn claim_lease(&self) -> chrono::Duration {
        let secs = i64::try_from(self.claim_lease_secs)
            .unwrap_or(i64::MAX)
            .min(i64::MAX / 1000);
        chrono::Duration::seconds(secs)
    }

    /// Parse from JSON; blank input yields the defaults.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(text)
    }
}
