use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle of a hold: `pending -> active -> {complete | error}`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HoldStatus {
    Pending,
    Active,
    Complete,
    Error,
}

impl HoldStatus {
    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(self, HoldStatus::Complete | HoldStatus::Error)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            HoldStatus::Pending => "pending",
            HoldStatus::Active => "active",
            HoldStatus::Complete => "complete",
            HoldStatus::Error => "error",
        }
    }
}

/// Durable record of one in-flight hold, keyed by session id.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldRecord {
    pub session_id: String,
    pub start_time: DateTime<Utc>,
    /// Target duration in seconds.
    #[serde(rename = "duration")]
    pub duration_secs: u64,
    pub status: HoldStatus,

    /// Failed recheck attempts so far.
    #[serde(default)]
    pub attempts: u32,
    /// Set while a wake-up owns the completion sequence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claimed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl HoldRecord {
    pub fn new(session_id: impl Into<String>, start_time: DateTime<Utc>, duration_secs: u64) -> Self {
        Self {
            session_id: session_id.into(),
            start_time,
            duration_secs,
            status: HoldStatus::Pending,
            attempts: 0,
            claimed_at: None,
            last_error: None,
            completed_at: None,
        }
    }

    /// Milliseconds since `start_time`. A start time in the future counts as zero.
    pub fn elapsed_ms(&self, now: DateTime<Utc>) -> i64 {
        (now - self.start_time).num_milliseconds().max(0)
    }

    pub fn duration_ms(&self) -> i64 {
        i64::try_from(self.duration_secs)
            .unwrap_or(i64::MAX)
            .saturating_mul(1000)
    }

    #[inline]
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.elapsed_ms(now) >= self.duration_ms()
    }

    pub fn remaining_ms(&self, now: DateTime<Utc>) -> i64 {
        (self.duration_ms() - self.elapsed_ms(now)).max(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn due_at_exact_duration() {
        let start = Utc::now();
        let rec = HoldRecord::new("s", start, 120);
        assert!(!rec.is_due(start + Duration::milliseconds(119_999)));
        assert!(rec.is_due(start + Duration::milliseconds(120_000)));
        assert_eq!(rec.remaining_ms(start + Duration::seconds(100)), 20_000);
    }

    #[test]
    fn future_start_is_not_due() {
        let now = Utc::now();
        let rec = HoldRecord::new("s", now + Duration::seconds(30), 1);
        assert_eq!(rec.elapsed_ms(now), 0);
        assert!(!rec.is_due(now));
    }

    #[test]
    fn wire_field_names() {
        let rec = HoldRecord::new("sess-1", Utc::now(), 120);
        let v = serde_json::to_value(&rec).unwrap();
        assert_eq!(v["sessionId"], "sess-1");
        assert_eq!(v["duration"], 120);
        assert_eq!(v["status"], "pending");
        assert!(v.get("claimedAt").is_none());
    }
}
