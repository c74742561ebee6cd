use std::collections::HashMap;
use std::net::IpAddr;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;

use crate::gate::{AdmissionPolicy, ClientRequest};
use crate::models::{DenyReason, RateDecision};

struct Window {
    started_at: DateTime<Utc>,
    admitted: u32,
}

/// The earliest gate revision: at most N admissions per client per
/// window, counters kept in process memory. The whole map sits behind
/// one mutex so concurrent bursts from the same client can't
/// undercount.
pub struct FixedWindowGate {
    max_admissions: u32,
    window: Duration,
    windows: Mutex<HashMap<IpAddr, Window>>,
}

impl FixedWindowGate {
    pub fn new(max_admissions: u32, window_seconds: i64) -> Self {
        Self {
            max_admissions,
            window: Duration::seconds(window_seconds),
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// The window starts at the client's first admission and resets
    /// once W has elapsed since that instant
    pub fn check_at(&self, ip: IpAddr, now: DateTime<Utc>) -> RateDecision {
        let mut windows = self.windows.lock();
        let window = windows.entry(ip).or_insert(Window {
            started_at: now,
            admitted: 0,
        });
        if now - window.started_at >= self.window {
            window.started_at = now;
            window.admitted = 0;
        }
        if window.admitted >= self.max_admissions {
            return RateDecision::deny(DenyReason::RateLimit);
        }
        window.admitted += 1;
        RateDecision::allow()
    }
}

impl AdmissionPolicy for FixedWindowGate {
    fn evaluate(&self, request: &ClientRequest) -> RateDecision {
        self.check_at(request.ip, Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(last: u8) -> IpAddr {
        IpAddr::from([10, 0, 0, last])
    }

    #[test]
    fn denies_the_request_over_the_cap() {
        let gate = FixedWindowGate::new(5, 60);
        let now = Utc::now();
        for _ in 0..5 {
            assert!(gate.check_at(ip(1), now).allowed);
        }
        let sixth = gate.check_at(ip(1), now);
        assert!(!sixth.allowed);
        assert_eq!(sixth.reason, DenyReason::RateLimit);
    }

    #[test]
    fn window_resets_once_it_has_fully_elapsed() {
        let gate = FixedWindowGate::new(2, 60);
        let now = Utc::now();
        assert!(gate.check_at(ip(2), now).allowed);
        assert!(gate.check_at(ip(2), now).allowed);
        assert!(!gate.check_at(ip(2), now + Duration::seconds(59)).allowed);
        // first request after W since the window start goes through
        assert!(gate.check_at(ip(2), now + Duration::seconds(60)).allowed);
    }

    #[test]
    fn counters_are_scoped_per_client() {
        let gate = FixedWindowGate::new(1, 60);
        let now = Utc::now();
        assert!(gate.check_at(ip(3), now).allowed);
        assert!(!gate.check_at(ip(3), now).allowed);
        assert!(gate.check_at(ip(4), now).allowed);
    }
}
