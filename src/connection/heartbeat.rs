//! Heartbeat accounting for an established connection.
//!
//! The transport may not surface a close event for a half-open socket, so
//! the run loop probes the peer and counts unanswered pings. Any inbound
//! traffic proves the peer is alive and clears the count.

use std::time::{Duration, Instant};

/// Tracks outstanding heartbeat probes for one link.
#[derive(Debug)]
pub struct HeartbeatMonitor {
    /// Probes sent since the last sign of life.
    outstanding: u32,

    /// Last inbound traffic of any kind.
    last_activity: Instant,
}

impl HeartbeatMonitor {
    pub fn new() -> Self {
        Self {
            outstanding: 0,
            last_activity: Instant::now(),
        }
    }

    /// Record an outgoing probe.
    pub fn record_ping(&mut self) {
        self.outstanding += 1;
    }

    /// Record inbound traffic of any kind.
    pub fn record_activity(&mut self) {
        self.outstanding = 0;
        self.last_activity = Instant::now();
    }

    /// Probes currently unanswered.
    pub fn missed(&self) -> u32 {
        self.outstanding
    }

    /// True once the unanswered-probe count reaches the threshold.
    pub fn is_dead(&self, max_missed: u32) -> bool {
        self.outstanding >= max_missed
    }

    /// Time since the last inbound traffic.
    pub fn idle_for(&self) -> Duration {
        self.last_activity.elapsed()
    }
}

impl Default for HeartbeatMonitor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_monitor_is_alive() {
        let monitor = HeartbeatMonitor::new();
        assert_eq!(monitor.missed(), 0);
        assert!(!monitor.is_dead(1));
    }

    #[test]
    fn unanswered_pings_accumulate_to_dead() {
        let mut monitor = HeartbeatMonitor::new();
        monitor.record_ping();
        monitor.record_ping();
        assert!(!monitor.is_dead(3));
        monitor.record_ping();
        assert!(monitor.is_dead(3));
    }

    #[test]
    fn any_activity_clears_outstanding_probes() {
        let mut monitor = HeartbeatMonitor::new();
        monitor.record_ping();
        monitor.record_ping();
        monitor.record_activity();
        assert_eq!(monitor.missed(), 0);
        assert!(!monitor.is_dead(1));
    }

    #[test]
    fn idle_time_resets_on_activity() {
        let mut monitor = HeartbeatMonitor::new();
        std::thread::sleep(Duration::from_millis(15));
        assert!(monitor.idle_for() >= Duration::from_millis(10));
        monitor.record_activity();
        assert!(monitor.idle_for() < Duration::from_millis(10));
    }
}
