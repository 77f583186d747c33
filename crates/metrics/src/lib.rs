use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Thread-safe metrics collector for the trading loop.
#[derive(Debug)]
pub struct TraderMetrics {
    // Counters
    cycles_completed: AtomicU64,
    cycles_skipped: AtomicU64,
    orders_submitted: AtomicU64,
    orders_accepted: AtomicU64,
    orders_rejected: AtomicU64,
    order_transport_failures: AtomicU64,
    request_timeouts: AtomicU64,
    reconnect_attempts: AtomicU64,
    reconnect_successes: AtomicU64,

    /// Expected gap between cycles; health is judged against it.
    poll_interval: Duration,

    // Timestamps
    inner: RwLock<MetricsInner>,
}

#[derive(Debug)]
struct MetricsInner {
    start_time: Instant,
    last_cycle_time: Option<Instant>,
    last_order_time: Option<Instant>,
    last_error_time: Option<Instant>,
}

impl TraderMetrics {
    pub fn new(poll_interval: Duration) -> Self {
        Self {
            cycles_completed: AtomicU64::new(0),
            cycles_skipped: AtomicU64::new(0),
            orders_submitted: AtomicU64::new(0),
            orders_accepted: AtomicU64::new(0),
            orders_rejected: AtomicU64::new(0),
            order_transport_failures: AtomicU64::new(0),
            request_timeouts: AtomicU64::new(0),
            reconnect_attempts: AtomicU64::new(0),
            reconnect_successes: AtomicU64::new(0),
            poll_interval,
            inner: RwLock::new(MetricsInner {
                start_time: Instant::now(),
                last_cycle_time: None,
                last_order_time: None,
                last_error_time: None,
            }),
        }
    }

    // --- Increment methods ---

    pub fn inc_cycles_completed(&self) {
        self.cycles_completed.fetch_add(1, Ordering::Relaxed);
        self.inner.write().last_cycle_time = Some(Instant::now());
    }

    pub fn inc_cycles_skipped(&self) {
        self.cycles_skipped.fetch_add(1, Ordering::Relaxed);
        self.inner.write().last_error_time = Some(Instant::now());
    }

    pub fn inc_orders_submitted(&self) {
        self.orders_submitted.fetch_add(1, Ordering::Relaxed);
        self.inner.write().last_order_time = Some(Instant::now());
    }

    pub fn inc_orders_accepted(&self) {
        self.orders_accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_orders_rejected(&self) {
        self.orders_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_order_transport_failures(&self) {
        self.order_transport_failures.fetch_add(1, Ordering::Relaxed);
        self.inner.write().last_error_time = Some(Instant::now());
    }

    pub fn inc_request_timeouts(&self) {
        self.request_timeouts.fetch_add(1, Ordering::Relaxed);
        self.inner.write().last_error_time = Some(Instant::now());
    }

    pub fn inc_reconnect_attempts(&self) {
        self.reconnect_attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_reconnect_successes(&self) {
        self.reconnect_successes.fetch_add(1, Ordering::Relaxed);
    }

    // --- Getter methods ---

    pub fn cycles_completed(&self) -> u64 {
        self.cycles_completed.load(Ordering::Relaxed)
    }

    pub fn cycles_skipped(&self) -> u64 {
        self.cycles_skipped.load(Ordering::Relaxed)
    }

    pub fn orders_submitted(&self) -> u64 {
        self.orders_submitted.load(Ordering::Relaxed)
    }

    pub fn orders_accepted(&self) -> u64 {
        self.orders_accepted.load(Ordering::Relaxed)
    }

    pub fn orders_rejected(&self) -> u64 {
        self.orders_rejected.load(Ordering::Relaxed)
    }

    pub fn order_transport_failures(&self) -> u64 {
        self.order_transport_failures.load(Ordering::Relaxed)
    }

    pub fn request_timeouts(&self) -> u64 {
        self.request_timeouts.load(Ordering::Relaxed)
    }

    pub fn reconnect_attempts(&self) -> u64 {
        self.reconnect_attempts.load(Ordering::Relaxed)
    }

    pub fn reconnect_successes(&self) -> u64 {
        self.reconnect_successes.load(Ordering::Relaxed)
    }

    pub fn uptime_secs(&self) -> f64 {
        self.inner.read().start_time.elapsed().as_secs_f64()
    }

    pub fn secs_since_last_cycle(&self) -> Option<f64> {
        self.inner
            .read()
            .last_cycle_time
            .map(|t| t.elapsed().as_secs_f64())
    }

    pub fn secs_since_last_order(&self) -> Option<f64> {
        self.inner
            .read()
            .last_order_time
            .map(|t| t.elapsed().as_secs_f64())
    }

    pub fn secs_since_last_error(&self) -> Option<f64> {
        self.inner
            .read()
            .last_error_time
            .map(|t| t.elapsed().as_secs_f64())
    }

    /// Generate a snapshot of all metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            cycles_completed: self.cycles_completed(),
            cycles_skipped: self.cycles_skipped(),
            orders_submitted: self.orders_submitted(),
            orders_accepted: self.orders_accepted(),
            orders_rejected: self.orders_rejected(),
            order_transport_failures: self.order_transport_failures(),
            request_timeouts: self.request_timeouts(),
            reconnect_attempts: self.reconnect_attempts(),
            reconnect_successes: self.reconnect_successes(),
            poll_interval_secs: self.poll_interval.as_secs_f64(),
            uptime_secs: self.uptime_secs(),
            secs_since_last_cycle: self.secs_since_last_cycle(),
            secs_since_last_order: self.secs_since_last_order(),
            secs_since_last_error: self.secs_since_last_error(),
        }
    }
}

/// A point-in-time snapshot of metrics.
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub cycles_completed: u64,
    pub cycles_skipped: u64,
    pub orders_submitted: u64,
    pub orders_accepted: u64,
    pub orders_rejected: u64,
    pub order_transport_failures: u64,
    pub request_timeouts: u64,
    pub reconnect_attempts: u64,
    pub reconnect_successes: u64,
    pub poll_interval_secs: f64,
    pub uptime_secs: f64,
    pub secs_since_last_cycle: Option<f64>,
    pub secs_since_last_order: Option<f64>,
    pub secs_since_last_error: Option<f64>,
}

/// Health status of the trading loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    /// Cycles are completing on schedule.
    Healthy,
    /// Cycles are late (skipped cycles, reconnecting).
    Degraded,
    /// No cycle has completed for an extended period.
    Unhealthy,
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "HEALTHY"),
            HealthStatus::Degraded => write!(f, "DEGRADED"),
            HealthStatus::Unhealthy => write!(f, "UNHEALTHY"),
        }
    }
}

impl MetricsSnapshot {
    /// Poll intervals without a completed cycle before health degrades.
    const STALE_INTERVALS: f64 = 2.0;
    /// Poll intervals without a completed cycle before the loop is unhealthy.
    const UNHEALTHY_INTERVALS: f64 = 4.0;

    /// Determine the health status based on metrics.
    ///
    /// Before the first completed cycle, uptime stands in for the age of the
    /// last cycle.
    pub fn health_status(&self) -> HealthStatus {
        let since_cycle = self.secs_since_last_cycle.unwrap_or(self.uptime_secs);
        let interval = self.poll_interval_secs;

        if since_cycle > interval * Self::UNHEALTHY_INTERVALS {
            HealthStatus::Unhealthy
        } else if since_cycle > interval * Self::STALE_INTERVALS {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        }
    }
}

impl std::fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Trader Metrics ===")?;
        writeln!(f, "Uptime:              {:.1}s", self.uptime_secs)?;
        writeln!(f, "Cycles completed:    {}", self.cycles_completed)?;
        writeln!(f, "Cycles skipped:      {}", self.cycles_skipped)?;
        writeln!(f, "Orders submitted:    {}", self.orders_submitted)?;
        writeln!(f, "Orders accepted:     {}", self.orders_accepted)?;
        writeln!(f, "Orders rejected:     {}", self.orders_rejected)?;
        writeln!(f, "Orders unknown:      {}", self.order_transport_failures)?;
        writeln!(f, "Request timeouts:    {}", self.request_timeouts)?;
        writeln!(f, "Reconnect attempts:  {}", self.reconnect_attempts)?;
        writeln!(f, "Reconnect successes: {}", self.reconnect_successes)?;
        if let Some(secs) = self.secs_since_last_cycle {
            writeln!(f, "Since last cycle:    {:.1}s", secs)?;
        }
        if let Some(secs) = self.secs_since_last_order {
            writeln!(f, "Since last order:    {:.1}s", secs)?;
        }
        if let Some(secs) = self.secs_since_last_error {
            writeln!(f, "Since last error:    {:.1}s", secs)?;
        }
        Ok(())
    }
}

/// Shared handle to metrics.
pub type SharedMetrics = Arc<TraderMetrics>;

pub fn create_metrics(poll_interval: Duration) -> SharedMetrics {
    Arc::new(TraderMetrics::new(poll_interval))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(uptime_secs: f64, secs_since_last_cycle: Option<f64>) -> MetricsSnapshot {
        MetricsSnapshot {
            cycles_completed: if secs_since_last_cycle.is_some() { 3 } else { 0 },
            cycles_skipped: 0,
            orders_submitted: 0,
            orders_accepted: 0,
            orders_rejected: 0,
            order_transport_failures: 0,
            request_timeouts: 0,
            reconnect_attempts: 0,
            reconnect_successes: 0,
            poll_interval_secs: 60.0,
            uptime_secs,
            secs_since_last_cycle,
            secs_since_last_order: None,
            secs_since_last_error: None,
        }
    }

    #[test]
    fn test_metrics_increment() {
        let metrics = TraderMetrics::new(Duration::from_secs(60));

        metrics.inc_cycles_completed();
        metrics.inc_cycles_completed();
        metrics.inc_cycles_skipped();
        metrics.inc_orders_submitted();
        metrics.inc_orders_accepted();

        assert_eq!(metrics.cycles_completed(), 2);
        assert_eq!(metrics.cycles_skipped(), 1);
        assert_eq!(metrics.orders_submitted(), 1);
        assert_eq!(metrics.orders_accepted(), 1);
        assert_eq!(metrics.orders_rejected(), 0);
    }

    #[test]
    fn test_metrics_snapshot() {
        let metrics = create_metrics(Duration::from_secs(5));

        metrics.inc_request_timeouts();
        metrics.inc_reconnect_attempts();
        metrics.inc_reconnect_successes();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.request_timeouts, 1);
        assert_eq!(snapshot.reconnect_attempts, 1);
        assert_eq!(snapshot.reconnect_successes, 1);
        assert_eq!(snapshot.poll_interval_secs, 5.0);
        assert!(snapshot.secs_since_last_error.is_some());
        assert!(snapshot.secs_since_last_cycle.is_none());
    }

    #[test]
    fn test_last_order_time() {
        let metrics = TraderMetrics::new(Duration::from_secs(60));
        assert!(metrics.secs_since_last_order().is_none());

        metrics.inc_orders_submitted();

        let secs = metrics.secs_since_last_order();
        assert!(secs.is_some());
        assert!(secs.unwrap() < 1.0);
    }

    #[test]
    fn test_snapshot_display() {
        let metrics = TraderMetrics::new(Duration::from_secs(60));
        metrics.inc_cycles_completed();
        let text = metrics.snapshot().to_string();
        assert!(text.contains("Cycles completed:    1"));
        assert!(text.contains("Since last cycle:"));
    }

    // HealthStatus boundary tests

    #[test]
    fn test_health_status_healthy_recent_cycle() {
        assert_eq!(snapshot(600.0, Some(30.0)).health_status(), HealthStatus::Healthy);
    }

    #[test]
    fn test_health_status_healthy_during_startup() {
        assert_eq!(snapshot(10.0, None).health_status(), HealthStatus::Healthy);
    }

    #[test]
    fn test_health_status_degraded_late_cycle() {
        // Between two and four intervals
        assert_eq!(snapshot(600.0, Some(180.0)).health_status(), HealthStatus::Degraded);
    }

    #[test]
    fn test_health_status_unhealthy_no_cycles_long_uptime() {
        assert_eq!(snapshot(300.0, None).health_status(), HealthStatus::Unhealthy);
    }

    #[test]
    fn test_health_status_boundaries() {
        // Exactly at a threshold stays on the better side
        assert_eq!(snapshot(600.0, Some(120.0)).health_status(), HealthStatus::Healthy);
        assert_eq!(snapshot(600.0, Some(240.0)).health_status(), HealthStatus::Degraded);
    }
}
