use std::time::Duration;

use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

/// Liveness ping timer. Only runs while connected.
///
/// Every [`start`](Self::start) builds a new interval whose first tick is one
/// full period away, so nothing carries over between connections.
#[derive(Debug)]
pub struct Keepalive {
    period: Duration,
    interval: Option<Interval>,
}

impl Keepalive {
    /// A zero period disables pinging.
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            interval: None,
        }
    }

    pub fn start(&mut self) {
        if self.period.is_zero() {
            return;
        }
        let mut interval = interval_at(Instant::now() + self.period, self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.interval = Some(interval);
    }

    pub fn stop(&mut self) {
        self.interval = None;
    }

    pub fn is_running(&self) -> bool {
        self.interval.is_some()
    }

    /// Resolves on the next ping deadline; never resolves while stopped.
    pub async fn tick(&mut self) {
        match self.interval.as_mut() {
            Some(interval) => {
                let _ = interval.tick().await;
            }
            None => std::future::pending().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn first_tick_is_one_period_away() {
        let mut keepalive = Keepalive::new(Duration::from_secs(30));
        keepalive.start();
        let started = Instant::now();
        keepalive.tick().await;
        assert_eq!(started.elapsed(), Duration::from_secs(30));
        keepalive.tick().await;
        assert_eq!(started.elapsed(), Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn stopped_never_ticks() {
        let mut keepalive = Keepalive::new(Duration::from_secs(30));
        keepalive.start();
        keepalive.stop();
        assert!(!keepalive.is_running());
        let fired = tokio::time::timeout(Duration::from_secs(120), keepalive.tick()).await;
        assert!(fired.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn restart_resets_the_schedule() {
        let mut keepalive = Keepalive::new(Duration::from_secs(30));
        keepalive.start();
        tokio::time::sleep(Duration::from_secs(20)).await;
        keepalive.start();
        let restarted = Instant::now();
        keepalive.tick().await;
        assert_eq!(restarted.elapsed(), Duration::from_secs(30));
    }

    #[test]
    fn zero_period_is_disabled() {
        let mut keepalive = Keepalive::new(Duration::ZERO);
        keepalive.start();
        assert!(!keepalive.is_running());
    }
}
