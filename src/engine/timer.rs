use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

/// Shortest period a timer runs at; shorter periods, zero included, are raised to it.
pub const MIN_PERIOD: Duration = Duration::from_millis(1);

/// A repeating timer with explicit `start`/`stop`.
///
/// At most one ticker task exists at a time: `start` stops the previous one
/// first. Every tick carries the generation of the timer that produced it, so
/// a tick that was already queued when the timer stopped can be recognised as
/// stale with [`is_current`](IntervalTimer::is_current).
#[derive(Debug, Default)]
pub struct IntervalTimer {
    handle: Option<JoinHandle<()>>,
    generation: u64,
}

impl IntervalTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fires `on_tick(generation)` every `period`, first after one full period.
    /// The ticker ends when `on_tick` returns `false`.
    pub fn start<F>(&mut self, period: Duration, on_tick: F)
    where
        F: Fn(u64) -> bool + Send + 'static,
    {
        self.stop();
        self.generation += 1;
        let period = period.max(MIN_PERIOD);
        let generation = self.generation;

        self.handle = Some(tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if !on_tick(generation) {
                    break;
                }
            }
        }));
    }

    /// Aborts the ticker task. Takes effect before this call returns: no tick
    /// from this generation is accepted afterwards.
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.is_running() && generation == self.generation
    }
}

impl Drop for IntervalTimer {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU64, Ordering};

    fn counter() -> (Arc<AtomicU64>, impl Fn(u64) -> bool + Send + 'static) {
        let count = Arc::new(AtomicU64::new(0));
        let inner = Arc::clone(&count);
        (count, move |_| {
            inner.fetch_add(1, Ordering::SeqCst);
            true
        })
    }

    #[tokio::test(start_paused = true)]
    async fn first_tick_after_one_period() {
        let (count, on_tick) = counter();
        let mut timer = IntervalTimer::new();
        timer.start(Duration::from_millis(500), on_tick);

        time::sleep(Duration::from_millis(499)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
        time::sleep(Duration::from_millis(2)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        time::sleep(Duration::from_millis(1000)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_halts_ticks() {
        let (count, on_tick) = counter();
        let mut timer = IntervalTimer::new();
        timer.start(Duration::from_millis(100), on_tick);
        time::sleep(Duration::from_millis(250)).await;
        timer.stop();
        assert!(!timer.is_running());

        let seen = count.load(Ordering::SeqCst);
        time::sleep(Duration::from_secs(5)).await;
        assert_eq!(count.load(Ordering::SeqCst), seen);
    }

    #[tokio::test(start_paused = true)]
    async fn restart_replaces_previous_timer() {
        let generations = Arc::new(std::sync::Mutex::new(Vec::new()));
        let mut timer = IntervalTimer::new();

        let seen = Arc::clone(&generations);
        timer.start(Duration::from_millis(100), move |g| {
            seen.lock().unwrap().push(g);
            true
        });
        let first = timer.generation();

        let seen = Arc::clone(&generations);
        timer.start(Duration::from_millis(100), move |g| {
            seen.lock().unwrap().push(g);
            true
        });
        let second = timer.generation();
        assert_ne!(first, second);
        assert!(!timer.is_current(first));
        assert!(timer.is_current(second));

        time::sleep(Duration::from_millis(350)).await;
        let seen = generations.lock().unwrap();
        assert_eq!(seen.len(), 3);
        assert!(seen.iter().all(|g| *g == second));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_period_ticks_at_minimum_period() {
        let (count, on_tick) = counter();
        let mut timer = IntervalTimer::new();
        timer.start(Duration::ZERO, on_tick);

        time::sleep(Duration::from_millis(10)).await;
        assert!(timer.is_running());
        let ticks = count.load(Ordering::SeqCst);
        assert!((5..=10).contains(&ticks), "ticks = {ticks}");
    }

    #[tokio::test(start_paused = true)]
    async fn ticker_ends_when_callback_declines() {
        let count = Arc::new(AtomicU64::new(0));
        let inner = Arc::clone(&count);
        let mut timer = IntervalTimer::new();
        timer.start(Duration::from_millis(100), move |_| {
            inner.fetch_add(1, Ordering::SeqCst) < 1
        });
        time::sleep(Duration::from_secs(1)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }
}
