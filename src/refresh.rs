//! Timer-driven refresh signal.
//!
//! Each subscription gets its own thread ticking at the
//! display's refresh rate. Ticks are scheduled against absolute deadlines so
//! the cadence does not drift with callback cost.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crate::monitor::{RefreshCallback, RefreshSignal, SignalSubscription};

pub struct TimerRefreshSignal {
    label: String,
    period: Option<Duration>,
}

impl TimerRefreshSignal {
    pub fn new(label: impl Into<String>, refresh_hz: f32) -> Self {
        // Rates whose period is zero or does not fit a Duration give no signal.
        let period = Duration::try_from_secs_f64(1.0 / f64::from(refresh_hz))
            .ok()
            .filter(|period| !period.is_zero());
        TimerRefreshSignal {
            label: label.into(),
            period,
        }
    }

    pub fn period(&self) -> Option<Duration> {
        self.period
    }
}

impl RefreshSignal for TimerRefreshSignal {
    fn subscribe(&self, mut callback: RefreshCallback) -> Option<SignalSubscription> {
        let period = self.period?;
        let stop = Arc::new(AtomicBool::new(false));
        let running = stop.clone();
        let label = self.label.clone();

        let spawned = thread::Builder::new()
            .name(format!("refresh-{}", self.label))
            .spawn(move || {
                log::debug!("Refresh signal started for {} ({:?})", label, period);
                let mut deadline = Instant::now() + period;

                while !running.load(Ordering::Acquire) {
                    let now = Instant::now();
                    if deadline > now {
                        thread::sleep(deadline - now);
                    }
                    if running.load(Ordering::Acquire) {
                        break;
                    }

                    callback(Instant::now());

                    deadline += period;
                    // Fell more than a frame behind: skip ahead instead of bursting.
                    let now = Instant::now();
                    if deadline + period < now {
                        deadline = now + period;
                    }
                }

                log::debug!("Refresh signal stopped for {}", label);
            });

        match spawned {
            Ok(_) => Some(SignalSubscription::new(move || {
                stop.store(true, Ordering::Release);
            })),
            Err(e) => {
                log::error!("Failed to spawn refresh thread for {}: {}", self.label, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    #[test]
    fn invalid_rate_has_no_signal() {
        for hz in [0.0, -60.0, f32::NAN, f32::INFINITY] {
            let signal = TimerRefreshSignal::new("test", hz);
            assert!(signal.period().is_none());
            assert!(signal.subscribe(Box::new(|_| {})).is_none());
        }
    }

    #[test]
    fn out_of_range_rate_has_no_signal() {
        for hz in [1e-30, f32::MIN_POSITIVE, f32::MAX] {
            let signal = TimerRefreshSignal::new("test", hz);
            assert!(signal.period().is_none(), "rate {} produced a period", hz);
            assert!(signal.subscribe(Box::new(|_| {})).is_none());
        }
        assert_eq!(
            TimerRefreshSignal::new("test", 50.0).period(),
            Some(Duration::from_millis(20))
        );
    }

    #[test]
    fn ticks_until_unsubscribed() {
        let ticks = Arc::new(AtomicU32::new(0));
        let counter = ticks.clone();
        let signal = TimerRefreshSignal::new("test", 200.0);

        let subscription = signal
            .subscribe(Box::new(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            }))
            .unwrap();
        thread::sleep(Duration::from_millis(100));
        subscription.unsubscribe();

        // Allow an in-flight tick to land, then make sure nothing follows.
        thread::sleep(Duration::from_millis(20));
        let after_stop = ticks.load(Ordering::SeqCst);
        assert!(after_stop > 0);
        thread::sleep(Duration::from_millis(50));
        assert_eq!(ticks.load(Ordering::SeqCst), after_stop);
    }
}
