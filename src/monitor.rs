//! Render-rate measurement.
//!
//! A monitor subscribes to a display's refresh signal and, on every tick,
//! asks the watched output whether a new frame is due for that instant.
//! Frames actually consumed are counted over one-second windows and the
//! resulting rate is published into a [`RateSlot`] the UI reads on its own
//! schedule. The monitor never touches orchestrator state.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Per-output frame availability query. Called from the refresh thread.
pub trait FrameProbe: Send + 'static {
    /// Whether a frame not yet consumed is ready for display at `at`.
    fn has_new_frame(&mut self, at: Instant) -> bool;

    /// Acknowledge the frame reported by `has_new_frame`.
    fn consume_frame(&mut self, at: Instant);
}

pub type RefreshCallback = Box<dyn FnMut(Instant) + Send + 'static>;

/// Hardware refresh signal of one display.
pub trait RefreshSignal {
    /// Register `callback` to run on every refresh. `None` means no signal is
    /// available for this display.
    fn subscribe(&self, callback: RefreshCallback) -> Option<SignalSubscription>;
}

/// Live registration on a refresh signal. Dropping it unsubscribes.
pub struct SignalSubscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl SignalSubscription {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        SignalSubscription {
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn unsubscribe(mut self) {
        self.cancel_now();
    }

    fn cancel_now(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for SignalSubscription {
    fn drop(&mut self) {
        self.cancel_now();
    }
}

/// Last published rate. Single writer (refresh thread), any number of readers.
#[derive(Clone, Debug)]
pub struct RateSlot(Arc<AtomicU64>);

impl RateSlot {
    pub fn indeterminate() -> Self {
        RateSlot(Arc::new(AtomicU64::new(f64::NAN.to_bits())))
    }

    pub fn publish(&self, rate: f64) {
        self.0.store(rate.to_bits(), Ordering::Release);
    }

    /// `None` until the first full window has been measured.
    pub fn get(&self) -> Option<f64> {
        let rate = f64::from_bits(self.0.load(Ordering::Acquire));
        if rate.is_finite() { Some(rate) } else { None }
    }
}

/// Counts consumed frames over fixed measurement windows.
#[derive(Debug)]
pub struct RateCounter {
    window: Duration,
    window_start: Instant,
    counted: u32,
}

impl RateCounter {
    pub const WINDOW: Duration = Duration::from_secs(1);

    pub fn starting_at(now: Instant) -> Self {
        RateCounter {
            window: Self::WINDOW,
            window_start: now,
            counted: 0,
        }
    }

    /// Feed one refresh tick. Returns the measured rate when a window closes.
    pub fn tick(&mut self, now: Instant, new_frame: bool) -> Option<f64> {
        if new_frame {
            self.counted += 1;
        }

        let elapsed = now.saturating_duration_since(self.window_start);
        if elapsed < self.window {
            return None;
        }

        let rate = f64::from(self.counted) / elapsed.as_secs_f64();
        self.counted = 0;
        self.window_start = now;
        Some(rate)
    }
}

/// Measures the rendered frame rate of one output surface.
pub struct RenderRateMonitor {
    label: String,
    slot: RateSlot,
    subscription: Option<SignalSubscription>,
}

impl RenderRateMonitor {
    pub fn attach(
        label: impl Into<String>,
        mut probe: Box<dyn FrameProbe>,
        signal: Option<&dyn RefreshSignal>,
    ) -> Self {
        let label = label.into();
        let slot = RateSlot::indeterminate();

        let writer = slot.clone();
        let mut counter = RateCounter::starting_at(Instant::now());
        let callback: RefreshCallback = Box::new(move |now| {
            let fresh = probe.has_new_frame(now);
            if fresh {
                probe.consume_frame(now);
            }
            if let Some(rate) = counter.tick(now, fresh) {
                writer.publish(rate);
            }
        });

        let subscription = signal.and_then(|signal| signal.subscribe(callback));
        match subscription {
            Some(_) => log::debug!("Render-rate monitor attached: {}", label),
            None => log::warn!("No refresh signal for {}, rate stays indeterminate", label),
        }

        RenderRateMonitor {
            label,
            slot,
            subscription,
        }
    }

    pub fn rate(&self) -> Option<f64> {
        self.slot.get()
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription.is_some()
    }
}

impl Drop for RenderRateMonitor {
    fn drop(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
            log::debug!("Render-rate monitor detached: {}", self.label);
        }
    }
}
