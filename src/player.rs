//! Drift-compensating playback scheduler.
//!
//! [`Player`] walks a [`ScheduledEvent`] stream and calls back once per event at (approximately)
//! its scheduled wall-clock time. Each sleep targets an absolute time since playback started
//! (`cumulative_us`), not a relative duration since the last event — a callback that runs long,
//! or a sleep that overshoots, shrinks or skips the next sleep instead of compounding into
//! growing lag for the rest of the piece.
//!
//! The clock and sleep primitives are behind small traits so playback can be driven
//! deterministically in tests, and so a caller embedding this in an async runtime can supply its
//! own non-blocking sleep without this crate depending on one.

use crate::error::Result;
use crate::tempo::ScheduledEvent;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A source of elapsed microseconds since playback started.
pub trait Clock {
    fn now_us(&self) -> u64;
}

/// The real clock, backed by [`std::time::Instant`].
pub struct SystemClock(Instant);

impl SystemClock {
    pub fn new() -> Self {
        SystemClock(Instant::now())
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_us(&self) -> u64 {
        self.0.elapsed().as_micros() as u64
    }
}

/// A way to wait for a given number of microseconds.
pub trait Sleeper {
    fn sleep_us(&mut self, us: u64);
}

/// The real sleeper, backed by [`std::thread::sleep`].
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep_us(&mut self, us: u64) {
        std::thread::sleep(Duration::from_micros(us));
    }
}

/// A non-blocking counterpart to [`Sleeper`]: suspends the calling future rather than the calling
/// thread, so a caller hosting playback on a single-threaded async executor doesn't block it for
/// the duration of the sleep. Implementations typically wrap a runtime's own timer future (e.g.
/// `tokio::time::sleep`); this crate depends on no particular runtime, so the caller supplies one.
pub trait AsyncSleeper {
    fn sleep_us(&mut self, us: u64) -> Pin<Box<dyn Future<Output = ()> + Send + '_>>;
}

/// A cloneable handle that can cancel a [`Player`]'s playback from another thread.
///
/// Cancellation drops any remaining events and stops the loop between events; it does not send
/// any MIDI "all notes off" or restore channel state, since the player has no model of what
/// state a receiving device is in.
#[derive(Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Drives a [`ScheduledEvent`] iterator in real time.
pub struct Player<I> {
    events: I,
    cancel: CancelHandle,
}

impl<I> Player<I> {
    pub(crate) fn new(events: I) -> Self {
        Player {
            events,
            cancel: CancelHandle::default(),
        }
    }

    /// A handle that can cancel this player's playback from another thread.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }
}

impl<I: Iterator<Item = Result<ScheduledEvent>>> Player<I> {
    /// Plays back with the real clock and `std::thread::sleep`, calling `on_event` as each
    /// event's scheduled time arrives.
    pub fn play<F: FnMut(&ScheduledEvent)>(self, on_event: F) -> Result<()> {
        self.play_with(&SystemClock::new(), &mut ThreadSleeper, on_event)
    }

    /// Plays back with caller-supplied clock and sleep primitives (for tests, or to host
    /// playback inside another event loop).
    pub fn play_with<C: Clock, S: Sleeper, F: FnMut(&ScheduledEvent)>(
        mut self,
        clock: &C,
        sleeper: &mut S,
        mut on_event: F,
    ) -> Result<()> {
        while !self.cancel.is_cancelled() {
            let scheduled = match self.events.next() {
                Some(item) => item?,
                None => break,
            };
            let target_us = scheduled.cumulative_us();
            let now_us = clock.now_us();
            if target_us > now_us {
                sleeper.sleep_us(target_us - now_us);
            }
            if self.cancel.is_cancelled() {
                break;
            }
            on_event(&scheduled);
        }
        Ok(())
    }

    /// Plays back cooperatively: suspends via an injectable async sleep instead of blocking the
    /// current thread, applying the same drift-compensation rule as [`Player::play_with`]. The
    /// caller's executor drives this future; nothing here spawns a task of its own.
    pub async fn play_async<C: Clock, S: AsyncSleeper, F: FnMut(&ScheduledEvent)>(
        mut self,
        clock: &C,
        sleeper: &mut S,
        mut on_event: F,
    ) -> Result<()> {
        while !self.cancel.is_cancelled() {
            let scheduled = match self.events.next() {
                Some(item) => item?,
                None => break,
            };
            let target_us = scheduled.cumulative_us();
            let now_us = clock.now_us();
            if target_us > now_us {
                sleeper.sleep_us(target_us - now_us).await;
            }
            if self.cancel.is_cancelled() {
                break;
            }
            on_event(&scheduled);
        }
        Ok(())
    }
}
