//! Converts a merged tick-stream into wall-clock microseconds.
//!
//! MIDI files express time in ticks against a tempo that can itself change mid-file (`SET_TEMPO`
//! meta events); the number of microseconds a given tick span represents depends on whichever
//! tempo was most recently in effect. `TempoMapper` keeps that one piece of state and folds it
//! into a running microsecond total as events pass through. A tempo change affects only the
//! events *after* it — the delta that carries an event up to the tempo change itself is still
//! measured against the old tempo.

use crate::error::LibResult;
use crate::merger::{Merger, TimedEvent};
use crate::raw_event::EventKind;
use log::debug;
use std::io::{Read, Seek};

/// Microseconds per quarter note corresponding to 120 BPM, the default tempo for a file with no
/// `SET_TEMPO` event before its first tick.
pub(crate) const DEFAULT_TEMPO_USPQN: u32 = 500_000;

/// A [`TimedEvent`] with its tick delta converted to microseconds, plus the running total since
/// the start of playback.
#[derive(Clone, Debug)]
pub struct ScheduledEvent {
    pub(crate) timed: TimedEvent,
    delta_us: u64,
    cumulative_us: u64,
}

impl ScheduledEvent {
    pub fn event(&self) -> &crate::raw_event::RawEvent {
        self.timed.event()
    }

    pub fn track_index(&self) -> usize {
        self.timed.track_index()
    }

    /// Microseconds elapsed since the previous scheduled event.
    pub fn delta_us(&self) -> u64 {
        self.delta_us
    }

    /// Microseconds elapsed since the start of playback.
    pub fn cumulative_us(&self) -> u64 {
        self.cumulative_us
    }

    #[cfg(test)]
    pub(crate) fn for_test(timed: TimedEvent, delta_us: u64, cumulative_us: u64) -> Self {
        ScheduledEvent {
            timed,
            delta_us,
            cumulative_us,
        }
    }
}

pub(crate) struct TempoMapper<R> {
    inner: Merger<R>,
    ppq: u16,
    tempo_uspqn: u32,
    cumulative_us: u64,
}

impl<R: Read + Seek> TempoMapper<R> {
    pub(crate) fn new(inner: Merger<R>, ppq: u16) -> Self {
        TempoMapper {
            inner,
            ppq,
            tempo_uspqn: DEFAULT_TEMPO_USPQN,
            cumulative_us: 0,
        }
    }

    pub(crate) fn next(&mut self) -> LibResult<Option<ScheduledEvent>> {
        let timed = match self.inner.next()? {
            Some(t) => t,
            None => return Ok(None),
        };
        let delta_us = ticks_to_us(timed.delta_ticks(), self.tempo_uspqn, self.ppq);
        self.cumulative_us += delta_us;
        if timed.event().kind() == EventKind::SetTempo {
            let new_tempo = timed.event().tempo()?;
            debug!(
                "tempo changed: {} -> {} us/qn at {}us",
                self.tempo_uspqn, new_tempo, self.cumulative_us
            );
            self.tempo_uspqn = new_tempo;
        }
        Ok(Some(ScheduledEvent {
            timed,
            delta_us,
            cumulative_us: self.cumulative_us,
        }))
    }

    /// Runs the mapper to completion and returns the total duration in microseconds.
    pub(crate) fn total_duration_us(mut self) -> LibResult<u64> {
        let mut last = 0;
        while let Some(scheduled) = self.next()? {
            last = scheduled.cumulative_us();
        }
        Ok(last)
    }
}

fn ticks_to_us(delta_ticks: u64, tempo_uspqn: u32, ppq: u16) -> u64 {
    let numerator = delta_ticks as u128 * tempo_uspqn as u128;
    let ppq = ppq as u128;
    ((numerator + ppq / 2) / ppq) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_tempo_is_120_bpm() {
        // At 500000 us/qn and 480 ppq, one quarter note (480 ticks) is exactly 500ms.
        assert_eq!(ticks_to_us(480, DEFAULT_TEMPO_USPQN, 480), 500_000);
    }

    #[test]
    fn rounding_uses_nearest() {
        assert_eq!(ticks_to_us(1, 1000, 3), 333);
        assert_eq!(ticks_to_us(2, 1000, 3), 667);
    }

    #[test]
    fn zero_delta_is_zero_duration() {
        assert_eq!(ticks_to_us(0, DEFAULT_TEMPO_USPQN, 480), 0);
    }
}
