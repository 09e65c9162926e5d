//! Deterministic k-way merge of a format 0/1 file's tracks into one time-ordered stream.
//!
//! Format 1 files are, in effect, N tracks that all share one timeline; this is the piece that
//! reassembles them without reading more than one event ahead per track. Each track's own
//! `END_OF_TRACK` is swallowed; the merged stream emits exactly one, at the tick of whichever
//! track runs longest.

use crate::raw_event::RawEvent;
use crate::track_parser::TrackParser;
use crate::error::LibResult;
use log::{debug, trace};
use std::io::{Read, Seek};

/// One event from the merged stream: the framed event itself, its delta-time in ticks since the
/// previously emitted merged event (not since the previous event on its own track), and which
/// track it came from.
#[derive(Clone, Debug)]
pub struct TimedEvent {
    pub(crate) event: RawEvent,
    delta_ticks: u64,
    track_index: usize,
}

impl TimedEvent {
    /// The event itself.
    pub fn event(&self) -> &RawEvent {
        &self.event
    }

    /// Ticks elapsed since the previous event in the merged stream (0 for simultaneous events).
    pub fn delta_ticks(&self) -> u64 {
        self.delta_ticks
    }

    /// The originating track, 0-based.
    pub fn track_index(&self) -> usize {
        self.track_index
    }

    #[cfg(test)]
    pub(crate) fn for_test(event: RawEvent, delta_ticks: u64, track_index: usize) -> Self {
        TimedEvent {
            event,
            delta_ticks,
            track_index,
        }
    }
}

struct TrackCursor<R> {
    parser: TrackParser<R>,
    absolute_tick: u64,
    pending: Option<RawEvent>,
    /// Set once this track's `END_OF_TRACK` has been pulled out of `parser` and withheld.
    ended_at: Option<u64>,
}

impl<R: Read + Seek> TrackCursor<R> {
    fn new(parser: TrackParser<R>) -> LibResult<Self> {
        let mut this = TrackCursor {
            parser,
            absolute_tick: 0,
            pending: None,
            ended_at: None,
        };
        this.advance()?;
        Ok(this)
    }

    fn advance(&mut self) -> LibResult<()> {
        match self.parser.next_raw_event()? {
            Some(event) => {
                self.absolute_tick += u64::from(event.delta_ticks);
                if event.is_end_of_track() {
                    self.ended_at = Some(self.absolute_tick);
                    self.pending = None;
                } else {
                    self.pending = Some(event);
                }
            }
            None => {
                self.pending = None;
            }
        }
        Ok(())
    }

    fn is_exhausted(&self) -> bool {
        self.pending.is_none() && self.ended_at.is_some()
    }
}

/// Merges one [`TrackParser`] per track into a single ascending-tick stream.
pub(crate) struct Merger<R> {
    cursors: Vec<TrackCursor<R>>,
    last_emitted_tick: u64,
    done: bool,
}

impl<R: Read + Seek> Merger<R> {
    pub(crate) fn new(parsers: Vec<TrackParser<R>>) -> LibResult<Self> {
        let cursors = parsers
            .into_iter()
            .map(TrackCursor::new)
            .collect::<LibResult<Vec<_>>>()?;
        Ok(Merger {
            cursors,
            last_emitted_tick: 0,
            done: false,
        })
    }

    pub(crate) fn next(&mut self) -> LibResult<Option<TimedEvent>> {
        if self.done {
            return Ok(None);
        }

        let mut best: Option<usize> = None;
        for (index, cursor) in self.cursors.iter().enumerate() {
            if cursor.pending.is_none() {
                continue;
            }
            let tick = cursor.absolute_tick;
            match best {
                None => best = Some(index),
                Some(current_best) => {
                    if tick < self.cursors[current_best].absolute_tick {
                        best = Some(index);
                    }
                }
            }
        }

        if let Some(index) = best {
            let absolute_tick = self.cursors[index].absolute_tick;
            let delta_ticks = absolute_tick - self.last_emitted_tick;
            self.last_emitted_tick = absolute_tick;
            let event = self.cursors[index]
                .pending
                .take()
                .expect("checked Some above");
            trace!("merger: emitting track {} event at tick {}", index, absolute_tick);
            self.cursors[index].advance()?;
            return Ok(Some(TimedEvent {
                event,
                delta_ticks,
                track_index: index,
            }));
        }

        if self.cursors.iter().all(TrackCursor::is_exhausted) {
            self.done = true;
            let final_tick = self
                .cursors
                .iter()
                .filter_map(|c| c.ended_at)
                .max()
                .unwrap_or(self.last_emitted_tick);
            let delta_ticks = final_tick - self.last_emitted_tick;
            debug!("merger: all {} tracks exhausted at tick {}", self.cursors.len(), final_tick);
            return Ok(Some(TimedEvent {
                event: RawEvent::end_of_track(delta_ticks as u32),
                delta_ticks,
                track_index: self.cursors.len().saturating_sub(1),
            }));
        }

        // Some cursors are still mid-fetch (shouldn't happen: `advance` runs eagerly), but guard
        // against an infinite loop by treating it as exhaustion.
        self.done = true;
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::byte_source::ByteSource;
    use std::io::Cursor;

    fn track(bytes: &[u8]) -> TrackParser<Cursor<Vec<u8>>> {
        let source = ByteSource::new_owned(Cursor::new(bytes.to_vec()), 0, bytes.len() as u64)
            .unwrap();
        TrackParser::new(source, 0, false)
    }

    #[test]
    fn two_tracks_interleave_by_absolute_tick() {
        // Track 0: tick 0 note 60, tick 20 note 62.
        let t0 = track(&[0x00, 0x90, 60, 100, 20, 0x90, 62, 100]);
        // Track 1: tick 10 note 64.
        let t1 = track(&[10, 0x90, 64, 100]);
        let mut merger = Merger::new(vec![t0, t1]).unwrap();

        let e1 = merger.next().unwrap().unwrap();
        assert_eq!(e1.event().note().unwrap(), 60);
        assert_eq!(e1.delta_ticks(), 0);
        assert_eq!(e1.track_index(), 0);

        let e2 = merger.next().unwrap().unwrap();
        assert_eq!(e2.event().note().unwrap(), 64);
        assert_eq!(e2.delta_ticks(), 10);
        assert_eq!(e2.track_index(), 1);

        let e3 = merger.next().unwrap().unwrap();
        assert_eq!(e3.event().note().unwrap(), 62);
        assert_eq!(e3.delta_ticks(), 10);
        assert_eq!(e3.track_index(), 0);

        let eot = merger.next().unwrap().unwrap();
        assert!(eot.event().is_end_of_track());
        assert!(merger.next().unwrap().is_none());
    }

    #[test]
    fn simultaneous_events_tie_break_by_ascending_track_index() {
        let t0 = track(&[5, 0x90, 60, 100]);
        let t1 = track(&[5, 0x90, 61, 100]);
        let mut merger = Merger::new(vec![t0, t1]).unwrap();
        let first = merger.next().unwrap().unwrap();
        assert_eq!(first.track_index(), 0);
        let second = merger.next().unwrap().unwrap();
        assert_eq!(second.track_index(), 1);
        assert_eq!(second.delta_ticks(), 0);
    }

    #[test]
    fn final_end_of_track_tick_is_the_longest_track() {
        let t0 = track(&[0x00, 0x90, 60, 100]); // ends at tick 0
        let t1 = track(&[50, 0x90, 61, 100]); // ends at tick 50
        let mut merger = Merger::new(vec![t0, t1]).unwrap();
        let _ = merger.next().unwrap();
        let _ = merger.next().unwrap();
        let eot = merger.next().unwrap().unwrap();
        assert!(eot.event().is_end_of_track());
        assert_eq!(eot.delta_ticks(), 50);
    }
}
