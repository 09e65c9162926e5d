//! A lazy, streaming parser and scheduled player for Standard MIDI Files.
//!
//! Where a typical MIDI library parses a whole file into a tree of events up front, this crate
//! is built for the opposite case: a device with a few tens of kilobytes of RAM and a file that
//! may not fit in it. Opening a [`File`] only reads its `MThd` chunk and walks the subsequent
//! chunk headers to find where each track lives; no event data is read until you ask for it.
//! From there:
//!
//! - [`File::iter`] merges format 0/1 tracks into one ascending-tick stream and maps ticks to
//!   microseconds against the file's tempo track, using no more than `buffer_size` bytes of
//!   lookahead per track.
//! - [`File::track`] walks a single track in isolation, for format 2 files or for inspecting one
//!   track of a format 1 file on its own.
//! - [`File::play`] drives that stream in real time through a drift-compensating [`Player`].
//!
//! Event field access ([`RawEvent::note`], [`RawEvent::tempo`], [`RawEvent::text`], ...) is lazy
//! too: the parser only splits an event into its status byte and payload bytes, and decoding a
//! specific field happens the first time it's asked for.
//!
//! ```no_run
//! use smf_stream::File;
//!
//! let file = File::open("song.mid", 256, false)?;
//! for scheduled in file.iter()? {
//!     let scheduled = scheduled?;
//!     println!("+{}us {:?}", scheduled.delta_us(), scheduled.event().kind());
//! }
//! # Ok::<(), smf_stream::Error>(())
//! ```

#[macro_use]
mod error;

mod byte_source;
mod constants;
mod file;
mod header;
mod merger;
mod player;
mod raw_event;
mod tempo;
mod text;
mod track_parser;

pub use crate::error::{Error, Result};
pub use crate::file::{EventStream, File};
pub use crate::header::{Division, Format, Header};
pub use crate::merger::TimedEvent;
pub use crate::player::{
    AsyncSleeper, CancelHandle, Clock, Player, Sleeper, SystemClock, ThreadSleeper,
};
pub use crate::raw_event::{EventKind, KeySignature, RawEvent, SmpteFrameRate, SmpteOffset};
pub use crate::tempo::ScheduledEvent;
pub use crate::text::Text;
