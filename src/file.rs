//! [`File`]: the facade that ties header parsing, track discovery, merging, and tempo mapping
//! together into the small public surface described for opening and walking a Standard MIDI File.

use crate::error::{self, LibResult, Result};
use crate::header::{self, Division, Format, Header};
use crate::merger::Merger;
use crate::player::Player;
use crate::tempo::{ScheduledEvent, TempoMapper};
use crate::track_parser::TrackParser;
use crate::byte_source::ByteSource;
use log::{debug, trace};
use snafu::{ensure, IntoError, ResultExt};
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

#[derive(Clone, Copy, Debug)]
struct TrackMeta {
    offset: u64,
    length: u64,
}

/// An open Standard MIDI File: a parsed header plus the byte ranges of its track chunks.
///
/// Opening a file only parses the `MThd` chunk and walks the subsequent chunk headers to record
/// where each `MTrk` chunk lives; it does not read event data. Each call to [`File::iter`],
/// [`File::track`], [`File::length_us`], or [`File::play`] opens a fresh handle per track (via
/// the path this file was opened from) and streams from there, so no more than `buffer_size`
/// bytes per active track are ever held in memory at once.
pub struct File {
    header: Header,
    tracks: Vec<TrackMeta>,
    path: PathBuf,
    buffer_size: usize,
    reuse_event_object: bool,
}

impl File {
    /// Opens `path` and discovers its track layout.
    ///
    /// `buffer_size` is the window size, in bytes, each track keeps resident while being read; 0
    /// means read each track's whole chunk into memory up front instead of windowing it.
    /// `reuse_event_object` is a hint honored by the per-track parser's internal scratch buffer:
    /// when true, consecutive events reuse one scratch allocation rather than allocating fresh
    /// each step (see [`File::reuse_event_object`]).
    pub fn open<P: AsRef<Path>>(
        path: P,
        buffer_size: usize,
        reuse_event_object: bool,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut handle = std::fs::File::open(&path).context(error::Io { site: site!() })?;
        let (header, mut pos) = header::read_header(&mut handle)?;
        debug!(
            "opened {:?}: format={:?} ppq={} declared_tracks={}",
            path,
            header.format(),
            header.division().ticks_per_quarter_note(),
            header.num_tracks()
        );

        let mut tracks = Vec::new();
        loop {
            let mut chunk_header = [0u8; 8];
            match handle.read_exact(&mut chunk_header) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(error::Io { site: site!() }.into_error(e).into()),
            }
            let id = &chunk_header[0..4];
            let length = u32::from_be_bytes([
                chunk_header[4],
                chunk_header[5],
                chunk_header[6],
                chunk_header[7],
            ]) as u64;
            let data_offset = pos + 8;
            if id == b"MTrk" {
                trace!("track {} at offset {} length {}", tracks.len(), data_offset, length);
                tracks.push(TrackMeta {
                    offset: data_offset,
                    length,
                });
            }
            handle
                .seek(SeekFrom::Start(data_offset + length))
                .context(error::Io { site: site!() })?;
            pos = data_offset + length;
        }

        Ok(File {
            header,
            tracks,
            path,
            buffer_size,
            reuse_event_object,
        })
    }

    pub fn format_type(&self) -> Format {
        self.header.format()
    }

    pub fn division(&self) -> Division {
        self.header.division()
    }

    pub fn ppq(&self) -> u16 {
        self.header.division().ticks_per_quarter_note()
    }

    /// The number of `MTrk` chunks actually found in the file (not the header's declared count,
    /// which some writers get wrong).
    pub fn num_tracks(&self) -> usize {
        self.tracks.len()
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    pub fn reuse_event_object(&self) -> bool {
        self.reuse_event_object
    }

    fn open_track_handle(&self) -> LibResult<std::fs::File> {
        std::fs::File::open(&self.path).context(error::Io { site: site!() })
    }

    fn track_parser(&self, index: usize) -> LibResult<TrackParser<std::fs::File>> {
        let meta = self.tracks[index];
        let handle = self.open_track_handle()?;
        let source = if self.buffer_size == 0 {
            ByteSource::new_owned(handle, meta.offset, meta.length)
                .context(error::TruncatedTrack { site: site!(), track_index: index })?
        } else {
            ByteSource::new_windowed(handle, meta.offset, meta.length, self.buffer_size)
        };
        Ok(TrackParser::new(source, index, self.reuse_event_object))
    }

    fn all_track_parsers(&self) -> LibResult<Vec<TrackParser<std::fs::File>>> {
        (0..self.tracks.len()).map(|i| self.track_parser(i)).collect()
    }

    fn require_mergeable(&self) -> LibResult<()> {
        ensure!(
            !matches!(self.header.format(), Format::MultiSequence),
            error::Format2RequiresTrackSelection { site: site!() }
        );
        Ok(())
    }

    /// Iterates the merged, tempo-mapped event stream (format 0/1 only).
    pub fn iter(&self) -> Result<EventStream> {
        self.require_mergeable()?;
        let parsers = self.all_track_parsers()?;
        let merger = Merger::new(parsers)?;
        Ok(EventStream {
            mapper: TempoMapper::new(merger, self.ppq()),
        })
    }

    /// Iterates one track in isolation, tempo-mapped against its own tempo events. Intended for
    /// format 2 files, where tracks are independent sequences, but works for any format.
    pub fn track(&self, index: usize) -> Result<EventStream> {
        let parser = self.track_parser(index)?;
        let merger = Merger::new(vec![parser])?;
        Ok(EventStream {
            mapper: TempoMapper::new(merger, self.ppq()),
        })
    }

    /// The total duration of the merged stream, in microseconds (format 0/1 only).
    pub fn length_us(&self) -> Result<u64> {
        ensure!(
            !matches!(self.header.format(), Format::MultiSequence),
            error::Format2NotSupported { site: site!() }
        );
        let parsers = self.all_track_parsers()?;
        let merger = Merger::new(parsers)?;
        Ok(TempoMapper::new(merger, self.ppq()).total_duration_us()?)
    }

    /// Builds a [`Player`] over the merged event stream, driven by the caller.
    pub fn play(&self) -> Result<Player<EventStream>> {
        Ok(Player::new(self.iter()?))
    }
}

/// The merged, tempo-mapped iterator returned by [`File::iter`] and [`File::track`].
pub struct EventStream {
    mapper: TempoMapper<std::fs::File>,
}

impl Iterator for EventStream {
    type Item = Result<ScheduledEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.mapper.next() {
            Ok(Some(event)) => Some(Ok(event)),
            Ok(None) => None,
            Err(e) => Some(Err(e.into())),
        }
    }
}
