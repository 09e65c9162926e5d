//! Parses the `MThd` header chunk: magic, declared chunk length, format, track count, and
//! division. This runs once per file, directly against the file handle (there is no point in
//! windowing six-to-fourteen bytes).

use crate::error::{self, LibResult};
use snafu::{ensure, ResultExt};
use std::convert::TryFrom;
use std::io::{Read, Seek, SeekFrom};

const MTHD_MAGIC: &[u8; 4] = b"MThd";

/// A file's overall track-organization scheme (MIDI spec §2).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Format {
    /// A single track.
    Single,
    /// Multiple tracks that share one timeline and are meant to be merged when played.
    Multi,
    /// Multiple, independent sequences that happen to share a file.
    MultiSequence,
    /// Anything other than 0, 1, or 2. Not produced by conforming writers, but harmless to carry.
    Other(u16),
}

impl From<u16> for Format {
    fn from(value: u16) -> Self {
        match value {
            0 => Format::Single,
            1 => Format::Multi,
            2 => Format::MultiSequence,
            other => Format::Other(other),
        }
    }
}

/// A file's time division: ticks-per-quarter-note. SMPTE-based division (the top bit of the raw
/// 16-bit field set) is rejected with [`error::UnsupportedDivision`] — this crate only maps ticks
/// through a tempo, not through a frame rate. A division of 0 is also rejected, since it would
/// make every tick-to-microsecond conversion divide by zero.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct Division(u16);

impl Division {
    pub fn ticks_per_quarter_note(&self) -> u16 {
        self.0
    }
}

impl TryFrom<u16> for Division {
    type Error = crate::Error;

    fn try_from(value: u16) -> crate::Result<Self> {
        ensure!(value & 0x8000 == 0, error::UnsupportedDivision { site: site!() });
        ensure!(value != 0, error::UnsupportedDivision { site: site!() });
        Ok(Division(value))
    }
}

/// The decoded `MThd` chunk.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct Header {
    pub(crate) format: Format,
    pub(crate) num_tracks: u16,
    pub(crate) division: Division,
}

impl Header {
    pub fn format(&self) -> Format {
        self.format
    }

    pub fn num_tracks(&self) -> u16 {
        self.num_tracks
    }

    pub fn division(&self) -> Division {
        self.division
    }
}

/// Reads the `MThd` chunk starting at the file's current position (expected to be 0). Returns the
/// header and the absolute offset of the byte immediately following the chunk, where the first
/// `MTrk` chunk (if any) begins.
pub(crate) fn read_header<R: Read + Seek>(file: &mut R) -> LibResult<(Header, u64)> {
    let mut magic = [0u8; 4];
    file.read_exact(&mut magic)
        .context(error::Io { site: site!() })?;
    ensure!(
        &magic == MTHD_MAGIC,
        error::BadMagic {
            site: site!(),
            found: magic.to_vec(),
        }
    );

    let length = read_u32(file)?;
    ensure!(length >= 6, error::TruncatedHeader { site: site!(), length });

    let format = Format::from(read_u16(file)?);
    let num_tracks = read_u16(file)?;
    let division = Division::try_from(read_u16(file)?)?;

    // Skip any bytes beyond the six standard fields (forward-compatible extensions).
    let extra = length as u64 - 6;
    if extra > 0 {
        file.seek(SeekFrom::Current(extra as i64))
            .context(error::Io { site: site!() })?;
    }

    let header = Header {
        format,
        num_tracks,
        division,
    };
    let chunk_end = 8 + length as u64;
    Ok((header, chunk_end))
}

fn read_u16<R: Read>(file: &mut R) -> LibResult<u16> {
    let mut buf = [0u8; 2];
    file.read_exact(&mut buf)
        .context(error::Io { site: site!() })?;
    Ok(u16::from_be_bytes(buf))
}

fn read_u32<R: Read>(file: &mut R) -> LibResult<u32> {
    let mut buf = [0u8; 4];
    file.read_exact(&mut buf)
        .context(error::Io { site: site!() })?;
    Ok(u32::from_be_bytes(buf))
}
