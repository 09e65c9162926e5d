use snafu::Snafu;

/// The public Error type for this library.
#[derive(Debug, Snafu)]
pub struct Error(LibError);

/// The public Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;

/// The internal Result type for this library.
pub(crate) type LibResult<T> = std::result::Result<T, LibError>;

/// The internal Error type for this library. One variant per entry in the error taxonomy; `site`
/// is `file!():line!()` of the call that raised it, so a bare error message is still greppable.
#[derive(Debug, Snafu)]
#[snafu(visibility = "pub(crate)")]
pub(crate) enum LibError {
    #[snafu(display("{}: not a MIDI file: expected tag 'MThd', found {:?}", site, found))]
    BadMagic { site: String, found: Vec<u8> },

    #[snafu(display(
        "{}: header chunk is truncated or declares an unexpected length ({})",
        site,
        length
    ))]
    TruncatedHeader { site: String, length: u32 },

    #[snafu(display(
        "{}: SMPTE-based time division is not supported, only ticks-per-quarter-note",
        site
    ))]
    UnsupportedDivision { site: String },

    #[snafu(display("{}: track {} ended before its events did: {}", site, track_index, source))]
    TruncatedTrack {
        site: String,
        track_index: usize,
        source: crate::byte_source::ByteSourceError,
    },

    #[snafu(display(
        "{}: malformed variable-length quantity in track {} (more than 4 bytes)",
        site,
        track_index
    ))]
    MalformedVlq { site: String, track_index: usize },

    #[snafu(display(
        "{}: running status byte {:#04X} in track {} is not a channel status",
        site,
        status,
        track_index
    ))]
    RunningStatusWithoutPrior {
        site: String,
        status: u8,
        track_index: usize,
    },

    #[snafu(display(
        "{}: format 2 files have independent tracks; iterate `file.tracks()` instead of `file.iter()`",
        site
    ))]
    Format2RequiresTrackSelection { site: String },

    #[snafu(display("{}: `length_us` is not defined for format 2 files", site))]
    Format2NotSupported { site: String },

    #[snafu(display("{}: field '{}' does not apply to this event", site, field))]
    InvalidFieldForEvent { site: String, field: &'static str },

    #[snafu(display(
        "{}: key signature (sf={}, mi={}) is out of the representable range",
        site,
        sf,
        mi
    ))]
    InvalidKeySignature { site: String, sf: i8, mi: u8 },

    #[snafu(display("{}: SMPTE frame rate code {} is out of range", site, code))]
    InvalidSmpteFrameRate { site: String, code: u8 },

    #[snafu(display("{}: meta and sysex events cannot be serialized back to wire bytes", site))]
    NotTransmittable { site: String },

    #[snafu(display("{}: {}", site, source))]
    Io {
        site: String,
        source: std::io::Error,
    },
}

macro_rules! site {
    () => {
        format!("{}:{}", file!(), line!())
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn site_test() {
        let line = line!() + 1;
        let site = site!();
        assert!(site.contains("error.rs"));
        assert!(site.contains(format!("{}", line).as_str()));
    }

    #[test]
    fn display_includes_site() {
        let err: Error = Format2NotSupported { site: site!() }.build().into();
        let message = format!("{}", err);
        assert!(message.contains("format 2"));
    }
}
