//! [`RawEvent`]: the framed-but-undecoded unit the track parser and merger pass around, and the
//! lazy field accessors layered over it (the "Event Decoder" of the system overview).
//!
//! The parser only ever does enough work to frame an event (split off its status byte and
//! payload bytes); it never inspects field values. Interpreting a payload into typed fields
//! happens on demand, the first time a caller asks for it, which is what keeps the hot path of
//! walking through a file allocation- and work-light on a constrained device.

use crate::constants::{self, StatusType};
use crate::error::{self, LibResult};
use crate::text::Text;
use std::convert::TryFrom;

/// One decoded-but-unframed event: a channel message, a meta event, or a sysex/escape packet.
///
/// `status` is normalized per the specification: for channel events the low nibble (channel) is
/// zeroed out of `status` and kept separately; for meta events `status` is the meta-type byte
/// (e.g. `0x51` for `SET_TEMPO`), not the `0xFF` prefix; for sysex/escape, `status` is `0xF0` or
/// `0xF7`. `payload` never includes a length prefix or (for meta events) the `0xFF`-plus-type
/// header.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct RawEvent {
    pub(crate) delta_ticks: u32,
    pub(crate) status: u8,
    pub(crate) channel: Option<u8>,
    pub(crate) payload: Vec<u8>,
}

/// The event's `delta-time`, in ticks, since the *previous event emitted on the same track*. (A
/// [`crate::merger::TimedEvent`] additionally carries a `delta_ticks` measured against the
/// previously emitted event across the whole merged stream — see that type's docs.)
impl RawEvent {
    pub(crate) fn channel_event(delta_ticks: u32, status: u8, payload: Vec<u8>) -> Self {
        debug_assert!(constants::is_channel_status(status));
        RawEvent {
            delta_ticks,
            status: status & !constants::STATUS_CHANNEL_MASK,
            channel: Some(status & constants::STATUS_CHANNEL_MASK),
            payload,
        }
    }

    pub(crate) fn meta_event(delta_ticks: u32, meta_type: u8, payload: Vec<u8>) -> Self {
        RawEvent {
            delta_ticks,
            status: meta_type,
            channel: None,
            payload,
        }
    }

    pub(crate) fn sysex_event(delta_ticks: u32, marker: u8, payload: Vec<u8>) -> Self {
        debug_assert!(marker == constants::FILE_SYSEX_F0 || marker == constants::FILE_SYSEX_F7);
        RawEvent {
            delta_ticks,
            status: marker,
            channel: None,
            payload,
        }
    }

    pub(crate) fn end_of_track(delta_ticks: u32) -> Self {
        RawEvent {
            delta_ticks,
            status: META_END_OF_TRACK,
            channel: None,
            payload: Vec::new(),
        }
    }

    fn is_meta(&self) -> bool {
        self.channel.is_none()
            && self.status != constants::FILE_SYSEX_F0
            && self.status != constants::FILE_SYSEX_F7
    }

    fn is_sysex(&self) -> bool {
        self.status == constants::FILE_SYSEX_F0 || self.status == constants::FILE_SYSEX_F7
    }

    /// The event's broad category, mirroring the status table in the specification.
    pub fn kind(&self) -> EventKind {
        if let Some(_ch) = self.channel {
            return match StatusType::from_status_byte(self.status) {
                StatusType::NoteOff => EventKind::NoteOff,
                StatusType::NoteOn => EventKind::NoteOn,
                StatusType::PolyPressure => EventKind::PolyTouch,
                StatusType::ControlChange => EventKind::ControlChange,
                StatusType::Program => EventKind::ProgramChange,
                StatusType::ChannelPressure => EventKind::Aftertouch,
                StatusType::PitchBend => EventKind::PitchWheel,
            };
        }
        if self.is_sysex() {
            return if self.status == constants::FILE_SYSEX_F0 {
                EventKind::Sysex
            } else {
                EventKind::Escape
            };
        }
        debug_assert!(self.is_meta());
        match self.status {
            0x00 => EventKind::SequenceNumber,
            0x01 => EventKind::Text,
            0x02 => EventKind::Copyright,
            0x03 => EventKind::TrackName,
            0x04 => EventKind::InstrumentName,
            0x05 => EventKind::Lyric,
            0x06 => EventKind::Marker,
            0x07 => EventKind::CuePoint,
            0x08 => EventKind::ProgramName,
            0x09 => EventKind::DeviceName,
            0x20 => EventKind::ChannelPrefix,
            0x21 => EventKind::MidiPort,
            META_END_OF_TRACK => EventKind::EndOfTrack,
            0x51 => EventKind::SetTempo,
            0x54 => EventKind::SmpteOffset,
            0x58 => EventKind::TimeSignature,
            0x59 => EventKind::KeySignature,
            0x7F => EventKind::SequencerSpecific,
            other => EventKind::UnknownMeta(other),
        }
    }

    pub fn is_end_of_track(&self) -> bool {
        self.is_meta() && self.status == META_END_OF_TRACK
    }

    /// The raw payload bytes, with no framing, always available regardless of event type.
    pub fn data(&self) -> &[u8] {
        &self.payload
    }

    /// `channel` field (NOTE_OFF, NOTE_ON, POLYTOUCH, CONTROL_CHANGE, PROGRAM_CHANGE, AFTERTOUCH,
    /// PITCHWHEEL, CHANNEL_PREFIX). `InvalidFieldForEvent` otherwise.
    pub fn channel(&self) -> LibResult<u8> {
        if let Some(ch) = self.channel {
            return Ok(ch);
        }
        if self.is_meta() && self.status == 0x20 {
            if let Some(&b) = self.payload.first() {
                return Ok(b);
            }
        }
        invalid_field("channel")
    }

    /// `note` field (NOTE_OFF, NOTE_ON, POLYTOUCH).
    pub fn note(&self) -> LibResult<u8> {
        match self.kind() {
            EventKind::NoteOff | EventKind::NoteOn | EventKind::PolyTouch => Ok(self.payload[0]),
            _ => invalid_field("note"),
        }
    }

    /// `velocity` field (NOTE_OFF, NOTE_ON).
    pub fn velocity(&self) -> LibResult<u8> {
        match self.kind() {
            EventKind::NoteOff | EventKind::NoteOn => Ok(self.payload[1]),
            _ => invalid_field("velocity"),
        }
    }

    /// `value` field (POLYTOUCH pressure, CONTROL_CHANGE value, AFTERTOUCH pressure).
    pub fn value(&self) -> LibResult<u8> {
        match self.kind() {
            EventKind::PolyTouch | EventKind::ControlChange => Ok(self.payload[1]),
            EventKind::Aftertouch => Ok(self.payload[0]),
            _ => invalid_field("value"),
        }
    }

    /// `control` field (CONTROL_CHANGE).
    pub fn control(&self) -> LibResult<u8> {
        match self.kind() {
            EventKind::ControlChange => Ok(self.payload[0]),
            _ => invalid_field("control"),
        }
    }

    /// `program` field (PROGRAM_CHANGE).
    pub fn program(&self) -> LibResult<u8> {
        match self.kind() {
            EventKind::ProgramChange => Ok(self.payload[0]),
            _ => invalid_field("program"),
        }
    }

    /// `pitch` field (PITCHWHEEL), `(lsb | msb << 7) - 8192`, i.e. in `-8192..=8191`.
    pub fn pitch(&self) -> LibResult<i16> {
        match self.kind() {
            EventKind::PitchWheel => {
                let lsb = self.payload[0] as u16;
                let msb = self.payload[1] as u16;
                Ok(((lsb | (msb << 7)) as i32 - 8192) as i16)
            }
            _ => invalid_field("pitch"),
        }
    }

    /// `number` field (SEQUENCE_NUMBER): `Some` for the 2-byte form, `None` for the legacy 0-byte
    /// form (implied default position in the file).
    pub fn number(&self) -> LibResult<Option<u16>> {
        match self.kind() {
            EventKind::SequenceNumber => {
                if self.payload.is_empty() {
                    Ok(None)
                } else if self.payload.len() >= 2 {
                    Ok(Some(u16::from_be_bytes([self.payload[0], self.payload[1]])))
                } else {
                    invalid_field("number")
                }
            }
            _ => invalid_field("number"),
        }
    }

    /// `port` field (MIDI_PORT).
    pub fn port(&self) -> LibResult<u8> {
        match self.kind() {
            EventKind::MidiPort => Ok(self.payload[0]),
            _ => invalid_field("port"),
        }
    }

    /// `tempo` field, in microseconds per quarter note (SET_TEMPO).
    pub fn tempo(&self) -> LibResult<u32> {
        match self.kind() {
            EventKind::SetTempo if self.payload.len() >= 3 => Ok(u32::from_be_bytes([
                0,
                self.payload[0],
                self.payload[1],
                self.payload[2],
            ])),
            EventKind::SetTempo => invalid_field("tempo"),
            _ => invalid_field("tempo"),
        }
    }

    /// `numerator` field (TIME_SIGNATURE).
    pub fn numerator(&self) -> LibResult<u8> {
        self.time_signature_bytes().map(|b| b[0])
    }

    /// `denominator` field (TIME_SIGNATURE), as the actual denominator `2^x`, not the raw
    /// exponent byte stored on the wire.
    pub fn denominator(&self) -> LibResult<u32> {
        self.time_signature_bytes().map(|b| 1u32 << b[1])
    }

    /// `clocks_per_click` field (TIME_SIGNATURE).
    pub fn clocks_per_click(&self) -> LibResult<u8> {
        self.time_signature_bytes().map(|b| b[2])
    }

    /// `notated_32nd_notes_per_beat` field (TIME_SIGNATURE).
    pub fn notated_32nd_notes_per_beat(&self) -> LibResult<u8> {
        self.time_signature_bytes().map(|b| b[3])
    }

    fn time_signature_bytes(&self) -> LibResult<[u8; 4]> {
        match self.kind() {
            EventKind::TimeSignature if self.payload.len() >= 4 => Ok([
                self.payload[0],
                self.payload[1],
                self.payload[2],
                self.payload[3],
            ]),
            _ => invalid_field("numerator/denominator/clocks_per_click"),
        }
    }

    /// `key` field (KEY_SIGNATURE), mapped to one of the 30 canonical key names.
    pub fn key(&self) -> LibResult<KeySignature> {
        match self.kind() {
            EventKind::KeySignature if self.payload.len() >= 2 => {
                let sf = self.payload[0] as i8;
                let mi = self.payload[1];
                KeySignature::from_components(sf, mi)
            }
            _ => invalid_field("key"),
        }
    }

    /// The decomposed SMPTE offset fields (SMPTE_OFFSET).
    pub fn smpte_offset(&self) -> LibResult<SmpteOffset> {
        match self.kind() {
            EventKind::SmpteOffset if self.payload.len() >= 5 => {
                let code = (self.payload[0] >> 5) & 0b11;
                let frame_rate = SmpteFrameRate::from_code(code)?;
                Ok(SmpteOffset {
                    frame_rate,
                    hours: self.payload[0] & 0b0001_1111,
                    minutes: self.payload[1],
                    seconds: self.payload[2],
                    frames: self.payload[3],
                    sub_frames: self.payload[4],
                })
            }
            _ => invalid_field("smpte_offset"),
        }
    }

    /// `text`/`name` field, for any of the text-bearing meta events.
    pub fn text(&self) -> LibResult<Text> {
        match self.kind() {
            EventKind::Text
            | EventKind::Copyright
            | EventKind::TrackName
            | EventKind::InstrumentName
            | EventKind::Lyric
            | EventKind::Marker
            | EventKind::CuePoint
            | EventKind::ProgramName
            | EventKind::DeviceName => Ok(Text::decode(&self.payload)),
            _ => invalid_field("text"),
        }
    }

    /// Serialize a channel event back to wire bytes: the full status byte (type nibble OR
    /// channel) followed by its data bytes. Meta and sysex events are `NotTransmittable`.
    pub fn to_midi(&self) -> LibResult<Vec<u8>> {
        let channel = match self.channel {
            Some(ch) => ch,
            None => return error::NotTransmittable { site: site!() }.fail(),
        };
        let mut out = Vec::with_capacity(1 + self.payload.len());
        out.push(self.status | channel);
        out.extend_from_slice(&self.payload);
        Ok(out)
    }
}

fn invalid_field<T>(field: &'static str) -> LibResult<T> {
    error::InvalidFieldForEvent {
        site: site!(),
        field,
    }
    .fail()
}

pub(crate) const META_END_OF_TRACK: u8 = 0x2F;

/// The event's broad category. One variant per row of the status table in the specification,
/// plus [`EventKind::UnknownMeta`] for meta-type bytes this crate does not otherwise name (the
/// payload is still reachable via [`RawEvent::data`]).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum EventKind {
    NoteOff,
    NoteOn,
    PolyTouch,
    ControlChange,
    ProgramChange,
    Aftertouch,
    PitchWheel,
    SequenceNumber,
    Text,
    Copyright,
    TrackName,
    InstrumentName,
    Lyric,
    Marker,
    CuePoint,
    ProgramName,
    DeviceName,
    ChannelPrefix,
    MidiPort,
    EndOfTrack,
    SetTempo,
    SmpteOffset,
    TimeSignature,
    KeySignature,
    SequencerSpecific,
    Sysex,
    Escape,
    UnknownMeta(u8),
}

/// The decomposed fields of an `SMPTE_OFFSET` meta event.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct SmpteOffset {
    pub frame_rate: SmpteFrameRate,
    pub hours: u8,
    pub minutes: u8,
    pub seconds: u8,
    pub frames: u8,
    pub sub_frames: u8,
}

/// The four SMPTE frame rates representable in the top two bits of an `SMPTE_OFFSET` event's
/// first byte.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum SmpteFrameRate {
    Fps24,
    Fps25,
    Fps29_97,
    Fps30,
}

impl SmpteFrameRate {
    fn from_code(code: u8) -> LibResult<Self> {
        match code {
            0 => Ok(SmpteFrameRate::Fps24),
            1 => Ok(SmpteFrameRate::Fps25),
            2 => Ok(SmpteFrameRate::Fps29_97),
            3 => Ok(SmpteFrameRate::Fps30),
            // Unreachable: `code` is masked to two bits by the caller. Kept so the accessor
            // contract matches the specification even though no input can trigger it.
            _ => error::InvalidSmpteFrameRate {
                site: site!(),
                code,
            }
            .fail(),
        }
    }
}

/// One of the 30 canonical key signature names (15 major, 15 minor), derived from
/// `(sf: -7..=7, mi: 0 | 1)`.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct KeySignature {
    pub sharps_flats: i8,
    pub minor: bool,
}

const MAJOR_KEY_NAMES: [&str; 15] = [
    "Cb", "Gb", "Db", "Ab", "Eb", "Bb", "F", "C", "G", "D", "A", "E", "B", "F#", "C#",
];

const MINOR_KEY_NAMES: [&str; 15] = [
    "Ab", "Eb", "Bb", "F", "C", "G", "D", "A", "E", "B", "F#", "C#", "G#", "D#", "A#",
];

impl KeySignature {
    fn from_components(sf: i8, mi: u8) -> LibResult<Self> {
        if !(-7..=7).contains(&sf) || mi > 1 {
            return error::InvalidKeySignature {
                site: site!(),
                sf,
                mi,
            }
            .fail();
        }
        Ok(KeySignature {
            sharps_flats: sf,
            minor: mi == 1,
        })
    }

    /// The key's canonical name, e.g. `"Eb minor"`, `"C major"`.
    pub fn name(&self) -> String {
        let index = (self.sharps_flats + 7) as usize;
        let (tonic, mode) = if self.minor {
            (MINOR_KEY_NAMES[index], "minor")
        } else {
            (MAJOR_KEY_NAMES[index], "major")
        };
        format!("{} {}", tonic, mode)
    }

    /// The inverse of [`KeySignature::try_from`]: `(sharps_flats, minor-flag)` as they appear on
    /// the wire.
    pub fn to_components(self) -> (i8, u8) {
        (self.sharps_flats, self.minor as u8)
    }
}

impl TryFrom<(i8, u8)> for KeySignature {
    type Error = crate::Error;

    fn try_from((sf, mi): (i8, u8)) -> crate::Result<Self> {
        Ok(Self::from_components(sf, mi)?)
    }
}
