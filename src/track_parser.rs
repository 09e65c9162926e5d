//! Lazy, per-track [`RawEvent`] framing.
//!
//! `TrackParser` walks one `MTrk` chunk's payload one event at a time, producing
//! [`RawEvent`]s without ever materializing the whole track in memory (the reference crate's
//! `Track::parse` builds a `Vec<TrackEvent>` up front; this does not). Running status is tracked
//! across meta and sysex events too, not just channel events, which tolerates the (technically
//! non-conformant but commonly seen) files that interleave a meta event between a status byte and
//! its running-status continuations without re-sending the status.

use crate::byte_source::ByteSource;
use crate::constants::{self, StatusType};
use crate::error::{self, LibResult};
use crate::raw_event::{self, RawEvent};
use log::warn;
use snafu::ResultExt;
use std::io::{Read, Seek};

pub(crate) struct TrackParser<R> {
    source: ByteSource<R>,
    track_index: usize,
    running_status: Option<u8>,
    finished: bool,
    /// Set once a meta or sysex event has been emitted since the last explicit status byte, so
    /// the next running-status continuation can be logged as the tolerated-but-non-conformant
    /// case it is.
    meta_since_running_status: bool,
    /// When `reuse_event_object` is set, payload bytes are copied into this buffer and cloned out
    /// of it rather than freshly allocated by `Vec::to_vec` each event, so the buffer's capacity
    /// (not a new allocation) carries over between events.
    reuse_scratch: Option<Vec<u8>>,
}

impl<R: Read + Seek> TrackParser<R> {
    pub(crate) fn new(source: ByteSource<R>, track_index: usize, reuse_event_object: bool) -> Self {
        TrackParser {
            source,
            track_index,
            running_status: None,
            finished: false,
            meta_since_running_status: false,
            reuse_scratch: if reuse_event_object { Some(Vec::new()) } else { None },
        }
    }

    /// Returns the next event, or `None` once the track's `END_OF_TRACK` (real or synthesized)
    /// has been returned.
    pub(crate) fn next_raw_event(&mut self) -> LibResult<Option<RawEvent>> {
        if self.finished {
            return Ok(None);
        }
        if self.source.eof() {
            warn!("track {}: missing END_OF_TRACK, synthesizing one", self.track_index);
            self.finished = true;
            return Ok(Some(RawEvent::end_of_track(0)));
        }

        let delta_ticks = self.read_vlq()?;
        if self.source.eof() {
            warn!("track {}: missing END_OF_TRACK, synthesizing one", self.track_index);
            self.finished = true;
            return Ok(Some(RawEvent::end_of_track(delta_ticks)));
        }
        let peeked = self.peek_u8()?;

        if peeked == constants::FILE_META_EVENT {
            self.skip(1)?;
            let meta_type = self.read_u8()?;
            let len = self.read_vlq()? as usize;
            let payload = self.read_payload(len)?;
            self.meta_since_running_status = true;
            if meta_type == raw_event::META_END_OF_TRACK {
                self.finished = true;
            }
            return Ok(Some(RawEvent::meta_event(delta_ticks, meta_type, payload)));
        }

        if peeked == constants::FILE_SYSEX_F0 || peeked == constants::FILE_SYSEX_F7 {
            self.skip(1)?;
            let len = self.read_vlq()? as usize;
            let payload = self.read_payload(len)?;
            self.meta_since_running_status = true;
            return Ok(Some(RawEvent::sysex_event(delta_ticks, peeked, payload)));
        }

        let status = if constants::is_channel_status(peeked) {
            self.skip(1)?;
            self.running_status = Some(peeked);
            self.meta_since_running_status = false;
            peeked
        } else {
            let status = self.running_status.ok_or_else(|| {
                error::RunningStatusWithoutPrior {
                    site: site!(),
                    status: peeked,
                    track_index: self.track_index,
                }
                .build()
            })?;
            if self.meta_since_running_status {
                warn!(
                    "track {}: running status {:#04X} reused across an intervening meta/sysex event",
                    self.track_index, status
                );
                self.meta_since_running_status = false;
            }
            status
        };
        let n = StatusType::from_status_byte(status).data_byte_count();
        let payload = self.read_payload(n)?;
        Ok(Some(RawEvent::channel_event(delta_ticks, status, payload)))
    }

    /// Reads `n` payload bytes, routing through the reusable scratch buffer when
    /// `reuse_event_object` is set so repeated reads grow one allocation instead of each
    /// allocating their own exactly-sized buffer.
    fn read_payload(&mut self, n: usize) -> LibResult<Vec<u8>> {
        match &mut self.reuse_scratch {
            Some(scratch) => {
                scratch.clear();
                let bytes = self.source.read_bytes(n).context(error::TruncatedTrack {
                    site: site!(),
                    track_index: self.track_index,
                })?;
                scratch.extend_from_slice(bytes);
                Ok(scratch.clone())
            }
            None => Ok(self.read_bytes(n)?.to_vec()),
        }
    }

    fn read_vlq(&mut self) -> LibResult<u32> {
        self.source.read_vlq().map_err(|_| {
            error::MalformedVlq {
                site: site!(),
                track_index: self.track_index,
            }
            .build()
        })
    }

    fn peek_u8(&mut self) -> LibResult<u8> {
        self.source.peek_u8().context(error::TruncatedTrack {
            site: site!(),
            track_index: self.track_index,
        })
    }

    fn read_u8(&mut self) -> LibResult<u8> {
        self.source.read_u8().context(error::TruncatedTrack {
            site: site!(),
            track_index: self.track_index,
        })
    }

    fn skip(&mut self, n: usize) -> LibResult<()> {
        self.source.skip(n).context(error::TruncatedTrack {
            site: site!(),
            track_index: self.track_index,
        })
    }

    fn read_bytes(&mut self, n: usize) -> LibResult<&[u8]> {
        self.source.read_bytes(n).context(error::TruncatedTrack {
            site: site!(),
            track_index: self.track_index,
        })
    }
}
