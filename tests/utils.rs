#![allow(dead_code)]

use log::LevelFilter;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Once;

static LOGGER: Once = Once::new();

pub fn enable_logging() {
    LOGGER.call_once(logger_init)
}

fn logger_init() {
    env_logger::Builder::new()
        .format(|buf, record| {
            writeln!(
                buf,
                "{}:{} [{}] - {}",
                record.file().unwrap_or("unknown"),
                record.line().unwrap_or(0),
                record.level(),
                record.args()
            )
        })
        .filter(None, LevelFilter::Warn)
        .init();
}

/// Assembles a well-formed `MThd` chunk.
pub fn header_chunk(format: u16, num_tracks: u16, ppq: u16) -> Vec<u8> {
    let mut v = Vec::new();
    v.extend_from_slice(b"MThd");
    v.extend_from_slice(&6u32.to_be_bytes());
    v.extend_from_slice(&format.to_be_bytes());
    v.extend_from_slice(&num_tracks.to_be_bytes());
    v.extend_from_slice(&ppq.to_be_bytes());
    v
}

/// Wraps `events` (already-encoded delta+status+data bytes, no `END_OF_TRACK`) in an `MTrk`
/// chunk, appending a real `END_OF_TRACK` meta event.
pub fn track_chunk(events: &[u8]) -> Vec<u8> {
    let mut body = events.to_vec();
    body.extend_from_slice(&[0x00, 0xFF, 0x2F, 0x00]);
    let mut v = Vec::new();
    v.extend_from_slice(b"MTrk");
    v.extend_from_slice(&(body.len() as u32).to_be_bytes());
    v.extend_from_slice(&body);
    v
}

/// Like [`track_chunk`], but omits the `END_OF_TRACK` event, for exercising synthesis of a
/// missing one.
pub fn track_chunk_without_end_marker(events: &[u8]) -> Vec<u8> {
    let mut v = Vec::new();
    v.extend_from_slice(b"MTrk");
    v.extend_from_slice(&(events.len() as u32).to_be_bytes());
    v.extend_from_slice(events);
    v
}

/// Writes `bytes` to a fresh temp file and returns its path, keeping the owning `TempDir` alive
/// alongside it so it isn't deleted before the caller is done.
pub fn temp_midi_file(bytes: &[u8]) -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("fixture.mid");
    std::fs::write(&path, bytes).expect("write fixture");
    (dir, path)
}
