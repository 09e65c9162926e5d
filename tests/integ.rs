mod utils;

use smf_stream::{EventKind, Format};
use utils::{enable_logging, header_chunk, temp_midi_file, track_chunk, track_chunk_without_end_marker};

#[test]
fn minimal_format_0_file() {
    enable_logging();
    let mut bytes = header_chunk(0, 1, 480);
    bytes.extend(track_chunk(&[
        0x00, 0x90, 60, 100, // note on
        0x81, 0x70, 0x80, 60, 0, // note off after 240 ticks (VLQ: 0x81, 0x70)
    ]));
    let (_dir, path) = temp_midi_file(&bytes);

    let file = smf_stream::File::open(&path, 0, false).unwrap();
    assert_eq!(file.format_type(), Format::Single);
    assert_eq!(file.num_tracks(), 1);
    assert_eq!(file.ppq(), 480);

    let events: Vec<_> = file.iter().unwrap().map(Result::unwrap).collect();
    assert_eq!(events.len(), 3);
    assert_eq!(events[0].event().kind(), EventKind::NoteOn);
    assert_eq!(events[1].event().kind(), EventKind::NoteOff);
    assert_eq!(events[2].event().kind(), EventKind::EndOfTrack);
    // 240 ticks at the default 120 BPM tempo (500000 us/qn over 480 ppq) is exactly 250ms.
    assert_eq!(events[1].delta_us(), 250_000);
}

#[test]
fn tempo_change_affects_only_subsequent_events() {
    enable_logging();
    let mut bytes = header_chunk(1, 1, 480);
    bytes.extend(track_chunk(&[
        0x00, 0x90, 60, 100, // note on at the default tempo
        0x83, 0x60, 0xFF, 0x51, 0x03, 0x0F, 0x42, 0x40, // after 1 qtr note (VLQ 480), double the tempo's us/qn
        0x83, 0x60, 0x80, 60, 0, // note off, one quarter note later, at the new (slower) tempo
    ]));
    let (_dir, path) = temp_midi_file(&bytes);
    let file = smf_stream::File::open(&path, 0, false).unwrap();
    let events: Vec<_> = file.iter().unwrap().map(Result::unwrap).collect();

    assert_eq!(events[0].delta_us(), 0);
    // the delta into the tempo-change event itself is still measured at the OLD tempo
    assert_eq!(events[1].delta_us(), 500_000);
    // the next event is measured at the new tempo (1,000,000 us/qn) for one quarter note
    assert_eq!(events[2].delta_us(), 1_000_000);
}

#[test]
fn running_status_is_honored_within_a_track() {
    enable_logging();
    let mut bytes = header_chunk(0, 1, 480);
    bytes.extend(track_chunk(&[
        0x00, 0x90, 60, 100, // note on, status sent
        0x00, 64, 100, // running status: another note on
        0x00, 0x80, 60, 0, // explicit note off
        0x00, 64, 0, // running status: another note off
    ]));
    let (_dir, path) = temp_midi_file(&bytes);
    let file = smf_stream::File::open(&path, 0, false).unwrap();
    let events: Vec<_> = file.iter().unwrap().map(Result::unwrap).collect();
    assert_eq!(events[1].event().note().unwrap(), 64);
    assert_eq!(events[1].event().kind(), EventKind::NoteOn);
    assert_eq!(events[3].event().note().unwrap(), 64);
    assert_eq!(events[3].event().kind(), EventKind::NoteOff);
}

#[test]
fn running_status_survives_an_interleaved_meta_event() {
    enable_logging();
    let mut bytes = header_chunk(0, 1, 480);
    bytes.extend(track_chunk(&[
        0x00, 0x90, 60, 100, // note on, status sent
        0x00, 0xFF, 0x01, 0x02, b'h', b'i', // unrelated text meta event
        0x00, 64, 100, // running status note on, despite the meta event in between
    ]));
    let (_dir, path) = temp_midi_file(&bytes);
    let file = smf_stream::File::open(&path, 0, false).unwrap();
    let events: Vec<_> = file.iter().unwrap().map(Result::unwrap).collect();
    assert_eq!(events[2].event().kind(), EventKind::NoteOn);
    assert_eq!(events[2].event().note().unwrap(), 64);
}

#[test]
fn merge_tie_breaks_by_ascending_track_index() {
    enable_logging();
    let mut bytes = header_chunk(1, 2, 480);
    bytes.extend(track_chunk(&[0x00, 0x90, 60, 100])); // track 0, tick 0
    bytes.extend(track_chunk(&[0x00, 0x90, 61, 100])); // track 1, tick 0 (simultaneous)
    let (_dir, path) = temp_midi_file(&bytes);
    let file = smf_stream::File::open(&path, 0, false).unwrap();
    let events: Vec<_> = file.iter().unwrap().map(Result::unwrap).collect();
    assert_eq!(events[0].track_index(), 0);
    assert_eq!(events[1].track_index(), 1);
}

#[test]
fn missing_end_of_track_is_synthesized() {
    enable_logging();
    let mut bytes = header_chunk(0, 1, 480);
    bytes.extend(track_chunk_without_end_marker(&[0x00, 0x90, 60, 100]));
    let (_dir, path) = temp_midi_file(&bytes);
    let file = smf_stream::File::open(&path, 0, false).unwrap();
    let events: Vec<_> = file.iter().unwrap().map(Result::unwrap).collect();
    assert_eq!(events.len(), 2);
    assert_eq!(events[1].event().kind(), EventKind::EndOfTrack);
}

#[test]
fn format_2_rejects_merged_iteration_but_allows_per_track() {
    enable_logging();
    let mut bytes = header_chunk(2, 2, 480);
    bytes.extend(track_chunk(&[0x00, 0x90, 60, 100]));
    bytes.extend(track_chunk(&[0x00, 0x90, 61, 100]));
    let (_dir, path) = temp_midi_file(&bytes);
    let file = smf_stream::File::open(&path, 0, false).unwrap();
    assert_eq!(file.format_type(), Format::MultiSequence);
    assert!(file.iter().is_err());
    assert!(file.length_us().is_err());

    let track0: Vec<_> = file.track(0).unwrap().map(Result::unwrap).collect();
    assert_eq!(track0[0].event().note().unwrap(), 60);
    let track1: Vec<_> = file.track(1).unwrap().map(Result::unwrap).collect();
    assert_eq!(track1[0].event().note().unwrap(), 61);
}

#[test]
fn windowed_reading_matches_owned_reading() {
    enable_logging();
    let mut bytes = header_chunk(1, 2, 480);
    bytes.extend(track_chunk(&[
        0x00, 0x90, 60, 100, 100, 0x80, 60, 0, 50, 0xFF, 0x05, 3, b'r', b'o', b'w',
    ]));
    bytes.extend(track_chunk(&[30, 0x90, 64, 80, 90, 0x80, 64, 0]));
    let (_dir, path) = temp_midi_file(&bytes);

    let owned = smf_stream::File::open(&path, 0, false).unwrap();
    let windowed = smf_stream::File::open(&path, 3, false).unwrap();
    let a: Vec<_> = owned
        .iter()
        .unwrap()
        .map(|e| e.unwrap().event().data().to_vec())
        .collect();
    let b: Vec<_> = windowed
        .iter()
        .unwrap()
        .map(|e| e.unwrap().event().data().to_vec())
        .collect();
    assert_eq!(a, b);
}

#[test]
fn reuse_event_object_does_not_change_the_observed_values() {
    enable_logging();
    let mut bytes = header_chunk(0, 1, 480);
    bytes.extend(track_chunk(&[0x00, 0x90, 60, 100, 10, 0x80, 60, 0]));
    let (_dir, path) = temp_midi_file(&bytes);

    let independent = smf_stream::File::open(&path, 0, false).unwrap();
    let reused = smf_stream::File::open(&path, 0, true).unwrap();
    assert!(!independent.reuse_event_object());
    assert!(reused.reuse_event_object());

    let a: Vec<_> = independent
        .iter()
        .unwrap()
        .map(|e| e.unwrap().event().data().to_vec())
        .collect();
    let b: Vec<_> = reused
        .iter()
        .unwrap()
        .map(|e| e.unwrap().event().data().to_vec())
        .collect();
    assert_eq!(a, b);
}
