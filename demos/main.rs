//! Opens a MIDI file and prints its merged, tempo-mapped event stream.
//!
//! Pass a path on the command line to inspect your own file; with no argument this streams a
//! small embedded "Row, Row, Row Your Boat" fixture instead.

use smf_stream::File;
use std::env;
use std::fs;
use std::path::PathBuf;

// A format 1, one-track, 1024-ppq file: program change, track/instrument name, time signature,
// tempo, then the "Row, Row, Row Your Boat" melody as lyric/note-on/note-off triples.
const ROW_ROW_ROW: [u8; 144] = [
    0x4D, 0x54, 0x68, 0x64, 0x00, 0x00, 0x00, 0x06, 0x00, 0x01, 0x00, 0x01, 0x04, 0x00, //
    0x4D, 0x54, 0x72, 0x6B, 0x00, 0x00, 0x00, 0x7A, //
    0x00, 0xC0, 0x37, //
    0x00, 0xFF, 0x04, 0x04, 0x41, 0x6C, 0x74, 0x6F, //
    0x00, 0xFF, 0x03, 0x06, 0x53, 0x69, 0x6E, 0x67, 0x65, 0x72, //
    0x00, 0xFF, 0x58, 0x04, 0x06, 0x03, 0x20, 0x00, //
    0x00, 0xFF, 0x51, 0x03, 0x07, 0xE4, 0x79, //
    0x00, 0xFF, 0x05, 0x03, 0x52, 0x6F, 0x77, //
    0x00, 0x90, 0x48, 0x40, //
    0x8C, 0x00, 0x80, 0x48, 0x48, //
    0x00, 0xFF, 0x05, 0x03, 0x72, 0x6F, 0x77, //
    0x00, 0x90, 0x48, 0x40, //
    0x8C, 0x00, 0x80, 0x48, 0x40, //
    0x00, 0xFF, 0x05, 0x03, 0x72, 0x6F, 0x77, //
    0x00, 0x90, 0x48, 0x40, //
    0x88, 0x00, 0x80, 0x48, 0x40, //
    0x00, 0xFF, 0x05, 0x04, 0x79, 0x6F, 0x75, 0x72, //
    0x00, 0x90, 0x4A, 0x40, //
    0x84, 0x00, 0x80, 0x4A, 0x40, //
    0x00, 0xFF, 0x05, 0x04, 0x62, 0x6F, 0x61, 0x74, //
    0x00, 0x90, 0x4C, 0x40, //
    0x8C, 0x00, 0x80, 0x4C, 0x40, //
    0x00, 0xFF, 0x2F, 0x00,
];

fn main() -> smf_stream::Result<()> {
    env_logger::init();

    let (path, _cleanup) = match env::args().nth(1) {
        Some(arg) => (PathBuf::from(arg), None),
        None => {
            let path = env::temp_dir().join("row_row_row_your_boat.mid");
            fs::write(&path, ROW_ROW_ROW).expect("write embedded fixture");
            (path.clone(), Some(path))
        }
    };

    let file = File::open(&path, 256, false)?;
    println!(
        "format={:?} ppq={} tracks={}",
        file.format_type(),
        file.ppq(),
        file.num_tracks()
    );

    for scheduled in file.iter()? {
        let scheduled = scheduled?;
        let event = scheduled.event();
        print!("+{:>7}us ", scheduled.delta_us());
        match event.kind() {
            smf_stream::EventKind::NoteOn => {
                println!("note_on  note={} vel={}", event.note()?, event.velocity()?)
            }
            smf_stream::EventKind::NoteOff => {
                println!("note_off note={} vel={}", event.note()?, event.velocity()?)
            }
            smf_stream::EventKind::Lyric => println!("lyric    {:?}", event.text()?.as_str()),
            smf_stream::EventKind::SetTempo => println!("tempo    {} us/qn", event.tempo()?),
            smf_stream::EventKind::TrackName => println!("name     {:?}", event.text()?.as_str()),
            other => println!("{:?}", other),
        }
    }

    if let Some(cleanup) = _cleanup {
        let _ = fs::remove_file(cleanup);
    }
    Ok(())
}
