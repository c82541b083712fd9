use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use smfplay::smf::vlq;
use smfplay::{DisplayUpdate, Sequence, Sequencer};

fn push_event(body: &mut Vec<u8>, delta: u32, bytes: &[u8]) {
    body.extend(vlq::encode(delta));
    body.extend_from_slice(bytes);
}

/// Format 1 file with a conductor track and `tracks` note tracks using running status
fn generate_file(tracks: usize, notes_per_track: usize) -> Vec<u8> {
    let mut chunks = Vec::new();

    let mut conductor = Vec::new();
    push_event(&mut conductor, 0, &[0xFF, 0x58, 4, 4, 2, 24, 8]);
    for i in 0..notes_per_track / 64 {
        let tempo = (400_000 + (i % 8) * 25_000) as u32;
        let b = tempo.to_be_bytes();
        let delta = if i == 0 { 0 } else { 7680 };
        push_event(&mut conductor, delta, &[0xFF, 0x51, 3, b[1], b[2], b[3]]);
    }
    push_event(&mut conductor, 0, &[0xFF, 0x2F, 0]);
    chunks.push(conductor);

    for track in 0..tracks {
        let channel = (track % 16) as u8;
        let mut body = Vec::new();
        let digit = b'0' + (track % 10) as u8;
        push_event(&mut body, 0, &[0xFF, 0x03, 5, b'P', b'a', b'r', b't', digit]);
        push_event(&mut body, 0, &[0x90 | channel, 60, 100]);
        for i in 1..notes_per_track {
            let note = 48 + (i % 24) as u8;
            push_event(&mut body, 120, &[note, 100]);
            push_event(&mut body, 120, &[note, 0]);
        }
        push_event(&mut body, 0, &[0xFF, 0x2F, 0]);
        chunks.push(body);
    }

    let mut out = b"MThd".to_vec();
    out.extend_from_slice(&6u32.to_be_bytes());
    out.extend_from_slice(&1u16.to_be_bytes());
    out.extend_from_slice(&(chunks.len() as u16).to_be_bytes());
    out.extend_from_slice(&480u16.to_be_bytes());
    for body in chunks {
        out.extend_from_slice(b"MTrk");
        out.extend_from_slice(&(body.len() as u32).to_be_bytes());
        out.extend(body);
    }
    out
}

/// Whole-file decode including index building and sorting
fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");

    for tracks in [1, 4, 16] {
        let bytes = generate_file(tracks, 2_000);
        group.bench_with_input(BenchmarkId::from_parameter(tracks), &bytes, |b, bytes| {
            b.iter(|| black_box(Sequence::decode(black_box(bytes))));
        });
    }
    group.finish();
}

fn bench_vlq(c: &mut Criterion) {
    let encoded: Vec<Vec<u8>> = [0u32, 0x7F, 0x3FFF, 0x1F_FFFF, vlq::MAX_VALUE]
        .iter()
        .map(|&v| vlq::encode(v))
        .collect();

    c.bench_function("vlq_decode", |b| {
        b.iter(|| {
            for bytes in &encoded {
                black_box(vlq::decode(black_box(bytes)).ok());
            }
        });
    });
}

/// Seeking restores the musical context and repositions every cursor
fn bench_seek(c: &mut Criterion) {
    let sequence = Sequence::decode(&generate_file(16, 2_000)).expect("generated file decodes");
    let tick_length = sequence.tick_length;
    let mut sequencer = Sequencer::new(Vec::<Vec<u8>>::new(), Vec::<DisplayUpdate>::new());
    sequencer.load(sequence);

    c.bench_function("seek_16_tracks", |b| {
        let mut target = 0;
        b.iter(|| {
            target = (target + 7_919) % tick_length.max(1);
            sequencer.seek(black_box(target));
            sequencer.midi_sink_mut().clear();
            sequencer.display_sink_mut().clear();
        });
    });
}

/// One playback interval with every channel busy
fn bench_interval(c: &mut Criterion) {
    let sequence = Sequence::decode(&generate_file(16, 2_000)).expect("generated file decodes");
    let mut sequencer = Sequencer::new(Vec::<Vec<u8>>::new(), Vec::<DisplayUpdate>::new());
    sequencer.load(sequence);

    c.bench_function("on_interval_16_tracks", |b| {
        b.iter(|| {
            if !sequencer.on_interval() {
                sequencer.play();
            }
            sequencer.midi_sink_mut().clear();
            sequencer.display_sink_mut().clear();
        });
    });
}

criterion_group!(benches, bench_decode, bench_vlq, bench_seek, bench_interval);
criterion_main!(benches);
