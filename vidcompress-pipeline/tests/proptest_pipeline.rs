//! Property-based tests for parameter-set splitting, windows, the step
//! table and track copying.

use proptest::prelude::*;
use std::sync::Arc;
use vidcompress_containers::memory::{MemoryDemuxer, MemoryMuxer, MemorySource};
use vidcompress_containers::traits::MovieSettings;
use vidcompress_core::format::{MediaFormat, Rotation, Track};
use vidcompress_core::sample::SampleFlags;
use vidcompress_pipeline::{
    next_step, split_parameter_sets, CodecMachine, CodecState, Step, TimeWindow, TrackCopier,
    START_CODE,
};

/// NAL bodies free of zero bytes, so they never contain a start code.
fn nal_body() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(2u8..=255, 1..32)
}

fn codec_state() -> impl Strategy<Value = CodecState> {
    prop_oneof![
        Just(CodecState::NeedsInput),
        Just(CodecState::HasOutput),
        Just(CodecState::Draining),
        Just(CodecState::Done),
    ]
}

/// Sample gap, key-frame flag and payload.
fn copied_sample() -> impl Strategy<Value = (i64, bool, Vec<u8>)> {
    (1i64..50_000, any::<bool>(), prop::collection::vec(any::<u8>(), 1..64))
}

proptest! {
    /// An unbounded copy keeps every sample's timestamp, flags and payload
    /// in order, with samples of other tracks interleaved.
    #[test]
    fn unbounded_copy_preserves_samples(samples in prop::collection::vec(copied_sample(), 1..40)) {
        let mut source = MemorySource::new();
        let audio = source.add_track(MediaFormat::audio("audio/mp4a-latm", 44_100, 2));
        let video = source.add_track(MediaFormat::video("video/avc", 16, 16));
        let mut pts = 0i64;
        for (i, (gap, key, data)) in samples.iter().enumerate() {
            let flags = if i == 0 || *key { SampleFlags::KEY_FRAME } else { SampleFlags::empty() };
            source.add_sample(audio, pts, flags, data.clone()).unwrap();
            source.add_sample(video, pts + gap / 2, SampleFlags::empty(), vec![0; 3]).unwrap();
            pts += gap;
        }
        let expected: Vec<(i64, SampleFlags, Vec<u8>)> = source
            .track_samples(audio)
            .map(|s| (s.presentation_time_us, s.flags, s.data.clone()))
            .collect();

        let track = Track::new(audio, true, source.tracks()[audio].clone());
        let mut demuxer = MemoryDemuxer::new(Arc::new(source));
        let mut muxer = MemoryMuxer::new(MovieSettings {
            rotation: Rotation::Deg0,
            width: 16,
            height: 16,
        });
        let handle = muxer.handle();
        let outcome = TrackCopier::new()
            .copy(&mut demuxer, &mut muxer, &track, TimeWindow::unbounded(), None)
            .unwrap();
        prop_assert_eq!(outcome.samples_written, expected.len());

        let movie = handle.snapshot();
        let copied: Vec<(i64, SampleFlags, Vec<u8>)> = movie
            .track(true)
            .unwrap()
            .samples
            .iter()
            .map(|s| (s.presentation_time_us, s.flags, s.data.clone()))
            .collect();
        prop_assert_eq!(copied, expected);
    }

    /// SPS and PPS are recovered exactly, start codes included.
    #[test]
    fn split_recovers_both_sets(sps_body in nal_body(), pps_body in nal_body()) {
        let sps: Vec<u8> = START_CODE.iter().copied().chain(sps_body).collect();
        let pps: Vec<u8> = START_CODE.iter().copied().chain(pps_body).collect();
        let csd = [sps.as_slice(), pps.as_slice()].concat();

        let (first, second) = split_parameter_sets(&csd).unwrap();
        prop_assert_eq!(first, sps.as_slice());
        prop_assert_eq!(second, pps.as_slice());
    }

    /// A single parameter set is never split.
    #[test]
    fn single_set_is_not_split(body in nal_body()) {
        let csd: Vec<u8> = START_CODE.iter().copied().chain(body).collect();
        prop_assert!(split_parameter_sets(&csd).is_none());
    }

    /// Clamping keeps the window inside the duration.
    #[test]
    fn clamped_window_within_duration(
        start in -1_000_000i64..10_000_000,
        end in proptest::option::of(-1_000_000i64..10_000_000),
        duration in 1i64..5_000_000,
    ) {
        let window = TimeWindow::new(start, end).clamped(duration);
        prop_assert!((0..=duration).contains(&window.start_us));
        if let Some(end) = window.end_us {
            prop_assert!((0..=duration).contains(&end));
        }
    }

    /// Timestamps inside a non-empty window are neither before it nor past it.
    #[test]
    fn window_membership(start in 0i64..1_000_000, len in 1i64..1_000_000, offset in 0i64..1_000_000) {
        let window = TimeWindow::new(start, Some(start + len));
        let ts = start + offset % len;
        prop_assert!(!window.is_before_start(ts));
        prop_assert!(!window.has_ended(ts));
        prop_assert!(window.has_ended(start + len));
    }

    /// A finished encoder always ends the cycle; pending encoder output is
    /// always drained before decoder output.
    #[test]
    fn step_priorities(decoder in codec_state(), encoder in codec_state()) {
        let step = next_step(decoder, encoder);
        match encoder {
            CodecState::Done => prop_assert_eq!(step, Step::Finish),
            CodecState::HasOutput => prop_assert_eq!(step, Step::DrainEncoder),
            _ if decoder == CodecState::HasOutput => prop_assert_eq!(step, Step::DrainDecoder),
            _ => prop_assert_eq!(step, Step::Idle),
        }
    }

    /// Once done, a machine stays done whatever happens next.
    #[test]
    fn done_is_absorbing(events in prop::collection::vec(0u8..4, 0..16)) {
        let mut machine = CodecMachine::new();
        machine.on_end_of_stream();
        for event in events {
            match event {
                0 => machine.rearm(),
                1 => machine.on_try_again(),
                2 => machine.on_output(),
                _ => machine.end_input(),
            }
        }
        prop_assert!(machine.is_done());
    }
}
