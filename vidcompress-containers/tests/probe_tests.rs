//! Metadata probing over container collaborators.

use std::path::Path;
use std::sync::Arc;
use vidcompress_containers::{
    find_track, ContainerFactory, ContainerProbe, MemoryContainerFactory, MemorySource,
    MetadataProbe,
};
use vidcompress_core::{Error, MediaFormat, Rotation, SampleFlags, MIME_VIDEO_AVC};

fn movie(rotation: Option<Rotation>) -> MemorySource {
    let mut source = MemorySource::new();
    source.add_track(MediaFormat::audio("audio/mp4a-latm", 44_100, 2));
    let mut video = MediaFormat::video(MIME_VIDEO_AVC, 1920, 1080).with_duration_us(4_000_000);
    video.rotation = rotation;
    let track = source.add_track(video);
    source
        .add_sample(track, 0, SampleFlags::KEY_FRAME, vec![1, 2, 3])
        .unwrap();
    source
}

#[test]
fn test_probe_reads_video_track() {
    let factory = MemoryContainerFactory::new();
    factory.insert_source("/clip.mp4", movie(Some(Rotation::Deg90)));
    let probe = ContainerProbe::new(Arc::new(factory.clone()));

    let metadata = probe.probe(Path::new("/clip.mp4")).unwrap();
    assert_eq!(metadata.width, 1920);
    assert_eq!(metadata.height, 1080);
    assert_eq!(metadata.rotation, Rotation::Deg90);
    assert_eq!(metadata.duration_us, 4_000_000);
    assert_eq!(factory.demuxers_released(), 1);
}

#[test]
fn test_probe_defaults_rotation() {
    let factory = MemoryContainerFactory::new();
    factory.insert_source("/clip.mp4", movie(None));
    let probe = ContainerProbe::new(Arc::new(factory));
    let metadata = probe.probe(Path::new("/clip.mp4")).unwrap();
    assert_eq!(metadata.rotation, Rotation::Deg0);
}

#[test]
fn test_probe_without_video_track() {
    let factory = MemoryContainerFactory::new();
    let mut source = MemorySource::new();
    source.add_track(MediaFormat::audio("audio/mp4a-latm", 44_100, 2));
    factory.insert_source("/audio.m4a", source);
    let probe = ContainerProbe::new(Arc::new(factory.clone()));

    let err = probe.probe(Path::new("/audio.m4a")).unwrap_err();
    assert!(matches!(err, Error::UnreadableSource(_)));
    assert_eq!(factory.demuxers_released(), 1);
}

#[test]
fn test_find_track_takes_first_of_kind() {
    let factory = MemoryContainerFactory::new();
    let mut source = movie(None);
    source.add_track(MediaFormat::video(MIME_VIDEO_AVC, 320, 240));
    factory.insert_source("/two.mp4", source);

    let demuxer = factory.open_demuxer(Path::new("/two.mp4")).unwrap();
    assert_eq!(find_track(demuxer.as_ref(), true), Some(0));
    assert_eq!(find_track(demuxer.as_ref(), false), Some(1));
}

#[test]
fn test_find_track_not_found() {
    let factory = MemoryContainerFactory::new();
    factory.insert_source("/empty.mp4", MemorySource::new());
    let demuxer = factory.open_demuxer(Path::new("/empty.mp4")).unwrap();
    assert_eq!(find_track(demuxer.as_ref(), true), None);
    assert_eq!(find_track(demuxer.as_ref(), false), None);
}
