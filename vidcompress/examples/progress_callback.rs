//! Progress callback example.
//!
//! Compresses a synthetic movie held in memory with the scripted codecs
//! from `vidcompress_pipeline::testing`, printing a progress bar from a
//! callback sink.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example progress_callback -- 640 360
//! ```

use std::env;
use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;
use vidcompress::{
    CallbackSink, Collaborators, CompressionOptions, Compressor, CompressorConfig,
    DevicePlatform, ProgressEvent, Result, SoftwareGraphics,
};
use vidcompress_containers::MemoryContainerFactory;
use vidcompress_pipeline::testing::{sample_movie, FakeCodecs, MovieSpec};

fn draw_bar(percentage: i64) {
    let filled = (percentage.clamp(0, 100) / 5) as usize;
    print!("\r[{}{}] {:3}%", "#".repeat(filled), " ".repeat(20 - filled), percentage);
    let _ = io::stdout().flush();
}

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    let width = args.get(1).and_then(|s| s.parse().ok()).unwrap_or(640);
    let height = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(360);

    let dir = tempfile::tempdir()?;
    let source = dir.path().join("input.mp4");
    let destination = dir.path().join("output.mp4");
    std::fs::write(&source, b"placeholder")?;

    let containers = Arc::new(MemoryContainerFactory::new());
    containers.insert_source(
        &source,
        sample_movie(&MovieSpec {
            width: 1280,
            height: 720,
            frame_count: 90,
            ..Default::default()
        })?,
    );

    let collaborators = Collaborators::new(
        containers.clone(),
        Arc::new(FakeCodecs::surface()),
        Arc::new(SoftwareGraphics::new().with_frame_wait(Duration::from_millis(200))),
    );
    let config = CompressorConfig::default()
        .with_platform(DevicePlatform::new("google", "pixel", 23))
        .delete_source_on_success(false);
    let compressor = Compressor::with_config(collaborators, config)?;

    let sink = CallbackSink::new(|event| match event {
        ProgressEvent::Progress(progress) => draw_bar(progress.percentage()),
        ProgressEvent::Completed(outcome) => println!("\nDone: {outcome:?}"),
        ProgressEvent::Failed(reason) => println!("\nFailed: {reason}"),
    });
    let handle = compressor.compress(
        &source,
        &destination,
        CompressionOptions::new().resolution(width, height),
        Box::new(sink),
    )?;
    let report = handle.join()?;

    println!(
        "{}x{} at {} bps, {} video / {:?} audio samples in {:?}",
        report.params.width,
        report.params.height,
        report.params.bitrate,
        report.tracks.video_samples,
        report.tracks.audio_samples,
        report.elapsed
    );
    if let Some(movie) = containers.output(&destination) {
        println!("Output tracks: {}", movie.snapshot().tracks.len());
    }
    Ok(())
}
