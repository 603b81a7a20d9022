//! In-memory containers.
//!
//! [`MemorySource`] describes a source movie as plain track formats and
//! samples, [`MemoryDemuxer`] reads it with the cursor semantics of
//! [`Demuxer`], and [`MemoryMuxer`] records everything written to it in a
//! shared [`MuxedMovie`] that stays inspectable after the muxer is dropped.

use crate::traits::{ContainerFactory, Demuxer, MovieSettings, Muxer, SeekMode};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, trace};
use vidcompress_core::error::{ContainerError, Error, MuxerError, Result};
use vidcompress_core::format::MediaFormat;
use vidcompress_core::sample::{SampleFlags, SampleInfo};

/// One stored sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredSample {
    /// Owning track index.
    pub track: usize,
    /// Presentation timestamp in microseconds.
    pub presentation_time_us: i64,
    /// Sample flags.
    pub flags: SampleFlags,
    /// Sample payload.
    pub data: Vec<u8>,
}

/// Source movie held in memory.
///
/// Samples of all tracks are kept interleaved in presentation order, the
/// way a real container stores them.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    tracks: Vec<MediaFormat>,
    samples: Vec<StoredSample>,
}

impl MemorySource {
    /// Create an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a track and return its index.
    pub fn add_track(&mut self, format: MediaFormat) -> usize {
        self.tracks.push(format);
        self.tracks.len() - 1
    }

    /// Append a sample to a track.
    ///
    /// Samples are re-sorted by timestamp; samples with equal timestamps
    /// keep insertion order.
    pub fn add_sample(
        &mut self,
        track: usize,
        presentation_time_us: i64,
        flags: SampleFlags,
        data: Vec<u8>,
    ) -> Result<()> {
        let format = self
            .tracks
            .get_mut(track)
            .ok_or(ContainerError::TrackNotFound { index: track })?;
        let needed = format.max_input_size.unwrap_or(0).max(data.len());
        format.max_input_size = Some(needed);

        let position = self
            .samples
            .partition_point(|s| s.presentation_time_us <= presentation_time_us);
        self.samples.insert(
            position,
            StoredSample {
                track,
                presentation_time_us,
                flags,
                data,
            },
        );
        Ok(())
    }

    /// Track formats.
    pub fn tracks(&self) -> &[MediaFormat] {
        &self.tracks
    }

    /// Samples of one track in presentation order.
    pub fn track_samples(&self, track: usize) -> impl Iterator<Item = &StoredSample> {
        self.samples.iter().filter(move |s| s.track == track)
    }
}

/// Cursor-based reader over a [`MemorySource`].
pub struct MemoryDemuxer {
    source: Arc<MemorySource>,
    selected: Option<usize>,
    cursor: usize,
    yield_unselected: bool,
    released: bool,
    release_counter: Option<Arc<AtomicUsize>>,
}

impl MemoryDemuxer {
    /// Create a demuxer over a shared source.
    pub fn new(source: Arc<MemorySource>) -> Self {
        Self {
            source,
            selected: None,
            cursor: 0,
            yield_unselected: false,
            released: false,
            release_counter: None,
        }
    }

    /// Also surface samples of unselected tracks once a track is selected.
    ///
    /// Some platform extractors leak interleaved samples of other tracks;
    /// readers must skip them.
    #[must_use]
    pub fn with_unselected_samples(mut self, enabled: bool) -> Self {
        self.yield_unselected = enabled;
        self
    }

    fn with_release_counter(mut self, counter: Arc<AtomicUsize>) -> Self {
        self.release_counter = Some(counter);
        self
    }

    /// Whether [`Demuxer::release`] was called.
    pub fn is_released(&self) -> bool {
        self.released
    }

    fn is_visible(&self, sample: &StoredSample) -> bool {
        match self.selected {
            Some(track) => self.yield_unselected || sample.track == track,
            None => false,
        }
    }

    fn skip_hidden(&mut self) {
        while let Some(sample) = self.source.samples.get(self.cursor) {
            if self.is_visible(sample) {
                break;
            }
            self.cursor += 1;
        }
    }

    fn current(&self) -> Option<&StoredSample> {
        if self.released {
            return None;
        }
        self.source
            .samples
            .get(self.cursor)
            .filter(|s| self.is_visible(s))
    }

    fn sync_candidates(&self, track: usize) -> Vec<(usize, i64)> {
        let track_samples: Vec<(usize, &StoredSample)> = self
            .source
            .samples
            .iter()
            .enumerate()
            .filter(|(_, s)| s.track == track)
            .collect();
        let has_key_frames = track_samples
            .iter()
            .any(|(_, s)| s.flags.contains(SampleFlags::KEY_FRAME));
        track_samples
            .into_iter()
            .filter(|(_, s)| !has_key_frames || s.flags.contains(SampleFlags::KEY_FRAME))
            .map(|(i, s)| (i, s.presentation_time_us))
            .collect()
    }
}

impl Demuxer for MemoryDemuxer {
    fn track_count(&self) -> usize {
        self.source.tracks.len()
    }

    fn track_format(&self, index: usize) -> Result<MediaFormat> {
        self.source
            .tracks
            .get(index)
            .cloned()
            .ok_or_else(|| ContainerError::TrackNotFound { index }.into())
    }

    fn select_track(&mut self, index: usize) -> Result<()> {
        if index >= self.source.tracks.len() {
            return Err(ContainerError::TrackNotFound { index }.into());
        }
        match self.selected {
            Some(active) if active != index => Err(ContainerError::TrackAlreadySelected {
                active,
                requested: index,
            }
            .into()),
            _ => {
                self.selected = Some(index);
                self.skip_hidden();
                Ok(())
            }
        }
    }

    fn unselect_track(&mut self, index: usize) -> Result<()> {
        if index >= self.source.tracks.len() {
            return Err(ContainerError::TrackNotFound { index }.into());
        }
        if self.selected == Some(index) {
            self.selected = None;
        }
        Ok(())
    }

    fn seek_to(&mut self, timestamp_us: i64, mode: SeekMode) -> Result<()> {
        let Some(track) = self.selected else {
            self.cursor = 0;
            return Ok(());
        };
        let candidates = self.sync_candidates(track);
        let target = match mode {
            SeekMode::PreviousSync => candidates
                .iter()
                .rev()
                .find(|(_, ts)| *ts <= timestamp_us)
                .or_else(|| candidates.first()),
            SeekMode::NextSync => candidates.iter().find(|(_, ts)| *ts >= timestamp_us),
            SeekMode::ClosestSync => candidates
                .iter()
                .min_by_key(|(_, ts)| (ts - timestamp_us).unsigned_abs()),
        };
        self.cursor = target
            .map(|(index, _)| *index)
            .unwrap_or(self.source.samples.len());
        self.skip_hidden();
        trace!(track, timestamp_us, cursor = self.cursor, "Seek");
        Ok(())
    }

    fn sample_track_index(&self) -> Option<usize> {
        self.current().map(|s| s.track)
    }

    fn sample_time(&self) -> Option<i64> {
        self.current().map(|s| s.presentation_time_us)
    }

    fn sample_flags(&self) -> SampleFlags {
        self.current().map(|s| s.flags).unwrap_or_default()
    }

    fn read_sample_data(&mut self, buffer: &mut [u8]) -> Result<Option<usize>> {
        if self.released {
            return Err(ContainerError::Other("demuxer already released".into()).into());
        }
        let Some(sample) = self.current() else {
            return Ok(None);
        };
        let size = sample.data.len();
        if size > buffer.len() {
            return Err(ContainerError::BufferTooSmall {
                needed: size,
                available: buffer.len(),
            }
            .into());
        }
        buffer[..size].copy_from_slice(&sample.data);
        Ok(Some(size))
    }

    fn advance(&mut self) -> bool {
        if self.current().is_none() {
            return false;
        }
        self.cursor += 1;
        self.skip_hidden();
        self.current().is_some()
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.selected = None;
        if let Some(counter) = &self.release_counter {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// One sample as written to a [`MemoryMuxer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MuxedSample {
    /// Presentation timestamp in microseconds.
    pub presentation_time_us: i64,
    /// Sample flags.
    pub flags: SampleFlags,
    /// Sample payload.
    pub data: Vec<u8>,
}

/// One track of a written movie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MuxedTrack {
    /// Registered format.
    pub format: MediaFormat,
    /// Whether the track was registered as audio.
    pub is_audio: bool,
    /// Samples in write order.
    pub samples: Vec<MuxedSample>,
}

/// Everything written to a [`MemoryMuxer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MuxedMovie {
    /// Movie-level settings.
    pub settings: MovieSettings,
    /// Registered tracks.
    pub tracks: Vec<MuxedTrack>,
    /// Whether finalize succeeded.
    pub finalized: bool,
    /// Number of finalize calls, successful or not.
    pub finalize_calls: usize,
}

impl MuxedMovie {
    fn new(settings: MovieSettings) -> Self {
        Self {
            settings,
            tracks: Vec::new(),
            finalized: false,
            finalize_calls: 0,
        }
    }

    /// First track registered with the given kind.
    pub fn track(&self, is_audio: bool) -> Option<&MuxedTrack> {
        self.tracks.iter().find(|t| t.is_audio == is_audio)
    }
}

/// Shared view of a movie being written.
#[derive(Debug, Clone)]
pub struct MuxedMovieHandle(Arc<Mutex<MuxedMovie>>);

impl MuxedMovieHandle {
    /// Copy of the current state.
    pub fn snapshot(&self) -> MuxedMovie {
        self.0.lock().clone()
    }

    /// Whether finalize succeeded.
    pub fn is_finalized(&self) -> bool {
        self.0.lock().finalized
    }

    /// Number of finalize calls.
    pub fn finalize_calls(&self) -> usize {
        self.0.lock().finalize_calls
    }
}

/// Failures a [`MemoryMuxer`] can be told to produce.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MuxerFaults {
    /// Fail every write once this many samples were stored.
    pub fail_write_after: Option<usize>,
    /// Fail finalize.
    pub fail_finalize: bool,
}

/// Muxer that stores samples in memory.
pub struct MemoryMuxer {
    movie: Arc<Mutex<MuxedMovie>>,
    faults: MuxerFaults,
    written: usize,
}

impl MemoryMuxer {
    /// Create a muxer with the given movie settings.
    pub fn new(settings: MovieSettings) -> Self {
        Self {
            movie: Arc::new(Mutex::new(MuxedMovie::new(settings))),
            faults: MuxerFaults::default(),
            written: 0,
        }
    }

    /// Inject failures.
    #[must_use]
    pub fn with_faults(mut self, faults: MuxerFaults) -> Self {
        self.faults = faults;
        self
    }

    /// Handle to the written movie.
    pub fn handle(&self) -> MuxedMovieHandle {
        MuxedMovieHandle(Arc::clone(&self.movie))
    }
}

impl Muxer for MemoryMuxer {
    fn add_track(&mut self, format: &MediaFormat, is_audio: bool) -> Result<usize> {
        let mut movie = self.movie.lock();
        if movie.finalized {
            return Err(MuxerError::AlreadyFinalized.into());
        }
        movie.tracks.push(MuxedTrack {
            format: format.clone(),
            is_audio,
            samples: Vec::new(),
        });
        let index = movie.tracks.len() - 1;
        debug!(index, is_audio, mime = %format.mime, "Added track");
        Ok(index)
    }

    fn write_sample_data(
        &mut self,
        track_index: usize,
        buffer: &[u8],
        info: &SampleInfo,
        is_audio: bool,
    ) -> Result<bool> {
        let mut movie = self.movie.lock();
        if movie.finalized {
            return Err(MuxerError::AlreadyFinalized.into());
        }
        let track = movie
            .tracks
            .get_mut(track_index)
            .ok_or(MuxerError::UnknownTrack(track_index))?;
        if track.is_audio != is_audio {
            return Err(MuxerError::KindMismatch(track_index).into());
        }
        if info.size == 0 {
            return Ok(false);
        }
        if let Some(limit) = self.faults.fail_write_after {
            if self.written >= limit {
                return Err(MuxerError::Write(format!("injected failure after {limit} samples")).into());
            }
        }
        let data = buffer.get(info.range()).ok_or_else(|| {
            MuxerError::Write(format!(
                "sample range {:?} exceeds buffer of {} bytes",
                info.range(),
                buffer.len()
            ))
        })?;
        track.samples.push(MuxedSample {
            presentation_time_us: info.presentation_time_us,
            flags: info.flags,
            data: data.to_vec(),
        });
        self.written += 1;
        Ok(true)
    }

    fn finalize(&mut self) -> Result<()> {
        let mut movie = self.movie.lock();
        movie.finalize_calls += 1;
        if movie.finalized {
            return Err(MuxerError::AlreadyFinalized.into());
        }
        if self.faults.fail_finalize {
            return Err(MuxerError::Finalize("injected failure".into()).into());
        }
        movie.finalized = true;
        debug!(tracks = movie.tracks.len(), "Finalized movie");
        Ok(())
    }
}

#[derive(Default)]
struct FactoryState {
    sources: HashMap<PathBuf, Arc<MemorySource>>,
    outputs: HashMap<PathBuf, MuxedMovieHandle>,
}

/// [`ContainerFactory`] over registered in-memory sources.
///
/// Cloning yields another view of the same registry.
#[derive(Clone, Default)]
pub struct MemoryContainerFactory {
    state: Arc<Mutex<FactoryState>>,
    faults: MuxerFaults,
    yield_unselected: bool,
    opened: Arc<AtomicUsize>,
    released: Arc<AtomicUsize>,
}

impl MemoryContainerFactory {
    /// Create an empty factory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a source under `path`.
    pub fn insert_source(&self, path: impl Into<PathBuf>, source: MemorySource) {
        self.state.lock().sources.insert(path.into(), Arc::new(source));
    }

    /// Inject failures into every muxer created from now on.
    #[must_use]
    pub fn with_muxer_faults(mut self, faults: MuxerFaults) -> Self {
        self.faults = faults;
        self
    }

    /// Make demuxers surface samples of unselected tracks.
    #[must_use]
    pub fn with_unselected_samples(mut self, enabled: bool) -> Self {
        self.yield_unselected = enabled;
        self
    }

    /// Movie written to `path`, if a muxer was created for it.
    pub fn output(&self, path: &Path) -> Option<MuxedMovieHandle> {
        self.state.lock().outputs.get(path).cloned()
    }

    /// Number of demuxers opened.
    pub fn demuxers_opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    /// Number of demuxers released.
    pub fn demuxers_released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }
}

impl ContainerFactory for MemoryContainerFactory {
    fn open_demuxer(&self, path: &Path) -> Result<Box<dyn Demuxer>> {
        let source = self
            .state
            .lock()
            .sources
            .get(path)
            .cloned()
            .ok_or_else(|| Error::unreadable(format!("no source at {}", path.display())))?;
        self.opened.fetch_add(1, Ordering::SeqCst);
        let demuxer = MemoryDemuxer::new(source)
            .with_unselected_samples(self.yield_unselected)
            .with_release_counter(Arc::clone(&self.released));
        Ok(Box::new(demuxer))
    }

    fn create_muxer(&self, path: &Path, settings: MovieSettings) -> Result<Box<dyn Muxer>> {
        let muxer = MemoryMuxer::new(settings).with_faults(self.faults);
        self.state
            .lock()
            .outputs
            .insert(path.to_path_buf(), muxer.handle());
        Ok(Box::new(muxer))
    }
}
