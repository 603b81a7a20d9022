//! Worker-thread entry point.

use crate::config::CompressorConfig;
use crate::job::{CompressionJob, CompressionReport};
use crate::options::CompressionOptions;
use parking_lot::Mutex;
use std::any::Any;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{error, info};
use vidcompress_containers::{ContainerFactory, ContainerProbe, MetadataProbe};
use vidcompress_core::cancel::CancellationToken;
use vidcompress_core::error::{Error, Result};
use vidcompress_core::progress::{ProgressEvent, ProgressSink};
use vidcompress_hwaccel::CodecCatalog;
use vidcompress_pipeline::GraphicsBackend;

/// Platform services a job runs against.
#[derive(Clone)]
pub struct Collaborators {
    /// Opens sources and creates destinations.
    pub containers: Arc<dyn ContainerFactory>,
    /// Reads source metadata.
    pub probe: Arc<dyn MetadataProbe>,
    /// Lists and creates codecs.
    pub codecs: Arc<dyn CodecCatalog>,
    /// Creates frame transforms.
    pub graphics: Arc<dyn GraphicsBackend>,
}

impl Collaborators {
    /// Collaborators that probe through the container factory.
    pub fn new(
        containers: Arc<dyn ContainerFactory>,
        codecs: Arc<dyn CodecCatalog>,
        graphics: Arc<dyn GraphicsBackend>,
    ) -> Self {
        Self {
            probe: Arc::new(ContainerProbe::new(containers.clone())),
            containers,
            codecs,
            graphics,
        }
    }

    /// Replace the metadata probe.
    #[must_use]
    pub fn with_probe(mut self, probe: Arc<dyn MetadataProbe>) -> Self {
        self.probe = probe;
        self
    }
}

/// Runs compression jobs, one worker thread per job.
#[derive(Clone)]
pub struct Compressor {
    collaborators: Collaborators,
    config: CompressorConfig,
}

impl Compressor {
    /// Create a compressor with the default configuration.
    pub fn new(collaborators: Collaborators) -> Self {
        Self {
            collaborators,
            config: CompressorConfig::default(),
        }
    }

    /// Create a compressor with a validated configuration.
    pub fn with_config(collaborators: Collaborators, config: CompressorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            collaborators,
            config,
        })
    }

    /// Configuration in use.
    pub fn config(&self) -> &CompressorConfig {
        &self.config
    }

    /// Build a job without starting it.
    pub fn job(
        &self,
        source: impl Into<PathBuf>,
        destination: impl Into<PathBuf>,
        options: CompressionOptions,
    ) -> CompressionJob {
        CompressionJob::new(
            self.collaborators.clone(),
            self.config.clone(),
            source,
            destination,
            options,
        )
    }

    /// Compress `source` into `destination` on a new worker thread.
    ///
    /// Progress and the terminal event go to `sink` from the worker. A
    /// worker that panics still delivers a failure event.
    pub fn compress(
        &self,
        source: impl Into<PathBuf>,
        destination: impl Into<PathBuf>,
        options: CompressionOptions,
        sink: Box<dyn ProgressSink>,
    ) -> Result<CompressionHandle> {
        let cancel = CancellationToken::new();
        let job = self
            .job(source, destination, options)
            .with_cancellation(cancel.clone());
        info!(source = %job.source().display(), "Spawning compression worker");

        let sink = Arc::new(WorkerSink::new(sink));
        let thread = std::thread::Builder::new()
            .name("vidcompress-job".to_string())
            .spawn(move || {
                let _guard = UnwindGuard(sink.clone());
                job.run(Box::new(sink))
            })?;

        Ok(CompressionHandle { thread, cancel })
    }
}

/// Forwards events to the caller's sink and notes whether a terminal event
/// went out.
struct WorkerSink {
    inner: Mutex<Box<dyn ProgressSink>>,
    terminated: AtomicBool,
}

impl WorkerSink {
    fn new(inner: Box<dyn ProgressSink>) -> Self {
        Self {
            inner: Mutex::new(inner),
            terminated: AtomicBool::new(false),
        }
    }

    fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::SeqCst)
    }
}

impl ProgressSink for WorkerSink {
    fn on_event(&self, event: ProgressEvent) {
        if event.is_terminal() {
            self.terminated.store(true, Ordering::SeqCst);
        }
        self.inner.lock().on_event(event);
    }
}

/// Fails the job's event stream when the worker unwinds before a terminal
/// event.
struct UnwindGuard(Arc<WorkerSink>);

impl Drop for UnwindGuard {
    fn drop(&mut self) {
        if std::thread::panicking() && !self.0.is_terminated() {
            let err = Error::WorkerPanicked("job ended without a result".into());
            error!(error = %err, "Compression worker unwound");
            self.0.on_event(ProgressEvent::Failed(err.to_string()));
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Handle to a running job.
pub struct CompressionHandle {
    thread: JoinHandle<Result<CompressionReport>>,
    cancel: CancellationToken,
}

impl CompressionHandle {
    /// Ask the job to stop at its next safe point.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Token observed by the job.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Whether the worker has exited.
    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Wait for the job to end.
    pub fn join(self) -> Result<CompressionReport> {
        self.thread
            .join()
            .map_err(|payload| Error::WorkerPanicked(panic_message(payload.as_ref())))?
    }
}
