//! Compression job orchestration
//!
//! A [`Compressor`] runs at most one job at a time. Each job opens the source
//! on a blocking worker, plans the encode, then streams frames from a decode
//! stage to an encode stage. Failed or cancelled jobs remove their partial
//! output before reporting.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::adapters::toml_config::Settings;
use crate::adapters::{LibavBackend, LocalFsAdapter};
use crate::domain::model::{CompressionTarget, EncodePlan, VideoAsset};
use crate::domain::rules::JobPlanner;
use crate::engine::stages::{self, JobMonitor, WriteJob};
use crate::engine::{
    CancelToken, CompressRequest, CompressionCallback, CompressionReport, JobPhase,
    ProgressReporter,
};
use crate::error::{ShrinkError, ShrinkResult};
use crate::ports::{EncodeSettings, FsPort, MediaBackend};
use crate::utils::path::{check_output_extension, default_output_path};

/// Pipeline tuning and encoder choices
#[derive(Debug, Clone, PartialEq)]
pub struct CompressorOptions {
    /// Frames buffered between the decode and encode stages
    pub channel_capacity: usize,
    pub progress_step: f64,
    pub codec: String,
    pub preset: String,
    pub threads: usize,
    /// Directory for generated output names
    pub output_dir: Option<PathBuf>,
    pub overwrite: bool,
}

impl Default for CompressorOptions {
    fn default() -> Self {
        Self::from(&Settings::default())
    }
}

impl From<&Settings> for CompressorOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            channel_capacity: settings.pipeline.channel_capacity,
            progress_step: settings.pipeline.progress_step,
            codec: settings.encoder.codec.clone(),
            preset: settings.encoder.preset.clone(),
            threads: settings.encoder.threads,
            output_dir: settings.output.directory.clone(),
            overwrite: settings.output.overwrite,
        }
    }
}

/// Video compressor; one job per instance at a time
pub struct Compressor<B: MediaBackend> {
    backend: Arc<B>,
    fs: Arc<dyn FsPort>,
    options: CompressorOptions,
    busy: Arc<AtomicBool>,
}

impl Compressor<LibavBackend> {
    /// Compressor backed by FFmpeg and the local filesystem
    pub fn from_settings(settings: &Settings) -> ShrinkResult<Self> {
        Ok(Self::new(
            LibavBackend::new()?,
            Arc::new(LocalFsAdapter::new()),
            CompressorOptions::from(settings),
        ))
    }
}

impl<B: MediaBackend> Compressor<B> {
    pub fn new(backend: B, fs: Arc<dyn FsPort>, options: CompressorOptions) -> Self {
        Self {
            backend: Arc::new(backend),
            fs,
            options,
            busy: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn options(&self) -> &CompressorOptions {
        &self.options
    }

    /// Whether a job currently holds this instance
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Read a source's properties without decoding it
    pub async fn probe(&self, source: &Path) -> ShrinkResult<VideoAsset> {
        let backend = Arc::clone(&self.backend);
        let path = source.to_path_buf();
        tokio::task::spawn_blocking(move || backend.probe(&path))
            .await
            .map_err(|e| {
                ShrinkError::source_unreadable(source.display().to_string(), e.to_string())
            })?
    }

    /// Resolve what a job would produce for this source
    pub async fn plan(
        &self,
        source: &Path,
        target: &CompressionTarget,
    ) -> ShrinkResult<(VideoAsset, EncodePlan)> {
        JobPlanner::validate_target(target)?;
        let asset = self.probe(source).await?;
        let plan = JobPlanner::plan(&asset, target)?;
        Ok((asset, plan))
    }

    /// Start a job in the background.
    ///
    /// Must be called from within a Tokio runtime. A malformed target or an
    /// output name for another container is rejected here, before anything
    /// runs. Fails with `JobInProgress` while another job holds this instance.
    pub fn start(&self, request: CompressRequest) -> ShrinkResult<JobHandle> {
        JobPlanner::validate_target(&request.target)?;
        if let Some(output) = &request.output {
            check_output_extension(output, request.target.container())?;
        }
        let slot = JobSlot::acquire(&self.busy)?;

        let output = match request.output {
            Some(path) => path,
            None => default_output_path(
                &request.source,
                self.options.output_dir.as_deref(),
                request.target.container(),
                chrono::Local::now(),
            ),
        };

        let (phase_tx, phase_rx) = watch::channel(JobPhase::Idle);
        let (progress_tx, progress_rx) = mpsc::unbounded_channel();
        let monitor = JobMonitor {
            phase: Arc::new(phase_tx),
            cancel: CancelToken::new(),
        };

        info!(
            source = %request.source.display(),
            output = %output.display(),
            request = ?request.target,
            "Starting compression job"
        );

        let job = Job {
            backend: Arc::clone(&self.backend),
            fs: Arc::clone(&self.fs),
            options: self.options.clone(),
            source: request.source,
            target: request.target,
            output: output.clone(),
            monitor: monitor.clone(),
            progress: progress_tx,
        };
        let task = tokio::spawn(async move {
            let _slot = slot;
            job.run().await
        });

        Ok(JobHandle {
            output,
            phase: phase_rx,
            progress: Some(progress_rx),
            cancel: monitor.cancel,
            task,
        })
    }

    /// Run a job to completion
    pub async fn compress(&self, request: CompressRequest) -> ShrinkResult<CompressionReport> {
        self.start(request)?.wait().await
    }

    /// Run a job, delivering progress and the outcome to `callback`.
    ///
    /// All notifications come from one task: progress in order, then exactly
    /// one completion, including when the job cannot start.
    pub fn compress_with_callback(
        &self,
        request: CompressRequest,
        callback: Arc<dyn CompressionCallback>,
    ) -> CallbackJob {
        match self.start(request) {
            Ok(mut handle) => {
                let cancel = handle.cancel_token();
                let progress = handle.take_progress();
                let task = tokio::spawn(async move {
                    callback.on_start(handle.output_path());
                    if let Some(mut progress) = progress {
                        while let Some(fraction) = progress.recv().await {
                            callback.on_progress(fraction);
                        }
                    }
                    let result = handle.wait().await;
                    callback.on_complete(&result);
                });
                CallbackJob {
                    cancel: Some(cancel),
                    task,
                }
            }
            Err(e) => {
                let task = tokio::spawn(async move {
                    callback.on_complete(&Err(e));
                });
                CallbackJob { cancel: None, task }
            }
        }
    }
}

/// Handle to a running job
pub struct JobHandle {
    output: PathBuf,
    phase: watch::Receiver<JobPhase>,
    progress: Option<mpsc::UnboundedReceiver<f64>>,
    cancel: CancelToken,
    task: JoinHandle<ShrinkResult<CompressionReport>>,
}

impl JobHandle {
    pub fn output_path(&self) -> &Path {
        &self.output
    }

    /// Current lifecycle phase
    pub fn phase(&self) -> JobPhase {
        *self.phase.borrow()
    }

    /// Watch phase transitions
    pub fn phase_updates(&self) -> watch::Receiver<JobPhase> {
        self.phase.clone()
    }

    /// Progress fractions; the stream ends when encoding stops
    pub fn take_progress(&mut self) -> Option<mpsc::UnboundedReceiver<f64>> {
        self.progress.take()
    }

    /// Request cooperative cancellation; ignored once finalizing has begun
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Wait for the outcome
    pub async fn wait(self) -> ShrinkResult<CompressionReport> {
        match self.task.await {
            Ok(result) => result,
            Err(e) => Err(ShrinkError::encoder(format!("compression task failed: {}", e))),
        }
    }
}

/// A job driven by [`Compressor::compress_with_callback`]
pub struct CallbackJob {
    cancel: Option<CancelToken>,
    task: JoinHandle<()>,
}

impl CallbackJob {
    pub fn cancel(&self) {
        if let Some(cancel) = &self.cancel {
            cancel.cancel();
        }
    }

    /// Wait until the completion callback has run
    pub async fn join(self) {
        if let Err(e) = self.task.await {
            warn!("Completion callback task failed: {}", e);
        }
    }
}

/// Exclusive hold on a compressor, released on drop
struct JobSlot(Arc<AtomicBool>);

impl JobSlot {
    fn acquire(busy: &Arc<AtomicBool>) -> ShrinkResult<Self> {
        busy.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| ShrinkError::JobInProgress)?;
        Ok(Self(Arc::clone(busy)))
    }
}

impl Drop for JobSlot {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

struct Job<B: MediaBackend> {
    backend: Arc<B>,
    fs: Arc<dyn FsPort>,
    options: CompressorOptions,
    source: PathBuf,
    target: CompressionTarget,
    output: PathBuf,
    monitor: JobMonitor,
    progress: mpsc::UnboundedSender<f64>,
}

impl<B: MediaBackend> Job<B> {
    async fn run(self) -> ShrinkResult<CompressionReport> {
        let started = Instant::now();
        let mut output_touched = false;
        let result = self.execute(started, &mut output_touched).await;

        match &result {
            Ok(report) => {
                self.monitor.set_phase(JobPhase::Completed);
                info!(
                    output = %report.output.display(),
                    output_size = report.output_size,
                    frames = report.frames_written,
                    elapsed_ms = report.elapsed.as_millis() as u64,
                    "Compression completed"
                );
            }
            Err(e) => {
                if output_touched {
                    if let Err(cleanup) = self.fs.delete_file(&self.output).await {
                        warn!(
                            output = %self.output.display(),
                            "Failed to remove partial output: {}", cleanup
                        );
                    }
                }
                self.monitor.set_phase(JobPhase::Failed);
                match e {
                    ShrinkError::Cancelled => info!("Compression cancelled"),
                    _ => error!(kind = e.kind(), "Compression failed: {}", e),
                }
            }
        }
        result
    }

    async fn execute(
        &self,
        started: Instant,
        output_touched: &mut bool,
    ) -> ShrinkResult<CompressionReport> {
        self.monitor.set_phase(JobPhase::Opening);
        self.check_paths().await?;

        let (opened_tx, opened_rx) = oneshot::channel();
        let (selection_tx, selection_rx) = oneshot::channel();
        let (sample_tx, sample_rx) = mpsc::channel(self.options.channel_capacity.max(1));

        let reader = {
            let backend = Arc::clone(&self.backend);
            let source = self.source.clone();
            let cancel = self.monitor.cancel.clone();
            tokio::task::spawn_blocking(move || {
                stages::read_stage(backend, source, cancel, opened_tx, selection_rx, sample_tx)
            })
        };

        let (asset, audio_track) = match opened_rx.await {
            Ok(opened) => opened?,
            Err(_) => {
                return Err(self.unreadable("read stage stopped before opening the source"));
            }
        };

        self.monitor.set_phase(JobPhase::ResolvingGeometry);
        let plan = match self.prepare(&asset).await {
            Ok(plan) => plan,
            Err(e) => {
                drop(selection_tx);
                let _ = reader.await;
                return Err(e);
            }
        };

        self.monitor.set_phase(JobPhase::Streaming);
        if selection_tx.send(plan.frames).is_err() {
            let _ = reader.await;
            return Err(self.unreadable("read stage stopped unexpectedly"));
        }

        *output_touched = true;
        let settings = EncodeSettings::from_plan(
            &plan,
            &self.options.codec,
            &self.options.preset,
            self.options.threads,
        );
        let reporter = ProgressReporter::new(
            plan.output_frames(),
            self.options.progress_step,
            self.progress.clone(),
        );
        let write_job = WriteJob {
            backend: Arc::clone(&self.backend),
            output: self.output.clone(),
            settings,
            source_size: asset.size,
            audio_track,
        };
        let monitor = self.monitor.clone();
        let writer = tokio::task::spawn_blocking(move || {
            stages::write_stage(write_job, sample_rx, monitor, reporter)
        });

        // join both stages before touching the output again
        let written = writer.await;
        let read = reader.await;
        let written = written
            .map_err(|e| ShrinkError::encoder(format!("encode stage panicked: {}", e)))??;
        let read = read.map_err(|e| self.unreadable(format!("decode stage panicked: {}", e)))?;

        let output_size = self.fs.file_size(&self.output).await?;
        Ok(CompressionReport {
            output: self.output.clone(),
            output_size,
            source_size: asset.file_size,
            target_size: plan.target_size,
            target_fps: plan.target_fps,
            frames_read: read.frames_read,
            frames_written: written.frames_written,
            audio_packets: written.audio_packets,
            elapsed: started.elapsed(),
        })
    }

    async fn check_paths(&self) -> ShrinkResult<()> {
        if !self.fs.file_exists(&self.source).await? {
            return Err(self.unreadable("file not found"));
        }
        // `./clip.mp4`, `dir/../clip.mp4` or a symlink can all name the source
        let source = self.fs.resolve_path(&self.source).await?;
        if self.fs.resolve_path(&self.output).await? == source {
            return Err(ShrinkError::config(format!(
                "output {} is the source file",
                self.output.display()
            )));
        }
        if !self.options.overwrite && self.fs.file_exists(&self.output).await? {
            return Err(ShrinkError::OutputExists {
                path: self.output.display().to_string(),
            });
        }
        Ok(())
    }

    async fn prepare(&self, asset: &VideoAsset) -> ShrinkResult<EncodePlan> {
        let plan = JobPlanner::plan(asset, &self.target)?;
        info!(
            source = %plan.source_size,
            target_size = %plan.target_size,
            fps = plan.target_fps,
            bitrate = plan.bitrate,
            frames = plan.output_frames(),
            "Encode plan ready"
        );
        if let Some(parent) = self.output.parent() {
            self.fs.create_directory(parent).await?;
        }
        Ok(plan)
    }

    fn unreadable(&self, reason: impl ToString) -> ShrinkError {
        ShrinkError::source_unreadable(self.source.display().to_string(), reason)
    }
}
