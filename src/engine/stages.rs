//! Blocking pipeline stages.
//!
//! The read stage decodes the source and forwards the frames that survive
//! frame-rate reduction. The write stage resizes, encodes and muxes them. A
//! bounded channel between the two keeps memory flat when encoding is slower
//! than decoding.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, trace};

use crate::domain::model::{FrameIndexSet, Size, VideoAsset};
use crate::engine::{CancelToken, JobPhase, ProgressReporter};
use crate::error::{ShrinkError, ShrinkResult};
use crate::ports::{
    EncodeSettings, FrameResizer, MediaBackend, SinkWriter, SourceReader, SourceSample,
};

/// A sample on its way to the encoder
pub(crate) enum StagedSample<F, A> {
    Frame { output_index: u64, frame: F },
    Audio(A),
}

pub(crate) type StagedItem<B> =
    ShrinkResult<StagedSample<<B as MediaBackend>::Frame, <B as MediaBackend>::Audio>>;

pub(crate) type OpenedInfo<B> = ShrinkResult<(VideoAsset, Option<<B as MediaBackend>::AudioTrack>)>;

#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct ReadStats {
    pub frames_read: u64,
}

#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct WriteStats {
    pub frames_written: u64,
    pub audio_packets: u64,
}

/// Phase and cancellation state shared with the job handle
#[derive(Clone)]
pub(crate) struct JobMonitor {
    pub phase: Arc<watch::Sender<JobPhase>>,
    pub cancel: CancelToken,
}

impl JobMonitor {
    pub fn set_phase(&self, phase: JobPhase) {
        debug!(%phase, "Job phase");
        self.phase.send_replace(phase);
    }
}

/// Open the source, wait for the frame selection and stream retained samples.
///
/// Errors after opening are forwarded through `samples` so the write stage
/// sees them in order.
pub(crate) fn read_stage<B: MediaBackend>(
    backend: Arc<B>,
    source: PathBuf,
    cancel: CancelToken,
    opened: oneshot::Sender<OpenedInfo<B>>,
    selection: oneshot::Receiver<FrameIndexSet>,
    samples: mpsc::Sender<StagedItem<B>>,
) -> ReadStats {
    let mut stats = ReadStats::default();

    let mut reader = match backend.open_source(&source) {
        Ok(source) => {
            let _ = opened.send(Ok((source.asset, source.audio_track)));
            source.reader
        }
        Err(e) => {
            let _ = opened.send(Err(e));
            return stats;
        }
    };

    // planning failed or the job was dropped
    let Ok(frames) = selection.blocking_recv() else {
        return stats;
    };

    let mut output_index = 0u64;
    loop {
        if cancel.is_cancelled() {
            let _ = samples.blocking_send(Err(ShrinkError::Cancelled));
            break;
        }

        let staged = match reader.next_sample() {
            Ok(Some(SourceSample::Video { index, frame })) => {
                stats.frames_read += 1;
                if !frames.retains(index) {
                    trace!(index, "Dropped frame");
                    continue;
                }
                let staged = StagedSample::Frame {
                    output_index,
                    frame,
                };
                output_index += 1;
                Ok(staged)
            }
            Ok(Some(SourceSample::Audio(packet))) => Ok(StagedSample::Audio(packet)),
            Ok(None) => break,
            Err(e) => Err(e),
        };

        let failed = staged.is_err();
        if samples.blocking_send(staged).is_err() || failed {
            // the write stage has stopped, or we just told it why we are stopping
            break;
        }
    }

    debug!(frames_read = stats.frames_read, retained = output_index, "Read stage finished");
    stats
}

/// Everything the write stage needs besides the channel
pub(crate) struct WriteJob<B: MediaBackend> {
    pub backend: Arc<B>,
    pub output: PathBuf,
    pub settings: EncodeSettings,
    pub source_size: Size,
    pub audio_track: Option<B::AudioTrack>,
}

/// Resize, encode and mux staged samples until the read stage is done
pub(crate) fn write_stage<B: MediaBackend>(
    job: WriteJob<B>,
    mut samples: mpsc::Receiver<StagedItem<B>>,
    monitor: JobMonitor,
    mut reporter: ProgressReporter,
) -> ShrinkResult<WriteStats> {
    let WriteJob {
        backend,
        output,
        settings,
        source_size,
        audio_track,
    } = job;

    let mut resizer = backend.create_resizer(source_size, settings.size)?;
    let mut sink = backend.create_sink(&output, &settings, audio_track)?;
    let mut stats = WriteStats::default();

    while let Some(item) = samples.blocking_recv() {
        if monitor.cancel.is_cancelled() {
            return Err(ShrinkError::Cancelled);
        }
        match item? {
            StagedSample::Frame {
                output_index,
                frame,
            } => {
                let frame = resizer.resize(frame)?;
                // timestamps follow the output frame count, not the source clock
                sink.write_video(frame, output_index as i64)?;
                stats.frames_written += 1;
                reporter.advance(stats.frames_written);
            }
            StagedSample::Audio(packet) => {
                sink.write_audio(packet)?;
                stats.audio_packets += 1;
            }
        }
    }

    if monitor.cancel.is_cancelled() {
        return Err(ShrinkError::Cancelled);
    }

    monitor.set_phase(JobPhase::Finalizing);
    sink.finish()?;
    reporter.finish();

    debug!(
        frames_written = stats.frames_written,
        audio_packets = stats.audio_packets,
        "Write stage finished"
    );
    Ok(stats)
}
