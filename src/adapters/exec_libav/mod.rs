//! FFmpeg media backend using libav bindings
//!
//! Decodes the source, scales frames to the target geometry and encodes
//! H.264 into an MP4 or MOV container, copying the audio track through.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use ffmpeg_next::codec::{self, encoder};
use ffmpeg_next::format::{self, Pixel};
use ffmpeg_next::software::scaling;
use ffmpeg_next::util::frame;
use ffmpeg_next::{media, Dictionary, Packet, Rational};
use tracing::{debug, info};

use crate::domain::model::{Size, VideoAsset};
use crate::error::{ShrinkError, ShrinkResult};
use crate::ports::{
    EncodeSettings, FrameResizer, MediaBackend, OpenedSource, SinkWriter, SourceReader,
    SourceSample,
};

/// Encoder used when the configured one is not compiled into libavcodec
const FALLBACK_CODEC: codec::Id = codec::Id::H264;

/// Rate-control buffer, in seconds of target bitrate; maxrate needs one to apply
const RC_BUFFER_SECONDS: u64 = 2;

/// Media backend on top of libavformat, libavcodec and libswscale
pub struct LibavBackend;

impl LibavBackend {
    pub fn new() -> ShrinkResult<Self> {
        ffmpeg_next::init().map_err(|e| ShrinkError::FFmpegInit {
            message: e.to_string(),
        })?;
        Ok(Self)
    }
}

/// Stream parameters of the audio track being passed through
pub struct LibavAudioTrack {
    parameters: codec::Parameters,
    time_base: Rational,
}

impl MediaBackend for LibavBackend {
    type Frame = frame::Video;
    type Audio = Packet;
    type AudioTrack = LibavAudioTrack;
    type Reader = LibavReader;
    type Resizer = LibavResizer;
    type Writer = LibavWriter;

    fn open_source(&self, path: &Path) -> ShrinkResult<OpenedSource<LibavReader, LibavAudioTrack>> {
        let path_str = path.display().to_string();
        let input =
            format::input(&path).map_err(|e| ShrinkError::source_unreadable(&path_str, e))?;

        let (video_stream, decoder, size, frame_rate, duration_secs, codec_name) = {
            let stream = input
                .streams()
                .best(media::Type::Video)
                .ok_or_else(|| ShrinkError::source_unreadable(&path_str, "no video track"))?;

            let decoder = codec::context::Context::from_parameters(stream.parameters())
                .and_then(|context| context.decoder().video())
                .map_err(|e| ShrinkError::source_unreadable(&path_str, e))?;

            let size = Size::new(decoder.width(), decoder.height());
            let frame_rate = rational_to_f64(stream.avg_frame_rate())
                .or_else(|| rational_to_f64(stream.rate()))
                .unwrap_or(0.0);

            let duration_secs = if stream.duration() > 0 {
                stream.duration() as f64 * f64::from(stream.time_base())
            } else if input.duration() > 0 {
                input.duration() as f64 / f64::from(ffmpeg_next::ffi::AV_TIME_BASE)
            } else {
                0.0
            };

            let codec_name = stream.parameters().id().name().to_string();
            (stream.index(), decoder, size, frame_rate, duration_secs, codec_name)
        };

        let audio = input.streams().best(media::Type::Audio).map(|stream| {
            (
                stream.index(),
                LibavAudioTrack {
                    parameters: stream.parameters().clone(),
                    time_base: stream.time_base(),
                },
            )
        });

        let video_bitrate = match decoder.bit_rate() {
            0 => None,
            rate => Some(rate as u64),
        };
        let file_size = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);

        let asset = VideoAsset {
            path: path.to_path_buf(),
            size,
            duration_secs,
            frame_rate,
            has_audio: audio.is_some(),
            video_bitrate,
            codec: codec_name,
            file_size,
        };
        debug!(
            path = %path_str,
            size = %asset.size,
            fps = asset.frame_rate,
            duration = asset.duration_secs,
            audio = asset.has_audio,
            "Opened source"
        );

        let (audio_stream, audio_track) = match audio {
            Some((index, track)) => (Some(index), Some(track)),
            None => (None, None),
        };

        Ok(OpenedSource {
            asset,
            reader: LibavReader {
                path: path.to_path_buf(),
                input,
                decoder,
                video_stream,
                audio_stream,
                pending: VecDeque::new(),
                next_index: 0,
                drained: false,
            },
            audio_track,
        })
    }

    fn create_resizer(&self, _source: Size, target: Size) -> ShrinkResult<LibavResizer> {
        Ok(LibavResizer {
            target,
            scaler: None,
        })
    }

    fn create_sink(
        &self,
        path: &Path,
        settings: &EncodeSettings,
        audio_track: Option<LibavAudioTrack>,
    ) -> ShrinkResult<LibavWriter> {
        LibavWriter::create(path, settings, audio_track)
    }
}

/// Sequential demuxer and video decoder
pub struct LibavReader {
    path: PathBuf,
    input: format::context::Input,
    decoder: codec::decoder::Video,
    video_stream: usize,
    audio_stream: Option<usize>,
    pending: VecDeque<SourceSample<frame::Video, Packet>>,
    next_index: u64,
    drained: bool,
}

impl LibavReader {
    fn unreadable(&self, reason: impl ToString) -> ShrinkError {
        ShrinkError::source_unreadable(self.path.display().to_string(), reason)
    }

    fn receive_frames(&mut self) {
        let mut decoded = frame::Video::empty();
        while self.decoder.receive_frame(&mut decoded).is_ok() {
            self.pending.push_back(SourceSample::Video {
                index: self.next_index,
                frame: decoded,
            });
            self.next_index += 1;
            decoded = frame::Video::empty();
        }
    }
}

impl SourceReader for LibavReader {
    type Frame = frame::Video;
    type Audio = Packet;

    fn next_sample(&mut self) -> ShrinkResult<Option<SourceSample<frame::Video, Packet>>> {
        loop {
            if let Some(sample) = self.pending.pop_front() {
                return Ok(Some(sample));
            }
            if self.drained {
                return Ok(None);
            }

            let mut packet = Packet::empty();
            match packet.read(&mut self.input) {
                Ok(()) => {
                    let stream = packet.stream();
                    if stream == self.video_stream {
                        self.decoder
                            .send_packet(&packet)
                            .map_err(|e| self.unreadable(e))?;
                        self.receive_frames();
                    } else if Some(stream) == self.audio_stream {
                        self.pending.push_back(SourceSample::Audio(packet));
                    }
                }
                Err(ffmpeg_next::Error::Eof) => {
                    self.decoder.send_eof().map_err(|e| self.unreadable(e))?;
                    self.receive_frames();
                    self.drained = true;
                    debug!(frames = self.next_index, "Source drained");
                }
                Err(e) => return Err(self.unreadable(e)),
            }
        }
    }
}

/// Scales frames to the target size in YUV420P.
///
/// The scaling context is built from the first frame's format and rebuilt
/// if a later frame arrives with a different layout.
pub struct LibavResizer {
    target: Size,
    scaler: Option<((Pixel, u32, u32), scaling::Context)>,
}

impl FrameResizer for LibavResizer {
    type Frame = frame::Video;

    fn resize(&mut self, input: frame::Video) -> ShrinkResult<frame::Video> {
        let layout = (input.format(), input.width(), input.height());
        if layout == (Pixel::YUV420P, self.target.width, self.target.height) {
            return Ok(input);
        }

        let stale = !matches!(&self.scaler, Some((current, _)) if *current == layout);
        if stale {
            let scaler = scaling::Context::get(
                layout.0,
                layout.1,
                layout.2,
                Pixel::YUV420P,
                self.target.width,
                self.target.height,
                scaling::Flags::BILINEAR,
            )
            .map_err(|e| ShrinkError::encoder(format!("failed to create scaler: {}", e)))?;
            self.scaler = Some((layout, scaler));
        }
        let Some((_, scaler)) = self.scaler.as_mut() else {
            return Err(ShrinkError::encoder("scaler unavailable"));
        };

        let mut output = frame::Video::empty();
        scaler
            .run(&input, &mut output)
            .map_err(|e| ShrinkError::encoder(format!("failed to scale frame: {}", e)))?;
        Ok(output)
    }
}

struct AudioRoute {
    stream: usize,
    source_time_base: Rational,
    output_time_base: Rational,
}

/// H.264 encoder and container muxer
pub struct LibavWriter {
    output: format::context::Output,
    encoder: encoder::Video,
    video_stream: usize,
    encoder_time_base: Rational,
    stream_time_base: Rational,
    audio: Option<AudioRoute>,
}

impl LibavWriter {
    fn create(
        path: &Path,
        settings: &EncodeSettings,
        audio_track: Option<LibavAudioTrack>,
    ) -> ShrinkResult<Self> {
        let mut output = format::output_as(&path, settings.container.format_name())
            .map_err(|e| ShrinkError::encoder(format!("failed to create output: {}", e)))?;
        let global_header = output
            .format()
            .flags()
            .contains(format::Flags::GLOBAL_HEADER);

        let codec = encoder::find_by_name(&settings.codec_name)
            .or_else(|| encoder::find(FALLBACK_CODEC))
            .ok_or_else(|| ShrinkError::encoder("no H.264 encoder available"))?;

        let frame_rate = Rational::from(settings.fps);
        let encoder_time_base = frame_rate.invert();

        let mut context = codec::context::Context::new_with_codec(codec)
            .encoder()
            .video()
            .map_err(|e| ShrinkError::encoder(format!("failed to create encoder: {}", e)))?;
        context.set_width(settings.size.width);
        context.set_height(settings.size.height);
        context.set_format(Pixel::YUV420P);
        context.set_time_base(encoder_time_base);
        context.set_frame_rate(Some(frame_rate));
        context.set_bit_rate(settings.bitrate as usize);
        context.set_max_bit_rate(settings.bitrate as usize);
        context.set_gop(settings.keyframe_interval);
        if global_header {
            context.set_flags(codec::Flags::GLOBAL_HEADER);
        }

        let encoder = context
            .open_with(encoder_options(settings))
            .map_err(|e| ShrinkError::encoder(format!("failed to open {}: {}", codec.name(), e)))?;

        let video_stream = {
            let mut stream = output
                .add_stream(codec)
                .map_err(|e| ShrinkError::encoder(format!("failed to add video stream: {}", e)))?;
            stream.set_parameters(&encoder);
            stream.set_time_base(encoder_time_base);
            stream.index()
        };

        let audio = match audio_track {
            Some(track) => {
                let mut stream = output
                    .add_stream(encoder::find(codec::Id::None))
                    .map_err(|e| {
                        ShrinkError::encoder(format!("failed to add audio stream: {}", e))
                    })?;
                stream.set_parameters(track.parameters);
                stream.set_time_base(track.time_base);
                Some((stream.index(), track.time_base))
            }
            None => None,
        };

        output
            .write_header()
            .map_err(|e| ShrinkError::encoder(format!("failed to write header: {}", e)))?;

        // the muxer may pick its own stream time bases while writing the header
        let time_base_of = |index: usize| output.stream(index).map(|stream| stream.time_base());
        let stream_time_base = time_base_of(video_stream).unwrap_or(encoder_time_base);
        let audio = audio.map(|(stream, source_time_base)| AudioRoute {
            stream,
            source_time_base,
            output_time_base: time_base_of(stream).unwrap_or(source_time_base),
        });

        info!(
            codec = codec.name(),
            size = %settings.size,
            fps = settings.fps,
            bitrate = settings.bitrate,
            gop = settings.keyframe_interval,
            "Encoder opened"
        );

        Ok(Self {
            output,
            encoder,
            video_stream,
            encoder_time_base,
            stream_time_base,
            audio,
        })
    }

    fn write_encoded_packets(&mut self) -> ShrinkResult<()> {
        let mut packet = Packet::empty();
        while self.encoder.receive_packet(&mut packet).is_ok() {
            packet.set_stream(self.video_stream);
            packet.rescale_ts(self.encoder_time_base, self.stream_time_base);
            packet
                .write_interleaved(&mut self.output)
                .map_err(|e| ShrinkError::encoder(format!("failed to write video packet: {}", e)))?;
        }
        Ok(())
    }
}

impl SinkWriter for LibavWriter {
    type Frame = frame::Video;
    type Audio = Packet;

    fn write_video(&mut self, mut frame: frame::Video, pts: i64) -> ShrinkResult<()> {
        frame.set_pts(Some(pts));
        frame.set_kind(ffmpeg_next::picture::Type::None);
        self.encoder
            .send_frame(&frame)
            .map_err(|e| ShrinkError::encoder(format!("failed to encode frame {}: {}", pts, e)))?;
        self.write_encoded_packets()
    }

    fn write_audio(&mut self, mut packet: Packet) -> ShrinkResult<()> {
        let Some(route) = &self.audio else {
            return Ok(());
        };
        packet.set_stream(route.stream);
        packet.rescale_ts(route.source_time_base, route.output_time_base);
        packet.set_position(-1);
        packet
            .write_interleaved(&mut self.output)
            .map_err(|e| ShrinkError::encoder(format!("failed to write audio packet: {}", e)))
    }

    fn finish(mut self) -> ShrinkResult<()> {
        self.encoder
            .send_eof()
            .map_err(|e| ShrinkError::encoder(format!("failed to flush encoder: {}", e)))?;
        self.write_encoded_packets()?;
        self.output
            .write_trailer()
            .map_err(|e| ShrinkError::encoder(format!("failed to write trailer: {}", e)))
    }
}

fn encoder_options(settings: &EncodeSettings) -> Dictionary<'static> {
    let mut options = Dictionary::new();
    options.set("preset", &settings.preset);
    options.set("threads", &settings.threads.to_string());
    options.set(
        "bufsize",
        &settings.bitrate.saturating_mul(RC_BUFFER_SECONDS).to_string(),
    );
    options
}

fn rational_to_f64(rate: Rational) -> Option<f64> {
    if rate.numerator() > 0 && rate.denominator() > 0 {
        Some(f64::from(rate))
    } else {
        None
    }
}
