//! End-to-end compression against real FFmpeg
//!
//! These tests generate a short clip with the `ffmpeg` command line tool and
//! are skipped when it is not installed.

use std::path::Path;
use std::process::Command;

use tempfile::TempDir;
use vidshrink::adapters::{LibavBackend, Settings};
use vidshrink::*;

/// Test utilities for video processing
mod test_utils {
    use super::*;

    pub fn ffmpeg_available() -> bool {
        Command::new("ffmpeg")
            .arg("-version")
            .output()
            .map(|output| output.status.success())
            .unwrap_or(false)
    }

    /// Create a test video with a sine audio track
    pub fn create_test_video(output_path: &Path, duration: u32, size: &str, rate: u32) {
        let video = format!("testsrc=duration={}:size={}:rate={}", duration, size, rate);
        let audio = format!("sine=frequency=1000:duration={}", duration);
        let output = Command::new("ffmpeg")
            .args([
                "-f", "lavfi", "-i", &video, "-f", "lavfi", "-i", &audio, "-c:v", "libx264",
                "-b:v", "4M", "-c:a", "aac", "-shortest", "-y",
            ])
            .arg(output_path)
            .output()
            .expect("failed to run ffmpeg");
        assert!(
            output.status.success(),
            "ffmpeg failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
    }

    pub fn compressor() -> Compressor<LibavBackend> {
        let mut settings = Settings::default();
        settings.encoder.threads = 2;
        Compressor::from_settings(&settings).unwrap()
    }
}

use test_utils::*;

#[tokio::test]
async fn test_low_quality_shrinks_real_video() {
    if !ffmpeg_available() {
        eprintln!("ffmpeg not found, skipping");
        return;
    }
    let dir = TempDir::new().unwrap();
    let source = dir.path().join("input.mp4");
    create_test_video(&source, 2, "640x360", 30);
    let output = dir.path().join("small.mp4");

    let compressor = compressor();
    let report = compressor
        .compress(CompressRequest::new(&source, Quality::Low).with_output(&output))
        .await
        .unwrap();

    assert_eq!(report.output, output);
    assert!(report.output_size > 0);
    assert!(report.output_size < report.source_size);
    assert_eq!(report.target_size, Size::new(398, 224));
    assert_eq!(report.target_fps, 15.0);

    let result = compressor.probe(&output).await.unwrap();
    assert_eq!(result.size, Size::new(398, 224));
    assert!(result.has_audio);
    assert!((result.frame_rate - 15.0).abs() < 0.5);
    assert!((result.duration_secs - 2.0).abs() < 0.5);
}

#[tokio::test]
async fn test_custom_settings_keep_source_rate() {
    if !ffmpeg_available() {
        eprintln!("ffmpeg not found, skipping");
        return;
    }
    let dir = TempDir::new().unwrap();
    let source = dir.path().join("input.mp4");
    create_test_video(&source, 1, "320x240", 25);
    let output = dir.path().join("custom.mov");

    let config = CompressionConfig {
        fps: 60.0,
        video_bitrate: 300_000,
        scale: Some(ScaleRequest::new(
            Dimension::Concrete(160),
            Dimension::DeriveFromAspectRatio,
        )),
        max_keyframe_interval: 12,
        container: Container::Mov,
    };
    let report = compressor()
        .compress(CompressRequest::new(&source, config).with_output(&output))
        .await
        .unwrap();

    assert_eq!(report.target_size, Size::new(160, 120));
    assert_eq!(report.target_fps, 25.0);
    assert_eq!(report.frames_written, report.frames_read);
    assert!(output.exists());
}

#[tokio::test]
async fn test_source_details_are_reported() {
    if !ffmpeg_available() {
        eprintln!("ffmpeg not found, skipping");
        return;
    }
    let dir = TempDir::new().unwrap();
    let source = dir.path().join("input.mp4");
    create_test_video(&source, 1, "320x240", 30);

    let asset = compressor().probe(&source).await.unwrap();
    assert_eq!(asset.size, Size::new(320, 240));
    assert!((asset.frame_rate - 30.0).abs() < 0.01);
    assert!(asset.has_audio);
    assert!(asset.file_size > 0);
}

#[tokio::test]
async fn test_unreadable_source_is_rejected() {
    let dir = TempDir::new().unwrap();
    let source = dir.path().join("not_a_video.mp4");
    std::fs::write(&source, b"plain text, not a container").unwrap();

    let Ok(compressor) = Compressor::from_settings(&Settings::default()) else {
        eprintln!("FFmpeg libraries unavailable, skipping");
        return;
    };
    let error = compressor
        .compress(CompressRequest::new(&source, Quality::Medium))
        .await
        .unwrap_err();
    assert!(matches!(error, ShrinkError::SourceUnreadable { .. }));
}
