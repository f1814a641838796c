//! Command implementations

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::adapters::Settings;
use crate::cli::args::{CompressArgs, InspectArgs, PlanArgs};
use crate::domain::model::{EncodePlan, VideoAsset};
use crate::engine::{
    CompressRequest, CompressionCallback, CompressionReport, Compressor, ConsoleProgressCallback,
    JsonProgressCallback,
};
use crate::utils::Utils;

/// Execute the compress command
pub async fn compress(args: CompressArgs, settings: &Settings) -> Result<()> {
    let target = args.to_target()?;
    let compressor = Compressor::from_settings(settings)?;

    let mut request = CompressRequest::new(&args.input, target);
    if let Some(output) = args.output {
        request = request.with_output(output);
    }

    let callback: Arc<dyn CompressionCallback> = if args.json {
        Arc::new(JsonProgressCallback)
    } else {
        Arc::new(ConsoleProgressCallback::new(true))
    };

    let mut handle = compressor.start(request)?;
    callback.on_start(handle.output_path());

    let cancel = handle.cancel_token();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling compression");
            cancel.cancel();
        }
    });

    if let Some(mut progress) = handle.take_progress() {
        while let Some(fraction) = progress.recv().await {
            callback.on_progress(fraction);
        }
    }
    let result = handle.wait().await;
    interrupt.abort();
    callback.on_complete(&result);

    let report = result.context("Compression failed")?;
    if !args.json {
        display_report(&report);
    }
    Ok(())
}

/// Execute the plan command
pub async fn plan(args: PlanArgs, settings: &Settings) -> Result<()> {
    let target = args.target.to_target()?;
    let compressor = Compressor::from_settings(settings)?;
    let (asset, plan) = compressor
        .plan(&args.input, &target)
        .await
        .context("Failed to plan compression")?;

    if args.json {
        let json = serde_json::json!({
            "source": asset,
            "target_size": plan.target_size,
            "target_fps": plan.target_fps,
            "bitrate": plan.bitrate,
            "keyframe_interval": plan.keyframe_interval,
            "container": plan.container,
            "output_frames": plan.output_frames(),
            "source_frames": plan.frames.source_frames(),
        });
        println!("{}", serde_json::to_string_pretty(&json)?);
    } else {
        display_plan(&asset, &plan);
    }
    Ok(())
}

/// Execute the inspect command
pub async fn inspect(args: InspectArgs, settings: &Settings) -> Result<()> {
    info!(input = %args.input.display(), "Inspecting");
    let compressor = Compressor::from_settings(settings)?;
    let asset = compressor
        .probe(&args.input)
        .await
        .context("Failed to inspect input file")?;

    if args.json {
        let json = serde_json::to_string_pretty(&asset)
            .context("Failed to serialize media info to JSON")?;
        println!("{}", json);
    } else {
        display_asset(&asset);
    }
    Ok(())
}

fn display_asset(asset: &VideoAsset) {
    println!("Media Information");
    println!("=================");
    println!("File: {}", asset.path.display());
    println!("File Size: {}", Utils::format_file_size(asset.file_size));
    println!("Duration: {:.3}s", asset.duration_secs);
    println!("Video: {} {} @ {:.2} fps", asset.codec, asset.size, asset.frame_rate);
    match asset.video_bitrate {
        Some(rate) => println!("Video Bit Rate: {}", Utils::format_bitrate(rate)),
        None => println!("Video Bit Rate: unknown"),
    }
    println!("Audio: {}", if asset.has_audio { "yes" } else { "no" });
}

fn display_plan(asset: &VideoAsset, plan: &EncodePlan) {
    display_asset(asset);
    println!();
    println!("Encode Plan");
    println!("===========");
    if plan.needs_resize() {
        println!("Size: {} -> {}", plan.source_size, plan.target_size);
    } else {
        println!("Size: {} (unchanged)", plan.target_size);
    }
    println!("Frame Rate: {:.2} -> {:.2} fps", plan.source_fps, plan.target_fps);
    println!(
        "Frames: {} of {} kept",
        plan.output_frames(),
        plan.frames.source_frames()
    );
    println!("Bit Rate: {}", Utils::format_bitrate(plan.bitrate));
    println!("Keyframe Interval: {}", plan.keyframe_interval);
    println!("Container: {}", plan.container.file_extension());
}

fn display_report(report: &CompressionReport) {
    println!("Output: {}", report.output.display());
    println!(
        "Size: {} -> {}",
        Utils::format_file_size(report.source_size),
        Utils::format_file_size(report.output_size)
    );
    if let Some(ratio) = report.compression_ratio() {
        println!("Ratio: {:.1}%", ratio * 100.0);
    }
    println!(
        "Frames: {} written of {} read, {} audio packets",
        report.frames_written, report.frames_read, report.audio_packets
    );
    println!("Elapsed: {}", Utils::format_duration(report.elapsed));
}
