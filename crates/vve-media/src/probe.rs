//! FFprobe video information.

use std::path::Path;
use std::process::Stdio;

use serde::Deserialize;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use vve_models::VideoMetadata;

use crate::command::check_ffprobe;
use crate::error::{MediaError, MediaResult};

/// FFprobe JSON output format.
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    format: Option<FfprobeFormat>,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
}

/// Probe a video file for its stream properties.
pub async fn probe_video(
    path: impl AsRef<Path>,
    cancel: &CancellationToken,
) -> MediaResult<VideoMetadata> {
    let path = path.as_ref();

    if !path.is_file() {
        return Err(MediaError::FileNotFound(path.to_path_buf()));
    }

    check_ffprobe()?;

    let child = Command::new("ffprobe")
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| MediaError::probe_failed(format!("failed to spawn ffprobe: {e}")))?;

    let output = tokio::select! {
        output = child.wait_with_output() => output
            .map_err(|e| MediaError::probe_failed(format!("ffprobe did not complete: {e}")))?,
        _ = cancel.cancelled() => return Err(MediaError::Cancelled),
    };

    if !output.status.success() {
        debug!(
            exit_code = ?output.status.code(),
            "ffprobe stderr: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        return Err(MediaError::probe_failed(format!(
            "ffprobe exited with status {:?}",
            output.status.code()
        )));
    }

    let metadata = parse_probe_output(&output.stdout)?;
    debug!(
        width = metadata.width,
        height = metadata.height,
        fps = metadata.fps,
        duration = ?metadata.duration_secs,
        "Probed {}",
        path.display()
    );
    Ok(metadata)
}

/// Parse FFprobe JSON into metadata of the first video stream.
pub fn parse_probe_output(stdout: &[u8]) -> MediaResult<VideoMetadata> {
    let probe: FfprobeOutput = serde_json::from_slice(stdout)
        .map_err(|e| MediaError::probe_failed(format!("malformed ffprobe output: {e}")))?;

    if probe.streams.is_empty() {
        return Err(MediaError::probe_failed("no streams reported"));
    }

    let video_stream = probe
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| MediaError::probe_failed("no video stream found"))?;

    let width = video_stream.width.filter(|w| *w > 0);
    let height = video_stream.height.filter(|h| *h > 0);
    let (Some(width), Some(height)) = (width, height) else {
        return Err(MediaError::probe_failed("video stream has no dimensions"));
    };

    // avg_frame_rate is 0/0 for some containers; fall back to r_frame_rate.
    let fps = video_stream
        .avg_frame_rate
        .as_deref()
        .and_then(round_frame_rate)
        .or_else(|| video_stream.r_frame_rate.as_deref().and_then(round_frame_rate))
        .ok_or_else(|| MediaError::probe_failed("video stream has no frame rate"))?;

    let mut metadata = VideoMetadata::new(width, height, fps);
    if let Some(duration) = probe
        .format
        .and_then(|f| f.duration)
        .and_then(|d| d.parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d >= 0.0)
    {
        metadata = metadata.with_duration(duration);
    }
    Ok(metadata)
}

/// Convert an FFprobe frame rate ("30000/1001" or "29.97") to whole frames
/// per second, rounding half up.
///
/// Returns `None` for unparseable or zero rates.
pub fn round_frame_rate(s: &str) -> Option<u32> {
    let s = s.trim();
    let fps = if let Some((num, den)) = s.split_once('/') {
        let num: u64 = num.trim().parse().ok()?;
        let den: u64 = den.trim().parse().ok()?;
        if den == 0 {
            return None;
        }
        num.checked_mul(2)?.checked_add(den)? / den.checked_mul(2)?
    } else {
        let value: f64 = s.parse().ok()?;
        if !value.is_finite() || value < 0.0 {
            return None;
        }
        (value + 0.5).floor() as u64
    };

    u32::try_from(fps).ok().filter(|fps| *fps > 0)
}
