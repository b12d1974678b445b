//! End-to-end checks against real `ffmpeg`/`ffprobe` binaries.
//!
//! Run with `cargo test -p vve-media -- --ignored`.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use vve_media::{FfmpegToolkit, NormalizeMethod, NormalizeTarget, TranscodeEngine};

/// Render a synthetic clip with the lavfi test source.
fn make_clip(dir: &Path, name: &str, size: &str, fps: u32, secs: u32) -> PathBuf {
    let path = dir.join(name);
    let status = Command::new("ffmpeg")
        .args(["-y", "-v", "error", "-f", "lavfi", "-i"])
        .arg(format!("testsrc=size={size}:rate={fps}:duration={secs}"))
        .args(["-c:v", "libx264", "-pix_fmt", "yuv420p"])
        .arg(&path)
        .status()
        .expect("ffmpeg must be installed for ignored tests");
    assert!(status.success());
    path
}

/// MD5 of the decoded frame at `index`.
fn frame_md5(path: &Path, index: u32) -> String {
    let output = Command::new("ffmpeg")
        .args(["-v", "error", "-i"])
        .arg(path)
        .arg("-vf")
        .arg(format!("select=eq(n\\,{index})"))
        .args(["-vsync", "0", "-frames:v", "1", "-f", "md5", "-"])
        .output()
        .expect("ffmpeg must be installed for ignored tests");
    assert!(output.status.success());
    let hash = String::from_utf8_lossy(&output.stdout).trim().to_string();
    assert!(hash.starts_with("MD5="), "unexpected md5 output: {hash}");
    hash
}

fn engine() -> TranscodeEngine {
    TranscodeEngine::new(Arc::new(FfmpegToolkit::default()))
}

#[tokio::test]
#[ignore = "requires ffmpeg"]
async fn normalize_caps_resolution_and_frame_rate() {
    let dir = TempDir::new().unwrap();
    let input = make_clip(dir.path(), "hd.mp4", "1920x1080", 30, 2);
    let output = dir.path().join("compressed/0.mp4");

    let outcome = engine()
        .normalize(&input, &output, NormalizeTarget::default(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.method, NormalizeMethod::Transcoded);
    assert_eq!(outcome.output.width, 1280);
    assert_eq!(outcome.output.height, 720);
    assert!(outcome.output.fps <= 24);
}

#[tokio::test]
#[ignore = "requires ffmpeg"]
async fn concatenate_single_clip_keeps_duration() {
    let dir = TempDir::new().unwrap();
    let a = make_clip(dir.path(), "a.mp4", "640x360", 24, 2);
    let engine = engine();
    let cancel = CancellationToken::new();

    let source = engine.probe(&a, &cancel).await.unwrap();
    let outcome = engine
        .concatenate(&[a], &dir.path().join("final.mp4"), &cancel)
        .await
        .unwrap();
    let produced = engine.probe(&outcome.path, &cancel).await.unwrap();

    let expected = source.duration_secs.unwrap();
    assert!((produced.duration_secs.unwrap() - expected).abs() < 1.0 / 24.0);
}

#[tokio::test]
#[ignore = "requires ffmpeg"]
async fn concatenate_sums_durations() {
    let dir = TempDir::new().unwrap();
    let clips = vec![
        make_clip(dir.path(), "a.mp4", "640x360", 24, 1),
        make_clip(dir.path(), "b.mp4", "640x360", 24, 2),
        make_clip(dir.path(), "c.mp4", "640x360", 24, 3),
    ];
    let engine = engine();
    let cancel = CancellationToken::new();

    let outcome = engine
        .concatenate(&clips, &dir.path().join("final.mp4"), &cancel)
        .await
        .unwrap();
    let produced = engine.probe(&outcome.path, &cancel).await.unwrap();

    assert!((produced.duration_secs.unwrap() - 6.0).abs() <= 1.0 / 24.0 + 1e-6);
    assert_eq!((produced.width, produced.height, produced.fps), (640, 360, 24));

    // 24 + 48 + 72 frames: the join starts with a's first and ends with c's last.
    assert_eq!(frame_md5(&outcome.path, 0), frame_md5(&clips[0], 0));
    assert_eq!(frame_md5(&outcome.path, 143), frame_md5(&clips[2], 71));
}

#[tokio::test]
#[ignore = "requires ffmpeg"]
async fn cancelled_transcode_leaves_no_output() {
    let dir = TempDir::new().unwrap();
    let input = make_clip(dir.path(), "hd.mp4", "1920x1080", 30, 5);
    let output = dir.path().join("compressed/0.mp4");
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = engine()
        .normalize(&input, &output, NormalizeTarget::default(), &cancel)
        .await;

    assert!(result.is_err());
    assert!(!output.exists());
}
