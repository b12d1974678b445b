//! FFmpeg CLI wrapper for video processing.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building
//! - A runner with timeout and cancellation that kills the child process
//! - FFprobe metadata extraction with integer frame rates
//! - The `MediaToolkit` capability and its FFmpeg implementation
//! - The transcode engine: normalize-or-copy policy and concatenation

pub mod command;
pub mod encoding;
pub mod error;
pub mod fs_utils;
pub mod probe;
pub mod toolkit;
pub mod transcode;

pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use encoding::{EncodingConfig, NormalizeTarget, TranscodePlan};
pub use error::{MediaError, MediaResult, MediaStage};
pub use probe::{probe_video, round_frame_rate};
pub use toolkit::{FfmpegToolkit, MediaToolkit};
pub use transcode::{ConcatOutcome, NormalizeMethod, NormalizeOutcome, TranscodeEngine};
