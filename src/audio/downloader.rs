//! Audio download and splitting.
//!
//! Downloads are delegated to yt-dlp, probing and splitting to ffprobe/ffmpeg.

use crate::error::{Result, StudError};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, instrument, warn};

/// Watch URL for a YouTube video id.
pub fn video_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", video_id)
}

/// Map a spawn failure to `ToolNotFound` when the binary is missing.
fn spawn_error(tool: &str, e: std::io::Error) -> StudError {
    if e.kind() == std::io::ErrorKind::NotFound {
        StudError::ToolNotFound(tool.to_string())
    } else {
        StudError::ToolFailed(format!("{} could not be started: {}", tool, e))
    }
}

/// Download the audio track of a YouTube video as `<output_dir>/<video_id>.mp3`.
///
/// An existing file is reused. The download is aborted after `timeout`.
#[instrument(skip(output_dir), fields(video_id = %video_id))]
pub async fn download_audio(video_id: &str, output_dir: &Path, timeout: Duration) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)?;

    let target_path = output_dir.join(format!("{}.mp3", video_id));
    if target_path.exists() {
        info!("Using cached audio file");
        return Ok(target_path);
    }

    let url = video_url(video_id);
    info!("Downloading audio from {}", url);

    let template = output_dir.join(format!("{}.%(ext)s", video_id));

    let child = Command::new("yt-dlp")
        .arg("-f").arg("bestaudio/best")
        .arg("--extract-audio")
        .arg("--audio-format").arg("mp3")
        .arg("--audio-quality").arg("0")
        .arg("--output").arg(&template)
        .arg("--no-playlist")
        .arg("--quiet")
        .arg("--no-warnings")
        .arg(&url)
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output();

    let output = match tokio::time::timeout(timeout, child).await {
        Ok(result) => result.map_err(|e| spawn_error("yt-dlp", e))?,
        Err(_) => {
            return Err(StudError::AudioDownload(format!(
                "yt-dlp timed out after {}s",
                timeout.as_secs()
            )));
        }
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(StudError::AudioDownload(format!("yt-dlp failed: {}", stderr.trim())));
    }

    // yt-dlp normally produces the mp3 itself; anything else gets converted.
    let downloaded = find_audio_file(output_dir, video_id)?;
    if downloaded != target_path {
        normalize_to_mp3(&downloaded, &target_path).await?;
        remove_intermediate(&downloaded);
    }

    Ok(target_path)
}

/// Best-effort removal of a file we no longer need; failures are only logged.
fn remove_intermediate(path: &Path) -> bool {
    match std::fs::remove_file(path) {
        Ok(()) => true,
        Err(e) => {
            warn!("Could not remove {}: {}", path.display(), e);
            false
        }
    }
}

/// Delete a downloaded audio file. Missing files are ignored.
pub fn cleanup_audio(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => {
            debug!("Removed {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

fn find_audio_file(dir: &Path, video_id: &str) -> Result<PathBuf> {
    for ext in ["mp3", "opus", "m4a", "webm", "ogg"] {
        let candidate = dir.join(format!("{}.{}", video_id, ext));
        if candidate.exists() {
            return Ok(candidate);
        }
    }

    Err(StudError::AudioDownload(format!(
        "No audio file for {} after download",
        video_id
    )))
}

async fn normalize_to_mp3(source: &Path, dest: &Path) -> Result<()> {
    debug!("Converting {:?} to MP3", source);

    let output = Command::new("ffmpeg")
        .arg("-i").arg(source)
        .arg("-vn")
        .arg("-codec:a").arg("libmp3lame")
        .arg("-qscale:a").arg("2")
        .arg("-y")
        .arg("-loglevel").arg("error")
        .arg(dest)
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| spawn_error("ffmpeg", e))?;

    if output.status.success() {
        Ok(())
    } else {
        let err = String::from_utf8_lossy(&output.stderr);
        Err(StudError::AudioDownload(format!("ffmpeg conversion failed: {}", err.trim())))
    }
}

/// Compute `(offset, length)` windows covering `total` seconds in `chunk` sized steps.
pub fn segment_windows(total: f64, chunk: f64) -> Vec<(f64, f64)> {
    if chunk <= 0.0 || total <= chunk {
        return vec![(0.0, total.max(0.0))];
    }

    let mut windows = Vec::new();
    let mut offset = 0.0;
    while offset < total {
        windows.push((offset, chunk.min(total - offset)));
        offset += chunk;
    }
    windows
}

/// Split a long audio file into parts of at most `chunk_seconds`.
///
/// Returns `(part_path, offset_seconds)` pairs. Audio shorter than one part is
/// returned unchanged with offset 0.
#[instrument(skip_all)]
pub async fn split_audio(
    source: &Path,
    output_dir: &Path,
    chunk_seconds: u32,
) -> Result<Vec<(PathBuf, f64)>> {
    std::fs::create_dir_all(output_dir)?;

    let total_duration = media_duration(source).await?;
    info!("Total audio duration: {:.1}s", total_duration);

    let windows = segment_windows(total_duration, chunk_seconds as f64);
    if windows.len() == 1 {
        return Ok(vec![(source.to_path_buf(), 0.0)]);
    }

    let base_name = source
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("audio");

    let mut segments = Vec::with_capacity(windows.len());
    for (idx, (offset, length)) in windows.into_iter().enumerate() {
        let segment_path = output_dir.join(format!("{}_part{:03}.mp3", base_name, idx));
        extract_segment(source, &segment_path, offset, length).await?;
        debug!("Created segment {} at offset {:.1}s", idx, offset);
        segments.push((segment_path, offset));
    }

    info!("Created {} audio segments", segments.len());
    Ok(segments)
}

async fn extract_segment(source: &Path, dest: &Path, start: f64, length: f64) -> Result<()> {
    let copied = Command::new("ffmpeg")
        .arg("-ss").arg(format!("{:.3}", start))
        .arg("-i").arg(source)
        .arg("-t").arg(format!("{:.3}", length))
        .arg("-c").arg("copy")
        .arg("-y")
        .arg("-loglevel").arg("warning")
        .arg(dest)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .map_err(|e| spawn_error("ffmpeg", e))?;

    if copied.success() && dest.exists() {
        return Ok(());
    }

    warn!("Stream copy failed, re-encoding segment");

    let output = Command::new("ffmpeg")
        .arg("-ss").arg(format!("{:.3}", start))
        .arg("-i").arg(source)
        .arg("-t").arg(format!("{:.3}", length))
        .arg("-codec:a").arg("libmp3lame")
        .arg("-qscale:a").arg("2")
        .arg("-y")
        .arg("-loglevel").arg("error")
        .arg(dest)
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| spawn_error("ffmpeg", e))?;

    if output.status.success() {
        Ok(())
    } else {
        let err = String::from_utf8_lossy(&output.stderr);
        Err(StudError::ToolFailed(format!("Segment extraction failed: {}", err.trim())))
    }
}

/// Duration of an audio file in seconds, via ffprobe.
pub async fn media_duration(path: &Path) -> Result<f64> {
    let output = Command::new("ffprobe")
        .arg("-v").arg("quiet")
        .arg("-print_format").arg("json")
        .arg("-show_format")
        .arg(path)
        .output()
        .await
        .map_err(|e| spawn_error("ffprobe", e))?;

    if !output.status.success() {
        return Err(StudError::ToolFailed(format!(
            "ffprobe could not read {}",
            path.display()
        )));
    }

    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    parsed["format"]["duration"]
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .ok_or_else(|| StudError::ToolFailed("Could not determine audio duration".into()))
}
