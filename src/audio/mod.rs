//! Audio acquisition for transcription.

mod downloader;

pub use downloader::{
    cleanup_audio, download_audio, media_duration, segment_windows, split_audio, video_url,
};
