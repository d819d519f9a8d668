//! Frame-sequence video and its playback state machine.
//!
//! A video is a directory of still frames (`.png` / `.jpg`, ordered by file name) with an
//! optional `video.json` manifest. Frames are decoded on demand.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::RgbaImage;
use serde::Deserialize;

use crate::engine::{AssetKind, EngineError, EngineResult};

pub const MANIFEST_FILE: &str = "video.json";
pub const DEFAULT_FRAMES_PER_SECOND: f32 = 30.0;

#[derive(Debug, Clone, Deserialize)]
struct VideoManifest {
    #[serde(default = "default_fps")]
    frames_per_second: f32,
}

fn default_fps() -> f32 {
    DEFAULT_FRAMES_PER_SECOND
}

#[derive(Debug, Clone)]
pub struct Video {
    name: String,
    frames: Vec<PathBuf>,
    frames_per_second: f32,
}

impl Video {
    pub fn new(name: impl Into<String>, frames: Vec<PathBuf>, frames_per_second: f32) -> Self {
        Self {
            name: name.into(),
            frames,
            frames_per_second,
        }
    }

    /// Reads the frame listing (and manifest, if any) from `dir`.
    pub fn open(name: &str, dir: &Path) -> EngineResult<Self> {
        if !dir.is_dir() {
            return Err(EngineError::AssetNotFound {
                kind: AssetKind::Video,
                name: name.to_string(),
                root: dir.to_path_buf(),
            });
        }

        let frames_per_second = match fs::read_to_string(dir.join(MANIFEST_FILE)) {
            Ok(text) => {
                let manifest: VideoManifest =
                    serde_json::from_str(&text).map_err(|source| EngineError::VideoManifest {
                        name: name.to_string(),
                        source,
                    })?;
                manifest.frames_per_second
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => DEFAULT_FRAMES_PER_SECOND,
            Err(e) => return Err(e.into()),
        };

        let mut frames = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if is_frame_file(&path) {
                frames.push(path);
            }
        }
        frames.sort();

        if frames.is_empty() || frames_per_second <= 0.0 {
            return Err(EngineError::EmptyVideo(name.to_string()));
        }

        Ok(Self::new(name, frames, frames_per_second))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn frames_per_second(&self) -> f32 {
        self.frames_per_second
    }

    /// Frame shown `elapsed_ms` after playback started.
    pub fn frame_index_at(&self, elapsed_ms: u64) -> usize {
        (elapsed_ms as f64 * self.frames_per_second as f64 / 1000.0) as usize
    }

    pub fn decode_frame(&self, index: usize) -> EngineResult<RgbaImage> {
        let path = self.frames.get(index).ok_or_else(|| EngineError::AssetNotFound {
            kind: AssetKind::Video,
            name: format!("{}[{index}]", self.name),
            root: PathBuf::new(),
        })?;
        Ok(image::open(path)?.to_rgba8())
    }
}

fn is_frame_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| {
            ext.eq_ignore_ascii_case("png")
                || ext.eq_ignore_ascii_case("jpg")
                || ext.eq_ignore_ascii_case("jpeg")
        })
        .unwrap_or(false)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaState {
    Stopped,
    Playing,
}

/// A decoded frame, tagged with its position in the video.
#[derive(Debug, Clone)]
pub struct VideoFrame {
    pub index: usize,
    pub image: Arc<RgbaImage>,
}

/// Playback collaborator queried by the scene renderer once per frame.
pub trait Playback {
    /// Starts `video` from its first frame.
    fn play(&mut self, video: Arc<Video>);

    fn state(&self) -> MediaState;

    /// Frame due at `now_ms`, or `None` when nothing is ready.
    fn current_frame(&mut self, now_ms: u64) -> Option<VideoFrame>;
}

/// Plays a [`Video`] once, then stops.
#[derive(Debug)]
pub struct VideoPlayer {
    video: Option<Arc<Video>>,
    state: MediaState,
    started_at_ms: Option<u64>,
    last_frame: Option<VideoFrame>,
}

impl Default for VideoPlayer {
    fn default() -> Self {
        Self::new()
    }
}

impl VideoPlayer {
    pub fn new() -> Self {
        Self {
            video: None,
            state: MediaState::Stopped,
            started_at_ms: None,
            last_frame: None,
        }
    }

    pub fn stop(&mut self) {
        if self.state == MediaState::Playing {
            if let Some(video) = &self.video {
                log::info!("video '{}' stopped", video.name());
            }
        }
        self.state = MediaState::Stopped;
        self.started_at_ms = None;
        self.last_frame = None;
    }
}

impl Playback for VideoPlayer {
    fn play(&mut self, video: Arc<Video>) {
        log::info!(
            "playing video '{}' ({} frames @ {} fps)",
            video.name(),
            video.frame_count(),
            video.frames_per_second()
        );
        self.video = Some(video);
        self.state = MediaState::Playing;
        self.started_at_ms = None;
        self.last_frame = None;
    }

    fn state(&self) -> MediaState {
        self.state
    }

    fn current_frame(&mut self, now_ms: u64) -> Option<VideoFrame> {
        if self.state != MediaState::Playing {
            return None;
        }
        let video = self.video.clone()?;

        let started = *self.started_at_ms.get_or_insert(now_ms);
        let index = video.frame_index_at(now_ms.saturating_sub(started));
        if index >= video.frame_count() {
            self.stop();
            return None;
        }

        if let Some(frame) = &self.last_frame {
            if frame.index == index {
                return Some(frame.clone());
            }
        }

        match video.decode_frame(index) {
            Ok(image) => {
                let frame = VideoFrame {
                    index,
                    image: Arc::new(image),
                };
                self.last_frame = Some(frame.clone());
                Some(frame)
            }
            Err(e) => {
                log::warn!("video '{}': frame {index} unavailable: {e}", video.name());
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_frames(dir: &Path, count: usize) {
        for i in 0..count {
            let img = RgbaImage::from_pixel(2, 2, image::Rgba([i as u8 * 40, 0, 0, 255]));
            img.save(dir.join(format!("frame_{i:03}.png"))).unwrap();
        }
    }

    fn video_with_frames(count: usize, fps: f32) -> (TempDir, Arc<Video>) {
        let dir = TempDir::new().unwrap();
        write_frames(dir.path(), count);
        fs::write(
            dir.path().join(MANIFEST_FILE),
            format!("{{\"frames_per_second\": {fps}}}"),
        )
        .unwrap();
        let video = Video::open("clip", dir.path()).unwrap();
        (dir, Arc::new(video))
    }

    #[test]
    fn open_sorts_frames_and_reads_manifest() {
        let (_dir, video) = video_with_frames(3, 10.0);
        assert_eq!(video.frame_count(), 3);
        assert_eq!(video.frames_per_second(), 10.0);
        assert_eq!(video.decode_frame(2).unwrap().get_pixel(0, 0)[0], 80);
    }

    #[test]
    fn manifest_is_optional() {
        let dir = TempDir::new().unwrap();
        write_frames(dir.path(), 1);
        let video = Video::open("clip", dir.path()).unwrap();
        assert_eq!(video.frames_per_second(), DEFAULT_FRAMES_PER_SECOND);
    }

    #[test]
    fn missing_directory_is_asset_not_found() {
        let dir = TempDir::new().unwrap();
        let err = Video::open("nope", &dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, EngineError::AssetNotFound { kind: AssetKind::Video, .. }));
    }

    #[test]
    fn directory_without_frames_is_rejected() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("notes.txt"), "hi").unwrap();
        let err = Video::open("blank", dir.path()).unwrap_err();
        assert!(matches!(err, EngineError::EmptyVideo(_)));
    }

    #[test]
    fn bad_manifest_is_reported() {
        let dir = TempDir::new().unwrap();
        write_frames(dir.path(), 1);
        fs::write(dir.path().join(MANIFEST_FILE), "{ nope").unwrap();
        let err = Video::open("clip", dir.path()).unwrap_err();
        assert!(matches!(err, EngineError::VideoManifest { .. }));
    }

    #[test]
    fn stopped_player_yields_nothing() {
        let mut player = VideoPlayer::new();
        assert_eq!(player.state(), MediaState::Stopped);
        assert!(player.current_frame(0).is_none());
    }

    #[test]
    fn frames_advance_with_time_then_playback_stops() {
        let (_dir, video) = video_with_frames(3, 10.0);
        let mut player = VideoPlayer::new();
        player.play(video);

        // Start is latched on the first query.
        assert_eq!(player.current_frame(5_000).unwrap().index, 0);
        assert_eq!(player.current_frame(5_099).unwrap().index, 0);
        assert_eq!(player.current_frame(5_100).unwrap().index, 1);
        assert_eq!(player.current_frame(5_250).unwrap().index, 2);

        assert!(player.current_frame(5_300).is_none());
        assert_eq!(player.state(), MediaState::Stopped);
    }

    #[test]
    fn replay_restarts_from_first_frame() {
        let (_dir, video) = video_with_frames(2, 10.0);
        let mut player = VideoPlayer::new();
        player.play(video.clone());
        player.current_frame(0);
        player.current_frame(150);

        player.play(video);
        assert_eq!(player.current_frame(10_000).unwrap().index, 0);
    }

    #[test]
    fn repeated_query_reuses_decoded_frame() {
        let (_dir, video) = video_with_frames(2, 10.0);
        let mut player = VideoPlayer::new();
        player.play(video);
        let a = player.current_frame(0).unwrap();
        let b = player.current_frame(10).unwrap();
        assert!(Arc::ptr_eq(&a.image, &b.image));
    }
}
