pub mod camera;
pub mod cli;
pub mod graphics;
pub mod player;
pub mod universe;
pub mod user_input;
pub mod video;
pub mod windowing;

pub use universe::Universe;
pub use windowing::Windowing;

use std::fmt;
use std::path::PathBuf;

/// Which content folder an asset lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Model,
    Video,
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetKind::Model => f.write_str("model"),
            AssetKind::Video => f.write_str("video"),
        }
    }
}

/// Engine-level error type.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("{kind} asset '{name}' not found under {}", root.display())]
    AssetNotFound {
        kind: AssetKind,
        name: String,
        root: PathBuf,
    },

    #[error("failed to import model '{name}': {source}")]
    ModelImport {
        name: String,
        #[source]
        source: gltf::Error,
    },

    #[error("model '{0}' has a primitive without position data")]
    MissingPositions(String),

    #[error("video '{0}' contains no frames")]
    EmptyVideo(String),

    #[error("invalid manifest for video '{name}': {source}")]
    VideoManifest {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image decode failed: {0}")]
    Image(#[from] image::ImageError),

    #[error("graphics backend: {0}")]
    Graphics(String),

    #[error("event loop: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
}

impl EngineError {
    /// Wraps a backend error that has no dedicated variant.
    pub fn graphics(err: impl fmt::Display) -> Self {
        EngineError::Graphics(err.to_string())
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
