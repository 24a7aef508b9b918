//! Frame sources. Each source runs its own capture thread, forwards RGBA
//! frames over the shared channel and stops when its stream handle drops.
//! Frames are dropped, not queued, while the consumer is busy.

pub mod camera;
mod rgba;
pub mod still;

use std::path::PathBuf;

use crossbeam_channel::Sender;
use thiserror::Error;

use crate::types::Frame;

pub use camera::{CameraDevice, CameraStream, available_cameras, start_camera_stream};
pub use still::{StillStream, start_still_stream};

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("camera enumeration failed: {0}")]
    Enumerate(String),
    #[error("failed to open camera: {0}")]
    OpenFailed(String),
    #[error("failed to decode camera frame: {0}")]
    Decode(String),
    #[error("failed to load still image {path}: {reason}")]
    StillDecode { path: PathBuf, reason: String },
}

/// What the picker can switch between.
#[derive(Clone, Debug)]
pub enum SourceSelection {
    Camera(CameraDevice),
    Still(PathBuf),
}

impl SourceSelection {
    pub fn label(&self) -> String {
        match self {
            SourceSelection::Camera(device) => device.label.clone(),
            SourceSelection::Still(path) => path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string()),
        }
    }
}

/// A running source. Dropping it stops the capture thread.
#[derive(Debug)]
pub enum FrameStream {
    Camera(CameraStream),
    Still(StillStream),
}

pub fn start_source(
    selection: &SourceSelection,
    frame_tx: Sender<Frame>,
) -> Result<FrameStream, SourceError> {
    match selection {
        SourceSelection::Camera(device) => {
            start_camera_stream(device.index.clone(), frame_tx).map(FrameStream::Camera)
        }
        SourceSelection::Still(path) => {
            start_still_stream(path, frame_tx).map(FrameStream::Still)
        }
    }
}
