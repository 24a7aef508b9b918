use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::Instant,
};

use crossbeam_channel::Sender;
use nokhwa::{
    Camera,
    pixel_format::RgbFormat,
    query,
    utils::{
        ApiBackend, CameraIndex, CameraInfo, FrameFormat, RequestedFormat, RequestedFormatType,
    },
};

use super::{SourceError, rgba};
use crate::types::Frame;

// Formats the decoder handles directly, in preference order. Built-in macOS
// cameras often reject YUYV even when it is advertised.
const PREFERRED_PIXEL_FORMATS: &[FrameFormat] = &[
    FrameFormat::RAWRGB,
    FrameFormat::RAWBGR,
    FrameFormat::GRAY,
    FrameFormat::YUYV,
    FrameFormat::NV12,
    FrameFormat::MJPEG,
];

fn requested_formats() -> [RequestedFormat<'static>; 4] {
    [
        RequestedFormat::with_formats(
            RequestedFormatType::AbsoluteHighestFrameRate,
            PREFERRED_PIXEL_FORMATS,
        ),
        RequestedFormat::with_formats(
            RequestedFormatType::AbsoluteHighestResolution,
            PREFERRED_PIXEL_FORMATS,
        ),
        // Anything Nokhwa can decode, highest frame rate first so drivers
        // that default to very low rates are avoided.
        RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestFrameRate),
        RequestedFormat::new::<RgbFormat>(RequestedFormatType::None),
    ]
}

#[derive(Clone, Debug)]
pub struct CameraDevice {
    pub index: CameraIndex,
    pub label: String,
}

#[derive(Debug)]
pub struct CameraStream {
    stop: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl CameraStream {
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for CameraStream {
    fn drop(&mut self) {
        self.shutdown();
    }
}

pub fn available_cameras() -> Result<Vec<CameraDevice>, SourceError> {
    let cameras = query(ApiBackend::Auto).map_err(|err| SourceError::Enumerate(err.to_string()))?;
    Ok(cameras.into_iter().map(device_entry).collect())
}

fn device_entry(info: CameraInfo) -> CameraDevice {
    CameraDevice {
        label: info.human_name(),
        index: info.index().clone(),
    }
}

fn open_camera(index: CameraIndex) -> Result<Camera, SourceError> {
    let mut last_err = None;

    for requested in requested_formats() {
        match Camera::new(index.clone(), requested) {
            Ok(mut camera) => match camera.open_stream() {
                Ok(()) => return Ok(camera),
                Err(err) => last_err = Some(err.to_string()),
            },
            Err(err) => last_err = Some(err.to_string()),
        }
    }

    Err(SourceError::OpenFailed(last_err.unwrap_or_else(|| {
        "no supported pixel format".to_string()
    })))
}

pub fn start_camera_stream(
    index: CameraIndex,
    frame_tx: Sender<Frame>,
) -> Result<CameraStream, SourceError> {
    // Fail fast before spawning the capture thread.
    open_camera(index.clone())?;

    let stop = Arc::new(AtomicBool::new(false));
    let stop_flag = stop.clone();

    let handle = thread::spawn(move || {
        let mut camera = match open_camera(index) {
            Ok(camera) => camera,
            Err(err) => {
                log::error!("failed to reopen camera: {err}");
                return;
            }
        };

        while !stop_flag.load(Ordering::Relaxed) {
            let read_start = Instant::now();
            let buffer = match camera.frame() {
                Ok(buffer) => buffer,
                Err(err) => {
                    log::warn!(
                        "camera frame read failed (after {:?}): {err:?}",
                        read_start.elapsed()
                    );
                    continue;
                }
            };

            let decoded = match rgba::decode_camera_frame(&buffer) {
                Ok(decoded) => decoded,
                Err(err) => {
                    log::warn!("{err}");
                    continue;
                }
            };

            let frame = Frame {
                rgba: decoded.rgba,
                width: decoded.width,
                height: decoded.height,
                timestamp: Instant::now(),
            };

            // Drop the frame if the consumer is busy; never queue stale video.
            let _ = frame_tx.try_send(frame);
        }
    });

    Ok(CameraStream {
        stop,
        handle: Some(handle),
    })
}
