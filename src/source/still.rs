use std::{
    path::Path,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::{Duration, Instant},
};

use crossbeam_channel::Sender;
use image::ImageReader;

use super::SourceError;
use crate::types::Frame;

// Re-emit cadence for a still picture. Keeps the pipeline ticking so settings
// changes show their effect without a live camera.
const STILL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug)]
pub struct StillStream {
    stop: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl StillStream {
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

impl Drop for StillStream {
    fn drop(&mut self) {
        self.shutdown();
    }
}

pub fn start_still_stream(path: &Path, frame_tx: Sender<Frame>) -> Result<StillStream, SourceError> {
    let decode_err = |reason: String| SourceError::StillDecode {
        path: path.to_path_buf(),
        reason,
    };
    let rgba = ImageReader::open(path)
        .map_err(|err| decode_err(err.to_string()))?
        .decode()
        .map_err(|err| decode_err(err.to_string()))?
        .to_rgba8();
    let (width, height) = rgba.dimensions();
    let pixels = rgba.into_raw();

    let stop = Arc::new(AtomicBool::new(false));
    let stop_flag = stop.clone();

    let handle = thread::spawn(move || {
        while !stop_flag.load(Ordering::Relaxed) {
            let frame = Frame {
                rgba: pixels.clone(),
                width,
                height,
                timestamp: Instant::now(),
            };
            let _ = frame_tx.try_send(frame);
            thread::sleep(STILL_INTERVAL);
        }
    });

    Ok(StillStream {
        stop,
        handle: Some(handle),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::bounded;
    use std::env;

    #[test]
    fn missing_file_reports_the_path() {
        let (tx, _rx) = bounded(1);
        let path = env::temp_dir().join("pose-lens-does-not-exist.png");
        let err = start_still_stream(&path, tx).unwrap_err();
        match err {
            SourceError::StillDecode { path: reported, .. } => assert_eq!(reported, path),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn stream_re_emits_the_decoded_image() {
        let path = env::temp_dir().join("pose-lens-still-test.png");
        let buffer = image::RgbaImage::from_pixel(4, 3, image::Rgba([10, 20, 30, 255]));
        buffer.save(&path).unwrap();

        let (tx, rx) = bounded(1);
        let stream = start_still_stream(&path, tx).unwrap();
        let frame = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!((frame.width, frame.height), (4, 3));
        assert_eq!(&frame.rgba[..4], &[10, 20, 30, 255]);

        stream.stop();
        std::fs::remove_file(&path).ok();
    }
}
