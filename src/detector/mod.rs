//! The pose detector: a worker thread owning the model sessions and all
//! temporal state, plus the cloneable handle the rest of the app talks to.
//! The frame channel is bounded to one slot, which is the whole backpressure
//! story: a submission waits until the worker has taken the previous frame.

mod ort;
mod smoothing;

use std::{path::PathBuf, thread};

use crossbeam_channel::{Receiver, Sender, bounded, select, unbounded};
use thiserror::Error;

use crate::{
    assets::{self, AssetLocator},
    options::{ModelComplexity, PoseOptions},
    topology::NUM_LANDMARKS,
    types::{Frame, Landmark, PoseResult},
};

use self::smoothing::LandmarkSmoother;

#[derive(Debug, Error)]
pub enum DetectorError {
    #[error("detector worker is no longer running")]
    ChannelClosed,
}

/// Raw model output for one frame, before gating and smoothing.
pub(crate) struct RawDetection {
    pub landmarks: Vec<Landmark>,
    pub world_landmarks: Vec<Landmark>,
    pub score: f32,
}

pub(crate) trait PoseEngine: Send + 'static {
    fn infer(&mut self, frame: &Frame) -> anyhow::Result<RawDetection>;
    fn set_complexity(&mut self, complexity: ModelComplexity) -> anyhow::Result<()>;
}

enum Command {
    SetOptions(PoseOptions),
    Reset,
}

/// Handle to the worker. Cheap to clone; dropping every handle ends the
/// worker once its channels disconnect.
#[derive(Clone)]
pub struct Detector {
    frame_tx: Sender<Frame>,
    command_tx: Sender<Command>,
}

impl Detector {
    /// Hands one frame to the worker. Blocks while a previous submission is
    /// still waiting to be picked up, so at most one is ever queued.
    pub fn send(&self, frame: Frame) -> Result<(), DetectorError> {
        self.frame_tx
            .send(frame)
            .map_err(|_| DetectorError::ChannelClosed)
    }

    /// Forwards the full options record. Confidence ranges are clamped here;
    /// callers pass whatever the panel produced.
    pub fn set_options(&self, options: &PoseOptions) -> Result<(), DetectorError> {
        self.command_tx
            .send(Command::SetOptions(options.clone().clamped()))
            .map_err(|_| DetectorError::ChannelClosed)
    }

    /// Drops tracking and smoothing state. Used when the input source
    /// changes; the model behaves better started cold on a new stream.
    pub fn reset(&self) -> Result<(), DetectorError> {
        self.command_tx
            .send(Command::Reset)
            .map_err(|_| DetectorError::ChannelClosed)
    }
}

#[derive(Clone)]
pub struct DetectorBackend {
    model_dir: PathBuf,
    locator: AssetLocator,
}

impl DetectorBackend {
    pub fn new(locator: AssetLocator) -> Self {
        Self {
            model_dir: assets::default_model_dir(),
            locator,
        }
    }

    pub fn model_path(&self, complexity: ModelComplexity) -> PathBuf {
        self.model_dir.join(assets::model_asset(complexity))
    }

    pub fn locator(&self) -> &AssetLocator {
        &self.locator
    }
}

impl Default for DetectorBackend {
    fn default() -> Self {
        Self::new(assets::default_locator())
    }
}

pub fn start_detector(
    backend: DetectorBackend,
    options: PoseOptions,
    result_tx: Sender<PoseResult>,
) -> (Detector, thread::JoinHandle<()>) {
    let (frame_tx, frame_rx) = bounded(1);
    let (command_tx, command_rx) = unbounded();

    let options = options.clamped();
    let handle = thread::spawn(move || {
        let engine = match ort::OrtEngine::new(backend, options.model_complexity) {
            Ok(engine) => {
                log::info!(
                    "pose ORT backend ready ({})",
                    options.model_complexity.label()
                );
                engine
            }
            Err(err) => {
                log::error!("failed to load pose model: {err:?}");
                return;
            }
        };

        run_worker_loop(engine, frame_rx, command_rx, result_tx, options);
    });

    (
        Detector {
            frame_tx,
            command_tx,
        },
        handle,
    )
}

fn run_worker_loop<E: PoseEngine>(
    mut engine: E,
    frame_rx: Receiver<Frame>,
    command_rx: Receiver<Command>,
    result_tx: Sender<PoseResult>,
    mut options: PoseOptions,
) {
    let mut smoother = LandmarkSmoother::new();
    let mut tracked = false;

    loop {
        select! {
            recv(command_rx) -> command => match command {
                Ok(Command::SetOptions(new_options)) => {
                    if new_options.model_complexity != options.model_complexity {
                        if let Err(err) = engine.set_complexity(new_options.model_complexity) {
                            log::error!("failed to switch pose model: {err:?}");
                        }
                    }
                    options = new_options;
                }
                Ok(Command::Reset) => {
                    smoother.reset();
                    tracked = false;
                }
                Err(_) => break,
            },
            recv(frame_rx) -> frame => match frame {
                Ok(frame) => process_frame(
                    &mut engine,
                    frame,
                    &options,
                    &mut smoother,
                    &mut tracked,
                    &result_tx,
                ),
                Err(_) => break,
            },
        }
    }
}

fn process_frame<E: PoseEngine>(
    engine: &mut E,
    frame: Frame,
    options: &PoseOptions,
    smoother: &mut LandmarkSmoother,
    tracked: &mut bool,
    result_tx: &Sender<PoseResult>,
) {
    let detection = match engine.infer(&frame) {
        Ok(detection) => detection,
        Err(err) => {
            log::warn!("pose inference failed: {err:?}");
            return;
        }
    };

    // While untracked the detection bar applies; once a pose is held, the
    // (usually lower) tracking bar keeps it.
    let threshold = if *tracked {
        options.min_tracking_confidence
    } else {
        options.min_detection_confidence
    };

    let result = if detection.score < threshold || detection.landmarks.len() < NUM_LANDMARKS {
        *tracked = false;
        smoother.reset();
        PoseResult::empty(frame)
    } else {
        *tracked = true;
        let (landmarks, world_landmarks) = if options.smooth_landmarks {
            smoother.apply(
                detection.landmarks,
                detection.world_landmarks,
                frame.timestamp,
            )
        } else {
            smoother.reset();
            (detection.landmarks, detection.world_landmarks)
        };
        PoseResult {
            frame,
            landmarks: Some(landmarks),
            world_landmarks: Some(world_landmarks),
        }
    };

    // Never block on the UI; a result it has not drained yet is stale anyway.
    let _ = result_tx.try_send(result);
}

/// Handle whose worker never existed. Lets the orchestrator be exercised
/// without model assets; every call reports `ChannelClosed`.
#[cfg(test)]
pub(crate) fn detached_detector() -> Detector {
    let (frame_tx, _) = bounded(1);
    let (command_tx, _) = unbounded();
    Detector {
        frame_tx,
        command_tx,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    struct StubEngine {
        score: f32,
    }

    impl StubEngine {
        fn with_score(score: f32) -> Self {
            Self { score }
        }
    }

    impl PoseEngine for StubEngine {
        fn infer(&mut self, _frame: &Frame) -> anyhow::Result<RawDetection> {
            let landmarks = vec![Landmark::new(0.5, 0.5, 0.0, 0.9); NUM_LANDMARKS];
            let world_landmarks = vec![Landmark::new(0.0, 0.0, 0.0, 0.9); NUM_LANDMARKS];
            Ok(RawDetection {
                landmarks,
                world_landmarks,
                score: self.score,
            })
        }

        fn set_complexity(&mut self, _complexity: ModelComplexity) -> anyhow::Result<()> {
            Ok(())
        }
    }

    fn frame() -> Frame {
        Frame {
            rgba: vec![0; 16],
            width: 2,
            height: 2,
            timestamp: Instant::now(),
        }
    }

    fn options() -> PoseOptions {
        PoseOptions {
            smooth_landmarks: false,
            ..PoseOptions::default()
        }
    }

    #[test]
    fn low_score_yields_an_empty_result() {
        let mut engine = StubEngine::with_score(0.2);
        let mut smoother = LandmarkSmoother::new();
        let mut tracked = false;
        let (tx, rx) = bounded(1);

        process_frame(
            &mut engine,
            frame(),
            &options(),
            &mut smoother,
            &mut tracked,
            &tx,
        );

        let result = rx.try_recv().unwrap();
        assert!(result.landmarks.is_none());
        assert!(result.world_landmarks.is_none());
        assert!(!tracked);
    }

    #[test]
    fn confident_score_yields_both_sequences() {
        let mut engine = StubEngine::with_score(0.9);
        let mut smoother = LandmarkSmoother::new();
        let mut tracked = false;
        let (tx, rx) = bounded(1);

        process_frame(
            &mut engine,
            frame(),
            &options(),
            &mut smoother,
            &mut tracked,
            &tx,
        );

        let result = rx.try_recv().unwrap();
        assert_eq!(result.landmarks.map(|l| l.len()), Some(NUM_LANDMARKS));
        assert!(result.world_landmarks.is_some());
        assert!(tracked);
    }

    #[test]
    fn tracking_bar_applies_once_tracked() {
        // Score clears detection (0.5) once, then sits between the tracking
        // bar (0.3) and the detection bar: the pose must be kept.
        let mut smoother = LandmarkSmoother::new();
        let mut tracked = false;
        let opts = PoseOptions {
            min_detection_confidence: 0.5,
            min_tracking_confidence: 0.3,
            smooth_landmarks: false,
            ..PoseOptions::default()
        };
        let (tx, rx) = bounded(1);

        let mut engine = StubEngine::with_score(0.6);
        process_frame(&mut engine, frame(), &opts, &mut smoother, &mut tracked, &tx);
        assert!(rx.try_recv().unwrap().has_pose());

        let mut engine = StubEngine::with_score(0.4);
        process_frame(&mut engine, frame(), &opts, &mut smoother, &mut tracked, &tx);
        assert!(rx.try_recv().unwrap().has_pose(), "held by the tracking bar");

        let mut engine = StubEngine::with_score(0.2);
        process_frame(&mut engine, frame(), &opts, &mut smoother, &mut tracked, &tx);
        assert!(!rx.try_recv().unwrap().has_pose());
        assert!(!tracked);
    }

    #[test]
    fn worker_switches_complexity_on_options_change() {
        let (frame_tx, frame_rx) = bounded::<Frame>(1);
        let (command_tx, command_rx) = unbounded();
        let (result_tx, result_rx) = bounded(1);

        let handle = thread::spawn(move || {
            let engine = StubEngine::with_score(0.9);
            run_worker_loop(engine, frame_rx, command_rx, result_tx, options());
        });

        let heavy = PoseOptions {
            model_complexity: ModelComplexity::Heavy,
            ..options()
        };
        command_tx.send(Command::SetOptions(heavy)).unwrap();
        frame_tx.send(frame()).unwrap();
        let result = result_rx
            .recv_timeout(std::time::Duration::from_secs(5))
            .unwrap();
        assert!(result.has_pose());

        drop(frame_tx);
        drop(command_tx);
        handle.join().unwrap();
    }

    #[test]
    fn handle_reports_a_dead_worker() {
        let (frame_tx, frame_rx) = bounded(1);
        let (command_tx, command_rx) = unbounded::<Command>();
        let detector = Detector {
            frame_tx,
            command_tx,
        };
        drop(frame_rx);
        drop(command_rx);

        assert!(matches!(
            detector.send(frame()),
            Err(DetectorError::ChannelClosed)
        ));
        assert!(detector.reset().is_err());
        assert!(detector.set_options(&PoseOptions::default()).is_err());
    }
}
