//! Wires the pipeline together: frames in, detector submissions out, results
//! onto the overlay canvas and the landmark grid, settings into the detector.

use crate::{
    detector::{Detector, DetectorError},
    fps::FpsCounter,
    grid::{ColorGroup, GridConfig, LandmarkGrid},
    options::PoseOptions,
    overlay::{Canvas, DrawStyle, draw_connectors, draw_markers},
    topology::{LEFT_LANDMARKS, NEUTRAL_LANDMARKS, POSE_CONNECTIONS, RIGHT_LANDMARKS},
    types::{Frame, PoseResult},
};

const VISIBILITY_MIN: f32 = 0.65;
const WHITE: [u8; 4] = [255, 255, 255, 255];
const LEFT_FILL: [u8; 4] = [255, 138, 0, 255];
const RIGHT_FILL: [u8; 4] = [0, 217, 231, 255];
const DEFAULT_CANVAS: (u32, u32) = (640, 480);

const WORLD_GROUPS: [ColorGroup; 2] = [
    ColorGroup {
        indices: LEFT_LANDMARKS,
        color: "LEFT",
    },
    ColorGroup {
        indices: RIGHT_LANDMARKS,
        color: "RIGHT",
    },
];

pub struct Orchestrator {
    options: PoseOptions,
    detector: Detector,
    canvas: Canvas,
    grid: LandmarkGrid,
    fps: FpsCounter,
    loaded: bool,
    mirror: bool,
}

impl Orchestrator {
    pub fn new(detector: Detector, options: PoseOptions) -> Self {
        Self {
            mirror: options.selfie_mode,
            options,
            detector,
            canvas: Canvas::new(DEFAULT_CANVAS.0, DEFAULT_CANVAS.1),
            grid: LandmarkGrid::new(GridConfig::default()),
            fps: FpsCounter::new(),
            loaded: false,
        }
    }

    /// Consumes one detection result. Never fails; a result without
    /// landmarks is the valid "nothing in frame" state and only clears the
    /// grid.
    pub fn handle_result(&mut self, result: &PoseResult) {
        self.loaded = true;
        self.fps.tick();

        if let Err(err) = self.canvas.blit_frame(&result.frame) {
            log::warn!("overlay blit failed: {err:?}");
        }

        let Some(world_landmarks) = &result.world_landmarks else {
            self.grid.clear();
            return;
        };

        if let Some(landmarks) = &result.landmarks {
            let connectors = DrawStyle {
                visibility_min: VISIBILITY_MIN,
                color: WHITE,
                fill_color: WHITE,
            };
            draw_connectors(&mut self.canvas, landmarks, POSE_CONNECTIONS, &connectors);

            for (subset, fill) in [
                (LEFT_LANDMARKS, LEFT_FILL),
                (RIGHT_LANDMARKS, RIGHT_FILL),
                (NEUTRAL_LANDMARKS, WHITE),
            ] {
                let markers = DrawStyle {
                    visibility_min: VISIBILITY_MIN,
                    color: WHITE,
                    fill_color: fill,
                };
                draw_markers(&mut self.canvas, landmarks, subset, &markers);
            }
        }

        self.grid
            .update_landmarks(world_landmarks, Some(POSE_CONNECTIONS), &WORLD_GROUPS);
    }

    /// Sizes the canvas to the frame's aspect ratio within the viewport and
    /// submits the frame. Blocks while the previous submission is still
    /// queued; the bounded channel is the backpressure.
    pub fn handle_frame(
        &mut self,
        frame: Frame,
        viewport: (u32, u32),
    ) -> Result<(), DetectorError> {
        let (width, height) = fit_canvas(viewport, frame.size());
        self.canvas.resize(width, height);
        self.detector.send(frame)
    }

    /// Takes the full record from the settings panel. Mirroring is applied
    /// here; everything else is the detector's to interpret.
    pub fn apply_options(&mut self, options: PoseOptions) {
        self.mirror = options.selfie_mode;
        if let Err(err) = self.detector.set_options(&options) {
            log::warn!("failed to reconfigure detector: {err}");
        }
        self.options = options;
    }

    /// The model tracks better when started cold on a new stream.
    pub fn handle_source_changed(&mut self) {
        if let Err(err) = self.detector.reset() {
            log::warn!("failed to reset detector: {err}");
        }
    }

    pub fn options(&self) -> &PoseOptions {
        &self.options
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    pub fn grid(&self) -> &LandmarkGrid {
        &self.grid
    }

    pub fn grid_mut(&mut self) -> &mut LandmarkGrid {
        &mut self.grid
    }

    pub fn fps(&self) -> &FpsCounter {
        &self.fps
    }

    pub fn loaded(&self) -> bool {
        self.loaded
    }

    pub fn mirror(&self) -> bool {
        self.mirror
    }
}

/// Canvas dimensions that keep the frame's aspect ratio inside the viewport:
/// landscape viewports are height-constrained, portrait and square ones
/// width-constrained.
pub fn fit_canvas(viewport: (u32, u32), frame: (u32, u32)) -> (u32, u32) {
    let (vw, vh) = (viewport.0.max(1), viewport.1.max(1));
    let (fw, fh) = (frame.0.max(1), frame.1.max(1));
    let aspect = fh as f32 / fw as f32;

    if vw > vh {
        let height = vh;
        let width = (vh as f32 / aspect).round().max(1.0) as u32;
        (width, height)
    } else {
        let width = vw;
        let height = (vw as f32 * aspect).round().max(1.0) as u32;
        (width, height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::detached_detector;
    use crate::topology::NUM_LANDMARKS;
    use crate::types::Landmark;
    use std::time::Instant;

    fn test_frame() -> Frame {
        let (w, h) = (8u32, 6u32);
        let mut rgba = vec![0u8; (w * h * 4) as usize];
        for (i, px) in rgba.chunks_exact_mut(4).enumerate() {
            px.copy_from_slice(&[(i % 251) as u8, (i % 83) as u8, (i % 47) as u8, 255]);
        }
        Frame {
            rgba,
            width: w,
            height: h,
            timestamp: Instant::now(),
        }
    }

    fn pose_result(visibility: f32) -> PoseResult {
        let landmarks = (0..NUM_LANDMARKS)
            .map(|i| {
                Landmark::new(
                    0.2 + 0.5 * (i as f32 / NUM_LANDMARKS as f32),
                    0.3 + 0.4 * (i as f32 / NUM_LANDMARKS as f32),
                    0.0,
                    visibility,
                )
            })
            .collect::<Vec<_>>();
        let world = landmarks
            .iter()
            .map(|lm| Landmark::new(lm.x - 0.5, lm.y - 0.5, 0.1, lm.visibility))
            .collect();
        PoseResult {
            frame: test_frame(),
            landmarks: Some(landmarks),
            world_landmarks: Some(world),
        }
    }

    fn orchestrator() -> Orchestrator {
        Orchestrator::new(detached_detector(), PoseOptions::default())
    }

    #[test]
    fn landscape_viewport_is_height_constrained() {
        assert_eq!(fit_canvas((1000, 600), (640, 480)), (800, 600));
    }

    #[test]
    fn portrait_and_square_viewports_are_width_constrained() {
        assert_eq!(fit_canvas((600, 1000), (640, 480)), (600, 450));
        assert_eq!(fit_canvas((500, 500), (640, 480)), (500, 375));
    }

    #[test]
    fn missing_pose_clears_the_grid_and_draws_nothing_over_the_blit() {
        let mut orch = orchestrator();
        orch.handle_result(&pose_result(0.9));
        assert_eq!(orch.grid().landmark_count(), NUM_LANDMARKS);

        let frame = test_frame();
        orch.handle_result(&PoseResult::empty(frame.clone()));
        assert!(orch.grid().is_empty());

        let mut reference = Canvas::new(DEFAULT_CANVAS.0, DEFAULT_CANVAS.1);
        reference.blit_frame(&frame).unwrap();
        assert_eq!(orch.canvas().data(), reference.data());
    }

    #[test]
    fn detected_pose_reaches_canvas_and_grid() {
        let mut orch = orchestrator();
        orch.handle_result(&pose_result(0.9));

        let mut blit_only = Canvas::new(DEFAULT_CANVAS.0, DEFAULT_CANVAS.1);
        blit_only.blit_frame(&test_frame()).unwrap();
        assert_ne!(orch.canvas().data(), blit_only.data(), "skeleton was drawn");
        assert_eq!(orch.grid().landmark_count(), NUM_LANDMARKS);
    }

    #[test]
    fn low_visibility_pose_still_updates_the_grid_but_not_the_skeleton() {
        let mut orch = orchestrator();
        orch.handle_result(&pose_result(0.3));

        let mut blit_only = Canvas::new(DEFAULT_CANVAS.0, DEFAULT_CANVAS.1);
        blit_only.blit_frame(&test_frame()).unwrap();
        assert_eq!(
            orch.canvas().data(),
            blit_only.data(),
            "everything sits below the visibility cutoff"
        );
        assert_eq!(orch.grid().landmark_count(), NUM_LANDMARKS);
    }

    #[test]
    fn fps_ticks_once_per_result_regardless_of_detection() {
        let mut orch = orchestrator();
        orch.handle_result(&pose_result(0.9));
        orch.handle_result(&PoseResult::empty(test_frame()));
        orch.handle_result(&PoseResult::empty(test_frame()));
        assert_eq!(orch.fps().ticks(), 3);
        assert!(orch.loaded());
    }

    #[test]
    fn frame_intake_resizes_the_canvas_even_when_the_detector_is_gone() {
        let mut orch = orchestrator();
        let err = orch.handle_frame(test_frame(), (1000, 600));
        assert!(err.is_err(), "detached detector reports closed");
        assert_eq!(orch.canvas().width(), 800);
        assert_eq!(orch.canvas().height(), 600);
    }

    #[test]
    fn selfie_mode_drives_the_mirror_flag() {
        let mut orch = orchestrator();
        assert!(orch.mirror());

        let options = PoseOptions {
            selfie_mode: false,
            ..PoseOptions::default()
        };
        orch.apply_options(options.clone());
        assert!(!orch.mirror());
        assert_eq!(orch.options(), &options);
    }
}
