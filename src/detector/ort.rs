use anyhow::{Context, Result, anyhow};
use fast_image_resize as fir;
use ndarray::Array4;
use ort::session::{Session, builder::GraphOptimizationLevel};
use ort::value::Tensor;
use rayon::prelude::*;

use super::{DetectorBackend, PoseEngine, RawDetection};
use crate::{
    assets,
    options::ModelComplexity,
    topology::NUM_LANDMARKS,
    types::{Frame, Landmark},
};

pub const INPUT_SIZE: u32 = 256;

// The landmark head emits 39 points (33 reported plus auxiliary anchors),
// five values each: x, y, z in input pixels and two logits.
const MODEL_POINTS: usize = 39;
const LANDMARK_STRIDE: usize = 5;
const WORLD_STRIDE: usize = 3;

pub(crate) struct OrtEngine {
    backend: DetectorBackend,
    session: Session,
    complexity: ModelComplexity,
}

impl OrtEngine {
    pub fn new(backend: DetectorBackend, complexity: ModelComplexity) -> Result<Self> {
        let session = load_session(&backend, complexity)?;
        Ok(Self {
            backend,
            session,
            complexity,
        })
    }
}

fn load_session(backend: &DetectorBackend, complexity: ModelComplexity) -> Result<Session> {
    let asset = assets::model_asset(complexity);
    let path = backend.model_path(complexity);
    assets::ensure_asset_ready(
        backend.locator(),
        asset,
        &path,
        assets::with_progress_bar(|_| {}),
    )?;

    Session::builder()?
        .with_optimization_level(GraphOptimizationLevel::Level3)?
        .with_intra_threads(2)?
        .commit_from_file(&path)
        .with_context(|| format!("failed to load ORT session from {}", path.display()))
}

impl PoseEngine for OrtEngine {
    fn infer(&mut self, frame: &Frame) -> Result<RawDetection> {
        let (input, letterbox) = prepare_input(frame, INPUT_SIZE)?;
        let tensor = Tensor::from_array(input)?;
        let outputs = self
            .session
            .run(ort::inputs![tensor])
            .context("failed to run ORT session")?;

        if outputs.len() < 3 {
            return Err(anyhow!(
                "model returned {} outputs, expected landmarks, score and world landmarks",
                outputs.len()
            ));
        }

        let flat: Vec<f32> = outputs[0].try_extract_array::<f32>()?.iter().copied().collect();
        let score = outputs[1]
            .try_extract_array::<f32>()
            .ok()
            .and_then(|arr| arr.iter().next().copied())
            .map(sigmoid)
            .unwrap_or(0.0);
        let world_flat: Vec<f32> = outputs[2].try_extract_array::<f32>()?.iter().copied().collect();

        let landmarks = decode_image_landmarks(&flat, &letterbox)?;
        let world_landmarks = decode_world_landmarks(&world_flat, &landmarks)?;

        Ok(RawDetection {
            landmarks,
            world_landmarks,
            score,
        })
    }

    fn set_complexity(&mut self, complexity: ModelComplexity) -> Result<()> {
        if complexity == self.complexity {
            return Ok(());
        }
        self.session = load_session(&self.backend, complexity)?;
        self.complexity = complexity;
        log::info!("pose model switched to {}", complexity.label());
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub(crate) struct Letterbox {
    pub scale: f32,
    pub pad_x: f32,
    pub pad_y: f32,
    pub orig_w: u32,
    pub orig_h: u32,
}

pub(crate) fn letterbox_for(width: u32, height: u32, target: u32) -> Letterbox {
    let scale = target as f32 / (width.max(height) as f32);
    let new_w = (width as f32 * scale).round().max(1.0) as u32;
    let new_h = (height as f32 * scale).round().max(1.0) as u32;
    Letterbox {
        scale,
        pad_x: ((target as i64 - new_w as i64) / 2).max(0) as f32,
        pad_y: ((target as i64 - new_h as i64) / 2).max(0) as f32,
        orig_w: width,
        orig_h: height,
    }
}

fn prepare_input(frame: &Frame, target: u32) -> Result<(Array4<f32>, Letterbox)> {
    let expected_len = (frame.width as usize)
        .saturating_mul(frame.height as usize)
        .saturating_mul(4);
    if frame.rgba.len() != expected_len {
        return Err(anyhow!(
            "frame buffer size mismatch: got {}, expected {}",
            frame.rgba.len(),
            expected_len
        ));
    }

    let letterbox = letterbox_for(frame.width, frame.height, target);
    let new_w = (frame.width as f32 * letterbox.scale).round().max(1.0) as u32;
    let new_h = (frame.height as f32 * letterbox.scale).round().max(1.0) as u32;

    let src_image = fir::images::Image::from_vec_u8(
        frame.width,
        frame.height,
        frame.rgba.clone(),
        fir::PixelType::U8x4,
    )?;
    let mut dst_image = fir::images::Image::new(new_w, new_h, fir::PixelType::U8x4);
    let mut resizer = fir::Resizer::new();
    let resize_options = fir::ResizeOptions::new()
        .resize_alg(fir::ResizeAlg::Interpolation(fir::FilterType::Bilinear));
    resizer
        .resize(&src_image, &mut dst_image, Some(&resize_options))
        .context("model input resize failed")?;
    let resized = dst_image.into_vec();

    let pad_x = letterbox.pad_x as usize;
    let pad_y = letterbox.pad_y as usize;
    let mut canvas = vec![0u8; (target as usize) * (target as usize) * 4];
    for px in canvas.chunks_mut(4) {
        px[3] = 255;
    }
    let dst_stride = target as usize * 4;
    let src_stride = new_w as usize * 4;
    for row in 0..(new_h as usize) {
        let dst_offset = (pad_y + row) * dst_stride + pad_x * 4;
        let src_offset = row * src_stride;
        canvas[dst_offset..dst_offset + src_stride]
            .copy_from_slice(&resized[src_offset..src_offset + src_stride]);
    }

    let normalized: Vec<f32> = canvas
        .par_chunks_exact(4)
        .flat_map_iter(|px| {
            [
                px[0] as f32 / 255.0,
                px[1] as f32 / 255.0,
                px[2] as f32 / 255.0,
            ]
        })
        .collect();
    let input =
        Array4::<f32>::from_shape_vec((1, target as usize, target as usize, 3), normalized)
            .map_err(|err| anyhow!("failed to build input tensor: {err}"))?;

    Ok((input, letterbox))
}

/// Maps the model-space landmark head back through the letterbox into
/// frame-normalized coordinates.
pub(crate) fn decode_image_landmarks(flat: &[f32], letterbox: &Letterbox) -> Result<Vec<Landmark>> {
    if flat.len() < MODEL_POINTS * LANDMARK_STRIDE {
        return Err(anyhow!(
            "unexpected landmark tensor length: got {}, need {}",
            flat.len(),
            MODEL_POINTS * LANDMARK_STRIDE
        ));
    }

    let frame_w = (letterbox.orig_w.max(1)) as f32;
    let frame_h = (letterbox.orig_h.max(1)) as f32;
    let mut landmarks = Vec::with_capacity(NUM_LANDMARKS);
    for chunk in flat.chunks_exact(LANDMARK_STRIDE).take(NUM_LANDMARKS) {
        let x = ((chunk[0] - letterbox.pad_x) / letterbox.scale) / frame_w;
        let y = ((chunk[1] - letterbox.pad_y) / letterbox.scale) / frame_h;
        let z = (chunk[2] / letterbox.scale) / frame_w;
        landmarks.push(Landmark::new(x, y, z, sigmoid(chunk[3])));
    }
    Ok(landmarks)
}

/// World landmarks arrive in meters; visibility is not part of the tensor and
/// is carried over from the image-space landmark at the same index.
pub(crate) fn decode_world_landmarks(
    flat: &[f32],
    image_landmarks: &[Landmark],
) -> Result<Vec<Landmark>> {
    if flat.len() < MODEL_POINTS * WORLD_STRIDE {
        return Err(anyhow!(
            "unexpected world tensor length: got {}, need {}",
            flat.len(),
            MODEL_POINTS * WORLD_STRIDE
        ));
    }

    let mut landmarks = Vec::with_capacity(NUM_LANDMARKS);
    for (idx, chunk) in flat
        .chunks_exact(WORLD_STRIDE)
        .take(NUM_LANDMARKS)
        .enumerate()
    {
        let visibility = image_landmarks.get(idx).map_or(0.0, |lm| lm.visibility);
        landmarks.push(Landmark::new(chunk[0], chunk[1], chunk[2], visibility));
    }
    Ok(landmarks)
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letterbox_pads_the_short_axis() {
        let lb = letterbox_for(640, 480, 256);
        assert!((lb.scale - 0.4).abs() < 1e-6);
        assert_eq!(lb.pad_x, 0.0);
        assert_eq!(lb.pad_y, 32.0);
    }

    #[test]
    fn decode_round_trips_the_frame_center() {
        let lb = letterbox_for(640, 480, 256);
        let mut flat = vec![0.0f32; MODEL_POINTS * LANDMARK_STRIDE];
        // Model-space center of the letterboxed image.
        flat[0] = 128.0;
        flat[1] = 128.0;
        flat[3] = 10.0; // visibility logit, saturates near 1

        let decoded = decode_image_landmarks(&flat, &lb).unwrap();
        assert_eq!(decoded.len(), NUM_LANDMARKS);
        assert!((decoded[0].x - 0.5).abs() < 1e-4);
        assert!((decoded[0].y - 0.5).abs() < 1e-4);
        assert!(decoded[0].visibility > 0.99);
    }

    #[test]
    fn world_landmarks_inherit_visibility() {
        let lb = letterbox_for(640, 480, 256);
        let mut image_flat = vec![0.0f32; MODEL_POINTS * LANDMARK_STRIDE];
        image_flat[3] = 10.0;
        let image = decode_image_landmarks(&image_flat, &lb).unwrap();

        let mut world_flat = vec![0.0f32; MODEL_POINTS * WORLD_STRIDE];
        world_flat[0] = 0.25;
        world_flat[1] = -0.5;
        let world = decode_world_landmarks(&world_flat, &image).unwrap();
        assert_eq!(world.len(), NUM_LANDMARKS);
        assert_eq!(world[0].x, 0.25);
        assert_eq!(world[0].y, -0.5);
        assert!(world[0].visibility > 0.99);
        assert!(world[1].visibility < 0.51);
    }

    #[test]
    fn short_tensors_are_rejected() {
        let lb = letterbox_for(64, 64, 256);
        assert!(decode_image_landmarks(&[0.0; 10], &lb).is_err());
        assert!(decode_world_landmarks(&[0.0; 10], &[]).is_err());
    }
}
