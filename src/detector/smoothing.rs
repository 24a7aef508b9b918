//! Temporal smoothing of landmark sequences. Exponential blend with a
//! cadence-aware coefficient, so a stalled stream snaps instead of dragging.

use std::time::Instant;

use crate::types::Landmark;

const TIME_CONSTANT_SECS: f32 = 0.08;
const MAX_GAP_SECS: f32 = 0.5;

pub struct LandmarkSmoother {
    state: Option<SmootherState>,
}

struct SmootherState {
    landmarks: Vec<Landmark>,
    world_landmarks: Vec<Landmark>,
    at: Instant,
}

impl LandmarkSmoother {
    pub fn new() -> Self {
        Self { state: None }
    }

    /// Blends the new sequences against the previous ones. The first call
    /// after construction or reset passes through unchanged.
    pub fn apply(
        &mut self,
        landmarks: Vec<Landmark>,
        world_landmarks: Vec<Landmark>,
        now: Instant,
    ) -> (Vec<Landmark>, Vec<Landmark>) {
        let Some(prev) = self.state.take() else {
            return self.store(landmarks, world_landmarks, now);
        };

        let dt = now.duration_since(prev.at).as_secs_f32();
        if dt > MAX_GAP_SECS
            || prev.landmarks.len() != landmarks.len()
            || prev.world_landmarks.len() != world_landmarks.len()
        {
            return self.store(landmarks, world_landmarks, now);
        }

        let alpha = 1.0 - (-dt / TIME_CONSTANT_SECS).exp();
        let blended = blend(&prev.landmarks, &landmarks, alpha);
        let blended_world = blend(&prev.world_landmarks, &world_landmarks, alpha);
        self.store(blended, blended_world, now)
    }

    fn store(
        &mut self,
        landmarks: Vec<Landmark>,
        world_landmarks: Vec<Landmark>,
        at: Instant,
    ) -> (Vec<Landmark>, Vec<Landmark>) {
        self.state = Some(SmootherState {
            landmarks: landmarks.clone(),
            world_landmarks: world_landmarks.clone(),
            at,
        });
        (landmarks, world_landmarks)
    }

    pub fn reset(&mut self) {
        self.state = None;
    }

    pub fn is_warm(&self) -> bool {
        self.state.is_some()
    }
}

fn blend(prev: &[Landmark], next: &[Landmark], alpha: f32) -> Vec<Landmark> {
    prev.iter()
        .zip(next)
        .map(|(p, n)| Landmark {
            x: p.x + (n.x - p.x) * alpha,
            y: p.y + (n.y - p.y) * alpha,
            z: p.z + (n.z - p.z) * alpha,
            visibility: p.visibility + (n.visibility - p.visibility) * alpha,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn seq(x: f32) -> Vec<Landmark> {
        vec![Landmark::new(x, x, x, 1.0)]
    }

    #[test]
    fn first_sample_passes_through() {
        let mut smoother = LandmarkSmoother::new();
        let (out, world) = smoother.apply(seq(0.3), seq(0.4), Instant::now());
        assert_eq!(out, seq(0.3));
        assert_eq!(world, seq(0.4));
        assert!(smoother.is_warm());
    }

    #[test]
    fn second_sample_lands_between_previous_and_next() {
        let mut smoother = LandmarkSmoother::new();
        let start = Instant::now();
        smoother.apply(seq(0.0), seq(0.0), start);
        let (out, _) = smoother.apply(seq(1.0), seq(1.0), start + Duration::from_millis(33));
        assert!(out[0].x > 0.0 && out[0].x < 1.0, "got {}", out[0].x);
    }

    #[test]
    fn long_gap_snaps_to_the_new_sample() {
        let mut smoother = LandmarkSmoother::new();
        let start = Instant::now();
        smoother.apply(seq(0.0), seq(0.0), start);
        let (out, _) = smoother.apply(seq(1.0), seq(1.0), start + Duration::from_secs(2));
        assert_eq!(out[0].x, 1.0);
    }

    #[test]
    fn repeated_resets_match_a_single_reset() {
        let mut smoother = LandmarkSmoother::new();
        smoother.apply(seq(0.5), seq(0.5), Instant::now());

        smoother.reset();
        let once = smoother.is_warm();
        smoother.reset();
        smoother.reset();
        assert_eq!(smoother.is_warm(), once);

        let (out, _) = smoother.apply(seq(0.9), seq(0.9), Instant::now());
        assert_eq!(out, seq(0.9), "post-reset sample passes through");
    }
}
