use std::time::Instant;

#[derive(Clone, Debug)]
pub struct Frame {
    pub rgba: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub timestamp: Instant,
}

impl Frame {
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// One pose landmark. `x`/`y`/`z` are normalized to the frame for the
/// image-space sequence and hip-centered meters for the world sequence.
/// `visibility` is in [0, 1].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub visibility: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32, z: f32, visibility: f32) -> Self {
        Self {
            x,
            y,
            z,
            visibility,
        }
    }
}

/// Output of one detector pass. Both landmark sequences are present when a
/// pose was found and both absent when it was not; an absent pair is a valid
/// "nothing in frame" state, not a failure.
#[derive(Clone, Debug)]
pub struct PoseResult {
    pub frame: Frame,
    pub landmarks: Option<Vec<Landmark>>,
    pub world_landmarks: Option<Vec<Landmark>>,
}

impl PoseResult {
    pub fn empty(frame: Frame) -> Self {
        Self {
            frame,
            landmarks: None,
            world_landmarks: None,
        }
    }

    pub fn has_pose(&self) -> bool {
        self.world_landmarks.is_some()
    }
}
