//! Fixed layout of the 33-point full-body landmark set: index identities,
//! the connection topology drawn as the skeleton, and the body-side groups
//! used for marker coloring.

pub const NUM_LANDMARKS: usize = 33;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(usize)]
#[allow(dead_code)]
pub enum PoseLandmark {
    Nose = 0,
    LeftEyeInner = 1,
    LeftEye = 2,
    LeftEyeOuter = 3,
    RightEyeInner = 4,
    RightEye = 5,
    RightEyeOuter = 6,
    LeftEar = 7,
    RightEar = 8,
    MouthLeft = 9,
    MouthRight = 10,
    LeftShoulder = 11,
    RightShoulder = 12,
    LeftElbow = 13,
    RightElbow = 14,
    LeftWrist = 15,
    RightWrist = 16,
    LeftPinky = 17,
    RightPinky = 18,
    LeftIndex = 19,
    RightIndex = 20,
    LeftThumb = 21,
    RightThumb = 22,
    LeftHip = 23,
    RightHip = 24,
    LeftKnee = 25,
    RightKnee = 26,
    LeftAnkle = 27,
    RightAnkle = 28,
    LeftHeel = 29,
    RightHeel = 30,
    LeftFootIndex = 31,
    RightFootIndex = 32,
}

pub const POSE_CONNECTIONS: &[(usize, usize)] = &[
    (0, 1),
    (1, 2),
    (2, 3),
    (3, 7),
    (0, 4),
    (4, 5),
    (5, 6),
    (6, 8),
    (9, 10),
    (11, 12),
    (11, 13),
    (13, 15),
    (15, 17),
    (15, 19),
    (15, 21),
    (17, 19),
    (12, 14),
    (14, 16),
    (16, 18),
    (16, 20),
    (16, 22),
    (18, 20),
    (11, 23),
    (12, 24),
    (23, 24),
    (23, 25),
    (24, 26),
    (25, 27),
    (26, 28),
    (27, 29),
    (28, 30),
    (29, 31),
    (30, 32),
    (27, 31),
    (28, 32),
];

/// Landmarks on the subject's left side.
pub const LEFT_LANDMARKS: &[usize] = &[1, 2, 3, 7, 9, 11, 13, 15, 17, 19, 21, 23, 25, 27, 29, 31];

/// Landmarks on the subject's right side.
pub const RIGHT_LANDMARKS: &[usize] = &[4, 5, 6, 8, 10, 12, 14, 16, 18, 20, 22, 24, 26, 28, 30, 32];

/// Midline landmarks belonging to neither side.
pub const NEUTRAL_LANDMARKS: &[usize] = &[0];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn side_groups_are_disjoint_and_cover_all_landmarks() {
        let mut seen = [false; NUM_LANDMARKS];
        for &idx in LEFT_LANDMARKS
            .iter()
            .chain(RIGHT_LANDMARKS)
            .chain(NEUTRAL_LANDMARKS)
        {
            assert!(!seen[idx], "landmark {idx} appears in two groups");
            seen[idx] = true;
        }
        assert!(seen.iter().all(|&s| s), "every landmark belongs to a group");
    }

    #[test]
    fn connections_stay_in_range() {
        for &(a, b) in POSE_CONNECTIONS {
            assert!(a < NUM_LANDMARKS && b < NUM_LANDMARKS);
            assert_ne!(a, b);
        }
    }
}
