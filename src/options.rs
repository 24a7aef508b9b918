//! The shared options record mutated by the settings panel, plus the
//! declarative descriptors the panel is built from.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModelComplexity {
    Lite,
    Full,
    Heavy,
}

impl ModelComplexity {
    pub const ALL: [ModelComplexity; 3] = [
        ModelComplexity::Lite,
        ModelComplexity::Full,
        ModelComplexity::Heavy,
    ];

    /// Numeric level understood by the model family: 0, 1 or 2.
    pub fn level(&self) -> u32 {
        match self {
            ModelComplexity::Lite => 0,
            ModelComplexity::Full => 1,
            ModelComplexity::Heavy => 2,
        }
    }

    pub fn from_level(level: u32) -> Self {
        match level {
            0 => ModelComplexity::Lite,
            1 => ModelComplexity::Full,
            _ => ModelComplexity::Heavy,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ModelComplexity::Lite => "Lite",
            ModelComplexity::Full => "Full",
            ModelComplexity::Heavy => "Heavy",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PoseOptions {
    pub selfie_mode: bool,
    pub model_complexity: ModelComplexity,
    pub smooth_landmarks: bool,
    pub min_detection_confidence: f32,
    pub min_tracking_confidence: f32,
}

impl Default for PoseOptions {
    fn default() -> Self {
        Self {
            selfie_mode: true,
            model_complexity: ModelComplexity::Full,
            smooth_landmarks: true,
            min_detection_confidence: 0.5,
            min_tracking_confidence: 0.5,
        }
    }
}

impl PoseOptions {
    /// Confidence thresholds forced into [0, 1]. The detector applies this on
    /// every reconfiguration; callers hand records through unvalidated.
    pub fn clamped(mut self) -> Self {
        self.min_detection_confidence = self.min_detection_confidence.clamp(0.0, 1.0);
        self.min_tracking_confidence = self.min_tracking_confidence.clamp(0.0, 1.0);
        self
    }

    pub fn scalar(&self, field: OptionField) -> f32 {
        match field {
            OptionField::SelfieMode => self.selfie_mode as u8 as f32,
            OptionField::ModelComplexity => self.model_complexity.level() as f32,
            OptionField::SmoothLandmarks => self.smooth_landmarks as u8 as f32,
            OptionField::MinDetectionConfidence => self.min_detection_confidence,
            OptionField::MinTrackingConfidence => self.min_tracking_confidence,
        }
    }

    pub fn set_scalar(&mut self, field: OptionField, value: f32) {
        match field {
            OptionField::SelfieMode => self.selfie_mode = value >= 0.5,
            OptionField::ModelComplexity => {
                self.model_complexity = ModelComplexity::from_level(value.round().max(0.0) as u32)
            }
            OptionField::SmoothLandmarks => self.smooth_landmarks = value >= 0.5,
            OptionField::MinDetectionConfidence => self.min_detection_confidence = value,
            OptionField::MinTrackingConfidence => self.min_tracking_confidence = value,
        }
    }

    pub fn toggle(&mut self, field: OptionField) {
        let flipped = if self.scalar(field) >= 0.5 { 0.0 } else { 1.0 };
        self.set_scalar(field, flipped);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OptionField {
    SelfieMode,
    ModelComplexity,
    SmoothLandmarks,
    MinDetectionConfidence,
    MinTrackingConfidence,
}

/// One settings-panel control bound to an options field.
#[derive(Clone, Copy, Debug)]
pub enum Control {
    Toggle {
        title: &'static str,
        field: OptionField,
    },
    Slider {
        title: &'static str,
        field: OptionField,
        kind: SliderKind,
    },
}

#[derive(Clone, Copy, Debug)]
pub enum SliderKind {
    Range { min: f32, max: f32, step: f32 },
    Discrete(&'static [&'static str]),
}

pub const CONTROLS: &[Control] = &[
    Control::Toggle {
        title: "Selfie Mode",
        field: OptionField::SelfieMode,
    },
    Control::Slider {
        title: "Model Complexity",
        field: OptionField::ModelComplexity,
        kind: SliderKind::Discrete(&["Lite", "Full", "Heavy"]),
    },
    Control::Toggle {
        title: "Smooth Landmarks",
        field: OptionField::SmoothLandmarks,
    },
    Control::Slider {
        title: "Min Detection Confidence",
        field: OptionField::MinDetectionConfidence,
        kind: SliderKind::Range {
            min: 0.0,
            max: 1.0,
            step: 0.01,
        },
    },
    Control::Slider {
        title: "Min Tracking Confidence",
        field: OptionField::MinTrackingConfidence,
        kind: SliderKind::Range {
            min: 0.0,
            max: 1.0,
            step: 0.01,
        },
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complexity_levels_round_trip() {
        assert_eq!(ModelComplexity::Heavy.level(), 2);
        for complexity in ModelComplexity::ALL {
            assert_eq!(ModelComplexity::from_level(complexity.level()), complexity);
        }
    }

    #[test]
    fn setting_heavy_touches_nothing_else() {
        let mut options = PoseOptions::default();
        options.set_scalar(OptionField::ModelComplexity, 2.0);

        assert_eq!(options.model_complexity, ModelComplexity::Heavy);
        let reference = PoseOptions {
            model_complexity: ModelComplexity::Heavy,
            ..PoseOptions::default()
        };
        assert_eq!(options, reference);
    }

    #[test]
    fn clamp_only_affects_out_of_range_confidences() {
        let options = PoseOptions {
            min_detection_confidence: 1.7,
            min_tracking_confidence: -0.2,
            ..PoseOptions::default()
        }
        .clamped();
        assert_eq!(options.min_detection_confidence, 1.0);
        assert_eq!(options.min_tracking_confidence, 0.0);

        let untouched = PoseOptions::default().clamped();
        assert_eq!(untouched, PoseOptions::default());
    }

    #[test]
    fn toggle_flips_boolean_fields() {
        let mut options = PoseOptions::default();
        options.toggle(OptionField::SelfieMode);
        assert!(!options.selfie_mode);
        options.toggle(OptionField::SelfieMode);
        assert!(options.selfie_mode);
    }
}
