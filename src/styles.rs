//! Style presets offered as inline buttons

use crate::session::StyleParameters;

/// Prefix of style button callback data, e.g. `style:happy`
pub const CALLBACK_PREFIX: &str = "style:";

/// Preset used when the flow skips the style keyboard
pub const DEFAULT_STYLE_ID: &str = "neutral";

/// A selectable speaking style
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StylePreset {
    pub id: &'static str,
    pub label: &'static str,
    pub emotion: &'static str,
    pub speed: f32,
}

impl StylePreset {
    pub fn parameters(&self) -> StyleParameters {
        StyleParameters::new(self.emotion, self.speed)
    }

    pub fn callback_data(&self) -> String {
        format!("{CALLBACK_PREFIX}{}", self.id)
    }
}

pub const PRESETS: &[StylePreset] = &[
    StylePreset {
        id: "neutral",
        label: "😐 Neutral",
        emotion: "neutral",
        speed: 1.0,
    },
    StylePreset {
        id: "happy",
        label: "😊 Happy",
        emotion: "happy",
        speed: 1.05,
    },
    StylePreset {
        id: "sad",
        label: "😢 Sad",
        emotion: "sad",
        speed: 0.9,
    },
    StylePreset {
        id: "angry",
        label: "😠 Angry",
        emotion: "angry",
        speed: 1.1,
    },
    StylePreset {
        id: "surprised",
        label: "😲 Surprised",
        emotion: "surprised",
        speed: 1.1,
    },
    StylePreset {
        id: "calm",
        label: "🐢 Calm and slow",
        emotion: "neutral",
        speed: 0.8,
    },
];

/// Buttons per keyboard row
pub const BUTTONS_PER_ROW: usize = 2;

pub fn find(id: &str) -> Option<&'static StylePreset> {
    PRESETS.iter().find(|preset| preset.id == id)
}

pub fn default_preset() -> &'static StylePreset {
    find(DEFAULT_STYLE_ID).unwrap_or(&PRESETS[0])
}

/// Resolve button callback data to a preset id.
/// Returns `None` when the data is not a style button at all.
pub fn parse_callback(data: &str) -> Option<&str> {
    data.strip_prefix(CALLBACK_PREFIX)
}
