//! Tone keys and the slider quantization rule.
//!
//! A [`ToneKey`] labels one skin-tone variant of the character ("0.0" up to
//! "0.5" by default). The slider produces integer values that are scaled and
//! rounded to one decimal to select the key that should be visible.

use std::fmt;

/// Factor applied to the slider value before rounding (slider `2` becomes `"0.2"`).
pub const DEFAULT_TONE_SCALE: f64 = 0.1;

/// Label of a quantized texture-tone variant.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ToneKey(String);

impl ToneKey {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Maps a raw control value to a key: `round(value * scale, 1 decimal)`.
    ///
    /// There is no range validation. A value outside the slider bounds yields a
    /// key that matches no registered variant.
    pub fn quantize(control_value: f64, scale: f64) -> Self {
        // rounding before formatting keeps ties away from zero ("0.25" -> "0.3")
        let rounded = (control_value * scale * 10.0).round() / 10.0 + 0.0;
        Self(format!("{:.1}", rounded))
    }
}

impl fmt::Display for ToneKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ToneKey {
    fn from(label: &str) -> Self {
        Self::new(label)
    }
}

impl From<String> for ToneKey {
    fn from(label: String) -> Self {
        Self(label)
    }
}

/// The fixed, ordered set of tone keys known at startup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToneSet {
    keys: Vec<ToneKey>,
}

impl ToneSet {
    /// Builds a set from keys in the given order. Duplicates are dropped.
    pub fn new(keys: impl IntoIterator<Item = ToneKey>) -> Self {
        let mut unique: Vec<ToneKey> = Vec::new();
        for key in keys {
            if unique.contains(&key) {
                log::warn!("Tone {} was registered twice, ignoring the duplicate", key);
                continue;
            }
            unique.push(key);
        }
        Self { keys: unique }
    }

    /// One key per integer slider position in `min..=max`.
    pub fn from_control_range(min: i32, max: i32, scale: f64) -> Self {
        Self::new((min..=max).map(|value| ToneKey::quantize(value as f64, scale)))
    }

    pub fn contains(&self, key: &ToneKey) -> bool {
        self.keys.contains(key)
    }

    pub fn position(&self, key: &ToneKey) -> Option<usize> {
        self.keys.iter().position(|k| k == key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ToneKey> {
        self.keys.iter()
    }
}

impl Default for ToneSet {
    fn default() -> Self {
        Self::from_control_range(0, 5, DEFAULT_TONE_SCALE)
    }
}

impl FromIterator<ToneKey> for ToneSet {
    fn from_iter<T: IntoIterator<Item = ToneKey>>(iter: T) -> Self {
        Self::new(iter)
    }
}
