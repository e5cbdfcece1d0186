use serde::{Deserialize, Serialize};

fn default_min_width() -> f64 {
    100.0
}

fn default_min_height() -> f64 {
    60.0
}

/// Settings consumed by the arrange and resize engines.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct LayoutSettings {
    /// Default inner gap between adjacent tiled children, in pixels.
    /// Individual nodes may override it; see `ContainerTree::set_gaps`.
    #[serde(default)]
    pub inner_gap: f64,
    /// Minimum width any node may be resized to.
    #[serde(default = "default_min_width")]
    pub min_width: f64,
    /// Minimum height any node may be resized to.
    #[serde(default = "default_min_height")]
    pub min_height: f64,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            inner_gap: 0.0,
            min_width: default_min_width(),
            min_height: default_min_height(),
        }
    }
}

impl LayoutSettings {
    pub fn min_extent(&self, axis: crate::geometry::Axis) -> f64 {
        match axis {
            crate::geometry::Axis::Horizontal => self.min_width,
            crate::geometry::Axis::Vertical => self.min_height,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_have_a_sane_floor() {
        let settings = LayoutSettings::default();
        assert_eq!(settings.inner_gap, 0.0);
        assert!(settings.min_width > 0.0);
        assert!(settings.min_height > 0.0);
    }

    #[test]
    fn deserializes_with_partial_fields() {
        let settings: LayoutSettings = serde_json::from_str(r#"{"inner_gap": 8.0}"#).unwrap();
        assert_eq!(settings.inner_gap, 8.0);
        assert_eq!(settings.min_width, default_min_width());
    }

    #[test]
    fn rejects_unknown_fields() {
        assert!(serde_json::from_str::<LayoutSettings>(r#"{"outer_gap": 1.0}"#).is_err());
    }
}
