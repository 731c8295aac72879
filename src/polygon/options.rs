use crate::polygon::error::LayerError;
use crate::polygon::fill::PainterFillMethod;
use crate::polygon::label::LabelPlacement;
use crate::polygon::types::Color;

/// Layer configuration. Changing it between frames is allowed; the layer
/// drops whatever cached state the change invalidates.
#[derive(Clone, Debug, PartialEq)]
pub struct LayerOptions {
    /// Draw fills as triangle meshes instead of paths
    pub use_alt_rendering: bool,
    /// Skip polygons whose bounding box misses the viewport
    pub polygon_culling: bool,
    pub polygon_labels: bool,
    /// Emit every label after every polygon instead of after its own polygon
    pub draw_labels_last: bool,
    /// Never replicate polygons across world copies
    pub draw_in_single_world: bool,
    pub painter_fill_method: PainterFillMethod,
    /// Fill everything outside the polygons with this color
    pub inverted_fill_color: Option<Color>,
    /// Maximum deviation in screen pixels; 0 disables simplification
    pub simplification_tolerance: f64,
    /// Do not skip simplification on rings that are already small
    pub high_quality_simplification: bool,
    pub label_placement: LabelPlacement,
    /// Reject self-intersecting rings and holes outside their exterior
    pub validate_rings: bool,
    /// Cache misses in one frame before projection/simplification go parallel
    pub parallel_threshold: usize,
}

impl Default for LayerOptions {
    fn default() -> Self {
        Self {
            use_alt_rendering: false,
            polygon_culling: true,
            polygon_labels: true,
            draw_labels_last: false,
            draw_in_single_world: false,
            painter_fill_method: PainterFillMethod::EvenOdd,
            inverted_fill_color: None,
            simplification_tolerance: 0.3,
            high_quality_simplification: false,
            label_placement: LabelPlacement::Centroid,
            validate_rings: false,
            parallel_threshold: 256,
        }
    }
}

impl LayerOptions {
    pub fn validate(&self) -> Result<(), LayerError> {
        let t = self.simplification_tolerance;
        if !t.is_finite() || t < 0.0 {
            return Err(LayerError::InvalidTolerance(t));
        }
        Ok(())
    }

    /// Apply `key = value` overrides, one per line. `#` starts a comment.
    /// Unknown keys and unparsable values are logged and skipped.
    pub fn apply_cfg(&mut self, text: &str) {
        for raw_line in text.lines() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut parts = line.splitn(2, '=');
            let key = parts.next().unwrap_or("").trim().to_ascii_lowercase();
            let value = parts.next().unwrap_or("").trim();
            if !self.apply_one(&key, value) {
                log::warn!("ignoring config line {line:?}");
            }
        }
    }

    fn apply_one(&mut self, key: &str, value: &str) -> bool {
        match key {
            "use_alt_rendering" => self.use_alt_rendering = parse_bool(value),
            "polygon_culling" => self.polygon_culling = parse_bool(value),
            "polygon_labels" => self.polygon_labels = parse_bool(value),
            "draw_labels_last" => self.draw_labels_last = parse_bool(value),
            "draw_in_single_world" => self.draw_in_single_world = parse_bool(value),
            "high_quality_simplification" => self.high_quality_simplification = parse_bool(value),
            "validate_rings" => self.validate_rings = parse_bool(value),
            "painter_fill_method" => {
                self.painter_fill_method = match value.to_ascii_lowercase().as_str() {
                    "evenodd" | "even_odd" => PainterFillMethod::EvenOdd,
                    "exactcombine" | "exact_combine" => PainterFillMethod::ExactCombine,
                    _ => return false,
                }
            }
            "label_placement" => {
                self.label_placement = match value.to_ascii_lowercase().as_str() {
                    "centroid" => LabelPlacement::Centroid,
                    "bounds_center" | "boundscenter" => LabelPlacement::BoundsCenter,
                    _ => return false,
                }
            }
            "inverted_fill_color" => {
                if value.eq_ignore_ascii_case("none") {
                    self.inverted_fill_color = None;
                } else {
                    match parse_hex_color(value) {
                        Some(c) => self.inverted_fill_color = Some(c),
                        None => return false,
                    }
                }
            }
            "simplification_tolerance" => match value.parse::<f64>() {
                Ok(t) => self.simplification_tolerance = t,
                Err(_) => return false,
            },
            "parallel_threshold" => match value.parse::<usize>() {
                Ok(n) => self.parallel_threshold = n,
                Err(_) => return false,
            },
            _ => return false,
        }
        true
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.to_ascii_lowercase().as_str(),
        "1" | "true" | "on" | "yes"
    )
}

/// `#rrggbb` or `#rrggbbaa`
pub fn parse_hex_color(value: &str) -> Option<Color> {
    let hex = value.strip_prefix('#')?;
    if !hex.is_ascii() {
        return None;
    }
    let byte = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
    match hex.len() {
        6 => Some(Color::rgb(byte(0)?, byte(2)?, byte(4)?)),
        8 => Some(Color::rgba(byte(0)?, byte(2)?, byte(4)?, byte(6)?)),
        _ => None,
    }
}
