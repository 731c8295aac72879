use std::sync::Arc;

use glam::DVec2;

use crate::braille::BrailleCanvas;
use crate::data::Feature;
use crate::map::projection::Viewport;
use crate::map::raster::{draw_ring, fill_rings, PixelGrid, Stipple};
use crate::polygon::{
    BackendCaps, Color, DrawCommand, FillRule, FrameInputs, FrameStats, LayerError, LayerOptions,
    PolygonHit, PolygonLayer, SourcePolygon,
};

/// Rasterized frame: one braille canvas per color, back to front, plus text.
pub struct MapLayers {
    pub layers: Vec<(Color, BrailleCanvas)>,
    /// (column, row, text) in character cells
    pub labels: Vec<(u16, u16, String)>,
}

/// Rasterize draw commands onto braille canvases of `width` x `height` cells.
///
/// Commands are painted in order; a later command owns every pixel it
/// touches, so a canvas never shows pixels that were painted over.
pub fn render_commands(commands: &[DrawCommand], width: usize, height: usize) -> MapLayers {
    let mut grid = PixelGrid::new(width * 2, height * 4);
    let mut palette: Vec<Color> = Vec::new();
    let mut labels = Vec::new();

    let mut slot_for = |color: Color| -> u16 {
        let index = match palette.iter().position(|&c| c == color) {
            Some(i) => i,
            None => {
                palette.push(color);
                palette.len() - 1
            }
        };
        index as u16 + 1
    };

    for command in commands {
        match command {
            DrawCommand::InvertedBackground { path, rule, color } | DrawCommand::Fill { path, rule, color, .. } => {
                if color.a == 0 {
                    continue;
                }
                let slot = slot_for(*color);
                fill_rings(&mut grid, &path.rings, *rule, Stipple::for_alpha(color.a), slot);
            }
            DrawCommand::Mesh { mesh, color, .. } => {
                if color.a == 0 {
                    continue;
                }
                let slot = slot_for(*color);
                let stipple = Stipple::for_alpha(color.a);
                for triangle in mesh.triangles() {
                    fill_rings(&mut grid, &[triangle.to_vec()], FillRule::NonZero, stipple, slot);
                }
            }
            DrawCommand::Outline { rings, stroke, .. } => {
                if stroke.color.a == 0 {
                    continue;
                }
                let slot = slot_for(stroke.color);
                for ring in rings {
                    draw_ring(&mut grid, ring, stroke.width, slot);
                }
            }
            DrawCommand::Label(label) => {
                if let Some(cell) = label_cell(label.anchor, &label.text, width, height) {
                    labels.push((cell.0, cell.1, label.text.clone()));
                }
            }
        }
    }

    let mut layers: Vec<(Color, BrailleCanvas)> = palette
        .iter()
        .map(|&c| (c, BrailleCanvas::new(width, height)))
        .collect();
    for y in 0..grid.height() {
        for x in 0..grid.width() {
            let slot = grid.get(x, y);
            if slot > 0 {
                layers[slot as usize - 1].1.set_pixel(x, y);
            }
        }
    }

    MapLayers { layers, labels }
}

/// Character cell where a label centered on `anchor` starts.
fn label_cell(anchor: DVec2, text: &str, width: usize, height: usize) -> Option<(u16, u16)> {
    let cx = (anchor.x / 2.0).floor() - (text.chars().count() / 2) as f64;
    let cy = (anchor.y / 4.0).floor();
    if cy < 0.0 || cy >= height as f64 || (anchor.x / 2.0) >= width as f64 {
        return None;
    }
    Some((cx.max(0.0) as u16, cy as u16))
}

/// Display settings for the polygon layer
#[derive(Clone, Copy, Debug)]
pub struct DisplaySettings {
    pub show_outlines: bool,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self { show_outlines: true }
    }
}

/// Owns the polygon set and the pipeline that draws it.
pub struct MapRenderer {
    polygons: Vec<Arc<SourcePolygon<Feature>>>,
    layer: PolygonLayer<Feature>,
    pub caps: BackendCaps,
    pub settings: DisplaySettings,
    last_stats: FrameStats,
}

impl MapRenderer {
    pub fn new(options: LayerOptions) -> Result<Self, LayerError> {
        Ok(Self {
            polygons: Vec::new(),
            layer: PolygonLayer::new(options)?,
            caps: BackendCaps::default(),
            settings: DisplaySettings::default(),
            last_stats: FrameStats::default(),
        })
    }

    pub fn add_polygon(&mut self, polygon: SourcePolygon<Feature>) {
        self.polygons.push(Arc::new(polygon));
    }

    pub fn clear_polygons(&mut self) {
        self.polygons.clear();
        self.layer.teardown();
    }

    pub fn has_data(&self) -> bool {
        !self.polygons.is_empty()
    }

    pub fn polygon_count(&self) -> usize {
        self.polygons.len()
    }

    pub fn layer(&self) -> &PolygonLayer<Feature> {
        &self.layer
    }

    pub fn layer_mut(&mut self) -> &mut PolygonLayer<Feature> {
        &mut self.layer
    }

    pub fn options(&self) -> &LayerOptions {
        self.layer.options()
    }

    /// Change options through a closure; invalid results are rejected.
    pub fn update_options(&mut self, f: impl FnOnce(&mut LayerOptions)) -> Result<(), LayerError> {
        let mut options = self.layer.options().clone();
        f(&mut options);
        self.layer.set_options(options)
    }

    pub fn last_stats(&self) -> FrameStats {
        self.last_stats
    }

    /// Run the pipeline for `viewport` and rasterize the result.
    pub fn render(&mut self, width: usize, height: usize, viewport: &Viewport) -> Result<MapLayers, LayerError> {
        let output = self.layer.recompute(FrameInputs {
            polygons: &self.polygons,
            camera: viewport,
            caps: self.caps,
        })?;
        self.last_stats = output.stats;
        let commands: Vec<DrawCommand> = if self.settings.show_outlines {
            output.commands
        } else {
            output
                .commands
                .into_iter()
                .filter(|c| !matches!(c, DrawCommand::Outline { .. }))
                .collect()
        };
        Ok(render_commands(&commands, width, height))
    }

    /// Polygons under a braille pixel, topmost first.
    pub fn hit_test(&self, px: f64, py: f64) -> Vec<PolygonHit<Feature>> {
        self.layer.hit_test(DVec2::new(px, py))
    }

    pub fn toggle_outlines(&mut self) {
        self.settings.show_outlines = !self.settings.show_outlines;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::polygon::{CompoundPath, LabelCommand};

    fn square(x0: f64, y0: f64, size: f64) -> Vec<DVec2> {
        vec![
            DVec2::new(x0, y0),
            DVec2::new(x0 + size, y0),
            DVec2::new(x0 + size, y0 + size),
            DVec2::new(x0, y0 + size),
        ]
    }

    #[test]
    fn test_later_commands_paint_over() {
        let red = Color::rgb(255, 0, 0);
        let blue = Color::rgb(0, 0, 255);
        let fill = |ring, color| DrawCommand::Fill {
            path: CompoundPath { rings: vec![ring] },
            rule: FillRule::EvenOdd,
            color,
            polygons: vec![0],
        };
        let commands = vec![fill(square(0.0, 0.0, 8.0), red), fill(square(0.0, 0.0, 4.0), blue)];
        let out = render_commands(&commands, 4, 2);
        assert_eq!(out.layers.len(), 2);
        let (_, red_canvas) = &out.layers[0];
        let (_, blue_canvas) = &out.layers[1];
        assert!(!red_canvas.get_pixel(1, 1));
        assert!(blue_canvas.get_pixel(1, 1));
        assert!(red_canvas.get_pixel(6, 6));
    }

    #[test]
    fn test_labels_are_centered_on_anchor() {
        let commands = vec![DrawCommand::Label(LabelCommand {
            text: "abcd".into(),
            anchor: DVec2::new(20.0, 8.0),
            polygon: 0,
        })];
        let out = render_commands(&commands, 20, 5);
        assert_eq!(out.labels, vec![(8, 2, "abcd".to_string())]);
    }

    #[test]
    fn test_transparent_fill_is_skipped() {
        let commands = vec![DrawCommand::Fill {
            path: CompoundPath { rings: vec![square(0.0, 0.0, 4.0)] },
            rule: FillRule::EvenOdd,
            color: Color::rgba(0, 0, 0, 0),
            polygons: vec![0],
        }];
        assert!(render_commands(&commands, 2, 1).layers.is_empty());
    }
}
