use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use tui_polymap::map::{MapLayers, MapRenderer, Viewport};
use tui_polymap::polygon::{Color, Diagnostic, LayerOptions, PainterFillMethod};

/// Diagnostics kept for the status line.
const MAX_DIAGNOSTICS: usize = 4;

const INVERTED_COLOR: Color = Color::rgba(30, 30, 60, 128);

/// What the fill-method key cycles through.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FillMode {
    EvenOdd,
    ExactCombine,
    Triangulated,
}

impl FillMode {
    fn of(options: &LayerOptions) -> Self {
        match (options.use_alt_rendering, options.painter_fill_method) {
            (true, _) => FillMode::Triangulated,
            (false, PainterFillMethod::EvenOdd) => FillMode::EvenOdd,
            (false, PainterFillMethod::ExactCombine) => FillMode::ExactCombine,
        }
    }

    fn next(self) -> Self {
        match self {
            FillMode::EvenOdd => FillMode::ExactCombine,
            FillMode::ExactCombine => FillMode::Triangulated,
            FillMode::Triangulated => FillMode::EvenOdd,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            FillMode::EvenOdd => "even-odd",
            FillMode::ExactCombine => "exact",
            FillMode::Triangulated => "mesh",
        }
    }
}

/// Application state
pub struct App {
    pub viewport: Viewport,
    pub map_renderer: MapRenderer,
    pub should_quit: bool,
    /// Last mouse position for drag tracking
    pub last_mouse: Option<(u16, u16)>,
    /// Current mouse position for cursor marker
    pub mouse_pos: Option<(u16, u16)>,
    /// The left button moved since it was pressed
    dragged: bool,
    /// Result of the last click
    pub hit_info: Option<String>,
    /// Last pipeline error, cleared by the next good frame
    pub error: Option<String>,
    diagnostics: Arc<Mutex<VecDeque<String>>>,
}

impl App {
    pub fn new(width: usize, height: usize, options: LayerOptions) -> anyhow::Result<Self> {
        // Braille gives 2x4 resolution per character
        // Account for border (2 chars horizontal, 4 rows including the two status lines)
        let inner_width = width.saturating_sub(2);
        let inner_height = height.saturating_sub(4);

        let mut map_renderer = MapRenderer::new(options)?;
        let diagnostics = Arc::new(Mutex::new(VecDeque::new()));
        let sink = Arc::clone(&diagnostics);
        map_renderer
            .layer_mut()
            .set_diagnostic_sink(Box::new(move |d: &Diagnostic| {
                log::warn!("{d}");
                if let Ok(mut queue) = sink.lock() {
                    if queue.len() == MAX_DIAGNOSTICS {
                        queue.pop_front();
                    }
                    queue.push_back(d.to_string());
                }
            }));

        Ok(Self {
            viewport: Viewport::world(inner_width * 2, inner_height * 4),
            map_renderer,
            should_quit: false,
            last_mouse: None,
            mouse_pos: None,
            dragged: false,
            hit_info: None,
            error: None,
            diagnostics,
        })
    }

    /// Update viewport size when terminal resizes
    pub fn resize(&mut self, width: usize, height: usize) {
        let inner_width = width.saturating_sub(2);
        let inner_height = height.saturating_sub(4);
        self.viewport.width = inner_width * 2;
        self.viewport.height = inner_height * 4;
    }

    /// Run the polygon pipeline for a map area of `width` x `height` cells.
    pub fn render_map(&mut self, width: usize, height: usize) -> Option<MapLayers> {
        // Braille gives 2x4 resolution per character
        self.viewport.width = width * 2;
        self.viewport.height = height * 4;
        match self.map_renderer.render(width, height, &self.viewport) {
            Ok(layers) => {
                self.error = None;
                Some(layers)
            }
            Err(e) => {
                log::error!("frame failed: {e}");
                self.error = Some(e.to_string());
                None
            }
        }
    }

    pub fn pan(&mut self, dx: i32, dy: i32) {
        self.viewport.pan(dx as f64, dy as f64);
    }

    pub fn zoom_in(&mut self) {
        self.viewport.zoom_in();
    }

    pub fn zoom_out(&mut self) {
        self.viewport.zoom_out();
    }

    /// Terminal cell to braille pixel, accounting for the 1-cell border
    fn cell_to_pixel(col: u16, row: u16) -> (f64, f64) {
        (col.saturating_sub(1) as f64 * 2.0 + 1.0, row.saturating_sub(1) as f64 * 4.0 + 2.0)
    }

    /// Zoom in towards a screen position (terminal column/row)
    pub fn zoom_in_at(&mut self, col: u16, row: u16) {
        let (px, py) = Self::cell_to_pixel(col, row);
        self.viewport.zoom_in_at(px, py);
    }

    /// Zoom out from a screen position (terminal column/row)
    pub fn zoom_out_at(&mut self, col: u16, row: u16) {
        let (px, py) = Self::cell_to_pixel(col, row);
        self.viewport.zoom_out_at(px, py);
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    pub fn zoom_level(&self) -> String {
        format!("{:.1}x", self.viewport.zoom)
    }

    pub fn center_coords(&self) -> String {
        format!(
            "{:.1}°{}, {:.1}°{}",
            self.viewport.center_lat.abs(),
            if self.viewport.center_lat >= 0.0 { "N" } else { "S" },
            self.viewport.center_lon.abs(),
            if self.viewport.center_lon >= 0.0 { "E" } else { "W" }
        )
    }

    pub fn fill_mode(&self) -> FillMode {
        FillMode::of(self.map_renderer.options())
    }

    pub fn options(&self) -> &LayerOptions {
        self.map_renderer.options()
    }

    fn update_options(&mut self, f: impl FnOnce(&mut LayerOptions)) {
        if let Err(e) = self.map_renderer.update_options(f) {
            self.error = Some(e.to_string());
        }
    }

    pub fn cycle_fill_mode(&mut self) {
        let next = self.fill_mode().next();
        self.update_options(|o| {
            o.use_alt_rendering = next == FillMode::Triangulated;
            o.painter_fill_method = match next {
                FillMode::ExactCombine => PainterFillMethod::ExactCombine,
                _ => PainterFillMethod::EvenOdd,
            };
        });
    }

    pub fn toggle_culling(&mut self) {
        self.update_options(|o| o.polygon_culling = !o.polygon_culling);
    }

    pub fn toggle_single_world(&mut self) {
        self.update_options(|o| o.draw_in_single_world = !o.draw_in_single_world);
    }

    pub fn toggle_inverted(&mut self) {
        self.update_options(|o| {
            o.inverted_fill_color = match o.inverted_fill_color {
                Some(_) => None,
                None => Some(INVERTED_COLOR),
            }
        });
    }

    pub fn toggle_labels(&mut self) {
        self.update_options(|o| o.polygon_labels = !o.polygon_labels);
    }

    pub fn toggle_labels_last(&mut self) {
        self.update_options(|o| o.draw_labels_last = !o.draw_labels_last);
    }

    pub fn toggle_validation(&mut self) {
        self.update_options(|o| o.validate_rings = !o.validate_rings);
    }

    /// Pretend the backend lacks path operations (exercises the fallback).
    pub fn toggle_path_combine(&mut self) {
        let caps = &mut self.map_renderer.caps;
        caps.path_combine = !caps.path_combine;
    }

    pub fn adjust_tolerance(&mut self, delta: f64) {
        self.update_options(|o| {
            o.simplification_tolerance = ((o.simplification_tolerance + delta) * 10.0).round().max(0.0) / 10.0;
        });
    }

    /// Hit-test the polygons drawn last frame under a terminal cell.
    pub fn click(&mut self, col: u16, row: u16) {
        let (px, py) = Self::cell_to_pixel(col, row);
        let hits = self.map_renderer.hit_test(px, py);
        let geo = self.viewport.unproject(glam::DVec2::new(px, py));
        self.hit_info = Some(if hits.is_empty() {
            format!("nothing at {:.2}, {:.2}", geo.lat, geo.lon)
        } else {
            let names: Vec<String> = hits
                .iter()
                .map(|h| format!("{} (world {})", h.user_data().name, h.world))
                .collect();
            names.join(" > ")
        });
        log::info!("hit test at ({px}, {py}): {:?}", self.hit_info);
    }

    pub fn diagnostics(&self) -> Vec<String> {
        self.diagnostics
            .lock()
            .map(|q| q.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn mouse_down(&mut self, col: u16, row: u16) {
        self.last_mouse = Some((col, row));
        self.dragged = false;
    }

    /// Pan by the mouse delta since the last event
    pub fn handle_drag(&mut self, x: u16, y: u16) {
        if let Some((last_x, last_y)) = self.last_mouse {
            let dx = last_x as i32 - x as i32;
            let dy = last_y as i32 - y as i32;
            if dx != 0 || dy != 0 {
                self.dragged = true;
            }
            self.pan(dx * 2, dy * 4);
        }
        self.last_mouse = Some((x, y));
    }

    /// Button released: a press without movement is a click
    pub fn end_drag(&mut self, col: u16, row: u16) {
        if self.last_mouse.is_some() && !self.dragged {
            self.click(col, row);
        }
        self.last_mouse = None;
        self.dragged = false;
    }

    pub fn set_mouse_pos(&mut self, col: u16, row: u16) {
        self.mouse_pos = Some((col, row));
    }

    /// Mouse position in braille pixel coordinates (for the cursor marker)
    pub fn mouse_pixel_pos(&self) -> Option<(i32, i32)> {
        self.mouse_pos.map(|(col, row)| {
            let px = (col.saturating_sub(1) as i32) * 2;
            let py = (row.saturating_sub(1) as i32) * 4;
            (px, py)
        })
    }
}
