use crate::app::App;
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget},
    Frame,
};
use tui_polymap::braille::BrailleCanvas;
use tui_polymap::map::MapLayers;
use tui_polymap::polygon::Color as PolyColor;

/// Render the UI
pub fn render(frame: &mut Frame, app: &mut App) {
    let area = frame.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(3),    // Map
            Constraint::Length(1), // Status bar
            Constraint::Length(1), // Hit test / diagnostics
        ])
        .split(area);

    render_map(frame, app, chunks[0]);
    render_status_bar(frame, app, chunks[1]);
    render_message_bar(frame, app, chunks[2]);
}

fn render_map(frame: &mut Frame, app: &mut App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            " Polygon Map ",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let Some(layers) = app.render_map(inner.width as usize, inner.height as usize) else {
        return;
    };

    let cursor_pos = app.mouse_pixel_pos().and_then(|(px, py)| {
        let cx = (px / 2) as u16;
        let cy = (py / 4) as u16;
        (cx < inner.width && cy < inner.height).then_some((cx, cy))
    });

    frame.render_widget(MapWidget { layers, cursor_pos }, inner);
}

/// Renders braille layers with text labels overlaid
struct MapWidget {
    layers: MapLayers,
    cursor_pos: Option<(u16, u16)>,
}

fn term_color(c: PolyColor) -> Color {
    Color::Rgb(c.r, c.g, c.b)
}

impl MapWidget {
    /// Render a braille canvas layer with a specific color
    fn render_layer(canvas: &BrailleCanvas, color: Color, area: Rect, buf: &mut Buffer) {
        for (row_idx, row_str) in canvas.rows().enumerate() {
            if row_idx >= area.height as usize {
                break;
            }
            let y = area.y + row_idx as u16;

            for (col_idx, ch) in row_str.chars().enumerate() {
                if col_idx >= area.width as usize {
                    break;
                }
                // Skip empty braille characters (U+2800)
                if ch == '\u{2800}' {
                    continue;
                }
                let x = area.x + col_idx as u16;
                buf[(x, y)].set_char(ch).set_fg(color);
            }
        }
    }
}

impl Widget for MapWidget {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // Back to front, in paint order
        for (color, canvas) in &self.layers.layers {
            Self::render_layer(canvas, term_color(*color), area, buf);
        }

        let label_style = Style::default().fg(Color::White).add_modifier(Modifier::BOLD);
        for (lx, ly, text) in &self.layers.labels {
            if *ly >= area.height || *lx >= area.width {
                continue;
            }
            let max_len = area.width.saturating_sub(*lx) as usize;
            for (i, ch) in text.chars().take(max_len.min(24)).enumerate() {
                buf[(area.x + lx + i as u16, area.y + ly)].set_char(ch).set_style(label_style);
            }
        }

        if let Some((cx, cy)) = self.cursor_pos {
            buf[(area.x + cx, area.y + cy)].set_char('╋').set_fg(Color::Red);
        }
    }
}

fn toggle(label: &'static str, on: bool) -> Span<'static> {
    Span::styled(label, Style::default().fg(if on { Color::Green } else { Color::DarkGray }))
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let options = app.options();
    let stats = app.map_renderer.last_stats();

    let status = Line::from(vec![
        Span::styled(" Zoom: ", Style::default().fg(Color::DarkGray)),
        Span::styled(app.zoom_level(), Style::default().fg(Color::Yellow)),
        Span::styled(" [f]ill:", Style::default().fg(Color::DarkGray)),
        Span::styled(app.fill_mode().name(), Style::default().fg(Color::Magenta)),
        Span::raw(" "),
        toggle("[c]ull ", options.polygon_culling),
        toggle("[w]single ", options.draw_in_single_world),
        toggle("[i]nvert ", options.inverted_fill_color.is_some()),
        toggle("[L]abels ", options.polygon_labels),
        toggle("[t]last ", options.draw_labels_last),
        toggle("[v]alidate ", options.validate_rings),
        toggle("[x]pathops ", app.map_renderer.caps.path_combine),
        Span::styled(
            format!("tol:{:.1} ", options.simplification_tolerance),
            Style::default().fg(Color::Cyan),
        ),
        Span::styled(
            format!(
                "| {}/{} drawn, {} culled, {} skipped ",
                stats.drawn, stats.sources, stats.culled, stats.skipped
            ),
            Style::default().fg(Color::DarkGray),
        ),
        Span::styled(app.center_coords(), Style::default().fg(Color::Cyan)),
    ]);

    frame.render_widget(Paragraph::new(status), area);
}

fn render_message_bar(frame: &mut Frame, app: &App, area: Rect) {
    let line = if let Some(ref error) = app.error {
        Line::from(Span::styled(format!(" error: {error}"), Style::default().fg(Color::Red)))
    } else if let Some(ref hit) = app.hit_info {
        Line::from(vec![
            Span::styled(" hit: ", Style::default().fg(Color::DarkGray)),
            Span::styled(hit.clone(), Style::default().fg(Color::White)),
        ])
    } else if let Some(last) = app.diagnostics().last() {
        Line::from(Span::styled(format!(" {last}"), Style::default().fg(Color::Yellow)))
    } else {
        Line::from(Span::styled(
            " hjkl:pan +/-:zoom [/]:tolerance click:hit-test r:reset q:quit",
            Style::default().fg(Color::DarkGray),
        ))
    };
    frame.render_widget(Paragraph::new(line), area);
}
