mod app;
mod logging;
mod ui;

use anyhow::{Context, Result};
use app::App;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, MouseButton,
    MouseEvent, MouseEventKind,
};
use crossterm::execute;
use ratatui::DefaultTerminal;
use std::path::Path;
use std::time::Duration;
use tui_polymap::data;
use tui_polymap::polygon::LayerOptions;

const CONFIG_FILE: &str = "polymap.cfg";
const LOG_FILE: &str = "tui-polymap.log";

fn main() -> Result<()> {
    logging::init_logger(Path::new(LOG_FILE), log::LevelFilter::Info);
    let options = load_options()?;

    let mut terminal = ratatui::init();
    terminal.clear()?;
    execute!(std::io::stdout(), EnableMouseCapture)?;

    let result = run(&mut terminal, options);

    let _ = execute!(std::io::stdout(), DisableMouseCapture);
    ratatui::restore();

    result
}

/// Defaults, overridden by `polymap.cfg` when present.
fn load_options() -> Result<LayerOptions> {
    let mut options = LayerOptions::default();
    let path = Path::new(CONFIG_FILE);
    if path.exists() {
        let text = std::fs::read_to_string(path).with_context(|| format!("reading {CONFIG_FILE}"))?;
        options.apply_cfg(&text);
        log::info!("applied {CONFIG_FILE}");
    }
    options.validate().with_context(|| format!("invalid settings in {CONFIG_FILE}"))?;
    Ok(options)
}

fn build_app(terminal: &DefaultTerminal, options: LayerOptions) -> Result<App> {
    let size = terminal.size()?;
    let mut app = App::new(size.width as usize, size.height as usize, options)?;

    let data_dir = Path::new("data");
    if data_dir.exists() {
        if let Err(e) = data::load_all_geojson(&mut app.map_renderer, data_dir) {
            log::warn!("could not load {}: {e:#}", data_dir.display());
        }
    }

    // Fall back to built-in polygons if no data loaded
    if !app.map_renderer.has_data() {
        data::generate_sample_polygons(&mut app.map_renderer);
    }
    Ok(app)
}

/// Handle mouse events for panning, zooming and hit-testing
fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    app.set_mouse_pos(mouse.column, mouse.row);

    match mouse.kind {
        MouseEventKind::ScrollUp => app.zoom_in_at(mouse.column, mouse.row),
        MouseEventKind::ScrollDown => app.zoom_out_at(mouse.column, mouse.row),
        // Horizontal scroll for panning (trackpad two-finger swipe)
        MouseEventKind::ScrollLeft => app.pan(-15, 0),
        MouseEventKind::ScrollRight => app.pan(15, 0),
        MouseEventKind::Down(MouseButton::Left) => app.mouse_down(mouse.column, mouse.row),
        MouseEventKind::Drag(MouseButton::Left) => app.handle_drag(mouse.column, mouse.row),
        MouseEventKind::Up(MouseButton::Left) => app.end_drag(mouse.column, mouse.row),
        MouseEventKind::Down(MouseButton::Right) => app.click(mouse.column, mouse.row),
        _ => {}
    }
}

fn run(terminal: &mut DefaultTerminal, options: LayerOptions) -> Result<()> {
    let mut app = build_app(terminal, options.clone())?;

    loop {
        terminal.draw(|frame| ui::render(frame, &mut app))?;

        // ~60fps target
        if event::poll(Duration::from_millis(16))? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => app.quit(),

                    // Pan with hjkl or arrow keys
                    KeyCode::Left | KeyCode::Char('h') => app.pan(-10, 0),
                    KeyCode::Right | KeyCode::Char('l') => app.pan(10, 0),
                    KeyCode::Up | KeyCode::Char('k') => app.pan(0, -6),
                    KeyCode::Down | KeyCode::Char('j') => app.pan(0, 6),

                    KeyCode::Char('+') | KeyCode::Char('=') => app.zoom_in(),
                    KeyCode::Char('-') | KeyCode::Char('_') => app.zoom_out(),

                    // Pipeline options
                    KeyCode::Char('f') | KeyCode::Char('F') => app.cycle_fill_mode(),
                    KeyCode::Char('c') | KeyCode::Char('C') => app.toggle_culling(),
                    KeyCode::Char('w') | KeyCode::Char('W') => app.toggle_single_world(),
                    KeyCode::Char('i') | KeyCode::Char('I') => app.toggle_inverted(),
                    KeyCode::Char('L') => app.toggle_labels(),
                    KeyCode::Char('t') | KeyCode::Char('T') => app.toggle_labels_last(),
                    KeyCode::Char('v') | KeyCode::Char('V') => app.toggle_validation(),
                    KeyCode::Char('x') | KeyCode::Char('X') => app.toggle_path_combine(),
                    KeyCode::Char('o') | KeyCode::Char('O') => app.map_renderer.toggle_outlines(),
                    KeyCode::Char('[') => app.adjust_tolerance(-0.5),
                    KeyCode::Char(']') => app.adjust_tolerance(0.5),

                    // Reset view and options
                    KeyCode::Char('r') | KeyCode::Char('0') => {
                        app = build_app(terminal, options.clone())?;
                    }

                    _ => {}
                },
                Event::Mouse(mouse) => handle_mouse(&mut app, mouse),
                Event::Resize(width, height) => app.resize(width as usize, height as usize),
                _ => {}
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}
