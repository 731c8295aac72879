mod projection;
mod raster;
mod renderer;

pub use projection::Viewport;
pub use raster::{PixelGrid, Stipple};
pub use renderer::{render_commands, DisplaySettings, MapLayers, MapRenderer};
