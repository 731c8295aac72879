//! Polygon overlays for terminal maps.
//!
//! The [`polygon`] module is the rendering pipeline; [`map`] and [`braille`]
//! rasterize its draw commands into a terminal and [`data`] loads GeoJSON.

pub mod braille;
pub mod data;
mod hash;
pub mod map;
pub mod polygon;
