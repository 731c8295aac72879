//! Polygon overlay pipeline: geographic polygons with holes in, draw
//! commands and hit-test results out.

pub mod combine;
pub mod cull;
pub mod error;
pub mod fill;
pub mod hit;
pub mod label;
pub mod layer;
pub mod mesh;
pub mod options;
pub mod project;
pub mod simplify;
pub mod types;
pub mod validate;

pub use error::{Diagnostic, DiagnosticSink, LayerError, TriangulationError};
pub use fill::{BackendCaps, CompoundPath, DrawCommand, FillMethod, FillRule, PainterFillMethod};
pub use hit::{HitNotifier, PolygonHit};
pub use label::{LabelCommand, LabelPlacement};
pub use layer::{FrameInputs, FrameOutput, FrameStats, PolygonLayer};
pub use mesh::TriangleMesh;
pub use options::LayerOptions;
pub use project::Camera;
pub use types::{
    Bounds, Color, LatLng, PolygonKey, PolygonStyle, RenderedPolygon, Ring, SimplifiedPolygon,
    SourcePolygon, StrokeStyle,
};
