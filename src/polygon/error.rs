use std::fmt;

/// Pipeline preconditions, reported before anything is drawn.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LayerError {
    #[error("simplification tolerance must be finite and non-negative, got {0}")]
    InvalidTolerance(f64),
    #[error("camera reported non-finite visible bounds")]
    InvalidViewport,
    #[error("camera wraps worlds but reports a world width of {0}")]
    InvalidWorldWidth(f64),
}

/// Why a polygon has no mesh this frame.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TriangulationError {
    #[error("exterior ring has only {0} usable vertices")]
    TooFewVertices(usize),
    #[error("ear clipping rejected the rings")]
    Earcut,
    #[error("ear clipping produced {0} indices")]
    InvalidIndexCount(usize),
    #[error("triangle index {0} is out of range")]
    IndexOutOfRange(usize),
    #[error("{0} vertices do not fit 32-bit indices")]
    TooManyVertices(usize),
}

/// Recoverable, per-polygon conditions detected while building a frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// Exterior has fewer than 3 distinct points; skipped.
    DegeneratePolygon { index: usize, points: usize },
    /// Failed optional ring validation; skipped.
    MalformedPolygon { index: usize, reason: String },
    /// No mesh for the alternate render path; skipped from mesh output.
    TriangulationFailed { index: usize, error: TriangulationError },
    /// Exact combine requested but the backend cannot do path ops; even-odd
    /// is used instead. Sent once per layer.
    ExactCombineUnavailable,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::DegeneratePolygon { index, points } => {
                write!(f, "polygon {index} skipped: exterior has {points} distinct points")
            }
            Diagnostic::MalformedPolygon { index, reason } => {
                write!(f, "polygon {index} skipped: {reason}")
            }
            Diagnostic::TriangulationFailed { index, error } => {
                write!(f, "polygon {index} has no mesh: {error}")
            }
            Diagnostic::ExactCombineUnavailable => write!(
                f,
                "exact combine fill is not supported by this backend, falling back to even-odd"
            ),
        }
    }
}

/// Receiver for diagnostics, injected into the layer.
pub type DiagnosticSink = Box<dyn FnMut(&Diagnostic) + Send>;

/// Sink that forwards to the `log` facade.
pub fn log_sink() -> DiagnosticSink {
    Box::new(|d: &Diagnostic| log::warn!("{d}"))
}
