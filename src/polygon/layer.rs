//! The polygon layer: one pipeline instance with its caches.
//!
//! Per frame, in this order for every polygon: project, simplify (cached),
//! cull, resolve fill strategy and emit draw commands. The drawn set is kept
//! until the next frame so hit-testing sees exactly what was painted.

use std::collections::HashSet;
use std::sync::Arc;

use glam::DVec2;
use rayon::prelude::*;

use crate::hash::hash2;
use crate::polygon::cull::is_visible;
use crate::polygon::error::{log_sink, Diagnostic, DiagnosticSink, LayerError};
use crate::polygon::fill::{
    fill_batch, inverted_background, resolve_fill_method, BackendCaps, DrawCommand, FillMethod,
    PainterFillMethod,
};
use crate::polygon::hit::{hit_test, HitNotifier, PolygonHit};
use crate::polygon::label::{label_anchor, LabelCommand};
use crate::polygon::mesh::{MeshCache, MeshLookup};
use crate::polygon::options::LayerOptions;
use crate::polygon::project::{project_polygon, Camera};
use crate::polygon::simplify::{simplify_polygon, SimplificationCache};
use crate::polygon::types::{distinct_len, RenderedPolygon, SimplifiedPolygon, SourcePolygon};
use crate::polygon::validate::validate_polygon;

/// Everything one frame needs from the outside.
pub struct FrameInputs<'a, R, C: ?Sized> {
    /// Polygons in paint order (first is painted first)
    pub polygons: &'a [Arc<SourcePolygon<R>>],
    pub camera: &'a C,
    pub caps: BackendCaps,
}

/// Counters for one frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub sources: usize,
    /// Sources rejected as degenerate or malformed
    pub skipped: usize,
    /// World instances removed by culling
    pub culled: usize,
    /// World instances drawn
    pub drawn: usize,
    pub cache_hits: usize,
    pub cache_misses: usize,
    /// Instances that needed a mesh and have none
    pub mesh_failures: usize,
}

#[derive(Debug)]
pub struct FrameOutput {
    pub commands: Vec<DrawCommand>,
    pub stats: FrameStats,
}

enum Prepared {
    Ready(Vec<SimplifiedPolygon>),
    Degenerate(usize),
    Malformed(String),
}

pub struct PolygonLayer<R> {
    options: LayerOptions,
    simplification: SimplificationCache,
    meshes: MeshCache,
    rendered: Vec<RenderedPolygon<R>>,
    diagnostics: DiagnosticSink,
    combine_fallback_reported: bool,
}

impl<R> PolygonLayer<R> {
    pub fn new(options: LayerOptions) -> Result<Self, LayerError> {
        options.validate()?;
        Ok(Self {
            simplification: SimplificationCache::new(
                options.simplification_tolerance,
                options.high_quality_simplification,
            ),
            meshes: MeshCache::new(),
            rendered: Vec::new(),
            diagnostics: log_sink(),
            combine_fallback_reported: false,
            options,
        })
    }

    pub fn options(&self) -> &LayerOptions {
        &self.options
    }

    /// Replace the options. Invalid options leave the layer untouched.
    pub fn set_options(&mut self, options: LayerOptions) -> Result<(), LayerError> {
        options.validate()?;
        if options.validate_rings != self.options.validate_rings {
            self.simplification.clear();
        }
        self.simplification
            .configure(options.simplification_tolerance, options.high_quality_simplification);
        self.options = options;
        Ok(())
    }

    pub fn set_diagnostic_sink(&mut self, sink: DiagnosticSink) {
        self.diagnostics = sink;
    }

    /// Instances drawn by the last frame, in paint order.
    pub fn rendered(&self) -> &[RenderedPolygon<R>] {
        &self.rendered
    }

    /// Polygons under `point` in the last frame, topmost first.
    pub fn hit_test(&self, point: DVec2) -> Vec<PolygonHit<R>> {
        hit_test(&self.rendered, point)
    }

    /// Run a hit test and hand the result to `notifier`.
    pub fn notify_hits(&self, point: DVec2, notifier: &mut impl HitNotifier<R>) -> usize {
        let hits = self.hit_test(point);
        notifier.on_hits(point, &hits);
        hits.len()
    }

    /// Drop every cache and the drawn set.
    pub fn teardown(&mut self) {
        self.simplification.clear();
        self.meshes.clear();
        self.rendered.clear();
        self.combine_fallback_reported = false;
    }

    pub fn cached_polygons(&self) -> usize {
        self.simplification.len()
    }

    pub fn cached_meshes(&self) -> usize {
        self.meshes.len()
    }

    fn emit(&mut self, diagnostic: Diagnostic) {
        (self.diagnostics)(&diagnostic);
    }
}

impl<R: Send + Sync> PolygonLayer<R> {
    /// Build the draw commands for one frame.
    pub fn recompute<C>(&mut self, frame: FrameInputs<'_, R, C>) -> Result<FrameOutput, LayerError>
    where
        C: Camera + Sync + ?Sized,
    {
        let FrameInputs { polygons, camera, caps } = frame;
        let viewport = camera.visible_bounds();
        if !viewport.is_finite() {
            return Err(LayerError::InvalidViewport);
        }
        if camera.supports_world_wrap() && !self.options.draw_in_single_world {
            let w = camera.world_width();
            if !(w.is_finite() && w > 0.0) {
                return Err(LayerError::InvalidWorldWidth(w));
            }
        }

        let options = self.options.clone();
        let camera_key = hash2(camera.projection_key(), options.draw_in_single_world as u64);
        let mut stats = FrameStats {
            sources: polygons.len(),
            ..Default::default()
        };

        // Cache lookups; identical geometry is only computed once.
        let mut live = HashSet::with_capacity(polygons.len());
        let mut misses = Vec::new();
        for (index, source) in polygons.iter().enumerate() {
            let key = source.key();
            if live.insert(key) && self.simplification.lookup(key, camera_key).is_none() {
                misses.push(index);
            }
        }

        let prepare = |&index: &usize| prepare_polygon(&polygons[index], camera, &options);
        let prepared: Vec<Prepared> = if misses.len() >= options.parallel_threshold.max(1) {
            misses.par_iter().map(prepare).collect()
        } else {
            misses.iter().map(prepare).collect()
        };

        for (&index, result) in misses.iter().zip(prepared) {
            let key = polygons[index].key();
            match result {
                Prepared::Ready(worlds) => {
                    self.simplification.insert(key, camera_key, false, worlds);
                }
                Prepared::Degenerate(points) => {
                    self.emit(Diagnostic::DegeneratePolygon { index, points });
                    self.simplification.insert(key, camera_key, true, Vec::new());
                }
                Prepared::Malformed(reason) => {
                    self.emit(Diagnostic::MalformedPolygon { index, reason });
                    self.simplification.insert(key, camera_key, true, Vec::new());
                }
            }
        }
        self.simplification.retain_keys(&live);
        self.meshes.retain(|key| live.contains(&key));

        // Cull and resolve the strategy per instance.
        let mut rendered = Vec::new();
        let mut downgraded = false;
        for (index, source) in polygons.iter().enumerate() {
            let Some(entry) = self.simplification.get(source.key()) else {
                continue;
            };
            if entry.rejected {
                stats.skipped += 1;
                continue;
            }
            let (fill_method, fell_back) = resolve_fill_method(
                source.style().fill_method,
                options.use_alt_rendering,
                options.painter_fill_method,
                caps,
            );
            downgraded |= fell_back;
            for world in &entry.worlds {
                if is_visible(&world.bounds, &viewport, options.polygon_culling) {
                    rendered.push(RenderedPolygon {
                        index,
                        source: Arc::clone(source),
                        geometry: Arc::clone(world),
                        fill_method,
                    });
                } else {
                    stats.culled += 1;
                }
            }
        }
        if downgraded && !self.combine_fallback_reported {
            self.combine_fallback_reported = true;
            self.emit(Diagnostic::ExactCombineUnavailable);
        }

        let mut commands = Vec::new();
        if let Some(color) = options.inverted_fill_color {
            let method = match options.painter_fill_method {
                PainterFillMethod::ExactCombine if caps.path_combine => FillMethod::ExactCombine,
                _ => FillMethod::EvenOdd,
            };
            commands.push(inverted_background(
                &viewport,
                rendered.iter().map(|r| r.geometry.as_ref()),
                method,
                color,
            ));
        }

        let mut deferred_labels = Vec::new();
        let mut start = 0;
        while start < rendered.len() {
            let first = &rendered[start];
            let color = first.source.style().fill;
            let end = match (first.fill_method, color) {
                (FillMethod::Triangulated, Some(color)) => {
                    match self.meshes.get_or_build(&first.geometry) {
                        MeshLookup::Cached(Some(mesh)) | MeshLookup::Built(mesh) => {
                            commands.push(DrawCommand::Mesh {
                                mesh,
                                color,
                                polygon: first.index,
                            });
                        }
                        MeshLookup::Cached(None) => stats.mesh_failures += 1,
                        MeshLookup::Failed(error) => {
                            stats.mesh_failures += 1;
                            let index = first.index;
                            self.emit(Diagnostic::TriangulationFailed { index, error });
                        }
                    }
                    start + 1
                }
                (method, Some(color)) => {
                    let end = rendered[start..]
                        .iter()
                        .position(|r| r.fill_method != method || r.source.style().fill != Some(color))
                        .map_or(rendered.len(), |n| start + n);
                    let batch: Vec<&SimplifiedPolygon> =
                        rendered[start..end].iter().map(|r| r.geometry.as_ref()).collect();
                    let indices = rendered[start..end].iter().map(|r| r.index).collect();
                    commands.extend(fill_batch(&batch, indices, method, color));
                    end
                }
                (_, None) => start + 1,
            };

            for r in &rendered[start..end] {
                if let Some(stroke) = r.source.style().stroke {
                    commands.push(DrawCommand::Outline {
                        rings: r.geometry.rings().cloned().collect(),
                        stroke,
                        polygon: r.index,
                    });
                }
                if let Some(label) = polygon_label(r, &options, &viewport) {
                    if options.draw_labels_last {
                        deferred_labels.push(DrawCommand::Label(label));
                    } else {
                        commands.push(DrawCommand::Label(label));
                    }
                }
            }
            start = end;
        }
        commands.extend(deferred_labels);

        let (hits, misses) = self.simplification.take_stats();
        stats.cache_hits = hits;
        stats.cache_misses = misses;
        stats.drawn = rendered.len();
        self.rendered = rendered;

        log::debug!(
            "polygon frame: {} sources, {} drawn, {} culled, {} skipped, cache {}/{} hit/miss",
            stats.sources,
            stats.drawn,
            stats.culled,
            stats.skipped,
            stats.cache_hits,
            stats.cache_misses
        );

        Ok(FrameOutput { commands, stats })
    }
}

fn prepare_polygon<R, C: Camera + ?Sized>(
    source: &SourcePolygon<R>,
    camera: &C,
    options: &LayerOptions,
) -> Prepared {
    let Some(worlds) = project_polygon(source, camera, options.draw_in_single_world) else {
        return match distinct_len(source.exterior()) {
            points @ 0..=2 => Prepared::Degenerate(points),
            _ => Prepared::Malformed("vertex projects to a non-finite position".to_string()),
        };
    };
    if options.validate_rings {
        if let Some(Err(reason)) = worlds.first().map(validate_polygon) {
            return Prepared::Malformed(reason);
        }
    }
    let simplified = worlds
        .into_iter()
        .map(|w| {
            simplify_polygon(
                source.key(),
                w,
                options.simplification_tolerance,
                options.high_quality_simplification,
            )
        })
        .filter(|s| distinct_len(&s.exterior) >= 3)
        .collect();
    Prepared::Ready(simplified)
}

fn polygon_label<R>(
    polygon: &RenderedPolygon<R>,
    options: &LayerOptions,
    viewport: &crate::polygon::types::Bounds,
) -> Option<LabelCommand> {
    if !options.polygon_labels {
        return None;
    }
    let text = polygon.source.label()?;
    let anchor = label_anchor(&polygon.geometry, options.label_placement);
    viewport.contains(anchor).then(|| LabelCommand {
        text: text.to_string(),
        anchor,
        polygon: polygon.index,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::polygon::types::{Bounds, Color, LatLng, PolygonStyle};
    use std::sync::Mutex;

    struct FlatCamera {
        visible: Bounds,
        key: u64,
    }

    impl Camera for FlatCamera {
        fn project(&self, p: LatLng) -> DVec2 {
            DVec2::new(p.lon, p.lat)
        }
        fn unproject(&self, p: DVec2) -> LatLng {
            LatLng::new(p.y, p.x)
        }
        fn visible_bounds(&self) -> Bounds {
            self.visible
        }
        fn zoom(&self) -> f64 {
            1.0
        }
        fn supports_world_wrap(&self) -> bool {
            false
        }
        fn world_width(&self) -> f64 {
            0.0
        }
        fn projection_key(&self) -> u64 {
            self.key
        }
    }

    fn camera(key: u64) -> FlatCamera {
        FlatCamera {
            visible: Bounds::new(DVec2::ZERO, DVec2::splat(100.0)),
            key,
        }
    }

    fn square(x0: f64, y0: f64, size: f64) -> Vec<LatLng> {
        vec![
            LatLng::new(y0, x0),
            LatLng::new(y0 + size, x0),
            LatLng::new(y0 + size, x0 + size),
            LatLng::new(y0, x0 + size),
        ]
    }

    fn filled(ring: Vec<LatLng>, id: u32) -> Arc<SourcePolygon<u32>> {
        Arc::new(SourcePolygon::new(ring, vec![], id).with_style(PolygonStyle {
            fill: Some(Color::rgb(0, 128, 0)),
            ..Default::default()
        }))
    }

    fn frame<'a>(polygons: &'a [Arc<SourcePolygon<u32>>], cam: &'a FlatCamera) -> FrameInputs<'a, u32, FlatCamera> {
        FrameInputs {
            polygons,
            camera: cam,
            caps: BackendCaps::default(),
        }
    }

    #[test]
    fn test_cache_hits_until_camera_moves() {
        let polygons = vec![filled(square(0.0, 0.0, 10.0), 1)];
        let mut layer = PolygonLayer::new(LayerOptions::default()).unwrap();

        let out = layer.recompute(frame(&polygons, &camera(1))).unwrap();
        assert_eq!(out.stats.cache_misses, 1);
        let out = layer.recompute(frame(&polygons, &camera(1))).unwrap();
        assert_eq!(out.stats.cache_hits, 1);
        assert_eq!(out.stats.cache_misses, 0);
        let out = layer.recompute(frame(&polygons, &camera(2))).unwrap();
        assert_eq!(out.stats.cache_misses, 1);
    }

    #[test]
    fn test_removed_polygons_are_evicted() {
        let polygons = vec![filled(square(0.0, 0.0, 10.0), 1), filled(square(20.0, 0.0, 10.0), 2)];
        let mut layer = PolygonLayer::new(LayerOptions::default()).unwrap();
        layer.recompute(frame(&polygons, &camera(1))).unwrap();
        assert_eq!(layer.cached_polygons(), 2);
        layer.recompute(frame(&polygons[..1], &camera(1))).unwrap();
        assert_eq!(layer.cached_polygons(), 1);
        layer.teardown();
        assert_eq!(layer.cached_polygons(), 0);
        assert!(layer.rendered().is_empty());
    }

    #[test]
    fn test_degenerate_reported_once() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink_seen = Arc::clone(&seen);
        let polygons = vec![
            filled(vec![LatLng::new(0.0, 0.0), LatLng::new(5.0, 5.0)], 1),
            filled(square(0.0, 0.0, 10.0), 2),
        ];
        let mut layer = PolygonLayer::new(LayerOptions::default()).unwrap();
        layer.set_diagnostic_sink(Box::new(move |d| sink_seen.lock().unwrap().push(d.clone())));

        let out = layer.recompute(frame(&polygons, &camera(1))).unwrap();
        assert_eq!(out.stats.skipped, 1);
        assert_eq!(out.stats.drawn, 1);
        layer.recompute(frame(&polygons, &camera(1))).unwrap();
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(matches!(seen[0], Diagnostic::DegeneratePolygon { index: 0, points: 2 }));
    }

    #[test]
    fn test_combine_fallback_advisory_is_one_time() {
        let seen = Arc::new(Mutex::new(0usize));
        let sink_seen = Arc::clone(&seen);
        let polygons = vec![filled(square(0.0, 0.0, 10.0), 1)];
        let mut layer = PolygonLayer::new(LayerOptions {
            painter_fill_method: PainterFillMethod::ExactCombine,
            ..Default::default()
        })
        .unwrap();
        layer.set_diagnostic_sink(Box::new(move |d| {
            if matches!(d, Diagnostic::ExactCombineUnavailable) {
                *sink_seen.lock().unwrap() += 1;
            }
        }));
        let cam = camera(1);
        for _ in 0..3 {
            let out = layer
                .recompute(FrameInputs {
                    polygons: &polygons,
                    camera: &cam,
                    caps: BackendCaps { path_combine: false },
                })
                .unwrap();
            assert_eq!(layer.rendered()[0].fill_method, FillMethod::EvenOdd);
            assert!(matches!(out.commands[0], DrawCommand::Fill { rule: crate::polygon::fill::FillRule::EvenOdd, .. }));
        }
        assert_eq!(*seen.lock().unwrap(), 1);
    }

    #[test]
    fn test_same_color_polygons_are_batched() {
        let polygons = vec![
            filled(square(0.0, 0.0, 10.0), 1),
            filled(square(20.0, 0.0, 10.0), 2),
            Arc::new(SourcePolygon::new(square(40.0, 0.0, 10.0), vec![], 3).with_style(PolygonStyle {
                fill: Some(Color::rgb(255, 0, 0)),
                ..Default::default()
            })),
        ];
        let mut layer = PolygonLayer::new(LayerOptions::default()).unwrap();
        let out = layer.recompute(frame(&polygons, &camera(1))).unwrap();
        let batches: Vec<Vec<usize>> = out
            .commands
            .iter()
            .filter_map(|c| match c {
                DrawCommand::Fill { polygons, .. } => Some(polygons.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(batches, vec![vec![0, 1], vec![2]]);
    }

    #[test]
    fn test_labels_last() {
        let labelled = |ring: Vec<LatLng>, id: u32| {
            Arc::new(
                SourcePolygon::new(ring, vec![], id)
                    .with_label(format!("p{id}"))
                    .with_style(PolygonStyle {
                        fill: Some(Color::rgb(0, 0, 255)),
                        ..Default::default()
                    }),
            )
        };
        let polygons = vec![labelled(square(0.0, 0.0, 10.0), 1), labelled(square(50.0, 50.0, 10.0), 2)];
        let mut layer = PolygonLayer::new(LayerOptions {
            draw_labels_last: true,
            painter_fill_method: PainterFillMethod::EvenOdd,
            ..Default::default()
        })
        .unwrap();
        let out = layer.recompute(frame(&polygons, &camera(1))).unwrap();
        let kinds: Vec<&str> = out
            .commands
            .iter()
            .map(|c| match c {
                DrawCommand::Label(_) => "label",
                _ => "fill",
            })
            .collect();
        assert_eq!(kinds, vec!["fill", "label", "label"]);
        let DrawCommand::Label(first) = &out.commands[1] else {
            panic!("expected label");
        };
        assert_eq!(first.anchor, DVec2::splat(5.0));
    }

    #[test]
    fn test_mesh_path() {
        let polygons = vec![filled(square(0.0, 0.0, 10.0), 1)];
        let mut layer = PolygonLayer::new(LayerOptions {
            use_alt_rendering: true,
            ..Default::default()
        })
        .unwrap();
        let out = layer.recompute(frame(&polygons, &camera(1))).unwrap();
        assert!(matches!(&out.commands[0], DrawCommand::Mesh { mesh, .. } if mesh.triangle_count() == 2));
        assert_eq!(layer.cached_meshes(), 1);
    }

    #[test]
    fn test_invalid_tolerance_rejected() {
        let mut layer: PolygonLayer<u32> = PolygonLayer::new(LayerOptions::default()).unwrap();
        let bad = LayerOptions {
            simplification_tolerance: -1.0,
            ..Default::default()
        };
        assert!(layer.set_options(bad.clone()).is_err());
        assert!(PolygonLayer::<u32>::new(bad).is_err());
        assert_eq!(layer.options().simplification_tolerance, 0.3);
    }
}
