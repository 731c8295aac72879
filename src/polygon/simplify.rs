//! Douglas-Peucker ring simplification and the per-polygon result cache.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use glam::DVec2;

use crate::polygon::types::{PolygonKey, ProjectedPolygon, SimplifiedPolygon};

/// Rings at or below this size are returned untouched unless high quality
/// simplification is requested.
const LOW_POINT_COUNT: usize = 4;

/// Simplify a screen-space ring.
///
/// Every removed point lies within `tolerance` pixels of the returned path,
/// the first and last points are always kept, and the output never grows.
/// A tolerance of zero (or less) disables simplification.
pub fn simplify_ring(points: &[DVec2], tolerance: f64, high_quality: bool) -> Vec<DVec2> {
    if tolerance <= 0.0 || points.len() <= 2 {
        return points.to_vec();
    }
    if !high_quality && points.len() <= LOW_POINT_COUNT {
        return points.to_vec();
    }

    let last = points.len() - 1;
    let mut keep = vec![false; points.len()];
    keep[0] = true;
    keep[last] = true;

    // Explicit stack instead of recursion: deep rings must not blow the call stack.
    let mut stack = vec![(0usize, last)];
    while let Some((first, end)) = stack.pop() {
        if end <= first + 1 {
            continue;
        }

        let mut max_dist = 0.0;
        let mut index = first;
        for i in first + 1..end {
            let d = segment_distance(points[i], points[first], points[end]);
            if d > max_dist {
                max_dist = d;
                index = i;
            }
        }

        if max_dist > tolerance {
            keep[index] = true;
            stack.push((first, index));
            stack.push((index, end));
        }
    }

    points
        .iter()
        .zip(keep)
        .filter_map(|(p, k)| k.then_some(*p))
        .collect()
}

/// Distance from `p` to the segment `a`-`b`.
#[inline]
pub fn segment_distance(p: DVec2, a: DVec2, b: DVec2) -> f64 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq < 1e-18 {
        return p.distance(a);
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    p.distance(a + ab * t)
}

/// Simplify every ring of a projected polygon independently.
///
/// Holes that collapse below three points are dropped; the caller decides
/// what to do with a collapsed exterior.
pub fn simplify_polygon(
    key: PolygonKey,
    polygon: ProjectedPolygon,
    tolerance: f64,
    high_quality: bool,
) -> SimplifiedPolygon {
    let exterior = simplify_ring(&polygon.exterior, tolerance, high_quality);
    let holes = polygon
        .holes
        .iter()
        .map(|hole| simplify_ring(hole, tolerance, high_quality))
        .filter(|hole| hole.len() >= 3)
        .collect();

    SimplifiedPolygon {
        key,
        world: polygon.world,
        exterior,
        holes,
        bounds: polygon.bounds,
        generation: 0,
    }
}

/// Everything the pipeline derived for one source polygon.
#[derive(Clone, Debug)]
pub struct CachedPolygon {
    pub camera_key: u64,
    /// `true` when the source was rejected (too few points or malformed)
    pub rejected: bool,
    pub worlds: Vec<Arc<SimplifiedPolygon>>,
}

/// Simplified geometry keyed by source identity.
///
/// Entries are only ever replaced whole. A tolerance or quality change
/// empties the cache, so a frame never mixes two tolerances.
pub struct SimplificationCache {
    tolerance: f64,
    high_quality: bool,
    entries: HashMap<PolygonKey, CachedPolygon>,
    next_generation: u64,
    hits: usize,
    misses: usize,
}

impl SimplificationCache {
    pub fn new(tolerance: f64, high_quality: bool) -> Self {
        Self {
            tolerance,
            high_quality,
            entries: HashMap::new(),
            next_generation: 1,
            hits: 0,
            misses: 0,
        }
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    pub fn high_quality(&self) -> bool {
        self.high_quality
    }

    /// Apply new simplification parameters, dropping every entry if they changed.
    pub fn configure(&mut self, tolerance: f64, high_quality: bool) {
        if tolerance != self.tolerance || high_quality != self.high_quality {
            log::debug!(
                "simplification parameters changed ({} -> {}), dropping {} entries",
                self.tolerance,
                tolerance,
                self.entries.len()
            );
            self.tolerance = tolerance;
            self.high_quality = high_quality;
            self.entries.clear();
        }
    }

    /// Cached entry for `key`, only if it was computed for `camera_key`.
    pub fn lookup(&mut self, key: PolygonKey, camera_key: u64) -> Option<&CachedPolygon> {
        match self.entries.get(&key) {
            Some(entry) if entry.camera_key == camera_key => {
                self.hits += 1;
                Some(entry)
            }
            _ => {
                self.misses += 1;
                None
            }
        }
    }

    /// Cached entry for `key` regardless of camera, without touching the counters.
    pub fn get(&self, key: PolygonKey) -> Option<&CachedPolygon> {
        self.entries.get(&key)
    }

    /// Replace the entry for `key`, stamping a fresh generation on each world.
    pub fn insert(
        &mut self,
        key: PolygonKey,
        camera_key: u64,
        rejected: bool,
        worlds: Vec<SimplifiedPolygon>,
    ) -> &CachedPolygon {
        let generation = self.next_generation;
        self.next_generation += 1;
        let worlds = worlds
            .into_iter()
            .map(|mut w| {
                w.generation = generation;
                Arc::new(w)
            })
            .collect();
        let entry = CachedPolygon {
            camera_key,
            rejected,
            worlds,
        };
        self.entries.insert(key, entry);
        &self.entries[&key]
    }

    /// Drop entries whose source is no longer part of the polygon set.
    pub fn retain_keys(&mut self, live: &HashSet<PolygonKey>) {
        self.entries.retain(|k, _| live.contains(k));
    }

    /// Hit/miss counters since the last call.
    pub fn take_stats(&mut self) -> (usize, usize) {
        let stats = (self.hits, self.misses);
        self.hits = 0;
        self.misses = 0;
        stats
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
