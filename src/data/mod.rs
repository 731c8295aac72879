use crate::map::MapRenderer;
use crate::polygon::options::parse_hex_color;
use crate::polygon::{Color, LatLng, PolygonStyle, SourcePolygon, StrokeStyle};
use anyhow::{Context, Result};
use geojson::{GeoJson, Geometry, JsonObject, Value};
use std::fs;
use std::path::Path;

/// Payload carried by every map polygon; the pipeline never looks inside.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Feature {
    pub name: String,
    /// Where the polygon came from (file name or "sample")
    pub source: String,
}

/// Fill colors handed out to features without a `fill` property.
const PALETTE: [Color; 6] = [
    Color::rgb(46, 139, 87),
    Color::rgb(218, 165, 32),
    Color::rgb(70, 130, 180),
    Color::rgb(205, 92, 92),
    Color::rgb(147, 112, 219),
    Color::rgb(188, 143, 143),
];

const BORDER: StrokeStyle = StrokeStyle {
    color: Color::rgb(200, 200, 200),
    width: 1.0,
};

/// Parse GeoJSON with simd-json. The buffer is used as scratch space.
pub fn parse_geojson(bytes: &mut [u8]) -> Result<GeoJson> {
    simd_json::serde::from_slice::<GeoJson>(bytes).context("invalid GeoJSON")
}

/// Load every `*.geojson` / `*.json` file in `data_dir`. Returns the number
/// of polygons added. Files that fail to parse are logged and skipped.
pub fn load_all_geojson(renderer: &mut MapRenderer, data_dir: &Path) -> Result<usize> {
    let mut entries: Vec<_> = fs::read_dir(data_dir)
        .with_context(|| format!("reading {}", data_dir.display()))?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| matches!(p.extension().and_then(|e| e.to_str()), Some("geojson" | "json")))
        .collect();
    entries.sort();

    let mut added = 0;
    for path in entries {
        match load_geojson(renderer, &path) {
            Ok(n) => {
                log::info!("loaded {n} polygons from {}", path.display());
                added += n;
            }
            Err(e) => log::warn!("failed to load {}: {e:#}", path.display()),
        }
    }
    Ok(added)
}

/// Load polygons from one GeoJSON file.
pub fn load_geojson(renderer: &mut MapRenderer, path: &Path) -> Result<usize> {
    let mut bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let geojson = parse_geojson(&mut bytes)?;
    let source = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("geojson")
        .to_string();
    let polygons = polygons_from_geojson(&geojson, &source);
    let n = polygons.len();
    for polygon in polygons {
        renderer.add_polygon(polygon);
    }
    Ok(n)
}

/// Every Polygon / MultiPolygon part in a GeoJSON document, in file order.
pub fn polygons_from_geojson(geojson: &GeoJson, source: &str) -> Vec<SourcePolygon<Feature>> {
    let mut out = Vec::new();
    match geojson {
        GeoJson::FeatureCollection(fc) => {
            for (i, feature) in fc.features.iter().enumerate() {
                if let Some(ref geometry) = feature.geometry {
                    collect_polygons(geometry, feature.properties.as_ref(), i, source, &mut out);
                }
            }
        }
        GeoJson::Feature(f) => {
            if let Some(ref geometry) = f.geometry {
                collect_polygons(geometry, f.properties.as_ref(), 0, source, &mut out);
            }
        }
        GeoJson::Geometry(geometry) => collect_polygons(geometry, None, 0, source, &mut out),
    }
    out
}

fn collect_polygons(
    geometry: &Geometry,
    props: Option<&JsonObject>,
    index: usize,
    source: &str,
    out: &mut Vec<SourcePolygon<Feature>>,
) {
    let text = |key: &str| props.and_then(|p| p.get(key)).and_then(|v| v.as_str());
    let name = ["name", "NAME", "ADMIN", "admin"]
        .iter()
        .find_map(|k| text(k))
        .map(str::to_string);
    let style = PolygonStyle {
        fill: Some(
            text("fill")
                .and_then(parse_hex_color)
                .unwrap_or(PALETTE[index % PALETTE.len()]),
        ),
        stroke: Some(match text("stroke").and_then(parse_hex_color) {
            Some(color) => StrokeStyle { color, width: 1.0 },
            None => BORDER,
        }),
        fill_method: None,
    };

    let mut push = |rings: &Vec<Vec<Vec<f64>>>| {
        let Some((exterior, holes)) = rings.split_first() else {
            return;
        };
        let feature = Feature {
            name: name.clone().unwrap_or_else(|| format!("feature {index}")),
            source: source.to_string(),
        };
        let mut polygon =
            SourcePolygon::new(to_ring(exterior), holes.iter().map(|h| to_ring(h)).collect(), feature)
                .with_style(style);
        if let Some(ref name) = name {
            polygon = polygon.with_label(name.clone());
        }
        out.push(polygon);
    };

    match &geometry.value {
        Value::Polygon(rings) => push(rings),
        Value::MultiPolygon(polygons) => polygons.iter().for_each(push),
        Value::GeometryCollection(geometries) => {
            for g in geometries {
                collect_polygons(g, props, index, source, out);
            }
        }
        _ => {}
    }
}

/// GeoJSON positions are `[lon, lat]`.
fn to_ring(coords: &[Vec<f64>]) -> Vec<LatLng> {
    coords
        .iter()
        .filter(|c| c.len() >= 2)
        .map(|c| LatLng::new(c[1], c[0]))
        .collect()
}

fn lon_lat(points: &[(f64, f64)]) -> Vec<LatLng> {
    points.iter().map(|&(lon, lat)| LatLng::new(lat, lon)).collect()
}

fn sample(name: &str, exterior: &[(f64, f64)], holes: &[&[(f64, f64)]], fill: Color) -> SourcePolygon<Feature> {
    SourcePolygon::new(
        lon_lat(exterior),
        holes.iter().map(|h| lon_lat(h)).collect(),
        Feature {
            name: name.to_string(),
            source: "sample".to_string(),
        },
    )
    .with_label(name)
    .with_style(PolygonStyle {
        fill: Some(fill),
        stroke: Some(BORDER),
        fill_method: None,
    })
}

/// Built-in polygons for when no data directory is available. Covers the
/// interesting cases: holes, overlapping holes, overlapping same-color
/// polygons and a polygon crossing the antimeridian.
pub fn generate_sample_polygons(renderer: &mut MapRenderer) {
    let land = PALETTE[0];

    renderer.add_polygon(sample(
        "North America",
        &[
            (-168.0, 65.0), (-166.0, 60.0), (-141.0, 60.0), (-130.0, 55.0),
            (-125.0, 48.0), (-124.0, 40.0), (-117.0, 32.0), (-110.0, 25.0),
            (-97.0, 25.0), (-97.0, 28.0), (-82.0, 24.0), (-80.0, 25.0),
            (-81.0, 31.0), (-75.0, 35.0), (-70.0, 41.0), (-67.0, 45.0),
            (-65.0, 47.0), (-55.0, 47.0), (-52.0, 47.0), (-55.0, 52.0),
            (-58.0, 55.0), (-64.0, 60.0), (-73.0, 62.0), (-80.0, 63.0),
            (-95.0, 62.0), (-110.0, 68.0), (-130.0, 70.0), (-145.0, 70.0),
        ],
        // Great Lakes region
        &[&[(-92.0, 46.0), (-84.0, 46.5), (-79.0, 43.5), (-83.0, 41.5), (-88.0, 42.0)]],
        land,
    ));

    renderer.add_polygon(sample(
        "South America",
        &[
            (-80.0, 10.0), (-75.0, 5.0), (-70.0, 5.0), (-60.0, 5.0),
            (-50.0, 0.0), (-35.0, -5.0), (-35.0, -10.0), (-38.0, -15.0),
            (-40.0, -22.0), (-48.0, -25.0), (-55.0, -34.0), (-58.0, -38.0),
            (-65.0, -42.0), (-68.0, -50.0), (-75.0, -52.0), (-75.0, -45.0),
            (-72.0, -40.0), (-72.0, -30.0), (-70.0, -20.0), (-70.0, -15.0),
            (-80.0, -5.0), (-80.0, 0.0),
        ],
        &[],
        land,
    ));

    // Same color as its neighbour and overlapping it: batched together, so
    // even-odd leaves the shared area empty while exact combine fills it.
    renderer.add_polygon(sample(
        "Europe",
        &[
            (-10.0, 36.0), (-5.0, 36.0), (0.0, 38.0), (5.0, 43.0),
            (10.0, 44.0), (15.0, 45.0), (20.0, 40.0), (25.0, 37.0),
            (30.0, 40.0), (35.0, 42.0), (40.0, 43.0), (40.0, 55.0),
            (30.0, 60.0), (25.0, 65.0), (20.0, 70.0), (10.0, 71.0),
            (5.0, 62.0), (5.0, 58.0), (-5.0, 58.0), (-10.0, 52.0),
            (-5.0, 48.0), (-5.0, 43.0),
        ],
        &[],
        PALETTE[1],
    ));
    renderer.add_polygon(sample(
        "Africa",
        &[
            (-17.0, 15.0), (-17.0, 20.0), (-15.0, 28.0), (-5.0, 35.0),
            (10.0, 37.0), (20.0, 33.0), (25.0, 32.0), (35.0, 30.0),
            (35.0, 20.0), (42.0, 12.0), (50.0, 12.0), (45.0, 5.0),
            (35.0, -5.0), (35.0, -20.0), (30.0, -30.0), (20.0, -35.0),
            (18.0, -35.0), (15.0, -30.0), (10.0, -15.0), (10.0, 0.0),
            (5.0, 5.0), (-5.0, 5.0), (-10.0, 10.0),
        ],
        // Two overlapping holes
        &[
            &[(15.0, 5.0), (25.0, 5.0), (25.0, 15.0), (15.0, 15.0)],
            &[(20.0, 10.0), (30.0, 10.0), (30.0, 20.0), (20.0, 20.0)],
        ],
        PALETTE[1],
    ));

    renderer.add_polygon(sample(
        "Australia",
        &[
            (115.0, -20.0), (120.0, -18.0), (130.0, -12.0), (140.0, -12.0),
            (145.0, -15.0), (150.0, -25.0), (153.0, -30.0), (150.0, -35.0),
            (145.0, -38.0), (140.0, -38.0), (135.0, -35.0), (130.0, -32.0),
            (125.0, -32.0), (115.0, -35.0), (115.0, -25.0),
        ],
        &[],
        PALETTE[2],
    ));

    // Crosses the antimeridian: drawn on both edges of the world.
    renderer.add_polygon(sample(
        "Date Line",
        &[(170.0, -10.0), (-170.0, -10.0), (-170.0, -25.0), (170.0, -25.0)],
        &[],
        PALETTE[3],
    ));

    // Fewer than three distinct points: skipped with a diagnostic.
    renderer.add_polygon(sample("Degenerate", &[(0.0, -60.0), (10.0, -60.0), (0.0, -60.0)], &[], PALETTE[4]));
}
