use std::fmt::{Debug, Formatter};

use geo_types::{Coord, LineString, Polygon};

use crate::utils::format_g;
use crate::vector::GeometryType;

/// Axis-aligned bounding box of a geometry or layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Envelope {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
}

impl Envelope {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Envelope {
            min_x,
            max_x,
            min_y,
            max_y,
        }
    }

    fn from_coord(c: Coord<f64>) -> Self {
        Envelope::new(c.x, c.y, c.x, c.y)
    }

    /// Grows `self` to cover `other`.
    pub fn merge(&mut self, other: &Envelope) {
        self.min_x = self.min_x.min(other.min_x);
        self.min_y = self.min_y.min(other.min_y);
        self.max_x = self.max_x.max(other.max_x);
        self.max_y = self.max_y.max(other.max_y);
    }

    pub fn intersects(&self, other: &Envelope) -> bool {
        self.min_x <= other.max_x
            && self.max_x >= other.min_x
            && self.min_y <= other.max_y
            && self.max_y >= other.min_y
    }

    pub fn contains(&self, other: &Envelope) -> bool {
        self.min_x <= other.min_x
            && self.max_x >= other.max_x
            && self.min_y <= other.min_y
            && self.max_y >= other.max_y
    }
}

/// A 2D geometry, backed by [`geo_types::Geometry`].
#[derive(Clone, PartialEq)]
pub struct Geometry(geo_types::Geometry<f64>);

impl Geometry {
    /// Create a rectangular geometry from min and max coordinates.
    ///
    /// The exterior ring is closed and walks min/min, min/max, max/max,
    /// max/min and back to min/min.
    pub fn bbox(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Geometry {
        let ring = LineString::from(vec![
            (min_x, min_y),
            (min_x, max_y),
            (max_x, max_y),
            (max_x, min_y),
            (min_x, min_y),
        ]);
        Geometry(geo_types::Geometry::Polygon(Polygon::new(ring, vec![])))
    }

    pub fn inner(&self) -> &geo_types::Geometry<f64> {
        &self.0
    }

    pub fn into_inner(self) -> geo_types::Geometry<f64> {
        self.0
    }

    pub fn geometry_type(&self) -> GeometryType {
        match &self.0 {
            geo_types::Geometry::Point(_) => GeometryType::Point,
            geo_types::Geometry::Line(_) | geo_types::Geometry::LineString(_) => {
                GeometryType::LineString
            }
            geo_types::Geometry::Polygon(_)
            | geo_types::Geometry::Rect(_)
            | geo_types::Geometry::Triangle(_) => GeometryType::Polygon,
            geo_types::Geometry::MultiPoint(_) => GeometryType::MultiPoint,
            geo_types::Geometry::MultiLineString(_) => GeometryType::MultiLineString,
            geo_types::Geometry::MultiPolygon(_) => GeometryType::MultiPolygon,
            geo_types::Geometry::GeometryCollection(_) => GeometryType::GeometryCollection,
        }
    }

    /// Bounding box, or `None` for an empty geometry.
    pub fn envelope(&self) -> Option<Envelope> {
        envelope_of(&self.0)
    }

    /// Well-known text, written with a space after the type keyword and
    /// commas without spaces between coordinates (`LINESTRING (0 0,1 1)`).
    pub fn wkt(&self) -> String {
        let mut out = String::new();
        write_wkt(&mut out, &self.0);
        out
    }

    /// Short description used by `-geom=SUMMARY`, one entry per output line.
    pub fn summary(&self) -> Vec<String> {
        let mut lines = Vec::new();
        summarize(&self.0, &mut lines);
        lines
    }
}

impl From<geo_types::Geometry<f64>> for Geometry {
    fn from(geometry: geo_types::Geometry<f64>) -> Self {
        Geometry(geometry)
    }
}

impl From<geo_types::Point<f64>> for Geometry {
    fn from(point: geo_types::Point<f64>) -> Self {
        Geometry(point.into())
    }
}

impl From<Polygon<f64>> for Geometry {
    fn from(polygon: Polygon<f64>) -> Self {
        Geometry(polygon.into())
    }
}

impl From<LineString<f64>> for Geometry {
    fn from(line: LineString<f64>) -> Self {
        Geometry(line.into())
    }
}

impl Debug for Geometry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.wkt())
    }
}

fn envelope_of_coords<I: IntoIterator<Item = Coord<f64>>>(coords: I) -> Option<Envelope> {
    coords.into_iter().fold(None, |acc, c| {
        let point = Envelope::from_coord(c);
        Some(match acc {
            Some(mut env) => {
                env.merge(&point);
                env
            }
            None => point,
        })
    })
}

fn merge_all<I: IntoIterator<Item = Option<Envelope>>>(parts: I) -> Option<Envelope> {
    parts.into_iter().flatten().fold(None, |acc, env| {
        Some(match acc {
            Some(mut merged) => {
                merged.merge(&env);
                merged
            }
            None => env,
        })
    })
}

fn envelope_of(geometry: &geo_types::Geometry<f64>) -> Option<Envelope> {
    match geometry {
        geo_types::Geometry::Point(p) => Some(Envelope::from_coord(p.0)),
        geo_types::Geometry::Line(l) => envelope_of_coords([l.start, l.end]),
        geo_types::Geometry::LineString(ls) => envelope_of_coords(ls.0.iter().copied()),
        geo_types::Geometry::Polygon(p) => envelope_of_coords(p.exterior().0.iter().copied()),
        geo_types::Geometry::Rect(r) => envelope_of_coords([r.min(), r.max()]),
        geo_types::Geometry::Triangle(t) => envelope_of_coords(t.to_array()),
        geo_types::Geometry::MultiPoint(mp) => envelope_of_coords(mp.0.iter().map(|p| p.0)),
        geo_types::Geometry::MultiLineString(mls) => {
            envelope_of_coords(mls.0.iter().flat_map(|ls| ls.0.iter().copied()))
        }
        geo_types::Geometry::MultiPolygon(mp) => {
            envelope_of_coords(mp.0.iter().flat_map(|p| p.exterior().0.iter().copied()))
        }
        geo_types::Geometry::GeometryCollection(gc) => merge_all(gc.0.iter().map(envelope_of)),
    }
}

fn write_coord(out: &mut String, c: &Coord<f64>) {
    out.push_str(&format!("{} {}", format_g(c.x, 15), format_g(c.y, 15)));
}

fn write_coords<'a, I: IntoIterator<Item = &'a Coord<f64>>>(out: &mut String, coords: I) {
    out.push('(');
    for (i, c) in coords.into_iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        write_coord(out, c);
    }
    out.push(')');
}

fn write_rings(out: &mut String, polygon: &Polygon<f64>) {
    out.push('(');
    write_coords(out, polygon.exterior().0.iter());
    for ring in polygon.interiors() {
        out.push(',');
        write_coords(out, ring.0.iter());
    }
    out.push(')');
}

fn polygon_is_empty(polygon: &Polygon<f64>) -> bool {
    polygon.exterior().0.is_empty()
}

fn write_wkt(out: &mut String, geometry: &geo_types::Geometry<f64>) {
    match geometry {
        geo_types::Geometry::Point(p) => {
            out.push_str("POINT (");
            write_coord(out, &p.0);
            out.push(')');
        }
        geo_types::Geometry::Line(l) => {
            out.push_str("LINESTRING ");
            write_coords(out, [&l.start, &l.end]);
        }
        geo_types::Geometry::LineString(ls) => {
            if ls.0.is_empty() {
                out.push_str("LINESTRING EMPTY");
            } else {
                out.push_str("LINESTRING ");
                write_coords(out, ls.0.iter());
            }
        }
        geo_types::Geometry::Polygon(p) => {
            if polygon_is_empty(p) {
                out.push_str("POLYGON EMPTY");
            } else {
                out.push_str("POLYGON ");
                write_rings(out, p);
            }
        }
        geo_types::Geometry::Rect(r) => {
            out.push_str("POLYGON ");
            write_rings(out, &r.to_polygon());
        }
        geo_types::Geometry::Triangle(t) => {
            out.push_str("POLYGON ");
            write_rings(out, &t.to_polygon());
        }
        geo_types::Geometry::MultiPoint(mp) => {
            if mp.0.is_empty() {
                out.push_str("MULTIPOINT EMPTY");
            } else {
                out.push_str("MULTIPOINT ");
                write_coords(out, mp.0.iter().map(|p| &p.0));
            }
        }
        geo_types::Geometry::MultiLineString(mls) => {
            if mls.0.is_empty() {
                out.push_str("MULTILINESTRING EMPTY");
            } else {
                out.push_str("MULTILINESTRING (");
                for (i, ls) in mls.0.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    write_coords(out, ls.0.iter());
                }
                out.push(')');
            }
        }
        geo_types::Geometry::MultiPolygon(mp) => {
            if mp.0.is_empty() {
                out.push_str("MULTIPOLYGON EMPTY");
            } else {
                out.push_str("MULTIPOLYGON (");
                for (i, p) in mp.0.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    write_rings(out, p);
                }
                out.push(')');
            }
        }
        geo_types::Geometry::GeometryCollection(gc) => {
            if gc.0.is_empty() {
                out.push_str("GEOMETRYCOLLECTION EMPTY");
            } else {
                out.push_str("GEOMETRYCOLLECTION (");
                for (i, g) in gc.0.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    write_wkt(out, g);
                }
                out.push(')');
            }
        }
    }
}

fn polygon_summary(polygon: &Polygon<f64>) -> String {
    if polygon_is_empty(polygon) {
        return "POLYGON : empty".to_string();
    }
    let mut line = format!("POLYGON : {} points", polygon.exterior().0.len());
    let interiors = polygon.interiors();
    if !interiors.is_empty() {
        let rings: Vec<String> = interiors
            .iter()
            .map(|ring| format!("{} points", ring.0.len()))
            .collect();
        line.push_str(&format!(
            ", {} inner rings ({})",
            interiors.len(),
            rings.join(", ")
        ));
    }
    line
}

fn summarize(geometry: &geo_types::Geometry<f64>, lines: &mut Vec<String>) {
    match geometry {
        geo_types::Geometry::Point(_) => lines.push("POINT".to_string()),
        geo_types::Geometry::Line(_) => lines.push("LINESTRING : 2 points".to_string()),
        geo_types::Geometry::LineString(ls) => {
            lines.push(format!("LINESTRING : {} points", ls.0.len()))
        }
        geo_types::Geometry::Polygon(p) => lines.push(polygon_summary(p)),
        geo_types::Geometry::Rect(r) => lines.push(polygon_summary(&r.to_polygon())),
        geo_types::Geometry::Triangle(t) => lines.push(polygon_summary(&t.to_polygon())),
        geo_types::Geometry::MultiPoint(mp) => {
            lines.push(format!("MULTIPOINT : {} geometries:", mp.0.len()));
            lines.extend(mp.0.iter().map(|_| "POINT".to_string()));
        }
        geo_types::Geometry::MultiLineString(mls) => {
            lines.push(format!("MULTILINESTRING : {} geometries:", mls.0.len()));
            lines.extend(
                mls.0
                    .iter()
                    .map(|ls| format!("LINESTRING : {} points", ls.0.len())),
            );
        }
        geo_types::Geometry::MultiPolygon(mp) => {
            lines.push(format!("MULTIPOLYGON : {} geometries:", mp.0.len()));
            lines.extend(mp.0.iter().map(polygon_summary));
        }
        geo_types::Geometry::GeometryCollection(gc) => {
            lines.push(format!("GEOMETRYCOLLECTION : {} geometries:", gc.0.len()));
            for g in &gc.0 {
                summarize(g, lines);
            }
        }
    }
}
