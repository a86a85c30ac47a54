use std::fmt::{Debug, Formatter};

use crate::errors::{InfoError, Result};

const WGS84_WKT: &str = r#"GEOGCS["WGS 84",DATUM["WGS_1984",SPHEROID["WGS 84",6378137,298.257223563,AUTHORITY["EPSG","7030"]],AUTHORITY["EPSG","6326"]],PRIMEM["Greenwich",0,AUTHORITY["EPSG","8901"]],UNIT["degree",0.0174532925199433,AUTHORITY["EPSG","9122"]],AUTHORITY["EPSG","4326"]]"#;

const NAD83_WKT: &str = r#"GEOGCS["NAD83",DATUM["North_American_Datum_1983",SPHEROID["GRS 1980",6378137,298.257222101,AUTHORITY["EPSG","7019"]],TOWGS84[0,0,0,0,0,0,0],AUTHORITY["EPSG","6269"]],PRIMEM["Greenwich",0,AUTHORITY["EPSG","8901"]],UNIT["degree",0.0174532925199433,AUTHORITY["EPSG","9122"]],AUTHORITY["EPSG","4269"]]"#;

const PSEUDO_MERCATOR_WKT: &str = r#"PROJCS["WGS 84 / Pseudo-Mercator",GEOGCS["WGS 84",DATUM["WGS_1984",SPHEROID["WGS 84",6378137,298.257223563,AUTHORITY["EPSG","7030"]],AUTHORITY["EPSG","6326"]],PRIMEM["Greenwich",0,AUTHORITY["EPSG","8901"]],UNIT["degree",0.0174532925199433,AUTHORITY["EPSG","9122"]],AUTHORITY["EPSG","4326"]],PROJECTION["Mercator_1SP"],PARAMETER["central_meridian",0],PARAMETER["scale_factor",1],PARAMETER["false_easting",0],PARAMETER["false_northing",0],UNIT["metre",1,AUTHORITY["EPSG","9001"]],AXIS["X",EAST],AXIS["Y",NORTH],AUTHORITY["EPSG","3857"]]"#;

/// A node of a WKT definition: a keyword or value plus its bracketed children.
///
/// Leaf values keep their original spelling, quotes included, so that
/// re-exporting a parsed definition reproduces it exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
struct SrsNode {
    value: String,
    children: Vec<SrsNode>,
}

impl SrsNode {
    fn parse(wkt: &str) -> Result<SrsNode> {
        let mut parser = WktParser {
            chars: wkt.char_indices().peekable(),
            src: wkt,
        };
        let node = parser.node()?;
        parser.skip_whitespace();
        if let Some(&(pos, _)) = parser.chars.peek() {
            return Err(parser.error(pos, "trailing characters"));
        }
        Ok(node)
    }

    fn unquoted(&self) -> &str {
        self.value.trim_matches('"')
    }

    fn child(&self, keyword: &str) -> Option<&SrsNode> {
        self.children
            .iter()
            .find(|c| c.value.eq_ignore_ascii_case(keyword))
    }

    fn export(&self, out: &mut String) {
        out.push_str(&self.value);
        if !self.children.is_empty() {
            out.push('[');
            for (i, child) in self.children.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                child.export(out);
            }
            out.push(']');
        }
    }

    fn export_pretty(&self, out: &mut String, depth: usize) {
        out.push_str(&self.value);
        if self.children.is_empty() {
            return;
        }
        out.push('[');
        let last = self.children.len() - 1;
        for (i, child) in self.children.iter().enumerate() {
            if !child.children.is_empty() {
                out.push('\n');
                out.push_str(&" ".repeat((depth + 1) * 4));
            }
            child.export_pretty(out, depth + 1);
            if i < last {
                out.push(',');
            }
        }
        out.push(']');
    }
}

struct WktParser<'a> {
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    src: &'a str,
}

impl WktParser<'_> {
    fn error(&self, pos: usize, reason: &str) -> InfoError {
        InfoError::BadArgument(format!(
            "Corrupt WKT at offset {pos} ({reason}): '{}'",
            self.src
        ))
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.chars.peek(), Some((_, c)) if c.is_whitespace()) {
            self.chars.next();
        }
    }

    fn value(&mut self) -> Result<String> {
        self.skip_whitespace();
        let mut value = String::new();
        match self.chars.peek().copied() {
            Some((_, '"')) => {
                value.push('"');
                self.chars.next();
                loop {
                    match self.chars.next() {
                        Some((_, '"')) => {
                            value.push('"');
                            if matches!(self.chars.peek(), Some((_, '"'))) {
                                self.chars.next();
                                value.push('"');
                            } else {
                                break;
                            }
                        }
                        Some((_, c)) => value.push(c),
                        None => return Err(self.error(self.src.len(), "unterminated string")),
                    }
                }
            }
            Some(_) => {
                while let Some((_, c)) = self.chars.peek().copied() {
                    if matches!(c, '[' | ']' | '(' | ')' | ',') || c.is_whitespace() {
                        break;
                    }
                    value.push(c);
                    self.chars.next();
                }
            }
            None => return Err(self.error(self.src.len(), "unexpected end")),
        }
        if value.is_empty() {
            let pos = self.chars.peek().map_or(self.src.len(), |(p, _)| *p);
            return Err(self.error(pos, "empty value"));
        }
        Ok(value)
    }

    fn node(&mut self) -> Result<SrsNode> {
        let value = self.value()?;
        let mut children = Vec::new();
        self.skip_whitespace();
        if matches!(self.chars.peek(), Some((_, '[' | '('))) {
            self.chars.next();
            loop {
                children.push(self.node()?);
                self.skip_whitespace();
                match self.chars.next() {
                    Some((_, ',')) => continue,
                    Some((_, ']' | ')')) => break,
                    Some((pos, _)) => return Err(self.error(pos, "expected ',' or ']'")),
                    None => return Err(self.error(self.src.len(), "missing ']'")),
                }
            }
        }
        Ok(SrsNode { value, children })
    }
}

/// Spatial reference system, kept as a parsed WKT definition.
#[derive(Clone, PartialEq, Eq)]
pub struct SpatialRef {
    root: SrsNode,
}

impl SpatialRef {
    pub fn from_wkt(wkt: &str) -> Result<SpatialRef> {
        let root = SrsNode::parse(wkt.trim())?;
        if root.children.is_empty() {
            return Err(InfoError::BadArgument(format!(
                "WKT definition has no body: '{wkt}'"
            )));
        }
        Ok(SpatialRef { root })
    }

    /// Spatial reference for a built-in EPSG code (4326, 4269 or 3857).
    pub fn from_epsg(epsg_code: u32) -> Result<SpatialRef> {
        let wkt = match epsg_code {
            4326 => WGS84_WKT,
            4269 => NAD83_WKT,
            3857 | 900913 => PSEUDO_MERCATOR_WKT,
            _ => {
                return Err(InfoError::BadArgument(format!(
                    "EPSG code {epsg_code} is not known"
                )))
            }
        };
        SpatialRef::from_wkt(wkt)
    }

    /// Parses a user supplied definition: `EPSG:n`, an OGC URN
    /// (`urn:ogc:def:crs:EPSG::n`, `urn:ogc:def:crs:OGC:1.3:CRS84`) or WKT.
    pub fn from_definition(definition: &str) -> Result<SpatialRef> {
        let definition = definition.trim();
        let upper = definition.to_ascii_uppercase();
        if upper.ends_with("CRS84") || upper.ends_with("CRS:84") {
            return SpatialRef::from_epsg(4326);
        }
        let epsg = upper
            .strip_prefix("EPSG:")
            .or_else(|| upper.strip_prefix("URN:OGC:DEF:CRS:EPSG:"))
            .map(|rest| rest.trim_start_matches(':'))
            .map(|code| code.rsplit(':').next().unwrap_or(code));
        match epsg {
            Some(code) => {
                let code = code.parse::<u32>().map_err(|_| {
                    InfoError::BadArgument(format!("Invalid EPSG code in '{definition}'"))
                })?;
                SpatialRef::from_epsg(code)
            }
            None => SpatialRef::from_wkt(definition),
        }
    }

    /// Single line WKT.
    pub fn to_wkt(&self) -> String {
        let mut out = String::new();
        self.root.export(&mut out);
        out
    }

    /// Multi-line WKT, each nested node on its own line indented by four
    /// spaces per level.
    pub fn to_pretty_wkt(&self) -> String {
        let mut out = String::new();
        self.root.export_pretty(&mut out, 0);
        out
    }

    /// Name of the coordinate system (first value of the root node).
    pub fn name(&self) -> Option<&str> {
        self.root.children.first().map(SrsNode::unquoted)
    }

    pub fn is_projected(&self) -> bool {
        self.root.value.eq_ignore_ascii_case("PROJCS")
    }

    pub fn auth_name(&self) -> Option<&str> {
        self.root
            .child("AUTHORITY")
            .and_then(|auth| auth.children.first())
            .map(SrsNode::unquoted)
    }

    pub fn auth_code(&self) -> Option<i32> {
        self.root
            .child("AUTHORITY")
            .and_then(|auth| auth.children.get(1))
            .and_then(|code| code.unquoted().parse().ok())
    }
}

impl Debug for SpatialRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_wkt())
    }
}
