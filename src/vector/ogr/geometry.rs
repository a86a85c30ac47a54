use std::ffi::{c_char, CString};

use gdal_sys::{self, OGRErr, OGRGeometryH, OGRwkbGeometryType};
use geo_types::{
    Coord, Geometry as GeoGeometry, GeometryCollection, LineString, MultiLineString, MultiPoint,
    MultiPolygon, Point, Polygon,
};

use crate::errors::*;
use crate::vector::Geometry;

/// An OGR geometry built from a crate [`Geometry`], destroyed when dropped.
pub(crate) struct OwnedGeometry {
    c_geometry: OGRGeometryH,
}

impl OwnedGeometry {
    pub fn from_geometry(geometry: &Geometry) -> Result<OwnedGeometry> {
        let c_wkt = CString::new(geometry.wkt())?;
        // OGR_G_CreateFromWkt does not write to the string, only to the pointer.
        let mut c_wkt_ptr = c_wkt.as_ptr() as *mut c_char;
        let mut c_geometry: OGRGeometryH = std::ptr::null_mut();
        let rv = unsafe {
            gdal_sys::OGR_G_CreateFromWkt(&mut c_wkt_ptr, std::ptr::null_mut(), &mut c_geometry)
        };
        if rv != OGRErr::OGRERR_NONE {
            return Err(InfoError::OgrError {
                err: rv,
                method_name: "OGR_G_CreateFromWkt",
            });
        }
        Ok(OwnedGeometry { c_geometry })
    }

    pub fn c_geometry(&self) -> OGRGeometryH {
        self.c_geometry
    }
}

impl Drop for OwnedGeometry {
    fn drop(&mut self) {
        unsafe { gdal_sys::OGR_G_DestroyGeometry(self.c_geometry) };
    }
}

/// Copies an OGR geometry into a crate [`Geometry`].
///
/// Curves are linearized first. Returns `None` for empty handles and for
/// types without a 2D counterpart.
///
/// # Safety
/// `c_geometry` must be null or a valid geometry handle.
pub(crate) unsafe fn geometry_from_c(c_geometry: OGRGeometryH) -> Option<Geometry> {
    if c_geometry.is_null() {
        return None;
    }
    if gdal_sys::OGR_G_HasCurveGeometry(c_geometry, 0) != 0 {
        let linear = gdal_sys::OGR_G_GetLinearGeometry(c_geometry, 0.0, std::ptr::null());
        let converted = to_geo(linear);
        gdal_sys::OGR_G_DestroyGeometry(linear);
        return converted.map(Geometry::from);
    }
    to_geo(c_geometry).map(Geometry::from)
}

unsafe fn points(c_geometry: OGRGeometryH) -> Vec<Coord<f64>> {
    let count = gdal_sys::OGR_G_GetPointCount(c_geometry).max(0);
    (0..count)
        .map(|index| {
            let (mut x, mut y, mut z) = (0.0, 0.0, 0.0);
            gdal_sys::OGR_G_GetPoint(c_geometry, index, &mut x, &mut y, &mut z);
            Coord { x, y }
        })
        .collect()
}

unsafe fn parts(c_geometry: OGRGeometryH) -> impl Iterator<Item = OGRGeometryH> {
    let count = gdal_sys::OGR_G_GetGeometryCount(c_geometry).max(0);
    (0..count).map(move |index| gdal_sys::OGR_G_GetGeometryRef(c_geometry, index))
}

unsafe fn to_geo(c_geometry: OGRGeometryH) -> Option<GeoGeometry<f64>> {
    if c_geometry.is_null() {
        return None;
    }
    let geometry_type = gdal_sys::OGR_GT_Flatten(gdal_sys::OGR_G_GetGeometryType(c_geometry));
    let line_string = |c_part: OGRGeometryH| LineString(points(c_part));
    let polygon = |c_part: OGRGeometryH| {
        let mut rings = parts(c_part).map(line_string);
        let exterior = rings.next().unwrap_or_else(|| LineString(vec![]));
        Polygon::new(exterior, rings.collect())
    };

    let geometry = match geometry_type {
        OGRwkbGeometryType::wkbPoint => match points(c_geometry).first() {
            Some(coord) => GeoGeometry::Point(Point(*coord)),
            None => GeoGeometry::MultiPoint(MultiPoint(vec![])),
        },
        OGRwkbGeometryType::wkbLineString | OGRwkbGeometryType::wkbLinearRing => {
            GeoGeometry::LineString(line_string(c_geometry))
        }
        OGRwkbGeometryType::wkbPolygon | OGRwkbGeometryType::wkbTriangle => {
            GeoGeometry::Polygon(polygon(c_geometry))
        }
        OGRwkbGeometryType::wkbMultiPoint => GeoGeometry::MultiPoint(MultiPoint(
            parts(c_geometry)
                .filter_map(|c_part| points(c_part).first().copied().map(Point))
                .collect(),
        )),
        OGRwkbGeometryType::wkbMultiLineString => GeoGeometry::MultiLineString(
            MultiLineString(parts(c_geometry).map(line_string).collect()),
        ),
        OGRwkbGeometryType::wkbMultiPolygon
        | OGRwkbGeometryType::wkbPolyhedralSurface
        | OGRwkbGeometryType::wkbTIN => {
            GeoGeometry::MultiPolygon(MultiPolygon(parts(c_geometry).map(polygon).collect()))
        }
        OGRwkbGeometryType::wkbGeometryCollection => GeoGeometry::GeometryCollection(
            GeometryCollection(parts(c_geometry).filter_map(|c_part| to_geo(c_part)).collect()),
        ),
        _ => return None,
    };
    Some(geometry)
}
