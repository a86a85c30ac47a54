use crate::errors::*;
use crate::spatial_ref::SpatialRef;
use crate::vector::{Defn, Envelope, Feature, Geometry, GeometryType};

/// Read access to a vector layer or to the result set of an SQL query.
///
/// Filters installed with [`LayerAccess::set_attribute_filter`] and the
/// spatial filter methods restrict what [`LayerAccess::next_feature`],
/// [`LayerAccess::feature_count`] and the extent methods see. Sequential
/// reading is not restartable without [`LayerAccess::reset_feature_reading`].
pub trait LayerAccess {
    /// Name of the layer.
    fn name(&self) -> String;

    /// Schema of the layer's features.
    fn defn(&self) -> &Defn;

    /// Layer-level geometry type, the type of the first geometry field.
    fn geometry_type(&self) -> GeometryType {
        self.defn().geometry_type()
    }

    /// Name of the column holding feature ids, empty when the format has none.
    fn fid_column(&self) -> String {
        String::new()
    }

    /// Name of the first geometry column, empty when the format does not name it.
    fn geometry_column(&self) -> String {
        self.defn()
            .geom_field(0)
            .map(|g| g.name().to_string())
            .unwrap_or_default()
    }

    /// Layer-level spatial reference, the one of the first geometry field.
    fn spatial_ref(&self) -> Option<SpatialRef> {
        self.geom_field_spatial_ref(0)
    }

    fn geom_field_spatial_ref(&self, index: usize) -> Option<SpatialRef> {
        self.defn()
            .geom_field(index)
            .and_then(|g| g.spatial_ref())
            .cloned()
    }

    /// Number of features passing the current filters, or `None` when the
    /// source cannot tell.
    fn feature_count(&self) -> Option<u64>;

    /// Extent of the layer's first geometry field.
    fn get_extent(&self) -> Result<Envelope> {
        self.geom_field_extent(0)
    }

    /// Extent of the geometry field at `index`, computed over the features
    /// passing the current filters. May scan the whole layer.
    fn geom_field_extent(&self, index: usize) -> Result<Envelope>;

    /// Installs a restricted-WHERE attribute filter, replacing any previous one.
    fn set_attribute_filter(&mut self, query: &str) -> Result<()>;

    fn clear_attribute_filter(&mut self);

    /// Installs a spatial filter on the first geometry field.
    fn set_spatial_filter(&mut self, geometry: &Geometry) -> Result<()> {
        self.set_geom_field_spatial_filter(0, geometry)
    }

    /// Installs a spatial filter on the geometry field at `index`.
    fn set_geom_field_spatial_filter(&mut self, index: usize, geometry: &Geometry) -> Result<()>;

    fn clear_spatial_filter(&mut self);

    /// Rewinds sequential reading to the first feature.
    fn reset_feature_reading(&mut self);

    /// Next feature passing the filters, `None` once the layer is exhausted.
    fn next_feature(&mut self) -> Option<Feature>;

    /// Fetches a feature by id, ignoring the filters.
    fn feature(&mut self, fid: i64) -> Option<Feature>;

    /// Iterate over the remaining features of this layer.
    ///
    /// The iterator continues from the current read position; call
    /// [`LayerAccess::reset_feature_reading`] first to start over.
    fn features(&mut self) -> FeatureIterator<'_, Self>
    where
        Self: Sized,
    {
        FeatureIterator { layer: self }
    }
}

impl<L: LayerAccess + ?Sized> LayerAccess for &mut L {
    fn name(&self) -> String {
        (**self).name()
    }

    fn defn(&self) -> &Defn {
        (**self).defn()
    }

    fn geometry_type(&self) -> GeometryType {
        (**self).geometry_type()
    }

    fn fid_column(&self) -> String {
        (**self).fid_column()
    }

    fn geometry_column(&self) -> String {
        (**self).geometry_column()
    }

    fn spatial_ref(&self) -> Option<SpatialRef> {
        (**self).spatial_ref()
    }

    fn geom_field_spatial_ref(&self, index: usize) -> Option<SpatialRef> {
        (**self).geom_field_spatial_ref(index)
    }

    fn feature_count(&self) -> Option<u64> {
        (**self).feature_count()
    }

    fn get_extent(&self) -> Result<Envelope> {
        (**self).get_extent()
    }

    fn geom_field_extent(&self, index: usize) -> Result<Envelope> {
        (**self).geom_field_extent(index)
    }

    fn set_attribute_filter(&mut self, query: &str) -> Result<()> {
        (**self).set_attribute_filter(query)
    }

    fn clear_attribute_filter(&mut self) {
        (**self).clear_attribute_filter()
    }

    fn set_spatial_filter(&mut self, geometry: &Geometry) -> Result<()> {
        (**self).set_spatial_filter(geometry)
    }

    fn set_geom_field_spatial_filter(&mut self, index: usize, geometry: &Geometry) -> Result<()> {
        (**self).set_geom_field_spatial_filter(index, geometry)
    }

    fn clear_spatial_filter(&mut self) {
        (**self).clear_spatial_filter()
    }

    fn reset_feature_reading(&mut self) {
        (**self).reset_feature_reading()
    }

    fn next_feature(&mut self) -> Option<Feature> {
        (**self).next_feature()
    }

    fn feature(&mut self, fid: i64) -> Option<Feature> {
        (**self).feature(fid)
    }
}

pub struct FeatureIterator<'a, L: LayerAccess + ?Sized> {
    layer: &'a mut L,
}

impl<L: LayerAccess + ?Sized> Iterator for FeatureIterator<'_, L> {
    type Item = Feature;

    #[inline]
    fn next(&mut self) -> Option<Feature> {
        self.layer.next_feature()
    }
}
