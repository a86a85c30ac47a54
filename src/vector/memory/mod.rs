//! Pure Rust data sources kept entirely in memory.
//!
//! Layers can be assembled programmatically or loaded from GeoJSON files
//! (see [`MemoryDataSource::open`]). The sources are read-only: opening one
//! for update fails, like a driver without write support would.

use std::cmp::Ordering;
use std::path::Path;

use log::debug;

use crate::errors::*;
use crate::options::OpenOptions;
use crate::vector::expr::Expression;
use crate::vector::sql::{Dialect, SelectStatement};
use crate::vector::{
    DataSource, Defn, Envelope, Feature, FieldContent, FieldValue, Geometry, LayerAccess,
};

mod geojson_file;

pub(crate) use self::geojson_file::{geojson_files, has_geojson_extension};
pub use self::geojson_file::DRIVER_NAME as GEOJSON_DRIVER_NAME;

/// A layer whose features live in a `Vec`.
#[derive(Debug, Clone)]
pub struct MemoryLayer {
    name: String,
    defn: Defn,
    fid_column: String,
    features: Vec<Feature>,
    attribute_filter: Option<Expression>,
    spatial_filter: Option<(usize, Envelope)>,
    next_index: usize,
}

impl MemoryLayer {
    pub fn new(name: &str, defn: Defn) -> MemoryLayer {
        MemoryLayer {
            name: name.to_string(),
            defn,
            fid_column: String::new(),
            features: Vec::new(),
            attribute_filter: None,
            spatial_filter: None,
            next_index: 0,
        }
    }

    pub fn with_fid_column(mut self, fid_column: &str) -> MemoryLayer {
        self.fid_column = fid_column.to_string();
        self
    }

    /// Appends `feature`, assigning the next free id when it has none.
    ///
    /// Returns the feature's id.
    pub fn add_feature(&mut self, mut feature: Feature) -> Result<i64> {
        if feature.fields().count() != self.defn.field_count()
            || feature.geometries().count() != self.defn.geom_field_count()
        {
            return Err(InfoError::BadArgument(format!(
                "Feature does not match the schema of layer {}",
                self.name
            )));
        }
        let fid = match feature.fid() {
            Some(fid) => fid,
            None => self
                .features
                .iter()
                .filter_map(Feature::fid)
                .max()
                .map_or(0, |max| max + 1),
        };
        feature.set_fid(Some(fid));
        self.features.push(feature);
        Ok(fid)
    }

    /// Creates a feature matching this layer's schema, to be filled and
    /// passed to [`MemoryLayer::add_feature`].
    pub fn new_feature(&self) -> Feature {
        Feature::new(&self.defn)
    }

    fn passes_filters(&self, feature: &Feature) -> bool {
        if let Some((index, filter)) = &self.spatial_filter {
            let intersects = feature
                .geometry(*index)
                .and_then(Geometry::envelope)
                .is_some_and(|env| env.intersects(filter));
            if !intersects {
                return false;
            }
        }
        self.attribute_filter
            .as_ref()
            .map_or(true, |expr| expr.evaluate(feature))
    }

    fn filtered(&self) -> impl Iterator<Item = &Feature> {
        self.features.iter().filter(|f| self.passes_filters(f))
    }

    fn check_geom_field(&self, index: usize, method_name: &'static str) -> Result<()> {
        if index < self.defn.geom_field_count() {
            Ok(())
        } else {
            Err(InfoError::InvalidFieldIndex { index, method_name })
        }
    }
}

impl LayerAccess for MemoryLayer {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn defn(&self) -> &Defn {
        &self.defn
    }

    fn fid_column(&self) -> String {
        self.fid_column.clone()
    }

    fn feature_count(&self) -> Option<u64> {
        Some(self.filtered().count() as u64)
    }

    fn geom_field_extent(&self, index: usize) -> Result<Envelope> {
        self.check_geom_field(index, "geom_field_extent")?;
        self.filtered()
            .filter_map(|f| f.geometry(index).and_then(Geometry::envelope))
            .reduce(|mut acc, env| {
                acc.merge(&env);
                acc
            })
            .ok_or(InfoError::ExtentUnavailable { field_index: index })
    }

    fn set_attribute_filter(&mut self, query: &str) -> Result<()> {
        let expr = Expression::parse(query, &self.defn).map_err(|reason| {
            FilterError::InvalidAttributeExpression {
                expression: query.to_string(),
                reason,
            }
        })?;
        debug!("{}: attribute filter set to {query}", self.name);
        self.attribute_filter = Some(expr);
        self.next_index = 0;
        Ok(())
    }

    fn clear_attribute_filter(&mut self) {
        self.attribute_filter = None;
        self.next_index = 0;
    }

    fn set_geom_field_spatial_filter(&mut self, index: usize, geometry: &Geometry) -> Result<()> {
        self.check_geom_field(index, "set_geom_field_spatial_filter")?;
        let envelope = geometry.envelope().ok_or_else(|| {
            InfoError::BadArgument("Spatial filter geometry is empty".to_string())
        })?;
        debug!(
            "{}: spatial filter on geometry field {index} set to {envelope:?}",
            self.name
        );
        self.spatial_filter = Some((index, envelope));
        self.next_index = 0;
        Ok(())
    }

    fn clear_spatial_filter(&mut self) {
        self.spatial_filter = None;
        self.next_index = 0;
    }

    fn reset_feature_reading(&mut self) {
        self.next_index = 0;
    }

    fn next_feature(&mut self) -> Option<Feature> {
        while let Some(feature) = self.features.get(self.next_index) {
            self.next_index += 1;
            if self.passes_filters(feature) {
                return Some(feature.clone());
            }
        }
        None
    }

    fn feature(&mut self, fid: i64) -> Option<Feature> {
        self.features
            .iter()
            .find(|f| f.fid() == Some(fid))
            .cloned()
    }
}

/// A read-only collection of [`MemoryLayer`]s.
#[derive(Debug, Clone)]
pub struct MemoryDataSource {
    description: String,
    driver_name: &'static str,
    layers: Vec<MemoryLayer>,
}

impl MemoryDataSource {
    pub fn new(description: &str) -> MemoryDataSource {
        MemoryDataSource {
            description: description.to_string(),
            driver_name: "Memory",
            layers: Vec::new(),
        }
    }

    /// Opens a GeoJSON file as a single layer source, or a directory as a
    /// source with one layer per `.geojson`/`.json` file it contains.
    pub fn open<P: AsRef<Path>>(path: P, options: &OpenOptions) -> Result<MemoryDataSource> {
        let path = path.as_ref();
        if options.open_flags.is_update() {
            return Err(InfoError::ReadOnlyDriver {
                driver: geojson_file::DRIVER_NAME,
            });
        }
        let mut source = MemoryDataSource {
            description: path.display().to_string(),
            driver_name: geojson_file::DRIVER_NAME,
            layers: Vec::new(),
        };
        if path.is_dir() {
            for file in geojson_file::geojson_files(path)? {
                source.add_layer(geojson_file::load_layer(&file)?);
            }
        } else {
            source.add_layer(geojson_file::load_layer(path)?);
        }
        debug!(
            "Opened {} with {} layer(s)",
            source.description,
            source.layers.len()
        );
        Ok(source)
    }

    pub fn add_layer(&mut self, layer: MemoryLayer) {
        self.layers.push(layer);
    }

    fn select(
        &self,
        query: &str,
        statement: &SelectStatement,
        spatial_filter: Option<&Geometry>,
    ) -> Result<MemoryLayer> {
        let invalid = |reason: String| InfoError::InvalidSql {
            statement: query.to_string(),
            reason,
        };
        let source = self
            .layers
            .iter()
            .find(|l| l.name.eq_ignore_ascii_case(&statement.table))
            .ok_or_else(|| {
                invalid(format!(
                    "SELECT from table {} failed, no such table/featureclass.",
                    statement.table
                ))
            })?;

        let column_indexes: Vec<usize> = match &statement.columns {
            None => (0..source.defn.field_count()).collect(),
            Some(columns) => columns
                .iter()
                .map(|c| {
                    source
                        .defn
                        .field_index(c)
                        .map_err(|_| invalid(format!("Field `{c}' not found")))
                })
                .collect::<Result<_>>()?,
        };
        let where_clause = statement
            .where_clause
            .as_deref()
            .map(|w| Expression::parse(w, &source.defn).map_err(invalid))
            .transpose()?;
        let order_index = statement
            .order_by
            .as_ref()
            .map(|o| {
                source
                    .defn
                    .field_index(&o.column)
                    .map_err(|_| invalid(format!("Field `{}' not found", o.column)))
            })
            .transpose()?;
        let filter_envelope = spatial_filter.and_then(Geometry::envelope);

        let fields = column_indexes
            .iter()
            .filter_map(|i| source.defn.field(*i).cloned())
            .collect();
        let geom_fields = source.defn.geom_fields().cloned().collect();
        let mut result = MemoryLayer::new(&source.name, Defn::new(fields, geom_fields))
            .with_fid_column(&source.fid_column);

        let mut selected: Vec<&Feature> = source
            .features
            .iter()
            .filter(|f| where_clause.as_ref().map_or(true, |w| w.evaluate(f)))
            .filter(|f| match &filter_envelope {
                Some(env) => f
                    .geometry(0)
                    .and_then(Geometry::envelope)
                    .is_some_and(|g| g.intersects(env)),
                None => true,
            })
            .collect();
        if let (Some(index), Some(order)) = (order_index, &statement.order_by) {
            selected.sort_by(|a, b| {
                let ordering = compare_contents(a.field(index).ok(), b.field(index).ok());
                if order.ascending {
                    ordering
                } else {
                    ordering.reverse()
                }
            });
        }

        for feature in selected {
            let mut projected = result.new_feature();
            projected.set_fid(feature.fid());
            for (target, source_index) in column_indexes.iter().enumerate() {
                match feature.field(*source_index)? {
                    FieldContent::Unset => {}
                    FieldContent::Null => projected.set_field_null(target)?,
                    FieldContent::Value(value) => projected.set_field(target, value.clone())?,
                }
            }
            for (index, geometry) in feature.geometries().enumerate() {
                if let Some(geometry) = geometry {
                    projected.set_geometry(index, geometry.clone())?;
                }
            }
            if let Some(style) = feature.style_string() {
                projected.set_style_string(style);
            }
            result.add_feature(projected)?;
        }
        Ok(result)
    }
}

fn compare_contents(a: Option<&FieldContent>, b: Option<&FieldContent>) -> Ordering {
    let value = |c: Option<&FieldContent>| c.and_then(FieldContent::value).cloned();
    match (value(a), value(b)) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => compare_values(&a, &b),
    }
}

fn compare_values(a: &FieldValue, b: &FieldValue) -> Ordering {
    match (a, b) {
        (FieldValue::StringValue(a), FieldValue::StringValue(b)) => a.cmp(b),
        (FieldValue::DateValue(a), FieldValue::DateValue(b)) => a.cmp(b),
        (FieldValue::TimeValue(a), FieldValue::TimeValue(b)) => a.cmp(b),
        (FieldValue::DateTimeValue(a), FieldValue::DateTimeValue(b)) => a.cmp(b),
        (FieldValue::LocalDateTimeValue(a), FieldValue::LocalDateTimeValue(b)) => a.cmp(b),
        (a, b) => match (a.clone().into_real(), b.clone().into_real()) {
            (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
            _ => Ordering::Equal,
        },
    }
}

impl DataSource for MemoryDataSource {
    type Layer<'a> = &'a mut MemoryLayer;
    type ResultSet<'a> = MemoryLayer;

    fn description(&self) -> String {
        self.description.clone()
    }

    fn driver_name(&self) -> String {
        self.driver_name.to_string()
    }

    fn layer_count(&self) -> usize {
        self.layers.len()
    }

    fn layer(&mut self, index: usize) -> Result<&mut MemoryLayer> {
        self.layers
            .get_mut(index)
            .ok_or(InfoError::LayerIndexOutOfRange { index })
    }

    fn layer_by_name(&mut self, name: &str) -> Result<&mut MemoryLayer> {
        self.layers
            .iter_mut()
            .find(|l| l.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| InfoError::LayerNotFound {
                name: name.to_string(),
            })
    }

    fn execute_sql(
        &mut self,
        query: &str,
        spatial_filter: Option<&Geometry>,
        dialect: Dialect,
    ) -> Result<Option<MemoryLayer>> {
        if dialect == Dialect::SQLITE {
            return Err(InfoError::UnsupportedDialect {
                dialect: dialect.to_string(),
                driver: self.driver_name(),
            });
        }
        let statement = SelectStatement::parse(query)?;
        let result = self.select(query, &statement, spatial_filter)?;
        debug!(
            "{query}: {} feature(s) in result set",
            result.features.len()
        );
        Ok(Some(result))
    }
}
