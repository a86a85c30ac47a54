//! Turns the features of a layer into format-neutral records.

use crate::config::RunConfiguration;
use crate::report::metadata::LayerMetadata;
use crate::vector::{Feature, FieldContent, FieldType, Geometry, LayerAccess, NULL_FID};

/// Which features a report dumps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DumpMode {
    /// Every feature passing the filters, in layer order.
    All,
    /// Only the feature with this id, filters notwithstanding.
    ById(i64),
    /// None at all.
    Summary,
}

impl DumpMode {
    /// A requested feature id wins over summary-only mode.
    pub fn from_configuration(config: &RunConfiguration) -> DumpMode {
        match (config.fetch_fid, config.summary_only) {
            (Some(fid), _) => DumpMode::ById(fid),
            (None, true) => DumpMode::Summary,
            (None, false) => DumpMode::All,
        }
    }
}

/// One attribute of a [`FeatureRecord`].
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeValue {
    pub name: String,
    pub field_type: FieldType,
    pub content: FieldContent,
    display: Option<String>,
}

impl AttributeValue {
    /// The value formatted the way OGR prints it, `None` unless a value is set.
    pub fn display(&self) -> Option<&str> {
        self.display.as_deref()
    }
}

/// Both textual forms of a feature geometry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeometryText {
    pub wkt: String,
    /// Lines of the `-geom=SUMMARY` form.
    pub summary: Vec<String>,
}

impl From<&Geometry> for GeometryText {
    fn from(geometry: &Geometry) -> Self {
        GeometryText {
            wkt: geometry.wkt(),
            summary: geometry.summary(),
        }
    }
}

/// One geometry field of a [`FeatureRecord`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeometryValue {
    pub name: String,
    pub geometry: Option<GeometryText>,
}

/// A feature flattened for rendering.
///
/// Attributes and geometries follow the order of the layer metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRecord {
    pub fid: Option<i64>,
    pub attributes: Vec<AttributeValue>,
    pub geometries: Vec<GeometryValue>,
    pub style: Option<String>,
}

impl FeatureRecord {
    pub fn new(feature: &Feature, metadata: &LayerMetadata) -> FeatureRecord {
        let attributes = metadata
            .fields
            .iter()
            .enumerate()
            .map(|(index, field)| {
                let content = feature.field(index).cloned().unwrap_or_default();
                AttributeValue {
                    name: field.name().to_string(),
                    field_type: field.field_type(),
                    display: content.value().map(|v| v.to_display_string(field)),
                    content,
                }
            })
            .collect();
        let geometries = metadata
            .geometry_fields
            .iter()
            .enumerate()
            .map(|(index, field)| GeometryValue {
                name: field.name.clone(),
                geometry: feature.geometry(index).map(GeometryText::from),
            })
            .collect();
        FeatureRecord {
            fid: feature.fid(),
            attributes,
            geometries,
            style: feature.style_string().map(str::to_string),
        }
    }

    /// Feature id as printed, `-1` when the feature has none.
    pub fn display_fid(&self) -> i64 {
        self.fid.unwrap_or(NULL_FID)
    }
}

enum State {
    Sequential,
    Single(Option<FeatureRecord>),
}

/// Iterator over the records of a dump, see [`dump`].
pub struct FeatureRecords<'a, L: LayerAccess + ?Sized> {
    layer: &'a mut L,
    metadata: &'a LayerMetadata,
    state: State,
}

impl<L: LayerAccess + ?Sized> Iterator for FeatureRecords<'_, L> {
    type Item = FeatureRecord;

    fn next(&mut self) -> Option<FeatureRecord> {
        match &mut self.state {
            State::Sequential => self
                .layer
                .next_feature()
                .map(|f| FeatureRecord::new(&f, self.metadata)),
            State::Single(record) => record.take(),
        }
    }
}

/// Dumps the features of `layer` selected by `mode`.
///
/// Sequential dumps continue from the layer's current read position and
/// leave it exhausted. A [`DumpMode::ById`] dump of a missing id yields
/// nothing.
pub fn dump<'a, L: LayerAccess + ?Sized>(
    layer: &'a mut L,
    metadata: &'a LayerMetadata,
    mode: DumpMode,
) -> FeatureRecords<'a, L> {
    let state = match mode {
        DumpMode::All => State::Sequential,
        DumpMode::ById(fid) => State::Single(
            layer
                .feature(fid)
                .map(|f| FeatureRecord::new(&f, metadata)),
        ),
        DumpMode::Summary => State::Single(None),
    };
    FeatureRecords {
        layer,
        metadata,
        state,
    }
}
