use std::io::Write;

use crate::config::{DisplayOptions, GeometryDisplay};
use crate::errors::Result;
use crate::report::dump::FeatureRecord;
use crate::report::metadata::LayerMetadata;
use crate::report::ReportWriter;
use crate::utils::format_f;
use crate::vector::Envelope;

fn extent_text(extent: &Envelope) -> String {
    format!(
        "({}, {}) - ({}, {})",
        format_f(extent.min_x),
        format_f(extent.min_y),
        format_f(extent.max_x),
        format_f(extent.max_y)
    )
}

/// The classic `ogrinfo` text report, written as it is produced.
#[derive(Debug, Clone, Default)]
pub struct PlainTextWriter {
    display: DisplayOptions,
}

impl PlainTextWriter {
    pub fn new(display: DisplayOptions) -> Self {
        PlainTextWriter { display }
    }
}

impl ReportWriter for PlainTextWriter {
    fn begin_layer(&mut self, out: &mut dyn Write, metadata: &LayerMetadata) -> Result<()> {
        writeln!(out)?;
        writeln!(out, "Layer name: {}", metadata.name)?;
        let Some(details) = &metadata.details else {
            return Ok(());
        };
        let multi = metadata.geometry_fields.len() > 1;

        if multi {
            for field in &metadata.geometry_fields {
                writeln!(out, "Geometry ({}): {}", field.name, field.geometry_type)?;
            }
        } else {
            writeln!(out, "Geometry: {}", details.geometry_type)?;
        }

        if let Some(count) = details.feature_count {
            writeln!(out, "Feature Count: {count}")?;
        }

        if multi {
            for field in &metadata.geometry_fields {
                if let Some(extent) = &field.extent {
                    writeln!(out, "Extent ({}): {}", field.name, extent_text(extent))?;
                }
            }
        } else if let Some(extent) = &details.extent {
            writeln!(out, "Extent: {}", extent_text(extent))?;
        }

        if multi {
            for field in &metadata.geometry_fields {
                writeln!(out, "SRS WKT ({}):\n{}", field.name, field.spatial_ref)?;
            }
        } else {
            writeln!(out, "Layer SRS WKT:\n{}", details.spatial_ref)?;
        }

        if let Some(fid_column) = &details.fid_column {
            writeln!(out, "FID Column = {fid_column}")?;
        }

        if multi {
            for (index, field) in metadata.geometry_fields.iter().enumerate() {
                writeln!(out, "Geometry Column {} = {}", index + 1, field.name)?;
            }
        } else if let Some(geometry_column) = &details.geometry_column {
            writeln!(out, "Geometry Column = {geometry_column}")?;
        }

        for field in &metadata.fields {
            writeln!(
                out,
                "{}: {} ({}.{})",
                field.name(),
                field.field_type(),
                field.width(),
                field.precision()
            )?;
        }
        Ok(())
    }

    fn feature(
        &mut self,
        out: &mut dyn Write,
        metadata: &LayerMetadata,
        record: &FeatureRecord,
    ) -> Result<()> {
        writeln!(out, "OGRFeature({}):{}", metadata.name, record.display_fid())?;

        if self.display.fields {
            for attribute in &record.attributes {
                writeln!(
                    out,
                    "  {} ({}) = {}",
                    attribute.name,
                    attribute.field_type,
                    attribute.display().unwrap_or("(null)")
                )?;
            }
        }

        if let (Some(style), true) = (&record.style, self.display.style) {
            writeln!(out, "  Style = {style}")?;
        }

        let named = record.geometries.len() > 1;
        for value in &record.geometries {
            let Some(geometry) = &value.geometry else {
                continue;
            };
            let label = if named && !value.name.is_empty() {
                format!("{} = ", value.name)
            } else {
                String::new()
            };
            match self.display.geometry {
                GeometryDisplay::Full => writeln!(out, "  {label}{}", geometry.wkt)?,
                GeometryDisplay::Summary => {
                    for (i, line) in geometry.summary.iter().enumerate() {
                        if i == 0 {
                            writeln!(out, "  {label}{line}")?;
                        } else {
                            writeln!(out, "  {line}")?;
                        }
                    }
                }
                GeometryDisplay::Suppressed => {}
            }
        }

        writeln!(out)?;
        Ok(())
    }

    fn end_layer(&mut self, _out: &mut dyn Write, _metadata: &LayerMetadata) -> Result<()> {
        Ok(())
    }
}
