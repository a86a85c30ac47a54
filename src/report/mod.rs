//! Report engine
//!
//! A run opens the configured data source, then for every requested layer
//! (or for the result set of an SQL statement) installs the filters,
//! extracts the layer metadata, dumps the features and hands both to the
//! [`ReportWriter`] of the selected output format.
//!
//! Two sinks are used: the report itself and a diagnostic stream for
//! warnings and informational messages, so that XML output stays parseable.
//!
//! ```
//! use ogrinfo::config::RunConfiguration;
//!
//! let config = RunConfiguration {
//!     list_all: true,
//!     summary_only: true,
//!     ..RunConfiguration::new("fixtures/roads.geojson")
//! };
//! let mut report = Vec::new();
//! ogrinfo::report::run(&config, &mut report, &mut std::io::sink()).unwrap();
//! let report = String::from_utf8(report).unwrap();
//! assert!(report.contains("Layer name: roads\nGeometry: Line String\nFeature Count: 3\n"));
//! ```

use std::io::Write;

use log::debug;

use crate::config::{DisplayOptions, ReportFormat, RunConfiguration};
use crate::errors::*;
use crate::options::{OpenFlags, OpenOptions};
use crate::vector::{self, DataSource, Geometry, GeometryType, LayerAccess, OpenedSource};

use self::dump::{dump, DumpMode};
use self::metadata::LayerMetadata;

pub mod dump;
pub mod filter;
pub mod metadata;
mod text;
mod xml;

pub use self::dump::FeatureRecord;
pub use self::text::PlainTextWriter;
pub use self::xml::{XmlNode, XmlTreeWriter};

/// Renders layer metadata and feature records in one output format.
///
/// A layer report is one `begin_layer`, one `feature` call per dumped record
/// and one `end_layer`.
pub trait ReportWriter {
    fn begin_layer(&mut self, out: &mut dyn Write, metadata: &LayerMetadata) -> Result<()>;

    fn feature(
        &mut self,
        out: &mut dyn Write,
        metadata: &LayerMetadata,
        record: &FeatureRecord,
    ) -> Result<()>;

    fn end_layer(&mut self, out: &mut dyn Write, metadata: &LayerMetadata) -> Result<()>;

    /// Whether "Unable to locate feature id" belongs in the report itself
    /// rather than on the diagnostic stream.
    fn reports_missing_features(&self) -> bool {
        true
    }
}

/// The writer for `format`, or [`InfoError::UnsupportedFormat`].
pub fn writer_for(format: ReportFormat, display: DisplayOptions) -> Result<Box<dyn ReportWriter>> {
    match format {
        ReportFormat::PlainText => Ok(Box::new(PlainTextWriter::new(display))),
        ReportFormat::XmlTree => Ok(Box::new(XmlTreeWriter::new())),
        ReportFormat::Json => Err(InfoError::UnsupportedFormat {
            format: format.to_string(),
        }),
    }
}

/// Opens the data source of `config` and reports on it.
///
/// An unsupported output format fails before anything is written to either
/// sink.
pub fn run(
    config: &RunConfiguration,
    report: &mut dyn Write,
    diagnostics: &mut dyn Write,
) -> Result<()> {
    let mut reporter = Reporter::new(config, report, diagnostics)?;
    match reporter.open()? {
        OpenedSource::Memory(mut source) => reporter.run(&mut source),
        #[cfg(feature = "gdal")]
        OpenedSource::Gdal(mut source) => reporter.run(&mut source),
    }
}

/// Drives the reports of one run.
pub struct Reporter<'a> {
    config: &'a RunConfiguration,
    writer: Box<dyn ReportWriter>,
    report: &'a mut dyn Write,
    diagnostics: &'a mut dyn Write,
}

impl<'a> Reporter<'a> {
    pub fn new(
        config: &'a RunConfiguration,
        report: &'a mut dyn Write,
        diagnostics: &'a mut dyn Write,
    ) -> Result<Reporter<'a>> {
        Ok(Reporter {
            config,
            writer: writer_for(config.format, config.display)?,
            report,
            diagnostics,
        })
    }

    /// Opens the configured data source, for update first unless the run
    /// is read-only.
    pub fn open(&mut self) -> Result<OpenedSource> {
        let config = self.config;
        let path = &config.datasource;
        let allowed: Vec<&str> = config.allowed_drivers.iter().map(String::as_str).collect();
        let allowed_drivers = (!allowed.is_empty()).then_some(allowed.as_slice());
        let read_only = || OpenOptions {
            allowed_drivers,
            ..OpenOptions::default()
        };

        let source = if config.read_only {
            vector::open(path, read_only())?
        } else {
            let update = OpenOptions {
                open_flags: OpenFlags::UPDATE | OpenFlags::VECTOR,
                allowed_drivers,
            };
            match vector::open(path, update) {
                Ok(source) => source,
                Err(e) => {
                    debug!("Opening {} for update failed: {e}", path.display());
                    let source = vector::open(path, read_only())?;
                    if config.verbose {
                        writeln!(self.diagnostics, "Had to open data source read-only.")?;
                    }
                    source
                }
            }
        };

        if config.verbose {
            writeln!(
                self.diagnostics,
                "INFO: Open of `{}'\n      using driver `{}' successful.",
                path.display(),
                source.driver_name()
            )?;
            let internal_name = source.description();
            if !internal_name.eq_ignore_ascii_case(&path.to_string_lossy()) {
                writeln!(
                    self.diagnostics,
                    "INFO: Internal data source name `{internal_name}'\n      different from user name `{}'.",
                    path.display()
                )?;
            }
        }
        Ok(source)
    }

    /// Reports on `source`: the SQL result set when a statement is
    /// configured, otherwise the requested layers (or a listing of all of
    /// them) once per pass.
    pub fn run<D: DataSource>(&mut self, source: &mut D) -> Result<()> {
        let config = self.config;
        if let Some(statement) = &config.sql {
            return self.report_sql(source, statement);
        }

        debug!("Layer count: {}", source.layer_count());
        for pass in 0..config.repeat_count {
            if config.layers.is_empty() {
                for index in 0..source.layer_count() {
                    let mut layer = source.layer(index)?;
                    if config.list_all {
                        self.report_pass(&mut layer, pass)?;
                    } else {
                        self.list_layer(index, &layer)?;
                    }
                }
            } else {
                for name in &config.layers {
                    let mut layer = source.layer_by_name(name)?;
                    self.report_pass(&mut layer, pass)?;
                }
            }
        }
        Ok(())
    }

    fn report_pass<L: LayerAccess>(&mut self, layer: &mut L, pass: u32) -> Result<()> {
        let config = self.config;
        if pass != 0 {
            debug!("Pass {pass}: rewinding {}", layer.name());
            layer.reset_feature_reading();
        }
        self.report_layer(
            layer,
            config.attribute_filter.as_deref(),
            config.spatial_filter.as_ref(),
            config.geometry_field.as_deref(),
        )
    }

    fn list_layer<L: LayerAccess>(&mut self, index: usize, layer: &L) -> Result<()> {
        write!(self.report, "{}: {}", index + 1, layer.name())?;
        let defn = layer.defn();
        if defn.geom_field_count() > 1 {
            let types: Vec<&str> = defn
                .geom_fields()
                .map(|field| field.geometry_type().name())
                .collect();
            write!(self.report, " ({})", types.join(", "))?;
        } else if layer.geometry_type() != GeometryType::Unknown {
            write!(self.report, " ({})", layer.geometry_type())?;
        }
        writeln!(self.report)?;
        Ok(())
    }

    /// Runs `statement` and reports on its result set.
    ///
    /// Without a geometry field name the spatial filter is handed to the
    /// query; with one it is installed on that field of the result set.
    /// The attribute filter is always applied to the result set.
    fn report_sql<D: DataSource>(&mut self, source: &mut D, statement: &str) -> Result<()> {
        let config = self.config;
        if !config.layers.is_empty() {
            writeln!(
                self.diagnostics,
                "layer names ignored in combination with -sql."
            )?;
        }

        let query_filter = match config.geometry_field {
            None => config.spatial_filter.as_ref(),
            Some(_) => None,
        };
        let Some(mut result_set) = source.execute_sql(statement, query_filter, config.dialect)?
        else {
            debug!("{statement}: no result set");
            return Ok(());
        };

        filter::apply(
            &mut result_set,
            config.attribute_filter.as_deref(),
            None,
            None,
            self.diagnostics,
        )?;
        match config.geometry_field.as_deref() {
            Some(name) => self.report_layer(
                &mut result_set,
                None,
                config.spatial_filter.as_ref(),
                Some(name),
            ),
            None => self.report_layer(&mut result_set, None, None, None),
        }
    }

    /// Filters, describes and dumps one layer.
    pub fn report_layer<L: LayerAccess + ?Sized>(
        &mut self,
        layer: &mut L,
        attribute_filter: Option<&str>,
        spatial_filter: Option<&Geometry>,
        geometry_field: Option<&str>,
    ) -> Result<()> {
        filter::apply(
            layer,
            attribute_filter,
            spatial_filter,
            geometry_field,
            self.diagnostics,
        )?;
        let metadata = metadata::extract(&*layer, self.config.verbose);
        let mode = DumpMode::from_configuration(self.config);

        self.writer.begin_layer(self.report, &metadata)?;
        let mut dumped = 0usize;
        for record in dump(layer, &metadata, mode) {
            self.writer.feature(self.report, &metadata, &record)?;
            dumped += 1;
        }
        if let DumpMode::ById(fid) = mode {
            if dumped == 0 {
                let sink: &mut dyn Write = if self.writer.reports_missing_features() {
                    &mut *self.report
                } else {
                    &mut *self.diagnostics
                };
                writeln!(sink, "Unable to locate feature id {fid} on this layer.")?;
            }
        }
        self.writer.end_layer(self.report, &metadata)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests;
