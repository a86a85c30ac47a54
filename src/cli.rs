use std::ffi::OsString;
use std::path::PathBuf;

use clap::Parser;

use ogrinfo::config::{DisplayOptions, ReportFormat, RunConfiguration};
use ogrinfo::errors::{InfoError, Result};
use ogrinfo::options::NameValueList;
use ogrinfo::vector::sql::Dialect;
use ogrinfo::vector::Geometry;

pub const USAGE: &str = "\
Usage: ogrinfo [--help] [-if format]* [-ro] [-q] [-where restricted_where]
               [-spat xmin ymin xmax ymax] [-geomfield field] [-fid fid]
               [-sql statement] [-dialect sql_dialect] [-al] [-so] [-fields={YES/NO}]
               [-geom={YES/NO/SUMMARY}] [-xml] [-format text|xml|json] [-rc n]
               [--formats] datasource_name [layer [layer ...]]
";

/// Options written with a single dash, GDAL style.
const LONG_OPTIONS: &[&str] = &[
    "if",
    "ro",
    "quiet",
    "where",
    "spat",
    "geomfield",
    "fid",
    "sql",
    "dialect",
    "al",
    "so",
    "summary",
    "fields",
    "geom",
    "xml",
    "format",
    "rc",
    "formats",
    "help",
];

#[derive(Parser, Debug)]
#[command(
    name = "ogrinfo",
    version,
    about = "Lists information about the layers and features of a vector data source"
)]
pub struct Args {
    #[arg(long = "if", value_name = "format", help = "Driver allowed to open the data source")]
    pub input_formats: Vec<String>,
    #[arg(long = "ro", help = "Open the data source read-only")]
    pub read_only: bool,
    #[arg(short = 'q', long = "quiet", help = "Print layer names only")]
    pub quiet: bool,
    #[arg(long = "where", value_name = "restricted_where")]
    pub where_clause: Option<String>,
    #[arg(
        long,
        num_args = 4,
        value_names = ["xmin", "ymin", "xmax", "ymax"],
        allow_negative_numbers = true
    )]
    pub spat: Option<Vec<f64>>,
    #[arg(long, value_name = "field")]
    pub geomfield: Option<String>,
    #[arg(long, allow_negative_numbers = true)]
    pub fid: Option<i64>,
    #[arg(long, value_name = "statement")]
    pub sql: Option<String>,
    #[arg(long, value_name = "sql_dialect")]
    pub dialect: Option<String>,
    #[arg(long = "al", help = "Report on all layers")]
    pub all_layers: bool,
    #[arg(long = "so", visible_alias = "summary", help = "Print layer headers only")]
    pub summary_only: bool,
    #[arg(long, value_name = "YES/NO")]
    pub fields: Option<String>,
    #[arg(long, value_name = "YES/NO/SUMMARY")]
    pub geom: Option<String>,
    #[arg(long, help = "Write one XML document per layer")]
    pub xml: bool,
    #[arg(long, value_name = "text|xml|json")]
    pub format: Option<String>,
    #[arg(long = "rc", value_name = "n", default_value_t = 1)]
    pub repeat_count: u32,
    #[arg(long, help = "List the available drivers")]
    pub formats: bool,
    pub datasource: Option<PathBuf>,
    pub layers: Vec<String>,
}

/// Rewrites `-name` and `-name=value` options to the double dash form.
///
/// Returns the message for an unknown single dash option. Negative numbers
/// and `-q` are left alone.
pub fn normalize<I, T>(args: I) -> std::result::Result<Vec<OsString>, String>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut args = args.into_iter().map(Into::into);
    let mut normalized: Vec<OsString> = args.next().into_iter().collect();
    for arg in args {
        let Some(text) = arg.to_str() else {
            normalized.push(arg);
            continue;
        };
        let Some(option) = text.strip_prefix('-') else {
            normalized.push(arg);
            continue;
        };
        if option.is_empty()
            || option.starts_with('-')
            || option.parse::<f64>().is_ok()
            || option.eq_ignore_ascii_case("q")
        {
            normalized.push(arg);
            continue;
        }
        let (name, value) = match option.split_once('=') {
            Some((name, value)) => (name, Some(value)),
            None => (option, None),
        };
        let name = name.to_ascii_lowercase();
        if !LONG_OPTIONS.contains(&name.as_str()) {
            return Err(format!("Unknown option name '{text}'"));
        }
        normalized.push(match value {
            Some(value) => format!("--{name}={value}").into(),
            None => format!("--{name}").into(),
        });
    }
    Ok(normalized)
}

/// First line of a clap error, without its `error: ` prefix.
pub fn failure_message(error: &clap::Error) -> String {
    let rendered = error.to_string();
    let line = rendered.lines().next().unwrap_or_default();
    line.strip_prefix("error: ").unwrap_or(line).to_string()
}

impl Args {
    pub fn into_configuration(self) -> Result<RunConfiguration> {
        let datasource = self
            .datasource
            .ok_or_else(|| InfoError::BadArgument("No datasource specified.".to_string()))?;

        let mut display_options = NameValueList::new();
        if let Some(fields) = &self.fields {
            display_options.set_name_value("DISPLAY_FIELDS", fields)?;
        }
        if let Some(geom) = &self.geom {
            display_options.set_name_value("DISPLAY_GEOMETRY", geom)?;
        }

        let format = match (&self.format, self.xml) {
            (Some(format), _) => format.parse()?,
            (None, true) => ReportFormat::XmlTree,
            (None, false) => ReportFormat::PlainText,
        };
        let spatial_filter = self
            .spat
            .as_deref()
            .map(|bounds| match bounds {
                [min_x, min_y, max_x, max_y] => {
                    Ok(Geometry::bbox(*min_x, *min_y, *max_x, *max_y))
                }
                _ => Err(InfoError::BadArgument(
                    "-spat option requires 4 argument(s)".to_string(),
                )),
            })
            .transpose()?;
        let dialect = self
            .dialect
            .as_deref()
            .map(str::parse::<Dialect>)
            .transpose()?
            .unwrap_or_default();

        Ok(RunConfiguration {
            datasource,
            list_all: self.all_layers && self.layers.is_empty(),
            layers: self.layers,
            read_only: self.read_only,
            allowed_drivers: self.input_formats,
            verbose: !self.quiet,
            summary_only: self.summary_only,
            fetch_fid: self.fid,
            display: DisplayOptions::from_options(&display_options),
            repeat_count: self.repeat_count,
            format,
            attribute_filter: self.where_clause,
            spatial_filter,
            geometry_field: self.geomfield,
            sql: self.sql,
            dialect,
        })
    }
}
