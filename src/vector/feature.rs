use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

use crate::errors::*;
use crate::utils::format_g;
use crate::vector::{Defn, FieldDefn, FieldType, Geometry};

/// A feature read from a layer: identifier, attribute values, geometries and
/// an optional style string.
///
/// Attribute and geometry slots follow the order of the layer's [`Defn`].
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    fid: Option<i64>,
    fields: Vec<FieldContent>,
    geometries: Vec<Option<Geometry>>,
    style: Option<String>,
}

impl Feature {
    /// Creates a feature with every field unset and no geometry.
    pub fn new(defn: &Defn) -> Feature {
        Feature {
            fid: None,
            fields: vec![FieldContent::Unset; defn.field_count()],
            geometries: vec![None; defn.geom_field_count()],
            style: None,
        }
    }

    /// Get the feature's id, or `None` when it has not been assigned one.
    pub fn fid(&self) -> Option<i64> {
        self.fid
    }

    pub fn set_fid(&mut self, fid: Option<i64>) {
        self.fid = fid;
    }

    /// Content of the attribute field at `index`.
    pub fn field(&self, index: usize) -> Result<&FieldContent> {
        self.fields.get(index).ok_or(InfoError::InvalidFieldIndex {
            index,
            method_name: "field",
        })
    }

    /// Content of the attribute field called `name`.
    pub fn field_by_name(&self, defn: &Defn, name: &str) -> Result<&FieldContent> {
        self.field(defn.field_index(name)?)
    }

    pub fn fields(&self) -> std::slice::Iter<'_, FieldContent> {
        self.fields.iter()
    }

    pub fn set_field(&mut self, index: usize, value: FieldValue) -> Result<()> {
        self.set_field_content(index, FieldContent::Value(value))
    }

    pub fn set_field_null(&mut self, index: usize) -> Result<()> {
        self.set_field_content(index, FieldContent::Null)
    }

    pub fn unset_field(&mut self, index: usize) -> Result<()> {
        self.set_field_content(index, FieldContent::Unset)
    }

    fn set_field_content(&mut self, index: usize, content: FieldContent) -> Result<()> {
        let slot = self
            .fields
            .get_mut(index)
            .ok_or(InfoError::InvalidFieldIndex {
                index,
                method_name: "set_field",
            })?;
        *slot = content;
        Ok(())
    }

    /// Geometry stored in the geometry field at `index`, if any.
    pub fn geometry(&self, index: usize) -> Option<&Geometry> {
        self.geometries.get(index).and_then(Option::as_ref)
    }

    pub fn geometries(&self) -> impl Iterator<Item = Option<&Geometry>> {
        self.geometries.iter().map(Option::as_ref)
    }

    pub fn set_geometry(&mut self, index: usize, geometry: Geometry) -> Result<()> {
        let slot = self
            .geometries
            .get_mut(index)
            .ok_or(InfoError::InvalidFieldIndex {
                index,
                method_name: "set_geometry",
            })?;
        *slot = Some(geometry);
        Ok(())
    }

    pub fn style_string(&self) -> Option<&str> {
        self.style.as_deref()
    }

    pub fn set_style_string(&mut self, style: &str) {
        self.style = Some(style.to_string());
    }
}

/// What an attribute slot of a feature holds.
///
/// A field that was never assigned is [`FieldContent::Unset`]; a field that
/// was explicitly assigned "no value" is [`FieldContent::Null`].
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FieldContent {
    #[default]
    Unset,
    Null,
    Value(FieldValue),
}

impl FieldContent {
    pub fn is_set(&self) -> bool {
        !matches!(self, FieldContent::Unset)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldContent::Null)
    }

    pub fn value(&self) -> Option<&FieldValue> {
        match self {
            FieldContent::Value(value) => Some(value),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    IntegerValue(i32),
    Integer64Value(i64),
    RealValue(f64),
    StringValue(String),
    DateValue(NaiveDate),
    TimeValue(NaiveTime),
    /// Date and time with a known offset from UTC.
    DateTimeValue(DateTime<FixedOffset>),
    /// Date and time in an unknown or local time zone.
    LocalDateTimeValue(NaiveDateTime),
    BinaryValue(Vec<u8>),
    IntegerListValue(Vec<i32>),
    Integer64ListValue(Vec<i64>),
    RealListValue(Vec<f64>),
    StringListValue(Vec<String>),
}

impl FieldValue {
    /// Interpret the value as `String`.
    pub fn into_string(self) -> Option<String> {
        match self {
            FieldValue::StringValue(rv) => Some(rv),
            _ => None,
        }
    }

    /// Interpret the value as `f64`, widening integers.
    pub fn into_real(self) -> Option<f64> {
        match self {
            FieldValue::RealValue(rv) => Some(rv),
            FieldValue::IntegerValue(rv) => Some(rv as f64),
            FieldValue::Integer64Value(rv) => Some(rv as f64),
            _ => None,
        }
    }

    /// Interpret the value as `i32`.
    pub fn into_int(self) -> Option<i32> {
        match self {
            FieldValue::IntegerValue(rv) => Some(rv),
            FieldValue::Integer64Value(rv) => i32::try_from(rv).ok(),
            _ => None,
        }
    }

    /// Interpret the value as `i64`.
    pub fn into_int64(self) -> Option<i64> {
        match self {
            FieldValue::IntegerValue(rv) => Some(rv as i64),
            FieldValue::Integer64Value(rv) => Some(rv),
            _ => None,
        }
    }

    /// Interpret the value as `Date`.
    pub fn into_date(self) -> Option<NaiveDate> {
        match self {
            FieldValue::DateValue(rv) => Some(rv),
            FieldValue::DateTimeValue(rv) => Some(rv.date_naive()),
            FieldValue::LocalDateTimeValue(rv) => Some(rv.date()),
            _ => None,
        }
    }

    /// Interpret the value as `DateTime`.
    pub fn into_datetime(self) -> Option<DateTime<FixedOffset>> {
        match self {
            FieldValue::DateTimeValue(rv) => Some(rv),
            _ => None,
        }
    }

    /// The field type this value naturally belongs to.
    pub fn field_type(&self) -> FieldType {
        match self {
            FieldValue::IntegerValue(_) => FieldType::Integer,
            FieldValue::Integer64Value(_) => FieldType::Integer64,
            FieldValue::RealValue(_) => FieldType::Real,
            FieldValue::StringValue(_) => FieldType::String,
            FieldValue::DateValue(_) => FieldType::Date,
            FieldValue::TimeValue(_) => FieldType::Time,
            FieldValue::DateTimeValue(_) | FieldValue::LocalDateTimeValue(_) => {
                FieldType::DateTime
            }
            FieldValue::BinaryValue(_) => FieldType::Binary,
            FieldValue::IntegerListValue(_) => FieldType::IntegerList,
            FieldValue::Integer64ListValue(_) => FieldType::Integer64List,
            FieldValue::RealListValue(_) => FieldType::RealList,
            FieldValue::StringListValue(_) => FieldType::StringList,
        }
    }

    /// String form of the value as printed in feature dumps.
    ///
    /// Reals use 15 significant digits unless `field` declares a width, in
    /// which case they are right aligned to `width.precision`.
    pub fn to_display_string(&self, field: &FieldDefn) -> String {
        match self {
            FieldValue::IntegerValue(v) => v.to_string(),
            FieldValue::Integer64Value(v) => v.to_string(),
            FieldValue::RealValue(v) => {
                if field.width() > 0 {
                    let width = field.width() as usize;
                    let precision = field.precision().max(0) as usize;
                    format!("{v:width$.precision$}")
                } else {
                    format_g(*v, 15)
                }
            }
            FieldValue::StringValue(v) => v.clone(),
            FieldValue::DateValue(d) => format_date(d),
            FieldValue::TimeValue(t) => format_time(t),
            FieldValue::DateTimeValue(dt) => {
                let mut out = format!(
                    "{} {}",
                    format_date(&dt.date_naive()),
                    format_time(&dt.time())
                );
                let offset_minutes = dt.offset().local_minus_utc() / 60;
                let sign = if offset_minutes < 0 { '-' } else { '+' };
                let hours = offset_minutes.abs() / 60;
                let minutes = offset_minutes.abs() % 60;
                out.push_str(&format!("{sign}{hours:02}"));
                if minutes != 0 {
                    out.push_str(&format!("{minutes:02}"));
                }
                out
            }
            FieldValue::LocalDateTimeValue(dt) => {
                format!("{} {}", format_date(&dt.date()), format_time(&dt.time()))
            }
            FieldValue::BinaryValue(bytes) => {
                bytes.iter().map(|b| format!("{b:02X}")).collect()
            }
            FieldValue::IntegerListValue(values) => format_list(values.iter().map(i32::to_string)),
            FieldValue::Integer64ListValue(values) => {
                format_list(values.iter().map(i64::to_string))
            }
            FieldValue::RealListValue(values) => {
                format_list(values.iter().map(|v| format_g(*v, 16)))
            }
            FieldValue::StringListValue(values) => format_list(values.iter().cloned()),
        }
    }
}

fn format_date(date: &NaiveDate) -> String {
    format!("{:04}/{:02}/{:02}", date.year(), date.month(), date.day())
}

fn format_time(time: &NaiveTime) -> String {
    let nanos = time.nanosecond() % 1_000_000_000;
    if nanos == 0 {
        format!(
            "{:02}:{:02}:{:02}",
            time.hour(),
            time.minute(),
            time.second()
        )
    } else {
        let seconds = time.second() as f64 + nanos as f64 / 1e9;
        format!("{:02}:{:02}:{:06.3}", time.hour(), time.minute(), seconds)
    }
}

fn format_list<I: ExactSizeIterator<Item = String>>(items: I) -> String {
    let count = items.len();
    let joined: Vec<String> = items.collect();
    format!("({count}:{})", joined.join(","))
}
