use std::fmt::{Debug, Formatter};

use bitflags::bitflags;

use crate::errors::{InfoError, Result};

/// Open options for [`crate::vector::driver::open`]
#[derive(Debug, Default)]
pub struct OpenOptions<'a> {
    pub open_flags: OpenFlags,
    pub allowed_drivers: Option<&'a [&'a str]>,
}

bitflags! {
    /// Access flags used when opening a data source.
    ///
    /// The values match GDAL's `GDAL_OF_*` constants so they can be handed to
    /// `GDALOpenEx` unchanged.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct OpenFlags: u32 {
        /// Open in read-only mode (default).
        const READONLY = 0x00;
        /// Open in update mode.
        const UPDATE = 0x01;
        /// Allow vector drivers to be used.
        const VECTOR = 0x04;
        /// Emit error message in case of failed open.
        const VERBOSE_ERROR = 0x40;
    }
}

impl Default for OpenFlags {
    fn default() -> OpenFlags {
        OpenFlags::READONLY | OpenFlags::VECTOR
    }
}

impl OpenFlags {
    pub fn is_update(&self) -> bool {
        self.contains(OpenFlags::UPDATE)
    }
}

/// An ordered list of `KEY=VALUE` options, such as the `DISPLAY_FIELDS=NO`
/// entries built from `-fields=` and `-geom=`.
///
/// Keys are compared case-insensitively; setting an existing key overwrites it.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct NameValueList {
    entries: Vec<(String, String)>,
}

impl NameValueList {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Assigns `value` to `name`.
    ///
    /// Overwrites duplicate `name`s.
    ///
    /// Returns `Err` if `name` has non alphanumeric characters, or `value`
    /// has newline characters.
    pub fn set_name_value(&mut self, name: &str, value: &str) -> Result<()> {
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(InfoError::BadArgument(format!(
                "Invalid characters in name: '{name}'"
            )));
        }
        if value.contains(['\n', '\r']) {
            return Err(InfoError::BadArgument(format!(
                "Invalid characters in value: '{value}'"
            )));
        }
        match self
            .entries
            .iter_mut()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
        {
            Some(entry) => entry.1 = value.to_string(),
            None => self.entries.push((name.to_string(), value.to_string())),
        }
        Ok(())
    }

    /// Parses and adds a `NAME=VALUE` entry.
    pub fn add_string(&mut self, entry: &str) -> Result<()> {
        match entry.split_once('=') {
            Some((name, value)) => self.set_name_value(name, value),
            None => Err(InfoError::BadArgument(format!(
                "Expected NAME=VALUE, got '{entry}'"
            ))),
        }
    }

    /// Looks up the value corresponding to `key`.
    pub fn fetch_name_value(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(key))
            .map(|(_, value)| value.as_str())
    }

    /// Interprets the value of `key` as a boolean the way GDAL does
    /// (`NO`, `FALSE`, `OFF` and `0` are false), falling back to `default`.
    pub fn fetch_bool(&self, key: &str, default: bool) -> bool {
        match self.fetch_name_value(key) {
            Some(value) => !["NO", "FALSE", "OFF", "0"]
                .iter()
                .any(|no| value.eq_ignore_ascii_case(no)),
            None => default,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl Debug for NameValueList {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.iter().map(|(k, v)| format!("{k}={v}")))
            .finish()
    }
}
