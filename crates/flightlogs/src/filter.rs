//! Download filter preferences.
//!
//! The filter decides which log files are offered for download. It is a
//! plain value owned by the coordinator and persisted as a small JSON object
//! in the settings store after every change.

use serde_json::{Map, Value};

/// Settings key under which the filter is persisted.
pub const FILTER_SETTINGS_KEY: &str = "fileman.download-logs.filter";

/// One of the user-toggleable filter options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterField {
    /// Only list files that have not been downloaded yet.
    New,
    /// List `.igc` flight records.
    Igc,
    /// List `.nmea` raw logs.
    Nmea,
}

impl FilterField {
    /// All fields in display order.
    pub const ALL: [FilterField; 3] = [Self::New, Self::Igc, Self::Nmea];

    /// Key used in the persisted mapping.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Igc => "igc",
            Self::Nmea => "nmea",
        }
    }

    /// Label shown next to the checkbox.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::New => "New logs",
            Self::Igc => "*.igc",
            Self::Nmea => "*.nmea",
        }
    }

    /// Look a field up by its mapping key.
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.key() == key)
    }
}

impl std::fmt::Display for FilterField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

impl std::str::FromStr for FilterField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_key(&s.to_ascii_lowercase())
            .ok_or_else(|| format!("unknown filter field '{s}' (expected new, igc or nmea)"))
    }
}

/// Which log files the user wants to see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct DownloadFilter {
    /// Hide files that were already downloaded.
    pub new: bool,
    /// Include `.igc` files.
    pub igc: bool,
    /// Include `.nmea` files.
    pub nmea: bool,
}

impl Default for DownloadFilter {
    fn default() -> Self {
        Self {
            new: true,
            igc: true,
            nmea: false,
        }
    }
}

impl DownloadFilter {
    /// Read a single option.
    #[must_use]
    pub fn get(&self, field: FilterField) -> bool {
        match field {
            FilterField::New => self.new,
            FilterField::Igc => self.igc,
            FilterField::Nmea => self.nmea,
        }
    }

    /// Change a single option.
    pub fn set(&mut self, field: FilterField, value: bool) {
        match field {
            FilterField::New => self.new = value,
            FilterField::Igc => self.igc = value,
            FilterField::Nmea => self.nmea = value,
        }
    }

    /// Flip a single option, returning its new value.
    pub fn toggle(&mut self, field: FilterField) -> bool {
        let value = !self.get(field);
        self.set(field, value);
        value
    }

    /// Serialize into the persisted key-value form.
    #[must_use]
    pub fn to_mapping(&self) -> Map<String, Value> {
        FilterField::ALL
            .into_iter()
            .map(|f| (f.key().to_string(), Value::Bool(self.get(f))))
            .collect()
    }

    /// Build a filter from the persisted key-value form.
    ///
    /// Starts from the defaults and applies every recognized key that holds a
    /// boolean. Anything else, including a value that is not an object at
    /// all, leaves the corresponding default in place.
    #[must_use]
    pub fn from_mapping(mapping: &Value) -> Self {
        let mut filter = Self::default();
        let Some(map) = mapping.as_object() else {
            return filter;
        };
        for field in FilterField::ALL {
            if let Some(value) = map.get(field.key()).and_then(Value::as_bool) {
                filter.set(field, value);
            }
        }
        filter
    }
}
