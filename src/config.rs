//! Validation of user-supplied settings before a run starts

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use chrono::NaiveDate;
use rustc_hash::FxHashSet;

use crate::error::{Error, Result};

/// Format of `--beforeDate` / `--afterDate`
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Lower bound used when no `--afterDate` is given
pub const DEFAULT_AFTER_DATE: &str = "2006-01-02";

/// Parse a `YYYY-MM-DD` date; `label` names the setting in the error message
pub fn parse_date(label: &str, value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|e| {
        Error::ConfigInvalid(format!("failed parsing {label} date '{value}': {e}"))
    })
}

/// Read package whitelist from file (one package name per line, supports comments with #)
///
/// `None` or an empty path yields an empty whitelist, which matches every update.
pub fn read_package_list(path: Option<&Path>) -> Result<FxHashSet<String>> {
    let Some(path) = non_empty(path) else {
        return Ok(FxHashSet::default());
    };

    let invalid = |e: std::io::Error| {
        Error::ConfigInvalid(format!(
            "failed reading packages file '{}': {e}",
            path.display()
        ))
    };

    let file = File::open(path).map_err(invalid)?;
    let reader = BufReader::new(file);
    let mut packages = FxHashSet::default();

    for line in reader.lines() {
        let line = line.map_err(invalid)?;
        let name = line.trim();
        // Skip empty lines and comments
        if !name.is_empty() && !name.starts_with('#') {
            packages.insert(name.to_string());
        }
    }

    Ok(packages)
}

/// Treat an empty path the same as an absent one
pub fn non_empty(path: Option<&Path>) -> Option<&Path> {
    path.filter(|p| !p.as_os_str().is_empty())
}
