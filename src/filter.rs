use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use rustc_hash::FxHashSet;

use crate::model::Update;

/// Marker value of the `type` attribute on security advisories
pub const SECURITY_TYPE: &str = "security";

/// Selection criteria applied to every decoded update
///
/// Immutable for the duration of a run. The date window is exclusive on
/// both ends: an update issued exactly at `after` or exactly at `before`
/// is rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterConfig {
    before: DateTime<Utc>,
    after: DateTime<Utc>,
    update_type: Option<String>,
    packages: FxHashSet<String>,
}

impl FilterConfig {
    /// Window between two calendar dates, taken at UTC midnight
    pub fn new(before: NaiveDate, after: NaiveDate) -> Self {
        FilterConfig {
            before: midnight(before),
            after: midnight(after),
            update_type: None,
            packages: FxHashSet::default(),
        }
    }

    /// Only keep updates whose `type` matches exactly; an empty string matches any type
    pub fn with_update_type(mut self, update_type: impl Into<String>) -> Self {
        let update_type = update_type.into();
        self.update_type = (!update_type.is_empty()).then_some(update_type);
        self
    }

    /// Only keep updates touching at least one of these packages; empty matches everything
    pub fn with_packages(mut self, packages: FxHashSet<String>) -> Self {
        self.packages = packages;
        self
    }

    pub fn before(&self) -> DateTime<Utc> {
        self.before
    }

    pub fn after(&self) -> DateTime<Utc> {
        self.after
    }

    pub fn update_type(&self) -> Option<&str> {
        self.update_type.as_deref()
    }

    pub fn packages(&self) -> &FxHashSet<String> {
        &self.packages
    }

    /// Decide whether an update is selected
    ///
    /// All conditions must hold:
    /// - the type filter, if set, equals `update.kind` (case-sensitive)
    /// - the update has an issue date
    /// - the issue date is strictly after `after` and strictly before `before`
    /// - the package whitelist, if non-empty, contains one of the update's package names
    pub fn should_keep(&self, update: &Update) -> bool {
        if let Some(update_type) = &self.update_type {
            if update.kind != *update_type {
                return false;
            }
        }

        let Some(issued) = update.issued_at() else {
            return false;
        };
        if !(issued < self.before && issued > self.after) {
            return false;
        }

        self.packages.is_empty()
            || update
                .packages
                .iter()
                .any(|pkg| self.packages.contains(pkg.name.as_str()))
    }
}

#[inline]
fn midnight(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
}
