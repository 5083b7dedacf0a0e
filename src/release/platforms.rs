//! Supported Platform Registry
//!
//! Maps each target operating system to the architectures a release can be
//! cross-built for, and resolves the operator's `--target-os` /
//! `--target-arch` filter expressions against that universe.

use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// Filter value that selects every supported entry on an axis.
pub const WILDCARD: &str = "*";

/// Errors produced while resolving a target filter.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlatformError {
    #[error("unknown {axis} {value:?}")]
    Unknown { axis: &'static str, value: String },

    #[error("empty entry in {axis} list")]
    EmptyEntry { axis: &'static str },

    #[error("no {axis} values supported for the selected OSes")]
    NoneAvailable { axis: &'static str },
}

/// Source of the known OS / architecture universe.
pub trait PlatformRegistry: Send + Sync {
    /// Every OS a release can target.
    fn all_oses(&self) -> BTreeSet<String>;

    /// Every architecture supported by at least one of `oses`.
    fn all_arches_for(&self, oses: &BTreeSet<String>) -> BTreeSet<String>;
}

/// Built-in platform table
pub struct SupportedPlatforms {
    platforms: BTreeMap<String, BTreeSet<String>>,
}

impl SupportedPlatforms {
    /// Create the registry with every platform the release build supports
    pub fn new() -> Self {
        let mut platforms = BTreeMap::new();

        platforms.insert(
            "linux".to_string(),
            ["amd64", "arm", "arm64", "ppc64le", "s390x"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        );

        platforms.insert(
            "darwin".to_string(),
            ["amd64", "arm64"].iter().map(|s| s.to_string()).collect(),
        );

        platforms.insert(
            "windows".to_string(),
            ["amd64"].iter().map(|s| s.to_string()).collect(),
        );

        SupportedPlatforms { platforms }
    }

    /// Architectures supported by a single OS, or None if the OS is unknown
    pub fn arches_for_os(&self, os: &str) -> Option<&BTreeSet<String>> {
        self.platforms.get(os)
    }
}

impl Default for SupportedPlatforms {
    fn default() -> Self {
        Self::new()
    }
}

impl PlatformRegistry for SupportedPlatforms {
    fn all_oses(&self) -> BTreeSet<String> {
        self.platforms.keys().cloned().collect()
    }

    fn all_arches_for(&self, oses: &BTreeSet<String>) -> BTreeSet<String> {
        oses.iter()
            .filter_map(|os| self.platforms.get(os))
            .flat_map(|arches| arches.iter().cloned())
            .collect()
    }
}

/// Resolve a `--target-os` filter.
///
/// `*` selects every OS in the registry. Anything else is a comma-separated
/// list; surrounding whitespace is ignored and every entry must be a known OS.
pub fn os_list_from_string(
    filter: &str,
    registry: &dyn PlatformRegistry,
) -> Result<BTreeSet<String>, PlatformError> {
    let universe = registry.all_oses();
    resolve_filter(filter, "OS", &universe)
}

/// Resolve a `--target-arch` filter against an already-resolved OS set.
///
/// Only architectures supported by at least one of `oses` are accepted; a
/// requested architecture outside that set is rejected rather than dropped.
pub fn arch_list_from_string(
    filter: &str,
    oses: &BTreeSet<String>,
    registry: &dyn PlatformRegistry,
) -> Result<BTreeSet<String>, PlatformError> {
    let universe = registry.all_arches_for(oses);
    resolve_filter(filter, "architecture", &universe)
}

fn resolve_filter(
    filter: &str,
    axis: &'static str,
    universe: &BTreeSet<String>,
) -> Result<BTreeSet<String>, PlatformError> {
    if universe.is_empty() {
        return Err(PlatformError::NoneAvailable { axis });
    }

    if filter.trim() == WILDCARD {
        return Ok(universe.clone());
    }

    let mut selected = BTreeSet::new();
    for entry in filter.split(',') {
        let entry = entry.trim();
        if entry.is_empty() {
            return Err(PlatformError::EmptyEntry { axis });
        }
        if !universe.contains(entry) {
            return Err(PlatformError::Unknown {
                axis,
                value: entry.to_string(),
            });
        }
        selected.insert(entry.to_string());
    }

    Ok(selected)
}

/// Join a resolved set into the comma-separated form used in substitutions
pub fn join_list(values: &BTreeSet<String>) -> String {
    values.iter().cloned().collect::<Vec<_>>().join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(values: &[&str]) -> BTreeSet<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_all_oses() {
        let registry = SupportedPlatforms::new();
        assert_eq!(registry.all_oses(), set(&["darwin", "linux", "windows"]));
    }

    #[test]
    fn test_wildcard_selects_every_os() {
        let registry = SupportedPlatforms::new();
        let oses = os_list_from_string("*", &registry).unwrap();
        assert_eq!(oses, registry.all_oses());
    }

    #[test]
    fn test_literal_os_list() {
        let registry = SupportedPlatforms::new();
        let oses = os_list_from_string("windows, linux", &registry).unwrap();
        assert_eq!(oses, set(&["linux", "windows"]));
    }

    #[test]
    fn test_unknown_os_rejected() {
        let registry = SupportedPlatforms::new();
        let err = os_list_from_string("linux,bogusOS", &registry).unwrap_err();
        assert_eq!(
            err,
            PlatformError::Unknown {
                axis: "OS",
                value: "bogusOS".to_string()
            }
        );
    }

    #[test]
    fn test_empty_entries_rejected() {
        let registry = SupportedPlatforms::new();
        assert_eq!(
            os_list_from_string("linux,", &registry).unwrap_err(),
            PlatformError::EmptyEntry { axis: "OS" }
        );
        assert!(os_list_from_string("", &registry).is_err());
    }

    #[test]
    fn test_wildcard_arches_follow_selected_oses() {
        let registry = SupportedPlatforms::new();
        let arches = arch_list_from_string("*", &set(&["darwin", "windows"]), &registry).unwrap();
        assert_eq!(arches, set(&["amd64", "arm64"]));
    }

    #[test]
    fn test_arch_unsupported_by_selected_oses_rejected() {
        let registry = SupportedPlatforms::new();
        let err = arch_list_from_string("s390x", &set(&["windows"]), &registry).unwrap_err();
        assert!(matches!(err, PlatformError::Unknown { axis: "architecture", .. }));

        // The same arch is fine once an OS supporting it is selected
        let arches = arch_list_from_string("s390x", &set(&["windows", "linux"]), &registry).unwrap();
        assert_eq!(arches, set(&["s390x"]));
    }

    #[test]
    fn test_join_list_is_sorted() {
        assert_eq!(join_list(&set(&["windows", "darwin", "linux"])), "darwin,linux,windows");
    }
}
