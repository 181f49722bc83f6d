//! Test utilities for property-based testing
//!
//! This module provides generators and helpers for proptest.

#[cfg(test)]
pub mod generators {
    use proptest::prelude::*;
    use std::collections::BTreeMap;

    /// Generate an unscoped package name (lowercase alphanumeric with hyphens)
    pub fn bare_package_name() -> impl Strategy<Value = String> {
        "[a-z][a-z0-9-]{0,20}[a-z0-9]?".prop_filter("Name must not be empty", |s| !s.is_empty())
    }

    /// Generate a package name, sometimes scoped (`@scope/name`)
    pub fn package_name() -> impl Strategy<Value = String> {
        prop_oneof![
            bare_package_name(),
            (bare_package_name(), bare_package_name())
                .prop_map(|(scope, name)| format!("@{scope}/{name}")),
        ]
    }

    /// Generate a valid semver version string
    pub fn semver_version() -> impl Strategy<Value = String> {
        (0u32..100, 0u32..100, 0u32..100)
            .prop_map(|(major, minor, patch)| format!("{major}.{minor}.{patch}"))
    }

    /// Generate a dependency map as found in a manifest
    pub fn dependency_map() -> impl Strategy<Value = BTreeMap<String, String>> {
        proptest::collection::btree_map(
            bare_package_name(),
            semver_version().prop_map(|v| format!("^{v}")),
            0..6,
        )
    }

    /// Generate a relative source path of up to three components
    pub fn source_path() -> impl Strategy<Value = String> {
        "[a-z]{1,6}(/[a-z]{1,6}){0,2}\\.(js|ts|json)"
    }

    /// Generate a small source tree: relative path to printable content
    pub fn source_tree() -> impl Strategy<Value = BTreeMap<String, String>> {
        proptest::collection::btree_map(source_path(), "[ -~]{0,40}", 1..8)
    }
}

#[cfg(test)]
mod tests {
    use super::generators::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn test_package_name_generator(name in package_name()) {
            prop_assert!(!name.is_empty());
            let bare = name.rsplit('/').next().unwrap();
            prop_assert!(bare.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'));
            if name.contains('/') {
                prop_assert!(name.starts_with('@'));
            }
        }

        #[test]
        fn test_semver_version_generator(version in semver_version()) {
            let parts: Vec<&str> = version.split('.').collect();
            prop_assert_eq!(parts.len(), 3);
            for part in parts {
                prop_assert!(part.parse::<u32>().is_ok());
            }
        }

        #[test]
        fn test_source_path_generator(path in source_path()) {
            prop_assert!(!path.starts_with('/'));
            prop_assert!(!path.contains(".."));
        }
    }
}
