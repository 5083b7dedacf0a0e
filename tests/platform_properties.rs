//! Property tests for target matrix resolution.

use cmrel::release::{
    arch_list_from_string, join_list, os_list_from_string, PlatformRegistry, SupportedPlatforms,
};
use proptest::prelude::*;
use proptest::sample::subsequence;
use std::collections::BTreeSet;

const OSES: &[&str] = &["darwin", "linux", "windows"];
const ARCHES: &[&str] = &["amd64", "arm", "arm64", "ppc64le", "s390x"];

proptest! {
    #[test]
    fn os_filter_resolves_to_exact_literal_set(
        picked in subsequence(OSES.to_vec(), 1..=OSES.len()),
        spaced in any::<bool>(),
    ) {
        let platforms = SupportedPlatforms::new();
        let separator = if spaced { " , " } else { "," };
        let filter = picked.join(separator);

        let resolved = os_list_from_string(&filter, &platforms).unwrap();
        let expected: BTreeSet<String> = picked.iter().map(|s| s.to_string()).collect();
        prop_assert_eq!(resolved, expected);
    }

    #[test]
    fn unknown_os_is_rejected(name in "[a-z]{3,10}") {
        prop_assume!(!OSES.contains(&name.as_str()));
        let platforms = SupportedPlatforms::new();
        let filter = format!("linux,{}", name);
        prop_assert!(os_list_from_string(&filter, &platforms).is_err());
    }

    #[test]
    fn resolved_arches_are_supported_by_a_selected_os(
        oses in subsequence(OSES.to_vec(), 1..=OSES.len()),
        arches in subsequence(ARCHES.to_vec(), 1..=ARCHES.len()),
    ) {
        let platforms = SupportedPlatforms::new();
        let os_set = os_list_from_string(&oses.join(","), &platforms).unwrap();

        match arch_list_from_string(&arches.join(","), &os_set, &platforms) {
            Ok(resolved) => {
                for arch in &resolved {
                    let supported = os_set
                        .iter()
                        .any(|os| platforms.arches_for_os(os).map_or(false, |a| a.contains(arch)));
                    prop_assert!(supported, "{} unsupported by {:?}", arch, os_set);
                }
            }
            Err(_) => {
                // Rejected only when some requested arch has no supporting OS
                let supported = platforms.all_arches_for(&os_set);
                let has_unsupported = arches.iter().any(|a| !supported.contains(*a));
                prop_assert!(has_unsupported, "{:?} rejected for {:?}", arches, os_set);
            }
        }
    }

    #[test]
    fn wildcard_arch_matches_universe_for_selection(
        oses in subsequence(OSES.to_vec(), 1..=OSES.len()),
    ) {
        let platforms = SupportedPlatforms::new();
        let os_set = os_list_from_string(&oses.join(","), &platforms).unwrap();
        let resolved = arch_list_from_string("*", &os_set, &platforms).unwrap();
        prop_assert_eq!(resolved, platforms.all_arches_for(&os_set));
    }
}

#[test]
fn wildcard_os_selects_all() {
    let platforms = SupportedPlatforms::new();
    let resolved = os_list_from_string("*", &platforms).unwrap();
    assert_eq!(join_list(&resolved), "darwin,linux,windows");
}
