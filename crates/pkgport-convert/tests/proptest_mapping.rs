//! Property-based tests for path mapping and platform selection
//!
//! Member paths are generated under the prefixes the mapping rewrites and
//! under ones it leaves alone, in both layouts.

use pkgport_convert::mapping::build_mapping;
use pkgport_convert::{
    Member, PathLayout, PlatformFamily, PlatformSelection, PlatformTarget, RuntimeVersion,
};
use proptest::prelude::*;
use std::collections::{BTreeSet, HashSet};

// Strategy: a relative path of one to three lowercase segments
fn arb_relative_path() -> impl Strategy<Value = String> {
    prop::collection::vec("[a-z][a-z0-9_]{0,7}", 1..=3).prop_map(|segments| segments.join("/"))
}

fn arb_version() -> impl Strategy<Value = RuntimeVersion> {
    (2u8..=3, 0u8..=12).prop_map(|(major, minor)| {
        RuntimeVersion::parse(&format!("{major}.{minor}")).unwrap()
    })
}

fn arb_layout() -> impl Strategy<Value = PathLayout> {
    prop_oneof![Just(PathLayout::Conda), Just(PathLayout::Bare)]
}

fn arb_family() -> impl Strategy<Value = PlatformFamily> {
    prop_oneof![Just(PlatformFamily::Unix), Just(PlatformFamily::Windows)]
}

fn arb_selection() -> impl Strategy<Value = PlatformSelection> {
    prop_oneof![
        Just(PlatformSelection::All),
        prop::sample::select(PlatformTarget::all().to_vec()).prop_map(PlatformSelection::Target),
    ]
}

// Strategy: distinct unix member paths that never start with a windows directory
fn arb_unix_paths(version: RuntimeVersion, layout: PathLayout) -> impl Strategy<Value = Vec<String>> {
    let lib = layout.lib_prefix(PlatformFamily::Unix, &version);
    let prefixes = vec!["bin".to_string(), lib, "share".to_string(), "include".to_string()];
    prop::collection::btree_set(
        (prop::sample::select(prefixes), arb_relative_path())
            .prop_map(|(prefix, rest)| format!("{prefix}/{rest}")),
        1..20,
    )
    .prop_map(|paths: BTreeSet<String>| paths.into_iter().collect())
}

fn files(paths: &[String]) -> Vec<Member> {
    paths.iter().map(|path| Member::file(path)).collect()
}

proptest! {
    /// Property: converting within a family renames nothing
    #[test]
    fn proptest_same_family_is_identity(
        paths in prop::collection::btree_set(arb_relative_path(), 0..30),
        family in arb_family(),
        version in arb_version(),
        layout in arb_layout(),
    ) {
        let paths: Vec<String> = paths.into_iter().collect();
        let mapping = build_mapping(&files(&paths), family, family, &version, layout).unwrap();

        prop_assert!(mapping.is_identity());
        prop_assert_eq!(mapping.len(), paths.len());
    }

    /// Property: unix -> windows -> unix returns every path unchanged
    #[test]
    fn proptest_unix_windows_round_trip(
        (version, layout, paths) in (arb_version(), arb_layout()).prop_flat_map(|(version, layout)| {
            (Just(version.clone()), Just(layout), arb_unix_paths(version, layout))
        }),
    ) {
        let to_windows = build_mapping(
            &files(&paths),
            PlatformFamily::Unix,
            PlatformFamily::Windows,
            &version,
            layout,
        )
        .unwrap();
        let windows_paths: Vec<String> = to_windows
            .entries()
            .iter()
            .filter_map(|entry| entry.destination().map(str::to_string))
            .collect();
        prop_assert_eq!(windows_paths.len(), paths.len());

        let to_unix = build_mapping(
            &files(&windows_paths),
            PlatformFamily::Windows,
            PlatformFamily::Unix,
            &version,
            layout,
        )
        .unwrap();
        let round_trip: Vec<&str> = to_unix
            .entries()
            .iter()
            .filter_map(|entry| entry.destination())
            .collect();

        prop_assert_eq!(round_trip, paths.iter().map(String::as_str).collect::<Vec<_>>());
    }

    /// Property: a successful mapping never sends two members to one path
    #[test]
    fn proptest_destinations_are_unique(
        paths in prop::collection::btree_set(
            (prop::sample::select(vec!["bin", "Scripts", "lib/python3.3", "Lib", "share"]), arb_relative_path())
                .prop_map(|(prefix, rest)| format!("{prefix}/{rest}")),
            0..30,
        ),
        source in arb_family(),
        dest in arb_family(),
    ) {
        let paths: Vec<String> = paths.into_iter().collect();
        let version = RuntimeVersion::parse("3.3").unwrap();

        if let Ok(mapping) = build_mapping(&files(&paths), source, dest, &version, PathLayout::Conda) {
            let mut seen = HashSet::new();
            for destination in mapping.entries().iter().filter_map(|entry| entry.destination()) {
                prop_assert!(seen.insert(destination.to_string()), "duplicate {}", destination);
            }
        }
    }

    /// Property: expansion yields each target once, and all five when `all` is selected
    #[test]
    fn proptest_selection_expansion(selections in prop::collection::vec(arb_selection(), 0..10)) {
        let targets = PlatformSelection::expand(&selections);

        let unique: HashSet<PlatformTarget> = targets.iter().copied().collect();
        prop_assert_eq!(unique.len(), targets.len());

        if selections.first() == Some(&PlatformSelection::All) {
            prop_assert_eq!(targets.as_slice(), PlatformTarget::all());
        } else if selections.contains(&PlatformSelection::All) {
            prop_assert_eq!(targets.len(), PlatformTarget::all().len());
        }
    }
}
