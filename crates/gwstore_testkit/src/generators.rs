//! Property-based test generators using proptest.
//!
//! Provides strategies for generating random resources and filter
//! expressions that satisfy the store's validation rules.

use crate::fixtures::tagged_service;
use gwstore_core::Service;
use proptest::prelude::*;
use std::collections::BTreeSet;

/// Strategy for generating valid tags.
pub fn tag_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9_.-]{0,15}").expect("Invalid regex")
}

/// Strategy for generating small tag sets drawn from `pool`.
///
/// A shared pool keeps membership filters selective but not empty.
pub fn tags_from_pool(pool: &'static [&'static str]) -> impl Strategy<Value = Vec<String>> {
    prop::sample::subsequence(pool, 0..=pool.len())
        .prop_map(|tags| tags.into_iter().map(str::to_string).collect())
}

/// Strategy for generating valid resource names.
pub fn name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z]([a-z0-9-]{0,22}[a-z0-9])?").expect("Invalid regex")
}

/// Strategy for generating distinct resource names.
pub fn distinct_names_strategy(max: usize) -> impl Strategy<Value = Vec<String>> {
    prop::collection::btree_set(name_strategy(), 0..=max)
        .prop_map(|names: BTreeSet<String>| names.into_iter().collect())
}

/// Strategy for generating unsaved services with distinct names and tags
/// drawn from `pool`.
pub fn tagged_services_strategy(
    max: usize,
    pool: &'static [&'static str],
) -> impl Strategy<Value = Vec<Service>> {
    distinct_names_strategy(max).prop_flat_map(move |names| {
        let count = names.len();
        prop::collection::vec(tags_from_pool(pool), count).prop_map(move |tag_sets| {
            names
                .iter()
                .zip(tag_sets)
                .map(|(name, tags)| {
                    let tags: Vec<&str> = tags.iter().map(String::as_str).collect();
                    tagged_service(name, &tags)
                })
                .collect()
        })
    })
}

/// Strategy for generating list page sizes within the accepted range.
pub fn page_size_strategy() -> impl Strategy<Value = usize> {
    1usize..=50
}
