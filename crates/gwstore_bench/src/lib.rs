//! Benchmark utilities.

use gwstore_core::Service;
use rand::seq::SliceRandom;
use rand::Rng;

/// Tags benchmark objects are labelled with.
pub const TAG_POOL: &[&str] = &[
    "prod", "staging", "eu", "us", "apac", "pci", "beta", "internal", "public", "legacy",
];

/// Picks up to `max` distinct tags from [`TAG_POOL`].
pub fn random_tags(max: usize) -> Vec<String> {
    let mut rng = rand::thread_rng();
    let count = rng.gen_range(0..=max.min(TAG_POOL.len()));
    TAG_POOL
        .choose_multiple(&mut rng, count)
        .map(|t| (*t).to_string())
        .collect()
}

/// Generates `count` unsaved services with distinct names and random tags.
pub fn generate_services(count: usize) -> Vec<Service> {
    (0..count)
        .map(|i| {
            let mut svc = Service {
                name: format!("svc-{i}"),
                host: format!("svc-{i}.internal"),
                ..Service::default()
            };
            svc.meta.tags = random_tags(4);
            svc
        })
        .collect()
}
