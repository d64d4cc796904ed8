//! Pagination, tag filters, and reference-scoped listing.

use gwstore_core::{ListOpts, Object, ObjectType, Route, Service, FILTER_FIELD};
use gwstore_kv::KvBackend;
use gwstore_testkit::prelude::*;
use proptest::prelude::*;
use std::collections::BTreeSet;

const POOL: &[&str] = &["prod", "eu", "beta", "pci"];

fn opts(page: usize, page_size: usize) -> ListOpts {
    ListOpts::builder()
        .page(page)
        .page_size(page_size)
        .build()
        .unwrap()
}

fn filtered(expr: &str, page: usize, page_size: usize) -> ListOpts {
    ListOpts::builder()
        .page(page)
        .page_size(page_size)
        .with_filter_expr(expr)
        .build()
        .unwrap()
}

/// Walks every page and returns the IDs in listing order.
fn walk(fx: &TestStore, first: ListOpts, build: impl Fn(usize) -> ListOpts) -> (Vec<String>, usize) {
    let mut ids = Vec::new();
    let mut page = fx.store.list(&fx.ctx, ObjectType::Service, &first).unwrap();
    let total = page.total_count;
    loop {
        assert_eq!(page.total_count, total);
        ids.extend(page.items.iter().map(|r| r.id().to_string()));
        match page.next_page {
            Some(next) => {
                page = fx.store.list(&fx.ctx, ObjectType::Service, &build(next)).unwrap();
            }
            None => break,
        }
    }
    (ids, total)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn pages_partition_the_listing(
        services in tagged_services_strategy(30, POOL),
        page_size in page_size_strategy(),
    ) {
        let fx = TestStore::new();
        for mut svc in services.clone() {
            fx.store.create(&fx.ctx, &mut svc).unwrap();
        }

        let (ids, total) = walk(&fx, opts(1, page_size), |p| opts(p, page_size));
        prop_assert_eq!(total, services.len());
        prop_assert_eq!(ids.len(), services.len());
        let unique: BTreeSet<&String> = ids.iter().collect();
        prop_assert_eq!(unique.len(), ids.len());
        let mut sorted = ids.clone();
        sorted.sort();
        prop_assert_eq!(sorted, ids);
    }

    #[test]
    fn filtered_pages_hold_exactly_the_matches(
        services in tagged_services_strategy(30, POOL),
        page_size in page_size_strategy(),
        wanted in prop::sample::select(POOL.to_vec()),
    ) {
        let fx = TestStore::new();
        let mut expected = BTreeSet::new();
        for mut svc in services {
            fx.store.create(&fx.ctx, &mut svc).unwrap();
            if svc.meta.tags.iter().any(|t| t == wanted) {
                expected.insert(svc.meta.id.clone());
            }
        }

        let expr = format!("{wanted:?} in tags");
        let (ids, total) = walk(
            &fx,
            filtered(&expr, 1, page_size),
            |p| filtered(&expr, p, page_size),
        );
        prop_assert_eq!(total, expected.len());
        let got: BTreeSet<String> = ids.into_iter().collect();
        prop_assert_eq!(got, expected);
    }
}

#[test]
fn empty_listing_has_no_next_page() {
    let fx = TestStore::new();
    let page = fx.store.list(&fx.ctx, ObjectType::Service, &ListOpts::default()).unwrap();
    assert!(page.items.is_empty());
    assert_eq!(page.total_count, 0);
    assert_eq!(page.next_page, None);
}

#[test]
fn page_past_the_end_is_empty() {
    let fx = TestStore::new();
    fx.service("one");
    let page = fx.store.list(&fx.ctx, ObjectType::Service, &opts(5, 10)).unwrap();
    assert!(page.items.is_empty());
    assert_eq!(page.total_count, 1);
    assert_eq!(page.next_page, None);
}

#[test]
fn listing_stays_within_type() {
    let fx = TestStore::new();
    let svc = fx.service("svc");
    fx.route("route", &svc);
    fx.consumer("someone");
    let services = fx.store.list_kind::<Service>(&fx.ctx, &ListOpts::default()).unwrap();
    assert_eq!(services.items, vec![svc]);
}

#[test]
fn combined_filters() {
    let fx = TestStore::new();
    for (name, tags) in [
        ("a", &["prod", "eu"][..]),
        ("b", &["prod"][..]),
        ("c", &["eu"][..]),
        ("d", &[][..]),
    ] {
        let mut svc = tagged_service(name, tags);
        fx.store.create(&fx.ctx, &mut svc).unwrap();
    }
    let names = |expr: &str| -> Vec<String> {
        let opts = ListOpts::builder().with_filter_expr(expr).build().unwrap();
        fx.store
            .list_kind::<Service>(&fx.ctx, &opts)
            .unwrap()
            .items
            .into_iter()
            .map(|s| s.name)
            .collect()
    };

    let mut both = names(r#""prod" in tags && "eu" in tags"#);
    both.sort();
    assert_eq!(both, ["a"]);

    let mut either = names(r#""prod" in tags || "eu" in tags"#);
    either.sort();
    assert_eq!(either, ["a", "b", "c"]);

    let mut all = names(r#"["prod", "eu"].all(x, x in tags)"#);
    all.sort();
    assert_eq!(all, ["a"]);

    let mut any = names(r#"["eu", "pci"].exists(x, x in tags)"#);
    any.sort();
    assert_eq!(any, ["a", "c"]);
}

#[test]
fn rejected_filters_surface_as_client_errors() {
    for expr in [
        r#""a" in tags && "b" in tags || "c" in tags"#,
        r#"!("a" in tags)"#,
        "tags.exists(x, x == 'a')",
        "size(tags) > 1",
        r#"x in tags"#,
        r#"["a"].exists_one(x, x in tags)"#,
    ] {
        let err = ListOpts::builder().with_filter_expr(expr).build().unwrap_err();
        let messages = err.client_messages().unwrap_or_else(|| panic!("{expr}: {err:?}"));
        assert_eq!(messages.len(), 1, "{expr}: {messages:?}");
    }

    // Over-long input is a field error rather than a malformed request.
    let too_long = format!("{:?} in tags", "x".repeat(3000));
    let length = too_long.chars().count();
    let err = ListOpts::builder().with_filter_expr(too_long).build().unwrap_err();
    assert_eq!(
        err.as_validation().unwrap().messages_for(FILTER_FIELD),
        [format!("length must be <= 2048, but got {length}")]
    );
}

#[test]
fn scoped_listing_pages_through_referrers() {
    let fx = TestStore::new();
    let svc = fx.service("hub");
    let other = fx.service("elsewhere");
    fx.route("unrelated", &other);
    let mut expected = BTreeSet::new();
    for i in 0..5 {
        expected.insert(fx.route(&format!("spoke-{i}"), &svc).meta.id);
    }

    let scoped = |page| {
        ListOpts::builder()
            .page(page)
            .page_size(2)
            .list_for(ObjectType::Service, svc.meta.id.clone())
            .build()
            .unwrap()
    };
    let mut seen = BTreeSet::new();
    let mut next = Some(1);
    let mut pages = Vec::new();
    while let Some(page_no) = next {
        let page = fx.store.list_kind::<Route>(&fx.ctx, &scoped(page_no)).unwrap();
        assert_eq!(page.total_count, 5);
        pages.push(page.items.len());
        seen.extend(page.items.into_iter().map(|r| r.meta.id));
        next = page.next_page;
    }
    assert_eq!(pages, [2, 2, 1]);
    assert_eq!(seen, expected);
}

#[test]
fn scope_and_filter_cannot_be_combined() {
    let err = ListOpts::builder()
        .list_for(ObjectType::Upstream, "u-1")
        .with_filter_expr(r#""prod" in tags"#)
        .build()
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "listing results with a pagination filter is currently unsupported when results \
         are scoped to the \"upstream\" (ID: \"u-1\") resource"
    );
}

#[test]
fn stale_reverse_entries_are_skipped() {
    init_test_logging();
    let fx = TestStore::new();
    let svc = fx.service("hub");
    let route = fx.route("gone", &svc);
    fx.kv.delete(&format!("route/{}", route.meta.id)).unwrap();

    let opts = ListOpts::builder()
        .list_for(ObjectType::Service, svc.meta.id.clone())
        .build()
        .unwrap();
    let page = fx.store.list(&fx.ctx, ObjectType::Route, &opts).unwrap();
    assert!(page.items.is_empty());
    assert_eq!(page.total_count, 1);
}

#[test]
fn page_size_limits_are_enforced() {
    let err = ListOpts::builder().page_size(5000).build().unwrap_err();
    assert_eq!(
        err.to_string(),
        "invalid page_size '5000', must be within range [1 - 1000]"
    );
}
