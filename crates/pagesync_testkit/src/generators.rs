//! Property-based test generators using proptest.
//!
//! Provides strategies for remote catalogs that keep the invariants the
//! engine relies on: unique ids and a stable order.

use pagesync_engine::{QueryFilter, SyncItem};
use proptest::prelude::*;
use serde_json::Value;

use crate::fixtures::BASE_CREATED;

/// Strategy for a scalar payload value.
pub fn payload_value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        "[a-zA-Z0-9 ]{0,24}".prop_map(Value::from),
    ]
}

/// Strategy for a catalog of up to `max_len` items.
///
/// Ids are unique and `created` is non-decreasing in list order, with
/// occasional ties.
pub fn catalog_strategy(max_len: usize) -> impl Strategy<Value = Vec<SyncItem>> {
    prop::collection::vec(
        (
            0i64..3,
            prop::collection::btree_map("[a-z]{1,8}", payload_value_strategy(), 0..4),
        ),
        0..=max_len,
    )
    .prop_map(|entries| {
        let mut created = BASE_CREATED;
        entries
            .into_iter()
            .enumerate()
            .map(|(index, (step, fields))| {
                created += step;
                let mut item = SyncItem::new(format!("item_{index:05}"), created);
                for (key, value) in fields {
                    if key != "id" && key != "created" {
                        item.payload.insert(key, value);
                    }
                }
                item
            })
            .collect()
    })
}

/// Strategy for an item cap, sometimes unbounded.
pub fn item_cap_strategy(max: usize) -> impl Strategy<Value = Option<usize>> {
    prop_oneof![1 => Just(None), 3 => (0..=max).prop_map(Some)]
}

/// Strategy for a listing filter with cap and page size.
pub fn query_filter_strategy(max_cap: usize) -> impl Strategy<Value = QueryFilter> {
    (item_cap_strategy(max_cap), prop::option::of(1u32..=100)).prop_map(|(cap, page_size)| {
        QueryFilter {
            item_cap: cap,
            page_size,
            ..QueryFilter::default()
        }
    })
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 128,
            max_shrink_iters: 500,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Creates a configuration for thorough tests.
    #[must_use]
    pub fn thorough() -> Self {
        Self {
            cases: 1024,
            max_shrink_iters: 10000,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    proptest! {
        #![proptest_config(PropTestConfig::quick().to_proptest_config())]

        #[test]
        fn catalog_ids_are_unique(items in catalog_strategy(50)) {
            let ids: HashSet<&str> = items.iter().map(|i| i.id.as_str()).collect();
            prop_assert_eq!(ids.len(), items.len());
        }

        #[test]
        fn catalog_created_is_monotonic(items in catalog_strategy(50)) {
            prop_assert!(items.windows(2).all(|w| w[0].created <= w[1].created));
        }

        #[test]
        fn filter_page_size_in_range(filter in query_filter_strategy(20)) {
            if let Some(size) = filter.page_size {
                prop_assert!((1..=100).contains(&size));
            }
            if let Some(cap) = filter.item_cap {
                prop_assert!(cap <= 20);
            }
        }
    }
}
