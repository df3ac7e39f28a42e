//! Property-based test generators using proptest.
//!
//! Provides strategies for generating random items and operation
//! sequences against a collection.

use jsondb_core::Item;
use proptest::prelude::*;
use serde_json::Value;
use std::collections::BTreeSet;

/// Strategy for generating item ids (strings or integers).
pub fn item_id_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        prop::string::string_regex("[a-z0-9]{1,8}")
            .expect("Invalid regex")
            .prop_map(Value::from),
        (0u32..10_000).prop_map(Value::from),
    ]
}

/// Strategy for generating valid collection file names.
pub fn collection_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9-]{0,15}")
        .expect("Invalid regex")
        .prop_map(|base| format!("{base}.json"))
}

/// Strategy for generating scalar JSON field values.
pub fn field_value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::from),
        any::<i32>().prop_map(Value::from),
        prop::string::string_regex("[ -~]{0,16}")
            .expect("Invalid regex")
            .prop_map(Value::from),
    ]
}

/// Strategy for generating item fields, never including `id`.
pub fn fields_strategy() -> impl Strategy<Value = Item> {
    prop::collection::btree_map(
        prop::string::string_regex("[a-z]{1,6}").expect("Invalid regex"),
        field_value_strategy(),
        0..5,
    )
    .prop_map(|fields| {
        fields
            .into_iter()
            .filter(|(key, _)| key != "id")
            .collect()
    })
}

/// Strategy for generating a single item with the given id.
pub fn item_with_id(id: Value) -> impl Strategy<Value = Item> {
    fields_strategy().prop_map(move |mut fields| {
        fields.insert("id".to_string(), id.clone());
        fields
    })
}

/// Strategy for generating a list of items with pairwise distinct ids.
pub fn unique_items_strategy(max_items: usize) -> impl Strategy<Value = Vec<Item>> {
    prop::collection::vec((item_id_strategy(), fields_strategy()), 0..max_items).prop_map(
        |pairs| {
            let mut seen = BTreeSet::new();
            pairs
                .into_iter()
                .filter(|(id, _)| seen.insert(id.to_string()))
                .map(|(id, mut fields)| {
                    fields.insert("id".to_string(), id);
                    fields
                })
                .collect()
        },
    )
}

/// An operation against a collection.
#[derive(Debug, Clone)]
pub enum ItemOperation {
    /// Upsert an item
    Save {
        /// The item, including its id
        item: Item,
    },
    /// Merge fields into an existing item
    Update {
        /// Item id
        id: Value,
        /// Fields to merge
        partial: Item,
    },
    /// Delete an item
    Delete {
        /// Item id
        id: Value,
    },
}

/// Strategy for generating item operations over a small id space, so
/// operations frequently hit the same items.
pub fn item_operation_strategy() -> impl Strategy<Value = ItemOperation> {
    let id = (0u32..8).prop_map(Value::from);
    prop_oneof![
        3 => id.clone().prop_flat_map(item_with_id).prop_map(|item| ItemOperation::Save { item }),
        2 => (id.clone(), fields_strategy())
            .prop_map(|(id, partial)| ItemOperation::Update { id, partial }),
        1 => id.prop_map(|id| ItemOperation::Delete { id }),
    ]
}

/// Strategy for generating a sequence of operations.
pub fn operation_sequence_strategy(
    min_ops: usize,
    max_ops: usize,
) -> impl Strategy<Value = Vec<ItemOperation>> {
    prop::collection::vec(item_operation_strategy(), min_ops..max_ops)
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
            cases: 64,
            max_shrink_iters: 500,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests. Every case touches the
    /// filesystem, so the counts stay low.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 16,
            max_shrink_iters: 100,
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
