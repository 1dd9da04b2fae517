//! The canonical selection tuple used as a cache key (§3, §7). Grounded on
//! the teacher's pattern of hand-rolled, `Hash`-able cache keys
//! (`r2e_cache::TtlCache<K, V>` is generic over any `Eq + Hash + Clone`
//! key) — this module supplies that `K`.

use std::hash::{Hash, Hasher};

/// A single parameter/configurable value, canonicalized so list-like
/// values become ordered sequences rather than sets (two requests that
/// pass the same multi-select in the same order hit the same cache
/// entry; order is preserved, not sorted, because `order_matters`
/// multi-selects are semantically distinct by order).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SelectionValue {
    Single(String),
    List(Vec<String>),
}

impl SelectionValue {
    pub fn single(v: impl Into<String>) -> Self {
        SelectionValue::Single(v.into())
    }

    pub fn list(v: impl IntoIterator<Item = impl Into<String>>) -> Self {
        SelectionValue::List(v.into_iter().map(Into::into).collect())
    }
}

/// The stable key for caching parameter resolution (C7 "parameters
/// cache") and dataset results (C7 "dataset results cache"). Pagination,
/// orientation, and post-SQL are deliberately excluded (§4.7: "applied
/// after cache lookup").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionTuple {
    entity_type: String,
    entity_name: String,
    user_identity: Option<String>,
    /// Sorted by name for determinism (§3).
    selections: Vec<(String, SelectionValue)>,
    /// Sorted by name for determinism (§3).
    configurables: Vec<(String, String)>,
}

impl SelectionTuple {
    pub fn new(
        entity_type: impl Into<String>,
        entity_name: impl Into<String>,
        user_identity: Option<String>,
        mut selections: Vec<(String, SelectionValue)>,
        mut configurables: Vec<(String, String)>,
    ) -> Self {
        selections.sort_by(|a, b| a.0.cmp(&b.0));
        configurables.sort_by(|a, b| a.0.cmp(&b.0));
        Self {
            entity_type: entity_type.into(),
            entity_name: entity_name.into(),
            user_identity,
            selections,
            configurables,
        }
    }
}

impl Hash for SelectionTuple {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.entity_type.hash(state);
        self.entity_name.hash(state);
        self.user_identity.hash(state);
        self.selections.hash(state);
        self.configurables.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_inputs_in_different_order_produce_equal_keys() {
        let a = SelectionTuple::new(
            "dataset",
            "sales",
            Some("u1".into()),
            vec![
                ("country".into(), SelectionValue::single("US")),
                ("city".into(), SelectionValue::list(["NYC"])),
            ],
            vec![],
        );
        let b = SelectionTuple::new(
            "dataset",
            "sales",
            Some("u1".into()),
            vec![
                ("city".into(), SelectionValue::list(["NYC"])),
                ("country".into(), SelectionValue::single("US")),
            ],
            vec![],
        );
        assert_eq!(a, b);
    }

    #[test]
    fn different_users_produce_different_keys() {
        let a = SelectionTuple::new("dataset", "sales", Some("u1".into()), vec![], vec![]);
        let b = SelectionTuple::new("dataset", "sales", Some("u2".into()), vec![], vec![]);
        assert_ne!(a, b);
    }

    #[test]
    fn list_order_is_preserved_not_sorted() {
        let a = SelectionValue::list(["NYC", "TOR"]);
        let b = SelectionValue::list(["TOR", "NYC"]);
        assert_ne!(a, b);
    }
}
