//! Set comparison of two users' visible libraries.

use std::collections::BTreeSet;

use serde::Serialize;

/// One ownership row reduced to what comparison needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OwnedItem {
    pub account_id: i32,
    pub app_id: i32,
    pub hidden: bool,
}

/// The accounts on one side of a comparison and the ownership rows loaded
/// for them.
#[derive(Debug, Clone, Default)]
pub struct LibrarySide {
    pub account_ids: Vec<i32>,
    pub items: Vec<OwnedItem>,
}

impl LibrarySide {
    fn visible_app_ids(&self) -> BTreeSet<i32> {
        self.items
            .iter()
            .filter(|item| !item.hidden && self.account_ids.contains(&item.account_id))
            .map(|item| item.app_id)
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Comparison {
    pub shared: Vec<i32>,
    pub only_a: Vec<i32>,
    pub only_b: Vec<i32>,
}

/// Intersection and both differences of the visible app ids, each sorted
/// ascending. A side without linked accounts yields an empty comparison.
#[must_use]
pub fn compare(a: &LibrarySide, b: &LibrarySide) -> Comparison {
    if a.account_ids.is_empty() || b.account_ids.is_empty() {
        return Comparison::default();
    }

    let a_ids = a.visible_app_ids();
    let b_ids = b.visible_app_ids();

    Comparison {
        shared: a_ids.intersection(&b_ids).copied().collect(),
        only_a: a_ids.difference(&b_ids).copied().collect(),
        only_b: b_ids.difference(&a_ids).copied().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn side(account_id: i32, apps: &[(i32, bool)]) -> LibrarySide {
        LibrarySide {
            account_ids: vec![account_id],
            items: apps
                .iter()
                .map(|&(app_id, hidden)| OwnedItem {
                    account_id,
                    app_id,
                    hidden,
                })
                .collect(),
        }
    }

    #[test]
    fn computes_shared_and_exclusive_sets() {
        let a = side(1, &[(1, false), (2, false), (3, false)]);
        let b = side(2, &[(2, false), (3, false), (4, false)]);

        let result = compare(&a, &b);

        assert_eq!(result.shared, vec![2, 3]);
        assert_eq!(result.only_a, vec![1]);
        assert_eq!(result.only_b, vec![4]);
    }

    #[test]
    fn hidden_items_are_excluded_everywhere() {
        let a = side(1, &[(1, false), (2, true), (3, false)]);
        let b = side(2, &[(2, false), (3, true), (4, true)]);

        let result = compare(&a, &b);

        assert!(result.shared.is_empty());
        assert_eq!(result.only_a, vec![1, 3]);
        assert_eq!(result.only_b, vec![2]);
    }

    #[test]
    fn side_without_accounts_is_empty_not_error() {
        let a = side(1, &[(1, false), (2, false)]);
        let empty = LibrarySide::default();

        assert_eq!(compare(&a, &empty), Comparison::default());
        assert_eq!(compare(&empty, &a), Comparison::default());
    }

    #[test]
    fn multiple_accounts_per_side_are_merged() {
        let mut a = side(1, &[(1, false), (2, false)]);
        let second = side(3, &[(2, false), (5, false)]);
        a.account_ids.extend(second.account_ids);
        a.items.extend(second.items);

        let b = side(2, &[(5, false), (6, false)]);

        let result = compare(&a, &b);

        assert_eq!(result.shared, vec![5]);
        assert_eq!(result.only_a, vec![1, 2]);
        assert_eq!(result.only_b, vec![6]);
    }

    #[test]
    fn items_from_unlisted_accounts_are_ignored() {
        let mut a = side(1, &[(1, false)]);
        a.items.push(OwnedItem {
            account_id: 99,
            app_id: 7,
            hidden: false,
        });
        let b = side(2, &[(7, false)]);

        let result = compare(&a, &b);

        assert!(result.shared.is_empty());
        assert_eq!(result.only_b, vec![7]);
    }
}
