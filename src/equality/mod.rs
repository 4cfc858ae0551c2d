// ============================================================================
// Equality Policy
// ============================================================================
//
// Decides whether two captured field values are "the same" for tracking
// purposes. Structural equality is the baseline; values tagged as ordered
// fall back to their total-order comparison, so logically equal values with
// different representations (1 vs 1.0, 1.0 vs 1.00) do not produce phantom
// change records.
//
// ============================================================================

use crate::core::TrackedValue;
use std::cmp::Ordering;

/// Field-level equality used by the diff computation.
///
/// 1. Two absent values are equal.
/// 2. Structural equality wins.
/// 3. Two ordered values are equal iff their comparison yields zero.
/// 4. Anything else is a change.
pub fn values_equal(old_value: &TrackedValue, new_value: &TrackedValue) -> bool {
    old_value == new_value || compare_equals(old_value, new_value)
}

fn compare_equals(first: &TrackedValue, second: &TrackedValue) -> bool {
    match (first, second) {
        (TrackedValue::Ordered(a), TrackedValue::Ordered(b)) => {
            matches!(a.compare(b), Ok(Ordering::Equal))
        }
        _ => false,
    }
}

/// True exactly when one side is absent and the other is a present but
/// empty collection.
///
/// A relationship collection that was never materialized (lazy, unread)
/// and one that was eagerly initialized as empty carry the same
/// information: no members. Without this guard the pairing would be
/// reported as a change purely due to initialization timing.
///
/// Two absent values are rule 1 of [`values_equal`]; two present-and-empty
/// collections are rule 2. Neither is covered here.
pub fn collections_equivalent_when_absent(
    old_value: &TrackedValue,
    new_value: &TrackedValue,
) -> bool {
    (old_value.is_absent() && new_value.is_empty_collection())
        || (new_value.is_absent() && old_value.is_empty_collection())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{EntityRef, ScalarValue};

    #[test]
    fn test_reflexivity() {
        let values = [
            TrackedValue::Absent,
            TrackedValue::scalar(0i64),
            TrackedValue::scalar(""),
            TrackedValue::ordered(3.5f64),
            TrackedValue::References(vec![]),
            TrackedValue::References(vec![EntityRef::new("Project", 1i64)]),
        ];
        for value in &values {
            assert!(values_equal(value, value), "{:?} != itself", value);
        }
    }

    #[test]
    fn test_both_absent_equal() {
        assert!(values_equal(&TrackedValue::Absent, &TrackedValue::Absent));
    }

    #[test]
    fn test_structural_equality() {
        assert!(values_equal(
            &TrackedValue::scalar("alice"),
            &TrackedValue::scalar("alice")
        ));
        assert!(!values_equal(
            &TrackedValue::scalar("alice"),
            &TrackedValue::scalar("bob")
        ));
    }

    #[test]
    fn test_ordered_values_compare_equal_across_representations() {
        // Structurally different, logically the same magnitude.
        assert!(values_equal(
            &TrackedValue::ordered(ScalarValue::decimal(10, 1)),
            &TrackedValue::ordered(ScalarValue::decimal(100, 2)),
        ));
        assert!(values_equal(
            &TrackedValue::ordered(ScalarValue::Integer(1)),
            &TrackedValue::ordered(ScalarValue::Float(1.0)),
        ));
    }

    #[test]
    fn test_plain_scalars_do_not_fall_back_to_comparison() {
        // Only the ordered capability opts into comparison-based equality.
        assert!(!values_equal(
            &TrackedValue::scalar(ScalarValue::Integer(1)),
            &TrackedValue::scalar(ScalarValue::Float(1.0)),
        ));
    }

    #[test]
    fn test_incomparable_ordered_values_are_not_equal() {
        assert!(!values_equal(
            &TrackedValue::ordered(ScalarValue::Text("1".into())),
            &TrackedValue::ordered(ScalarValue::Integer(1)),
        ));
    }

    #[test]
    fn test_absent_empty_collection_truth_table() {
        let absent = TrackedValue::Absent;
        let empty = TrackedValue::References(vec![]);

        assert!(collections_equivalent_when_absent(&absent, &empty));
        assert!(collections_equivalent_when_absent(&empty, &absent));
        assert!(!collections_equivalent_when_absent(&absent, &absent));
        assert!(!collections_equivalent_when_absent(&empty, &empty));
    }

    #[test]
    fn test_absent_vs_populated_collection_is_a_change() {
        let populated = TrackedValue::References(vec![EntityRef::new("Project", 7i64)]);
        assert!(!collections_equivalent_when_absent(
            &TrackedValue::Absent,
            &populated
        ));
        assert!(!values_equal(&TrackedValue::Absent, &populated));
    }

    #[test]
    fn test_empty_value_collection_guard() {
        assert!(collections_equivalent_when_absent(
            &TrackedValue::Absent,
            &TrackedValue::Values(vec![])
        ));
    }
}
