/// Column resolution.
///
/// Column existence and column position have separate persisted stores with
/// different merge rules:
/// - existence: union of persisted and discovered, minus deleted columns that
///   no card claims any more ([`resolve_columns`])
/// - position: stored order filtered to existing columns, novel columns
///   appended ([`normalize_order`])
///
/// Both results always start with [`DEFAULT_STATUS`].
use std::collections::HashSet;

use crate::types::{Card, DEFAULT_STATUS};

/// Remove duplicates, keeping the first occurrence of each entry.
pub fn dedupe<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut result = Vec::new();
    for item in items {
        let item = item.as_ref();
        if seen.insert(item.to_string()) {
            result.push(item.to_string());
        }
    }
    result
}

/// Statuses claimed by cards, in card order.
pub fn discover_columns(cards: &[Card]) -> Vec<String> {
    dedupe(cards.iter().map(|card| card.status.as_str()))
}

/// Move the default column to index 0, inserting it if absent.
pub fn pin_default(columns: &mut Vec<String>) {
    columns.retain(|status| status != DEFAULT_STATUS);
    columns.insert(0, DEFAULT_STATUS.to_string());
}

/// Merge discovered, persisted and deleted columns into the canonical set.
///
/// A deleted column stays hidden unless a discovered card still claims it;
/// files always win. The default column is never removed.
pub fn resolve_columns(
    discovered: &[String],
    persisted: Option<&[String]>,
    deleted: Option<&[String]>,
) -> Vec<String> {
    let mut columns = match persisted {
        Some(persisted) => dedupe(persisted.iter().chain(discovered.iter())),
        None => dedupe(discovered),
    };

    pin_default(&mut columns);

    if let Some(deleted) = deleted {
        let deleted: HashSet<&str> = deleted.iter().map(String::as_str).collect();
        let claimed: HashSet<&str> = discovered.iter().map(String::as_str).collect();
        columns.retain(|status| {
            status == DEFAULT_STATUS
                || !deleted.contains(status.as_str())
                || claimed.contains(status.as_str())
        });
    }

    columns
}

/// Reconcile a stored order against the current column set: drop stale
/// entries, append novel ones in discovery order, pin the default first.
pub fn normalize_order(candidate: &[String], current: &[String]) -> Vec<String> {
    let candidate = dedupe(candidate);
    let current = dedupe(current);
    let current_set: HashSet<&str> = current.iter().map(String::as_str).collect();

    let mut ordered: Vec<String> = candidate
        .into_iter()
        .filter(|status| current_set.contains(status.as_str()))
        .collect();

    let placed: HashSet<String> = ordered.iter().cloned().collect();
    ordered.extend(current.iter().filter(|status| !placed.contains(*status)).cloned());

    pin_default(&mut ordered);
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cols(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_dedupe_keeps_first_occurrence() {
        assert_eq!(dedupe(["b", "a", "b", "c", "a"]), cols(&["b", "a", "c"]));
    }

    #[test]
    fn test_resolve_discovered_only() {
        let resolved = resolve_columns(&cols(&["Doing", "Done", "Doing"]), None, None);
        assert_eq!(resolved, cols(&[DEFAULT_STATUS, "Doing", "Done"]));
    }

    #[test]
    fn test_resolve_keeps_persisted_empty_columns_first() {
        let resolved = resolve_columns(
            &cols(&["Doing"]),
            Some(&cols(&["Review", "Doing"])[..]),
            None,
        );
        assert_eq!(resolved, cols(&[DEFAULT_STATUS, "Review", "Doing"]));
    }

    #[test]
    fn test_resolve_pins_default_even_when_persisted_later() {
        let resolved = resolve_columns(
            &cols(&[]),
            Some(&cols(&["Doing", DEFAULT_STATUS])[..]),
            None,
        );
        assert_eq!(resolved, cols(&[DEFAULT_STATUS, "Doing"]));
    }

    #[test]
    fn test_resolve_removes_deleted_unclaimed_columns() {
        let resolved = resolve_columns(
            &cols(&["Doing"]),
            Some(&cols(&["Doing", "Archive"])[..]),
            Some(&cols(&["Archive"])[..]),
        );
        assert_eq!(resolved, cols(&[DEFAULT_STATUS, "Doing"]));
    }

    #[test]
    fn test_deleted_column_reappears_when_claimed() {
        let resolved = resolve_columns(
            &cols(&["Archive"]),
            Some(&cols(&["Doing"])[..]),
            Some(&cols(&["Archive"])[..]),
        );
        assert_eq!(resolved, cols(&[DEFAULT_STATUS, "Doing", "Archive"]));
    }

    #[test]
    fn test_default_column_never_deleted() {
        let resolved = resolve_columns(
            &cols(&[]),
            Some(&cols(&[DEFAULT_STATUS])[..]),
            Some(&cols(&[DEFAULT_STATUS])[..]),
        );
        assert_eq!(resolved, cols(&[DEFAULT_STATUS]));
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let cases: Vec<(Vec<String>, Option<Vec<String>>, Option<Vec<String>>)> = vec![
            (cols(&["A", "B"]), None, None),
            (cols(&["B", "A"]), Some(cols(&["C", "A", DEFAULT_STATUS])), None),
            (cols(&["A"]), Some(cols(&["B", "A", "C"])), Some(cols(&["B", "A"]))),
            (cols(&[]), Some(cols(&["X"])), Some(cols(&["X", DEFAULT_STATUS]))),
            (cols(&[DEFAULT_STATUS, "Z"]), Some(cols(&["Z", "Y"])), Some(cols(&["Y"]))),
        ];

        for (discovered, persisted, deleted) in cases {
            let once = resolve_columns(&discovered, persisted.as_deref(), deleted.as_deref());
            let twice = resolve_columns(&once, persisted.as_deref(), deleted.as_deref());
            assert_eq!(once, twice, "discovered={:?}", discovered);
            assert_eq!(once[0], DEFAULT_STATUS);
        }
    }

    #[test]
    fn test_normalize_order_drops_stale_and_appends_novel() {
        let ordered = normalize_order(&cols(&["B", "A"]), &cols(&["A", "C"]));
        assert_eq!(ordered, cols(&[DEFAULT_STATUS, "A", "C"]));
    }

    #[test]
    fn test_normalize_order_pins_default() {
        let ordered = normalize_order(
            &cols(&["Doing", DEFAULT_STATUS, "Done"]),
            &cols(&[DEFAULT_STATUS, "Done", "Doing"]),
        );
        assert_eq!(ordered, cols(&[DEFAULT_STATUS, "Doing", "Done"]));
    }

    #[test]
    fn test_normalize_order_dedupes_candidate() {
        let ordered = normalize_order(&cols(&["B", "B", "A", "B"]), &cols(&["A", "B"]));
        assert_eq!(ordered, cols(&[DEFAULT_STATUS, "B", "A"]));
    }

    #[test]
    fn test_normalize_order_empty_candidate_uses_current() {
        let ordered = normalize_order(&[], &cols(&[DEFAULT_STATUS, "X", "Y"]));
        assert_eq!(ordered, cols(&[DEFAULT_STATUS, "X", "Y"]));
    }
}
