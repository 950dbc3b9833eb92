//! Pure invariant checks used by the workflows. No I/O.

use std::collections::BTreeSet;

use crate::models::class::Email;

/// An account balance is acceptable once debited only if it stays in credit.
pub fn positive_balance(balance_cents: i64) -> bool {
    balance_cents >= 0
}

/// Whether a course can take `requested` more students.
pub fn has_capacity(capacity: u32, already_enrolled: u32, requested: u32) -> bool {
    capacity.saturating_sub(already_enrolled) >= requested
}

/// Emails in `a` that are not in `b`, by exact string equality.
pub fn email_set_difference(a: &[Email], b: &[Email]) -> BTreeSet<Email> {
    let b: BTreeSet<&Email> = b.iter().collect();
    a.iter().filter(|email| !b.contains(email)).cloned().collect()
}

/// Emails present in both `a` and `b`, by exact string equality.
pub fn email_set_intersection(a: &[Email], b: &[Email]) -> BTreeSet<Email> {
    let b: BTreeSet<&Email> = b.iter().collect();
    a.iter().filter(|email| b.contains(email)).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn emails(addresses: &[&str]) -> Vec<Email> {
        addresses.iter().map(|a| Email::new(*a)).collect()
    }

    #[test]
    fn balance_must_not_go_negative() {
        assert!(positive_balance(0));
        assert!(positive_balance(3_774_850));
        assert!(!positive_balance(-1));
    }

    #[test]
    fn capacity_counts_remaining_places() {
        assert!(has_capacity(2, 1, 1));
        assert!(has_capacity(2, 0, 2));
        assert!(!has_capacity(2, 1, 2));
        assert!(has_capacity(0, 0, 0));
    }

    #[test]
    fn over_full_course_has_no_capacity() {
        assert!(!has_capacity(1, 3, 1));
        assert!(has_capacity(1, 3, 0));
    }

    #[test]
    fn difference_is_exact_and_case_sensitive() {
        let requested = emails(&["a@example.com", "B@example.com", "c@example.com"]);
        let registered = emails(&["a@example.com", "b@example.com"]);

        assert_eq!(
            email_set_difference(&requested, &registered),
            emails(&["B@example.com", "c@example.com"]).into_iter().collect()
        );
    }

    #[test]
    fn intersection_collapses_duplicates() {
        let enrolled = emails(&["a@example.com", "b@example.com"]);
        let resolved = emails(&["b@example.com", "b@example.com", "z@example.com"]);

        assert_eq!(
            email_set_intersection(&resolved, &enrolled),
            emails(&["b@example.com"]).into_iter().collect()
        );
        assert!(email_set_intersection(&resolved, &[]).is_empty());
    }
}
