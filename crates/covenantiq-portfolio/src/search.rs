//! Search over loan titles, borrowers and covenant names.
//!
//! Case-insensitive substring matches rank first; a fuzzy fallback (every
//! query character appears in order) ranks after them. Queries shorter than
//! two characters return nothing.

use serde::{Deserialize, Serialize};

use crate::types::{CovenantView, LoanView, PortfolioSnapshot};

/// Minimum query length, in characters.
pub const MIN_QUERY_LEN: usize = 2;

/// Search hits.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SearchResults {
    /// Matching loans.
    pub loans: Vec<LoanView>,
    /// Matching covenants, each with its loan title.
    pub covenants: Vec<CovenantView>,
    /// `loans.len() + covenants.len()`.
    pub total: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum MatchRank {
    Substring(usize),
    Fuzzy,
}

fn rank(haystacks: &[&str], needle: &str) -> Option<MatchRank> {
    let substring = haystacks
        .iter()
        .filter_map(|h| h.to_lowercase().find(needle))
        .min()
        .map(MatchRank::Substring);
    substring.or_else(|| {
        haystacks
            .iter()
            .any(|h| is_subsequence(needle, &h.to_lowercase()))
            .then_some(MatchRank::Fuzzy)
    })
}

fn is_subsequence(needle: &str, haystack: &str) -> bool {
    let mut chars = haystack.chars();
    needle.chars().all(|n| chars.any(|h| h == n))
}

/// Searches the snapshot, returning at most `limit` loans and `limit` covenants.
#[must_use]
pub fn search(snapshot: &PortfolioSnapshot, query: &str, limit: usize) -> SearchResults {
    let needle = query.trim().to_lowercase();
    if needle.chars().count() < MIN_QUERY_LEN {
        return SearchResults::default();
    }

    let mut loans: Vec<(MatchRank, LoanView)> = snapshot
        .loans()
        .iter()
        .filter_map(|l| {
            rank(&[l.title.as_str(), l.borrower_name.as_str()], &needle)
                .map(|r| (r, LoanView::build(snapshot, l)))
        })
        .collect();
    loans.sort_by(|(ra, a), (rb, b)| {
        ra.cmp(rb)
            .then_with(|| a.loan.title.cmp(&b.loan.title))
            .then_with(|| a.loan.id.cmp(&b.loan.id))
    });

    let mut covenants: Vec<(MatchRank, CovenantView)> = snapshot
        .covenants()
        .iter()
        .filter_map(|c| {
            rank(&[c.covenant_name.as_str()], &needle)
                .map(|r| (r, CovenantView::build(snapshot, c).with_loan_title(snapshot)))
        })
        .collect();
    covenants.sort_by(|(ra, a), (rb, b)| {
        ra.cmp(rb)
            .then_with(|| a.covenant.covenant_name.cmp(&b.covenant.covenant_name))
            .then_with(|| a.covenant.id.cmp(&b.covenant.id))
    });

    let loans: Vec<LoanView> = loans.into_iter().take(limit).map(|(_, v)| v).collect();
    let covenants: Vec<CovenantView> = covenants.into_iter().take(limit).map(|(_, v)| v).collect();
    log::debug!(
        "search '{query}': {} loans, {} covenants",
        loans.len(),
        covenants.len()
    );

    SearchResults {
        total: loans.len() + covenants.len(),
        loans,
        covenants,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subsequence() {
        assert!(is_subsequence("lvg", "leverage"));
        assert!(!is_subsequence("gvl", "leverage"));
        assert!(is_subsequence("", "anything"));
    }

    #[test]
    fn test_rank_prefers_substring() {
        assert_eq!(rank(&["Max Leverage"], "lev"), Some(MatchRank::Substring(4)));
        assert_eq!(rank(&["Max Leverage"], "mlv"), Some(MatchRank::Fuzzy));
        assert_eq!(rank(&["Max Leverage"], "zz"), None);
        assert!(MatchRank::Substring(10) < MatchRank::Fuzzy);
    }
}
