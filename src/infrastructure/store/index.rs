//! The order index set.
//!
//! The store cannot range-scan arbitrary records, so the key of every live
//! order is also kept as a member of one well-known set. Listing walks that
//! set with a resumable cursor. The walk takes no lock: members added or
//! removed while a caller is paging may be seen zero, one or several times.

use crate::infrastructure::keys::DEFAULT_INDEX_KEY;

/// Cursor value that starts a scan and, when returned, ends it.
pub const SCAN_START: u64 = 0;

/// Identity of the index set inside a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSet {
    name: String,
}

impl IndexSet {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Default for IndexSet {
    fn default() -> Self {
        Self::new(DEFAULT_INDEX_KEY)
    }
}

/// One step of an index scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanPage {
    pub keys: Vec<String>,
    pub cursor: u64,
}

impl ScanPage {
    pub fn is_last(&self) -> bool {
        self.cursor == SCAN_START
    }
}

/// Redis-style glob match supporting `*` and `?`.
pub fn glob_match(pattern: &str, candidate: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let candidate: Vec<char> = candidate.chars().collect();

    let (mut p, mut c) = (0, 0);
    // Position of the last `*` seen and the candidate index it was tried at.
    let mut backtrack: Option<(usize, usize)> = None;

    while c < candidate.len() {
        match pattern.get(p) {
            Some('*') => {
                backtrack = Some((p, c));
                p += 1;
            }
            Some('?') => {
                p += 1;
                c += 1;
            }
            Some(ch) if *ch == candidate[c] => {
                p += 1;
                c += 1;
            }
            _ => match backtrack {
                Some((star, tried)) => {
                    p = star + 1;
                    c = tried + 1;
                    backtrack = Some((star, tried + 1));
                }
                None => return false,
            },
        }
    }

    pattern[p..].iter().all(|ch| *ch == '*')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_index_is_named_orders() {
        assert_eq!(IndexSet::default().name(), "orders");
        assert_eq!(IndexSet::new("staging-orders").name(), "staging-orders");
    }

    #[test]
    fn star_matches_any_run() {
        assert!(glob_match("*", ""));
        assert!(glob_match("*", "order:1"));
        assert!(glob_match("order:*", "order:"));
        assert!(glob_match("order:*", "order:18446744073709551615"));
        assert!(glob_match("*:1*", "order:123"));
        assert!(!glob_match("order:*", "orders"));
        assert!(!glob_match("order:*", "customer:1"));
    }

    #[test]
    fn question_mark_matches_one_char() {
        assert!(glob_match("order:?", "order:7"));
        assert!(!glob_match("order:?", "order:"));
        assert!(!glob_match("order:?", "order:77"));
    }

    #[test]
    fn literal_pattern_requires_exact_match() {
        assert!(glob_match("order:42", "order:42"));
        assert!(!glob_match("order:42", "order:421"));
        assert!(!glob_match("order:421", "order:42"));
    }

    #[test]
    fn scan_page_is_last_at_start_cursor() {
        assert!(ScanPage::default().is_last());
        assert!(!ScanPage {
            keys: vec![],
            cursor: 3
        }
        .is_last());
    }
}
