//! Per-author voting rules.
//!
//! The rule table is built once from configuration and shared read-only by the
//! scanner (author membership) and the scheduler (delay, weight, tags).

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

use crate::error::{CuratorError, Result};
use crate::types::Weight;

// ---------------------------------------------------------------------------
// Rule
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub author: String,
    /// Minimum content age before voting.
    #[serde(default, alias = "vote_delay")]
    pub delay_minutes: u32,
    pub weight: Weight,
    /// Content carrying any of these tags is never voted on.
    #[serde(default, alias = "excluded_tags")]
    pub disqualifying_tags: BTreeSet<String>,
}

impl Rule {
    pub fn delay(&self) -> chrono::Duration {
        chrono::Duration::minutes(i64::from(self.delay_minutes))
    }

    /// Returns the first tag in `tags` that disqualifies the content, if any.
    pub fn disqualifying_tag<'a>(&self, tags: &'a BTreeSet<String>) -> Option<&'a str> {
        tags.iter()
            .find(|t| self.disqualifying_tags.contains(&t.to_lowercase()))
            .map(String::as_str)
    }
}

// ---------------------------------------------------------------------------
// RuleTable
// ---------------------------------------------------------------------------

/// Author → rule mapping. At most one rule per author.
#[derive(Debug, Clone, Default)]
pub struct RuleTable {
    rules: HashMap<String, Rule>,
}

impl RuleTable {
    /// Build the table, rejecting duplicate authors.
    ///
    /// Disqualifying tags are normalized to lowercase.
    pub fn from_rules(rules: impl IntoIterator<Item = Rule>) -> Result<Self> {
        let mut map = HashMap::new();
        for mut rule in rules {
            rule.disqualifying_tags = rule
                .disqualifying_tags
                .iter()
                .map(|t| t.to_lowercase())
                .collect();
            if map.contains_key(&rule.author) {
                return Err(CuratorError::DuplicateRule(rule.author));
            }
            map.insert(rule.author.clone(), rule);
        }
        Ok(Self { rules: map })
    }

    pub fn get(&self, author: &str) -> Option<&Rule> {
        self.rules.get(author)
    }

    pub fn contains(&self, author: &str) -> bool {
        self.rules.contains_key(author)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Authors in sorted order.
    pub fn authors(&self) -> Vec<&str> {
        let mut authors: Vec<&str> = self.rules.keys().map(String::as_str).collect();
        authors.sort_unstable();
        authors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(author: &str, delay: u32, tags: &[&str]) -> Rule {
        Rule {
            author: author.into(),
            delay_minutes: delay,
            weight: Weight::FULL,
            disqualifying_tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    #[test]
    fn rejects_duplicate_authors() {
        let err = RuleTable::from_rules(vec![rule("alice", 0, &[]), rule("alice", 5, &[])])
            .unwrap_err();
        assert!(matches!(err, CuratorError::DuplicateRule(a) if a == "alice"));
    }

    #[test]
    fn lookup_and_membership() {
        let table = RuleTable::from_rules(vec![rule("alice", 0, &[]), rule("bob", 30, &[])]).unwrap();
        assert!(table.contains("alice"));
        assert!(!table.contains("carol"));
        assert_eq!(table.get("bob").unwrap().delay_minutes, 30);
        assert_eq!(table.authors(), vec!["alice", "bob"]);
    }

    #[test]
    fn disqualifying_tags_match_case_insensitively() {
        let table = RuleTable::from_rules(vec![rule("alice", 0, &["NSFW"])]).unwrap();
        let r = table.get("alice").unwrap();
        let tags: BTreeSet<String> = ["life".to_string(), "Nsfw".to_string()].into();
        assert_eq!(r.disqualifying_tag(&tags), Some("Nsfw"));
        let clean: BTreeSet<String> = ["life".to_string()].into();
        assert_eq!(r.disqualifying_tag(&clean), None);
    }

    #[test]
    fn rule_accepts_legacy_field_names() {
        let yaml = "author: alice\nvote_delay: 15\nweight: 50\nexcluded_tags: [spam]\n";
        let r: Rule = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(r.delay_minutes, 15);
        assert_eq!(r.weight.basis_points(), 5000);
        assert!(r.disqualifying_tags.contains("spam"));
    }
}
