//! Substitution of mapping keys inside text blobs (code pages, formulas).
//!
//! All keys are matched in one left-to-right pass. At each position the
//! longest key wins, and replaced text is never scanned again, so a value
//! that happens to be another key is left alone.

use regex::Regex;
use std::collections::{BTreeMap, HashMap};

use crate::error::{Error, Result};

/// Text after substitution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewritten {
    /// Resulting text.
    pub text: String,
    /// Number of keys replaced.
    pub replacements: usize,
}

impl Rewritten {
    /// Whether at least one key was found.
    #[must_use]
    pub fn changed(&self) -> bool {
        self.replacements > 0
    }
}

/// Compiled key → value substitution.
#[derive(Debug, Clone)]
pub struct Rewriter {
    values: HashMap<String, String>,
    pattern: Option<Regex>,
}

impl Rewriter {
    /// Compiles a rewriter. Empty keys are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the key alternation cannot be compiled.
    pub fn new(entries: &BTreeMap<String, String>) -> Result<Self> {
        let values: HashMap<String, String> = entries
            .iter()
            .filter(|(key, _)| !key.is_empty())
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        let mut keys: Vec<&str> = values.keys().map(String::as_str).collect();
        // Longest first: the regex alternation is leftmost-first.
        keys.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

        let pattern = if keys.is_empty() {
            None
        } else {
            let alternation = keys
                .iter()
                .map(|key| regex::escape(key))
                .collect::<Vec<_>>()
                .join("|");
            Some(
                Regex::new(&alternation)
                    .map_err(|e| Error::Config(format!("cannot compile mapping keys: {e}")))?,
            )
        };

        Ok(Self { values, pattern })
    }

    /// Whether `text` contains any key.
    #[must_use]
    pub fn matches(&self, text: &str) -> bool {
        self.pattern.as_ref().is_some_and(|re| re.is_match(text))
    }

    /// Replaces every key occurrence in `text`.
    #[must_use]
    pub fn rewrite(&self, text: &str) -> Rewritten {
        let Some(pattern) = &self.pattern else {
            return Rewritten {
                text: text.to_string(),
                replacements: 0,
            };
        };

        let mut replacements = 0;
        let text = pattern
            .replace_all(text, |caps: &regex::Captures<'_>| {
                replacements += 1;
                self.values
                    .get(&caps[0])
                    .cloned()
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned();

        Rewritten { text, replacements }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn rewriter(pairs: &[(&str, &str)]) -> Rewriter {
        let entries = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Rewriter::new(&entries).unwrap()
    }

    #[test]
    fn test_replaces_every_occurrence() {
        let rw = rewriter(&[("bq1aaa", "bq2xxx"), ("a.quickbase.com", "b.quickbase.com")]);
        let out = rw.rewrite("https://a.quickbase.com/db/bq1aaa?a=q&dbid=bq1aaa");
        assert_eq!(out.text, "https://b.quickbase.com/db/bq2xxx?a=q&dbid=bq2xxx");
        assert_eq!(out.replacements, 3);
        assert!(out.changed());
    }

    #[test]
    fn test_no_key_leaves_text_untouched() {
        let rw = rewriter(&[("bq1aaa", "bq2xxx")]);
        let out = rw.rewrite("[Status] = \"Open\"");
        assert_eq!(out.text, "[Status] = \"Open\"");
        assert!(!out.changed());
        assert!(!rw.matches("[Status]"));
    }

    #[test]
    fn test_longest_key_wins() {
        let rw = rewriter(&[("bq1", "bq9"), ("bq1aaa", "bq2xxx")]);
        assert_eq!(rw.rewrite("bq1aaa bq1").text, "bq2xxx bq9");
    }

    #[test]
    fn test_replacement_is_not_rescanned() {
        // a -> b and b -> c must not chain into a -> c.
        let rw = rewriter(&[("bq1aaa", "bq1bbb"), ("bq1bbb", "bq1ccc")]);
        assert_eq!(rw.rewrite("bq1aaa bq1bbb").text, "bq1bbb bq1ccc");
    }

    #[test]
    fn test_regex_metacharacters_are_literal() {
        let rw = rewriter(&[("a.b*c", "x")]);
        assert_eq!(rw.rewrite("a.b*c aXbbc").text, "x aXbbc");
    }

    #[test]
    fn test_empty_mapping_and_empty_key() {
        let rw = rewriter(&[("", "boom")]);
        assert!(!rw.matches("anything"));
        assert_eq!(rw.rewrite("anything").text, "anything");
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        /// Once no key remains in the output, rewriting again is a no-op.
        #[test]
        fn prop_idempotent_when_no_key_remains(
            text in "[a-z0-9 .]{0,60}",
            keys in proptest::collection::btree_map("[a-z]{3,6}", "[A-Z]{3,6}", 0..5)
        ) {
            let rw = Rewriter::new(&keys).unwrap();
            let once = rw.rewrite(&text);
            // Values are upper-case, keys lower-case: no key can survive.
            prop_assert!(!rw.matches(&once.text));
            let twice = rw.rewrite(&once.text);
            prop_assert_eq!(&twice.text, &once.text);
            prop_assert_eq!(twice.replacements, 0);
        }

        /// Text without any key is returned unchanged.
        #[test]
        fn prop_untouched_without_keys(text in "[0-9 ]{0,40}") {
            let rw = rewriter(&[("bq1aaa", "bq2xxx")]);
            let out = rw.rewrite(&text);
            prop_assert_eq!(out.text, text);
            prop_assert_eq!(out.replacements, 0);
        }
    }
}
