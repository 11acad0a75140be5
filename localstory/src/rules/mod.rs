//! Substitution rules for intercepted JSON documents.
//!
//! A [`SubstitutionRule`] pairs a URL substring pattern with a mutation that
//! rewrites one known shape of third-party JSON. Rules are collected in a
//! [`RuleSet`] and handed to the fetch slot, which applies the first matching
//! rule to a private copy of each intercepted response.
//!
//! # Rule kinds
//!
//! - [`LayerFilterRule`] - overwrites a layer's filter expression
//! - [`ChartRule`] - rewrites the local/regional/national rows of a chart
//! - [`WebmapExtentRule`] - replaces webmap extents with the local feature's
//! - [`NodeEdits`] - applies [`NodeAction`]s to story nodes by identifier
//!
//! [`story_rules`] assembles the standard set for a configured story.

mod chart;
mod format;
mod layer;
mod nodes;
pub mod story;
mod webmap;

pub use chart::{ChartRule, ChartSubject};
pub use format::{format_currency, format_home_value, format_index};
pub use layer::{FilterTarget, LayerFilterRule};
pub use nodes::{NodeAction, NodeEdits};
pub use story::{story_rules, StoryProfile};
pub use webmap::WebmapExtentRule;

use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

/// Errors raised by a substitution rule while rewriting a document.
///
/// These are never swallowed by the interception layer; a failing rule fails
/// the intercepted request.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MutationError {
    /// An expected path does not exist in the document.
    #[error("Missing path in document: {0}")]
    MissingPath(String),

    /// A path exists but holds a value of the wrong type.
    #[error("Unexpected value at {path}: expected {expected}")]
    UnexpectedType { path: String, expected: &'static str },

    /// A feature lacks an attribute the rule needs.
    #[error("Feature is missing attribute '{0}'")]
    MissingAttribute(String),

    /// The local feature has no extent to derive map extents from.
    #[error("Local feature has no extent")]
    MissingExtent,
}

type MutateFn = dyn Fn(&mut Value) -> Result<(), MutationError> + Send + Sync;

/// A (URL pattern, mutation) pair.
pub struct SubstitutionRule {
    name: String,
    pattern: String,
    mutate: Box<MutateFn>,
}

impl SubstitutionRule {
    /// Creates a rule applying `mutate` to responses whose URL contains `pattern`.
    pub fn new<F>(name: impl Into<String>, pattern: impl Into<String>, mutate: F) -> Self
    where
        F: Fn(&mut Value) -> Result<(), MutationError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            pattern: pattern.into(),
            mutate: Box::new(mutate),
        }
    }

    /// Rule name, used in logs and errors.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// URL substring this rule matches.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Whether this rule applies to the given URL.
    pub fn matches(&self, url: &str) -> bool {
        url.contains(&self.pattern)
    }

    /// Runs the mutation against a document.
    pub fn apply(&self, document: &mut Value) -> Result<(), MutationError> {
        (self.mutate)(document)
    }
}

impl fmt::Debug for SubstitutionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubstitutionRule")
            .field("name", &self.name)
            .field("pattern", &self.pattern)
            .finish_non_exhaustive()
    }
}

/// Ordered collection of substitution rules.
///
/// Matching is first-match by registration order: when several patterns match
/// the same URL, only the earliest registered rule runs.
#[derive(Debug, Default)]
pub struct RuleSet {
    rules: Vec<SubstitutionRule>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a rule.
    pub fn with(mut self, rule: SubstitutionRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Appends a rule in place.
    pub fn push(&mut self, rule: SubstitutionRule) {
        self.rules.push(rule);
    }

    /// Returns the first rule whose pattern is a substring of `url`.
    pub fn first_match(&self, url: &str) -> Option<&SubstitutionRule> {
        self.rules.iter().find(|rule| rule.matches(url))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SubstitutionRule> {
        self.rules.iter()
    }
}

impl FromIterator<SubstitutionRule> for RuleSet {
    fn from_iter<I: IntoIterator<Item = SubstitutionRule>>(iter: I) -> Self {
        Self {
            rules: iter.into_iter().collect(),
        }
    }
}

/// Resolves a JSON pointer, failing with [`MutationError::MissingPath`].
pub(crate) fn pointer_mut<'a>(
    document: &'a mut Value,
    pointer: &str,
) -> Result<&'a mut Value, MutationError> {
    document
        .pointer_mut(pointer)
        .ok_or_else(|| MutationError::MissingPath(pointer.to_string()))
}

/// Resolves a JSON pointer that must name an object.
pub(crate) fn object_mut<'a>(
    document: &'a mut Value,
    pointer: &str,
) -> Result<&'a mut Map<String, Value>, MutationError> {
    pointer_mut(document, pointer)?
        .as_object_mut()
        .ok_or_else(|| MutationError::UnexpectedType {
            path: pointer.to_string(),
            expected: "object",
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn set_marker(marker: &'static str) -> SubstitutionRule {
        SubstitutionRule::new(marker, "/data", move |doc| {
            doc["marker"] = json!(marker);
            Ok(())
        })
    }

    #[test]
    fn test_first_match_wins_by_registration_order() {
        let rules = RuleSet::new()
            .with(SubstitutionRule::new("specific", "item-1/data", |_| Ok(())))
            .with(set_marker("generic"));

        let url = "https://host/items/item-1/data?f=json";
        assert_eq!(rules.first_match(url).unwrap().name(), "specific");

        let reversed = RuleSet::new()
            .with(set_marker("generic"))
            .with(SubstitutionRule::new("specific", "item-1/data", |_| Ok(())));
        assert_eq!(reversed.first_match(url).unwrap().name(), "generic");
    }

    #[test]
    fn test_no_match() {
        let rules = RuleSet::new().with(set_marker("a"));
        assert!(rules.first_match("https://host/other").is_none());
        assert_eq!(rules.len(), 1);
        assert!(!rules.is_empty());
    }

    #[test]
    fn test_apply_runs_mutation() {
        let rule = set_marker("applied");
        let mut doc = json!({});
        rule.apply(&mut doc).unwrap();
        assert_eq!(doc["marker"], "applied");
    }

    #[test]
    fn test_object_mut_errors() {
        let mut doc = json!({"a": [1, 2], "b": {"c": 1}});
        assert!(object_mut(&mut doc, "/b").is_ok());
        assert_eq!(
            object_mut(&mut doc, "/a").unwrap_err(),
            MutationError::UnexpectedType {
                path: "/a".to_string(),
                expected: "object"
            }
        );
        assert_eq!(
            object_mut(&mut doc, "/missing").unwrap_err(),
            MutationError::MissingPath("/missing".to_string())
        );
    }
}
