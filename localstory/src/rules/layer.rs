//! Web map layer filter rewriting.

use serde_json::Value;

use super::{object_mut, MutationError, SubstitutionRule};

/// Which filter property of an operational layer is overwritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterTarget {
    /// `layerDefinition.definitionExpression`
    DefinitionExpression,
    /// `customParameters.where`
    CustomParameterWhere,
}

impl FilterTarget {
    fn parent(&self) -> &'static str {
        match self {
            FilterTarget::DefinitionExpression => "layerDefinition",
            FilterTarget::CustomParameterWhere => "customParameters",
        }
    }

    fn key(&self) -> &'static str {
        match self {
            FilterTarget::DefinitionExpression => "definitionExpression",
            FilterTarget::CustomParameterWhere => "where",
        }
    }
}

/// Restricts one operational layer of a web map to a single area.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerFilterRule {
    pub layer_index: usize,
    pub target: FilterTarget,
    pub field: String,
}

impl LayerFilterRule {
    pub fn new(layer_index: usize, target: FilterTarget, field: impl Into<String>) -> Self {
        Self {
            layer_index,
            target,
            field: field.into(),
        }
    }

    /// The filter expression selecting `code`.
    pub fn expression(&self, code: &str) -> String {
        format!("{} = '{}'", self.field, code.replace('\'', "''"))
    }

    /// Writes the filter for `code` into a web map document.
    pub fn apply(&self, document: &mut Value, code: &str) -> Result<(), MutationError> {
        let pointer = format!(
            "/operationalLayers/{}/{}",
            self.layer_index,
            self.target.parent()
        );
        let parent = object_mut(document, &pointer)?;
        parent.insert(
            self.target.key().to_string(),
            Value::String(self.expression(code)),
        );
        Ok(())
    }

    /// Binds this filter to an area code, producing a substitution rule.
    pub fn into_rule(
        self,
        name: impl Into<String>,
        pattern: impl Into<String>,
        code: impl Into<String>,
    ) -> SubstitutionRule {
        let code = code.into();
        SubstitutionRule::new(name, pattern, move |doc| self.apply(doc, &code))
    }
}
