//! Comparison chart rewriting.

use serde_json::Value;
use tracing::debug;

use super::{pointer_mut, MutationError, SubstitutionRule};
use crate::aggregate::{FeatureSet, Scope};

const TITLE_POINTER: &str = "/chartConfig/title/content/text";

/// What a comparison chart measures, as classified from its title.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartSubject {
    Income,
    HomeValue,
    Affordability,
}

impl ChartSubject {
    /// Classifies a chart title by the first keyword it contains.
    ///
    /// Keywords are checked in a fixed order, so a title mentioning both
    /// income and value is an income chart.
    pub fn classify(title: &str) -> Option<Self> {
        let title = title.to_lowercase();
        if title.contains("income") {
            Some(ChartSubject::Income)
        } else if title.contains("value") {
            Some(ChartSubject::HomeValue)
        } else if title.contains("affordability") {
            Some(ChartSubject::Affordability)
        } else {
            None
        }
    }

    /// Attribute holding this measure.
    pub fn field(&self) -> &'static str {
        match self {
            ChartSubject::Income => "MEDHINC_CY",
            ChartSubject::HomeValue => "MEDVAL_CY",
            ChartSubject::Affordability => "HAI_CY",
        }
    }
}

/// Rewrites the three rows of a local/regional/national comparison chart.
#[derive(Debug, Clone)]
pub struct ChartRule {
    features: FeatureSet,
    local_label_field: String,
    area_label_field: String,
}

impl ChartRule {
    pub fn new(features: FeatureSet) -> Self {
        Self {
            features,
            local_label_field: "ID".to_string(),
            area_label_field: "NAME".to_string(),
        }
    }

    pub fn apply(&self, document: &mut Value) -> Result<(), MutationError> {
        let title = document
            .pointer(TITLE_POINTER)
            .and_then(Value::as_str)
            .map(str::to_string);

        let Some(subject) = title.as_deref().and_then(ChartSubject::classify) else {
            debug!(title = ?title, "Unknown chart type, leaving chart unchanged");
            return Ok(());
        };

        debug!(title = ?title, field = subject.field(), "Rewriting chart rows");

        for (row, scope) in [Scope::Local, Scope::Regional, Scope::National]
            .into_iter()
            .enumerate()
        {
            let feature = self.features.get(scope);
            let label_field = match scope {
                Scope::Local => &self.local_label_field,
                Scope::Regional | Scope::National => &self.area_label_field,
            };

            let pointer = format!("/inlineData/dataItems/{}", row);
            let item = pointer_mut(document, &pointer)?
                .as_object_mut()
                .ok_or_else(|| MutationError::UnexpectedType {
                    path: pointer.clone(),
                    expected: "object",
                })?;

            let category = required(feature.attribute(label_field), label_field)?;
            let value = required(feature.attribute(subject.field()), subject.field())?;
            item.insert("category".to_string(), category);
            item.insert("field1".to_string(), value);
        }

        Ok(())
    }

    pub fn into_rule(self, pattern: impl Into<String>) -> SubstitutionRule {
        SubstitutionRule::new("chart", pattern, move |doc| self.apply(doc))
    }
}

fn required(value: Option<&Value>, field: &str) -> Result<Value, MutationError> {
    value
        .filter(|v| !v.is_null())
        .cloned()
        .ok_or_else(|| MutationError::MissingAttribute(field.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::Feature;
    use serde_json::json;
    use std::sync::Arc;

    fn feature(attributes: Value) -> Arc<Feature> {
        Arc::new(serde_json::from_value(json!({ "attributes": attributes })).unwrap())
    }

    fn features() -> FeatureSet {
        FeatureSet {
            local: feature(json!({"ID": "92373", "MEDHINC_CY": 75000, "MEDVAL_CY": 610000, "HAI_CY": 61})),
            regional: feature(json!({"NAME": "California", "MEDHINC_CY": 91000, "MEDVAL_CY": 720000, "HAI_CY": 55})),
            national: feature(json!({"NAME": "United States", "MEDHINC_CY": 79000, "MEDVAL_CY": 350000, "HAI_CY": 98})),
        }
    }

    fn chart(title: &str) -> Value {
        json!({
            "chartConfig": {"title": {"content": {"text": title}}},
            "inlineData": {
                "dataItems": [
                    {"category": "a", "field1": 1},
                    {"category": "b", "field1": 2},
                    {"category": "c", "field1": 3}
                ]
            }
        })
    }

    #[test]
    fn test_classify_precedence() {
        assert_eq!(
            ChartSubject::classify("Median Household Income"),
            Some(ChartSubject::Income)
        );
        assert_eq!(
            ChartSubject::classify("Median Home VALUE"),
            Some(ChartSubject::HomeValue)
        );
        assert_eq!(
            ChartSubject::classify("Housing Affordability Index"),
            Some(ChartSubject::Affordability)
        );
        assert_eq!(
            ChartSubject::classify("Income and home value"),
            Some(ChartSubject::Income)
        );
        assert_eq!(ChartSubject::classify("Population"), None);
    }

    #[test]
    fn test_income_chart_rows() {
        let mut doc = chart("Median Household Income");
        ChartRule::new(features()).apply(&mut doc).unwrap();

        let items = &doc["inlineData"]["dataItems"];
        assert_eq!(items[0], json!({"category": "92373", "field1": 75000}));
        assert_eq!(items[1], json!({"category": "California", "field1": 91000}));
        assert_eq!(items[2], json!({"category": "United States", "field1": 79000}));
    }

    #[test]
    fn test_affordability_chart_uses_index_field() {
        let mut doc = chart("Housing affordability");
        ChartRule::new(features()).apply(&mut doc).unwrap();
        assert_eq!(doc["inlineData"]["dataItems"][2]["field1"], 98);
    }

    #[test]
    fn test_unknown_title_is_noop() {
        let mut doc = chart("Population growth");
        let before = doc.clone();
        ChartRule::new(features()).apply(&mut doc).unwrap();
        assert_eq!(doc, before);

        let mut untitled = json!({"inlineData": {"dataItems": []}});
        let before = untitled.clone();
        ChartRule::new(features()).apply(&mut untitled).unwrap();
        assert_eq!(untitled, before);
    }

    #[test]
    fn test_missing_attribute_is_error() {
        let mut set = features();
        set.regional = feature(json!({"NAME": "California", "MEDVAL_CY": 720000}));

        let mut doc = chart("Median Household Income");
        let err = ChartRule::new(set.clone()).apply(&mut doc).unwrap_err();
        assert_eq!(err, MutationError::MissingAttribute("MEDHINC_CY".to_string()));

        set.national = feature(json!({"NAME": null, "MEDHINC_CY": 79000}));
        set.regional = features().regional;
        let err = ChartRule::new(set).apply(&mut chart("Income")).unwrap_err();
        assert_eq!(err, MutationError::MissingAttribute("NAME".to_string()));
    }

    #[test]
    fn test_missing_rows_is_error() {
        let mut doc = json!({
            "chartConfig": {"title": {"content": {"text": "Income"}}},
            "inlineData": {"dataItems": [{"category": "a"}]}
        });
        let err = ChartRule::new(features()).apply(&mut doc).unwrap_err();
        assert_eq!(
            err,
            MutationError::MissingPath("/inlineData/dataItems/1".to_string())
        );
    }
}
