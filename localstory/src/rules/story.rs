//! The standard rule set for an embedded census story.
//!
//! A story is made of a story data document, a content web map filtered to
//! the local area, a locator web map and a number of comparison charts. This
//! module knows where each of those lives and which nodes carry local values.

use std::sync::Arc;

use super::{
    format_currency, format_home_value, format_index, ChartRule, FilterTarget, LayerFilterRule,
    MutationError, NodeAction, NodeEdits, RuleSet, SubstitutionRule, WebmapExtentRule,
};
use crate::aggregate::FeatureSet;
use crate::config::StorySettings;
use crate::geo::Feature;

/// Median household income infographic.
pub const INCOME_NODE: &str = "n-93Bl6H";
/// Median home value infographic.
pub const HOME_VALUE_NODE: &str = "n-qeiFVu";
/// Housing affordability index infographic.
pub const AFFORDABILITY_NODE: &str = "n-INkYub";
/// "Change ZIP code" button.
pub const CHANGE_LOCATION_NODE: &str = "n-vhFhqc";
/// "Surprise me" button.
pub const SURPRISE_NODE: &str = "n-uUsrRp";

/// Placeholder in infographic descriptions replaced by the area code.
pub const AREA_PLACEHOLDER: &str = "[ZIP code]";

/// URL substring identifying chart documents.
pub const CHART_PATTERN: &str = "chart_details";

/// Where a story's documents live and how each one is localized.
#[derive(Debug, Clone, PartialEq)]
pub struct StoryProfile {
    pub story_id: String,
    pub content_map_item: String,
    pub locator_map_item: String,
    pub story_service_url: String,
    pub item_data_url: String,
    pub content_filter: LayerFilterRule,
    pub locator_filter: LayerFilterRule,
    pub extent_buffer: f64,
    /// Local attribute holding the area code.
    pub area_field: String,
    pub income_node: String,
    pub home_value_node: String,
    pub affordability_node: String,
    /// Button nodes whose links are neutralized.
    pub link_nodes: Vec<String>,
}

impl Default for StoryProfile {
    fn default() -> Self {
        Self::from_settings(&crate::config::ConfigFile::default().story)
    }
}

impl StoryProfile {
    pub fn from_settings(settings: &StorySettings) -> Self {
        Self {
            story_id: settings.story_id.clone(),
            content_map_item: settings.content_map_item.clone(),
            locator_map_item: settings.locator_map_item.clone(),
            story_service_url: settings.story_service_url.clone(),
            item_data_url: settings.item_data_url.clone(),
            content_filter: LayerFilterRule::new(5, FilterTarget::DefinitionExpression, "ID"),
            locator_filter: LayerFilterRule::new(2, FilterTarget::CustomParameterWhere, "ZIP_STRING"),
            extent_buffer: settings.extent_buffer,
            area_field: "ID".to_string(),
            income_node: INCOME_NODE.to_string(),
            home_value_node: HOME_VALUE_NODE.to_string(),
            affordability_node: AFFORDABILITY_NODE.to_string(),
            link_nodes: vec![CHANGE_LOCATION_NODE.to_string(), SURPRISE_NODE.to_string()],
        }
    }

    /// URL substring of the story data document.
    pub fn story_data_pattern(&self) -> String {
        format!("/embed/view/{}/data", self.story_id)
    }

    pub fn story_data_url(&self) -> String {
        format!(
            "{}{}",
            self.story_service_url.trim_end_matches('/'),
            self.story_data_pattern()
        )
    }

    /// Data URL of a portal item, e.g. a web map.
    pub fn item_data_url(&self, item: &str) -> String {
        format!(
            "{}/{}/data?f=json",
            self.item_data_url.trim_end_matches('/'),
            item
        )
    }

    /// The story's documents in load order: story data, content map, locator map.
    pub fn document_urls(&self) -> Vec<String> {
        vec![
            self.story_data_url(),
            self.item_data_url(&self.content_map_item),
            self.item_data_url(&self.locator_map_item),
        ]
    }

    /// Infographic and button edits for a local feature.
    pub fn node_edits(&self, local: &Feature) -> Result<NodeEdits, MutationError> {
        let code = self.area_code(local)?;
        let value = |field: &str| {
            local
                .attribute_f64(field)
                .ok_or_else(|| MutationError::MissingAttribute(field.to_string()))
        };
        let placeholder = || NodeAction::ReplaceInDescription {
            placeholder: AREA_PLACEHOLDER.to_string(),
            replacement: code.clone(),
        };

        let mut edits = NodeEdits::new()
            .with(
                &self.income_node,
                NodeAction::SetTitle(format_currency(value("MEDHINC_CY")?)),
            )
            .with(&self.income_node, placeholder())
            .with(
                &self.home_value_node,
                NodeAction::SetTitle(format_home_value(value("MEDVAL_CY")?)),
            )
            .with(&self.home_value_node, placeholder())
            .with(
                &self.affordability_node,
                NodeAction::SetTitle(format_index(value("HAI_CY")?)),
            )
            .with(&self.affordability_node, placeholder());

        for node in &self.link_nodes {
            edits = edits.with(node, NodeAction::SetLink("#".to_string()));
        }

        Ok(edits)
    }

    fn area_code(&self, local: &Feature) -> Result<String, MutationError> {
        local
            .attribute_str(&self.area_field)
            .ok_or_else(|| MutationError::MissingAttribute(self.area_field.clone()))
    }
}

/// Builds the rule set that localizes a story to `features`.
///
/// Rules are registered in this order: content web map, locator web map,
/// charts, story data.
pub fn story_rules(profile: &StoryProfile, features: &FeatureSet) -> RuleSet {
    let profile = Arc::new(profile.clone());
    let mut rules = RuleSet::new();

    let filters = [
        ("content-map", &profile.content_map_item, &profile.content_filter),
        ("locator-map", &profile.locator_map_item, &profile.locator_filter),
    ];
    for (name, item, filter) in filters {
        let filter = filter.clone();
        let local = features.local.clone();
        let profile = profile.clone();
        rules.push(SubstitutionRule::new(
            name,
            format!("{}/data", item),
            move |doc| filter.apply(doc, &profile.area_code(&local)?),
        ));
    }

    rules.push(ChartRule::new(features.clone()).into_rule(CHART_PATTERN));

    let webmap = WebmapExtentRule::new(profile.extent_buffer);
    let local = features.local.clone();
    let pattern = profile.story_data_pattern();
    rules.push(SubstitutionRule::new("story-data", pattern, move |doc| {
        webmap.apply(doc, local.extent.as_ref())?;
        profile.node_edits(&local)?.apply(doc)
    }));

    rules
}
