//! Map extent rewriting for story documents.

use serde_json::Value;
use tracing::debug;

use super::{object_mut, MutationError};
use crate::geo::Envelope;

const NODES_POINTER: &str = "/publishedData/nodes";
const RESOURCES_POINTER: &str = "/publishedData/resources";

/// Viewpoint keys stripped from every webmap node after the first.
const VIEWPOINT_KEYS: [&str; 4] = ["extent", "center", "viewpoint", "zoom"];

/// Default extent buffer in degrees.
pub const DEFAULT_EXTENT_BUFFER: f64 = 0.05;

/// Points every web map in a story at the local feature.
///
/// Webmap nodes after the first lose their saved viewpoints so they inherit the
/// resource extent, and every webmap resource gets the local feature's extent
/// expanded by `buffer`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WebmapExtentRule {
    pub buffer: f64,
}

impl Default for WebmapExtentRule {
    fn default() -> Self {
        Self {
            buffer: DEFAULT_EXTENT_BUFFER,
        }
    }
}

impl WebmapExtentRule {
    pub fn new(buffer: f64) -> Self {
        Self { buffer }
    }

    pub fn apply(&self, document: &mut Value, extent: Option<&Envelope>) -> Result<(), MutationError> {
        let nodes = object_mut(document, NODES_POINTER)?;
        for (id, node) in nodes.iter_mut().filter(|(_, n)| is_webmap(n)).skip(1) {
            if let Some(data) = node.get_mut("data").and_then(Value::as_object_mut) {
                debug!(node = %id, "Clearing webmap node viewpoint");
                for key in VIEWPOINT_KEYS {
                    data.remove(key);
                }
            }
        }

        let resources = object_mut(document, RESOURCES_POINTER)?;
        for (id, resource) in resources.iter_mut().filter(|(_, r)| is_webmap(r)) {
            let extent = extent.ok_or(MutationError::MissingExtent)?;
            let buffered = serde_json::to_value(extent.buffered(self.buffer)).map_err(|_| {
                MutationError::UnexpectedType {
                    path: format!("{}/{}/data/extent", RESOURCES_POINTER, id),
                    expected: "envelope",
                }
            })?;

            let data = resource
                .get_mut("data")
                .and_then(Value::as_object_mut)
                .ok_or_else(|| {
                    MutationError::MissingPath(format!("{}/{}/data", RESOURCES_POINTER, id))
                })?;

            debug!(resource = %id, "Setting webmap resource extent");
            data.insert("extent".to_string(), buffered);
        }

        Ok(())
    }
}

fn is_webmap(entry: &Value) -> bool {
    entry.get("type").and_then(Value::as_str) == Some("webmap")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn extent() -> Envelope {
        Envelope {
            xmin: 10.0,
            ymin: 10.0,
            xmax: 20.0,
            ymax: 20.0,
            spatial_reference: None,
        }
    }

    fn story() -> Value {
        json!({
            "publishedData": {
                "nodes": {
                    "n-text": {"type": "text", "data": {"text": "hello"}},
                    "n-map1": {"type": "webmap", "data": {"extent": {"xmin": 0}, "zoom": 4, "map": "r-1"}},
                    "n-map2": {"type": "webmap", "data": {"extent": {"xmin": 0}, "center": [1, 2], "viewpoint": {}, "zoom": 7, "map": "r-1"}},
                    "n-map3": {"type": "webmap", "data": {"zoom": 9, "map": "r-2"}}
                },
                "resources": {
                    "r-1": {"type": "webmap", "data": {"itemId": "abc", "extent": {"xmin": 0}}},
                    "r-2": {"type": "webmap", "data": {"itemId": "def"}},
                    "r-img": {"type": "image", "data": {"src": "x.png"}}
                }
            }
        })
    }

    #[test]
    fn test_first_webmap_node_keeps_viewpoint() {
        let mut doc = story();
        WebmapExtentRule::default().apply(&mut doc, Some(&extent())).unwrap();

        let nodes = &doc["publishedData"]["nodes"];
        assert_eq!(nodes["n-map1"]["data"]["zoom"], 4);
        assert!(nodes["n-map1"]["data"].get("extent").is_some());

        for id in ["n-map2", "n-map3"] {
            let data = nodes[id]["data"].as_object().unwrap();
            for key in VIEWPOINT_KEYS {
                assert!(!data.contains_key(key), "{} still has {}", id, key);
            }
            assert!(data.contains_key("map"));
        }
        assert_eq!(nodes["n-text"]["data"]["text"], "hello");
    }

    #[test]
    fn test_resources_get_buffered_extent() {
        let mut doc = story();
        WebmapExtentRule::new(0.05).apply(&mut doc, Some(&extent())).unwrap();

        let resources = &doc["publishedData"]["resources"];
        for id in ["r-1", "r-2"] {
            let e = &resources[id]["data"]["extent"];
            assert!((e["xmin"].as_f64().unwrap() - 9.95).abs() < 1e-9);
            assert!((e["ymin"].as_f64().unwrap() - 9.95).abs() < 1e-9);
            assert!((e["xmax"].as_f64().unwrap() - 20.05).abs() < 1e-9);
            assert!((e["ymax"].as_f64().unwrap() - 20.05).abs() < 1e-9);
            assert_eq!(e["spatialReference"]["wkid"], 4326);
        }
        assert_eq!(resources["r-1"]["data"]["itemId"], "abc");
        assert!(resources["r-img"]["data"].get("extent").is_none());
    }

    #[test]
    fn test_missing_extent_is_error() {
        let mut doc = story();
        let err = WebmapExtentRule::default().apply(&mut doc, None).unwrap_err();
        assert_eq!(err, MutationError::MissingExtent);
    }

    #[test]
    fn test_no_webmap_resources_needs_no_extent() {
        let mut doc = json!({"publishedData": {"nodes": {}, "resources": {}}});
        WebmapExtentRule::default().apply(&mut doc, None).unwrap();
    }

    #[test]
    fn test_missing_published_data_is_error() {
        let mut doc = json!({"other": true});
        let err = WebmapExtentRule::default()
            .apply(&mut doc, Some(&extent()))
            .unwrap_err();
        assert_eq!(err, MutationError::MissingPath(NODES_POINTER.to_string()));
    }
}
