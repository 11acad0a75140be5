//! End-to-end story sessions against a scripted transport.
//!
//! These tests drive the public API only: a [`StoryPipeline`] built from its
//! parts, a [`FetchSlot`] over a recording transport, and documents loaded
//! through the rendered session.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::{json, Value};

use localstory::aggregate::{FeatureAggregator, ScopeServices};
use localstory::fetch::{BoxFuture, Fetch, FetchError, FetchRequest, FetchResponse, FetchSlot};
use localstory::geo::{AreaCode, FeatureClient};
use localstory::location::{
    FallbackPolicy, FixedGeolocator, LocationResolver, ReverseLookup, SessionUrl,
};
use localstory::pipeline::{PageOutcome, PipelineError, RenderedSession, StoryPipeline};
use localstory::rules::story::{HOME_VALUE_NODE, INCOME_NODE};
use localstory::rules::StoryProfile;

const CHART_URL: &str = "https://stories.example.com/resources/chart_details_income.json";
const OTHER_URL: &str = "https://cdn.example.com/theme.json";

/// Transport answering by URL substring and recording every request.
#[derive(Clone, Default)]
struct ScriptedFetch {
    routes: Arc<Mutex<Vec<(String, FetchResponse)>>>,
    urls: Arc<Mutex<Vec<String>>>,
}

impl ScriptedFetch {
    fn route(self, pattern: &str, body: impl Into<Vec<u8>>) -> Self {
        let body: Vec<u8> = body.into();
        self.routes
            .lock()
            .push((pattern.to_string(), FetchResponse::json_ok(body)));
        self
    }

    fn json(self, pattern: &str, body: Value) -> Self {
        self.route(pattern, body.to_string())
    }

    fn urls(&self) -> Vec<String> {
        self.urls.lock().clone()
    }

    fn where_clauses(&self) -> Vec<String> {
        self.urls()
            .iter()
            .filter_map(|u| {
                reqwest::Url::parse(u)
                    .unwrap()
                    .query_pairs()
                    .find(|(k, _)| k == "where")
                    .map(|(_, v)| v.into_owned())
            })
            .collect()
    }
}

impl Fetch for ScriptedFetch {
    fn fetch(&self, request: FetchRequest) -> BoxFuture<'_, Result<FetchResponse, FetchError>> {
        let url = request.url().to_string();
        self.urls.lock().push(url.clone());
        let response = self
            .routes
            .lock()
            .iter()
            .find(|(pattern, _)| url.contains(pattern.as_str()))
            .map(|(_, response)| response.clone())
            .unwrap_or_else(|| FetchResponse::new(404, vec![], "not found"));
        Box::pin(async move { Ok(response) })
    }
}

fn services() -> ScopeServices {
    ScopeServices {
        local_url: "https://features.example.com/zip".to_string(),
        regional_url: "https://features.example.com/state".to_string(),
        national_url: "https://features.example.com/nation".to_string(),
        ..ScopeServices::default()
    }
}

fn pipeline(fetch: &ScriptedFetch, resolver: LocationResolver) -> StoryPipeline {
    let client = FeatureClient::new(Arc::new(fetch.clone()));
    StoryPipeline::new(
        resolver,
        FeatureAggregator::new(client, services()),
        StoryProfile::default(),
        Duration::from_secs(3),
    )
}

fn denied_resolver(fallback: &str) -> LocationResolver {
    LocationResolver::new(
        Arc::new(FixedGeolocator::denied()),
        None,
        FallbackPolicy::Fixed(AreaCode::new(fallback).unwrap()),
    )
}

fn local_feature(envelope: Value) -> Value {
    json!({"features": [{
        "attributes": {"ID": "92373", "ST_ABBREV": "CA", "MEDHINC_CY": 75000, "MEDVAL_CY": 2400000, "HAI_CY": 48.6},
        "geometry": {"envelope": envelope}
    }]})
}

fn census() -> ScriptedFetch {
    ScriptedFetch::default()
        .json(
            "/zip/query",
            local_feature(json!({"xmin": 10.0, "ymin": 10.0, "xmax": 20.0, "ymax": 20.0})),
        )
        .json(
            "/state/query",
            json!({"features": [{"attributes": {"NAME": "California", "ST_ABBREV": "CA", "MEDHINC_CY": 91905}}]}),
        )
        .json(
            "/nation/query",
            json!({"features": [{"attributes": {"NAME": "United States", "ST_ABBREV": "US", "MEDHINC_CY": 79068}}]}),
        )
}

fn income_chart() -> Value {
    json!({
        "chartConfig": {"title": {"content": {"text": "Median Household Income"}}},
        "inlineData": {"dataItems": [
            {"category": "placeholder", "field1": 0},
            {"category": "placeholder", "field1": 0},
            {"category": "placeholder", "field1": 0}
        ]}
    })
}

fn story_data() -> Value {
    json!({"publishedData": {
        "nodes": {
            "n-root": {"type": "story", "children": ["n-map-1", "n-map-2"]},
            "n-map-1": {"type": "webmap", "data": {"map": "r-map", "extent": {"xmin": 0}, "zoom": 4}},
            "n-map-2": {"type": "webmap", "data": {"map": "r-map", "extent": {"xmin": 0}, "zoom": 4, "viewpoint": {}}},
            INCOME_NODE: {"type": "infographic", "data": {"title": "", "description": "Median income in [ZIP code]"}},
            HOME_VALUE_NODE: {"type": "infographic", "data": {"title": "", "description": "Home value in [ZIP code]"}}
        },
        "resources": {
            "r-map": {"type": "webmap", "data": {"itemId": "abc", "extent": {"xmin": 10.0, "ymin": 10.0, "xmax": 20.0, "ymax": 20.0}}}
        }
    }})
}

async fn render(pipeline: &StoryPipeline, slot: &Arc<FetchSlot>, url: &str) -> RenderedSession {
    let page = SessionUrl::parse(url).unwrap();
    match pipeline.run(&page, slot.clone()).await.unwrap() {
        PageOutcome::Rendered(session) => session,
        PageOutcome::Redirect(redirect) => panic!("unexpected redirect to {}", redirect.url),
    }
}

#[tokio::test]
async fn test_chart_rows_follow_the_area() {
    let fetch = census().json("chart_details", income_chart());
    let slot = Arc::new(FetchSlot::new(Arc::new(fetch.clone())));
    let pipeline = pipeline(&fetch, denied_resolver("90210"));

    let session = render(&pipeline, &slot, "https://host/?location=92373").await;

    let clauses = fetch.where_clauses();
    assert_eq!(clauses[0], "ID='92373'");
    assert!(clauses.contains(&"ST_ABBREV='CA'".to_string()));

    let chart = session.load(CHART_URL).await.unwrap();
    let rows: Vec<(Value, Value)> = chart["inlineData"]["dataItems"]
        .as_array()
        .unwrap()
        .iter()
        .map(|row| (row["category"].clone(), row["field1"].clone()))
        .collect();
    assert_eq!(
        rows,
        vec![
            (json!("92373"), json!(75000)),
            (json!("California"), json!(91905)),
            (json!("United States"), json!(79068)),
        ]
    );
}

#[tokio::test]
async fn test_denied_geolocation_redirects_without_network() {
    let fetch = ScriptedFetch::default();
    let slot = Arc::new(FetchSlot::new(Arc::new(fetch.clone())));
    let resolver = LocationResolver::new(
        Arc::new(FixedGeolocator::denied()),
        Some(ReverseLookup {
            client: FeatureClient::new(Arc::new(fetch.clone())),
            service_url: services().local_url,
            id_field: "ID".to_string(),
        }),
        FallbackPolicy::Random(vec![AreaCode::new("10001").unwrap()]),
    );

    let page = SessionUrl::parse("https://host/story/").unwrap();
    let outcome = pipeline(&fetch, resolver).run(&page, slot.clone()).await.unwrap();

    match outcome {
        PageOutcome::Redirect(redirect) => {
            assert_eq!(redirect.url, "https://host/story/?location=10001");
        }
        PageOutcome::Rendered(_) => panic!("expected a redirect"),
    }
    assert!(fetch.urls().is_empty());
    assert!(!slot.is_installed());
}

#[tokio::test]
async fn test_story_data_is_localized() {
    let profile = StoryProfile::default();
    let fetch = census().json(&profile.story_data_pattern(), story_data());
    let slot = Arc::new(FetchSlot::new(Arc::new(fetch.clone())));
    let pipeline = pipeline(&fetch, denied_resolver("90210"));

    let session = render(&pipeline, &slot, "https://host/?location=92373").await;
    let doc = session.load(&profile.story_data_url()).await.unwrap();
    let nodes = &doc["publishedData"]["nodes"];

    assert_eq!(nodes[INCOME_NODE]["data"]["title"], "$75,000");
    assert_eq!(nodes[INCOME_NODE]["data"]["description"], "Median income in 92373");
    assert_eq!(nodes[HOME_VALUE_NODE]["data"]["title"], "≥ $2 million");

    // First webmap node keeps its view, later ones lose it
    assert_eq!(nodes["n-map-1"]["data"]["zoom"], 4);
    let second = nodes["n-map-2"]["data"].as_object().unwrap();
    for key in ["extent", "zoom", "viewpoint"] {
        assert!(!second.contains_key(key), "{} should be removed", key);
    }

    let extent = &doc["publishedData"]["resources"]["r-map"]["data"]["extent"];
    for (key, expected) in [("xmin", 9.95), ("ymin", 9.95), ("xmax", 20.05), ("ymax", 20.05)] {
        let actual = extent[key].as_f64().unwrap();
        assert!((actual - expected).abs() < 1e-9, "{}: {} != {}", key, actual, expected);
    }

    // Node order survives the rewrite
    let order: Vec<&String> = nodes.as_object().unwrap().keys().collect();
    assert_eq!(order[0], "n-root");
    assert_eq!(order[1], "n-map-1");
}

#[tokio::test]
async fn test_unmatched_documents_pass_through_untouched() {
    let raw = "{ \"theme\" :  \"dark\",\n  \"n\": 1 }";
    let fetch = census().route("theme.json", raw);
    let slot = Arc::new(FetchSlot::new(Arc::new(fetch.clone())));
    let pipeline = pipeline(&fetch, denied_resolver("90210"));

    let _session = render(&pipeline, &slot, "https://host/?location=92373").await;
    let response = slot.fetch(FetchRequest::get(OTHER_URL)).await.unwrap();

    assert_eq!(response.body().as_ref(), raw.as_bytes());
}

#[tokio::test]
async fn test_failed_rule_only_affects_its_document() {
    let profile = StoryProfile::default();
    let broken_chart = json!({"chartConfig": {"title": {"content": {"text": "Median Household Income"}}}});
    let fetch = census()
        .json("chart_details", broken_chart)
        .json(&profile.story_data_pattern(), story_data());
    let slot = Arc::new(FetchSlot::new(Arc::new(fetch.clone())));
    let pipeline = pipeline(&fetch, denied_resolver("90210"));

    let session = render(&pipeline, &slot, "https://host/?location=92373").await;

    let err = session.load(CHART_URL).await.unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Fetch(FetchError::Mutation { ref rule, .. }) if rule == "chart"
    ));

    let doc = session.load(&profile.story_data_url()).await.unwrap();
    assert_eq!(doc["publishedData"]["nodes"][INCOME_NODE]["data"]["title"], "$75,000");
}

#[tokio::test]
async fn test_missing_national_feature_installs_nothing() {
    let fetch = ScriptedFetch::default()
        .json(
            "/zip/query",
            local_feature(json!({"xmin": 10.0, "ymin": 10.0, "xmax": 20.0, "ymax": 20.0})),
        )
        .json(
            "/state/query",
            json!({"features": [{"attributes": {"NAME": "California", "ST_ABBREV": "CA"}}]}),
        )
        .json("/nation/query", json!({"features": []}))
        .json("chart_details", income_chart());
    let slot = Arc::new(FetchSlot::new(Arc::new(fetch.clone())));

    let page = SessionUrl::parse("https://host/?location=92373").unwrap();
    let err = pipeline(&fetch, denied_resolver("90210"))
        .run(&page, slot.clone())
        .await
        .err()
        .unwrap();

    assert_eq!(err.user_message(), "No data found for ZIP code: 92373");
    assert!(!slot.is_installed());

    let chart: Value = slot
        .fetch(FetchRequest::get(CHART_URL))
        .await
        .unwrap()
        .json()
        .unwrap();
    assert_eq!(chart, income_chart());
}
