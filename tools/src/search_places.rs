//! `search_places(query, city, radius?, filters?) -> list of places` (spec
//! §4.6), a thin `Tool` wrapper over [`PlacesClient`].

use crate::places::{PlacesClient, SearchFilters};
use crate::{Result, Tool, ToolError};
use agent_core::UserPreferences;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value as Json;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
struct Args {
    query: String,
    city: String,
    radius: Option<f64>,
    #[serde(default)]
    filters: Filters,
}

#[derive(Debug, Deserialize, Default)]
struct Filters {
    #[serde(default)]
    categories: Vec<String>,
    min_rating: Option<f32>,
}

pub struct SearchPlacesTool {
    client: Arc<PlacesClient>,
}

impl SearchPlacesTool {
    pub fn new(client: Arc<PlacesClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for SearchPlacesTool {
    fn name(&self) -> &str {
        "search_places"
    }

    fn description(&self) -> &str {
        "Searches for places (bars, restaurants, museums, etc.) matching a query in a city, \
         optionally bounded by a radius in kilometers and category/rating filters."
    }

    fn schema(&self) -> Json {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {"type": "string", "description": "free-text search query, e.g. 'romantic restaurants'"},
                "city": {"type": "string"},
                "radius": {"type": "number", "description": "search radius in kilometers"},
                "filters": {
                    "type": "object",
                    "properties": {
                        "categories": {"type": "array", "items": {"type": "string"}},
                        "min_rating": {"type": "number"}
                    }
                }
            },
            "required": ["query", "city"]
        })
    }

    async fn invoke(&self, arguments: Json, _preferences: &UserPreferences) -> Result<Json> {
        let args: Args = serde_json::from_value(arguments)
            .map_err(|e| ToolError::InvalidArguments(e.to_string()))?;

        let filters = SearchFilters {
            categories: args.filters.categories,
            min_rating: args.filters.min_rating,
        };

        let places = self
            .client
            .search(&args.query, &args.city, args.radius, &filters)
            .await
            .map_err(|e| ToolError::Upstream(e.to_string()))?;

        serde_json::to_value(places).map_err(|e| ToolError::Upstream(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn invoke_rejects_missing_required_fields() {
        let client = Arc::new(PlacesClient::new("http://localhost", Duration::from_secs(1)));
        let tool = SearchPlacesTool::new(client);
        let err = tool
            .invoke(serde_json::json!({"city": "Zaragoza"}), &UserPreferences::empty("u1"))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[tokio::test]
    async fn invoke_returns_places_on_success() {
        let mut server = mockito::Server::new_async().await;
        let body = serde_json::json!([{
            "id": "p1", "name": "Bar Uno", "address": "addr",
            "coordinates": {"lat": 41.6, "lon": -0.9}, "rating": 4.0,
            "categories": ["bar"], "opening_hours": null
        }]);
        let _mock = server
            .mock("GET", mockito::Matcher::Regex(r"^/places/search.*".to_string()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body.to_string())
            .create_async()
            .await;

        let client = Arc::new(PlacesClient::new(server.url(), Duration::from_secs(5)));
        let tool = SearchPlacesTool::new(client);
        let result = tool
            .invoke(
                serde_json::json!({"query": "bares", "city": "Zaragoza"}),
                &UserPreferences::empty("u1"),
            )
            .await
            .unwrap();
        assert_eq!(result.as_array().unwrap().len(), 1);
    }
}
