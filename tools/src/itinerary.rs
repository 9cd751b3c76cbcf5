//! `create_itinerary(...)` (spec §4.6): composes `search_places`, ranks by
//! rating, orders stops with a greedy nearest-neighbor tour, and slices the
//! requested duration across stops.

use crate::places::{GeoPoint, Place, PlacesClient, SearchFilters};
use crate::{Result, Tool, ToolError};
use agent_core::UserPreferences;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use std::sync::Arc;

const MIN_STOP_MINUTES: u32 = 15;

#[derive(Debug, Deserialize)]
struct Args {
    query: String,
    city: String,
    num_locations: usize,
    duration: String,
    num_people: i64,
    #[serde(default)]
    vibe: Option<String>,
    #[serde(default)]
    budget: Option<String>,
    transport: String,
    #[serde(default)]
    coordinates: Option<GeoPoint>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ItineraryStep {
    pub place: Place,
    pub start_offset_minutes: u32,
    pub stay_minutes: u32,
    pub travel_minutes_from_previous: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Itinerary {
    pub title: String,
    pub steps: Vec<ItineraryStep>,
    pub total_duration_minutes: u32,
    pub total_distance_km: f64,
    pub estimated_cost_usd: f64,
    pub partial: bool,
    pub metadata: Json,
}

/// Parses a duration expression into minutes (spec §4.6): explicit numeric
/// quantities ("2 hours", "30 min") or the fixed phrases "evening" (3h),
/// "quick" (30min), "full day" (8h).
pub fn parse_duration_minutes(input: &str) -> Option<u32> {
    let lower = input.trim().to_lowercase();
    match lower.as_str() {
        "evening" => return Some(180),
        "quick" => return Some(30),
        "full day" => return Some(480),
        _ => {}
    }

    let mut chars = lower.chars().peekable();
    let mut num_str = String::new();
    while let Some(&c) = chars.peek() {
        if c.is_ascii_digit() || c == '.' {
            num_str.push(c);
            chars.next();
        } else {
            break;
        }
    }
    if num_str.is_empty() {
        return None;
    }
    let value: f64 = num_str.parse().ok()?;
    let rest: String = chars.collect();
    let rest = rest.trim();

    if rest.starts_with("hour") || rest.starts_with("hr") || rest == "h" {
        Some((value * 60.0).round() as u32)
    } else if rest.starts_with("min") || rest == "m" {
        Some(value.round() as u32)
    } else {
        None
    }
}

fn mean_speed_kmh(transport: &str) -> f64 {
    match transport {
        "walking" => 5.0,
        "driving" => 30.0,
        "transit" => 20.0,
        _ => 5.0,
    }
}

fn per_stop_cost_usd(budget: Option<&str>) -> f64 {
    match budget {
        Some("low") => 10.0,
        Some("high") => 50.0,
        _ => 25.0,
    }
}

/// Builds the search filters to narrow candidate places by the user's stored
/// preferences (spec §4.6: `create_itinerary` "selects top-rated matches
/// filtered by preferences"). Recognizes `favorites["preferred_categories"]`
/// (an array of category strings) and `favorites["min_rating"]` (a number).
/// Absent or malformed entries are ignored rather than rejected.
fn filters_from_preferences(preferences: &UserPreferences) -> SearchFilters {
    let categories = preferences
        .favorites
        .get("preferred_categories")
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default();

    let min_rating = preferences
        .favorites
        .get("min_rating")
        .and_then(|v| v.as_f64())
        .map(|v| v as f32);

    SearchFilters { categories, min_rating }
}

/// Greedy nearest-neighbor tour starting from `start` (spec §4.6: "starting
/// from either the user's coordinates or the first-selected place").
fn nearest_neighbor_order(start: GeoPoint, mut remaining: Vec<Place>) -> Vec<Place> {
    let mut ordered = Vec::with_capacity(remaining.len());
    let mut current = start;

    while !remaining.is_empty() {
        let (idx, _) = remaining
            .iter()
            .enumerate()
            .map(|(i, place)| (i, current.distance_km(&place.coordinates)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .expect("remaining is non-empty");
        let place = remaining.remove(idx);
        current = place.coordinates;
        ordered.push(place);
    }

    ordered
}

/// Slices `total_minutes` across `n` stops, each stop getting at least
/// [`MIN_STOP_MINUTES`], the remainder after subtracting inter-stop travel
/// time (spec §4.6: "assigns per-stop time slots by distributing duration
/// minus inter-stop travel across stops, minimum 15 minutes per stop").
fn build_steps(
    ordered: Vec<Place>,
    start: GeoPoint,
    total_minutes: u32,
    transport: &str,
) -> (Vec<ItineraryStep>, f64) {
    let n = ordered.len();
    if n == 0 {
        return (Vec::new(), 0.0);
    }

    let speed = mean_speed_kmh(transport);
    let mut travels = Vec::with_capacity(n);
    let mut previous = start;
    let mut total_distance_km = 0.0;

    for place in &ordered {
        let distance = previous.distance_km(&place.coordinates);
        total_distance_km += distance;
        let travel_minutes = ((distance / speed) * 60.0).round() as u32;
        travels.push(travel_minutes);
        previous = place.coordinates;
    }

    let total_travel: u32 = travels.iter().sum();
    let available = total_minutes.saturating_sub(total_travel);
    let even_share = available / n as u32;
    let stay_minutes = even_share.max(MIN_STOP_MINUTES);

    let mut steps = Vec::with_capacity(n);
    let mut offset = 0u32;
    for (place, travel_minutes) in ordered.into_iter().zip(travels) {
        offset += travel_minutes;
        steps.push(ItineraryStep {
            place,
            start_offset_minutes: offset,
            stay_minutes,
            travel_minutes_from_previous: travel_minutes,
        });
        offset += stay_minutes;
    }

    (steps, total_distance_km)
}

pub struct CreateItineraryTool {
    client: Arc<PlacesClient>,
}

impl CreateItineraryTool {
    pub fn new(client: Arc<PlacesClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for CreateItineraryTool {
    fn name(&self) -> &str {
        "create_itinerary"
    }

    fn description(&self) -> &str {
        "Builds a routed, time-sliced itinerary of places for a group, given a city, the \
         number of stops wanted, available duration, group size, vibe, budget, and transport mode."
    }

    fn schema(&self) -> Json {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {"type": "string"},
                "city": {"type": "string"},
                "num_locations": {"type": "integer", "minimum": 1},
                "duration": {"type": "string", "description": "e.g. '2 hours', '30 min', 'evening', 'full day'"},
                "num_people": {"type": "integer", "minimum": 1},
                "vibe": {"type": "string"},
                "budget": {"type": "string", "enum": ["low", "medium", "high"]},
                "transport": {"type": "string", "enum": ["walking", "driving", "transit"]},
                "coordinates": {
                    "type": "object",
                    "properties": {"lat": {"type": "number"}, "lon": {"type": "number"}}
                }
            },
            "required": ["query", "city", "num_locations", "duration", "num_people", "transport"]
        })
    }

    async fn invoke(&self, arguments: Json, preferences: &UserPreferences) -> Result<Json> {
        let args: Args = serde_json::from_value(arguments)
            .map_err(|e| ToolError::InvalidArguments(e.to_string()))?;

        let total_minutes = parse_duration_minutes(&args.duration)
            .ok_or_else(|| ToolError::InvalidArguments(format!("unrecognized duration: {}", args.duration)))?;

        let filters = filters_from_preferences(preferences);
        let mut found = self
            .client
            .search(&args.query, &args.city, None, &filters)
            .await
            .map_err(|e| ToolError::Upstream(e.to_string()))?;

        found.sort_by(|a, b| b.rating.total_cmp(&a.rating));
        let partial = found.len() < args.num_locations;
        found.truncate(args.num_locations);

        let start = args
            .coordinates
            .or_else(|| found.first().map(|p| p.coordinates))
            .unwrap_or(GeoPoint { lat: 0.0, lon: 0.0 });

        let ordered = nearest_neighbor_order(start, found);
        let (steps, total_distance_km) = build_steps(ordered, start, total_minutes, &args.transport);

        let estimated_cost_usd =
            per_stop_cost_usd(args.budget.as_deref()) * steps.len() as f64 * args.num_people.max(1) as f64;

        let itinerary = Itinerary {
            title: format!("{} plan in {}", args.vibe.clone().unwrap_or_else(|| "Custom".into()), args.city),
            total_duration_minutes: steps
                .iter()
                .map(|s| s.stay_minutes + s.travel_minutes_from_previous)
                .sum(),
            steps,
            total_distance_km,
            estimated_cost_usd,
            partial,
            metadata: serde_json::json!({
                "transport": args.transport,
                "vibe": args.vibe,
                "budget": args.budget,
                "requested_num_locations": args.num_locations,
            }),
        };

        serde_json::to_value(itinerary).map_err(|e| ToolError::Upstream(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn parses_explicit_numeric_durations() {
        assert_eq!(parse_duration_minutes("2 hours"), Some(120));
        assert_eq!(parse_duration_minutes("30 min"), Some(30));
        assert_eq!(parse_duration_minutes("90 minutes"), Some(90));
        assert_eq!(parse_duration_minutes("1.5 hours"), Some(90));
    }

    #[test]
    fn parses_named_phrases() {
        assert_eq!(parse_duration_minutes("evening"), Some(180));
        assert_eq!(parse_duration_minutes("quick"), Some(30));
        assert_eq!(parse_duration_minutes("full day"), Some(480));
    }

    #[test]
    fn rejects_unrecognized_duration() {
        assert_eq!(parse_duration_minutes("sometime"), None);
    }

    #[test]
    fn nearest_neighbor_visits_closest_first() {
        let start = GeoPoint { lat: 0.0, lon: 0.0 };
        let far = Place {
            id: "far".into(), name: "Far".into(), address: "".into(),
            coordinates: GeoPoint { lat: 10.0, lon: 10.0 }, rating: 5.0,
            categories: vec![], opening_hours: None,
        };
        let near = Place {
            id: "near".into(), name: "Near".into(), address: "".into(),
            coordinates: GeoPoint { lat: 0.1, lon: 0.1 }, rating: 3.0,
            categories: vec![], opening_hours: None,
        };
        let ordered = nearest_neighbor_order(start, vec![far.clone(), near.clone()]);
        assert_eq!(ordered[0].id, "near");
        assert_eq!(ordered[1].id, "far");
    }

    #[test]
    fn build_steps_respects_minimum_stay_and_travel_offsets() {
        let start = GeoPoint { lat: 0.0, lon: 0.0 };
        let places = vec![
            Place {
                id: "a".into(), name: "A".into(), address: "".into(),
                coordinates: GeoPoint { lat: 0.01, lon: 0.0 }, rating: 4.0,
                categories: vec![], opening_hours: None,
            },
            Place {
                id: "b".into(), name: "B".into(), address: "".into(),
                coordinates: GeoPoint { lat: 0.02, lon: 0.0 }, rating: 4.0,
                categories: vec![], opening_hours: None,
            },
        ];
        let (steps, _distance) = build_steps(places, start, 10_000, "walking");
        assert_eq!(steps.len(), 2);
        for step in &steps {
            assert!(step.stay_minutes >= MIN_STOP_MINUTES);
        }
        assert!(steps[1].start_offset_minutes > steps[0].start_offset_minutes);
    }

    #[tokio::test]
    async fn invoke_flags_partial_when_fewer_places_found_than_requested() {
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
        let tool = CreateItineraryTool::new(client);
        let result = tool
            .invoke(
                serde_json::json!({
                    "query": "bares", "city": "Zaragoza", "num_locations": 3,
                    "duration": "2 hours", "num_people": 2, "transport": "walking"
                }),
                &UserPreferences::empty("u1"),
            )
            .await
            .unwrap();

        let itinerary: Itinerary = serde_json::from_value(result).unwrap();
        assert!(itinerary.partial);
        assert_eq!(itinerary.steps.len(), 1);
    }

    #[tokio::test]
    async fn invoke_rejects_unrecognized_duration() {
        let client = Arc::new(PlacesClient::new("http://localhost", Duration::from_secs(1)));
        let tool = CreateItineraryTool::new(client);
        let err = tool
            .invoke(
                serde_json::json!({
                    "query": "bares", "city": "Zaragoza", "num_locations": 1,
                    "duration": "whenever", "num_people": 1, "transport": "walking"
                }),
                &UserPreferences::empty("u1"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[test]
    fn filters_from_preferences_reads_categories_and_min_rating() {
        let mut preferences = UserPreferences::empty("u1");
        preferences.favorites.insert(
            "preferred_categories".into(),
            serde_json::json!(["museum", "park"]),
        );
        preferences.favorites.insert("min_rating".into(), serde_json::json!(4.5));

        let filters = filters_from_preferences(&preferences);
        assert_eq!(filters.categories, vec!["museum".to_string(), "park".to_string()]);
        assert_eq!(filters.min_rating, Some(4.5));
    }

    #[test]
    fn filters_from_preferences_defaults_when_favorites_absent() {
        let preferences = UserPreferences::empty("u1");
        let filters = filters_from_preferences(&preferences);
        assert!(filters.categories.is_empty());
        assert_eq!(filters.min_rating, None);
    }

    #[tokio::test]
    async fn invoke_passes_preference_filters_to_the_places_client() {
        let mut server = mockito::Server::new_async().await;
        let body = serde_json::json!([{
            "id": "p1", "name": "Museo Uno", "address": "addr",
            "coordinates": {"lat": 41.6, "lon": -0.9}, "rating": 4.8,
            "categories": ["museum"], "opening_hours": null
        }]);
        let _mock = server
            .mock(
                "GET",
                mockito::Matcher::Regex(r"^/places/search.*categories=museum.*min_rating=4.5.*".to_string()),
            )
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body.to_string())
            .create_async()
            .await;

        let mut preferences = UserPreferences::empty("u1");
        preferences
            .favorites
            .insert("preferred_categories".into(), serde_json::json!(["museum"]));
        preferences.favorites.insert("min_rating".into(), serde_json::json!(4.5));

        let client = Arc::new(PlacesClient::new(server.url(), Duration::from_secs(5)));
        let tool = CreateItineraryTool::new(client);
        let result = tool
            .invoke(
                serde_json::json!({
                    "query": "museos", "city": "Zaragoza", "num_locations": 1,
                    "duration": "2 hours", "num_people": 1, "transport": "walking"
                }),
                &preferences,
            )
            .await
            .unwrap();

        let itinerary: Itinerary = serde_json::from_value(result).unwrap();
        assert_eq!(itinerary.steps.len(), 1);
        assert_eq!(itinerary.steps[0].place.id, "p1");
    }
}
