//! # Plan-parameter extraction
//!
//! `PlanContextExtractor` pulls itinerary-planning slots out of a user's
//! query in a language-specific but still rule-based way (spec §4.3),
//! mirroring the teacher's `extract_preferences`/`format_message`
//! pure-function style in `memory::strategies`: small, independently
//! testable functions over plain text, no I/O.

use agent_core::Language;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use std::collections::HashSet;

const PLACE_TYPES: &[&str] = &[
    "bars", "restaurants", "cafes", "museums", "parks", "clubs",
];
const VIBES: &[&str] = &[
    "romantic", "party", "chill", "adventurous", "celebratory", "tired",
];
const BUDGETS: &[&str] = &["low", "medium", "high"];
const TRANSPORTS: &[&str] = &["walking", "driving", "transit"];

/// Known cities the extractor can recognize without a gazetteer service.
/// Kept intentionally small; callers needing a larger list can extend this
/// via [`PlanContextExtractor::with_cities`].
const DEFAULT_CITIES: &[&str] = &["madrid", "barcelona", "zaragoza", "valencia", "sevilla"];

/// Structured itinerary-planning slots extracted from conversation turns.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PlanParams {
    pub duration: Option<String>,
    pub num_people: Option<i64>,
    pub cities: Vec<String>,
    pub place_types: Vec<String>,
    pub vibe: Option<String>,
    pub budget: Option<String>,
    pub transport: Option<String>,
}

impl PlanParams {
    pub fn is_ready(&self) -> bool {
        self.duration.is_some()
            && self.num_people.is_some()
            && !self.cities.is_empty()
            && !self.place_types.is_empty()
            && self.vibe.is_some()
    }

    /// Right-biased merge: `other`'s scalar fields win when present, list
    /// fields union without duplicates. Idempotent on the right per spec
    /// §8 (`merge(a, b) == merge(a, merge(b, b))`).
    pub fn merge(&self, other: &PlanParams) -> PlanParams {
        let mut cities = self.cities.clone();
        for city in &other.cities {
            if !cities.contains(city) {
                cities.push(city.clone());
            }
        }
        let mut place_types = self.place_types.clone();
        for pt in &other.place_types {
            if !place_types.contains(pt) {
                place_types.push(pt.clone());
            }
        }

        PlanParams {
            duration: other.duration.clone().or_else(|| self.duration.clone()),
            num_people: other.num_people.or(self.num_people),
            cities,
            place_types,
            vibe: other.vibe.clone().or_else(|| self.vibe.clone()),
            budget: other.budget.clone().or_else(|| self.budget.clone()),
            transport: other.transport.clone().or_else(|| self.transport.clone()),
        }
    }

    pub fn to_json(&self) -> Json {
        serde_json::to_value(self).unwrap_or(Json::Null)
    }

    /// Recovers a `PlanParams` from a previously persisted `plan_params`
    /// JSON object (spec §8: round-trip through `extra_metadata`).
    pub fn from_json(value: &Json) -> PlanParams {
        serde_json::from_value(value.clone()).unwrap_or_default()
    }
}

pub struct PlanContextExtractor {
    cities: Vec<String>,
}

impl Default for PlanContextExtractor {
    fn default() -> Self {
        Self {
            cities: DEFAULT_CITIES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl PlanContextExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cities(cities: Vec<String>) -> Self {
        Self {
            cities: cities.into_iter().map(|c| c.to_lowercase()).collect(),
        }
    }

    /// Extracts whatever slots are recognizable in `query`, for the given
    /// language. Unrecognized slots are left unset rather than guessed.
    pub fn extract(&self, query: &str, language: Language) -> PlanParams {
        let lowered = query.to_lowercase();
        PlanParams {
            duration: extract_duration(&lowered, language),
            num_people: extract_num_people(&lowered, language),
            cities: extract_cities(&lowered, &self.cities),
            place_types: extract_place_types(&lowered, language),
            vibe: extract_vibe(&lowered, language),
            budget: extract_budget(&lowered),
            transport: extract_transport(&lowered, language),
        }
    }
}

fn extract_duration(text: &str, language: Language) -> Option<String> {
    let full_day_tokens: &[&str] = match language {
        Language::Es => &["todo el dia", "dia completo"],
        Language::Ca => &["tot el dia"],
        Language::Gl => &["todo o dia"],
        Language::En => &["full day", "all day"],
    };
    for token in full_day_tokens {
        if text.contains(token) {
            return Some("full day".to_string());
        }
    }

    let unit_words: &[(&str, &str)] = match language {
        Language::Es | Language::Ca | Language::Gl => {
            &[("hora", "hours"), ("min", "min")]
        }
        Language::En => &[("hour", "hours"), ("min", "min")],
    };

    for (word, unit) in unit_words {
        if let Some(idx) = text.find(word) {
            if let Some(number) = number_before(text, idx) {
                return Some(format!("{number} {unit}"));
            }
        }
    }
    None
}

fn extract_num_people(text: &str, language: Language) -> Option<i64> {
    let group_words: &[&str] = match language {
        Language::Es => &["personas", "persona", "gente"],
        Language::Ca => &["persones", "persona"],
        Language::Gl => &["persoas", "persoa"],
        Language::En => &["people", "person", "party of"],
    };
    for word in group_words {
        if let Some(idx) = text.find(word) {
            if let Some(number) = number_before(text, idx) {
                return number.parse().ok();
            }
        }
    }
    None
}

fn extract_cities(text: &str, known_cities: &[String]) -> Vec<String> {
    known_cities
        .iter()
        .filter(|city| text.contains(city.as_str()))
        .map(|city| capitalize(city))
        .collect()
}

fn extract_place_types(text: &str, language: Language) -> Vec<String> {
    let mut found = HashSet::new();
    let mut out = Vec::new();
    for canonical in PLACE_TYPES {
        let localized_forms = localized_place_type(canonical, language);
        if localized_forms.iter().any(|form| text.contains(form)) && found.insert(*canonical) {
            out.push(canonical.to_string());
        }
    }
    out
}

fn localized_place_type(canonical: &str, language: Language) -> Vec<&'static str> {
    match (canonical, language) {
        ("bars", Language::Es) => vec!["bares", "bar"],
        ("bars", Language::Ca) => vec!["bars"],
        ("bars", Language::Gl) => vec!["bares"],
        ("bars", Language::En) => vec!["bars", "bar"],
        ("restaurants", Language::Es) => vec!["restaurantes", "restaurante"],
        ("restaurants", Language::Ca) => vec!["restaurants"],
        ("restaurants", Language::Gl) => vec!["restaurantes"],
        ("restaurants", Language::En) => vec!["restaurants", "restaurant"],
        ("cafes", Language::Es) => vec!["cafes", "cafeterias"],
        ("cafes", Language::Ca) => vec!["cafes"],
        ("cafes", Language::Gl) => vec!["cafes"],
        ("cafes", Language::En) => vec!["cafes", "coffee shops"],
        ("museums", Language::Es) => vec!["museos", "museo"],
        ("museums", Language::Ca) => vec!["museus"],
        ("museums", Language::Gl) => vec!["museos"],
        ("museums", Language::En) => vec!["museums", "museum"],
        ("parks", Language::Es) => vec!["parques", "parque"],
        ("parks", Language::Ca) => vec!["parcs"],
        ("parks", Language::Gl) => vec!["parques"],
        ("parks", Language::En) => vec!["parks", "park"],
        ("clubs", Language::Es) => vec!["discotecas", "clubs"],
        ("clubs", Language::Ca) => vec!["discoteques"],
        ("clubs", Language::Gl) => vec!["discotecas"],
        ("clubs", Language::En) => vec!["clubs", "nightclubs"],
        _ => vec![],
    }
}

fn extract_vibe(text: &str, language: Language) -> Option<String> {
    for vibe in VIBES {
        let forms = localized_vibe(vibe, language);
        if forms.iter().any(|form| text.contains(form)) {
            return Some(vibe.to_string());
        }
    }
    None
}

fn localized_vibe(canonical: &str, language: Language) -> Vec<&'static str> {
    match (canonical, language) {
        ("romantic", Language::Es) => vec!["romantico", "romantica"],
        ("romantic", Language::Ca) => vec!["romantic"],
        ("romantic", Language::Gl) => vec!["romantico"],
        ("romantic", Language::En) => vec!["romantic"],
        ("party", Language::Es) => vec!["fiesta"],
        ("party", Language::Ca) => vec!["festa"],
        ("party", Language::Gl) => vec!["festa"],
        ("party", Language::En) => vec!["party"],
        ("chill", Language::Es) => vec!["tranquilo", "relajado"],
        ("chill", Language::Ca) => vec!["tranquil"],
        ("chill", Language::Gl) => vec!["tranquilo"],
        ("chill", Language::En) => vec!["chill", "relaxed"],
        ("adventurous", Language::Es) => vec!["aventurero"],
        ("adventurous", Language::Ca) => vec!["aventurer"],
        ("adventurous", Language::Gl) => vec!["aventureiro"],
        ("adventurous", Language::En) => vec!["adventurous"],
        ("celebratory", Language::Es) => vec!["celebracion"],
        ("celebratory", Language::Ca) => vec!["celebracio"],
        ("celebratory", Language::Gl) => vec!["celebracion"],
        ("celebratory", Language::En) => vec!["celebration", "celebratory"],
        ("tired", Language::Es) => vec!["cansado", "cansada"],
        ("tired", Language::Ca) => vec!["cansat"],
        ("tired", Language::Gl) => vec!["canso"],
        ("tired", Language::En) => vec!["tired"],
        _ => vec![],
    }
}

fn extract_budget(text: &str) -> Option<String> {
    BUDGETS
        .iter()
        .find(|budget| text.contains(*budget))
        .map(|b| b.to_string())
}

fn extract_transport(text: &str, language: Language) -> Option<String> {
    for transport in TRANSPORTS {
        let forms = localized_transport(transport, language);
        if forms.iter().any(|form| text.contains(form)) {
            return Some(transport.to_string());
        }
    }
    None
}

fn localized_transport(canonical: &str, language: Language) -> Vec<&'static str> {
    match (canonical, language) {
        ("walking", Language::Es) => vec!["andando", "caminando", "a pie"],
        ("walking", Language::Ca) => vec!["caminant", "a peu"],
        ("walking", Language::Gl) => vec!["andando", "a pe"],
        ("walking", Language::En) => vec!["walking", "on foot"],
        ("driving", Language::Es) => vec!["en coche", "conduciendo"],
        ("driving", Language::Ca) => vec!["en cotxe"],
        ("driving", Language::Gl) => vec!["en coche"],
        ("driving", Language::En) => vec!["driving", "by car"],
        ("transit", Language::Es) => vec!["transporte publico", "metro", "autobus"],
        ("transit", Language::Ca) => vec!["transport public", "metro"],
        ("transit", Language::Gl) => vec!["transporte publico"],
        ("transit", Language::En) => vec!["public transit", "transit", "subway"],
        _ => vec![],
    }
}

fn number_before(text: &str, idx: usize) -> Option<String> {
    let prefix = &text[..idx];
    let digits: String = prefix
        .chars()
        .rev()
        .skip_while(|c| !c.is_ascii_digit() && !c.is_whitespace())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    let digits: String = digits.chars().rev().collect();
    if digits.is_empty() {
        None
    } else {
        Some(digits)
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
