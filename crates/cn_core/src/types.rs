use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::{Error, Result};

const EARTH_RADIUS_KM: f64 = 6371.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    #[serde(rename = "article_id", alias = "id", alias = "_id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub url: String,
    #[serde(with = "timestamp")]
    pub publication_date: DateTime<Utc>,
    #[serde(default)]
    pub source_name: String,
    #[serde(default)]
    pub relevance_score: f64,
    #[serde(default)]
    pub latitude: f64,
    #[serde(default)]
    pub longitude: f64,
    #[serde(default, deserialize_with = "nullable")]
    pub category: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm_summary: Option<String>,
}

impl Article {
    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Great-circle distance in kilometres.
    pub fn distance_km(&self, other: &Coordinates) -> f64 {
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let dlat = (other.latitude - self.latitude).to_radians();
        let dlon = (other.longitude - self.longitude).to_radians();

        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_KM * a.sqrt().atan2((1.0 - a).sqrt())
    }
}

/// A circular area used to scope geographic queries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoWindow {
    pub center: Coordinates,
    pub radius_km: f64,
}

impl GeoWindow {
    pub fn new(center: Coordinates, radius_km: f64) -> Self {
        Self { center, radius_km }
    }

    pub fn contains(&self, point: &Coordinates) -> bool {
        self.center.distance_km(point) <= self.radius_km
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    View,
    Click,
    Share,
}

impl EventKind {
    /// Contribution of a single event to an article's trending score.
    pub fn weight(&self) -> f64 {
        match self {
            EventKind::View => 1.0,
            EventKind::Click => 3.0,
            EventKind::Share => 0.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::View => "view",
            EventKind::Click => "click",
            EventKind::Share => "share",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "view" => Ok(EventKind::View),
            "click" => Ok(EventKind::Click),
            "share" => Ok(EventKind::Share),
            other => Err(Error::validation(format!(
                "Unknown event type '{}', expected one of: view, click, share",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserEvent {
    pub id: Uuid,
    #[serde(default)]
    pub user_id: String,
    pub article_id: String,
    pub event_type: EventKind,
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: DateTime<Utc>,
}

impl UserEvent {
    pub fn new(
        user_id: impl Into<String>,
        article_id: impl Into<String>,
        event_type: EventKind,
        origin: Coordinates,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            article_id: article_id.into(),
            event_type,
            latitude: origin.latitude,
            longitude: origin.longitude,
            timestamp: Utc::now(),
        }
    }

    pub fn origin(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }
}

/// The purpose a free-text query was classified as.
///
/// Only the exact lowercase names are recognized. Anything else is kept
/// verbatim in `Unrecognized` so the dispatcher can log it before falling
/// back to keyword search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Intent {
    Category,
    Source,
    Nearby,
    Score,
    Search,
    Unrecognized(String),
}

impl Default for Intent {
    fn default() -> Self {
        Intent::Unrecognized(String::new())
    }
}

impl From<String> for Intent {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "category" => Intent::Category,
            "source" => Intent::Source,
            "nearby" => Intent::Nearby,
            "score" => Intent::Score,
            "search" => Intent::Search,
            _ => Intent::Unrecognized(raw),
        }
    }
}

impl From<&str> for Intent {
    fn from(raw: &str) -> Self {
        Intent::from(raw.to_string())
    }
}

impl From<Intent> for String {
    fn from(intent: Intent) -> Self {
        intent.to_string()
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Intent::Category => f.write_str("category"),
            Intent::Source => f.write_str("source"),
            Intent::Nearby => f.write_str("nearby"),
            Intent::Score => f.write_str("score"),
            Intent::Search => f.write_str("search"),
            Intent::Unrecognized(raw) => f.write_str(raw),
        }
    }
}

/// Structured reading of a free-text query, produced by the intent classifier.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntentResult {
    #[serde(default, deserialize_with = "nullable")]
    pub intent: Intent,
    #[serde(default, deserialize_with = "nullable")]
    pub entities: Vec<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub keywords: Vec<String>,
}

impl IntentResult {
    /// Keywords joined into the text handed to full-text search.
    pub fn search_text(&self) -> String {
        self.keywords.join(" ")
    }
}

/// Maximum number of results a query may return. Zero or negative requests
/// are unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Limit(Option<usize>);

impl Limit {
    pub const UNBOUNDED: Limit = Limit(None);

    pub fn new(raw: i64) -> Self {
        if raw <= 0 {
            Limit(None)
        } else {
            Limit(Some(usize::try_from(raw).unwrap_or(usize::MAX)))
        }
    }

    pub fn get(&self) -> Option<usize> {
        self.0
    }

    pub fn apply<T>(&self, mut items: Vec<T>) -> Vec<T> {
        if let Some(max) = self.0 {
            items.truncate(max);
        }
        items
    }

    /// SQLite treats a negative LIMIT as no limit.
    pub fn as_sql(&self) -> i64 {
        self.0
            .map(|max| i64::try_from(max).unwrap_or(i64::MAX))
            .unwrap_or(-1)
    }
}

impl From<i64> for Limit {
    fn from(raw: i64) -> Self {
        Limit::new(raw)
    }
}

impl fmt::Display for Limit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(max) => write!(f, "{}", max),
            None => f.write_str("unbounded"),
        }
    }
}

/// Parses RFC 3339, falling back to a naive timestamp read as UTC.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .map(|naive| naive.and_utc())
        .map_err(|e| Error::Parse(format!("Invalid timestamp '{}': {}", raw, e)))
}

pub fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

mod timestamp {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(dt: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::format_timestamp(dt))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        super::parse_timestamp(&raw).map_err(serde::de::Error::custom)
    }
}

fn nullable<'de, D, T>(d: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
}
