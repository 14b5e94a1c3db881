//! Forecast documents.
//!
//! Model types for the `weatherdata` forecast format and the small query
//! façade built on them. Fetching the document is left to a
//! [`ForecastSource`]; everything here works on the bytes it returns.
//!
//! ```text
//! <weatherdata>
//!   <location name="..." country="..."/>          zero or more
//!   <forecast>
//!     <time day="YYYY-MM-DD">                     zero or more
//!       <temperature day="K" night="K" min="K" max="K"/>
//!     </time>
//!   </forecast>
//! </weatherdata>
//! ```

use crate::de::{NamePolicy, from_element};
use crate::element::Element;
use crate::error::Error;
use crate::mapping::{FieldMapping, Mappable, TypeDescriptor};
use serde::Serialize;
use std::fmt;
use tracing::{debug, warn};

/// Shown when no location was reported.
pub const UNKNOWN_LOCATION: &str = "Nowhere, USA";

/// `(K − 273.15) × 9⁄5 + 32`
pub fn kelvin_to_fahrenheit(kelvin: f64) -> f64 {
    (kelvin - 273.15) * (9.0 / 5.0) + 32.0
}

// ── Model ──────────────────────────────────────────────────────────────────

/// Root of a forecast document.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WeatherData {
    pub locations: Vec<Location>,
    pub forecast_days: Vec<ForecastDay>,
}

impl Mappable for WeatherData {
    fn type_descriptor() -> TypeDescriptor {
        TypeDescriptor::Named("weatherdata")
    }

    fn field_mappings() -> Vec<FieldMapping<Self>> {
        vec![
            FieldMapping::list("locations", |w: &Self| &w.locations, |w: &mut Self| &mut w.locations),
            FieldMapping::wrapped_list(
                "forecast_days",
                "forecast",
                |w: &Self| &w.forecast_days,
                |w: &mut Self| &mut w.forecast_days,
            ),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Location {
    pub city: String,
    pub country: String,
}

impl Mappable for Location {
    fn type_descriptor() -> TypeDescriptor {
        TypeDescriptor::Named("location")
    }

    fn field_mappings() -> Vec<FieldMapping<Self>> {
        vec![
            FieldMapping::attribute("city", "name", |l: &Self| &l.city, |l: &mut Self| &mut l.city),
            FieldMapping::attribute("country", "country", |l: &Self| &l.country, |l: &mut Self| {
                &mut l.country
            }),
        ]
    }
}

/// One `<time>` entry.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ForecastDay {
    pub day: String,
    pub temperatures: Vec<Temperature>,
}

impl ForecastDay {
    /// Only the first temperature of a day is used.
    pub fn temperature(&self) -> Option<&Temperature> {
        self.temperatures.first()
    }
}

impl Mappable for ForecastDay {
    fn type_descriptor() -> TypeDescriptor {
        TypeDescriptor::Named("time")
    }

    fn field_mappings() -> Vec<FieldMapping<Self>> {
        vec![
            FieldMapping::attribute("day", "day", |d: &Self| &d.day, |d: &mut Self| &mut d.day),
            FieldMapping::list("temperatures", |d: &Self| &d.temperatures, |d: &mut Self| {
                &mut d.temperatures
            }),
        ]
    }
}

/// Temperatures in Kelvin.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Temperature {
    pub day: f64,
    pub night: f64,
    pub min: f64,
    pub max: f64,
}

impl Temperature {
    pub fn min_fahrenheit(&self) -> f64 {
        kelvin_to_fahrenheit(self.min)
    }

    pub fn max_fahrenheit(&self) -> f64 {
        kelvin_to_fahrenheit(self.max)
    }
}

impl Mappable for Temperature {
    fn type_descriptor() -> TypeDescriptor {
        TypeDescriptor::Named("temperature")
    }

    fn field_mappings() -> Vec<FieldMapping<Self>> {
        vec![
            FieldMapping::attribute("day", "day", |t: &Self| &t.day, |t: &mut Self| &mut t.day),
            FieldMapping::attribute("night", "night", |t: &Self| &t.night, |t: &mut Self| &mut t.night),
            FieldMapping::attribute("min", "min", |t: &Self| &t.min, |t: &mut Self| &mut t.min),
            FieldMapping::attribute("max", "max", |t: &Self| &t.max, |t: &mut Self| &mut t.max),
        ]
    }
}

// ── Chart data ─────────────────────────────────────────────────────────────

/// A day's extremes in Fahrenheit. `None` when the day had no temperature.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemperaturePoint {
    pub day: String,
    pub max_fahrenheit: Option<f64>,
    pub min_fahrenheit: Option<f64>,
}

/// A titled `(label, value)` series, the shape chart views consume.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub title: String,
    pub points: Vec<(String, f64)>,
}

impl WeatherData {
    /// "City, Country" of the first location.
    pub fn location_name(&self) -> String {
        match self.locations.first() {
            Some(loc) => format!("{}, {}", loc.city, loc.country),
            None => UNKNOWN_LOCATION.to_string(),
        }
    }

    pub fn temperature_series(&self) -> Vec<TemperaturePoint> {
        self.forecast_days
            .iter()
            .map(|day| {
                let temp = day.temperature();
                TemperaturePoint {
                    day: day.day.clone(),
                    max_fahrenheit: temp.map(Temperature::max_fahrenheit),
                    min_fahrenheit: temp.map(Temperature::min_fahrenheit),
                }
            })
            .collect()
    }

    /// Max and min series, with days lacking a temperature plotted at 0.
    pub fn chart_series(&self) -> Vec<Series> {
        let points = self.temperature_series();
        let series = |title: &str, pick: fn(&TemperaturePoint) -> Option<f64>| Series {
            title: title.to_string(),
            points: points
                .iter()
                .map(|p| (p.day.clone(), pick(p).unwrap_or(0.0)))
                .collect(),
        };
        vec![
            series("Max Temperatures", |p: &TemperaturePoint| p.max_fahrenheit),
            series("Min Temperatures", |p: &TemperaturePoint| p.min_fahrenheit),
        ]
    }
}

// ── Query façade ───────────────────────────────────────────────────────────

/// Why a [`ForecastSource`] could not deliver a document.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchError {
    NotFound,
    Unauthorized,
    Failed(String),
}

/// Anything that can fetch a raw forecast document for a city and state,
/// typically an HTTP client.
pub trait ForecastSource {
    fn fetch(&self, city: &str, state: &str) -> Result<Vec<u8>, FetchError>;
}

/// A failed forecast query, phrased for the end user.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryError {
    NotFound,
    Unauthorized,
    RequestFailed(String),
    /// The document was fetched but did not map; the cause is kept for logs.
    Unparseable(Error),
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryError::NotFound => write!(f, "Query failed; city/state probably not found."),
            QueryError::Unauthorized => write!(f, "Needs an API key!"),
            QueryError::RequestFailed(msg) => write!(f, "Forecast request failed: {}", msg),
            QueryError::Unparseable(_) => write!(f, "Could not parse XML result"),
        }
    }
}

impl std::error::Error for QueryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            QueryError::Unparseable(e) => Some(e),
            _ => None,
        }
    }
}

impl From<FetchError> for QueryError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::NotFound => QueryError::NotFound,
            FetchError::Unauthorized => QueryError::Unauthorized,
            FetchError::Failed(msg) => QueryError::RequestFailed(msg),
        }
    }
}

/// Map a raw forecast document. Any mapping failure becomes
/// [`QueryError::Unparseable`].
pub fn parse_forecast(document: &[u8]) -> Result<WeatherData, QueryError> {
    Element::parse_bytes(document)
        .and_then(|root| from_element(&root, NamePolicy::Strict))
        .map_err(|e| {
            warn!(error = %e, "forecast document rejected");
            QueryError::Unparseable(e)
        })
}

/// Fetch and map the forecast for `city`, `state`.
pub fn query_forecast<S: ForecastSource + ?Sized>(
    source: &S,
    city: &str,
    state: &str,
) -> Result<WeatherData, QueryError> {
    debug!(city, state, "querying forecast");
    let document = source.fetch(city, state)?;
    parse_forecast(&document)
}
