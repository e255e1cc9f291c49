//! DraftItinerary - the coarse, coordinate-free plan produced by the LLM

use serde::{Deserialize, Serialize};

/// Shape of the trip as a whole
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TripType {
    OneWay,
    RoundTrip,
}

impl std::fmt::Display for TripType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OneWay => write!(f, "ONE_WAY"),
            Self::RoundTrip => write!(f, "ROUND_TRIP"),
        }
    }
}

impl std::str::FromStr for TripType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace(['-', '_'], "").as_str() {
            "oneway" => Ok(Self::OneWay),
            "roundtrip" | "loop" => Ok(Self::RoundTrip),
            _ => Err(format!("Unknown trip type: {}. Use: one-way or round-trip", s)),
        }
    }
}

/// Part of the day an activity belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TimeSlot {
    Morning,
    Afternoon,
    Evening,
    Night,
    #[default]
    #[serde(other)]
    Flexible,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftActivity {
    pub name: String,
    #[serde(default)]
    pub time_slot: TimeSlot,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftDay {
    pub day_number: u32,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    /// Neighbourhood or landmark the day revolves around
    pub anchor_area: String,
    #[serde(default)]
    pub activities: Vec<DraftActivity>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftItinerary {
    pub title: String,
    pub country: String,
    pub city: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trip_type: Option<TripType>,
    pub days: Vec<DraftDay>,
}

impl DraftItinerary {
    /// City/country a day actually happens in, falling back to the trip's main city
    pub fn day_locale<'a>(&'a self, day: &'a DraftDay) -> (&'a str, &'a str) {
        let city = day.city.as_deref().filter(|c| !c.trim().is_empty()).unwrap_or(&self.city);
        let country = day
            .country
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .unwrap_or(&self.country);
        (city, country)
    }

    /// Whether the day takes place in the trip's main city
    pub fn is_main_city(&self, day: &DraftDay) -> bool {
        let (city, _) = self.day_locale(day);
        city.trim().eq_ignore_ascii_case(self.city.trim())
    }

    pub fn activity_count(&self) -> usize {
        self.days.iter().map(|d| d.activities.len()).sum()
    }
}
