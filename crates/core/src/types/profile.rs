//! User profile snapshot as returned by `GET /me`.
//!
//! The profile is owned by the quest service. The client keeps a read-through
//! copy that is re-fetched after every mutating call, so none of these types
//! carry local mutation helpers beyond building update payloads.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::location::LocationSource;

/// Who can see a user's completed quests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Privacy {
    #[default]
    Public,
    FriendsOnly,
}

impl Privacy {
    /// Human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Public => "Public",
            Self::FriendsOnly => "Friends only",
        }
    }
}

impl std::fmt::Display for Privacy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Public => write!(f, "public"),
            Self::FriendsOnly => write!(f, "friends_only"),
        }
    }
}

impl std::str::FromStr for Privacy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "public" => Ok(Self::Public),
            "friends_only" => Ok(Self::FriendsOnly),
            _ => Err(format!("invalid privacy mode: {s}")),
        }
    }
}

/// Time of day a user prefers to receive quests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PreferredTime {
    #[default]
    Any,
    Morning,
    Afternoon,
    Evening,
}

impl std::fmt::Display for PreferredTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Any => write!(f, "any"),
            Self::Morning => write!(f, "morning"),
            Self::Afternoon => write!(f, "afternoon"),
            Self::Evening => write!(f, "evening"),
        }
    }
}

impl std::str::FromStr for PreferredTime {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "any" => Ok(Self::Any),
            "morning" => Ok(Self::Morning),
            "afternoon" => Ok(Self::Afternoon),
            "evening" => Ok(Self::Evening),
            _ => Err(format!("invalid preferred time: {s}")),
        }
    }
}

/// How much a user is willing to spend on a quest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SpendLevel {
    #[default]
    #[serde(rename = "free")]
    Free,
    #[serde(rename = "under-20")]
    Under20,
    #[serde(rename = "splurge")]
    Splurge,
}

impl std::fmt::Display for SpendLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Free => write!(f, "free"),
            Self::Under20 => write!(f, "under-20"),
            Self::Splurge => write!(f, "splurge"),
        }
    }
}

impl std::str::FromStr for SpendLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "free" => Ok(Self::Free),
            "under-20" => Ok(Self::Under20),
            "splurge" => Ok(Self::Splurge),
            _ => Err(format!("invalid spend level: {s}")),
        }
    }
}

/// A quest category the preferences card offers as a toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QuestCategory {
    /// Identifier stored in `quest_preferences.categories`.
    pub id: &'static str,
    /// Display label.
    pub label: &'static str,
}

impl QuestCategory {
    /// Categories offered during onboarding.
    pub const ALL: [Self; 4] = [
        Self {
            id: "art",
            label: "Creative & Art",
        },
        Self {
            id: "outdoor",
            label: "Outdoor Exploration",
        },
        Self {
            id: "social",
            label: "Social & Connection",
        },
        Self {
            id: "mindful",
            label: "Mindfulness & Reflection",
        },
    ];

    /// Look up an offered category by id.
    #[must_use]
    pub fn find(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|category| category.id == id)
    }
}

/// Quest tailoring preferences.
///
/// Every field defaults when absent, since a fresh profile has an empty
/// `quest_preferences` object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct QuestPreferences {
    /// Selected category ids. Unknown ids from the server are preserved.
    pub categories: BTreeSet<String>,
    pub preferred_time: PreferredTime,
    pub spend_level: SpendLevel,
}

impl QuestPreferences {
    /// Comma-separated, capitalized categories, or `"Open"` when none are set.
    #[must_use]
    pub fn categories_label(&self) -> String {
        if self.categories.is_empty() {
            return "Open".to_string();
        }
        self.categories
            .iter()
            .map(|item| capitalize(item))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

/// The home location stored on a profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedLocation {
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub radius_km: Option<f64>,
    #[serde(default)]
    pub source: Option<LocationSource>,
    #[serde(default)]
    pub precision_m: Option<f64>,
}

impl SavedLocation {
    /// Radius used when the server has none recorded.
    pub const DEFAULT_RADIUS_KM: f64 = 2.0;

    /// The stored radius, or [`Self::DEFAULT_RADIUS_KM`].
    #[must_use]
    pub fn radius_or_default(&self) -> f64 {
        self.radius_km.unwrap_or(Self::DEFAULT_RADIUS_KM)
    }

    /// The stored name, or the coordinates at three decimals.
    #[must_use]
    pub fn label(&self) -> String {
        match self.name.as_deref() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => format!("{:.3}, {:.3}", self.lat, self.lon),
        }
    }
}

/// Onboarding flags embedded in the profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct OnboardingFlags {
    pub completed: bool,
    /// Last step the server recorded as explicitly completed.
    pub step: Option<String>,
}

/// Server-owned profile snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub id: Option<i64>,
    pub username: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub location: Option<SavedLocation>,
    #[serde(default)]
    pub webpush_registered: bool,
    #[serde(default)]
    pub privacy: Privacy,
    #[serde(default)]
    pub quest_preferences: QuestPreferences,
    #[serde(default)]
    pub onboarding: OnboardingFlags,
    /// The service writes naive UTC timestamps; offsets are accepted too.
    #[serde(default, deserialize_with = "deserialize_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Parse an RFC 3339 timestamp, or a naive ISO 8601 one taken as UTC.
///
/// # Errors
///
/// Returns the naive parse error when neither form matches.
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(s).map_or_else(
        |_| s.parse::<NaiveDateTime>().map(|naive| naive.and_utc()),
        |dt| Ok(dt.with_timezone(&Utc)),
    )
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer)?
        .map(|raw| parse_timestamp(&raw).map_err(serde::de::Error::custom))
        .transpose()
}

impl Profile {
    /// Display name, falling back to the username.
    #[must_use]
    pub fn display_label(&self) -> &str {
        match self.display_name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => &self.username,
        }
    }
}

/// Body of `PATCH /me/preferences`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreferencesUpdate {
    pub quest_preferences: QuestPreferences,
    pub privacy: Privacy,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_profile_deserializes_with_defaults() {
        let json = r#"{"username": "explorer", "quest_preferences": {}, "onboarding": {"completed": false, "step": null}}"#;
        let profile: Profile = serde_json::from_str(json).unwrap();

        assert_eq!(profile.username, "explorer");
        assert!(profile.location.is_none());
        assert_eq!(profile.privacy, Privacy::Public);
        assert_eq!(profile.quest_preferences.preferred_time, PreferredTime::Any);
        assert_eq!(profile.quest_preferences.spend_level, SpendLevel::Free);
        assert!(!profile.onboarding.completed);
        assert_eq!(profile.display_label(), "explorer");
    }

    #[test]
    fn test_full_profile_deserializes() {
        let json = r#"{
            "id": 7,
            "username": "explorer",
            "display_name": "Explorer Dev",
            "privacy": "friends_only",
            "quest_preferences": {
                "categories": ["outdoor", "art"],
                "preferred_time": "evening",
                "spend_level": "under-20"
            },
            "location": {"lat": 45.5, "lon": -122.6, "name": "Portland", "radius_km": 5.0},
            "onboarding": {"completed": true, "step": "complete"},
            "webpush_registered": true,
            "created_at": "2026-01-02T03:04:05+00:00"
        }"#;
        let profile: Profile = serde_json::from_str(json).unwrap();

        assert_eq!(profile.display_label(), "Explorer Dev");
        assert_eq!(profile.privacy, Privacy::FriendsOnly);
        assert_eq!(profile.quest_preferences.spend_level, SpendLevel::Under20);
        assert_eq!(profile.quest_preferences.categories_label(), "Art, Outdoor");
        let location = profile.location.unwrap();
        assert_eq!(location.label(), "Portland");
        assert!((location.radius_or_default() - 5.0).abs() < f64::EPSILON);
        assert!(profile.onboarding.completed);
        assert!(profile.created_at.is_some());
    }

    #[test]
    fn test_profile_with_naive_created_at_deserializes() {
        let json = r#"{
            "id": 3,
            "username": "walker",
            "display_name": null,
            "email": null,
            "bio": null,
            "avatar_url": null,
            "privacy": "public",
            "prefs": {},
            "quest_preferences": {},
            "location": null,
            "onboarding": {"completed": false, "step": null},
            "webpush_registered": false,
            "created_at": "2026-10-15T04:48:00.123456"
        }"#;
        let profile: Profile = serde_json::from_str(json).unwrap();

        let created_at = profile.created_at.unwrap();
        assert_eq!(created_at.to_rfc3339(), "2026-10-15T04:48:00.123456+00:00");
        assert!(profile.location.is_none());
    }

    #[test]
    fn test_parse_timestamp_forms() {
        let expected = parse_timestamp("2026-10-15T04:48:00Z").unwrap();
        assert_eq!(parse_timestamp("2026-10-15T04:48:00").unwrap(), expected);
        assert_eq!(parse_timestamp("2026-10-15T06:48:00+02:00").unwrap(), expected);
        assert!(parse_timestamp("yesterday").is_err());

        let profile: Profile =
            serde_json::from_str(r#"{"username": "walker", "created_at": null}"#).unwrap();
        assert!(profile.created_at.is_none());
    }

    #[test]
    fn test_spend_level_wire_names() {
        assert_eq!(
            serde_json::to_string(&SpendLevel::Under20).unwrap(),
            "\"under-20\""
        );
        assert_eq!("splurge".parse::<SpendLevel>(), Ok(SpendLevel::Splurge));
        assert!("lavish".parse::<SpendLevel>().is_err());
    }

    #[test]
    fn test_categories_label_open_when_empty() {
        assert_eq!(QuestPreferences::default().categories_label(), "Open");
    }

    #[test]
    fn test_location_label_falls_back_to_coordinates() {
        let location = SavedLocation {
            lat: 45.512_34,
            lon: -122.658_76,
            name: None,
            radius_km: None,
            source: None,
            precision_m: None,
        };
        assert_eq!(location.label(), "45.512, -122.659");
        assert!((location.radius_or_default() - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_find_category() {
        assert_eq!(QuestCategory::find("social").unwrap().label, "Social & Connection");
        assert!(QuestCategory::find("karaoke").is_none());
    }
}
