//! Daily quest preview types.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Errors that can occur when constructing a [`Difficulty`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DifficultyError {
    /// The value lies outside `1..=5`.
    #[error("difficulty must be between {min} and {max}, got {value}")]
    OutOfRange {
        /// Rejected value.
        value: u8,
        /// Lowest allowed difficulty.
        min: u8,
        /// Highest allowed difficulty.
        max: u8,
    },
}

/// Quest difficulty on a 1-5 ordinal scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Difficulty(u8);

impl Difficulty {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    /// Create a difficulty.
    ///
    /// # Errors
    ///
    /// Returns [`DifficultyError::OutOfRange`] outside `1..=5`.
    pub const fn new(value: u8) -> Result<Self, DifficultyError> {
        if value < Self::MIN || value > Self::MAX {
            return Err(DifficultyError::OutOfRange {
                value,
                min: Self::MIN,
                max: Self::MAX,
            });
        }
        Ok(Self(value))
    }

    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Difficulty {
    type Error = DifficultyError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Difficulty> for u8 {
    fn from(difficulty: Difficulty) -> Self {
        difficulty.0
    }
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.0, Self::MAX)
    }
}

/// How rare a quest template is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Rarity {
    #[default]
    Common,
    Rare,
    Legendary,
}

impl std::fmt::Display for Rarity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Common => write!(f, "common"),
            Self::Rare => write!(f, "rare"),
            Self::Legendary => write!(f, "legendary"),
        }
    }
}

/// Suggested zone for a quest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestZone {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
    #[serde(default)]
    pub radius_km: Option<f64>,
}

impl QuestZone {
    /// `"<name> · radius <r> km"`, with defaults for missing parts.
    #[must_use]
    pub fn summary(&self) -> String {
        let name = self
            .name
            .as_deref()
            .filter(|name| !name.is_empty())
            .unwrap_or("Unnamed spot");
        format!("{name} · radius {} km", self.radius_km.unwrap_or(2.0))
    }
}

/// A generated daily quest. Read-only on the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quest {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    pub title: String,
    /// Older service builds name this field `details`.
    #[serde(default, alias = "details")]
    pub description: String,
    #[serde(default)]
    pub difficulty: Option<Difficulty>,
    #[serde(default)]
    pub rarity: Rarity,
    #[serde(default)]
    pub hints: Vec<String>,
    #[serde(default)]
    pub location: Option<QuestZone>,
}

/// Response of `GET /quests/today`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QuestResponse {
    #[serde(default)]
    pub quest: Option<Quest>,
}
