//! Onboarding step-completion state as returned by `GET /me/onboarding/status`.
//!
//! Completion is derived entirely by the quest service. Nothing in this module
//! computes whether a step is done; it only reads what the server reported.

use serde::{Deserialize, Serialize};

/// Identifier of an onboarding step.
///
/// The service currently defines four steps. Ids it adds later round-trip
/// through [`StepId::Other`] instead of failing to decode.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StepId {
    Location,
    Preferences,
    Notifications,
    Complete,
    Other(String),
}

impl StepId {
    /// Wire name of the step.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Location => "location",
            Self::Preferences => "preferences",
            Self::Notifications => "notifications",
            Self::Complete => "complete",
            Self::Other(id) => id,
        }
    }
}

impl From<String> for StepId {
    fn from(value: String) -> Self {
        match value.as_str() {
            "location" => Self::Location,
            "preferences" => Self::Preferences,
            "notifications" => Self::Notifications,
            "complete" => Self::Complete,
            _ => Self::Other(value),
        }
    }
}

impl From<&str> for StepId {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<StepId> for String {
    fn from(step: StepId) -> Self {
        match step {
            StepId::Other(id) => id,
            known => known.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for StepId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One step of the onboarding checklist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnboardingStep {
    pub id: StepId,
    pub label: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub completed: bool,
}

/// Server-derived onboarding progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct OnboardingStatus {
    #[serde(default)]
    pub steps: Vec<OnboardingStep>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub current_step: Option<StepId>,
    #[serde(default)]
    pub next_step: Option<StepId>,
}

impl OnboardingStatus {
    /// Look up a step by id.
    #[must_use]
    pub fn step(&self, id: &StepId) -> Option<&OnboardingStep> {
        self.steps.iter().find(|step| &step.id == id)
    }

    /// Whether the server reports the given step as completed.
    ///
    /// Unknown steps are reported as not completed.
    #[must_use]
    pub fn is_step_completed(&self, id: &StepId) -> bool {
        self.step(id).is_some_and(|step| step.completed)
    }

    /// Whether any step is completed.
    #[must_use]
    pub fn any_completed(&self) -> bool {
        self.steps.iter().any(|step| step.completed)
    }

    /// Steps the server still reports as outstanding, in order.
    pub fn outstanding(&self) -> impl Iterator<Item = &OnboardingStep> {
        self.steps.iter().filter(|step| !step.completed)
    }

    /// One-line badge per step, e.g. `"[x] Set your home base"`.
    #[must_use]
    pub fn badges(&self) -> Vec<String> {
        self.steps
            .iter()
            .map(|step| {
                let mark = if step.completed { 'x' } else { ' ' };
                format!("[{mark}] {}", step.label)
            })
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn status_json() -> &'static str {
        r#"{
            "completed": false,
            "current_step": "preferences",
            "next_step": "preferences",
            "steps_completed": ["location"],
            "total_steps": 5,
            "steps": [
                {"id": "location", "label": "Set your home base", "description": "Pick where", "completed": true},
                {"id": "preferences", "label": "Tell us what you like", "completed": false},
                {"id": "notifications", "label": "Stay in the loop", "completed": false},
                {"id": "complete", "label": "You're ready to quest", "completed": false},
                {"id": "avatar", "label": "Pick an avatar", "completed": false}
            ]
        }"#
    }

    #[test]
    fn test_status_deserializes_with_unknown_step() {
        let status: OnboardingStatus = serde_json::from_str(status_json()).unwrap();

        assert_eq!(status.steps.len(), 5);
        assert_eq!(status.current_step, Some(StepId::Preferences));
        assert!(status.is_step_completed(&StepId::Location));
        assert!(!status.is_step_completed(&StepId::Notifications));
        assert!(status.step(&StepId::Other("avatar".to_string())).is_some());
    }

    #[test]
    fn test_step_id_round_trips_through_strings() {
        assert_eq!(String::from(StepId::Complete), "complete");
        assert_eq!(StepId::from("notifications"), StepId::Notifications);
        assert_eq!(
            serde_json::to_string(&StepId::Other("avatar".to_string())).unwrap(),
            "\"avatar\""
        );
    }

    #[test]
    fn test_any_completed_and_outstanding() {
        let status: OnboardingStatus = serde_json::from_str(status_json()).unwrap();
        assert!(status.any_completed());
        assert_eq!(status.outstanding().count(), 4);

        assert!(!OnboardingStatus::default().any_completed());
    }

    #[test]
    fn test_badges() {
        let status: OnboardingStatus = serde_json::from_str(status_json()).unwrap();
        let badges = status.badges();
        assert_eq!(badges.first().unwrap(), "[x] Set your home base");
        assert_eq!(badges.get(1).unwrap(), "[ ] Tell us what you like");
    }
}
