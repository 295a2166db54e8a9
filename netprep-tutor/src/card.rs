//! The tutor card delivered to the study UI

use serde::{Deserialize, Serialize};

/// Structured explanation of a networking concept, shown next to a flashcard.
///
/// Every field is always present in a delivered card: strings default to
/// empty, lists default to empty vectors, and nothing is ever null. The
/// wire format uses camelCase keys because the study UI consumes the JSON
/// directly; snake_case aliases are accepted on input so a drifting upstream
/// prompt cannot break deserialization.
///
/// # Example
///
/// ```
/// use netprep_tutor::TutorCard;
///
/// let card: TutorCard = serde_json::from_str(
///     r#"{"title": "OSPF", "simpleExplanation": "A link-state routing protocol."}"#
/// ).unwrap();
/// assert_eq!(card.title, "OSPF");
/// assert!(card.key_commands.is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TutorCard {
    /// Short display title, usually the concept label
    pub title: String,

    /// Plain-language explanation, 2-4 sentences
    #[serde(alias = "simple_explanation")]
    pub simple_explanation: String,

    /// One concrete scenario from a production network
    #[serde(alias = "real_world_example")]
    pub real_world_example: String,

    /// Relevant IOS commands, one per entry
    #[serde(alias = "key_commands")]
    pub key_commands: Vec<String>,

    /// Frequent exam and lab mistakes
    #[serde(alias = "common_mistakes")]
    pub common_mistakes: Vec<String>,

    /// Short self-test questions
    #[serde(alias = "quick_check")]
    pub quick_check: Vec<String>,
}

impl TutorCard {
    /// True when every field is empty.
    pub fn is_empty(&self) -> bool {
        self.title.is_empty()
            && self.simple_explanation.is_empty()
            && self.real_world_example.is_empty()
            && self.key_commands.is_empty()
            && self.common_mistakes.is_empty()
            && self.quick_check.is_empty()
    }

    /// True when at least one field besides the explanation carries content.
    /// Used to decide whether an extracted JSON fragment is worth trusting.
    pub fn has_structure_beyond_explanation(&self) -> bool {
        !self.real_world_example.is_empty()
            || !self.key_commands.is_empty()
            || !self.common_mistakes.is_empty()
            || !self.quick_check.is_empty()
    }
}
