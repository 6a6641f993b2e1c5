//! Goal classification.
//!
//! A classifier maps free-text goals onto the payload category that will be
//! played back. The default is a case-insensitive keyword match; anything that
//! implements `GoalClassifier` can replace it without touching the sequencer.

use serde::{Deserialize, Serialize};

/// Category of mock payloads selected for a goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GoalCategory {
    /// Verification-style goals (is this posting fake or legitimate?).
    Internship,
    /// Code-generation goals. Also the fallback category.
    Fibonacci,
}

impl GoalCategory {
    pub const ALL: [GoalCategory; 2] = [GoalCategory::Internship, GoalCategory::Fibonacci];

    /// The canned example goal for this category.
    pub fn example_goal(self) -> &'static str {
        match self {
            GoalCategory::Internship => crate::payload::EXAMPLE_GOALS.internship,
            GoalCategory::Fibonacci => crate::payload::EXAMPLE_GOALS.fibonacci,
        }
    }

    /// Whether the refined output of this category is source code.
    pub fn is_code(self) -> bool {
        matches!(self, GoalCategory::Fibonacci)
    }
}

impl std::fmt::Display for GoalCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GoalCategory::Internship => write!(f, "internship"),
            GoalCategory::Fibonacci => write!(f, "fibonacci"),
        }
    }
}

impl std::str::FromStr for GoalCategory {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "internship" => Ok(GoalCategory::Internship),
            "fibonacci" => Ok(GoalCategory::Fibonacci),
            _ => anyhow::bail!(
                "Invalid category '{}'. Valid values: internship, fibonacci",
                s
            ),
        }
    }
}

/// Maps a goal onto a payload category.
pub trait GoalClassifier: Send + Sync {
    fn classify(&self, goal: &str) -> GoalCategory;
}

/// Keywords that select the internship category by default.
pub const DEFAULT_INTERNSHIP_KEYWORDS: [&str; 3] = ["internship", "fake", "legitimate"];

/// Substring classifier: any keyword found (case-insensitive) selects
/// `Internship`, otherwise `Fibonacci`.
#[derive(Debug, Clone)]
pub struct KeywordClassifier {
    keywords: Vec<String>,
}

impl KeywordClassifier {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            keywords: keywords
                .into_iter()
                .map(|k| k.as_ref().to_lowercase())
                .collect(),
        }
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }
}

impl Default for KeywordClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_INTERNSHIP_KEYWORDS)
    }
}

impl GoalClassifier for KeywordClassifier {
    fn classify(&self, goal: &str) -> GoalCategory {
        let goal = goal.to_lowercase();
        if self.keywords.iter().any(|k| goal.contains(k.as_str())) {
            GoalCategory::Internship
        } else {
            GoalCategory::Fibonacci
        }
    }
}

/// Classify with the default keyword set.
pub fn classify_goal(goal: &str) -> GoalCategory {
    KeywordClassifier::default().classify(goal)
}
