//! Tab kinds
//!
//! The closed set of content types a tab can display. The layout manager
//! never looks inside a tab, but the kind decides default data and whether
//! an appended tab grabs focus.

use serde::{Deserialize, Serialize};

use crate::error::TabError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TabType {
    /// A single document
    Document,
    /// Calendar day pane
    MyDay,
    /// Blank placeholder used when nothing else is open
    New,
    JiraApp,
    GithubApp,
    /// Saved view with its own filter set
    View,
    Project,
    LinearApp,
    Archive,
    Assistant,
}

impl TabType {
    pub const ALL: [TabType; 10] = [
        TabType::Document,
        TabType::MyDay,
        TabType::New,
        TabType::JiraApp,
        TabType::GithubApp,
        TabType::View,
        TabType::Project,
        TabType::LinearApp,
        TabType::Archive,
        TabType::Assistant,
    ];

    /// Returns true for the integration panels backed by external services
    pub fn is_integration(&self) -> bool {
        matches!(
            self,
            TabType::JiraApp | TabType::GithubApp | TabType::LinearApp
        )
    }

    /// Returns true if the tab is a transient placeholder
    pub fn is_placeholder(&self) -> bool {
        matches!(self, TabType::New)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TabType::Document => "document",
            TabType::MyDay => "my_day",
            TabType::New => "new",
            TabType::JiraApp => "jira_app",
            TabType::GithubApp => "github_app",
            TabType::View => "view",
            TabType::Project => "project",
            TabType::LinearApp => "linear_app",
            TabType::Archive => "archive",
            TabType::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for TabType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for TabType {
    type Err = TabError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_lowercase();
        TabType::ALL
            .into_iter()
            .find(|kind| kind.as_str() == lower)
            .ok_or_else(|| TabError::UnknownType(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!("my_day".parse::<TabType>().unwrap(), TabType::MyDay);
        assert_eq!("VIEW".parse::<TabType>().unwrap(), TabType::View);
        assert_eq!(
            "calendar".parse::<TabType>(),
            Err(TabError::UnknownType("calendar".to_string()))
        );
    }

    #[test]
    fn test_serde_matches_as_str() {
        for kind in TabType::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
    }

    #[test]
    fn test_classification() {
        assert!(TabType::JiraApp.is_integration());
        assert!(!TabType::Document.is_integration());
        assert!(TabType::New.is_placeholder());
        assert!(!TabType::MyDay.is_placeholder());
    }
}
