//! Level and hierarchy addressing
//!
//! A level is written `level@hierarchy@dimension`. The shorter forms
//! `level@hierarchy` and `level` are accepted and resolve when exactly one
//! level of the cube matches.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct LevelPath {
    pub level: String,
    pub hierarchy: Option<String>,
    pub dimension: Option<String>,
}

impl LevelPath {
    pub fn new(
        level: impl Into<String>,
        hierarchy: impl Into<String>,
        dimension: impl Into<String>,
    ) -> Self {
        Self {
            level: level.into(),
            hierarchy: Some(hierarchy.into()),
            dimension: Some(dimension.into()),
        }
    }

    /// Parses `level[@hierarchy[@dimension]]`
    pub fn parse(text: &str) -> Self {
        let mut parts = text.splitn(3, '@');
        let level = parts.next().unwrap_or_default().to_string();
        Self {
            level,
            hierarchy: parts.next().map(str::to_string),
            dimension: parts.next().map(str::to_string),
        }
    }

    /// Whether this path designates the given level
    pub fn matches(&self, level: &str, hierarchy: &str, dimension: &str) -> bool {
        self.level == level
            && self.hierarchy.as_deref().map_or(true, |h| h == hierarchy)
            && self.dimension.as_deref().map_or(true, |d| d == dimension)
    }

    pub fn is_qualified(&self) -> bool {
        self.hierarchy.is_some() && self.dimension.is_some()
    }
}

impl fmt::Display for LevelPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.level)?;
        if let Some(hierarchy) = &self.hierarchy {
            write!(f, "@{}", hierarchy)?;
        }
        if let Some(dimension) = &self.dimension {
            write!(f, "@{}", dimension)?;
        }
        Ok(())
    }
}

impl From<&str> for LevelPath {
    fn from(text: &str) -> Self {
        Self::parse(text)
    }
}

impl From<String> for LevelPath {
    fn from(text: String) -> Self {
        Self::parse(&text)
    }
}

impl From<LevelPath> for String {
    fn from(path: LevelPath) -> Self {
        path.to_string()
    }
}

/// `hierarchy[@dimension]`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct HierarchyPath {
    pub hierarchy: String,
    pub dimension: Option<String>,
}

impl HierarchyPath {
    pub fn new(hierarchy: impl Into<String>, dimension: impl Into<String>) -> Self {
        Self {
            hierarchy: hierarchy.into(),
            dimension: Some(dimension.into()),
        }
    }

    pub fn parse(text: &str) -> Self {
        match text.split_once('@') {
            Some((hierarchy, dimension)) => Self::new(hierarchy, dimension),
            None => Self {
                hierarchy: text.to_string(),
                dimension: None,
            },
        }
    }

    pub fn matches(&self, hierarchy: &str, dimension: &str) -> bool {
        self.hierarchy == hierarchy && self.dimension.as_deref().map_or(true, |d| d == dimension)
    }
}

impl fmt::Display for HierarchyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.dimension {
            Some(dimension) => write!(f, "{}@{}", self.hierarchy, dimension),
            None => f.write_str(&self.hierarchy),
        }
    }
}

impl From<&str> for HierarchyPath {
    fn from(text: &str) -> Self {
        Self::parse(text)
    }
}

impl From<String> for HierarchyPath {
    fn from(text: String) -> Self {
        Self::parse(&text)
    }
}

impl From<HierarchyPath> for String {
    fn from(path: HierarchyPath) -> Self {
        path.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_forms() {
        let full = LevelPath::parse("subCategory@Category@Product");
        assert_eq!(full, LevelPath::new("subCategory", "Category", "Product"));
        assert!(full.is_qualified());

        let bare = LevelPath::parse("country");
        assert_eq!(bare.hierarchy, None);
        assert!(bare.matches("country", "country", "Geography"));
    }

    #[test]
    fn test_partial_path_matching() {
        let path = LevelPath::parse("name@Category");
        assert!(path.matches("name", "Category", "Product"));
        assert!(!path.matches("name", "Product", "Product"));
    }

    #[test]
    fn test_display_round_trips() {
        let text = "date@OrderDate@OrderDate";
        assert_eq!(LevelPath::parse(text).to_string(), text);
        assert_eq!(HierarchyPath::parse("Category@Product").to_string(), "Category@Product");
    }

    #[test]
    fn test_serializes_as_string() {
        let json = serde_json::to_string(&LevelPath::parse("country@country")).unwrap();
        assert_eq!(json, "\"country@country\"");
        let back: LevelPath = serde_json::from_str(&json).unwrap();
        assert_eq!(back.level, "country");
    }
}
