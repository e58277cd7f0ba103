/// Activity definition type definitions
///
/// A definition is a versioned, user-authored activity whose body is a
/// flowchart. These types are serialized as JSON both on the wire and in the
/// `data` column of the definition store.

use crate::activity::descriptor::Activity;
use crate::error::Error;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::str::FromStr;

/// One version of a user-authored activity definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityDefinition {
    /// Version-specific identifier, assigned by the server
    pub id: String,
    /// Stable identifier shared by every version of this definition
    pub definition_id: String,
    /// Activity type name this definition is published as (e.g. "Activity1")
    #[serde(rename = "type")]
    pub type_name: String,
    pub display_name: String,
    pub category: String,
    #[serde(default)]
    pub description: Option<String>,
    pub version: u32,
    pub is_latest: bool,
    pub is_published: bool,
    /// Write counter of this version's row; a save must carry the stored value
    #[serde(default)]
    pub revision: u32,
    pub root: Flowchart,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Root graph of a definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flowchart {
    pub id: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub version: u32,
    #[serde(default)]
    pub activities: Vec<Activity>,
    #[serde(default)]
    pub connections: Vec<Connection>,
    #[serde(default)]
    pub variables: Vec<Variable>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    #[serde(default)]
    pub custom_properties: Map<String, Value>,
}

/// Directed link between two activities of a flowchart
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub source: String,
    pub target: String,
    /// Outcome of the source that follows this connection (default outcome when None)
    #[serde(default)]
    pub outcome: Option<String>,
}

/// Variable declared on a flowchart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variable {
    pub id: String,
    pub name: String,
    /// Alias or qualified name of the variable's type
    pub type_name: String,
    #[serde(default)]
    pub value: Option<Value>,
}

impl Flowchart {
    pub fn empty(id: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            type_name: type_name.into(),
            version: 1,
            activities: Vec::new(),
            connections: Vec::new(),
            variables: Vec::new(),
            metadata: Map::new(),
            custom_properties: Map::new(),
        }
    }
}

impl ActivityDefinition {
    /// Blank in-memory draft as opened by the editor
    ///
    /// Identity fields are empty until the first save assigns them.
    pub fn new_draft(flowchart_type_name: &str, root_id: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            definition_id: String::new(),
            type_name: "Activity1".to_string(),
            display_name: "Activity 1".to_string(),
            category: "Custom".to_string(),
            description: None,
            version: 1,
            is_latest: true,
            is_published: false,
            revision: 0,
            root: Flowchart::empty(root_id, flowchart_type_name),
            metadata: Map::new(),
            created_at: None,
        }
    }

    pub fn identity(&self) -> DefinitionIdentity {
        DefinitionIdentity::of(self)
    }

    /// Whether the authored content matches, ignoring identity and timestamps
    pub fn same_content(&self, other: &ActivityDefinition) -> bool {
        self.type_name == other.type_name
            && self.display_name == other.display_name
            && self.category == other.category
            && self.description == other.description
            && self.root == other.root
            && self.metadata == other.metadata
    }

    pub fn summary(&self) -> DefinitionSummary {
        DefinitionSummary {
            id: self.id.clone(),
            definition_id: self.definition_id.clone(),
            type_name: self.type_name.clone(),
            display_name: self.display_name.clone(),
            category: self.category.clone(),
            description: self.description.clone(),
            version: self.version,
            is_latest: self.is_latest,
            is_published: self.is_published,
        }
    }
}

/// The five identity-relevant fields of a definition
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefinitionIdentity {
    pub id: String,
    pub definition_id: String,
    pub version: u32,
    pub is_published: bool,
    pub is_latest: bool,
}

impl DefinitionIdentity {
    pub fn of(definition: &ActivityDefinition) -> Self {
        Self {
            id: definition.id.clone(),
            definition_id: definition.definition_id.clone(),
            version: definition.version,
            is_published: definition.is_published,
            is_latest: definition.is_latest,
        }
    }
}

/// Listing entry for one definition version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefinitionSummary {
    pub id: String,
    pub definition_id: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub display_name: String,
    pub category: String,
    pub description: Option<String>,
    pub version: u32,
    pub is_latest: bool,
    pub is_published: bool,
}

/// Which version of a definition to load
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VersionOptions {
    #[default]
    Latest,
    Published,
    Version(u32),
}

impl FromStr for VersionOptions {
    type Err = Error;

    /// Accepts "latest", "published", or a version number
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "latest" | "" => Ok(VersionOptions::Latest),
            "published" => Ok(VersionOptions::Published),
            other => other
                .parse::<u32>()
                .ok()
                .filter(|v| *v > 0)
                .map(VersionOptions::Version)
                .ok_or_else(|| Error::Validation(format!("invalid version selector: {}", s))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_draft_has_empty_identity() {
        let draft = ActivityDefinition::new_draft("Mechaflow.Flowchart", "Flowchart1");

        assert_eq!(draft.id, "");
        assert_eq!(draft.definition_id, "");
        assert_eq!(draft.type_name, "Activity1");
        assert_eq!(draft.version, 1);
        assert!(draft.is_latest);
        assert!(!draft.is_published);
        assert_eq!(draft.root.type_name, "Mechaflow.Flowchart");
    }

    #[test]
    fn test_same_content_ignores_identity() {
        let a = ActivityDefinition::new_draft("Mechaflow.Flowchart", "Flowchart1");
        let mut b = a.clone();
        b.id = "x".to_string();
        b.version = 4;
        b.is_published = true;
        assert!(a.same_content(&b));

        b.root.metadata.insert("x".to_string(), json!(1));
        assert!(!a.same_content(&b));
    }

    #[test]
    fn test_wire_format_uses_type_and_camel_case() {
        let draft = ActivityDefinition::new_draft("Mechaflow.Flowchart", "Flowchart1");
        let json = serde_json::to_value(&draft).unwrap();

        assert_eq!(json["type"], "Activity1");
        assert_eq!(json["definitionId"], "");
        assert_eq!(json["isPublished"], false);
        assert_eq!(json["root"]["type"], "Mechaflow.Flowchart");
    }

    #[test]
    fn test_version_options_parse() {
        assert_eq!("latest".parse::<VersionOptions>().unwrap(), VersionOptions::Latest);
        assert_eq!("Published".parse::<VersionOptions>().unwrap(), VersionOptions::Published);
        assert_eq!("3".parse::<VersionOptions>().unwrap(), VersionOptions::Version(3));
        assert!("0".parse::<VersionOptions>().is_err());
        assert!("newest".parse::<VersionOptions>().is_err());
    }
}
