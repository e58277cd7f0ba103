/// Bidirectional type alias registry
///
/// Maps a canonical type identity (its fully-qualified name) to a short alias
/// used in descriptors and serialized payloads. Populated at process start and
/// read-mostly afterwards. A type without an alias is referred to by its
/// qualified name; that fallback is normal, not an error.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Identity and display metadata of a type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeInfo {
    /// Fully-qualified canonical name (e.g. "alloc::string::String")
    pub qualified_name: String,
    /// Simple name, the last path segment of the qualified name
    pub name: String,
    /// Optional human-readable name override
    pub display_name: Option<String>,
    /// Optional description
    pub description: Option<String>,
}

impl TypeInfo {
    /// Type info for a Rust type, keyed by `std::any::type_name`
    pub fn of<T: ?Sized>() -> Self {
        Self::from_qualified(std::any::type_name::<T>())
    }

    /// Type info for an arbitrary qualified name
    pub fn from_qualified(qualified_name: impl Into<String>) -> Self {
        let qualified_name = qualified_name.into();
        let name = simple_name(&qualified_name).to_string();
        Self {
            qualified_name,
            name,
            display_name: None,
            description: None,
        }
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Last path segment, ignoring generic arguments ("a::b::C<d::E>" -> "C")
fn simple_name(qualified: &str) -> &str {
    let base = qualified.split('<').next().unwrap_or(qualified);
    base.rsplit(|c| c == ':' || c == '.').next().unwrap_or(base)
}

/// Registry of type aliases with O(1) lookup in both directions
#[derive(Debug, Default, Clone)]
pub struct TypeAliasRegistry {
    /// Key: qualified name, Value: alias
    aliases: HashMap<String, String>,
    /// Key: alias, Value: type
    types_by_alias: HashMap<String, TypeInfo>,
    /// Every type ever registered, keyed by qualified name
    known_types: HashMap<String, TypeInfo>,
}

impl TypeAliasRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with the well-known primitive aliases
    pub fn with_defaults() -> Result<Self> {
        let mut registry = Self::new();
        let defaults = [
            (TypeInfo::of::<String>(), "String"),
            (TypeInfo::of::<bool>(), "Boolean"),
            (TypeInfo::of::<i32>(), "Int32"),
            (TypeInfo::of::<i64>(), "Int64"),
            (TypeInfo::of::<f32>(), "Single"),
            (TypeInfo::of::<f64>(), "Double"),
            (TypeInfo::of::<chrono::DateTime<chrono::Utc>>(), "DateTime"),
            (TypeInfo::of::<uuid::Uuid>(), "Guid"),
            (TypeInfo::of::<serde_json::Value>(), "Object"),
            (TypeInfo::of::<Vec<serde_json::Value>>(), "Array"),
        ];

        for (type_info, alias) in defaults {
            registry.register(type_info, alias)?;
        }

        Ok(registry)
    }

    /// Bind `alias` to `type_info`
    ///
    /// Re-registering the same pair is a no-op. An alias already bound to a
    /// different type is rejected.
    pub fn register(&mut self, type_info: TypeInfo, alias: impl Into<String>) -> Result<()> {
        let alias = alias.into();

        if let Some(existing) = self.types_by_alias.get(&alias) {
            if existing.qualified_name != type_info.qualified_name {
                return Err(Error::DuplicateAlias {
                    alias,
                    existing: existing.qualified_name.clone(),
                });
            }
            return Ok(());
        }

        // A type keeps one alias; drop the previous reverse entry
        if let Some(previous) = self.aliases.insert(type_info.qualified_name.clone(), alias.clone()) {
            self.types_by_alias.remove(&previous);
        }
        self.types_by_alias.insert(alias, type_info.clone());
        self.known_types.insert(type_info.qualified_name.clone(), type_info);

        Ok(())
    }

    /// Alias registered for the type, if any
    pub fn try_get_alias(&self, type_info: &TypeInfo) -> Option<&str> {
        self.aliases.get(&type_info.qualified_name).map(String::as_str)
    }

    /// Resolve an alias or a qualified name to a type
    ///
    /// Unknown aliases fall back to qualified-name resolution; an unknown
    /// qualified name yields a bare `TypeInfo` for that name.
    pub fn resolve(&self, alias_or_qualified_name: &str) -> TypeInfo {
        if let Some(type_info) = self.types_by_alias.get(alias_or_qualified_name) {
            return type_info.clone();
        }

        self.known_types
            .get(alias_or_qualified_name)
            .cloned()
            .unwrap_or_else(|| TypeInfo::from_qualified(alias_or_qualified_name))
    }

    /// Name used in descriptors: the alias, or the qualified name when none is registered
    pub fn type_name_for(&self, type_info: &TypeInfo) -> String {
        self.try_get_alias(type_info)
            .map(str::to_string)
            .unwrap_or_else(|| type_info.qualified_name.clone())
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}
