//! Content type registry and selector sanitization

use serde::Serialize;

/// Type shown when nothing (or nothing valid) is selected
pub const PRIMARY_TYPE: &str = "post";

/// Public types that never appear in the analytics selector
pub const EXCLUDED_TYPES: [&str; 3] = ["attachment", "e-landing-page", "elementor_library"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContentType {
    pub name: String,
    pub label: String,
    pub public: bool,
}

impl ContentType {
    fn new(name: &str, label: &str, public: bool) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            public,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TypeRegistry {
    types: Vec<ContentType>,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl TypeRegistry {
    pub fn builtin() -> Self {
        Self {
            types: vec![
                ContentType::new("post", "Posts", true),
                ContentType::new("page", "Pages", true),
                ContentType::new("attachment", "Media", true),
                ContentType::new("revision", "Revisions", false),
                ContentType::new("nav_menu_item", "Navigation Menu Items", false),
                ContentType::new("e-landing-page", "Landing Pages", true),
                ContentType::new("elementor_library", "Templates", true),
            ],
        }
    }

    /// Adds public types; slugs are sanitized and duplicates ignored
    pub fn with_extra(mut self, extra: &[(String, String)]) -> Self {
        for (name, label) in extra {
            let name = sanitize_key(name);
            if name.is_empty() || self.get(&name).is_some() {
                continue;
            }
            self.types.push(ContentType::new(&name, label, true));
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&ContentType> {
        self.types.iter().find(|t| t.name == name)
    }

    /// Public types minus [`EXCLUDED_TYPES`]
    pub fn selectable(&self) -> Vec<&ContentType> {
        self.types
            .iter()
            .filter(|t| t.public && !EXCLUDED_TYPES.contains(&t.name.as_str()))
            .collect()
    }

    /// Sanitized selection, or [`PRIMARY_TYPE`] when it is missing or not selectable
    pub fn resolve(&self, raw: Option<&str>) -> String {
        let Some(raw) = raw else {
            return PRIMARY_TYPE.to_string();
        };

        let key = sanitize_key(raw);
        if self.selectable().iter().any(|t| t.name == key) {
            key
        } else {
            if !key.is_empty() {
                tracing::debug!(requested = %key, "Content type not selectable, using default");
            }
            PRIMARY_TYPE.to_string()
        }
    }
}

/// Lowercase and keep only `[a-z0-9_-]`
pub fn sanitize_key(raw: &str) -> String {
    raw.chars()
        .map(|c| c.to_ascii_lowercase())
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '_' || *c == '-')
        .collect()
}
