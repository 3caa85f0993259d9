//! Normalized module identifiers.
//!
//! A module id is a dotted namespace string naming a loadable unit of code,
//! e.g. `shell.util.functions`. Ids are case-insensitive; the stored form is
//! always the case-folded one, so normalization is deterministic and
//! idempotent.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Dotted namespace identifier naming a loadable unit of code.
///
/// # Examples
///
/// ```
/// use appshell_types::ModuleId;
///
/// let id = ModuleId::new("Shell.Util.Functions");
/// assert_eq!(id.as_str(), "shell.util.functions");
/// assert!(id.is_under("shell.util"));
/// assert_eq!(id.to_rel_path(), "shell/util/functions");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ModuleId(String);

impl ModuleId {
    /// Create a module id, folding case. Idempotent:
    /// `ModuleId::new(id.as_str()) == id` for any `id`.
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(raw.as_ref().trim().to_ascii_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Dotted namespace segments, in order.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('.')
    }

    /// Whether this id equals `prefix` or sits inside its namespace.
    pub fn is_under(&self, prefix: &str) -> bool {
        let prefix = prefix.trim().to_ascii_lowercase();
        self.0 == prefix || self.0.starts_with(&format!("{}.", prefix))
    }

    /// Relative path form: dots become path separators. No extension.
    pub fn to_rel_path(&self) -> String {
        self.0.replace('.', "/")
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ModuleId {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

// Manual impl so deserialized ids are normalized too.
impl<'de> Deserialize<'de> for ModuleId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(ModuleId::new(raw))
    }
}
