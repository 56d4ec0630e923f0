use serde::{de::Deserializer, Deserialize, Serialize};
use std::{fmt, path::PathBuf};

/// Stores control panel preferences that shape how forms and matrices behave.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub locale: String,
    /// Administrators write straight to the published value of matrix cells.
    #[serde(default)]
    pub is_admin: bool,
    /// Drop null and empty-string leaves from submission bodies.
    #[serde(default = "Config::default_skip_empty")]
    pub skip_empty: bool,
    #[serde(default)]
    pub unknown_kinds: UnknownKindPolicy,
    #[serde(default)]
    pub matrix_save_scope: SaveScope,
    #[serde(default)]
    pub theme: Theme,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Optional flat JSON catalog used to translate labels and descriptions.
    pub translations: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            locale: "en-US".into(),
            is_admin: false,
            skip_empty: Self::default_skip_empty(),
            unknown_kinds: UnknownKindPolicy::default(),
            matrix_save_scope: SaveScope::default(),
            theme: Theme::default(),
            translations: None,
        }
    }
}

impl Config {
    pub fn default_skip_empty() -> bool {
        true
    }

    /// Updates a single setting from its textual form, as typed on the CLI.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), crate::ConfigError> {
        let invalid = || crate::ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        };
        match key {
            "locale" => {
                if value.trim().is_empty() {
                    return Err(invalid());
                }
                self.locale = value.trim().to_string();
            }
            "is_admin" => self.is_admin = parse_flag(value).ok_or_else(invalid)?,
            "skip_empty" => self.skip_empty = parse_flag(value).ok_or_else(invalid)?,
            "unknown_kinds" => {
                self.unknown_kinds = match value.trim().to_ascii_lowercase().as_str() {
                    "reject" => UnknownKindPolicy::Reject,
                    "skip" => UnknownKindPolicy::Skip,
                    _ => return Err(invalid()),
                }
            }
            "matrix_save_scope" => {
                self.matrix_save_scope = match value.trim().to_ascii_lowercase().as_str() {
                    "whole_grid" | "whole" => SaveScope::WholeGrid,
                    "changed_cells" | "changed" => SaveScope::ChangedCells,
                    _ => return Err(invalid()),
                }
            }
            "theme" => self.theme = Theme::from_str(value),
            "translations" => {
                self.translations = if value.trim().is_empty() {
                    None
                } else {
                    Some(PathBuf::from(value.trim()))
                }
            }
            other => return Err(crate::ConfigError::UnknownKey(other.to_string())),
        }
        Ok(())
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" | "true" | "1" | "on" => Some(true),
        "n" | "no" | "false" | "0" | "off" => Some(false),
        _ => None,
    }
}

/// How the validator compiler treats field kinds this build does not know.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownKindPolicy {
    /// Refuse to compile the form.
    Reject,
    /// Leave the field out of validation and rendering.
    #[default]
    Skip,
}

/// Which cells a matrix save sends to the backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveScope {
    #[default]
    WholeGrid,
    ChangedCells,
}

impl fmt::Display for SaveScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SaveScope::WholeGrid => "whole_grid",
            SaveScope::ChangedCells => "changed_cells",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Plain,
    Colored,
}

impl Theme {
    fn from_value(value: Option<String>) -> Self {
        value
            .map(|v| Theme::from_str(v.trim()))
            .unwrap_or_default()
    }

    pub fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "plain" => Theme::Plain,
            _ => Theme::Colored,
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Theme::Colored
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Theme::Plain => "plain",
            Theme::Colored => "colored",
        };
        f.write_str(label)
    }
}

impl<'de> Deserialize<'de> for Theme {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<String>::deserialize(deserializer)?;
        Ok(Theme::from_value(value))
    }
}
