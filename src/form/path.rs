use std::fmt;
use std::str::FromStr;

use crate::errors::PanelError;

/// Dotted address of a bound value: `section.field` or `section.field.index.child`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath {
    pub section: String,
    pub field: String,
    pub item: Option<(usize, String)>,
}

impl FieldPath {
    pub fn new(section: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            section: section.into(),
            field: field.into(),
            item: None,
        }
    }

    pub fn item(mut self, index: usize, child: impl Into<String>) -> Self {
        self.item = Some((index, child.into()));
        self
    }

    /// The `section.field` part, shared by every item path of an array.
    pub fn field_path(&self) -> String {
        format!("{}.{}", self.section, self.field)
    }
}

impl FromStr for FieldPath {
    type Err = PanelError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = raw.split('.').collect();
        if parts.iter().any(|part| part.is_empty()) {
            return Err(PanelError::UnknownField(raw.to_string()));
        }
        match parts.as_slice() {
            [section, field] => Ok(FieldPath::new(*section, *field)),
            [section, field, index, child] => {
                let index = index
                    .parse()
                    .map_err(|_| PanelError::UnknownField(raw.to_string()))?;
                Ok(FieldPath::new(*section, *field).item(index, *child))
            }
            _ => Err(PanelError::UnknownField(raw.to_string())),
        }
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.section, self.field)?;
        if let Some((index, child)) = &self.item {
            write!(f, ".{index}.{child}")?;
        }
        Ok(())
    }
}

/// Whether `path` is `prefix` itself or nested beneath it.
pub(crate) fn is_under(path: &str, prefix: &str) -> bool {
    path == prefix
        || path
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_field_and_item_paths() {
        let field: FieldPath = "general.name".parse().unwrap();
        assert_eq!(field, FieldPath::new("general", "name"));

        let item: FieldPath = "fees.tiers.2.from".parse().unwrap();
        assert_eq!(item.item, Some((2, "from".to_string())));
        assert_eq!(item.field_path(), "fees.tiers");
        assert_eq!(item.to_string(), "fees.tiers.2.from");
    }

    #[test]
    fn rejects_malformed_paths() {
        for raw in ["general", "a..b", "a.b.c", "a.b.x.c", "a.b.1.c.d"] {
            assert!(raw.parse::<FieldPath>().is_err(), "{raw}");
        }
    }

    #[test]
    fn prefix_matching_respects_segments() {
        assert!(is_under("fees.tiers.0.from", "fees.tiers"));
        assert!(is_under("fees.tiers", "fees.tiers"));
        assert!(!is_under("fees.tiersx", "fees.tiers"));
    }
}
