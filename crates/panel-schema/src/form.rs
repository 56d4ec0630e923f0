//! Sections and whole-form schemas.

use serde::Serialize;

use crate::field::{FieldEntry, FieldSchema, FieldSpec};

/// Ordered group of fields with a section-level description.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SectionSchema {
    pub key: String,
    pub description: Option<String>,
    pub fields: Vec<FieldEntry>,
}

impl SectionSchema {
    pub fn new(key: impl Into<String>, fields: Vec<FieldEntry>) -> Self {
        Self {
            key: key.into(),
            description: None,
            fields,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn field(&self, key: &str) -> Option<&FieldSpec> {
        self.fields
            .iter()
            .find(|entry| entry.key == key)
            .map(|entry| &entry.spec)
    }
}

/// Named sections describing an entire form, in declaration order.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct FormSchema {
    pub sections: Vec<SectionSchema>,
}

impl FormSchema {
    pub fn new(sections: Vec<SectionSchema>) -> Self {
        Self { sections }
    }

    pub fn section(&self, key: &str) -> Option<&SectionSchema> {
        self.sections.iter().find(|section| section.key == key)
    }

    /// Resolves `section.field` to its declaration, if the kind is supported.
    pub fn field(&self, section: &str, field: &str) -> Option<&FieldSchema> {
        self.section(section)?.field(field)?.known()
    }

    /// Iterates every top-level field as `(section key, field entry)` in declaration order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &FieldEntry)> {
        self.sections.iter().flat_map(|section| {
            section
                .fields
                .iter()
                .map(move |entry| (section.key.as_str(), entry))
        })
    }
}
