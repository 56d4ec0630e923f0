//! Explicit per-render context: locale, role, theme, and translations.
//!
//! A [`ViewContext`] is created once per page render and passed to the form and
//! matrix renderers. Nothing in the core reads ambient global state.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use panel_config::{Config, Theme};

use crate::errors::PanelError;

/// Resolves display strings (labels, placeholders, descriptions) for a locale.
pub trait Translate: Send + Sync {
    /// Returns the translation of `key`, or `key` itself when none is known.
    fn translate(&self, key: &str) -> String;
}

/// Leaves every string untouched.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentityTranslator;

impl Translate for IdentityTranslator {
    fn translate(&self, key: &str) -> String {
        key.to_string()
    }
}

/// Flat key → text catalog, typically loaded from a JSON file.
#[derive(Debug, Default, Clone)]
pub struct CatalogTranslator {
    entries: HashMap<String, String>,
}

impl CatalogTranslator {
    pub fn new(entries: HashMap<String, String>) -> Self {
        Self { entries }
    }

    pub fn from_json_str(data: &str) -> Result<Self, PanelError> {
        let entries: HashMap<String, String> = serde_json::from_str(data)?;
        Ok(Self::new(entries))
    }

    pub fn from_file(path: &Path) -> Result<Self, PanelError> {
        let data = fs::read_to_string(path)?;
        Self::from_json_str(&data)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Translate for CatalogTranslator {
    fn translate(&self, key: &str) -> String {
        self.entries
            .get(key)
            .cloned()
            .unwrap_or_else(|| key.to_string())
    }
}

#[derive(Clone)]
pub struct ViewContext {
    pub locale: String,
    pub is_admin: bool,
    pub theme: Theme,
    translator: Arc<dyn Translate>,
}

impl ViewContext {
    pub fn new(locale: impl Into<String>, is_admin: bool) -> Self {
        Self {
            locale: locale.into(),
            is_admin,
            theme: Theme::default(),
            translator: Arc::new(IdentityTranslator),
        }
    }

    /// Builds the context from persisted preferences, loading the translation
    /// catalog when one is configured.
    pub fn from_config(config: &Config) -> Result<Self, PanelError> {
        let mut context = Self::new(config.locale.clone(), config.is_admin).with_theme(config.theme);
        if let Some(path) = &config.translations {
            let catalog = CatalogTranslator::from_file(path)?;
            tracing::debug!(entries = catalog.len(), path = %path.display(), "translation catalog loaded");
            context = context.with_translator(Arc::new(catalog));
        }
        Ok(context)
    }

    pub fn with_theme(mut self, theme: Theme) -> Self {
        self.theme = theme;
        self
    }

    pub fn with_translator(mut self, translator: Arc<dyn Translate>) -> Self {
        self.translator = translator;
        self
    }

    pub fn t(&self, key: &str) -> String {
        self.translator.translate(key)
    }

    pub fn t_opt(&self, key: Option<&str>) -> Option<String> {
        key.map(|key| self.t(key))
    }
}

impl Default for ViewContext {
    fn default() -> Self {
        Self::new("en-US", false)
    }
}

impl fmt::Debug for ViewContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewContext")
            .field("locale", &self.locale)
            .field("is_admin", &self.is_admin)
            .field("theme", &self.theme)
            .finish_non_exhaustive()
    }
}
