use std::{borrow::Cow, collections::HashMap, path::Path};

use serde::{Deserialize, Serialize};

use crate::Result;

/// Resolves a string key to user-visible text.
///
/// Implementations must fall back to returning the key itself when they
/// have no entry for it.
pub trait Translate {
    fn t<'a>(&'a self, key: &'a str) -> Cow<'a, str>;
}

/// Translator that echoes every key back.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThrough;

impl Translate for PassThrough {
    fn t<'a>(&'a self, key: &'a str) -> Cow<'a, str> {
        Cow::Borrowed(key)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Fr,
    En,
}

impl Language {
    pub fn toggled(self) -> Self {
        match self {
            Language::Fr => Language::En,
            Language::En => Language::Fr,
        }
    }
}

/// Two-language string table loaded from JSON:
/// `{ "fr": { "menu.home": "Accueil" }, "en": { ... } }`.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    language: Language,
    tables: HashMap<Language, HashMap<String, String>>,
}

impl Catalog {
    pub fn new(tables: HashMap<Language, HashMap<String, String>>) -> Self {
        Self {
            language: Language::default(),
            tables,
        }
    }

    pub fn from_json_str(source: &str) -> Result<Self> {
        let document: CatalogDocument = serde_json::from_str(source)?;
        let mut tables = HashMap::new();
        tables.insert(Language::Fr, document.fr);
        tables.insert(Language::En, document.en);
        Ok(Self::new(tables))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_json_str(&source)
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn set_language(&mut self, language: Language) {
        self.language = language;
    }
}

#[derive(Deserialize)]
struct CatalogDocument {
    #[serde(default)]
    fr: HashMap<String, String>,
    #[serde(default)]
    en: HashMap<String, String>,
}

impl Translate for Catalog {
    fn t<'a>(&'a self, key: &'a str) -> Cow<'a, str> {
        match self
            .tables
            .get(&self.language)
            .and_then(|table| table.get(key))
        {
            Some(text) => Cow::Borrowed(text.as_str()),
            None => Cow::Borrowed(key),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLES: &str = r#"{
        "fr": { "menu.home": "Accueil" },
        "en": { "menu.home": "Home", "menu.cv": "Download CV" }
    }"#;

    #[test]
    fn resolves_keys_for_the_active_language() {
        let mut catalog = Catalog::from_json_str(TABLES).unwrap();
        assert_eq!(catalog.t("menu.home"), "Accueil");

        catalog.set_language(catalog.language().toggled());
        assert_eq!(catalog.t("menu.home"), "Home");
        assert_eq!(catalog.t("menu.cv"), "Download CV");
    }

    #[test]
    fn falls_back_to_the_key() {
        let catalog = Catalog::from_json_str(TABLES).unwrap();
        assert_eq!(catalog.t("menu.cv"), "menu.cv");
        assert_eq!(PassThrough.t("hero.cta1"), "hero.cta1");
    }
}
