//! TOML-backed message catalog.
//!
//! Sections flatten to dotted keys: `[steps] then = "Then"` becomes
//! `steps.then`. Values may contain `{name}` placeholders.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

use super::{interpolate, Localizer};

const ENGLISH: &str = include_str!("../../locales/en.toml");

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid catalog: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("catalog entry `{key}` is not a string")]
    NotText { key: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    entries: HashMap<String, String>,
}

impl Catalog {
    /// The built-in English catalog
    pub fn english() -> Self {
        match Self::from_toml_str(ENGLISH) {
            Ok(catalog) => catalog,
            Err(err) => {
                warn!(error = %err, "built-in catalog is invalid");
                Self::default()
            }
        }
    }

    pub fn from_toml_str(text: &str) -> Result<Self, CatalogError> {
        let table: toml::Table = text.parse()?;
        let mut entries = HashMap::new();
        flatten("", &table, &mut entries)?;
        Ok(Self { entries })
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let text = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let catalog = Self::from_toml_str(&text)?;
        debug!(path = %path.display(), entries = catalog.len(), "loaded catalog");
        Ok(catalog)
    }

    /// English entries overridden by the file at `path`
    pub fn english_with_overrides(path: &Path) -> Result<Self, CatalogError> {
        let mut catalog = Self::english();
        catalog.extend(Self::load(path)?);
        Ok(catalog)
    }

    pub fn extend(&mut self, other: Catalog) {
        self.entries.extend(other.entries);
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn flatten(
    prefix: &str,
    table: &toml::Table,
    entries: &mut HashMap<String, String>,
) -> Result<(), CatalogError> {
    for (name, value) in table {
        let key = if prefix.is_empty() {
            name.clone()
        } else {
            format!("{}.{}", prefix, name)
        };
        match value {
            toml::Value::String(text) => {
                entries.insert(key, text.clone());
            }
            toml::Value::Table(inner) => flatten(&key, inner, entries)?,
            _ => return Err(CatalogError::NotText { key }),
        }
    }
    Ok(())
}

impl Localizer for Catalog {
    /// Missing keys come back as the key itself
    fn t(&self, key: &str, args: &[(&str, &str)]) -> String {
        match self.get(key) {
            Some(template) => interpolate(template, args),
            None => {
                warn!(key, "missing catalog entry");
                key.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maplit::hashmap;

    #[test]
    fn flattens_sections_to_dotted_keys() {
        let catalog = Catalog::from_toml_str(
            r#"
top = "Top"
[steps]
then = "Then"
[steps.nested]
deep = "Deep {n}"
"#,
        )
        .unwrap();

        let expected = hashmap! {
            "top" => "Top",
            "steps.then" => "Then",
            "steps.nested.deep" => "Deep {n}",
        };
        assert_eq!(catalog.len(), expected.len());
        for (key, value) in expected {
            assert_eq!(catalog.get(key), Some(value));
        }
        assert_eq!(catalog.t("steps.nested.deep", &[("n", "3")]), "Deep 3");
    }

    #[test]
    fn rejects_non_text_entries() {
        let err = Catalog::from_toml_str("[steps]\ncount = 3\n").unwrap_err();
        assert!(matches!(err, CatalogError::NotText { ref key } if key == "steps.count"));
    }

    #[test]
    fn rejects_invalid_toml() {
        assert!(matches!(
            Catalog::from_toml_str("[steps\n"),
            Err(CatalogError::Parse(_))
        ));
    }

    #[test]
    fn missing_key_returns_key() {
        let catalog = Catalog::default();
        assert_eq!(catalog.t("steps.nothing", &[]), "steps.nothing");
    }

    #[test]
    fn english_catalog_loads() {
        let catalog = Catalog::english();
        assert!(!catalog.is_empty());
        assert_eq!(catalog.t("steps.then", &[]), "Then");
        assert_eq!(
            catalog.t("actions.navigation_with_url", &[("url", "https://a.test")]),
            "Navigate to https://a.test"
        );
    }

    #[test]
    fn overrides_replace_english_entries() {
        let mut catalog = Catalog::english();
        catalog.extend(Catalog::from_toml_str("[steps]\nthen = \"Alors\"\n").unwrap());
        assert_eq!(catalog.t("steps.then", &[]), "Alors");
        assert_eq!(catalog.t("steps.else", &[]), "Else");
    }

    #[test]
    fn load_reports_missing_file() {
        let err = Catalog::load(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, CatalogError::Io { .. }));
    }
}
