//! Language to container image table

use std::collections::BTreeMap;

/// Prefix turning a build image into its revert ("backup") variant
pub const BACKUP_IMAGE_PREFIX: &str = "backup_";

/// Maps a lower-cased language identifier to the image that builds it
///
/// Read-only once the runner is configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageTable {
    images: BTreeMap<String, String>,
}

impl ImageTable {
    /// Creates a table with no supported language
    pub fn empty() -> Self {
        Self {
            images: BTreeMap::new(),
        }
    }

    pub fn with_image(mut self, language: &str, image: impl Into<String>) -> Self {
        self.images.insert(normalize_language(language), image.into());
        self
    }

    pub fn is_supported(&self, language: &str) -> bool {
        self.images.contains_key(&normalize_language(language))
    }

    pub fn image_for(&self, language: &str) -> Option<&str> {
        self.images
            .get(&normalize_language(language))
            .map(String::as_str)
    }

    /// Image to run for a job, the backup variant for revert builds
    pub fn select(&self, language: &str, is_revert: bool) -> Option<String> {
        self.image_for(language).map(|image| {
            if is_revert {
                format!("{}{}", BACKUP_IMAGE_PREFIX, image)
            } else {
                image.to_string()
            }
        })
    }

    pub fn languages(&self) -> impl Iterator<Item = &str> {
        self.images.keys().map(String::as_str)
    }

    /// Applies `lang=image` pairs separated by commas on top of this table
    pub fn with_overrides(mut self, spec: &str) -> Result<Self, String> {
        for pair in spec.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (language, image) = pair
                .split_once('=')
                .ok_or_else(|| format!("image mapping '{}' is not lang=image", pair))?;
            let (language, image) = (language.trim(), image.trim());
            if language.is_empty() || image.is_empty() {
                return Err(format!("image mapping '{}' is not lang=image", pair));
            }
            self.images
                .insert(normalize_language(language), image.to_string());
        }
        Ok(self)
    }
}

impl Default for ImageTable {
    fn default() -> Self {
        Self::empty()
            .with_image("ruby", "xovox/sicuro_ruby:0.2")
            .with_image("javascript", "xovox/sicuro_javascript:0.2")
            .with_image("go", "ci_image:1.16")
    }
}

/// Case-insensitive language key
pub fn normalize_language(language: &str) -> String {
    language.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table() {
        let table = ImageTable::default();
        assert!(table.is_supported("go"));
        assert!(table.is_supported("Ruby"));
        assert!(table.is_supported("JavaScript"));
        assert!(!table.is_supported("cobol"));
        assert_eq!(table.languages().collect::<Vec<_>>(), vec!["go", "javascript", "ruby"]);
    }

    #[test]
    fn test_select_backup_variant() {
        let table = ImageTable::default();
        assert_eq!(table.select("Go", false), Some("ci_image:1.16".to_string()));
        assert_eq!(
            table.select("go", true),
            Some("backup_ci_image:1.16".to_string())
        );
        assert_eq!(table.select("cobol", true), None);
    }

    #[test]
    fn test_overrides() {
        let table = ImageTable::default()
            .with_overrides("rust=ghcr.io/sicuro/rust:1.80, Go=golang:1.22")
            .unwrap();
        assert_eq!(table.image_for("rust"), Some("ghcr.io/sicuro/rust:1.80"));
        assert_eq!(table.image_for("go"), Some("golang:1.22"));
        assert!(table.is_supported("ruby"));

        assert!(ImageTable::default().with_overrides("rust").is_err());
        assert!(ImageTable::default().with_overrides("=img").is_err());
    }
}
