//! Per-CDN schema registry shared by sync tasks and the HTTP API.

use std::collections::HashMap;

use serde::Serialize;

use crate::sync_file::CdnDefinition;
use crate::ConfigError;

/// Resolved description of one CDN.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CdnSchema {
    pub slug: String,
    pub name: String,
    /// Key under which this CDN's data appears in the sync payload.
    pub source_key: String,
    pub url: Option<String>,
}

impl From<&CdnDefinition> for CdnSchema {
    fn from(def: &CdnDefinition) -> Self {
        let slug = def.slug();
        Self {
            source_key: def.source_key.clone().unwrap_or_else(|| slug.clone()),
            slug,
            name: def.name.clone(),
            url: def.url.clone(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    schemas: Vec<CdnSchema>,
    by_slug: HashMap<String, usize>,
}

impl SchemaRegistry {
    /// Build one schema per CDN definition, preserving configured order.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if two definitions resolve to the
    /// same slug.
    pub fn build(cdns: &[CdnDefinition]) -> Result<Self, ConfigError> {
        let mut registry = Self::default();
        for def in cdns {
            let schema = CdnSchema::from(def);
            if registry.by_slug.contains_key(&schema.slug) {
                return Err(ConfigError::Validation(format!(
                    "duplicate cdn slug: '{}'",
                    schema.slug
                )));
            }
            registry
                .by_slug
                .insert(schema.slug.clone(), registry.schemas.len());
            registry.schemas.push(schema);
        }
        Ok(registry)
    }

    #[must_use]
    pub fn get(&self, slug: &str) -> Option<&CdnSchema> {
        self.by_slug.get(slug).map(|&i| &self.schemas[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &CdnSchema> {
        self.schemas.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cdn(name: &str, source_key: Option<&str>) -> CdnDefinition {
        CdnDefinition {
            name: name.to_string(),
            slug: None,
            source_key: source_key.map(String::from),
            url: None,
        }
    }

    #[test]
    fn build_derives_slug_and_source_key() {
        let registry =
            SchemaRegistry::build(&[cdn("jsDelivr", None), cdn("cdnjs", Some("cloudflare"))])
                .unwrap();

        assert_eq!(registry.len(), 2);
        let jsdelivr = registry.get("jsdelivr").expect("jsdelivr schema");
        assert_eq!(jsdelivr.source_key, "jsdelivr");
        let cdnjs = registry.get("cdnjs").expect("cdnjs schema");
        assert_eq!(cdnjs.source_key, "cloudflare");
    }

    #[test]
    fn iteration_keeps_configured_order() {
        let registry =
            SchemaRegistry::build(&[cdn("Zeta", None), cdn("Alpha", None)]).unwrap();
        let slugs: Vec<&str> = registry.iter().map(|s| s.slug.as_str()).collect();
        assert_eq!(slugs, vec!["zeta", "alpha"]);
    }

    #[test]
    fn explicit_slug_wins() {
        let mut def = cdn("Google Hosted Libraries", None);
        def.slug = Some("google".to_string());
        let registry = SchemaRegistry::build(&[def]).unwrap();
        assert!(registry.get("google").is_some());
        assert!(registry.get("google-hosted-libraries").is_none());
    }

    #[test]
    fn rejects_duplicate_slugs() {
        let err = SchemaRegistry::build(&[cdn("jsDelivr", None), cdn("JSDELIVR", None)])
            .unwrap_err();
        assert!(err.to_string().contains("duplicate cdn slug"));
    }

    #[test]
    fn unknown_slug_is_none() {
        let registry = SchemaRegistry::build(&[cdn("jsDelivr", None)]).unwrap();
        assert!(registry.get("unpkg").is_none());
        assert!(!registry.is_empty());
    }
}
