//! TemplateCatalog: immutable template lookup.

use std::collections::HashMap;

use crate::error::{StateError, StateResult};
use crate::types::ServiceTemplate;

/// Read-only mapping from template key to definition. Shared behind an
/// `Arc`; never mutated after construction, so it needs no lock.
#[derive(Debug, Default)]
pub struct TemplateCatalog {
    templates: Vec<ServiceTemplate>,
    index: HashMap<String, usize>,
}

impl TemplateCatalog {
    pub fn new<I>(templates: I) -> StateResult<Self>
    where
        I: IntoIterator<Item = ServiceTemplate>,
    {
        let mut catalog = Self::default();
        for template in templates {
            if catalog.index.contains_key(&template.key) {
                return Err(StateError::DuplicateTemplate(template.key));
            }
            catalog
                .index
                .insert(template.key.clone(), catalog.templates.len());
            catalog.templates.push(template);
        }
        Ok(catalog)
    }

    pub fn get(&self, key: &str) -> Option<&ServiceTemplate> {
        self.index.get(key).map(|&i| &self.templates[i])
    }

    /// All templates in load order.
    pub fn list(&self) -> Vec<ServiceTemplate> {
        self.templates.clone()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sdv_core::{Domain, Millicores, ResourceRequirements};

    fn template(key: &str) -> ServiceTemplate {
        ServiceTemplate {
            key: key.to_string(),
            name: format!("{key} service"),
            service_type: "test".to_string(),
            domain: Domain::Generic,
            requirements: ResourceRequirements::new(Millicores::from_millis(500), 256, false),
        }
    }

    #[test]
    fn lookup_by_key() {
        let catalog = TemplateCatalog::new(vec![template("a"), template("b")]).unwrap();
        assert_eq!(catalog.get("b").unwrap().name, "b service");
        assert!(catalog.get("c").is_none());
    }

    #[test]
    fn list_keeps_load_order() {
        let catalog =
            TemplateCatalog::new(vec![template("z"), template("a"), template("m")]).unwrap();
        let keys: Vec<_> = catalog.list().into_iter().map(|t| t.key).collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
    }

    #[test]
    fn duplicate_keys_rejected() {
        let err = TemplateCatalog::new(vec![template("a"), template("a")]).unwrap_err();
        assert!(matches!(err, StateError::DuplicateTemplate(k) if k == "a"));
    }
}
