//! Registry of live path templates.
//!
//! # Responsibility
//! - Track every path template owned by a task of the queue.
//! - Suggest free run numbers for a `(prefix, directory)` pair.
//!
//! # Invariants
//! - Entries are template handles; identity is pointer identity, so a
//!   template is found again even after its prefix segments changed.
//! - Grouping by prefix is computed from the live template, never cached.
//! - Allocation only reads; nothing is reserved until a template is registered.

use crate::model::path_template::PathTemplate;
use crate::model::Shared;
use std::collections::BTreeMap;
use std::rc::Rc;

/// Live path templates of one queue.
#[derive(Debug, Default)]
pub struct PathTemplateRegistry {
    templates: Vec<Shared<PathTemplate>>,
}

impl PathTemplateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Registers a template handle. Registering the same handle twice is a no-op.
    pub fn add(&mut self, template: &Shared<PathTemplate>) {
        if !self.contains(template) {
            self.templates.push(template.clone());
        }
    }

    /// Unregisters a template handle. Returns whether it was registered.
    pub fn remove(&mut self, template: &Shared<PathTemplate>) -> bool {
        let before = self.templates.len();
        self.templates.retain(|entry| !Rc::ptr_eq(entry, template));
        self.templates.len() != before
    }

    pub fn contains(&self, template: &Shared<PathTemplate>) -> bool {
        self.templates.iter().any(|entry| Rc::ptr_eq(entry, template))
    }

    /// Templates whose current prefix equals `prefix`.
    pub fn templates_for_prefix(&self, prefix: &str) -> Vec<Shared<PathTemplate>> {
        self.templates
            .iter()
            .filter(|entry| entry.borrow().prefix() == prefix)
            .cloned()
            .collect()
    }

    /// Prefix to templates mapping, keyed by the current prefix.
    pub fn by_prefix(&self) -> BTreeMap<String, Vec<Shared<PathTemplate>>> {
        let mut map: BTreeMap<String, Vec<Shared<PathTemplate>>> = BTreeMap::new();
        for entry in &self.templates {
            let prefix = entry.borrow().prefix();
            map.entry(prefix).or_default().push(entry.clone());
        }
        map
    }

    /// Next run number for `prefix` in `directory`: highest registered + 1, or 1.
    pub fn free_run_number(&self, prefix: &str, directory: &str) -> u32 {
        self.templates
            .iter()
            .filter_map(|entry| {
                let template = entry.borrow();
                let matches = template.prefix() == prefix && template.directory == directory;
                matches.then_some(template.run_number)
            })
            .max()
            .map_or(1, |largest| largest.saturating_add(1))
    }
}

#[cfg(test)]
mod tests {
    use super::PathTemplateRegistry;
    use crate::model::path_template::PathTemplate;
    use crate::model::shared;

    fn template(prefix: &str, directory: &str, run_number: u32) -> crate::model::Shared<PathTemplate> {
        let mut template = PathTemplate::new(prefix, directory);
        template.run_number = run_number;
        shared(template)
    }

    #[test]
    fn free_run_number_starts_at_one() {
        let registry = PathTemplateRegistry::new();
        assert_eq!(registry.free_run_number("x", "/data"), 1);
    }

    #[test]
    fn free_run_number_only_counts_matching_directory() {
        let mut registry = PathTemplateRegistry::new();
        registry.add(&template("x", "/data/a", 3));
        registry.add(&template("x", "/data/b", 9));
        registry.add(&template("y", "/data/a", 12));
        assert_eq!(registry.free_run_number("x", "/data/a"), 4);
        assert_eq!(registry.free_run_number("x", "/data/b"), 10);
        assert_eq!(registry.free_run_number("x", "/data/c"), 1);
    }

    #[test]
    fn remove_finds_template_after_prefix_change() {
        let mut registry = PathTemplateRegistry::new();
        let entry = template("lyso", "/data", 1);
        registry.add(&entry);
        entry.borrow_mut().mad_prefix = "pk".to_string();

        assert_eq!(registry.templates_for_prefix("pk-lyso").len(), 1);
        assert!(registry.templates_for_prefix("lyso").is_empty());
        assert!(registry.remove(&entry));
        assert!(registry.is_empty());
    }

    #[test]
    fn add_is_idempotent_per_handle() {
        let mut registry = PathTemplateRegistry::new();
        let entry = template("x", "/data", 1);
        registry.add(&entry);
        registry.add(&entry);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.by_prefix()["x"].len(), 1);
    }
}
