//! Entity resolution: raw spreadsheet names to canonical identities.

use std::collections::BTreeSet;

use tracing::debug;

use radprod_model::EntityCategory;
use radprod_store::{Result, Store};

/// Resolves raw names into persistent `NameMapping` rows.
///
/// Discovery is an explicit operation invoked by the upload coordinator,
/// not a side effect of persistence, so it can be exercised independently
/// of a full ingestion run.
pub struct EntityResolver<'a, S: Store + ?Sized> {
    store: &'a S,
}

impl<'a, S: Store + ?Sized> EntityResolver<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Ensure every raw name has a mapping row, creating provisional ones
    /// (formal name = raw name) where absent. Empty names are skipped.
    /// Idempotent; repeated or overlapping calls are no-ops for names
    /// already mapped, and an operator-edited formal name is never touched.
    ///
    /// Returns the number of names newly discovered in this call.
    pub fn resolve(&self, category: EntityCategory, raw_names: &BTreeSet<String>) -> Result<usize> {
        let mut discovered = 0;
        for raw_name in raw_names {
            let trimmed = raw_name.trim();
            if trimmed.is_empty() {
                continue;
            }
            let existing = self.store.get_name_mapping(category, trimmed)?;
            let mapping = self.store.upsert_name_mapping_if_absent(category, trimmed)?;
            if existing.is_none() {
                discovered += 1;
                debug!(category = %category, raw_name = %mapping.raw_name, "discovered entity");
            }
        }
        Ok(discovered)
    }

    /// Canonical name for a raw name. Falls back to the raw name itself
    /// when no mapping row exists; resolution degrades, it does not fail.
    pub fn formal_name_of(&self, category: EntityCategory, raw_name: &str) -> Result<String> {
        Ok(self
            .store
            .get_name_mapping(category, raw_name)?
            .map(|mapping| mapping.formal_name)
            .unwrap_or_else(|| raw_name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use radprod_store::MemoryStore;

    fn names(values: &[&str]) -> BTreeSet<String> {
        values.iter().map(|v| (*v).to_string()).collect()
    }

    #[test]
    fn resolve_counts_only_new_names() {
        let store = MemoryStore::new();
        let resolver = EntityResolver::new(&store);

        let first = resolver
            .resolve(EntityCategory::Institution, &names(&["HOSP_A", "HOSP_B"]))
            .unwrap();
        assert_eq!(first, 2);

        let second = resolver
            .resolve(
                EntityCategory::Institution,
                &names(&["HOSP_B", "HOSP_C", ""]),
            )
            .unwrap();
        assert_eq!(second, 1);
        assert_eq!(
            store
                .list_name_mappings(EntityCategory::Institution)
                .unwrap()
                .len(),
            3
        );
    }

    #[test]
    fn formal_name_defaults_to_raw_name() {
        let store = MemoryStore::new();
        let resolver = EntityResolver::new(&store);
        assert_eq!(
            resolver
                .formal_name_of(EntityCategory::Physician, "DR UNSEEN")
                .unwrap(),
            "DR UNSEEN"
        );

        resolver
            .resolve(EntityCategory::Physician, &names(&["DR SMITH"]))
            .unwrap();
        store
            .set_formal_name(EntityCategory::Physician, "DR SMITH", "Dr. Jane Smith")
            .unwrap();
        assert_eq!(
            resolver
                .formal_name_of(EntityCategory::Physician, "DR SMITH")
                .unwrap(),
            "Dr. Jane Smith"
        );
    }

    #[test]
    fn rediscovery_never_touches_operator_edits() {
        let store = MemoryStore::new();
        let resolver = EntityResolver::new(&store);
        resolver
            .resolve(EntityCategory::Institution, &names(&["HOSP_A"]))
            .unwrap();
        store
            .set_formal_name(EntityCategory::Institution, "HOSP_A", "Hospital Alpha")
            .unwrap();
        resolver
            .resolve(EntityCategory::Institution, &names(&["HOSP_A"]))
            .unwrap();
        assert_eq!(
            resolver
                .formal_name_of(EntityCategory::Institution, "HOSP_A")
                .unwrap(),
            "Hospital Alpha"
        );
    }
}
