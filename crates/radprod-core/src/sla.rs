//! SLA rule resolution and default seeding.

use tracing::{debug, info};

use radprod_model::{DEFAULT_TARGET_MINUTES, NewSlaRule, SlaRule};
use radprod_store::{Result, Store};

/// Modalities covered when seeding a newly discovered institution.
pub const SEED_MODALITIES: &[&str] = &["CT", "MR", "DX", "US", "MG"];

/// Patient-type codes covered when seeding.
pub const SEED_PATIENT_TYPES: &[&str] = &["U", "A", "H"];

/// Resolves target turnaround minutes with institution-specific / global /
/// default precedence, and seeds baseline rules for new institutions.
pub struct SlaResolver<'a, S: Store + ?Sized> {
    store: &'a S,
}

impl<'a, S: Store + ?Sized> SlaResolver<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Target minutes for a record. Resolution order is exact:
    /// 1. institution-specific rule
    /// 2. global rule (no institution)
    /// 3. `DEFAULT_TARGET_MINUTES` (1440)
    pub fn target_minutes(
        &self,
        institution_raw: &str,
        modality: &str,
        patient_type: &str,
    ) -> Result<i64> {
        if let Some(rule) = self.find_rule(Some(institution_raw), modality, patient_type)? {
            return Ok(rule.target_minutes);
        }
        if let Some(rule) = self.find_rule(None, modality, patient_type)? {
            return Ok(rule.target_minutes);
        }
        Ok(DEFAULT_TARGET_MINUTES)
    }

    fn find_rule(
        &self,
        institution: Option<&str>,
        modality: &str,
        patient_type: &str,
    ) -> Result<Option<SlaRule>> {
        let rules = match institution {
            Some(name) => self.store.list_sla_rules(Some(name))?,
            None => self
                .store
                .list_sla_rules(None)?
                .into_iter()
                .filter(|rule| rule.institution.is_none())
                .collect(),
        };
        Ok(rules
            .into_iter()
            .find(|rule| rule.modality == modality && rule.patient_type == patient_type))
    }

    /// Seed one default rule per known (modality, patient type) pair for an
    /// institution that has no rules of any kind yet, giving operators a
    /// starting point to edit instead of an empty table.
    ///
    /// Does nothing when the institution already has at least one rule, so
    /// partial manual configuration is never clobbered. Returns the number
    /// of rules seeded.
    pub fn seed_institution_defaults(&self, institution: &str) -> Result<usize> {
        let existing = self.store.list_sla_rules(Some(institution))?;
        if !existing.is_empty() {
            debug!(institution, rules = existing.len(), "seeding skipped, rules exist");
            return Ok(0);
        }
        let mut seeded = 0;
        for modality in SEED_MODALITIES {
            for patient_type in SEED_PATIENT_TYPES {
                self.store.upsert_sla_rule(NewSlaRule::institutional(
                    institution,
                    *modality,
                    *patient_type,
                    DEFAULT_TARGET_MINUTES,
                ))?;
                seeded += 1;
            }
        }
        info!(institution, seeded, "seeded default SLA rules");
        Ok(seeded)
    }

    /// Operator mutation: insert or replace the rule on its key.
    pub fn upsert_rule(&self, rule: NewSlaRule) -> Result<SlaRule> {
        self.store.upsert_sla_rule(rule)
    }

    /// Operator mutation: delete a rule by id.
    pub fn delete_rule(&self, id: u64) -> Result<()> {
        self.store.delete_sla_rule(id)
    }
}
