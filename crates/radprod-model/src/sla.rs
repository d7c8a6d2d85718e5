use serde::{Deserialize, Serialize};

/// Hard-coded fallback target when no rule matches: 24 hours.
pub const DEFAULT_TARGET_MINUTES: i64 = 1440;

/// A configurable turnaround target.
///
/// At most one rule exists per (institution, modality, patient type);
/// `institution = None` is the global fallback for that (modality, patient
/// type) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlaRule {
    pub id: u64,
    pub institution: Option<String>,
    pub modality: String,
    pub patient_type: String,
    pub target_minutes: i64,
}

impl SlaRule {
    /// The uniqueness key this rule occupies.
    pub fn key(&self) -> (Option<&str>, &str, &str) {
        (
            self.institution.as_deref(),
            self.modality.as_str(),
            self.patient_type.as_str(),
        )
    }
}

/// A rule as submitted by an operator or the default seeder, before the
/// store assigns an id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSlaRule {
    pub institution: Option<String>,
    pub modality: String,
    pub patient_type: String,
    pub target_minutes: i64,
}

impl NewSlaRule {
    pub fn global(
        modality: impl Into<String>,
        patient_type: impl Into<String>,
        target_minutes: i64,
    ) -> Self {
        Self {
            institution: None,
            modality: modality.into(),
            patient_type: patient_type.into(),
            target_minutes,
        }
    }

    pub fn institutional(
        institution: impl Into<String>,
        modality: impl Into<String>,
        patient_type: impl Into<String>,
        target_minutes: i64,
    ) -> Self {
        Self {
            institution: Some(institution.into()),
            modality: modality.into(),
            patient_type: patient_type.into(),
            target_minutes,
        }
    }
}
