//! Grouped aggregation of validated production events.

use std::collections::BTreeMap;

use tracing::warn;

use radprod_model::{ProductionEvent, StatKey, StatMeasures};
use radprod_store::{Result, Store};

use crate::sla::SlaResolver;

#[derive(Debug, Default)]
struct Accumulator {
    count: u64,
    turnaround_sum: i64,
    addendum_count: u64,
    sla_compliant_count: u64,
}

impl Accumulator {
    fn finalize(&self) -> StatMeasures {
        StatMeasures {
            exam_count: self.count,
            mean_turnaround_minutes: if self.count == 0 {
                0.0
            } else {
                self.turnaround_sum as f64 / self.count as f64
            },
            addendum_count: self.addendum_count,
            sla_compliant_count: self.sla_compliant_count,
        }
    }
}

/// Result of one aggregation pass.
#[derive(Debug)]
pub struct AggregationOutcome {
    pub stats: BTreeMap<StatKey, StatMeasures>,
    /// Events excluded because they lack `validated_at`. They remain as raw
    /// audit rows but never reach the summary.
    pub skipped_unvalidated: usize,
}

/// Group validated events by (validation day, institution, validating
/// physician, modality, patient type) and accumulate the measures.
///
/// Unvalidated events are excluded entirely; turnaround is 0 when the
/// assignment timestamp is missing and clamps negative durations to 0
/// (clamped records are logged so clock-skew problems stay visible).
pub fn aggregate<S: Store + ?Sized>(
    events: &[ProductionEvent],
    sla: &SlaResolver<'_, S>,
) -> Result<AggregationOutcome> {
    let mut groups: BTreeMap<StatKey, Accumulator> = BTreeMap::new();
    let mut skipped_unvalidated = 0;

    for event in events {
        let Some(validated_at) = event.validated_at else {
            skipped_unvalidated += 1;
            continue;
        };

        let turnaround = match event.assigned_at {
            Some(assigned_at) => {
                let minutes = (validated_at - assigned_at).num_minutes();
                if minutes < 0 {
                    warn!(
                        event_id = %event.event_id,
                        minutes,
                        "negative turnaround clamped to 0"
                    );
                }
                minutes.max(0)
            }
            None => 0,
        };

        let target = sla.target_minutes(
            &event.institution_raw,
            &event.modality,
            event.patient_type.code(),
        )?;

        let key = StatKey {
            report_date: validated_at.date(),
            institution_raw: event.institution_raw.clone(),
            physician_raw: event.physician_validated_raw.clone(),
            modality: event.modality.clone(),
            patient_type: event.patient_type.code().to_string(),
        };
        let group = groups.entry(key).or_default();
        group.count += 1;
        group.turnaround_sum += turnaround;
        if event.has_addendum() {
            group.addendum_count += 1;
        }
        if turnaround <= target {
            group.sla_compliant_count += 1;
        }
    }

    Ok(AggregationOutcome {
        stats: groups
            .into_iter()
            .map(|(key, accumulator)| (key, accumulator.finalize()))
            .collect(),
        skipped_unvalidated,
    })
}

/// Upsert each finalized group by its composite key. An existing row for
/// the same key is replaced with the new measures, never summed.
pub fn persist_stats<S: Store + ?Sized>(
    outcome: &AggregationOutcome,
    store: &S,
) -> Result<usize> {
    for (key, measures) in &outcome.stats {
        store.upsert_consolidated_stat(key, measures)?;
    }
    Ok(outcome.stats.len())
}
