//! Specialised Lending slotting (§4.9). Consumes the `slotting_category`
//! and `is_hvcre` flags the Classifier's `counterparty_reference`-pattern
//! derivation assigned (`derive_slotting`, §4.5) — this module only looks
//! the weight up and applies the CRR maturity reduction.

use rust_decimal::Decimal;

use crate::config::CalculationConfig;
use crate::exposure::ExposureRecord;
use crate::reference_tables::{crr_slotting_maturity_adjustment, slotting_risk_weight};
use crate::types::{ApproachType, RegulatoryFramework, SlottingCategory};

fn residual_years(record: &ExposureRecord, config: &CalculationConfig) -> Decimal {
    let days = (record.maturity - config.reporting_date).num_days().max(0);
    Decimal::from(days) / Decimal::from(365)
}

/// Applies slotting risk weights to every exposure the Classifier routed
/// to `ApproachType::Slotting`, leaving other approaches untouched.
pub fn calculate(mut records: Vec<ExposureRecord>, config: &CalculationConfig) -> Vec<ExposureRecord> {
    for record in &mut records {
        if record.approach != Some(ApproachType::Slotting) {
            continue;
        }

        let category = record.slotting_category.unwrap_or(SlottingCategory::Weak);
        let mut weight = slotting_risk_weight(config.framework, record.is_hvcre, category);

        if config.framework == RegulatoryFramework::Crr {
            let years = residual_years(record, config);
            if let Some(reduced) = crr_slotting_maturity_adjustment(category, years) {
                weight = reduced;
            }
        }

        let ead = record.ead_final_or_zero();
        record.slotting_risk_weight = Some(weight);
        let rwa = weight * ead;
        record.slotting_rwa = Some(rwa);
        record.final_risk_weight = Some(weight);
        record.final_rwa = Some(rwa);
    }
    records
}
