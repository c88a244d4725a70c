//! Aggregator (§4.10) — the final stage. Concatenates SA/IRB/Slotting
//! output, applies the Basel 3.1 output floor, and builds the three
//! reporting summary views.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::CalculationConfig;
use crate::exposure::ExposureRecord;
use crate::types::{CalculationError, ExposureClass};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClassSummary {
    pub ead: Decimal,
    pub rwa: Decimal,
    pub count: usize,
}

/// The aggregated output of a full pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatedResultBundle {
    pub results: Vec<ExposureRecord>,
    pub total_ead: Decimal,
    pub total_rwa: Decimal,
    pub total_rwa_sa_equivalent: Decimal,
    pub output_floor_add_on: Decimal,
    pub expected_loss: Decimal,
    pub supporting_factor_impact: Decimal,
    /// Pre-CRM exposure summed by `pre_crm_exposure_class`.
    pub pre_crm_summary: HashMap<ExposureClass, ClassSummary>,
    /// Post-CRM exposure summed by `reporting_exposure_class`, with
    /// guaranteed portions folded in at the guarantor's class.
    pub post_crm_summary: HashMap<ExposureClass, ClassSummary>,
    /// Every post-CRM row (including the `-U`/`-G` guarantee split), for
    /// detailed reporting.
    pub post_crm_detailed: Vec<ExposureRecord>,
    pub errors: Vec<CalculationError>,
}

/// SA-equivalent risk weight used by the output floor's standardised
/// denominator: the row's own SA weight if it has one (already computed
/// for SA-approach rows), else a flat fallback matching CRR Art.92a's
/// simplified treatment for this engine's scope (full recomputation of a
/// parallel all-exposures SA run is out of scope, §1 Non-goals).
fn sa_equivalent_rwa(record: &ExposureRecord) -> Decimal {
    if let Some(sa_rwa) = record.sa_rwa_post_factor {
        return sa_rwa;
    }
    let ead = record.ead_final_or_zero();
    let fallback_weight = match record.exposure_class {
        Some(ExposureClass::Defaulted) => Decimal::from(150) / Decimal::from(100),
        Some(c) if c.is_retail() => Decimal::from(75) / Decimal::from(100),
        _ => Decimal::ONE,
    };
    ead * fallback_weight
}

pub fn aggregate(
    records: Vec<ExposureRecord>,
    config: &CalculationConfig,
    errors: Vec<CalculationError>,
) -> AggregatedResultBundle {
    let mut results = records;
    let floor_pct = config.output_floor.floor_pct_on(config.reporting_date);

    for record in &mut results {
        record.reporting_exposure_class = record.exposure_class;
        let rwa_pre_floor = record.final_rwa.unwrap_or(Decimal::ZERO);
        let sa_equivalent = sa_equivalent_rwa(record);
        record.rwa_sa_equivalent = Some(sa_equivalent);

        let floored_rwa = sa_equivalent * floor_pct;
        if floor_pct > Decimal::ZERO && floored_rwa > rwa_pre_floor {
            record.final_rwa = Some(floored_rwa);
            record.output_floor_applied = true;
        } else {
            record.output_floor_applied = false;
        }
    }

    let total_ead: Decimal = results.iter().map(|r| r.ead_final_or_zero()).sum();
    let total_rwa: Decimal = results.iter().map(|r| r.final_rwa.unwrap_or(Decimal::ZERO)).sum();
    let total_rwa_sa_equivalent: Decimal = results.iter().map(|r| r.rwa_sa_equivalent.unwrap_or(Decimal::ZERO)).sum();
    let expected_loss: Decimal = results.iter().filter_map(|r| r.expected_loss).sum();

    let supporting_factor_impact: Decimal = results
        .iter()
        .filter_map(|r| match (r.sa_rwa_pre_factor, r.sa_rwa_post_factor) {
            (Some(pre), Some(post)) => Some(pre - post),
            _ => None,
        })
        .sum();

    let output_floor_add_on: Decimal = results
        .iter()
        .filter(|r| r.output_floor_applied)
        .map(|r| r.final_rwa.unwrap_or(Decimal::ZERO) - r.irb_rwa.or(r.slotting_rwa).unwrap_or(Decimal::ZERO))
        .sum();

    let mut pre_crm_summary: HashMap<ExposureClass, ClassSummary> = HashMap::new();
    for record in &results {
        if record.crm_portion_type == Some(crate::types::CrmPortionType::Guaranteed) {
            continue;
        }
        let class = record.pre_crm_exposure_class.unwrap_or(ExposureClass::Other);
        let entry = pre_crm_summary.entry(class).or_default();
        entry.ead += record.ead_pre_crm.unwrap_or(Decimal::ZERO);
        entry.rwa += record.final_rwa.unwrap_or(Decimal::ZERO);
        entry.count += 1;
    }

    let mut post_crm_summary: HashMap<ExposureClass, ClassSummary> = HashMap::new();
    for record in &results {
        let class = record.reporting_exposure_class.unwrap_or(ExposureClass::Other);
        let entry = post_crm_summary.entry(class).or_default();
        entry.ead += record.ead_final_or_zero();
        entry.rwa += record.final_rwa.unwrap_or(Decimal::ZERO);
        entry.count += 1;
    }

    AggregatedResultBundle {
        post_crm_detailed: results.clone(),
        results,
        total_ead,
        total_rwa,
        total_rwa_sa_equivalent,
        output_floor_add_on,
        expected_loss,
        supporting_factor_impact,
        pre_crm_summary,
        post_crm_summary,
        errors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::test_support::bare_record;
    use crate::types::ApproachType;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn irb_row(ead: Decimal, irb_rwa: Decimal, class: ExposureClass) -> ExposureRecord {
        let mut r = bare_record("E1", ead, ApproachType::Airb);
        r.exposure_class = Some(class);
        r.pre_crm_exposure_class = Some(class);
        r.reporting_exposure_class = Some(class);
        r.ead_final = Some(ead);
        r.ead_pre_crm = Some(ead);
        r.irb_rwa = Some(irb_rwa);
        r.final_rwa = Some(irb_rwa);
        r
    }

    // -- Test: Basel 3.1 output floor lifts RWA to the SA-equivalent floor ----

    #[test]
    fn test_output_floor_lifts_low_irb_rwa() {
        let config = CalculationConfig::basel_3_1(
            "GBP",
            dec!(0.8732),
            NaiveDate::from_ymd_opt(2032, 6, 1).unwrap(),
        );
        let record = irb_row(dec!(100_000), dec!(10_000), ExposureClass::Corporate);
        let bundle = aggregate(vec![record], &config, Vec::new());
        assert!(bundle.results[0].output_floor_applied);
        assert_eq!(bundle.results[0].final_rwa, Some(dec!(72_500.00)));
    }

    // -- Test: CRR carries no output floor -------------------------------------

    #[test]
    fn test_crr_no_floor_applied() {
        let config = CalculationConfig::crr("GBP", dec!(0.8732), NaiveDate::from_ymd_opt(2026, 1, 1).unwrap());
        let record = irb_row(dec!(100_000), dec!(10_000), ExposureClass::Corporate);
        let bundle = aggregate(vec![record], &config, Vec::new());
        assert!(!bundle.results[0].output_floor_applied);
        assert_eq!(bundle.results[0].final_rwa, Some(dec!(10_000)));
    }

    // -- Scenario F1: IRB rwa 50m, SA-equivalent rwa 100m, Basel 3.1 2032+ -----

    #[test]
    fn test_scenario_f1_output_floor_lifts_to_sa_equivalent() {
        let config = CalculationConfig::basel_3_1(
            "GBP",
            dec!(0.8732),
            NaiveDate::from_ymd_opt(2032, 6, 1).unwrap(),
        );
        let mut record = irb_row(dec!(100_000_000), dec!(50_000_000), ExposureClass::Corporate);
        record.sa_rwa_post_factor = Some(dec!(100_000_000));
        let bundle = aggregate(vec![record], &config, Vec::new());
        assert!(bundle.results[0].output_floor_applied);
        assert_eq!(bundle.total_rwa, dec!(72_500_000));
    }

    // -- Test: pre-CRM summary excludes split guaranteed rows ------------------

    #[test]
    fn test_pre_crm_summary_excludes_guaranteed_split() {
        let config = CalculationConfig::crr("GBP", dec!(0.8732), NaiveDate::from_ymd_opt(2026, 1, 1).unwrap());
        let mut guaranteed = irb_row(dec!(50_000), dec!(5_000), ExposureClass::Sovereign);
        guaranteed.crm_portion_type = Some(crate::types::CrmPortionType::Guaranteed);
        guaranteed.pre_crm_exposure_class = Some(ExposureClass::Corporate);
        let mut unguaranteed = irb_row(dec!(50_000), dec!(5_000), ExposureClass::Corporate);
        unguaranteed.crm_portion_type = Some(crate::types::CrmPortionType::Unguaranteed);
        unguaranteed.pre_crm_exposure_class = Some(ExposureClass::Corporate);
        let bundle = aggregate(vec![guaranteed, unguaranteed], &config, Vec::new());
        let summary = bundle.pre_crm_summary.get(&ExposureClass::Corporate).unwrap();
        assert_eq!(summary.count, 1);
    }
}
