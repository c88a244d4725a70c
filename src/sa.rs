//! Standardised Approach risk weighting (§4.7). Only exposures the
//! Classifier routed to `ApproachType::Sa` are touched here; everything
//! else passes through unmodified.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::config::CalculationConfig;
use crate::exposure::ExposureRecord;
use crate::reference_tables::{
    commercial_re_params, residential_mortgage_params, sa_cqs_risk_weight, sa_defaulted_risk_weight,
    RETAIL_RISK_WEIGHT,
};
use crate::types::{ApproachType, ExposureClass, ProductType, RegulatoryFramework};

/// Converts a base-currency amount to EUR for comparison against the
/// EUR-denominated Art.501/501a thresholds.
fn to_eur(amount: Decimal, config: &CalculationConfig) -> Decimal {
    if config.base_currency.eq_ignore_ascii_case("EUR") {
        amount
    } else {
        amount / config.eur_gbp_rate
    }
}

fn mortgage_risk_weight(record: &ExposureRecord, framework: RegulatoryFramework) -> Decimal {
    let ltv = record.ltv.unwrap_or(Decimal::ONE);
    match record.product_type {
        ProductType::CommercialRealEstate => {
            let p = commercial_re_params(framework);
            if ltv <= p.ltv_threshold && record.has_income_cover {
                p.rw_low_ltv
            } else {
                p.rw_standard
            }
        }
        _ => {
            let p = residential_mortgage_params(framework);
            if ltv <= p.ltv_threshold {
                p.rw_low_ltv
            } else if ltv > Decimal::ZERO {
                // Weighted-average split at the LTV threshold (CRR Art.125;
                // Basel 3.1's granular bands collapse to the same split here).
                p.rw_low_ltv * (p.ltv_threshold / ltv) + p.rw_high_ltv * ((ltv - p.ltv_threshold) / ltv)
            } else {
                p.rw_high_ltv
            }
        }
    }
}

fn base_risk_weight(record: &ExposureRecord, config: &CalculationConfig) -> Decimal {
    let class = record.exposure_class.unwrap_or(ExposureClass::Other);

    if record.is_defaulted {
        return sa_defaulted_risk_weight(record.secured_collateral_type.is_some());
    }

    match class {
        ExposureClass::RetailMortgage => mortgage_risk_weight(record, config.framework),
        ExposureClass::RetailQrre | ExposureClass::RetailOther => RETAIL_RISK_WEIGHT,
        ExposureClass::Sovereign | ExposureClass::Institution | ExposureClass::Corporate
        | ExposureClass::CorporateSme => {
            let use_uk_deviation = config.base_currency.eq_ignore_ascii_case("GBP");
            sa_cqs_risk_weight(class, record.resolved_cqs.unwrap_or(0), use_uk_deviation)
        }
        _ => dec!(1.00),
    }
}

/// Art.501/501a supporting factors: minimum-factor-wins when an exposure
/// qualifies for both the SME and infrastructure discounts. CRR only —
/// Basel 3.1 configs carry a `SupportingFactors` with `enabled == false`.
fn supporting_factor(record: &ExposureRecord, config: &CalculationConfig) -> Decimal {
    let factors = &config.supporting_factors;
    if !factors.enabled {
        return Decimal::ONE;
    }

    let mut candidates = Vec::new();

    if record.is_sme {
        let group_drawn_eur = to_eur(
            record.lending_group_total_drawn.unwrap_or(record.drawn_amount),
            config,
        );
        candidates.push(if group_drawn_eur <= factors.sme_exposure_threshold_eur {
            factors.sme_factor_under_threshold
        } else {
            factors.sme_factor_above_threshold
        });
    }

    if record.is_infrastructure {
        candidates.push(factors.infrastructure_factor);
    }

    candidates.into_iter().min().unwrap_or(Decimal::ONE)
}

/// Applies SA risk weighting to every exposure the Classifier routed here,
/// leaving exposures on other approaches untouched.
pub fn calculate(mut records: Vec<ExposureRecord>, config: &CalculationConfig) -> Vec<ExposureRecord> {
    for record in &mut records {
        if record.approach != Some(ApproachType::Sa) {
            continue;
        }

        let risk_weight = base_risk_weight(record, config);
        let ead = record.ead_final_or_zero();
        let rwa_pre_factor = ead * risk_weight;
        let factor = supporting_factor(record, config);
        let rwa_post_factor = rwa_pre_factor * factor;

        record.sa_risk_weight = Some(risk_weight);
        record.sa_rwa_pre_factor = Some(rwa_pre_factor);
        record.supporting_factor = Some(factor);
        record.sa_rwa_post_factor = Some(rwa_post_factor);
        record.final_risk_weight = Some(risk_weight * factor);
        record.final_rwa = Some(rwa_post_factor);
    }
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::test_support::bare_record;

    fn sa_record(drawn: Decimal, class: ExposureClass, cqs: Option<u8>) -> ExposureRecord {
        let mut r = bare_record("E1", drawn, ApproachType::Sa);
        r.exposure_class = Some(class);
        r.resolved_cqs = cqs;
        r.ead_final = Some(drawn);
        r
    }

    // -- Test: retail flat 75% (invariant 8) ------------------------------------

    #[test]
    fn test_retail_flat_weight() {
        let config = CalculationConfig::crr(
            "GBP",
            dec!(0.85),
            chrono::NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
        );
        let record = sa_record(dec!(10_000), ExposureClass::RetailOther, None);
        let out = calculate(vec![record], &config);
        assert_eq!(out[0].sa_risk_weight, Some(dec!(0.75)));
        assert_eq!(out[0].sa_rwa_pre_factor, Some(dec!(7_500)));
    }

    // -- Test: defaulted overrides class-based weight -------------------------

    #[test]
    fn test_defaulted_overrides_class() {
        let config = CalculationConfig::crr(
            "GBP",
            dec!(0.85),
            chrono::NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
        );
        let mut record = sa_record(dec!(10_000), ExposureClass::Corporate, Some(1));
        record.is_defaulted = true;
        let out = calculate(vec![record], &config);
        assert_eq!(out[0].sa_risk_weight, Some(dec!(1.50)));
    }

    // -- Test: SME supporting factor applied under threshold ------------------

    #[test]
    fn test_sme_factor_under_threshold() {
        let config = CalculationConfig::crr(
            "GBP",
            dec!(0.85),
            chrono::NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
        );
        let mut record = sa_record(dec!(100_000), ExposureClass::CorporateSme, Some(3));
        record.is_sme = true;
        record.lending_group_total_drawn = Some(dec!(100_000));
        let out = calculate(vec![record], &config);
        assert_eq!(out[0].supporting_factor, Some(dec!(0.7619)));
    }

    // -- Scenario A1: UK sovereign, CQS 1, CRR -> rw 0, rwa 0 ------------------

    #[test]
    fn test_scenario_a1_sovereign_cqs1_zero_weight() {
        let config = CalculationConfig::crr(
            "GBP",
            dec!(0.85),
            chrono::NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
        );
        let record = sa_record(dec!(1_000_000), ExposureClass::Sovereign, Some(1));
        let out = calculate(vec![record], &config);
        assert_eq!(out[0].sa_risk_weight, Some(dec!(0.00)));
        assert_eq!(out[0].sa_rwa_post_factor, Some(dec!(0)));
    }

    // -- Scenario A4: UK bank, CQS 2, CRR, GBP reporting -> 30% UK deviation --

    #[test]
    fn test_scenario_a4_uk_institution_deviation_under_crr_gbp() {
        let config = CalculationConfig::crr(
            "GBP",
            dec!(0.85),
            chrono::NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
        );
        let record = sa_record(dec!(1_000_000), ExposureClass::Institution, Some(2));
        let out = calculate(vec![record], &config);
        assert_eq!(out[0].sa_risk_weight, Some(dec!(0.30)));
        assert_eq!(out[0].sa_rwa_post_factor, Some(dec!(300_000)));
    }

    // -- Scenario A6: residential mortgage, LTV 85%, CRR -----------------------

    #[test]
    fn test_scenario_a6_residential_mortgage_high_ltv() {
        let config = CalculationConfig::crr(
            "GBP",
            dec!(0.85),
            chrono::NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
        );
        let mut record = sa_record(dec!(850_000), ExposureClass::RetailMortgage, None);
        record.product_type = crate::types::ProductType::ResidentialMortgage;
        record.ltv = Some(dec!(0.85));
        let out = calculate(vec![record], &config);
        let rw = out[0].sa_risk_weight.unwrap();
        assert!((rw - dec!(0.3735)).abs() < dec!(0.001));
        let rwa = out[0].sa_rwa_post_factor.unwrap();
        assert!((rwa - dec!(317_475)).abs() < dec!(1000));
    }

    // -- Scenario A10: unrated SME corporate, turnover £30m, CRR ---------------

    #[test]
    fn test_scenario_a10_sme_corporate_supporting_factor() {
        let config = CalculationConfig::crr(
            "GBP",
            dec!(0.85),
            chrono::NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
        );
        let mut record = sa_record(dec!(1_000_000), ExposureClass::CorporateSme, None);
        record.is_sme = true;
        record.lending_group_total_drawn = Some(dec!(1_000_000));
        let out = calculate(vec![record], &config);
        assert_eq!(out[0].sa_rwa_pre_factor, Some(dec!(1_000_000)));
        assert_eq!(out[0].supporting_factor, Some(dec!(0.7619)));
        let rwa = out[0].sa_rwa_post_factor.unwrap();
        assert!((rwa - dec!(761_900)).abs() < dec!(100));
    }

    // -- Scenario D4: guaranteed portion substituted to guarantor's SA weight -

    #[test]
    fn test_scenario_d4_guarantee_substitution_via_sa() {
        let config = CalculationConfig::crr(
            "GBP",
            dec!(0.85),
            chrono::NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
        );
        // Unguaranteed 400k stays at the original unrated-corporate 100% weight.
        let unguaranteed = sa_record(dec!(400_000), ExposureClass::Corporate, None);
        // Guaranteed 600k is re-pointed at the CQS-1 sovereign guarantor.
        let guaranteed = sa_record(dec!(600_000), ExposureClass::Sovereign, Some(1));
        let out = calculate(vec![unguaranteed, guaranteed], &config);
        let total_rwa: Decimal = out.iter().map(|r| r.sa_rwa_post_factor.unwrap()).sum();
        assert_eq!(total_rwa, dec!(400_000));
    }

    // -- Test: non-SA approach passes through untouched ------------------------

    #[test]
    fn test_non_sa_passthrough() {
        let config = CalculationConfig::crr(
            "GBP",
            dec!(0.85),
            chrono::NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
        );
        let mut record = sa_record(dec!(10_000), ExposureClass::Corporate, Some(1));
        record.approach = Some(ApproachType::Firb);
        let out = calculate(vec![record], &config);
        assert_eq!(out[0].sa_risk_weight, None);
    }

    // -- Invariant 1: ead_final, rwa, risk_weight are never negative -----------

    #[test]
    fn test_invariant_non_negative_outputs() {
        let config = CalculationConfig::crr(
            "GBP",
            dec!(0.85),
            chrono::NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
        );
        let mut defaulted = sa_record(dec!(10_000), ExposureClass::Corporate, Some(1));
        defaulted.is_defaulted = true;
        let sovereign = sa_record(dec!(500_000), ExposureClass::Sovereign, Some(1));
        let out = calculate(vec![defaulted, sovereign], &config);
        for record in &out {
            assert!(record.ead_final_or_zero() >= Decimal::ZERO);
            assert!(record.sa_risk_weight.unwrap_or(Decimal::ZERO) >= Decimal::ZERO);
            assert!(record.sa_rwa_post_factor.unwrap_or(Decimal::ZERO) >= Decimal::ZERO);
        }
    }
}
