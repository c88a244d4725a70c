//! Classifier (§4.5). Assigns exposure class, calculation approach, and
//! (for specialised lending) slotting category, via a fixed priority chain
//! over the counterparty/product attributes the Hierarchy Resolver merged
//! onto each record.

use rust_decimal::Decimal;

use crate::config::CalculationConfig;
use crate::data::EntityType;
use crate::exposure::ExposureRecord;
use crate::types::{
    ApproachType, CalculationError, ErrorCategory, ErrorSeverity, ExposureClass, ProductType,
    SlottingCategory, SpecialisedLendingType,
};

fn to_eur(amount: Decimal, config: &CalculationConfig) -> Decimal {
    if config.base_currency == "EUR" {
        amount
    } else {
        amount / config.eur_gbp_rate
    }
}

/// Priority chain over entity attributes, before any retail refinement.
fn classify_entity(record: &ExposureRecord, config: &CalculationConfig) -> ExposureClass {
    match record.entity_type {
        EntityType::Sovereign | EntityType::CentralBank => ExposureClass::Sovereign,
        _ if record.is_rgla => ExposureClass::Rgla,
        _ if record.is_pse => ExposureClass::Pse,
        _ if record.is_mdb => ExposureClass::Mdb,
        EntityType::Institution => ExposureClass::Institution,
        _ if record.is_financial_institution || record.is_central_counterparty => {
            ExposureClass::Institution
        }
        EntityType::Individual => ExposureClass::RetailOther,
        _ if record.is_managed_as_retail => ExposureClass::RetailOther,
        EntityType::SpecialisedLendingSpv => ExposureClass::SpecialisedLending,
        EntityType::Corporate | EntityType::Other => {
            let turnover_eur = record.annual_revenue.map(|r| to_eur(r, config));
            match turnover_eur {
                Some(t) if t < config.supporting_factors.sme_turnover_threshold_eur => {
                    ExposureClass::CorporateSme
                }
                _ => ExposureClass::Corporate,
            }
        }
    }
}

/// Retail product refinement (Art.123): mortgage product tag wins, QRRE is
/// recognised by product only when not already a mortgage, everything else
/// managed-as-retail falls to RetailOther.
fn refine_retail_product(record: &ExposureRecord, config: &CalculationConfig) -> ExposureClass {
    match record.product_type {
        ProductType::ResidentialMortgage | ProductType::CommercialRealEstate => {
            ExposureClass::RetailMortgage
        }
        ProductType::Facility
            if record.revolving
                && record.drawn_amount + record.nominal_amount
                    <= config.retail_thresholds.qrre_max_limit =>
        {
            ExposureClass::RetailQrre
        }
        _ => ExposureClass::RetailOther,
    }
}

fn assign_approach(
    class: ExposureClass,
    record: &ExposureRecord,
    config: &CalculationConfig,
) -> ApproachType {
    if class == ExposureClass::SpecialisedLending {
        return if config.irb_permissions.permits(class, ApproachType::Airb) {
            ApproachType::Airb
        } else {
            ApproachType::Slotting
        };
    }
    if class.is_retail() {
        return if config.irb_permissions.permits(class, ApproachType::Airb) {
            ApproachType::Airb
        } else {
            ApproachType::Sa
        };
    }
    // Sovereign / Institution / Corporate / CorporateSme / Pse / Mdb / Rgla.
    if config.irb_permissions.permits(class, ApproachType::Airb) {
        ApproachType::Airb
    } else if config.irb_permissions.permits(class, ApproachType::Firb) {
        ApproachType::Firb
    } else {
        let _ = record; // approach depends only on class + config here
        ApproachType::Sa
    }
}

/// Derives `slotting_category` from a `_STRONG`/`_GOOD`/`_SATISFACTORY`/
/// `_WEAK`/`_DEFAULT` substring in the uppercased `counterparty_reference`,
/// defaulting to `Satisfactory` when none match.
fn slotting_category_from_reference(counterparty_reference: &str) -> SlottingCategory {
    let upper = counterparty_reference.to_uppercase();
    if upper.contains("_STRONG") {
        SlottingCategory::Strong
    } else if upper.contains("_GOOD") {
        SlottingCategory::Good
    } else if upper.contains("_WEAK") {
        SlottingCategory::Weak
    } else if upper.contains("_DEFAULT") {
        SlottingCategory::Default
    } else {
        SlottingCategory::Satisfactory
    }
}

/// Derives `sl_type` from a `_PF_`/`_IPRE_`/`_HVCRE_` substring in the
/// uppercased `counterparty_reference`, defaulting to `ProjectFinance`.
/// `ProductType` carries no project/object/commodities/IPRE/HVCRE variants
/// of its own, so only the reference-pattern fallback the original source
/// uses when no richer product tag is available is portable here.
fn sl_type_from_reference(counterparty_reference: &str) -> SpecialisedLendingType {
    let upper = counterparty_reference.to_uppercase();
    if upper.contains("_IPRE_") {
        SpecialisedLendingType::Ipre
    } else if upper.contains("_HVCRE_") {
        SpecialisedLendingType::Hvcre
    } else {
        SpecialisedLendingType::ProjectFinance
    }
}

/// Pattern-based slotting category/type derivation for records assigned
/// `ApproachType::Slotting`, matching `counterparty_reference` substrings
/// the way the supervisory data feed encodes its pre-assessed slotting
/// bucket and specialised-lending subtype (§4.5). Still emits a warning: the
/// reference-pattern convention is a stand-in for an internal supervisory
/// slotting model (out of scope, §1), not the model itself.
fn derive_slotting(
    record: &mut ExposureRecord,
    _config: &CalculationConfig,
    errors: &mut Vec<CalculationError>,
) {
    let sl_type = sl_type_from_reference(&record.counterparty_reference);
    record.is_hvcre = sl_type == SpecialisedLendingType::Hvcre;
    record.sl_type = Some(sl_type);
    record.slotting_category = Some(slotting_category_from_reference(&record.counterparty_reference));

    errors.push(
        CalculationError::new(
            "CLS001",
            "slotting category/type derived from counterparty_reference pattern; no \
             supervisory slotting assessment supplied for this exposure"
                .to_string(),
            ErrorSeverity::Warning,
            ErrorCategory::BusinessRule,
        )
        .with_exposure(record.exposure_reference.clone())
        .with_regulatory_reference("CRR Art.153(5) slotting criteria"),
    );
}

pub fn classify(
    mut records: Vec<ExposureRecord>,
    config: &CalculationConfig,
) -> (Vec<ExposureRecord>, Vec<CalculationError>) {
    let mut errors = Vec::new();

    for record in &mut records {
        let mut class = classify_entity(record, config);

        record.is_sme = matches!(class, ExposureClass::CorporateSme);
        record.is_infrastructure = record.is_infrastructure_eligible;

        let group_total = record.lending_group_total_drawn.unwrap_or(Decimal::ZERO);
        let below_retail_threshold = group_total <= config.retail_thresholds.total_exposure_threshold;

        if matches!(class, ExposureClass::RetailOther) {
            class = refine_retail_product(record, config);
        } else if config.irb_permissions.hybrid_reclassification
            && matches!(class, ExposureClass::Corporate | ExposureClass::CorporateSme)
        {
            // Art.147(5) ordering: SME status, then the total-exposure
            // threshold, then reclassification — both gates must pass.
            if record.is_sme && below_retail_threshold {
                class = refine_retail_product(record, config);
                // QRRE is revolving retail credit-line exposure; a corporate
                // borrower reclassified under Art.147(5) never qualifies for
                // it, so fall back to the general retail bucket.
                if class == ExposureClass::RetailQrre {
                    class = ExposureClass::RetailOther;
                }
                errors.push(
                    CalculationError::new(
                        "CLS002",
                        format!(
                            "exposure {} reclassified corporate -> retail under Art.147(5)",
                            record.exposure_reference
                        ),
                        ErrorSeverity::Warning,
                        ErrorCategory::BusinessRule,
                    )
                    .with_exposure(record.exposure_reference.clone())
                    .with_regulatory_reference("CRR Art.147(5)"),
                );
            }
        }

        record.pre_crm_exposure_class = Some(class);
        record.exposure_class = Some(if record.is_defaulted {
            ExposureClass::Defaulted
        } else {
            class
        });

        let approach = assign_approach(class, record, config);
        record.approach = Some(approach);

        if approach == ApproachType::Slotting {
            derive_slotting(record, config, &mut errors);
        }
    }

    (records, errors)
}

/// Minimal `ExposureRecord` builder shared with other modules' tests, so
/// each test file doesn't re-enumerate every field.
#[cfg(test)]
pub(crate) mod test_support {
    use crate::data::EntityType;
    use crate::exposure::ExposureRecord;
    use crate::types::{ApproachType, ProductType};
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    pub(crate) fn base_record() -> ExposureRecord {
        ExposureRecord {
            exposure_reference: "E1".to_string(),
            counterparty_reference: "CP1".to_string(),
            product_type: ProductType::Loan,
            parent_facility_reference: None,
            currency: "GBP".to_string(),
            drawn_amount: dec!(100_000),
            nominal_amount: Decimal::ZERO,
            interest: Decimal::ZERO,
            maturity: NaiveDate::from_ymd_opt(2030, 1, 1).unwrap(),
            seniority: crate::types::Seniority::Senior,
            risk_type: None,
            is_short_term_trade_lc: false,
            revolving: false,
            ccf_modelled: None,
            lgd_modelled: None,
            beel: None,
            original_currency: "GBP".to_string(),
            original_drawn_amount: dec!(100_000),
            original_nominal_amount: Decimal::ZERO,
            fx_rate_applied: None,
            entity_type: EntityType::Corporate,
            annual_revenue: Some(dec!(10_000_000)),
            total_assets: None,
            is_defaulted: false,
            is_financial_institution: false,
            is_pse: false,
            is_mdb: false,
            is_central_counterparty: false,
            is_rgla: false,
            is_managed_as_retail: false,
            is_infrastructure_eligible: false,
            ultimate_parent_reference: "CP1".to_string(),
            lending_group_root: "CP1".to_string(),
            lending_group_total_drawn: Some(dec!(100_000)),
            resolved_cqs: None,
            resolved_pd: None,
            resolved_rating_type: None,
            ltv: None,
            has_income_cover: false,
            pre_crm_exposure_class: None,
            exposure_class: None,
            approach: None,
            is_sme: false,
            is_infrastructure: false,
            slotting_category: None,
            sl_type: None,
            is_hvcre: false,
            pre_crm_counterparty_reference: None,
            ccf: None,
            ead_from_ccf: None,
            ead_pre_crm: None,
            ead_gross: None,
            collateral_value_applied: None,
            ead_after_collateral: None,
            lgd_pre_crm: None,
            lgd_post_crm: None,
            secured_collateral_type: None,
            guarantor_reference: None,
            guaranteed_portion: None,
            unguaranteed_portion: None,
            guarantor_exposure_class: None,
            guarantor_cqs: None,
            guarantor_approach: None,
            is_guaranteed: false,
            ead_after_guarantee: None,
            provision_allocated: None,
            provision_deducted: None,
            ead_final: None,
            crm_audit: Vec::new(),
            sa_risk_weight: None,
            sa_rwa_pre_factor: None,
            supporting_factor: None,
            sa_rwa_post_factor: None,
            pd: None,
            pd_floored: None,
            lgd_floored: None,
            correlation: None,
            maturity_adjustment: None,
            capital_requirement_k: None,
            irb_risk_weight: None,
            irb_rwa: None,
            guarantee_applied_beneficially: false,
            expected_loss: None,
            slotting_risk_weight: None,
            slotting_rwa: None,
            final_risk_weight: None,
            final_rwa: None,
            rwa_sa_equivalent: None,
            output_floor_applied: false,
            reporting_exposure_class: None,
            crm_portion_type: None,
        }
    }

    pub(crate) fn bare_record(reference: &str, drawn: Decimal, approach: ApproachType) -> ExposureRecord {
        let mut record = base_record();
        record.exposure_reference = reference.to_string();
        record.drawn_amount = drawn;
        record.approach = Some(approach);
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use test_support::base_record;

    // -- Test: low-turnover corporate becomes Corporate-SME -------------------

    #[test]
    fn test_sme_turnover_reclassification() {
        let config = CalculationConfig::crr("GBP", dec!(0.8732), NaiveDate::from_ymd_opt(2026, 1, 1).unwrap());
        let mut record = base_record();
        record.annual_revenue = Some(dec!(5_000_000));
        let (records, _) = classify(vec![record], &config);
        assert_eq!(records[0].pre_crm_exposure_class, Some(ExposureClass::CorporateSme));
        assert!(records[0].is_sme);
    }

    // -- Test: defaulted counterparty maps to Defaulted class -----------------

    #[test]
    fn test_defaulted_overrides_class() {
        let config = CalculationConfig::crr("GBP", dec!(0.8732), NaiveDate::from_ymd_opt(2026, 1, 1).unwrap());
        let mut record = base_record();
        record.is_defaulted = true;
        let (records, _) = classify(vec![record], &config);
        assert_eq!(records[0].exposure_class, Some(ExposureClass::Defaulted));
        assert_ne!(records[0].pre_crm_exposure_class, Some(ExposureClass::Defaulted));
    }

    // -- Test: sovereign entity type takes top priority -----------------------

    #[test]
    fn test_sovereign_priority() {
        let config = CalculationConfig::crr("GBP", dec!(0.8732), NaiveDate::from_ymd_opt(2026, 1, 1).unwrap());
        let mut record = base_record();
        record.entity_type = EntityType::Sovereign;
        record.is_pse = true; // would otherwise win if sovereign check were lower priority
        let (records, _) = classify(vec![record], &config);
        assert_eq!(records[0].pre_crm_exposure_class, Some(ExposureClass::Sovereign));
    }

    // -- Test: corporate with A-IRB permission is routed to A-IRB -------------

    #[test]
    fn test_approach_airb_for_corporate_when_permitted() {
        let config = CalculationConfig::crr("GBP", dec!(0.8732), NaiveDate::from_ymd_opt(2026, 1, 1).unwrap());
        let record = base_record();
        let (records, _) = classify(vec![record], &config);
        assert_eq!(records[0].approach, Some(ApproachType::Airb));
    }

    // -- Test: SA-only permission set routes corporate to SA ------------------

    #[test]
    fn test_approach_sa_when_only_sa_permitted() {
        let config = CalculationConfig::crr("GBP", dec!(0.8732), NaiveDate::from_ymd_opt(2026, 1, 1).unwrap())
            .with_irb_permissions(crate::config::IrbPermissions::sa_only());
        let record = base_record();
        let (records, _) = classify(vec![record], &config);
        assert_eq!(records[0].approach, Some(ApproachType::Sa));
    }

    // -- Invariant 10: hybrid preset never tags a reclassified corporate
    //    RETAIL_QRRE, even when the product looks like a revolving facility --

    #[test]
    fn test_invariant_hybrid_reclassification_never_yields_retail_qrre() {
        let config = CalculationConfig::crr("GBP", dec!(0.8732), NaiveDate::from_ymd_opt(2026, 1, 1).unwrap())
            .with_irb_permissions(crate::config::IrbPermissions::hybrid_retail_airb_corporate_firb());
        let mut record = base_record();
        record.annual_revenue = Some(dec!(5_000_000));
        record.lending_group_total_drawn = Some(dec!(100_000));
        record.product_type = crate::types::ProductType::Facility;
        record.revolving = true;
        record.drawn_amount = dec!(50_000);
        let (records, errors) = classify(vec![record], &config);
        assert!(records[0].is_sme);
        assert_ne!(records[0].pre_crm_exposure_class, Some(ExposureClass::RetailQrre));
        assert!(errors.iter().any(|e| e.code == "CLS002"));
    }

    // -- Scenario E1: specialised lending SPV routed to slotting, category
    //    and sl_type derived from the counterparty_reference pattern --------

    #[test]
    fn test_scenario_e1_slotting_category_and_type_from_reference() {
        let config = CalculationConfig::crr("GBP", dec!(0.8732), NaiveDate::from_ymd_opt(2026, 1, 1).unwrap())
            .with_irb_permissions(crate::config::IrbPermissions::sa_only());
        let mut record = base_record();
        record.entity_type = EntityType::SpecialisedLendingSpv;
        record.counterparty_reference = "SPV_PF_STRONG_01".to_string();
        let (records, errors) = classify(vec![record], &config);
        assert_eq!(records[0].pre_crm_exposure_class, Some(ExposureClass::SpecialisedLending));
        assert_eq!(records[0].approach, Some(ApproachType::Slotting));
        assert_eq!(records[0].slotting_category, Some(SlottingCategory::Strong));
        assert_eq!(records[0].sl_type, Some(SpecialisedLendingType::ProjectFinance));
        assert!(!records[0].is_hvcre);
        assert!(errors.iter().any(|e| e.code == "CLS001"));
    }

    #[test]
    fn test_slotting_hvcre_pattern_sets_is_hvcre() {
        let config = CalculationConfig::crr("GBP", dec!(0.8732), NaiveDate::from_ymd_opt(2026, 1, 1).unwrap())
            .with_irb_permissions(crate::config::IrbPermissions::sa_only());
        let mut record = base_record();
        record.entity_type = EntityType::SpecialisedLendingSpv;
        record.counterparty_reference = "SPV_HVCRE_WEAK_02".to_string();
        let (records, _) = classify(vec![record], &config);
        assert_eq!(records[0].sl_type, Some(SpecialisedLendingType::Hvcre));
        assert!(records[0].is_hvcre);
        assert_eq!(records[0].slotting_category, Some(SlottingCategory::Weak));
    }

    #[test]
    fn test_slotting_category_defaults_to_satisfactory() {
        let config = CalculationConfig::crr("GBP", dec!(0.8732), NaiveDate::from_ymd_opt(2026, 1, 1).unwrap())
            .with_irb_permissions(crate::config::IrbPermissions::sa_only());
        let mut record = base_record();
        record.entity_type = EntityType::SpecialisedLendingSpv;
        record.counterparty_reference = "SPV_NOPATTERN_03".to_string();
        let (records, _) = classify(vec![record], &config);
        assert_eq!(records[0].slotting_category, Some(SlottingCategory::Satisfactory));
    }
}
