//! Credit Risk Mitigation Processor (§4.6) — the component every other
//! calculator depends on. Applies CCF, collateral substitution/blended LGD,
//! guarantee substitution, and SCRA provision deduction, in that order.
//!
//! A guaranteed exposure is split into two output rows (`CrmPortionType`):
//! the unguaranteed remainder, still charged against the original obligor,
//! and the guaranteed portion, re-pointed at the guarantor's own class/CQS
//! so SA/IRB price it at the guarantor's risk rather than the obligor's
//! (Art.111, CRR Art.201-202 substitution).

use std::collections::HashMap;

use rust_decimal::Decimal;

use crate::config::CalculationConfig;
use crate::data::{Collateral, Counterparty, Guarantee, Provision, ProvisionType, RawDataBundle};
use crate::exposure::ExposureRecord;
use crate::reference_tables::{
    firb_ccf, firb_supervisory_lgd_secured, firb_supervisory_lgd_unsecured, maturity_band,
    minimum_collateralisation_threshold, overcollateralisation_ratio, sa_ccf, supervisory_haircut,
    FX_HAIRCUT,
};
use crate::types::{
    ApproachType, BeneficiaryType, CalculationError, CollateralType, CrmPortionType, ErrorCategory,
    ErrorSeverity, ExposureClass, RatingType,
};

struct Lookups<'a> {
    collateral: HashMap<(BeneficiaryType, String), Vec<&'a Collateral>>,
    guarantees: HashMap<(BeneficiaryType, String), Vec<&'a Guarantee>>,
    provisions: HashMap<(BeneficiaryType, String), Vec<&'a Provision>>,
    counterparties: HashMap<String, &'a Counterparty>,
    best_rating: HashMap<String, (u8, RatingType, Option<Decimal>)>,
}

fn build_lookups(bundle: &RawDataBundle) -> Lookups<'_> {
    let mut collateral: HashMap<(BeneficiaryType, String), Vec<&Collateral>> = HashMap::new();
    for c in &bundle.collateral {
        if c.is_eligible {
            collateral
                .entry((c.beneficiary_type, c.beneficiary_reference.clone()))
                .or_default()
                .push(c);
        }
    }

    let mut guarantees: HashMap<(BeneficiaryType, String), Vec<&Guarantee>> = HashMap::new();
    for g in &bundle.guarantees {
        guarantees
            .entry((g.beneficiary_type, g.beneficiary_reference.clone()))
            .or_default()
            .push(g);
    }
    for list in guarantees.values_mut() {
        list.sort_by(|a, b| a.guarantee_reference.cmp(&b.guarantee_reference));
    }

    let mut provisions: HashMap<(BeneficiaryType, String), Vec<&Provision>> = HashMap::new();
    for p in &bundle.provisions {
        provisions
            .entry((p.beneficiary_type, p.beneficiary_reference.clone()))
            .or_default()
            .push(p);
    }

    let counterparties = bundle
        .counterparties
        .iter()
        .map(|c| (c.counterparty_reference.clone(), c))
        .collect();

    let mut best_rating: HashMap<String, (u8, RatingType, Option<Decimal>)> = HashMap::new();
    for r in &bundle.ratings {
        let candidate = (r.cqs, r.rating_type, r.pd);
        best_rating
            .entry(r.counterparty_reference.clone())
            .and_modify(|existing| {
                let better = match (existing.1, candidate.1) {
                    (RatingType::Internal, RatingType::External) => true,
                    (RatingType::External, RatingType::Internal) => false,
                    _ => candidate.0 < existing.0,
                };
                if better {
                    *existing = candidate;
                }
            })
            .or_insert(candidate);
    }

    Lookups {
        collateral,
        guarantees,
        provisions,
        counterparties,
        best_rating,
    }
}

/// Sums a beneficiary-keyed map's `ead_gross` totals by facility and by
/// counterparty, for the facility/counterparty pro-rata shares §4.6 Step 2
/// requires. Computed once per `process()` call over every record's
/// already-CCF'd `ead_gross`.
fn ead_gross_totals(records: &[ExposureRecord]) -> (HashMap<String, Decimal>, HashMap<String, Decimal>) {
    let mut by_facility: HashMap<String, Decimal> = HashMap::new();
    let mut by_counterparty: HashMap<String, Decimal> = HashMap::new();
    for r in records {
        let ead = r.ead_gross_or_zero();
        if let Some(parent) = &r.parent_facility_reference {
            *by_facility.entry(parent.clone()).or_default() += ead;
        }
        *by_counterparty.entry(r.counterparty_reference.clone()).or_default() += ead;
    }
    (by_facility, by_counterparty)
}

/// Multi-level CRM allocation (§4.6 Step 2): collects every bucket in the
/// beneficiary chain — direct exposure link, facility-level allocated
/// pro-rata by `ead_gross` across the facility's child exposures, and
/// counterparty-level allocated pro-rata across all of that counterparty's
/// exposures — and returns each item paired with the share of it this
/// exposure is entitled to. The three levels are summed, not
/// first-match-wins: an exposure can draw on its own collateral and a slice
/// of its facility's and counterparty's collateral simultaneously.
fn allocate_pro_rata<'a, T>(
    map: &HashMap<(BeneficiaryType, String), Vec<&'a T>>,
    exposure_reference: &str,
    ead_gross: Decimal,
    parent_facility_reference: Option<&str>,
    counterparty_reference: &str,
    facility_ead_gross: &HashMap<String, Decimal>,
    counterparty_ead_gross: &HashMap<String, Decimal>,
) -> Vec<(&'a T, Decimal)> {
    let mut out = Vec::new();

    if let Some(v) = map.get(&(BeneficiaryType::Exposure, exposure_reference.to_string())) {
        out.extend(v.iter().map(|item| (*item, Decimal::ONE)));
    }

    if let Some(parent) = parent_facility_reference {
        if let Some(v) = map.get(&(BeneficiaryType::Facility, parent.to_string())) {
            let total = facility_ead_gross.get(parent).copied().unwrap_or(Decimal::ZERO);
            if total > Decimal::ZERO {
                let share = ead_gross / total;
                out.extend(v.iter().map(|item| (*item, share)));
            }
        }
    }

    if let Some(v) = map.get(&(BeneficiaryType::Counterparty, counterparty_reference.to_string())) {
        let total = counterparty_ead_gross
            .get(counterparty_reference)
            .copied()
            .unwrap_or(Decimal::ZERO);
        if total > Decimal::ZERO {
            let share = ead_gross / total;
            out.extend(v.iter().map(|item| (*item, share)));
        }
    }

    out
}

fn adjusted_collateral_value(
    coll: &Collateral,
    exposure_currency: &str,
    config: &CalculationConfig,
) -> Decimal {
    let band = maturity_band(coll.residual_maturity_years.unwrap_or(Decimal::ZERO));
    let haircut = supervisory_haircut(coll.collateral_type, coll.issuer_cqs, band);
    let fx_haircut = if coll.currency != exposure_currency {
        FX_HAIRCUT
    } else {
        Decimal::ZERO
    };
    let _ = config;
    (coll.market_value * (Decimal::ONE - haircut) * (Decimal::ONE - fx_haircut)).max(Decimal::ZERO)
}

fn dominant_type(pieces: &[(&Collateral, Decimal)]) -> Option<CollateralType> {
    pieces
        .iter()
        .max_by(|a, b| a.1.cmp(&b.1))
        .map(|(c, _)| c.collateral_type)
}

fn classify_guarantor(
    guarantor_reference: &str,
    lookups: &Lookups,
    config: &CalculationConfig,
) -> (Option<ExposureClass>, Option<u8>, Option<ApproachType>) {
    let Some(cp) = lookups.counterparties.get(guarantor_reference) else {
        return (None, None, None);
    };
    let rating = lookups.best_rating.get(guarantor_reference).copied();
    let class = match cp.entity_type {
        crate::data::EntityType::Sovereign | crate::data::EntityType::CentralBank => {
            ExposureClass::Sovereign
        }
        _ if cp.is_mdb => ExposureClass::Mdb,
        _ if cp.is_pse => ExposureClass::Pse,
        crate::data::EntityType::Institution => ExposureClass::Institution,
        _ if cp.is_financial_institution || cp.is_central_counterparty => ExposureClass::Institution,
        _ => ExposureClass::Corporate,
    };
    let approach = if config.irb_permissions.permits(class, ApproachType::Airb) {
        ApproachType::Airb
    } else if config.irb_permissions.permits(class, ApproachType::Firb) {
        ApproachType::Firb
    } else {
        ApproachType::Sa
    };
    (Some(class), rating.map(|r| r.0), Some(approach))
}

fn apply_ccf(record: &mut ExposureRecord) {
    let ccf = match (record.ccf_modelled, record.approach, record.risk_type) {
        (Some(modelled), _, _) => modelled,
        (None, Some(ApproachType::Firb), Some(rt)) => {
            firb_ccf(rt, record.is_short_term_trade_lc)
        }
        (None, _, Some(rt)) => sa_ccf(rt),
        (None, _, None) => Decimal::ZERO,
    };
    record.ccf = Some(ccf);
    record.ead_from_ccf = Some(record.nominal_amount * ccf);
    let ead_pre_crm = record.drawn_amount + record.interest + record.ead_from_ccf.unwrap();
    record.ead_pre_crm = Some(ead_pre_crm);
    record.ead_gross = Some(ead_pre_crm);
}

fn apply_collateral(
    record: &mut ExposureRecord,
    lookups: &Lookups,
    config: &CalculationConfig,
    facility_ead_gross: &HashMap<String, Decimal>,
    counterparty_ead_gross: &HashMap<String, Decimal>,
    errors: &mut Vec<CalculationError>,
) {
    let ead_gross = record.ead_gross_or_zero();
    record.ead_after_collateral = Some(ead_gross);

    let pieces = allocate_pro_rata(
        &lookups.collateral,
        &record.exposure_reference,
        ead_gross,
        record.parent_facility_reference.as_deref(),
        &record.counterparty_reference,
        facility_ead_gross,
        counterparty_ead_gross,
    );
    if pieces.is_empty() {
        return;
    }

    let valued: Vec<(&Collateral, Decimal)> = pieces
        .iter()
        .map(|(c, share)| (*c, adjusted_collateral_value(c, &record.currency, config) * share))
        .collect();
    let total_adjusted: Decimal = valued.iter().map(|(_, v)| *v).sum();
    let Some(dominant) = dominant_type(&valued) else { return };
    record.secured_collateral_type = Some(dominant);

    match record.approach {
        Some(ApproachType::Sa) | Some(ApproachType::Slotting) => {
            record.collateral_value_applied = Some(total_adjusted.min(ead_gross));
        }
        Some(ApproachType::Firb) => {
            let ratio = overcollateralisation_ratio(dominant);
            let secured_ratio = if ead_gross > Decimal::ZERO {
                (total_adjusted / (ead_gross * ratio)).min(Decimal::ONE)
            } else {
                Decimal::ZERO
            };
            let threshold = minimum_collateralisation_threshold(dominant);
            let secured_ratio = if secured_ratio < threshold {
                Decimal::ZERO
            } else {
                secured_ratio
            };
            let lgd_secured = firb_supervisory_lgd_secured(dominant);
            let lgd_unsecured = firb_supervisory_lgd_unsecured(record.seniority);
            let blended = secured_ratio * lgd_secured + (Decimal::ONE - secured_ratio) * lgd_unsecured;
            record.collateral_value_applied = Some(total_adjusted.min(ead_gross));
            record.lgd_pre_crm = Some(blended);
            record.lgd_post_crm = Some(blended);
        }
        Some(ApproachType::Airb) => {
            record.collateral_value_applied = Some(total_adjusted.min(ead_gross));
            record.lgd_pre_crm = record.lgd_modelled;
        }
        None => {
            errors.push(
                CalculationError::new(
                    "CRM001",
                    "collateral present but exposure has no assigned approach",
                    ErrorSeverity::Error,
                    ErrorCategory::Crm,
                )
                .with_exposure(record.exposure_reference.clone()),
            );
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn apply_provisions(
    record: &mut ExposureRecord,
    lookups: &Lookups,
    base_ead: Decimal,
    ead_gross: Decimal,
    exposure_reference: &str,
    parent_facility_reference: Option<&str>,
    counterparty_reference: &str,
    facility_ead_gross: &HashMap<String, Decimal>,
    counterparty_ead_gross: &HashMap<String, Decimal>,
) -> Decimal {
    if record.approach != Some(ApproachType::Sa) {
        record.provision_allocated = Some(Decimal::ZERO);
        record.provision_deducted = Some(Decimal::ZERO);
        return base_ead;
    }
    let rows = allocate_pro_rata(
        &lookups.provisions,
        exposure_reference,
        ead_gross,
        parent_facility_reference,
        counterparty_reference,
        facility_ead_gross,
        counterparty_ead_gross,
    );
    let scra_total: Decimal = rows
        .iter()
        .filter(|(p, _)| p.provision_type == ProvisionType::Scra)
        .map(|(p, share)| p.amount * share)
        .sum();
    record.provision_allocated = Some(scra_total);
    let drawn_first = scra_total.min(record.drawn_amount);
    record.provision_deducted = Some(drawn_first);
    (base_ead - drawn_first).max(Decimal::ZERO)
}

/// Art.111 / COREP C07 cross-approach CCF substitution (§4.6 Step 3): when
/// an IRB exposure has an SA guarantor and a non-zero off-balance-sheet
/// nominal, the guaranteed portion's CCF is recomputed from the SA table
/// while the unguaranteed portion retains the IRB's own CCF. Returns
/// `(guaranteed_ead, unguaranteed_ead, ccf_guaranteed)` rebuilt from
/// `on_balance * ratio + nominal * ratio * ccf` and its complement, or
/// `None` when the cross-approach case doesn't apply and the plain
/// collateral-minus-guarantee split stands.
fn cross_approach_ccf_split(
    record: &ExposureRecord,
    guarantor_approach: Option<ApproachType>,
    guarantee_ratio: Decimal,
) -> Option<(Decimal, Decimal, Decimal)> {
    let is_irb = matches!(record.approach, Some(ApproachType::Firb) | Some(ApproachType::Airb));
    if !is_irb || guarantor_approach != Some(ApproachType::Sa) || record.nominal_amount.is_zero() {
        return None;
    }
    let risk_type = record.risk_type?;
    let ccf_guaranteed = sa_ccf(risk_type);
    let ccf_unguaranteed = record.ccf.unwrap_or(Decimal::ZERO);
    let on_balance = record.drawn_amount + record.interest;
    let unguaranteed_ratio = Decimal::ONE - guarantee_ratio;

    let guaranteed_ead = on_balance * guarantee_ratio + record.nominal_amount * guarantee_ratio * ccf_guaranteed;
    let unguaranteed_ead =
        on_balance * unguaranteed_ratio + record.nominal_amount * unguaranteed_ratio * ccf_unguaranteed;

    Some((guaranteed_ead, unguaranteed_ead, ccf_guaranteed))
}

#[allow(clippy::too_many_arguments)]
fn split_on_guarantee(
    mut record: ExposureRecord,
    lookups: &Lookups,
    config: &CalculationConfig,
    ead_gross: Decimal,
    facility_ead_gross: &HashMap<String, Decimal>,
    counterparty_ead_gross: &HashMap<String, Decimal>,
) -> Vec<ExposureRecord> {
    let exposure_reference = record.exposure_reference.clone();
    let parent_facility_reference = record.parent_facility_reference.clone();
    let counterparty_reference = record.counterparty_reference.clone();

    let guarantees = allocate_pro_rata(
        &lookups.guarantees,
        &exposure_reference,
        ead_gross,
        parent_facility_reference.as_deref(),
        &counterparty_reference,
        facility_ead_gross,
        counterparty_ead_gross,
    );
    let ead_after_collateral = record.ead_after_collateral.unwrap_or(record.ead_gross_or_zero());

    if guarantees.is_empty() {
        record.ead_after_guarantee = Some(ead_after_collateral);
        let ead_final = apply_provisions(
            &mut record,
            lookups,
            ead_after_collateral,
            ead_gross,
            &exposure_reference,
            parent_facility_reference.as_deref(),
            &counterparty_reference,
            facility_ead_gross,
            counterparty_ead_gross,
        );
        record.ead_final = Some(ead_final);
        record.crm_portion_type = Some(CrmPortionType::Original);
        return vec![record];
    }

    let total_covered: Decimal = guarantees
        .iter()
        .map(|(g, share)| {
            let covered = g
                .amount_covered
                .unwrap_or_else(|| ead_after_collateral * g.percentage_covered.unwrap_or(Decimal::ZERO));
            covered * share
        })
        .sum::<Decimal>()
        .min(ead_after_collateral);
    let unguaranteed = ead_after_collateral - total_covered;

    let mut sorted_guarantees = guarantees;
    sorted_guarantees.sort_by(|(a, _), (b, _)| a.guarantee_reference.cmp(&b.guarantee_reference));
    let primary_guarantor = &sorted_guarantees[0].0.guarantor_reference;
    let primary_guarantee_reference = &sorted_guarantees[0].0.guarantee_reference;
    let (guarantor_class, guarantor_cqs, guarantor_approach) =
        classify_guarantor(primary_guarantor, lookups, config);

    let guarantee_ratio = if ead_after_collateral > Decimal::ZERO {
        total_covered / ead_after_collateral
    } else {
        Decimal::ZERO
    };
    let cross_ccf = cross_approach_ccf_split(&record, guarantor_approach, guarantee_ratio);

    record.is_guaranteed = total_covered > Decimal::ZERO;
    record.guarantor_reference = Some(primary_guarantor.clone());
    record.guaranteed_portion = Some(total_covered);
    record.unguaranteed_portion = Some(unguaranteed);
    record.guarantor_exposure_class = guarantor_class;
    record.guarantor_cqs = guarantor_cqs;
    record.guarantor_approach = guarantor_approach;
    record.crm_audit.push(format!(
        "guarantee {} covers {} of {} via {}",
        primary_guarantee_reference, total_covered, ead_after_collateral, primary_guarantor
    ));

    let (guaranteed_ead_base, unguaranteed_ead_base) = match cross_ccf {
        Some((guaranteed_ead, unguaranteed_ead, ccf_guaranteed)) => {
            record.crm_audit.push(format!(
                "CROSS_APPROACH_CCF_SUBSTITUTION: guaranteed portion recomputed with sa ccf {ccf_guaranteed}"
            ));
            (guaranteed_ead, unguaranteed_ead)
        }
        None => (total_covered, unguaranteed),
    };

    let mut unguaranteed_row = record.clone();
    unguaranteed_row.exposure_reference = format!("{}-U", exposure_reference);
    unguaranteed_row.ead_after_guarantee = Some(unguaranteed_ead_base);
    if cross_ccf.is_some() {
        unguaranteed_row.ead_from_ccf = Some(unguaranteed_ead_base - unguaranteed_row.drawn_amount - unguaranteed_row.interest);
    }
    let ead_final_u = apply_provisions(
        &mut unguaranteed_row,
        lookups,
        unguaranteed_ead_base,
        ead_gross,
        &exposure_reference,
        parent_facility_reference.as_deref(),
        &counterparty_reference,
        facility_ead_gross,
        counterparty_ead_gross,
    );
    unguaranteed_row.ead_final = Some(ead_final_u);
    unguaranteed_row.crm_portion_type = Some(CrmPortionType::Unguaranteed);

    let mut guaranteed_row = record;
    guaranteed_row.exposure_reference = format!("{}-G", exposure_reference);
    guaranteed_row.ead_after_guarantee = Some(guaranteed_ead_base);
    if let Some((guaranteed_ead, _, ccf_guaranteed)) = cross_ccf {
        guaranteed_row.ccf = Some(ccf_guaranteed);
        guaranteed_row.ead_from_ccf = Some(guaranteed_ead - guaranteed_row.drawn_amount - guaranteed_row.interest);
    }
    let ead_final_g = apply_provisions(
        &mut guaranteed_row,
        lookups,
        guaranteed_ead_base,
        ead_gross,
        &exposure_reference,
        parent_facility_reference.as_deref(),
        &counterparty_reference,
        facility_ead_gross,
        counterparty_ead_gross,
    );
    guaranteed_row.ead_final = Some(ead_final_g);
    guaranteed_row.crm_portion_type = Some(CrmPortionType::Guaranteed);

    // Only SA rows get re-pointed at the guarantor's class/CQS here — sa.rs
    // looks those up directly. IRB rows keep their own class/approach; the
    // beneficial-substitution check needs the borrower's own IRB risk
    // weight, which isn't known until irb.rs runs, so it consumes
    // `guarantor_exposure_class`/`guarantor_cqs` itself instead.
    if guaranteed_row.approach == Some(ApproachType::Sa) {
        if let Some(class) = guarantor_class {
            guaranteed_row.exposure_class = Some(class);
        }
        if let Some(cqs) = guarantor_cqs {
            guaranteed_row.resolved_cqs = Some(cqs);
        }
    }

    vec![unguaranteed_row, guaranteed_row]
}

/// Two-pass per §4.6 Step 2: the first pass runs CCF alone and totals
/// `ead_gross` by facility and counterparty, since facility/counterparty
/// pro-rata shares need every sibling exposure's EAD before any of them
/// can draw their share of shared collateral, guarantees, or provisions.
/// The second pass applies collateral, the guarantee split, and provisions
/// using those totals.
pub fn process(
    records: Vec<ExposureRecord>,
    bundle: &RawDataBundle,
    config: &CalculationConfig,
) -> (Vec<ExposureRecord>, Vec<CalculationError>) {
    let lookups = build_lookups(bundle);
    let mut errors = Vec::new();

    let mut records = records;
    for record in &mut records {
        record.pre_crm_counterparty_reference = Some(record.counterparty_reference.clone());
        apply_ccf(record);
    }

    let (facility_ead_gross, counterparty_ead_gross) = ead_gross_totals(&records);

    let mut out = Vec::new();
    for mut record in records {
        let ead_gross = record.ead_gross_or_zero();
        apply_collateral(
            &mut record,
            &lookups,
            config,
            &facility_ead_gross,
            &counterparty_ead_gross,
            &mut errors,
        );
        out.extend(split_on_guarantee(
            record,
            &lookups,
            config,
            ead_gross,
            &facility_ead_gross,
            &counterparty_ead_gross,
        ));
    }

    (out, errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::EntityType;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn bare_record(reference: &str, drawn: Decimal, approach: ApproachType) -> ExposureRecord {
        crate::classifier::test_support::bare_record(reference, drawn, approach)
    }

    // -- Test: CCF applied to undrawn facility portion ------------------------

    #[test]
    fn test_ccf_applied_to_undrawn() {
        let mut record = bare_record("E1", dec!(100_000), ApproachType::Sa);
        record.nominal_amount = dec!(50_000);
        record.risk_type = Some(crate::types::RiskType::Mr);
        apply_ccf(&mut record);
        assert_eq!(record.ccf, Some(dec!(0.50)));
        assert_eq!(record.ead_from_ccf, Some(dec!(25_000)));
        assert_eq!(record.ead_gross, Some(dec!(125_000)));
    }

    // -- Test: no guarantee leaves a single Original-tagged row ---------------

    #[test]
    fn test_no_guarantee_single_row() {
        let bundle = RawDataBundle::default();
        let config = CalculationConfig::crr("GBP", dec!(0.8732), NaiveDate::from_ymd_opt(2026, 1, 1).unwrap());
        let record = bare_record("E1", dec!(100_000), ApproachType::Sa);
        let (rows, _) = process(vec![record], &bundle, &config);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].crm_portion_type, Some(CrmPortionType::Original));
    }

    // -- Test: a full guarantee splits into guaranteed + unguaranteed rows ----

    #[test]
    fn test_full_guarantee_splits_record() {
        let mut bundle = RawDataBundle::default();
        bundle.counterparties.push(Counterparty {
            counterparty_reference: "GUARANTOR".to_string(),
            entity_type: EntityType::Sovereign,
            country: "GB".to_string(),
            annual_revenue: None,
            total_assets: None,
            is_defaulted: false,
            is_financial_institution: false,
            is_pse: false,
            is_mdb: false,
            is_central_counterparty: false,
            is_rgla: false,
            is_managed_as_retail: false,
            is_infrastructure: false,
        });
        bundle.guarantees.push(Guarantee {
            guarantee_reference: "G1".to_string(),
            guarantor_reference: "GUARANTOR".to_string(),
            currency: "GBP".to_string(),
            amount_covered: Some(dec!(100_000)),
            percentage_covered: None,
            maturity: NaiveDate::from_ymd_opt(2030, 1, 1).unwrap(),
            beneficiary_type: BeneficiaryType::Exposure,
            beneficiary_reference: "E1".to_string(),
        });
        let config = CalculationConfig::crr("GBP", dec!(0.8732), NaiveDate::from_ymd_opt(2026, 1, 1).unwrap());
        let mut record = bare_record("E1", dec!(100_000), ApproachType::Sa);
        record.ead_gross = Some(dec!(100_000));
        record.ead_after_collateral = Some(dec!(100_000));
        let (rows, _) = process(vec![record], &bundle, &config);
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().any(|r| r.crm_portion_type == Some(CrmPortionType::Guaranteed)
            && r.exposure_class == Some(ExposureClass::Sovereign)));
        assert!(rows
            .iter()
            .any(|r| r.crm_portion_type == Some(CrmPortionType::Unguaranteed)));
    }

    // -- Test: facility-level collateral is allocated pro-rata across siblings

    #[test]
    fn test_facility_collateral_allocated_pro_rata() {
        let mut bundle = RawDataBundle::default();
        bundle.collateral.push(Collateral {
            collateral_reference: "C1".to_string(),
            collateral_type: crate::types::CollateralType::Cash,
            market_value: dec!(150_000),
            nominal_value: dec!(150_000),
            currency: "GBP".to_string(),
            valuation_date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            issuer_cqs: None,
            residual_maturity_years: Some(dec!(3)),
            is_main_index_equity: false,
            property_ltv: None,
            is_eligible: true,
            beneficiary_type: BeneficiaryType::Facility,
            beneficiary_reference: "F1".to_string(),
        });
        let config = CalculationConfig::crr("GBP", dec!(0.8732), NaiveDate::from_ymd_opt(2026, 1, 1).unwrap());

        let mut e1 = bare_record("E1", dec!(100_000), ApproachType::Sa);
        e1.parent_facility_reference = Some("F1".to_string());
        let mut e2 = bare_record("E2", dec!(50_000), ApproachType::Sa);
        e2.parent_facility_reference = Some("F1".to_string());

        let (rows, _) = process(vec![e1, e2], &bundle, &config);
        let r1 = rows.iter().find(|r| r.exposure_reference == "E1").unwrap();
        let r2 = rows.iter().find(|r| r.exposure_reference == "E2").unwrap();
        // Cash has no haircut, so the full 150k is split 2:1 by ead_gross (100k:50k).
        assert_eq!(r1.collateral_value_applied, Some(dec!(100_000)));
        assert_eq!(r2.collateral_value_applied, Some(dec!(50_000)));
    }

    // -- Test: cross-approach CCF substitution on an IRB exposure with an
    //    SA guarantor and undrawn nominal ------------------------------------

    #[test]
    fn test_cross_approach_ccf_substitution() {
        let mut bundle = RawDataBundle::default();
        bundle.counterparties.push(Counterparty {
            counterparty_reference: "GUARANTOR".to_string(),
            entity_type: EntityType::Corporate,
            country: "GB".to_string(),
            annual_revenue: None,
            total_assets: None,
            is_defaulted: false,
            is_financial_institution: false,
            is_pse: false,
            is_mdb: true,
            is_central_counterparty: false,
            is_rgla: false,
            is_managed_as_retail: false,
            is_infrastructure: false,
        });
        bundle.guarantees.push(Guarantee {
            guarantee_reference: "G1".to_string(),
            guarantor_reference: "GUARANTOR".to_string(),
            currency: "GBP".to_string(),
            amount_covered: Some(dec!(100_000)),
            percentage_covered: None,
            maturity: NaiveDate::from_ymd_opt(2030, 1, 1).unwrap(),
            beneficiary_type: BeneficiaryType::Exposure,
            beneficiary_reference: "E1".to_string(),
        });
        let config = CalculationConfig::crr("GBP", dec!(0.8732), NaiveDate::from_ymd_opt(2026, 1, 1).unwrap());

        // MDBs have no IRB permission entry in `full_irb` -> guarantor classifies as Sa.
        let mut record = bare_record("E1", dec!(80_000), ApproachType::Firb);
        record.nominal_amount = dec!(20_000);
        record.risk_type = Some(crate::types::RiskType::Mr);

        let (rows, _) = process(vec![record], &bundle, &config);
        let guaranteed = rows
            .iter()
            .find(|r| r.crm_portion_type == Some(CrmPortionType::Guaranteed))
            .unwrap();
        assert!(guaranteed.crm_audit.iter().any(|a| a.contains("CROSS_APPROACH_CCF_SUBSTITUTION")));
        // guarantee_ratio = 1.0 (full 100k exposure covered) -> ccf_guaranteed = sa_ccf(Mr) = 0.50
        assert_eq!(guaranteed.ccf, Some(dec!(0.50)));
    }

    // -- Test: guarantor reassignment only touches SA rows, never approach ----

    #[test]
    fn test_guarantor_reassignment_skips_irb_rows() {
        let mut bundle = RawDataBundle::default();
        bundle.counterparties.push(Counterparty {
            counterparty_reference: "GUARANTOR".to_string(),
            entity_type: EntityType::Sovereign,
            country: "GB".to_string(),
            annual_revenue: None,
            total_assets: None,
            is_defaulted: false,
            is_financial_institution: false,
            is_pse: false,
            is_mdb: false,
            is_central_counterparty: false,
            is_rgla: false,
            is_managed_as_retail: false,
            is_infrastructure: false,
        });
        bundle.guarantees.push(Guarantee {
            guarantee_reference: "G1".to_string(),
            guarantor_reference: "GUARANTOR".to_string(),
            currency: "GBP".to_string(),
            amount_covered: Some(dec!(100_000)),
            percentage_covered: None,
            maturity: NaiveDate::from_ymd_opt(2030, 1, 1).unwrap(),
            beneficiary_type: BeneficiaryType::Exposure,
            beneficiary_reference: "E1".to_string(),
        });
        let config = CalculationConfig::crr("GBP", dec!(0.8732), NaiveDate::from_ymd_opt(2026, 1, 1).unwrap());
        let mut record = bare_record("E1", dec!(100_000), ApproachType::Firb);
        record.exposure_class = Some(ExposureClass::Corporate);
        let (rows, _) = process(vec![record], &bundle, &config);
        let guaranteed = rows
            .iter()
            .find(|r| r.crm_portion_type == Some(CrmPortionType::Guaranteed))
            .unwrap();
        assert_eq!(guaranteed.approach, Some(ApproachType::Firb));
        assert_eq!(guaranteed.exposure_class, Some(ExposureClass::Corporate));
        assert_eq!(guaranteed.guarantor_exposure_class, Some(ExposureClass::Sovereign));
        assert_eq!(guaranteed.guarantor_cqs, None);
    }

    // -- Invariant: split rows' ead_final sums to the pre-split ead_after_guarantee

    #[test]
    fn test_split_row_ead_sums_to_pre_split_total() {
        let mut bundle = RawDataBundle::default();
        bundle.counterparties.push(Counterparty {
            counterparty_reference: "GUARANTOR".to_string(),
            entity_type: EntityType::Sovereign,
            country: "GB".to_string(),
            annual_revenue: None,
            total_assets: None,
            is_defaulted: false,
            is_financial_institution: false,
            is_pse: false,
            is_mdb: false,
            is_central_counterparty: false,
            is_rgla: false,
            is_managed_as_retail: false,
            is_infrastructure: false,
        });
        bundle.guarantees.push(Guarantee {
            guarantee_reference: "G1".to_string(),
            guarantor_reference: "GUARANTOR".to_string(),
            currency: "GBP".to_string(),
            amount_covered: Some(dec!(60_000)),
            percentage_covered: None,
            maturity: NaiveDate::from_ymd_opt(2030, 1, 1).unwrap(),
            beneficiary_type: BeneficiaryType::Exposure,
            beneficiary_reference: "E1".to_string(),
        });
        let config = CalculationConfig::crr("GBP", dec!(0.8732), NaiveDate::from_ymd_opt(2026, 1, 1).unwrap());
        let record = bare_record("E1", dec!(100_000), ApproachType::Sa);
        let (rows, _) = process(vec![record], &bundle, &config);
        let total: Decimal = rows.iter().map(|r| r.ead_after_guarantee.unwrap()).sum();
        assert_eq!(total, dec!(100_000));
    }

    // -- Invariant 2: ead_gross >= ead_after_collateral >= ead_after_guarantee --

    #[test]
    fn test_invariant_crm_monotonicity() {
        let mut bundle = RawDataBundle::default();
        bundle.collateral.push(Collateral {
            collateral_reference: "C1".to_string(),
            collateral_type: crate::types::CollateralType::Cash,
            market_value: dec!(20_000),
            nominal_value: dec!(20_000),
            currency: "GBP".to_string(),
            valuation_date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            issuer_cqs: None,
            residual_maturity_years: Some(dec!(3)),
            is_main_index_equity: false,
            property_ltv: None,
            is_eligible: true,
            beneficiary_type: BeneficiaryType::Exposure,
            beneficiary_reference: "E1".to_string(),
        });
        bundle.counterparties.push(Counterparty {
            counterparty_reference: "GUARANTOR".to_string(),
            entity_type: EntityType::Sovereign,
            country: "GB".to_string(),
            annual_revenue: None,
            total_assets: None,
            is_defaulted: false,
            is_financial_institution: false,
            is_pse: false,
            is_mdb: false,
            is_central_counterparty: false,
            is_rgla: false,
            is_managed_as_retail: false,
            is_infrastructure: false,
        });
        bundle.guarantees.push(Guarantee {
            guarantee_reference: "G1".to_string(),
            guarantor_reference: "GUARANTOR".to_string(),
            currency: "GBP".to_string(),
            amount_covered: Some(dec!(30_000)),
            percentage_covered: None,
            maturity: NaiveDate::from_ymd_opt(2030, 1, 1).unwrap(),
            beneficiary_type: BeneficiaryType::Exposure,
            beneficiary_reference: "E1".to_string(),
        });
        let config = CalculationConfig::crr("GBP", dec!(0.8732), NaiveDate::from_ymd_opt(2026, 1, 1).unwrap());
        let record = bare_record("E1", dec!(100_000), ApproachType::Sa);
        let (rows, _) = process(vec![record], &bundle, &config);

        // `ead_gross`/`ead_after_collateral` are fixed before the guarantee
        // split and cloned unchanged into every split row; only
        // `ead_after_guarantee` is apportioned per row, so it alone is summed.
        let ead_gross: Decimal = rows[0].ead_gross.unwrap();
        let ead_after_collateral: Decimal = rows[0].ead_after_collateral.unwrap();
        let ead_after_guarantee_total: Decimal = rows.iter().map(|r| r.ead_after_guarantee.unwrap()).sum();

        assert!(ead_gross >= ead_after_collateral);
        assert!(ead_after_collateral >= ead_after_guarantee_total);
        for row in &rows {
            assert!(row.ead_after_guarantee.unwrap() >= Decimal::ZERO);
        }
    }
}
