//! Hierarchy Resolver (§4.4). Resolves counterparty parent/ultimate-parent
//! closure, inherits ratings, unifies facilities/loans/contingents into one
//! exposure table, and computes lending-group totals.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::config::CalculationConfig;
use crate::data::{Counterparty, RawDataBundle};
use crate::exposure::ExposureRecord;
use crate::fx::FxAudit;
use crate::types::{CalculationError, ErrorCategory, ErrorSeverity, ProductType};

/// Computes the ultimate parent of every counterparty by iteratively
/// following `organisation_mappings` (child -> parent) until a fixed point
/// or `max_depth`. Cycles are detected, broken at the detection point, and
/// reported as non-fatal hierarchy errors.
fn resolve_ultimate_parents(
    bundle: &RawDataBundle,
    max_depth: u32,
) -> (HashMap<String, String>, Vec<CalculationError>) {
    let mut parent_of: HashMap<String, String> = HashMap::new();
    for m in &bundle.organisation_mappings {
        parent_of.insert(
            m.child_counterparty_reference.clone(),
            m.parent_counterparty_reference.clone(),
        );
    }

    let mut errors = Vec::new();
    let mut ultimate: HashMap<String, String> = HashMap::new();

    let all_children: HashSet<&String> = parent_of.keys().collect();
    for child in all_children {
        let mut current = child.clone();
        let mut visited = HashSet::new();
        visited.insert(current.clone());
        let mut depth = 0;
        let mut cycle = false;

        while let Some(parent) = parent_of.get(&current) {
            if visited.contains(parent) {
                cycle = true;
                break;
            }
            if depth >= max_depth {
                break;
            }
            visited.insert(parent.clone());
            current = parent.clone();
            depth += 1;
        }

        if cycle {
            errors.push(
                CalculationError::new(
                    "HIER001",
                    format!("cycle detected in organisation hierarchy at {current}; closure broken"),
                    ErrorSeverity::Error,
                    ErrorCategory::Hierarchy,
                )
                .with_exposure(child.clone()),
            );
        }
        ultimate.insert(child.clone(), current);
    }

    (ultimate, errors)
}

/// Best available rating per counterparty: direct rating if present
/// (preferring external, tighter CQS among duplicates), else the best
/// ancestor rating. Internal PDs are never inherited — PD models are
/// counterparty-specific.
fn resolve_ratings(
    bundle: &RawDataBundle,
    ultimate_parents: &HashMap<String, String>,
) -> HashMap<String, (u8, crate::types::RatingType, Option<Decimal>)> {
    use crate::types::RatingType;

    let mut direct: HashMap<String, (u8, RatingType, Option<Decimal>)> = HashMap::new();
    for r in &bundle.ratings {
        let candidate = (r.cqs, r.rating_type, r.pd);
        direct
            .entry(r.counterparty_reference.clone())
            .and_modify(|existing| {
                let existing_rank = rank(existing.0, existing.1);
                let candidate_rank = rank(candidate.0, candidate.1);
                if candidate_rank > existing_rank {
                    *existing = candidate;
                }
            })
            .or_insert(candidate);
    }

    fn rank(cqs: u8, rating_type: crate::types::RatingType) -> i32 {
        // Prefer external (tie-break), then tighter (lower) CQS.
        let type_score = match rating_type {
            crate::types::RatingType::External => 1,
            crate::types::RatingType::Internal => 0,
        };
        type_score * 100 - cqs as i32
    }

    let mut resolved = direct.clone();
    for cp in &bundle.counterparties {
        if resolved.contains_key(&cp.counterparty_reference) {
            continue;
        }
        // Walk the ancestor chain via ultimate_parents map (direct parent
        // lookups are folded into the same map by resolve_ultimate_parents'
        // single-hop traversal; here we just check the resolved ultimate).
        if let Some(parent) = ultimate_parents.get(&cp.counterparty_reference) {
            if let Some(rating) = direct.get(parent) {
                resolved.insert(cp.counterparty_reference.clone(), *rating);
            }
        }
    }

    resolved
}

fn entity_type_bits(c: &Counterparty) -> EntityFlags {
    EntityFlags {
        entity_type: c.entity_type,
        is_financial_institution: c.is_financial_institution,
        is_pse: c.is_pse,
        is_mdb: c.is_mdb,
        is_central_counterparty: c.is_central_counterparty,
        is_rgla: c.is_rgla,
        is_managed_as_retail: c.is_managed_as_retail,
        is_infrastructure_eligible: c.is_infrastructure,
        is_defaulted: c.is_defaulted,
        annual_revenue: c.annual_revenue,
        total_assets: c.total_assets,
    }
}

struct EntityFlags {
    entity_type: crate::data::EntityType,
    is_financial_institution: bool,
    is_pse: bool,
    is_mdb: bool,
    is_central_counterparty: bool,
    is_rgla: bool,
    is_managed_as_retail: bool,
    is_infrastructure_eligible: bool,
    is_defaulted: bool,
    annual_revenue: Option<Decimal>,
    total_assets: Option<Decimal>,
}

pub fn resolve(
    bundle: &RawDataBundle,
    audit: &FxAudit,
    config: &CalculationConfig,
) -> (Vec<ExposureRecord>, Vec<CalculationError>) {
    let mut errors = Vec::new();

    let (ultimate_parents, cycle_errors) =
        resolve_ultimate_parents(bundle, config.max_hierarchy_depth);
    errors.extend(cycle_errors);

    let ratings = resolve_ratings(bundle, &ultimate_parents);

    let counterparties: HashMap<String, &Counterparty> = bundle
        .counterparties
        .iter()
        .map(|c| (c.counterparty_reference.clone(), c))
        .collect();

    // facility_reference / loan_reference -> parent facility, from the
    // multi-level facility mapping.
    let mut parent_facility: HashMap<String, String> = HashMap::new();
    for m in &bundle.facility_mappings {
        parent_facility.insert(m.child_reference.clone(), m.parent_facility_reference.clone());
    }

    // counterparty -> lending group root
    let mut lending_group_root: HashMap<String, String> = HashMap::new();
    for m in &bundle.lending_mappings {
        lending_group_root.insert(m.counterparty_reference.clone(), m.lending_group_root.clone());
    }

    let mut records = Vec::new();

    for f in &bundle.facilities {
        let undrawn = (f.limit - f.drawn_amount).max(Decimal::ZERO);
        records.push(build_record(
            &f.facility_reference,
            &f.counterparty_reference,
            f.product_category.unwrap_or(ProductType::Facility),
            parent_facility.get(&f.facility_reference).cloned(),
            &f.currency,
            f.drawn_amount,
            undrawn,
            Decimal::ZERO,
            f.maturity,
            f.seniority,
            Some(f.risk_type),
            f.is_short_term_trade_lc,
            f.revolving,
            f.ccf_modelled,
            None,
            None,
            f.ltv,
            f.has_income_cover,
            audit,
            &f.facility_reference,
            &counterparties,
            &ultimate_parents,
            &lending_group_root,
            &ratings,
            &mut errors,
        ));
    }

    for l in &bundle.loans {
        records.push(build_record(
            &l.loan_reference,
            &l.counterparty_reference,
            l.product_category.unwrap_or(ProductType::Loan),
            parent_facility.get(&l.loan_reference).cloned(),
            &l.currency,
            l.drawn_amount,
            Decimal::ZERO,
            l.accrued_interest.unwrap_or(Decimal::ZERO),
            l.maturity,
            l.seniority,
            None,
            false,
            false,
            None,
            l.lgd_modelled,
            l.beel,
            l.ltv,
            l.has_income_cover,
            audit,
            &l.loan_reference,
            &counterparties,
            &ultimate_parents,
            &lending_group_root,
            &ratings,
            &mut errors,
        ));
    }

    for c in &bundle.contingents {
        records.push(build_record(
            &c.contingent_reference,
            &c.counterparty_reference,
            ProductType::Contingent,
            None,
            &c.currency,
            Decimal::ZERO,
            c.nominal_amount,
            Decimal::ZERO,
            c.maturity,
            c.seniority,
            Some(c.risk_type),
            c.is_short_term_trade_lc,
            false,
            c.ccf_modelled,
            None,
            None,
            None,
            false,
            audit,
            &c.contingent_reference,
            &counterparties,
            &ultimate_parents,
            &lending_group_root,
            &ratings,
            &mut errors,
        ));
    }

    // Lending-group totals (drawn + interest), for the retail-threshold test.
    let mut group_totals: HashMap<String, Decimal> = HashMap::new();
    for r in &records {
        *group_totals.entry(r.lending_group_root.clone()).or_insert(Decimal::ZERO) +=
            r.drawn_amount + r.interest;
    }
    for r in &mut records {
        r.lending_group_total_drawn = Some(*group_totals.get(&r.lending_group_root).unwrap_or(&Decimal::ZERO));
    }

    (records, errors)
}

#[allow(clippy::too_many_arguments)]
fn build_record(
    exposure_reference: &str,
    counterparty_reference: &str,
    product_type: ProductType,
    parent_facility_reference: Option<String>,
    currency: &str,
    drawn_amount: Decimal,
    nominal_amount: Decimal,
    interest: Decimal,
    maturity: NaiveDate,
    seniority: crate::types::Seniority,
    risk_type: Option<crate::types::RiskType>,
    is_short_term_trade_lc: bool,
    revolving: bool,
    ccf_modelled: Option<Decimal>,
    lgd_modelled: Option<Decimal>,
    beel: Option<Decimal>,
    ltv: Option<Decimal>,
    has_income_cover: bool,
    audit: &FxAudit,
    audit_key: &str,
    counterparties: &HashMap<String, &Counterparty>,
    ultimate_parents: &HashMap<String, String>,
    lending_group_root: &HashMap<String, String>,
    ratings: &HashMap<String, (u8, crate::types::RatingType, Option<Decimal>)>,
    errors: &mut Vec<CalculationError>,
) -> ExposureRecord {
    let original_currency = audit
        .original_currency
        .get(audit_key)
        .cloned()
        .unwrap_or_else(|| currency.to_string());
    let fx_rate_applied = audit.fx_rate_applied.get(audit_key).copied();
    let original_primary = audit
        .original_primary_amount
        .get(audit_key)
        .copied()
        .unwrap_or(drawn_amount);
    let original_secondary = audit
        .original_secondary_amount
        .get(audit_key)
        .copied()
        .unwrap_or(nominal_amount);

    let flags = match counterparties.get(counterparty_reference) {
        Some(c) => entity_type_bits(c),
        None => {
            errors.push(
                CalculationError::new(
                    "HIER002",
                    format!("exposure {exposure_reference} references unknown counterparty {counterparty_reference}"),
                    ErrorSeverity::Warning,
                    ErrorCategory::DataQuality,
                )
                .with_exposure(exposure_reference),
            );
            EntityFlags {
                entity_type: crate::data::EntityType::Other,
                is_financial_institution: false,
                is_pse: false,
                is_mdb: false,
                is_central_counterparty: false,
                is_rgla: false,
                is_managed_as_retail: false,
                is_infrastructure_eligible: false,
                is_defaulted: false,
                annual_revenue: None,
                total_assets: None,
            }
        }
    };

    let ultimate_parent_reference = ultimate_parents
        .get(counterparty_reference)
        .cloned()
        .unwrap_or_else(|| counterparty_reference.to_string());
    let group_root = lending_group_root
        .get(counterparty_reference)
        .cloned()
        .unwrap_or_else(|| ultimate_parent_reference.clone());
    let rating = ratings.get(counterparty_reference).copied();

    ExposureRecord {
        exposure_reference: exposure_reference.to_string(),
        counterparty_reference: counterparty_reference.to_string(),
        product_type,
        parent_facility_reference,
        currency: currency.to_string(),
        drawn_amount,
        nominal_amount,
        interest,
        maturity,
        seniority,
        risk_type,
        is_short_term_trade_lc,
        revolving,
        ccf_modelled,
        lgd_modelled,
        beel,
        original_currency,
        original_drawn_amount: original_primary,
        original_nominal_amount: original_secondary,
        fx_rate_applied,
        entity_type: flags.entity_type,
        annual_revenue: flags.annual_revenue,
        total_assets: flags.total_assets,
        is_defaulted: flags.is_defaulted,
        is_financial_institution: flags.is_financial_institution,
        is_pse: flags.is_pse,
        is_mdb: flags.is_mdb,
        is_central_counterparty: flags.is_central_counterparty,
        is_rgla: flags.is_rgla,
        is_managed_as_retail: flags.is_managed_as_retail,
        is_infrastructure_eligible: flags.is_infrastructure_eligible,
        ultimate_parent_reference,
        lending_group_root: group_root,
        lending_group_total_drawn: None,
        resolved_cqs: rating.map(|r| r.0),
        resolved_pd: rating.and_then(|r| r.2),
        resolved_rating_type: rating.map(|r| r.1),
        ltv,
        has_income_cover,
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
