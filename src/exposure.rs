//! The single growing record that flows through every pipeline stage.
//!
//! The original column-oriented design adds columns to a table at each
//! stage boundary (§3 Lifecycle, §9). Without a columnar engine the
//! idiomatic Rust equivalent is one record type whose `Option<…>` fields are
//! populated, never overwritten, as the record passes from Hierarchy
//! Resolver → Classifier → CRM Processor → {SA, IRB, Slotting} → Aggregator.
//! Each stage function still takes `Vec<ExposureRecord>` by value and
//! returns a new `Vec<ExposureRecord>`, so no stage mutates another's
//! output in place.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::data::EntityType;
use crate::types::{
    ApproachType, CollateralType, CrmPortionType, ExposureClass, Money, ProductType, RatingType,
    RiskType, Seniority, SlottingCategory, SpecialisedLendingType,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExposureRecord {
    // -- Identity (set at unification, §4.4) ---------------------------------
    pub exposure_reference: String,
    pub counterparty_reference: String,
    pub product_type: ProductType,
    pub parent_facility_reference: Option<String>,

    // -- Raw monetary / term attributes --------------------------------------
    pub currency: String,
    pub drawn_amount: Money,
    pub nominal_amount: Money,
    pub interest: Money,
    pub maturity: NaiveDate,
    pub seniority: Seniority,
    pub risk_type: Option<RiskType>,
    pub is_short_term_trade_lc: bool,
    pub revolving: bool,
    pub ccf_modelled: Option<Decimal>,
    pub lgd_modelled: Option<Decimal>,
    pub beel: Option<Money>,

    // -- FX audit (§4.3) ------------------------------------------------------
    pub original_currency: String,
    pub original_drawn_amount: Money,
    pub original_nominal_amount: Money,
    pub fx_rate_applied: Option<Decimal>,

    // -- Counterparty attributes merged in by the Hierarchy Resolver ---------
    pub entity_type: EntityType,
    pub annual_revenue: Option<Money>,
    pub total_assets: Option<Money>,
    pub is_defaulted: bool,
    pub is_financial_institution: bool,
    pub is_pse: bool,
    pub is_mdb: bool,
    pub is_central_counterparty: bool,
    pub is_rgla: bool,
    pub is_managed_as_retail: bool,
    pub is_infrastructure_eligible: bool,

    // -- Hierarchy Resolver (§4.4) --------------------------------------------
    pub ultimate_parent_reference: String,
    pub lending_group_root: String,
    pub lending_group_total_drawn: Option<Money>,
    pub resolved_cqs: Option<u8>,
    pub resolved_pd: Option<Decimal>,
    pub resolved_rating_type: Option<RatingType>,

    // -- Real-estate specific (feeds SA LTV split, §4.7) ----------------------
    pub ltv: Option<Decimal>,
    pub has_income_cover: bool,

    // -- Classifier (§4.5) -----------------------------------------------------
    pub pre_crm_exposure_class: Option<ExposureClass>,
    pub exposure_class: Option<ExposureClass>,
    pub approach: Option<ApproachType>,
    pub is_sme: bool,
    pub is_infrastructure: bool,
    pub slotting_category: Option<SlottingCategory>,
    pub sl_type: Option<SpecialisedLendingType>,
    pub is_hvcre: bool,

    // -- CRM Processor (§4.6) --------------------------------------------------
    pub pre_crm_counterparty_reference: Option<String>,
    pub ccf: Option<Decimal>,
    pub ead_from_ccf: Option<Money>,
    pub ead_pre_crm: Option<Money>,
    pub ead_gross: Option<Money>,
    pub collateral_value_applied: Option<Money>,
    pub ead_after_collateral: Option<Money>,
    pub lgd_pre_crm: Option<Decimal>,
    pub lgd_post_crm: Option<Decimal>,
    pub secured_collateral_type: Option<CollateralType>,
    pub guarantor_reference: Option<String>,
    pub guaranteed_portion: Option<Money>,
    pub unguaranteed_portion: Option<Money>,
    pub guarantor_exposure_class: Option<ExposureClass>,
    pub guarantor_cqs: Option<u8>,
    pub guarantor_approach: Option<ApproachType>,
    pub is_guaranteed: bool,
    pub ead_after_guarantee: Option<Money>,
    pub provision_allocated: Option<Money>,
    pub provision_deducted: Option<Money>,
    pub ead_final: Option<Money>,
    pub crm_audit: Vec<String>,

    // -- SA Calculator (§4.7) --------------------------------------------------
    pub sa_risk_weight: Option<Decimal>,
    pub sa_rwa_pre_factor: Option<Money>,
    pub supporting_factor: Option<Decimal>,
    pub sa_rwa_post_factor: Option<Money>,

    // -- IRB Calculator (§4.8) -------------------------------------------------
    pub pd: Option<Decimal>,
    pub pd_floored: Option<Decimal>,
    pub lgd_floored: Option<Decimal>,
    pub correlation: Option<Decimal>,
    pub maturity_adjustment: Option<Decimal>,
    pub capital_requirement_k: Option<Decimal>,
    pub irb_risk_weight: Option<Decimal>,
    pub irb_rwa: Option<Money>,
    pub guarantee_applied_beneficially: bool,
    pub expected_loss: Option<Money>,

    // -- Slotting Calculator (§4.9) --------------------------------------------
    pub slotting_risk_weight: Option<Decimal>,
    pub slotting_rwa: Option<Money>,

    // -- Aggregator (§4.10) -----------------------------------------------------
    pub final_risk_weight: Option<Decimal>,
    pub final_rwa: Option<Money>,
    pub rwa_sa_equivalent: Option<Money>,
    pub output_floor_applied: bool,
    pub reporting_exposure_class: Option<ExposureClass>,
    pub crm_portion_type: Option<CrmPortionType>,
}

impl ExposureRecord {
    pub fn ead_gross_or_zero(&self) -> Money {
        self.ead_gross.unwrap_or(Money::ZERO)
    }

    pub fn ead_final_or_zero(&self) -> Money {
        self.ead_final.unwrap_or(Money::ZERO)
    }
}
