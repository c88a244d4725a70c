//! Raw tabular data model (§3). Entities are immutable once loaded; each
//! table is a `Vec<T>`, following the "MAY materialise to per-row records"
//! allowance of §9.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::types::{
    BeneficiaryType, Cqs, IfrsStage, Money, RatingType, RiskType, Seniority,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Facility {
    pub facility_reference: String,
    pub counterparty_reference: String,
    pub currency: String,
    pub limit: Money,
    pub drawn_amount: Money,
    pub maturity: NaiveDate,
    pub seniority: Seniority,
    pub risk_type: RiskType,
    pub revolving: bool,
    pub ccf_modelled: Option<rust_decimal::Decimal>,
    pub is_short_term_trade_lc: bool,
    /// Overrides the default `Facility` product tag, e.g. for a mortgage
    /// drawn through a facility line rather than a term loan.
    pub product_category: Option<crate::types::ProductType>,
    pub ltv: Option<rust_decimal::Decimal>,
    pub has_income_cover: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Loan {
    pub loan_reference: String,
    pub counterparty_reference: String,
    pub currency: String,
    pub drawn_amount: Money,
    pub accrued_interest: Option<Money>,
    pub maturity: NaiveDate,
    pub seniority: Seniority,
    /// Modelled LGD, A-IRB only.
    pub lgd_modelled: Option<rust_decimal::Decimal>,
    /// Best-estimate expected loss, A-IRB defaulted exposures only.
    pub beel: Option<Money>,
    /// Overrides the default `Loan` product tag — set for residential
    /// mortgages and commercial real estate loans, which the Classifier and
    /// SA Calculator treat distinctly (§4.5, §4.7).
    pub product_category: Option<crate::types::ProductType>,
    pub ltv: Option<rust_decimal::Decimal>,
    pub has_income_cover: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contingent {
    pub contingent_reference: String,
    pub counterparty_reference: String,
    pub currency: String,
    pub nominal_amount: Money,
    pub maturity: NaiveDate,
    pub seniority: Seniority,
    pub risk_type: RiskType,
    pub ccf_modelled: Option<rust_decimal::Decimal>,
    pub is_short_term_trade_lc: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum EntityType {
    Sovereign,
    CentralBank,
    Institution,
    Corporate,
    Individual,
    SpecialisedLendingSpv,
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Counterparty {
    pub counterparty_reference: String,
    pub entity_type: EntityType,
    pub country: String,
    pub annual_revenue: Option<Money>,
    pub total_assets: Option<Money>,
    pub is_defaulted: bool,
    pub is_financial_institution: bool,
    pub is_pse: bool,
    pub is_mdb: bool,
    pub is_central_counterparty: bool,
    pub is_rgla: bool,
    pub is_managed_as_retail: bool,
    /// CRR Art.501a infrastructure supporting-factor eligibility flag.
    pub is_infrastructure: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collateral {
    pub collateral_reference: String,
    pub collateral_type: crate::types::CollateralType,
    pub market_value: Money,
    pub nominal_value: Money,
    pub currency: String,
    pub valuation_date: NaiveDate,
    pub issuer_cqs: Option<Cqs>,
    pub residual_maturity_years: Option<rust_decimal::Decimal>,
    pub is_main_index_equity: bool,
    pub property_ltv: Option<rust_decimal::Decimal>,
    pub is_eligible: bool,
    pub beneficiary_type: BeneficiaryType,
    pub beneficiary_reference: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Guarantee {
    pub guarantee_reference: String,
    pub guarantor_reference: String,
    pub currency: String,
    pub amount_covered: Option<Money>,
    pub percentage_covered: Option<rust_decimal::Decimal>,
    pub maturity: NaiveDate,
    pub beneficiary_type: BeneficiaryType,
    pub beneficiary_reference: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ProvisionType {
    Scra,
    Gcra,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Provision {
    pub provision_reference: String,
    pub provision_type: ProvisionType,
    pub ifrs_stage: IfrsStage,
    pub currency: String,
    pub amount: Money,
    pub beneficiary_type: BeneficiaryType,
    pub beneficiary_reference: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rating {
    pub counterparty_reference: String,
    pub rating_type: RatingType,
    pub agency: Option<String>,
    pub cqs: Cqs,
    pub pd: Option<rust_decimal::Decimal>,
    pub rating_date: NaiveDate,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ChildType {
    Facility,
    Loan,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FacilityMapping {
    pub parent_facility_reference: String,
    pub child_reference: String,
    pub child_type: ChildType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganisationMapping {
    pub parent_counterparty_reference: String,
    pub child_counterparty_reference: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LendingMapping {
    pub lending_group_root: String,
    pub counterparty_reference: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FxRate {
    pub currency_from: String,
    pub currency_to: String,
    pub rate: rust_decimal::Decimal,
}

/// The loader-produced input, one vector per entity listed in §3. Loading
/// (file dialects, schema casting) is an out-of-scope external collaborator;
/// this crate only consumes the bundle.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawDataBundle {
    pub facilities: Vec<Facility>,
    pub loans: Vec<Loan>,
    pub contingents: Vec<Contingent>,
    pub counterparties: Vec<Counterparty>,
    pub collateral: Vec<Collateral>,
    pub guarantees: Vec<Guarantee>,
    pub provisions: Vec<Provision>,
    pub ratings: Vec<Rating>,
    pub facility_mappings: Vec<FacilityMapping>,
    pub organisation_mappings: Vec<OrganisationMapping>,
    pub lending_mappings: Vec<LendingMapping>,
    pub fx_rates: Vec<FxRate>,
}

/// Capability consumed by the pipeline to obtain a `RawDataBundle`. No
/// concrete implementation ships in this crate — file/network loading is an
/// out-of-scope external collaborator (§1, §6).
pub trait DataSource {
    fn load(&self) -> crate::CorpFinanceResult<RawDataBundle>;
}
