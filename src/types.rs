use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// All monetary values. Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Rates expressed as decimals (0.05 = 5%). Never as percentages.
pub type Rate = Decimal;

/// Year fractions or counts.
pub type Years = Decimal;

/// Regulatory framework selector. Data, not control flow (CalculationConfig
/// is the only place that branches on this).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RegulatoryFramework {
    Crr,
    Basel3_1,
}

/// Exposure classification assigned by the Classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExposureClass {
    Sovereign,
    Institution,
    Corporate,
    CorporateSme,
    RetailMortgage,
    RetailQrre,
    RetailOther,
    SpecialisedLending,
    Equity,
    Defaulted,
    Pse,
    Mdb,
    Rgla,
    Other,
}

impl ExposureClass {
    pub fn is_retail(self) -> bool {
        matches!(
            self,
            ExposureClass::RetailMortgage | ExposureClass::RetailQrre | ExposureClass::RetailOther
        )
    }
}

/// Calculation approach assigned per exposure. Exactly one calculator
/// processes any given exposure (invariant 5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ApproachType {
    Sa,
    Firb,
    Airb,
    Slotting,
}

/// Credit Quality Step. 0 = unrated.
pub type Cqs = u8;

/// Collateral type vocabulary shared by collateral and F-IRB LGD lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CollateralType {
    Cash,
    Gold,
    GovernmentBond,
    CorporateBond,
    Equity,
    RealEstate,
    Receivables,
    OtherPhysical,
    Other,
}

impl CollateralType {
    pub fn is_financial(self) -> bool {
        matches!(
            self,
            CollateralType::Cash
                | CollateralType::Gold
                | CollateralType::GovernmentBond
                | CollateralType::CorporateBond
                | CollateralType::Equity
        )
    }
}

/// Off-balance-sheet risk type vocabulary controlling CCF lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskType {
    /// Full risk
    Fr,
    /// Medium risk
    Mr,
    /// Medium/low risk
    Mlr,
    /// Low risk
    Lr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Seniority {
    Senior,
    Subordinated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IfrsStage {
    Stage1,
    Stage2,
    Stage3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RatingType {
    Internal,
    External,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SlottingCategory {
    Strong,
    Good,
    Satisfactory,
    Weak,
    Default,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpecialisedLendingType {
    ProjectFinance,
    ObjectFinance,
    CommoditiesFinance,
    Ipre,
    Hvcre,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CrmPortionType {
    Original,
    Unguaranteed,
    Guaranteed,
}

/// Beneficiary pair shared by Collateral, Guarantee, and Provision rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BeneficiaryType {
    Exposure,
    Facility,
    Counterparty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProductType {
    Loan,
    Facility,
    Contingent,
    ResidentialMortgage,
    CommercialRealEstate,
}

/// Severity tier for accumulated CalculationError records (§7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorSeverity {
    Warning,
    Error,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCategory {
    DataQuality,
    BusinessRule,
    SchemaValidation,
    Configuration,
    Calculation,
    Hierarchy,
    Crm,
}

/// A single accumulated, non-fatal finding. Business conditions never raise
/// — only structural failures become `CorpFinanceError`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalculationError {
    pub code: String,
    pub message: String,
    pub severity: ErrorSeverity,
    pub category: ErrorCategory,
    pub exposure_reference: Option<String>,
    pub counterparty_reference: Option<String>,
    pub regulatory_reference: Option<String>,
    pub field_name: Option<String>,
    pub expected_value: Option<String>,
    pub actual_value: Option<String>,
}

impl CalculationError {
    pub fn new(
        code: &str,
        message: impl Into<String>,
        severity: ErrorSeverity,
        category: ErrorCategory,
    ) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            severity,
            category,
            exposure_reference: None,
            counterparty_reference: None,
            regulatory_reference: None,
            field_name: None,
            expected_value: None,
            actual_value: None,
        }
    }

    pub fn with_exposure(mut self, reference: impl Into<String>) -> Self {
        self.exposure_reference = Some(reference.into());
        self
    }

    pub fn with_regulatory_reference(mut self, reference: impl Into<String>) -> Self {
        self.regulatory_reference = Some(reference.into());
        self
    }
}

/// Standard computation output envelope, wrapping the top-level pipeline result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "rust_decimal_128bit".to_string(),
        },
    }
}

/// A reporting date, used for the output-floor transitional schedule.
pub type ReportingDate = NaiveDate;
