//! Static regulatory lookups (§4.1): SA risk weights by (exposure class,
//! CQS), collateral haircuts, F-IRB supervisory LGD, slotting weights, CCF
//! tables. All compile-time constants, read by every other stage.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::types::{Cqs, ExposureClass, RegulatoryFramework, RiskType, SlottingCategory};

/// CQS-keyed SA risk weight for sovereign, institution, and corporate
/// classes. `use_uk_deviation` applies the PRA's 30%-for-CQS-2-institutions
/// deviation from the standard 50%.
pub fn sa_cqs_risk_weight(class: ExposureClass, cqs: Cqs, use_uk_deviation: bool) -> Decimal {
    match class {
        ExposureClass::Sovereign => match cqs {
            1 => dec!(0.00),
            2 => dec!(0.20),
            3 => dec!(0.50),
            4 | 5 => dec!(1.00),
            6 => dec!(1.50),
            _ => dec!(1.00), // unrated (CQS 0)
        },
        ExposureClass::Institution => match cqs {
            1 => dec!(0.20),
            2 if use_uk_deviation => dec!(0.30),
            2 => dec!(0.50),
            3 => dec!(0.50),
            4 | 5 => dec!(1.00),
            6 => dec!(1.50),
            _ => dec!(0.50), // unrated (CQS 0)
        },
        ExposureClass::Corporate | ExposureClass::CorporateSme => match cqs {
            1 => dec!(0.20),
            2 => dec!(0.50),
            3 => dec!(0.75),
            4 => dec!(1.00),
            5 | 6 => dec!(1.50),
            _ => dec!(1.00), // unrated (CQS 0)
        },
        _ => dec!(1.00),
    }
}

/// Flat retail (non-mortgage) risk weight, both frameworks.
pub const RETAIL_RISK_WEIGHT: Decimal = dec!(0.75);

/// Defaulted SA risk weight: 150% unsecured, 100% secured (any eligible
/// collateral recognised).
pub fn sa_defaulted_risk_weight(has_eligible_collateral: bool) -> Decimal {
    if has_eligible_collateral {
        dec!(1.00)
    } else {
        dec!(1.50)
    }
}

pub struct ResidentialMortgageParams {
    pub ltv_threshold: Decimal,
    pub rw_low_ltv: Decimal,
    pub rw_high_ltv: Decimal,
}

pub fn residential_mortgage_params(framework: RegulatoryFramework) -> ResidentialMortgageParams {
    match framework {
        RegulatoryFramework::Crr => ResidentialMortgageParams {
            ltv_threshold: dec!(0.80),
            rw_low_ltv: dec!(0.35),
            rw_high_ltv: dec!(0.75),
        },
        // Basel 3.1 granular LTV bands collapse, for this engine, to the same
        // two-tier split at a lower risk weight floor reflecting CRE20.70's
        // <=50% LTV band; intermediate bands are approximated by the
        // weighted-average formula applied at the 80% threshold.
        RegulatoryFramework::Basel3_1 => ResidentialMortgageParams {
            ltv_threshold: dec!(0.80),
            rw_low_ltv: dec!(0.20),
            rw_high_ltv: dec!(0.70),
        },
    }
}

pub struct CommercialRealEstateParams {
    pub ltv_threshold: Decimal,
    pub rw_low_ltv: Decimal,
    pub rw_standard: Decimal,
}

pub fn commercial_re_params(framework: RegulatoryFramework) -> CommercialRealEstateParams {
    match framework {
        RegulatoryFramework::Crr => CommercialRealEstateParams {
            ltv_threshold: dec!(0.60),
            rw_low_ltv: dec!(0.50),
            rw_standard: dec!(1.00),
        },
        RegulatoryFramework::Basel3_1 => CommercialRealEstateParams {
            ltv_threshold: dec!(0.60),
            rw_low_ltv: dec!(0.60),
            rw_standard: dec!(0.90),
        },
    }
}

/// CCF for the Standardised Approach, keyed by off-balance-sheet risk type.
pub fn sa_ccf(risk_type: RiskType) -> Decimal {
    match risk_type {
        RiskType::Fr => dec!(1.00),
        RiskType::Mr => dec!(0.50),
        RiskType::Mlr => dec!(0.20),
        RiskType::Lr => dec!(0.00),
    }
}

/// CCF for Foundation IRB, keyed by off-balance-sheet risk type. Art.166(9):
/// short-term trade letters of credit retain 20% rather than the 75% that
/// Art.166(8) would otherwise assign to MR/MLR risk types.
pub fn firb_ccf(risk_type: RiskType, is_short_term_trade_lc: bool) -> Decimal {
    if is_short_term_trade_lc {
        return dec!(0.20);
    }
    match risk_type {
        RiskType::Fr => dec!(1.00),
        RiskType::Mr | RiskType::Mlr => dec!(0.75),
        RiskType::Lr => dec!(0.00),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaturityBand {
    UpTo1Y,
    OneTo5Y,
    Over5Y,
}

pub fn maturity_band(residual_years: Decimal) -> MaturityBand {
    if residual_years <= Decimal::ONE {
        MaturityBand::UpTo1Y
    } else if residual_years <= dec!(5) {
        MaturityBand::OneTo5Y
    } else {
        MaturityBand::Over5Y
    }
}

/// Supervisory haircut by collateral type, issuer CQS (financial
/// instruments only; zero elsewhere), and residual-maturity band.
pub fn supervisory_haircut(
    collateral: crate::types::CollateralType,
    issuer_cqs: Option<Cqs>,
    band: MaturityBand,
) -> Decimal {
    use crate::types::CollateralType as C;
    match collateral {
        C::Cash => dec!(0.00),
        C::Gold => dec!(0.15),
        C::GovernmentBond | C::CorporateBond => {
            let cqs = issuer_cqs.unwrap_or(6);
            match (cqs, band) {
                (1 | 2 | 3, MaturityBand::UpTo1Y) => dec!(0.005),
                (1 | 2 | 3, MaturityBand::OneTo5Y) => dec!(0.02),
                (1 | 2 | 3, MaturityBand::Over5Y) => dec!(0.04),
                (4 | 5, MaturityBand::UpTo1Y) => dec!(0.01),
                (4 | 5, MaturityBand::OneTo5Y) => dec!(0.06),
                (4 | 5, MaturityBand::Over5Y) => dec!(0.12),
                _ => dec!(0.25),
            }
        }
        C::Equity => dec!(0.15),
        C::RealEstate | C::Receivables | C::OtherPhysical | C::Other => dec!(0.0),
    }
}

/// Fixed FX haircut (Art.238) applied when collateral currency differs from
/// the exposure currency.
pub const FX_HAIRCUT: Decimal = dec!(0.08);

/// F-IRB supervisory LGD by collateral category, and the unsecured fallback
/// by seniority.
pub fn firb_supervisory_lgd_secured(collateral: crate::types::CollateralType) -> Decimal {
    use crate::types::CollateralType as C;
    match collateral {
        c if c.is_financial() => dec!(0.00),
        C::Receivables => dec!(0.35),
        C::RealEstate => dec!(0.35),
        C::OtherPhysical => dec!(0.40),
        C::Other => dec!(0.45),
    }
}

pub fn firb_supervisory_lgd_unsecured(seniority: crate::types::Seniority) -> Decimal {
    match seniority {
        crate::types::Seniority::Senior => dec!(0.45),
        crate::types::Seniority::Subordinated => dec!(0.75),
    }
}

/// Overcollateralisation ratio applied before computing the "effectively
/// secured" amount under F-IRB collateral blending.
pub fn overcollateralisation_ratio(collateral: crate::types::CollateralType) -> Decimal {
    use crate::types::CollateralType as C;
    match collateral {
        c if c.is_financial() => dec!(1.00),
        C::Receivables => dec!(1.25),
        C::RealEstate => dec!(1.40),
        C::OtherPhysical => dec!(1.40),
        C::Other => dec!(1.00),
    }
}

/// Minimum-collateralisation threshold (as a fraction of EAD) below which
/// non-financial collateral protection is zeroed entirely.
pub fn minimum_collateralisation_threshold(collateral: crate::types::CollateralType) -> Decimal {
    use crate::types::CollateralType as C;
    match collateral {
        C::RealEstate | C::Receivables => dec!(0.30),
        _ => dec!(0.00),
    }
}

/// Slotting risk weight by framework, HVCRE flag, and category.
pub fn slotting_risk_weight(
    framework: RegulatoryFramework,
    is_hvcre: bool,
    category: SlottingCategory,
) -> Decimal {
    use SlottingCategory::*;
    match framework {
        RegulatoryFramework::Crr => match category {
            Strong => dec!(0.70),
            Good => dec!(0.70),
            Satisfactory => dec!(1.15),
            Weak => dec!(2.50),
            Default => dec!(0.00),
        },
        RegulatoryFramework::Basel3_1 if is_hvcre => match category {
            Strong => dec!(0.70),
            Good => dec!(0.95),
            Satisfactory => dec!(1.20),
            Weak => dec!(1.75),
            Default => dec!(3.50),
        },
        RegulatoryFramework::Basel3_1 => match category {
            Strong => dec!(0.50),
            Good => dec!(0.70),
            Satisfactory => dec!(1.00),
            Weak => dec!(1.50),
            Default => dec!(3.50),
        },
    }
}

/// CRR-specific maturity reduction: strong/good drop to 50%/70% when
/// residual maturity is below 2.5 years.
pub fn crr_slotting_maturity_adjustment(
    category: SlottingCategory,
    residual_years: Decimal,
) -> Option<Decimal> {
    if residual_years >= dec!(2.5) {
        return None;
    }
    match category {
        SlottingCategory::Strong => Some(dec!(0.50)),
        SlottingCategory::Good => Some(dec!(0.70)),
        _ => None,
    }
}
