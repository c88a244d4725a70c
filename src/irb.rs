//! Foundation and Advanced IRB capital requirement (§4.8). Vasicek
//! single-factor correlation, supervisory maturity adjustment, and the
//! CRR Art.501 1.06 scaling factor, computed in decimal precision via
//! `crate::numerics`.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::config::CalculationConfig;
use crate::exposure::ExposureRecord;
use crate::numerics::{norm_cdf, norm_inv};
use crate::reference_tables::{firb_supervisory_lgd_unsecured, sa_cqs_risk_weight};
use crate::types::{
    ApproachType, CalculationError, CrmPortionType, ErrorCategory, ErrorSeverity, ExposureClass,
    RegulatoryFramework,
};

/// LGD used in the capital formula: the CRM Processor's blended F-IRB LGD
/// or A-IRB modelled LGD if one was set, else the supervisory unsecured
/// fallback (F-IRB exposures with no collateral at all).
fn effective_lgd(record: &ExposureRecord, config: &CalculationConfig) -> Decimal {
    if let Some(lgd) = record.lgd_post_crm {
        return lgd;
    }
    if record.approach == Some(ApproachType::Airb) {
        if let Some(lgd) = record.lgd_modelled {
            return lgd;
        }
    }
    let floor = config.lgd_floors.floor_for(record.secured_collateral_type);
    firb_supervisory_lgd_unsecured(record.seniority).max(floor)
}

/// Converts a base-currency amount to EUR for the turnover figure the SME
/// correlation discount is banded on.
fn to_eur(amount: Decimal, config: &CalculationConfig) -> Decimal {
    if config.base_currency.eq_ignore_ascii_case("EUR") {
        amount
    } else {
        amount / config.eur_gbp_rate
    }
}

/// CRR Art.153(4) SME asset-correlation discount: `-0.04 * (1 - (turnover_m -
/// 5)/45)`, banded over `turnover_m` (annual revenue in EUR millions) clamped
/// to `[5, 50]`. Zero outside CRR or for non-SME exposures.
fn sme_correlation_discount(record: &ExposureRecord, config: &CalculationConfig) -> Decimal {
    if config.framework != RegulatoryFramework::Crr || !record.is_sme {
        return Decimal::ZERO;
    }
    let turnover_eur = to_eur(record.annual_revenue.unwrap_or(Decimal::ZERO), config);
    let turnover_m = (turnover_eur / dec!(1_000_000)).clamp(dec!(5), dec!(50));
    -dec!(0.04) * (Decimal::ONE - (turnover_m - dec!(5)) / dec!(45))
}

/// Vasicek asset correlation. Retail uses the flat/QRRE constants; corporate,
/// sovereign, and institution use the size-adjusted corporate formula (CRR
/// Art.153), with `sme_discount` applied only for CRR SME exposures.
fn correlation(class: ExposureClass, pd: Decimal, sme_discount: Decimal) -> Decimal {
    match class {
        ExposureClass::RetailMortgage => dec!(0.15),
        ExposureClass::RetailQrre => dec!(0.04),
        ExposureClass::RetailOther => {
            use crate::numerics::exp_decimal;
            let term = (Decimal::ONE - exp_decimal(-dec!(35) * pd)) / (Decimal::ONE - exp_decimal(dec!(-35)));
            dec!(0.03) * term + dec!(0.16) * (Decimal::ONE - term)
        }
        _ => {
            let e_50 = exp_neg_50pd(pd);
            dec!(0.12) * e_50 + dec!(0.24) * (Decimal::ONE - e_50) + sme_discount
        }
    }
}

/// `(1 - e^(-50*PD)) / (1 - e^(-50))`, the correlation weighting function
/// shared by sovereign/institution/corporate exposures.
fn exp_neg_50pd(pd: Decimal) -> Decimal {
    use crate::numerics::exp_decimal;
    let num = Decimal::ONE - exp_decimal(-dec!(50) * pd);
    let den = Decimal::ONE - exp_decimal(dec!(-50));
    num / den
}

/// Supervisory maturity adjustment (CRR Art.162), non-retail only.
fn maturity_adjustment(pd: Decimal, residual_years: Decimal) -> Decimal {
    let b_base = dec!(0.11852) - dec!(0.05478) * crate::numerics::ln_decimal(pd);
    let b = b_base * b_base;
    let m = residual_years.clamp(Decimal::ONE, dec!(5));
    (Decimal::ONE + (m - Decimal::ONE) * b) / (Decimal::ONE - dec!(1.5) * b)
}

fn residual_years(record: &ExposureRecord, config: &CalculationConfig) -> Decimal {
    let days = (record.maturity - config.reporting_date).num_days().max(0);
    Decimal::from(days) / dec!(365)
}

/// Non-defaulted capital requirement `K` per unit EAD: Vasicek conditional
/// expected loss minus expected loss, scaled by LGD, correlation, and (for
/// non-retail) the supervisory maturity adjustment.
fn capital_requirement(
    class: ExposureClass,
    pd: Decimal,
    lgd: Decimal,
    maturity_years: Decimal,
    sme_discount: Decimal,
) -> (Decimal, Decimal, Decimal) {
    let rho = correlation(class, pd, sme_discount);
    let n_inv_pd = norm_inv(pd);
    let n_inv_999 = norm_inv(dec!(0.999));
    let sqrt_rho = crate::numerics::sqrt_decimal(rho);
    let sqrt_one_minus_rho = crate::numerics::sqrt_decimal(Decimal::ONE - rho);
    let conditional_pd = norm_cdf((n_inv_pd + sqrt_rho * n_inv_999) / sqrt_one_minus_rho);

    let ma = if class.is_retail() {
        Decimal::ONE
    } else {
        maturity_adjustment(pd, maturity_years)
    };

    let k = (lgd * conditional_pd - lgd * pd) * ma;
    (k.max(Decimal::ZERO), rho, ma)
}

/// Guarantee risk-weight substitution (§4.8): only applied when the
/// guarantor's SA risk weight is strictly below the exposure's own IRB risk
/// weight. Only the guaranteed-portion split row (`CrmPortionType::Guaranteed`)
/// carries a `guarantor_exposure_class`, so this is a no-op on every other
/// row. A non-beneficial guarantee leaves `rwa`/`expected_loss` at the
/// already-computed unsubstituted values and is flagged for the record.
fn apply_guarantee_substitution(
    record: &mut ExposureRecord,
    config: &CalculationConfig,
    ead: Decimal,
    errors: &mut Vec<CalculationError>,
) {
    if record.crm_portion_type != Some(CrmPortionType::Guaranteed) {
        return;
    }
    let (Some(guarantor_class), borrower_rw) =
        (record.guarantor_exposure_class, record.irb_risk_weight.unwrap_or(Decimal::ZERO))
    else {
        return;
    };
    let use_uk_deviation = config.base_currency.eq_ignore_ascii_case("GBP");
    let guarantor_rw = sa_cqs_risk_weight(guarantor_class, record.guarantor_cqs.unwrap_or(0), use_uk_deviation);

    if guarantor_rw < borrower_rw {
        record.guarantee_applied_beneficially = true;
        record.irb_risk_weight = Some(guarantor_rw);
        let rwa = guarantor_rw * ead;
        record.irb_rwa = Some(rwa);
        record.final_risk_weight = Some(guarantor_rw);
        record.final_rwa = Some(rwa);
        record.expected_loss = Some(Decimal::ZERO);
        record.crm_audit.push(format!(
            "SA_RW_SUBSTITUTION: guarantor rw {guarantor_rw} < borrower irb rw {borrower_rw}"
        ));
    } else {
        record.guarantee_applied_beneficially = false;
        errors.push(
            CalculationError::new(
                "IRB002",
                format!(
                    "GUARANTEE_NOT_APPLIED_NON_BENEFICIAL: guarantor rw {guarantor_rw} not below \
                     borrower irb rw {borrower_rw}; guarantee substitution skipped"
                ),
                ErrorSeverity::Warning,
                ErrorCategory::BusinessRule,
            )
            .with_exposure(record.exposure_reference.clone())
            .with_regulatory_reference("CRR Art.153(3) guarantee substitution"),
        );
    }
}

/// Applies F-IRB/A-IRB capital calculation to every exposure the
/// Classifier routed to `Firb` or `Airb`, leaving other approaches
/// untouched.
pub fn calculate(
    mut records: Vec<ExposureRecord>,
    config: &CalculationConfig,
) -> (Vec<ExposureRecord>, Vec<CalculationError>) {
    let mut errors = Vec::new();

    for record in &mut records {
        let approach = record.approach;
        if approach != Some(ApproachType::Firb) && approach != Some(ApproachType::Airb) {
            continue;
        }

        let class = record.exposure_class.unwrap_or(ExposureClass::Corporate);
        let ead = record.ead_final_or_zero();
        let lgd = effective_lgd(record, config);
        record.lgd_post_crm.get_or_insert(lgd);

        if record.is_defaulted {
            let k = match approach {
                Some(ApproachType::Airb) => {
                    (lgd - record.beel.unwrap_or(Decimal::ZERO)).max(Decimal::ZERO)
                }
                _ => Decimal::ZERO,
            };
            record.capital_requirement_k = Some(k);
            record.pd_floored = Some(Decimal::ONE);
            record.lgd_floored = Some(lgd);
            record.correlation = None;
            record.maturity_adjustment = None;
            let rw = k * dec!(12.5);
            record.irb_risk_weight = Some(rw);
            let rwa = rw * ead;
            record.irb_rwa = Some(rwa);
            record.final_risk_weight = Some(rw);
            record.final_rwa = Some(rwa);
            record.expected_loss = Some(lgd * ead);
            apply_guarantee_substitution(record, config, ead, &mut errors);
            continue;
        }

        let pd_raw = record.resolved_pd.unwrap_or(dec!(1.00));
        let pd_floor = config.pd_floors.floor_for(class);
        let pd = pd_raw.max(pd_floor);
        record.pd = Some(pd_raw);
        record.pd_floored = Some(pd);
        record.lgd_floored = Some(lgd);

        let maturity_years = residual_years(record, config);
        let sme_discount = sme_correlation_discount(record, config);
        let (k_unscaled, rho, ma) = capital_requirement(class, pd, lgd, maturity_years, sme_discount);

        let scaling = if class.is_retail() {
            Decimal::ONE
        } else {
            config.scaling_factor
        };
        let k = k_unscaled * scaling;

        record.correlation = Some(rho);
        record.maturity_adjustment = if class.is_retail() { None } else { Some(ma) };
        record.capital_requirement_k = Some(k);

        let rw = k * dec!(12.5);
        record.irb_risk_weight = Some(rw);
        let rwa = rw * ead;
        record.irb_rwa = Some(rwa);
        record.final_risk_weight = Some(rw);
        record.final_rwa = Some(rwa);
        record.expected_loss = Some(pd * lgd * ead);
        apply_guarantee_substitution(record, config, ead, &mut errors);
    }
    (records, errors)
}
