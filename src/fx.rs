//! FX Converter (§4.3). Normalises every monetary column to the reporting
//! currency, preserving the original currency/amount/rate for audit.

use std::collections::HashMap;

use rust_decimal::Decimal;

use crate::config::CalculationConfig;
use crate::data::RawDataBundle;
use crate::types::{CalculationError, ErrorCategory, ErrorSeverity};

/// Per-reference FX audit trail, read by the Hierarchy Resolver when it
/// unifies facilities/loans/contingents into `ExposureRecord`s.
#[derive(Debug, Clone, Default)]
pub struct FxAudit {
    pub original_currency: HashMap<String, String>,
    pub original_primary_amount: HashMap<String, Decimal>,
    /// Original undrawn/nominal portion, pre-conversion (facilities' undrawn
    /// commitment, contingents' nominal amount; zero for loans).
    pub original_secondary_amount: HashMap<String, Decimal>,
    pub fx_rate_applied: HashMap<String, Decimal>,
}

struct RateTable {
    rates: HashMap<(String, String), Decimal>,
}

impl RateTable {
    fn from_rows(rows: &[crate::data::FxRate]) -> Self {
        let mut rates = HashMap::new();
        for row in rows {
            rates.insert((row.currency_from.clone(), row.currency_to.clone()), row.rate);
        }
        Self { rates }
    }

    fn rate(&self, from: &str, to: &str) -> Option<Decimal> {
        if from == to {
            return Some(Decimal::ONE);
        }
        self.rates.get(&(from.to_string(), to.to_string())).copied()
    }
}

/// Converts every monetary table in `bundle` to `config.base_currency`,
/// returning the converted bundle, an audit trail, and any accumulated
/// warnings (unmatched currencies keep their original denomination, §4.3).
pub fn convert(
    mut bundle: RawDataBundle,
    config: &CalculationConfig,
) -> (RawDataBundle, FxAudit, Vec<CalculationError>) {
    let mut errors = Vec::new();
    let mut audit = FxAudit::default();
    let table = RateTable::from_rows(&bundle.fx_rates);
    let reporting = config.base_currency.as_str();

    for f in &mut bundle.facilities {
        match table.rate(&f.currency, reporting) {
            Some(rate) => {
                audit
                    .original_currency
                    .insert(f.facility_reference.clone(), f.currency.clone());
                audit
                    .original_primary_amount
                    .insert(f.facility_reference.clone(), f.drawn_amount);
                audit
                    .original_secondary_amount
                    .insert(f.facility_reference.clone(), f.limit - f.drawn_amount);
                if rate != Decimal::ONE {
                    audit.fx_rate_applied.insert(f.facility_reference.clone(), rate);
                }
                f.limit *= rate;
                f.drawn_amount *= rate;
                f.currency = reporting.to_string();
            }
            None => errors.push(fx_missing_warning(&f.facility_reference, &f.currency, reporting)),
        }
    }

    for l in &mut bundle.loans {
        match table.rate(&l.currency, reporting) {
            Some(rate) => {
                audit
                    .original_currency
                    .insert(l.loan_reference.clone(), l.currency.clone());
                audit
                    .original_primary_amount
                    .insert(l.loan_reference.clone(), l.drawn_amount);
                if rate != Decimal::ONE {
                    audit.fx_rate_applied.insert(l.loan_reference.clone(), rate);
                }
                l.drawn_amount *= rate;
                l.accrued_interest = l.accrued_interest.map(|a| a * rate);
                l.currency = reporting.to_string();
            }
            None => errors.push(fx_missing_warning(&l.loan_reference, &l.currency, reporting)),
        }
    }

    for c in &mut bundle.contingents {
        match table.rate(&c.currency, reporting) {
            Some(rate) => {
                audit
                    .original_currency
                    .insert(c.contingent_reference.clone(), c.currency.clone());
                audit
                    .original_primary_amount
                    .insert(c.contingent_reference.clone(), Decimal::ZERO);
                audit
                    .original_secondary_amount
                    .insert(c.contingent_reference.clone(), c.nominal_amount);
                if rate != Decimal::ONE {
                    audit.fx_rate_applied.insert(c.contingent_reference.clone(), rate);
                }
                c.nominal_amount *= rate;
                c.currency = reporting.to_string();
            }
            None => errors.push(fx_missing_warning(&c.contingent_reference, &c.currency, reporting)),
        }
    }

    for coll in &mut bundle.collateral {
        match table.rate(&coll.currency, reporting) {
            Some(rate) => {
                coll.market_value *= rate;
                coll.nominal_value *= rate;
                coll.currency = reporting.to_string();
            }
            None => errors.push(fx_missing_warning(&coll.collateral_reference, &coll.currency, reporting)),
        }
    }

    for g in &mut bundle.guarantees {
        match table.rate(&g.currency, reporting) {
            Some(rate) => {
                g.amount_covered = g.amount_covered.map(|a| a * rate);
                g.currency = reporting.to_string();
            }
            None => errors.push(fx_missing_warning(&g.guarantee_reference, &g.currency, reporting)),
        }
    }

    for p in &mut bundle.provisions {
        match table.rate(&p.currency, reporting) {
            Some(rate) => {
                p.amount *= rate;
                p.currency = reporting.to_string();
            }
            None => errors.push(fx_missing_warning(&p.provision_reference, &p.currency, reporting)),
        }
    }

    (bundle, audit, errors)
}

fn fx_missing_warning(reference: &str, from: &str, to: &str) -> CalculationError {
    CalculationError::new(
        "FX001",
        format!("no FX rate from {from} to {to}; amount retained in original currency"),
        ErrorSeverity::Warning,
        ErrorCategory::DataQuality,
    )
    .with_exposure(reference)
}
