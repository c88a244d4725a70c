//! Orchestrates the full calculation pipeline (§3 Lifecycle): FX Converter
//! → Hierarchy Resolver → Classifier → CRM Processor → {SA, IRB, Slotting}
//! Calculators → Aggregator. Business conditions accumulate as
//! `CalculationError`s threaded through every stage; only structural
//! failures surface as `Err(CorpFinanceError)`.

use std::time::Instant;

use crate::aggregator::{self, AggregatedResultBundle};
use crate::classifier;
use crate::config::CalculationConfig;
use crate::crm;
use crate::data::RawDataBundle;
use crate::fx;
use crate::hierarchy;
use crate::irb;
use crate::sa;
use crate::slotting;
use crate::types::{with_metadata, ApproachType, ComputationOutput};
use crate::CorpFinanceResult;

/// Runs every stage in order and wraps the result in the standard
/// `ComputationOutput` envelope (§6).
pub fn run_pipeline(
    raw: RawDataBundle,
    config: &CalculationConfig,
) -> CorpFinanceResult<ComputationOutput<AggregatedResultBundle>> {
    let start = Instant::now();
    let mut all_errors = Vec::new();

    let (converted, audit, fx_errors) = fx::convert(raw, config);
    all_errors.extend(fx_errors);

    let (unified, hierarchy_errors) = hierarchy::resolve(&converted, &audit, config);
    all_errors.extend(hierarchy_errors);

    let (classified, classifier_errors) = classifier::classify(unified, config);
    all_errors.extend(classifier_errors);

    let (post_crm, crm_errors) = crm::process(classified, &converted, config);
    all_errors.extend(crm_errors);

    let (sa_rows, non_sa_rows): (Vec<_>, Vec<_>) = post_crm
        .into_iter()
        .partition(|r| r.approach == Some(ApproachType::Sa));
    let (irb_rows, slotting_rows): (Vec<_>, Vec<_>) = non_sa_rows
        .into_iter()
        .partition(|r| r.approach != Some(ApproachType::Slotting));

    let sa_out = sa::calculate(sa_rows, config);
    let (irb_out, irb_errors) = irb::calculate(irb_rows, config);
    all_errors.extend(irb_errors);
    let slotting_out = slotting::calculate(slotting_rows, config);

    let mut combined = sa_out;
    combined.extend(irb_out);
    combined.extend(slotting_out);

    let bundle = aggregator::aggregate(combined, config, all_errors);

    let elapsed_us = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "UK bank regulatory capital (RWA) calculation engine",
        &config.framework,
        bundle.errors.iter().map(|e| e.message.clone()).collect(),
        elapsed_us,
        bundle,
    ))
}
