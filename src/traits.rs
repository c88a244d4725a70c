//! Stage capability traits (§6): one small trait per pipeline boundary,
//! each with a single default implementation that delegates to its
//! module's free function. `run_pipeline` itself calls the free functions
//! directly; these exist so a test can substitute a stub at any boundary
//! without the pipeline depending on a concrete stage type.

use crate::aggregator::AggregatedResultBundle;
use crate::config::CalculationConfig;
use crate::data::RawDataBundle;
use crate::exposure::ExposureRecord;
use crate::fx::FxAudit;
use crate::types::CalculationError;

pub trait HierarchyResolver {
    fn resolve(
        &self,
        bundle: &RawDataBundle,
        audit: &FxAudit,
        config: &CalculationConfig,
    ) -> (Vec<ExposureRecord>, Vec<CalculationError>);
}

pub struct DefaultHierarchyResolver;

impl HierarchyResolver for DefaultHierarchyResolver {
    fn resolve(
        &self,
        bundle: &RawDataBundle,
        audit: &FxAudit,
        config: &CalculationConfig,
    ) -> (Vec<ExposureRecord>, Vec<CalculationError>) {
        crate::hierarchy::resolve(bundle, audit, config)
    }
}

pub trait Classifier {
    fn classify(
        &self,
        records: Vec<ExposureRecord>,
        config: &CalculationConfig,
    ) -> (Vec<ExposureRecord>, Vec<CalculationError>);
}

pub struct DefaultClassifier;

impl Classifier for DefaultClassifier {
    fn classify(
        &self,
        records: Vec<ExposureRecord>,
        config: &CalculationConfig,
    ) -> (Vec<ExposureRecord>, Vec<CalculationError>) {
        crate::classifier::classify(records, config)
    }
}

pub trait CrmProcessor {
    fn process(
        &self,
        records: Vec<ExposureRecord>,
        bundle: &RawDataBundle,
        config: &CalculationConfig,
    ) -> (Vec<ExposureRecord>, Vec<CalculationError>);
}

pub struct DefaultCrmProcessor;

impl CrmProcessor for DefaultCrmProcessor {
    fn process(
        &self,
        records: Vec<ExposureRecord>,
        bundle: &RawDataBundle,
        config: &CalculationConfig,
    ) -> (Vec<ExposureRecord>, Vec<CalculationError>) {
        crate::crm::process(records, bundle, config)
    }
}

pub trait SaCalculator {
    fn calculate(&self, records: Vec<ExposureRecord>, config: &CalculationConfig) -> Vec<ExposureRecord>;
}

pub struct DefaultSaCalculator;

impl SaCalculator for DefaultSaCalculator {
    fn calculate(&self, records: Vec<ExposureRecord>, config: &CalculationConfig) -> Vec<ExposureRecord> {
        crate::sa::calculate(records, config)
    }
}

pub trait IrbCalculator {
    fn calculate(
        &self,
        records: Vec<ExposureRecord>,
        config: &CalculationConfig,
    ) -> (Vec<ExposureRecord>, Vec<CalculationError>);
}

pub struct DefaultIrbCalculator;

impl IrbCalculator for DefaultIrbCalculator {
    fn calculate(
        &self,
        records: Vec<ExposureRecord>,
        config: &CalculationConfig,
    ) -> (Vec<ExposureRecord>, Vec<CalculationError>) {
        crate::irb::calculate(records, config)
    }
}

pub trait SlottingCalculator {
    fn calculate(&self, records: Vec<ExposureRecord>, config: &CalculationConfig) -> Vec<ExposureRecord>;
}

pub struct DefaultSlottingCalculator;

impl SlottingCalculator for DefaultSlottingCalculator {
    fn calculate(&self, records: Vec<ExposureRecord>, config: &CalculationConfig) -> Vec<ExposureRecord> {
        crate::slotting::calculate(records, config)
    }
}

pub trait OutputAggregator {
    fn aggregate(
        &self,
        records: Vec<ExposureRecord>,
        config: &CalculationConfig,
        errors: Vec<CalculationError>,
    ) -> AggregatedResultBundle;
}

pub struct DefaultOutputAggregator;

impl OutputAggregator for DefaultOutputAggregator {
    fn aggregate(
        &self,
        records: Vec<ExposureRecord>,
        config: &CalculationConfig,
        errors: Vec<CalculationError>,
    ) -> AggregatedResultBundle {
        crate::aggregator::aggregate(records, config, errors)
    }
}
