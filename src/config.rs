//! Calculation configuration (§4.2). The CRR/Basel 3.1 choice is data, not
//! control flow: every framework-dependent rule is expressed as a value
//! here, and no downstream stage switches on framework by name.

use std::collections::{HashMap, HashSet};

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::types::{ApproachType, ExposureClass, RegulatoryFramework, ReportingDate};

/// PD floors, differentiated by class under Basel 3.1; CRR applies one flat
/// floor to every class.
#[derive(Debug, Clone)]
pub struct PdFloors {
    pub corporate: Decimal,
    pub retail_non_qrre: Decimal,
    pub qrre_transactor: Decimal,
    pub qrre_revolver: Decimal,
}

impl PdFloors {
    pub fn crr_flat() -> Self {
        let flat = dec!(0.0003);
        Self {
            corporate: flat,
            retail_non_qrre: flat,
            qrre_transactor: flat,
            qrre_revolver: flat,
        }
    }

    pub fn basel_3_1() -> Self {
        Self {
            corporate: dec!(0.0005),
            retail_non_qrre: dec!(0.0005),
            qrre_transactor: dec!(0.0003),
            qrre_revolver: dec!(0.0010),
        }
    }

    pub fn floor_for(&self, class: ExposureClass) -> Decimal {
        match class {
            ExposureClass::RetailQrre => self.qrre_revolver,
            ExposureClass::RetailMortgage | ExposureClass::RetailOther => self.retail_non_qrre,
            _ => self.corporate,
        }
    }
}

/// A-IRB LGD floors by collateral type. Only meaningful under Basel 3.1
/// (CRR applies none).
#[derive(Debug, Clone)]
pub struct LgdFloors {
    pub enabled: bool,
    pub unsecured: Decimal,
    pub financial: Decimal,
    pub receivables: Decimal,
    pub real_estate: Decimal,
    pub other_physical: Decimal,
}

impl LgdFloors {
    pub fn crr_none() -> Self {
        Self {
            enabled: false,
            unsecured: Decimal::ZERO,
            financial: Decimal::ZERO,
            receivables: Decimal::ZERO,
            real_estate: Decimal::ZERO,
            other_physical: Decimal::ZERO,
        }
    }

    pub fn basel_3_1() -> Self {
        Self {
            enabled: true,
            unsecured: dec!(0.25),
            financial: dec!(0.00),
            receivables: dec!(0.10),
            real_estate: dec!(0.10),
            other_physical: dec!(0.15),
        }
    }

    pub fn floor_for(&self, collateral: Option<crate::types::CollateralType>) -> Decimal {
        use crate::types::CollateralType as C;
        if !self.enabled {
            return Decimal::ZERO;
        }
        match collateral {
            None => self.unsecured,
            Some(c) if c.is_financial() => self.financial,
            Some(C::Receivables) => self.receivables,
            Some(C::RealEstate) => self.real_estate,
            Some(C::OtherPhysical) => self.other_physical,
            Some(_) => self.unsecured,
        }
    }
}

/// CRR Art. 501 SME / Art. 501a infrastructure supporting factors.
#[derive(Debug, Clone)]
pub struct SupportingFactors {
    pub enabled: bool,
    pub sme_exposure_threshold_eur: Decimal,
    pub sme_factor_under_threshold: Decimal,
    pub sme_factor_above_threshold: Decimal,
    pub sme_turnover_threshold_eur: Decimal,
    pub infrastructure_factor: Decimal,
}

impl SupportingFactors {
    pub fn crr() -> Self {
        Self {
            enabled: true,
            sme_exposure_threshold_eur: dec!(2_500_000),
            sme_factor_under_threshold: dec!(0.7619),
            sme_factor_above_threshold: dec!(0.85),
            sme_turnover_threshold_eur: dec!(50_000_000),
            infrastructure_factor: dec!(0.75),
        }
    }

    pub fn basel_3_1_disabled() -> Self {
        Self {
            enabled: false,
            sme_exposure_threshold_eur: dec!(2_500_000),
            sme_factor_under_threshold: Decimal::ONE,
            sme_factor_above_threshold: Decimal::ONE,
            sme_turnover_threshold_eur: dec!(50_000_000),
            infrastructure_factor: Decimal::ONE,
        }
    }
}

/// A single transitional output-floor step, effective from `effective_from`.
#[derive(Debug, Clone)]
pub struct OutputFloorStep {
    pub effective_from: ReportingDate,
    pub floor_pct: Decimal,
}

/// Basel 3.1 output floor (72.5% fully phased-in), with the 2027–2032
/// transitional schedule. CRR carries no output floor at all.
#[derive(Debug, Clone)]
pub struct OutputFloorConfig {
    pub enabled: bool,
    pub schedule: Vec<OutputFloorStep>,
}

impl OutputFloorConfig {
    pub fn crr_disabled() -> Self {
        Self {
            enabled: false,
            schedule: Vec::new(),
        }
    }

    pub fn basel_3_1() -> Self {
        use chrono::NaiveDate;
        let step = |y: i32, pct: Decimal| OutputFloorStep {
            effective_from: NaiveDate::from_ymd_opt(y, 1, 1).expect("valid date"),
            floor_pct: pct,
        };
        Self {
            enabled: true,
            schedule: vec![
                step(2027, dec!(0.50)),
                step(2028, dec!(0.55)),
                step(2029, dec!(0.60)),
                step(2030, dec!(0.65)),
                step(2031, dec!(0.70)),
                step(2032, dec!(0.725)),
            ],
        }
    }

    /// The floor percentage applicable on `reporting_date`: the latest
    /// schedule step whose `effective_from` is on or before that date, or
    /// zero if the date precedes the first step or the floor is disabled.
    pub fn floor_pct_on(&self, reporting_date: ReportingDate) -> Decimal {
        if !self.enabled {
            return Decimal::ZERO;
        }
        self.schedule
            .iter()
            .filter(|s| s.effective_from <= reporting_date)
            .map(|s| s.floor_pct)
            .last()
            .unwrap_or(Decimal::ZERO)
    }
}

/// Retail classification thresholds (Art. 123 total-exposure test, and the
/// QRRE per-obligor limit).
#[derive(Debug, Clone)]
pub struct RetailThresholds {
    pub total_exposure_threshold: Decimal,
    pub qrre_max_limit: Decimal,
}

impl RetailThresholds {
    pub fn crr() -> Self {
        Self {
            total_exposure_threshold: dec!(880_000),
            qrre_max_limit: dec!(88_000),
        }
    }

    pub fn basel_3_1() -> Self {
        Self {
            total_exposure_threshold: dec!(880_000),
            qrre_max_limit: dec!(100_000),
        }
    }
}

/// Explicit mapping from exposure class to the set of permitted approaches.
#[derive(Debug, Clone)]
pub struct IrbPermissions {
    pub permissions: HashMap<ExposureClass, HashSet<ApproachType>>,
    /// Whether CRR Art.147(5) corporate-to-retail reclassification is enabled
    /// (only true for the hybrid preset).
    pub hybrid_reclassification: bool,
}

impl IrbPermissions {
    fn with(pairs: &[(ExposureClass, &[ApproachType])]) -> HashMap<ExposureClass, HashSet<ApproachType>> {
        pairs
            .iter()
            .map(|(class, approaches)| (*class, approaches.iter().copied().collect()))
            .collect()
    }

    pub fn sa_only() -> Self {
        use ApproachType::Sa;
        Self {
            permissions: Self::with(&[
                (ExposureClass::Sovereign, &[Sa]),
                (ExposureClass::Institution, &[Sa]),
                (ExposureClass::Corporate, &[Sa]),
                (ExposureClass::CorporateSme, &[Sa]),
                (ExposureClass::RetailMortgage, &[Sa]),
                (ExposureClass::RetailQrre, &[Sa]),
                (ExposureClass::RetailOther, &[Sa]),
            ]),
            hybrid_reclassification: false,
        }
    }

    pub fn full_irb() -> Self {
        use ApproachType::{Airb, Slotting};
        Self {
            permissions: Self::with(&[
                (ExposureClass::Sovereign, &[Airb]),
                (ExposureClass::Institution, &[Airb]),
                (ExposureClass::Corporate, &[Airb]),
                (ExposureClass::CorporateSme, &[Airb]),
                (ExposureClass::RetailMortgage, &[Airb]),
                (ExposureClass::RetailQrre, &[Airb]),
                (ExposureClass::RetailOther, &[Airb]),
                (ExposureClass::SpecialisedLending, &[Airb, Slotting]),
            ]),
            hybrid_reclassification: false,
        }
    }

    pub fn firb_only() -> Self {
        use ApproachType::{Firb, Slotting};
        Self {
            permissions: Self::with(&[
                (ExposureClass::Sovereign, &[Firb]),
                (ExposureClass::Institution, &[Firb]),
                (ExposureClass::Corporate, &[Firb]),
                (ExposureClass::CorporateSme, &[Firb]),
                (ExposureClass::SpecialisedLending, &[Slotting]),
            ]),
            hybrid_reclassification: false,
        }
    }

    pub fn airb_only() -> Self {
        use ApproachType::Airb;
        Self {
            permissions: Self::with(&[
                (ExposureClass::RetailMortgage, &[Airb]),
                (ExposureClass::RetailQrre, &[Airb]),
                (ExposureClass::RetailOther, &[Airb]),
            ]),
            hybrid_reclassification: false,
        }
    }

    /// Retail A-IRB + corporate F-IRB, with Art.147(5) reclassification of
    /// qualifying corporates into retail enabled.
    pub fn hybrid_retail_airb_corporate_firb() -> Self {
        use ApproachType::{Airb, Firb, Slotting};
        Self {
            permissions: Self::with(&[
                (ExposureClass::Corporate, &[Firb]),
                (ExposureClass::CorporateSme, &[Firb]),
                (ExposureClass::RetailMortgage, &[Airb]),
                (ExposureClass::RetailQrre, &[Airb]),
                (ExposureClass::RetailOther, &[Airb]),
                (ExposureClass::SpecialisedLending, &[Slotting]),
            ]),
            hybrid_reclassification: true,
        }
    }

    pub fn permits(&self, class: ExposureClass, approach: ApproachType) -> bool {
        self.permissions
            .get(&class)
            .map(|set| set.contains(&approach))
            .unwrap_or(false)
    }
}

/// Execution strategy knob (§5/§6). Only the in-memory strategy is
/// implemented in this crate (see DESIGN.md).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectMode {
    InMemory,
    Streaming,
}

/// The immutable configuration threaded through every pipeline stage.
#[derive(Debug, Clone)]
pub struct CalculationConfig {
    pub framework: RegulatoryFramework,
    pub reporting_date: ReportingDate,
    pub base_currency: String,
    pub apply_fx_conversion: bool,
    pub pd_floors: PdFloors,
    pub lgd_floors: LgdFloors,
    pub supporting_factors: SupportingFactors,
    pub output_floor: OutputFloorConfig,
    pub retail_thresholds: RetailThresholds,
    pub irb_permissions: IrbPermissions,
    /// CRR Art.501/Basel CRE32 scaling factor applied to non-retail IRB K.
    pub scaling_factor: Decimal,
    pub eur_gbp_rate: Decimal,
    pub collect_mode: CollectMode,
    pub max_hierarchy_depth: u32,
}

impl CalculationConfig {
    pub fn crr(base_currency: impl Into<String>, eur_gbp_rate: Decimal, reporting_date: ReportingDate) -> Self {
        Self {
            framework: RegulatoryFramework::Crr,
            reporting_date,
            base_currency: base_currency.into(),
            apply_fx_conversion: true,
            pd_floors: PdFloors::crr_flat(),
            lgd_floors: LgdFloors::crr_none(),
            supporting_factors: SupportingFactors::crr(),
            output_floor: OutputFloorConfig::crr_disabled(),
            retail_thresholds: RetailThresholds::crr(),
            irb_permissions: IrbPermissions::full_irb(),
            scaling_factor: dec!(1.06),
            eur_gbp_rate,
            collect_mode: CollectMode::InMemory,
            max_hierarchy_depth: 10,
        }
    }

    pub fn basel_3_1(
        base_currency: impl Into<String>,
        eur_gbp_rate: Decimal,
        reporting_date: ReportingDate,
    ) -> Self {
        Self {
            framework: RegulatoryFramework::Basel3_1,
            reporting_date,
            base_currency: base_currency.into(),
            apply_fx_conversion: true,
            pd_floors: PdFloors::basel_3_1(),
            lgd_floors: LgdFloors::basel_3_1(),
            supporting_factors: SupportingFactors::basel_3_1_disabled(),
            output_floor: OutputFloorConfig::basel_3_1(),
            retail_thresholds: RetailThresholds::basel_3_1(),
            irb_permissions: IrbPermissions::full_irb(),
            scaling_factor: dec!(1.06),
            eur_gbp_rate,
            collect_mode: CollectMode::InMemory,
            max_hierarchy_depth: 10,
        }
    }

    pub fn with_irb_permissions(mut self, permissions: IrbPermissions) -> Self {
        self.irb_permissions = permissions;
        self
    }

    /// `reporting_currency`, matching §6's "reporting currency" vocabulary.
    pub fn reporting_currency(&self) -> &str {
        &self.base_currency
    }
}
