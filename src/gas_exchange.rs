//! Alveolar gas exchange: alveolar-gas equation, shunt equation and the
//! CaO2 -> PaO2 inversion

use crate::hemodynamics::{estimate_sao2, Hemodynamics};
use crate::numerics::trapz;
use crate::simulator::MechanicsResult;
use crate::ventilator::{Mode, Ventilator};

/// Fixed mixed-venous saturation used for the shunt equation's venous term.
const SV_O2: f64 = 0.75;
/// Fixed mixed-venous PO2 (mmHg) used for the shunt equation's venous term.
const PV_O2: f64 = 40.0;

/// PaO2 inversion scan range (mmHg), preserved from the source at 1-mmHg
/// granularity.
const PAO2_SCAN_MIN: i32 = 20;
const PAO2_SCAN_MAX: i32 = 149;

/// Alveolar gas-exchange parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GasExchange {
    /// Anatomic dead space (L)
    pub v_d: f64,
    /// CO2 production (mL/min), fixed at 200
    pub vco2: f64,
    /// Respiratory quotient, fixed at 0.8
    pub r: f64,
    pub fio2: f64,
    /// Barometric pressure (mmHg), fixed at 560 (Bogota altitude)
    pub pb: f64,
    /// Water vapor pressure at 37C (mmHg)
    pub ph2o: f64,
    /// Alveolar gas equation unit-conversion constant
    pub k: f64,
    /// Pulmonary shunt fraction
    pub qs_qt: f64,
}

/// Scalar gas-exchange outcomes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GasResult {
    pub ve_min: f64,
    pub va_min: f64,
    pub paco2_mmhg: f64,
    pub pao2_mmhg: f64,
    pub pao2_arterial_mmhg: f64,
}

impl GasExchange {
    pub fn new(v_d: f64, fio2: f64, qs_qt: f64) -> Self {
        Self {
            v_d,
            vco2: 200.0,
            r: 0.8,
            fio2,
            pb: 560.0,
            ph2o: 47.0,
            k: 0.863,
            qs_qt,
        }
    }

    pub fn calculate(
        &self,
        mechanics: &MechanicsResult,
        ventilator: &Ventilator,
        hemo: &Hemodynamics,
    ) -> GasResult {
        let vt = self.estimate_tidal_volume(mechanics, ventilator);
        let fr = ventilator.fr;
        let ve = vt * fr;
        let va = (vt - self.v_d) * fr;

        if va <= 0.0 {
            log::debug!(
                "alveolar ventilation {va:.3} L/min <= 0 (V_D={}, VT={vt:.3}); returning fallback metrics",
                self.v_d
            );
            return GasResult {
                ve_min: ve,
                va_min: va,
                paco2_mmhg: 100.0,
                pao2_mmhg: 40.0,
                pao2_arterial_mmhg: 35.0,
            };
        }

        let paco2 = self.vco2 * self.k / va;
        let pio2 = self.fio2 * (self.pb - self.ph2o);
        let pao2 = pio2 - paco2 / self.r;

        let cc_o2 = hemo.o2_content(pao2, estimate_sao2(pao2));
        let cv_o2 = hemo.o2_content(PV_O2, SV_O2);
        let ca_o2 = cc_o2 * (1.0 - self.qs_qt) + cv_o2 * self.qs_qt;

        let pao2_arterial = self
            .invert_ca_o2(ca_o2, hemo)
            .unwrap_or(pao2 * (1.0 - self.qs_qt));

        GasResult {
            ve_min: ve,
            va_min: va,
            paco2_mmhg: paco2,
            pao2_mmhg: pao2,
            pao2_arterial_mmhg: pao2_arterial,
        }
    }

    /// Tidal volume estimate. In VCV this is just the ventilator's set Vt;
    /// otherwise it is the average inspired volume over the observed
    /// window (total inspiratory flow integrated, divided by the number of
    /// breaths the window spans).
    fn estimate_tidal_volume(&self, mechanics: &MechanicsResult, ventilator: &Ventilator) -> f64 {
        if ventilator.mode == Mode::Vcv {
            return ventilator.vt.unwrap_or(0.0);
        }

        let inspiratory_flow: Vec<f64> = mechanics.flow.iter().map(|&f| f.max(0.0)).collect();
        let inspired_volume_total = trapz(&inspiratory_flow, &mechanics.t);

        let duration = mechanics.t.last().copied().unwrap_or(0.0) - mechanics.t.first().copied().unwrap_or(0.0);
        let num_breaths = duration * (ventilator.fr / 60.0);

        if num_breaths > 0.0 {
            inspired_volume_total / num_breaths
        } else {
            0.0
        }
    }

    /// Invert the shunt equation by a 1-mmHg linear scan over [20, 149],
    /// returning the smallest PO2 whose predicted content is at least
    /// `target`.
    fn invert_ca_o2(&self, target: f64, hemo: &Hemodynamics) -> Option<f64> {
        for po2_int in PAO2_SCAN_MIN..=PAO2_SCAN_MAX {
            let po2 = po2_int as f64;
            let content = hemo.o2_content(po2, estimate_sao2(po2));
            if content >= target {
                return Some(po2);
            }
        }
        None
    }
}
