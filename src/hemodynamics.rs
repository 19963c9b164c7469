//! Heart-lung interaction: mean airway pressure, cardiac output and oxygen delivery

use crate::gas_exchange::GasResult;
use crate::numerics::trapz;
use crate::simulator::MechanicsResult;
use crate::ventilator::Ventilator;

/// Piecewise-linear SaO2 estimate from PaO2.
///
/// Educational simplification: this is not the hemoglobin dissociation
/// curve (Hill equation), just a linear approximation that must be
/// preserved as-is.
pub fn estimate_sao2(po2: f64) -> f64 {
    if po2 >= 100.0 {
        1.0
    } else if po2 >= 60.0 {
        0.90 + 0.10 * ((po2 - 60.0) / 40.0)
    } else {
        0.90 * (po2 / 60.0)
    }
}

/// Models the effect of airway pressure on cardiac output and derives
/// arterial oxygen content and delivery.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hemodynamics {
    pub gc_base_l_min: f64,
    pub k_sensibilidad: f64,
    pub hb_g_dl: f64,
    pub o2_cap_hb: f64,
    pub o2_sol_plasma: f64,
}

impl Hemodynamics {
    pub fn new(k_sensibilidad: f64) -> Self {
        Self {
            gc_base_l_min: 5.0,
            k_sensibilidad,
            hb_g_dl: 15.0,
            o2_cap_hb: 1.34,
            o2_sol_plasma: 0.003,
        }
    }

    /// Hb-bound plus dissolved O2 content (mL/dL) at a given PO2/SaO2 pair.
    pub fn o2_content(&self, po2: f64, sao2: f64) -> f64 {
        self.hb_g_dl * sao2 * self.o2_cap_hb + po2 * self.o2_sol_plasma
    }

    pub fn compute(
        &self,
        mechanics: &MechanicsResult,
        gases: &GasResult,
        ventilator: &Ventilator,
        auto_peep_cmh2o: f64,
    ) -> HemodynamicsResult {
        let t = &mechanics.t;
        let p_aw = &mechanics.p_aw;

        // "Last cycle duration" is deliberately t[-1] - t[-3], not 60/fr;
        // this odd indexing is preserved from the source.
        let n = t.len();
        let cycle_duration = if n > 2 {
            t[n - 1] - t[n - 3]
        } else if n > 1 {
            t[n - 1] - t[0]
        } else {
            t.last().copied().unwrap_or(0.0)
        };

        let t_start = t.last().copied().unwrap_or(0.0) - cycle_duration;
        let indices: Vec<usize> = (0..n).filter(|&i| t[i] >= t_start).collect();
        let t_last_cycle: Vec<f64> = indices.iter().map(|&i| t[i]).collect();
        let p_aw_last_cycle: Vec<f64> = indices.iter().map(|&i| p_aw[i]).collect();

        let area = trapz(&p_aw_last_cycle, &t_last_cycle);
        let span = t_last_cycle.last().copied().unwrap_or(0.0) - t_last_cycle.first().copied().unwrap_or(0.0);
        let p_mean = if span != 0.0 { area / span } else { p_aw.last().copied().unwrap_or(0.0) };

        let peep_total = ventilator.peep + auto_peep_cmh2o;
        let delta_p = (p_mean - ventilator.peep) + auto_peep_cmh2o;
        let gc_actual = (self.gc_base_l_min - self.k_sensibilidad * delta_p).max(0.0);

        // Fixed alveolar-arterial O2 gradient of 10 mmHg, overriding the
        // shunt-equation PaO2 from gas exchange for this block.
        let pao2 = gases.pao2_mmhg - 10.0;
        let sao2 = estimate_sao2(pao2);
        let ca_o2 = self.o2_content(pao2, sao2);
        let do2 = gc_actual * ca_o2 * 10.0;

        HemodynamicsResult {
            p_mean_cmh2o: p_mean,
            auto_peep_cmh2o,
            peep_total_cmh2o: peep_total,
            gc_actual_l_min: gc_actual,
            pao2_mmhg: pao2,
            sao2_percent: sao2 * 100.0,
            cao2_ml_dl: ca_o2,
            do2_ml_min: do2,
        }
    }
}

/// Cardiovascular outcomes of a simulated breath.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HemodynamicsResult {
    pub p_mean_cmh2o: f64,
    pub auto_peep_cmh2o: f64,
    pub peep_total_cmh2o: f64,
    pub gc_actual_l_min: f64,
    pub pao2_mmhg: f64,
    pub sao2_percent: f64,
    pub cao2_ml_dl: f64,
    pub do2_ml_min: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sao2_is_one_at_high_po2() {
        assert_eq!(estimate_sao2(150.0), 1.0);
    }

    #[test]
    fn sao2_interpolates_in_midrange() {
        let s = estimate_sao2(80.0);
        assert!((s - 0.95).abs() < 1e-9);
    }

    #[test]
    fn sao2_scales_linearly_below_60() {
        let s = estimate_sao2(30.0);
        assert!((s - 0.45).abs() < 1e-9);
    }

    #[test]
    fn higher_k_reduces_cardiac_output() {
        let mechanics = MechanicsResult {
            t: vec![0.0, 1.0, 2.0, 3.0],
            v1: vec![0.0; 4],
            v2: vec![0.0; 4],
            vt: vec![0.0; 4],
            flow1: vec![0.0; 4],
            flow2: vec![0.0; 4],
            flow: vec![0.0; 4],
            p_aw: vec![10.0, 12.0, 10.0, 12.0],
            auto_peep: 0.0,
            mode: crate::ventilator::Mode::Pcv,
        };
        let gases = GasResult {
            ve_min: 7.0,
            va_min: 5.0,
            paco2_mmhg: 40.0,
            pao2_mmhg: 100.0,
            pao2_arterial_mmhg: 90.0,
        };
        let ventilator =
            Ventilator::new(crate::ventilator::Mode::Pcv, 5.0, 15.0, 15.0, 1.0, None, 0.21).unwrap();

        let low_k = Hemodynamics::new(0.1).compute(&mechanics, &gases, &ventilator, 0.0);
        let high_k = Hemodynamics::new(0.5).compute(&mechanics, &gases, &ventilator, 0.0);
        assert!(high_k.gc_actual_l_min <= low_k.gc_actual_l_min);
    }

    #[test]
    fn cardiac_output_never_negative() {
        let mechanics = MechanicsResult {
            t: vec![0.0, 1.0, 2.0],
            v1: vec![0.0; 3],
            v2: vec![0.0; 3],
            vt: vec![0.0; 3],
            flow1: vec![0.0; 3],
            flow2: vec![0.0; 3],
            flow: vec![0.0; 3],
            p_aw: vec![40.0, 40.0, 40.0],
            auto_peep: 20.0,
            mode: crate::ventilator::Mode::Pcv,
        };
        let gases = GasResult {
            ve_min: 7.0,
            va_min: 5.0,
            paco2_mmhg: 40.0,
            pao2_mmhg: 100.0,
            pao2_arterial_mmhg: 90.0,
        };
        let ventilator =
            Ventilator::new(crate::ventilator::Mode::Pcv, 5.0, 15.0, 15.0, 1.0, None, 0.21).unwrap();
        let result = Hemodynamics::new(5.0).compute(&mechanics, &gases, &ventilator, 20.0);
        assert_eq!(result.gc_actual_l_min, 0.0);
    }
}
