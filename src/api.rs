//! JSON request/response contract and request-boundary validation
//!
//! Field names mirror the wire contract exactly (including the Spanish
//! names carried over from the original deployment) so this module can be
//! dropped behind any HTTP framework without a translation layer.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};
use crate::gas_exchange::GasResult;
use crate::hemodynamics::HemodynamicsResult;
use crate::patient::Patient;
use crate::simulator::MechanicsResult;
use crate::ventilator::{Mode, Ventilator};

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct PatientParams {
    #[serde(rename = "R1")]
    pub r1: f64,
    #[serde(rename = "C1")]
    pub c1: f64,
    #[serde(rename = "R2")]
    pub r2: f64,
    #[serde(rename = "C2")]
    pub c2: f64,
}

impl PatientParams {
    pub fn into_domain(self) -> Result<Patient> {
        Patient::new(self.r1, self.c1, self.r2, self.c2)
    }
}

fn default_fio2() -> f64 {
    0.21
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct VentilatorParams {
    pub modo: Mode,
    #[serde(rename = "PEEP")]
    pub peep: f64,
    #[serde(rename = "P_driving")]
    pub p_driving: f64,
    pub fr: f64,
    #[serde(rename = "Ti")]
    pub ti: f64,
    #[serde(rename = "Vt")]
    pub vt: Option<f64>,
    #[serde(rename = "FiO2", default = "default_fio2")]
    pub fio2: f64,
}

impl VentilatorParams {
    pub fn into_domain(self) -> Result<Ventilator> {
        Ventilator::new(self.modo, self.peep, self.p_driving, self.fr, self.ti, self.vt, self.fio2)
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct PhysiologyParams {
    pub k_sensibilidad: f64,
    #[serde(rename = "Gp_control")]
    pub gp_control: f64,
    #[serde(rename = "Gi_control")]
    pub gi_control: f64,
    #[serde(rename = "Qs_Qt")]
    pub qs_qt: f64,
    #[serde(rename = "V_D")]
    pub v_d: f64,
}

impl PhysiologyParams {
    pub fn validate(&self) -> Result<()> {
        if self.k_sensibilidad < 0.0 {
            return Err(SimError::validation("k_sensibilidad must be >= 0"));
        }
        if self.gp_control < 0.0 {
            return Err(SimError::validation("Gp_control must be >= 0"));
        }
        if self.gi_control < 0.0 {
            return Err(SimError::validation("Gi_control must be >= 0"));
        }
        if !(0.0..=1.0).contains(&self.qs_qt) {
            return Err(SimError::validation("Qs_Qt must be in [0, 1]"));
        }
        if self.v_d < 0.0 {
            return Err(SimError::validation("V_D must be >= 0"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SimulationRequest {
    pub paciente: PatientParams,
    pub ventilador: VentilatorParams,
    pub fisiologia: PhysiologyParams,
}

#[derive(Debug, Clone, Serialize)]
pub struct TimeSeries {
    pub tiempo: Vec<f64>,
    pub presion_via_aerea: Vec<f64>,
    pub flujo_total: Vec<f64>,
    pub volumen_total: Vec<f64>,
}

impl From<&MechanicsResult> for TimeSeries {
    fn from(m: &MechanicsResult) -> Self {
        Self {
            tiempo: m.t.clone(),
            presion_via_aerea: m.p_aw.clone(),
            flujo_total: m.flow.clone(),
            volumen_total: m.vt.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct MechanicsMetrics {
    pub volumen_tidal_entregado: f64,
    pub presion_pico: Option<f64>,
}

/// Window length used to derive the delivered tidal volume, matching the
/// last-respiratory-cycle sampling density of a fixed-schedule run.
const TIDAL_VOLUME_WINDOW: usize = 200;

impl MechanicsMetrics {
    pub fn from_mechanics(m: &MechanicsResult) -> Self {
        let window = if m.vt.len() >= TIDAL_VOLUME_WINDOW {
            &m.vt[m.vt.len() - TIDAL_VOLUME_WINDOW..]
        } else {
            &[][..]
        };
        let volumen_tidal_entregado = if window.is_empty() {
            0.0
        } else {
            let max = window.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            let min = window.iter().cloned().fold(f64::INFINITY, f64::min);
            max - min
        };

        let presion_pico = match m.mode {
            Mode::Spontaneous => None,
            Mode::Pcv | Mode::Vcv => {
                Some(m.p_aw.iter().cloned().fold(f64::NEG_INFINITY, f64::max))
            }
        };

        Self {
            volumen_tidal_entregado,
            presion_pico,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct GasMetrics {
    #[serde(rename = "VE_min")]
    pub ve_min: f64,
    #[serde(rename = "VA_min")]
    pub va_min: f64,
    #[serde(rename = "PACO2_mmHg")]
    pub paco2_mmhg: f64,
    #[serde(rename = "PAO2_mmHg")]
    pub pao2_mmhg: f64,
    #[serde(rename = "PaO2_mmHg")]
    pub pao2_arterial_mmhg: f64,
}

impl From<&GasResult> for GasMetrics {
    fn from(g: &GasResult) -> Self {
        Self {
            ve_min: g.ve_min,
            va_min: g.va_min,
            paco2_mmhg: g.paco2_mmhg,
            pao2_mmhg: g.pao2_mmhg,
            pao2_arterial_mmhg: g.pao2_arterial_mmhg,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct HemodynamicsMetrics {
    #[serde(rename = "P_mean_cmH2O")]
    pub p_mean_cmh2o: f64,
    #[serde(rename = "auto_peep_cmH2O")]
    pub auto_peep_cmh2o: f64,
    #[serde(rename = "PEEP_total_cmH2O")]
    pub peep_total_cmh2o: f64,
    #[serde(rename = "GC_actual_L_min")]
    pub gc_actual_l_min: f64,
    #[serde(rename = "PaO2_mmHg")]
    pub pao2_mmhg: f64,
    #[serde(rename = "SaO2_percent")]
    pub sao2_percent: f64,
    #[serde(rename = "CAO2_ml_dl")]
    pub cao2_ml_dl: f64,
    #[serde(rename = "DO2_ml_min")]
    pub do2_ml_min: f64,
}

impl From<&HemodynamicsResult> for HemodynamicsMetrics {
    fn from(h: &HemodynamicsResult) -> Self {
        Self {
            p_mean_cmh2o: h.p_mean_cmh2o,
            auto_peep_cmh2o: h.auto_peep_cmh2o,
            peep_total_cmh2o: h.peep_total_cmh2o,
            gc_actual_l_min: h.gc_actual_l_min,
            pao2_mmhg: h.pao2_mmhg,
            sao2_percent: h.sao2_percent,
            cao2_ml_dl: h.cao2_ml_dl,
            do2_ml_min: h.do2_ml_min,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SimulationResponse {
    pub series_tiempo: TimeSeries,
    pub metricas_mecanicas: MechanicsMetrics,
    pub metricas_gases: GasMetrics,
    pub metricas_hemodinamicas: HemodynamicsMetrics,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ventilator_params_default_fio2_is_room_air() {
        let json = r#"{"modo":"PCV","PEEP":5.0,"P_driving":15.0,"fr":15.0,"Ti":1.0}"#;
        let params: VentilatorParams = serde_json::from_str(json).unwrap();
        assert_eq!(params.fio2, 0.21);
        assert!(params.vt.is_none());
    }

    #[test]
    fn physiology_params_rejects_out_of_range_shunt() {
        let params = PhysiologyParams {
            k_sensibilidad: 0.1,
            gp_control: 0.3,
            gi_control: 0.01,
            qs_qt: 1.5,
            v_d: 0.15,
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn mechanics_metrics_null_peak_pressure_in_spontaneous_mode() {
        let m = MechanicsResult {
            t: vec![0.0, 1.0],
            v1: vec![0.0, 0.0],
            v2: vec![0.0, 0.0],
            vt: vec![0.0, 0.0],
            flow1: vec![0.0, 0.0],
            flow2: vec![0.0, 0.0],
            flow: vec![0.0, 0.0],
            p_aw: vec![0.0, 0.0],
            auto_peep: 0.0,
            mode: Mode::Spontaneous,
        };
        assert!(MechanicsMetrics::from_mechanics(&m).presion_pico.is_none());
    }
}
