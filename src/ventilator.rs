//! Ventilator parameters and pressure/flow waveform generators

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};

/// Ventilation mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    #[serde(rename = "PCV")]
    Pcv,
    #[serde(rename = "VCV")]
    Vcv,
    #[serde(rename = "ESPONTANEO")]
    Spontaneous,
}

/// Ventilator parameters and the airway waveform generators for PCV/VCV.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ventilator {
    pub mode: Mode,
    /// Positive end-expiratory pressure (cmH2O)
    pub peep: f64,
    /// Driving pressure above PEEP during inspiration, PCV only (cmH2O)
    pub p_driving: f64,
    /// Respiratory rate (breaths/min)
    pub fr: f64,
    /// Inspiratory time (s)
    pub ti: f64,
    /// Tidal volume, required for VCV (L)
    pub vt: Option<f64>,
    /// Inspired oxygen fraction
    pub fio2: f64,
    /// Duration of one respiratory cycle, 60/fr (s)
    pub t_total: f64,
    /// Inspiratory flow during VCV, Vt/Ti (L/s); None outside VCV
    pub flow_insp: Option<f64>,
}

impl Ventilator {
    pub fn new(
        mode: Mode,
        peep: f64,
        p_driving: f64,
        fr: f64,
        ti: f64,
        vt: Option<f64>,
        fio2: f64,
    ) -> Result<Self> {
        if peep < 0.0 {
            return Err(SimError::validation("PEEP must be >= 0"));
        }
        if p_driving < 0.0 {
            return Err(SimError::validation("P_driving must be >= 0"));
        }
        if !(fr > 0.0) {
            return Err(SimError::validation("fr must be > 0"));
        }
        if !(ti > 0.0) {
            return Err(SimError::validation("Ti must be > 0"));
        }
        if !(0.21..=1.0).contains(&fio2) {
            return Err(SimError::validation("FiO2 must be in [0.21, 1.0]"));
        }

        let flow_insp = match mode {
            Mode::Vcv => {
                let vt = vt.ok_or_else(|| SimError::validation("Vt is required for mode VCV"))?;
                if !(vt > 0.0) {
                    return Err(SimError::validation("Vt must be > 0 for mode VCV"));
                }
                Some(vt / ti)
            }
            Mode::Pcv | Mode::Spontaneous => None,
        };

        Ok(Self {
            mode,
            peep,
            p_driving,
            fr,
            ti,
            vt,
            fio2,
            t_total: 60.0 / fr,
            flow_insp,
        })
    }

    /// Returns a copy of this ventilator with a new respiratory rate.
    ///
    /// Used by the closed-loop spontaneous driver instead of mutating a
    /// shared `Ventilator` in place (see the design notes on avoiding a
    /// cross-request sharing hazard).
    pub fn with_fr(&self, fr: f64) -> Self {
        Self {
            fr,
            t_total: 60.0 / fr,
            ..*self
        }
    }

    /// True if `t` falls in the inspiratory phase of the current cycle.
    pub fn in_inspiration(&self, t: f64) -> bool {
        (t.rem_euclid(self.t_total)) < self.ti
    }

    /// Airway pressure waveform for PCV/VCV at time `t`.
    ///
    /// For PCV this is the full square wave. For VCV this only ever returns
    /// PEEP: the instantaneous VCV airway pressure is derived analytically
    /// inside the simulator's ODE right-hand side from the flow drive, not
    /// from this function.
    pub fn pressure(&self, t: f64) -> f64 {
        match self.mode {
            Mode::Pcv => {
                if self.in_inspiration(t) {
                    self.peep + self.p_driving
                } else {
                    self.peep
                }
            }
            Mode::Vcv => self.peep,
            Mode::Spontaneous => self.peep,
        }
    }

    /// Inspiratory flow waveform for VCV at time `t`; zero otherwise.
    pub fn flow(&self, t: f64) -> f64 {
        match (self.mode, self.flow_insp) {
            (Mode::Vcv, Some(flow_insp)) if self.in_inspiration(t) => flow_insp,
            _ => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pcv_requires_no_vt() {
        let v = Ventilator::new(Mode::Pcv, 5.0, 15.0, 15.0, 1.0, None, 0.21).unwrap();
        assert_eq!(v.pressure(0.0), 20.0);
        assert_eq!(v.pressure(2.0), 5.0);
    }

    #[test]
    fn vcv_requires_vt() {
        let err = Ventilator::new(Mode::Vcv, 5.0, 0.0, 15.0, 1.0, None, 0.21).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn vcv_derives_inspiratory_flow() {
        let v = Ventilator::new(Mode::Vcv, 5.0, 0.0, 15.0, 1.0, Some(0.5), 0.21).unwrap();
        assert!((v.flow_insp.unwrap() - 0.5).abs() < 1e-9);
        assert!((v.flow(0.5) - 0.5).abs() < 1e-9);
        assert_eq!(v.flow(1.5), 0.0);
        assert_eq!(v.pressure(0.5), 5.0);
    }

    #[test]
    fn with_fr_recomputes_cycle_duration() {
        let v = Ventilator::new(Mode::Spontaneous, 0.0, 0.0, 12.0, 1.0, None, 0.21).unwrap();
        let v2 = v.with_fr(20.0);
        assert!((v2.t_total - 3.0).abs() < 1e-9);
    }
}
