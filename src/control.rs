//! Proportional-integral respiratory controller for spontaneous breathing

use crate::error::{Result, SimError};

const AMPLITUDE_MAX: f64 = 25.0;
const INTEGRAL_CLAMP: f64 = 50.0;
const FREQUENCY_MIN_HZ: f64 = 0.1;

/// PI controller producing the muscular pressure (P_mus) waveform for the
/// closed-loop spontaneous breathing mode.
///
/// Adjusts the amplitude and frequency of P_mus from the error between the
/// current PaCO2 (approximated as PACO2) and a target value:
///
/// ```text
/// A = Gp * error + Gi * integral(error)
/// f = f_base + Gf * error
/// ```
#[derive(Debug, Clone)]
pub struct RespiratoryController {
    paco2_target: f64,
    f_base: f64,
    gp: f64,
    gi: f64,
    /// Frequency gain, stored in Hz/mmHg (the configured per-minute gain / 60)
    gf: f64,
    integral_error: f64,
    amplitude: Option<f64>,
    frequency: Option<f64>,
}

impl RespiratoryController {
    /// `gf_per_min` is accepted in the source's native unit, breaths/min per
    /// mmHg, and converted to Hz/mmHg for internal storage.
    pub fn new(paco2_target: f64, f_base: f64, gp: f64, gi: f64, gf_per_min: f64) -> Self {
        Self {
            paco2_target,
            f_base,
            gp,
            gi,
            gf: gf_per_min / 60.0,
            integral_error: 0.0,
            amplitude: None,
            frequency: None,
        }
    }

    pub fn with_defaults(gp: f64, gi: f64) -> Self {
        Self::new(40.0, 12.0, gp, gi, 0.1)
    }

    /// Update amplitude and frequency from the current PaCO2, returning
    /// `(amplitude_cmH2O, frequency_hz)`.
    pub fn update(&mut self, paco2: f64, dt: f64) -> (f64, f64) {
        let error = paco2 - self.paco2_target;

        self.integral_error += error * dt;
        self.integral_error = self.integral_error.clamp(-INTEGRAL_CLAMP, INTEGRAL_CLAMP);

        let amplitude_raw = self.gp * error + self.gi * self.integral_error;
        let amplitude = amplitude_raw.clamp(0.0, AMPLITUDE_MAX);
        let frequency = (self.f_base / 60.0 + self.gf * error).max(FREQUENCY_MIN_HZ);

        self.amplitude = Some(amplitude);
        self.frequency = Some(frequency);
        (amplitude, frequency)
    }

    /// Generate the P_mus(t) samples: a half-wave rectified negative
    /// sinusoid, negative during inspiration and exactly zero during passive
    /// exhalation. Fails if called before [`Self::update`].
    pub fn generate_pmus(&self, t: &[f64]) -> Result<Vec<f64>> {
        let (amplitude, frequency) = match (self.amplitude, self.frequency) {
            (Some(a), Some(f)) => (a, f),
            _ => {
                return Err(SimError::computation(
                    "generate_pmus called before update",
                ));
            }
        };

        Ok(t.iter().map(|&ti| pmus_at(amplitude, frequency, ti)).collect())
    }
}

/// The P_mus(t) formula for a known amplitude/frequency pair, factored out
/// so the simulator's hot integration loop can evaluate it directly without
/// going through the fallible [`RespiratoryController::generate_pmus`] path.
pub(crate) fn pmus_at(amplitude: f64, frequency_hz: f64, t: f64) -> f64 {
    let omega = 2.0 * std::f64::consts::PI * frequency_hz;
    -amplitude * (omega * t).sin().max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amplitude_and_frequency_are_clamped() {
        let mut c = RespiratoryController::with_defaults(10.0, 5.0);
        let (amplitude, frequency) = c.update(200.0, 1.0);
        assert!(amplitude <= 25.0);
        assert!(frequency >= 0.1);
    }

    #[test]
    fn generate_pmus_fails_before_update() {
        let c = RespiratoryController::with_defaults(0.3, 0.01);
        let err = c.generate_pmus(&[0.0, 0.1]).unwrap_err();
        assert!(!err.is_validation());
    }

    #[test]
    fn pmus_is_nonpositive_and_half_rectified() {
        let mut c = RespiratoryController::with_defaults(0.3, 0.01);
        c.update(55.0, 1.0);
        let t: Vec<f64> = (0..100).map(|i| i as f64 * 0.01).collect();
        let pmus = c.generate_pmus(&t).unwrap();
        assert!(pmus.iter().all(|&p| p <= 0.0));
        assert!(pmus.iter().any(|&p| p == 0.0));
    }

    #[test]
    fn integral_term_clamps_to_prevent_windup() {
        let mut c = RespiratoryController::with_defaults(0.0, 100.0);
        for _ in 0..1000 {
            c.update(200.0, 1.0);
        }
        assert!(c.integral_error <= 50.0);
    }
}
