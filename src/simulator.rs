//! Two-compartment lung ODE integrator and result post-processing

use crate::control::{pmus_at, RespiratoryController};
use crate::error::{Result, SimError};
use crate::patient::Patient;
use crate::ventilator::{Mode, Ventilator};

/// Default number of samples per cycle for the fixed-schedule (PCV/VCV) run
pub const DEFAULT_SAMPLES_PER_CYCLE: usize = 200;
/// Default number of samples per cycle for the closed-loop spontaneous run
pub const DEFAULT_SPONTANEOUS_SAMPLES_PER_CYCLE: usize = 100;
/// Default number of outer iterations for the closed-loop spontaneous run
pub const DEFAULT_SPONTANEOUS_ITERATIONS: usize = 30;
/// Margin cycles added to the fixed-schedule cycle count
const MARGIN_CYCLES: usize = 2;

/// Post-processed mechanics time series and scalar summaries.
#[derive(Debug, Clone)]
pub struct MechanicsResult {
    pub t: Vec<f64>,
    pub v1: Vec<f64>,
    pub v2: Vec<f64>,
    pub vt: Vec<f64>,
    pub flow1: Vec<f64>,
    pub flow2: Vec<f64>,
    pub flow: Vec<f64>,
    pub p_aw: Vec<f64>,
    pub auto_peep: f64,
    pub mode: Mode,
}

impl MechanicsResult {
    /// max(Vt) - min(Vt) over the whole series.
    pub fn tidal_volume(&self) -> f64 {
        tidal_volume(&self.vt)
    }
}

fn tidal_volume(vt: &[f64]) -> f64 {
    let max = vt.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let min = vt.iter().cloned().fold(f64::INFINITY, f64::min);
    max - min
}

/// Evenly spaced samples between `t0` and `t1`, matching `numpy.linspace`:
/// when `endpoint` is true both ends are included (spacing = span/(n-1));
/// when false, `t1` is excluded (spacing = span/n).
fn linspace(t0: f64, t1: f64, n: usize, endpoint: bool) -> Vec<f64> {
    if n == 0 {
        return Vec::new();
    }
    if n == 1 {
        return vec![t0];
    }
    let step = if endpoint {
        (t1 - t0) / (n as f64 - 1.0)
    } else {
        (t1 - t0) / n as f64
    };
    (0..n).map(|i| t0 + step * i as f64).collect()
}

/// Numerical gradient of `f` with respect to `t`, matching `numpy.gradient`'s
/// default (`edge_order=1`) behavior: one-sided differences at the ends, a
/// second-order accurate central difference (accounting for non-uniform
/// spacing) in the interior.
fn gradient(f: &[f64], t: &[f64]) -> Vec<f64> {
    let n = f.len();
    let mut out = vec![0.0; n];
    if n < 2 {
        return out;
    }
    out[0] = (f[1] - f[0]) / (t[1] - t[0]);
    out[n - 1] = (f[n - 1] - f[n - 2]) / (t[n - 1] - t[n - 2]);
    for i in 1..n - 1 {
        let hs = t[i] - t[i - 1];
        let hd = t[i + 1] - t[i];
        let a = -hd / (hs * (hs + hd));
        let b = (hd - hs) / (hs * hd);
        let c = hs / (hd * (hs + hd));
        out[i] = a * f[i - 1] + b * f[i] + c * f[i + 1];
    }
    out
}

fn all_finite(xs: &[f64]) -> bool {
    xs.iter().all(|x| x.is_finite())
}

/// A single fixed-step RK4 integration step for the two-compartment state.
fn rk4_step<F>(t: f64, y: (f64, f64), dt: f64, rhs: &F) -> (f64, f64)
where
    F: Fn(f64, f64, f64) -> (f64, f64),
{
    let (k1a, k1b) = rhs(t, y.0, y.1);
    let (k2a, k2b) = rhs(t + dt / 2.0, y.0 + dt / 2.0 * k1a, y.1 + dt / 2.0 * k1b);
    let (k3a, k3b) = rhs(t + dt / 2.0, y.0 + dt / 2.0 * k2a, y.1 + dt / 2.0 * k2b);
    let (k4a, k4b) = rhs(t + dt, y.0 + dt * k3a, y.1 + dt * k3b);
    (
        y.0 + dt / 6.0 * (k1a + 2.0 * k2a + 2.0 * k3a + k4a),
        y.1 + dt / 6.0 * (k1b + 2.0 * k2b + 2.0 * k3b + k4b),
    )
}

/// Integrate the two-compartment state over `t_values`, returning the state
/// at each sample. `y0` is the initial condition at `t_values[0]`.
fn integrate<F>(y0: (f64, f64), t_values: &[f64], rhs: F) -> (Vec<f64>, Vec<f64>)
where
    F: Fn(f64, f64, f64) -> (f64, f64),
{
    let n = t_values.len();
    let mut v1 = Vec::with_capacity(n);
    let mut v2 = Vec::with_capacity(n);
    let mut cur = y0;
    v1.push(cur.0);
    v2.push(cur.1);
    for i in 1..n {
        let dt = t_values[i] - t_values[i - 1];
        cur = rk4_step(t_values[i - 1], cur, dt, &rhs);
        v1.push(cur.0);
        v2.push(cur.1);
    }
    (v1, v2)
}

/// Orchestrates the per-cycle ODE integration for a patient/ventilator pair.
pub struct Simulator {
    patient: Patient,
    ventilator: Ventilator,
}

impl Simulator {
    /// Construct a simulator for a PCV or VCV ventilator. Spontaneous mode
    /// is driven by [`run_spontaneous`] instead, since it requires a
    /// [`RespiratoryController`] and mutates the effective frequency each
    /// cycle.
    pub fn new(patient: Patient, ventilator: Ventilator) -> Result<Self> {
        if ventilator.mode == Mode::Spontaneous {
            return Err(SimError::validation(
                "Simulator::new requires PCV or VCV; use run_spontaneous for ESPONTANEO",
            ));
        }
        Ok(Self { patient, ventilator })
    }

    fn ode_rhs(&self, p_aw: f64, v1: f64, v2: f64) -> (f64, f64) {
        (
            (p_aw - self.patient.e1 * v1) / self.patient.r1,
            (p_aw - self.patient.e2 * v2) / self.patient.r2,
        )
    }

    /// The right-hand side of the two-compartment ODE for PCV/VCV. For VCV,
    /// the instantaneous airway pressure during inspiration is the pressure
    /// that would produce the ventilator's fixed inspiratory flow given the
    /// current compartment volumes.
    fn rhs(&self, t: f64, v1: f64, v2: f64) -> (f64, f64) {
        let p_aw = match self.ventilator.mode {
            Mode::Pcv => self.ventilator.pressure(t),
            Mode::Vcv => {
                if self.ventilator.in_inspiration(t) {
                    let flow_insp = self.ventilator.flow(t);
                    let conductance = 1.0 / self.patient.r1 + 1.0 / self.patient.r2;
                    (flow_insp
                        + self.patient.e1 * v1 / self.patient.r1
                        + self.patient.e2 * v2 / self.patient.r2)
                        / conductance
                } else {
                    self.ventilator.peep
                }
            }
            Mode::Spontaneous => unreachable!("Simulator::new rejects Mode::Spontaneous"),
        };
        self.ode_rhs(p_aw, v1, v2)
    }

    /// Fixed-schedule simulation for PCV/VCV: integrate cycle by cycle until
    /// `desired_total_time` is covered (plus margin cycles), carrying the
    /// final state of each cycle as the next cycle's initial condition.
    pub fn run(
        &self,
        desired_total_time: f64,
        samples_per_cycle: usize,
    ) -> Result<MechanicsResult> {
        let t_per_cycle = self.ventilator.t_total;
        let num_cycles = (desired_total_time / t_per_cycle).ceil() as usize + MARGIN_CYCLES;

        let mut t_all = Vec::new();
        let mut v1_all = Vec::new();
        let mut v2_all = Vec::new();
        let mut y = (0.0, 0.0);

        for i in 0..num_cycles {
            let t0 = i as f64 * t_per_cycle;
            let t1 = (i + 1) as f64 * t_per_cycle;
            let endpoint = i == num_cycles - 1;
            let t_eval = linspace(t0, t1, samples_per_cycle, endpoint);

            let (v1, v2) = integrate(y, &t_eval, |t, v1, v2| self.rhs(t, v1, v2));
            y = (*v1.last().unwrap(), *v2.last().unwrap());

            t_all.extend(t_eval);
            v1_all.extend(v1);
            v2_all.extend(v2);
        }

        self.process_results(t_all, v1_all, v2_all)
    }

    /// Post-process a raw (t, V1, V2) trajectory into flows, total volume,
    /// reconstructed airway pressure and auto-PEEP.
    pub fn process_results(&self, t: Vec<f64>, v1: Vec<f64>, v2: Vec<f64>) -> Result<MechanicsResult> {
        if !all_finite(&v1) || !all_finite(&v2) {
            return Err(SimError::computation(
                "integration produced a non-finite state",
            ));
        }

        let flow1 = gradient(&v1, &t);
        let flow2 = gradient(&v2, &t);
        let flow: Vec<f64> = flow1.iter().zip(&flow2).map(|(a, b)| a + b).collect();
        let vt: Vec<f64> = v1.iter().zip(&v2).map(|(a, b)| a + b).collect();

        let p_aw: Vec<f64> = match self.ventilator.mode {
            Mode::Pcv => t.iter().map(|&ti| self.ventilator.pressure(ti)).collect(),
            Mode::Vcv | Mode::Spontaneous => {
                let conductance = 1.0 / self.patient.r1 + 1.0 / self.patient.r2;
                flow.iter()
                    .zip(&v1)
                    .zip(&v2)
                    .map(|((&f, &v1i), &v2i)| {
                        (f + self.patient.e1 * v1i / self.patient.r1
                            + self.patient.e2 * v2i / self.patient.r2)
                            / conductance
                    })
                    .collect()
            }
        };

        let v1_end = *v1.last().unwrap_or(&0.0);
        let v2_end = *v2.last().unwrap_or(&0.0);
        let p_alv1 = self.patient.e1 * v1_end;
        let p_alv2 = self.patient.e2 * v2_end;
        let conductance = 1.0 / self.patient.r1 + 1.0 / self.patient.r2;
        let auto_peep = (p_alv1 / self.patient.r1 + p_alv2 / self.patient.r2) / conductance;

        Ok(MechanicsResult {
            t,
            v1,
            v2,
            vt,
            flow1,
            flow2,
            flow,
            p_aw,
            auto_peep,
            mode: self.ventilator.mode,
        })
    }
}

/// Closed-loop spontaneous-mode simulation. Each outer iteration lets the
/// [`RespiratoryController`] set the amplitude and frequency of the P_mus
/// waveform from the current PaCO2, integrates one respiratory cycle against
/// that waveform, then updates PaCO2 from a tidal-volume heuristic.
///
/// The ventilator's frequency is carried by value across iterations rather
/// than mutated in place, so a `Ventilator` can never be shared, half
/// updated, across two concurrent requests. Returns the mechanics result
/// together with the ventilator as it stood after the final iteration
/// (i.e. at the closed-loop-converged frequency), since downstream gas
/// exchange and hemodynamics must be computed against the rate the
/// controller actually settled on, not the caller's nominal `fr`.
pub fn run_spontaneous(
    patient: Patient,
    ventilator: Ventilator,
    mut controller: RespiratoryController,
    iterations: usize,
    samples_per_cycle: usize,
) -> Result<(MechanicsResult, Ventilator)> {
    if ventilator.mode != Mode::Spontaneous {
        return Err(SimError::validation(
            "run_spontaneous requires mode ESPONTANEO",
        ));
    }

    let mut ventilator = ventilator;
    let mut t_all = Vec::new();
    let mut v1_all = Vec::new();
    let mut v2_all = Vec::new();
    let mut y = (0.0, 0.0);
    let mut paco2 = 55.0;
    let mut t_current = 0.0;

    for _ in 0..iterations {
        let dt = 60.0 / ventilator.fr;
        let (amplitude, frequency_hz) = controller.update(paco2, dt);
        ventilator = ventilator.with_fr(frequency_hz * 60.0);

        let t0 = t_current;
        let t1 = t_current + ventilator.t_total;
        let t_eval = linspace(t0, t1, samples_per_cycle, true);

        let sim = Simulator { patient, ventilator };
        let (v1, v2) = integrate(y, &t_eval, |t, v1, v2| {
            sim.ode_rhs(pmus_at(amplitude, frequency_hz, t), v1, v2)
        });

        let cycle = sim.process_results(t_eval.clone(), v1.clone(), v2.clone())?;
        let tidal_volume = cycle.tidal_volume();
        if tidal_volume < 0.4 {
            paco2 += 2.0;
        } else {
            paco2 -= 2.0;
        }
        paco2 = paco2.clamp(30.0, 80.0);

        y = (*v1.last().unwrap(), *v2.last().unwrap());
        t_current = t1;
        t_all.extend(t_eval);
        v1_all.extend(v1);
        v2_all.extend(v2);
    }

    let mechanics = Simulator { patient, ventilator }.process_results(t_all, v1_all, v2_all)?;
    Ok((mechanics, ventilator))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ventilator::Mode;

    fn patient() -> Patient {
        Patient::new(10.0, 0.05, 10.0, 0.05).unwrap()
    }

    #[test]
    fn starts_at_zero_volume() {
        let v = Ventilator::new(Mode::Pcv, 5.0, 15.0, 15.0, 1.0, None, 0.21).unwrap();
        let sim = Simulator::new(patient(), v).unwrap();
        let res = sim.run(5.0, DEFAULT_SAMPLES_PER_CYCLE).unwrap();
        assert_eq!(res.v1[0], 0.0);
        assert_eq!(res.v2[0], 0.0);
    }

    #[test]
    fn zero_driving_pressure_gives_zero_tidal_volume() {
        let v = Ventilator::new(Mode::Pcv, 5.0, 0.0, 15.0, 1.0, None, 0.21).unwrap();
        let sim = Simulator::new(patient(), v).unwrap();
        let res = sim.run(5.0, DEFAULT_SAMPLES_PER_CYCLE).unwrap();
        assert!(res.tidal_volume().abs() < 1e-6);
    }

    #[test]
    fn volumes_stay_non_negative() {
        let v = Ventilator::new(Mode::Pcv, 5.0, 15.0, 15.0, 1.0, None, 0.21).unwrap();
        let sim = Simulator::new(patient(), v).unwrap();
        let res = sim.run(5.0, DEFAULT_SAMPLES_PER_CYCLE).unwrap();
        assert!(res.v1.iter().all(|&v| v >= -1e-9));
        assert!(res.v2.iter().all(|&v| v >= -1e-9));
    }

    #[test]
    fn array_lengths_match() {
        let v = Ventilator::new(Mode::Vcv, 5.0, 0.0, 15.0, 1.0, Some(0.5), 0.21).unwrap();
        let sim = Simulator::new(patient(), v).unwrap();
        let res = sim.run(5.0, DEFAULT_SAMPLES_PER_CYCLE).unwrap();
        let n = res.t.len();
        assert_eq!(res.v1.len(), n);
        assert_eq!(res.v2.len(), n);
        assert_eq!(res.vt.len(), n);
        assert_eq!(res.flow.len(), n);
        assert_eq!(res.p_aw.len(), n);
    }

    #[test]
    fn auto_peep_is_non_negative() {
        let v = Ventilator::new(Mode::Pcv, 5.0, 15.0, 15.0, 0.9, None, 0.21).unwrap();
        let sim = Simulator::new(patient(), v).unwrap();
        let res = sim.run(5.0, DEFAULT_SAMPLES_PER_CYCLE).unwrap();
        assert!(res.auto_peep >= -1e-9);
    }

    #[test]
    fn pcv_peak_pressure_matches_peep_plus_driving() {
        let v = Ventilator::new(Mode::Pcv, 5.0, 15.0, 15.0, 1.0, None, 0.21).unwrap();
        let sim = Simulator::new(patient(), v).unwrap();
        let res = sim.run(5.0, DEFAULT_SAMPLES_PER_CYCLE).unwrap();
        let peak = res.p_aw.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        assert!((peak - 20.0).abs() < 1e-9);
    }

    #[test]
    fn rejects_spontaneous_ventilator_in_simulator_new() {
        let v = Ventilator::new(Mode::Spontaneous, 0.0, 0.0, 12.0, 1.0, None, 0.21).unwrap();
        assert!(Simulator::new(patient(), v).is_err());
    }

    #[test]
    fn deterministic_for_identical_inputs() {
        let v = Ventilator::new(Mode::Pcv, 5.0, 15.0, 15.0, 1.0, None, 0.21).unwrap();
        let sim = Simulator::new(patient(), v).unwrap();
        let a = sim.run(5.0, DEFAULT_SAMPLES_PER_CYCLE).unwrap();
        let b = sim.run(5.0, DEFAULT_SAMPLES_PER_CYCLE).unwrap();
        assert_eq!(a.t, b.t);
        assert_eq!(a.v1, b.v1);
        assert_eq!(a.p_aw, b.p_aw);
    }

    #[test]
    fn spontaneous_run_produces_consistent_lengths() {
        use crate::control::RespiratoryController;
        let v = Ventilator::new(Mode::Spontaneous, 0.0, 0.0, 12.0, 1.0, None, 0.21).unwrap();
        let controller = RespiratoryController::with_defaults(0.3, 0.01);
        let (res, _converged) = run_spontaneous(patient(), v, controller, 5, 100).unwrap();
        let n = res.t.len();
        assert_eq!(res.v1.len(), n);
        assert_eq!(res.p_aw.len(), n);
        assert!(res.v1.iter().all(|&x| x >= -1e-6));
    }
}
