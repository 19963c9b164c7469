//! Wires Patient/Ventilator/Controller/Simulator/GasExchange/Hemodynamics
//! together for a single request and assembles the response bundle.

use log::info;

use crate::api::{
    GasMetrics, HemodynamicsMetrics, MechanicsMetrics, PatientParams, PhysiologyParams,
    SimulationResponse, TimeSeries, VentilatorParams,
};
use crate::control::RespiratoryController;
use crate::error::Result;
use crate::gas_exchange::GasExchange;
use crate::hemodynamics::Hemodynamics;
use crate::simulator::{
    run_spontaneous, MechanicsResult, Simulator, DEFAULT_SAMPLES_PER_CYCLE,
    DEFAULT_SPONTANEOUS_ITERATIONS, DEFAULT_SPONTANEOUS_SAMPLES_PER_CYCLE,
};
use crate::ventilator::Mode;

/// Desired simulated duration for a fixed-schedule (PCV/VCV) request, seconds.
const FIXED_SCHEDULE_DURATION_S: f64 = 30.0;

/// Runs one simulation request end to end and produces the response bundle.
pub fn run(
    paciente: PatientParams,
    ventilador: VentilatorParams,
    fisiologia: PhysiologyParams,
) -> Result<SimulationResponse> {
    fisiologia.validate()?;

    let patient = paciente.into_domain()?;
    let ventilator = ventilador.into_domain()?;
    let hemodynamics = Hemodynamics::new(fisiologia.k_sensibilidad);
    let gas_exchange = GasExchange::new(fisiologia.v_d, ventilator.fio2, fisiologia.qs_qt);

    info!(
        "starting simulation: mode={:?} fr={} peep={}",
        ventilator.mode, ventilator.fr, ventilator.peep
    );

    let (mechanics, effective_ventilator) =
        run_mechanics(patient, ventilator, fisiologia.gp_control, fisiologia.gi_control)?;

    let gases = gas_exchange.calculate(&mechanics, &effective_ventilator, &hemodynamics);
    let hemo = hemodynamics.compute(&mechanics, &gases, &effective_ventilator, mechanics.auto_peep);

    info!(
        "simulation complete: tidal_volume={:.3} L, GC={:.2} L/min",
        mechanics.tidal_volume(),
        hemo.gc_actual_l_min
    );

    Ok(SimulationResponse {
        series_tiempo: TimeSeries::from(&mechanics),
        metricas_mecanicas: MechanicsMetrics::from_mechanics(&mechanics),
        metricas_gases: GasMetrics::from(&gases),
        metricas_hemodinamicas: HemodynamicsMetrics::from(&hemo),
    })
}

/// Runs the mechanics stage and returns it alongside the ventilator as it
/// stood at the end of the run: unchanged for PCV/VCV, but carrying the
/// closed-loop-converged frequency for ESPONTANEO (see [`run_spontaneous`]).
fn run_mechanics(
    patient: crate::patient::Patient,
    ventilator: crate::ventilator::Ventilator,
    gp_control: f64,
    gi_control: f64,
) -> Result<(MechanicsResult, crate::ventilator::Ventilator)> {
    match ventilator.mode {
        Mode::Pcv | Mode::Vcv => {
            let sim = Simulator::new(patient, ventilator)?;
            let mechanics = sim.run(FIXED_SCHEDULE_DURATION_S, DEFAULT_SAMPLES_PER_CYCLE)?;
            Ok((mechanics, ventilator))
        }
        Mode::Spontaneous => {
            let controller = RespiratoryController::with_defaults(gp_control, gi_control);
            run_spontaneous(
                patient,
                ventilator,
                controller,
                DEFAULT_SPONTANEOUS_ITERATIONS,
                DEFAULT_SPONTANEOUS_SAMPLES_PER_CYCLE,
            )
        }
    }
}
