//! Runs the documented end-to-end scenarios against the simulation core and
//! reports pass/fail, without needing an HTTP host.

use log::info;

use pulmosim::api::{PatientParams, PhysiologyParams, VentilatorParams};
use pulmosim::ventilator::Mode;
use pulmosim::{orchestrator, ui};

struct Scenario {
    name: &'static str,
    check: fn() -> Result<(), String>,
}

fn baseline_patient() -> PatientParams {
    PatientParams {
        r1: 10.0,
        c1: 0.05,
        r2: 10.0,
        c2: 0.05,
    }
}

fn baseline_physiology() -> PhysiologyParams {
    PhysiologyParams {
        k_sensibilidad: 0.1,
        gp_control: 0.3,
        gi_control: 0.01,
        qs_qt: 0.05,
        v_d: 0.15,
    }
}

fn baseline_ventilator() -> VentilatorParams {
    VentilatorParams {
        modo: Mode::Pcv,
        peep: 5.0,
        p_driving: 15.0,
        fr: 15.0,
        ti: 1.0,
        vt: Some(0.5),
        fio2: 0.21,
    }
}

fn scenario_baseline_pcv() -> Result<(), String> {
    let response = orchestrator::run(baseline_patient(), baseline_ventilator(), baseline_physiology())
        .map_err(|e| e.to_string())?;
    let peak = response
        .metricas_mecanicas
        .presion_pico
        .ok_or("expected presion_pico for PCV")?;
    if (peak - 20.0).abs() > 1e-6 {
        return Err(format!("expected peak pressure ~20, got {peak}"));
    }
    if response.metricas_gases.va_min <= 0.0 {
        return Err("expected VA_min > 0".into());
    }
    let gc = response.metricas_hemodinamicas.gc_actual_l_min;
    if !(gc > 0.0 && gc < 5.0) {
        return Err(format!("expected 0 < GC < 5.0, got {gc}"));
    }
    if response.metricas_hemodinamicas.do2_ml_min < 100.0 {
        return Err("expected DO2 on the order of 10^3 mL/min".into());
    }
    Ok(())
}

fn scenario_vcv_without_vt() -> Result<(), String> {
    let mut ventilador = baseline_ventilator();
    ventilador.modo = Mode::Vcv;
    ventilador.vt = None;
    match orchestrator::run(baseline_patient(), ventilador, baseline_physiology()) {
        Err(e) if e.is_validation() => Ok(()),
        Err(e) => Err(format!("expected validation error, got computation error: {e}")),
        Ok(_) => Err("expected VCV without Vt to fail".into()),
    }
}

fn scenario_degenerate_dead_space() -> Result<(), String> {
    let mut physiology = baseline_physiology();
    physiology.v_d = 10.0;
    let response = orchestrator::run(baseline_patient(), baseline_ventilator(), physiology)
        .map_err(|e| e.to_string())?;
    if response.metricas_gases.va_min > 0.0 {
        return Err("expected VA_min <= 0".into());
    }
    if response.metricas_gases.paco2_mmhg != 100.0
        || response.metricas_gases.pao2_mmhg != 40.0
        || response.metricas_gases.pao2_arterial_mmhg != 35.0
    {
        return Err("expected the degenerate fallback gas metrics".into());
    }
    Ok(())
}

fn scenario_spontaneous() -> Result<(), String> {
    let mut ventilador = baseline_ventilator();
    ventilador.modo = Mode::Spontaneous;
    ventilador.p_driving = 0.0;
    ventilador.vt = None;
    let response = orchestrator::run(baseline_patient(), ventilador, baseline_physiology())
        .map_err(|e| e.to_string())?;
    if response.metricas_mecanicas.presion_pico.is_some() {
        return Err("expected presion_pico to be null in ESPONTANEO".into());
    }
    let n = response.series_tiempo.tiempo.len();
    if response.series_tiempo.presion_via_aerea.len() != n
        || response.series_tiempo.flujo_total.len() != n
        || response.series_tiempo.volumen_total.len() != n
    {
        return Err("expected consistent array lengths".into());
    }
    Ok(())
}

fn scenario_hypovolaemic() -> Result<(), String> {
    let baseline = orchestrator::run(baseline_patient(), baseline_ventilator(), baseline_physiology())
        .map_err(|e| e.to_string())?;
    let mut physiology = baseline_physiology();
    physiology.k_sensibilidad = 0.5;
    let hypovolaemic = orchestrator::run(baseline_patient(), baseline_ventilator(), physiology)
        .map_err(|e| e.to_string())?;
    if hypovolaemic.metricas_hemodinamicas.gc_actual_l_min
        >= baseline.metricas_hemodinamicas.gc_actual_l_min
    {
        return Err("expected higher k_sensibilidad to strictly lower GC_actual_L_min".into());
    }
    Ok(())
}

fn scenario_high_fio2() -> Result<(), String> {
    let mut ventilador = baseline_ventilator();
    ventilador.fio2 = 1.0;
    let response = orchestrator::run(baseline_patient(), ventilador, baseline_physiology())
        .map_err(|e| e.to_string())?;
    if response.metricas_gases.pao2_mmhg <= 600.0 {
        return Err(format!(
            "expected PAO2_mmHg > 600, got {}",
            response.metricas_gases.pao2_mmhg
        ));
    }
    if response.metricas_hemodinamicas.sao2_percent != 100.0 {
        return Err("expected SaO2_percent == 100".into());
    }
    Ok(())
}

const SCENARIOS: &[Scenario] = &[
    Scenario { name: "baseline PCV", check: scenario_baseline_pcv },
    Scenario { name: "VCV without Vt", check: scenario_vcv_without_vt },
    Scenario { name: "degenerate dead space", check: scenario_degenerate_dead_space },
    Scenario { name: "spontaneous mode", check: scenario_spontaneous },
    Scenario { name: "hypovolaemic patient", check: scenario_hypovolaemic },
    Scenario { name: "high FiO2", check: scenario_high_fio2 },
];

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    ui::display_banner();

    let mut failures = 0;
    for scenario in SCENARIOS {
        info!("running scenario: {}", scenario.name);
        match (scenario.check)() {
            Ok(()) => ui::success(scenario.name),
            Err(message) => {
                failures += 1;
                ui::error(&format!("{}: {message}", scenario.name));
            }
        }
    }

    if failures > 0 {
        ui::error(&format!("{failures} scenario(s) failed"));
        std::process::exit(1);
    }
    ui::success("all scenarios passed");
}
