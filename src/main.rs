//! Cardiorespiratory Simulator - CLI host
//!
//! Reads a simulation request as JSON (from a file or stdin), runs it
//! through the simulation core, and writes the response bundle as JSON
//! (to a file or stdout).

use std::fs;
use std::io::{self, Read, Write};

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info};

use pulmosim::api::SimulationRequest;
use pulmosim::storage::CsvWriter;
use pulmosim::{orchestrator, ui};

#[derive(Parser)]
#[command(name = "pulmosim")]
#[command(about = "Two-compartment lung mechanics, gas exchange and hemodynamics simulator")]
struct Args {
    /// Path to a JSON simulation request; reads stdin if omitted
    #[arg(short, long)]
    input: Option<String>,

    /// Path to write the JSON response; writes stdout if omitted
    #[arg(short, long)]
    output: Option<String>,

    /// Optional path to export the mechanics time series as CSV
    #[arg(long)]
    csv: Option<String>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    ui::display_banner();

    let request_json = match &args.input {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("failed to read request from {path}"))?,
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read request from stdin")?;
            buf
        }
    };

    let request: SimulationRequest =
        serde_json::from_str(&request_json).context("failed to parse simulation request")?;

    info!("request parsed, dispatching to simulation core");

    let response = match orchestrator::run(request.paciente, request.ventilador, request.fisiologia)
    {
        Ok(response) => response,
        Err(err) => {
            error!("simulation failed: {err}");
            ui::error(&format!("simulation failed: {err}"));
            return Err(err.into());
        }
    };

    if let Some(csv_path) = &args.csv {
        // The CSV export only reads t/p_aw/flow/vt; the remaining fields
        // of MechanicsResult aren't part of the response bundle.
        let mechanics = pulmosim::simulator::MechanicsResult {
            t: response.series_tiempo.tiempo.clone(),
            v1: Vec::new(),
            v2: Vec::new(),
            vt: response.series_tiempo.volumen_total.clone(),
            flow1: Vec::new(),
            flow2: Vec::new(),
            flow: response.series_tiempo.flujo_total.clone(),
            p_aw: response.series_tiempo.presion_via_aerea.clone(),
            auto_peep: response.metricas_hemodinamicas.auto_peep_cmh2o,
            mode: pulmosim::Mode::Pcv,
        };
        let mut writer = CsvWriter::new(csv_path)?;
        writer.write_mechanics(&mechanics)?;
        ui::success(&format!("wrote time series to {csv_path}"));
    }

    let response_json = serde_json::to_string_pretty(&response)?;
    match &args.output {
        Some(path) => {
            fs::write(path, &response_json)
                .with_context(|| format!("failed to write response to {path}"))?;
            ui::success(&format!("wrote response to {path}"));
        }
        None => {
            io::stdout().write_all(response_json.as_bytes())?;
            println!();
        }
    }

    Ok(())
}
