//! Two-compartment lung mechanics, gas exchange and hemodynamics simulator
//!
//! Given a patient's pulmonary mechanics and a ventilator configuration,
//! simulates several seconds of mechanical or spontaneous breathing and
//! derives gas-exchange and hemodynamic metrics from the resulting
//! trajectory.

pub mod api;
pub mod control;
pub mod error;
pub mod gas_exchange;
pub mod hemodynamics;
pub mod numerics;
pub mod orchestrator;
pub mod patient;
pub mod simulator;
pub mod storage;
pub mod ui;
pub mod ventilator;

pub use error::{Result, SimError};
pub use patient::Patient;
pub use ventilator::{Mode, Ventilator};
