//! Patient pulmonary mechanics parameters

use crate::error::{Result, SimError};

/// A two-compartment lung mechanics model.
///
/// Holds the airway resistances and compliances of each compartment; to
/// model a patient with pathology, construct a `Patient` with the modified
/// parameters rather than subclassing (there is nothing to override: every
/// field is a plain positive scalar).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Patient {
    /// Airway resistance of compartment 1 (cmH2O*s/L)
    pub r1: f64,
    /// Compliance of compartment 1 (L/cmH2O)
    pub c1: f64,
    /// Airway resistance of compartment 2 (cmH2O*s/L)
    pub r2: f64,
    /// Compliance of compartment 2 (L/cmH2O)
    pub c2: f64,
    /// Elastance of compartment 1, 1/C1 (cmH2O/L)
    pub e1: f64,
    /// Elastance of compartment 2, 1/C2 (cmH2O/L)
    pub e2: f64,
}

impl Patient {
    /// Construct a patient, failing if any parameter is not strictly positive.
    pub fn new(r1: f64, c1: f64, r2: f64, c2: f64) -> Result<Self> {
        for (name, value) in [("R1", r1), ("C1", c1), ("R2", r2), ("C2", c2)] {
            if !(value > 0.0) {
                return Err(SimError::validation(format!(
                    "patient parameter {name} must be > 0, got {value}"
                )));
            }
        }
        Ok(Self {
            r1,
            c1,
            r2,
            c2,
            e1: 1.0 / c1,
            e2: 1.0 / c2,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_elastance_from_compliance() {
        let p = Patient::new(10.0, 0.05, 10.0, 0.05).unwrap();
        assert!((p.e1 - 20.0).abs() < 1e-9);
        assert!((p.e2 - 20.0).abs() < 1e-9);
    }

    #[test]
    fn rejects_non_positive_resistance() {
        let err = Patient::new(0.0, 0.05, 10.0, 0.05).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn rejects_negative_compliance() {
        let err = Patient::new(10.0, -0.01, 10.0, 0.05).unwrap_err();
        assert!(err.is_validation());
    }
}
