//! CSV export of a simulation's mechanics time series

use csv::Writer;
use std::fs::File;
use std::path::Path;

use crate::error::Result;
use crate::simulator::MechanicsResult;

/// Lazily-initialized writer for a simulation's mechanics time series.
pub struct CsvWriter {
    writer: Option<Writer<File>>,
    path: String,
    rows_written: usize,
}

impl CsvWriter {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self {
            writer: None,
            path: path.as_ref().to_string_lossy().to_string(),
            rows_written: 0,
        })
    }

    /// Write every sample of `mechanics` as one row.
    pub fn write_mechanics(&mut self, mechanics: &MechanicsResult) -> Result<()> {
        if self.writer.is_none() {
            let file = File::create(&self.path)?;
            let mut writer = Writer::from_writer(file);
            writer.write_record([
                "tiempo",
                "presion_via_aerea",
                "flujo_total",
                "volumen_total",
            ])?;
            self.writer = Some(writer);
        }

        let writer = self.writer.as_mut().unwrap();
        for i in 0..mechanics.t.len() {
            writer.write_record([
                mechanics.t[i].to_string(),
                mechanics.p_aw[i].to_string(),
                mechanics.flow[i].to_string(),
                mechanics.vt[i].to_string(),
            ])?;
            self.rows_written += 1;
        }
        writer.flush()?;

        Ok(())
    }

    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    pub fn flush(&mut self) -> Result<()> {
        if let Some(ref mut writer) = self.writer {
            writer.flush()?;
        }
        Ok(())
    }
}

impl Drop for CsvWriter {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ventilator::Mode;
    use std::fs;

    fn sample_mechanics() -> MechanicsResult {
        MechanicsResult {
            t: vec![0.0, 0.1, 0.2],
            v1: vec![0.0, 0.1, 0.2],
            v2: vec![0.0, 0.1, 0.2],
            vt: vec![0.0, 0.2, 0.4],
            flow1: vec![0.0, 1.0, 1.0],
            flow2: vec![0.0, 1.0, 1.0],
            flow: vec![0.0, 2.0, 2.0],
            p_aw: vec![5.0, 20.0, 20.0],
            auto_peep: 0.0,
            mode: Mode::Pcv,
        }
    }

    #[test]
    fn writes_one_row_per_sample() {
        let path = std::env::temp_dir().join("pulmosim_test_mechanics.csv");
        let mut writer = CsvWriter::new(&path).unwrap();
        writer.write_mechanics(&sample_mechanics()).unwrap();
        assert_eq!(writer.rows_written(), 3);
        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 4); // header + 3 rows
        let _ = fs::remove_file(&path);
    }
}
