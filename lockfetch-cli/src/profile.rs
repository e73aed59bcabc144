//! The JSON timing report written with `--profile`.

use std::io::Write;
use std::path::Path;
use std::time::Duration;

use lockfetch::RunReport;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct Profile<'a> {
    total_ms: u64,
    units: Vec<UnitProfile<'a>>,
}

#[derive(Debug, Serialize)]
struct UnitProfile<'a> {
    name: &'a str,
    transport: Option<&'static str>,
    success: bool,
    duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<'a> From<&'a RunReport> for Profile<'a> {
    fn from(report: &'a RunReport) -> Self {
        let units = report
            .units
            .iter()
            .map(|unit| UnitProfile {
                name: &unit.name,
                transport: unit.result.as_ref().ok().map(|a| a.transport()),
                success: unit.result.is_ok(),
                duration_ms: millis(unit.elapsed),
                error: unit.result.as_ref().err().map(|e| e.err.to_string()),
            })
            .collect();
        Profile {
            total_ms: millis(report.elapsed),
            units,
        }
    }
}

impl Profile<'_> {
    pub fn write(&self, path: &Path) -> Result<(), serde_json::Error> {
        let file = std::fs::File::create(path).map_err(serde_json::Error::io)?;
        let mut writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush().map_err(serde_json::Error::io)
    }
}

fn millis(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}
