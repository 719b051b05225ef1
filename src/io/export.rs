//! CSV export for settled simulation instants.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::sim::types::StepRecord;

/// Column header for CSV telemetry export.
const HEADER: &str = "time_s,solar_kw,load_kw,battery_kw,battery_soc,feeder_kw,updates,limit_ok";

/// Exports step records to a CSV file at the given path.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_csv(records: &[StepRecord], path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    let buf = io::BufWriter::new(file);
    write_csv(records, buf)
}

/// Writes step records as CSV to any writer.
///
/// One row per settled instant. Produces deterministic output for
/// identical inputs.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_csv(records: &[StepRecord], writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);

    wtr.write_record(HEADER.split(','))?;

    for r in records {
        let time = r
            .time
            .as_secs()
            .map_or_else(|| r.time.to_string(), |secs| secs.to_string());
        wtr.write_record(&[
            time,
            format!("{:.4}", r.solar_kw),
            format!("{:.4}", r.load_kw),
            format!("{:.4}", r.battery_kw),
            format!("{:.4}", r.battery_soc),
            format!("{:.4}", r.feeder_kw),
            r.updates.to_string(),
            r.within_feeder_limits.to_string(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}
