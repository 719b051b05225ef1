//! Post-hoc KPI computation from simulation results.

use std::fmt;

use super::clock::Time;
use super::types::StepRecord;

/// Aggregate key performance indicators derived from a complete simulation run.
///
/// Computed post-hoc from `Vec<StepRecord>` to ensure consistency between
/// step data and reported metrics. Instants are unevenly spaced, so energy
/// figures hold each record's power until the next record, and the last
/// record's power until the end of the window.
#[derive(Debug, Clone, PartialEq)]
pub struct KpiReport {
    /// Settled instants.
    pub instants: usize,
    /// Component updates across the run.
    pub total_updates: u64,
    /// Peak feeder import power (kW, positive).
    pub peak_import_kw: f32,
    /// Peak feeder export power (kW, positive magnitude).
    pub peak_export_kw: f32,
    /// Energy imported through the feeder (kWh).
    pub import_kwh: f32,
    /// Total battery energy throughput (kWh, sum of |power| * dt).
    pub battery_throughput_kwh: f32,
    /// Battery equivalent full cycles (throughput / 2*capacity).
    pub battery_equivalent_full_cycles: f32,
    /// Number of instants where feeder limits were violated.
    pub feeder_violation_count: usize,
}

impl KpiReport {
    /// Computes all KPIs from the complete step record vector.
    ///
    /// # Arguments
    ///
    /// * `records` - Settled instants in time order
    /// * `end_time` - End of the simulated window
    /// * `battery_capacity_kwh` - Battery capacity for cycle calculation
    ///
    /// # Returns
    ///
    /// A `KpiReport` with all fields populated.
    pub fn from_records(records: &[StepRecord], end_time: Time, battery_capacity_kwh: f32) -> Self {
        let mut peak_import = 0.0_f32;
        let mut peak_export = 0.0_f32;
        let mut import_kwh = 0.0_f32;
        let mut bat_throughput = 0.0_f32;
        let mut violations = 0_usize;
        let mut updates = 0_u64;

        for (i, r) in records.iter().enumerate() {
            peak_import = peak_import.max(r.feeder_kw);
            peak_export = peak_export.max(-r.feeder_kw);
            updates += r.updates;
            if !r.within_feeder_limits {
                violations += 1;
            }

            let until = records.get(i + 1).map_or(end_time, |next| next.time);
            let dt_hours = until.hours_since(r.time);
            import_kwh += r.feeder_kw.max(0.0) * dt_hours;
            bat_throughput += r.battery_kw.abs() * dt_hours;
        }

        let cycles = if battery_capacity_kwh > 0.0 {
            bat_throughput / (2.0 * battery_capacity_kwh)
        } else {
            0.0
        };

        Self {
            instants: records.len(),
            total_updates: updates,
            peak_import_kw: peak_import,
            peak_export_kw: peak_export,
            import_kwh,
            battery_throughput_kwh: bat_throughput,
            battery_equivalent_full_cycles: cycles,
            feeder_violation_count: violations,
        }
    }
}

impl fmt::Display for KpiReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- KPI Report ---")?;
        writeln!(
            f,
            "Instants:              {} ({} updates)",
            self.instants, self.total_updates
        )?;
        writeln!(f, "Peak import:           {:.2} kW", self.peak_import_kw)?;
        writeln!(f, "Peak export:           {:.2} kW", self.peak_export_kw)?;
        writeln!(f, "Energy imported:       {:.2} kWh", self.import_kwh)?;
        writeln!(
            f,
            "Battery throughput:    {:.2} kWh ({:.2} equiv. cycles)",
            self.battery_throughput_kwh, self.battery_equivalent_full_cycles
        )?;
        write!(f, "Feeder violations:     {}", self.feeder_violation_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hours(h: i64) -> Time {
        Time::from_secs(h * 3600)
    }

    fn make_record(hour: i64, battery_kw: f32, feeder_kw: f32) -> StepRecord {
        StepRecord {
            time: hours(hour),
            solar_kw: 0.0,
            load_kw: 0.0,
            battery_kw,
            battery_soc: 0.5,
            feeder_kw,
            within_feeder_limits: true,
            updates: 3,
        }
    }

    #[test]
    fn battery_throughput() {
        // battery powers held for one hour each: 2 + 3 + 1 + 1 = 7 kWh
        let records: Vec<StepRecord> = [2.0, -3.0, 1.0, -1.0]
            .iter()
            .enumerate()
            .map(|(h, &b)| make_record(h as i64, b, 0.0))
            .collect();
        let kpi = KpiReport::from_records(&records, hours(4), 10.0);
        assert!((kpi.battery_throughput_kwh - 7.0).abs() < 1e-4);
        assert!((kpi.battery_equivalent_full_cycles - 0.35).abs() < 1e-4);
    }

    #[test]
    fn uneven_spacing_weights_energy() {
        let records = vec![
            make_record(0, 0.0, 2.0),
            make_record(3, 0.0, -1.0),
            make_record(4, 0.0, 1.0),
        ];
        // 2 kW for 3 h, export for 1 h, then 1 kW until the end at 5 h
        let kpi = KpiReport::from_records(&records, hours(5), 10.0);
        assert!((kpi.import_kwh - 7.0).abs() < 1e-4);
    }

    #[test]
    fn last_record_is_held_until_end_time() {
        let one = KpiReport::from_records(&[make_record(0, 1.5, 1.5)], hours(1), 10.0);
        let two = KpiReport::from_records(
            &[make_record(0, 1.5, 1.5), make_record(1, 1.5, 1.5)],
            hours(2),
            10.0,
        );
        assert!((one.import_kwh - 1.5).abs() < 1e-4);
        assert!((two.import_kwh - 2.0 * one.import_kwh).abs() < 1e-4);
        assert!((two.battery_throughput_kwh - 2.0 * one.battery_throughput_kwh).abs() < 1e-4);
    }

    #[test]
    fn feeder_violation_counting() {
        let mut records: Vec<StepRecord> = (0..5).map(|h| make_record(h, 0.0, 3.0)).collect();
        records[1].within_feeder_limits = false;
        records[3].within_feeder_limits = false;
        let kpi = KpiReport::from_records(&records, hours(5), 10.0);
        assert_eq!(kpi.feeder_violation_count, 2);
        assert_eq!(kpi.instants, 5);
        assert_eq!(kpi.total_updates, 15);
    }

    #[test]
    fn peak_import_and_export() {
        let records: Vec<StepRecord> = [3.0, -2.0, 5.0, -1.0]
            .iter()
            .enumerate()
            .map(|(h, &f)| make_record(h as i64, 0.0, f))
            .collect();
        let kpi = KpiReport::from_records(&records, hours(5), 10.0);
        assert_eq!(kpi.peak_import_kw, 5.0);
        assert_eq!(kpi.peak_export_kw, 2.0);
    }

    #[test]
    fn empty_results() {
        let kpi = KpiReport::from_records(&[], hours(1), 10.0);
        assert_eq!(kpi.instants, 0);
        assert_eq!(kpi.battery_throughput_kwh, 0.0);
        assert_eq!(kpi.feeder_violation_count, 0);
    }
}
