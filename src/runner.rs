//! Assembles the demo grid model from a scenario and drives it.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::info;

use crate::config::ScenarioConfig;
use crate::devices::{BaseLoad, Battery, Device, Feeder, Heartbeat, SolarPv};
use crate::error::SimError;
use crate::sim::agenda::Agenda;
use crate::sim::component::ComponentId;
use crate::sim::event::EventRegistry;
use crate::sim::kpi::KpiReport;
use crate::sim::scheduler::{Scheduler, SchedulerStats};
use crate::sim::types::{StepRecord, UpdateRecord};

/// Handles of the components in the demo grid.
#[derive(Debug, Clone, Copy)]
pub struct GridIds {
    pub heartbeat: ComponentId,
    pub solar: ComponentId,
    pub load: ComponentId,
    pub battery: ComponentId,
    pub feeder: ComponentId,
}

/// A scheduler wired with the demo grid, plus the update trace it feeds.
pub struct GridModel {
    pub scheduler: Scheduler,
    pub ids: GridIds,
    trace: Rc<RefCell<Vec<UpdateRecord>>>,
}

impl GridModel {
    /// Captures the grid state at the scheduler's current instant.
    pub fn snapshot(&self) -> StepRecord {
        let sim = &self.scheduler;
        let feeder = sim.component::<Feeder>(self.ids.feeder);
        let battery = sim.component::<Battery>(self.ids.battery);
        StepRecord {
            time: sim.current_time(),
            solar_kw: sim
                .component::<SolarPv>(self.ids.solar)
                .map_or(0.0, Device::power_kw),
            load_kw: sim
                .component::<BaseLoad>(self.ids.load)
                .map_or(0.0, Device::power_kw),
            battery_kw: battery.map_or(0.0, Device::power_kw),
            battery_soc: battery.map_or(0.0, |b| b.soc),
            feeder_kw: feeder.map_or(0.0, Feeder::net_kw),
            within_feeder_limits: feeder.is_none_or(Feeder::within_limits),
            updates: sim.stats().updates_this_instant,
        }
    }

    /// Every update observed so far, in execution order.
    pub fn trace(&self) -> Vec<UpdateRecord> {
        self.trace.borrow().clone()
    }
}

/// Output of [`run_scenario`].
#[derive(Debug, Clone)]
pub struct RunResult {
    /// One record per settled instant.
    pub records: Vec<StepRecord>,
    /// Every component update in execution order.
    pub trace: Vec<UpdateRecord>,
    /// Scheduler counters at the end of the run.
    pub stats: SchedulerStats,
    pub kpis: KpiReport,
}

/// Builds the demo grid: heartbeat -> {solar, load} -> battery -> feeder.
///
/// Every dependency forces an update, so one beat ripples through the whole
/// grid at the same instant.
///
/// # Panics
///
/// Panics if `cfg` does not pass [`ScenarioConfig::validate`].
pub fn build_model(cfg: &ScenarioConfig) -> Result<GridModel, SimError> {
    let sim_cfg = &cfg.simulation;
    let mut sim = Scheduler::new(sim_cfg.start_time, sim_cfg.end_time)?;
    sim.set_max_updates_per_instant(sim_cfg.watchdog());

    let heartbeat = sim.add_component("heartbeat", Heartbeat::new(cfg.heartbeat.dt_secs))?;
    let solar = sim.add_component(
        "solar",
        SolarPv::new(
            cfg.solar.kw_peak,    /* kw_peak */
            cfg.solar.sunrise_hr, /* sunrise_hr */
            cfg.solar.sunset_hr,  /* sunset_hr */
            cfg.solar.noise_std,  /* noise_std */
            sim_cfg.seed,         /* seed */
        ),
    )?;
    let load = sim.add_component(
        "load",
        BaseLoad::new(
            cfg.baseload.base_kw,         /* base_kw */
            cfg.baseload.amp_kw,          /* amp_kw */
            cfg.baseload.phase_rad,       /* phase_rad */
            cfg.baseload.noise_std,       /* noise_std */
            sim_cfg.seed.wrapping_add(1), /* seed */
        ),
    )?;
    let bat = &cfg.battery;
    let battery = sim.add_component(
        "battery",
        Battery::new(
            bat.capacity_kwh,
            bat.initial_soc,
            bat.max_charge_kw,
            bat.max_discharge_kw,
            bat.eta_charge,
            bat.eta_discharge,
        )
        .with_inputs(vec![load, solar]),
    )?;
    let feeder = sim.add_component(
        "feeder",
        Feeder::with_limits(
            vec![load, solar, battery],
            cfg.feeder.max_import_kw,
            cfg.feeder.max_export_kw,
        ),
    )?;

    for (dependent, on) in [
        (solar, heartbeat),
        (load, heartbeat),
        (battery, solar),
        (battery, load),
        (feeder, solar),
        (feeder, load),
        (feeder, battery),
    ] {
        sim.add_dependency(dependent, on, true)?;
    }

    let trace = Rc::new(RefCell::new(Vec::new()));
    for id in [heartbeat, solar, load, battery, feeder] {
        let (Some(events), Some(name)) = (sim.component_events(id), sim.name(id)) else {
            continue;
        };
        let name = name.to_string();
        let sink = Rc::clone(&trace);
        sim.add_action(
            events.did_update,
            format!("trace {name}"),
            move |agenda: &mut Agenda, _: &mut EventRegistry<Agenda>| {
                sink.borrow_mut().push(UpdateRecord {
                    time: agenda.now(),
                    component: name.clone(),
                });
            },
        )?;
    }

    Ok(GridModel {
        scheduler: sim,
        ids: GridIds {
            heartbeat,
            solar,
            load,
            battery,
            feeder,
        },
        trace,
    })
}

/// Runs a scenario to the end of its window.
///
/// # Errors
///
/// Propagates scheduler errors, including a watchdog stall.
///
/// # Panics
///
/// Panics if `cfg` does not pass [`ScenarioConfig::validate`].
pub fn run_scenario(cfg: &ScenarioConfig) -> Result<RunResult, SimError> {
    let mut model = build_model(cfg)?;
    model.scheduler.initialize()?;

    let mut records = vec![model.snapshot()];
    while model.scheduler.do_timestep()? {
        records.push(model.snapshot());
    }

    let kpis = KpiReport::from_records(
        &records,
        cfg.simulation.end_time,
        cfg.battery.capacity_kwh,
    );
    let stats = model.scheduler.stats().clone();
    info!(
        instants = records.len(),
        updates = stats.total_updates(),
        violations = kpis.feeder_violation_count,
        "scenario complete"
    );
    Ok(RunResult {
        records,
        trace: model.trace(),
        stats,
        kpis,
    })
}
