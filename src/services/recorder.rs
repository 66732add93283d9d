//! Per-run telemetry recording session.
//!
//! A [`TelemetryRecorder`] is an explicit session object owned by the
//! caller: one instance per run, no hidden global state. Concurrent runs
//! use independent recorders and independent storage paths, so no locking
//! is needed between runs.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::info;

use crate::domain::errors::{CoreError, CoreResult};
use crate::domain::models::policy::AdaptiveSnapshot;
use crate::domain::models::telemetry::{RunRecord, UnitEvent, UnitEventPatch, UnitRange};
use crate::infrastructure::storage;
use crate::services::aggregation::aggregate_events;

/// A finalized run: the frozen record and where it was persisted.
#[derive(Debug, Clone)]
pub struct FinalizedRun {
    pub record: RunRecord,
    pub path: PathBuf,
}

#[derive(Debug)]
struct ActiveRun {
    run_id: String,
    project_id: String,
    started_at: DateTime<Utc>,
    unit_range: UnitRange,
    /// Unit index -> latest event state. The map keeps events ordered by
    /// index regardless of delivery order.
    units: BTreeMap<u32, UnitEvent>,
    adaptive: Option<AdaptiveSnapshot>,
}

/// Records one run's per-unit telemetry and freezes it at finalization.
#[derive(Debug, Default)]
pub struct TelemetryRecorder {
    active: Option<ActiveRun>,
}

impl TelemetryRecorder {
    /// Create an idle recorder. Any recording call before [`start`]
    /// fails with [`CoreError::NotStarted`].
    ///
    /// [`start`]: Self::start
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a new run, discarding any previous unfinalized state.
    pub fn start(
        &mut self,
        run_id: impl Into<String>,
        project_id: impl Into<String>,
        unit_range: UnitRange,
    ) {
        self.active = Some(ActiveRun {
            run_id: run_id.into(),
            project_id: project_id.into(),
            started_at: Utc::now(),
            unit_range,
            units: BTreeMap::new(),
            adaptive: None,
        });
    }

    /// Whether a run is currently being recorded.
    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Insert-or-merge a unit event by index.
    ///
    /// The last write wins per field; fields absent from the patch keep the
    /// prior write's values. Idempotent under retries and out-of-order
    /// delivery.
    pub fn record_unit(&mut self, patch: UnitEventPatch) -> CoreResult<()> {
        let run = self.active.as_mut().ok_or(CoreError::NotStarted)?;
        match run.units.get_mut(&patch.index) {
            Some(event) => patch.apply(event),
            None => {
                run.units.insert(patch.index, patch.into_event());
            }
        }
        Ok(())
    }

    /// Attach the adaptive-parameter audit snapshot for this run.
    pub fn attach_adaptive(&mut self, snapshot: AdaptiveSnapshot) -> CoreResult<()> {
        let run = self.active.as_mut().ok_or(CoreError::NotStarted)?;
        run.adaptive = Some(snapshot);
        Ok(())
    }

    /// Freeze the run: compute its aggregate, persist the record under
    /// `output_dir/{run_id}.json` (creating the directory if absent), and
    /// return the record plus its storage path.
    ///
    /// The recorder goes idle afterwards; a new [`start`](Self::start) is
    /// required before further recording.
    pub fn finalize(&mut self, output_dir: &Path) -> CoreResult<FinalizedRun> {
        let run = self.active.take().ok_or(CoreError::NotStarted)?;

        let events: Vec<UnitEvent> = run.units.into_values().collect();
        let aggregate = aggregate_events(&events);

        let record = RunRecord {
            run_id: run.run_id,
            project_id: run.project_id,
            started_at: run.started_at,
            unit_range: run.unit_range,
            events,
            aggregate: Some(aggregate),
            adaptive: run.adaptive,
        };

        let path = storage::run_record_path(output_dir, &record.run_id);
        storage::write_json(&path, &record)?;

        info!(
            run_id = %record.run_id,
            project_id = %record.project_id,
            path = %path.display(),
            health_score = record.aggregate.as_ref().map(|a| a.health_score),
            "finalized run record"
        );

        Ok(FinalizedRun { record, path })
    }
}
