//! Per-unit telemetry recorded during a generation run.
//!
//! A run is a contiguous range of generated units (episodes). Each unit
//! reports exactly one [`UnitEvent`], which may be amended in place by index
//! before the run is finalized; amendments are explicit field-level patches
//! with override-or-keep semantics, never whole-event replacement.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::aggregate::RunAggregate;
use super::policy::AdaptiveSnapshot;

/// Narrative pattern assigned to a generated unit.
///
/// Adjacent units are expected to vary their pattern; two same-pattern
/// neighbors trip the consecutive-repeat invariant at aggregation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenePattern {
    Dialogue,
    Action,
    Reflection,
    Revelation,
    Transition,
}

impl ScenePattern {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dialogue => "dialogue",
            Self::Action => "action",
            Self::Reflection => "reflection",
            Self::Revelation => "revelation",
            Self::Transition => "transition",
        }
    }
}

/// Cadence marker for a unit's beat frequency.
///
/// Absent cadence is treated as [`CadenceTag::Normal`] during aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CadenceTag {
    Normal,
    Spike,
}

impl CadenceTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Spike => "spike",
        }
    }
}

/// Outcome of a unit's own content validation.
///
/// A failed validation is data on the event, never an error to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub passed: bool,
    #[serde(default)]
    pub errors: Vec<String>,
}

impl ValidationOutcome {
    /// A passing validation with no findings.
    pub fn passing() -> Self {
        Self {
            passed: true,
            errors: Vec::new(),
        }
    }

    /// A failed validation carrying its reasons.
    pub fn failed(errors: Vec<String>) -> Self {
        Self {
            passed: false,
            errors,
        }
    }
}

impl Default for ValidationOutcome {
    fn default() -> Self {
        Self::passing()
    }
}

/// Post-hoc reviewer signals attached after generation.
///
/// `Some(false)` on either flag means the reviewer explicitly judged the
/// unit weak on that axis; `None` means the signal was never collected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostHocSignals {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concreteness: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consequence: Option<bool>,
}

/// One generation unit's telemetry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitEvent {
    /// Ordinal index of the unit within the run.
    pub index: u32,
    /// Classification pattern; may be absent on partial out-of-order writes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<ScenePattern>,
    /// Cadence tag; absent means normal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cadence: Option<CadenceTag>,
    /// Optional pressure/category tag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pressure: Option<String>,
    /// Retries the unit needed before its content was accepted.
    #[serde(default)]
    pub retries: u32,
    /// Content validation result.
    #[serde(default)]
    pub validation: ValidationOutcome,
    /// Post-hoc reviewer signals, when collected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_hoc: Option<PostHocSignals>,
}

impl UnitEvent {
    /// A fresh event for a unit index with all defaults.
    pub fn new(index: u32) -> Self {
        Self {
            index,
            pattern: None,
            cadence: None,
            pressure: None,
            retries: 0,
            validation: ValidationOutcome::passing(),
            post_hoc: None,
        }
    }
}

/// Field-level patch applied when a unit is reported or re-reported.
///
/// `None` fields keep whatever the previous write recorded for that index
/// (or the default when the index is new). The last write wins per field,
/// which makes recording idempotent under retries and out-of-order
/// delivery.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnitEventPatch {
    pub index: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<ScenePattern>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cadence: Option<CadenceTag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pressure: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retries: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationOutcome>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_hoc: Option<PostHocSignals>,
}

impl UnitEventPatch {
    /// An empty patch for a unit index.
    pub fn new(index: u32) -> Self {
        Self {
            index,
            ..Self::default()
        }
    }

    pub fn with_pattern(mut self, pattern: ScenePattern) -> Self {
        self.pattern = Some(pattern);
        self
    }

    pub fn with_cadence(mut self, cadence: CadenceTag) -> Self {
        self.cadence = Some(cadence);
        self
    }

    pub fn with_pressure(mut self, pressure: impl Into<String>) -> Self {
        self.pressure = Some(pressure.into());
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = Some(retries);
        self
    }

    pub fn with_validation(mut self, validation: ValidationOutcome) -> Self {
        self.validation = Some(validation);
        self
    }

    pub fn with_post_hoc(mut self, signals: PostHocSignals) -> Self {
        self.post_hoc = Some(signals);
        self
    }

    /// Materialize the patch as a brand-new event for its index.
    pub fn into_event(self) -> UnitEvent {
        let mut event = UnitEvent::new(self.index);
        self.apply(&mut event);
        event
    }

    /// Apply the patch onto an existing event: present fields override,
    /// absent fields keep the prior value.
    pub fn apply(self, event: &mut UnitEvent) {
        if let Some(pattern) = self.pattern {
            event.pattern = Some(pattern);
        }
        if let Some(cadence) = self.cadence {
            event.cadence = Some(cadence);
        }
        if let Some(pressure) = self.pressure {
            event.pressure = Some(pressure);
        }
        if let Some(retries) = self.retries {
            event.retries = retries;
        }
        if let Some(validation) = self.validation {
            event.validation = validation;
        }
        if let Some(post_hoc) = self.post_hoc {
            event.post_hoc = Some(post_hoc);
        }
    }
}

/// Inclusive unit-index range covered by a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitRange {
    pub start: u32,
    pub end: u32,
}

impl UnitRange {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }
}

/// One complete generation run: identity, ordered unit events, and (once
/// finalized) the derived aggregate plus an optional adaptive-parameter
/// audit snapshot.
///
/// Run records are append-only in practice: persisted once at finalization
/// and never edited afterwards, only archived by the promotion gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: String,
    pub project_id: String,
    pub started_at: DateTime<Utc>,
    pub unit_range: UnitRange,
    /// Unit events ordered by index.
    pub events: Vec<UnitEvent>,
    /// Derived statistics; present once the run is finalized.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregate: Option<RunAggregate>,
    /// Audit snapshot of the adaptive parameters used for the run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adaptive: Option<AdaptiveSnapshot>,
}
