use std::ops::{Deref, DerefMut};

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{check_text, DormId, MeasureId, MeasureType, RealType};
use crate::error::Result;

pub const MAX_NAME_LEN: usize = 50;

/// A named collection of ballots with its own voting window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Measure {
    pub(crate) id: Option<MeasureId>,
    /// Stored discriminant, kept verbatim so rows written with a type this
    /// build no longer has still read back as base records.
    pub(crate) real_type: String,
    pub name: String,
    pub summary: Option<String>,
    pub vote_start: DateTime<Utc>,
    pub vote_end: DateTime<Utc>,
    /// Administrative switch. Independent of the voting window.
    pub is_open: bool,
}

impl Measure {
    pub fn new(name: impl Into<String>, vote_start: DateTime<Utc>, vote_end: DateTime<Utc>) -> Self {
        Self::with_type(MeasureType::Measure, name.into(), vote_start, vote_end)
    }

    fn with_type(
        real_type: MeasureType,
        name: String,
        vote_start: DateTime<Utc>,
        vote_end: DateTime<Utc>,
    ) -> Self {
        Self {
            id: None,
            real_type: real_type.as_str().to_string(),
            name,
            summary: None,
            vote_start,
            vote_end,
            is_open: true,
        }
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    /// `None` until the first save.
    pub fn id(&self) -> Option<MeasureId> {
        self.id
    }

    /// The concrete type this measure was created as. Fails with
    /// `NotFound` when the stored tag names a type that no longer exists.
    pub fn real_type(&self) -> Result<MeasureType> {
        MeasureType::parse(&self.real_type)
    }

    /// The tag exactly as stored.
    pub fn real_type_tag(&self) -> &str {
        &self.real_type
    }

    /// Whether `now` falls in `[vote_start, vote_end)`. This says nothing
    /// about `is_open`.
    pub fn is_within_window(&self, now: DateTime<Utc>) -> bool {
        self.vote_start <= now && now < self.vote_end
    }

    pub(crate) fn validate(&self) -> Result<()> {
        check_text("measure name", &self.name, MAX_NAME_LEN)
    }
}

/// A measure run by a single dorm. `(dorm, number)` is unique.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DormMeasure {
    #[serde(flatten)]
    pub measure: Measure,
    pub dorm: DormId,
    pub number: i64,
}

impl DormMeasure {
    pub fn new(
        name: impl Into<String>,
        vote_start: DateTime<Utc>,
        vote_end: DateTime<Utc>,
        dorm: DormId,
        number: i64,
    ) -> Self {
        Self {
            measure: Measure::with_type(MeasureType::DormMeasure, name.into(), vote_start, vote_end),
            dorm,
            number,
        }
    }
}

impl Deref for DormMeasure {
    type Target = Measure;

    fn deref(&self) -> &Self::Target {
        &self.measure
    }
}

impl DerefMut for DormMeasure {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.measure
    }
}

/// The most-derived form of a measure, as returned by `cast`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AnyMeasure {
    Measure(Measure),
    DormMeasure(DormMeasure),
}

impl AnyMeasure {
    pub fn base(&self) -> &Measure {
        match self {
            AnyMeasure::Measure(m) => m,
            AnyMeasure::DormMeasure(d) => &d.measure,
        }
    }

    pub fn id(&self) -> Option<MeasureId> {
        self.base().id()
    }

    pub fn real_type(&self) -> MeasureType {
        match self {
            AnyMeasure::Measure(_) => MeasureType::Measure,
            AnyMeasure::DormMeasure(_) => MeasureType::DormMeasure,
        }
    }

    pub fn as_dorm_measure(&self) -> Option<&DormMeasure> {
        match self {
            AnyMeasure::DormMeasure(d) => Some(d),
            AnyMeasure::Measure(_) => None,
        }
    }
}

impl std::fmt::Display for Measure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}
