//! Write-once subtype tags for the polymorphic record families.
//!
//! A base row (`measures`, `candidates`) stores the tag of the concrete type
//! that created it. Reads against the base table only ever produce base
//! records; the tag tells `cast` which subtype table to join.
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub trait RealType: Copy + Eq + fmt::Debug + 'static {
    /// Name of the family, used in error messages.
    const FAMILY: &'static str;
    /// Every tag this build knows about.
    const ALL: &'static [Self];

    /// The discriminant as stored in the database.
    fn as_str(self) -> &'static str;

    /// Fails with `NotFound` for tags written by a schema that had types
    /// this build no longer has.
    fn parse(tag: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == tag)
            .ok_or_else(|| Error::NotFound(format!("{} type '{}' no longer exists", Self::FAMILY, tag)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeasureType {
    Measure,
    DormMeasure,
}

impl RealType for MeasureType {
    const FAMILY: &'static str = "measure";
    const ALL: &'static [Self] = &[MeasureType::Measure, MeasureType::DormMeasure];

    fn as_str(self) -> &'static str {
        match self {
            MeasureType::Measure => "measure",
            MeasureType::DormMeasure => "dorm_measure",
        }
    }
}

impl fmt::Display for MeasureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateType {
    Candidate,
    PersonCandidate,
}

impl RealType for CandidateType {
    const FAMILY: &'static str = "candidate";
    const ALL: &'static [Self] = &[CandidateType::Candidate, CandidateType::PersonCandidate];

    fn as_str(self) -> &'static str {
        match self {
            CandidateType::Candidate => "candidate",
            CandidateType::PersonCandidate => "person_candidate",
        }
    }
}

impl fmt::Display for CandidateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
