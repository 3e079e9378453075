mod ballot;
mod candidate;
mod measure;
mod real_type;
mod vote;

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use ballot::Ballot;
pub use candidate::{AnyCandidate, Candidate, PersonCandidate};
pub use measure::{AnyMeasure, DormMeasure, Measure};
pub use real_type::{CandidateType, MeasureType, RealType};
pub use vote::{PopularityVote, Selection, Vote};

// Storage-assigned row ids.
macro_rules! row_id {
    ($name:ident) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
        )]
        #[serde(transparent)]
        #[sqlx(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

row_id!(MeasureId);
row_id!(BallotId);
row_id!(CandidateId);
row_id!(VoteId);
row_id!(PopularityVoteId);

/// An account owned by the identity provider.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct UserId(pub Uuid);

impl UserId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A dorm owned by the organization records.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct DormId(pub Uuid);

impl DormId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DormId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DormId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Rejects empty values and values longer than `max` characters.
pub(crate) fn check_text(field: &str, value: &str, max: usize) -> crate::Result<()> {
    if value.trim().is_empty() {
        return Err(crate::Error::Validation(format!("{} must not be empty", field)));
    }
    check_len(field, value, max)
}

pub(crate) fn check_len(field: &str, value: &str, max: usize) -> crate::Result<()> {
    let len = value.chars().count();
    if len > max {
        return Err(crate::Error::Validation(format!(
            "{} must be at most {} characters, got {}",
            field, max, len
        )));
    }
    Ok(())
}
