use std::fmt;

use serde::{Deserialize, Serialize};

use super::{check_text, BallotId, MeasureId};
use crate::error::Result;

pub const MAX_TITLE_LEN: usize = 50;

/// One decision within a measure, e.g. the race for president.
///
/// Inside a measure both `display_position` and `title` are unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ballot {
    pub(crate) id: Option<BallotId>,
    /// Only `None` before the ballot is attached to a measure.
    pub measure: Option<MeasureId>,
    pub display_position: i64,
    pub title: String,
    pub blurb: String,
    /// Whether a free-text selection may stand in for a candidate.
    pub can_write_in: bool,
    pub is_secret: bool,
}

impl Ballot {
    pub fn new(measure: MeasureId, title: impl Into<String>, blurb: impl Into<String>) -> Self {
        Self {
            id: None,
            measure: Some(measure),
            display_position: 1,
            title: title.into(),
            blurb: blurb.into(),
            can_write_in: false,
            is_secret: true,
        }
    }

    pub fn at_position(mut self, display_position: i64) -> Self {
        self.display_position = display_position;
        self
    }

    pub fn id(&self) -> Option<BallotId> {
        self.id
    }

    pub(crate) fn validate(&self) -> Result<()> {
        check_text("ballot title", &self.title, MAX_TITLE_LEN)
    }
}

impl fmt::Display for Ballot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id {
            Some(id) => write!(f, "Ballot #{}: {}", id, self.title),
            None => write!(f, "Ballot: {}", self.title),
        }
    }
}
