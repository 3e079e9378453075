use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{check_len, Ballot, BallotId, CandidateId, MeasureId, PopularityVoteId, UserId, VoteId};
use crate::error::{Error, Result};

pub const MAX_WRITE_IN_LEN: usize = 50;

/// A voter's participation in one measure. At most one exists per
/// `(account, measure)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub id: VoteId,
    pub account: Option<UserId>,
    pub measure: MeasureId,
    pub cast_at: DateTime<Utc>,
}

impl fmt::Display for Vote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.account {
            Some(account) => write!(f, "{} in measure #{}", account, self.measure),
            None => write!(f, "anonymous in measure #{}", self.measure),
        }
    }
}

/// What a voter picked on a ballot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Selection {
    Candidate(CandidateId),
    WriteIn(String),
}

impl Selection {
    pub(crate) fn validate(&self) -> Result<()> {
        match self {
            Selection::Candidate(_) => Ok(()),
            Selection::WriteIn(value) => check_len("write-in value", value, MAX_WRITE_IN_LEN),
        }
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selection::Candidate(id) => write!(f, "candidate #{}", id),
            Selection::WriteIn(value) => write!(f, "write-in '{}'", value),
        }
    }
}

/// The selection made on one ballot within a vote.
///
/// Storage keeps `candidate` and `write_in_value` as two nullable columns and
/// does not require exactly one of them, so records written by other tools
/// may have neither or both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopularityVote {
    pub id: PopularityVoteId,
    pub vote: VoteId,
    pub ballot: BallotId,
    pub candidate: Option<CandidateId>,
    pub write_in_value: Option<String>,
}

impl PopularityVote {
    /// `None` unless exactly one of the two columns is set.
    pub fn selection(&self) -> Option<Selection> {
        match (&self.candidate, &self.write_in_value) {
            (Some(id), None) => Some(Selection::Candidate(*id)),
            (None, Some(value)) => Some(Selection::WriteIn(value.clone())),
            _ => None,
        }
    }

    /// Checks this record against the ballot it was cast on: it must belong
    /// to that ballot, hold exactly one selection, and only use a write-in
    /// when the ballot allows one. Nothing in the store calls this; it is
    /// for the submission layer to apply if it wants these rules.
    pub fn check_against(&self, ballot: &Ballot) -> Result<()> {
        if ballot.id() != Some(self.ballot) {
            return Err(Error::Validation(format!(
                "popularity vote #{} is for ballot #{}, not {}",
                self.id, self.ballot, ballot
            )));
        }
        match self.selection() {
            None => Err(Error::Validation(format!(
                "popularity vote #{} must have exactly one of candidate or write-in",
                self.id
            ))),
            Some(Selection::WriteIn(_)) if !ballot.can_write_in => Err(Error::Validation(format!(
                "{} does not accept write-ins",
                ballot
            ))),
            Some(_) => Ok(()),
        }
    }
}

impl fmt::Display for PopularityVote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let votee = match (&self.candidate, &self.write_in_value) {
            (Some(id), _) => format!("candidate #{}", id),
            (None, Some(value)) => value.clone(),
            (None, None) => "nobody".to_string(),
        };
        write!(f, "vote #{} (ballot #{}) for {}", self.vote, self.ballot, votee)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(candidate: Option<i64>, write_in: Option<&str>) -> PopularityVote {
        PopularityVote {
            id: PopularityVoteId(1),
            vote: VoteId(2),
            ballot: BallotId(3),
            candidate: candidate.map(CandidateId),
            write_in_value: write_in.map(str::to_string),
        }
    }

    fn ballot(can_write_in: bool) -> Ballot {
        let mut ballot = Ballot::new(MeasureId(1), "President", "");
        ballot.id = Some(BallotId(3));
        ballot.can_write_in = can_write_in;
        ballot
    }

    #[test]
    fn selection_requires_exactly_one_column() {
        assert_eq!(record(Some(5), None).selection(), Some(Selection::Candidate(CandidateId(5))));
        assert_eq!(
            record(None, Some("Mr. Bones")).selection(),
            Some(Selection::WriteIn("Mr. Bones".to_string()))
        );
        assert_eq!(record(None, None).selection(), None);
        assert_eq!(record(Some(5), Some("Mr. Bones")).selection(), None);
    }

    #[test]
    fn write_in_needs_permission() {
        let write_in = record(None, Some("Mr. Bones"));
        assert!(matches!(write_in.check_against(&ballot(false)), Err(Error::Validation(_))));
        assert!(write_in.check_against(&ballot(true)).is_ok());
        assert!(record(Some(5), None).check_against(&ballot(false)).is_ok());
    }

    #[test]
    fn malformed_and_misplaced_records_fail_check() {
        assert!(record(None, None).check_against(&ballot(true)).is_err());

        let mut other = ballot(true);
        other.id = Some(BallotId(99));
        assert!(record(Some(5), None).check_against(&other).is_err());
    }

    #[test]
    fn display_prefers_candidate() {
        assert_eq!(record(Some(5), None).to_string(), "vote #2 (ballot #3) for candidate #5");
        assert_eq!(record(None, Some("Mr. Bones")).to_string(), "vote #2 (ballot #3) for Mr. Bones");
    }

    #[test]
    fn vote_display_names_account_and_measure() {
        let account = UserId(uuid::Uuid::nil());
        let mut vote = Vote {
            id: VoteId(7),
            account: Some(account),
            measure: MeasureId(4),
            cast_at: chrono::Utc::now(),
        };
        assert_eq!(vote.to_string(), format!("{} in measure #4", account));
        vote.account = None;
        assert_eq!(vote.to_string(), "anonymous in measure #4");
    }

    #[test]
    fn long_write_in_rejected() {
        let selection = Selection::WriteIn("w".repeat(MAX_WRITE_IN_LEN + 1));
        assert!(selection.validate().is_err());
    }
}
