use std::fmt;
use std::ops::{Deref, DerefMut};

use serde::Serialize;

use super::{check_len, BallotId, CandidateId, CandidateType, RealType, UserId};
use crate::error::Result;

pub const MAX_TITLE_LEN: usize = 200;

/// Something a voter can pick on a ballot: a person, a proposition, a
/// funding request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Candidate {
    pub(crate) id: Option<CandidateId>,
    /// Stored discriminant, kept verbatim like `Measure::real_type`.
    pub(crate) real_type: String,
    pub ballot: BallotId,
    pub description: Option<String>,
    pub title: Option<String>,
}

impl Candidate {
    pub fn new(ballot: BallotId, title: impl Into<String>) -> Self {
        let mut candidate = Self::with_type(CandidateType::Candidate, ballot);
        candidate.title = Some(title.into());
        candidate
    }

    fn with_type(real_type: CandidateType, ballot: BallotId) -> Self {
        Self {
            id: None,
            real_type: real_type.as_str().to_string(),
            ballot,
            description: None,
            title: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn id(&self) -> Option<CandidateId> {
        self.id
    }

    /// Fails with `NotFound` when the stored tag names a type that no
    /// longer exists.
    pub fn real_type(&self) -> Result<CandidateType> {
        CandidateType::parse(&self.real_type)
    }

    pub fn real_type_tag(&self) -> &str {
        &self.real_type
    }

    pub(crate) fn validate(&self) -> Result<()> {
        match &self.title {
            Some(title) => check_len("candidate title", title, MAX_TITLE_LEN),
            None => Ok(()),
        }
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title.as_deref().unwrap_or(""))
    }
}

/// A candidate standing for a user account. Its title is overwritten with
/// the user's full name on every save, so it goes stale if the user is
/// renamed later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PersonCandidate {
    #[serde(flatten)]
    pub candidate: Candidate,
    pub user: Option<UserId>,
}

impl PersonCandidate {
    pub fn new(ballot: BallotId, user: UserId) -> Self {
        Self {
            candidate: Candidate::with_type(CandidateType::PersonCandidate, ballot),
            user: Some(user),
        }
    }
}

impl Deref for PersonCandidate {
    type Target = Candidate;

    fn deref(&self) -> &Self::Target {
        &self.candidate
    }
}

impl DerefMut for PersonCandidate {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.candidate
    }
}

/// The most-derived form of a candidate, as returned by `cast`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum AnyCandidate {
    Candidate(Candidate),
    PersonCandidate(PersonCandidate),
}

impl AnyCandidate {
    pub fn base(&self) -> &Candidate {
        match self {
            AnyCandidate::Candidate(c) => c,
            AnyCandidate::PersonCandidate(p) => &p.candidate,
        }
    }

    pub fn id(&self) -> Option<CandidateId> {
        self.base().id()
    }

    pub fn real_type(&self) -> CandidateType {
        match self {
            AnyCandidate::Candidate(_) => CandidateType::Candidate,
            AnyCandidate::PersonCandidate(_) => CandidateType::PersonCandidate,
        }
    }

    pub fn as_person(&self) -> Option<&PersonCandidate> {
        match self {
            AnyCandidate::PersonCandidate(p) => Some(p),
            AnyCandidate::Candidate(_) => None,
        }
    }
}

impl fmt::Display for AnyCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self.base(), f)
    }
}
