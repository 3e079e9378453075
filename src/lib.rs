//! Data model for campus elections: dorms hold measures, measures contain
//! ballots, ballots list candidates, and students cast votes.
//!
//! `Measure` and `Candidate` are polymorphic. Each base row carries a
//! write-once tag naming its concrete type, and `cast` resolves a base
//! record to [`AnyMeasure`] or [`AnyCandidate`].
pub mod config;
pub mod db;
pub mod directory;
pub mod error;
pub mod models;

pub use config::Config;
pub use db::Database;
pub use directory::{User, UserDirectory};
pub use error::{Error, Result};
pub use models::{
    AnyCandidate, AnyMeasure, Ballot, BallotId, Candidate, CandidateId, CandidateType, DormId,
    DormMeasure, Measure, MeasureId, MeasureType, PersonCandidate, PopularityVote,
    PopularityVoteId, RealType, Selection, UserId, Vote, VoteId,
};
