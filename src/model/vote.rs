use std::fmt::{Display, Formatter};
use std::str::FromStr;

use rocket::serde::json::serde_json;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{Error, Result};

use super::voter::VoterId;

/// One of the two options on the ballot, identified by its key.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Choice {
    #[serde(rename = "a")]
    A,
    #[serde(rename = "b")]
    B,
}

impl Choice {
    /// The key submitted in forms and written to the queue.
    pub fn key(self) -> &'static str {
        match self {
            Self::A => "a",
            Self::B => "b",
        }
    }
}

impl Display for Choice {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown option {0:?}, expected \"a\" or \"b\"")]
pub struct UnknownChoice(String);

impl FromStr for Choice {
    type Err = UnknownChoice;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "a" => Ok(Self::A),
            "b" => Ok(Self::B),
            other => Err(UnknownChoice(other.to_string())),
        }
    }
}

/// A vote submission form.
#[derive(Debug, FromForm)]
pub struct Ballot {
    vote: Option<String>,
}

impl Ballot {
    /// The option this ballot was cast for.
    pub fn choice(&self) -> Result<Choice> {
        let vote = self
            .vote
            .as_deref()
            .ok_or_else(|| Error::BadRequest("Missing `vote` field".to_string()))?;
        vote.parse()
            .map_err(|e: UnknownChoice| Error::BadRequest(e.to_string()))
    }
}

/// A single accepted vote, as handed to the tally queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRecord {
    voter_id: VoterId,
    vote: Choice,
}

impl VoteRecord {
    pub fn new(voter_id: VoterId, vote: Choice) -> Self {
        Self { voter_id, vote }
    }

    pub fn voter_id(&self) -> &VoterId {
        &self.voter_id
    }

    pub fn vote(&self) -> Choice {
        self.vote
    }

    /// Encode as `{"voter_id": ..., "vote": ...}`, the format the tally worker reads.
    pub fn to_payload(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}
