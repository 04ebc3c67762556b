use std::convert::Infallible;
use std::fmt::{Display, Formatter};

use rocket::{
    http::{Cookie, SameSite},
    request::{self, FromRequest},
    time::Duration,
    Request, State,
};
use serde::{Deserialize, Serialize};

use crate::Config;

pub const VOTER_ID_COOKIE: &str = "voter_id";

/// An anonymous voter identity, held by the client in the [`VOTER_ID_COOKIE`] cookie.
///
/// Any non-empty value the client presents is taken at face value. The id
/// only correlates submissions from one browser; it authenticates nothing and
/// is never stored server-side.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VoterId(String);

impl VoterId {
    /// Mint a fresh identity from 64 random bits, as 16 lowercase hex digits.
    pub fn random() -> Self {
        Self(format!("{:016x}", rand::random::<u64>()))
    }

    /// Reuse the client's token if it has a non-empty one, otherwise mint a new identity.
    pub fn resolve(existing: Option<&str>) -> Self {
        match existing {
            Some(token) if !token.is_empty() => Self(token.to_string()),
            _ => Self::random(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The cookie handing this identity back to the client, valid for `ttl` from now.
    pub fn to_cookie(&self, ttl: Duration) -> Cookie<'static> {
        Cookie::build((VOTER_ID_COOKIE, self.0.clone()))
            .path("/")
            .max_age(ttl)
            .same_site(SameSite::Lax)
            .build()
    }
}

impl Display for VoterId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for VoterId {
    type Error = Infallible;

    /// Resolve the requester's identity and (re)issue its cookie, refreshing the lifetime
    /// whether or not the id was freshly minted.
    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let config = req.guard::<&State<Config>>().await.unwrap(); // Valid as `Config` is always managed

        let cookies = req.cookies();
        let voter = VoterId::resolve(cookies.get(VOTER_ID_COOKIE).map(|c| c.value()));
        cookies.add(voter.to_cookie(config.voter_ttl()));

        request::Outcome::Success(voter)
    }
}
