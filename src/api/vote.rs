use log::info;
use rocket::{form::Form, response::content::RawHtml, Route, State};

use crate::{
    error::Result,
    model::{
        view,
        vote::{Ballot, VoteRecord},
        voter::VoterId,
    },
    queue::{Queue, VOTES},
    Config,
};

pub fn routes() -> Vec<Route> {
    routes![index, cast]
}

#[get("/")]
pub async fn index(_voter: VoterId, config: &State<Config>) -> RawHtml<String> {
    view::render(config.options(), config.hostname(), None)
}

/// Queue the requester's vote and show it back to them.
/// Every accepted submission is queued, including repeats from the same voter.
#[post("/", data = "<ballot>")]
pub async fn cast(
    voter: VoterId,
    ballot: Form<Ballot>,
    config: &State<Config>,
    queue: &State<Queue>,
) -> Result<RawHtml<String>> {
    let choice = ballot.choice()?;
    info!("Received vote for {choice}");

    let record = VoteRecord::new(voter, choice);
    queue.append(VOTES, record.to_payload()?).await?;

    Ok(view::render(config.options(), config.hostname(), Some(choice)))
}
