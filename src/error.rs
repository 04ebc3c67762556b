use log::{error, warn};
use rocket::{
    http::{Status, StatusClass},
    response::Responder,
    serde::json::serde_json,
};
use thiserror::Error;

use crate::queue::QueueError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error(transparent)]
    Queue(#[from] QueueError),
    #[error("Failed to encode vote: {0}")]
    Encode(#[from] serde_json::Error),
}

impl Error {
    /// The status this error is reported to the requester as.
    pub fn status(&self) -> Status {
        match self {
            Self::BadRequest(_) => Status::BadRequest,
            Self::Queue(_) => Status::ServiceUnavailable,
            Self::Encode(_) => Status::InternalServerError,
        }
    }
}

impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    fn respond_to(self, _: &'r rocket::Request<'_>) -> rocket::response::Result<'o> {
        let status = self.status();
        match status.class() {
            StatusClass::ServerError => error!("{self}"),
            _ => warn!("{self}"),
        }
        Err(status)
    }
}
