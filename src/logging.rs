use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicUsize, Ordering};

use log::{error, info, warn};
use rocket::{
    fairing::{Fairing, Info, Kind},
    http::{Method, Status, StatusClass},
    Data, Orbit, Request, Response, Rocket,
};

use crate::model::{vote::Choice, voter::VOTER_ID_COOKIE};
use crate::Config;

/// Tags the log lines belonging to one request.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd)]
pub struct RequestId(pub usize);

impl Display for RequestId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl RequestId {
    /// Atomically get the next ID, wrapping back to zero on overflow.
    pub fn next() -> RequestId {
        static REQUEST_ID_COUNTER: AtomicUsize = AtomicUsize::new(0);
        RequestId(REQUEST_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// What happened to a submitted ballot, judged from the response status.
/// Requests other than a submission have no outcome.
pub fn vote_outcome(method: Method, status: Status) -> Option<&'static str> {
    if method != Method::Post {
        return None;
    }
    Some(match status.class() {
        StatusClass::Success => "vote queued",
        StatusClass::ClientError => "vote rejected",
        StatusClass::ServerError => "vote not recorded",
        _ => return None,
    })
}

/// Logs launch, shutdown, and a line for each request and response.
/// Response lines name the voter and, for submissions, the ballot's outcome.
#[derive(Debug, Copy, Clone)]
pub struct LoggerFairing;

#[rocket::async_trait]
impl Fairing for LoggerFairing {
    fn info(&self) -> Info {
        Info {
            name: "Logger",
            kind: Kind::Liftoff | Kind::Request | Kind::Response | Kind::Shutdown,
        }
    }

    async fn on_liftoff(&self, rocket: &Rocket<Orbit>) {
        let protocol = if rocket.config().tls_enabled() {
            "https"
        } else {
            "http"
        };
        let ip = &rocket.config().address;
        let port = &rocket.config().port;
        match rocket.state::<Config>() {
            Some(config) => info!(
                "Accepting votes for {} vs {} on {protocol}://{ip}:{port}",
                config.options().label(Choice::A),
                config.options().label(Choice::B)
            ),
            None => info!("Accepting votes on {protocol}://{ip}:{port}"),
        }
    }

    async fn on_request(&self, req: &mut Request<'_>, _data: &mut Data<'_>) {
        let id = req.local_cache(RequestId::next);
        info!("->req{id} {} {}", req.method(), req.uri());
    }

    async fn on_response<'r>(&self, req: &'r Request<'_>, res: &mut Response<'r>) {
        let id = req.local_cache(RequestId::next);
        let code = res.status();
        let route = req
            .route()
            .map(|r| match r.name {
                Some(ref name) => format!("{name} ({})", r.uri),
                None => r.uri.to_string(),
            })
            .unwrap_or_else(|| "UNKNOWN ROUTE".to_string());
        let voter = req
            .cookies()
            .get_pending(VOTER_ID_COOKIE)
            .map(|c| c.value().to_string())
            .unwrap_or_else(|| "-".to_string());
        let log_msg = match vote_outcome(req.method(), code) {
            Some(outcome) => format!("<-rsp{id} {code} {route} voter={voter}: {outcome}"),
            None => format!("<-rsp{id} {code} {route} voter={voter}"),
        };
        match code.class() {
            StatusClass::ServerError => error!("{log_msg}"),
            StatusClass::ClientError => warn!("{log_msg}"),
            _ => info!("{log_msg}"),
        }
    }

    async fn on_shutdown(&self, _rocket: &Rocket<Orbit>) {
        warn!("Shutdown requested, releasing the queue connection and stopping...");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_ids_increase() {
        let first = RequestId::next();
        let second = RequestId::next();
        assert!(second > first);
        assert_eq!(format!("{}", first.0), first.to_string());
    }

    #[test]
    fn submissions_have_outcomes() {
        assert_eq!(Some("vote queued"), vote_outcome(Method::Post, Status::Ok));
        assert_eq!(
            Some("vote rejected"),
            vote_outcome(Method::Post, Status::BadRequest)
        );
        assert_eq!(
            Some("vote not recorded"),
            vote_outcome(Method::Post, Status::ServiceUnavailable)
        );
    }

    #[test]
    fn page_views_have_no_outcome() {
        assert_eq!(None, vote_outcome(Method::Get, Status::Ok));
        assert_eq!(None, vote_outcome(Method::Get, Status::NotFound));
        assert_eq!(None, vote_outcome(Method::Post, Status::SeeOther));
    }
}
