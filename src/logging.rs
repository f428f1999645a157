use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use rocket::{
    fairing::{Fairing, Info, Kind},
    http::StatusClass,
    request::{FromRequest, Outcome},
    Data, Orbit, Request, Response, Rocket,
};

/// Identity and timing of an in-flight request.
#[derive(Debug, Copy, Clone)]
pub struct RequestMeta {
    id: usize,
    started: Instant,
}

impl RequestMeta {
    /// Stamp a new request. IDs are sequential and wrap around back to zero
    /// if you somehow exceed a usize.
    fn next() -> RequestMeta {
        static NEXT_ID: AtomicUsize = AtomicUsize::new(0);
        RequestMeta {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            started: Instant::now(),
        }
    }

    /// Milliseconds since the request was stamped.
    pub fn elapsed_ms(&self) -> u128 {
        self.started.elapsed().as_millis()
    }
}

impl Display for RequestMeta {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id)
    }
}

/// Allow handlers to tag their own log lines with the current request.
#[rocket::async_trait]
impl<'r> FromRequest<'r> for &'r RequestMeta {
    type Error = std::convert::Infallible;

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        Outcome::Success(req.local_cache(RequestMeta::next))
    }
}

/// A rocket fairing that logs every request and response.
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
        info!("Survey server ready on {protocol}://{ip}:{port}");
    }

    async fn on_request(&self, req: &mut Request<'_>, _data: &mut Data<'_>) {
        let meta = req.local_cache(RequestMeta::next);
        info!("->req{meta} {} {}", req.method(), req.uri());
    }

    async fn on_response<'r>(&self, req: &'r Request<'_>, res: &mut Response<'r>) {
        let meta = req.local_cache(RequestMeta::next);
        let code = res.status();
        let route = match req.route() {
            Some(route) => match &route.name {
                Some(name) => format!("{name} ({})", route.uri),
                None => route.uri.to_string(),
            },
            None => "no matching route".to_string(),
        };
        // Escalate the log level with the status class.
        let log_msg = format!("<-rsp{meta} {code} {route} in {}ms", meta.elapsed_ms());
        match code.class() {
            StatusClass::ServerError => error!("{log_msg}"),
            StatusClass::ClientError => warn!("{log_msg}"),
            _ => info!("{log_msg}"),
        }
    }

    async fn on_shutdown(&self, _rocket: &Rocket<Orbit>) {
        warn!("Shutdown requested, draining in-flight requests");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_ids_increase() {
        // Other tests share the counter, so only relative order is stable.
        let first = RequestMeta::next();
        let second = RequestMeta::next();
        assert!(second.id > first.id);
        assert_eq!(format!("{first}"), first.id.to_string());
    }
}
