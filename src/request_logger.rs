use rocket::fairing::{Fairing, Info, Kind};
use rocket::{Data, Request, Response};
use std::time::Instant;

/// Start time of a request, kept in the request-local cache.
struct RequestStart(Instant);

/// Fairing logging one line per HTTP request with its route and timing.
///
/// Health probes are logged at debug level.
pub struct RequestLogger;

#[rocket::async_trait]
impl Fairing for RequestLogger {
    fn info(&self) -> Info {
        Info {
            name: "Request Logger",
            kind: Kind::Request | Kind::Response,
        }
    }

    async fn on_request(&self, request: &mut Request<'_>, _: &mut Data<'_>) {
        request.local_cache(|| RequestStart(Instant::now()));
    }

    async fn on_response<'r>(&self, request: &'r Request<'_>, response: &mut Response<'r>) {
        let RequestStart(started) = request.local_cache(|| RequestStart(Instant::now()));
        let millis = started.elapsed().as_secs_f64() * 1000.0;
        let route = request
            .route()
            .and_then(|route| route.name.as_deref())
            .unwrap_or("-");

        let level = if request.uri().path().as_str().ends_with("/health") {
            log::Level::Debug
        } else {
            log::Level::Info
        };
        log::log!(
            level,
            "{} {} [{}] -> {} ({:.2}ms)",
            request.method(),
            request.uri(),
            route,
            response.status().code,
            millis
        );
    }
}
