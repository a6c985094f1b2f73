use rocket::fairing::{Fairing, Info, Kind};
use rocket::{Data, Request, Response};
use std::time::Instant;

/// Fairing to log one line per HTTP request with timing.
///
/// Health checks log at `debug` so orchestrator polling does not drown out
/// import traffic; server errors log at `warn`.
pub struct RequestLogger;

fn is_health_check(path: &str) -> bool {
    path.starts_with("/api/v1/health/")
}

#[rocket::async_trait]
impl Fairing for RequestLogger {
    fn info(&self) -> Info {
        Info {
            name: "Request Logger",
            kind: Kind::Request | Kind::Response,
        }
    }

    async fn on_request(&self, request: &mut Request<'_>, _: &mut Data<'_>) {
        request.local_cache(Instant::now);
    }

    async fn on_response<'r>(&self, request: &'r Request<'_>, response: &mut Response<'r>) {
        let duration = request.local_cache(Instant::now).elapsed();
        let status = response.status();

        let level = if status.code >= 500 {
            log::Level::Warn
        } else if is_health_check(request.uri().path().as_str()) {
            log::Level::Debug
        } else {
            log::Level::Info
        };

        log::log!(
            level,
            "{} {} -> {} ({:.2}ms)",
            request.method(),
            request.uri(),
            status.code,
            duration.as_secs_f64() * 1000.0
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_paths_are_health_checks() {
        assert!(is_health_check("/api/v1/health/live"));
        assert!(is_health_check("/api/v1/health/ready"));
        assert!(!is_health_check("/api/v1/imports"));
    }
}
