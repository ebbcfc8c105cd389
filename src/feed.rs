// Background polling of the tour API
use crossbeam_channel::{Receiver, Sender, after, select, unbounded};
use eframe::egui;
use serde::de::DeserializeOwned;
use std::thread;
use std::time::Duration;
use thiserror::Error;

use crate::route::{ApiEnvelope, RouteCoordinate, RouteLocation};

#[derive(Error, Debug)]
pub enum FeedError {
    #[error("API base URL is not configured")]
    NotConfigured,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API returned non-JSON response ({content_type}). Check if the API server is running.")]
    NotJson { content_type: String },

    #[error("Failed to fetch {what} (HTTP {status})")]
    Status { what: &'static str, status: u16 },

    #[error("failed to start feed worker: {0}")]
    Worker(#[from] std::io::Error),

    #[error("Malformed {what} response: {source}")]
    Decode {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug)]
pub enum FeedEvent {
    /// Latest live fix; `Ok(None)` when the tour has no location records yet
    Location(Result<Option<RouteLocation>, FeedError>),
    Coordinates(Result<Vec<RouteCoordinate>, FeedError>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Endpoint {
    Location,
    Coordinates,
}

impl Endpoint {
    fn path(self) -> &'static str {
        match self {
            Endpoint::Location => "routeLocation",
            Endpoint::Coordinates => "getTourRoutesCoordinates",
        }
    }

    fn what(self) -> &'static str {
        match self {
            Endpoint::Location => "route location",
            Endpoint::Coordinates => "route coordinates",
        }
    }
}

fn endpoint_url(base: &str, tour_id: &str, endpoint: Endpoint) -> String {
    format!("{}/api/tours/{}/{}", base.trim_end_matches('/'), tour_id, endpoint.path())
}

/// Validate and decode one API response. Content type is checked before status,
/// an HTML error page is reported as such.
fn decode_response<T: DeserializeOwned>(
    endpoint: Endpoint,
    content_type: Option<&str>,
    status: u16,
    body: &str,
) -> Result<T, FeedError> {
    let content_type = content_type.unwrap_or("");
    if !content_type.contains("application/json") {
        return Err(FeedError::NotJson { content_type: content_type.to_string() });
    }
    if !(200..300).contains(&status) {
        return Err(FeedError::Status { what: endpoint.what(), status });
    }
    let envelope: ApiEnvelope<T> = serde_json::from_str(body)
        .map_err(|source| FeedError::Decode { what: endpoint.what(), source })?;
    Ok(envelope.data)
}

fn fetch<T: DeserializeOwned>(
    client: &reqwest::blocking::Client,
    url: &str,
    endpoint: Endpoint,
) -> Result<T, FeedError> {
    let response = client.get(url).send()?;
    let status = response.status().as_u16();
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = response.text()?;
    decode_response(endpoint, content_type.as_deref(), status, &body)
}

/// Route data for one tour, fetched on a worker thread.
///
/// Coordinates are fetched once; the live location is fetched immediately and
/// then every `poll_interval`. Failed requests are reported, never retried early.
pub struct RouteFeed {
    events: Receiver<FeedEvent>,
    // Dropping this ends the worker at its next wake-up
    _shutdown: Sender<()>,
}

impl RouteFeed {
    pub fn spawn(
        api_base_url: &str,
        tour_id: &str,
        poll_interval: Duration,
        ctx: egui::Context,
    ) -> Result<Self, FeedError> {
        if api_base_url.trim().is_empty() {
            return Err(FeedError::NotConfigured);
        }

        let (tx, events) = unbounded();
        let (shutdown, shutdown_rx) = unbounded::<()>();
        let location_url = endpoint_url(api_base_url, tour_id, Endpoint::Location);
        let coordinates_url = endpoint_url(api_base_url, tour_id, Endpoint::Coordinates);

        thread::Builder::new()
            .name("route-feed".to_string())
            .spawn(move || {
                let client = reqwest::blocking::Client::new();
                let send = |event: FeedEvent| {
                    let ok = tx.send(event).is_ok();
                    ctx.request_repaint();
                    ok
                };

                let coords = fetch(&client, &coordinates_url, Endpoint::Coordinates);
                if let Err(e) = &coords {
                    tracing::error!("[FEED] {}: {}", coordinates_url, e);
                }
                if !send(FeedEvent::Coordinates(coords)) {
                    return;
                }

                loop {
                    let location = fetch::<Vec<RouteLocation>>(&client, &location_url, Endpoint::Location)
                        .map(|records| records.into_iter().next());
                    match &location {
                        Ok(loc) => tracing::debug!("[FEED] location update: {:?}", loc),
                        Err(e) => tracing::error!("[FEED] {}: {}", location_url, e),
                    }
                    if !send(FeedEvent::Location(location)) {
                        return;
                    }

                    select! {
                        recv(shutdown_rx) -> _ => return,
                        recv(after(poll_interval)) -> _ => {}
                    }
                }
            })?;

        Ok(Self { events, _shutdown: shutdown })
    }

    /// Drain everything that arrived since the last frame.
    pub fn poll(&self) -> Vec<FeedEvent> {
        self.events.try_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_urls() {
        assert_eq!(
            endpoint_url("https://api.example.com/", "42", Endpoint::Location),
            "https://api.example.com/api/tours/42/routeLocation"
        );
        assert_eq!(
            endpoint_url("https://api.example.com", "42", Endpoint::Coordinates),
            "https://api.example.com/api/tours/42/getTourRoutesCoordinates"
        );
    }

    #[test]
    fn test_decode_checks_content_type_first() {
        let r: Result<Vec<RouteCoordinate>, _> =
            decode_response(Endpoint::Coordinates, Some("text/html"), 500, "<html>");
        assert!(matches!(r, Err(FeedError::NotJson { .. })));

        let r: Result<Vec<RouteCoordinate>, _> = decode_response(Endpoint::Coordinates, None, 200, "{}");
        assert!(matches!(r, Err(FeedError::NotJson { .. })));
    }

    #[test]
    fn test_decode_status_and_body() {
        let r: Result<Vec<RouteCoordinate>, _> = decode_response(
            Endpoint::Coordinates,
            Some("application/json; charset=utf-8"),
            404,
            r#"{"error":"nope"}"#,
        );
        match r {
            Err(FeedError::Status { what, status }) => {
                assert_eq!(what, "route coordinates");
                assert_eq!(status, 404);
            }
            other => panic!("unexpected {:?}", other),
        }

        let r: Vec<RouteCoordinate> = decode_response(
            Endpoint::Coordinates,
            Some("application/json"),
            200,
            r#"{"data":[[28.6,77.2],[28.7,77.3]]}"#,
        )
        .unwrap();
        assert_eq!(r.len(), 2);

        let r: Result<Vec<RouteLocation>, _> =
            decode_response(Endpoint::Location, Some("application/json"), 200, r#"{"rows":[]}"#);
        assert!(matches!(r, Err(FeedError::Decode { .. })));
    }

    #[test]
    fn test_spawn_requires_base_url() {
        let r = RouteFeed::spawn("  ", "1", Duration::from_secs(60), egui::Context::default());
        assert!(matches!(r, Err(FeedError::NotConfigured)));
    }
}
