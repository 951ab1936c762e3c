use crate::analyzer::ScoreAnalyzer;
use crate::service::{MidiService, ServiceError, ServiceResponse};
use anyhow::{Result, anyhow};
use log::{debug, info, warn};
use serde_json::json;
use std::io::Read;
use tiny_http::{Header, Method, Request, Response};

pub const HEALTH_MESSAGE: &str =
    "MIDI notation backend is up and running! POST a MIDI file to /process_midi.";

#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Text(u16, String),
    Json(ServiceResponse),
}

impl Reply {
    pub fn status(&self) -> u16 {
        match self {
            Reply::Text(status, _) => *status,
            Reply::Json(response) => response.status,
        }
    }
}

/// Blocking HTTP front for a [`MidiService`]; requests are handled one at a time.
pub struct Server<A: ScoreAnalyzer> {
    http: tiny_http::Server,
    service: MidiService<A>,
    max_body_bytes: usize,
}

impl<A: ScoreAnalyzer> Server<A> {
    pub fn bind(addr: &str, service: MidiService<A>, max_body_bytes: usize) -> Result<Self> {
        let http = tiny_http::Server::http(addr)
            .map_err(|e| anyhow!("Failed to bind HTTP server to {}: {}", addr, e))?;

        info!("Listening on http://{}..!", addr);

        Ok(Self {
            http,
            service,
            max_body_bytes,
        })
    }

    /// Serve until [`Server::unblock`] is called.
    pub fn run(&self) {
        for request in self.http.incoming_requests() {
            self.serve(request);
        }
        info!("Server loop stopped..!");
    }

    pub fn unblock(&self) {
        self.http.unblock();
    }

    fn serve(&self, mut request: Request) {
        let method = request.method().clone();
        let url = request.url().to_string();
        debug!("{} {} from {:?}", method, url, request.remote_addr());

        let reply = match read_body(request.as_reader(), self.max_body_bytes) {
            Ok(body) => route(&self.service, &method, &url, &body),
            Err(err) => Reply::Json(err.into()),
        };

        info!("{} {} -> {}", method, url, reply.status());
        respond(request, reply);
    }
}

/// Read at most `limit` bytes of body.
pub fn read_body<R: Read>(reader: R, limit: usize) -> Result<Vec<u8>, ServiceError> {
    let mut body = Vec::new();
    reader
        .take((limit as u64).saturating_add(1))
        .read_to_end(&mut body)
        .map_err(|e| ServiceError::Processing(anyhow!(e).context("Failed to read request body")))?;

    if body.len() > limit {
        return Err(ServiceError::PayloadTooLarge(limit));
    }

    Ok(body)
}

pub fn route<A: ScoreAnalyzer>(
    service: &MidiService<A>,
    method: &Method,
    url: &str,
    body: &[u8],
) -> Reply {
    let path = url.split_once('?').map_or(url, |(path, _query)| path);

    match (method, path) {
        (Method::Get, "/") => Reply::Text(200, HEALTH_MESSAGE.to_string()),
        (Method::Post, "/process_midi") => Reply::Json(service.handle(body)),
        _ => Reply::Json(ServiceResponse {
            status: 404,
            body: json!({ "error": format!("No route for {} {}", method, path) }),
        }),
    }
}

fn respond(request: Request, reply: Reply) {
    let (status, content_type, body) = match reply {
        Reply::Text(status, text) => (status, "text/plain; charset=utf-8", text),
        Reply::Json(response) => (response.status, "application/json", response.body.to_string()),
    };

    let mut response = Response::from_data(body.into_bytes()).with_status_code(status);
    match Header::from_bytes(&b"Content-Type"[..], content_type.as_bytes()) {
        Ok(header) => response = response.with_header(header),
        Err(()) => warn!("Invalid content type header '{}'..!", content_type),
    }

    if let Err(why) = request.respond(response) {
        warn!("Failed to send response: {}..!", why);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::fixtures::{TrackBuilder, smf_bytes};
    use crate::MidiScoreAnalyzer;
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;

    fn service() -> MidiService<MidiScoreAnalyzer> {
        env_logger::try_init().unwrap_or(());
        MidiService::new(MidiScoreAnalyzer::default())
    }

    #[test]
    fn health_check() {
        let reply = route(&service(), &Method::Get, "/", b"");
        assert_eq!(reply, Reply::Text(200, HEALTH_MESSAGE.to_string()));
    }

    #[test]
    fn unknown_routes_are_404() {
        let service = service();

        for (method, url) in [
            (Method::Get, "/process_midi"),
            (Method::Post, "/"),
            (Method::Delete, "/process_midi"),
            (Method::Get, "/favicon.ico"),
        ] {
            let reply = route(&service, &method, url, b"");
            assert_eq!(reply.status(), 404, "{} {}", method, url);
        }
    }

    #[test]
    fn process_midi_route_ignores_query_string() {
        let bytes = smf_bytes(480, vec![TrackBuilder::new().note(0, 480, 60, 64)]);
        let body = json!({ "midiData": STANDARD.encode(bytes) }).to_string();

        let reply = route(&service(), &Method::Post, "/process_midi?v=2", body.as_bytes());
        match reply {
            Reply::Json(response) => {
                assert_eq!(response.status, 200);
                assert_eq!(response.body["allParsedNotes"][0]["midi"], 60);
            }
            other => panic!("Expected JSON, got {:?}", other),
        }
    }

    #[test]
    fn process_midi_route_rejects_empty_body() {
        let reply = route(&service(), &Method::Post, "/process_midi", b"");
        assert_eq!(reply.status(), 400);
    }

    #[test]
    fn oversized_bodies_are_rejected() {
        let body = vec![b' '; 64];

        assert_eq!(read_body(&body[..], 64).unwrap().len(), 64);

        let err = read_body(&body[..], 63).unwrap_err();
        assert_eq!(err.status_code(), 413);
    }

    #[test]
    fn unbounded_limit_reads_the_whole_body() {
        let body = vec![b'{'; 64];
        assert_eq!(read_body(&body[..], usize::MAX).unwrap(), body);
    }
}
