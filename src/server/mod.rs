//! HTTP upload endpoint.
//!
//! Accepts a schedule photo on `POST /upload` and answers with the generated
//! iCalendar document. Requests are served one at a time.

pub mod multipart;

use anyhow::{anyhow, Result};
use serde_json::json;
use std::io::{Cursor, Read};
use tiny_http::{Header, Method, Response, Server};

use crate::error::ScheduleError;
use crate::log;
use crate::pipeline::Pipeline;
use crate::schedule::SemesterAnchor;

/// A response before it is handed to tiny_http.
#[derive(Debug)]
pub struct Reply {
    pub status: u16,
    pub headers: Vec<(&'static str, String)>,
    pub body: Vec<u8>,
}

impl Reply {
    fn text(status: u16, body: &str) -> Self {
        Self {
            status,
            headers: vec![("Content-Type", "text/plain; charset=utf-8".to_string())],
            body: body.as_bytes().to_vec(),
        }
    }

    fn json(status: u16, value: serde_json::Value) -> Self {
        Self {
            status,
            headers: vec![("Content-Type", "application/json".to_string())],
            body: value.to_string().into_bytes(),
        }
    }

    fn calendar(ics: String) -> Self {
        Self {
            status: 200,
            headers: vec![
                ("Content-Type", "text/calendar; charset=utf-8".to_string()),
                (
                    "Content-Disposition",
                    "attachment; filename=\"schedule.ics\"".to_string(),
                ),
            ],
            body: ics.into_bytes(),
        }
    }

    fn error(err: &ScheduleError) -> Self {
        Self::json(
            err.status_code(),
            json!({"error": err.to_string(), "kind": err.kind()}),
        )
    }

    fn into_response(self) -> Response<Cursor<Vec<u8>>> {
        let mut response = Response::from_data(self.body).with_status_code(self.status);
        for (name, value) in self.headers {
            if let Ok(header) = Header::from_bytes(name, value) {
                response.add_header(header);
            }
        }
        response
    }
}

/// An incoming request, reduced to what routing needs.
pub struct Incoming<'a> {
    pub method: &'a Method,
    pub url: &'a str,
    pub content_type: Option<&'a str>,
    pub body: &'a [u8],
}

/// Listens on `bind:port` and serves requests until the process exits.
pub fn serve(pipeline: &Pipeline, bind: &str, port: u16, max_upload_bytes: usize) -> Result<()> {
    let addr = format!("{}:{}", bind, port);
    let server = Server::http(&addr).map_err(|e| anyhow!("server: {}", e))?;
    log(&format!("Listening on http://{}", addr));

    for mut request in server.incoming_requests() {
        let method = request.method().clone();
        let url = request.url().to_string();
        let content_type = header_value(&request, "Content-Type");
        log(&format!("{} {}", method, url));

        let declared = request.body_length();
        let reply = match read_body(request.as_reader(), declared, max_upload_bytes) {
            Err(reply) => reply,
            Ok(body) => {
                let incoming = Incoming {
                    method: &method,
                    url: &url,
                    content_type: content_type.as_deref(),
                    body: &body,
                };
                let anchor = SemesterAnchor::today(pipeline.zone);
                handle(pipeline, &incoming, anchor)
            }
        };

        log(&format!("{} {} -> {}", method, url, reply.status));
        let _ = request.respond(reply.into_response());
    }

    Ok(())
}

/// Reads a request body of at most `max_upload_bytes`.
///
/// A declared Content-Length over the limit is rejected before reading;
/// bodies without one are read up to one byte past the limit.
fn read_body<R: Read>(
    reader: R,
    declared: Option<usize>,
    max_upload_bytes: usize,
) -> std::result::Result<Vec<u8>, Reply> {
    if declared.is_some_and(|len| len > max_upload_bytes) {
        return Err(Reply::text(413, "Upload too large"));
    }

    let mut body = Vec::new();
    reader
        .take(max_upload_bytes as u64 + 1)
        .read_to_end(&mut body)
        .map_err(|e| Reply::text(400, &format!("Could not read request body: {}", e)))?;

    if body.len() > max_upload_bytes {
        return Err(Reply::text(413, "Upload too large"));
    }
    Ok(body)
}

fn header_value(request: &tiny_http::Request, name: &'static str) -> Option<String> {
    request
        .headers()
        .iter()
        .find(|h| h.field.equiv(name))
        .map(|h| h.value.as_str().to_string())
}

/// Routes one request.
pub fn handle(pipeline: &Pipeline, request: &Incoming, anchor: SemesterAnchor) -> Reply {
    let (path, query) = request.url.split_once('?').unwrap_or((request.url, ""));

    match (path, request.method) {
        ("/health", Method::Get) => Reply::text(200, "ok"),
        ("/upload", Method::Post) => upload(pipeline, request, query, anchor),
        ("/upload", _) | ("/health", _) => Reply::text(405, "Method not allowed"),
        _ => Reply::text(404, "Not found"),
    }
}

fn upload(pipeline: &Pipeline, request: &Incoming, query: &str, anchor: SemesterAnchor) -> Reply {
    let image = match extract_image(request) {
        Ok(image) => image,
        Err(reply) => return reply,
    };

    match pipeline.run(&image, anchor) {
        Ok(output) if wants_json(query) => Reply::json(200, json!({"ics_content": output.ics})),
        Ok(output) => Reply::calendar(output.ics),
        Err(err) => Reply::error(&err),
    }
}

/// Pulls the image bytes from a multipart `file` part or a raw image body.
fn extract_image(request: &Incoming) -> std::result::Result<Vec<u8>, Reply> {
    let content_type = request.content_type.unwrap_or_default();

    if content_type.to_ascii_lowercase().starts_with("image/") {
        if request.body.is_empty() {
            return Err(Reply::text(400, "No selected file"));
        }
        return Ok(request.body.to_vec());
    }

    let Some(boundary) = multipart::boundary(content_type) else {
        return Err(Reply::text(400, "No file part"));
    };
    let part = match multipart::find_file_part(request.body, &boundary, "file") {
        Ok(Some(part)) => part,
        Ok(None) => return Err(Reply::text(400, "No file part")),
        Err(e) => {
            log(&format!("Malformed multipart body: {}", e));
            return Err(Reply::text(400, "No file part"));
        }
    };
    if part.filename.is_empty() {
        return Err(Reply::text(400, "No selected file"));
    }

    log(&format!(
        "Received {} ({}, {} bytes)",
        part.filename,
        part.content_type.as_deref().unwrap_or("no content type"),
        part.data.len()
    ));
    Ok(part.data)
}

fn wants_json(query: &str) -> bool {
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .any(|(key, value)| key == "format" && value.eq_ignore_ascii_case("json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::OcrBackend;
    use crate::schedule::{ScheduleEntry, ScheduleParser};
    use crate::table::{BoundingBox, RawWord, Table, TableThresholds};
    use chrono::{NaiveDate, NaiveTime};

    struct FakeOcr;

    impl OcrBackend for FakeOcr {
        fn detect(&self, image: &[u8]) -> crate::error::Result<Vec<RawWord>> {
            if image == b"blank" {
                return Ok(Vec::new());
            }
            Ok(vec![RawWord {
                text: "CS101".to_string(),
                vertices: BoundingBox::from_rect(0, 0, 50, 20).vertices.to_vec(),
            }])
        }
    }

    struct FakeParser;

    impl ScheduleParser for FakeParser {
        fn parse(&self, _table: &Table) -> crate::error::Result<Vec<ScheduleEntry>> {
            Ok(vec![ScheduleEntry {
                course: "CS101".to_string(),
                day_code: "TuTh".to_string(),
                start_time: NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
                end_time: NaiveTime::from_hms_opt(10, 45, 0).unwrap(),
                location: String::new(),
            }])
        }
    }

    const BOUNDARY: &str = "XyZ";

    fn multipart_body(filename: &str, data: &[u8]) -> Vec<u8> {
        let mut body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{f}\"\r\n\
             Content-Type: image/png\r\n\r\n",
            b = BOUNDARY,
            f = filename
        )
        .into_bytes();
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
        body
    }

    fn call(method: Method, url: &str, content_type: Option<&str>, body: &[u8]) -> Reply {
        let pipeline = Pipeline {
            ocr: &FakeOcr,
            parser: &FakeParser,
            thresholds: TableThresholds::default(),
            zone: chrono_tz::America::Los_Angeles,
        };
        let anchor = SemesterAnchor::week_of(NaiveDate::from_ymd_opt(2024, 9, 2).unwrap());
        let incoming = Incoming {
            method: &method,
            url,
            content_type,
            body,
        };
        handle(&pipeline, &incoming, anchor)
    }

    fn header<'a>(reply: &'a Reply, name: &str) -> Option<&'a str> {
        reply
            .headers
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
    }

    fn multipart_type() -> String {
        format!("multipart/form-data; boundary={}", BOUNDARY)
    }

    #[test]
    fn test_upload_returns_calendar_attachment() {
        let ct = multipart_type();
        let reply = call(Method::Post, "/upload", Some(&ct), &multipart_body("s.png", b"img"));

        assert_eq!(reply.status, 200);
        assert_eq!(
            header(&reply, "Content-Disposition"),
            Some("attachment; filename=\"schedule.ics\"")
        );
        let body = String::from_utf8(reply.body).unwrap();
        assert!(body.contains("RRULE:FREQ=WEEKLY"));
        assert_eq!(body.matches("BEGIN:VEVENT").count(), 2);
    }

    #[test]
    fn test_upload_json_format() {
        let ct = multipart_type();
        let reply = call(
            Method::Post,
            "/upload?format=json",
            Some(&ct),
            &multipart_body("s.png", b"img"),
        );

        assert_eq!(reply.status, 200);
        let value: serde_json::Value = serde_json::from_slice(&reply.body).unwrap();
        assert!(value["ics_content"].as_str().unwrap().starts_with("BEGIN:VCALENDAR"));
    }

    #[test]
    fn test_raw_image_body() {
        let reply = call(Method::Post, "/upload", Some("image/jpeg"), b"img");
        assert_eq!(reply.status, 200);
    }

    #[test]
    fn test_missing_file_part() {
        let reply = call(Method::Post, "/upload", Some("text/plain"), b"hello");
        assert_eq!(reply.status, 400);
        assert_eq!(reply.body, b"No file part");
    }

    #[test]
    fn test_empty_filename() {
        let ct = multipart_type();
        let reply = call(Method::Post, "/upload", Some(&ct), &multipart_body("", b""));
        assert_eq!(reply.status, 400);
        assert_eq!(reply.body, b"No selected file");
    }

    #[test]
    fn test_pipeline_error_is_json() {
        let reply = call(Method::Post, "/upload", Some("image/png"), b"blank");
        assert_eq!(reply.status, 422);
        let value: serde_json::Value = serde_json::from_slice(&reply.body).unwrap();
        assert_eq!(value["kind"], "empty_table");
        assert_eq!(value["error"], "No text detected in image");
    }

    #[test]
    fn test_routes() {
        assert_eq!(call(Method::Get, "/health", None, b"").status, 200);
        assert_eq!(call(Method::Get, "/upload", None, b"").status, 405);
        assert_eq!(call(Method::Get, "/elsewhere", None, b"").status, 404);
    }

    #[test]
    fn test_read_body_within_limit() {
        let body = read_body(Cursor::new(b"0123456789".to_vec()), Some(10), 10).unwrap();
        assert_eq!(body, b"0123456789");
    }

    #[test]
    fn test_read_body_rejects_declared_oversize() {
        let reply = read_body(Cursor::new(Vec::new()), Some(11), 10).unwrap_err();
        assert_eq!(reply.status, 413);
    }

    #[test]
    fn test_read_body_rejects_streamed_oversize() {
        // No Content-Length, so the limit is enforced while reading
        let reply = read_body(Cursor::new(vec![0u8; 11]), None, 10).unwrap_err();
        assert_eq!(reply.status, 413);
        assert_eq!(reply.body, b"Upload too large");
    }

    #[test]
    fn test_wants_json() {
        assert!(wants_json("format=json"));
        assert!(wants_json("x=1&format=JSON"));
        assert!(!wants_json("format=ics"));
        assert!(!wants_json(""));
    }
}
