//! Loopback HTTP fixtures for API-client contract tests.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

#[derive(Debug)]
pub struct CapturedRequest {
    pub method: String,
    /// Request target as sent, including any query string.
    pub target: String,
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl CapturedRequest {
    pub fn path(&self) -> &str {
        self.target
            .split_once('?')
            .map(|(path, _)| path)
            .unwrap_or(&self.target)
    }

    pub fn query(&self) -> Option<&str> {
        self.target.split_once('?').map(|(_, query)| query)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).expect("request body is json")
    }
}

#[derive(Debug, Clone)]
pub struct MockResponse {
    pub status_line: String,
    pub body: String,
}

impl MockResponse {
    pub fn new(status_line: &str, body: &str) -> Self {
        Self {
            status_line: status_line.to_string(),
            body: body.to_string(),
        }
    }
}

/// Accept a single request, capture it, and answer with `status_line` and
/// `response_body`. Returns the base URL and a receiver for the captured
/// request.
pub fn spawn_one_shot_server(
    status_line: &str,
    response_body: &str,
) -> (String, mpsc::Receiver<CapturedRequest>) {
    spawn_scripted_server(vec![MockResponse::new(status_line, response_body)])
}

/// Answer one connection per scripted response, in order, then stop listening.
pub fn spawn_scripted_server(
    responses: Vec<MockResponse>,
) -> (String, mpsc::Receiver<CapturedRequest>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind mock server");
    let addr = listener.local_addr().expect("read mock server addr");
    let (tx, rx) = mpsc::channel();

    thread::spawn(move || {
        for response in responses {
            let (mut stream, _) = listener.accept().expect("accept mock request");
            let req = read_http_request(&mut stream);
            if tx.send(req).is_err() {
                return;
            }
            let raw = format!(
                "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                response.status_line,
                response.body.len(),
                response.body
            );
            stream
                .write_all(raw.as_bytes())
                .expect("write mock response");
        }
    });

    (format!("http://{addr}"), rx)
}

/// Accept a single request and hold the connection open without answering
/// for `hold`. Used to exercise client-side timeouts.
pub fn spawn_stalled_server(hold: Duration) -> (String, mpsc::Receiver<CapturedRequest>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind mock server");
    let addr = listener.local_addr().expect("read mock server addr");
    let (tx, rx) = mpsc::channel();

    thread::spawn(move || {
        let (mut stream, _) = listener.accept().expect("accept mock request");
        let req = read_http_request(&mut stream);
        let _ = tx.send(req);
        thread::sleep(hold);
    });

    (format!("http://{addr}"), rx)
}

fn read_http_request(stream: &mut TcpStream) -> CapturedRequest {
    let mut buf = Vec::new();
    let mut header_end = None;
    let mut content_length = 0usize;

    loop {
        let mut chunk = [0u8; 4096];
        let n = stream.read(&mut chunk).expect("read request bytes");
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        if header_end.is_none() {
            header_end = buf
                .windows(4)
                .position(|window| window == b"\r\n\r\n")
                .map(|idx| idx + 4);
            if let Some(end) = header_end {
                content_length = parse_content_length(&String::from_utf8_lossy(&buf[..end]));
            }
        }
        if let Some(end) = header_end {
            if buf.len() >= end + content_length {
                break;
            }
        }
    }

    let end = header_end.expect("request headers must be present");
    let head = String::from_utf8_lossy(&buf[..end]);
    let mut lines = head.lines();
    let mut request_line = lines.next().expect("request line").split_whitespace();
    let method = request_line.next().expect("method").to_string();
    let target = request_line.next().expect("request target").to_string();
    let headers = lines
        .take_while(|line| !line.trim().is_empty())
        .filter_map(|line| line.split_once(':'))
        .map(|(key, value)| (key.trim().to_ascii_lowercase(), value.trim().to_string()))
        .collect();
    let body = String::from_utf8(buf[end..end + content_length].to_vec()).expect("utf8 body");

    CapturedRequest {
        method,
        target,
        headers,
        body,
    }
}

fn parse_content_length(head: &str) -> usize {
    head.lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(key, _)| key.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse().ok())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_request(url: &str, request: &[u8]) -> String {
        let mut stream = TcpStream::connect(url.trim_start_matches("http://")).unwrap();
        stream.write_all(request).unwrap();
        let mut resp = String::new();
        stream.read_to_string(&mut resp).unwrap();
        resp
    }

    #[test]
    fn one_shot_server_splits_path_and_query() {
        let (url, rx) = spawn_one_shot_server("200 OK", r#"{"ok":true}"#);
        let resp = raw_request(
            &url,
            b"GET /user/transformations/ALL?page=2 HTTP/1.1\r\nHost: localhost\r\nAuthorization: Bearer t\r\nConnection: close\r\n\r\n",
        );
        assert!(resp.contains("200 OK"));
        let req = rx.recv().unwrap();
        assert_eq!(req.method, "GET");
        assert_eq!(req.path(), "/user/transformations/ALL");
        assert_eq!(req.query(), Some("page=2"));
        assert_eq!(req.header("Authorization"), Some("Bearer t"));
    }

    #[test]
    fn scripted_server_answers_in_order() {
        let (url, rx) = spawn_scripted_server(vec![
            MockResponse::new("201 Created", r#"{"id":"a"}"#),
            MockResponse::new("500 Internal Server Error", r#"{"error":"boom"}"#),
        ]);
        let body = r#"{"name":"X"}"#;
        let first = format!(
            "POST /a HTTP/1.1\r\nHost: localhost\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        assert!(raw_request(&url, first.as_bytes()).contains("201 Created"));
        assert!(raw_request(
            &url,
            b"DELETE /b HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n"
        )
        .contains("boom"));

        let captured: Vec<_> = rx.iter().take(2).collect();
        assert_eq!(captured[0].json()["name"], "X");
        assert_eq!(captured[1].method, "DELETE");
    }
}
