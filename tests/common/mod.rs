// tests/common/mod.rs
#![allow(dead_code)]

use std::{
    io::{Read, Write},
    net::TcpListener,
    path::{Path, PathBuf},
    thread::{self, JoinHandle},
};

pub const WAGES_CSV: &str =
    "\"SEKTOR\",\"MESEC\",\"Bruto\",\"Neto\"\r\n\"A\",\"2023M01\",1000,800\r\n";

/// Serve exactly one HTTP response, then return the raw request it answered.
pub fn one_shot_server(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}/data.px", listener.local_addr().unwrap());

    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut request = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = stream.read(&mut chunk).unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&chunk[..n]);
            if let Some(end) = find(&request, b"\r\n\r\n") {
                let head = String::from_utf8_lossy(&request[..end]).to_lowercase();
                let len = head
                    .lines()
                    .find_map(|l| l.strip_prefix("content-length:"))
                    .and_then(|v| v.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if request.len() >= end + 4 + len {
                    break;
                }
            }
        }
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: text/csv; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        // the client may hang up early on error statuses
        let _ = stream.write_all(response.as_bytes());
        let _ = stream.flush();
        String::from_utf8_lossy(&request).to_string()
    });
    (url, handle)
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

pub fn write_request(dir: &Path) -> PathBuf {
    let path = dir.join("request.json");
    std::fs::write(
        &path,
        r#"{"query": [{"code": "SEKTOR", "selection": {"filter": "item", "values": ["1"]}}], "response": {"format": "csv"}}"#,
    )
    .unwrap();
    path
}
