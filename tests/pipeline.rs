// tests/pipeline.rs
mod common;

use common::{one_shot_server, write_request, WAGES_CSV};
use sistat_wages::{
    fetch::{Fetch, HttpFetcher, QueryDescriptor},
    sheet::read_xlsx,
    Config, EtlError,
};
use std::time::Duration;
use tempfile::tempdir;
use url::Url;

struct FailingFetch;

impl Fetch for FailingFetch {
    fn fetch(&self, endpoint: &Url, _: &QueryDescriptor) -> Result<String, EtlError> {
        Err(EtlError::Network {
            message: format!("{} returned 503 Service Unavailable", endpoint),
            source: None,
        })
    }
}

fn config_in(dir: &std::path::Path, endpoint: &str) -> Config {
    Config {
        endpoint: Url::parse(endpoint).unwrap(),
        request_path: write_request(dir),
        output_path: dir.join("wages.xlsx"),
        log_path: dir.join("run.log"),
        ..Config::default()
    }
}

#[test]
fn http_end_to_end_writes_long_form_workbook() {
    let dir = tempdir().unwrap();
    let (url, server) = one_shot_server("200 OK", WAGES_CSV);
    let cfg = config_in(dir.path(), &url);

    let fetcher = HttpFetcher::new(cfg.timeout()).unwrap();
    let summary = sistat_wages::run(&cfg, &fetcher).unwrap();
    assert_eq!(summary.rows, 2);

    let request = server.join().unwrap();
    assert!(request.starts_with("POST /data.px"), "{request}");
    assert!(request.contains(r#""format":"csv""#), "{request}");

    let table = read_xlsx(&cfg.output_path).unwrap();
    assert_eq!(
        table.headers,
        vec!["SEKTOR", "LETO", "MESEC", "Bruto/Neto", "Plača za mesec (EUR)"]
    );
    assert_eq!(
        table.rows,
        vec![
            vec!["A", "2023", "01", "Bruto", "1000"],
            vec!["A", "2023", "01", "Neto", "800"],
        ]
    );
}

#[test]
fn non_success_status_is_network_error() {
    let dir = tempdir().unwrap();
    let (url, server) = one_shot_server("500 Internal Server Error", "boom");
    let cfg = config_in(dir.path(), &url);

    let fetcher = HttpFetcher::new(Duration::from_secs(5)).unwrap();
    let err = sistat_wages::run(&cfg, &fetcher).unwrap_err();
    server.join().unwrap();

    assert!(matches!(err, EtlError::Network { .. }), "{err:?}");
    assert_eq!(err.kind(), "NetworkError");
    assert!(!cfg.output_path.exists());
}

#[test]
fn connection_refused_is_network_error() {
    let dir = tempdir().unwrap();
    // bind then drop to get a port nobody listens on
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    let cfg = config_in(dir.path(), &format!("http://127.0.0.1:{port}/x"));

    let fetcher = HttpFetcher::new(Duration::from_secs(2)).unwrap();
    let err = sistat_wages::run(&cfg, &fetcher).unwrap_err();
    assert!(matches!(err, EtlError::Network { .. }), "{err:?}");
}

#[test]
fn silent_server_times_out_as_network_error() {
    let dir = tempdir().unwrap();
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let cfg = config_in(
        dir.path(),
        &format!("http://{}/data.px", listener.local_addr().unwrap()),
    );
    // accept and hold the connection without ever answering
    let server = std::thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        std::thread::sleep(Duration::from_secs(3));
        drop(stream);
    });

    let fetcher = HttpFetcher::new(Duration::from_secs(1)).unwrap();
    let err = sistat_wages::run(&cfg, &fetcher).unwrap_err();
    server.join().unwrap();

    assert!(matches!(err, EtlError::Network { .. }), "{err:?}");
    assert_eq!(err.kind(), "NetworkError");
    assert!(!cfg.output_path.exists());
}

#[test]
fn failed_fetch_leaves_previous_output_untouched() {
    let dir = tempdir().unwrap();
    let cfg = config_in(dir.path(), "http://127.0.0.1:9/x");
    std::fs::write(&cfg.output_path, b"previous run").unwrap();

    let err = sistat_wages::run(&cfg, &FailingFetch).unwrap_err();
    assert_eq!(err.kind(), "NetworkError");
    assert_eq!(std::fs::read(&cfg.output_path).unwrap(), b"previous run");
}

#[test]
fn malformed_body_writes_nothing() {
    struct Ragged;
    impl Fetch for Ragged {
        fn fetch(&self, _: &Url, _: &QueryDescriptor) -> Result<String, EtlError> {
            Ok("SEKTOR,MESEC,Bruto,Neto\r\nA,2023M01,1000\r\n".into())
        }
    }

    let dir = tempdir().unwrap();
    let cfg = config_in(dir.path(), "http://127.0.0.1:9/x");
    let err = sistat_wages::run(&cfg, &Ragged).unwrap_err();
    assert_eq!(err.kind(), "MalformedInput");
    assert!(!cfg.output_path.exists());
}

#[test]
fn wide_variant_round_trips() {
    struct Wide;
    impl Fetch for Wide {
        fn fetch(&self, _: &Url, _: &QueryDescriptor) -> Result<String, EtlError> {
            Ok(WAGES_CSV.into())
        }
    }

    let dir = tempdir().unwrap();
    let cfg = Config {
        pivot: false,
        ..config_in(dir.path(), "http://127.0.0.1:9/x")
    };
    let summary = sistat_wages::run(&cfg, &Wide).unwrap();
    assert!(!summary.pivoted);

    let table = read_xlsx(&cfg.output_path).unwrap();
    assert_eq!(table.headers, summary.columns);
    assert_eq!(table.len(), summary.rows);
    assert_eq!(table.rows[0], vec!["A", "2023", "01", "1000", "800"]);
}
