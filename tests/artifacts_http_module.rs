use crisprseq_launch::artifacts::{ArtifactError, ArtifactStore, HttpStore};
use std::fs;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::thread;
use tempfile::tempdir;

fn spawn_upload_server(status_line: &str) -> (String, thread::JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind test server");
    let addr = listener.local_addr().expect("local addr");
    let status_line = status_line.to_string();

    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().expect("accept");
        let mut reader = BufReader::new(stream.try_clone().expect("clone stream"));
        let mut request = String::new();
        let mut content_length = 0usize;
        loop {
            let mut line = String::new();
            reader.read_line(&mut line).expect("read header line");
            if let Some(value) = line.to_ascii_lowercase().strip_prefix("content-length:") {
                content_length = value.trim().parse().expect("content length");
            }
            request.push_str(&line);
            if line == "\r\n" || line.is_empty() {
                break;
            }
        }
        let mut payload = vec![0u8; content_length];
        reader.read_exact(&mut payload).expect("read body");
        request.push_str(&String::from_utf8_lossy(&payload));

        let response =
            format!("HTTP/1.1 {status_line}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
        stream
            .write_all(response.as_bytes())
            .expect("write response");
        request
    });

    (format!("http://{addr}/api"), handle)
}

#[test]
fn upload_puts_file_body_to_encoded_object_url() {
    let dir = tempdir().expect("tempdir");
    let log = dir.path().join(".nextflow.log");
    fs::write(&log, "Nov-01 12:00:00.000 [main] DEBUG nextflow.cli.Launcher").expect("write log");
    let (base_url, server) = spawn_upload_server("200 OK");

    HttpStore::new(&base_url, Some("store-token".to_string()))
        .upload(&log, "latch:///your_log_dir/run 1/nextflow.log")
        .expect("upload");

    let request = server.join().expect("server thread");
    assert!(
        request.starts_with("PUT /api/your_log_dir/run%201/nextflow.log HTTP/1.1\r\n"),
        "unexpected request:\n{request}"
    );
    assert!(
        request.contains("Authorization: Bearer store-token"),
        "unexpected request:\n{request}"
    );
    assert!(
        request.ends_with("Nov-01 12:00:00.000 [main] DEBUG nextflow.cli.Launcher"),
        "unexpected request:\n{request}"
    );
}

#[test]
fn upload_without_token_sends_no_authorization() {
    let dir = tempdir().expect("tempdir");
    let log = dir.path().join(".nextflow.log");
    fs::write(&log, "log").expect("write log");
    let (base_url, server) = spawn_upload_server("201 Created");

    HttpStore::new(&base_url, None)
        .upload(&log, "latch:///logs/nextflow.log")
        .expect("upload");

    let request = server.join().expect("server thread");
    assert!(request.starts_with("PUT /api/logs/nextflow.log "));
    assert!(!request.to_ascii_lowercase().contains("authorization:"));
}

#[test]
fn error_status_is_an_upload_failure() {
    let dir = tempdir().expect("tempdir");
    let log = dir.path().join(".nextflow.log");
    fs::write(&log, "log").expect("write log");
    let (base_url, server) = spawn_upload_server("403 Forbidden");

    let err = HttpStore::new(&base_url, Some("expired".to_string()))
        .upload(&log, "latch:///logs/nextflow.log")
        .expect_err("forbidden");
    server.join().expect("server thread");

    match err {
        ArtifactError::Upload { url, reason } => {
            assert_eq!(url, format!("{base_url}/logs/nextflow.log"));
            assert!(reason.contains("403"), "unexpected reason: {reason}");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}
