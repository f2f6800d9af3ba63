//! Binary-level smoke tests: flag surfaces, exit codes, and one full
//! protocol session against a spawned serving frontend.

use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::process::{Command, Output, Stdio};
use std::thread;

use protocol::{Area, PROTOCOL_VERSION, Request, Response, read_frame, write_frame};
use tempfile::TempDir;
use test_support::branch_with_history;

fn binary_output(path: &str, args: &[&str]) -> Output {
    Command::new(path)
        .args(args)
        .output()
        .unwrap_or_else(|error| panic!("failed to run {path}: {error}"))
}

/// Serves canned directory-service answers for the lifetime of the test.
fn stub_directory(hosted: String, mirrored: String) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let endpoint = format!("http://{}", listener.local_addr().unwrap());
    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(stream) = stream else { break };
            let body = format!(
                r#"{{"hosted_root": "{hosted}", "mirrored_root": "{mirrored}"}}"#
            );
            thread::spawn(move || {
                let mut reader = BufReader::new(stream);
                let mut content_length = 0usize;
                loop {
                    let mut line = String::new();
                    if reader.read_line(&mut line).is_err() {
                        return;
                    }
                    if let Some(v) = line.to_ascii_lowercase().strip_prefix("content-length:") {
                        content_length = v.trim().parse().unwrap_or(0);
                    }
                    if line == "\r\n" {
                        break;
                    }
                }
                let mut request = vec![0u8; content_length];
                let _ = reader.read_exact(&mut request);
                let mut stream = reader.into_inner();
                let _ = write!(
                    stream,
                    "HTTP/1.1 200 OK\r\ncontent-length: {}\r\n\r\n{}",
                    body.len(),
                    body
                );
            });
        }
    });
    endpoint
}

#[test]
fn puller_help_lists_usage() {
    let output = binary_output(env!("CARGO_BIN_EXE_bmirror-puller"), &["--help"]);

    assert!(output.status.success(), "--help should succeed");
    let stdout = String::from_utf8(output.stdout).expect("stdout is UTF-8");
    assert!(stdout.contains("Usage:"));
    assert!(stdout.contains("--status-endpoint"));
}

#[test]
fn puller_without_flags_shows_what_is_missing() {
    let output = binary_output(env!("CARGO_BIN_EXE_bmirror-puller"), &[]);

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8(output.stderr).expect("stderr is UTF-8");
    assert!(stderr.contains("--mirror-root"));
}

#[test]
fn puller_exits_two_when_the_lock_is_held() {
    let dir = TempDir::new().unwrap();
    let lock = dir.path().join("run.lock");
    std::fs::write(&lock, "4242\n").unwrap();
    let jobs = dir.path().join("batch.jobs");
    std::fs::write(&jobs, "").unwrap();

    let output = binary_output(
        env!("CARGO_BIN_EXE_bmirror-puller"),
        &[
            "--jobs",
            jobs.to_str().unwrap(),
            "--mirror-root",
            dir.path().join("mirrors").to_str().unwrap(),
            "--lock-file",
            lock.to_str().unwrap(),
            "--status-endpoint",
            "http://127.0.0.1:1/",
        ],
    );

    assert_eq!(output.status.code(), Some(2));
    assert!(lock.exists(), "a held lock must not be removed");
}

#[test]
fn puller_mirrors_a_batch_end_to_end() {
    let dir = TempDir::new().unwrap();
    let source = dir.path().join("branch-a");
    branch_with_history(&source, &["rev-1", "rev-2"]);
    let jobs = dir.path().join("batch.jobs");
    std::fs::write(&jobs, format!("42 {}\n", source.display())).unwrap();
    let mirror_root = dir.path().join("mirrors");

    let output = binary_output(
        env!("CARGO_BIN_EXE_bmirror-puller"),
        &[
            "--jobs",
            jobs.to_str().unwrap(),
            "--mirror-root",
            mirror_root.to_str().unwrap(),
            "--lock-file",
            dir.path().join("run.lock").to_str().unwrap(),
            "--status-endpoint",
            "http://127.0.0.1:1/",
            "--io-timeout",
            "1",
        ],
    );

    assert_eq!(output.status.code(), Some(0));
    assert!(mirror_root.join("00/00/00/2a/.bstore").is_dir());
    assert!(!dir.path().join("run.lock").exists());
}

#[test]
fn serve_requires_a_mode() {
    let output = binary_output(
        env!("CARGO_BIN_EXE_bmirror-serve"),
        &["--directory-endpoint", "http://127.0.0.1:1/"],
    );

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8(output.stderr).expect("stderr is UTF-8");
    assert!(stderr.contains("--inet or --port"));
}

#[test]
fn serve_announces_an_ephemeral_port_and_serves_a_session() {
    let dir = TempDir::new().unwrap();
    let mirrored = dir.path().join("mirrored");
    std::fs::create_dir_all(mirrored.join("17/trunk")).unwrap();
    std::fs::write(mirrored.join("17/trunk/tip"), b"rev-9").unwrap();
    let hosted = dir.path().join("hosted");
    std::fs::create_dir_all(&hosted).unwrap();
    let endpoint = stub_directory(
        hosted.display().to_string(),
        mirrored.display().to_string(),
    );

    let mut child = Command::new(env!("CARGO_BIN_EXE_bmirror-serve"))
        .args([
            "--port",
            "127.0.0.1:0",
            "--directory-endpoint",
            &endpoint,
            "--max-connections",
            "1",
        ])
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();

    let mut port_line = String::new();
    BufReader::new(child.stdout.take().unwrap())
        .read_line(&mut port_line)
        .unwrap();
    let port: u16 = port_line.trim().parse().unwrap();

    let stream = TcpStream::connect(("127.0.0.1", port)).unwrap();
    let mut writer = stream.try_clone().unwrap();
    let mut reader = BufReader::new(stream);

    write_frame(
        &mut writer,
        &Request::Hello {
            version: PROTOCOL_VERSION,
        }
        .encode(),
    )
    .unwrap();
    write_frame(
        &mut writer,
        &Request::Open {
            user_id: 17,
            unique_name: "trunk".to_owned(),
            area: Area::Mirrored,
        }
        .encode(),
    )
    .unwrap();
    write_frame(
        &mut writer,
        &Request::Read {
            path: "tip".to_owned(),
        }
        .encode(),
    )
    .unwrap();
    write_frame(&mut writer, &Request::Done.encode()).unwrap();

    let mut responses = Vec::new();
    while let Some(payload) = read_frame(&mut reader).unwrap() {
        responses.push(Response::decode(&payload).unwrap());
    }
    assert_eq!(
        responses,
        vec![
            Response::Welcome {
                version: PROTOCOL_VERSION
            },
            Response::Opened {
                logical_id: "17/trunk".to_owned()
            },
            Response::Data(b"rev-9".to_vec()),
            Response::Bye,
        ]
    );

    // Connection cap reached: drain, then a clean exit.
    let status = child.wait().unwrap();
    assert_eq!(status.code(), Some(0));
}

#[test]
fn serve_inet_mode_speaks_the_protocol_over_stdio() {
    let endpoint = stub_directory("/nonexistent".to_owned(), "/nonexistent".to_owned());

    let mut child = Command::new(env!("CARGO_BIN_EXE_bmirror-serve"))
        .args(["--inet", "--directory-endpoint", &endpoint])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();

    let mut stdin = child.stdin.take().unwrap();
    write_frame(
        &mut stdin,
        &Request::Hello {
            version: PROTOCOL_VERSION,
        }
        .encode(),
    )
    .unwrap();
    write_frame(&mut stdin, &Request::Done.encode()).unwrap();
    drop(stdin);

    let output = child.wait_with_output().unwrap();
    assert_eq!(output.status.code(), Some(0));

    let mut cursor = std::io::Cursor::new(output.stdout);
    let mut responses = Vec::new();
    while let Some(payload) = read_frame(&mut cursor).unwrap() {
        responses.push(Response::decode(&payload).unwrap());
    }
    assert_eq!(
        responses,
        vec![
            Response::Welcome {
                version: PROTOCOL_VERSION
            },
            Response::Bye,
        ]
    );
}
