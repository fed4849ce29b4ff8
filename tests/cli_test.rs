use std::fs;
use std::net::UdpSocket;
use std::path::PathBuf;
use std::thread;

use assert_cmd::Command;
use ntpman::ntp::{Mode, NtpHeader};
use predicates::str::contains;

fn target_file(name: &str, content: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("ntpman-cli-{}-{}.conf", std::process::id(), name));
    fs::write(&path, content).unwrap();
    path
}

fn ntpman() -> Command {
    let mut cmd = Command::cargo_bin("ntpman").unwrap();
    cmd.env("NTPMAN_CONFIG_DIR", std::env::temp_dir().join("ntpman-cli-no-config"))
        .env_remove("RUST_LOG")
        .arg("--no-color");
    cmd
}

/// Answers `count` requests on a loopback port from a plain thread.
fn blocking_server(count: usize) -> std::net::SocketAddr {
    let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
    let addr = socket.local_addr().unwrap();
    thread::spawn(move || {
        let mut buf = [0u8; 512];
        for _ in 0..count {
            let Ok((len, from)) = socket.recv_from(&mut buf) else {
                return;
            };
            let Ok(req) = NtpHeader::decode(&buf[..len]) else {
                continue;
            };
            let reply = NtpHeader {
                version: 4,
                mode: Mode::Server,
                stratum: 1,
                reference_id: u32::from_be_bytes(*b"GPS\0"),
                originate_timestamp: req.transmit_timestamp,
                receive_timestamp: req.transmit_timestamp,
                transmit_timestamp: req.transmit_timestamp,
                ..NtpHeader::default()
            };
            let _ = socket.send_to(&reply.encode(), from);
        }
    });
    addr
}

#[test]
fn test_invalid_input_no_args() {
    ntpman().assert().failure().stderr(contains("Usage"));
}

#[test]
fn test_missing_config_file() {
    ntpman()
        .arg("/nonexistent/ntpman/targets.conf")
        .assert()
        .code(1)
        .stderr(contains("Error:"));
}

#[test]
fn test_bad_target_line_aborts() {
    let path = target_file("bad", "127.0.0.1\nhost:0\n");
    ntpman()
        .arg(&path)
        .assert()
        .code(2)
        .stderr(contains("line 2"));
    let _ = fs::remove_file(path);
}

#[test]
fn test_skip_unresolved_with_nothing_left() {
    let path = target_file("skip", "# only junk\nhost:0\n");
    ntpman()
        .arg("--skip-unresolved")
        .arg(&path)
        .assert()
        .code(1)
        .stderr(contains("no targets"));
    let _ = fs::remove_file(path);
}

#[test]
fn test_rejects_zero_count() {
    let path = target_file("zero", "127.0.0.1\n");
    ntpman().args(["-c", "0"]).arg(&path).assert().failure();
    let _ = fs::remove_file(path);
}

#[test]
fn test_json_pass_against_local_server() {
    let addr = blocking_server(1);
    let path = target_file("json", &format!("# local\n{}\n", addr));
    ntpman()
        .args(["-j", "-n", "-c", "1", "-t", "2", "-i", "0"])
        .arg(&path)
        .assert()
        .success()
        .stdout(contains("\"stratum\":1"))
        .stdout(contains("\"ref_id\":\"GPS\""));
    let _ = fs::remove_file(path);
}

#[test]
fn test_text_reports_timeout_and_continues() {
    let silent = UdpSocket::bind("127.0.0.1:0").unwrap();
    let addr = blocking_server(1);
    let path = target_file(
        "text",
        &format!("{}\n{}\n", silent.local_addr().unwrap(), addr),
    );
    ntpman()
        .args(["-n", "-c", "1", "-t", "0.3", "-i", "0"])
        .arg(&path)
        .assert()
        .success()
        .stdout(contains("error: timeout"))
        .stdout(contains("Ref: GPS"));
    let _ = fs::remove_file(path);
}
