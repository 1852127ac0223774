// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::time::Duration;
use tokio::io::{duplex, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};

#[tokio::test]
async fn execute_receives_matching_response() {
    let (stdout_writer, stdout_reader) = duplex(4096);
    let (stdin_writer, mut stdin_reader) = duplex(4096);
    let (client, _output_rx, _notif_rx) = ControlClient::spawn(stdout_reader, stdin_writer);

    tokio::spawn(async move {
        let mut buf = vec![0u8; 1024];
        let _ = stdin_reader.read(&mut buf).await.unwrap();
        let mut writer = stdout_writer;
        writer.write_all(b"%begin 1 0 1\nhello world\n%end 1 0 1\n").await.unwrap();
    });

    let response = client.execute("list-sessions", Duration::from_secs(2)).await.expect("ok");
    assert_eq!(response, "hello world");
}

#[tokio::test]
async fn error_response_surfaces_as_command_failed() {
    let (stdout_writer, stdout_reader) = duplex(4096);
    let (stdin_writer, mut stdin_reader) = duplex(4096);
    let (client, _output_rx, _notif_rx) = ControlClient::spawn(stdout_reader, stdin_writer);

    tokio::spawn(async move {
        let mut buf = vec![0u8; 1024];
        let _ = stdin_reader.read(&mut buf).await.unwrap();
        let mut writer = stdout_writer;
        writer.write_all(b"%begin 1 0 1\nunknown command: bogus\n%error 1 0 1\n").await.unwrap();
    });

    let err = client.execute("bogus", Duration::from_secs(2)).await.unwrap_err();
    assert!(matches!(err, ControlModeError::CommandFailed(msg) if msg.contains("unknown command")));
}

#[tokio::test]
async fn execute_times_out_with_no_response() {
    let (_stdout_writer, stdout_reader) = duplex(4096);
    let (stdin_writer, _stdin_reader) = duplex(4096);
    let (client, _output_rx, _notif_rx) = ControlClient::spawn(stdout_reader, stdin_writer);

    let err = client.execute("list-sessions", Duration::from_millis(50)).await.unwrap_err();
    assert!(matches!(err, ControlModeError::Timeout(_)));
}

#[tokio::test]
async fn readiness_fires_on_first_percent_line() {
    let (stdout_writer, stdout_reader) = duplex(4096);
    let (stdin_writer, _stdin_reader) = duplex(4096);
    let (client, _output_rx, _notif_rx) = ControlClient::spawn(stdout_reader, stdin_writer);
    assert!(!client.is_ready());

    let mut writer = stdout_writer;
    writer.write_all(b"%window-add @1\n").await.unwrap();

    tokio::time::timeout(Duration::from_secs(1), client.wait_ready()).await.expect("became ready");
    assert!(client.is_ready());
}

/// Boundary behavior (§8): 10,000 rapid command/responses through the
/// control-mode parser and dispatcher with no drainer stalls; every
/// request gets exactly one response and the drop counter stays at zero.
#[tokio::test]
async fn ten_thousand_commands_yield_zero_dropped_responses() {
    const COUNT: u64 = 10_000;

    let (stdout_writer, stdout_reader) = duplex(1 << 20);
    let (stdin_writer, stdin_reader) = duplex(1 << 20);
    let (client, _output_rx, _notif_rx) = ControlClient::spawn(stdout_reader, stdin_writer);
    let client = std::sync::Arc::new(client);

    // Fake tmux: read one command line per write, reply with a fresh
    // sequential %begin/%end id. Ids don't need to line up with which
    // specific command produced them -- every id in 0..COUNT is assigned
    // to exactly one pending caller on both sides, so every caller gets
    // exactly one response regardless of interleaving.
    let responder = tokio::spawn(async move {
        let mut reader = BufReader::new(stdin_reader);
        let mut writer = stdout_writer;
        for n in 0..COUNT {
            let mut line = String::new();
            reader.read_line(&mut line).await.expect("read command line");
            let response = format!("%begin {n} 0 1\nok\n%end {n} 0 1\n");
            writer.write_all(response.as_bytes()).await.expect("write response");
        }
    });

    let mut handles = Vec::with_capacity(COUNT as usize);
    for _ in 0..COUNT {
        let client = client.clone();
        handles.push(tokio::spawn(async move { client.execute("list-sessions", Duration::from_secs(5)).await }));
    }

    for handle in handles {
        handle.await.expect("task did not panic").expect("command should succeed");
    }
    responder.await.expect("responder task did not panic");

    assert_eq!(client.dropped_response_count(), 0);
}

#[tokio::test]
async fn output_events_are_delivered() {
    let (stdout_writer, stdout_reader) = duplex(4096);
    let (stdin_writer, _stdin_reader) = duplex(4096);
    let (client, mut output_rx, _notif_rx) = ControlClient::spawn(stdout_reader, stdin_writer);
    let _ = &client;

    let mut writer = stdout_writer;
    writer.write_all(b"%output %3 hi\\040there\n").await.unwrap();

    let (pane_id, data) = tokio::time::timeout(Duration::from_secs(1), output_rx.recv())
        .await
        .expect("recv within deadline")
        .expect("channel open");
    assert_eq!(pane_id, "%3");
    assert_eq!(data, b"hi there");
}
