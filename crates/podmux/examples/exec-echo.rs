//! Exec-echo example — a scripted server end and a multiplexed client end
//! sharing one in-memory connection.
//!
//! Run with:
//!   cargo run --example exec-echo

use tokio_util::sync::CancellationToken;

use podmux::conn::{pair, MessageConnection, MessageSink, MessageSource};
use podmux::frame::{decode_frame, encode_frame, ChannelSet, ERROR, STDIN, STDOUT};
use podmux::session::{MuxSession, ShutdownMode};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let set = ChannelSet::standard();
    let (client_conn, server_conn) = pair(16);

    // The "server": echo every stdin payload back on stdout, then report
    // success on the error channel and hang up.
    let server_set = set.clone();
    let server = tokio::spawn(async move {
        let (mut rx, mut tx) = server_conn.split();
        while let Ok(Some(message)) = rx.recv().await {
            let frame = match decode_frame(message) {
                Ok(frame) => frame,
                Err(err) => {
                    eprintln!("[server] bad frame: {err}");
                    break;
                }
            };
            if frame.channel != STDIN {
                continue;
            }
            if frame.payload.as_ref() == b"exit" {
                break;
            }
            let echo = encode_frame(&server_set, STDOUT, &frame.payload)
                .expect("stdout is in the server's set");
            if tx.send(echo).await.is_err() {
                break;
            }
        }
        let status = encode_frame(&server_set, ERROR, br#"{"status":"Success"}"#)
            .expect("error channel is in the server's set");
        let _ = tx.send(status).await;
        let _ = tx.close().await;
    });

    // The "client": a multiplexed session over its end of the connection.
    let session = MuxSession::new(client_conn, set);
    let stdin = session.take_stream("stdin")?;
    let mut stdout = session.take_stream("stdout")?;
    let mut error = session.take_stream("error")?;

    let cancel = CancellationToken::new();
    for line in ["hello", "multiplexed", "world", "exit"] {
        stdin.write(line.as_bytes(), &cancel).await?;
        println!("[client] sent: {line}");
    }

    while let Some(chunk) = stdout.read(4096, &cancel).await? {
        println!("[client] stdout: {}", String::from_utf8_lossy(&chunk));
    }

    let mut status_payload = Vec::new();
    while let Some(chunk) = error.read(4096, &cancel).await? {
        status_payload.extend_from_slice(&chunk);
    }
    let status = podmux::session::CommandStatus::from_payload(&status_payload)?;
    println!(
        "[client] command finished, exit code {:?}",
        status.exit_code()
    );

    session.shutdown(ShutdownMode::Graceful, &cancel).await?;
    server.await?;
    Ok(())
}
