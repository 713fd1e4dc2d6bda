pub mod mock_transcriber;

use futures::SinkExt;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio_tungstenite::tungstenite::Message;

/// Minimal broadcast endpoint: accepts POSTs, forwards each JSON body over
/// a channel, answers 200. Returns the base URL to point a bridge at.
pub async fn spawn_broadcast_stub() -> (String, UnboundedReceiver<serde_json::Value>) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind broadcast stub");
    let addr = listener.local_addr().expect("Broadcast stub has no addr");
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            tokio::spawn(handle_broadcast_conn(socket, tx.clone()));
        }
    });

    (format!("http://{}", addr), rx)
}

async fn handle_broadcast_conn(mut socket: TcpStream, tx: UnboundedSender<serde_json::Value>) {
    let mut buf: Vec<u8> = Vec::new();
    let mut tmp = [0u8; 4096];

    loop {
        // serve every complete request currently buffered (the client
        // keeps the connection alive between requests)
        while let Some(header_end) = find_subslice(&buf, b"\r\n\r\n") {
            let body_start = header_end + 4;
            let header = String::from_utf8_lossy(&buf[..header_end]).to_string();
            let content_length = header
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    if name.eq_ignore_ascii_case("content-length") {
                        value.trim().parse::<usize>().ok()
                    } else {
                        None
                    }
                })
                .unwrap_or(0);

            if buf.len() < body_start + content_length {
                break; // body not fully received yet
            }

            let body = buf[body_start..body_start + content_length].to_vec();
            buf.drain(..body_start + content_length);

            if let Ok(value) = serde_json::from_slice::<serde_json::Value>(&body) {
                let _ = tx.send(value);
            }

            if socket
                .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 0\r\n\r\n")
                .await
                .is_err()
            {
                return;
            }
        }

        match socket.read(&mut tmp).await {
            Ok(0) | Err(_) => return,
            Ok(n) => buf.extend_from_slice(&tmp[..n]),
        }
    }
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Scripted front-end capture socket: every connection gets the same
/// sequence of text frames, then a close. Returns the ws:// URL.
pub async fn spawn_mic_stub(script: Vec<String>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind mic stub");
    let addr = listener.local_addr().expect("Mic stub has no addr");

    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            let script = script.clone();
            tokio::spawn(async move {
                let mut ws = match tokio_tungstenite::accept_async(socket).await {
                    Ok(ws) => ws,
                    Err(_) => return,
                };
                for line in script {
                    if ws.send(Message::text(line)).await.is_err() {
                        return;
                    }
                }
                let _ = ws.close(None).await;
            });
        }
    });

    format!("ws://{}/server-ws", addr)
}
