// Integration tests for the HTTP chat client against a canned local server.
//
// Each test binds an ephemeral port, answers exactly one request with a
// fixed HTTP response, and checks how the client surfaces it.

use anyhow::Result;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use voxchat::chat::{ChatService, HttpChatClient};

async fn spawn_canned_server(status: &'static str, body: &'static str) -> Result<String> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Ok((mut socket, _)) = listener.accept().await {
            // Read the full request before answering so the client's write
            // doesn't race the response.
            let mut buf = Vec::new();
            let mut tmp = [0u8; 1024];
            loop {
                let Ok(n) = socket.read(&mut tmp).await else { break };
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&tmp[..n]);
                if request_complete(&buf) {
                    break;
                }
            }

            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        }
    });

    Ok(format!("http://{addr}"))
}

fn request_complete(buf: &[u8]) -> bool {
    let Some(header_end) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
        return false;
    };

    let headers = String::from_utf8_lossy(&buf[..header_end]);
    let content_length = headers
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

    buf.len() >= header_end + 4 + content_length
}

#[tokio::test]
async fn successful_reply_is_extracted() -> Result<()> {
    let base = spawn_canned_server("200 OK", r#"{"response":"hi"}"#).await?;
    let client = HttpChatClient::new(&base);

    let reply = client.send("hello").await?;
    assert_eq!(reply, "hi");
    Ok(())
}

#[tokio::test]
async fn non_2xx_body_becomes_the_error_text() -> Result<()> {
    let base = spawn_canned_server("500 Internal Server Error", "server down").await?;
    let client = HttpChatClient::new(&base);

    let err = client.send("hello").await.unwrap_err();
    assert!(err.to_string().contains("server down"));
    Ok(())
}

#[tokio::test]
async fn body_without_response_field_is_an_error() -> Result<()> {
    let base = spawn_canned_server("200 OK", r#"{"error":"bad"}"#).await?;
    let client = HttpChatClient::new(&base);

    let err = client.send("hello").await.unwrap_err();
    assert!(format!("{err:#}").contains("Malformed chat response"));
    Ok(())
}

#[tokio::test]
async fn connection_failure_is_an_error() {
    // Nothing listens on port 1.
    let client = HttpChatClient::new("http://127.0.0.1:1");
    assert!(client.send("hello").await.is_err());
}
