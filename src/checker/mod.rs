// src/checker/mod.rs
// =============================================================================
// This module contains all link probing logic.
//
// Submodules:
// - probe: Decides alive/dead/blocked/archived/error for a single URL
// - retry: Wraps a probe with retries and false-positive mitigation
// - batch: Fans probes out over many URLs with bounded concurrency
//
// This file (mod.rs) is the module root - it ties everything together and
// exports the public API that other parts of our application can use. It
// also hosts the stub HTTP server the submodule tests share, so the test
// suite never depends on live endpoints.
// =============================================================================

// Declare submodules (tells Rust to include these files)
mod batch;
mod probe;
mod retry;

// Re-export public items from submodules
// This lets users write `checker::run_batch()` instead of
// `checker::batch::run_batch()`
pub use batch::{run_batch, BatchConfig, Progress};
pub use probe::{is_redirect_code, LinkStatus, ProbeResult, Prober, REDIRECT_CODES};
pub use retry::{is_likely_false_positive, probe_with_retry, validate_secondary};

// A tiny deterministic HTTP server for tests.
//
// It binds an ephemeral localhost port and answers each request from a
// fixed path->response table; unknown paths get a 404. Responses are raw
// HTTP/1.1 bytes with Connection: close, which is all reqwest needs.
#[cfg(test)]
pub(crate) mod stub {
    use std::collections::HashMap;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    // Builds a complete canned HTTP/1.1 response
    pub fn canned(status: &str, extra_headers: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n{}\r\n{}",
            status,
            body.len(),
            extra_headers,
            body
        )
    }

    // Starts the server and returns its base URL (e.g. "http://127.0.0.1:49152").
    // The accept loop lives in a background task and dies with the runtime.
    pub async fn serve(routes: Vec<(&'static str, String)>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());

        let table: HashMap<String, String> = routes
            .into_iter()
            .map(|(path, response)| (path.to_string(), response))
            .collect();

        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    break;
                };
                let table = table.clone();

                tokio::spawn(async move {
                    let mut buf = vec![0u8; 4096];
                    let n = socket.read(&mut buf).await.unwrap_or(0);
                    let request = String::from_utf8_lossy(&buf[..n]).to_string();

                    // Request line: METHOD PATH HTTP/1.1
                    let path = request.split_whitespace().nth(1).unwrap_or("/");

                    let response = table
                        .get(path)
                        .cloned()
                        .unwrap_or_else(|| canned("404 Not Found", "", "not found"));

                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });

        base
    }
}
