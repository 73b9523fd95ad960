mod api;
mod ipc;
mod model;
mod progression;
mod summary;

use std::io::{self, BufRead, Write};

use serde_json::json;
use tracing_subscriber::EnvFilter;

fn main() {
    // stdout is the IPC channel; diagnostics go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let mut state = ipc::AppState {
        backend: None,
        review: None,
    };

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(_) => break,
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: ipc::Request = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                // No request id to echo back; reply with a bare envelope.
                let resp = json!({
                    "ok": false,
                    "error": { "code": "bad_json", "message": e.to_string() },
                });
                let _ = writeln!(stdout, "{}", resp);
                let _ = stdout.flush();
                continue;
            }
        };

        let resp = ipc::handle_request(&mut state, req);
        let _ = writeln!(
            stdout,
            "{}",
            serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
        );
        let _ = stdout.flush();
    }
}
