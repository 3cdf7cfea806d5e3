use std::io::ErrorKind;
use tokio::net::TcpListener;

/// Binds `host:port`, moving on to the next port while the current one is in use.
/// Any other bind error, or running out of attempts, is returned.
pub async fn bind_with_fallback(host: &str, port: u16, attempts: u16) -> std::io::Result<TcpListener> {
    let attempts = attempts.max(1);
    let mut last_err = None;

    for offset in 0..attempts {
        let Some(candidate) = port.checked_add(offset) else {
            break;
        };
        match TcpListener::bind((host, candidate)).await {
            Ok(listener) => return Ok(listener),
            Err(e) if e.kind() == ErrorKind::AddrInUse => {
                tracing::warn!(
                    "Port {} is already in use. Trying port {}...",
                    candidate,
                    candidate.saturating_add(1)
                );
                last_err = Some(e);
            }
            Err(e) => return Err(e),
        }
    }

    Err(last_err.unwrap_or_else(|| {
        std::io::Error::new(ErrorKind::AddrInUse, format!("no free port from {}", port))
    }))
}
