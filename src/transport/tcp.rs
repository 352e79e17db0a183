use tokio::net::TcpStream;
use tracing::{debug, instrument};

use crate::error::Result;
use crate::utils::timeout::with_timeout_error;
use std::time::Duration;

/// Open a TCP connection to the admin port, giving up after `timeout`.
#[instrument(skip(timeout), fields(timeout_ms = timeout.as_millis() as u64))]
pub async fn connect(addr: &str, timeout: Duration) -> Result<TcpStream> {
    let stream = with_timeout_error(
        async { Ok(TcpStream::connect(addr).await?) },
        timeout,
    )
    .await?;

    // Requests are small and latency-bound.
    stream.set_nodelay(true)?;
    debug!(peer = ?stream.peer_addr().ok(), "TCP connection established");
    Ok(stream)
}
