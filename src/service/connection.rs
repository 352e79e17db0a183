use std::sync::Arc;

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, error, instrument, warn};

use crate::core::codec::FrameCodec;
use crate::error::ProtocolError;
use crate::service::client::Inner;

/// Work items for the writer task.
#[derive(Debug)]
pub(crate) enum Outbound {
    Frame(Bytes),
    /// Flush, shut the write half down and stop.
    Close,
}

/// How the read side ended.
enum Ended {
    Shutdown,
    Eof,
    Failed(ProtocolError),
}

/// Drive one connection until it closes.
///
/// The write half gets its own task fed by `outbound`; the read half is polled here
/// and every complete frame is handed to [`Inner::handle_frame`].
#[instrument(skip_all)]
pub(crate) async fn run<S>(stream: S, inner: Arc<Inner>, outbound: mpsc::UnboundedReceiver<Outbound>)
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let (read_half, write_half) = tokio::io::split(stream);
    let codec = FrameCodec::with_max_frame_size(inner.config.max_frame_size);

    tokio::spawn(write_loop(
        FramedWrite::new(write_half, codec),
        outbound,
        Arc::clone(&inner),
    ));

    let mut frames = FramedRead::new(read_half, codec);
    let ended = loop {
        tokio::select! {
            _ = inner.shutdown.cancelled() => break Ended::Shutdown,
            next = frames.next() => match next {
                Some(Ok(frame)) => inner.handle_frame(frame),
                Some(Err(e)) => break Ended::Failed(e),
                None => break Ended::Eof,
            },
        }
    };

    match ended {
        Ended::Shutdown => debug!("Reader stopped on shutdown"),
        Ended::Eof => {
            debug!("Server closed the connection");
            inner.on_transport_closed(None);
        }
        Ended::Failed(e) => {
            warn!(error = %e, "Read side failed");
            inner.on_transport_closed(Some(e));
        }
    }
}

async fn write_loop<W>(
    mut sink: FramedWrite<W, FrameCodec>,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
    inner: Arc<Inner>,
) where
    W: AsyncWrite + Unpin,
{
    while let Some(item) = outbound.recv().await {
        match item {
            Outbound::Frame(bytes) => {
                let len = bytes.len() as u64;
                if let Err(e) = sink.send(bytes).await {
                    error!(error = %e, "Write failed");
                    inner.on_transport_closed(Some(e));
                    return;
                }
                inner.metrics.frame_sent(len);
            }
            Outbound::Close => break,
        }
    }

    if let Err(e) = SinkExt::<Bytes>::close(&mut sink).await {
        debug!(error = %e, "Error while shutting down write half");
    }
}
