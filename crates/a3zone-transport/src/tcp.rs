//! Newline-delimited frames over plain TCP.

use std::net::SocketAddr;

use futures_util::{SinkExt, StreamExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec, LinesCodecError};

use crate::{Connection, ConnectionId, Transport, TransportError};

/// Largest inbound line accepted by default (1 MiB).
pub const DEFAULT_MAX_FRAME_LEN: usize = 1024 * 1024;

/// A TCP listener producing [`TcpLineConnection`]s.
pub struct TcpLineTransport {
    listener: TcpListener,
    max_frame_len: usize,
}

impl TcpLineTransport {
    /// Binds to `addr` with the default frame limit.
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        Self::bind_with_limit(addr, DEFAULT_MAX_FRAME_LEN).await
    }

    /// Binds to `addr`, rejecting inbound lines longer than `max_frame_len`.
    pub async fn bind_with_limit(
        addr: &str,
        max_frame_len: usize,
    ) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(TransportError::AcceptFailed)?;
        tracing::info!(addr, max_frame_len, "TCP line transport listening");
        Ok(Self {
            listener,
            max_frame_len,
        })
    }
}

impl Transport for TcpLineTransport {
    type Connection = TcpLineConnection;

    async fn accept(&mut self) -> Result<Self::Connection, TransportError> {
        let (stream, peer) = self
            .listener
            .accept()
            .await
            .map_err(TransportError::AcceptFailed)?;
        // Small interactive frames; don't wait to coalesce them.
        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!(%peer, error = %e, "set_nodelay failed");
        }

        let id = ConnectionId::next();
        tracing::debug!(%id, %peer, "accepted TCP connection");

        let (read_half, write_half) = stream.into_split();
        Ok(TcpLineConnection {
            id,
            peer,
            max_frame_len: self.max_frame_len,
            reader: Mutex::new(FramedRead::new(
                read_half,
                LinesCodec::new_with_max_length(self.max_frame_len),
            )),
            writer: Mutex::new(FramedWrite::new(write_half, LinesCodec::new())),
        })
    }

    fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

/// One accepted TCP connection speaking newline-delimited frames.
pub struct TcpLineConnection {
    id: ConnectionId,
    peer: SocketAddr,
    max_frame_len: usize,
    reader: Mutex<FramedRead<OwnedReadHalf, LinesCodec>>,
    writer: Mutex<FramedWrite<OwnedWriteHalf, LinesCodec>>,
}

impl Connection for TcpLineConnection {
    async fn send(&self, data: &[u8]) -> Result<(), TransportError> {
        let line = String::from_utf8_lossy(data);
        self.writer
            .lock()
            .await
            .send(line.as_ref())
            .await
            .map_err(|e| match e {
                LinesCodecError::Io(io) => TransportError::SendFailed(io),
                LinesCodecError::MaxLineLengthExceeded => {
                    TransportError::FrameTooLarge(self.max_frame_len)
                }
            })
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, TransportError> {
        let mut reader = self.reader.lock().await;
        loop {
            match reader.next().await {
                Some(Ok(line)) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    return Ok(Some(line.into_bytes()));
                }
                Some(Err(LinesCodecError::MaxLineLengthExceeded)) => {
                    return Err(TransportError::FrameTooLarge(self.max_frame_len));
                }
                Some(Err(LinesCodecError::Io(e))) => {
                    return Err(TransportError::ReceiveFailed(e));
                }
                None => return Ok(None),
            }
        }
    }

    async fn close(&self) -> Result<(), TransportError> {
        let mut writer = self.writer.lock().await;
        SinkExt::<String>::close(&mut *writer).await.map_err(|e| match e {
            LinesCodecError::Io(io) => TransportError::SendFailed(io),
            LinesCodecError::MaxLineLengthExceeded => {
                TransportError::ConnectionClosed("close failed".into())
            }
        })
    }

    fn id(&self) -> ConnectionId {
        self.id
    }

    fn peer_addr(&self) -> SocketAddr {
        self.peer
    }
}
