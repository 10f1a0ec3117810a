// Transport layer for one SMPP session over TCP.
//
// The connection is split so the concurrency rules of the session engine
// fall out of the types: the write half lives behind an async mutex held
// for the duration of one complete PDU write (writes must never
// interleave, or frames are garbled on the wire), and the read half is
// owned exclusively by whichever task is reading. Framing on the read
// side is two exact reads: 4 octets of command_length, then exactly
// command_length - 4 further octets. Anything short of that means the
// stream can no longer be trusted and the session tears down.

use crate::codec::{CodecError, HEADER_LENGTH, MAX_PDU_SIZE};
use crate::frame::Pdu;
use bytes::Bytes;
use std::io::{self, Cursor};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufWriter};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};

/// Failure modes of one framed read.
#[derive(Debug)]
pub(crate) enum ReadError {
    /// Transport failure, including short reads (the peer closed or reset
    /// mid-frame).
    Io(io::Error),

    /// A full frame arrived but could not be parsed. The sequence number
    /// is carried so the session can answer with generic_nack; it is 0
    /// when even the length prefix was unusable.
    Frame {
        sequence_number: u32,
        source: CodecError,
    },
}

impl From<io::Error> for ReadError {
    fn from(e: io::Error) -> Self {
        ReadError::Io(e)
    }
}

/// Open the TCP connection, bounded by `socket_timeout`.
pub(crate) async fn connect(
    host: &str,
    port: u16,
    socket_timeout: Duration,
) -> io::Result<TcpStream> {
    let stream = tokio::time::timeout(socket_timeout, TcpStream::connect((host, port)))
        .await
        .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "connect timed out"))??;
    stream.set_nodelay(true)?;
    Ok(stream)
}

/// Split a connected stream into the session's two halves.
pub(crate) fn split(stream: TcpStream, socket_timeout: Duration) -> (ReadHalf, WriteHalf) {
    let (read, write) = stream.into_split();
    (
        ReadHalf { inner: read },
        WriteHalf {
            inner: BufWriter::new(write),
            socket_timeout,
        },
    )
}

/// The exclusive read side of the connection.
pub(crate) struct ReadHalf {
    inner: OwnedReadHalf,
}

impl ReadHalf {
    /// Read exactly one PDU. Returns the decoded frame together with the
    /// raw octets, which the hook surface receives verbatim.
    ///
    /// Blocks until a frame arrives; liveness on an idle link is the link
    /// prober's job, not a per-read timeout.
    pub(crate) async fn read_pdu(&mut self) -> Result<(Pdu, Bytes), ReadError> {
        let mut length_prefix = [0u8; 4];
        self.inner.read_exact(&mut length_prefix).await?;

        let command_length = u32::from_be_bytes(length_prefix);
        if command_length < HEADER_LENGTH as u32 || command_length > MAX_PDU_SIZE {
            return Err(ReadError::Frame {
                sequence_number: 0,
                source: CodecError::InvalidCommandLength {
                    length: command_length,
                },
            });
        }

        let mut frame = vec![0u8; command_length as usize];
        frame[..4].copy_from_slice(&length_prefix);
        self.inner.read_exact(&mut frame[4..]).await?;

        let raw = Bytes::from(frame);
        let mut cursor = Cursor::new(raw.as_ref());
        match Pdu::parse(&mut cursor) {
            Ok(pdu) => Ok((pdu, raw)),
            Err(source) => Err(ReadError::Frame {
                sequence_number: u32::from_be_bytes([raw[12], raw[13], raw[14], raw[15]]),
                source,
            }),
        }
    }

    /// Read one PDU with an upper bound, for the phases where a response
    /// is positively expected (bind, unbind drain).
    pub(crate) async fn read_pdu_timeout(
        &mut self,
        limit: Duration,
    ) -> Result<(Pdu, Bytes), ReadError> {
        tokio::time::timeout(limit, self.read_pdu())
            .await
            .map_err(|_| {
                ReadError::Io(io::Error::new(
                    io::ErrorKind::TimedOut,
                    "read timed out waiting for a response",
                ))
            })?
    }
}

/// The locked write side of the connection. Callers hold the surrounding
/// mutex for one call, which is exactly the span of one complete PDU.
pub(crate) struct WriteHalf {
    inner: BufWriter<OwnedWriteHalf>,
    socket_timeout: Duration,
}

impl WriteHalf {
    /// Write one complete, already-encoded PDU and flush it.
    pub(crate) async fn write_bytes(&mut self, frame: &[u8]) -> io::Result<()> {
        tokio::time::timeout(self.socket_timeout, async {
            self.inner.write_all(frame).await?;
            self.inner.flush().await
        })
        .await
        .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "write timed out"))?
    }

    /// Encode and write one PDU.
    pub(crate) async fn write_pdu(&mut self, pdu: &Pdu) -> io::Result<()> {
        let bytes = pdu
            .to_bytes()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        self.write_bytes(&bytes).await
    }
}
