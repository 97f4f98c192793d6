//! The byte-reader primitive (§4.1): the single consumer of transport
//! read-events during the handshake. Appends all inbound bytes to an
//! append-only receive buffer and hands slices out in FIFO order.
//! Reading ahead past a message boundary is explicitly allowed; the excess
//! stays buffered until the caller drains it.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::HandshakeError;

#[derive(Debug)]
pub struct ByteReader {
    rx_buffer: VecDeque<u8>,
    timeout: Duration,
}

impl ByteReader {
    pub fn new(timeout: Duration) -> Self {
        Self {
            rx_buffer: VecDeque::new(),
            timeout,
        }
    }

    /// Bytes already buffered but not yet handed out.
    pub fn buffered_len(&self) -> usize {
        self.rx_buffer.len()
    }

    /// Drain everything currently buffered, e.g. into
    /// `HandshakeResult.remaining_buffer` on successful return.
    pub fn drain_remaining(&mut self) -> Vec<u8> {
        self.rx_buffer.drain(..).collect()
    }

    /// Return the next `n` bytes, reading from `transport` as needed and
    /// waiting (bounded by `timeout`) if fewer are currently buffered.
    pub async fn read_exact<S>(
        &mut self,
        transport: &mut S,
        n: usize,
    ) -> Result<Vec<u8>, HandshakeError>
    where
        S: AsyncRead + Unpin,
    {
        while self.rx_buffer.len() < n {
            let mut chunk = [0u8; 4096];
            let read = tokio::time::timeout(self.timeout, transport.read(&mut chunk))
                .await
                .map_err(|_| HandshakeError::Timeout)??;
            if read == 0 {
                return Err(HandshakeError::TransportClosed);
            }
            self.rx_buffer.extend(chunk[..read].iter().copied());
        }
        Ok(self.rx_buffer.drain(..n).collect())
    }

    pub async fn read_u8<S>(&mut self, transport: &mut S) -> Result<u8, HandshakeError>
    where
        S: AsyncRead + Unpin,
    {
        Ok(self.read_exact(transport, 1).await?[0])
    }

    pub async fn read_i32<S>(&mut self, transport: &mut S) -> Result<i32, HandshakeError>
    where
        S: AsyncRead + Unpin,
    {
        let bytes = self.read_exact(transport, 4).await?;
        Ok(i32::from_be_bytes(bytes.try_into().expect("exactly 4 bytes")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn read_exact_waits_for_bytes_delivered_in_separate_chunks() {
        let (mut client, mut server) = tokio::io::duplex(64);
        let mut reader = ByteReader::new(Duration::from_secs(5));

        tokio::spawn(async move {
            use tokio::io::AsyncWriteExt;
            client.write_all(b"ab").await.unwrap();
            tokio::time::sleep(Duration::from_millis(5)).await;
            client.write_all(b"cd").await.unwrap();
        });

        let bytes = reader.read_exact(&mut server, 4).await.unwrap();
        assert_eq!(bytes, b"abcd");
        assert_eq!(reader.buffered_len(), 0);
    }

    #[tokio::test]
    async fn read_ahead_stays_buffered_for_later_reads() {
        let (mut client, mut server) = tokio::io::duplex(64);
        let mut reader = ByteReader::new(Duration::from_secs(5));

        use tokio::io::AsyncWriteExt;
        client.write_all(b"abcdef").await.unwrap();
        drop(client);

        let first = reader.read_exact(&mut server, 2).await.unwrap();
        assert_eq!(first, b"ab");
        assert_eq!(reader.buffered_len(), 4);

        let rest = reader.drain_remaining();
        assert_eq!(rest, b"cdef");
    }

    #[tokio::test]
    async fn closed_transport_before_enough_bytes_is_transport_closed() {
        let (client, mut server) = tokio::io::duplex(64);
        drop(client);
        let mut reader = ByteReader::new(Duration::from_secs(5));
        let err = reader.read_exact(&mut server, 1).await.unwrap_err();
        assert!(matches!(err, HandshakeError::TransportClosed));
    }

    #[tokio::test]
    async fn no_bytes_within_deadline_is_timeout() {
        let (_client, mut server) = tokio::io::duplex(64);
        let mut reader = ByteReader::new(Duration::from_millis(20));
        let err = reader.read_exact(&mut server, 1).await.unwrap_err();
        assert!(matches!(err, HandshakeError::Timeout));
    }
}
