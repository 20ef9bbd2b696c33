//! Line-framed round trips over a pair of async byte streams
//!
//! [`PipeTransport`] is generic over its streams so the same code drives a
//! child process's stdin/stdout and an in-memory `tokio::io::duplex` pipe.

use crate::error::{Result, TransportError};
use crate::traits::Transport;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, BufWriter};
use tokio::sync::Mutex;
use tracing::{debug, warn};

const HEALTHY: u8 = 0;
const DESYNCHRONIZED: u8 = 1;
const CLOSED: u8 = 2;

/// How far the last round trip got before it returned or was dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    /// The request line may be partially written
    Writing,
    /// The request line is complete; its response is owed
    AwaitingResponse,
}

struct PipeIo<W, R> {
    writer: Option<BufWriter<W>>,
    reader: BufReader<R>,
    /// Bytes of the current response line read so far
    line: Vec<u8>,
    phase: Phase,
    /// Responses still owed to abandoned round trips
    stale: usize,
}

/// Serialized request/response transport over a writer and a line reader
///
/// Holds one async mutex around both streams, so a round trip (write,
/// flush, read one line) is never interleaved with another.
///
/// A round trip that does not finish, because it failed, timed out or was
/// dropped by a cancelled caller, is settled by the next call. If its
/// request line went out whole, the backend still owes one response line;
/// that line is read and discarded before the next request is written, so
/// request N+1 is never paired with response N. If the request line may
/// have gone out partially, pairing cannot be restored and every later call
/// fails with [`TransportError::Desynchronized`].
pub struct PipeTransport<W, R> {
    io: Mutex<PipeIo<W, R>>,
    status: AtomicU8,
    call_timeout: Option<Duration>,
}

impl<W, R> PipeTransport<W, R>
where
    W: AsyncWrite + Unpin + Send,
    R: AsyncRead + Unpin + Send,
{
    /// Wrap a request stream and a response stream
    pub fn new(writer: W, reader: R) -> Self {
        Self {
            io: Mutex::new(PipeIo {
                writer: Some(BufWriter::new(writer)),
                reader: BufReader::new(reader),
                line: Vec::new(),
                phase: Phase::Idle,
                stale: 0,
            }),
            status: AtomicU8::new(HEALTHY),
            call_timeout: None,
        }
    }

    /// Bound every round trip by `timeout`
    pub fn with_call_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// The configured round trip timeout
    pub fn call_timeout(&self) -> Option<Duration> {
        self.call_timeout
    }

    fn check_status(&self) -> Result<()> {
        match self.status.load(Ordering::SeqCst) {
            HEALTHY => Ok(()),
            DESYNCHRONIZED => Err(TransportError::Desynchronized),
            _ => Err(TransportError::Closed("transport is closed".to_string())),
        }
    }

    fn mark_closed(&self) {
        self.status.store(CLOSED, Ordering::SeqCst);
    }

    /// Account for a round trip that did not run to completion
    fn settle(&self, io: &mut PipeIo<W, R>) -> Result<()> {
        match std::mem::replace(&mut io.phase, Phase::Idle) {
            Phase::Idle => Ok(()),
            Phase::AwaitingResponse => {
                io.stale += 1;
                debug!(stale = io.stale, "abandoned round trip; its response will be skipped");
                Ok(())
            }
            Phase::Writing => {
                // CLOSED takes precedence
                let _ = self.status.compare_exchange(
                    HEALTHY,
                    DESYNCHRONIZED,
                    Ordering::SeqCst,
                    Ordering::SeqCst,
                );
                warn!("round trip abandoned mid-write; transport desynchronized");
                self.check_status()
            }
        }
    }

    fn write_failed(&self, err: std::io::Error) -> TransportError {
        if err.kind() == std::io::ErrorKind::BrokenPipe {
            self.mark_closed();
            return TransportError::Closed("backend closed its input stream".to_string());
        }
        err.into()
    }

    /// Complete one line into `line`, terminator stripped
    ///
    /// Bytes read before a cancellation stay in `line` for the next attempt.
    async fn read_line(&self, reader: &mut BufReader<R>, line: &mut Vec<u8>) -> Result<()> {
        reader.read_until(b'\n', line).await?;
        if line.last() != Some(&b'\n') {
            self.mark_closed();
            return Err(TransportError::Closed(if line.is_empty() {
                "backend closed its output stream".to_string()
            } else {
                "backend closed its output stream mid-response".to_string()
            }));
        }
        line.pop();
        Ok(())
    }

    async fn round_trip(&self, io: &mut PipeIo<W, R>, request: &[u8]) -> Result<Vec<u8>> {
        let PipeIo {
            writer,
            reader,
            line,
            phase,
            stale,
        } = io;
        let writer = writer
            .as_mut()
            .ok_or_else(|| TransportError::Closed("transport is closed".to_string()))?;

        if *stale > 0 {
            // An abandoned request may still sit in the write buffer
            writer.flush().await.map_err(|e| self.write_failed(e))?;
            while *stale > 0 {
                self.read_line(reader, line).await?;
                line.clear();
                *stale -= 1;
                debug!(remaining = *stale, "skipped response of an abandoned round trip");
            }
        }

        *phase = Phase::Writing;
        writer
            .write_all(request)
            .await
            .map_err(|e| self.write_failed(e))?;
        writer.write_all(b"\n").await.map_err(|e| self.write_failed(e))?;
        *phase = Phase::AwaitingResponse;
        writer.flush().await.map_err(|e| self.write_failed(e))?;

        self.read_line(reader, line).await?;
        *phase = Phase::Idle;

        let mut response = std::mem::take(line);
        if response.last() == Some(&b'\r') {
            response.pop();
        }
        Ok(response)
    }

    /// Flush and close the request stream
    ///
    /// Waits for an in-flight round trip to finish first.
    pub async fn shutdown(&self) -> Result<()> {
        let mut io = self.io.lock().await;
        self.mark_closed();
        if let Some(mut writer) = io.writer.take() {
            // The backend may already be gone; closing must still succeed.
            if let Err(err) = writer.shutdown().await {
                debug!(error = %err, "request stream already closed");
            }
        }
        Ok(())
    }
}

#[async_trait]
impl<W, R> Transport for PipeTransport<W, R>
where
    W: AsyncWrite + Unpin + Send,
    R: AsyncRead + Unpin + Send,
{
    async fn call(&self, request: &[u8]) -> Result<Vec<u8>> {
        if request.contains(&b'\n') {
            return Err(TransportError::InvalidFrame(
                "request contains a raw newline".to_string(),
            ));
        }

        let mut io = self.io.lock().await;
        self.check_status()?;
        self.settle(&mut io)?;

        let response = match self.call_timeout {
            Some(limit) => {
                match tokio::time::timeout(limit, self.round_trip(&mut io, request)).await {
                    Ok(result) => result?,
                    Err(_) => {
                        warn!(timeout = ?limit, "round trip timed out");
                        return Err(TransportError::Timeout(limit));
                    }
                }
            }
            None => self.round_trip(&mut io, request).await?,
        };

        debug!(
            request_bytes = request.len(),
            response_bytes = response.len(),
            "round trip complete"
        );
        Ok(response)
    }

    async fn is_connected(&self) -> bool {
        self.status.load(Ordering::SeqCst) == HEALTHY
    }

    async fn close(&self) -> Result<()> {
        self.shutdown().await
    }
}
