//! Blocking reader on a detached thread
//!
//! Wraps a `std::io::Read` whose reads can park indefinitely (stdin) and
//! exposes it as `AsyncRead`. The reading thread is never joined, so a
//! pending read does not hold up runtime shutdown.

use std::io::{self, Read};
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use tokio::io::{AsyncRead, ReadBuf};
use tokio::sync::mpsc;

/// Bytes requested per blocking read
const CHUNK_SIZE: usize = 8 * 1024;

/// Chunks buffered between the thread and the reader
const CHANNEL_CAPACITY: usize = 4;

pub(crate) struct ThreadReader {
    rx: mpsc::Receiver<io::Result<Vec<u8>>>,
    pending: Vec<u8>,
    pos: usize,
}

impl ThreadReader {
    /// Start a named thread draining `inner`
    ///
    /// The thread exits at end-of-stream, after a read error, or once the
    /// reader is dropped and its next chunk has nowhere to go.
    pub(crate) fn spawn<R>(name: &str, mut inner: R) -> io::Result<Self>
    where
        R: Read + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);

        std::thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                let mut chunk = vec![0u8; CHUNK_SIZE];
                loop {
                    let message = match inner.read(&mut chunk) {
                        Ok(0) => break,
                        Ok(n) => Ok(chunk[..n].to_vec()),
                        Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                        Err(e) => Err(e),
                    };
                    let failed = message.is_err();
                    if tx.blocking_send(message).is_err() || failed {
                        break;
                    }
                }
            })?;

        Ok(Self {
            rx,
            pending: Vec::new(),
            pos: 0,
        })
    }
}

impl AsyncRead for ThreadReader {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();

        if this.pos >= this.pending.len() {
            match ready!(this.rx.poll_recv(cx)) {
                Some(Ok(chunk)) => {
                    this.pending = chunk;
                    this.pos = 0;
                }
                Some(Err(e)) => return Poll::Ready(Err(e)),
                // thread finished: end of stream
                None => return Poll::Ready(Ok(())),
            }
        }

        let n = (this.pending.len() - this.pos).min(buf.remaining());
        buf.put_slice(&this.pending[this.pos..this.pos + n]);
        this.pos += n;
        Poll::Ready(Ok(()))
    }
}
