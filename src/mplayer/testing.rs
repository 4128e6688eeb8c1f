//! In-memory stand-ins for MPlayer's stdout/stdin.

use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use parking_lot::Mutex;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

/// Canned output that counts how often it is polled. Clones share the cursor and count.
#[derive(Clone)]
pub struct CountingReader {
  inner: Arc<Mutex<io::Cursor<Vec<u8>>>>,
  reads: Arc<AtomicUsize>,
}

impl CountingReader {
  pub fn new(output: &str) -> Self {
    Self {
      inner: Arc::new(Mutex::new(io::Cursor::new(output.as_bytes().to_vec()))),
      reads: Arc::new(AtomicUsize::new(0)),
    }
  }

  pub fn reads(&self) -> usize {
    self.reads.load(Ordering::SeqCst)
  }
}

impl AsyncRead for CountingReader {
  fn poll_read(
    self: Pin<&mut Self>,
    cx: &mut Context<'_>,
    buf: &mut ReadBuf<'_>,
  ) -> Poll<io::Result<()>> {
    self.reads.fetch_add(1, Ordering::SeqCst);
    let mut cursor = self.inner.lock();
    Pin::new(&mut *cursor).poll_read(cx, buf)
  }
}

/// Input sink whose contents stay inspectable after being moved into a channel.
#[derive(Clone, Default)]
pub struct SharedWriter {
  written: Arc<Mutex<Vec<u8>>>,
}

impl SharedWriter {
  /// Written command lines, without terminators.
  pub fn lines(&self) -> Vec<String> {
    String::from_utf8_lossy(&self.written.lock())
      .lines()
      .map(str::to_string)
      .collect()
  }
}

impl AsyncWrite for SharedWriter {
  fn poll_write(
    self: Pin<&mut Self>,
    _cx: &mut Context<'_>,
    buf: &[u8],
  ) -> Poll<io::Result<usize>> {
    self.written.lock().extend_from_slice(buf);
    Poll::Ready(Ok(buf.len()))
  }

  fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
    Poll::Ready(Ok(()))
  }

  fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
    Poll::Ready(Ok(()))
  }
}
