use std::{
    io,
    pin::Pin,
    task::{ready, Context, Poll},
};

use tokio::io::{AsyncWrite, Sink};

use crate::status_bar::StatusBar;

/// Forwards writes to `W` and feeds every accepted byte count to a
/// [`StatusBar`].
///
/// A write larger than what is left of the transfer fails with
/// `InvalidInput` before anything reaches `W`. Dropping the writer, or
/// calling [`ProgressWriter::detach`], before the transfer completes cancels
/// the status bar.
pub struct ProgressWriter<W> {
    inner: W,
    bar: StatusBar,
}

impl<W: AsyncWrite + Unpin> ProgressWriter<W> {
    pub fn new(inner: W, bar: StatusBar) -> Self {
        Self { inner, bar }
    }

    pub fn status_bar(&self) -> &StatusBar {
        &self.bar
    }

    pub fn status_bar_mut(&mut self) -> &mut StatusBar {
        &mut self.bar
    }

    /// Stops observing and hands back the wrapped writer.
    pub fn detach(mut self) -> W {
        self.bar.cancel();
        self.inner
    }

    pub fn into_parts(self) -> (W, StatusBar) {
        (self.inner, self.bar)
    }
}

impl ProgressWriter<Sink> {
    /// Observes a stream without keeping its data.
    pub fn sink(bar: StatusBar) -> Self {
        Self::new(tokio::io::sink(), bar)
    }
}

impl<W: AsyncWrite + Unpin> AsyncWrite for ProgressWriter<W> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        if this.bar.is_active() {
            let remaining = this.bar.stats().remaining_size;
            if buf.len() as u64 > remaining {
                return Poll::Ready(Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!(
                        "write of {} bytes overshoots the {} bytes remaining",
                        buf.len(),
                        remaining
                    ),
                )));
            }
        }

        let written = ready!(Pin::new(&mut this.inner).poll_write(cx, buf))?;
        this.bar
            .ingest(written)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        Poll::Ready(Ok(written))
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_shutdown(cx)
    }
}
