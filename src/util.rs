use futures::{pin_mut, Stream, StreamExt};
use reqwest_middleware::ClientWithMiddleware;
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use tokio::{
    fs::File,
    io::{AsyncRead, AsyncWrite, AsyncWriteExt},
};

use crate::{error::StatusBarError, writer::ProgressWriter};

pub struct HttpClient {
    pub client: ClientWithMiddleware,
}

#[derive(thiserror::Error, Debug)]
pub enum CopyError {
    #[error("reqwest error: {0}")]
    ReqwestError(#[from] reqwest::Error),
    #[error("reqwest middleware error: {0}")]
    ReqwestMiddlewareError(#[from] reqwest_middleware::Error),
    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("status bar error: {0}")]
    StatusBarError(#[from] StatusBarError),
    #[error("source ended after {copied} of {expected} bytes")]
    Truncated { copied: u64, expected: u64 },
}

impl HttpClient {
    pub fn new() -> reqwest::Result<HttpClient> {
        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(3);
        let client = reqwest::Client::builder().build()?;

        let client = reqwest_middleware::ClientBuilder::new(client)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(HttpClient { client })
    }

    pub async fn open(&self, url: &str) -> Result<reqwest::Response, CopyError> {
        let resp = self.client.get(url).send().await?;
        Ok(resp.error_for_status()?)
    }
}

pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Where the CLI reads from.
pub enum Source {
    Http(reqwest::Response),
    Reader {
        len: Option<u64>,
        reader: Box<dyn AsyncRead + Unpin + Send>,
    },
}

impl Source {
    /// `-` is stdin, `http(s)://` a URL, anything else a file path.
    pub async fn open(input: &str) -> Result<Source, CopyError> {
        if input == "-" {
            return Ok(Source::Reader {
                len: None,
                reader: Box::new(tokio::io::stdin()),
            });
        }
        if is_url(input) {
            let client = HttpClient::new()?;
            return Ok(Source::Http(client.open(input).await?));
        }

        let file = File::open(input).await?;
        let len = file.metadata().await?.len();
        Ok(Source::Reader {
            len: Some(len),
            reader: Box::new(file),
        })
    }

    /// Size advertised by the source, if it knows it.
    pub fn len(&self) -> Option<u64> {
        match self {
            Source::Http(resp) => resp.content_length(),
            Source::Reader { len, .. } => *len,
        }
    }

    /// Copies everything into `writer` and checks the status bar saw the
    /// whole transfer.
    pub async fn copy_to<W>(self, writer: &mut ProgressWriter<W>) -> Result<u64, CopyError>
    where
        W: AsyncWrite + Unpin,
    {
        let copied = match self {
            Source::Http(resp) => copy_stream(resp.bytes_stream(), writer).await?,
            Source::Reader { mut reader, .. } => tokio::io::copy(&mut reader, writer).await?,
        };
        writer.flush().await?;

        let stats = writer.status_bar().stats();
        if !stats.is_complete() {
            return Err(CopyError::Truncated {
                copied: stats.current_size,
                expected: stats.total_size,
            });
        }
        Ok(copied)
    }
}

pub async fn copy_stream<S, B, E, W>(
    body: S,
    writer: &mut ProgressWriter<W>,
) -> Result<u64, CopyError>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    CopyError: From<E>,
    W: AsyncWrite + Unpin,
{
    pin_mut!(body);
    let mut size = 0;

    while let Some(chunk) = body.next().await {
        let chunk = chunk?;
        writer.write_all(chunk.as_ref()).await?;
        size += chunk.as_ref().len() as u64;
    }

    Ok(size)
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    };

    use super::*;
    use crate::{config::StatusBarOptions, status_bar::StatusBar};

    fn sink_writer(total: u64) -> (ProgressWriter<tokio::io::Sink>, Arc<AtomicBool>) {
        let done = Arc::new(AtomicBool::new(false));
        let flag = done.clone();
        let bar = StatusBar::builder(StatusBarOptions::with_total(total))
            .render(|_, _| ())
            .on_finish(move || flag.store(true, Ordering::SeqCst))
            .build()
            .unwrap();
        (ProgressWriter::sink(bar), done)
    }

    #[test]
    fn recognises_urls() {
        assert!(is_url("https://example.com/file.iso"));
        assert!(is_url("http://localhost:8080/"));
        assert!(!is_url("ftp://example.com"));
        assert!(!is_url("./https"));
    }

    #[tokio::test(start_paused = true)]
    async fn stream_copy_completes_the_bar() {
        let (mut writer, done) = sink_writer(30);
        let chunks = futures::stream::iter(vec![
            Ok::<_, std::io::Error>(vec![0u8; 10]),
            Ok(vec![0u8; 15]),
            Ok(vec![0u8; 5]),
        ]);

        let copied = copy_stream(chunks, &mut writer).await.unwrap();
        assert_eq!(copied, 30);
        assert!(done.load(Ordering::SeqCst));
        assert!(writer.status_bar().stats().is_complete());
    }

    #[tokio::test(start_paused = true)]
    async fn stream_errors_propagate() {
        let (mut writer, done) = sink_writer(30);
        let chunks = futures::stream::iter(vec![
            Ok(vec![0u8; 10]),
            Err(std::io::Error::new(std::io::ErrorKind::Other, "reset")),
        ]);

        let err = copy_stream(chunks, &mut writer).await.unwrap_err();
        assert!(matches!(err, CopyError::IoError(_)));
        assert!(!done.load(Ordering::SeqCst));
        assert_eq!(writer.status_bar().stats().current_size, 10);
    }

    #[tokio::test(start_paused = true)]
    async fn short_reader_is_truncated() {
        let (mut writer, _) = sink_writer(100);
        let source = Source::Reader {
            len: Some(100),
            reader: Box::new(&b"abc"[..]),
        };

        let err = source.copy_to(&mut writer).await.unwrap_err();
        assert!(matches!(
            err,
            CopyError::Truncated {
                copied: 3,
                expected: 100
            }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn reader_copy_reports_length() {
        let (mut writer, done) = sink_writer(5);
        let source = Source::Reader {
            len: Some(5),
            reader: Box::new(&b"hello"[..]),
        };
        assert_eq!(source.len(), Some(5));

        assert_eq!(source.copy_to(&mut writer).await.unwrap(), 5);
        assert!(done.load(Ordering::SeqCst));
    }
}
