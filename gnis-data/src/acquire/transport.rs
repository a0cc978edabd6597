//! Streaming archive downloads.

use std::{io::Write, num::NonZeroUsize};

use futures_util::StreamExt;
use gnis_core::GnisConfig;
use log::debug;

use crate::TransportError;
use crate::http::{BlockingClient, Deadline};

/// Fetch an archive and stream its bytes into a sink.
pub trait ArchiveTransport {
    /// Stream the resource at `url` into `sink`, returning the byte count.
    ///
    /// # Errors
    /// Returns [`TransportError`] on a non-success status, a connection
    /// failure, a timeout, or a sink write failure.
    fn download(&self, url: &str, sink: &mut dyn Write) -> Result<u64, TransportError>;
}

impl<T: ArchiveTransport + ?Sized> ArchiveTransport for &T {
    fn download(&self, url: &str, sink: &mut dyn Write) -> Result<u64, TransportError> {
        (**self).download(url, sink)
    }
}

/// HTTP implementation of [`ArchiveTransport`].
///
/// Response bodies are consumed as a byte stream and written to the sink in
/// chunks of at most the configured chunk size, so archives never need to be
/// buffered twice. The download timeout bounds connecting and each stall in
/// the body, not the whole transfer.
#[derive(Debug)]
pub struct HttpArchiveTransport {
    http: BlockingClient,
    chunk_size: NonZeroUsize,
}

impl HttpArchiveTransport {
    /// Build a transport using the download timeout, chunk size, and user
    /// agent from `config`.
    ///
    /// # Errors
    /// Returns [`TransportError::Build`] or [`TransportError::Runtime`] when
    /// the client or its runtime cannot be constructed.
    pub fn new(config: &GnisConfig) -> Result<Self, TransportError> {
        Ok(Self {
            http: BlockingClient::new(
                &config.user_agent,
                config.download_timeout,
                Deadline::Idle,
            )?,
            chunk_size: config.chunk_size,
        })
    }

    /// Chunk size used when writing to the sink.
    #[must_use]
    pub const fn chunk_size(&self) -> NonZeroUsize {
        self.chunk_size
    }

    async fn stream_to(&self, url: &str, sink: &mut dyn Write) -> Result<u64, TransportError> {
        let response = self
            .http
            .client()
            .get(url)
            .send()
            .await
            .map_err(|err| self.http.convert_error(&err, url))?
            .error_for_status()
            .map_err(|err| self.http.convert_error(&err, url))?;

        let mut written = 0_u64;
        let mut body = response.bytes_stream();
        while let Some(next) = body.next().await {
            let bytes = next.map_err(|err| self.http.convert_error(&err, url))?;
            for chunk in bytes.chunks(self.chunk_size.get()) {
                sink.write_all(chunk)
                    .map_err(|source| TransportError::Network {
                        url: url.to_owned(),
                        source,
                    })?;
                written += chunk.len() as u64;
            }
        }
        debug!("downloaded {written} bytes from {url}");
        Ok(written)
    }
}

impl ArchiveTransport for HttpArchiveTransport {
    fn download(&self, url: &str, sink: &mut dyn Write) -> Result<u64, TransportError> {
        self.http.block_on(self.stream_to(url, sink))
    }
}

#[cfg(test)]
mod tests {
    use std::io::{BufRead, BufReader, Write as _};
    use std::net::TcpListener;
    use std::thread;
    use std::time::Duration;

    use rstest::rstest;

    use super::*;

    const PIECE: usize = 1024;

    /// Serve one `GET` whose body arrives in `pieces` parts of [`PIECE`] bytes,
    /// sleeping `gap` before each part.
    fn serve_slowly(pieces: usize, gap: Duration) -> (String, thread::JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind local listener");
        let url = format!(
            "http://{}/Gazetteer_CA_GPKG.zip",
            listener.local_addr().expect("listener address")
        );
        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().expect("accept connection");
            let mut reader = BufReader::new(stream.try_clone().expect("clone stream"));
            let mut line = String::new();
            while reader.read_line(&mut line).is_ok_and(|read| read > 2) {
                line.clear();
            }
            let mut stream = stream;
            let head = format!(
                "HTTP/1.1 200 OK\r\ncontent-length: {}\r\nconnection: close\r\n\r\n",
                pieces * PIECE
            );
            if stream.write_all(head.as_bytes()).is_err() {
                return;
            }
            for _ in 0..pieces {
                thread::sleep(gap);
                if stream.write_all(&[0xA5; PIECE]).and_then(|()| stream.flush()).is_err() {
                    return;
                }
            }
        });
        (url, server)
    }

    fn transport(timeout: Duration) -> HttpArchiveTransport {
        let config = GnisConfig::default().with_download_timeout(timeout);
        HttpArchiveTransport::new(&config).expect("build transport")
    }

    #[rstest]
    fn slow_but_live_download_outlasts_the_timeout() {
        let (url, server) = serve_slowly(10, Duration::from_millis(150));
        let mut sink = Vec::new();

        let written = transport(Duration::from_secs(1))
            .download(&url, &mut sink)
            .expect("a transfer that never stalls should complete");

        assert_eq!(written, (10 * PIECE) as u64);
        assert_eq!(sink.len(), 10 * PIECE);
        server.join().expect("server thread");
    }

    #[rstest]
    fn stalled_download_reports_a_timeout() {
        let (url, _server) = serve_slowly(2, Duration::from_secs(2));
        let mut sink = Vec::new();

        let err = transport(Duration::from_millis(200))
            .download(&url, &mut sink)
            .expect_err("a stalled body should time out");

        assert!(
            matches!(err, TransportError::Timeout { ref url, .. } if url.ends_with(".zip")),
            "expected a timeout, found {err:?}"
        );
    }
}
