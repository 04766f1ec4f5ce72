// src/download/mod.rs
use async_trait::async_trait;
use reqwest::header;
use std::error::Error as StdError;
use std::io::ErrorKind;
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use crate::config::RetryPolicy;
use crate::utils::error::DownloadError;

const DOWNLOAD_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const DOWNLOAD_TIMEOUT_SECS: u64 = 60;

/// Fetches a remote document into a local file.
#[async_trait]
pub trait DocumentFetcher: Send + Sync + 'static {
    /// Returns the number of bytes written to `dest`.
    async fn fetch(&self, url: &str, dest: &Path) -> Result<u64, DownloadError>;
}

/// HTTP downloader with bounded retry and exponential backoff.
pub struct Downloader {
    client: reqwest::Client,
    retry: RetryPolicy,
}

impl Downloader {
    pub fn new(retry: RetryPolicy, verify_tls: bool) -> Result<Self, DownloadError> {
        if !verify_tls {
            // Deliberate: transcripts are often hosted on sites with expired or
            // self-signed certificates. Anything downloaded is untrusted input.
            tracing::warn!("TLS certificate verification is disabled for PDF downloads");
        }
        let client = reqwest::Client::builder()
            .user_agent(DOWNLOAD_USER_AGENT)
            .timeout(Duration::from_secs(DOWNLOAD_TIMEOUT_SECS))
            .danger_accept_invalid_certs(!verify_tls)
            .build()?;
        Ok(Self { client, retry })
    }

    async fn backoff(&self, retry: u32, url: &str, reason: &str) {
        let delay = self.retry.delay_for(retry);
        tracing::warn!(
            "Download attempt {} for {} failed ({}), retrying in {:?}",
            retry + 1, url, reason, delay
        );
        tokio::time::sleep(delay).await;
    }
}

#[async_trait]
impl DocumentFetcher for Downloader {
    async fn fetch(&self, url: &str, dest: &Path) -> Result<u64, DownloadError> {
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut retry = 0;
        loop {
            let result = self.client.get(url)
                .header(header::ACCEPT, "application/pdf,*/*")
                .send()
                .await;

            match result {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        let written = match write_body(response, dest).await {
                            Ok(written) => written,
                            Err(e) => {
                                discard_partial(dest).await;
                                return Err(e);
                            }
                        };
                        tracing::info!("Downloaded {} ({} bytes) to {}", url, written, dest.display());
                        return Ok(written);
                    }
                    if self.retry.should_retry_status(status) && retry < self.retry.max_retries {
                        self.backoff(retry, url, status.as_str()).await;
                        retry += 1;
                        continue;
                    }
                    tracing::error!("HTTP error status: {} for URL: {}", status, url);
                    return Err(DownloadError::Http(status));
                }
                Err(e) => {
                    if is_certificate_error(&e) {
                        return Err(DownloadError::Tls(error_chain(&e)));
                    }
                    if (e.is_connect() || e.is_timeout()) && retry < self.retry.max_retries {
                        self.backoff(retry, url, &e.to_string()).await;
                        retry += 1;
                        continue;
                    }
                    return Err(DownloadError::Network(e));
                }
            }
        }
    }
}

/// Streams the response body into `dest`.
async fn write_body(mut response: reqwest::Response, dest: &Path) -> Result<u64, DownloadError> {
    let mut file = tokio::fs::File::create(dest).await?;
    let mut written = 0u64;
    while let Some(chunk) = response.chunk().await? {
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;
    Ok(written)
}

// A truncated download must not be left behind under its temp name.
async fn discard_partial(dest: &Path) {
    match tokio::fs::remove_file(dest).await {
        Ok(()) => tracing::debug!("Removed partial download {}", dest.display()),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => tracing::warn!("Failed to remove partial download {}: {}", dest.display(), e),
    }
}

/// Flattens an error and its sources into one line.
fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut parts = vec![err.to_string()];
    let mut source = err.source();
    while let Some(inner) = source {
        parts.push(inner.to_string());
        source = inner.source();
    }
    parts.join(": ")
}

/// Looks only at the underlying causes. The top-level reqwest message
/// embeds the request URL, which may itself contain "ssl" or "certificate".
fn is_certificate_error(err: &(dyn StdError + 'static)) -> bool {
    let mut source = err.source();
    while let Some(inner) = source {
        let message = inner.to_string().to_lowercase();
        if message.contains("certificate") || message.contains("ssl") || message.contains("tls handshake") {
            return true;
        }
        source = inner.source();
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serves one canned HTTP response per connection, in order.
    async fn serve(responses: Vec<(u16, &'static str)>) -> String {
        let raw = responses
            .into_iter()
            .map(|(status, body)| {
                format!(
                    "HTTP/1.1 {} X\r\nContent-Type: application/pdf\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                )
            })
            .collect();
        serve_raw(raw).await
    }

    /// Writes each raw response verbatim, then closes the connection.
    async fn serve_raw(responses: Vec<String>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            for response in responses {
                let (mut socket, _) = listener.accept().await.unwrap();
                let mut buf = vec![0u8; 4096];
                let mut read = Vec::new();
                while !read.windows(4).any(|w| w == b"\r\n\r\n") {
                    let n = socket.read(&mut buf).await.unwrap();
                    if n == 0 {
                        break;
                    }
                    read.extend_from_slice(&buf[..n]);
                }
                socket.write_all(response.as_bytes()).await.unwrap();
                socket.shutdown().await.ok();
            }
        });
        format!("http://{}/transcript.pdf", addr)
    }

    fn fast_retry(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            backoff_base: Duration::from_millis(5),
            ..RetryPolicy::default()
        }
    }

    #[tokio::test]
    async fn test_retries_transient_status_then_succeeds() {
        let url = serve(vec![(503, ""), (429, ""), (200, "%PDF-1.5 body")]).await;
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("TICKER").join("file.pdf");

        let downloader = Downloader::new(fast_retry(5), true).unwrap();
        let written = tokio_test::assert_ok!(downloader.fetch(&url, &dest).await);

        assert_eq!(written, 13);
        assert_eq!(std::fs::read(&dest).unwrap(), b"%PDF-1.5 body");
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let url = serve(vec![(502, ""), (502, "")]).await;
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("file.pdf");

        let downloader = Downloader::new(fast_retry(1), true).unwrap();
        let result = downloader.fetch(&url, &dest).await;

        assert!(matches!(result, Err(DownloadError::Http(s)) if s.as_u16() == 502));
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn test_non_retryable_status_fails_immediately() {
        let url = serve(vec![(404, "not found")]).await;
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("file.pdf");

        let downloader = Downloader::new(fast_retry(5), true).unwrap();
        let result = downloader.fetch(&url, &dest).await;

        assert!(matches!(result, Err(DownloadError::Http(s)) if s.as_u16() == 404));
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn test_truncated_body_leaves_no_file() {
        let url = serve_raw(vec![
            "HTTP/1.1 200 OK\r\nContent-Type: application/pdf\r\nContent-Length: 4096\r\nConnection: close\r\n\r\n%PDF-1.5 partial".to_string(),
        ])
        .await;
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("file.pdf");

        let downloader = Downloader::new(fast_retry(0), true).unwrap();
        let result = downloader.fetch(&url, &dest).await;

        assert!(matches!(result, Err(DownloadError::Network(_))));
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn test_refused_connection_is_retried_whatever_the_url() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let url = format!("http://{}/ssl/certificate/q1.pdf", addr);
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("file.pdf");

        let policy = RetryPolicy {
            max_retries: 2,
            backoff_base: Duration::from_millis(50),
            ..RetryPolicy::default()
        };
        let downloader = Downloader::new(policy, true).unwrap();
        let started = std::time::Instant::now();
        let result = downloader.fetch(&url, &dest).await;

        assert!(matches!(result, Err(DownloadError::Network(_))));
        // 50ms + 100ms of backoff means both retries ran.
        assert!(started.elapsed() >= Duration::from_millis(150));
        assert!(!dest.exists());
    }

    /// An error whose own message carries a URL, like reqwest's.
    #[derive(Debug)]
    struct RequestFailed {
        url: &'static str,
        cause: std::io::Error,
    }

    impl std::fmt::Display for RequestFailed {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "error sending request for url ({})", self.url)
        }
    }

    impl StdError for RequestFailed {
        fn source(&self) -> Option<&(dyn StdError + 'static)> {
            Some(&self.cause)
        }
    }

    #[test]
    fn test_certificate_error_detection() {
        let cert = RequestFailed {
            url: "https://example.com/q1.pdf",
            cause: std::io::Error::new(std::io::ErrorKind::Other, "invalid peer certificate: Expired"),
        };
        let refused_on_ssl_url = RequestFailed {
            url: "http://example.com/ssl/certificate.pdf",
            cause: std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "tcp connect error: Connection refused"),
        };
        assert!(is_certificate_error(&cert));
        assert!(!is_certificate_error(&refused_on_ssl_url));
    }
}
