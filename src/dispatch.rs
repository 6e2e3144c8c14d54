//! Handing a finished report to the outside world.
//!
//! The pipeline core never touches the filesystem or the network. Once a
//! [`ProcessingOutput`] exists, a host passes it to [`dispatch`] together
//! with whichever sinks it has configured:
//!
//! * a [`PreviewStore`] persists the first annotated page;
//! * any number of [`ReportSink`]s deliver the PDF report.
//!
//! Dispatch failures are collected in a [`DispatchReport`] and never undo
//! the processing result: the counts and preview stay valid even if the
//! mail relay is down.

use crate::error::DispatchError;
use crate::output::ProcessingOutput;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// File name of the report, both on disk and as a mail attachment.
pub const REPORT_FILENAME: &str = "report.pdf";
/// File name of the stored preview.
pub const PREVIEW_FILENAME: &str = "preview.png";

pub const MAIL_SUBJECT: &str = "Your Blueprint Report";
pub const MAIL_BODY: &str = "Please find attached your detection report.";

/// Delivers report bytes somewhere.
pub trait ReportSink: Send + Sync {
    /// Human-readable destination, for logs and the dispatch summary.
    fn describe(&self) -> String;

    fn deliver<'a>(&'a self, report_pdf: &'a [u8]) -> BoxFuture<'a, Result<(), DispatchError>>;
}

/// Persists the preview image.
pub trait PreviewStore: Send + Sync {
    fn store<'a>(&'a self, preview_png: &'a [u8]) -> BoxFuture<'a, Result<(), DispatchError>>;
}

/// Outcome of one [`dispatch`] call.
#[derive(Debug, Default)]
pub struct DispatchReport {
    pub preview_stored: bool,
    /// [`ReportSink::describe`] of every sink that accepted the report.
    pub delivered: Vec<String>,
    pub errors: Vec<DispatchError>,
}

impl DispatchReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Store the preview and deliver the report to every sink, in order.
pub async fn dispatch(
    output: &ProcessingOutput,
    store: Option<&dyn PreviewStore>,
    sinks: &[&dyn ReportSink],
) -> DispatchReport {
    let mut report = DispatchReport::default();

    if let Some(store) = store {
        match store.store(&output.preview_png).await {
            Ok(()) => report.preview_stored = true,
            Err(e) => {
                warn!("Storing preview failed: {}", e);
                report.errors.push(e);
            }
        }
    }

    for sink in sinks {
        let dest = sink.describe();
        match sink.deliver(&output.report_pdf).await {
            Ok(()) => {
                info!("Report delivered to {}", dest);
                report.delivered.push(dest);
            }
            Err(e) => {
                warn!("Delivering report to {} failed: {}", dest, e);
                report.errors.push(e);
            }
        }
    }

    report
}

// ── Directory ────────────────────────────────────────────────────────────

/// Writes `report.pdf` and `preview.png` into one directory.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn report_path(&self) -> PathBuf {
        self.dir.join(REPORT_FILENAME)
    }

    pub fn preview_path(&self) -> PathBuf {
        self.dir.join(PREVIEW_FILENAME)
    }
}

impl ReportSink for DirectorySink {
    fn describe(&self) -> String {
        self.report_path().display().to_string()
    }

    fn deliver<'a>(&'a self, report_pdf: &'a [u8]) -> BoxFuture<'a, Result<(), DispatchError>> {
        async move { write_atomic(&self.report_path(), report_pdf).await }.boxed()
    }
}

impl PreviewStore for DirectorySink {
    fn store<'a>(&'a self, preview_png: &'a [u8]) -> BoxFuture<'a, Result<(), DispatchError>> {
        async move { write_atomic(&self.preview_path(), preview_png).await }.boxed()
    }
}

/// Write to a sibling temp file, then rename over `path`.
async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), DispatchError> {
    let io_err = |source| DispatchError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
    }

    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    tokio::fs::write(&tmp_path, bytes).await.map_err(io_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(io_err)?;
    Ok(())
}

// ── Mail relay ───────────────────────────────────────────────────────────

/// JSON body posted to the mail relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MailMessage {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub text: String,
    pub attachments: Vec<MailAttachment>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MailAttachment {
    pub filename: String,
    pub content_type: String,
    /// Standard base64.
    pub content: String,
}

impl MailMessage {
    /// The report mail: fixed subject and body, `report.pdf` attached.
    pub fn report(sender: &str, recipient: &str, report_pdf: &[u8]) -> Self {
        Self {
            from: sender.to_string(),
            to: vec![recipient.to_string()],
            subject: MAIL_SUBJECT.to_string(),
            text: MAIL_BODY.to_string(),
            attachments: vec![MailAttachment {
                filename: REPORT_FILENAME.to_string(),
                content_type: "application/pdf".to_string(),
                content: STANDARD.encode(report_pdf),
            }],
        }
    }
}

/// Mails the report to one recipient through an HTTP mail relay.
#[derive(Debug, Clone)]
pub struct MailRelaySink {
    client: reqwest::Client,
    relay_url: reqwest::Url,
    sender: String,
    recipient: String,
}

impl MailRelaySink {
    /// Default request timeout in seconds.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    /// Fails when `relay_url` is not an absolute URL or the HTTP client
    /// cannot be built.
    pub fn new(
        relay_url: impl AsRef<str>,
        sender: impl Into<String>,
        recipient: impl Into<String>,
    ) -> Result<Self, DispatchError> {
        let relay_url =
            reqwest::Url::parse(relay_url.as_ref()).map_err(|e| DispatchError::Http {
                detail: format!("invalid relay URL '{}': {}", relay_url.as_ref(), e),
            })?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| DispatchError::Http {
                detail: e.to_string(),
            })?;
        Ok(Self {
            client,
            relay_url,
            sender: sender.into(),
            recipient: recipient.into(),
        })
    }
}

impl ReportSink for MailRelaySink {
    fn describe(&self) -> String {
        format!("{} via {}", self.recipient, self.relay_url)
    }

    fn deliver<'a>(&'a self, report_pdf: &'a [u8]) -> BoxFuture<'a, Result<(), DispatchError>> {
        async move {
            let message = MailMessage::report(&self.sender, &self.recipient, report_pdf);
            let response = self
                .client
                .post(self.relay_url.clone())
                .json(&message)
                .send()
                .await
                .map_err(|e| DispatchError::Http {
                    detail: e.to_string(),
                })?;

            if !response.status().is_success() {
                return Err(DispatchError::Rejected {
                    status: response.status().as_u16(),
                });
            }
            Ok(())
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::{Counts, ProcessingStats};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn output() -> ProcessingOutput {
        ProcessingOutput {
            counts: Counts { door: 1, window: 0 },
            pages: vec![],
            preview_png: b"png-bytes".to_vec(),
            report_pdf: b"%PDF-1.5 report".to_vec(),
            stats: ProcessingStats::default(),
        }
    }

    /// Accept one HTTP request, answer with `status`, return the request body.
    async fn one_shot_server(status: u16) -> (String, tokio::task::JoinHandle<Vec<u8>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/send", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 4096];
            let body_start = loop {
                let n = socket.read(&mut chunk).await.unwrap();
                buf.extend_from_slice(&chunk[..n]);
                if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                    break pos + 4;
                }
            };
            let headers = String::from_utf8_lossy(&buf[..body_start]).to_ascii_lowercase();
            let len: usize = headers
                .lines()
                .find_map(|l| l.strip_prefix("content-length:"))
                .map(|v| v.trim().parse().unwrap())
                .unwrap_or(0);
            while buf.len() < body_start + len {
                let n = socket.read(&mut chunk).await.unwrap();
                buf.extend_from_slice(&chunk[..n]);
            }
            let reply = format!("HTTP/1.1 {status} X\r\ncontent-length: 0\r\nconnection: close\r\n\r\n");
            socket.write_all(reply.as_bytes()).await.unwrap();
            buf[body_start..body_start + len].to_vec()
        });

        (url, handle)
    }

    #[test]
    fn mail_message_matches_report_contract() {
        let msg = MailMessage::report("noreply@example.com", "a@b.c", b"%PDF");
        assert_eq!(msg.subject, "Your Blueprint Report");
        assert_eq!(msg.text, "Please find attached your detection report.");
        assert_eq!(msg.to, vec!["a@b.c"]);
        assert_eq!(msg.attachments[0].filename, "report.pdf");
        assert_eq!(STANDARD.decode(&msg.attachments[0].content).unwrap(), b"%PDF");
    }

    #[tokio::test]
    async fn directory_sink_writes_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let sink = DirectorySink::new(dir.path().join("out"));
        let store: &dyn PreviewStore = &sink;

        let report = dispatch(&output(), Some(store), &[&sink as &dyn ReportSink]).await;
        assert!(report.is_clean(), "{:?}", report.errors);
        assert!(report.preview_stored);
        assert_eq!(report.delivered.len(), 1);

        assert_eq!(std::fs::read(sink.preview_path()).unwrap(), b"png-bytes");
        assert_eq!(std::fs::read(sink.report_path()).unwrap(), b"%PDF-1.5 report");
        assert!(!sink.report_path().with_file_name("report.pdf.tmp").exists());
    }

    #[tokio::test]
    async fn unwritable_directory_is_reported_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"x").unwrap();
        let sink = DirectorySink::new(blocker.join("sub"));
        let store: &dyn PreviewStore = &sink;

        let out = output();
        let report = dispatch(&out, Some(store), &[&sink as &dyn ReportSink]).await;
        assert_eq!(report.errors.len(), 2);
        assert!(!report.preview_stored);
        assert!(matches!(report.errors[0], DispatchError::Io { .. }));
        assert_eq!(out.counts.door, 1);
    }

    #[tokio::test]
    async fn relay_receives_json_mail() {
        let (url, server) = one_shot_server(200).await;
        let sink = MailRelaySink::new(url, "noreply@example.com", "arch@example.com").unwrap();

        let report = dispatch(&output(), None, &[&sink as &dyn ReportSink]).await;
        assert!(report.is_clean(), "{:?}", report.errors);

        let body = server.await.unwrap();
        let msg: MailMessage = serde_json::from_slice(&body).unwrap();
        assert_eq!(msg.to, vec!["arch@example.com"]);
        assert_eq!(
            STANDARD.decode(&msg.attachments[0].content).unwrap(),
            b"%PDF-1.5 report"
        );
    }

    #[tokio::test]
    async fn relay_error_status_is_rejected() {
        let (url, server) = one_shot_server(503).await;
        let sink = MailRelaySink::new(url, "noreply@example.com", "arch@example.com").unwrap();

        let report = dispatch(&output(), None, &[&sink as &dyn ReportSink]).await;
        assert!(report.delivered.is_empty());
        assert!(matches!(
            report.errors.as_slice(),
            [DispatchError::Rejected { status: 503 }]
        ));
        server.await.unwrap();
    }

    #[test]
    fn relay_url_must_be_absolute() {
        let err = MailRelaySink::new("/send", "a@example.com", "b@example.com")
            .unwrap_err();
        assert!(matches!(err, DispatchError::Http { ref detail } if detail.contains("invalid relay URL")));
        assert!(MailRelaySink::new("not a url", "a@example.com", "b@example.com").is_err());
    }
}
