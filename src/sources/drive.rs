//! Drive REST adapter for corpus enumeration and streaming download.
//!
//! [`DriveSource`] walks the configured folder tree recursively (folders and
//! PDFs only, trashed entries excluded), pages through listings with page
//! tokens, and streams file bytes to the scratch directory in bounded chunks
//! so multi-gigabyte corpora never buffer whole files in memory.
//!
//! All network calls go through the configured [`RetryPolicy`] with the
//! transient-error predicate; a partially written download is removed before
//! the error surfaces so a retry starts from a clean path.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures_util::StreamExt;
use futures_util::future::BoxFuture;
use reqwest::Client;
use serde::Deserialize;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};
use url::Url;

use crate::retry::RetryPolicy;
use crate::sources::DocumentSource;
use crate::types::{RemoteDocument, SyncError};

const DEFAULT_BASE_URL: &str = "https://www.googleapis.com";
const FOLDER_MIME: &str = "application/vnd.google-apps.folder";
const PDF_MIME: &str = "application/pdf";
const PAGE_SIZE: &str = "1000";

/// One page of a drive listing response.
#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<FileEntry>,
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FileEntry {
    id: String,
    name: String,
    #[serde(rename = "mimeType")]
    mime_type: String,
    #[serde(rename = "md5Checksum", default)]
    md5_checksum: Option<String>,
}

/// Remote corpus adapter backed by the drive v3 REST API.
pub struct DriveSource {
    client: Client,
    base_url: Url,
    folder_id: String,
    access_token: String,
    retry: RetryPolicy,
}

impl DriveSource {
    /// Creates an adapter rooted at `folder_id`, authenticating with a bearer
    /// token.
    pub fn new(
        folder_id: impl Into<String>,
        access_token: impl Into<String>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            client: Client::new(),
            base_url: Url::parse(DEFAULT_BASE_URL).expect("hard-coded url parses"),
            folder_id: folder_id.into(),
            access_token: access_token.into(),
            retry,
        }
    }

    /// Points the adapter at an alternative endpoint (tests, proxies).
    #[must_use]
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = base_url;
        self
    }

    fn endpoint(&self, path: &str) -> Result<Url, SyncError> {
        self.base_url
            .join(path)
            .map_err(|err| SyncError::Config(format!("invalid drive endpoint {path}: {err}")))
    }

    /// Fetches one listing page of a folder's children.
    async fn list_page(
        &self,
        folder_id: &str,
        page_token: Option<&str>,
    ) -> Result<FileList, SyncError> {
        let mut url = self.endpoint("/drive/v3/files")?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair(
                "q",
                &format!(
                    "'{folder_id}' in parents and trashed = false and \
                     (mimeType = '{FOLDER_MIME}' or mimeType = '{PDF_MIME}')"
                ),
            );
            query.append_pair("pageSize", PAGE_SIZE);
            query.append_pair("fields", "nextPageToken, files(id, name, mimeType, md5Checksum)");
            if let Some(token) = page_token {
                query.append_pair("pageToken", token);
            }
        }

        let response = self
            .client
            .get(url)
            .bearer_auth(&self.access_token)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }

    /// Recursively collects PDFs under `folder_id` into `documents`.
    fn walk_folder<'a>(
        &'a self,
        folder_id: &'a str,
        documents: &'a mut Vec<RemoteDocument>,
    ) -> BoxFuture<'a, Result<(), SyncError>> {
        Box::pin(async move {
            let mut page_token: Option<String> = None;
            loop {
                let page = self.list_page(folder_id, page_token.as_deref()).await?;
                for entry in page.files {
                    if entry.mime_type == FOLDER_MIME {
                        self.walk_folder(&entry.id, documents).await?;
                        continue;
                    }
                    match entry.md5_checksum {
                        Some(checksum) => {
                            documents.push(RemoteDocument::new(entry.id, entry.name, checksum));
                        }
                        // Without a checksum the delta comparison cannot make
                        // a decision for this entry.
                        None => warn!(
                            name = %entry.name,
                            id = %entry.id,
                            "skipping drive entry without content checksum"
                        ),
                    }
                }
                match page.next_page_token {
                    Some(token) => page_token = Some(token),
                    None => break,
                }
            }
            Ok(())
        })
    }

    /// Streams the response body to `target`, removing the partial file on
    /// any failure.
    async fn stream_to_file(
        &self,
        response: reqwest::Response,
        target: &Path,
    ) -> Result<(), SyncError> {
        let result = async {
            let mut file = fs::File::create(target).await?;
            let mut stream = response.bytes_stream();
            while let Some(chunk) = stream.next().await {
                file.write_all(&chunk?).await?;
            }
            file.flush().await?;
            Ok(())
        }
        .await;

        if result.is_err() {
            let _ = fs::remove_file(target).await;
        }
        result
    }

    async fn download_once(
        &self,
        document: &RemoteDocument,
        destination: &Path,
    ) -> Result<PathBuf, SyncError> {
        let mut url = self.endpoint(&format!("/drive/v3/files/{}", document.id))?;
        url.query_pairs_mut().append_pair("alt", "media");

        let target = destination.join(scratch_file_name(document));
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.access_token)
            .send()
            .await?
            .error_for_status()?;

        self.stream_to_file(response, &target).await?;
        debug!(name = %document.name, path = %target.display(), "download complete");
        Ok(target)
    }
}

#[async_trait]
impl DocumentSource for DriveSource {
    async fn list_documents(&self) -> Result<Vec<RemoteDocument>, SyncError> {
        if self.folder_id.trim().is_empty() {
            return Err(SyncError::Config("drive folder id is empty".into()));
        }

        let documents = self
            .retry
            .run(
                "drive.list",
                || async {
                    let mut documents = Vec::new();
                    self.walk_folder(&self.folder_id, &mut documents).await?;
                    Ok(documents)
                },
                SyncError::is_transient,
            )
            .await?;

        info!(count = documents.len(), folder = %self.folder_id, "drive scan complete");
        Ok(documents)
    }

    async fn download(
        &self,
        document: &RemoteDocument,
        destination: &Path,
    ) -> Result<PathBuf, SyncError> {
        self.retry
            .run(
                "drive.download",
                || self.download_once(document, destination),
                SyncError::is_transient,
            )
            .await
    }
}

/// Local scratch name for a document: the sanitized opaque id, then the
/// sanitized display name.
///
/// The provider allows duplicate names, even within one folder, so the name
/// alone cannot key a scratch path — concurrent workers would stream into
/// the same file. The id prefix keeps every worker on its own path and also
/// keeps the name non-empty when sanitization strips a display name down to
/// nothing.
fn scratch_file_name(document: &RemoteDocument) -> String {
    format!(
        "{}_{}",
        sanitize_file_name(&document.id),
        sanitize_file_name(&document.name)
    )
}

/// Strips characters that are unsafe in local file names.
fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, ' ' | '.' | '_' | '-'))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;
    use std::time::Duration;
    use tempfile::tempdir;

    fn listing_query(folder_id: &str) -> String {
        format!(
            "'{folder_id}' in parents and trashed = false and \
             (mimeType = '{FOLDER_MIME}' or mimeType = '{PDF_MIME}')"
        )
    }

    fn test_source(server: &MockServer) -> DriveSource {
        DriveSource::new(
            "root",
            "test-token",
            RetryPolicy::new(2, Duration::ZERO, 1.0),
        )
        .with_base_url(Url::parse(&server.base_url()).unwrap())
    }

    #[test]
    fn file_names_are_sanitized() {
        assert_eq!(
            sanitize_file_name("2019 - Smith - Liens?.pdf"),
            "2019 - Smith - Liens.pdf"
        );
        assert_eq!(sanitize_file_name("a/b\\c.pdf"), "abc.pdf");
    }

    #[test]
    fn scratch_paths_are_unique_per_document() {
        let first = RemoteDocument::new("a", "same.pdf", "x1");
        let second = RemoteDocument::new("b", "same.pdf", "x2");
        assert_ne!(
            scratch_file_name(&first),
            scratch_file_name(&second),
            "duplicate display names must not share a scratch path"
        );
    }

    #[test]
    fn fully_stripped_name_still_yields_a_file_name() {
        let document = RemoteDocument::new("a", "???", "x1");
        assert_eq!(scratch_file_name(&document), "a_");
    }

    #[tokio::test]
    async fn listing_recurses_into_subfolders() {
        let server = MockServer::start();

        server.mock(|when, then| {
            when.method(GET)
                .path("/drive/v3/files")
                .query_param("q", listing_query("root"));
            then.status(200).json_body(json!({
                "files": [
                    {"id": "sub", "name": "Annexes", "mimeType": FOLDER_MIME},
                    {"id": "a", "name": "alpha.pdf", "mimeType": PDF_MIME, "md5Checksum": "x1"},
                    {"id": "nochk", "name": "draft.pdf", "mimeType": PDF_MIME}
                ]
            }));
        });
        server.mock(|when, then| {
            when.method(GET)
                .path("/drive/v3/files")
                .query_param("q", listing_query("sub"));
            then.status(200).json_body(json!({
                "files": [
                    {"id": "b", "name": "beta.pdf", "mimeType": PDF_MIME, "md5Checksum": "x2"}
                ]
            }));
        });

        let documents = test_source(&server).list_documents().await.unwrap();
        assert_eq!(
            documents,
            vec![
                RemoteDocument::new("b", "beta.pdf", "x2"),
                RemoteDocument::new("a", "alpha.pdf", "x1"),
            ]
        );
    }

    #[tokio::test]
    async fn download_streams_to_sanitized_path() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET)
                .path("/drive/v3/files/a")
                .query_param("alt", "media")
                .header("authorization", "Bearer test-token");
            then.status(200).body("pdf-bytes");
        });

        let dir = tempdir().unwrap();
        let document = RemoteDocument::new("a", "al?pha.pdf", "x1");
        let path = test_source(&server)
            .download(&document, dir.path())
            .await
            .unwrap();

        assert_eq!(path.file_name().unwrap(), "a_alpha.pdf");
        assert_eq!(fs::read_to_string(&path).await.unwrap(), "pdf-bytes");
    }

    #[tokio::test]
    async fn server_errors_are_retried_then_surface() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/drive/v3/files");
            then.status(503);
        });

        let err = test_source(&server).list_documents().await.unwrap_err();
        assert!(err.is_transient());
        mock.assert_hits(2);
    }
}
