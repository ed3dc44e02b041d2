//! Google Drive API v3 client
//!
//! Lists candidate files and fetches whole-file contents for the relay.
//! Google-native documents have no binary form and are exported first.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// MIME types offered in the file picker
pub const LISTED_MIME_TYPES: [&str; 3] = [
    "application/pdf",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "text/csv",
];

const LIST_PAGE_SIZE: &str = "30";
const GOOGLE_APPS_PREFIX: &str = "application/vnd.google-apps";

#[derive(Debug, Error)]
pub enum DriveError {
    #[error("Drive request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Drive API returned status {status}: {body}")]
    Status { status: u16, body: String },
}

/// File resource as returned by the Drive API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub mime_type: String,
    /// Byte size as a decimal string; absent for Google-native documents
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_view_link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

/// Downloaded file and the MIME type of the downloaded bytes
#[derive(Debug)]
pub struct DriveContents {
    pub file: DriveFile,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Interchange format for a Google-native document, `None` for regular files
pub fn export_mime_type(mime_type: &str) -> Option<&'static str> {
    if !mime_type.starts_with(GOOGLE_APPS_PREFIX) {
        return None;
    }

    Some(match mime_type {
        "application/vnd.google-apps.document" => {
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        }
        "application/vnd.google-apps.spreadsheet" => {
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
        }
        "application/vnd.google-apps.presentation" => {
            "application/vnd.openxmlformats-officedocument.presentationml.presentation"
        }
        _ => "application/pdf",
    })
}

fn list_query() -> String {
    LISTED_MIME_TYPES
        .iter()
        .map(|mime| format!("mimeType='{}'", mime))
        .collect::<Vec<_>>()
        .join(" or ")
}

#[derive(Clone)]
pub struct DriveClient {
    http: reqwest::Client,
    base_url: String,
}

impl DriveClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn get(
        &self,
        access_token: &str,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<reqwest::Response, DriveError> {
        let url = format!("{}/{}", self.base_url, path);
        debug!("Drive API: GET {}", url);

        let response = self
            .http
            .get(&url)
            .bearer_auth(access_token)
            .query(query)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DriveError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response)
    }

    /// List the files the picker may offer
    pub async fn list_files(&self, access_token: &str) -> Result<Vec<DriveFile>, DriveError> {
        let query = list_query();
        let list: FileList = self
            .get(
                access_token,
                "files",
                &[
                    ("q", query.as_str()),
                    ("pageSize", LIST_PAGE_SIZE),
                    ("fields", "files(id,name,mimeType,webViewLink)"),
                ],
            )
            .await?
            .json()
            .await?;

        Ok(list.files)
    }

    pub async fn get_metadata(
        &self,
        access_token: &str,
        file_id: &str,
    ) -> Result<DriveFile, DriveError> {
        let file = self
            .get(
                access_token,
                &format!("files/{}", file_id),
                &[("fields", "id,name,mimeType,size")],
            )
            .await?
            .json()
            .await?;

        Ok(file)
    }

    /// Download a file, exporting Google-native documents
    pub async fn fetch_contents(
        &self,
        access_token: &str,
        file_id: &str,
    ) -> Result<DriveContents, DriveError> {
        let file = self.get_metadata(access_token, file_id).await?;

        let (response, mime_type) = match export_mime_type(&file.mime_type) {
            Some(export) => (
                self.get(
                    access_token,
                    &format!("files/{}/export", file_id),
                    &[("mimeType", export)],
                )
                .await?,
                export.to_string(),
            ),
            None => (
                self.get(access_token, &format!("files/{}", file_id), &[("alt", "media")])
                    .await?,
                file.mime_type.clone(),
            ),
        };

        let bytes = response.bytes().await?.to_vec();

        Ok(DriveContents {
            file,
            mime_type,
            bytes,
        })
    }
}
