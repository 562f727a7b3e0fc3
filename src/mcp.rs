use anyhow::Result;
use base64::Engine;
use rmcp::{
    ServerHandler, ServiceExt,
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{ServerCapabilities, ServerInfo},
    schemars, tool, tool_handler, tool_router,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::bundle::ExportPaths;
use crate::config::SessionConfig;
use crate::error::Error;
use crate::session::{Event, Outcome, PatientRecord, Session, SessionState, SessionStore};

// Request structs for tools

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct UploadRequest {
    #[schemars(description = "Path to the PDF file to process")]
    pub path: Option<String>,
    #[schemars(description = "Base64-encoded PDF bytes, used when no path is given")]
    pub base64: Option<String>,
    #[schemars(description = "Display name for a base64 upload (default: upload.pdf)")]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ConfirmRequest {
    #[schemars(description = "Patient first name for the current form (may be empty)")]
    #[serde(default)]
    pub first_name: String,
    #[schemars(description = "Patient last name for the current form (may be empty)")]
    #[serde(default)]
    pub last_name: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ExportRequest {
    #[schemars(description = "Directory to write the CSV manifest and ZIP archive into")]
    pub directory: String,
}

#[derive(Clone)]
pub struct IntakeServer {
    store: Arc<Mutex<SessionStore>>,
    #[allow(dead_code)]
    tool_router: ToolRouter<Self>,
}

impl IntakeServer {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            store: Arc::new(Mutex::new(SessionStore::new(config))),
            tool_router: Self::tool_router(),
        }
    }
}

impl IntakeServer {
    /// Run `f` against the store on the blocking pool. PDF splitting and
    /// archive writing are file-bound; the lock is held for the whole call.
    async fn with_store_blocking<T, F>(&self, f: F) -> crate::error::Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut SessionStore) -> crate::error::Result<T> + Send + 'static,
    {
        let mut store = self.store.clone().lock_owned().await;
        tokio::task::spawn_blocking(move || f(&mut store)).await?
    }
}

impl Default for IntakeServer {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

fn respond<T: Serialize>(tool: &str, result: crate::error::Result<T>) -> String {
    match result {
        Ok(value) => serde_json::to_string_pretty(&value).unwrap_or_else(|e| format!("Error: {}", e)),
        Err(e) => {
            tracing::warn!(tool, error = %e, "tool call failed");
            format!("Error: {}", e)
        }
    }
}

fn read_upload(req: UploadRequest) -> crate::error::Result<(Vec<u8>, String)> {
    if let Some(path) = req.path {
        let bytes = std::fs::read(&path).map_err(|e| Error::io(&path, e))?;
        let name = Path::new(&path)
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("upload.pdf")
            .to_string();
        return Ok((bytes, name));
    }
    if let Some(data) = req.base64 {
        let bytes = base64::engine::general_purpose::STANDARD.decode(data.trim())?;
        return Ok((bytes, req.name.unwrap_or_else(|| "upload.pdf".to_string())));
    }
    Err(Error::InvalidPdf {
        reason: "expected either \"path\" or \"base64\"".to_string(),
    })
}

#[tool_router]
impl IntakeServer {
    #[tool(description = "Upload a multi-page PDF of intake forms and split it into one page per form. Replaces any session in progress.")]
    async fn intake_upload(&self, Parameters(req): Parameters<UploadRequest>) -> String {
        let result = self
            .with_store_blocking(move |store| {
                let (bytes, source_name) = read_upload(req)?;
                store.handle(Event::Upload { bytes, source_name })?;
                store.active().map(status_of)
            })
            .await;
        respond("intake_upload", result)
    }

    #[tool(description = "Show progress: current form, forms confirmed so far, and the saved records")]
    async fn intake_status(&self) -> String {
        let store = self.store.lock().await;
        respond("intake_status", Ok(store.session().map(status_of)))
    }

    #[tool(description = "Get the extracted text of the form currently awaiting a name")]
    async fn intake_preview(&self) -> String {
        let store = self.store.lock().await;
        let result = store.active().and_then(|session| {
            let page = session.current_page().ok_or(Error::AlreadyComplete)?;
            Ok(PreviewResult {
                page: page.ordinal,
                total_pages: session.page_count(),
                text: session.current_preview()?,
            })
        });
        respond("intake_preview", result)
    }

    #[tool(description = "Save the patient name for the current form and advance to the next. Leave both names empty to use Unknown / Patient_<n>.")]
    async fn intake_confirm(&self, Parameters(req): Parameters<ConfirmRequest>) -> String {
        let mut store = self.store.lock().await;
        let result = store
            .handle(Event::Confirm {
                first_name: req.first_name,
                last_name: req.last_name,
            })
            .map(|outcome| {
                let Outcome::Confirmed { record, complete } = outcome else {
                    unreachable!("a confirm event always yields Confirmed");
                };
                ConfirmResult { record, complete }
            });
        respond("intake_confirm", result)
    }

    #[tool(description = "Start over: discard the current session and all of its files")]
    async fn intake_reset(&self) -> String {
        let mut store = self.store.lock().await;
        let result = store.handle(Event::Reset).map(|_| ResetResult { reset: true });
        respond("intake_reset", result)
    }

    #[tool(description = "Write the patient CSV and the ZIP of renamed PDFs. Only available after every form is confirmed.")]
    async fn intake_export(&self, Parameters(req): Parameters<ExportRequest>) -> String {
        let result = self
            .with_store_blocking(move |store| {
                let config = store.config();
                store.active()?.bundle()?.write_to(
                    &PathBuf::from(&req.directory),
                    &config.csv_name,
                    &config.zip_name,
                )
            })
            .await;
        respond::<ExportPaths>("intake_export", result)
    }
}

fn status_of(session: &Session) -> StatusResult {
    StatusResult {
        source: session.source_name().to_string(),
        page_count: session.page_count(),
        confirmed: session.records().len(),
        current_page: session.current_page().map(|p| p.ordinal),
        state: session.state(),
        records: session.records().to_vec(),
    }
}

// Result types for MCP tools

#[derive(Debug, Serialize)]
pub struct StatusResult {
    pub source: String,
    pub page_count: usize,
    pub confirmed: usize,
    pub current_page: Option<u32>,
    #[serde(flatten)]
    pub state: SessionState,
    pub records: Vec<PatientRecord>,
}

#[derive(Debug, Serialize)]
pub struct PreviewResult {
    pub page: u32,
    pub total_pages: usize,
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct ConfirmResult {
    pub record: PatientRecord,
    pub complete: bool,
}

#[derive(Debug, Serialize)]
pub struct ResetResult {
    pub reset: bool,
}

#[tool_handler]
impl ServerHandler for IntakeServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Patient intake form splitter. Use intake_upload with a multi-page PDF, then for \
                 each form call intake_preview and intake_confirm with the patient's name. Once \
                 intake_status reports complete, intake_export writes the CSV and ZIP. \
                 intake_reset starts over."
                    .to_string(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

pub async fn run_server(config: SessionConfig) -> Result<()> {
    let server = IntakeServer::new(config);
    tracing::info!("serving intake tools on stdio");

    // Serve using stdin/stdout as a tuple
    let service = server.serve((tokio::io::stdin(), tokio::io::stdout())).await?;

    service.waiting().await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::fixtures::sample_pdf;

    fn encoded(pages: u32) -> String {
        base64::engine::general_purpose::STANDARD.encode(sample_pdf(pages))
    }

    async fn upload(server: &IntakeServer, pages: u32) -> String {
        server
            .intake_upload(Parameters(UploadRequest {
                path: None,
                base64: Some(encoded(pages)),
                name: Some("intake.pdf".to_string()),
            }))
            .await
    }

    async fn confirm(server: &IntakeServer, first: &str, last: &str) -> String {
        server
            .intake_confirm(Parameters(ConfirmRequest {
                first_name: first.to_string(),
                last_name: last.to_string(),
            }))
            .await
    }

    #[tokio::test]
    async fn test_upload_reports_pages() {
        let server = IntakeServer::default();
        let response = upload(&server, 3).await;
        let json: serde_json::Value = serde_json::from_str(&response).unwrap();
        assert_eq!(json["page_count"], 3);
        assert_eq!(json["current_page"], 1);
        assert_eq!(json["state"], "awaiting_input");
    }

    #[tokio::test]
    async fn test_status_without_session_is_null() {
        let server = IntakeServer::default();
        assert_eq!(server.intake_status().await, "null");
    }

    #[tokio::test]
    async fn test_confirm_without_session_errors() {
        let server = IntakeServer::default();
        let response = confirm(&server, "Jane", "Doe").await;
        assert!(response.starts_with("Error: No active session"));
    }

    #[tokio::test]
    async fn test_invalid_upload_errors() {
        let server = IntakeServer::default();
        let response = server
            .intake_upload(Parameters(UploadRequest {
                path: None,
                base64: Some("SGVsbG8gV29ybGQ=".to_string()),
                name: None,
            }))
            .await;
        assert!(response.starts_with("Error: Invalid PDF"));
    }

    #[tokio::test]
    async fn test_full_session_and_export() {
        let server = IntakeServer::default();
        upload(&server, 3).await;

        assert!(server.intake_preview().await.contains("\"page\": 1"));

        confirm(&server, "Jane", "Doe").await;
        let response = confirm(&server, "", "").await;
        let json: serde_json::Value = serde_json::from_str(&response).unwrap();
        assert_eq!(json["record"]["last_name"], "Patient_2");
        assert_eq!(json["complete"], false);

        let dir = tempfile::tempdir().unwrap();
        let early = server
            .intake_export(Parameters(ExportRequest {
                directory: dir.path().display().to_string(),
            }))
            .await;
        assert!(early.starts_with("Error: Session is not complete"));

        let response = confirm(&server, "Bob", "Smith").await;
        let json: serde_json::Value = serde_json::from_str(&response).unwrap();
        assert_eq!(json["complete"], true);

        let response = server
            .intake_export(Parameters(ExportRequest {
                directory: dir.path().display().to_string(),
            }))
            .await;
        let json: serde_json::Value = serde_json::from_str(&response).unwrap();
        assert!(json["manifest"].as_str().unwrap().ends_with("patient_data.csv"));
        assert!(dir.path().join("patient_forms.zip").is_file());

        let status: serde_json::Value =
            serde_json::from_str(&server.intake_status().await).unwrap();
        assert_eq!(status["state"], "complete");
        assert_eq!(status["records"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_reset_clears_session() {
        let server = IntakeServer::default();
        upload(&server, 2).await;
        confirm(&server, "Jane", "Doe").await;

        assert!(server.intake_reset().await.contains("\"reset\": true"));
        assert_eq!(server.intake_status().await, "null");
    }

    #[tokio::test]
    async fn test_confirm_after_complete_reports_state() {
        let server = IntakeServer::default();
        upload(&server, 1).await;

        let response = confirm(&server, "Jane", "Doe").await;
        let json: serde_json::Value = serde_json::from_str(&response).unwrap();
        assert_eq!(json["record"]["source_page_ordinal"], 1);
        assert_eq!(json["complete"], true);

        let response = confirm(&server, "Bob", "Smith").await;
        assert_eq!(response, "Error: All pages have already been confirmed");
    }
}
