// src/services/api_server.rs
//! API Server for the Diploma Registry Service
//!
//! This module provides the REST API interface for the diploma registry,
//! covering the document upload gateway, diploma issuance, lookup, event
//! enumeration, the derived read model, document verification, and the
//! authority operations.
//!
//! The API is built using Axum and includes endpoints for:
//! - Uploading diploma PDFs to IPFS (hash + pin)
//! - Minting diplomas and looking them up by id
//! - Listing all issued diplomas via the event-log read model
//! - Verifying a candidate PDF against the committed digest
//! - Resolving token ids to their `ipfs://` references
//! - Rotating the institution admin and transferring ownership

use crate::models::diploma::{DiplomaAttributes, IssuanceEvent};
use crate::registry::diploma_registry::{DiplomaRegistry, RegistryError};
use crate::registry::indexer::{DiplomaIndexer, IndexedDiploma};
use crate::services::issuer::{DiplomaIssuer, IssueError};
use crate::services::verifier::{VerificationOutcome, Verifier};
use crate::settings::Settings;
use crate::storage::ipfs_client::{IpfsStorage, PinMetadata, StorageError};
use crate::utils::crypto::hash_document;
use axum::{
    extract::{DefaultBodyLimit, Json, Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use ethers_core::types::{Address, H256};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tower_http::trace::TraceLayer;

// API request and response structures

/// Response for a successful document upload
#[derive(Serialize, Deserialize)]
struct UploadDiplomaResponse {
    cid: String,
    hash_hex: H256,
    size: u64,
    mime_type: String,
}

/// Request payload for minting a diploma with an already-pinned document
#[derive(Serialize, Deserialize)]
struct MintDiplomaRequest {
    caller: Address,
    to: Address,
    diploma_id: String,
    ipfs_cid: String,
    file_hash: H256,
    student_name: String,
    program: String,
    graduation_date: String,
    institution_name: String,
}

/// Response for a successful mint
#[derive(Serialize, Deserialize)]
struct MintDiplomaResponse {
    token_id: u64,
}

/// Response for the combined upload-and-mint operation
#[derive(Serialize, Deserialize)]
struct IssueDiplomaResponse {
    token_id: u64,
    cid: String,
    file_hash: H256,
}

/// Response listing all indexed diplomas, newest first
#[derive(Serialize, Deserialize)]
struct ListDiplomasResponse {
    diplomas: Vec<IndexedDiploma>,
}

/// Query parameters for reading the issuance event log
#[derive(Serialize, Deserialize)]
struct EventsQuery {
    /// First log position to include (1-based); defaults to genesis
    from: Option<u64>,
}

/// Response carrying a slice of the issuance event log
#[derive(Serialize, Deserialize)]
struct EventsResponse {
    events: Vec<IssuanceEvent>,
}

/// Response for a document verification
#[derive(Serialize)]
struct VerifyDiplomaResponse {
    result: VerificationOutcome,
}

/// Response resolving a token id to its external reference
#[derive(Serialize, Deserialize)]
struct TokenResponse {
    token_id: u64,
    diploma_id: String,
    token_uri: String,
}

/// Response describing the registry's authority state
#[derive(Serialize, Deserialize)]
struct RegistryInfoResponse {
    owner: Address,
    institution_admin: Address,
    total_issued: u64,
}

/// Request payload for rotating the institution admin
#[derive(Serialize, Deserialize)]
struct SetAdminRequest {
    caller: Address,
    new_admin: Address,
}

/// Request payload for transferring the owner role
#[derive(Serialize, Deserialize)]
struct TransferOwnershipRequest {
    caller: Address,
    new_owner: Address,
}

/// Multipart form collected by the upload-style endpoints.
struct UploadedForm {
    /// File part bytes plus declared content type, if a file part was sent
    file: Option<(Vec<u8>, String)>,
    /// All non-file text fields, keyed by part name
    fields: HashMap<String, String>,
}

impl UploadedForm {
    fn text(&self, name: &str) -> &str {
        self.fields.get(name).map(String::as_str).unwrap_or("")
    }
}

/// Maps a registry rejection to its HTTP status.
fn registry_status(error: &RegistryError) -> StatusCode {
    match error {
        RegistryError::Unauthorized { .. } => StatusCode::FORBIDDEN,
        RegistryError::DuplicateIdentifier(_) => StatusCode::CONFLICT,
        RegistryError::UnknownToken(_) => StatusCode::NOT_FOUND,
    }
}

/// Maps a storage failure to its HTTP status.
///
/// A rejected document is the caller's fault (not retryable); an unavailable
/// provider is upstream trouble the caller may retry with backoff.
fn storage_status(error: &StorageError) -> StatusCode {
    match error {
        StorageError::Rejected(_) => StatusCode::BAD_REQUEST,
        StorageError::Unavailable(_) => StatusCode::BAD_GATEWAY,
    }
}

fn error_body(message: impl Into<String>) -> Json<serde_json::Value> {
    Json(json!({ "error": message.into() }))
}

/// Checks an uploaded file against the configured type and size limits.
fn validate_upload(settings: &Settings, mime_type: &str, size: usize) -> Result<(), String> {
    if mime_type != settings.accepted_mime {
        return Err(format!("only {} files are accepted", settings.accepted_mime));
    }
    if size as u64 > settings.max_upload_bytes {
        return Err(format!(
            "file exceeds the {} byte limit",
            settings.max_upload_bytes
        ));
    }
    Ok(())
}

/// Drains a multipart request into an [`UploadedForm`].
async fn read_multipart(mut multipart: Multipart) -> Result<UploadedForm, String> {
    let mut form = UploadedForm {
        file: None,
        fields: HashMap::new(),
    };
    while let Some(field) = multipart.next_field().await.map_err(|e| e.to_string())? {
        let name = field.name().unwrap_or_default().to_string();
        if name == "file" {
            let mime_type = field.content_type().unwrap_or_default().to_string();
            let data = field.bytes().await.map_err(|e| e.to_string())?;
            form.file = Some((data.to_vec(), mime_type));
        } else {
            let value = field.text().await.map_err(|e| e.to_string())?;
            form.fields.insert(name, value);
        }
    }
    Ok(form)
}

fn parse_address(value: &str) -> Result<Address, String> {
    value
        .trim()
        .parse::<Address>()
        .map_err(|e| format!("invalid address {:?}: {}", value, e))
}

/// API server state containing all service dependencies
pub struct ApiServer {
    /// Authoritative diploma registry
    registry: Arc<DiplomaRegistry>,

    /// Service orchestrating hash, pin, and mint
    issuer: Arc<DiplomaIssuer>,

    /// Service for document verification
    verifier: Arc<Verifier>,

    /// Pinning gateway for diploma documents
    ipfs_storage: IpfsStorage,

    /// Event-log read model behind the list endpoint, refreshed lazily
    indexer: Arc<Mutex<DiplomaIndexer>>,

    /// Process configuration (upload limits, accepted type)
    settings: Settings,
}

impl ApiServer {
    /// Creates a new instance of the API server
    ///
    /// # Arguments
    /// * `registry` - Authoritative diploma registry
    /// * `issuer` - Service for the combined issuance flow
    /// * `verifier` - Service for document verification
    /// * `ipfs_storage` - Pinning gateway client
    /// * `settings` - Process configuration
    pub fn new(
        registry: Arc<DiplomaRegistry>,
        issuer: DiplomaIssuer,
        verifier: Verifier,
        ipfs_storage: IpfsStorage,
        settings: Settings,
    ) -> Self {
        ApiServer {
            registry,
            issuer: Arc::new(issuer),
            verifier: Arc::new(verifier),
            ipfs_storage,
            indexer: Arc::new(Mutex::new(DiplomaIndexer::new())),
            settings,
        }
    }

    /// Builds the router with all API routes configured.
    pub fn router(&self) -> Router {
        // leave framing headroom above the raw file size cap
        let body_limit = self.settings.max_upload_bytes as usize + 16 * 1024;

        Router::new()
            .route("/health", get(Self::health_handler))
            .route("/api/upload-diploma", post(Self::upload_diploma_handler))
            .route("/issue-diploma", post(Self::issue_diploma_handler))
            .route("/mint-diploma", post(Self::mint_diploma_handler))
            .route("/diploma/:diploma_id", get(Self::get_diploma_handler))
            .route("/diplomas", get(Self::list_diplomas_handler))
            .route("/events", get(Self::events_handler))
            .route("/verify-diploma", post(Self::verify_diploma_handler))
            .route("/token/:token_id", get(Self::token_handler))
            .route("/document/:cid", get(Self::document_handler))
            .route("/registry-info", get(Self::registry_info_handler))
            .route("/set-institution-admin", post(Self::set_admin_handler))
            .route("/transfer-ownership", post(Self::transfer_ownership_handler))
            .layer(DefaultBodyLimit::max(body_limit))
            .layer(TraceLayer::new_for_http())
            .with_state(Arc::new(self.clone()))
    }

    /// Starts the API server and begins listening for requests
    ///
    /// # Arguments
    /// * `addr` - Socket address to bind to (e.g., "127.0.0.1:4000")
    pub async fn run(&self, addr: SocketAddr) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        log::info!("API server running at http://{}", addr);
        axum::serve(listener, self.router()).await?;
        Ok(())
    }

    /// Liveness probe
    ///
    /// # Endpoint
    /// GET /health
    async fn health_handler() -> impl IntoResponse {
        Json(json!({ "status": "ok" }))
    }

    // =====================
    // Upload Gateway
    // =====================

    /// Hashes and pins a diploma PDF
    ///
    /// # Endpoint
    /// POST /api/upload-diploma
    ///
    /// # Request Body
    /// Multipart form with a `file` part plus `diploma_id`, `student_name`,
    /// and `program` text fields
    ///
    /// # Responses
    /// - 200 OK: Returns `{cid, hash_hex, size, mime_type}`
    /// - 400 Bad Request: Missing file, wrong MIME type, or oversized body
    /// - 502 Bad Gateway: Pinning provider failure
    async fn upload_diploma_handler(
        State(state): State<Arc<ApiServer>>,
        multipart: Multipart,
    ) -> Response {
        let mut form = match read_multipart(multipart).await {
            Ok(form) => form,
            Err(e) => return (StatusCode::BAD_REQUEST, error_body(e)).into_response(),
        };

        let Some((data, mime_type)) = form.file.take() else {
            return (
                StatusCode::BAD_REQUEST,
                error_body("PDF file required in the 'file' field"),
            )
                .into_response();
        };
        if let Err(reason) = validate_upload(&state.settings, &mime_type, data.len()) {
            return (StatusCode::BAD_REQUEST, error_body(reason)).into_response();
        }

        let file_hash = hash_document(&data);
        let diploma_id = form.text("diploma_id");
        let metadata = PinMetadata {
            name: format!(
                "{}.pdf",
                if diploma_id.is_empty() {
                    "diploma"
                } else {
                    diploma_id
                }
            ),
            diploma_id: diploma_id.to_string(),
            student_name: form.text("student_name").to_string(),
            program: form.text("program").to_string(),
        };

        match state.ipfs_storage.store_document(&data, &metadata).await {
            Ok(cid) => (
                StatusCode::OK,
                Json(UploadDiplomaResponse {
                    cid,
                    hash_hex: file_hash,
                    size: data.len() as u64,
                    mime_type,
                }),
            )
                .into_response(),
            Err(e) => {
                log::error!("upload failed: {}", e);
                (storage_status(&e), error_body(e.to_string())).into_response()
            }
        }
    }

    // =====================
    // Issuance
    // =====================

    /// Uploads, pins, and mints in one request
    ///
    /// # Endpoint
    /// POST /issue-diploma
    ///
    /// # Request Body
    /// Multipart form with a `file` part plus `caller`, `to`, `diploma_id`,
    /// `student_name`, `program`, `graduation_date`, and `institution_name`
    ///
    /// # Responses
    /// - 200 OK: Returns `{token_id, cid, file_hash}`
    /// - 400 Bad Request: Invalid form, address, or file
    /// - 403 Forbidden: Caller is not the institution admin
    /// - 409 Conflict: Diploma id already minted
    /// - 502 Bad Gateway: Pinning provider failure
    async fn issue_diploma_handler(
        State(state): State<Arc<ApiServer>>,
        multipart: Multipart,
    ) -> Response {
        let mut form = match read_multipart(multipart).await {
            Ok(form) => form,
            Err(e) => return (StatusCode::BAD_REQUEST, error_body(e)).into_response(),
        };

        let (caller, to) = match (
            parse_address(form.text("caller")),
            parse_address(form.text("to")),
        ) {
            (Ok(caller), Ok(to)) => (caller, to),
            (Err(e), _) | (_, Err(e)) => {
                return (StatusCode::BAD_REQUEST, error_body(e)).into_response()
            }
        };
        let Some((data, mime_type)) = form.file.take() else {
            return (
                StatusCode::BAD_REQUEST,
                error_body("PDF file required in the 'file' field"),
            )
                .into_response();
        };
        if let Err(reason) = validate_upload(&state.settings, &mime_type, data.len()) {
            return (StatusCode::BAD_REQUEST, error_body(reason)).into_response();
        }

        let attributes = DiplomaAttributes {
            student_name: form.text("student_name").to_string(),
            program: form.text("program").to_string(),
            graduation_date: form.text("graduation_date").to_string(),
            institution_name: form.text("institution_name").to_string(),
        };

        match state
            .issuer
            .issue(caller, to, form.text("diploma_id"), attributes, &data)
            .await
        {
            Ok(issued) => (
                StatusCode::OK,
                Json(IssueDiplomaResponse {
                    token_id: issued.token_id,
                    cid: issued.ipfs_cid,
                    file_hash: issued.file_hash,
                }),
            )
                .into_response(),
            Err(IssueError::Registry(e)) => {
                (registry_status(&e), error_body(e.to_string())).into_response()
            }
            Err(IssueError::Storage(e)) => {
                log::error!("issuance pin failed: {}", e);
                (storage_status(&e), error_body(e.to_string())).into_response()
            }
        }
    }

    /// Mints a diploma whose document was already uploaded
    ///
    /// # Endpoint
    /// POST /mint-diploma
    ///
    /// # Request Body
    /// JSON payload with the caller address and the full mint tuple
    ///
    /// # Responses
    /// - 200 OK: Returns the assigned token id
    /// - 403 Forbidden: Caller is not the institution admin
    /// - 409 Conflict: Diploma id already minted
    async fn mint_diploma_handler(
        State(state): State<Arc<ApiServer>>,
        Json(payload): Json<MintDiplomaRequest>,
    ) -> Response {
        let attributes = DiplomaAttributes {
            student_name: payload.student_name,
            program: payload.program,
            graduation_date: payload.graduation_date,
            institution_name: payload.institution_name,
        };

        match state.registry.mint_diploma(
            payload.caller,
            payload.to,
            &payload.diploma_id,
            &payload.ipfs_cid,
            payload.file_hash,
            attributes,
        ) {
            Ok(token_id) => {
                (StatusCode::OK, Json(MintDiplomaResponse { token_id })).into_response()
            }
            Err(e) => (registry_status(&e), error_body(e.to_string())).into_response(),
        }
    }

    // =====================
    // Reads
    // =====================

    /// Looks up a diploma by its identifier
    ///
    /// # Endpoint
    /// GET /diploma/:diploma_id
    ///
    /// # Responses
    /// - 200 OK: Returns the full stored record
    /// - 404 Not Found: No diploma under this id
    async fn get_diploma_handler(
        State(state): State<Arc<ApiServer>>,
        Path(diploma_id): Path<String>,
    ) -> Response {
        match state.registry.diploma_by_id(&diploma_id) {
            Some(record) => Json(record).into_response(),
            None => (StatusCode::NOT_FOUND, error_body("diploma not found")).into_response(),
        }
    }

    /// Lists all issued diplomas, newest first
    ///
    /// # Endpoint
    /// GET /diplomas
    ///
    /// The list is served from the event-log read model; the indexer is
    /// refreshed on each call, so a mint landing mid-request shows up on the
    /// next one.
    async fn list_diplomas_handler(State(state): State<Arc<ApiServer>>) -> Response {
        let diplomas = {
            let mut indexer = state.indexer.lock().unwrap();
            indexer.refresh_from(&state.registry);
            indexer.newest_first()
        };
        Json(ListDiplomasResponse { diplomas }).into_response()
    }

    /// Reads the issuance event log
    ///
    /// # Endpoint
    /// GET /events?from=N
    ///
    /// # Responses
    /// - 200 OK: Events at or after position `from` (default: genesis)
    async fn events_handler(
        State(state): State<Arc<ApiServer>>,
        Query(query): Query<EventsQuery>,
    ) -> Response {
        let events = state.registry.events_from(query.from.unwrap_or(1));
        Json(EventsResponse { events }).into_response()
    }

    /// Resolves a token id to its diploma and `ipfs://` reference
    ///
    /// # Endpoint
    /// GET /token/:token_id
    ///
    /// # Responses
    /// - 200 OK: Returns `{token_id, diploma_id, token_uri}`
    /// - 404 Not Found: No diploma minted under this token id
    async fn token_handler(
        State(state): State<Arc<ApiServer>>,
        Path(token_id): Path<u64>,
    ) -> Response {
        let Some(diploma_id) = state.registry.diploma_id_by_token(token_id) else {
            return (StatusCode::NOT_FOUND, error_body("unknown token id")).into_response();
        };
        match state.registry.token_uri(token_id) {
            Ok(token_uri) => Json(TokenResponse {
                token_id,
                diploma_id,
                token_uri,
            })
            .into_response(),
            Err(e) => (registry_status(&e), error_body(e.to_string())).into_response(),
        }
    }

    /// Fetches a pinned document by its CID
    ///
    /// # Endpoint
    /// GET /document/:cid
    ///
    /// # Responses
    /// - 200 OK: Raw document bytes
    /// - 502 Bad Gateway: Storage provider failure
    async fn document_handler(
        State(state): State<Arc<ApiServer>>,
        Path(cid): Path<String>,
    ) -> Response {
        match state.ipfs_storage.retrieve_document(&cid).await {
            Ok(data) => (
                StatusCode::OK,
                [(header::CONTENT_TYPE, state.settings.accepted_mime.clone())],
                data,
            )
                .into_response(),
            Err(e) => (storage_status(&e), error_body(e.to_string())).into_response(),
        }
    }

    /// Reports the registry's authority state
    ///
    /// # Endpoint
    /// GET /registry-info
    async fn registry_info_handler(State(state): State<Arc<ApiServer>>) -> Response {
        Json(RegistryInfoResponse {
            owner: state.registry.owner(),
            institution_admin: state.registry.institution_admin(),
            total_issued: state.registry.total_issued(),
        })
        .into_response()
    }

    // =====================
    // Verification
    // =====================

    /// Verifies a candidate PDF against the committed digest
    ///
    /// # Endpoint
    /// POST /verify-diploma
    ///
    /// # Request Body
    /// Multipart form with `diploma_id` and the candidate `file`
    ///
    /// # Responses
    /// - 200 OK: Returns `{"result": "authentic" | "tampered" | "not_found"}`
    /// - 400 Bad Request: Missing field or file
    async fn verify_diploma_handler(
        State(state): State<Arc<ApiServer>>,
        multipart: Multipart,
    ) -> Response {
        let form = match read_multipart(multipart).await {
            Ok(form) => form,
            Err(e) => return (StatusCode::BAD_REQUEST, error_body(e)).into_response(),
        };

        let diploma_id = form.text("diploma_id").to_string();
        if diploma_id.is_empty() {
            return (StatusCode::BAD_REQUEST, error_body("diploma_id is required"))
                .into_response();
        }
        let Some((data, _)) = form.file else {
            return (
                StatusCode::BAD_REQUEST,
                error_body("candidate file required in the 'file' field"),
            )
                .into_response();
        };

        let result = state.verifier.verify_document(&diploma_id, &data);
        Json(VerifyDiplomaResponse { result }).into_response()
    }

    // =====================
    // Authority Operations
    // =====================

    /// Rotates the institution admin
    ///
    /// # Endpoint
    /// POST /set-institution-admin
    ///
    /// # Responses
    /// - 200 OK: Returns the new admin address
    /// - 403 Forbidden: Caller is not the owner
    async fn set_admin_handler(
        State(state): State<Arc<ApiServer>>,
        Json(payload): Json<SetAdminRequest>,
    ) -> Response {
        match state
            .registry
            .set_institution_admin(payload.caller, payload.new_admin)
        {
            Ok(()) => Json(json!({ "institution_admin": payload.new_admin })).into_response(),
            Err(e) => (registry_status(&e), error_body(e.to_string())).into_response(),
        }
    }

    /// Transfers the owner role
    ///
    /// # Endpoint
    /// POST /transfer-ownership
    ///
    /// # Responses
    /// - 200 OK: Returns the new owner address
    /// - 403 Forbidden: Caller is not the owner
    async fn transfer_ownership_handler(
        State(state): State<Arc<ApiServer>>,
        Json(payload): Json<TransferOwnershipRequest>,
    ) -> Response {
        match state
            .registry
            .transfer_ownership(payload.caller, payload.new_owner)
        {
            Ok(()) => Json(json!({ "owner": payload.new_owner })).into_response(),
            Err(e) => (registry_status(&e), error_body(e.to_string())).into_response(),
        }
    }
}

// Implement Clone for ApiServer to use with Axum's State
impl Clone for ApiServer {
    fn clone(&self) -> Self {
        ApiServer {
            registry: Arc::clone(&self.registry),
            issuer: Arc::clone(&self.issuer),
            verifier: Arc::clone(&self.verifier),
            ipfs_storage: self.ipfs_storage.clone(),
            indexer: Arc::clone(&self.indexer),
            settings: self.settings.clone(),
        }
    }
}
