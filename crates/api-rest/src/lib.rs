//! # API REST
//!
//! REST API implementation for the indent system.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON serialization, CORS)
//!
//! Form state is session-scoped: `POST /sessions` creates a server-side
//! [`FormSession`] view-model, subsequent calls mutate it through the core
//! operations, and `POST /sessions/:id/submit` writes the validated form
//! to the log.

#![warn(rust_2018_idioms)]

use axum::{
    extract::{Path as AxumPath, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post, put},
    Router,
};
use chrono::{NaiveDate, Utc};
use indent_core::{
    render::render_document,
    request::{sort_lines, REQUIRED_DATE_FORMAT},
    share::{share_link, share_message},
    CatalogService, CoreConfig, FormSession, HistoryRecord, HistoryService, IndentError,
    IndentLine, IndentRequest, LineItem, ReferenceCatalog, Submission, SubmissionService,
};
use indent_store::Workbook;
use indent_types::NonEmptyText;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use utoipa::{IntoParams, OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;
use uuid::Uuid;

/// Application state shared across REST API handlers.
///
/// Holds the startup configuration, the core services and the map of live
/// form sessions.
#[derive(Clone)]
pub struct AppState {
    cfg: Arc<CoreConfig>,
    catalog: Arc<CatalogService>,
    history: Arc<HistoryService>,
    submission: Arc<SubmissionService>,
    sessions: Arc<RwLock<HashMap<Uuid, FormSession>>>,
}

impl AppState {
    /// The configuration the state was built from.
    pub fn config(&self) -> &CoreConfig {
        &self.cfg
    }
}

/// Resolves the core configuration from the environment.
///
/// # Environment Variables
/// - `INDENT_DATA_DIR`: workbook directory (default: "./indent_data")
/// - `INDENT_LOG_SHEET`: log worksheet name
/// - `INDENT_REFERENCE_SHEET`: reference worksheet name
/// - `INDENT_HISTORY_WINDOW_DAYS`: default trailing history window
pub fn config_from_env() -> anyhow::Result<CoreConfig> {
    let data_dir = std::env::var("INDENT_DATA_DIR").unwrap_or_else(|_| "./indent_data".into());
    let log_sheet = std::env::var("INDENT_LOG_SHEET")
        .unwrap_or_else(|_| indent_core::config::DEFAULT_LOG_SHEET.into());
    let reference_sheet = std::env::var("INDENT_REFERENCE_SHEET")
        .unwrap_or_else(|_| indent_core::config::DEFAULT_REFERENCE_SHEET.into());
    let window_days = indent_core::config::history_window_from_env_value(
        std::env::var("INDENT_HISTORY_WINDOW_DAYS").ok(),
    )?;

    Ok(CoreConfig::new(
        PathBuf::from(data_dir),
        log_sheet,
        reference_sheet,
        window_days,
    )?)
}

/// Builds the shared state, failing fast on configuration problems.
///
/// # Errors
///
/// Returns an error when the workbook directory or either worksheet is
/// missing; such configuration errors are fatal to the process.
pub fn build_state(cfg: Arc<CoreConfig>) -> anyhow::Result<AppState> {
    let workbook = Workbook::open(cfg.data_dir())?;
    let log_sheet = workbook.existing_worksheet(cfg.log_sheet())?;
    let reference_sheet = workbook.existing_worksheet(cfg.reference_sheet())?;

    Ok(AppState {
        catalog: Arc::new(CatalogService::new(reference_sheet, cfg.catalog_max_age())),
        history: Arc::new(HistoryService::new(
            log_sheet.clone(),
            cfg.history_max_age(),
            cfg.history_window_days(),
        )),
        submission: Arc::new(SubmissionService::new(log_sheet)),
        sessions: Arc::new(RwLock::new(HashMap::new())),
        cfg,
    })
}

/// Builds the REST router with Swagger UI and permissive CORS.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/sessions", post(create_session))
        .route("/sessions/:id/form", get(get_form))
        .route("/sessions/:id/form/rows", post(add_rows))
        .route(
            "/sessions/:id/form/rows/:row_id",
            put(update_row).delete(remove_row),
        )
        .route("/sessions/:id/form/clear", post(clear_form))
        .route("/sessions/:id/form/header", put(update_header))
        .route("/sessions/:id/submit", post(submit_indent))
        .route("/requests/:mrn/document", get(get_document))
        .route("/catalog", get(get_catalog))
        .route("/history", get(get_history))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ============================================================================
// DTOS
// ============================================================================

#[derive(serde::Serialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

#[derive(serde::Serialize, ToSchema)]
pub struct CreateSessionRes {
    pub session_id: Uuid,
}

#[derive(serde::Serialize, ToSchema)]
pub struct RowView {
    pub id: Uuid,
    pub item_name: Option<String>,
    pub quantity: f64,
    pub note: String,
    pub unit: String,
    pub category: Option<String>,
    pub sub_category: Option<String>,
}

#[derive(serde::Serialize, ToSchema)]
pub struct ValidityView {
    pub has_duplicates: bool,
    pub duplicate_names: Vec<String>,
    pub has_at_least_one_valid_line: bool,
    /// Whether the submit action would currently be accepted.
    pub submittable: bool,
}

#[derive(serde::Serialize, ToSchema)]
pub struct FormView {
    pub session_id: Uuid,
    pub department: Option<String>,
    /// Required date in DD-MM-YYYY.
    pub required_date: String,
    pub requested_by: Option<String>,
    pub rows: Vec<RowView>,
    pub validity: ValidityView,
}

#[derive(serde::Deserialize, ToSchema)]
pub struct AddRowsReq {
    /// Rows to append; defaults to one.
    #[serde(default = "default_row_count")]
    pub count: usize,
}

fn default_row_count() -> usize {
    1
}

#[derive(serde::Deserialize, ToSchema)]
pub struct UpdateRowReq {
    /// New item name; an empty string clears the row's item. Absent
    /// leaves the item unchanged.
    pub item_name: Option<String>,
    pub quantity: Option<f64>,
    pub note: Option<String>,
}

#[derive(serde::Deserialize, ToSchema)]
pub struct UpdateHeaderReq {
    /// New department; an empty string deselects. Absent leaves it
    /// unchanged.
    pub department: Option<String>,
    /// Required date in DD-MM-YYYY.
    pub required_date: Option<String>,
    pub requested_by: Option<String>,
}

#[derive(serde::Serialize, ToSchema)]
pub struct LineView {
    pub item_name: String,
    pub quantity: f64,
    pub unit: String,
    pub note: String,
    pub category: String,
    pub sub_category: String,
}

#[derive(serde::Serialize, ToSchema)]
pub struct RequestView {
    pub request_id: String,
    pub created_at: String,
    pub department: String,
    /// Required date in DD-MM-YYYY.
    pub required_date: String,
    pub requested_by: String,
    pub lines: Vec<LineView>,
}

#[derive(serde::Serialize, ToSchema)]
pub struct SubmitRes {
    pub request: RequestView,
    pub total_quantity: f64,
    pub share_message: String,
    pub share_link: String,
    pub document_filename: String,
}

#[derive(serde::Serialize, ToSchema)]
pub struct CatalogItemView {
    pub name: String,
    pub unit: String,
    pub category: String,
    pub sub_category: String,
}

#[derive(serde::Serialize, ToSchema)]
pub struct CatalogRes {
    pub items: Vec<CatalogItemView>,
}

#[derive(serde::Deserialize, IntoParams)]
pub struct CatalogQuery {
    /// Restrict to items the department may order.
    pub department: Option<String>,
}

#[derive(serde::Deserialize, IntoParams)]
pub struct HistoryQuery {
    /// Start of the required-date range, DD-MM-YYYY (inclusive).
    pub from: Option<String>,
    /// End of the required-date range, DD-MM-YYYY (inclusive).
    pub to: Option<String>,
    /// Comma-separated department names.
    pub department: Option<String>,
    /// Comma-separated requester names.
    pub requested_by: Option<String>,
    /// Case-insensitive substring of the request identifier.
    pub mrn: Option<String>,
    /// Case-insensitive substring of the item name.
    pub item: Option<String>,
}

#[derive(serde::Serialize, ToSchema)]
pub struct HistoryRecordView {
    pub request_id: String,
    pub submitted_at: Option<String>,
    pub requested_by: String,
    pub department: String,
    pub required_date: Option<String>,
    pub item_name: String,
    pub quantity: f64,
    pub unit: String,
    pub note: String,
}

#[derive(serde::Serialize, ToSchema)]
pub struct HistoryRes {
    pub records: Vec<HistoryRecordView>,
    /// Active range start, DD-MM-YYYY.
    pub from: String,
    /// Active range end, DD-MM-YYYY.
    pub to: String,
    /// Set when the log could not be read and the view degraded to empty.
    pub warning: Option<String>,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        create_session,
        get_form,
        add_rows,
        update_row,
        remove_row,
        clear_form,
        update_header,
        submit_indent,
        get_document,
        get_catalog,
        get_history,
    ),
    components(schemas(
        HealthRes,
        CreateSessionRes,
        RowView,
        ValidityView,
        FormView,
        AddRowsReq,
        UpdateRowReq,
        UpdateHeaderReq,
        LineView,
        RequestView,
        SubmitRes,
        CatalogItemView,
        CatalogRes,
        HistoryRecordView,
        HistoryRes,
    ))
)]
struct ApiDoc;

// ============================================================================
// ERROR MAPPING
// ============================================================================

type ApiError = (StatusCode, String);

/// Maps core errors onto HTTP statuses with a user-visible message.
fn api_error(err: IndentError) -> ApiError {
    let status = match &err {
        IndentError::InvalidInput(_)
        | IndentError::UnknownRow(_)
        | IndentError::DuplicateItems(_)
        | IndentError::NoValidLines
        | IndentError::MissingDepartment
        | IndentError::MissingRequester
        | IndentError::RequiredDateInPast(_) => StatusCode::UNPROCESSABLE_ENTITY,
        IndentError::Store(_) | IndentError::MrnUnavailable(_) => StatusCode::BAD_GATEWAY,
        IndentError::CatalogUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        IndentError::Render(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        tracing::error!("request failed: {err}");
    }
    (status, err.to_string())
}

fn session_not_found(id: Uuid) -> ApiError {
    (StatusCode::NOT_FOUND, format!("no such session: {id}"))
}

fn parse_wire_date(value: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(value, REQUIRED_DATE_FORMAT).map_err(|_| {
        (
            StatusCode::UNPROCESSABLE_ENTITY,
            format!("invalid date '{value}', expected DD-MM-YYYY"),
        )
    })
}

// ============================================================================
// VIEW BUILDING
// ============================================================================

fn row_view(row: &LineItem) -> RowView {
    RowView {
        id: row.id,
        item_name: row.item_name.clone(),
        quantity: row.quantity,
        note: row.note.clone(),
        unit: row.resolved_unit.clone(),
        category: row.resolved_category.clone(),
        sub_category: row.resolved_sub_category.clone(),
    }
}

fn form_view(session_id: Uuid, session: &FormSession) -> FormView {
    let validity = session.compute_validity();
    let submittable = session.submit_gate(Utc::now().date_naive()).is_ok();

    FormView {
        session_id,
        department: session.department().map(str::to_owned),
        required_date: session
            .required_date()
            .format(REQUIRED_DATE_FORMAT)
            .to_string(),
        requested_by: session.requested_by().map(str::to_owned),
        rows: session.draft().rows().iter().map(row_view).collect(),
        validity: ValidityView {
            has_duplicates: validity.has_duplicates,
            duplicate_names: validity.duplicate_names.into_iter().collect(),
            has_at_least_one_valid_line: validity.has_at_least_one_valid_line,
            submittable,
        },
    }
}

fn request_view(request: &IndentRequest) -> RequestView {
    RequestView {
        request_id: request.request_id.clone(),
        created_at: request.created_at.to_rfc3339(),
        department: request.department.to_string(),
        required_date: request
            .required_date
            .format(REQUIRED_DATE_FORMAT)
            .to_string(),
        requested_by: request.requested_by.to_string(),
        lines: request
            .lines
            .iter()
            .map(|line| LineView {
                item_name: line.item_name.clone(),
                quantity: line.quantity,
                unit: line.unit.clone(),
                note: line.note.clone(),
                category: line.category.clone(),
                sub_category: line.sub_category.clone(),
            })
            .collect(),
    }
}

fn record_view(record: &HistoryRecord) -> HistoryRecordView {
    HistoryRecordView {
        request_id: record.request_id.clone(),
        submitted_at: record
            .submitted_at
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string()),
        requested_by: record.requested_by.clone(),
        department: record.department.clone(),
        required_date: record
            .required_date
            .map(|d| d.format(REQUIRED_DATE_FORMAT).to_string()),
        item_name: record.item_name.clone(),
        quantity: record.quantity,
        unit: record.unit.clone(),
        note: record.note.clone(),
    }
}

// ============================================================================
// HANDLERS
// ============================================================================

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for the REST API.
#[axum::debug_handler]
async fn health(State(_state): State<AppState>) -> Json<HealthRes> {
    Json(HealthRes {
        ok: true,
        message: "Indent REST API is alive".into(),
    })
}

#[utoipa::path(
    post,
    path = "/sessions",
    responses(
        (status = 201, description = "Form session created", body = CreateSessionRes)
    )
)]
/// Creates a fresh form session.
///
/// The session starts with the default number of blank rows and the
/// required date preset to today. The returned id addresses all further
/// form operations.
#[axum::debug_handler]
async fn create_session(State(state): State<AppState>) -> (StatusCode, Json<CreateSessionRes>) {
    let session_id = Uuid::new_v4();
    let session = FormSession::new(Utc::now().date_naive());
    state.sessions.write().await.insert(session_id, session);

    tracing::info!(%session_id, "form session created");
    (StatusCode::CREATED, Json(CreateSessionRes { session_id }))
}

#[utoipa::path(
    get,
    path = "/sessions/{id}/form",
    params(("id" = Uuid, Path, description = "Form session id")),
    responses(
        (status = 200, description = "Current form state", body = FormView),
        (status = 404, description = "Unknown session")
    )
)]
/// Returns the current form state, including its validity verdict.
#[axum::debug_handler]
async fn get_form(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<Uuid>,
) -> Result<Json<FormView>, ApiError> {
    let sessions = state.sessions.read().await;
    let session = sessions.get(&id).ok_or_else(|| session_not_found(id))?;
    Ok(Json(form_view(id, session)))
}

#[utoipa::path(
    post,
    path = "/sessions/{id}/form/rows",
    params(("id" = Uuid, Path, description = "Form session id")),
    request_body = AddRowsReq,
    responses(
        (status = 200, description = "Rows appended", body = FormView),
        (status = 404, description = "Unknown session")
    )
)]
/// Appends blank rows to the form.
#[axum::debug_handler]
async fn add_rows(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<Uuid>,
    Json(req): Json<AddRowsReq>,
) -> Result<Json<FormView>, ApiError> {
    let mut sessions = state.sessions.write().await;
    let session = sessions.get_mut(&id).ok_or_else(|| session_not_found(id))?;
    session.draft_mut().add_rows(req.count);
    Ok(Json(form_view(id, session)))
}

#[utoipa::path(
    put,
    path = "/sessions/{id}/form/rows/{row_id}",
    params(
        ("id" = Uuid, Path, description = "Form session id"),
        ("row_id" = Uuid, Path, description = "Line item row id")
    ),
    request_body = UpdateRowReq,
    responses(
        (status = 200, description = "Row updated", body = FormView),
        (status = 404, description = "Unknown session"),
        (status = 422, description = "Unknown row")
    )
)]
/// Updates one row's item, quantity or note.
///
/// Setting the item re-derives unit and category from the reference
/// catalog; an empty item name clears the row.
#[axum::debug_handler]
async fn update_row(
    State(state): State<AppState>,
    AxumPath((id, row_id)): AxumPath<(Uuid, Uuid)>,
    Json(req): Json<UpdateRowReq>,
) -> Result<Json<FormView>, ApiError> {
    // Load the catalog before taking the session lock; it may hit the store.
    let catalog = if req.item_name.is_some() {
        Some(state.catalog.load().map_err(api_error)?)
    } else {
        None
    };

    let mut sessions = state.sessions.write().await;
    let session = sessions.get_mut(&id).ok_or_else(|| session_not_found(id))?;

    if let (Some(item_name), Some(catalog)) = (&req.item_name, &catalog) {
        let name = Some(item_name.as_str()).filter(|n| !n.trim().is_empty());
        session
            .draft_mut()
            .set_item(row_id, name, catalog)
            .map_err(api_error)?;
    }
    if let Some(quantity) = req.quantity {
        session
            .draft_mut()
            .set_quantity(row_id, quantity)
            .map_err(api_error)?;
    }
    if let Some(note) = &req.note {
        session
            .draft_mut()
            .set_note(row_id, note)
            .map_err(api_error)?;
    }

    Ok(Json(form_view(id, session)))
}

#[utoipa::path(
    delete,
    path = "/sessions/{id}/form/rows/{row_id}",
    params(
        ("id" = Uuid, Path, description = "Form session id"),
        ("row_id" = Uuid, Path, description = "Line item row id")
    ),
    responses(
        (status = 200, description = "Row removed", body = FormView),
        (status = 404, description = "Unknown session"),
        (status = 422, description = "Unknown row")
    )
)]
/// Removes one row; a form never drops to zero rows.
#[axum::debug_handler]
async fn remove_row(
    State(state): State<AppState>,
    AxumPath((id, row_id)): AxumPath<(Uuid, Uuid)>,
) -> Result<Json<FormView>, ApiError> {
    let mut sessions = state.sessions.write().await;
    let session = sessions.get_mut(&id).ok_or_else(|| session_not_found(id))?;
    session.draft_mut().remove_row(row_id).map_err(api_error)?;
    Ok(Json(form_view(id, session)))
}

#[utoipa::path(
    post,
    path = "/sessions/{id}/form/clear",
    params(("id" = Uuid, Path, description = "Form session id")),
    responses(
        (status = 200, description = "Form cleared", body = FormView),
        (status = 404, description = "Unknown session")
    )
)]
/// Clears the form back to one blank row.
#[axum::debug_handler]
async fn clear_form(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<Uuid>,
) -> Result<Json<FormView>, ApiError> {
    let mut sessions = state.sessions.write().await;
    let session = sessions.get_mut(&id).ok_or_else(|| session_not_found(id))?;
    session.draft_mut().clear();
    Ok(Json(form_view(id, session)))
}

#[utoipa::path(
    put,
    path = "/sessions/{id}/form/header",
    params(("id" = Uuid, Path, description = "Form session id")),
    request_body = UpdateHeaderReq,
    responses(
        (status = 200, description = "Header updated", body = FormView),
        (status = 404, description = "Unknown session"),
        (status = 422, description = "Invalid date")
    )
)]
/// Updates the form header fields.
///
/// Changing the department clears every row: previously picked items are
/// not guaranteed valid under the new department's permitted set.
#[axum::debug_handler]
async fn update_header(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<Uuid>,
    Json(req): Json<UpdateHeaderReq>,
) -> Result<Json<FormView>, ApiError> {
    let required_date = req
        .required_date
        .as_deref()
        .map(parse_wire_date)
        .transpose()?;

    let mut sessions = state.sessions.write().await;
    let session = sessions.get_mut(&id).ok_or_else(|| session_not_found(id))?;

    if let Some(department) = req.department {
        session.set_department(Some(department));
    }
    if let Some(date) = required_date {
        session.set_required_date(date);
    }
    if let Some(requested_by) = req.requested_by {
        session.set_requested_by(Some(requested_by));
    }

    Ok(Json(form_view(id, session)))
}

#[utoipa::path(
    post,
    path = "/sessions/{id}/submit",
    params(("id" = Uuid, Path, description = "Form session id")),
    responses(
        (status = 201, description = "Indent submitted", body = SubmitRes),
        (status = 404, description = "Unknown session"),
        (status = 422, description = "Validation failed"),
        (status = 502, description = "Log store unavailable")
    )
)]
/// Submits the form as a new indent request.
///
/// Validation is re-run atomically before the write. On success the form
/// resets to one blank row with department and requester retained as
/// defaults, and the response carries the share link and the name of the
/// downloadable document.
#[axum::debug_handler]
async fn submit_indent(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<Uuid>,
) -> Result<(StatusCode, Json<SubmitRes>), ApiError> {
    let catalog = state.catalog.load().map_err(api_error)?;

    let mut sessions = state.sessions.write().await;
    let session = sessions.get_mut(&id).ok_or_else(|| session_not_found(id))?;

    let Submission {
        request,
        total_quantity,
    } = state
        .submission
        .submit(session, &catalog)
        .map_err(api_error)?;

    let res = SubmitRes {
        share_message: share_message(&request),
        share_link: share_link(&request),
        document_filename: request.document_filename(),
        total_quantity,
        request: request_view(&request),
    };
    Ok((StatusCode::CREATED, Json(res)))
}

#[utoipa::path(
    get,
    path = "/requests/{mrn}/document",
    params(("mrn" = String, Path, description = "Request identifier")),
    responses(
        (status = 200, description = "Rendered document", body = String, content_type = "text/html"),
        (status = 404, description = "Unknown request identifier")
    )
)]
/// Renders a submitted request as a downloadable document.
///
/// The request is reconstructed from its log rows; rendering is isolated
/// from submission, so a failure here never affects persisted data.
#[axum::debug_handler]
async fn get_document(
    State(state): State<AppState>,
    AxumPath(mrn): AxumPath<String>,
) -> Result<Response, ApiError> {
    let records = state.history.load().map_err(api_error)?;
    let lines: Vec<&HistoryRecord> = records
        .iter()
        .filter(|r| r.request_id.eq_ignore_ascii_case(mrn.trim()))
        .collect();
    let first = lines
        .first()
        .ok_or_else(|| (StatusCode::NOT_FOUND, format!("no such request: {mrn}")))?;

    let catalog = state.catalog.load().ok();
    let request = rebuild_request(first, &lines, catalog.as_deref())?;
    let html = render_document(&request).map_err(api_error)?;
    let filename = request.document_filename();

    Ok((
        [
            (header::CONTENT_TYPE, "text/html; charset=utf-8".to_owned()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        html,
    )
        .into_response())
}

#[utoipa::path(
    get,
    path = "/catalog",
    params(CatalogQuery),
    responses(
        (status = 200, description = "Reference items", body = CatalogRes),
        (status = 503, description = "Reference data unavailable")
    )
)]
/// Lists reference items, optionally restricted to a department's
/// permitted set.
#[axum::debug_handler]
async fn get_catalog(
    State(state): State<AppState>,
    Query(query): Query<CatalogQuery>,
) -> Result<Json<CatalogRes>, ApiError> {
    let catalog = state.catalog.load().map_err(api_error)?;

    let items: Vec<CatalogItemView> = match query.department.as_deref().map(str::trim) {
        Some(department) if !department.is_empty() => catalog
            .permitted_items(department)
            .into_iter()
            .map(catalog_item_view)
            .collect(),
        _ => catalog.iter().map(catalog_item_view).collect(),
    };

    Ok(Json(CatalogRes { items }))
}

fn catalog_item_view(item: &indent_core::ReferenceItem) -> CatalogItemView {
    CatalogItemView {
        name: item.name.clone(),
        unit: item.unit.clone(),
        category: item.category.clone(),
        sub_category: item.sub_category.clone(),
    }
}

#[utoipa::path(
    get,
    path = "/history",
    params(HistoryQuery),
    responses(
        (status = 200, description = "Filtered history records", body = HistoryRes),
        (status = 422, description = "Invalid filter date")
    )
)]
/// Returns history records passing the filters.
///
/// With no date filters, the trailing default window applies. A log read
/// failure degrades to an empty result with a warning so the view stays
/// usable.
#[axum::debug_handler]
async fn get_history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryRes>, ApiError> {
    let mut filter = state.history.default_filter(Utc::now().date_naive());
    if let Some(from) = query.from.as_deref() {
        filter.from = parse_wire_date(from)?;
    }
    if let Some(to) = query.to.as_deref() {
        filter.to = parse_wire_date(to)?;
    }
    filter.departments = split_set(query.department.as_deref());
    filter.requesters = split_set(query.requested_by.as_deref());
    filter.request_id_query = query.mrn.unwrap_or_default().trim().to_owned();
    filter.item_query = query.item.unwrap_or_default().trim().to_owned();

    let (records, warning) = match state.history.filtered(&filter) {
        Ok(records) => (records, None),
        Err(err) => {
            tracing::error!("history load failed: {err}");
            (Vec::new(), Some(err.to_string()))
        }
    };

    Ok(Json(HistoryRes {
        records: records.iter().map(record_view).collect(),
        from: filter.from.format(REQUIRED_DATE_FORMAT).to_string(),
        to: filter.to.format(REQUIRED_DATE_FORMAT).to_string(),
        warning,
    }))
}

fn split_set(value: Option<&str>) -> std::collections::BTreeSet<String> {
    value
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Rebuilds an immutable request from its log rows for rendering.
///
/// Grouping columns are not persisted in the log, so category and
/// sub-category come from the current catalog where the item still
/// resolves. Header fields missing from legacy rows fall back to a dash
/// so old requests stay renderable.
fn rebuild_request(
    first: &HistoryRecord,
    records: &[&HistoryRecord],
    catalog: Option<&ReferenceCatalog>,
) -> Result<IndentRequest, ApiError> {
    let mut lines: Vec<IndentLine> = records
        .iter()
        .map(|record| {
            let (category, sub_category) = catalog
                .and_then(|c| c.resolve(&record.item_name))
                .map(|item| (item.category.clone(), item.sub_category.clone()))
                .unwrap_or_else(|| {
                    (
                        indent_core::catalog::DEFAULT_CATEGORY.to_owned(),
                        indent_core::catalog::DEFAULT_SUB_CATEGORY.to_owned(),
                    )
                });
            IndentLine {
                item_name: record.item_name.clone(),
                quantity: record.quantity,
                unit: record.unit.clone(),
                note: if record.note.eq_ignore_ascii_case("N/A") {
                    String::new()
                } else {
                    record.note.clone()
                },
                category,
                sub_category,
            }
        })
        .collect();
    sort_lines(&mut lines);

    Ok(IndentRequest {
        request_id: first.request_id.clone(),
        created_at: first
            .submitted_at
            .map(|t| t.and_utc())
            .unwrap_or_else(Utc::now),
        department: header_text(&first.department)?,
        required_date: first
            .required_date
            .unwrap_or_else(|| Utc::now().date_naive()),
        requested_by: header_text(&first.requested_by)?,
        lines,
    })
}

/// A log header cell as renderable text; legacy rows without the field
/// fall back to a dash.
fn header_text(value: &str) -> Result<NonEmptyText, ApiError> {
    let value = value.trim();
    let value = if value.is_empty() { "-" } else { value };
    NonEmptyText::new(value).map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
}
