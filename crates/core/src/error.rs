#[derive(Debug, thiserror::Error)]
pub enum IndentError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("store error: {0}")]
    Store(#[from] indent_store::StoreError),
    #[error("reference data is empty or could not be loaded")]
    CatalogUnavailable,
    #[error("no such line item row: {0}")]
    UnknownRow(uuid::Uuid),
    #[error("duplicate items in request: {}", .0.join(", "))]
    DuplicateItems(Vec<String>),
    #[error("no valid line items to submit")]
    NoValidLines,
    #[error("no department selected")]
    MissingDepartment,
    #[error("requester name is blank")]
    MissingRequester,
    #[error("required date {0} is in the past")]
    RequiredDateInPast(chrono::NaiveDate),
    #[error("request number unavailable: {0}")]
    MrnUnavailable(String),
    #[error("failed to render document: {0}")]
    Render(String),
}

pub type IndentResult<T> = std::result::Result<T, IndentError>;
