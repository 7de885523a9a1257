use thiserror::Error;

#[derive(Error, Debug)]
pub enum PaycertError {
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid decimal: {0}")]
    Decimal(#[from] rust_decimal::Error),

    #[error("Unknown project: {0}")]
    UnknownProject(String),

    #[error("Unknown structure: {0}")]
    UnknownStructure(String),

    #[error("Unknown line item: {0}")]
    UnknownLineItem(i64),

    #[error("Unknown payment certificate #{number} for project {project}")]
    UnknownCertificate { project: String, number: i64 },

    #[error(
        "Payment certificate #{certificate_number} belongs to project {actual}, not project {expected}"
    )]
    ScopeViolation {
        certificate_number: i64,
        expected: i64,
        actual: i64,
    },

    #[error("Cannot move certificate #{number} from {from} to {to}")]
    InvalidTransition {
        number: i64,
        from: String,
        to: String,
    },

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("PDF error: {0}")]
    Pdf(String),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, PaycertError>;
