pub mod backup;
pub mod cert;
pub mod claim;
pub mod demo;
#[cfg(feature = "pdf")]
pub mod export;
pub mod init;
pub mod item;
pub mod payment;
pub mod project;
pub mod report;
pub mod status;
pub mod structure;

use clap::{Parser, Subcommand};
use rusqlite::Connection;

use crate::db::get_connection;
use crate::error::{PaycertError, Result};
use crate::settings::db_path;

/// Open the database, refusing to create one outside `paycert init`.
pub(crate) fn open_db() -> Result<Connection> {
    let path = db_path();
    if !path.exists() {
        return Err(PaycertError::Other(
            "No database found. Run `paycert init` first.".to_string(),
        ));
    }
    get_connection(&path)
}

#[derive(Parser)]
#[command(
    name = "paycert",
    version,
    about = "Progressive payment certificates for construction projects."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Set up paycert: choose a data directory and initialize the database.
    Init {
        /// Path for paycert data (default: ~/Documents/paycert)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
        /// Company name printed on reports
        #[arg(long)]
        company: Option<String>,
        /// Your name, recorded as the approver of certificates
        #[arg(long)]
        user: Option<String>,
    },
    /// Show settings and database statistics.
    Status,
    /// Back up the database.
    Backup {
        /// Destination file (default: <data-dir>/backups/paycert-<timestamp>.db)
        #[arg(long)]
        output: Option<String>,
    },
    /// Load a demo project with certificates and payments.
    Demo,
    /// Manage projects.
    Project {
        #[command(subcommand)]
        command: ProjectCommands,
    },
    /// Manage the structures of a project.
    Structure {
        #[command(subcommand)]
        command: StructureCommands,
    },
    /// Manage bill-of-quantities line items.
    Item {
        #[command(subcommand)]
        command: ItemCommands,
    },
    /// Manage payment certificates.
    Cert {
        #[command(subcommand)]
        command: CertCommands,
    },
    /// Capture claims against a payment certificate.
    Claim {
        #[command(subcommand)]
        command: ClaimCommands,
    },
    /// Record payments received.
    Payment {
        #[command(subcommand)]
        command: PaymentCommands,
    },
    /// Show reports in the terminal.
    Report {
        #[command(subcommand)]
        command: ReportCommands,
    },
    /// Export reports to PDF.
    #[cfg(feature = "pdf")]
    Export {
        #[command(subcommand)]
        command: ExportCommands,
    },
}

#[derive(Subcommand)]
pub enum ProjectCommands {
    /// Add a project.
    Add { name: String },
    /// List projects.
    List,
    /// Mark a project as active.
    Activate { name: String },
    /// Show the contract values of a project.
    Values { name: String },
}

#[derive(Subcommand)]
pub enum StructureCommands {
    /// Add a structure to a project.
    Add {
        #[arg(long)]
        project: String,
        name: String,
        #[arg(long, default_value = "")]
        description: String,
    },
    /// List the structures of a project.
    List {
        #[arg(long)]
        project: String,
    },
}

#[derive(Subcommand)]
pub enum ItemCommands {
    /// Add a line item to a structure's bill of quantities.
    Add {
        #[arg(long)]
        project: String,
        #[arg(long)]
        structure: String,
        /// Item number as printed on the BOQ (e.g. 1.2.3)
        #[arg(long)]
        number: String,
        #[arg(long)]
        description: String,
        /// Unit of measurement (m, m2, m3, item, ...)
        #[arg(long)]
        unit: String,
        /// Budgeted quantity
        #[arg(long)]
        quantity: String,
        /// Unit rate
        #[arg(long)]
        rate: String,
        /// Payment reference from the BOQ
        #[arg(long, default_value = "")]
        reference: String,
        /// Item added by contract addendum
        #[arg(long)]
        addendum: bool,
        /// Special item outside the budget
        #[arg(long)]
        special: bool,
    },
    /// List line items, optionally filtered by structure and search text.
    List {
        #[arg(long)]
        project: String,
        #[arg(long)]
        structure: Option<String>,
        #[arg(long)]
        search: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum CertCommands {
    /// Create the next payment certificate of a project.
    New {
        #[arg(long)]
        project: String,
        /// This is the final certificate of the project
        #[arg(long = "final")]
        is_final: bool,
        #[arg(long, default_value = "")]
        notes: String,
    },
    /// List the certificates of a project.
    List {
        #[arg(long)]
        project: String,
    },
    /// Submit a certificate for approval.
    Submit {
        #[arg(long)]
        project: String,
        number: i64,
    },
    /// Approve a certificate.
    Approve {
        #[arg(long)]
        project: String,
        number: i64,
    },
    /// Reject a certificate.
    Reject {
        #[arg(long)]
        project: String,
        number: i64,
    },
    /// Return a rejected certificate to draft.
    Reopen {
        #[arg(long)]
        project: String,
        number: i64,
    },
}

#[derive(Subcommand)]
pub enum ClaimCommands {
    /// Add a claim line to a certificate.
    Add {
        #[arg(long)]
        project: String,
        /// Certificate number
        #[arg(long)]
        cert: i64,
        /// Line item id (see `paycert item list`)
        #[arg(long)]
        item: i64,
        #[arg(long)]
        quantity: String,
        /// Mark the line as submitted
        #[arg(long)]
        approved: bool,
        /// Mark the line as claimed
        #[arg(long)]
        claimed: bool,
    },
    /// Pick line items interactively and capture quantities.
    Capture {
        #[arg(long)]
        project: String,
        #[arg(long)]
        cert: i64,
    },
    /// List the claim lines of a certificate.
    List {
        #[arg(long)]
        project: String,
        #[arg(long)]
        cert: i64,
    },
}

#[derive(Subcommand)]
pub enum PaymentCommands {
    /// Record a payment received.
    Add {
        #[arg(long)]
        project: String,
        #[arg(long, allow_hyphen_values = true)]
        amount: String,
        /// Payment date (YYYY-MM-DD, default: today)
        #[arg(long)]
        date: Option<String>,
    },
    /// List payments received.
    List {
        #[arg(long)]
        project: String,
    },
}

#[derive(Subcommand)]
pub enum ReportCommands {
    /// Payment certificate with progressive totals.
    Cert {
        #[arg(long)]
        project: String,
        number: i64,
    },
    /// All certificates, payments and the balance outstanding.
    Statement {
        #[arg(long)]
        project: String,
    },
}

#[cfg(feature = "pdf")]
#[derive(Subcommand)]
pub enum ExportCommands {
    /// Export a payment certificate.
    Cert {
        #[arg(long)]
        project: String,
        number: i64,
        /// Summary page only
        #[arg(long)]
        abridged: bool,
        #[arg(long)]
        output: Option<String>,
    },
    /// Export the project statement.
    Statement {
        #[arg(long)]
        project: String,
        #[arg(long)]
        output: Option<String>,
    },
}
