mod certificates;
mod cli;
mod db;
mod error;
mod filter;
mod fmt;
mod ledger;
mod models;
#[cfg(feature = "pdf")]
mod pdf;
mod picker;
mod projects;
mod reports;
mod settings;
mod tui;

use clap::Parser;
use tracing_subscriber::EnvFilter;

#[cfg(feature = "pdf")]
use cli::ExportCommands;
use cli::{
    CertCommands, ClaimCommands, Cli, Commands, ItemCommands, PaymentCommands, ProjectCommands,
    ReportCommands, StructureCommands,
};
use models::CertificateStatus;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init {
            data_dir,
            company,
            user,
        } => cli::init::run(data_dir, company, user),
        Commands::Status => cli::status::run(),
        Commands::Backup { output } => cli::backup::run(output),
        Commands::Demo => cli::demo::run(),
        Commands::Project { command } => match command {
            ProjectCommands::Add { name } => cli::project::add(&name),
            ProjectCommands::List => cli::project::list(),
            ProjectCommands::Activate { name } => cli::project::activate(&name),
            ProjectCommands::Values { name } => cli::project::values(&name),
        },
        Commands::Structure { command } => match command {
            StructureCommands::Add {
                project,
                name,
                description,
            } => cli::structure::add(&project, &name, &description),
            StructureCommands::List { project } => cli::structure::list(&project),
        },
        Commands::Item { command } => match command {
            ItemCommands::Add {
                project,
                structure,
                number,
                description,
                unit,
                quantity,
                rate,
                reference,
                addendum,
                special,
            } => cli::item::add(cli::item::AddArgs {
                project,
                structure,
                number,
                description,
                unit,
                quantity,
                rate,
                reference,
                addendum,
                special,
            }),
            ItemCommands::List {
                project,
                structure,
                search,
            } => cli::item::list(&project, structure.as_deref(), search.as_deref()),
        },
        Commands::Cert { command } => match command {
            CertCommands::New {
                project,
                is_final,
                notes,
            } => cli::cert::new(&project, is_final, &notes),
            CertCommands::List { project } => cli::cert::list(&project),
            CertCommands::Submit { project, number } => {
                cli::cert::set_status(&project, number, CertificateStatus::Submitted)
            }
            CertCommands::Approve { project, number } => {
                cli::cert::set_status(&project, number, CertificateStatus::Approved)
            }
            CertCommands::Reject { project, number } => {
                cli::cert::set_status(&project, number, CertificateStatus::Rejected)
            }
            CertCommands::Reopen { project, number } => {
                cli::cert::set_status(&project, number, CertificateStatus::Draft)
            }
        },
        Commands::Claim { command } => match command {
            ClaimCommands::Add {
                project,
                cert,
                item,
                quantity,
                approved,
                claimed,
            } => cli::claim::add(&project, cert, item, &quantity, approved, claimed),
            ClaimCommands::Capture { project, cert } => cli::claim::capture(&project, cert),
            ClaimCommands::List { project, cert } => cli::claim::list(&project, cert),
        },
        Commands::Payment { command } => match command {
            PaymentCommands::Add {
                project,
                amount,
                date,
            } => cli::payment::add(&project, &amount, date),
            PaymentCommands::List { project } => cli::payment::list(&project),
        },
        Commands::Report { command } => match command {
            ReportCommands::Cert { project, number } => cli::report::cert(&project, number),
            ReportCommands::Statement { project } => cli::report::statement(&project),
        },
        #[cfg(feature = "pdf")]
        Commands::Export { command } => match command {
            ExportCommands::Cert {
                project,
                number,
                abridged,
                output,
            } => cli::export::cert(&project, number, abridged, output),
            ExportCommands::Statement { project, output } => cli::export::statement(&project, output),
        },
    };

    if let Err(e) = result {
        tracing::debug!(error = ?e, "command failed");
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
