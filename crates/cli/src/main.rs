mod entry;
mod render;

use api_client::{HttpCollaborator, TokenFileSession};
use clap::{Parser, Subcommand};
use consult_core::repositories::{
    AttachmentStorage, ConsultationStore, FsConsultationStore, LocalAttachmentStorage,
};
use consult_core::session::CredentialsProvider;
use consult_core::{
    AttachmentPolicy, ConsultError, ConsultResult, ConsultationClient, CoreConfig, FilesService,
    StoredName, UuidService,
};
use entry::EntryArgs;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "consult")]
#[command(about = "Consultation records CLI")]
struct Cli {
    /// Base URL of the consultation REST API
    #[arg(long, env = "CONSULT_API_URL", default_value = "http://127.0.0.1:3000")]
    api_url: String,

    /// File holding the bearer token
    #[arg(long, env = "CONSULT_TOKEN_FILE", default_value = ".consult-token")]
    token_file: PathBuf,

    /// Work on a local data directory instead of the REST API
    #[arg(long, global = true)]
    local: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Store the bearer token used for API calls
    Login { token: String },
    /// Forget the stored bearer token
    Logout,
    /// Record a new consultation
    Add {
        patient_id: String,
        #[command(flatten)]
        entry: EntryArgs,
    },
    /// Replace an existing consultation
    Edit {
        patient_id: String,
        id: String,
        #[command(flatten)]
        entry: EntryArgs,
    },
    /// List a patient's consultations, newest first
    List { patient_id: String },
    /// Delete a consultation (its attachments are kept)
    Delete { patient_id: String, id: String },
    /// Mark the prescription or order of a consultation as reviewed
    Review {
        patient_id: String,
        id: String,
        /// `prescription` or `order`
        field: String,
    },
    /// Upload files on their own and print their stored names
    Upload {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Download an attachment by its stored name
    Download {
        stored_name: String,
        /// Output path (defaults to the stored name)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Show how field names resolve to canonical lab keys
    Normalize {
        #[arg(required = true)]
        names: Vec<String>,
    },
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        tracing::debug!("command failed: {:?}", e);
        match e {
            ConsultError::AuthExpired => {
                eprintln!("Not signed in or session expired. Run 'consult login <token>'.")
            }
            other => eprintln!("Error: {}", other),
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> ConsultResult<()> {
    let session = Arc::new(TokenFileSession::new(&cli.token_file));

    let command = match cli.command {
        Some(Commands::Login { token }) => {
            session.sign_in(&token)?;
            println!("Token stored in {}", session.path().display());
            return Ok(());
        }
        Some(Commands::Logout) => {
            session.invalidate();
            println!("Signed out.");
            return Ok(());
        }
        Some(Commands::Normalize { names }) => {
            for name in names {
                println!("{}", render::normalize_line(&name));
            }
            return Ok(());
        }
        Some(command) => command,
        None => {
            println!("Use 'consult --help' for commands");
            return Ok(());
        }
    };

    match cli.local {
        Some(data_dir) => {
            tracing::debug!("using local data directory {}", data_dir.display());
            let cfg = Arc::new(CoreConfig::with_data_dir(data_dir));
            cfg.ensure_data_dir()?;
            let policy = cfg.attachment_policy().clone();
            let files = FilesService::new(cfg.data_dir())?;
            let storage = LocalAttachmentStorage::new(files, policy.clone());
            let client = ConsultationClient::new(
                FsConsultationStore::new(cfg),
                storage,
                session,
                policy.clone(),
            );
            execute(&client, &policy, command).await
        }
        None => {
            tracing::debug!("using consultation API at {}", cli.api_url);
            let policy = AttachmentPolicy::default();
            let http = HttpCollaborator::new(&cli.api_url, session.clone())?;
            let client = ConsultationClient::new(http.clone(), http, session, policy.clone());
            execute(&client, &policy, command).await
        }
    }
}

async fn execute<S, A, C>(
    client: &ConsultationClient<S, A, C>,
    policy: &AttachmentPolicy,
    command: Commands,
) -> ConsultResult<()>
where
    S: ConsultationStore,
    A: AttachmentStorage,
    C: CredentialsProvider,
{
    let today = chrono::Local::now().date_naive();

    match command {
        Commands::Add { patient_id, entry } => {
            let patient_id = UuidService::parse(&patient_id)?;
            let files = entry.read_attachments(policy)?;
            let record = client
                .submit_new(&patient_id, &entry.form(), &entry.scope(), &files, today)
                .await?;
            println!("Created consultation {}", record.id);
        }
        Commands::Edit {
            patient_id,
            id,
            entry,
        } => {
            let patient_id = UuidService::parse(&patient_id)?;
            let id = UuidService::parse(&id)?;
            let files = entry.read_attachments(policy)?;
            let record = client
                .submit_edit(&patient_id, &id, &entry.form(), &entry.scope(), &files, today)
                .await?;
            println!("Updated consultation {}", record.id);
        }
        Commands::List { patient_id } => {
            let patient_id = UuidService::parse(&patient_id)?;
            let views = client.list(&patient_id).await?;
            if views.is_empty() {
                println!("No consultations found.");
            }
            for view in &views {
                for line in render::consultation_lines(view) {
                    println!("{}", line);
                }
                println!();
            }
        }
        Commands::Delete { patient_id, id } => {
            let patient_id = UuidService::parse(&patient_id)?;
            let id = UuidService::parse(&id)?;
            client.delete(&patient_id, &id).await?;
            println!("Deleted consultation {}", id);
        }
        Commands::Review {
            patient_id,
            id,
            field,
        } => {
            let patient_id = UuidService::parse(&patient_id)?;
            let id = UuidService::parse(&id)?;
            let record = client.find(&patient_id, &id).await?;
            let state = client.mark_reviewed(&record, &field).await?;
            println!("{}: {}", field.to_lowercase(), render::review_label(state));
        }
        Commands::Upload { files } => {
            let files = files
                .iter()
                .map(|path| entry::read_upload(path))
                .collect::<ConsultResult<Vec<_>>>()?;
            for attachment in client.upload_batch(&files).await? {
                println!(
                    "{} -> {} ({})",
                    attachment.original_name, attachment.stored_name, attachment.download_url
                );
            }
        }
        Commands::Download { stored_name, out } => {
            let stored_name = StoredName::parse(&stored_name)?;
            let (bytes, content_type) = client.download(&stored_name).await?;
            let out = out.unwrap_or_else(|| PathBuf::from(stored_name.to_string()));
            std::fs::write(&out, &bytes)?;
            println!("Saved {} ({}) to {}", stored_name, content_type, out.display());
        }
        Commands::Login { .. } | Commands::Logout | Commands::Normalize { .. } => {}
    }
    Ok(())
}
