mod app;
mod commands;

use std::path::PathBuf;

use clap::Parser;
use staydesk_core::config::API_URL_ENV;
use staydesk_core::Resource;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use app::App;
use commands::{parse_pair, ListArgs};

#[derive(Parser)]
#[command(name = "staydesk")]
#[command(version, about = "Admin console for a holiday-rental backend", long_about = None)]
struct Cli {
    /// Backend origin including the API prefix
    #[arg(long, global = true, env = API_URL_ENV)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Sign in and store the session cookie
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "STAYDESK_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Forget the stored session
    Logout,
    /// Show what the route gate does with a path
    Gate {
        path: String,
    },
    /// List records of a resource
    List {
        resource: Resource,
        #[arg(long, default_value_t = 1)]
        page: u32,
        /// Rows per page (defaults to ui.page_size)
        #[arg(long)]
        limit: Option<u32>,
        #[arg(long)]
        search: Option<String>,
        /// Extra filter, e.g. --filter status=pending
        #[arg(long = "filter", value_parser = parse_pair)]
        filters: Vec<(String, String)>,
    },
    /// Show a single record
    Show {
        resource: Resource,
        id: String,
    },
    /// Delete a record
    Delete {
        resource: Resource,
        id: String,
    },
    /// Set a booking's status (pending, confirmed, cancelled, completed)
    BookingStatus {
        id: String,
        status: String,
    },
    /// Set an enquiry's status (pending, responded, closed)
    EnquiryStatus {
        id: String,
        status: String,
    },
    /// Set a review's status (pending, approved, rejected)
    ReviewStatus {
        id: String,
        status: String,
    },
    /// Create a property from form fields and image files
    CreateProperty {
        /// Form field, e.g. --field title="Cliff House"
        #[arg(long = "field", value_parser = parse_pair)]
        fields: Vec<(String, String)>,
        #[arg(long = "image")]
        images: Vec<PathBuf>,
    },
    /// Show or change the selected plan
    Plan {
        #[command(subcommand)]
        action: Option<PlanAction>,
    },
    /// Show the effective config, or write a starter file
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

#[derive(clap::Subcommand)]
enum PlanAction {
    /// Remember a plan across runs
    Select { name: String },
}

#[derive(clap::Subcommand)]
enum ConfigAction {
    /// Write the default config file
    Init {
        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "staydesk=info,staydesk_core=info,staydesk_api=info,staydesk_cache=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let app = App::init(cli.api_url)?;
    tracing::debug!("Using backend {}", app.config.api.base_url);

    match cli.command {
        Commands::Login { email, password } => commands::login(&app, email, password).await,
        Commands::Logout => commands::logout(&app),
        Commands::Gate { path } => {
            commands::check_gate(&app, &path);
            Ok(())
        }
        Commands::List {
            resource,
            page,
            limit,
            search,
            filters,
        } => {
            let args = ListArgs {
                resource,
                page,
                limit,
                search,
                filters,
            };
            commands::list(&app, args).await
        }
        Commands::Show { resource, id } => commands::show(&app, resource, &id).await,
        Commands::Delete { resource, id } => commands::delete(&app, resource, &id).await,
        Commands::BookingStatus { id, status } => {
            commands::booking_status(&app, &id, &status).await
        }
        Commands::EnquiryStatus { id, status } => {
            commands::enquiry_status(&app, &id, &status).await
        }
        Commands::ReviewStatus { id, status } => commands::review_status(&app, &id, &status).await,
        Commands::CreateProperty { fields, images } => {
            commands::create_property(&app, fields, images).await
        }
        Commands::Plan { action } => {
            let select = action.map(|PlanAction::Select { name }| name);
            commands::plan(&app, select).await
        }
        Commands::Config { action: None } => commands::show_config(&app),
        Commands::Config {
            action: Some(ConfigAction::Init { force }),
        } => commands::init_config(force),
    }
}
