use anyhow::Result;
use clap::{Parser, Subcommand};
use shared::{Catalog, Role};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod admin;
mod api;
mod auth;
mod chat;
mod config;
mod resource;
mod views;

use api::{ApiClient, ProductFilter, Session};
use resource::Resource;

#[derive(Parser)]
#[command(name = "coach")]
#[command(about = "Persian AI coaching assistant, store and admin panel")]
#[command(version)]
struct Cli {
    /// Server URL (overrides config)
    #[arg(long, global = true)]
    server: Option<String>,

    /// Auth token (overrides config)
    #[arg(long, global = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an account
    Register {
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        password: Option<String>,
        #[arg(long)]
        name: Option<String>,
    },
    /// Login to the coaching server
    Login {
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        password: Option<String>,
    },
    /// Logout from the coaching server
    Logout,
    /// Show current login status
    Whoami,
    /// Email a password reset link
    ForgotPassword {
        #[arg(long)]
        email: Option<String>,
    },
    /// Set a new password with the token from the reset email
    ResetPassword {
        token: String,
        #[arg(long)]
        password: Option<String>,
    },
    /// Show or update your profile
    Profile {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        avatar: Option<String>,
    },
    /// Talk to the AI coach
    Chat,
    /// Browse the store
    Store {
        #[arg(long)]
        category: Option<String>,
        /// Product type code (course, ebook, ...)
        #[arg(long = "type")]
        product_type: Option<String>,
        /// Only the first N in-stock products
        #[arg(long)]
        featured: Option<usize>,
        /// One line per product
        #[arg(long)]
        compact: bool,
    },
    /// List available courses
    Courses,
    /// Admin panel
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Usage statistics
    Stats,
    /// Users with their roles
    Users,
    /// Change a user's role
    SetRole {
        user_id: String,
        /// admin or user
        role: Role,
    },
    /// Latest chat messages
    ChatHistory,
    /// Show WordPress integration settings
    Settings,
    /// Update WordPress integration settings
    SetSettings {
        #[arg(long)]
        url: Option<String>,
        #[arg(long)]
        key: Option<String>,
        #[arg(long)]
        secret: Option<String>,
    },
    /// Run a WordPress sync action
    Sync {
        /// test_connection, test_products_connection, sync_woocommerce_products, ...
        action: String,
        /// JSON payload for the action
        #[arg(long)]
        data: Option<String>,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Set a configuration value
    Set {
        /// Configuration key (server, token, follow_up_url)
        key: String,
        /// Configuration value
        value: String,
    },
    /// Get a configuration value
    Get {
        /// Configuration key
        key: String,
    },
    /// Show all configuration
    Show,
    /// Get the config file path
    Path,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "coach=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let mut config = config::Config::load().unwrap_or_default();
    let server = cli.server.unwrap_or_else(|| config.server());
    let session = match cli.token.or_else(|| config.remote.token.clone()) {
        Some(token) => Session::with_token(token),
        None => Session::anonymous(),
    };
    let api = ApiClient::new(&server, session);

    match cli.command {
        Commands::Register { email, password, name } => {
            auth::register(&api, &mut config, email, password, name).await?
        }
        Commands::Login { email, password } => auth::login(&api, &mut config, email, password).await?,
        Commands::Logout => auth::logout(&mut config)?,
        Commands::Whoami => auth::whoami(&api, &server).await?,
        Commands::ForgotPassword { email } => auth::forgot_password(&api, email).await?,
        Commands::ResetPassword { token, password } => {
            auth::reset_password(&api, token, password).await?
        }
        Commands::Profile { name, avatar } => auth::profile(&api, name, avatar).await?,
        Commands::Chat => {
            let user_id = auth::current_user_id(&api).await?;
            chat::run(&api, &user_id, &config.coach.follow_up_url).await?;
        }
        Commands::Store {
            category,
            product_type,
            featured,
            compact,
        } => {
            let filter = ProductFilter {
                category,
                product_type,
                featured,
            };
            let products = Resource::load(|| api.products(&filter)).await.into_result()?;
            let catalog = Catalog::new(products);
            let listed: Vec<_> = catalog.all().iter().collect();
            println!("{}", views::products(&listed, compact));
        }
        Commands::Courses => {
            let filter = ProductFilter::default();
            let products = Resource::load(|| api.products(&filter))
                .await
                .into_result()?;
            let catalog = Catalog::new(products);
            println!("{}", views::products(&catalog.courses(), false));
        }
        Commands::Admin { action } => handle_admin_command(&api, action).await?,
        Commands::Config { action } => handle_config_command(&mut config, action)?,
    }

    Ok(())
}

async fn handle_admin_command(api: &ApiClient, action: AdminAction) -> Result<()> {
    if !admin::require_admin(api).await? {
        return Ok(());
    }

    match action {
        AdminAction::Stats => admin::stats(api).await,
        AdminAction::Users => admin::users(api).await,
        AdminAction::SetRole { user_id, role } => admin::set_role(api, &user_id, role).await,
        AdminAction::ChatHistory => admin::chat_history(api).await,
        AdminAction::Settings => admin::settings(api).await,
        AdminAction::SetSettings { url, key, secret } => {
            admin::set_settings(api, url, key, secret).await
        }
        AdminAction::Sync { action, data } => admin::sync(api, &action, data).await,
    }
}

fn handle_config_command(config: &mut config::Config, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Set { key, value } => {
            config.set(&key, value)?;
            config.save()?;
            println!("Configuration saved");
        }
        ConfigAction::Get { key } => {
            println!("{}", config.get(&key)?);
        }
        ConfigAction::Show => {
            for key in config::KEYS {
                println!("{}: {}", key, config.get(key)?);
            }
        }
        ConfigAction::Path => {
            let path = config::Config::config_path()?;
            println!("{}", path.display());
        }
    }
    Ok(())
}
