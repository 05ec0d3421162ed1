use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use plantcare::config::{ConfigError, normalize_base_url};
use plantcare::net::types::{NewCareEvent, NewPlant, NewSpecies};
use plantcare::{ApiError, ClientConfig, PlantApi, SessionController, SessionError, SessionState, routes};
use serde::Serialize;
use serde_json::{Value, json};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("not logged in; run `plantcare-cli login` or set PLANTCARE_FALLBACK_ACCOUNTS")]
    NotAuthenticated,
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("request failed: {0}")]
    Api(#[from] ApiError),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "plantcare-cli", about = "Plant-care tracker client")]
struct Cli {
    #[arg(long, env = "PLANTCARE_BASE_URL")]
    base_url: Option<String>,

    #[arg(long, env = "PLANTCARE_CREDENTIAL_PATH")]
    credential_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Recover the stored session and print its state.
    Status,
    Login(LoginArgs),
    Register {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    Logout,
    /// Print the view and redirect the route guard picks for `path`.
    Route {
        path: String,
    },
    Dashboard,
    Plants(PlantsCommand),
    Species(SpeciesCommand),
    Care(CareCommand),
}

#[derive(Args, Debug)]
struct LoginArgs {
    #[arg(long, required_unless_present = "fallback")]
    username: Option<String>,
    #[arg(long, required_unless_present = "fallback")]
    password: Option<String>,
    /// Try PLANTCARE_FALLBACK_ACCOUNTS in order instead.
    #[arg(long, conflicts_with_all = ["username", "password"])]
    fallback: bool,
}

#[derive(Args, Debug)]
struct PlantsCommand {
    #[command(subcommand)]
    command: PlantsSubcommand,
}

#[derive(Subcommand, Debug)]
enum PlantsSubcommand {
    List,
    Add {
        #[arg(long)]
        nickname: String,
        #[arg(long)]
        species_id: i64,
    },
    Delete {
        plant_id: i64,
    },
}

#[derive(Args, Debug)]
struct SpeciesCommand {
    #[command(subcommand)]
    command: SpeciesSubcommand,
}

#[derive(Subcommand, Debug)]
enum SpeciesSubcommand {
    List,
    Add {
        #[arg(long)]
        common_name: String,
        #[arg(long)]
        scientific_name: String,
        #[arg(long)]
        watering_frequency: String,
    },
}

#[derive(Args, Debug)]
struct CareCommand {
    #[command(subcommand)]
    command: CareSubcommand,
}

#[derive(Subcommand, Debug)]
enum CareSubcommand {
    Add {
        plant_id: i64,
        #[arg(long)]
        event_type: String,
        /// `YYYY-MM-DD`
        #[arg(long)]
        date: String,
        #[arg(long)]
        notes: Option<String>,
    },
}

struct CliContext {
    config: ClientConfig,
    session: Arc<SessionController>,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = resolve_config(&cli)?;
    let session = Arc::new(SessionController::from_config(&config)?);
    let ctx = CliContext { config, session };

    let state = ctx.session.initialize().await;
    tracing::debug!(?state, "session initialized");

    match cli.command {
        Command::Status => print_json(&state_json(&ctx.session.state())),
        Command::Login(args) => run_login(&ctx, args).await,
        Command::Register { username, email, password } => {
            let user = ctx.session.register(&username, &email, &password).await?;
            print_serialized(&user)
        }
        Command::Logout => {
            ctx.session.logout().await;
            print_json(&state_json(&ctx.session.state()))
        }
        Command::Route { path } => {
            let decision = routes::guard(&ctx.session.state(), &path);
            print_json(&json!({
                "render": format!("{:?}", decision.render),
                "redirect_to": decision.redirect_to,
            }))
        }
        Command::Dashboard => {
            let api = authorized_api(&ctx).await?;
            print_serialized(&api.dashboard().await?)
        }
        Command::Plants(plants) => run_plants(&ctx, plants).await,
        Command::Species(species) => run_species(&ctx, species).await,
        Command::Care(care) => run_care(&ctx, care).await,
    }
}

fn resolve_config(cli: &Cli) -> Result<ClientConfig, CliError> {
    let mut config = ClientConfig::from_env()?;
    if let Some(base_url) = &cli.base_url {
        config.base_url = normalize_base_url(base_url)?;
    }
    if let Some(path) = &cli.credential_path {
        config.credential_path.clone_from(path);
    }
    Ok(config)
}

async fn run_login(ctx: &CliContext, args: LoginArgs) -> Result<(), CliError> {
    let user = match (args.fallback, args.username, args.password) {
        (false, Some(username), Some(password)) => ctx.session.login(&username, &password).await?,
        _ => ctx.session.login_with_fallback(&ctx.config.fallback_accounts).await?,
    };
    print_serialized(&user)
}

/// API handle for a command that needs a logged-in session.
///
/// Falls back to the configured accounts when the stored session did not
/// survive `initialize()`.
async fn authorized_api(ctx: &CliContext) -> Result<PlantApi, CliError> {
    if !ctx.session.state().is_authenticated() {
        if ctx.config.fallback_accounts.is_empty() {
            return Err(CliError::NotAuthenticated);
        }
        let user = ctx.session.login_with_fallback(&ctx.config.fallback_accounts).await?;
        tracing::info!(username = %user.username, "logged in with fallback account");
    }
    Ok(PlantApi::new(ctx.session.clone()))
}

async fn run_plants(ctx: &CliContext, plants: PlantsCommand) -> Result<(), CliError> {
    let api = authorized_api(ctx).await?;
    match plants.command {
        PlantsSubcommand::List => print_serialized(&api.plants().await?),
        PlantsSubcommand::Add { nickname, species_id } => {
            let plant = api.create_plant(&NewPlant { nickname, species_id }).await?;
            print_serialized(&plant)
        }
        PlantsSubcommand::Delete { plant_id } => {
            api.delete_plant(plant_id).await?;
            print_json(&json!({ "deleted": plant_id }))
        }
    }
}

async fn run_species(ctx: &CliContext, species: SpeciesCommand) -> Result<(), CliError> {
    let api = authorized_api(ctx).await?;
    match species.command {
        SpeciesSubcommand::List => print_serialized(&api.species().await?),
        SpeciesSubcommand::Add { common_name, scientific_name, watering_frequency } => {
            let created = api
                .create_species(&NewSpecies { common_name, scientific_name, watering_frequency })
                .await?;
            print_serialized(&created)
        }
    }
}

async fn run_care(ctx: &CliContext, care: CareCommand) -> Result<(), CliError> {
    let api = authorized_api(ctx).await?;
    match care.command {
        CareSubcommand::Add { plant_id, event_type, date, notes } => {
            let event = api
                .add_care_event(plant_id, &NewCareEvent { event_type, notes, event_date: date })
                .await?;
            print_serialized(&event)
        }
    }
}

fn state_json(state: &SessionState) -> Value {
    match state {
        SessionState::Unknown => json!({ "state": "unknown" }),
        SessionState::Checking => json!({ "state": "checking" }),
        SessionState::Authenticated { user } => json!({ "state": "authenticated", "user": user }),
        SessionState::Unauthenticated => json!({ "state": "unauthenticated" }),
    }
}

fn print_serialized<T: Serialize>(value: &T) -> Result<(), CliError> {
    print_json(&serde_json::to_value(value)?)
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}
