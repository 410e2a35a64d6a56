mod config;
mod error;
mod models;
mod notify;
mod parser;
mod poller;
mod scrapers;
mod store;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use config::Config;
use notify::{LogNotifier, Notifier, TelegramNotifier};
use parser::Profiles;
use poller::Poller;
use scrapers::types::{self, SearchTerm, CITIES};
use scrapers::HttpFetcher;
use store::{OfferStore, SearchStore, SqliteStore};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "rental-scout", about = "Watches OLX and Otodom for new rental apartments")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll all saved searches until stopped
    Run,
    /// Save a search for a subscriber
    AddSearch {
        /// Subscriber (Telegram chat) id
        #[arg(long)]
        user: i64,
        /// City code, see `cities`
        #[arg(long)]
        city: String,
        /// Price range, e.g. 1000-2500, 1500+, -3000
        #[arg(long)]
        price: Option<String>,
        /// Area range in m², e.g. 30-60
        #[arg(long)]
        area: Option<String>,
        /// Room filters: one, two, three, four
        #[arg(long, num_args = 1..)]
        rooms: Vec<String>,
    },
    /// List saved searches
    Searches {
        #[arg(long)]
        user: Option<i64>,
    },
    /// Delete a saved search
    DeleteSearch { id: i64 },
    /// Dump stored offers as JSON
    Offers,
    /// List supported cities
    Cities,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    match cli.command {
        Commands::Run => run(&config).await,
        Commands::AddSearch {
            user,
            city,
            price,
            area,
            rooms,
        } => {
            let store = SqliteStore::open(&config.database_path)?;
            add_search(&store, user, city, price, area, rooms)
        }
        Commands::Searches { user } => {
            let store = SqliteStore::open(&config.database_path)?;
            let searches = match user {
                Some(user) => store.searches_for_user(user)?,
                None => store.list_searches()?,
            };
            for search in &searches {
                let summary = types::describe_short(&search.url).unwrap_or_else(|_| search.url.clone());
                println!("{:>4}  user {:<12} {}", search.id, search.user_id, summary);
            }
            Ok(())
        }
        Commands::DeleteSearch { id } => {
            let store = SqliteStore::open(&config.database_path)?;
            if !store.delete_search(id)? {
                bail!("No search with id {id}");
            }
            println!("Deleted search {id}");
            Ok(())
        }
        Commands::Offers => {
            let store = SqliteStore::open(&config.database_path)?;
            let offers: Vec<serde_json::Value> = store
                .list_offers()?
                .into_iter()
                .map(|(offer, user_id)| serde_json::json!({ "user_id": user_id, "offer": offer }))
                .collect();
            println!("{}", serde_json::to_string_pretty(&offers)?);
            Ok(())
        }
        Commands::Cities => {
            for city in CITIES {
                println!("{:<10} {}", city.code, city.name);
            }
            Ok(())
        }
    }
}

async fn run(config: &Config) -> Result<()> {
    info!("🏠 Rental Scout");
    info!("Database: {}", config.database_path.display());

    let store = SqliteStore::open(&config.database_path)?;
    let fetcher = HttpFetcher::new(config.fetch_timeout)?;
    let notifier: Box<dyn Notifier> = match &config.telegram_token {
        Some(token) => Box::new(TelegramNotifier::new(token.clone(), config.fetch_timeout)?),
        None => {
            warn!("TELEGRAM_BOT_TOKEN not set, offers will only be logged");
            Box::new(LogNotifier)
        }
    };
    let profiles = match config.clock_offset_hours {
        Some(hours) => Profiles::with_clock_offset(hours),
        None => Profiles::default(),
    };

    Poller::new(fetcher, store, notifier, profiles)
        .with_interval(config.poll_interval)
        .with_notify_delay(config.notify_delay)
        .run()
        .await;
    Ok(())
}

fn add_search(
    store: &SqliteStore,
    user: i64,
    city: String,
    price: Option<String>,
    area: Option<String>,
    rooms: Vec<String>,
) -> Result<()> {
    if types::find_city(&city).is_none() {
        let codes: Vec<&str> = CITIES.iter().map(|c| c.code).collect();
        bail!("Unknown city {city:?}, expected one of: {}", codes.join(", "));
    }

    let (price_min, price_max) = price
        .as_deref()
        .map(types::parse_price_range)
        .transpose()
        .context("Invalid --price")?
        .unwrap_or_default();
    let (area_min, area_max) = area
        .as_deref()
        .map(types::parse_price_range)
        .transpose()
        .context("Invalid --area")?
        .unwrap_or_default();

    let term = SearchTerm {
        city,
        price_min,
        price_max,
        area_min,
        area_max,
        rooms,
    };
    let url = term.create_url()?;
    let id = store.add_search(user, &url)?;

    println!("Saved search {id}");
    println!("{}", types::describe_full(&url)?);
    Ok(())
}
