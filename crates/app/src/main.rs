use std::sync::Arc;

use chrono::{Local, NaiveDate, NaiveTime};
use clap::{Parser, Subcommand, ValueEnum};
use sportnexus_config::{Backend, Config};
use sportnexus_db::{seed, FallbackStore, NotificationBus, SqliteStore, Store};
use sportnexus_marketplace::{Marketplace, Session};
use sportnexus_models::{
    BookingRequest, Difficulty, EquipmentFilter, RentalRequest, TutorialFilter, VenueFilter,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::OffsetTime;
use uuid::Uuid;

mod auth;
mod error;
mod server;

use auth::JwtKeys;
use server::AppState;

const VERSION: &str = env!("CARGO_PKG_VERSION");
const GIT_HASH: &str = env!("SPORTNEXUS_GIT_HASH");

fn version_string() -> String {
    format!("{VERSION} ({GIT_HASH})")
}

// --- CLI definition ---

#[derive(Debug, Clone, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

#[derive(Parser)]
#[command(name = "sportnexus")]
#[command(about = "Sports venue, equipment and tutorial marketplace")]
#[command(version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("SPORTNEXUS_GIT_HASH"), ")"))]
struct Cli {
    /// Log level (default from config: info)
    #[arg(short, long, global = true)]
    log_level: Option<LogLevel>,

    /// Display log timestamps in UTC (default: local time)
    #[arg(long, global = true)]
    utc: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    /// Database URL
    #[arg(long, global = true)]
    db_url: Option<String>,

    /// Storage backend: sqlite or memory
    #[arg(long, global = true)]
    backend: Option<Backend>,

    /// Acting user for commands that change data
    #[arg(long, global = true)]
    user: Option<Uuid>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Load the demo catalogue into the database
    Seed,
    /// Print a bearer token for --user
    Token {
        /// Token lifetime in hours
        #[arg(long, default_value = "24")]
        hours: i64,
    },
    /// List venues
    ListVenues {
        #[arg(long)]
        sport: Option<String>,
        #[arg(long)]
        search: Option<String>,
    },
    /// List rentable equipment
    ListEquipment {
        #[arg(long)]
        category: Option<String>,
        /// Only items with units available
        #[arg(long)]
        in_stock: bool,
    },
    /// List tutorials
    ListTutorials {
        #[arg(long)]
        sport: Option<String>,
        #[arg(long)]
        difficulty: Option<Difficulty>,
    },
    /// Book a venue slot
    Book {
        #[arg(long)]
        venue: Uuid,
        /// Date (YYYY-MM-DD)
        #[arg(long)]
        date: NaiveDate,
        /// Start time (HH:MM)
        #[arg(long)]
        start: NaiveTime,
        /// End time (HH:MM)
        #[arg(long)]
        end: NaiveTime,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Cancel one of your bookings
    CancelBooking {
        id: Uuid,
    },
    /// List your bookings
    ListBookings,
    /// Rent equipment
    Rent {
        #[arg(long)]
        equipment: Uuid,
        /// First day (YYYY-MM-DD)
        #[arg(long)]
        start: NaiveDate,
        /// Last day, inclusive (YYYY-MM-DD)
        #[arg(long)]
        end: NaiveDate,
        #[arg(long, default_value = "1")]
        quantity: i64,
        #[arg(long)]
        notes: Option<String>,
    },
    /// List your rentals
    ListRentals,
}

// --- Logging ---

fn init_logging(config: &Config, json: bool) {
    let filter = EnvFilter::new(&config.log_level);

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else if config.utc {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_timer(OffsetTime::new(
                time::UtcOffset::UTC,
                time::macros::format_description!(
                    "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z"
                ),
            ))
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_timer(LocalTimer)
            .init();
    }
}

struct LocalTimer;

impl tracing_subscriber::fmt::time::FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        let now = Local::now();
        write!(w, "{}", now.format("%Y-%m-%dT%H:%M:%S%.3f%:z"))
    }
}

// --- Storage ---

async fn open_store(config: &Config, bus: &NotificationBus) -> anyhow::Result<Arc<dyn Store>> {
    let primary: Arc<dyn Store> = match config.backend {
        Backend::Sqlite => {
            let pool = sportnexus_db::connect(&config.db_url).await?;
            sportnexus_db::migrate(&pool).await?;
            Arc::new(SqliteStore::new(pool, bus.clone()))
        }
        Backend::Memory => {
            info!("Using the in-memory store, preloaded with the demo catalogue");
            Arc::new(seed::demo_store(bus.clone()).await?)
        }
    };

    if config.demo_fallback && config.backend == Backend::Sqlite {
        info!("Demo fallback enabled for reads");
        let demo = seed::demo_store(NotificationBus::new()).await?;
        return Ok(Arc::new(FallbackStore::new(primary, Arc::new(demo))));
    }
    Ok(primary)
}

fn session(user: Option<Uuid>) -> Session {
    user.map(Session::user).unwrap_or_default()
}

// --- Main ---

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load();
    if let Some(level) = &cli.log_level { config.log_level = level.to_string(); }
    if cli.utc { config.utc = true; }
    if let Some(url) = &cli.db_url { config.db_url = url.clone(); }
    if let Some(backend) = cli.backend { config.backend = backend; }
    if let Commands::Serve { port: Some(port) } = &cli.command { config.port = *port; }

    init_logging(&config, cli.log_json);

    let bus = NotificationBus::new();
    let session = session(cli.user);

    let store = open_store(&config, &bus).await?;
    let market = Marketplace::new(Arc::clone(&store), bus);

    match cli.command {
        Commands::Serve { .. } => {
            if config.auth_secret == Config::defaults().auth_secret {
                warn!("Using the built-in development auth secret; set SPORTNEXUS_AUTH_SECRET in production");
            }
            let state = AppState { market, keys: Arc::new(JwtKeys::new(&config.auth_secret)) };
            server::run_server(config.port, state).await?;
        }
        Commands::Token { hours } => {
            let user = session.require()?;
            let keys = JwtKeys::new(&config.auth_secret);
            println!("{}", keys.issue(user, chrono::Duration::hours(hours))?);
        }
        Commands::Seed => {
            let summary = seed::load_demo(&*store).await?;
            println!(
                "Seeded {} venues, {} equipment items, {} tutorials ({} lessons)",
                summary.venues, summary.equipment, summary.tutorials, summary.lessons
            );
        }
        Commands::ListVenues { sport, search } => {
            let venues = market.list_venues(&VenueFilter { sport, search, max_hourly_price: None }).await?;
            if venues.is_empty() {
                println!("No venues found. Use `sportnexus seed` to load demo data.");
            } else {
                println!("{:<38} {:<30} {:<12} {:<15} {:>8}", "ID", "Name", "Sport", "Location", "Hourly");
                println!("{}", "-".repeat(107));
                for v in &venues {
                    println!("{:<38} {:<30} {:<12} {:<15} {:>8.2}", v.id, v.name, v.sport, v.location, v.hourly_price);
                }
                println!("\n{} venue(s) total", venues.len());
            }
        }
        Commands::ListEquipment { category, in_stock } => {
            let filter = EquipmentFilter { category, search: None, max_daily_price: None, in_stock_only: in_stock };
            let items = market.list_equipment(&filter).await?;
            if items.is_empty() {
                println!("No equipment found.");
            } else {
                println!("{:<38} {:<25} {:<10} {:>7} {:>7} {:>9}", "ID", "Name", "Category", "Daily", "Weekly", "Available");
                println!("{}", "-".repeat(101));
                for e in &items {
                    println!(
                        "{:<38} {:<25} {:<10} {:>7.2} {:>7.2} {:>5}/{:<3}",
                        e.id, e.name, e.category, e.daily_price, e.weekly_price, e.available_quantity, e.total_quantity
                    );
                }
                println!("\n{} item(s) total", items.len());
            }
        }
        Commands::ListTutorials { sport, difficulty } => {
            let tutorials = market.list_tutorials(&TutorialFilter { sport, difficulty, search: None }).await?;
            if tutorials.is_empty() {
                println!("No tutorials found.");
            } else {
                println!("{:<38} {:<30} {:<12} {:<13} {}", "ID", "Title", "Sport", "Difficulty", "Lessons");
                println!("{}", "-".repeat(102));
                for t in &tutorials {
                    let lessons = market.list_lessons(t.id).await?;
                    println!("{:<38} {:<30} {:<12} {:<13} {}", t.id, t.title, t.sport, t.difficulty, lessons.len());
                }
                println!("\n{} tutorial(s) total", tutorials.len());
            }
        }
        Commands::Book { venue, date, start, end, notes } => {
            let request = BookingRequest { venue_id: venue, booking_date: date, start_time: start, end_time: end, notes };
            let booking = market.check_and_create_booking(&session, request).await?;
            println!(
                "Booked {} {}-{} (id={}) for {:.2}, status {}",
                booking.booking_date, booking.start_time, booking.end_time, booking.id, booking.total_price, booking.status
            );
        }
        Commands::CancelBooking { id } => {
            let booking = market.cancel_booking(&session, id).await?;
            println!("Booking {} is now {}", booking.id, booking.status);
        }
        Commands::ListBookings => {
            let bookings = market.list_my_bookings(&session).await?;
            if bookings.is_empty() {
                println!("No bookings.");
            } else {
                println!("{:<38} {:<25} {:<12} {:<13} {:>8} {:<10} {}", "ID", "Venue", "Date", "Time", "Price", "Status", "Payment");
                println!("{}", "-".repeat(120));
                for b in &bookings {
                    let slot = format!("{}-{}", b.booking.start_time.format("%H:%M"), b.booking.end_time.format("%H:%M"));
                    println!(
                        "{:<38} {:<25} {:<12} {:<13} {:>8.2} {:<10} {}",
                        b.booking.id, b.venue_name, b.booking.booking_date, slot, b.booking.total_price,
                        b.booking.status, b.booking.payment_status
                    );
                }
                println!("\n{} booking(s) total", bookings.len());
            }
        }
        Commands::Rent { equipment, start, end, quantity, notes } => {
            let request = RentalRequest {
                equipment_id: equipment,
                start_date: start,
                end_date: end,
                quantity,
                notes,
                quoted_price: None,
            };
            let rental = market.check_and_create_rental(&session, request).await?;
            println!(
                "Rented {} unit(s) {}..{} (id={}) for {:.2}, status {}",
                rental.quantity, rental.start_date, rental.end_date, rental.id, rental.total_price, rental.status
            );
        }
        Commands::ListRentals => {
            let rentals = market.list_my_rentals(&session).await?;
            if rentals.is_empty() {
                println!("No rentals.");
            } else {
                println!("{:<38} {:<25} {:<12} {:<12} {:>4} {:>8} {}", "ID", "Equipment", "From", "To", "Qty", "Price", "Status");
                println!("{}", "-".repeat(115));
                for r in &rentals {
                    println!(
                        "{:<38} {:<25} {:<12} {:<12} {:>4} {:>8.2} {}",
                        r.rental.id, r.equipment_name, r.rental.start_date, r.rental.end_date, r.rental.quantity,
                        r.rental.total_price, r.rental.status
                    );
                }
                println!("\n{} rental(s) total", rentals.len());
            }
        }
    }

    Ok(())
}
