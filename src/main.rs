use campus_vote::{Config, Database};
use log::{error, info, warn};

// Provisions the election store: creates the database file and schema if
// they are missing, reports what is on record, and exits.
#[tokio::main]
async fn main() {
    // Initialize logging
    dotenvy::dotenv().ok();
    env_logger::init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    let database = match Database::new(&config).await {
        Ok(db) => db,
        Err(e) => {
            error!("Failed to initialize database: {}", e);
            std::process::exit(1);
        }
    };

    match database.list_open_measures().await {
        Ok(open) if open.is_empty() => info!("No open measures."),
        Ok(open) => {
            info!("{} open measure(s):", open.len());
            for measure in open {
                info!("  {} ({} to {})", measure, measure.vote_start, measure.vote_end);
            }
        }
        Err(e) => warn!("Could not list open measures: {}", e),
    }

    database.close().await;
}
