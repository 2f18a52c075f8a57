use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use toplytics::clock::Clock;
use toplytics::config::Config;
use toplytics::profile::ProfileStore;
use toplytics::storage;
use toplytics::AppContext;

#[derive(Parser)]
#[command(name = "toplytics-admin")]
#[command(about = "Toplytics configuration CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List every view (profile) the access token can read
    Views,
    /// Select the view rankings are computed from
    Select {
        /// View id as printed by `views`
        view_id: String,
    },
    /// Show the selected view
    Show,
    /// Remove the stored access token and the selected view
    Clear,
    /// Store an already-authorized access token
    SetToken { token: String },
    /// Refresh rankings now, ignoring the cache TTL
    Refresh,
    /// Print the ranking for one window
    Top {
        /// today, week, 2weeks or month
        window: String,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration
    let config = Config::from_env()?;

    // Local commands only need storage; the rest talk to the API
    match cli.command {
        Commands::Show => {
            let profiles = ProfileStore::new(storage::connect(&config.database).await?);
            match profiles.selected().await? {
                Some(profile) => {
                    println!("Selected view: {}", profile.view.view_id);
                    println!("  {}", profile.info);
                    println!("  selected at {}", profile.selected_at);
                }
                None => println!("No view selected."),
            }
        }
        Commands::Clear => {
            let profiles = ProfileStore::new(storage::connect(&config.database).await?);
            profiles.remove_credentials().await?;
            println!("✓ Removed stored access token and view selection");
        }
        Commands::SetToken { token } => {
            if token.trim().is_empty() {
                bail!("token must not be empty");
            }
            let profiles = ProfileStore::new(storage::connect(&config.database).await?);
            profiles.save_access_token(token.trim()).await?;
            println!("✓ Stored access token");
        }
        Commands::Views => {
            let context = AppContext::from_config(&config).await?;
            let views = context.resolver().list_views().await?;
            println!("{:<15} {}", "View ID", "Account > Property (Tracking ID) > View");
            println!("{}", "-".repeat(80));
            for view in views {
                println!("{:<15} {}", view.view_id, view.label());
            }
        }
        Commands::Select { view_id } => {
            let context = AppContext::from_config(&config).await?;
            let views = context.resolver().list_views().await?;

            // Only views readable with the current token can be selected
            let view = views
                .into_iter()
                .find(|v| v.view_id == view_id)
                .with_context(|| format!("view '{view_id}' is not readable with this token"))?;

            let selected = context.profiles().select(&view, context.clock().now()).await?;
            println!("✓ Selected view '{}': {}", view_id, selected.info);
        }
        Commands::Refresh => {
            let context = AppContext::from_config(&config).await?;
            let result = context.cache().refresh_now().await?;
            println!(
                "✓ Refreshed view '{}' at {}",
                result.view_id, result.computed_at
            );
            for (window, entries) in &result.rankings {
                println!("  {:<8} {} entries", window.as_str(), entries.len());
            }
        }
        Commands::Top { window, limit } => {
            let context = AppContext::from_config(&config).await?;
            let entries = context.cache().get_ranking(&window).await?;
            if entries.is_empty() {
                println!("No page views recorded for '{}'.", window);
            } else {
                println!("{:<8} {}", "Views", "Path");
                println!("{}", "-".repeat(60));
                for entry in entries.iter().take(limit) {
                    println!("{:<8} {}", entry.views, entry.path);
                }
            }
        }
    }

    Ok(())
}
