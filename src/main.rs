mod routes;
mod server;
mod singleton;
mod state;

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use crate::state::AppState;

/// Default SharePoint site hosting the calendar list.
const DEFAULT_SITE_URL: &str = "https://example.sharepoint.com/sites/Team";

/// Default list to read calendar events from.
const DEFAULT_LIST_NAME: &str = "TeamCalendar";

#[derive(Parser)]
#[command(name = "dashpad")]
#[command(about = "Serve the dashpad dashboard locally and open it in your browser")]
struct Cli {
    /// Directory containing the static dashboard files
    #[arg(long, default_value = "web")]
    dir: PathBuf,

    /// First port to try; the next 99 are scanned if it's taken
    #[arg(long, default_value_t = 8000)]
    port: u16,

    /// SharePoint site URL (the dashboard can override this per request)
    #[arg(long, default_value = DEFAULT_SITE_URL)]
    site_url: String,

    /// SharePoint list to read calendar events from
    #[arg(long, default_value = DEFAULT_LIST_NAME)]
    list_name: String,

    /// Don't open the browser after startup
    #[arg(long)]
    no_open: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Ensure only one instance is running
    let mut lock = singleton::acquire_lock()?;

    // Fatal before any port is bound
    server::check_assets(&cli.dir)?;

    let state = AppState::new(cli.site_url, cli.list_name);
    let app = server::build_router(&cli.dir, state);

    let (listener, port) = server::find_free_port(cli.port).await?;
    lock.record_port(port)?;
    let url = format!("http://127.0.0.1:{port}");
    println!("dashpad serving {} on {url}", cli.dir.display());

    // Serve on a background task so startup finishes (and the browser opens)
    // without waiting on the accept loop.
    let serve = tokio::spawn(async move { axum::serve(listener, app).await });

    if !cli.no_open {
        if let Err(e) = open::that(&url) {
            eprintln!("Could not open browser automatically: {e}");
            eprintln!("Please visit: {url}");
        }
    }

    serve.await??;

    Ok(())
}
