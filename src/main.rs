use clap::Parser;
use seatwatch::app::{App, load_config};
use seatwatch::cli::Args;
use seatwatch::logging::setup_logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let args = Args::parse();

    let config = load_config()?;
    setup_logging(&config, args.tracing);

    let app = App::new(config).await?;
    app.run().await
}
