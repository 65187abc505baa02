use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use routeforge::{config::RouteConfig, router::Router};

#[derive(Parser, Debug)]
#[command(name = "routeforge")]
#[command(about = "Declarative route compiler for nginx-compatible reverse proxies")]
#[command(version)]
struct Args {
    /// Path to the route document
    #[arg(short, long, default_value = "routes.yaml")]
    config: PathBuf,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Validate the route document and exit
    #[arg(long)]
    validate: bool,

    /// Write generated routes to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing; logs go to stderr so stdout stays valid JSON.
    let filter = if args.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Loading route document from {:?}", args.config);

    let config = RouteConfig::load(&args.config)?;

    if args.validate {
        info!("Route document is valid");
        return Ok(());
    }

    let router = Router::from_config(&config)?;
    let json = router.to_json()?;

    match args.output {
        Some(path) => {
            std::fs::write(&path, &json)
                .with_context(|| format!("Failed to write generated routes to {:?}", path))?;
            info!("Wrote {} routes to {:?}", router.routes().len(), path);
        }
        None => println!("{}", json),
    }

    Ok(())
}
