use clap::Parser;
use scout_import::cli::Cli;
use tracing_subscriber::{fmt, EnvFilter};

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let builder = fmt().with_env_filter(filter).with_writer(std::io::stderr);
    if cli.log_json {
        builder.json().init();
    } else {
        builder.init();
    }

    if let Err(err) = cli.run() {
        tracing::error!(error = %format!("{err:#}"), "scout-import failed");
        std::process::exit(1);
    }
}
