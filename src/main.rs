use clap::Parser;
use tracing::info;

use trelay::config::StaticConfig;
use trelay::config::args::{Cli, Command, ConfigAction};
use trelay::errors::TrelayError;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    if let Some(Command::Config {
        action: ConfigAction::Generate,
    }) = cli.command
    {
        println!("{}", StaticConfig::generate_sample_config());
        return Ok(());
    }

    trelay::config::init_config_from_path(&cli.config);
    let config = trelay::config::get_config();

    // guard 必须活到进程结束，否则缓冲中的日志会丢失
    let _log_guard = trelay::system::init_logging(&config.logging)?;
    info!("trelay v{} starting", env!("CARGO_PKG_VERSION"));

    if let Err(e) = trelay::runtime::modes::run_server(&config).await {
        if let Some(err) = e.downcast_ref::<TrelayError>() {
            eprintln!("{}", err.format_colored());
        }
        return Err(e);
    }

    Ok(())
}
