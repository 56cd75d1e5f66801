use clap::Parser;

mod cli;
mod commands;
mod logging;

fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();
    let config = commands::resolve_config(&cli)?;
    logging::init(cli.debug, cli.log.as_deref(), &config.log_level)?;
    commands::run_command(cli.command, config, &mut std::io::stdout().lock())
}
