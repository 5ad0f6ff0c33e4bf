mod app;
mod cli;
mod paths;
mod run;

use anyhow::Result;
use cli::{Command, ConfigAction};
use paths::AppPaths;

fn main() -> Result<()> {
    let cli = cli::parse();
    run::initialise_tracing();

    match cli.command {
        Some(Command::Config(config_cmd)) => handle_config_command(&cli.run, config_cmd.action),
        None => run::run(cli.run),
    }
}

fn handle_config_command(args: &cli::RunArgs, action: ConfigAction) -> Result<()> {
    let paths = AppPaths::discover(args.config.as_deref(), args.data_dir.as_deref())?;

    match action {
        ConfigAction::Show => run_config_show(args, &paths),
        ConfigAction::Where => run_config_where(&paths),
    }
}

fn run_config_show(args: &cli::RunArgs, paths: &AppPaths) -> Result<()> {
    let config = run::resolve_config(args, paths)?;
    print!("{}", config.to_toml_string()?);
    Ok(())
}

fn run_config_where(paths: &AppPaths) -> Result<()> {
    println!("Configuration:");
    println!(
        "  file:       {}{}",
        paths.config_file().display(),
        if paths.config_file().is_file() {
            ""
        } else {
            " (missing, using defaults)"
        }
    );
    println!("  config:     {}", paths.config_dir().display());
    println!("  data:       {}", paths.data_dir().display());
    Ok(())
}
