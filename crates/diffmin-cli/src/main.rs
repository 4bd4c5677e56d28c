use anyhow::Context;
use clap::error::ErrorKind;
use clap::Parser;
use diffmin_core::config::Settings;
use diffmin_core::logging::init_logging;
use std::path::PathBuf;
use std::process::ExitCode;

const USAGE: &str = "Usage: diffmin <prev_file> <new_file>";

#[derive(Parser)]
#[command(
    name = "diffmin",
    version,
    about = "Rebuild a Java file's newer version by patching the older syntax tree"
)]
struct Cli {
    /// The previous version of the file
    prev: PathBuf,

    /// The new version of the file
    new: PathBuf,

    /// JSON settings file
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = e.print();
            return ExitCode::SUCCESS;
        }
        Err(_) => {
            eprintln!("{USAGE}");
            return ExitCode::from(1);
        }
    };

    match run(&cli) {
        Ok(text) => {
            print!("{text}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e:?}");
            ExitCode::from(2)
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<String> {
    let settings = match &cli.config {
        Some(path) => Settings::load(path)
            .with_context(|| format!("loading settings from {}", path.display()))?,
        None => Settings::default(),
    };
    let _guard = init_logging(&settings.logging)?;

    tracing::info!(prev = %cli.prev.display(), new = %cli.new.display(), "patching");
    let text = diffmin_core::patch_and_render(&cli.prev, &cli.new, &settings)?;
    Ok(text)
}
