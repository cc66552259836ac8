use clap::Parser;
use treeannotator::cli::{Cli, init_logging};
use treeannotator::error::Result;
use treeannotator::pipeline::{AnnotatorConfig, TreeAnnotator};

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_level());

    let config = AnnotatorConfig::try_from(cli)?;
    TreeAnnotator::new(config)?.run()?;
    Ok(())
}
