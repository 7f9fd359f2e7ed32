use crate::prelude::*;
use crate::prelude::eprintln;
use clap::Parser;

mod commands;
mod error;
mod prelude;

#[derive(Debug, clap::Parser)]
#[command(
    author,
    version,
    about,
    long_about = "Reconstruct a document's heading outline from its font sizes"
)]
pub struct App {
    #[command(subcommand)]
    pub command: commands::Commands,

    #[clap(flatten)]
    global: Global,
}

#[derive(Debug, Clone, clap::Args)]
pub struct Global {
    /// Largest size difference, in points, between lines of one size class
    #[clap(long, env = "PDF_OUTLINE_EPS", global = true, default_value_t = outline::classify::DEFAULT_EPS)]
    eps: f32,

    /// Lines needed before a font size counts as a heading tier
    #[clap(
        long,
        env = "PDF_OUTLINE_MIN_SAMPLES",
        global = true,
        default_value_t = outline::classify::DEFAULT_MIN_SAMPLES
    )]
    min_samples: usize,

    /// Whether to display additional information.
    #[clap(long, env = "PDF_OUTLINE_VERBOSE", global = true, default_value = "false")]
    verbose: bool,
}

impl Global {
    pub fn params(&self) -> Result<outline::ClusterParams> {
        Ok(outline::ClusterParams::new(self.eps, self.min_samples).map_err(Error::from)?)
    }
}

fn init_logger(verbose: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.init();
}

fn main() {
    let app = App::parse();
    init_logger(app.global.verbose);

    if let Err(err) = color_eyre::install() {
        eprintln!("Error: {err}");
        std::process::exit(error::EXIT_EXTRACTION_FAILED);
    }

    if let Err(report) = commands::run(app.command, app.global) {
        eprintln!("Error: {report}");
        std::process::exit(error::exit_code(&report));
    }
}
