use std::io::{self, Read};
use std::path::PathBuf;

use anyhow::{Result, anyhow};
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "manhwa-textfx",
    version,
    about = "Render styled comic bubble text to images"
)]
struct Cli {
    /// Read extra settings from a local TOML file
    #[arg(short = 'r', long = "read-settings", global = true)]
    read_settings: Option<String>,

    /// Enable verbose logging
    #[arg(long = "verbose", global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render one style record (TOML or JSON) to an image
    Render {
        /// Style record file; defaults apply when omitted
        #[arg(short = 's', long = "style")]
        style: Option<PathBuf>,

        /// Text to render (overrides the style's text, "-" reads stdin)
        #[arg(short = 't', long = "text")]
        text: Option<String>,

        /// Output image (format from the extension)
        #[arg(short = 'o', long = "out", default_value = "render.png")]
        out: PathBuf,
    },
    /// Render every bubble of a JSON manifest into one image each
    Batch {
        /// JSON array of bubble records, each with an "id"
        #[arg(short = 'i', long = "input")]
        input: PathBuf,

        /// Output directory
        #[arg(short = 'o', long = "out-dir", default_value = manhwa_textfx::DEFAULT_BATCH_DIR)]
        out_dir: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    manhwa_textfx::logging::init(cli.verbose)?;

    let job = match cli.command {
        Command::Render { style, text, out } => {
            let text = match text.as_deref() {
                Some("-") => Some(read_stdin()?),
                _ => text,
            };
            manhwa_textfx::Job::Render { style, text, out }
        }
        Command::Batch { input, out_dir } => manhwa_textfx::Job::Batch { input, out_dir },
    };

    let output = manhwa_textfx::run(manhwa_textfx::Config {
        settings_path: cli.read_settings,
        job,
    })?;

    println!("{}", output);
    Ok(())
}

fn read_stdin() -> Result<String> {
    let mut buffer = Vec::new();
    io::stdin().read_to_end(&mut buffer)?;
    let text = String::from_utf8(buffer).map_err(|_| anyhow!("stdin must be UTF-8 text"))?;
    Ok(text.trim_end_matches(['\r', '\n']).to_string())
}
