use anyhow::Result;
use clap::Parser;
use pdf_batch::cli;

fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let args = cli::Args::parse();
    if let Err(err) = cli::dispatch(args) {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
    Ok(())
}
