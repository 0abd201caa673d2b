use clap::Parser;
use finfocus_cli::args::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    match finfocus_cli::run(cli).await {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err:#}");
            std::process::exit(3);
        }
    }
}
