use clap::Parser;

#[tokio::main]
async fn main() {
    let cli = detour::cli::Cli::parse();
    if let Err(e) = detour::cmd::dispatch(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
