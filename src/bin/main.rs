//! Binary entrypoint for the planboard tool

#[tokio::main]
async fn main() {
    if let Err(err) = planboard::cli::run().await {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}
