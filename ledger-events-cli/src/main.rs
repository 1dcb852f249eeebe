#[tokio::main]
async fn main() {
    if let Err(e) = ledger_events_cli::run().await {
        println!("Error occurred: {:#}", e);
        std::process::exit(1);
    }
}
