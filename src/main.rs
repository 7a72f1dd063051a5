#[tokio::main]
async fn main() {
    if let Err(err) = ups_bridge::app().await {
        // the logger may not be up yet
        eprintln!("Error: {:#}", err);
        std::process::exit(1);
    }
}
