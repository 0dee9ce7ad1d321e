#[tokio::main]
async fn main() {
    if let Err(error) = timeblock::run().await {
        eprintln!("timeblock: {error}");
        std::process::exit(1);
    }
}
