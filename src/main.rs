#[tokio::main]
async fn main() {
    if let Err(e) = handrail::run().await {
        eprintln!("handrail failed to start: {e}");
        std::process::exit(1);
    }
}
