#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = aulagrade_rust::run().await {
        eprintln!("aulagrade-rust fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
