#[tokio::main]
async fn main() -> anyhow::Result<()> {
    opshub_cli::run().await
}
