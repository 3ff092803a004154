#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tango_client::run().await
}
