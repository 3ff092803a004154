#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tango_backend::run().await
}
