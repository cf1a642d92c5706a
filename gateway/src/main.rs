mod host;
mod hub;
mod mqtt;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    host::run().await
}
