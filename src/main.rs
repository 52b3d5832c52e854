use btrdb_client::{Client, ClientConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ClientConfig::load()?;
    simple_logger::init_with_level(config.log.level.as_level())?;

    if config.bootstrap.is_empty() {
        log::warn!("no bootstrap addresses configured, nothing to connect to");
        return Ok(());
    }

    let client = Client::connect(config).await?;
    let collections = client.list_collections("").await?;
    log::info!("cluster reports {} collection(s)", collections.len());
    for collection in collections {
        println!("{collection}");
    }

    Ok(())
}
