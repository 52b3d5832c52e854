//! Connects to a cluster, lists whatever collections exist, and reads one
//! stream's metadata and raw values if a UUID is given as the first argument.
//!
//! ```text
//! cargo run --example connect -- 127.0.0.1:4410
//! cargo run --example connect -- 127.0.0.1:4410 6ba7b810-9dad-11d1-80b4-00c04fd430c8
//! ```

use std::env;

use btrdb_client::{Client, ClientConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    simple_logger::init_with_level(log::Level::Info)?;

    let mut args = env::args().skip(1);
    let bootstrap = args.next().unwrap_or_else(|| "127.0.0.1:4410".to_string());

    let config = ClientConfig {
        bootstrap: vec![bootstrap],
        ..ClientConfig::default()
    };

    let client = Client::connect(config).await?;
    let collections = client.list_collections("").await?;
    println!("{} collection(s):", collections.len());
    for collection in &collections {
        println!("  {collection}");
    }

    if let Some(uuid_arg) = args.next() {
        let uuid = parse_uuid(&uuid_arg)?;
        let stream = client.stream(uuid);

        if !stream.exists().await? {
            println!("stream {uuid_arg} does not exist");
            return Ok(());
        }

        println!("collection: {}", stream.collection().await?);
        println!("version: {}", stream.version().await?);

        let (points, version) = stream.raw_values_collect(i64::MIN, i64::MAX, 0).await?;
        println!("{} point(s) at version {version}", points.len());
    }

    Ok(())
}

fn parse_uuid(text: &str) -> anyhow::Result<[u8; 16]> {
    let hex: String = text.chars().filter(|c| *c != '-').collect();
    let bytes = (0..16)
        .map(|i| u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16))
        .collect::<Result<Vec<u8>, _>>()?;
    bytes
        .try_into()
        .map_err(|_| anyhow::anyhow!("uuid must be 16 bytes"))
}
