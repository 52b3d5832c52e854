//! Scenario: a client bootstraps against a single member, adopts its routing
//! map, and lists every collection across an exact page-size boundary
//! without double-counting the withheld cursor entry.

mod support;

use btrdb_client::{Client, ClientConfig};
use wire::proto;

fn member(hash: u32, address: &str) -> proto::Member {
    proto::Member {
        hash,
        start: 0,
        end: u32::MAX as i64,
        grpcendpoints: address.to_string(),
        r#in: true,
        up: true,
    }
}

#[tokio::test]
async fn connects_and_lists_collections() {
    let (address, listener) = support::bind().await;

    let mut fake = support::FakeMember::new(proto::Mash {
        members: vec![member(1, &address)],
    });
    fake.collections = (0..25).map(|i| format!("coll-{i:02}")).collect();
    let _handle = support::spawn(listener, fake);

    let config = ClientConfig {
        bootstrap: vec![address],
        ..ClientConfig::default()
    };
    let client = Client::connect(config).await.expect("connect");

    let collections = client.list_collections("coll-").await.expect("list collections");
    assert_eq!(collections.len(), 25);
    assert_eq!(collections.first().unwrap(), "coll-00");
    assert_eq!(collections.last().unwrap(), "coll-24");
    for pair in collections.windows(2) {
        assert!(pair[0] < pair[1], "collections must come back sorted with no duplicates");
    }
}
