//! Scenario: a member that never answers within the configured call timeout
//! is cancelled, not hung forever waiting on it.

mod support;

use std::time::{Duration, Instant};

use btrdb_client::{Client, ClientConfig, Status};
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
async fn slow_member_is_cancelled_by_the_call_timeout() {
    let (address, listener) = support::bind().await;
    let mut fake = support::FakeMember::new(proto::Mash {
        members: vec![member(1, &address)],
    });
    fake.nearest_delay = Some(Duration::from_secs(5));
    let _handle = support::spawn(listener, fake);

    let config = ClientConfig {
        bootstrap: vec![address],
        call_timeout_secs: 1,
        ..ClientConfig::default()
    };
    let client = Client::connect(config).await.expect("connect");

    let started = Instant::now();
    let status = client
        .nearest([3u8; 16], 0, 0, false)
        .await
        .expect_err("a five-second reply blows past a one-second deadline");

    // The fixture sleeps for 5s; a working deadline cuts this off near 1s.
    assert!(started.elapsed() < Duration::from_secs(3));
    assert!(matches!(status, Status::Grpc(_)));
}
