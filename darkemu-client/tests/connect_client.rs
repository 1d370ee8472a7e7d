//! Client requests against a live connect server.

use darkemu_client::{ClientBuilder, ClientError};
use darkemu_core::{ServerInfoResponse, ServerListEntry};
use darkemu_server::{ConnectDispatcher, RosterEntry, ServerBuilder, ServerRoster, ShutdownHandle};
use std::net::SocketAddr;
use std::thread::JoinHandle;

fn start_server() -> (SocketAddr, ShutdownHandle, JoinHandle<()>) {
    let roster = ServerRoster::from_entries([
        RosterEntry::new(0, "Alpha", "127.0.0.1", 55901).with_load(12),
        RosterEntry::new(20, "Beta", "10.20.30.40", 55919),
    ]);
    let mut server = ServerBuilder::new()
        .bind("127.0.0.1:0".parse().unwrap())
        .handler(ConnectDispatcher::new(roster))
        .build()
        .unwrap();
    let addr = server.local_addr();
    let handle = server.shutdown_handle();
    let join = std::thread::spawn(move || server.run().unwrap());
    (addr, handle, join)
}

#[tokio::test]
async fn test_server_list() {
    let (addr, handle, join) = start_server();
    let client = ClientBuilder::new(addr).build();

    let entries = client.server_list().await.unwrap();
    assert_eq!(
        entries,
        vec![
            ServerListEntry::new(0, 12, 0xCC),
            ServerListEntry::new(20, 0, 0xCC)
        ]
    );

    handle.shutdown();
    join.join().unwrap();
}

#[tokio::test]
async fn test_server_info() {
    let (addr, handle, join) = start_server();
    let client = ClientBuilder::new(addr).build();

    let info = client.server_info(20).await.unwrap();
    assert_eq!(info, Some(ServerInfoResponse::new("10.20.30.40", 55919)));
    assert_eq!(client.server_info(7).await.unwrap(), None);

    handle.shutdown();
    join.join().unwrap();
}

#[tokio::test]
async fn test_connection_refused() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = ClientBuilder::new(addr).build();
    let err = client.server_list().await.unwrap_err();
    assert!(matches!(err, ClientError::Io(_)));
}
