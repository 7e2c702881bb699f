use std::net::{Ipv4Addr, SocketAddr, TcpListener};

/// Asks the OS for a free port on the loopback interface.
///
/// The port is released before returning, so a concurrent test may grab it
/// first, which is unlikely enough for tests.
pub fn next_addr() -> SocketAddr {
    let listener =
        TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).expect("bind an ephemeral loopback port");

    listener.local_addr().expect("local addr of bound listener")
}
