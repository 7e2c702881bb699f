use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::time::{sleep, timeout};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
const MIN_BACKOFF: Duration = Duration::from_millis(5);
const MAX_BACKOFF: Duration = Duration::from_millis(250);

/// Poll `condition` with a doubling backoff, panics once `limit` elapsed.
pub async fn wait_for_duration<F>(mut condition: F, limit: Duration)
where
    F: AsyncFnMut() -> bool,
{
    let polling = async {
        let mut backoff = MIN_BACKOFF;

        while !condition().await {
            sleep(backoff).await;
            backoff = (backoff * 2).min(MAX_BACKOFF);
        }
    };

    if timeout(limit, polling).await.is_err() {
        panic!("condition not met within {limit:?}");
    }
}

/// Like [`wait_for_duration`] with a 5s limit.
pub async fn wait_for<F>(condition: F)
where
    F: AsyncFnMut() -> bool,
{
    wait_for_duration(condition, DEFAULT_TIMEOUT).await
}

/// Wait until something accepts connections on `addr`.
pub async fn wait_for_tcp(addr: SocketAddr) {
    wait_for(async || TcpStream::connect(addr).await.is_ok()).await
}

/// Wait until `path` exists, e.g. an output file written by a background task.
pub async fn wait_for_file(path: &Path) {
    wait_for(async || tokio::fs::try_exists(path).await.unwrap_or(false)).await
}
