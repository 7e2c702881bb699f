use std::convert::Infallible;
use std::future::Future;

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{Request, Response, StatusCode};
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use serde::Serialize;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

pub type HttpResponse = Response<Full<Bytes>>;

pub fn empty(status: StatusCode) -> HttpResponse {
    let mut resp = Response::new(Full::default());
    *resp.status_mut() = status;
    resp
}

/// Serialize `value` as the response body.
pub fn json<T: Serialize + ?Sized>(status: StatusCode, value: &T) -> HttpResponse {
    match serde_json::to_vec(value) {
        Ok(data) => {
            let mut resp = Response::new(Full::new(Bytes::from(data)));
            *resp.status_mut() = status;
            resp.headers_mut()
                .insert(CONTENT_TYPE, http::HeaderValue::from_static("application/json"));
            resp
        }
        Err(err) => {
            error!(message = "encode response body failed", %err);

            empty(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Accept connections until `shutdown` is cancelled. Connections already
/// accepted are shut down gracefully, so in-flight requests complete.
pub async fn serve<H, F>(listener: TcpListener, handler: H, shutdown: CancellationToken)
where
    H: Fn(Request<Incoming>) -> F + Clone + Send + Sync + 'static,
    F: Future<Output = HttpResponse> + Send + 'static,
{
    loop {
        let (conn, peer) = tokio::select! {
            _ = shutdown.cancelled() => break,
            result = listener.accept() => match result {
                Ok((conn, peer)) => (TokioIo::new(conn), peer),
                Err(err) => {
                    error!(
                        message = "accept new connection failed",
                        %err
                    );

                    continue;
                }
            }
        };

        let handler = handler.clone();
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            let service = service_fn(move |req| {
                let fut = handler(req);
                async move { Ok::<_, Infallible>(fut.await) }
            });

            let conn = http1::Builder::new().serve_connection(conn, service);
            tokio::pin!(conn);

            tokio::select! {
                result = conn.as_mut() => {
                    if let Err(err) = result {
                        trace!(message = "failed to serve http connection", %peer, %err);
                    }

                    return;
                }
                _ = shutdown.cancelled() => {
                    conn.as_mut().graceful_shutdown();
                }
            }

            if let Err(err) = conn.await {
                trace!(message = "failed to serve http connection", %peer, %err);
            }
        });
    }
}
