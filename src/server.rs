use crate::event::ProxyEvent;
use crate::kube::IngressStore;
use crate::request::{Handled, Handler, Reply, RequestError};
use http::{header, Method, Request, Response, StatusCode};
use hyper::{server::conn::Http, service::service_fn, Body};
use std::{net::SocketAddr, sync::Arc};
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};

pub async fn start<A, S>(addr: A, handler: Arc<Handler<S>>) -> Result<(), std::io::Error>
where
    A: ToSocketAddrs,
    S: IngressStore + 'static,
{
    let listener = TcpListener::bind(addr).await?;
    info!("Listening for plugin requests on {}.", listener.local_addr()?);

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((socket, addr)) => handle_connection(socket, addr, handler.clone()),
                Err(e) => error!("Failed to accept connection: {}", e),
            },
            _ = &mut shutdown => {
                info!("Shutting down.");
                return Ok(());
            }
        }
    }
}

fn handle_connection<S>(socket: TcpStream, addr: SocketAddr, handler: Arc<Handler<S>>)
where
    S: IngressStore + 'static,
{
    debug!("Connection accepted from {}.", addr);

    tokio::spawn(async move {
        if let Err(http_err) = Http::new()
            .serve_connection(socket, service_fn(|req| route(req, handler.clone())))
            .await
        {
            error!("Error while serving HTTP connection: {}", http_err);
        }
    });
}

pub async fn route<S: IngressStore>(
    req: Request<Body>,
    handler: Arc<Handler<S>>,
) -> Result<Response<Body>, RequestError> {
    match (req.method(), req.uri().path()) {
        (&Method::POST, "/") => webhook(req, &handler).await,
        (&Method::GET, "/healthz") | (&Method::GET, "/readyz") => {
            Ok(Response::new(Body::from("ok")))
        }
        _ => Ok(Response::builder()
            .status(StatusCode::NOT_FOUND)
            .body(Body::empty())?),
    }
}

async fn webhook<S: IngressStore>(
    req: Request<Body>,
    handler: &Handler<S>,
) -> Result<Response<Body>, RequestError> {
    let body = hyper::body::to_bytes(req.into_body()).await?;
    trace!("Request received: {}", String::from_utf8_lossy(&body));

    let event = match ProxyEvent::parse(&body) {
        Ok(event) => event,
        Err(e) => {
            warn!("Failed to parse request, leaving it unchanged: {}", e);
            return json(&Reply::accept());
        }
    };
    let proxy_name = event.proxy_name().to_string();

    match handler.handle(event).await {
        Ok(Handled::Reply(reply)) => json(&reply),
        Ok(Handled::Empty) => Ok(Response::new(Body::empty())),
        Err(e) => {
            error!("Failed to handle proxy `{}`: {}", proxy_name, e);
            Ok(Response::builder()
                .status(StatusCode::INTERNAL_SERVER_ERROR)
                .body(Body::from(e.to_string()))?)
        }
    }
}

fn json(reply: &Reply) -> Result<Response<Body>, RequestError> {
    let body = serde_json::to_vec(reply)?;

    Ok(Response::builder()
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body))?)
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = terminate.recv() => {}
                }
                return;
            }
            Err(e) => error!("Failed to listen for SIGTERM: {}", e),
        }
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
}
