use std::{future::Future, sync::Arc};
use tokio::net::TcpListener;
use tracing::{error, info};
use super::{dispatch::Dispatcher, handler::handle_client};

pub async fn bind(address: &str) -> std::io::Result<TcpListener> {
    let listener = TcpListener::bind(address).await?;
    info!("Server listening on {}", listener.local_addr()?);
    Ok(listener)
}

/// Accepts connections until `shutdown` resolves. Each connection runs on its own task.
pub async fn run(
    listener: TcpListener,
    dispatcher: Arc<Dispatcher>,
    shutdown: impl Future<Output = ()>,
) {
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Server shutting down");
                break;
            }
            accepted = listener.accept() => {
                let stream = match accepted {
                    Ok((stream, _)) => stream,
                    Err(e) => {
                        error!("Error accepting connection: {}", e);
                        continue;
                    }
                };
                let dispatcher = Arc::clone(&dispatcher);
                tokio::spawn(async move {
                    if let Err(e) = handle_client(stream, dispatcher).await {
                        error!("Error handling client: {}", e);
                    }
                });
            }
        }
    }
}
