use std::path::PathBuf;

use tokio::net::TcpListener;
use tokio::signal;

use hoard::cache::Cache;
use hoard::proxy;

const PORT: u16 = 8080;

#[tokio::main]
async fn main() {
    env_logger::init();

    let cache_dir = match std::env::var("CACHE_DIR_NAME") {
        Ok(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => {
            log::error!("main.config: CACHE_DIR_NAME must name a writable cache directory");
            std::process::exit(1);
        }
    };

    let cache = Cache::new(cache_dir);
    cache.restore().await;

    let listener = TcpListener::bind(format!("0.0.0.0:{}", PORT))
        .await
        .expect("failed to bind to address");

    log::info!("caching proxy listening on http://0.0.0.0:{}", PORT);

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, _)) => {
                        let _ = stream.set_nodelay(true);
                        tokio::spawn(proxy::handle_connection(stream, cache.clone()));
                    }
                    Err(_) => continue,
                }
            }
            _ = shutdown_signal() => {
                log::info!("shutdown signal received, persisting cache index");
                break;
            }
        }
    }

    cache.persist();
    log::info!("shutdown complete");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        let mut terminate = signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler");
        let mut quit = signal::unix::signal(signal::unix::SignalKind::quit())
            .expect("failed to install SIGQUIT handler");
        tokio::select! {
            _ = terminate.recv() => {}
            _ = quit.recv() => {}
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
