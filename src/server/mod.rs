pub mod api;
pub mod error;

use std::error::Error;
use std::net::SocketAddr;
use axum::Router;
use log::{ info, warn };
use tokio::net::TcpListener;

use crate::config::TlsConfig;
use self::api::{ router, AppState };

pub struct Server {
    addr: SocketAddr,
    state: AppState,
}

impl Server {
    pub fn new(state: AppState) -> Self {
        Self {
            addr: state.config().addr,
            state,
        }
    }

    pub fn app(&self) -> Router {
        router(self.state.clone())
    }

    pub async fn run(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        match self.state.config().tls.clone() {
            Some(tls) => self.serve_tls(tls).await,
            None => {
                let listener = TcpListener::bind(self.addr).await.map_err(|e|
                    format!("Failed to bind relay to {}: {}. Try a different port.", self.addr, e)
                )?;
                self.serve(listener).await
            }
        }
    }

    /// Serves plain HTTP on an already-bound listener until Ctrl-C.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), Box<dyn Error + Send + Sync>> {
        info!("Relay listening on http://{}", listener.local_addr()?);
        axum::serve(listener, self.app().into_make_service())
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        info!("Relay stopped");
        Ok(())
    }

    async fn serve_tls(&self, tls: TlsConfig) -> Result<(), Box<dyn Error + Send + Sync>> {
        let tls_config = axum_server::tls_rustls::RustlsConfig
            ::from_pem_file(&tls.cert_path, &tls.key_path).await
            .map_err(|e| format!("Failed to load TLS certificate/key: {}", e))?;

        info!("Relay listening on https://{}", self.addr);
        axum_server::bind_rustls(self.addr, tls_config).serve(self.app().into_make_service()).await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
