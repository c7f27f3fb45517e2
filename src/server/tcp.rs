//! # Servidor TCP
//! src/server/tcp.rs
//!
//! El acceptor: escucha en el puerto, aplica el control de admisión y
//! entrega cada conexión aceptada al pool de workers.
//!
//! ```text
//! accept ─→ admission? ─no─→ 429 + close
//!               │
//!               └─sí─→ pool.submit(Connection::run) ─QueueFull─→ close sin respuesta
//! ```

use super::connection::Connection;
use super::rate_limit::{too_many_requests, Admission, RateLimiter};
use crate::config::{Config, ConfigError};
use crate::router::Router;
use crate::workers::{PoolError, PoolStats, WorkerPool};
use std::io::{self, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Errores al levantar el servidor
#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: io::Error,
    },
}

/// Servidor HTTP/1.1 con pool elástico de workers
pub struct Server {
    listener: TcpListener,
    router: Arc<Router>,
    pool: WorkerPool,
    admission: Option<Box<dyn Admission>>,
    read_timeout: Duration,
}

impl Server {
    /// Valida la configuración y abre el socket de escucha
    ///
    /// El router queda congelado: a partir de acá solo se lee.
    pub fn bind(config: &Config, router: Router) -> Result<Self, ServerError> {
        config.validate()?;

        let address = config.address();
        let listener = TcpListener::bind(&address)
            .map_err(|source| ServerError::Bind { address, source })?;

        let admission: Option<Box<dyn Admission>> = if config.rate_limit > 0 {
            Some(Box::new(RateLimiter::new(config.rate_limit)))
        } else {
            None
        };

        Ok(Self {
            listener,
            router: Arc::new(router),
            pool: WorkerPool::new(config.pool_config()),
            admission,
            read_timeout: config.read_timeout(),
        })
    }

    /// Reemplaza la política de admisión
    pub fn with_admission<A>(mut self, admission: A) -> Self
    where
        A: Admission + 'static,
    {
        self.admission = Some(Box::new(admission));
        self
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn pool_stats(&self) -> PoolStats {
        self.pool.stats()
    }

    /// Acepta conexiones indefinidamente
    pub fn run(&self) -> io::Result<()> {
        info!(address = %self.local_addr()?, "server listening");

        for stream in self.listener.incoming() {
            match stream {
                Ok(stream) => self.accept(stream),
                Err(e) => warn!(error = %e, "failed to accept connection"),
            }
        }

        Ok(())
    }

    fn accept(&self, stream: TcpStream) {
        let peer = stream.peer_addr().ok();

        if let (Some(admission), Some(addr)) = (&self.admission, peer) {
            if !admission.admit(addr.ip()) {
                warn!(peer = %addr, "rate limit exceeded, rejecting connection");
                reject(stream);
                return;
            }
        }

        let connection = match Connection::new(stream, Arc::clone(&self.router), self.read_timeout) {
            Ok(connection) => connection,
            Err(e) => {
                warn!(?peer, error = %e, "failed to set up connection");
                return;
            }
        };

        // Si el pool rechaza, el job se descarta y la conexión se cierra
        match self.pool.submit(move || connection.run()) {
            Ok(()) => debug!(?peer, "connection queued"),
            Err(e @ PoolError::QueueFull { .. }) => {
                warn!(?peer, error = %e, "dropping connection");
            }
            Err(e) => error!(?peer, error = %e, "dropping connection"),
        }
    }
}

fn reject(mut stream: TcpStream) {
    let result = stream
        .write_all(&too_many_requests())
        .and_then(|()| stream.flush())
        .and_then(|()| stream.shutdown(Shutdown::Both));

    if let Err(e) = result {
        debug!(error = %e, "failed to send 429");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{Method, Response};
    use std::io::Read;
    use std::net::IpAddr;
    use std::thread;

    fn test_config() -> Config {
        Config {
            port: 0,
            read_timeout_ms: 1_000,
            ..Config::default()
        }
    }

    fn start(server: Server) -> SocketAddr {
        let addr = server.local_addr().unwrap();
        thread::spawn(move || server.run());
        addr
    }

    struct DenyAll;

    impl Admission for DenyAll {
        fn admit(&self, _ip: IpAddr) -> bool {
            false
        }
    }

    #[test]
    fn test_bind_rejects_invalid_config() {
        let config = Config {
            max_threads: 0,
            ..test_config()
        };
        let result = Server::bind(&config, Router::new());
        assert!(matches!(result, Err(ServerError::Config(_))));
    }

    #[test]
    fn test_bind_reports_address_in_use() {
        let taken = TcpListener::bind("127.0.0.1:0").unwrap();
        let config = Config {
            port: taken.local_addr().unwrap().port(),
            ..test_config()
        };

        match Server::bind(&config, Router::new()) {
            Err(ServerError::Bind { address, .. }) => assert_eq!(address, config.address()),
            other => panic!("expected bind error, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_serves_request() {
        let mut router = Router::new();
        router
            .register(Method::GET, "/hello", |_req| Ok(Response::text("hi")))
            .unwrap();
        let addr = start(Server::bind(&test_config(), router).unwrap());

        let mut client = TcpStream::connect(addr).unwrap();
        client
            .write_all(b"GET /hello HTTP/1.1\r\nConnection: close\r\n\r\n")
            .unwrap();

        let mut buf = String::new();
        client.read_to_string(&mut buf).unwrap();
        assert!(buf.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(buf.ends_with("\r\n\r\nhi\r\n"));
    }

    #[test]
    fn test_denied_connection_gets_429() {
        let server = Server::bind(&test_config(), Router::new())
            .unwrap()
            .with_admission(DenyAll);
        let addr = start(server);

        let mut client = TcpStream::connect(addr).unwrap();
        let mut buf = Vec::new();
        client.read_to_end(&mut buf).unwrap();
        assert_eq!(buf, too_many_requests());
    }
}
