//! # Configuración del Servidor
//! src/config.rs
//!
//! Configuración del servidor con soporte para argumentos CLI y variables
//! de entorno. Cada opción tiene un default razonable, así que el binario
//! arranca sin argumentos.
//!
//! ## Ejemplos de uso
//!
//! ### CLI
//! ```bash
//! ./rest_server --port 8080 \
//!   --max-threads 16 \
//!   --min-keep-threads 2 \
//!   --read-timeout 3000
//! ```
//!
//! ### Variables de entorno
//! ```bash
//! HTTP_PORT=8080 MAX_QUEUE_SIZE=500 RATE_LIMIT=20 ./rest_server
//! ```

use crate::workers::PoolConfig;
use clap::Parser;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

/// Configuración inválida detectada por `Config::validate`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid configuration: {0}")]
pub struct ConfigError(String);

impl ConfigError {
    fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    pub fn message(&self) -> &str {
        &self.0
    }
}

/// Configuración del servidor HTTP/1.1
#[derive(Debug, Clone, Parser)]
#[command(name = "rest_server")]
#[command(about = "Servidor HTTP/1.1 con pool elástico de workers y router por regex")]
#[command(version = "0.1.0")]
pub struct Config {
    /// Puerto en el que escucha el servidor
    #[arg(short, long, default_value = "8080", env = "HTTP_PORT")]
    pub port: u16,

    /// Host/IP en el que escucha
    #[arg(long, default_value = "127.0.0.1", env = "HTTP_HOST")]
    pub host: String,

    // === Workers ===

    /// Máximo de workers atendiendo conexiones a la vez
    #[arg(long = "max-threads", default_value = "10", env = "MAX_THREADS")]
    pub max_threads: usize,

    /// Workers que se mantienen vivos aunque no haya tráfico
    #[arg(long = "min-keep-threads", default_value = "1", env = "MIN_KEEP_THREADS")]
    pub min_keep_threads: usize,

    /// Segundos de inactividad tras los cuales un worker sobrante termina
    #[arg(long = "inactive-worker-timeout", default_value = "10", env = "INACTIVE_WORKER_TIMEOUT")]
    pub inactive_worker_timeout_secs: u64,

    // === Conexiones ===

    /// Tiempo máximo para recibir un request completo, en milisegundos
    #[arg(long = "read-timeout", default_value = "5000", env = "READ_TIMEOUT_MS")]
    pub read_timeout_ms: u64,

    /// Conexiones que pueden esperar un worker libre
    #[arg(long = "max-queue-size", default_value = "100", env = "MAX_QUEUE_SIZE")]
    pub max_queue_size: usize,

    // === Rate Limiting ===

    /// Máximo de conexiones por segundo por IP (0 = sin límite)
    #[arg(long = "rate-limit", default_value = "0", env = "RATE_LIMIT")]
    pub rate_limit: u32,
}

impl Config {
    /// Crea una nueva configuración parseando argumentos CLI
    pub fn new() -> Self {
        Config::parse()
    }

    /// Obtiene la dirección completa para bind (host:port)
    ///
    /// # Ejemplo
    /// ```rust
    /// use rest_server::config::Config;
    ///
    /// let config = Config::default();
    /// assert_eq!(config.address(), "127.0.0.1:8080");
    /// ```
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    /// Parámetros del pool de workers derivados de esta configuración
    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig {
            max_threads: self.max_threads,
            min_keep_threads: self.min_keep_threads,
            inactive_timeout: Duration::from_secs(self.inactive_worker_timeout_secs),
            max_queue: self.max_queue_size,
            ..PoolConfig::default()
        }
    }

    /// Valida la configuración
    ///
    /// Retorna errores si hay valores inválidos
    pub fn validate(&self) -> Result<(), ConfigError> {
        // Validar workers
        if self.max_threads == 0 {
            return Err(ConfigError::new("max threads must be >= 1"));
        }
        if self.min_keep_threads > self.max_threads {
            return Err(ConfigError::new(format!(
                "min keep threads ({}) must not exceed max threads ({})",
                self.min_keep_threads, self.max_threads
            )));
        }

        // Validar conexiones
        if self.read_timeout_ms == 0 {
            return Err(ConfigError::new("read timeout must be > 0"));
        }
        if self.max_queue_size == 0 {
            return Err(ConfigError::new("max queue size must be >= 1"));
        }

        Ok(())
    }

    /// Registra la configuración efectiva al arrancar
    pub fn log_summary(&self) {
        info!(
            address = %self.address(),
            max_threads = self.max_threads,
            min_keep_threads = self.min_keep_threads,
            inactive_worker_timeout_secs = self.inactive_worker_timeout_secs,
            read_timeout_ms = self.read_timeout_ms,
            max_queue_size = self.max_queue_size,
            "server configuration"
        );

        if self.rate_limit > 0 {
            info!(per_ip_per_sec = self.rate_limit, "rate limiting enabled");
        } else {
            info!("rate limiting disabled");
        }
    }
}

impl Default for Config {
    /// Configuración por defecto
    fn default() -> Self {
        Self {
            port: 8080,
            host: "127.0.0.1".to_string(),
            max_threads: 10,
            min_keep_threads: 1,
            inactive_worker_timeout_secs: 10,
            read_timeout_ms: 5_000,
            max_queue_size: 100,
            rate_limit: 0,
        }
    }
}
