//! # Workers
//!
//! Pool elástico de threads que ejecuta las conexiones aceptadas.

pub mod pool;

pub use pool::{PoolConfig, PoolError, PoolStats, WorkerPool};
