//! # Módulo del Servidor HTTP
//! src/server/mod.rs
//!
//! Este módulo implementa el servidor TCP que:
//! 1. Escucha en un puerto y aplica el control de admisión (`tcp`, `rate_limit`)
//! 2. Entrega cada conexión aceptada al pool de workers
//! 3. Lee requests con un plazo máximo (`deadline`)
//! 4. Despacha al router y escribe las respuestas (`connection`)

pub mod connection;
pub mod deadline;
pub mod rate_limit;
pub mod tcp;

// Re-exportar para facilitar el uso
pub use connection::Connection;
pub use rate_limit::{too_many_requests, Admission, RateLimiter};
pub use tcp::{Server, ServerError};
