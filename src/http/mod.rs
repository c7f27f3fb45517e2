//! # Módulo HTTP
//!
//! Implementa el protocolo HTTP/1.1 desde cero, sin librerías de alto
//! nivel. Incluye:
//!
//! - Parsing de requests con keep-alive (`reader`)
//! - Modelo de request y response (`request`, `response`)
//! - Status codes (`status`)
//! - Errores HTTP estructurados y la página de error (`error`)
//!
//! Lo que no implementa: TLS, chunked transfer encoding, HTTP/2 ni
//! pipelining (los requests de una conexión se procesan de a uno).

pub mod error;
pub mod reader;
pub mod request;
pub mod response;
pub mod status;

pub use error::{DefaultErrorPage, ErrorRenderer, HandlerError, HandlerResult, HttpError};
pub use reader::{ReadError, RequestReader};
pub use request::{Method, Request};
pub use response::Response;
pub use status::StatusCode;

/// Valor del header `Server` en todas las respuestas
pub const SERVER_NAME: &str = "rest_server";

pub const TEXT_PLAIN: &str = "text/plain";
pub const TEXT_HTML: &str = "text/html";
pub const APPLICATION_JSON: &str = "application/json";
