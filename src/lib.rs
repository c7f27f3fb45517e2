//! # REST Server
//! src/lib.rs
//!
//! Núcleo de servidor HTTP/1.1 embebible, implementado sobre sockets
//! bloqueantes y threads del sistema.
//!
//! ## Arquitectura
//!
//! El servidor está dividido en módulos especializados:
//! - `http`: parsing de requests, respuestas y errores HTTP/1.1
//! - `router`: tabla de rutas (método + regex) y despacho a handlers
//! - `workers`: pool elástico de threads con cola acotada
//! - `server`: acceptor, admisión y motor de cada conexión
//! - `config`: configuración por CLI y variables de entorno
//!
//! ## Ejemplo de uso
//!
//! ```no_run
//! use rest_server::config::Config;
//! use rest_server::http::{Method, Response};
//! use rest_server::router::Router;
//! use rest_server::server::Server;
//!
//! let mut router = Router::new();
//! router
//!     .register(Method::GET, "/hello/[a-z]+", |req| {
//!         Ok(Response::text(&format!("Hello from {}", req.path())))
//!     })
//!     .unwrap();
//!
//! let server = Server::bind(&Config::default(), router).expect("Error al iniciar servidor");
//! server.run().expect("Error al aceptar conexiones");
//! ```

pub mod config;
pub mod http;
pub mod router;
pub mod server;
pub mod workers;
