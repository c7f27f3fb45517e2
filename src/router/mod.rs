//! # Sistema de Routing
//! src/router/mod.rs
//!
//! Mapea (método, path) a un handler registrado.
//!
//! ## Arquitectura
//!
//! ```text
//! Request → Router → Handler → Response
//!              │
//!              └─ HttpError → ErrorRenderer → Response
//! ```
//!
//! Cada ruta es un patrón regex que debe coincidir con el path completo
//! (no por prefijo). La resolución es:
//!
//! 1. Filtrar las rutas cuyo patrón coincide con el path. Ninguna → 404.
//! 2. De esas, quedarse con las del método del request. Ninguna → 405 con
//!    `Allow` listando los métodos del paso 1, sin repetir y en orden de
//!    registro.
//! 3. Ejecutar la primera en orden de registro. Si dos patrones distintos
//!    cubren el mismo método y path, gana el registrado primero.
//!
//! Las rutas se registran solo durante el arranque. Después el router se
//! comparte como `Arc<Router>` entre todos los workers y nadie lo vuelve a
//! mutar, así que la lectura no necesita locks.

use crate::http::{
    DefaultErrorPage, ErrorRenderer, HandlerError, HandlerResult, HttpError, Method, Request,
    Response,
};
use regex::Regex;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use thiserror::Error;
use tracing::{debug, error, warn};

/// Handler registrado: función pura de `Request` a `Response`
pub type Handler = Box<dyn Fn(&Request) -> HandlerResult + Send + Sync>;

/// Errores al armar la tabla de rutas
#[derive(Debug, Error)]
pub enum RouterError {
    #[error("invalid route pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Una entrada de la tabla: (método, patrón, handler)
struct Route {
    method: Method,
    /// Patrón tal como se registró, identifica la entrada
    source: String,
    /// Patrón anclado (`^(?:...)$`)
    pattern: Regex,
    handler: Handler,
}

/// Tabla de rutas más el renderer de errores
pub struct Router {
    routes: Vec<Route>,
    error_renderer: Box<dyn ErrorRenderer>,
}

impl Router {
    /// Crea un router vacío con la página de error por defecto
    pub fn new() -> Self {
        Self {
            routes: Vec::new(),
            error_renderer: Box::new(DefaultErrorPage),
        }
    }

    /// Registra un handler para un método y un patrón de path
    ///
    /// Registrar otra vez el mismo (método, patrón) reemplaza el handler
    /// sin cambiar su posición en la tabla.
    ///
    /// # Ejemplo
    /// ```
    /// use rest_server::http::{Method, Response};
    /// use rest_server::router::Router;
    ///
    /// let mut router = Router::new();
    /// router
    ///     .register(Method::GET, "/users/[0-9]+", |_req| Ok(Response::text("user")))
    ///     .unwrap();
    /// assert_eq!(router.len(), 1);
    /// ```
    pub fn register<F>(&mut self, method: Method, pattern: &str, handler: F) -> Result<(), RouterError>
    where
        F: Fn(&Request) -> HandlerResult + Send + Sync + 'static,
    {
        let compiled = Regex::new(&format!("^(?:{})$", pattern)).map_err(|source| {
            RouterError::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            }
        })?;
        let handler: Handler = Box::new(handler);

        if let Some(existing) = self
            .routes
            .iter_mut()
            .find(|route| route.method == method && route.source == pattern)
        {
            warn!(%method, pattern, "route registered twice, replacing handler");
            existing.handler = handler;
            return Ok(());
        }

        debug!(%method, pattern, "route registered");
        self.routes.push(Route {
            method,
            source: pattern.to_string(),
            pattern: compiled,
            handler,
        });
        Ok(())
    }

    /// Reemplaza la página de error por defecto en todos los caminos de error
    pub fn set_error_handler<R>(&mut self, renderer: R)
    where
        R: ErrorRenderer + 'static,
    {
        self.error_renderer = Box::new(renderer);
    }

    /// Resuelve (método, path) al handler que debe atenderlo
    ///
    /// Es una función pura de la tabla y de sus argumentos.
    pub fn resolve(&self, method: Method, path: &str) -> Result<&Handler, HttpError> {
        let matched: Vec<&Route> = self
            .routes
            .iter()
            .filter(|route| route.pattern.is_match(path))
            .collect();

        if matched.is_empty() {
            return Err(HttpError::not_found());
        }

        if let Some(route) = matched.iter().copied().find(|route| route.method == method) {
            return Ok(&route.handler);
        }

        let mut allowed: Vec<&str> = Vec::new();
        for route in &matched {
            let name = route.method.as_str();
            if !allowed.contains(&name) {
                allowed.push(name);
            }
        }

        Err(HttpError::method_not_allowed(&allowed.join(", ")))
    }

    /// Atiende un request completo y siempre produce una respuesta
    ///
    /// Errores de routing y `HttpError` del handler pasan por el renderer con
    /// su propio código. Cualquier otra falla del handler (error interno o
    /// panic) se registra como error y se responde 500.
    pub fn dispatch(&self, request: &Request) -> Response {
        let handler = match self.resolve(request.method(), request.path()) {
            Ok(handler) => handler,
            Err(e) => {
                debug!(%request, code = e.code(), "routing error");
                return self.render_error(&e);
            }
        };

        match panic::catch_unwind(AssertUnwindSafe(|| handler(request))) {
            Ok(Ok(response)) => response,
            Ok(Err(HandlerError::Http(e))) => self.render_error(&e),
            Ok(Err(HandlerError::Internal(cause))) => {
                error!(%request, %cause, "handler failed");
                self.render_error(&HttpError::internal())
            }
            Err(payload) => {
                error!(%request, panic = panic_message(&*payload), "handler panicked");
                self.render_error(&HttpError::internal())
            }
        }
    }

    /// Convierte un error en respuesta con el renderer configurado
    pub fn render_error(&self, error: &HttpError) -> Response {
        self.error_renderer.render(error)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}
