//! # Errores HTTP estructurados
//! src/http/error.rs
//!
//! Un `HttpError` es una respuesta de error "lanzable": código, mensaje y un
//! bloque opcional de headers extra. Lo producen el parser (400, 411, 505,
//! 408), el router (404, 405) y los propios handlers. El `ErrorRenderer`
//! lo convierte en la `Response` que finalmente se escribe al socket.

use super::{Response, StatusCode};
use std::error::Error as StdError;
use thiserror::Error;

/// Error HTTP con código, mensaje y headers extra opcionales
///
/// El bloque `headers` usa el mismo formato que `Response::headers`:
/// líneas `Nombre: valor` unidas por `\r\n` y sin separador final.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code} {message}")]
pub struct HttpError {
    code: u16,
    message: String,
    headers: String,
}

impl HttpError {
    /// Crea un error con cualquier código (ej: 499 propio de la aplicación)
    pub fn new(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            headers: String::new(),
        }
    }

    /// Agrega headers extra que acompañarán la respuesta de error
    pub fn with_headers(mut self, headers: impl Into<String>) -> Self {
        self.headers = headers.into();
        self
    }

    pub fn from_status(status: StatusCode) -> Self {
        Self::new(status.as_u16(), status.reason_phrase())
    }

    pub fn bad_request() -> Self {
        Self::from_status(StatusCode::BadRequest)
    }

    pub fn not_found() -> Self {
        Self::from_status(StatusCode::NotFound)
    }

    /// 405 con el header `Allow` ya formateado
    pub fn method_not_allowed(allowed: &str) -> Self {
        Self::from_status(StatusCode::MethodNotAllowed).with_headers(format!("Allow: {}", allowed))
    }

    pub fn request_timeout() -> Self {
        Self::from_status(StatusCode::RequestTimeout)
    }

    pub fn length_required() -> Self {
        Self::from_status(StatusCode::LengthRequired)
    }

    pub fn version_not_supported() -> Self {
        Self::from_status(StatusCode::HttpVersionNotSupported)
    }

    pub fn internal() -> Self {
        Self::from_status(StatusCode::InternalServerError)
    }

    pub fn code(&self) -> u16 {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn headers(&self) -> &str {
        &self.headers
    }
}

/// Resultado que retorna un handler registrado en el router
pub type HandlerResult = Result<Response, HandlerError>;

/// Error que puede retornar un handler
///
/// `Http` pasa tal cual al cliente con su propio código. `Internal` es
/// cualquier otra falla: se registra como error y el cliente recibe un 500.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error(transparent)]
    Http(#[from] HttpError),

    #[error("handler failed: {0}")]
    Internal(Box<dyn StdError + Send + Sync>),
}

impl HandlerError {
    /// Envuelve cualquier error como falla interna
    ///
    /// # Ejemplo
    /// ```
    /// use rest_server::http::HandlerError;
    ///
    /// let err = "abc".parse::<u32>().map_err(HandlerError::internal);
    /// assert!(matches!(err, Err(HandlerError::Internal(_))));
    /// ```
    pub fn internal<E>(error: E) -> Self
    where
        E: Into<Box<dyn StdError + Send + Sync>>,
    {
        Self::Internal(error.into())
    }
}

impl From<std::io::Error> for HandlerError {
    fn from(error: std::io::Error) -> Self {
        Self::Internal(Box::new(error))
    }
}

/// Convierte un `HttpError` en la respuesta que verá el cliente
///
/// Si la aplicación instala uno propio, reemplaza por completo a la página
/// por defecto en todos los caminos de error, incluidos 408 y 500.
pub trait ErrorRenderer: Send + Sync {
    fn render(&self, error: &HttpError) -> Response;
}

impl<F> ErrorRenderer for F
where
    F: Fn(&HttpError) -> Response + Send + Sync,
{
    fn render(&self, error: &HttpError) -> Response {
        self(error)
    }
}

/// Página HTML mínima usada cuando la aplicación no define su propio renderer
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultErrorPage;

impl ErrorRenderer for DefaultErrorPage {
    fn render(&self, error: &HttpError) -> Response {
        let page = format!(
            "<html>\n    <h2>API Error</h2>\n    <h3>{} {}</h3>\n    <hr> {}\n</html>\r\n",
            error.code(),
            error.message(),
            super::SERVER_NAME
        );

        Response::with_code(error.code(), error.message())
            .with_content_type(super::TEXT_HTML)
            .with_headers(error.headers())
            .with_body(page)
    }
}
