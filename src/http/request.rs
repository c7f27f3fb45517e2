//! # Requests HTTP/1.1
//! src/http/request.rs
//!
//! Tipo de valor para un request ya parseado. Se construye una vez por
//! ciclo request/response (ver `http::reader`) y el handler solo lo recibe
//! por referencia, así que nadie lo muta después de entregado.
//!
//! ## Formato de un Request HTTP/1.1
//!
//! ```text
//! POST /relay HTTP/1.1\r\n
//! Host: localhost:8080\r\n
//! Content-Length: 6\r\n
//! \r\n
//! relay!
//! ```

use super::reader::{ReadError, RequestReader};
use super::HttpError;
use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

/// Métodos HTTP aceptados por el parser
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    GET,
    POST,
    PUT,
    PATCH,
    DELETE,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::GET => "GET",
            Method::POST => "POST",
            Method::PUT => "PUT",
            Method::PATCH => "PATCH",
            Method::DELETE => "DELETE",
        }
    }

    /// Métodos que deben declarar `Content-Length` (si no, 411)
    pub fn requires_length(&self) -> bool {
        matches!(self, Method::POST | Method::PUT | Method::PATCH)
    }
}

impl FromStr for Method {
    type Err = HttpError;

    /// Comparación exacta: `get` en minúsculas es un request malformado
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GET" => Ok(Method::GET),
            "POST" => Ok(Method::POST),
            "PUT" => Ok(Method::PUT),
            "PATCH" => Ok(Method::PATCH),
            "DELETE" => Ok(Method::DELETE),
            _ => Err(HttpError::bad_request()),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Representa un request HTTP/1.1 parseado
#[derive(Debug, Clone)]
pub struct Request {
    /// Método HTTP
    method: Method,

    /// URI tal como llegó (sin decodificar ni separar query)
    path: String,

    /// Headers con el nombre tal como llegó; el último duplicado gana
    headers: HashMap<String, String>,

    /// Body, solo presente si el request declaró `Content-Length`
    body: Option<Vec<u8>>,

    /// Origen de la conexión (para logs y rate limiting)
    peer: Option<SocketAddr>,
}

impl Request {
    pub fn new(
        method: Method,
        path: impl Into<String>,
        headers: HashMap<String, String>,
        body: Option<Vec<u8>>,
        peer: Option<SocketAddr>,
    ) -> Self {
        Self {
            method,
            path: path.into(),
            headers,
            body,
            peer,
        }
    }

    /// Parsea un request completo desde memoria
    ///
    /// # Ejemplo
    ///
    /// ```
    /// use rest_server::http::{Method, Request};
    ///
    /// let raw = b"GET /users/42 HTTP/1.1\r\nHost: localhost\r\n\r\n";
    /// let request = Request::parse(raw).unwrap();
    ///
    /// assert_eq!(request.method(), Method::GET);
    /// assert_eq!(request.path(), "/users/42");
    /// assert_eq!(request.header("Host"), Some("localhost"));
    /// ```
    pub fn parse(buffer: &[u8]) -> Result<Self, ReadError> {
        RequestReader::new(buffer).read_request(None)
    }

    // === Métodos públicos para acceder a los campos ===

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Obtiene un header por su nombre exacto
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(|s| s.as_str())
    }

    /// Obtiene un header ignorando mayúsculas/minúsculas en el nombre
    pub fn header_ignore_case(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    /// Body como texto si es UTF-8 válido
    pub fn body_str(&self) -> Option<&str> {
        self.body().and_then(|b| std::str::from_utf8(b).ok())
    }

    pub fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }

    /// `true` si el cliente pidió `Connection: close`
    pub fn wants_close(&self) -> bool {
        self.header_ignore_case("Connection")
            .is_some_and(|value| value.eq_ignore_ascii_case("close"))
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_from_str() {
        assert_eq!("PATCH".parse::<Method>().unwrap(), Method::PATCH);
        assert!("get".parse::<Method>().is_err());
        assert!("HEAD".parse::<Method>().is_err());
    }

    #[test]
    fn test_requires_length() {
        assert!(Method::POST.requires_length());
        assert!(Method::PUT.requires_length());
        assert!(Method::PATCH.requires_length());
        assert!(!Method::GET.requires_length());
        assert!(!Method::DELETE.requires_length());
    }

    #[test]
    fn test_wants_close_is_case_insensitive() {
        let mut headers = HashMap::new();
        headers.insert("connection".to_string(), "CLOSE".to_string());
        let request = Request::new(Method::GET, "/", headers, None, None);
        assert!(request.wants_close());

        let request = Request::new(Method::GET, "/", HashMap::new(), None, None);
        assert!(!request.wants_close());
    }

    #[test]
    fn test_header_lookup() {
        let mut headers = HashMap::new();
        headers.insert("X-Token".to_string(), "abc".to_string());
        let request = Request::new(Method::GET, "/", headers, None, None);

        assert_eq!(request.header("X-Token"), Some("abc"));
        assert_eq!(request.header("x-token"), None);
        assert_eq!(request.header_ignore_case("x-token"), Some("abc"));
    }

    #[test]
    fn test_body_str() {
        let request = Request::new(Method::POST, "/", HashMap::new(), Some(b"hola".to_vec()), None);
        assert_eq!(request.body_str(), Some("hola"));

        let request = Request::new(Method::POST, "/", HashMap::new(), Some(vec![0xFF]), None);
        assert_eq!(request.body_str(), None);
    }

    #[test]
    fn test_display() {
        let request = Request::new(Method::DELETE, "/items/1", HashMap::new(), None, None);
        assert_eq!(request.to_string(), "DELETE /items/1");
    }
}
