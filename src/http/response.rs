//! # Construcción de Respuestas HTTP
//! src/http/response.rs
//!
//! Una `Response` es un valor inmutable que arma el handler (o el
//! `ErrorRenderer`) y que la conexión serializa exactamente una vez.
//!
//! ## Formato en el cable
//!
//! ```text
//! HTTP/1.1 200 OK\r\n
//! Connection: keep-alive\r\n
//! Content-Type: application/json\r\n
//! Content-Length: 13\r\n
//! Server: rest_server\r\n
//! X-Extra: valor\r\n          <- bloque de headers extra, tal cual
//! \r\n
//! {"ok": true}\r\n
//! ```
//!
//! ## Ejemplo de uso
//!
//! ```
//! use rest_server::http::{Response, StatusCode};
//!
//! let response = Response::new(StatusCode::Ok)
//!     .with_content_type("application/json")
//!     .with_body(r#"{"message": "Hello"}"#);
//!
//! let bytes = response.to_bytes(false);
//! assert!(bytes.starts_with(b"HTTP/1.1 200 OK\r\n"));
//! ```

use super::{StatusCode, APPLICATION_JSON, SERVER_NAME, TEXT_HTML, TEXT_PLAIN};

/// Representa una respuesta HTTP/1.1 completa
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Código de estado (200, 404, 499, ...)
    code: u16,

    /// Texto de razón que acompaña al código
    reason: String,

    /// Tipo MIME, puede incluir `; charset=...`
    content_type: String,

    /// Headers extra ya formateados, unidos por `\r\n`, sin separador final
    headers: String,

    /// Cuerpo como bytes: no asume ningún charset
    body: Vec<u8>,
}

impl Response {
    /// Crea una respuesta vacía `text/plain` con un código conocido
    pub fn new(status: StatusCode) -> Self {
        Self::with_code(status.as_u16(), status.reason_phrase())
    }

    /// Crea una respuesta vacía con código y texto de razón arbitrarios
    ///
    /// # Ejemplo
    /// ```
    /// use rest_server::http::Response;
    ///
    /// let response = Response::with_code(499, "Client Closed Request");
    /// assert_eq!(response.code(), 499);
    /// ```
    pub fn with_code(code: u16, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
            content_type: TEXT_PLAIN.to_string(),
            headers: String::new(),
            body: Vec::new(),
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    /// Reemplaza el bloque de headers extra
    ///
    /// Se escribe tal cual después de los headers fijos, así que el caller
    /// es responsable del formato (`A: 1\r\nB: 2`).
    pub fn with_headers(mut self, headers: impl Into<String>) -> Self {
        self.headers = headers.into();
        self
    }

    /// Establece el cuerpo desde bytes o desde un string
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// 200 `text/plain; charset=utf-8`
    pub fn text(body: &str) -> Self {
        Self::new(StatusCode::Ok)
            .with_content_type("text/plain; charset=utf-8")
            .with_body(body)
    }

    /// 200 `application/json`
    pub fn json(body: &str) -> Self {
        Self::new(StatusCode::Ok)
            .with_content_type(APPLICATION_JSON)
            .with_body(body)
    }

    /// 200 `text/html`
    pub fn html(body: &str) -> Self {
        Self::new(StatusCode::Ok)
            .with_content_type(TEXT_HTML)
            .with_body(body)
    }

    /// Serializa la respuesta completa en un solo buffer
    ///
    /// `close` decide el valor del header `Connection`. `Content-Length`
    /// siempre se calcula sobre los bytes del body, incluso si está vacío.
    pub fn to_bytes(&self, close: bool) -> Vec<u8> {
        let mut head = format!(
            "HTTP/1.1 {} {}\r\nConnection: {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nServer: {}\r\n",
            self.code,
            self.reason,
            if close { "close" } else { "keep-alive" },
            self.content_type,
            self.body.len(),
            SERVER_NAME,
        );

        if !self.headers.is_empty() {
            head.push_str(&self.headers);
            head.push_str("\r\n");
        }
        head.push_str("\r\n");

        let mut result = Vec::with_capacity(head.len() + self.body.len() + 2);
        result.extend(head.chars().map(latin1_byte));
        result.extend_from_slice(&self.body);
        result.extend_from_slice(b"\r\n");
        result
    }

    pub fn code(&self) -> u16 {
        self.code
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn headers(&self) -> &str {
        &self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }
}

// El head viaja en ISO-8859-1; lo que no cabe en un byte se reemplaza por '?'
fn latin1_byte(c: char) -> u8 {
    u8::try_from(u32::from(c)).unwrap_or(b'?')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_response() {
        let response = Response::new(StatusCode::Ok);
        assert_eq!(response.code(), 200);
        assert_eq!(response.reason(), "OK");
        assert_eq!(response.content_type(), "text/plain");
        assert!(response.headers().is_empty());
        assert!(response.body().is_empty());
    }

    #[test]
    fn test_json_response() {
        let response = Response::json(r#"{"status": "ok"}"#);
        assert_eq!(response.content_type(), "application/json");
        assert_eq!(response.body(), br#"{"status": "ok"}"#);
    }

    #[test]
    fn test_to_bytes_keep_alive() {
        let response = Response::new(StatusCode::Ok).with_body("Test");
        let text = String::from_utf8(response.to_bytes(false)).unwrap();

        assert_eq!(
            text,
            "HTTP/1.1 200 OK\r\n\
             Connection: keep-alive\r\n\
             Content-Type: text/plain\r\n\
             Content-Length: 4\r\n\
             Server: rest_server\r\n\
             \r\n\
             Test\r\n"
        );
    }

    #[test]
    fn test_to_bytes_close_with_extra_headers() {
        let response = Response::with_code(405, "Method Not Allowed")
            .with_headers("Allow: GET, POST\r\nX-Trace: 1");
        let text = String::from_utf8(response.to_bytes(true)).unwrap();

        assert!(text.starts_with("HTTP/1.1 405 Method Not Allowed\r\nConnection: close\r\n"));
        assert!(text.contains("Server: rest_server\r\nAllow: GET, POST\r\nX-Trace: 1\r\n\r\n"));
    }

    #[test]
    fn test_empty_body_still_has_length() {
        let text = String::from_utf8(Response::new(StatusCode::Ok).to_bytes(false)).unwrap();
        assert!(text.contains("Content-Length: 0\r\n"));
        assert!(text.ends_with("\r\n\r\n\r\n"));
    }

    #[test]
    fn test_content_length_counts_bytes_not_chars() {
        // "zażółć" son 6 caracteres pero 10 bytes en UTF-8
        let response = Response::text("zażółć");
        let bytes = response.to_bytes(false);
        let text = String::from_utf8(bytes).unwrap();

        assert!(text.contains("Content-Length: 10\r\n"));
        assert!(text.contains("zażółć"));
    }

    #[test]
    fn test_binary_body() {
        let binary_data = vec![0x00, 0x01, 0x02, 0xFF];
        let response = Response::new(StatusCode::Ok).with_body(binary_data.clone());
        let bytes = response.to_bytes(false);

        assert!(bytes.windows(4).any(|w| w == binary_data.as_slice()));
    }
}
