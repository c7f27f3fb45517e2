//! # Códigos de Estado HTTP
//! src/http/status.rs
//!
//! Códigos de estado que el servidor produce por sí mismo. Los handlers
//! pueden responder con cualquier otro código usando `Response::with_code`
//! o `HttpError::new`; este enum solo cubre los que genera el núcleo.
//!
//! - **2xx**: Éxito (200 OK)
//! - **4xx**: Error del cliente (400, 404, 405, 408, 411, 429)
//! - **5xx**: Error del servidor (500, 505)

/// Códigos de estado HTTP conocidos por el servidor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    /// 200 OK - La petición fue exitosa
    Ok = 200,

    /// 400 Bad Request - Request line o headers malformados
    BadRequest = 400,

    /// 404 Not Found - Ningún patrón registrado coincide con el path
    NotFound = 404,

    /// 405 Method Not Allowed - El path existe pero no para ese método
    MethodNotAllowed = 405,

    /// 408 Request Timeout - El cliente no envió el request a tiempo
    RequestTimeout = 408,

    /// 411 Length Required - POST/PUT/PATCH sin `Content-Length`
    LengthRequired = 411,

    /// 429 Too Many Requests - Rate limiting activado
    TooManyRequests = 429,

    /// 500 Internal Server Error - Falla inesperada de un handler
    InternalServerError = 500,

    /// 505 HTTP Version Not Supported - Versión distinta de HTTP/1.1
    HttpVersionNotSupported = 505,
}

impl StatusCode {
    /// Convierte el código a su valor numérico
    ///
    /// # Ejemplo
    /// ```
    /// use rest_server::http::StatusCode;
    /// assert_eq!(StatusCode::Ok.as_u16(), 200);
    /// ```
    pub fn as_u16(&self) -> u16 {
        *self as u16
    }

    /// Retorna el texto de razón (reason phrase) asociado al código
    ///
    /// # Ejemplo
    /// ```
    /// use rest_server::http::StatusCode;
    /// assert_eq!(StatusCode::LengthRequired.reason_phrase(), "Length Required");
    /// ```
    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::NotFound => "Not Found",
            StatusCode::MethodNotAllowed => "Method Not Allowed",
            StatusCode::RequestTimeout => "Request Timeout",
            StatusCode::LengthRequired => "Length Required",
            StatusCode::TooManyRequests => "Too Many Requests",
            StatusCode::InternalServerError => "Internal Server Error",
            StatusCode::HttpVersionNotSupported => "HTTP Version Not Supported",
        }
    }

    /// Verifica si un código numérico es error del servidor (5xx)
    pub fn is_server_error(code: u16) -> bool {
        (500..600).contains(&code)
    }
}

impl std::fmt::Display for StatusCode {
    /// Formato: "200 OK"
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.as_u16(), self.reason_phrase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_code_values() {
        assert_eq!(StatusCode::Ok.as_u16(), 200);
        assert_eq!(StatusCode::MethodNotAllowed.as_u16(), 405);
        assert_eq!(StatusCode::RequestTimeout.as_u16(), 408);
        assert_eq!(StatusCode::HttpVersionNotSupported.as_u16(), 505);
    }

    #[test]
    fn test_reason_phrases() {
        assert_eq!(StatusCode::Ok.reason_phrase(), "OK");
        assert_eq!(StatusCode::TooManyRequests.reason_phrase(), "Too Many Requests");
        assert_eq!(
            StatusCode::HttpVersionNotSupported.reason_phrase(),
            "HTTP Version Not Supported"
        );
    }

    #[test]
    fn test_error_classes() {
        assert!(StatusCode::is_server_error(500));
        assert!(StatusCode::is_server_error(599));
        assert!(!StatusCode::is_server_error(499));
        assert!(!StatusCode::is_server_error(200));
    }

    #[test]
    fn test_display() {
        assert_eq!(StatusCode::Ok.to_string(), "200 OK");
        assert_eq!(StatusCode::RequestTimeout.to_string(), "408 Request Timeout");
    }
}
