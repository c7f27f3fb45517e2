//! # Parser de Requests HTTP/1.1
//! src/http/reader.rs
//!
//! Lee requests de un stream bloqueante, uno a la vez, para que la misma
//! conexión pueda reutilizarse (keep-alive). El parser no sabe nada de
//! sockets: el timeout llega como un `io::Error` de tipo `TimedOut` o
//! `WouldBlock` desde el stream de abajo (ver `server::deadline`).
//!
//! ## Pasos
//!
//! 1. Request line: exactamente 3 tokens separados por espacios
//! 2. Versión: solo `HTTP/1.1` (otra versión bien formada → 505)
//! 3. Método: GET, POST, PUT, PATCH o DELETE
//! 4. Headers hasta la línea en blanco, partidos en el primer `:`
//! 5. POST/PUT/PATCH sin `Content-Length` → 411
//! 6. Body de exactamente `Content-Length` bytes
//!
//! Si el request no deja claro dónde termina (línea de más de 8 KiB,
//! `Content-Length` inválido o contradictorio) el error es `Framing`: el
//! resto del stream ya no se puede interpretar y la conexión debe cerrarse.

use super::{HttpError, Method, Request};
use std::collections::HashMap;
use std::io::{self, BufRead, BufReader, Read};
use std::net::SocketAddr;
use thiserror::Error;

/// Única versión de protocolo aceptada
pub const SUPPORTED_VERSION: &str = "HTTP/1.1";

/// Largo máximo de la request line o de un header
const MAX_LINE_LEN: usize = 8 * 1024;

/// Tamaño de cada lectura del body
const BODY_CHUNK: usize = 1024;

/// Resultado fallido de leer un request
#[derive(Debug, Error)]
pub enum ReadError {
    /// El cliente cerró sin mandar ni un byte: fin normal de la conexión
    #[error("connection closed by peer")]
    Closed,

    /// Venció el plazo de lectura antes de tener el request completo
    #[error("request read timed out")]
    Timeout,

    /// Error de conexión (stream cortado a mitad de mensaje, reset, ...)
    #[error("connection error: {0}")]
    Io(io::Error),

    /// Request inválido que sí se puede contestar (400, 411, 505)
    #[error(transparent)]
    Http(#[from] HttpError),

    /// Request inválido que además deja el stream desalineado: se contesta
    /// y se cierra
    #[error("request framing lost: {0}")]
    Framing(HttpError),
}

impl From<io::Error> for ReadError {
    fn from(error: io::Error) -> Self {
        match error.kind() {
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => ReadError::Timeout,
            _ => ReadError::Io(error),
        }
    }
}

/// Lee requests sucesivos desde un stream
pub struct RequestReader<R> {
    inner: BufReader<R>,
}

impl<R: Read> RequestReader<R> {
    pub fn new(stream: R) -> Self {
        Self {
            inner: BufReader::new(stream),
        }
    }

    /// Acceso al stream de abajo (para armar el plazo de lectura)
    pub fn get_mut(&mut self) -> &mut R {
        self.inner.get_mut()
    }

    /// Lee y valida el siguiente request completo
    ///
    /// # Ejemplo
    ///
    /// ```
    /// use rest_server::http::{Method, RequestReader};
    ///
    /// let raw: &[u8] = b"GET /a HTTP/1.1\r\n\r\nGET /b HTTP/1.1\r\n\r\n";
    /// let mut reader = RequestReader::new(raw);
    ///
    /// assert_eq!(reader.read_request(None).unwrap().path(), "/a");
    /// assert_eq!(reader.read_request(None).unwrap().path(), "/b");
    /// ```
    pub fn read_request(&mut self, peer: Option<SocketAddr>) -> Result<Request, ReadError> {
        let line = self.read_line()?.ok_or(ReadError::Closed)?;
        let (method, path) = parse_request_line(&line)?;

        let headers = self.read_headers()?;

        let body = match declared_length(method, &headers)? {
            Some(length) => Some(self.read_body(length)?),
            None => None,
        };

        Ok(Request::new(method, path, headers, body, peer))
    }

    /// Lee una línea terminada en `\n` (el `\r` final es opcional)
    ///
    /// Retorna `None` si el stream terminó sin datos. Una última línea sin
    /// terminador antes del EOF cuenta como línea.
    fn read_line(&mut self) -> Result<Option<String>, ReadError> {
        let mut buf = Vec::new();
        let read = self
            .inner
            .by_ref()
            .take(MAX_LINE_LEN as u64 + 2)
            .read_until(b'\n', &mut buf)?;

        if read == 0 {
            return Ok(None);
        }

        // El límite no cuenta el terminador `\r\n`
        if buf.last() == Some(&b'\n') {
            buf.pop();
            if buf.last() == Some(&b'\r') {
                buf.pop();
            }
        }
        if buf.len() > MAX_LINE_LEN {
            return Err(ReadError::Framing(HttpError::bad_request()));
        }

        // ISO-8859-1: cada byte es un char
        Ok(Some(buf.iter().map(|&b| char::from(b)).collect()))
    }

    fn read_headers(&mut self) -> Result<HashMap<String, String>, ReadError> {
        let mut headers = HashMap::new();

        loop {
            let line = self.read_line()?.ok_or_else(|| {
                ReadError::Io(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "client closed while sending headers",
                ))
            })?;

            if line.trim().is_empty() {
                break;
            }

            // Solo el primer ':' separa: "Host: localhost:8080" es válido
            let (name, value) = line.split_once(':').ok_or_else(HttpError::bad_request)?;
            headers.insert(name.trim().to_string(), value.trim().to_string());
        }

        Ok(headers)
    }

    fn read_body(&mut self, length: usize) -> Result<Vec<u8>, ReadError> {
        let mut body = Vec::with_capacity(length.min(64 * BODY_CHUNK));
        let mut chunk = [0u8; BODY_CHUNK];
        let mut remaining = length;

        while remaining > 0 {
            let want = remaining.min(BODY_CHUNK);
            let read = match self.inner.read(&mut chunk[..want]) {
                Ok(read) => read,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };

            if read == 0 {
                return Err(ReadError::Io(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "client closed before end of body",
                )));
            }

            body.extend_from_slice(&chunk[..read]);
            remaining -= read;
        }

        Ok(body)
    }
}

/// Valida la request line y retorna método y path
fn parse_request_line(line: &str) -> Result<(Method, String), HttpError> {
    // Un espacio inicial genera un token vacío al principio
    if line.starts_with(' ') {
        return Err(HttpError::bad_request());
    }

    let tokens: Vec<&str> = line.split(' ').filter(|t| !t.is_empty()).collect();
    let [method, path, version] = tokens.as_slice() else {
        return Err(HttpError::bad_request());
    };

    if *version != SUPPORTED_VERSION {
        return Err(if is_version_shaped(version) {
            HttpError::version_not_supported()
        } else {
            HttpError::bad_request()
        });
    }

    let method = method.parse::<Method>()?;
    Ok((method, path.to_string()))
}

/// `HTTP/<dígitos>` con `.<dígitos>` opcional
fn is_version_shaped(token: &str) -> bool {
    let Some(rest) = token.strip_prefix("HTTP/") else {
        return false;
    };

    let digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    match rest.split_once('.') {
        Some((major, minor)) => digits(major) && digits(minor),
        None => digits(rest),
    }
}

/// Largo del body declarado por el request
///
/// El nombre se compara sin distinguir mayúsculas. Si el request trae
/// variantes del header con valores distintos no hay un largo confiable.
fn declared_length(
    method: Method,
    headers: &HashMap<String, String>,
) -> Result<Option<usize>, ReadError> {
    let mut declared = headers
        .iter()
        .filter(|(name, _)| name.eq_ignore_ascii_case("Content-Length"))
        .map(|(_, value)| value.as_str());

    let Some(value) = declared.next() else {
        if method.requires_length() {
            return Err(HttpError::length_required().into());
        }
        return Ok(None);
    };

    if declared.any(|other| other != value) {
        return Err(ReadError::Framing(HttpError::bad_request()));
    }

    value
        .parse::<usize>()
        .map(Some)
        .map_err(|_| ReadError::Framing(HttpError::bad_request()))
}
