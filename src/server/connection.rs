//! # Motor de Conexión
//! src/server/connection.rs
//!
//! Atiende todos los requests de una conexión en el mismo worker:
//!
//! ```text
//! loop {
//!     armar deadline → leer request → router.dispatch → escribir respuesta
//! } hasta: Connection: close | timeout (408) | EOF | error de I/O
//! ```
//!
//! Los errores de protocolo (400, 411, 505) se contestan y la conexión
//! sigue abierta. Un timeout se contesta con 408 y se cierra. Si el request
//! no deja saber dónde termina (`ReadError::Framing`) se contesta 400 y se
//! cierra, descartando lo que quede del request. Un error de I/O cierra sin
//! intentar responder.

use super::deadline::DeadlineStream;
use crate::http::{HttpError, ReadError, RequestReader, Response, StatusCode};
use crate::router::Router;
use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

/// Tiempo máximo descartando input antes de cerrar tras un error de framing
const LINGER: Duration = Duration::from_millis(500);

/// Bytes máximos descartados antes de cerrar
const LINGER_BYTES: u64 = 64 * 1024;

/// Una conexión aceptada, lista para ejecutarse en un worker
pub struct Connection {
    reader: RequestReader<DeadlineStream>,
    writer: TcpStream,
    peer: Option<SocketAddr>,
    router: Arc<Router>,
    read_timeout: Duration,
}

impl Connection {
    pub fn new(stream: TcpStream, router: Arc<Router>, read_timeout: Duration) -> io::Result<Self> {
        let peer = stream.peer_addr().ok();
        let writer = stream.try_clone()?;

        Ok(Self {
            reader: RequestReader::new(DeadlineStream::new(stream)),
            writer,
            peer,
            router,
            read_timeout,
        })
    }

    /// Procesa requests hasta que la conexión deba cerrarse
    pub fn run(mut self) {
        let peer = self.peer;
        debug!(?peer, "connection opened");
        let mut served = 0usize;
        let mut drain = false;

        loop {
            self.reader.get_mut().arm(self.read_timeout);

            let (response, close) = match self.reader.read_request(peer) {
                Ok(request) => {
                    self.reader.get_mut().disarm();
                    let response = self.router.dispatch(&request);
                    if StatusCode::is_server_error(response.code()) {
                        error!(?peer, %request, code = response.code(), "request failed");
                    } else {
                        info!(?peer, %request, code = response.code(), "request served");
                    }
                    (response, request.wants_close())
                }
                Err(ReadError::Closed) => break,
                Err(ReadError::Timeout) => {
                    debug!(?peer, "read timed out");
                    (self.router.render_error(&HttpError::request_timeout()), true)
                }
                Err(ReadError::Http(e)) => {
                    debug!(?peer, code = e.code(), "malformed request");
                    (self.router.render_error(&e), false)
                }
                Err(ReadError::Framing(e)) => {
                    debug!(?peer, code = e.code(), "request framing lost");
                    drain = true;
                    (self.router.render_error(&e), true)
                }
                Err(ReadError::Io(e)) => {
                    debug!(?peer, error = %e, "connection error");
                    break;
                }
            };

            if let Err(e) = self.write(&response, close) {
                debug!(?peer, error = %e, "failed to write response");
                break;
            }
            served += 1;

            if close {
                break;
            }
        }

        if let Err(e) = self.writer.shutdown(Shutdown::Write) {
            debug!(?peer, error = %e, "shutdown failed");
        }
        if drain {
            self.discard_input();
        }
        debug!(?peer, served, "connection closed");
    }

    // Cerrar con bytes sin leer hace que el kernel mande RST, y el cliente
    // puede perder la respuesta que ya se le escribió
    fn discard_input(&mut self) {
        let stream = self.reader.get_mut();
        stream.arm(self.read_timeout.min(LINGER));

        let mut rest = stream.by_ref().take(LINGER_BYTES);
        if let Err(e) = io::copy(&mut rest, &mut io::sink()) {
            debug!(peer = ?self.peer, error = %e, "stopped discarding input");
        }
    }

    // La respuesta completa sale en un solo write
    fn write(&mut self, response: &Response, close: bool) -> io::Result<()> {
        self.writer.write_all(&response.to_bytes(close))?;
        self.writer.flush()
    }
}
