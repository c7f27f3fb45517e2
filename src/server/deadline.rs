//! # Lectura con Deadline
//! src/server/deadline.rs
//!
//! Envuelve un `TcpStream` para que todas las lecturas de un mismo request
//! compartan un único deadline. Antes de cada `read` se recalcula el tiempo
//! restante y se aplica como read timeout nativo del socket, así que no hace
//! falta un thread timer que cierre el socket desde afuera.

use std::io::{self, Read};
use std::net::TcpStream;
use std::time::{Duration, Instant};

pub struct DeadlineStream {
    stream: TcpStream,
    deadline: Option<Instant>,
}

impl DeadlineStream {
    pub fn new(stream: TcpStream) -> Self {
        Self {
            stream,
            deadline: None,
        }
    }

    /// Inicia la cuenta regresiva para el próximo request
    pub fn arm(&mut self, timeout: Duration) {
        self.deadline = Some(Instant::now() + timeout);
    }

    /// Quita el deadline: las lecturas vuelven a bloquear sin límite
    pub fn disarm(&mut self) {
        self.deadline = None;
    }
}

impl Read for DeadlineStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.deadline {
            Some(deadline) => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                // Un timeout de cero es inválido para el socket
                if remaining.is_zero() {
                    return Err(io::Error::new(io::ErrorKind::TimedOut, "read deadline expired"));
                }
                self.stream.set_read_timeout(Some(remaining))?;
            }
            None => self.stream.set_read_timeout(None)?,
        }
        self.stream.read(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::net::TcpListener;

    fn pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let client = TcpStream::connect(listener.local_addr().unwrap()).unwrap();
        let (server, _) = listener.accept().unwrap();
        (client, server)
    }

    fn is_timeout(err: &io::Error) -> bool {
        matches!(err.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock)
    }

    #[test]
    fn test_read_without_deadline() {
        let (mut client, server) = pair();
        let mut stream = DeadlineStream::new(server);

        client.write_all(b"hola").unwrap();
        let mut buf = [0u8; 4];
        stream.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"hola");
    }

    #[test]
    fn test_deadline_interrupts_silent_peer() {
        let (_client, server) = pair();
        let mut stream = DeadlineStream::new(server);
        stream.arm(Duration::from_millis(100));

        let started = Instant::now();
        let mut buf = [0u8; 16];
        let err = stream.read(&mut buf).unwrap_err();

        assert!(is_timeout(&err));
        assert!(started.elapsed() >= Duration::from_millis(80));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn test_expired_deadline_fails_without_blocking() {
        let (_client, server) = pair();
        let mut stream = DeadlineStream::new(server);
        stream.arm(Duration::from_millis(1));
        std::thread::sleep(Duration::from_millis(10));

        let mut buf = [0u8; 16];
        let err = stream.read(&mut buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
    }

    #[test]
    fn test_deadline_spans_several_reads() {
        let (mut client, server) = pair();
        let mut stream = DeadlineStream::new(server);
        stream.arm(Duration::from_millis(300));

        // Datos que llegan a tiempo no agotan el deadline
        client.write_all(b"ab").unwrap();
        let mut buf = [0u8; 2];
        stream.read_exact(&mut buf).unwrap();

        // Pero el tiempo ya consumido cuenta para la siguiente lectura
        let started = Instant::now();
        let err = stream.read(&mut buf).unwrap_err();
        assert!(is_timeout(&err));
        assert!(started.elapsed() < Duration::from_millis(1500));

        stream.disarm();
        client.write_all(b"cd").unwrap();
        stream.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"cd");
    }
}
