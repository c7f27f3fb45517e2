//! # Control de Admisión
//! src/server/rate_limit.rs
//!
//! Decide, antes de gastar un worker, si una conexión recién aceptada se
//! atiende o se rechaza con 429.

use crate::http::StatusCode;
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Respuesta para conexiones rechazadas por admisión: solo status line y
/// `Content-Length: 0`, sin pasar por el router
pub fn too_many_requests() -> Vec<u8> {
    format!("HTTP/1.1 {}\r\nContent-Length: 0\r\n\r\n", StatusCode::TooManyRequests).into_bytes()
}

/// Política de admisión consultada por el acceptor
pub trait Admission: Send + Sync {
    /// `true` si la conexión desde `ip` puede pasar al pool
    fn admit(&self, ip: IpAddr) -> bool;
}

/// Limitador por IP con ventana fija
///
/// Cuenta las conexiones admitidas por IP dentro de la ventana actual y
/// rechaza las que superen `limit`. La ventana se reinicia en la primera
/// consulta posterior a su vencimiento.
///
/// # Ejemplo
/// ```
/// use rest_server::server::{Admission, RateLimiter};
/// use std::net::{IpAddr, Ipv4Addr};
///
/// let limiter = RateLimiter::new(2);
/// let ip = IpAddr::V4(Ipv4Addr::LOCALHOST);
///
/// assert!(limiter.admit(ip));
/// assert!(limiter.admit(ip));
/// assert!(!limiter.admit(ip));
/// ```
pub struct RateLimiter {
    limit: u32,
    window: Duration,
    state: Mutex<Window>,
}

struct Window {
    started: Instant,
    counts: HashMap<IpAddr, u32>,
}

impl RateLimiter {
    /// `limit` conexiones por segundo por IP
    pub fn new(limit: u32) -> Self {
        Self::with_window(limit, Duration::from_secs(1))
    }

    pub fn with_window(limit: u32, window: Duration) -> Self {
        Self {
            limit,
            window,
            state: Mutex::new(Window {
                started: Instant::now(),
                counts: HashMap::new(),
            }),
        }
    }
}

impl Admission for RateLimiter {
    fn admit(&self, ip: IpAddr) -> bool {
        let mut window = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        if window.started.elapsed() >= self.window {
            window.counts.clear();
            window.started = Instant::now();
        }

        let count = window.counts.entry(ip).or_insert(0);
        if *count >= self.limit {
            return false;
        }
        *count += 1;
        true
    }
}
