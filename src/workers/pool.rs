//! # Pool Elástico de Workers
//! src/workers/pool.rs
//!
//! Ejecuta unidades de trabajo (una conexión completa) en un conjunto de
//! threads que crece con la demanda y se achica cuando no hay tráfico.
//!
//! ## Estado compartido
//!
//! ```text
//! Mutex<State> ─┬─ queue: VecDeque<Job>   (FIFO acotada)
//!               ├─ live                    (workers vivos)
//!               ├─ busy                    (workers ejecutando un job)
//!               └─ shutdown
//! Condvar      ─── despierta workers cuando llega trabajo
//! ```
//!
//! Toda mutación del estado ocurre con el lock tomado. El job en sí corre
//! sin el lock, así que un handler lento no frena el encolado.
//!
//! ## Ciclo de vida de un worker
//!
//! 1. Nace con un timer de inactividad corto (`startup_timeout`).
//! 2. Espera en la condvar hasta que haya trabajo o venza el timer.
//! 3. Al terminar cada job rearma el timer con `inactive_timeout`.
//! 4. Si el timer vence con la cola vacía y hay más de `min_keep_threads`
//!    vivos, el worker termina. Si no, desarma el timer y espera sin límite.

use std::collections::VecDeque;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, error, warn};

/// Unidad de trabajo que acepta el pool
type Job = Box<dyn FnOnce() + Send + 'static>;

/// Parámetros de dimensionamiento del pool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    /// Máximo de workers vivos al mismo tiempo
    pub max_threads: usize,

    /// Workers que sobreviven aunque estén inactivos
    pub min_keep_threads: usize,

    /// Inactividad tras la cual un worker sobrante termina
    pub inactive_timeout: Duration,

    /// Capacidad de la cola de trabajo pendiente
    pub max_queue: usize,

    /// Timer de un worker recién creado, antes de su primer job
    pub startup_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_threads: 10,
            min_keep_threads: 1,
            inactive_timeout: Duration::from_secs(10),
            max_queue: 100,
            startup_timeout: Duration::from_secs(1),
        }
    }
}

/// Rechazo de un `submit`
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("work queue is full (capacity {capacity})")]
    QueueFull { capacity: usize },

    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[source] io::Error),
}

/// Foto del estado del pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    pub live: usize,
    pub busy: usize,
    pub queued: usize,
}

struct State {
    queue: VecDeque<Job>,
    live: usize,
    busy: usize,
    next_id: usize,
    shutdown: bool,
}

struct Shared {
    state: Mutex<State>,
    available: Condvar,
    config: PoolConfig,
}

impl Shared {
    // Ningún job corre con el lock tomado, así que un lock envenenado
    // igual deja el estado consistente
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Pool de workers con cola acotada y tamaño elástico
///
/// Al hacer drop del pool los workers terminan en cuanto la cola queda vacía.
///
/// # Ejemplo
/// ```
/// use rest_server::workers::{PoolConfig, WorkerPool};
/// use std::sync::mpsc;
///
/// let pool = WorkerPool::new(PoolConfig::default());
/// let (tx, rx) = mpsc::channel();
/// pool.submit(move || tx.send(21 * 2).unwrap()).unwrap();
/// assert_eq!(rx.recv().unwrap(), 42);
/// ```
pub struct WorkerPool {
    shared: Arc<Shared>,
}

impl WorkerPool {
    /// Crea un pool vacío: los workers nacen con el primer `submit`
    pub fn new(config: PoolConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State {
                    queue: VecDeque::new(),
                    live: 0,
                    busy: 0,
                    next_id: 0,
                    shutdown: false,
                }),
                available: Condvar::new(),
                config,
            }),
        }
    }

    /// Encola un job sin bloquear
    ///
    /// Falla con `QueueFull` si la cola está en su capacidad. Si todos los
    /// workers vivos están ocupados y todavía hay margen, arranca uno más.
    pub fn submit<F>(&self, job: F) -> Result<(), PoolError>
    where
        F: FnOnce() + Send + 'static,
    {
        let config = &self.shared.config;
        let mut state = self.shared.lock();

        if state.queue.len() >= config.max_queue {
            return Err(PoolError::QueueFull {
                capacity: config.max_queue,
            });
        }
        state.queue.push_back(Box::new(job));

        if state.busy == state.live && state.live < config.max_threads {
            let id = state.next_id;
            state.next_id += 1;

            match spawn_worker(Arc::clone(&self.shared), id) {
                Ok(()) => {
                    state.live += 1;
                    debug!(worker = id, live = state.live, "worker started");
                }
                Err(e) if state.live == 0 => {
                    // Sin workers nadie consumiría el job
                    state.queue.pop_back();
                    return Err(PoolError::Spawn(e));
                }
                Err(e) => {
                    warn!(error = %e, live = state.live, "could not grow pool, job stays queued");
                }
            }
        }

        drop(state);
        self.shared.available.notify_one();
        Ok(())
    }

    pub fn stats(&self) -> PoolStats {
        let state = self.shared.lock();
        PoolStats {
            live: state.live,
            busy: state.busy,
            queued: state.queue.len(),
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shared.lock().shutdown = true;
        self.shared.available.notify_all();
    }
}

fn spawn_worker(shared: Arc<Shared>, id: usize) -> io::Result<()> {
    thread::Builder::new()
        .name(format!("worker-{}", id))
        .spawn(move || worker_loop(&shared, id))
        .map(|_| ())
}

fn worker_loop(shared: &Shared, id: usize) {
    let config = &shared.config;
    let mut expires_at = Some(Instant::now() + config.startup_timeout);
    let mut state = shared.lock();

    loop {
        if let Some(job) = state.queue.pop_front() {
            state.busy += 1;
            drop(state);

            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(job)) {
                let message = payload
                    .downcast_ref::<&str>()
                    .copied()
                    .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
                    .unwrap_or("unknown panic");
                error!(worker = id, panic = message, "job panicked");
            }

            state = shared.lock();
            state.busy -= 1;
            expires_at = Some(Instant::now() + config.inactive_timeout);
            continue;
        }

        if state.shutdown {
            break;
        }

        match expires_at {
            None => {
                state = shared
                    .available
                    .wait(state)
                    .unwrap_or_else(PoisonError::into_inner);
            }
            Some(deadline) => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    if state.live > config.min_keep_threads {
                        break;
                    }
                    expires_at = None;
                    continue;
                }
                state = shared
                    .available
                    .wait_timeout(state, remaining)
                    .map(|(guard, _)| guard)
                    .unwrap_or_else(|poisoned| poisoned.into_inner().0);
            }
        }
    }

    state.live -= 1;
    debug!(worker = id, live = state.live, "worker exited");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        condition()
    }

    /// Bloquea los jobs hasta que el test lo libere
    #[derive(Clone, Default)]
    struct Gate(Arc<AtomicBool>);

    impl Gate {
        fn wait(&self) {
            while !self.0.load(Ordering::SeqCst) {
                thread::sleep(Duration::from_millis(5));
            }
        }

        fn open(&self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    fn config(max_threads: usize, min_keep_threads: usize, max_queue: usize) -> PoolConfig {
        PoolConfig {
            max_threads,
            min_keep_threads,
            inactive_timeout: Duration::from_millis(100),
            max_queue,
            startup_timeout: Duration::from_millis(50),
        }
    }

    // Encola un job bloqueado y espera a que un worker lo tome
    fn submit_blocked(pool: &WorkerPool, gate: &Gate) {
        let gate = gate.clone();
        pool.submit(move || gate.wait()).unwrap();
        assert!(wait_until(Duration::from_secs(2), || pool.stats().queued == 0));
    }

    #[test]
    fn test_runs_all_jobs() {
        let pool = WorkerPool::new(config(4, 1, 100));
        let counter = Arc::new(AtomicUsize::new(0));

        for _ in 0..20 {
            let counter = Arc::clone(&counter);
            pool.submit(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        }

        assert!(wait_until(Duration::from_secs(2), || counter.load(Ordering::SeqCst) == 20));
    }

    #[test]
    fn test_queue_full_rejects_immediately() {
        let pool = WorkerPool::new(config(1, 1, 2));
        let gate = Gate::default();

        submit_blocked(&pool, &gate);
        for _ in 0..2 {
            let gate = gate.clone();
            pool.submit(move || gate.wait()).unwrap();
        }

        let started = Instant::now();
        let result = pool.submit(|| {});
        assert!(matches!(result, Err(PoolError::QueueFull { capacity: 2 })));
        assert!(started.elapsed() < Duration::from_millis(100));

        gate.open();
        assert!(wait_until(Duration::from_secs(2), || pool.stats().queued == 0));
    }

    #[test]
    fn test_live_never_exceeds_max() {
        let pool = WorkerPool::new(config(3, 1, 100));
        let gate = Gate::default();

        for _ in 0..3 {
            submit_blocked(&pool, &gate);
        }
        for _ in 0..7 {
            let gate = gate.clone();
            pool.submit(move || gate.wait()).unwrap();
        }

        assert_eq!(
            pool.stats(),
            PoolStats {
                live: 3,
                busy: 3,
                queued: 7
            }
        );

        gate.open();
        assert!(wait_until(Duration::from_secs(2), || {
            let stats = pool.stats();
            stats.busy == 0 && stats.queued == 0
        }));
        assert!(pool.stats().live <= 3);
    }

    #[test]
    fn test_no_spawn_when_idle_worker_exists() {
        let pool = WorkerPool::new(PoolConfig {
            startup_timeout: Duration::from_secs(5),
            inactive_timeout: Duration::from_secs(5),
            ..config(4, 1, 100)
        });
        let done = Arc::new(AtomicUsize::new(0));

        for round in 1..=5 {
            let counter = Arc::clone(&done);
            pool.submit(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
            assert!(wait_until(Duration::from_secs(2), || {
                let stats = pool.stats();
                done.load(Ordering::SeqCst) == round && stats.busy == 0
            }));
        }

        assert_eq!(pool.stats().live, 1);
    }

    #[test]
    fn test_idle_workers_reaped_down_to_min_keep() {
        let pool = WorkerPool::new(config(3, 1, 100));
        let gate = Gate::default();

        for _ in 0..3 {
            submit_blocked(&pool, &gate);
        }
        assert_eq!(pool.stats().live, 3);

        gate.open();
        assert!(wait_until(Duration::from_secs(3), || pool.stats().live == 1));

        // El mínimo se mantiene aunque pase mucho más que el timeout
        thread::sleep(Duration::from_millis(400));
        assert_eq!(pool.stats().live, 1);
    }

    #[test]
    fn test_min_keep_zero_reaps_everything_and_regrows() {
        let pool = WorkerPool::new(config(2, 0, 100));
        let gate = Gate::default();

        submit_blocked(&pool, &gate);
        gate.open();
        assert!(wait_until(Duration::from_secs(3), || pool.stats().live == 0));

        let (tx, rx) = std::sync::mpsc::channel();
        pool.submit(move || tx.send(()).unwrap()).unwrap();
        assert!(rx.recv_timeout(Duration::from_secs(2)).is_ok());
    }

    #[test]
    fn test_panicking_job_does_not_leak_busy() {
        let pool = WorkerPool::new(config(1, 1, 100));
        pool.submit(|| panic!("job bug")).unwrap();

        let (tx, rx) = std::sync::mpsc::channel();
        pool.submit(move || tx.send(()).unwrap()).unwrap();
        assert!(rx.recv_timeout(Duration::from_secs(2)).is_ok());

        assert!(wait_until(Duration::from_secs(2), || pool.stats().busy == 0));
        assert_eq!(pool.stats().live, 1);
    }

    #[test]
    fn test_drop_stops_workers() {
        let pool = WorkerPool::new(PoolConfig {
            inactive_timeout: Duration::from_secs(60),
            startup_timeout: Duration::from_secs(60),
            ..config(2, 2, 100)
        });
        pool.submit(|| {}).unwrap();
        assert!(wait_until(Duration::from_secs(2), || pool.stats().busy == 0
            && pool.stats().queued == 0));

        let shared = Arc::clone(&pool.shared);
        drop(pool);
        assert!(wait_until(Duration::from_secs(2), || shared.lock().live == 0));
    }
}
