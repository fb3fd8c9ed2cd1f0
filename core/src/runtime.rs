//! Process-wide worker pool for the rayon-parallel stages (RANSAC scoring,
//! partitioning, normal estimation).

use rayon::ThreadPoolBuilder;
use std::env;
use std::sync::OnceLock;

use crate::{Error, Result};

pub const THREADS_ENV: &str = "SCAN_ALIGN_CPU_THREADS";

static POOL_THREADS: OnceLock<std::result::Result<usize, String>> = OnceLock::new();

/// Initialize the global Rayon thread pool and return its size.
///
/// The size comes from `num_threads`, else from `SCAN_ALIGN_CPU_THREADS`,
/// else Rayon's default. Only the first call configures the pool; later
/// calls return the first outcome.
pub fn init_global_thread_pool(num_threads: Option<usize>) -> Result<usize> {
    POOL_THREADS
        .get_or_init(|| {
            let requested = resolve_thread_count(num_threads, env::var(THREADS_ENV).ok())?;
            let mut builder = ThreadPoolBuilder::new();
            if let Some(n) = requested {
                builder = builder.num_threads(n);
            }
            builder.build_global().map_err(|e| e.to_string())?;
            Ok(rayon::current_num_threads())
        })
        .clone()
        .map_err(Error::InvalidInput)
}

pub fn current_cpu_threads() -> usize {
    rayon::current_num_threads()
}

/// `None` leaves the choice to Rayon.
fn resolve_thread_count(
    explicit: Option<usize>,
    from_env: Option<String>,
) -> std::result::Result<Option<usize>, String> {
    let n = match (explicit, from_env) {
        (Some(n), _) => n,
        (None, Some(raw)) => raw
            .trim()
            .parse()
            .map_err(|_| format!("{THREADS_ENV} must be a positive integer, got '{raw}'"))?,
        (None, None) => return Ok(None),
    };
    if n == 0 {
        return Err("thread count must be >= 1".to_string());
    }
    Ok(Some(n))
}
