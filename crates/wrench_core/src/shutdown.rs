//! Token de encerramento compartilhado entre o handler de sinal e os loops.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Granularidade máxima de uma espera interrompível.
const SLEEP_SLICE: Duration = Duration::from_millis(50);

/// Flag de "continuar rodando", clonável entre threads.
///
/// Todos os clones observam o mesmo estado; [`cancel`](Self::cancel) é
/// irreversível.
#[derive(Debug, Clone)]
pub struct ShutdownToken {
    running: Arc<AtomicBool>,
}

impl ShutdownToken {
    pub fn new() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Solicita o encerramento de todos os loops que observam o token.
    pub fn cancel(&self) {
        self.running.store(false, Ordering::Relaxed);
    }

    /// Dorme até `duration`, acordando em no máximo [`SLEEP_SLICE`] após o cancelamento.
    ///
    /// Retorna `false` se o token foi cancelado antes do fim da espera.
    pub fn sleep(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        loop {
            if !self.is_running() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            std::thread::sleep((deadline - now).min(SLEEP_SLICE));
        }
    }
}

impl Default for ShutdownToken {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_state() {
        let token = ShutdownToken::new();
        let clone = token.clone();
        assert!(clone.is_running());
        token.cancel();
        assert!(!clone.is_running());
    }

    #[test]
    fn sleep_completes_when_running() {
        let token = ShutdownToken::new();
        let start = Instant::now();
        assert!(token.sleep(Duration::from_millis(20)));
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn sleep_returns_early_on_cancel() {
        let token = ShutdownToken::new();
        let canceller = token.clone();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(30));
            canceller.cancel();
        });

        let start = Instant::now();
        assert!(!token.sleep(Duration::from_secs(10)));
        assert!(start.elapsed() < Duration::from_secs(2));
        handle.join().unwrap();
    }
}
