//! SIGINT/SIGTERM → run cancellation.
//!
//! Analyzers run in their own process groups, so a terminal interrupt only
//! reaches this process. The handler records it; a watcher thread turns it
//! into a `CancelToken` cancel, which kills every in-flight step's group.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use secsweep_core::exec::CancelToken;
use tracing::warn;

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

pub fn interrupted() -> bool {
    INTERRUPTED.load(Ordering::SeqCst)
}

#[cfg(unix)]
extern "C" fn on_signal(_signal: libc::c_int) {
    // Only async-signal-safe work here.
    INTERRUPTED.store(true, Ordering::SeqCst);
}

#[cfg(unix)]
fn install_handlers() {
    for signal in [libc::SIGINT, libc::SIGTERM] {
        // SAFETY: `on_signal` only stores to an atomic, which is
        // async-signal-safe, and has the signature `signal` expects.
        let previous = unsafe { libc::signal(signal, on_signal as libc::sighandler_t) };
        if previous == libc::SIG_ERR {
            warn!("Could not install handler for signal {signal}");
        }
    }
}

#[cfg(not(unix))]
fn install_handlers() {}

/// Cancel `token` once an interrupt arrives. The watcher thread lives for
/// the rest of the process.
pub fn cancel_on_interrupt(token: CancelToken) {
    install_handlers();
    thread::spawn(move || {
        while !interrupted() {
            thread::sleep(Duration::from_millis(50));
        }
        warn!("Interrupted; cancelling in-flight steps");
        token.cancel();
    });
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn sigint_cancels_the_token() {
        let token = CancelToken::new();
        cancel_on_interrupt(token.clone());

        // SAFETY: raising a signal we just installed a handler for.
        assert_eq!(unsafe { libc::raise(libc::SIGINT) }, 0);

        let deadline = Instant::now() + Duration::from_secs(5);
        while !token.is_cancelled() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(20));
        }
        assert!(interrupted());
        assert!(token.is_cancelled());
    }
}
