//! Panic hook for worker threads
//!
//! Panics on worker threads are expected: assertion failures and skips
//! unwind through them. The hook keeps those out of stderr and records the
//! location and backtrace of other panics so the worker can put them in the
//! test log. Panics on any other thread go to the previous hook.

use std::backtrace::{Backtrace, BacktraceStatus};
use std::cell::{Cell, RefCell};
use std::panic;
use std::sync::Once;

/// Where a panic happened
#[derive(Clone, Debug, Default)]
pub struct PanicReport {
    pub location: Option<String>,
    pub backtrace: Option<String>,
}

thread_local! {
    static IS_WORKER: Cell<bool> = const { Cell::new(false) };
    static LAST_PANIC: RefCell<Option<PanicReport>> = const { RefCell::new(None) };
}

static INSTALL: Once = Once::new();

/// Install the hook once per process
pub fn install() {
    INSTALL.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if !IS_WORKER.with(Cell::get) {
                previous(info);
                return;
            }

            let backtrace = Backtrace::capture();
            let report = PanicReport {
                location: info.location().map(ToString::to_string),
                backtrace: match backtrace.status() {
                    BacktraceStatus::Captured => Some(backtrace.to_string()),
                    _ => None,
                },
            };
            LAST_PANIC.with(|slot| *slot.borrow_mut() = Some(report));
        }));
    });
}

/// Mark the current thread as a test worker
pub fn enter_worker() {
    IS_WORKER.with(|w| w.set(true));
}

/// Report of the most recent panic on this thread
pub fn take_report() -> Option<PanicReport> {
    LAST_PANIC.with(|slot| slot.borrow_mut().take())
}
