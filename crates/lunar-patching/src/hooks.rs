//! Deferred actions driven by the host's lifecycle callbacks
//!
//! Nothing here blocks. Actions are queued and run later from
//! [`LifecycleHooks::tick`] (once per host frame), [`LifecycleHooks::fire_main_menu`]
//! or [`LifecycleHooks::fire_shutdown`]. Every action runs panic-isolated.

use crate::clock::{Clock, SystemClock};
use std::any::Any;
use std::cell::RefCell;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;
use std::time::{Duration, Instant};
use tracing::{debug, error};

type OnceAction = Box<dyn FnOnce()>;
type WhileAction = Box<dyn FnMut() -> bool>;

enum Deferred {
    Once(OnceAction),
    While(WhileAction),
}

struct Scheduled {
    due: Instant,
    action: Deferred,
}

#[derive(Default)]
struct HookState {
    scheduled: Vec<Scheduled>,
    main_menu: Vec<OnceAction>,
    shutdown: Vec<OnceAction>,
    main_menu_reached: bool,
    ready: bool,
}

/// Cloneable handle to the shared hook queues
#[derive(Clone)]
pub struct LifecycleHooks {
    state: Rc<RefCell<HookState>>,
    clock: Rc<dyn Clock>,
}

impl std::fmt::Debug for LifecycleHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("LifecycleHooks")
            .field("scheduled", &state.scheduled.len())
            .field("main_menu", &state.main_menu.len())
            .field("shutdown", &state.shutdown.len())
            .field("ready", &state.ready)
            .finish()
    }
}

impl Default for LifecycleHooks {
    fn default() -> Self {
        Self::new(Rc::new(SystemClock))
    }
}

impl LifecycleHooks {
    pub fn new(clock: Rc<dyn Clock>) -> Self {
        Self {
            state: Rc::new(RefCell::new(HookState::default())),
            clock,
        }
    }

    /// Run `action` on the first tick at or after `now + delay`
    pub fn do_once(&self, action: impl FnOnce() + 'static, delay: Duration) {
        let due = self.clock.now() + delay;
        self.state.borrow_mut().scheduled.push(Scheduled {
            due,
            action: Deferred::Once(Box::new(action)),
        });
    }

    /// Run `action` every tick after `delay` for as long as it returns true
    pub fn do_while(&self, action: impl FnMut() -> bool + 'static, delay: Duration) {
        let due = self.clock.now() + delay;
        self.state.borrow_mut().scheduled.push(Scheduled {
            due,
            action: Deferred::While(Box::new(action)),
        });
    }

    /// Run `action` once the main menu is reached
    ///
    /// If it was already reached, the action runs on the next tick instead.
    pub fn do_once_on_main_menu(&self, action: impl FnOnce() + 'static) {
        let reached = self.state.borrow().main_menu_reached;
        if reached {
            self.do_once(action, Duration::ZERO);
        } else {
            self.state.borrow_mut().main_menu.push(Box::new(action));
        }
    }

    /// Run `action` when the host shuts down
    pub fn do_once_on_shutdown(&self, action: impl FnOnce() + 'static) {
        self.state.borrow_mut().shutdown.push(Box::new(action));
    }

    /// Drain everything that is due
    ///
    /// Actions queued while ticking wait for the next tick.
    pub fn tick(&self) {
        let queued = std::mem::take(&mut self.state.borrow_mut().scheduled);
        if queued.is_empty() {
            return;
        }

        let now = self.clock.now();
        let mut remaining = Vec::with_capacity(queued.len());

        for entry in queued {
            if entry.due > now {
                remaining.push(entry);
                continue;
            }
            match entry.action {
                Deferred::Once(action) => {
                    run_isolated("deferred action", action);
                }
                Deferred::While(mut action) => {
                    if run_isolated("repeating action", || action()).unwrap_or(false) {
                        remaining.push(Scheduled {
                            due: now,
                            action: Deferred::While(action),
                        });
                    }
                }
            }
        }

        let mut state = self.state.borrow_mut();
        remaining.append(&mut state.scheduled);
        state.scheduled = remaining;
    }

    /// Main-menu signal; flushes the main-menu queue
    pub fn fire_main_menu(&self) {
        let queued = {
            let mut state = self.state.borrow_mut();
            state.main_menu_reached = true;
            std::mem::take(&mut state.main_menu)
        };
        debug!("Running {} main menu action(s)", queued.len());
        for action in queued {
            run_isolated("main menu action", action);
        }
    }

    /// Shutdown signal; flushes the shutdown queue
    pub fn fire_shutdown(&self) {
        let queued = std::mem::take(&mut self.state.borrow_mut().shutdown);
        debug!("Running {} shutdown action(s)", queued.len());
        for action in queued {
            run_isolated("shutdown action", action);
        }
    }

    pub fn set_ready(&self, ready: bool) {
        self.state.borrow_mut().ready = ready;
    }

    /// Whether deferred actions will be driven by ticks
    pub fn is_ready(&self) -> bool {
        self.state.borrow().ready
    }

    /// Number of actions waiting for a tick
    pub fn pending(&self) -> usize {
        self.state.borrow().scheduled.len()
    }
}

fn run_isolated<T>(what: &str, action: impl FnOnce() -> T) -> Option<T> {
    match panic::catch_unwind(AssertUnwindSafe(action)) {
        Ok(value) => Some(value),
        Err(payload) => {
            error!("Exception in {}: {}", what, panic_message(payload.as_ref()));
            None
        }
    }
}

/// Best-effort text of a panic payload
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
