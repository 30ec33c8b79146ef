//! Common test utilities for lunar-patching
//!
//! - A recording [`PatchApplier`](lunar_patching::PatchApplier) fake
//! - Helpers to build a hook/group environment on a manual clock

#![allow(dead_code)]
#![allow(unused_imports)]

pub mod mocks;

pub use mocks::*;

use lunar_patching::{LifecycleHooks, ManualClock, PatchEnv, PatchGroup};
use std::rc::Rc;
use std::time::Duration;

/// A patch environment wired to a fake applier and a manual clock
pub struct TestEnv {
    pub applier: Rc<FakePatchApplier>,
    pub clock: Rc<ManualClock>,
    pub hooks: LifecycleHooks,
    pub env: PatchEnv,
}

impl TestEnv {
    pub fn new() -> Self {
        let applier = Rc::new(FakePatchApplier::new());
        let clock = Rc::new(ManualClock::new());
        let hooks = LifecycleHooks::new(clock.clone());
        let env = PatchEnv::new(applier.clone(), hooks.clone());
        Self {
            applier,
            clock,
            hooks,
            env,
        }
    }

    /// Hooks marked ready, so removals are deferred through ticks
    pub fn ready() -> Self {
        let env = Self::new();
        env.hooks.set_ready(true);
        env
    }

    pub fn group(&self, name: &str, delay_secs: u64) -> PatchGroup {
        PatchGroup::new(name, Duration::from_secs(delay_secs), self.env.clone())
    }

    /// Advance the clock and run one tick
    pub fn elapse(&self, secs: u64) {
        self.clock.advance(Duration::from_secs(secs));
        self.hooks.tick();
    }
}
