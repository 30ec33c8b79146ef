//! Common test utilities for lunar-bootstrap
//!
//! - Temporary mod trees with manifests, components and check files
//! - A fake host, a fake module runtime and a recording patch applier
//! - Helpers running discovery and preparation against a tree

#![allow(dead_code)]
#![allow(unused_imports)]

pub mod builders;
pub mod fixtures;
pub mod mocks;

pub use builders::*;
pub use fixtures::*;
pub use mocks::*;

use lunar_bootstrap::discovery::{discover, prepare_all};
use lunar_bootstrap::{Bootstrap, BootstrapContext, BootstrapOptions};
use lunar_core::{LoadingState, Version};
use lunar_patching::ManualClock;
use std::rc::Rc;

/// Host version used unless a test says otherwise
pub const HOST_VERSION: Version = Version::with_build(1, 5, 4104);

/// Discover and prepare every package of `tree`
pub fn prepared(tree: &ModTree, runtime: &FakeRuntime) -> BootstrapContext {
    let host = tree.host(HOST_VERSION);
    let mut ctx = BootstrapContext::new();
    discover(&mut ctx, &host);
    prepare_all(&mut ctx, &host, runtime, true);
    ctx
}

pub fn provider_state(ctx: &BootstrapContext, package_id: &str) -> Option<LoadingState> {
    ctx.provider_by_package(package_id).map(|p| p.state())
}

pub fn component_state(ctx: &BootstrapContext, name: &str) -> Option<LoadingState> {
    ctx.component_by_name(name).map(|c| c.state())
}

/// Failure kinds recorded for one package id or component name
pub fn failure_kinds(ctx: &BootstrapContext, subject: &str) -> Vec<&'static str> {
    ctx.failures()
        .iter()
        .filter(|f| match &f.subject {
            lunar_bootstrap::Subject::Provider(id) => id == subject,
            lunar_bootstrap::Subject::Component(name) => name == subject,
        })
        .map(|f| f.kind)
        .collect()
}

/// A bootstrap over `tree` with a recording applier and a manual clock
pub struct TestBootstrap {
    pub bootstrap: Bootstrap<FakeHost, FakeRuntime>,
    pub applier: Rc<RecordingApplier>,
    pub clock: Rc<ManualClock>,
}

impl TestBootstrap {
    pub fn new(tree: &ModTree, runtime: FakeRuntime) -> Self {
        Self::with_options(tree, runtime, BootstrapOptions::default())
    }

    pub fn with_options(tree: &ModTree, runtime: FakeRuntime, options: BootstrapOptions) -> Self {
        let applier = Rc::new(RecordingApplier::default());
        let clock = Rc::new(ManualClock::new());
        let bootstrap = Bootstrap::new(
            tree.host(HOST_VERSION),
            runtime,
            applier.clone(),
            clock.clone(),
            options,
        );
        Self {
            bootstrap,
            applier,
            clock,
        }
    }
}
