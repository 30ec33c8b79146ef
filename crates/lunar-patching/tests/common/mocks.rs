//! Mock patch backend
//!
//! Records every apply/remove call without touching any host.

#![allow(dead_code)]

use lunar_patching::{MethodRef, PatchApplier, PatchClass, PatchError, PatchInfo, Result};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashSet};

/// One recorded backend call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplierCall {
    Apply { group: String, class: String },
    RemoveAll { group: String },
}

/// Recording applier with configurable failures and patch info
#[derive(Default)]
pub struct FakePatchApplier {
    calls: RefCell<Vec<ApplierCall>>,
    failing_classes: RefCell<HashSet<String>>,
    methods: RefCell<BTreeMap<MethodRef, std::result::Result<PatchInfo, String>>>,
}

impl FakePatchApplier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make applying `class` fail
    pub fn fail_on(&self, class: &str) {
        self.failing_classes.borrow_mut().insert(class.to_string());
    }

    /// Register patch info for a method
    pub fn with_method(&self, method: &str, info: PatchInfo) {
        self.methods
            .borrow_mut()
            .insert(MethodRef::new(method), Ok(info));
    }

    /// Make querying a method fail
    pub fn with_broken_method(&self, method: &str) {
        self.methods
            .borrow_mut()
            .insert(MethodRef::new(method), Err("unreadable".to_string()));
    }

    pub fn calls(&self) -> Vec<ApplierCall> {
        self.calls.borrow().clone()
    }

    pub fn apply_count(&self, group: &str) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|c| matches!(c, ApplierCall::Apply { group: g, .. } if g == group))
            .count()
    }

    pub fn remove_count(&self, group: &str) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|c| matches!(c, ApplierCall::RemoveAll { group: g } if g == group))
            .count()
    }

    pub fn applied_classes(&self, group: &str) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|c| match c {
                ApplierCall::Apply { group: g, class } if g == group => Some(class.clone()),
                _ => None,
            })
            .collect()
    }
}

impl PatchApplier for FakePatchApplier {
    fn apply_class(&self, group: &str, class: &PatchClass) -> Result<()> {
        if self.failing_classes.borrow().contains(class.name()) {
            return Err(PatchError::apply_failed(group, class.name(), "simulated failure"));
        }
        self.calls.borrow_mut().push(ApplierCall::Apply {
            group: group.to_string(),
            class: class.name().to_string(),
        });
        Ok(())
    }

    fn remove_all(&self, group: &str) {
        self.calls.borrow_mut().push(ApplierCall::RemoveAll {
            group: group.to_string(),
        });
    }

    fn patched_methods(&self) -> Vec<MethodRef> {
        self.methods.borrow().keys().cloned().collect()
    }

    fn patch_info(&self, method: &MethodRef) -> Result<PatchInfo> {
        match self.methods.borrow().get(method) {
            Some(Ok(info)) => Ok(info.clone()),
            Some(Err(message)) => Err(PatchError::query_failed(method.name(), message.clone())),
            None => Ok(PatchInfo::default()),
        }
    }
}
