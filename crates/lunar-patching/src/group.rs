//! Reference-counted patch groups
//!
//! A group owns patch classes and child groups. It is *active* while its
//! subscriber set is non-empty. All owned classes are applied once on the
//! inactive → active edge and removed together when the last subscriber
//! leaves. Removal runs synchronously while hooks are not ready; otherwise
//! it is deferred by the group's grace delay and cancelled if anyone
//! subscribes again in the meantime.
//!
//! Apply failures propagate to the caller of `subscribe`. The group keeps
//! `applied` set so that a subsequent `unsubscribe_all` reverses whatever
//! part of it did get installed.

use crate::applier::{MethodRef, PatchApplier, PatchClass, PatchEntry};
use crate::conflicts;
use crate::error::Result;
use crate::hooks::LifecycleHooks;
use crate::subscriber::Subscriber;
use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::rc::{Rc, Weak};
use std::time::Duration;
use tracing::{debug, warn};

/// Collaborators shared by every group in a tree
#[derive(Clone)]
pub struct PatchEnv {
    pub applier: Rc<dyn PatchApplier>,
    pub hooks: LifecycleHooks,
}

impl PatchEnv {
    pub fn new(applier: Rc<dyn PatchApplier>, hooks: LifecycleHooks) -> Self {
        Self { applier, hooks }
    }
}

/// A patch class found in a loaded module, as seen by [`PatchGroup::add_patches_from`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchClassDecl {
    pub class: PatchClass,
    /// Group name relative to the declaring module
    pub group: String,
    /// Skip the class when this module is loaded
    pub excluded_if_present: Option<String>,
}

#[derive(Default)]
struct GroupState {
    classes: Vec<PatchClass>,
    sub_groups: Vec<PatchGroup>,
    subscribers: HashSet<Subscriber>,
    applied: bool,
    generation: u64,
}

struct GroupInner {
    name: String,
    unpatch_delay: Duration,
    env: PatchEnv,
    state: RefCell<GroupState>,
}

/// Handle to a patch group; clones refer to the same group
#[derive(Clone)]
pub struct PatchGroup(Rc<GroupInner>);

impl PartialEq for PatchGroup {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for PatchGroup {}

impl fmt::Debug for PatchGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.0.state.borrow();
        f.debug_struct("PatchGroup")
            .field("name", &self.0.name)
            .field("classes", &state.classes.len())
            .field("sub_groups", &state.sub_groups.len())
            .field("subscribers", &state.subscribers.len())
            .field("applied", &state.applied)
            .finish()
    }
}

impl PatchGroup {
    pub fn new(name: impl Into<String>, unpatch_delay: Duration, env: PatchEnv) -> Self {
        Self(Rc::new(GroupInner {
            name: name.into(),
            unpatch_delay,
            env,
            state: RefCell::new(GroupState::default()),
        }))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn unpatch_delay(&self) -> Duration {
        self.0.unpatch_delay
    }

    /// At least one subscriber holds the group
    pub fn is_active(&self) -> bool {
        !self.0.state.borrow().subscribers.is_empty()
    }

    /// Owned classes are installed (possibly awaiting a deferred removal)
    pub fn is_applied(&self) -> bool {
        self.0.state.borrow().applied
    }

    pub fn subscriber_count(&self) -> usize {
        self.0.state.borrow().subscribers.len()
    }

    /// Register a class; applied immediately when the group is already applied
    pub fn add_patch_class(&self, class: impl Into<PatchClass>) -> Result<()> {
        let class = class.into();
        let apply_now = {
            let mut state = self.0.state.borrow_mut();
            if state.classes.contains(&class) {
                return Ok(());
            }
            state.classes.push(class.clone());
            state.applied
        };
        if apply_now {
            debug!("Late patch class {} joins applied group {}", class, self.name());
            self.0.env.applier.apply_class(self.name(), &class)?;
        }
        Ok(())
    }

    /// Register every declared class whose group is `<module>.<group>` == this name
    ///
    /// Classes excluded by a module that `is_loaded` reports present are skipped.
    pub fn add_patches_from(
        &self,
        module: &str,
        decls: impl IntoIterator<Item = PatchClassDecl>,
        is_loaded: impl Fn(&str) -> bool,
    ) -> Result<()> {
        for decl in decls {
            if format!("{}.{}", module, decl.group) != self.name() {
                continue;
            }
            if let Some(excluded_by) = &decl.excluded_if_present {
                if is_loaded(excluded_by) {
                    debug!("Skipping {}: {} is present", decl.class, excluded_by);
                    continue;
                }
            }
            self.add_patch_class(decl.class)?;
        }
        Ok(())
    }

    /// Create a child named `<name>.<suffix>` that starts with this group's subscribers
    pub fn new_sub_group(&self, suffix: &str, unpatch_delay: Duration) -> Result<PatchGroup> {
        let child = PatchGroup::new(
            format!("{}.{}", self.name(), suffix),
            unpatch_delay,
            self.0.env.clone(),
        );
        self.add_sub_group(&child)?;
        Ok(child)
    }

    /// Attach an existing group as a child and subscribe it with every current subscriber
    pub fn add_sub_group(&self, group: &PatchGroup) -> Result<()> {
        if group == self {
            warn!("Refusing to add patch group {} as its own child", self.name());
            return Ok(());
        }
        let subscribers: Vec<Subscriber> = {
            let mut state = self.0.state.borrow_mut();
            if state.sub_groups.contains(group) {
                return Ok(());
            }
            state.sub_groups.push(group.clone());
            state.subscribers.iter().cloned().collect()
        };
        for subscriber in &subscribers {
            group.subscribe(subscriber, true)?;
        }
        Ok(())
    }

    /// Add a subscriber, applying owned classes on the inactive → active edge
    pub fn subscribe(&self, subscriber: &Subscriber, recursive: bool) -> Result<()> {
        let (to_apply, children) = {
            let mut state = self.0.state.borrow_mut();
            if state.subscribers.insert(subscriber.clone()) {
                state.generation += 1;
            }
            let to_apply = if !state.applied {
                state.applied = true;
                Some(state.classes.clone())
            } else {
                None
            };
            let children = if recursive {
                state.sub_groups.clone()
            } else {
                Vec::new()
            };
            (to_apply, children)
        };

        if let Some(classes) = to_apply {
            debug!("Applying {} patch class(es) of {}", classes.len(), self.name());
            self.0.env.applier.apply_all(self.name(), &classes)?;
        }

        for child in children {
            child.subscribe(subscriber, true)?;
        }
        Ok(())
    }

    /// Remove a subscriber, scheduling removal when none are left
    pub fn unsubscribe(&self, subscriber: &Subscriber, recursive: bool) {
        let (now_idle, children) = {
            let mut state = self.0.state.borrow_mut();
            let now_idle = state.subscribers.remove(subscriber) && state.subscribers.is_empty();
            let children = if recursive {
                state.sub_groups.clone()
            } else {
                Vec::new()
            };
            (now_idle, children)
        };

        if now_idle {
            self.schedule_unapply();
        }

        for child in children {
            child.unsubscribe(subscriber, true);
        }
    }

    /// Drop every subscriber
    pub fn unsubscribe_all(&self, recursive: bool) {
        let children = {
            let mut state = self.0.state.borrow_mut();
            state.subscribers.clear();
            if recursive {
                state.sub_groups.clone()
            } else {
                Vec::new()
            }
        };

        self.schedule_unapply();

        for child in children {
            child.unsubscribe_all(true);
        }
    }

    /// Remove and re-install every owned class of an active, applied group
    pub fn reapply(&self, recursive: bool) -> Result<()> {
        let (to_apply, children) = {
            let state = self.0.state.borrow();
            let to_apply = (!state.subscribers.is_empty() && state.applied)
                .then(|| state.classes.clone());
            let children = if recursive {
                state.sub_groups.clone()
            } else {
                Vec::new()
            };
            (to_apply, children)
        };

        if let Some(classes) = to_apply {
            self.0.env.applier.remove_all(self.name());
            self.0.env.applier.apply_all(self.name(), &classes)?;
        }

        for child in children {
            child.reapply(true)?;
        }
        Ok(())
    }

    /// Classes owned directly by this group
    pub fn own_patch_classes(&self) -> Vec<PatchClass> {
        self.0.state.borrow().classes.clone()
    }

    /// Classes owned by this group and all descendants
    pub fn patch_classes(&self) -> Vec<PatchClass> {
        let mut classes = self.own_patch_classes();
        for child in self.own_sub_groups() {
            classes.extend(child.patch_classes());
        }
        classes
    }

    pub fn own_sub_groups(&self) -> Vec<PatchGroup> {
        self.0.state.borrow().sub_groups.clone()
    }

    /// All descendants, depth first
    pub fn sub_groups(&self) -> Vec<PatchGroup> {
        let mut groups = Vec::new();
        for child in self.own_sub_groups() {
            groups.push(child.clone());
            groups.extend(child.sub_groups());
        }
        groups
    }

    /// Report foreign patches that may override this group's destructive patches
    pub fn check_conflicts(&self, on_conflict: impl FnMut(&MethodRef, &PatchEntry)) {
        conflicts::check_conflicts(
            self.0.env.applier.as_ref(),
            self.name(),
            |patch| !patch.excluded_from_conflict_check,
            on_conflict,
        );
    }

    /// [`check_conflicts`](Self::check_conflicts) reported as warnings on behalf of `label`
    pub fn log_conflicts(&self, label: &str) -> usize {
        let mut found = 0;
        self.check_conflicts(|method, patch| {
            found += 1;
            warn!(
                "Detected potential conflict: {} adds a destructive patch that will likely \
                 override or break some functionality of {}. Patch method: {}. Target method: {}",
                patch.owner, label, patch.patch_method, method
            );
        });
        found
    }

    fn schedule_unapply(&self) {
        let generation = {
            let mut state = self.0.state.borrow_mut();
            if !state.subscribers.is_empty() || !state.applied {
                return;
            }
            state.generation += 1;
            state.generation
        };

        let hooks = &self.0.env.hooks;
        if hooks.is_ready() {
            debug!(
                "Scheduling removal of {} in {:?}",
                self.name(),
                self.0.unpatch_delay
            );
            let weak: Weak<GroupInner> = Rc::downgrade(&self.0);
            hooks.do_once(
                move || {
                    if let Some(inner) = weak.upgrade() {
                        PatchGroup(inner).unapply_if_idle(Some(generation));
                    }
                },
                self.0.unpatch_delay,
            );
        } else {
            self.unapply_if_idle(None);
        }
    }

    fn unapply_if_idle(&self, expected_generation: Option<u64>) {
        {
            let mut state = self.0.state.borrow_mut();
            if expected_generation.is_some_and(|g| g != state.generation) {
                return;
            }
            if !state.subscribers.is_empty() || !state.applied {
                return;
            }
            state.applied = false;
        }
        debug!("Removing patches of {}", self.name());
        self.0.env.applier.remove_all(self.name());
    }
}
