//! Lifecycle hooks.
//!
//! Observers attach hooks to a machine and are called back synchronously at
//! well-defined points of the transition protocol. Within one kind, hooks
//! fire in registration order.
//!
//! Hooks run while the machine's exclusive lock is held: a hook must not
//! call back into the same machine, or it will deadlock. Hooks that need to
//! drive the machine further must hand the work to another thread.

use crate::context::Context;
use crate::machine::TransitionResult;
use std::fmt;
use std::sync::Arc;

/// When a hook fires relative to a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookKind {
    /// Before the transition commits; observable state is still `from`.
    BeforeTransition,
    /// After the transition committed.
    AfterTransition,
    /// On entering any state (transitions, start, reset, set_state).
    OnStateEnter,
    /// On exiting any state (transitions, stop, reset, set_state).
    OnStateExit,
    /// When an attempt fails at any stage.
    OnTransitionError,
}

impl HookKind {
    /// All kinds, in protocol order.
    pub const ALL: [HookKind; 5] = [
        HookKind::BeforeTransition,
        HookKind::AfterTransition,
        HookKind::OnStateEnter,
        HookKind::OnStateExit,
        HookKind::OnTransitionError,
    ];

    /// Canonical lowercase name, as used by declarative documents.
    pub fn as_str(&self) -> &'static str {
        match self {
            HookKind::BeforeTransition => "before_transition",
            HookKind::AfterTransition => "after_transition",
            HookKind::OnStateEnter => "on_state_enter",
            HookKind::OnStateExit => "on_state_exit",
            HookKind::OnTransitionError => "on_transition_error",
        }
    }

    /// Parses a canonical lowercase name.
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "before_transition" => Some(HookKind::BeforeTransition),
            "after_transition" => Some(HookKind::AfterTransition),
            "on_state_enter" => Some(HookKind::OnStateEnter),
            "on_state_exit" => Some(HookKind::OnStateExit),
            "on_transition_error" => Some(HookKind::OnTransitionError),
            _ => None,
        }
    }
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A hook callback.
#[derive(Clone)]
pub struct Hook(Arc<dyn Fn(&TransitionResult, &Context) + Send + Sync>);

impl Hook {
    /// Wraps a callback closure.
    pub fn new(f: impl Fn(&TransitionResult, &Context) + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    /// Invokes the hook.
    pub fn call(&self, result: &TransitionResult, ctx: &Context) {
        (self.0)(result, ctx)
    }
}

impl fmt::Debug for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Hook")
    }
}

/// Registration-ordered hook lists, one per kind.
#[derive(Debug, Clone, Default)]
pub struct HookSet {
    before: Vec<Hook>,
    after: Vec<Hook>,
    enter: Vec<Hook>,
    exit: Vec<Hook>,
    error: Vec<Hook>,
}

impl HookSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a hook for the given kind.
    pub fn push(&mut self, kind: HookKind, hook: Hook) {
        self.list_mut(kind).push(hook);
    }

    /// Removes all hooks of the given kind.
    pub fn clear(&mut self, kind: HookKind) {
        self.list_mut(kind).clear();
    }

    /// Returns the hooks for a kind, in registration order.
    pub fn get(&self, kind: HookKind) -> &[Hook] {
        match kind {
            HookKind::BeforeTransition => &self.before,
            HookKind::AfterTransition => &self.after,
            HookKind::OnStateEnter => &self.enter,
            HookKind::OnStateExit => &self.exit,
            HookKind::OnTransitionError => &self.error,
        }
    }

    /// Total hook count across kinds.
    pub fn len(&self) -> usize {
        HookKind::ALL.iter().map(|k| self.get(*k).len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn list_mut(&mut self, kind: HookKind) -> &mut Vec<Hook> {
        match kind {
            HookKind::BeforeTransition => &mut self.before,
            HookKind::AfterTransition => &mut self.after,
            HookKind::OnStateEnter => &mut self.enter,
            HookKind::OnStateExit => &mut self.exit,
            HookKind::OnTransitionError => &mut self.error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_kind_names_roundtrip() {
        for kind in HookKind::ALL {
            assert_eq!(HookKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(HookKind::parse("BEFORE_TRANSITION"), Some(HookKind::BeforeTransition));
        assert_eq!(HookKind::parse("nonsense"), None);
    }

    #[test]
    fn test_hookset_ordering() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut set = HookSet::new();

        for i in 0..3 {
            let calls = calls.clone();
            set.push(
                HookKind::BeforeTransition,
                Hook::new(move |_, _| {
                    // Each hook must observe exactly the hooks registered
                    // before it having already run.
                    assert_eq!(calls.fetch_add(1, Ordering::SeqCst), i);
                }),
            );
        }

        let result = TransitionResult::lifecycle(None, None);
        let ctx = Context::new();
        for hook in set.get(HookKind::BeforeTransition) {
            hook.call(&result, &ctx);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_hookset_clear() {
        let mut set = HookSet::new();
        set.push(HookKind::AfterTransition, Hook::new(|_, _| {}));
        set.push(HookKind::OnStateEnter, Hook::new(|_, _| {}));
        assert_eq!(set.len(), 2);

        set.clear(HookKind::AfterTransition);
        assert_eq!(set.get(HookKind::AfterTransition).len(), 0);
        assert_eq!(set.len(), 1);
        assert!(!set.is_empty());
    }
}
