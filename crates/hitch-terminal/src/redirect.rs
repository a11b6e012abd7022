//! Single-slot input redirection.
//!
//! While a handle is active every input segment goes to its owner instead
//! of the trigger chain. Preparing a new redirection replaces the current
//! one; there is no queue.

use std::sync::{Arc, Mutex, PoisonError};

use hitch_platform::{InputSink, SessionEvents};

use crate::interpreter::Environment;

/// A command session that consumes redirected input.
pub trait RedirectHandler: Send + Sync {
    /// Input hint shown while this handler owns input.
    fn hint(&self) -> &str;

    /// While true, redirected input is forwarded but not recorded.
    fn waiting_permission(&self) -> bool {
        false
    }

    /// Handle one redirected segment. `handle` already includes `input`
    /// in `after` unless permission is pending.
    fn on_redirect(
        &self,
        handle: &RedirectionView,
        input: &str,
        env: &mut Environment<'_>,
    ) -> RedirectStep;
}

/// What happens after a redirected segment is handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectStep {
    /// Keep owning input, optionally emitting text.
    Continue(Option<String>),
    /// Release input, optionally emitting text.
    Finish(Option<String>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectionState {
    Idle,
    Active,
}

/// The live redirection.
pub struct RedirectionHandle {
    pub before: Vec<String>,
    pub after: Vec<String>,
    owner: Arc<dyn RedirectHandler>,
}

/// Snapshot of a handle's recorded objects passed to its owner.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RedirectionView {
    pub before: Vec<String>,
    pub after: Vec<String>,
}

/// Owner of the redirection slot.
pub struct Redirector {
    slot: Mutex<Option<RedirectionHandle>>,
    input: Arc<dyn InputSink>,
    events: Arc<dyn SessionEvents>,
}

impl Redirector {
    pub fn new(input: Arc<dyn InputSink>, events: Arc<dyn SessionEvents>) -> Self {
        Self {
            slot: Mutex::new(None),
            input,
            events,
        }
    }

    /// Give `owner` all subsequent input. Replaces any active handle.
    pub fn prepare(&self, owner: Arc<dyn RedirectHandler>, before: Vec<String>) {
        let hint = owner.hint().to_string();
        let replaced = self
            .lock()
            .replace(RedirectionHandle {
                before,
                after: Vec::new(),
                owner,
            })
            .is_some();
        if replaced {
            log::debug!("redirection replaced by a newer owner");
        }
        self.input.set_hint(&hint);
        self.events.on_redirection_entered(&hint);
    }

    pub fn state(&self) -> RedirectionState {
        if self.lock().is_some() {
            RedirectionState::Active
        } else {
            RedirectionState::Idle
        }
    }

    pub fn is_active(&self) -> bool {
        self.state() == RedirectionState::Active
    }

    /// Route one segment to the active owner.
    ///
    /// Returns `None` when idle. On [`RedirectStep::Finish`] the handle is
    /// released, unless the owner already replaced itself.
    pub fn route(&self, input: &str, env: &mut Environment<'_>) -> Option<RedirectStep> {
        let (owner, view) = {
            let mut slot = self.lock();
            let handle = slot.as_mut()?;
            if !handle.owner.waiting_permission() {
                handle.after.push(input.to_string());
            }
            let view = RedirectionView {
                before: handle.before.clone(),
                after: handle.after.clone(),
            };
            (Arc::clone(&handle.owner), view)
        };

        let step = owner.on_redirect(&view, input, env);
        if matches!(step, RedirectStep::Finish(_)) {
            self.release(&owner);
        }
        Some(step)
    }

    /// Clear the slot and notify listeners. No-op when idle.
    pub fn cleanup(&self) {
        if self.lock().take().is_some() {
            self.notify_exit();
        }
    }

    fn release(&self, owner: &Arc<dyn RedirectHandler>) {
        let released = {
            let mut slot = self.lock();
            match slot.as_ref() {
                Some(handle) if Arc::ptr_eq(&handle.owner, owner) => slot.take().is_some(),
                _ => false,
            }
        };
        if released {
            self.notify_exit();
        }
    }

    fn notify_exit(&self) {
        self.input.reset_hint();
        self.events.on_redirection_exited();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<RedirectionHandle>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::CommandRegistry;
    use crate::test_utils::Fixture;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Collects two answers, then finishes.
    struct TwoStep;
    impl RedirectHandler for TwoStep {
        fn hint(&self) -> &str {
            "answer"
        }
        fn on_redirect(
            &self,
            handle: &RedirectionView,
            input: &str,
            _env: &mut Environment<'_>,
        ) -> RedirectStep {
            if handle.after.len() < 2 {
                RedirectStep::Continue(Some(format!("got {input}")))
            } else {
                RedirectStep::Finish(Some(handle.after.join("+")))
            }
        }
    }

    struct Gated {
        waiting: AtomicBool,
    }
    impl RedirectHandler for Gated {
        fn hint(&self) -> &str {
            "permission"
        }
        fn waiting_permission(&self) -> bool {
            self.waiting.load(Ordering::SeqCst)
        }
        fn on_redirect(
            &self,
            handle: &RedirectionView,
            _input: &str,
            _env: &mut Environment<'_>,
        ) -> RedirectStep {
            RedirectStep::Continue(Some(handle.after.len().to_string()))
        }
    }

    #[test]
    fn idle_until_prepared() {
        let fx = Fixture::new();
        let reg = CommandRegistry::new();
        let mut env = fx.env(&reg);
        assert_eq!(fx.redirector.state(), RedirectionState::Idle);
        assert!(fx.redirector.route("x", &mut env).is_none());
    }

    #[test]
    fn two_step_flow_and_notifications() {
        let fx = Fixture::new();
        let reg = CommandRegistry::new();
        let mut env = fx.env(&reg);

        fx.redirector.prepare(Arc::new(TwoStep), vec!["start".into()]);
        assert!(fx.redirector.is_active());
        assert_eq!(fx.input.hints(), vec!["answer".to_string()]);
        assert_eq!(fx.events.count("redirection_entered"), 1);

        assert_eq!(
            fx.redirector.route("a", &mut env),
            Some(RedirectStep::Continue(Some("got a".into())))
        );
        assert_eq!(
            fx.redirector.route("b", &mut env),
            Some(RedirectStep::Finish(Some("a+b".into())))
        );
        assert_eq!(fx.redirector.state(), RedirectionState::Idle);
        assert_eq!(fx.input.resets(), 1);
        assert_eq!(fx.events.count("redirection_exited"), 1);
    }

    #[test]
    fn waiting_permission_does_not_record() {
        let fx = Fixture::new();
        let reg = CommandRegistry::new();
        let mut env = fx.env(&reg);
        let gated = Arc::new(Gated {
            waiting: AtomicBool::new(true),
        });
        fx.redirector
            .prepare(Arc::clone(&gated) as Arc<dyn RedirectHandler>, Vec::new());

        assert_eq!(
            fx.redirector.route("secret", &mut env),
            Some(RedirectStep::Continue(Some("0".into())))
        );
        gated.waiting.store(false, Ordering::SeqCst);
        assert_eq!(
            fx.redirector.route("open", &mut env),
            Some(RedirectStep::Continue(Some("1".into())))
        );
    }

    #[test]
    fn last_writer_wins() {
        let fx = Fixture::new();
        let reg = CommandRegistry::new();
        let mut env = fx.env(&reg);
        fx.redirector.prepare(
            Arc::new(Gated {
                waiting: AtomicBool::new(false),
            }),
            Vec::new(),
        );
        fx.redirector.prepare(Arc::new(TwoStep), Vec::new());
        assert_eq!(
            fx.redirector.route("a", &mut env),
            Some(RedirectStep::Continue(Some("got a".into())))
        );
    }

    #[test]
    fn cleanup_is_idempotent() {
        let fx = Fixture::new();
        fx.redirector.prepare(Arc::new(TwoStep), Vec::new());
        fx.redirector.cleanup();
        fx.redirector.cleanup();
        assert_eq!(fx.redirector.state(), RedirectionState::Idle);
        assert_eq!(fx.events.count("redirection_exited"), 1);
    }
}
