//! Output sink that buffers until the presentation layer is ready.

use std::sync::{Arc, Mutex, PoisonError};

use hitch_types::color::Rgb;

use crate::services::{OutputCategory, OutputSink};

enum Pending {
    Line(String, Option<Rgb>, OutputCategory),
    Clear,
}

#[derive(Default)]
struct State {
    target: Option<Arc<dyn OutputSink>>,
    pending: Vec<Pending>,
}

/// Accepts output at any time and forwards it once a target is attached.
///
/// Anything emitted before [`BufferedOutput::attach`] is replayed in order.
#[derive(Default)]
pub struct BufferedOutput {
    state: Mutex<State>,
}

impl BufferedOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach the real sink and flush everything buffered so far.
    pub fn attach(&self, target: Arc<dyn OutputSink>) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        for item in state.pending.drain(..) {
            match item {
                Pending::Line(text, color, category) => target.emit(&text, color, category),
                Pending::Clear => target.clear(),
            }
        }
        state.target = Some(target);
    }

    /// Whether a target is attached.
    pub fn is_ready(&self) -> bool {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .target
            .is_some()
    }

    /// Number of buffered items awaiting a target.
    pub fn pending_len(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pending
            .len()
    }
}

impl OutputSink for BufferedOutput {
    fn emit(&self, text: &str, color: Option<Rgb>, category: OutputCategory) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        match &state.target {
            Some(target) => target.emit(text, color, category),
            None => state
                .pending
                .push(Pending::Line(text.to_string(), color, category)),
        }
    }

    fn clear(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        match &state.target {
            Some(target) => target.clear(),
            None => {
                state.pending.clear();
                state.pending.push(Pending::Clear);
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Collect {
        lines: Mutex<Vec<String>>,
    }

    impl OutputSink for Collect {
        fn emit(&self, text: &str, _color: Option<Rgb>, _category: OutputCategory) {
            self.lines.lock().unwrap().push(text.to_string());
        }

        fn clear(&self) {
            self.lines.lock().unwrap().push("<clear>".to_string());
        }
    }

    #[test]
    fn buffers_until_attached() {
        let buffered = BufferedOutput::new();
        buffered.emit("early", None, OutputCategory::Output);
        assert!(!buffered.is_ready());
        assert_eq!(buffered.pending_len(), 1);

        let target = Arc::new(Collect::default());
        buffered.attach(Arc::clone(&target) as Arc<dyn OutputSink>);
        buffered.emit("late", None, OutputCategory::Output);

        assert!(buffered.is_ready());
        assert_eq!(buffered.pending_len(), 0);
        assert_eq!(*target.lines.lock().unwrap(), vec!["early", "late"]);
    }

    #[test]
    fn clear_before_ready_drops_earlier_lines() {
        let buffered = BufferedOutput::new();
        buffered.emit("gone", None, OutputCategory::Output);
        buffered.clear();
        buffered.emit("kept", None, OutputCategory::Output);

        let target = Arc::new(Collect::default());
        buffered.attach(Arc::clone(&target) as Arc<dyn OutputSink>);
        assert_eq!(*target.lines.lock().unwrap(), vec!["<clear>", "kept"]);
    }
}
