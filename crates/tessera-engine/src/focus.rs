//! Focusing the editor and deferred work.
//!
//! Focus mirrors the model selection onto the surface, which is only valid
//! once every applied operation has been rendered. Until then focusing is
//! retried later through the host's [`Scheduler`].

use std::collections::VecDeque;
use std::time::Duration;

use log::{debug, warn};
use tessera_model::{Path, Range};

use crate::editor::Editor;
use crate::error::EditorError;
use crate::surface::{Surface, SurfaceSelection};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Task {
    Focus { retries: u32 },
    FlushComposition,
}

/// Host hook for running a task later
pub trait Scheduler {
    fn defer(&mut self, delay: Duration, task: Task);
}

/// Queues tasks until the caller runs them, for hosts driving their own loop
#[derive(Debug, Default)]
pub struct ManualScheduler {
    queue: VecDeque<(Duration, Task)>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&mut self) -> Option<(Duration, Task)> {
        self.queue.pop_front()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

impl Scheduler for ManualScheduler {
    fn defer(&mut self, delay: Duration, task: Task) {
        self.queue.push_back((delay, task));
    }
}

impl Editor {
    /// Focuses with the configured number of retries
    pub fn focus(
        &mut self,
        surface: &mut Surface,
        scheduler: &mut dyn Scheduler,
    ) -> Result<(), EditorError> {
        let retries = self.options().focus.retries;
        self.focus_with_retries(surface, scheduler, retries)
    }

    pub fn focus_with_retries(
        &mut self,
        surface: &mut Surface,
        scheduler: &mut dyn Scheduler,
        retries: u32,
    ) -> Result<(), EditorError> {
        if self.focused {
            return Ok(());
        }
        if retries == 0 {
            return Err(EditorError::FocusRetryExhausted {
                attempts: self.options().focus.retries,
            });
        }
        if self.has_unflushed_operations() {
            let delay = self.options().focus.delay;
            debug!(
                "focus deferred by {delay:?}, {} operation(s) unflushed",
                self.operations().len()
            );
            scheduler.defer(delay, Task::Focus { retries: retries - 1 });
            return Ok(());
        }

        if self.document().selection().is_none() {
            let start = self.document().start(&Path::root())?;
            self.select(Range::collapsed(start))?;
        }
        if let Some(selection) = self.document().selection().cloned() {
            let range = self.to_surface_range(surface, &selection)?;
            surface.selection = Some(SurfaceSelection::from(range));
        }
        surface.active = surface.editor_root(self.id());
        self.focused = true;
        Ok(())
    }

    pub fn blur(&mut self) {
        self.focused = false;
    }

    /// Runs a task a scheduler handed back
    pub fn run_task(
        &mut self,
        task: Task,
        surface: &mut Surface,
        scheduler: &mut dyn Scheduler,
    ) -> Result<(), EditorError> {
        match task {
            Task::Focus { retries } => self.focus_with_retries(surface, scheduler, retries),
            Task::FlushComposition => {
                if !self.pending().is_flush_requested() {
                    return Ok(());
                }
                let result = self.flush_pending();
                if let Err(err) = &result {
                    warn!("pending composition could not be flushed: {err}");
                }
                result
            }
        }
    }
}
