//! In-memory display.
//!
//! Presents by copying the surface into a [`HeadlessProbe`] the foreground
//! keeps. Used by tests, CI and the demo binary when no window backend is
//! compiled in.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use liveloop_core::Surface;
use parking_lot::{Condvar, Mutex};

use super::{Display, DisplayEvent, DisplayFactory, DisplaySpec};
use crate::error::DisplayError;

#[derive(Default)]
struct ProbeState {
    open: bool,
    opened: u64,
    presents: u64,
    last_frame: Option<Surface>,
    pending: VecDeque<DisplayEvent>,
}

/// Foreground view of a headless display: what was presented, and a way
/// to inject input.
#[derive(Clone, Default)]
pub struct HeadlessProbe {
    state: Arc<(Mutex<ProbeState>, Condvar)>,
}

impl HeadlessProbe {
    /// Creates a probe with no display attached yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true while a display is open on this probe.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state.0.lock().open
    }

    /// Number of times a display has been opened on this probe.
    #[must_use]
    pub fn open_count(&self) -> u64 {
        self.state.0.lock().opened
    }

    /// Total frames presented.
    #[must_use]
    pub fn presents(&self) -> u64 {
        self.state.0.lock().presents
    }

    /// Copy of the most recently presented frame.
    #[must_use]
    pub fn last_frame(&self) -> Option<Surface> {
        self.state.0.lock().last_frame.clone()
    }

    /// Tears the display down from outside, as a window manager killing the
    /// window would. The next `present` fails with [`DisplayError::Closed`].
    pub fn close(&self) {
        self.detach();
    }

    /// Queues an event for the loop's next `poll_events`.
    pub fn inject(&self, event: DisplayEvent) {
        self.state.0.lock().pending.push_back(event);
    }

    /// Blocks until at least `count` frames have been presented in total,
    /// or `timeout` elapses. Returns true on success.
    pub fn wait_for_presents(&self, count: u64, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let (lock, cvar) = &*self.state;
        let mut state = lock.lock();
        while state.presents < count {
            if cvar.wait_until(&mut state, deadline).timed_out() {
                return state.presents >= count;
            }
        }
        true
    }

    /// Blocks until `more` frames beyond the current count are presented.
    pub fn wait_for_more(&self, more: u64, timeout: Duration) -> bool {
        let target = self.presents() + more;
        self.wait_for_presents(target, timeout)
    }

    fn attach(&self) {
        let mut state = self.state.0.lock();
        state.open = true;
        state.opened += 1;
    }

    fn detach(&self) {
        let (lock, cvar) = &*self.state;
        lock.lock().open = false;
        cvar.notify_all();
    }

    fn record(&self, surface: &Surface) {
        let (lock, cvar) = &*self.state;
        {
            let mut state = lock.lock();
            match state.last_frame.as_mut() {
                Some(frame) if frame.width() == surface.width() && frame.height() == surface.height() => {
                    frame.clone_from(surface);
                }
                _ => state.last_frame = Some(surface.clone()),
            }
            state.presents += 1;
        }
        cvar.notify_all();
    }

    fn drain(&self) -> Vec<DisplayEvent> {
        self.state.0.lock().pending.drain(..).collect()
    }
}

impl std::fmt::Debug for HeadlessProbe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.0.lock();
        f.debug_struct("HeadlessProbe")
            .field("open", &state.open)
            .field("presents", &state.presents)
            .field("pending", &state.pending.len())
            .finish()
    }
}

/// Display that keeps frames in memory.
#[derive(Debug)]
pub struct HeadlessDisplay {
    probe: HeadlessProbe,
}

impl HeadlessDisplay {
    /// Opens a display reporting to `probe`.
    #[must_use]
    pub fn new(probe: HeadlessProbe) -> Self {
        probe.attach();
        Self { probe }
    }
}

impl Display for HeadlessDisplay {
    fn poll_events(&mut self) -> Vec<DisplayEvent> {
        self.probe.drain()
    }

    fn present(&mut self, surface: &Surface) -> Result<(), DisplayError> {
        if !self.probe.is_open() {
            return Err(DisplayError::Closed);
        }
        self.probe.record(surface);
        Ok(())
    }
}

impl Drop for HeadlessDisplay {
    fn drop(&mut self) {
        self.probe.detach();
    }
}

/// Factory for [`HeadlessDisplay`]s sharing one probe.
#[derive(Debug, Clone, Default)]
pub struct HeadlessFactory {
    probe: HeadlessProbe,
}

impl HeadlessFactory {
    /// Creates a factory and its probe.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The probe every display from this factory reports to.
    #[must_use]
    pub fn probe(&self) -> HeadlessProbe {
        self.probe.clone()
    }
}

impl DisplayFactory for HeadlessFactory {
    fn open(&self, _spec: &DisplaySpec) -> Result<Box<dyn Display>, DisplayError> {
        Ok(Box::new(HeadlessDisplay::new(self.probe.clone())))
    }
}
