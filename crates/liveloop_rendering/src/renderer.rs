//! # Threaded Renderer
//!
//! Runs the frame loop on its own thread and hands control straight back
//! to the caller, who keeps mutating the very objects being drawn.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                          FRAME LOOP                             │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  1. Events   poll display, run handlers, CloseRequested → exit  │
//! │  2. Clear    fill background (skipped when None: trails)        │
//! │  3. Draw     for each drawable, in order:                       │
//! │                lock → update() → render(&mut surface) → unlock  │
//! │  4. Present  display.present(&surface)                          │
//! │  5. Pace     sleep/spin to the target fps                       │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Sharing
//!
//! The instance list, background and fps live behind locks in a
//! [`RendererHandle`]. The loop snapshots the list and re-reads settings at
//! the top of every frame, so changes made from the foreground show up on
//! the next frame.
//!
//! ## Faults
//!
//! A drawable that returns an error or panics ends the loop, as does a
//! panicking event handler or a failed present. The failure is
//! captured as a [`FrameFault`] and exposed through
//! [`RendererHandle::last_error`]; the caller's thread never sees it.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::ops::Deref;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use liveloop_core::{Color, DrawError, DrawResult, Shared, SharedDrawable, Surface};
use parking_lot::{Mutex, RwLock};

use crate::config::{validate_fps, RendererConfig};
use crate::display::{
    Display, DisplayEvent, DisplayFactory, DisplaySpec, EventKind, HeadlessFactory, HeadlessProbe,
};
use crate::error::{DisplayError, RendererError, RendererResult};
use crate::pacer::FramePacer;
use crate::stats::{FaultCause, FrameFault, FrameStats};

/// Name of the render thread.
pub const THREAD_NAME: &str = "liveloop-render";

/// Log a warning every this many late frames.
const LATE_WARN_EVERY: u64 = 120;

/// Callback for one kind of display event. Runs on the render thread.
pub type EventHandler = Box<dyn FnMut(&DisplayEvent) + Send>;

/// Settings the foreground may change while the loop runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiveSettings {
    /// Clear color; `None` leaves trails.
    pub background: Option<Color>,
    /// Frame rate cap.
    pub fps: u32,
}

/// A registered handler, or the marker left while the loop is calling it.
enum HandlerSlot {
    Idle(EventHandler),
    Running,
}

/// State shared between the renderer, its handles and the loop thread.
struct LoopState {
    running: AtomicBool,
    frames: AtomicU64,
    settings: RwLock<LiveSettings>,
    instances: Mutex<Vec<SharedDrawable>>,
    handlers: Mutex<BTreeMap<EventKind, HandlerSlot>>,
    last_error: Mutex<Option<FrameFault>>,
    stats: Mutex<FrameStats>,
}

impl LoopState {
    fn fault(&self, frame: u64, cause: FaultCause) {
        let fault = FrameFault { frame, cause };
        tracing::error!(%fault, "render loop stopped by fault");
        *self.last_error.lock() = Some(fault);
    }
}

/// Cloneable control surface for a renderer.
///
/// Everything here is safe to call from any thread, including from event
/// handlers running on the render thread.
#[derive(Clone)]
pub struct RendererHandle {
    state: Arc<LoopState>,
}

impl RendererHandle {
    fn new(config: &RendererConfig) -> Self {
        Self {
            state: Arc::new(LoopState {
                running: AtomicBool::new(false),
                frames: AtomicU64::new(0),
                settings: RwLock::new(LiveSettings {
                    background: config.background,
                    fps: config.fps,
                }),
                instances: Mutex::new(Vec::new()),
                handlers: Mutex::new(BTreeMap::new()),
                last_error: Mutex::new(None),
                stats: Mutex::new(FrameStats::default()),
            }),
        }
    }

    /// Returns true while the loop thread is running frames.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state.running.load(Ordering::Acquire)
    }

    /// Asks the loop to exit after the current frame. Does not wait.
    pub fn request_stop(&self) {
        self.state.running.store(false, Ordering::Release);
    }

    /// Frames presented since the renderer was created.
    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.state.frames.load(Ordering::Acquire)
    }

    /// Frame-time statistics.
    #[must_use]
    pub fn stats(&self) -> FrameStats {
        *self.state.stats.lock()
    }

    /// The fault that ended the most recent run, if any.
    ///
    /// Cleared by the next successful `start()`.
    #[must_use]
    pub fn last_error(&self) -> Option<FrameFault> {
        self.state.last_error.lock().clone()
    }

    /// Current background (`None` = trails).
    #[must_use]
    pub fn background(&self) -> Option<Color> {
        self.state.settings.read().background
    }

    /// Sets the background, effective next frame.
    pub fn set_background(&self, background: Option<Color>) {
        self.state.settings.write().background = background;
    }

    /// Current frame rate cap.
    #[must_use]
    pub fn fps(&self) -> u32 {
        self.state.settings.read().fps
    }

    /// Changes the frame rate cap, effective next frame.
    ///
    /// # Errors
    ///
    /// Returns [`RendererError::Config`] for 0 or more than
    /// [`MAX_FPS`](crate::config::MAX_FPS).
    pub fn set_fps(&self, fps: u32) -> RendererResult<()> {
        validate_fps(fps)?;
        self.state.settings.write().fps = fps;
        Ok(())
    }

    /// Both live settings at once.
    #[must_use]
    pub fn settings(&self) -> LiveSettings {
        *self.state.settings.read()
    }

    /// Appends a drawable; it is drawn from the next frame on.
    pub fn push(&self, drawable: SharedDrawable) {
        let mut instances = self.state.instances.lock();
        instances.push(drawable);
        tracing::debug!(count = instances.len(), "drawable added");
    }

    /// Removes every entry pointing at `drawable`'s object.
    ///
    /// Returns true if anything was removed. Takes effect next frame.
    pub fn remove<T: ?Sized>(&self, drawable: &Shared<T>) -> bool {
        let mut instances = self.state.instances.lock();
        let before = instances.len();
        instances.retain(|d| !d.same_object(drawable));
        let removed = instances.len() != before;
        if removed {
            tracing::debug!(count = instances.len(), "drawable removed");
        }
        removed
    }

    /// Returns true if `drawable`'s object is in the instance list.
    #[must_use]
    pub fn contains<T: ?Sized>(&self, drawable: &Shared<T>) -> bool {
        self.state
            .instances
            .lock()
            .iter()
            .any(|d| d.same_object(drawable))
    }

    /// Removes all drawables.
    pub fn clear(&self) {
        self.state.instances.lock().clear();
        tracing::debug!("instance list cleared");
    }

    /// Number of registered drawables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.instances.lock().len()
    }

    /// Returns true if no drawables are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.instances.lock().is_empty()
    }

    /// Snapshot of the instance list, in draw order.
    #[must_use]
    pub fn instances(&self) -> Vec<SharedDrawable> {
        self.state.instances.lock().clone()
    }

    /// Registers `handler` for events of `kind`, replacing any previous one.
    ///
    /// A handler for [`EventKind::CloseRequested`] overrides the default
    /// of exiting the loop. Called from inside the handler for `kind`, the
    /// new handler replaces the running one once it returns.
    pub fn on_event(&self, kind: EventKind, handler: impl FnMut(&DisplayEvent) + Send + 'static) {
        self.state
            .handlers
            .lock()
            .insert(kind, HandlerSlot::Idle(Box::new(handler)));
    }

    /// Drops the handler for `kind`. Returns true if one was registered.
    ///
    /// A handler may clear itself; it is not called again.
    pub fn clear_handler(&self, kind: EventKind) -> bool {
        self.state.handlers.lock().remove(&kind).is_some()
    }
}

impl fmt::Debug for RendererHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RendererHandle")
            .field("running", &self.is_running())
            .field("frames", &self.frame_count())
            .field("instances", &self.len())
            .field("settings", &self.settings())
            .finish_non_exhaustive()
    }
}

/// Owns one background render thread.
///
/// Dereferences to [`RendererHandle`] for all live controls.
///
/// ## Usage
///
/// ```rust,ignore
/// let (mut renderer, probe) = ThreadedRenderer::headless(&RendererConfig::default())?;
/// renderer.push(orbiter.to_dyn());
/// renderer.start()?;            // returns once the display is open
///
/// orbiter.lock().radius = 4.0;  // visible next frame
/// renderer.set_background(None); // trails
///
/// renderer.stop();              // idempotent, also runs on drop
/// ```
pub struct ThreadedRenderer {
    handle: RendererHandle,
    factory: Arc<dyn DisplayFactory>,
    spec: DisplaySpec,
    thread: Option<JoinHandle<()>>,
}

impl ThreadedRenderer {
    /// Creates a stopped renderer drawing through `factory`'s displays.
    ///
    /// # Errors
    ///
    /// Returns [`RendererError::Config`] if `config` fails validation.
    pub fn new(config: &RendererConfig, factory: impl DisplayFactory) -> RendererResult<Self> {
        config.validate()?;
        Ok(Self {
            handle: RendererHandle::new(config),
            factory: Arc::new(factory),
            spec: DisplaySpec {
                width: config.width,
                height: config.height,
                scale: config.scale,
                title: config.title.clone(),
            },
            thread: None,
        })
    }

    /// Creates a stopped renderer on an in-memory display, plus the probe
    /// that observes it.
    ///
    /// # Errors
    ///
    /// Returns [`RendererError::Config`] if `config` fails validation.
    pub fn headless(config: &RendererConfig) -> RendererResult<(Self, HeadlessProbe)> {
        let factory = HeadlessFactory::new();
        let probe = factory.probe();
        Ok((Self::new(config, factory)?, probe))
    }

    /// Creates a stopped renderer that opens a real window.
    ///
    /// # Errors
    ///
    /// Returns [`RendererError::Config`] if `config` fails validation.
    #[cfg(feature = "window")]
    pub fn windowed(config: &RendererConfig) -> RendererResult<Self> {
        Self::new(config, crate::display::WindowFactory)
    }

    /// Creates a renderer with `instances` and starts it immediately.
    ///
    /// # Errors
    ///
    /// As [`ThreadedRenderer::new`] and [`ThreadedRenderer::start`].
    pub fn launch(
        config: &RendererConfig,
        factory: impl DisplayFactory,
        instances: Vec<SharedDrawable>,
    ) -> RendererResult<Self> {
        let mut renderer = Self::new(config, factory)?.with_instances(instances);
        renderer.start()?;
        Ok(renderer)
    }

    /// Seeds the instance list (appends, in order).
    #[must_use]
    pub fn with_instances(self, instances: Vec<SharedDrawable>) -> Self {
        self.handle.state.instances.lock().extend(instances);
        self
    }

    /// A cloneable handle for other threads and event handlers.
    #[must_use]
    pub fn handle(&self) -> RendererHandle {
        self.handle.clone()
    }

    /// Size and title the display is opened with.
    #[must_use]
    pub fn spec(&self) -> &DisplaySpec {
        &self.spec
    }

    /// Spawns the render thread and returns once its display is open.
    ///
    /// A stopped renderer (stopped by `stop()`, a close event or a fault)
    /// can be started again; frame counters carry over and the last error
    /// is cleared.
    ///
    /// # Errors
    ///
    /// - [`RendererError::AlreadyRunning`] if the loop is running; no
    ///   second thread is spawned.
    /// - [`RendererError::Display`] if the display cannot be opened; no
    ///   thread remains.
    /// - [`RendererError::ThreadSpawn`] if the OS refuses the thread.
    pub fn start(&mut self) -> RendererResult<()> {
        if self.handle.is_running() {
            return Err(RendererError::AlreadyRunning);
        }
        self.join_finished();

        let state = Arc::clone(&self.handle.state);
        state.running.store(true, Ordering::Release);
        *state.last_error.lock() = None;

        let (ready_tx, ready_rx) = crossbeam_channel::bounded::<Result<(), DisplayError>>(1);
        let factory = Arc::clone(&self.factory);
        let spec = self.spec.clone();

        let spawned = thread::Builder::new()
            .name(THREAD_NAME.to_owned())
            .spawn(move || {
                let display = match factory.open(&spec) {
                    Ok(display) => display,
                    Err(error) => {
                        state.running.store(false, Ordering::Release);
                        let _ = ready_tx.send(Err(error));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(()));
                run_loop(&state, display, &spec);
            });

        let thread = match spawned {
            Ok(thread) => thread,
            Err(e) => {
                self.handle.request_stop();
                return Err(RendererError::ThreadSpawn(e.to_string()));
            }
        };

        match ready_rx.recv() {
            Ok(Ok(())) => {
                self.thread = Some(thread);
                tracing::info!(
                    width = self.spec.width,
                    height = self.spec.height,
                    fps = self.fps(),
                    instances = self.len(),
                    "renderer started"
                );
                Ok(())
            }
            Ok(Err(error)) => {
                let _ = thread.join();
                tracing::warn!(%error, "renderer failed to open display");
                Err(error.into())
            }
            Err(_) => {
                // The factory panicked before reporting.
                let _ = thread.join();
                self.handle.request_stop();
                Err(DisplayError::Init("render thread exited before the display opened".to_owned()).into())
            }
        }
    }

    /// Signals the loop to exit and waits for the thread. Idempotent.
    ///
    /// Returns within one frame plus one pacing interval.
    pub fn stop(&mut self) {
        self.handle.request_stop();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::error!("render thread panicked outside a frame");
            }
            tracing::info!(frames = self.frame_count(), "renderer stopped");
        }
    }

    /// Joins a thread whose loop already ended on its own.
    fn join_finished(&mut self) {
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Deref for ThreadedRenderer {
    type Target = RendererHandle;

    fn deref(&self) -> &Self::Target {
        &self.handle
    }
}

impl Drop for ThreadedRenderer {
    fn drop(&mut self) {
        self.stop();
    }
}

impl fmt::Debug for ThreadedRenderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadedRenderer")
            .field("handle", &self.handle)
            .field("spec", &self.spec)
            .field("thread", &self.thread.as_ref().map(|t| t.thread().id()))
            .finish_non_exhaustive()
    }
}

/// The loop body. Runs on the render thread until stopped, closed or faulted.
fn run_loop(state: &LoopState, mut display: Box<dyn Display>, spec: &DisplaySpec) {
    let mut surface = Surface::new(spec.width, spec.height);
    let mut pacer = FramePacer::new(state.settings.read().fps);
    let mut warned_late = state.stats.lock().late_frames;

    while state.running.load(Ordering::Acquire) {
        let work_start = Instant::now();
        let frame = state.frames.load(Ordering::Acquire);

        match dispatch_events(state, display.as_mut()) {
            Ok(true) => {}
            Ok(false) => {
                tracing::info!(frame, "close requested");
                break;
            }
            Err(cause) => {
                state.fault(frame, cause);
                break;
            }
        }

        let settings = *state.settings.read();
        pacer.set_fps(settings.fps);
        if let Some(background) = settings.background {
            surface.fill(background);
        }

        if let Err(cause) = draw_instances(state, &mut surface) {
            state.fault(frame, cause);
            break;
        }

        if let Err(error) = display.present(&surface) {
            state.fault(frame, FaultCause::Present(error));
            break;
        }
        state.frames.fetch_add(1, Ordering::AcqRel);

        let work = work_start.elapsed();
        let on_time = pacer.wait();
        let late = {
            let mut stats = state.stats.lock();
            stats.record(work, on_time);
            stats.late_frames
        };
        if late >= warned_late + LATE_WARN_EVERY {
            tracing::warn!(late, fps = settings.fps, "render loop is missing its frame budget");
            warned_late = late;
        }
    }

    state.running.store(false, Ordering::Release);
    drop(display);
    tracing::debug!(frames = state.frames.load(Ordering::Acquire), "render loop exited");
}

/// Drains display events. `Ok(false)` means the loop should exit.
fn dispatch_events(state: &LoopState, display: &mut dyn Display) -> Result<bool, FaultCause> {
    for event in display.poll_events() {
        let kind = event.kind();
        // The slot holds `Running` during the call, so the handler may
        // re-register or clear handlers without deadlocking on the map.
        let handler = state.handlers.lock().get_mut(&kind).and_then(|slot| {
            match std::mem::replace(slot, HandlerSlot::Running) {
                HandlerSlot::Idle(handler) => Some(handler),
                HandlerSlot::Running => None,
            }
        });
        match handler {
            Some(mut handler) => {
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| handler(&event)));
                // Only restore it if nothing cleared or replaced it meanwhile.
                if let Some(slot) = state.handlers.lock().get_mut(&kind) {
                    if matches!(slot, HandlerSlot::Running) {
                        *slot = HandlerSlot::Idle(handler);
                    }
                }
                if let Err(payload) = outcome {
                    return Err(FaultCause::Handler {
                        kind,
                        message: panic_message(payload.as_ref()),
                    });
                }
            }
            None if kind == EventKind::CloseRequested => return Ok(false),
            None => {}
        }
    }
    Ok(true)
}

/// Updates and renders every drawable in order. Stops at the first fault.
fn draw_instances(state: &LoopState, surface: &mut Surface) -> Result<(), FaultCause> {
    let instances = state.instances.lock().clone();

    for (index, drawable) in instances.iter().enumerate() {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| -> DrawResult<()> {
            let mut guard = drawable.lock();
            guard.update()?;
            guard.render(surface)
        }));

        let error = match outcome {
            Ok(Ok(())) => continue,
            Ok(Err(error)) => error,
            Err(payload) => DrawError::Panicked(panic_message(payload.as_ref())),
        };
        let name = drawable.lock().name().to_owned();
        return Err(FaultCause::Drawable { index, name, error });
    }
    Ok(())
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}
