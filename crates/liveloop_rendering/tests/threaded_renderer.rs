//! Integration tests for the threaded renderer on the headless display.

use liveloop_core::{Color, DrawError, DrawResult, Drawable, Rect, Shared, Surface};
use liveloop_rendering::{
    Display, DisplayError, DisplayEvent, DisplaySpec, EventKind, FaultCause, HeadlessProbe, Key,
    RendererConfig, RendererError, ThreadedRenderer,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

const TIMEOUT: Duration = Duration::from_secs(3);

/// A 4x4 square that drifts `dx` pixels per update.
struct Dot {
    x: f64,
    y: f64,
    dx: f64,
    color: Color,
    updates: u64,
}

impl Dot {
    fn at(x: f64, y: f64, color: Color) -> Self {
        Self {
            x,
            y,
            dx: 0.0,
            color,
            updates: 0,
        }
    }
}

impl Drawable for Dot {
    fn update(&mut self) -> DrawResult<()> {
        self.x += self.dx;
        self.updates += 1;
        Ok(())
    }

    fn render(&mut self, surface: &mut Surface) -> DrawResult<()> {
        surface.fill_rect(Rect::centered(self.x, self.y, 2.0), self.color);
        Ok(())
    }

    fn name(&self) -> &str {
        "dot"
    }
}

/// Fails (or panics) on its `fail_at`-th update.
struct Faulty {
    fail_at: u64,
    updates: u64,
    panic: bool,
}

impl Drawable for Faulty {
    fn update(&mut self) -> DrawResult<()> {
        self.updates += 1;
        if self.updates == self.fail_at {
            if self.panic {
                panic!("faulty drawable gave up");
            }
            return Err(DrawError::invalid_field("radius", "-1 is negative"));
        }
        Ok(())
    }

    fn render(&mut self, _surface: &mut Surface) -> DrawResult<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        "faulty"
    }
}

/// Opens fine, then refuses every frame.
struct RefusingDisplay;

impl Display for RefusingDisplay {
    fn poll_events(&mut self) -> Vec<DisplayEvent> {
        Vec::new()
    }

    fn present(&mut self, _surface: &Surface) -> Result<(), DisplayError> {
        Err(DisplayError::Present("swapchain lost".to_owned()))
    }
}

fn config(fps: u32) -> RendererConfig {
    RendererConfig {
        width: 32,
        height: 32,
        fps,
        ..RendererConfig::default()
    }
}

fn started(fps: u32) -> (ThreadedRenderer, HeadlessProbe) {
    let (mut renderer, probe) = ThreadedRenderer::headless(&config(fps)).unwrap();
    renderer.start().unwrap();
    (renderer, probe)
}

fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    condition()
}

fn count_in_last_frame(probe: &HeadlessProbe, color: Color) -> usize {
    probe.last_frame().map_or(0, |frame| frame.count(color))
}

#[test]
fn test_start_opens_display_and_returns() {
    let (renderer, probe) = started(200);

    assert!(renderer.is_running());
    assert!(probe.is_open());
    assert!(probe.wait_for_presents(3, TIMEOUT));
    assert!(renderer.frame_count() >= 2);
}

#[test]
fn test_frame_period_follows_fps() {
    let (renderer, probe) = started(50);
    assert!(probe.wait_for_presents(1, TIMEOUT));

    let start = Instant::now();
    assert!(probe.wait_for_more(10, TIMEOUT));
    let elapsed = start.elapsed();

    // 10 frames at 20ms.
    assert!(elapsed >= Duration::from_millis(170), "too fast: {elapsed:?}");
    assert!(elapsed < Duration::from_millis(1500), "too slow: {elapsed:?}");

    renderer.set_fps(200).unwrap();
    assert!(probe.wait_for_more(2, TIMEOUT));
    let start = Instant::now();
    assert!(probe.wait_for_more(10, TIMEOUT));
    assert!(start.elapsed() < Duration::from_millis(170));
}

#[test]
fn test_push_and_remove_take_effect_next_frame() {
    let (renderer, probe) = started(200);
    let dot = Shared::new(Dot::at(16.0, 16.0, Color::RED));

    assert!(probe.wait_for_presents(2, TIMEOUT));
    assert_eq!(count_in_last_frame(&probe, Color::RED), 0);

    renderer.push(dot.to_dyn());
    assert!(probe.wait_for_more(2, TIMEOUT));
    assert_eq!(count_in_last_frame(&probe, Color::RED), 16);
    assert!(renderer.contains(&dot));

    assert!(renderer.remove(&dot));
    assert!(!renderer.remove(&dot));
    assert!(probe.wait_for_more(2, TIMEOUT));
    assert_eq!(count_in_last_frame(&probe, Color::RED), 0);
}

#[test]
fn test_foreground_edits_are_visible() {
    let dot = Shared::new(Dot::at(16.0, 16.0, Color::RED));
    let (renderer, probe) = ThreadedRenderer::headless(&config(200)).unwrap();
    let mut renderer = renderer.with_instances(vec![dot.to_dyn()]);
    renderer.start().unwrap();

    assert!(probe.wait_for_presents(2, TIMEOUT));
    assert_eq!(count_in_last_frame(&probe, Color::RED), 16);

    dot.lock().color = Color::BLUE;
    assert!(probe.wait_for_more(2, TIMEOUT));
    assert_eq!(count_in_last_frame(&probe, Color::RED), 0);
    assert_eq!(count_in_last_frame(&probe, Color::BLUE), 16);
    assert!(dot.lock().updates >= 3);

    let handle = renderer.handle();
    std::thread::spawn(move || handle.clear()).join().unwrap();
    assert!(renderer.is_empty());
}

#[test]
fn test_draw_order_is_list_order() {
    let under = Shared::new(Dot::at(16.0, 16.0, Color::RED));
    let over = Shared::new(Dot::at(16.0, 16.0, Color::BLUE));
    let (renderer, probe) = ThreadedRenderer::headless(&config(200)).unwrap();
    let mut renderer = renderer.with_instances(vec![under.to_dyn(), over.to_dyn()]);
    renderer.start().unwrap();

    assert!(probe.wait_for_presents(2, TIMEOUT));
    let frame = probe.last_frame().unwrap();
    assert_eq!(frame.pixel(16, 16), Some(Color::BLUE));
    assert_eq!(frame.count(Color::RED), 0);
}

#[test]
fn test_background_none_leaves_trails() {
    let dot = Shared::new(Dot {
        dx: 1.0,
        ..Dot::at(4.0, 16.0, Color::WHITE)
    });
    let wide = RendererConfig {
        width: 256,
        ..config(200)
    };
    let (mut renderer, probe) = ThreadedRenderer::headless(&wide).unwrap();
    renderer.start().unwrap();
    renderer.push(dot.to_dyn());

    assert!(probe.wait_for_more(4, TIMEOUT));
    assert_eq!(count_in_last_frame(&probe, Color::WHITE), 16);

    renderer.set_background(None);
    assert!(probe.wait_for_more(6, TIMEOUT));
    assert!(count_in_last_frame(&probe, Color::WHITE) > 16);

    renderer.set_background(Some(Color::BLACK));
    dot.lock().dx = 0.0;
    assert!(probe.wait_for_more(2, TIMEOUT));
    assert_eq!(count_in_last_frame(&probe, Color::WHITE), 16);
}

#[test]
fn test_start_while_running_is_rejected() {
    let (mut renderer, probe) = started(200);
    assert_eq!(renderer.start(), Err(RendererError::AlreadyRunning));
    assert_eq!(probe.open_count(), 1);
    assert!(renderer.is_running());
}

#[test]
fn test_stop_is_bounded_and_idempotent() {
    let (mut renderer, probe) = started(10);
    assert!(probe.wait_for_presents(1, TIMEOUT));

    let start = Instant::now();
    renderer.stop();
    assert!(start.elapsed() < Duration::from_millis(600));
    assert!(!renderer.is_running());
    assert!(!probe.is_open());

    let presents = probe.presents();
    renderer.stop();
    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(probe.presents(), presents);
}

#[test]
fn test_restart_after_stop() {
    let (mut renderer, probe) = started(200);
    assert!(probe.wait_for_presents(3, TIMEOUT));
    renderer.stop();
    let frames = renderer.frame_count();

    renderer.start().unwrap();
    assert!(probe.wait_for_more(3, TIMEOUT));
    assert_eq!(probe.open_count(), 2);
    assert!(renderer.frame_count() > frames);
}

#[test]
fn test_drawable_error_stops_loop_and_is_reported() {
    let (renderer, _probe) = started(200);
    renderer.push(Shared::new(Dot::at(8.0, 8.0, Color::RED)).to_dyn());
    renderer.push(
        Shared::new(Faulty {
            fail_at: 3,
            updates: 0,
            panic: false,
        })
        .to_dyn(),
    );

    assert!(wait_until(TIMEOUT, || !renderer.is_running()));
    let fault = renderer.last_error().unwrap();
    match &fault.cause {
        FaultCause::Drawable { index, name, error } => {
            assert_eq!(*index, 1);
            assert_eq!(name, "faulty");
            assert!(matches!(error, DrawError::InvalidField { field: "radius", .. }));
        }
        other => panic!("unexpected cause: {other:?}"),
    }
    assert!(fault.to_string().contains("faulty #1"));
}

#[test]
fn test_drawable_panic_is_captured() {
    let (mut renderer, probe) = started(200);
    renderer.push(
        Shared::new(Faulty {
            fail_at: 2,
            updates: 0,
            panic: true,
        })
        .to_dyn(),
    );

    assert!(wait_until(TIMEOUT, || !renderer.is_running()));
    assert!(wait_until(TIMEOUT, || !probe.is_open()));
    let fault = renderer.last_error().unwrap();
    assert!(matches!(
        fault.cause,
        FaultCause::Drawable {
            error: DrawError::Panicked(ref message),
            ..
        } if message == "faulty drawable gave up"
    ));

    // The object is not poisoned; clearing it lets the loop run again.
    renderer.clear();
    renderer.start().unwrap();
    assert!(renderer.last_error().is_none());
    assert!(probe.wait_for_more(2, TIMEOUT));
}

#[test]
fn test_display_init_failure_surfaces_from_start() {
    let factory = |_: &DisplaySpec| -> Result<Box<dyn Display>, DisplayError> {
        Err(DisplayError::Init("no display here".to_owned()))
    };
    let mut renderer = ThreadedRenderer::new(&config(30), factory).unwrap();

    let result = renderer.start();
    assert_eq!(
        result,
        Err(RendererError::Display(DisplayError::Init("no display here".to_owned())))
    );
    assert!(!renderer.is_running());
    assert_eq!(renderer.frame_count(), 0);
}

#[test]
fn test_close_event_ends_loop() {
    let (renderer, probe) = started(200);
    assert!(probe.wait_for_presents(1, TIMEOUT));

    probe.inject(DisplayEvent::CloseRequested);
    assert!(wait_until(TIMEOUT, || !renderer.is_running()));
    assert!(wait_until(TIMEOUT, || !probe.is_open()));
    assert!(renderer.last_error().is_none());
}

#[test]
fn test_close_handler_overrides_exit() {
    let (renderer, probe) = started(200);
    let closes = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&closes);
    renderer.on_event(EventKind::CloseRequested, move |_| {
        seen.fetch_add(1, Ordering::SeqCst);
    });

    probe.inject(DisplayEvent::CloseRequested);
    assert!(wait_until(TIMEOUT, || closes.load(Ordering::SeqCst) == 1));
    assert!(probe.wait_for_more(2, TIMEOUT));
    assert!(renderer.is_running());
}

#[test]
fn test_handler_can_drive_renderer() {
    let (renderer, probe) = started(200);
    let handle = renderer.handle();
    renderer.on_event(EventKind::KeyPressed, move |event| {
        if *event == DisplayEvent::KeyPressed(Key::Char('t')) {
            handle.set_background(None);
        }
    });

    probe.inject(DisplayEvent::KeyPressed(Key::Char('x')));
    assert!(probe.wait_for_more(2, TIMEOUT));
    assert_eq!(renderer.background(), Some(Color::BLACK));

    probe.inject(DisplayEvent::KeyPressed(Key::Char('t')));
    assert!(wait_until(TIMEOUT, || renderer.background().is_none()));
}

#[test]
fn test_handler_can_clear_itself() {
    let (renderer, probe) = started(200);
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&calls);
    let handle = renderer.handle();
    renderer.on_event(EventKind::KeyPressed, move |_| {
        seen.fetch_add(1, Ordering::SeqCst);
        handle.clear_handler(EventKind::KeyPressed);
    });

    probe.inject(DisplayEvent::KeyPressed(Key::Space));
    assert!(wait_until(TIMEOUT, || calls.load(Ordering::SeqCst) == 1));
    probe.inject(DisplayEvent::KeyPressed(Key::Space));
    assert!(probe.wait_for_more(3, TIMEOUT));

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(!renderer.clear_handler(EventKind::KeyPressed));
}

#[test]
fn test_handler_can_replace_itself() {
    let (renderer, probe) = started(200);
    let handle = renderer.handle();
    renderer.on_event(EventKind::KeyPressed, move |_| {
        handle.set_background(Some(Color::RED));
        let inner = handle.clone();
        handle.on_event(EventKind::KeyPressed, move |_| {
            inner.set_background(Some(Color::BLUE));
        });
    });

    probe.inject(DisplayEvent::KeyPressed(Key::Space));
    assert!(wait_until(TIMEOUT, || renderer.background() == Some(Color::RED)));
    probe.inject(DisplayEvent::KeyPressed(Key::Space));
    assert!(wait_until(TIMEOUT, || renderer.background() == Some(Color::BLUE)));
}

#[test]
fn test_handler_panic_stops_loop_and_is_reported() {
    let (renderer, probe) = started(200);
    renderer.on_event(EventKind::MouseDown, |_| panic!("click handler gave up"));
    assert!(probe.wait_for_presents(1, TIMEOUT));

    probe.inject(DisplayEvent::MouseDown { x: 1.0, y: 2.0 });
    assert!(wait_until(TIMEOUT, || !renderer.is_running()));
    assert!(wait_until(TIMEOUT, || !probe.is_open()));

    let fault = renderer.last_error().unwrap();
    assert_eq!(
        fault.cause,
        FaultCause::Handler {
            kind: EventKind::MouseDown,
            message: "click handler gave up".to_owned(),
        }
    );
    assert!(fault.to_string().contains("MouseDown handler panicked"));
}

#[test]
fn test_present_failure_stops_loop_and_is_reported() {
    let factory = |_: &DisplaySpec| -> Result<Box<dyn Display>, DisplayError> {
        Ok(Box::new(RefusingDisplay))
    };
    let mut renderer = ThreadedRenderer::new(&config(200), factory).unwrap();
    renderer.start().unwrap();

    assert!(wait_until(TIMEOUT, || !renderer.is_running()));
    let fault = renderer.last_error().unwrap();
    assert_eq!(fault.frame, 0);
    assert_eq!(
        fault.cause,
        FaultCause::Present(DisplayError::Present("swapchain lost".to_owned()))
    );
    assert_eq!(renderer.frame_count(), 0);
}

#[test]
fn test_display_closed_underneath_loop() {
    let (renderer, probe) = started(200);
    assert!(probe.wait_for_presents(2, TIMEOUT));

    probe.close();
    assert!(wait_until(TIMEOUT, || !renderer.is_running()));
    let fault = renderer.last_error().unwrap();
    assert_eq!(fault.cause, FaultCause::Present(DisplayError::Closed));
    assert_eq!(renderer.frame_count(), fault.frame);
}

#[test]
fn test_stats_track_frames() {
    let (renderer, probe) = started(200);
    assert!(probe.wait_for_presents(5, TIMEOUT));
    let stats = renderer.stats();
    assert!(stats.frames >= 4);
    assert!(stats.worst_frame_us >= stats.avg_frame_us);
}

#[test]
fn test_drop_stops_thread() {
    let (renderer, probe) = started(200);
    assert!(probe.wait_for_presents(1, TIMEOUT));
    drop(renderer);
    assert!(!probe.is_open());
}
