//! Engine: owns the queues, registry, dispatcher and main loop, and exposes
//! the registration and loop-control API applications use.

use crate::config::EngineConfig;
use crate::dispatch::{self, Dispatcher};
use crate::error::DwError;
use crate::main_loop::{LoopState, MainLoop};
use crate::producer::Producer;
use crate::queue::{EventQueues, Priority};
use crate::registry::{DisconnectFn, Handler, HandlerRegistry, TimerFn};
use crate::toolkit::Toolkit;
use crate::types::{EventKind, UserData, WindowHandle};
use crate::wake::WakeEvent;
use log::info;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

pub struct Engine {
    toolkit: Arc<dyn Toolkit>,
    registry: Arc<HandlerRegistry>,
    queues: Arc<EventQueues>,
    render_safe: Arc<AtomicBool>,
    dispatcher: Arc<Dispatcher>,
    main_loop: MainLoop,
}

impl Engine {
    /// Build every component up front so no producer can observe a
    /// half-initialised queue.
    pub fn new(config: &EngineConfig, toolkit: Arc<dyn Toolkit>) -> Self {
        let wake = WakeEvent::new();
        let queues = Arc::new(EventQueues::new(
            config.queue_capacity,
            config.enqueue_spin_limit,
            &wake,
        ));
        let registry = Arc::new(HandlerRegistry::new(toolkit.clone()));
        let render_safe = Arc::new(AtomicBool::new(config.render_safe));
        let dispatcher = Arc::new(Dispatcher::new(
            toolkit.clone(),
            registry.clone(),
            render_safe.clone(),
        ));
        let main_loop = MainLoop::new(
            queues.clone(),
            dispatcher.clone(),
            toolkit.clone(),
            wake,
            config.poll_interval(),
            config.drain_policy,
        );

        info!(
            "Engine ready on {} toolkit (queue capacity {}, render-safe {})",
            toolkit.name(),
            config.queue_capacity,
            config.render_safe
        );

        Self {
            toolkit,
            registry,
            queues,
            render_safe,
            dispatcher,
            main_loop,
        }
    }

    /// Make the calling thread the UI thread.
    /// Returns false if another thread already is.
    pub fn init_ui_thread(&self) -> bool {
        self.main_loop.claim_ui_thread()
    }

    /// Register `handler` for the signal called `name` on `window`.
    ///
    /// Connecting the same callback to the same window and signal again
    /// replaces its data and keeps the original disconnect callback.
    pub fn connect(
        &self,
        window: WindowHandle,
        name: &str,
        handler: Handler,
        disconnect: Option<DisconnectFn>,
        data: UserData,
    ) -> Result<(), DwError> {
        let kind =
            EventKind::from_name(name).ok_or_else(|| DwError::UnknownSignal(name.to_string()))?;
        if handler.kind() != kind {
            return Err(DwError::HandlerMismatch {
                expected: kind,
                actual: handler.kind(),
            });
        }

        self.registry.connect(window, handler, disconnect, data);
        Ok(())
    }

    /// Remove the handlers for signal `name` on `window`.
    /// Unknown names remove nothing.
    pub fn disconnect_by_name(&self, window: WindowHandle, name: &str) -> usize {
        match EventKind::from_name(name) {
            Some(kind) => self.registry.disconnect_by_name(window, kind),
            None => 0,
        }
    }

    /// Remove every handler on `window`.
    pub fn disconnect_by_window(&self, window: WindowHandle) -> usize {
        self.registry.disconnect_by_window(window)
    }

    /// Remove every handler on `window` registered with `data`.
    pub fn disconnect_by_data(&self, window: WindowHandle, data: &UserData) -> usize {
        self.registry.disconnect_by_data(window, data)
    }

    /// Start a recurring timer. The callback keeps running while it
    /// returns non-zero.
    pub fn timer_connect(
        &self,
        interval: Duration,
        callback: TimerFn,
        data: UserData,
    ) -> WindowHandle {
        let timer = self.toolkit.start_timer(interval);
        self.registry
            .connect(timer, Handler::Timer(callback), None, data);
        timer
    }

    pub fn timer_disconnect(&self, timer: WindowHandle) {
        dispatch::cancel_timer(self.toolkit.as_ref(), &self.registry, timer);
    }

    /// Destroy a native window and drop its handlers.
    pub fn destroy_window(&self, window: WindowHandle) {
        dispatch::destroy_window(self.toolkit.as_ref(), &self.registry, window);
    }

    pub fn render_safe(&self) -> bool {
        self.render_safe.load(Ordering::Acquire)
    }

    pub fn set_render_safe(&self, enabled: bool) {
        self.render_safe.store(enabled, Ordering::Release);
    }

    /// A front-end for a native callback thread.
    pub fn producer(&self) -> Producer {
        Producer::new(
            self.registry.clone(),
            self.queues.clone(),
            self.dispatcher.clone(),
        )
    }

    /// Run the main loop until [`Engine::main_quit`].
    pub fn main(&self) {
        self.main_loop.run_forever();
    }

    /// Run the main loop for `duration`.
    pub fn main_sleep(&self, duration: Duration) {
        self.main_loop.run_for(duration);
    }

    /// Dispatch at most one pending event.
    pub fn main_iteration(&self) -> bool {
        self.main_loop.run_one_iteration()
    }

    pub fn main_quit(&self) {
        self.main_loop.quit();
    }

    pub fn is_running(&self) -> bool {
        self.main_loop.is_active()
    }

    pub fn loop_state(&self) -> LoopState {
        self.main_loop.state()
    }

    pub fn queue_len(&self, priority: Priority) -> usize {
        self.queues.get(priority).len()
    }

    pub fn handler_count(&self) -> usize {
        self.registry.len()
    }

    pub fn toolkit(&self) -> &Arc<dyn Toolkit> {
        &self.toolkit
    }
}

#[cfg(all(test, feature = "headless"))]
mod tests {
    use super::*;
    use crate::headless::{HeadlessToolkit, ToolkitCall};
    use crate::main_loop::DrainPolicy;
    use crate::producer::QUEUED;
    use crate::types::{Event, ExposeRect, RawParams};
    use std::sync::Mutex;
    use std::sync::atomic::AtomicUsize;
    use std::thread;
    use std::time::Instant;

    fn engine_with(config: EngineConfig) -> (Arc<HeadlessToolkit>, Arc<Engine>) {
        let toolkit = Arc::new(HeadlessToolkit::new());
        let engine = Arc::new(Engine::new(&config, toolkit.clone()));
        (toolkit, engine)
    }

    fn engine() -> (Arc<HeadlessToolkit>, Arc<Engine>) {
        engine_with(EngineConfig::default())
    }

    /// Records (window, label) for every invocation.
    type Log = Arc<Mutex<Vec<(WindowHandle, &'static str)>>>;

    fn clicked_logger(log: &Log, label: &'static str) -> Handler {
        let log = log.clone();
        Handler::clicked(move |w, _| {
            log.lock().unwrap().push((w, label));
            1
        })
    }

    #[test]
    fn test_unknown_signal_is_rejected() {
        let (toolkit, engine) = engine();
        let window = toolkit.create_window();
        let result = engine.connect(
            window,
            "no-such-signal",
            Handler::clicked(|_, _| 0),
            None,
            UserData::none(),
        );
        assert!(matches!(result, Err(DwError::UnknownSignal(_))));
        assert_eq!(engine.handler_count(), 0);
    }

    #[test]
    fn test_handler_kind_must_match_name() {
        let (toolkit, engine) = engine();
        let window = toolkit.create_window();
        let result = engine.connect(
            window,
            "configure_event",
            Handler::clicked(|_, _| 0),
            None,
            UserData::none(),
        );
        assert!(matches!(
            result,
            Err(DwError::HandlerMismatch {
                expected: EventKind::Configure,
                actual: EventKind::Clicked
            })
        ));
        assert_eq!(engine.handler_count(), 0);
    }

    #[test]
    fn test_end_to_end_clicked() {
        let (toolkit, engine) = engine();
        assert!(engine.init_ui_thread());
        let window = toolkit.create_window();
        let producer = engine.producer();

        // No handler yet: dropped, nothing queued.
        assert_eq!(producer.on_native_event(window, Event::Clicked), 0);
        assert_eq!(engine.queue_len(Priority::High), 0);
        assert_eq!(engine.queue_len(Priority::Low), 0);

        let log: Log = Arc::new(Mutex::new(Vec::new()));
        engine
            .connect(window, "CLICKED", clicked_logger(&log, "click"), None, UserData::none())
            .unwrap();

        assert_eq!(producer.on_native_event(window, Event::Clicked), 0);
        assert_eq!(engine.queue_len(Priority::High), 1);

        assert!(engine.main_iteration());
        assert_eq!(engine.queue_len(Priority::High), 0);
        assert_eq!(*log.lock().unwrap(), vec![(window, "click")]);
        assert!(!engine.main_iteration());
    }

    #[test]
    fn test_upsert_dispatches_latest_data() {
        let (toolkit, engine) = engine();
        engine.init_ui_thread();
        let window = toolkit.create_window();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = seen.clone();
        let handler = Handler::clicked(move |_, d| {
            sink.lock().unwrap().push(*d.downcast_ref::<u32>().unwrap());
            1
        });

        engine
            .connect(window, "clicked", handler.clone(), None, UserData::new(1u32))
            .unwrap();
        engine
            .connect(window, "clicked", handler, None, UserData::new(2u32))
            .unwrap();
        assert_eq!(engine.handler_count(), 1);

        engine.producer().on_native_event(window, Event::Clicked);
        engine.main_iteration();
        assert_eq!(*seen.lock().unwrap(), vec![2]);
    }

    #[test]
    fn test_disconnect_by_window_cleans_up_once() {
        let (toolkit, engine) = engine();
        engine.init_ui_thread();
        let window = toolkit.create_window();
        let data = UserData::new("owner");
        let cleanups = Arc::new(Mutex::new(Vec::new()));

        let sink = cleanups.clone();
        let expected = data.clone();
        let disconnect: DisconnectFn = Arc::new(move |w: WindowHandle, d: &UserData| {
            sink.lock().unwrap().push((w, d.same_as(&expected)));
        });
        let log: Log = Arc::new(Mutex::new(Vec::new()));
        engine
            .connect(window, "clicked", clicked_logger(&log, "x"), Some(disconnect), data)
            .unwrap();

        assert_eq!(engine.disconnect_by_window(window), 1);
        assert_eq!(*cleanups.lock().unwrap(), vec![(window, true)]);

        engine.producer().on_native_event(window, Event::Clicked);
        assert_eq!(engine.queue_len(Priority::High), 0);
        assert!(!engine.main_iteration());
        assert!(log.lock().unwrap().is_empty());
        assert_eq!(cleanups.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_queued_event_dropped_after_disconnect() {
        let (toolkit, engine) = engine();
        engine.init_ui_thread();
        let window = toolkit.create_window();
        let log: Log = Arc::new(Mutex::new(Vec::new()));
        engine
            .connect(window, "clicked", clicked_logger(&log, "x"), None, UserData::none())
            .unwrap();

        engine.producer().on_native_event(window, Event::Clicked);
        assert_eq!(engine.disconnect_by_name(window, "clicked"), 1);

        assert!(engine.main_iteration());
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_unhandled_delete_destroys_window() {
        let (toolkit, engine) = engine();
        let window = toolkit.create_window();
        let producer = engine.producer();

        assert_eq!(producer.on_native_event(window, Event::Delete), 0);
        assert!(!toolkit.is_alive(window));
        assert_eq!(engine.queue_len(Priority::High), 0);
    }

    #[test]
    fn test_delete_veto_through_queue() {
        let (toolkit, engine) = engine();
        engine.init_ui_thread();
        let window = toolkit.create_window();
        let veto = Arc::new(AtomicBool::new(true));

        let flag = veto.clone();
        engine
            .connect(
                window,
                "delete_event",
                Handler::delete(move |_, _| flag.load(Ordering::SeqCst) as i32),
                None,
                UserData::none(),
            )
            .unwrap();

        let producer = engine.producer();
        producer.on_native_event(window, Event::Delete);
        engine.main_iteration();
        assert!(toolkit.is_alive(window));

        veto.store(false, Ordering::SeqCst);
        producer.on_native_event(window, Event::Delete);
        engine.main_iteration();
        assert!(!toolkit.is_alive(window));
        assert_eq!(engine.handler_count(), 0);
    }

    #[test]
    fn test_expose_direct_outside_render_safe() {
        let (toolkit, engine) = engine();
        let window = toolkit.create_window();
        engine
            .connect(
                window,
                "expose_event",
                Handler::expose(|_, area, _| area.width + area.height),
                None,
                UserData::none(),
            )
            .unwrap();

        // Producer thread gets the real result back.
        let producer = engine.producer();
        let result = thread::spawn(move || {
            producer.on_native_event(
                window,
                Event::Expose(ExposeRect {
                    x: 0,
                    y: 0,
                    width: 3,
                    height: 4,
                }),
            )
        })
        .join()
        .unwrap();

        assert_eq!(result, 7);
        assert_eq!(engine.queue_len(Priority::Low), 0);
        assert_eq!(engine.queue_len(Priority::High), 0);
    }

    #[test]
    fn test_expose_deferred_in_render_safe() {
        let (toolkit, engine) = engine_with(EngineConfig {
            render_safe: true,
            ..Default::default()
        });
        engine.init_ui_thread();
        let window = toolkit.create_window();
        let draws = Arc::new(AtomicUsize::new(0));
        let counter = draws.clone();
        engine
            .connect(
                window,
                "expose",
                Handler::expose(move |_, _, _| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    5
                }),
                None,
                UserData::none(),
            )
            .unwrap();

        let area = ExposeRect {
            x: 1,
            y: 2,
            width: 3,
            height: 4,
        };
        assert_eq!(engine.producer().on_native_event(window, Event::Expose(area)), 0);
        assert_eq!(engine.queue_len(Priority::Low), 1);
        assert_eq!(draws.load(Ordering::SeqCst), 0);

        engine.main_iteration();
        assert_eq!(draws.load(Ordering::SeqCst), 1);
        assert_eq!(
            toolkit.calls(),
            vec![
                ToolkitCall::BeginSafeDraw(window, area),
                ToolkitCall::FinishSafeDraw(window, area),
            ]
        );
    }

    #[test]
    fn test_render_safe_toggle_changes_routing() {
        let (toolkit, engine) = engine();
        let window = toolkit.create_window();
        engine
            .connect(window, "expose", Handler::expose(|_, _, _| 1), None, UserData::none())
            .unwrap();
        let producer = engine.producer();

        assert_eq!(producer.on_native_event(window, Event::Expose(ExposeRect::default())), 1);
        engine.set_render_safe(true);
        assert!(engine.render_safe());
        assert_eq!(producer.on_native_event(window, Event::Expose(ExposeRect::default())), 0);
        assert_eq!(engine.queue_len(Priority::Low), 1);
    }

    #[test]
    fn test_high_queue_drains_before_low() {
        let (toolkit, engine) = engine_with(EngineConfig {
            render_safe: true,
            ..Default::default()
        });
        engine.init_ui_thread();
        let window = toolkit.create_window();
        let order = Arc::new(Mutex::new(Vec::new()));

        let sink = order.clone();
        engine
            .connect(
                window,
                "expose",
                Handler::expose(move |_, area, _| {
                    sink.lock().unwrap().push(format!("draw{}", area.x));
                    1
                }),
                None,
                UserData::none(),
            )
            .unwrap();
        let sink = order.clone();
        engine
            .connect(
                window,
                "value_changed",
                Handler::value_changed(move |_, pos, _| {
                    sink.lock().unwrap().push(format!("value{}", pos));
                    1
                }),
                None,
                UserData::none(),
            )
            .unwrap();

        let producer = engine.producer();
        for i in 0..3 {
            producer.on_native_event(
                window,
                Event::Expose(ExposeRect {
                    x: i,
                    ..Default::default()
                }),
            );
            producer.on_native_event(window, Event::ValueChanged { position: i });
        }

        engine.main_sleep(Duration::ZERO);
        assert_eq!(
            *order.lock().unwrap(),
            vec!["value0", "value1", "value2", "draw0", "draw1", "draw2"]
        );
    }

    #[test]
    fn test_recheck_high_policy_preempts_low() {
        let (toolkit, engine) = engine_with(EngineConfig {
            render_safe: true,
            drain_policy: DrainPolicy::RecheckHigh,
            ..Default::default()
        });
        engine.init_ui_thread();
        let window = toolkit.create_window();
        let order = Arc::new(Mutex::new(Vec::new()));

        // The first draw posts a click; it must run before the second draw.
        let sink = order.clone();
        let producer = engine.producer();
        engine
            .connect(
                window,
                "expose",
                Handler::expose(move |w, area, _| {
                    sink.lock().unwrap().push(format!("draw{}", area.x));
                    if area.x == 0 {
                        producer.on_native_event(w, Event::Clicked);
                    }
                    1
                }),
                None,
                UserData::none(),
            )
            .unwrap();
        let sink = order.clone();
        engine
            .connect(
                window,
                "clicked",
                Handler::clicked(move |_, _| {
                    sink.lock().unwrap().push("click".to_string());
                    1
                }),
                None,
                UserData::none(),
            )
            .unwrap();

        let producer = engine.producer();
        for x in 0..2 {
            producer.on_native_event(
                window,
                Event::Expose(ExposeRect {
                    x,
                    ..Default::default()
                }),
            );
        }

        engine.main_sleep(Duration::ZERO);
        assert_eq!(*order.lock().unwrap(), vec!["draw0", "click", "draw1"]);
    }

    #[test]
    fn test_full_queue_drops_events() {
        let (toolkit, engine) = engine_with(EngineConfig {
            queue_capacity: 4,
            ..Default::default()
        });
        engine.init_ui_thread();
        let window = toolkit.create_window();
        let log: Log = Arc::new(Mutex::new(Vec::new()));
        engine
            .connect(window, "clicked", clicked_logger(&log, "x"), None, UserData::none())
            .unwrap();

        let producer = engine.producer();
        for _ in 0..10 {
            producer.on_native_event(window, Event::Clicked);
        }
        assert_eq!(engine.queue_len(Priority::High), 4);

        engine.main_sleep(Duration::ZERO);
        assert_eq!(log.lock().unwrap().len(), 4);
    }

    #[test]
    fn test_quit_wakes_blocked_loop() {
        let (_toolkit, engine) = engine_with(EngineConfig {
            poll_interval_ms: 10_000,
            ..Default::default()
        });

        let runner = engine.clone();
        let handle = thread::spawn(move || runner.main());

        // Let the loop reach its wait.
        let start = Instant::now();
        while engine.loop_state() != LoopState::Waiting
            && start.elapsed() < Duration::from_secs(5)
        {
            thread::sleep(Duration::from_millis(5));
        }

        let quit_at = Instant::now();
        engine.main_quit();
        handle.join().unwrap();

        assert!(quit_at.elapsed() < Duration::from_secs(5));
        assert!(!engine.is_running());
        assert_eq!(engine.loop_state(), LoopState::Idle);
    }

    #[test]
    fn test_quit_from_callback() {
        let (toolkit, engine) = engine();
        let window = toolkit.create_window();
        let quitter = Arc::downgrade(&engine);
        engine
            .connect(
                window,
                "clicked",
                Handler::clicked(move |_, _| {
                    if let Some(engine) = quitter.upgrade() {
                        engine.main_quit();
                    }
                    1
                }),
                None,
                UserData::none(),
            )
            .unwrap();

        let producer = engine.producer();
        let runner = engine.clone();
        let handle = thread::spawn(move || runner.main());
        producer.on_native_event(window, Event::Clicked);

        handle.join().unwrap();
        assert!(!engine.is_running());
    }

    #[test]
    fn test_main_sleep_returns_after_duration() {
        let (_toolkit, engine) = engine();
        engine.init_ui_thread();

        let start = Instant::now();
        engine.main_sleep(Duration::from_millis(50));
        let elapsed = start.elapsed();

        assert!(elapsed >= Duration::from_millis(50));
        assert!(elapsed < Duration::from_secs(5));
        assert!(engine.is_running());
    }

    #[test]
    fn test_foreign_thread_uses_toolkit_pump() {
        let (toolkit, engine) = engine();
        engine.init_ui_thread();

        let foreign = engine.clone();
        thread::spawn(move || {
            foreign.main_sleep(Duration::from_millis(5));
            assert!(!foreign.main_iteration());
        })
        .join()
        .unwrap();

        assert_eq!(
            toolkit.calls(),
            vec![
                ToolkitCall::PumpFor(Duration::from_millis(5)),
                ToolkitCall::PumpFor(Duration::ZERO),
            ]
        );
    }

    #[test]
    fn test_timer_runs_until_callback_returns_zero() {
        let (toolkit, engine) = engine();
        engine.init_ui_thread();
        let ticks = Arc::new(AtomicUsize::new(0));

        let counter = ticks.clone();
        let callback: TimerFn = Arc::new(move |_: &UserData| {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            (n < 3) as i32
        });
        let timer = engine.timer_connect(Duration::from_millis(1), callback, UserData::none());
        assert_eq!(toolkit.active_timers().len(), 1);

        let producer = engine.producer();
        for _ in 0..5 {
            producer.on_native_event(timer, Event::Timer);
            engine.main_iteration();
        }

        assert_eq!(ticks.load(Ordering::SeqCst), 3);
        assert!(toolkit.active_timers().is_empty());
        assert_eq!(engine.handler_count(), 0);
    }

    #[test]
    fn test_timer_disconnect() {
        let (toolkit, engine) = engine();
        let callback: TimerFn = Arc::new(|_: &UserData| 1);
        let timer = engine.timer_connect(Duration::from_millis(1), callback, UserData::none());

        engine.timer_disconnect(timer);
        assert!(toolkit.active_timers().is_empty());
        assert_eq!(engine.handler_count(), 0);
    }

    #[test]
    fn test_raw_events() {
        let (toolkit, engine) = engine();
        engine.init_ui_thread();
        let window = toolkit.create_window();
        let got = Arc::new(Mutex::new(None));

        let sink = got.clone();
        engine
            .connect(
                window,
                "html-message",
                Handler::html_message(move |_, name, message, _| {
                    let name = name.map(str::to_string);
                    let message = message.map(str::to_string);
                    *sink.lock().unwrap() = Some((name, message));
                    1
                }),
                None,
                UserData::none(),
            )
            .unwrap();

        let producer = engine.producer();
        assert_eq!(
            producer.on_raw_event(window, 42, RawParams::default()),
            dispatch::DISPATCH_UNHANDLED
        );

        let raw = RawParams {
            text: [Some("bridge".to_string()), Some("hello".to_string())],
            ..Default::default()
        };
        assert_eq!(producer.on_raw_event(window, EventKind::HtmlMessage.code(), raw), 0);
        engine.main_iteration();

        assert_eq!(
            *got.lock().unwrap(),
            Some((Some("bridge".to_string()), Some("hello".to_string())))
        );
    }

    #[test]
    fn test_raw_payloads_reach_typed_callbacks() {
        let (toolkit, engine) = engine();
        engine.init_ui_thread();
        let window = toolkit.create_window();
        let seen: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));

        fn num(d: &UserData) -> i32 {
            d.downcast_ref::<i32>().copied().unwrap_or(-1)
        }
        let sink = |seen: &Arc<Mutex<Vec<String>>>| {
            let seen = seen.clone();
            move |line: String| seen.lock().unwrap().push(line)
        };

        let handlers = vec![
            ("button_press_event", {
                let push = sink(&seen);
                Handler::button_press(move |_, p, d| {
                    push(format!("press {} {} {} {}", p.x, p.y, p.button, num(d)));
                    1
                })
            }),
            ("button_release_event", {
                let push = sink(&seen);
                Handler::button_release(move |_, p, d| {
                    push(format!("release {} {} {} {}", p.x, p.y, p.button, num(d)));
                    1
                })
            }),
            ("container-select", {
                let push = sink(&seen);
                Handler::item_enter(move |_, text, d, item| {
                    push(format!("enter {:?} {} {}", text, num(d), num(item)));
                    1
                })
            }),
            ("container-context", {
                let push = sink(&seen);
                Handler::item_context(move |_, text, x, y, d, item| {
                    push(format!("context {:?} {} {} {} {}", text, x, y, num(d), num(item)));
                    1
                })
            }),
            ("tree-select", {
                let push = sink(&seen);
                Handler::tree_select(move |_, item, text, d, item_data| {
                    push(format!("tree {} {:?} {} {}", item.0, text, num(d), num(item_data)));
                    1
                })
            }),
            ("item-select", {
                let push = sink(&seen);
                Handler::list_select(move |_, index, d| {
                    push(format!("list {} {}", index, num(d)));
                    1
                })
            }),
            ("set-focus", {
                let push = sink(&seen);
                Handler::set_focus(move |_, d| {
                    push(format!("focus {}", num(d)));
                    1
                })
            }),
            ("switch-page", {
                let push = sink(&seen);
                Handler::switch_page(move |_, page, d| {
                    push(format!("page {} {}", page, num(d)));
                    1
                })
            }),
            ("click-column", {
                let push = sink(&seen);
                Handler::column_click(move |_, column, d| {
                    push(format!("column {} {}", column, num(d)));
                    1
                })
            }),
            ("tree-expand", {
                let push = sink(&seen);
                Handler::tree_expand(move |_, item, d| {
                    push(format!("expand {} {}", item.0, num(d)));
                    1
                })
            }),
            ("html-result", {
                let push = sink(&seen);
                Handler::html_result(move |_, status, result, script, d| {
                    push(format!("result {} {:?} {} {}", status, result, num(script), num(d)));
                    1
                })
            }),
            ("html-changed", {
                let push = sink(&seen);
                Handler::html_changed(move |_, status, url, d| {
                    push(format!("changed {} {:?} {}", status, url, num(d)));
                    1
                })
            }),
        ];
        for (name, handler) in handlers {
            engine
                .connect(window, name, handler, None, UserData::new(7i32))
                .unwrap();
        }

        let raw = |item: u64, item_data: Option<i32>, text: Option<&str>, ints: [i64; 4]| {
            RawParams {
                item,
                item_data: item_data.map(UserData::new).unwrap_or_default(),
                text: [text.map(str::to_string), Some("unused".to_string())],
                ints,
            }
        };
        let cases = vec![
            (EventKind::ButtonPress, raw(0, None, None, [3, 4, 1, 0]), "press 3 4 1 7"),
            (EventKind::ButtonRelease, raw(0, None, None, [5, 6, 2, 0]), "release 5 6 2 7"),
            (
                EventKind::ItemEnter,
                raw(0, Some(9), Some("row"), [0; 4]),
                r#"enter Some("row") 7 9"#,
            ),
            (
                EventKind::ItemContext,
                raw(0, Some(9), Some("c"), [5, 6, 0, 0]),
                r#"context Some("c") 5 6 7 9"#,
            ),
            (
                EventKind::TreeSelect,
                raw(77, Some(9), Some("node"), [0; 4]),
                r#"tree 77 Some("node") 7 9"#,
            ),
            (EventKind::ListSelect, raw(0, None, None, [4, 0, 0, 0]), "list 4 7"),
            (EventKind::SetFocus, raw(0, None, None, [0; 4]), "focus 7"),
            (EventKind::SwitchPage, raw(0, None, None, [12, 0, 0, 0]), "page 12 7"),
            (EventKind::ColumnClick, raw(0, None, None, [2, 0, 0, 0]), "column 2 7"),
            (EventKind::TreeExpand, raw(55, None, None, [0; 4]), "expand 55 7"),
            (
                EventKind::HtmlResult,
                raw(0, Some(3), Some("ok"), [1, 0, 0, 0]),
                r#"result 1 Some("ok") 3 7"#,
            ),
            (
                EventKind::HtmlChanged,
                raw(0, None, Some("https://example.org"), [2, 0, 0, 0]),
                r#"changed 2 Some("https://example.org") 7"#,
            ),
            (EventKind::HtmlChanged, raw(0, None, None, [3, 0, 0, 0]), "changed 3 None 7"),
        ];

        let producer = engine.producer();
        for (kind, params, expected) in cases {
            assert_eq!(producer.on_raw_event(window, kind.code(), params), QUEUED);
            assert!(engine.main_iteration(), "{} was not queued", kind);
            assert_eq!(seen.lock().unwrap().pop().as_deref(), Some(expected), "{}", kind);
        }
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_producers_on_many_threads() {
        let (toolkit, engine) = engine();
        engine.init_ui_thread();
        let window = toolkit.create_window();
        let hits = Arc::new(AtomicUsize::new(0));

        let counter = hits.clone();
        engine
            .connect(
                window,
                "clicked",
                Handler::clicked(move |_, _| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    1
                }),
                None,
                UserData::none(),
            )
            .unwrap();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let producer = engine.producer();
                thread::spawn(move || {
                    for _ in 0..10 {
                        producer.on_native_event(window, Event::Clicked);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        engine.main_sleep(Duration::ZERO);
        assert_eq!(hits.load(Ordering::SeqCst), 40);
    }

    #[test]
    fn test_same_window_through_alias() {
        let (toolkit, engine) = engine();
        engine.init_ui_thread();
        let window = toolkit.create_window();
        let log: Log = Arc::new(Mutex::new(Vec::new()));
        engine
            .connect(window, "clicked", clicked_logger(&log, "x"), None, UserData::none())
            .unwrap();

        let alias = toolkit.alias(window);
        engine.producer().on_native_event(alias, Event::Clicked);
        engine.main_iteration();

        assert_eq!(*log.lock().unwrap(), vec![(alias, "x")]);
    }
}
