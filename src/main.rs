//! dwtest - Dynamic Windows event engine demo
//!
//! Drives the engine with the headless toolkit: a simulator thread plays the
//! part of the native callback thread while this thread runs the main loop.

mod simulator;

use dw_core::headless::{HeadlessToolkit, ToolkitCall};
use dw_core::{DisconnectFn, Engine, EngineConfig, Handler, TimerFn, UserData, WindowHandle};
use log::{debug, info};
use simulator::{Simulator, Targets};
use std::error::Error;
use std::path::PathBuf;
use std::sync::atomic::{AtomicI32, AtomicU32, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

const DEFAULT_CONFIG_FILE: &str = "dwtest.json";
const HEARTBEAT_INTERVAL_MS: u64 = 100;
const HEARTBEAT_TICKS: u32 = 5;
/// Upper bound on the demo's run time if nothing closes the main window.
const MAX_RUN_TIME: Duration = Duration::from_secs(10);

fn config_path() -> PathBuf {
    std::env::args()
        .nth(1)
        .or_else(|| std::env::var("DW_CONFIG").ok())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let path = config_path();
    let config = EngineConfig::load_or_default(&path).with_env_overrides();
    debug!("Effective config: {}", serde_json::to_string(&config)?);

    let toolkit = Arc::new(HeadlessToolkit::new());
    let engine = Arc::new(Engine::new(&config, toolkit.clone()));
    engine.init_ui_thread();

    let targets = Targets {
        main: toolkit.create_window(),
        button: toolkit.create_window(),
        slider: toolkit.create_window(),
    };
    connect_handlers(&engine, targets)?;

    let ticks = Arc::new(AtomicU32::new(0));
    let counter = ticks.clone();
    let heartbeat: TimerFn = Arc::new(move |_: &UserData| {
        let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
        info!("Heartbeat {}/{}", n, HEARTBEAT_TICKS);
        (n < HEARTBEAT_TICKS) as i32
    });
    engine.timer_connect(
        Duration::from_millis(HEARTBEAT_INTERVAL_MS),
        heartbeat,
        UserData::none(),
    );

    let sim = Simulator::start(engine.producer(), toolkit.clone(), targets);

    // Safety net in case the close request never arrives.
    let watchdog = Arc::downgrade(&engine);
    std::thread::spawn(move || {
        std::thread::sleep(MAX_RUN_TIME);
        if let Some(engine) = watchdog.upgrade() {
            info!("Run time limit reached");
            engine.main_quit();
        }
    });

    info!("Entering main loop");
    engine.main();
    sim.stop();

    engine.destroy_window(targets.button);
    engine.destroy_window(targets.slider);

    let draws = toolkit.count_calls(|c| matches!(c, ToolkitCall::BeginSafeDraw(..)));
    let destroyed = toolkit.count_calls(|c| matches!(c, ToolkitCall::DestroyWindow(_)));
    info!(
        "Done: {} heartbeats, {} safe draws, {} windows destroyed, {} handlers left",
        ticks.load(Ordering::SeqCst),
        draws,
        destroyed,
        engine.handler_count()
    );

    Ok(())
}

fn connect_handlers(engine: &Arc<Engine>, targets: Targets) -> Result<(), Box<dyn Error>> {
    let Targets {
        main,
        button,
        slider,
    } = targets;

    let cleanup: DisconnectFn = Arc::new(|window: WindowHandle, data: &UserData| {
        let label = data.downcast_ref::<&str>().copied().unwrap_or("?");
        debug!("Released handler data '{}' for {}", label, window);
    });

    engine.connect(
        main,
        "configure_event",
        Handler::configure(|window, width, height, _| {
            info!("{} resized to {}x{}", window, width, height);
            1
        }),
        None,
        UserData::none(),
    )?;

    engine.connect(
        main,
        "expose_event",
        Handler::expose(|window, area, _| {
            info!(
                "Redraw {} at ({}, {}) {}x{}",
                window, area.x, area.y, area.width, area.height
            );
            1
        }),
        None,
        UserData::none(),
    )?;

    engine.connect(
        main,
        "key_press_event",
        Handler::key_press(|window, key, _| {
            info!("Key '{}' (vk {}) on {}", key.utf8, key.vk, window);
            1
        }),
        None,
        UserData::none(),
    )?;

    // Veto the first close request, accept the second.
    let close_requests = Arc::new(AtomicU32::new(0));
    let quitter: Weak<Engine> = Arc::downgrade(engine);
    engine.connect(
        main,
        "delete_event",
        Handler::delete(move |window, _| {
            if close_requests.fetch_add(1, Ordering::SeqCst) == 0 {
                info!("Close of {} vetoed", window);
                return 1;
            }
            info!("Closing {}", window);
            if let Some(engine) = quitter.upgrade() {
                engine.main_quit();
            }
            0
        }),
        None,
        UserData::none(),
    )?;

    let clicks = Arc::new(AtomicU32::new(0));
    engine.connect(
        button,
        "clicked",
        Handler::clicked(move |window, data| {
            let n = clicks.fetch_add(1, Ordering::SeqCst) + 1;
            let label = data.downcast_ref::<&str>().copied().unwrap_or("?");
            info!("'{}' ({}) clicked {} time(s)", label, window, n);
            1
        }),
        Some(cleanup.clone()),
        UserData::new("OK"),
    )?;

    engine.connect(
        button,
        "motion_notify_event",
        Handler::motion(|window, pointer, _| {
            debug!("Pointer at ({}, {}) over {}", pointer.x, pointer.y, window);
            1
        }),
        None,
        UserData::none(),
    )?;

    let level = Arc::new(AtomicI32::new(0));
    engine.connect(
        slider,
        "value_changed",
        Handler::value_changed(move |window, position, _| {
            let previous = level.swap(position, Ordering::SeqCst);
            info!("{} moved {} -> {}", window, previous, position);
            1
        }),
        Some(cleanup),
        UserData::new("volume"),
    )?;

    Ok(())
}
