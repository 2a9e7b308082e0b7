//! Event simulator.
//!
//! Stands in for a native toolkit's callback thread: runs a tokio runtime on
//! its own std thread and pushes a scripted stream of events, plus ticks for
//! every running timer, through a `Producer`.

use dw_core::headless::HeadlessToolkit;
use dw_core::{
    Event, EventKind, ExposeRect, PointerEvent, Producer, QUEUED, RawParams, WindowHandle,
};
use log::{debug, info, warn};
use std::collections::HashMap;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle as TaskHandle;
use tokio::time::{Instant, interval};

const SCRIPT_STEP_MS: u64 = 40;
const TIMER_RESOLUTION_MS: u64 = 5;

/// Windows the script sends events to.
#[derive(Clone, Copy, Debug)]
pub struct Targets {
    pub main: WindowHandle,
    pub button: WindowHandle,
    pub slider: WindowHandle,
}

/// One scripted native event.
enum Step {
    Native(WindowHandle, Event),
    /// Key press delivered in wire form: (window, char, virtual key).
    RawKey(WindowHandle, char, i64),
}

/// Running simulator. Dropping the handle does not stop it; call `stop`.
pub struct Simulator {
    shutdown: watch::Sender<bool>,
    thread: JoinHandle<()>,
}

impl Simulator {
    /// Start feeding events on a background thread.
    pub fn start(producer: Producer, toolkit: Arc<HeadlessToolkit>, targets: Targets) -> Self {
        let (shutdown, watcher) = watch::channel(false);

        let thread = thread::spawn(move || {
            let rt = match tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .build()
            {
                Ok(rt) => rt,
                Err(e) => {
                    warn!("Failed to create simulator runtime: {}", e);
                    return;
                }
            };

            rt.block_on(async {
                let script = tokio::spawn(run_script(producer.clone(), targets, watcher.clone()));
                let timers = tokio::spawn(run_timers(producer, toolkit, watcher));
                join_task("script", script).await;
                join_task("timer", timers).await;
            });
            debug!("Simulator thread exiting");
        });

        Self { shutdown, thread }
    }

    /// Ask the simulator to stop and wait for its thread.
    pub fn stop(self) {
        let _ = self.shutdown.send(true);
        if self.thread.join().is_err() {
            warn!("Simulator thread panicked");
        }
    }
}

/// Wait for a simulator task. Returns false if it panicked or was cancelled.
async fn join_task(name: &str, task: TaskHandle<()>) -> bool {
    match task.await {
        Ok(()) => true,
        Err(e) => {
            warn!("Simulator {} task failed: {}", name, e);
            false
        }
    }
}

fn script(targets: Targets) -> Vec<Step> {
    let Targets {
        main,
        button,
        slider,
    } = targets;

    vec![
        Step::Native(
            main,
            Event::Configure {
                width: 0,
                height: 0,
            },
        ),
        Step::Native(
            main,
            Event::Configure {
                width: 640,
                height: 480,
            },
        ),
        Step::Native(
            main,
            Event::Expose(ExposeRect {
                x: 0,
                y: 0,
                width: 640,
                height: 480,
            }),
        ),
        Step::Native(
            button,
            Event::Motion(PointerEvent {
                x: 12,
                y: 8,
                button: 0,
            }),
        ),
        Step::Native(button, Event::Clicked),
        Step::RawKey(main, 'q', 81),
        Step::Native(slider, Event::ValueChanged { position: 25 }),
        Step::Native(slider, Event::ValueChanged { position: 75 }),
        Step::Native(button, Event::Clicked),
        // Vetoed by the close handler.
        Step::Native(main, Event::Delete),
        Step::Native(
            main,
            Event::Expose(ExposeRect {
                x: 10,
                y: 10,
                width: 100,
                height: 50,
            }),
        ),
        Step::Native(main, Event::Delete),
    ]
}

async fn run_script(producer: Producer, targets: Targets, mut shutdown: watch::Receiver<bool>) {
    let mut ticker = interval(Duration::from_millis(SCRIPT_STEP_MS));
    let steps = script(targets);
    info!("Simulator playing {} scripted events", steps.len());

    for step in steps {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = shutdown.changed() => return,
        }

        match step {
            Step::Native(window, event) => {
                let kind = event.kind();
                let result = producer.on_native_event(window, event);
                if result != QUEUED {
                    debug!("{} on {} returned {}", kind, window, result);
                }
            }
            Step::RawKey(window, ch, vk) => {
                let raw = RawParams {
                    text: [Some(ch.to_string()), None],
                    ints: [ch as i64, vk, 0, 0],
                    ..Default::default()
                };
                producer.on_raw_event(window, EventKind::KeyPress.code(), raw);
            }
        }
    }
}

async fn run_timers(
    producer: Producer,
    toolkit: Arc<HeadlessToolkit>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = interval(Duration::from_millis(TIMER_RESOLUTION_MS));
    let mut last_fired: HashMap<WindowHandle, Instant> = HashMap::new();

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = shutdown.changed() => return,
        }

        let now = Instant::now();
        let active = toolkit.active_timers();
        last_fired.retain(|timer, _| active.iter().any(|(t, _)| t == timer));

        for (timer, every) in active {
            let last = *last_fired.entry(timer).or_insert(now);
            if now.duration_since(last) >= every {
                last_fired.insert(timer, now);
                producer.on_native_event(timer, Event::Timer);
            }
        }
    }
}
