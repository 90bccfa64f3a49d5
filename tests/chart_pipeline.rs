//! Simulator to store to renderer to drawings, headless.

use std::cell::RefCell;
use std::rc::Rc;

use egui::pos2;
use livechart::chart::{ChartRenderer, DisplayList, HeadlessHost, PointerEvent};
use livechart::drawing::{DrawingManager, HitAction, ToolKind};
use livechart::event::{ChangeEvent, Subscription};
use livechart::simulator::{MarketSimulator, ScheduledEvent, SimulatorConfig, DEFAULT_START_TIME};
use livechart::store::TimeSeriesStore;
use livechart::trader::{ChangeKind, Timeframe};

struct Pipeline {
    simulator: MarketSimulator,
    store: TimeSeriesStore,
    renderer: ChartRenderer,
    drawings: DrawingManager,
    host: HeadlessHost,
    changes: Rc<RefCell<Vec<ChangeEvent>>>,
    now: f64,
}

impl Pipeline {
    fn new(history: usize) -> (Self, Subscription) {
        let mut simulator = MarketSimulator::new(SimulatorConfig {
            seed: 7,
            ..SimulatorConfig::default()
        });
        let mut store = TimeSeriesStore::new(Timeframe::Minute1);
        let changes = Rc::new(RefCell::new(Vec::new()));
        let queue = Rc::clone(&changes);
        let subscription = store.subscribe(move |event| queue.borrow_mut().push(event.clone()));
        store.rebuild_all(simulator.generate_initial_history(history));

        let pipeline = Self {
            simulator,
            store,
            renderer: ChartRenderer::default(),
            drawings: DrawingManager::new(),
            host: HeadlessHost::new(),
            changes,
            now: 0.0,
        };
        (pipeline, subscription)
    }

    fn pump(&mut self) -> Vec<ChangeKind> {
        let pending: Vec<ChangeEvent> = self.changes.borrow_mut().drain(..).collect();
        let total = self.store.active_series().len();
        for event in &pending {
            self.renderer.on_store_change(event, total, &mut self.host);
        }
        pending.iter().map(|event| event.kind).collect()
    }

    /// Render until the renderer stops asking for frames
    fn settle(&mut self) -> DisplayList {
        let mut list = DisplayList::new();
        for _ in 0..600 {
            list.clear();
            self.now += 1.0 / 60.0;
            let animating = self.renderer.frame(
                self.now,
                &mut self.store,
                &self.drawings,
                &mut list,
                &mut self.host,
            );
            if !animating {
                break;
            }
        }
        list
    }
}

#[test]
fn test_history_renders_and_settles() {
    let (mut pipeline, _subscription) = Pipeline::new(300);
    assert_eq!(pipeline.pump(), vec![ChangeKind::Reset]);

    let list = pipeline.settle();
    assert!(!list.is_empty());
    assert!(!pipeline.renderer.scheduler().is_pending());

    // repeated requests while one is pending reach the host once
    let before = pipeline.host.requests;
    pipeline.renderer.request_frame(&mut pipeline.host);
    pipeline.renderer.request_frame(&mut pipeline.host);
    assert_eq!(pipeline.host.requests, before + 1);
}

#[test]
fn test_live_ticks_append_and_fire_events() {
    let (mut pipeline, _subscription) = Pipeline::new(300);
    pipeline.pump();
    pipeline.settle();

    let event_time = DEFAULT_START_TIME + 302 * 60_000;
    pipeline
        .simulator
        .schedule_event(ScheduledEvent::new("cpi", event_time, "CPI", "hot print").with_drift(0.5));
    pipeline.simulator.start();

    let appended = pipeline.simulator.tick_into(5.0 * 60_000.0, &mut pipeline.store);
    assert_eq!(appended, 5);
    assert_eq!(pipeline.store.active_series().len(), 305);
    assert_eq!(pipeline.store.events().len(), 1);
    assert_eq!(pipeline.store.events()[0].id, "cpi");

    let kinds = pipeline.pump();
    assert!(kinds.contains(&ChangeKind::Append));
    assert!(kinds.contains(&ChangeKind::Events));

    pipeline.settle();
    let projected = pipeline.store.projected_events();
    assert_eq!(projected.len(), 1);
    assert_eq!(projected[0].index, 302);
    assert!(pipeline.renderer.state().viewport.follow);
}

#[test]
fn test_timeframe_switch_keeps_drawings_in_world_space() {
    let (mut pipeline, _subscription) = Pipeline::new(300);
    pipeline.pump();
    pipeline.settle();

    // place a trend line with click-drag through the renderer
    pipeline.drawings.set_active_tool(Some(ToolKind::TrendLine));
    let total = pipeline.store.active_series().len();
    let renderer = &mut pipeline.renderer;
    let host = &mut pipeline.host;
    let drawings = &mut pipeline.drawings;
    assert!(renderer.handle_pointer(PointerEvent::down(pos2(300.0, 100.0)), total, drawings, host));
    renderer.handle_pointer(PointerEvent::moved(pos2(350.0, 125.0)), total, drawings, host);
    renderer.handle_pointer(PointerEvent::moved(pos2(400.0, 150.0)), total, drawings, host);
    renderer.handle_pointer(PointerEvent::up(pos2(400.0, 150.0)), total, drawings, host);
    assert_eq!(pipeline.drawings.len(), 1);
    let points = pipeline.drawings.tools()[0].points().to_vec();

    // viewport did not pan while drawing
    assert!(pipeline.renderer.state().viewport.follow);

    assert!(pipeline.store.set_timeframe(Timeframe::Minute5));
    assert_eq!(pipeline.pump(), vec![ChangeKind::Timeframe]);
    assert_eq!(pipeline.store.active_series().len(), 60);
    pipeline.settle();
    assert_eq!(pipeline.drawings.tools()[0].points(), points.as_slice());

    // hit-test against the new transform
    let transform = *pipeline.renderer.transform().unwrap();
    let a = transform.world_to_screen(points[0]);
    let b = transform.world_to_screen(points[1]);
    let mid = pos2((a.x + b.x) / 2.0, (a.y + b.y) / 2.0);
    let (_, hit) = pipeline.drawings.hit_test(mid, &transform).unwrap();
    assert_eq!(hit.action, HitAction::Move);
    let (_, hit) = pipeline.drawings.hit_test(a, &transform).unwrap();
    assert_eq!(hit.action, HitAction::Handle);
    assert_eq!(hit.handle_index, Some(0));
}

#[test]
fn test_finer_timeframe_is_rejected() {
    let mut store = TimeSeriesStore::new(Timeframe::Minute5);
    assert!(!store.set_timeframe(Timeframe::Minute1));
    assert_eq!(store.active_timeframe(), Timeframe::Minute5);
}
