//! Livechart - desktop host
//!
//! Runs the market simulator into the time-series store and paints the
//! chart and drawing overlay with egui.

use std::cell::RefCell;
use std::error::Error;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::{Duration, Instant};

use eframe::egui::{self, Key, Pos2, Sense};
use tracing::{info, warn};

use livechart::chart::{ChartRenderer, PointerEvent, RendererConfig};
use livechart::drawing::{DrawingManager, ToolKind};
use livechart::event::{ChangeEvent, Subscription};
use livechart::simulator::{MarketSimulator, SimulatorConfig};
use livechart::store::TimeSeriesStore;
use livechart::trader::{get_file_path, init_logger, ChartMode, SETTINGS};

const DRAWINGS_FILENAME: &str = "livechart_drawings.json";

/// Application state holding the whole chart pipeline
struct LiveChartApp {
    simulator: MarketSimulator,
    store: TimeSeriesStore,
    renderer: ChartRenderer,
    drawings: DrawingManager,
    /// Store notifications waiting for the next frame
    changes: Rc<RefCell<Vec<ChangeEvent>>>,
    _subscription: Subscription,
    started: Instant,
    last_tick: Instant,
    last_pointer: Option<Pos2>,
    pointer_inside: bool,
    drawings_path: PathBuf,
}

impl LiveChartApp {
    fn new(cc: &eframe::CreationContext<'_>) -> Self {
        cc.egui_ctx.set_visuals(egui::Visuals::dark());

        let config = SimulatorConfig::from_settings(&SETTINGS);
        let history = config.history;
        let mut simulator = MarketSimulator::new(config);
        let mut store = TimeSeriesStore::from_settings(&SETTINGS);

        let changes: Rc<RefCell<Vec<ChangeEvent>>> = Rc::new(RefCell::new(Vec::new()));
        let queue = Rc::clone(&changes);
        let subscription = store.subscribe(move |event| queue.borrow_mut().push(event.clone()));

        store.set_instrument("SIM", simulator.generate_initial_history(history));
        simulator.start();
        info!("Loaded {} candles of history", store.base_series().len());

        let drawings_path = get_file_path(DRAWINGS_FILENAME);
        let mut drawings = DrawingManager::new();
        if drawings_path.exists() && drawings.load(&drawings_path).is_ok() {
            info!("Restored {} drawings", drawings.len());
        }

        let now = Instant::now();
        Self {
            simulator,
            store,
            renderer: ChartRenderer::new(RendererConfig::from_settings(&SETTINGS)),
            drawings,
            changes,
            _subscription: subscription,
            started: now,
            last_tick: now,
            last_pointer: None,
            pointer_inside: false,
            drawings_path,
        }
    }

    /// Feed the simulator and hand queued store changes to the renderer
    fn pump(&mut self, host: &mut egui::Context) {
        let now = Instant::now();
        let elapsed_ms = now.duration_since(self.last_tick).as_secs_f64() * 1000.0;
        self.last_tick = now;
        if self.simulator.tick_into(elapsed_ms, &mut self.store) > 0 {
            self.renderer.request_frame(host);
        }

        let pending: Vec<ChangeEvent> = self.changes.borrow_mut().drain(..).collect();
        let total = self.store.active_series().len();
        for event in &pending {
            self.renderer.on_store_change(event, total, host);
        }
    }

    fn show_toolbar(&mut self, ui: &mut egui::Ui, host: &mut egui::Context) {
        ui.horizontal(|ui| {
            let active = self.store.active_timeframe();
            for timeframe in self.store.supported_timeframes() {
                if ui.selectable_label(active == timeframe, timeframe.value()).clicked() {
                    self.store.set_timeframe(timeframe);
                }
            }
            ui.separator();

            let mode = self.renderer.state().mode;
            for candidate in ChartMode::all() {
                if ui.selectable_label(mode == candidate, candidate.display_name()).clicked() {
                    self.renderer.set_mode(candidate, host);
                }
            }
            ui.separator();

            let armed = self.drawings.active_tool();
            for kind in ToolKind::all() {
                if ui.selectable_label(armed == Some(kind), kind.display_name()).clicked() {
                    let next = if armed == Some(kind) { None } else { Some(kind) };
                    self.drawings.set_active_tool(next);
                }
            }
            let has_selection = self.drawings.selected_id().is_some();
            if ui.add_enabled(has_selection, egui::Button::new("Duplicate")).clicked() {
                self.drawings.duplicate_selected();
            }
            if ui.add_enabled(has_selection, egui::Button::new("Delete")).clicked() {
                self.drawings.delete_selected();
            }
            ui.separator();

            let running = self.simulator.is_running();
            if ui.button(if running { "Pause" } else { "Run" }).clicked() {
                if running {
                    self.simulator.stop();
                } else {
                    self.simulator.start();
                }
            }
            let mut speed = self.simulator.speed();
            if ui
                .add(egui::Slider::new(&mut speed, 1.0..=600.0).logarithmic(true).text("speed"))
                .changed()
            {
                self.simulator.set_speed(speed);
            }
            if ui.button("Latest").clicked() {
                let total = self.store.active_series().len();
                self.renderer.scroll_to_latest(total, host);
            }
        });
    }

    /// Translate egui pointer state into renderer pointer events
    fn forward_pointer(&mut self, ui: &egui::Ui, response: &egui::Response, host: &mut egui::Context) {
        let total = self.store.active_series().len();
        let (latest, pressed, released, scroll) = ui.input(|i| {
            (
                i.pointer.latest_pos(),
                i.pointer.primary_pressed(),
                i.pointer.primary_released(),
                i.raw_scroll_delta,
            )
        });
        let inside = latest.is_some_and(|pos| response.rect.contains(pos));

        let mut events = Vec::new();
        if let Some(pos) = latest.filter(|_| inside || response.dragged()) {
            if self.last_pointer != Some(pos) {
                events.push(PointerEvent::moved(pos));
            }
            if pressed && inside {
                events.push(PointerEvent::down(pos));
            }
            if released {
                events.push(PointerEvent::up(pos));
            }
            if inside && scroll.y != 0.0 {
                events.push(PointerEvent::wheel(pos, scroll));
            }
            self.last_pointer = Some(pos);
        } else if self.pointer_inside {
            events.push(PointerEvent::leave());
            self.last_pointer = None;
        }
        self.pointer_inside = inside;

        for event in events {
            self.renderer.handle_pointer(event, total, &mut self.drawings, host);
        }
    }

    fn handle_keyboard(&mut self, ui: &egui::Ui, host: &mut egui::Context) {
        let total = self.store.active_series().len();
        let cursor = &mut self.renderer.state_mut().cursor;
        if ui.input(|i| i.key_pressed(Key::ArrowLeft)) {
            cursor.move_left();
        }
        if ui.input(|i| i.key_pressed(Key::ArrowRight)) {
            cursor.move_right(total);
        }
        if ui.input(|i| i.key_pressed(Key::End)) {
            self.renderer.scroll_to_latest(total, host);
        }
        if ui.input(|i| i.key_pressed(Key::Escape)) {
            self.drawings.cancel();
        }
        if ui.input(|i| i.key_pressed(Key::Delete)) {
            self.drawings.delete_selected();
        }
    }
}

impl eframe::App for LiveChartApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let mut host = ctx.clone();
        self.pump(&mut host);

        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            self.show_toolbar(ui, &mut host);
        });

        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| {
                let (response, mut painter) = ui.allocate_painter(ui.available_size(), Sense::click_and_drag());
                self.renderer.resize(response.rect, &mut host);
                self.renderer.set_density(ctx.pixels_per_point(), &mut host);
                self.handle_keyboard(ui, &mut host);
                self.forward_pointer(ui, &response, &mut host);

                let now = self.started.elapsed().as_secs_f64();
                self.renderer
                    .frame(now, &mut self.store, &self.drawings, &mut painter, &mut host);
            });

        // keep the simulator ticking between input events
        if self.simulator.is_running() {
            ctx.request_repaint_after(Duration::from_millis(100));
        }
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        if let Err(e) = self.drawings.save(&self.drawings_path) {
            warn!("Drawings not saved: {}", e);
        }
        info!("Livechart closed");
    }
}

/// Create native window options
fn create_native_options() -> eframe::NativeOptions {
    eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Livechart")
            .with_inner_size([1280.0, 800.0])
            .with_min_inner_size([640.0, 400.0]),
        ..Default::default()
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    init_logger(&SETTINGS);
    info!("Starting Livechart {}", livechart::VERSION);

    eframe::run_native(
        "Livechart",
        create_native_options(),
        Box::new(|cc| Ok(Box::new(LiveChartApp::new(cc)))),
    )
    .map_err(|e| format!("Failed to run application: {}", e))?;

    Ok(())
}
