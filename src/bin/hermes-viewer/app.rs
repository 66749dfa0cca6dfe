// Viewer application for `hermes-viewer`.

use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::sync::mpsc;
use std::sync::Arc;

use dark_light::Mode;
use eframe::egui;
use parking_lot::RwLock;

use hermes_timeline::callstack::{build_call_stacks, CallStacks, CoreSelection};
use hermes_timeline::config::Config;
use hermes_timeline::ingest::{Clock, EventLog, Ingestor, RestartNotice, SystemClock};
use hermes_timeline::live::LiveTimeline;
use hermes_timeline::themes;
use hermes_timeline::widgets::{ExecutionGraph, FlameGraph};

const MAX_BANNERS: usize = 3;

pub enum EventSource {
    Stdin,
    File(PathBuf),
}

pub fn run(config: Config, source: EventSource, playback: Option<CallStacks>) -> eframe::Result {
    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("hermes viewer")
            .with_inner_size([1100.0, 760.0]),
        ..Default::default()
    };

    eframe::run_native(
        "hermes viewer",
        native_options,
        Box::new(move |cc| {
            let ctx = cc.egui_ctx.clone();
            if let Err(err) =
                ctrlc::set_handler(move || ctx.send_viewport_cmd(egui::ViewportCommand::Close))
            {
                log::warn!("failed to set exit signal handler: {err}");
            }

            cc.egui_ctx
                .set_style_of(egui::Theme::Light, themes::viewer_style(false));
            cc.egui_ctx
                .set_style_of(egui::Theme::Dark, themes::viewer_style(true));
            let theme = match dark_light::detect() {
                Ok(Mode::Light) => egui::ThemePreference::Light,
                Ok(Mode::Dark) => egui::ThemePreference::Dark,
                Ok(Mode::Unspecified) | Err(_) => egui::ThemePreference::Dark,
            };
            cc.egui_ctx.set_theme(theme);

            Ok(Box::new(ViewerApp::new(
                cc.egui_ctx.clone(),
                config,
                source,
                playback,
            )))
        }),
    )
}

/// Why [`pump_lines`] stopped reading.
#[derive(Debug, PartialEq, Eq)]
enum InputEnd {
    Eof,
    ReadFailed,
    ViewerClosed,
}

fn spawn_reader(
    source: EventSource,
    log: Arc<RwLock<EventLog>>,
    notices: mpsc::Sender<RestartNotice>,
    ctx: egui::Context,
) {
    let spawned = std::thread::Builder::new()
        .name("hermes-reader".to_owned())
        .spawn(move || {
            let reader: Box<dyn BufRead> = match source {
                EventSource::Stdin => Box::new(BufReader::new(std::io::stdin())),
                EventSource::File(path) => match std::fs::File::open(&path) {
                    Ok(file) => Box::new(BufReader::new(file)),
                    Err(err) => {
                        log::error!("failed to open {}: {err}", path.display());
                        return;
                    }
                },
            };
            let mut ingestor = Ingestor::with_log(log, SystemClock);
            pump_lines(reader, &mut ingestor, &notices, &ctx);
        });
    if let Err(err) = spawned {
        log::error!("failed to spawn reader thread: {err}");
    }
}

/// Feeds JSON lines into `ingestor` until input ends or the viewer goes away.
fn pump_lines<C: Clock>(
    reader: impl BufRead,
    ingestor: &mut Ingestor<C>,
    notices: &mpsc::Sender<RestartNotice>,
    ctx: &egui::Context,
) -> InputEnd {
    let mut rejected = 0usize;
    let mut end = InputEnd::Eof;
    for (index, line) in reader.lines().enumerate() {
        let line = match line {
            Ok(line) => line,
            Err(err) => {
                log::error!("trace input failed: {err}");
                end = InputEnd::ReadFailed;
                break;
            }
        };
        match ingestor.ingest_json(&line) {
            Ok(Some(notice)) => {
                if notices.send(notice).is_err() {
                    log::debug!("viewer closed; stopping trace input");
                    end = InputEnd::ViewerClosed;
                    break;
                }
            }
            Ok(None) => {}
            Err(err) => {
                rejected += 1;
                log::warn!("line {}: {err}", index + 1);
            }
        }
        ctx.request_repaint();
    }
    log::info!("trace input closed; {rejected} malformed line(s) skipped");
    end
}

struct ViewerApp {
    log: Arc<RwLock<EventLog>>,
    live: LiveTimeline,
    notices: mpsc::Receiver<RestartNotice>,
    banners: Vec<RestartNotice>,
    stacks: CallStacks,
    selection: CoreSelection,
    flame: FlameGraph,
    playback: bool,
}

impl ViewerApp {
    fn new(
        ctx: egui::Context,
        config: Config,
        source: EventSource,
        playback: Option<CallStacks>,
    ) -> Self {
        let log = Arc::new(RwLock::new(EventLog::new()));
        let (tx, rx) = mpsc::channel();
        spawn_reader(source, log.clone(), tx, ctx);

        let mut app = Self {
            log,
            live: LiveTimeline::new(config.window.clone()),
            notices: rx,
            banners: Vec::new(),
            playback: playback.is_some(),
            stacks: playback.unwrap_or_default(),
            selection: CoreSelection::All,
            flame: FlameGraph::new(config.flame.clone()),
        };
        app.reload_flame();
        app
    }

    /// Pushes the selected core's entries into the flame graph, which refits.
    fn reload_flame(&mut self) {
        let options = self.stacks.options();
        if !options.contains(&self.selection) {
            self.selection = options.first().copied().unwrap_or_default();
        }
        self.flame.set_entries(self.stacks.select(self.selection));
    }

    fn capture(&mut self) {
        self.stacks = build_call_stacks(self.log.read().events());
        log::info!(
            "captured call stacks for {} core(s)",
            self.stacks.cores().count()
        );
        self.reload_flame();
    }

    fn restart_banners(&mut self, ui: &mut egui::Ui) {
        let mut dismissed = None;
        for (index, notice) in self.banners.iter().enumerate().rev().take(MAX_BANNERS) {
            ui.horizontal(|ui| {
                ui.colored_label(
                    themes::ral(2004),
                    format!("Core {} restarted: {}", notice.core_id, notice.reason),
                );
                if ui.small_button("Dismiss").clicked() {
                    dismissed = Some(index);
                }
            });
        }
        if let Some(index) = dismissed {
            self.banners.remove(index);
        }
    }

    fn flame_controls(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            if !self.playback
                && ui
                    .button("Capture")
                    .on_hover_text("Rebuild call stacks from the events received so far.")
                    .clicked()
            {
                self.capture();
            }

            let options = self.stacks.options();
            if !options.is_empty() {
                let mut selection = self.selection;
                egui::ComboBox::from_id_salt("flame_core")
                    .selected_text(selection.to_string())
                    .show_ui(ui, |ui| {
                        for option in options {
                            ui.selectable_value(&mut selection, option, option.to_string());
                        }
                    });
                if selection != self.selection {
                    self.selection = selection;
                    self.reload_flame();
                }
            }

            if let Some(viewport) = self.flame.viewport() {
                ui.label(
                    egui::RichText::new(format!("zoom {:.5} px/unit", viewport.zoom))
                        .small()
                        .weak(),
                );
            }
        });
    }
}

impl eframe::App for ViewerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        while let Ok(notice) = self.notices.try_recv() {
            self.banners.push(notice);
        }

        let now = SystemClock.now_ms();
        let event_count = {
            let log = self.log.read();
            self.live.update(&log, now);
            log.len()
        };

        egui::TopBottomPanel::top("hermes_header").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading("hermes");
                ui.label(
                    egui::RichText::new(format!("{event_count} events"))
                        .small()
                        .weak(),
                );
            });
            self.restart_banners(ui);
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical()
                .auto_shrink([false; 2])
                .show(ui, |ui| {
                    ui.heading("Execution");
                    ui.add(ExecutionGraph::new(self.live.lanes()).colors(self.live.colors()));

                    ui.separator();
                    ui.heading("Flame graph");
                    self.flame_controls(ui);
                    self.flame.show(ui);
                    ui.label(
                        egui::RichText::new("A/D pan  W/S zoom  Q/E jump  drag to pan")
                            .small()
                            .weak(),
                    );
                });
        });

        ctx.request_repaint_after(self.live.next_tick_in(SystemClock.now_ms()));
    }
}
