use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver};
use std::thread;

use eframe::egui::{self, Context, Vec2};
use tracing::{debug, error, info, warn};

use crate::config::ExplorerConfig;
use crate::data::{Dataset, Fetcher, load_dataset};
use crate::layout::{LayoutEngine, LinkKind, LinkRecord};
use crate::selection::{
    JsonFileStore, SelectionIntent, SelectionManager, SelectionStore, initial_selection,
};

mod graph;
mod highlight;
mod render_utils;
mod ui;

use highlight::SelectionHighlight;

/// Everything the window needs from the command line.
pub struct LaunchOptions {
    pub dataset_path: PathBuf,
    pub selection_file: Option<PathBuf>,
    pub query: Option<String>,
    pub config: ExplorerConfig,
}

pub struct ExplorerApp {
    options: LaunchOptions,
    state: AppState,
    selection: Option<SelectionManager>,
}

enum AppState {
    Loading {
        rx: Receiver<Result<Dataset, String>>,
    },
    Ready(Box<ViewModel>),
    Error(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ViewTab {
    Results,
    Embedding,
}

struct ViewModel {
    dataset_name: String,
    results_fetch: Fetcher,
    layout_fetch: Fetcher,
    selection: SelectionManager,
    engine: LayoutEngine,
    results: Vec<String>,
    search: String,
    max_results: usize,
    tab: ViewTab,
    results_highlight: SelectionHighlight,
    embedding_highlight: SelectionHighlight,
    pending_intents: Vec<SelectionIntent>,
    /// Links derived from the selection this session.
    session_links: Vec<LinkRecord>,
    link_kind: LinkKind,
    notice: Option<String>,
    dragging: Option<usize>,
    pan: Vec2,
    zoom: f32,
    stopped: bool,
}

fn restore_selection(options: &LaunchOptions) -> SelectionManager {
    let store = options.selection_file.clone().map(JsonFileStore::new);
    let persisted = initial_selection(
        options.query.as_deref(),
        store.as_ref().map(|store| store as &dyn SelectionStore),
    )
    .unwrap_or_else(|error| {
        warn!("could not restore the selection, starting empty: {error:#}");
        Default::default()
    });

    let (manager, report) = SelectionManager::restore(persisted);
    if !report.is_clean() {
        warn!(
            conflicts = report.conflicts.len(),
            duplicates = report.duplicates,
            "restored selection needed repair"
        );
    }
    match store {
        Some(store) => {
            info!(path = %store.path().display(), "selection is persisted to file");
            manager.with_store(Box::new(store))
        }
        None => manager,
    }
}

impl ExplorerApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, options: LaunchOptions) -> Self {
        let selection = restore_selection(&options);
        let state = Self::start_load(options.dataset_path.clone());
        Self {
            options,
            state,
            selection: Some(selection),
        }
    }

    fn start_load(path: PathBuf) -> AppState {
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            let result = load_dataset(&path).map_err(|error| format!("{error:#}"));
            let _ = tx.send(result);
        });

        AppState::Loading { rx }
    }
}

impl eframe::App for ExplorerApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        let mut transition = None;

        match &mut self.state {
            AppState::Loading { rx } => {
                if let Ok(result) = rx.try_recv() {
                    transition = Some(match (result, self.selection.take()) {
                        (Ok(dataset), Some(selection)) => AppState::Ready(Box::new(
                            ViewModel::new(dataset, selection, &self.options),
                        )),
                        (Ok(_), None) => AppState::Error("selection state was lost".to_owned()),
                        (Err(message), selection) => {
                            error!("{message}");
                            self.selection = selection;
                            AppState::Error(message)
                        }
                    });
                }

                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.add_space(120.0);
                        ui.heading("Loading dataset...");
                        ui.add_space(8.0);
                        ui.spinner();
                    });
                });
                ctx.request_repaint();
            }
            AppState::Error(error) => {
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.heading("Failed to load the dataset");
                    ui.add_space(6.0);
                    ui.label(error.as_str());
                    ui.add_space(10.0);
                    if ui.button("Retry").clicked() {
                        transition = Some(Self::start_load(self.options.dataset_path.clone()));
                    }
                });
            }
            AppState::Ready(model) => {
                if ctx.input(|input| input.viewport().close_requested()) {
                    model.stop();
                } else {
                    model.show(ctx);
                }
            }
        }

        if let Some(next_state) = transition {
            self.state = next_state;
        }
    }
}

impl ViewModel {
    fn new(dataset: Dataset, mut selection: SelectionManager, options: &LaunchOptions) -> Self {
        let dropped = selection.drop_unknown(|id| dataset.item(id).is_some());
        let notice = (!dropped.is_empty()).then(|| {
            format!(
                "{} saved selection item(s) are not in this dataset and were removed.",
                dropped.len()
            )
        });

        let dataset = Arc::new(dataset);
        let layout = &options.config.layout;
        let results_highlight = SelectionHighlight::new(&mut selection);
        let embedding_highlight = SelectionHighlight::new(&mut selection);
        let dataset_name = options
            .dataset_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| options.dataset_path.display().to_string());

        let mut model = Self {
            dataset_name,
            results_fetch: Fetcher::new(Arc::clone(&dataset)),
            layout_fetch: Fetcher::new(dataset),
            selection,
            engine: LayoutEngine::new(layout.tsne_params(), layout.simulator_params()),
            results: Vec::new(),
            search: String::new(),
            max_results: options.config.max_results,
            tab: ViewTab::Embedding,
            results_highlight,
            embedding_highlight,
            pending_intents: Vec::new(),
            session_links: Vec::new(),
            link_kind: LinkKind::Duplicate,
            notice,
            dragging: None,
            pan: Vec2::ZERO,
            zoom: 1.0,
            stopped: false,
        };

        if model.selection.snapshot().is_empty() {
            model.request_text_search();
        } else {
            model.request_selection_search();
        }
        model
    }

    /// Tears the layout down; nothing arriving afterwards is applied.
    fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        self.dragging = None;
        self.engine.stop();
        self.results_fetch.cancel();
        self.layout_fetch.cancel();
        info!("explorer view stopped");
    }

    /// Runs the intents views raised this frame through the toggle protocol.
    /// Returns whether the selection changed.
    fn apply_pending_intents(&mut self) -> bool {
        let mut changed = false;
        for intent in std::mem::take(&mut self.pending_intents) {
            if self.selection.apply(&intent) {
                changed = true;
            } else {
                debug!(?intent, "selection change ignored");
            }
        }
        changed
    }
}
