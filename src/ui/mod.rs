use std::{env, mem, path::PathBuf, sync::Arc, thread};

use crossbeam_channel::{Receiver, Sender, bounded, unbounded};
use gpui::prelude::FluentBuilder;
use gpui::{
    AnyElement, App, AppContext, Context, InteractiveElement, IntoElement, MouseButton,
    MouseDownEvent, MouseMoveEvent, MouseUpEvent, ObjectFit, ParentElement, Render, RenderImage,
    SharedString, Styled, StyledImage, TitlebarOptions, Window, WindowOptions, div, img, px,
};
use gpui_component::{
    ActiveTheme, Root, Selectable, StyledExt,
    button::{Button, ButtonVariants},
    h_flex,
    tag::Tag,
    v_flex,
};
use image::{Frame as ImageFrame, ImageBuffer, Rgba};

use crate::{
    assets::DownloadEvent,
    detector::{self, DetectorBackend},
    options::{OptionField, PoseOptions},
    orchestrator::Orchestrator,
    source::{FrameStream, SourceSelection},
    types::{Frame, PoseResult},
};

mod download;
mod main_view;
mod render_util;
mod settings;
mod source_view;

const SETTINGS_PANEL_WIDTH: f32 = 320.0;
const SLIDER_TRACK_WIDTH: f32 = 180.0;
const STILL_SOURCE_ENV: &str = "POSE_LENS_STILL";

pub fn launch_ui(
    app: &mut App,
    frame_rx: Receiver<Frame>,
    frame_tx: Sender<Frame>,
    backend: DetectorBackend,
    options: PoseOptions,
) -> gpui::Result<()> {
    let window_options = WindowOptions {
        titlebar: Some(TitlebarOptions {
            title: Some("Pose Lens".into()),
            ..Default::default()
        }),
        ..Default::default()
    };

    app.open_window(window_options, move |window, app| {
        let view = app.new(|_| AppView::new(frame_rx, frame_tx, backend, options));
        app.new(|cx| Root::new(view, window, cx))
    })?;

    Ok(())
}

struct AppView {
    screen: Screen,
    backend: DetectorBackend,
    base_options: PoseOptions,
    orchestrator: Option<Orchestrator>,
    _detector_handle: Option<thread::JoinHandle<()>>,
    frame_rx: Receiver<Frame>,
    frame_tx: Sender<Frame>,
    result_rx: Option<Receiver<PoseResult>>,
    sources: Vec<SourceSelection>,
    selected_source: Option<usize>,
    active_stream: Option<FrameStream>,
    source_error: Option<String>,
    picker_open: bool,
    slider_drag: Option<SliderDragState>,
    grid_drag: Option<GridDragState>,
    canvas_image: Option<Arc<RenderImage>>,
    grid_image: Option<Arc<RenderImage>>,
    download_rx: Option<Receiver<DownloadMessage>>,
    download_handle: Option<thread::JoinHandle<()>>,
}

enum Screen {
    Source(SourceState),
    Download(DownloadState),
    Main,
}

enum SourceState {
    Unavailable {
        message: String,
    },
    Selection {
        options: Vec<SourceSelection>,
        selected: usize,
        start_error: Option<String>,
    },
    Ready,
}

struct DownloadState {
    downloaded: u64,
    total: Option<u64>,
    message: String,
    error: Option<String>,
    finished: bool,
}

impl DownloadState {
    fn new() -> Self {
        Self {
            downloaded: 0,
            total: None,
            message: "Preparing pose model...".to_string(),
            error: None,
            finished: false,
        }
    }
}

enum DownloadMessage {
    Event(DownloadEvent),
    Error(String),
}

struct SliderDragState {
    field: OptionField,
    min: f32,
    max: f32,
    step: f32,
    start_pointer_x: f32,
    start_value: f32,
}

struct GridDragState {
    last_x: f32,
    last_y: f32,
}

impl AppView {
    fn new(
        frame_rx: Receiver<Frame>,
        frame_tx: Sender<Frame>,
        backend: DetectorBackend,
        options: PoseOptions,
    ) -> Self {
        let (initial_state, sources) = Self::initial_source_state();
        let selected_source = if sources.is_empty() { None } else { Some(0) };

        Self {
            screen: Screen::Source(initial_state),
            backend,
            base_options: options,
            orchestrator: None,
            _detector_handle: None,
            frame_rx,
            frame_tx,
            result_rx: None,
            sources,
            selected_source,
            active_stream: None,
            source_error: None,
            picker_open: false,
            slider_drag: None,
            grid_drag: None,
            canvas_image: None,
            grid_image: None,
            download_rx: None,
            download_handle: None,
        }
    }

    fn still_source_from_env() -> Option<SourceSelection> {
        env::var(STILL_SOURCE_ENV)
            .ok()
            .map(PathBuf::from)
            .filter(|path| path.exists())
            .map(SourceSelection::Still)
    }

    fn begin_model_download(&mut self) {
        if self.download_handle.is_some() {
            return;
        }
        let (download_tx, download_rx) = unbounded();
        let handle = download::spawn_model_download(
            self.backend.clone(),
            self.base_options.model_complexity,
            download_tx,
        );
        self.download_rx = Some(download_rx);
        self.download_handle = Some(handle);
    }

    fn start_detector_if_needed(&mut self) {
        if self.orchestrator.is_some() {
            return;
        }

        let (result_tx, result_rx) = bounded(1);
        let (detector, handle) =
            detector::start_detector(self.backend.clone(), self.base_options.clone(), result_tx);
        self.result_rx = Some(result_rx);
        self._detector_handle = Some(handle);
        self.orchestrator = Some(Orchestrator::new(detector, self.base_options.clone()));
    }
}

impl Render for AppView {
    fn render(
        &mut self,
        window: &mut Window,
        cx: &mut Context<'_, Self>,
    ) -> impl gpui::IntoElement {
        cx.defer_in(window, |_, _, cx| {
            cx.notify();
        });

        let mut screen = mem::replace(&mut self.screen, Screen::Main);
        let view = match screen {
            Screen::Source(mut state) => {
                let view = self.render_source_view(&mut state, cx);
                match state {
                    SourceState::Ready => {
                        self.begin_model_download();
                        screen = Screen::Download(DownloadState::new());
                    }
                    _ => {
                        screen = Screen::Source(state);
                    }
                }
                view
            }
            Screen::Download(mut state) => {
                self.poll_download_events(&mut state);
                let should_switch = state.finished && state.error.is_none();
                let view = self.render_download_view(&state, cx);
                if should_switch {
                    self.start_detector_if_needed();
                    screen = Screen::Main;
                } else {
                    screen = Screen::Download(state);
                }
                view
            }
            Screen::Main => {
                screen = Screen::Main;
                self.render_main(window, cx)
            }
        };
        self.screen = screen;
        view
    }
}
