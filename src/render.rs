use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

use ansi_to_tui::IntoText;
use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use parking_lot::Mutex;
use ratatui::{
    backend::Backend,
    layout::{Alignment, Rect},
    style::{Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame, Terminal,
};

use crate::error::{Error, Result};
use crate::index::{ResultIndex, ResultsView, HEADER_HEIGHT};
use crate::logging::LogBuffer;
use crate::query::QueryEditor;

const SELECTION_MARKER: &str = "► ";
const ROW_PADDING: &str = "  ";

/// Everything one frame shows, captured before the surface is locked.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SceneView {
    pub label: String,
    pub query: String,
    pub cursor: usize,
    pub results: ResultsView,
    pub log: Option<String>,
}

pub struct Scene {
    query: Arc<QueryEditor>,
    index: Arc<ResultIndex>,
    log: LogBuffer,
    debug_panel: bool,
}

impl Scene {
    pub fn new(
        query: Arc<QueryEditor>,
        index: Arc<ResultIndex>,
        log: LogBuffer,
        debug_panel: bool,
    ) -> Self {
        Self {
            query,
            index,
            log,
            debug_panel,
        }
    }

    /// Takes the editor and index locks one after the other, never together.
    /// Pending log output is drained whether or not the panel is shown.
    pub fn snapshot(&self) -> SceneView {
        let query = self.query.snapshot();
        let results = self.index.view();
        let log = self.log.drain();
        SceneView {
            label: query.label,
            query: query.text,
            cursor: query.cursor,
            results,
            log: (self.debug_panel && !log.trim().is_empty()).then_some(log),
        }
    }
}

fn status_line(results: &ResultsView) -> String {
    let mut status = format!(" {}/{} ", results.matched, results.total);
    if !results.complete {
        status.push_str("scanning… ");
    }
    status
}

pub fn draw(frame: &mut Frame, view: &SceneView) {
    let area = frame.area();
    frame.render_widget(Clear, area);

    let header = Rect {
        height: HEADER_HEIGHT.min(area.height),
        ..area
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .title(Line::from(status_line(&view.results)).alignment(Alignment::Right));
    let input_area = block.inner(header);
    frame.render_widget(block, header);

    let label = Span::styled(
        view.label.clone(),
        Style::default().add_modifier(Modifier::BOLD),
    );
    let label_width = label.width();
    frame.render_widget(
        Paragraph::new(Line::from(vec![label, Span::raw(view.query.clone())])),
        input_area,
    );
    if input_area.width > 0 && input_area.height > 0 {
        let before_cursor: String = view.query.chars().take(view.cursor).collect();
        let column = label_width + Span::raw(before_cursor).width();
        let max_column = usize::from(input_area.width - 1);
        let x = input_area.x + column.min(max_column) as u16;
        frame.set_cursor_position((x, input_area.y));
    }

    let list_area = Rect {
        y: area.y + header.height,
        height: area.height - header.height,
        ..area
    };
    let selected_style = Style::default().add_modifier(Modifier::BOLD | Modifier::UNDERLINED);
    let rows: Vec<Line> = view
        .results
        .rows
        .iter()
        .enumerate()
        .map(|(row, path)| {
            if view.results.selected_row == Some(row) {
                Line::from(vec![
                    Span::raw(SELECTION_MARKER),
                    Span::styled(path.clone(), selected_style),
                ])
            } else {
                Line::from(vec![Span::raw(ROW_PADDING), Span::raw(path.clone())])
            }
        })
        .collect();
    frame.render_widget(Paragraph::new(rows), list_area);

    if let Some(log) = &view.log {
        draw_log_panel(frame, list_area, log);
    }
}

fn log_text(log: &str) -> Text<'static> {
    match log.as_bytes().to_vec().into_text() {
        Ok(text) => text,
        Err(_) => Text::raw(log.to_string()),
    }
}

// Bottom-anchored; newest lines win when the panel is short on rows.
fn draw_log_panel(frame: &mut Frame, list_area: Rect, log: &str) {
    let mut lines = log_text(log.trim_end()).lines;
    if list_area.height < 2 || lines.is_empty() {
        return;
    }
    let max_lines = usize::from(list_area.height - 1);
    if lines.len() > max_lines {
        lines.drain(..lines.len() - max_lines);
    }
    let height = lines.len() as u16 + 1;
    let panel = Rect {
        y: list_area.y + list_area.height - height,
        height,
        ..list_area
    };
    frame.render_widget(Clear, panel);
    frame.render_widget(
        Paragraph::new(lines).block(Block::default().borders(Borders::TOP)),
        panel,
    );
}

/// Cheap clonable trigger for repaints. Requests made while a repaint is
/// already pending collapse into that one.
#[derive(Clone)]
pub struct RenderHandle {
    dirty: Sender<()>,
}

impl RenderHandle {
    pub fn request(&self) {
        let _ = self.dirty.try_send(());
    }
}

type SharedSurface<B> = Arc<Mutex<Option<Terminal<B>>>>;

/// Owns the render thread. At most one repaint runs at a time and every
/// repaint snapshots state after the request that woke it, so the last frame
/// always reflects the last change.
pub struct Renderer<B: Backend> {
    surface: SharedSurface<B>,
    handle: RenderHandle,
    frames: Arc<AtomicU64>,
    faults: Receiver<Error>,
}

impl<B> Renderer<B>
where
    B: Backend + Send + 'static,
    B::Error: std::error::Error + Send + Sync + 'static,
{
    pub fn spawn(terminal: Terminal<B>, scene: Scene) -> Result<Self> {
        let surface: SharedSurface<B> = Arc::new(Mutex::new(Some(terminal)));
        let (dirty, wake) = bounded(1);
        let (fault_tx, faults) = unbounded();
        let frames = Arc::new(AtomicU64::new(0));

        {
            let surface = Arc::clone(&surface);
            let frames = Arc::clone(&frames);
            thread::Builder::new()
                .name("burrow-render".to_string())
                .spawn(move || run_render_loop(&surface, &scene, &wake, &fault_tx, &frames))
                .map_err(|err| Error::spawn("render", err))?;
        }

        Ok(Self {
            surface,
            handle: RenderHandle { dirty },
            frames,
            faults,
        })
    }

    pub fn handle(&self) -> RenderHandle {
        self.handle.clone()
    }

    pub fn request(&self) {
        self.handle.request();
    }

    pub fn frames(&self) -> u64 {
        self.frames.load(Ordering::Acquire)
    }

    pub fn faults(&self) -> &Receiver<Error> {
        &self.faults
    }

    /// Releases the surface after any in-flight repaint; later requests are no-ops.
    pub fn shutdown(self) -> Option<Terminal<B>> {
        self.surface.lock().take()
    }
}

fn run_render_loop<B>(
    surface: &Mutex<Option<Terminal<B>>>,
    scene: &Scene,
    wake: &Receiver<()>,
    faults: &Sender<Error>,
    frames: &AtomicU64,
) where
    B: Backend,
    B::Error: std::error::Error + Send + Sync + 'static,
{
    while wake.recv().is_ok() {
        let view = scene.snapshot();
        let mut surface = surface.lock();
        let Some(terminal) = surface.as_mut() else {
            break;
        };
        if let Err(err) = terminal.draw(|frame| draw(frame, &view)) {
            tracing::warn!(%err, "repaint failed");
            let _ = faults.send(Error::surface(err));
            break;
        }
        frames.fetch_add(1, Ordering::Release);
    }
}
