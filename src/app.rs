use std::fmt;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{select, Receiver};
use ratatui::{backend::Backend, Terminal};

use crate::config::Config;
use crate::crawler::{self, CrawlEvent};
use crate::error::{Error, Result};
use crate::index::ResultIndex;
use crate::input::{Command, InputEvent, Inputs};
use crate::logging::LogBuffer;
use crate::query::QueryEditor;
use crate::render::{RenderHandle, Renderer, Scene};

/// How a session ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Selected(PathBuf),
    Nothing,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Selected(path) => write!(f, "{}", path.display()),
            Outcome::Nothing => f.write_str("."),
        }
    }
}

impl Outcome {
    /// Writes the result line for the calling shell. Paths go out byte for
    /// byte, so names that are not valid UTF-8 survive `cd "$(burrow)"`.
    pub fn write_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        match self {
            Outcome::Selected(path) => write_path(out, path)?,
            Outcome::Nothing => out.write_all(b".")?,
        }
        out.write_all(b"\n")?;
        out.flush()
    }
}

#[cfg(unix)]
fn write_path<W: Write>(out: &mut W, path: &Path) -> io::Result<()> {
    use std::os::unix::ffi::OsStrExt;
    out.write_all(path.as_os_str().as_bytes())
}

#[cfg(not(unix))]
fn write_path<W: Write>(out: &mut W, path: &Path) -> io::Result<()> {
    write!(out, "{}", path.display())
}

enum Flow {
    Continue,
    Done(Outcome),
}

pub struct Session {
    root: PathBuf,
    workers: usize,
    query: Arc<QueryEditor>,
    index: Arc<ResultIndex>,
    log: LogBuffer,
    debug_panel: bool,
}

impl Session {
    pub fn new(root: PathBuf, config: &Config, log: LogBuffer) -> Self {
        Self {
            query: Arc::new(QueryEditor::new(&root)),
            index: Arc::new(ResultIndex::new(root.clone())),
            workers: config.worker_count(),
            debug_panel: config.debug,
            root,
            log,
        }
    }

    pub fn index(&self) -> Arc<ResultIndex> {
        Arc::clone(&self.index)
    }

    pub fn query(&self) -> Arc<QueryEditor> {
        Arc::clone(&self.query)
    }

    /// Runs until confirm, cancel or a surface error. The crawler and ingest
    /// threads are left running; whatever they deliver afterwards is dropped.
    pub fn run<B>(self, terminal: Terminal<B>, inputs: Inputs) -> Result<Outcome>
    where
        B: Backend + Send + 'static,
        B::Error: std::error::Error + Send + Sync + 'static,
    {
        let size = terminal.size().map_err(Error::surface)?;
        self.index.set_display_height(size.height);

        let scene = Scene::new(
            Arc::clone(&self.query),
            Arc::clone(&self.index),
            self.log.clone(),
            self.debug_panel,
        );
        let renderer = Renderer::spawn(terminal, scene)?;

        tracing::info!(root = %self.root.display(), workers = self.workers, "session started");
        self.index.ingest(vec![self.root.clone()]);
        let crawl = crawler::spawn(self.root.clone(), self.workers)?.events;
        spawn_ingest(crawl, Arc::clone(&self.index), renderer.handle())?;
        renderer.request();

        let outcome = self.event_loop(&inputs, &renderer);
        let _ = renderer.shutdown();
        match &outcome {
            Ok(outcome) => tracing::info!(%outcome, "session ended"),
            Err(err) => tracing::warn!(%err, "session failed"),
        }
        outcome
    }

    fn event_loop<B>(&self, inputs: &Inputs, renderer: &Renderer<B>) -> Result<Outcome>
    where
        B: Backend + Send + 'static,
        B::Error: std::error::Error + Send + Sync + 'static,
    {
        loop {
            let command = select! {
                recv(inputs.reliable) -> event => match event {
                    Ok(InputEvent::Command(command)) => command,
                    Ok(InputEvent::Failed(err)) => return Err(Error::Terminal(err)),
                    Err(_) => return Ok(Outcome::Nothing),
                },
                recv(inputs.mouse.doorbell()) -> _ => match inputs.mouse.take() {
                    Some(command) => command,
                    None => continue,
                },
                recv(renderer.faults()) -> fault => {
                    return Err(fault.unwrap_or_else(|_| {
                        Error::surface(io::Error::other("render thread stopped"))
                    }));
                }
            };

            if let Flow::Done(outcome) = self.apply(command) {
                return Ok(outcome);
            }
            renderer.request();
        }
    }

    fn apply(&self, command: Command) -> Flow {
        match command {
            Command::Confirm => return Flow::Done(self.current_outcome()),
            Command::Cancel => return Flow::Done(Outcome::Nothing),
            Command::Edit(edit) => {
                // Editor lock is released before the index recomputes.
                if let Some(text) = self.query.apply(edit) {
                    self.index.requery(&text);
                }
            }
            Command::SelectUp => self.index.move_selection_up(),
            Command::SelectDown => self.index.move_selection_down(),
            Command::Press { row } | Command::Drag { row } => self.index.press(row),
            Command::Click { column, row } => {
                if self.index.click(column, row) {
                    return Flow::Done(self.current_outcome());
                }
            }
            Command::ScrollUp => self.index.scroll_up(),
            Command::ScrollDown => self.index.scroll_down(),
            Command::Resize { height } => self.index.set_display_height(height),
        }
        Flow::Continue
    }

    fn current_outcome(&self) -> Outcome {
        match self.index.selected_path() {
            Some(path) => Outcome::Selected(path),
            None => Outcome::Nothing,
        }
    }
}

fn spawn_ingest(
    crawl: Receiver<CrawlEvent>,
    index: Arc<ResultIndex>,
    render: RenderHandle,
) -> Result<()> {
    thread::Builder::new()
        .name("burrow-ingest".to_string())
        .spawn(move || {
            for event in crawl {
                match event {
                    CrawlEvent::Batch { parent, dirs } => {
                        tracing::trace!(parent = %parent.display(), dirs = dirs.len(), "batch");
                        index.ingest(dirs);
                    }
                    CrawlEvent::Finished { .. } => index.mark_complete(),
                }
                render.request();
            }
        })
        .map_err(|err| Error::spawn("ingest", err))?;
    Ok(())
}
