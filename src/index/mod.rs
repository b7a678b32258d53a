mod score;

pub use score::score;

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

/// Rows taken by the framed query input above the result list.
pub const HEADER_HEIGHT: u16 = 3;
/// Column where a row's path text starts; the selection marker sits before it.
pub const ROW_TEXT_COLUMN: u16 = 2;

#[derive(Clone, Debug)]
struct Candidate {
    path: PathBuf,
    relative: String,
    is_root: bool,
}

impl Candidate {
    fn new(root: &Path, path: PathBuf) -> Self {
        let (relative, is_root) = match path.strip_prefix(root) {
            Ok(rel) if rel.as_os_str().is_empty() => (".".to_string(), true),
            Ok(rel) => (rel.to_string_lossy().into_owned(), false),
            Err(_) => (path.to_string_lossy().into_owned(), false),
        };
        Self {
            path,
            relative,
            is_root,
        }
    }

    // The root sorts ahead of every same-scoring entry.
    fn length_key(&self) -> usize {
        if self.is_root {
            0
        } else {
            self.relative.len()
        }
    }
}

/// What the render coordinator needs from one consistent look at the index.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResultsView {
    pub rows: Vec<String>,
    pub selected_row: Option<usize>,
    pub matched: usize,
    pub total: usize,
    pub complete: bool,
}

struct IndexState {
    query: Vec<char>,
    candidates: Vec<Candidate>,
    matches: Vec<usize>,
    selected: Option<usize>,
    offset: usize,
    visible_rows: usize,
    complete: bool,
}

/// Candidate set, match list, selection and viewport behind one lock. Every
/// public method holds the lock for its whole read-modify-write.
pub struct ResultIndex {
    root: PathBuf,
    state: Mutex<IndexState>,
}

impl ResultIndex {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            state: Mutex::new(IndexState {
                query: Vec::new(),
                candidates: Vec::new(),
                matches: Vec::new(),
                selected: None,
                offset: 0,
                visible_rows: 1,
                complete: false,
            }),
        }
    }

    pub fn set_display_height(&self, height: u16) {
        let mut state = self.state.lock();
        state.visible_rows = usize::from(height.saturating_sub(HEADER_HEIGHT)).max(1);
        state.ensure_visible();
    }

    /// Merges a crawler batch. Never moves a valid selection or the viewport
    /// the user scrolled to.
    pub fn ingest(&self, batch: Vec<PathBuf>) {
        if batch.is_empty() {
            return;
        }
        let mut state = self.state.lock();
        state
            .candidates
            .extend(batch.into_iter().map(|path| Candidate::new(&self.root, path)));
        state.sort_candidates();
        state.recompute();
        state.clamp_offset();
    }

    /// Applies new query text: rebuild the match list, then jump to the best match.
    pub fn requery(&self, query: &str) {
        let mut state = self.state.lock();
        state.query = query.chars().collect();
        state.recompute();
        state.select_best_match();
    }

    pub fn mark_complete(&self) {
        self.state.lock().complete = true;
    }

    pub fn move_selection_down(&self) {
        let mut state = self.state.lock();
        if let Some(selected) = state.selected {
            if selected + 1 < state.matches.len() {
                state.selected = Some(selected + 1);
            }
        }
        state.ensure_visible();
    }

    pub fn move_selection_up(&self) {
        let mut state = self.state.lock();
        if let Some(selected) = state.selected {
            state.selected = Some(selected.saturating_sub(1));
        }
        state.ensure_visible();
    }

    /// Press or drag at a screen row. Above the list scrolls up, past its end
    /// scrolls down.
    pub fn press(&self, row: u16) {
        let mut state = self.state.lock();
        let Some(list_row) = row.checked_sub(HEADER_HEIGHT) else {
            state.scroll_up();
            return;
        };
        let index = usize::from(list_row) + state.offset;
        if index >= state.matches.len() {
            state.scroll_down();
            return;
        }
        state.selected = Some(index);
        state.ensure_visible();
    }

    /// True when the click lands on the text of the already selected row.
    pub fn click(&self, column: u16, row: u16) -> bool {
        let state = self.state.lock();
        let (Some(selected), Some(list_row)) = (state.selected, row.checked_sub(HEADER_HEIGHT))
        else {
            return false;
        };
        if usize::from(list_row) + state.offset != selected {
            return false;
        }
        let Some(text_column) = column.checked_sub(ROW_TEXT_COLUMN) else {
            return false;
        };
        let width = state
            .candidate_at(selected)
            .map(|candidate| candidate.relative.chars().count())
            .unwrap_or(0);
        usize::from(text_column) < width
    }

    pub fn scroll_up(&self) {
        self.state.lock().scroll_up();
    }

    pub fn scroll_down(&self) {
        self.state.lock().scroll_down();
    }

    pub fn selected_path(&self) -> Option<PathBuf> {
        let state = self.state.lock();
        state
            .selected
            .and_then(|selected| state.candidate_at(selected))
            .map(|candidate| candidate.path.clone())
    }

    pub fn selection(&self) -> Option<usize> {
        self.state.lock().selected
    }

    pub fn offset(&self) -> usize {
        self.state.lock().offset
    }

    pub fn visible_rows(&self) -> usize {
        self.state.lock().visible_rows
    }

    pub fn candidate_count(&self) -> usize {
        self.state.lock().candidates.len()
    }

    pub fn is_complete(&self) -> bool {
        self.state.lock().complete
    }

    pub fn candidates(&self) -> Vec<PathBuf> {
        let state = self.state.lock();
        state.candidates.iter().map(|c| c.path.clone()).collect()
    }

    /// Root-relative paths of the current match list, in order.
    pub fn matches(&self) -> Vec<String> {
        let state = self.state.lock();
        state
            .matches
            .iter()
            .map(|&index| state.candidates[index].relative.clone())
            .collect()
    }

    pub fn view(&self) -> ResultsView {
        let state = self.state.lock();
        let end = (state.offset + state.visible_rows).min(state.matches.len());
        let start = state.offset.min(end);
        let rows = state.matches[start..end]
            .iter()
            .map(|&index| state.candidates[index].relative.clone())
            .collect();
        ResultsView {
            rows,
            selected_row: state
                .selected
                .and_then(|selected| selected.checked_sub(start))
                .filter(|row| start + row < end),
            matched: state.matches.len(),
            total: state.candidates.len(),
            complete: state.complete,
        }
    }
}

impl IndexState {
    fn candidate_at(&self, selected: usize) -> Option<&Candidate> {
        self.matches
            .get(selected)
            .and_then(|&index| self.candidates.get(index))
    }

    // Merge-time order: score for the current query, then shorter, then lexical.
    fn sort_candidates(&mut self) {
        let query = &self.query;
        self.candidates.sort_by_cached_key(|candidate| {
            (
                std::cmp::Reverse(OrderedScore(score(query, &candidate.relative))),
                candidate.length_key(),
                candidate.relative.clone(),
            )
        });
    }

    fn recompute(&mut self) {
        let query = &self.query;
        self.matches = self
            .candidates
            .iter()
            .enumerate()
            .filter(|(_, candidate)| score(query, &candidate.relative) > 0.0)
            .map(|(index, _)| index)
            .collect();

        self.selected = match (self.matches.len(), self.selected) {
            (0, _) => None,
            (_, None) => Some(0),
            (len, Some(selected)) => Some(selected.min(len - 1)),
        };
    }

    fn clamp_offset(&mut self) {
        let last_page = self.matches.len().saturating_sub(self.visible_rows.max(1));
        self.offset = self.offset.min(last_page);
    }

    // Earliest entry wins ties.
    fn select_best_match(&mut self) {
        let mut best = 0.0;
        for (position, &index) in self.matches.iter().enumerate() {
            let value = score(&self.query, &self.candidates[index].relative);
            if value > best {
                best = value;
                self.selected = Some(position);
            }
        }
        self.ensure_visible();
    }

    fn ensure_visible(&mut self) {
        let total = self.matches.len();
        let Some(selected) = self.selected else {
            self.offset = 0;
            return;
        };

        let height = self.visible_rows.max(1);
        let mut offset = self.offset.min(total.saturating_sub(1));
        if selected < offset {
            offset = selected;
        } else if selected >= offset + height {
            offset = selected + 1 - height;
        }
        self.offset = offset.min(total.saturating_sub(height));
    }

    fn scroll_up(&mut self) {
        self.offset = self.offset.saturating_sub(1);
    }

    fn scroll_down(&mut self) {
        if self.offset + self.visible_rows < self.matches.len() {
            self.offset += 1;
        }
    }
}

#[derive(Clone, Copy, PartialEq)]
struct OrderedScore(f64);

impl Eq for OrderedScore {}

impl PartialOrd for OrderedScore {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OrderedScore {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}
