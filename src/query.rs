use std::path::{Path, MAIN_SEPARATOR};

use parking_lot::Mutex;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Edit {
    Insert(char),
    DeleteBackward,
    DeleteForward,
    DeleteWordBackward,
    CursorLeft,
    CursorRight,
    WordLeft,
    WordRight,
}

pub fn is_delimiter(c: char) -> bool {
    matches!(c, '\\' | '/' | ' ' | '.' | '\t' | ',' | '-' | '|')
}

fn is_word(c: char) -> bool {
    !is_delimiter(c)
}

fn trim_end_while(chars: &[char], pred: fn(char) -> bool) -> usize {
    let mut end = chars.len();
    while end > 0 && pred(chars[end - 1]) {
        end -= 1;
    }
    end
}

fn trim_start_while(chars: &[char], pred: fn(char) -> bool) -> usize {
    chars.iter().take_while(|c| pred(**c)).count()
}

/// Query text plus cursor, counted in chars. `cursor <= chars.len()` always.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Query {
    chars: Vec<char>,
    cursor: usize,
}

impl Query {
    pub fn text(&self) -> String {
        self.chars.iter().collect()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    /// Applies one edit; returns true when the text (not just the cursor) changed.
    pub fn apply(&mut self, edit: Edit) -> bool {
        match edit {
            Edit::Insert(c) => self.insert(c),
            Edit::DeleteBackward => self.delete_backward(),
            Edit::DeleteForward => self.delete_forward(),
            Edit::DeleteWordBackward => self.delete_word_backward(),
            Edit::CursorLeft => {
                self.cursor = self.cursor.saturating_sub(1);
                false
            }
            Edit::CursorRight => {
                if self.cursor < self.chars.len() {
                    self.cursor += 1;
                }
                false
            }
            Edit::WordLeft => {
                self.cursor = self.word_start_before_cursor();
                false
            }
            Edit::WordRight => {
                self.cursor = self.word_end_after_cursor();
                false
            }
        }
    }

    fn insert(&mut self, c: char) -> bool {
        self.chars.insert(self.cursor, c);
        self.cursor += 1;
        true
    }

    fn delete_backward(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        self.chars.remove(self.cursor);
        true
    }

    fn delete_forward(&mut self) -> bool {
        if self.cursor >= self.chars.len() {
            return false;
        }
        self.chars.remove(self.cursor);
        true
    }

    fn delete_word_backward(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        let start = self.word_start_before_cursor();
        self.chars.drain(start..self.cursor);
        self.cursor = start;
        true
    }

    // Delimiters first, then one word.
    fn word_start_before_cursor(&self) -> usize {
        let prefix = &self.chars[..self.cursor];
        let end = trim_end_while(prefix, is_delimiter);
        trim_end_while(&prefix[..end], is_word)
    }

    fn word_end_after_cursor(&self) -> usize {
        let suffix = &self.chars[self.cursor..];
        let skipped = trim_start_while(suffix, is_delimiter);
        let word = trim_start_while(&suffix[skipped..], is_word);
        self.cursor + skipped + word
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuerySnapshot {
    pub label: String,
    pub text: String,
    pub cursor: usize,
}

/// Owns the query behind its own lock. The root label is fixed for the session.
pub struct QueryEditor {
    label: String,
    query: Mutex<Query>,
}

impl QueryEditor {
    pub fn new(root: &Path) -> Self {
        let mut label = root.display().to_string();
        if !label.ends_with(MAIN_SEPARATOR) {
            label.push(MAIN_SEPARATOR);
        }
        Self {
            label,
            query: Mutex::new(Query::default()),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Returns the new text when the edit changed it. The lock is released
    /// before the caller acts on the result.
    pub fn apply(&self, edit: Edit) -> Option<String> {
        let mut query = self.query.lock();
        query.apply(edit).then(|| query.text())
    }

    pub fn snapshot(&self) -> QuerySnapshot {
        let query = self.query.lock();
        QuerySnapshot {
            label: self.label.clone(),
            text: query.text(),
            cursor: query.cursor(),
        }
    }
}
