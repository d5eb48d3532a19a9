//! Multi-line text buffer with a cursor, shared by the composer, the edit box
//! and the sign-in fields.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use unicode_width::UnicodeWidthStr;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextInput {
    content: String,
    /// Byte offset, always on a char boundary.
    cursor: usize,
    multiline: bool,
}

impl TextInput {
    pub fn multiline() -> Self {
        Self {
            multiline: true,
            ..Self::default()
        }
    }

    pub fn single_line() -> Self {
        Self::default()
    }

    pub fn text(&self) -> &str {
        &self.content
    }

    /// Live character count of the buffer.
    pub fn char_count(&self) -> usize {
        self.content.chars().count()
    }

    pub fn is_blank(&self) -> bool {
        self.content.trim().is_empty()
    }

    pub fn set_text(&mut self, text: &str) {
        self.content = text.to_string();
        self.cursor = self.content.len();
    }

    pub fn clear(&mut self) {
        self.content.clear();
        self.cursor = 0;
    }

    /// Applies an editing key. Returns false for keys the buffer doesn't handle.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        // AltGr arrives as Control+Alt on Windows and produces a plain character.
        let alt_gr = key.modifiers.contains(KeyModifiers::CONTROL | KeyModifiers::ALT)
            && matches!(key.code, KeyCode::Char(_));
        if !alt_gr
            && key
                .modifiers
                .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
        {
            return false;
        }
        match key.code {
            KeyCode::Char(c) => self.insert(c),
            KeyCode::Enter if self.multiline => self.insert('\n'),
            KeyCode::Backspace => self.backspace(),
            KeyCode::Delete => self.delete(),
            KeyCode::Left => self.move_left(),
            KeyCode::Right => self.move_right(),
            KeyCode::Up if self.multiline => self.move_up(),
            KeyCode::Down if self.multiline => self.move_down(),
            KeyCode::Home => self.cursor = self.line_start(self.cursor),
            KeyCode::End => self.cursor = self.line_end(self.cursor),
            _ => return false,
        }
        true
    }

    pub fn insert(&mut self, c: char) {
        self.content.insert(self.cursor, c);
        self.cursor += c.len_utf8();
    }

    pub fn backspace(&mut self) {
        if let Some(prev) = self.prev_boundary() {
            self.content.replace_range(prev..self.cursor, "");
            self.cursor = prev;
        }
    }

    pub fn delete(&mut self) {
        if let Some(next) = self.next_boundary() {
            self.content.replace_range(self.cursor..next, "");
        }
    }

    pub fn move_left(&mut self) {
        if let Some(prev) = self.prev_boundary() {
            self.cursor = prev;
        }
    }

    pub fn move_right(&mut self) {
        if let Some(next) = self.next_boundary() {
            self.cursor = next;
        }
    }

    pub fn move_up(&mut self) {
        let line_start = self.line_start(self.cursor);
        if line_start == 0 {
            return;
        }
        let column = self.content[line_start..self.cursor].chars().count();
        let prev_start = self.line_start(line_start - 1);
        self.cursor = self.offset_at_column(prev_start, line_start - 1, column);
    }

    pub fn move_down(&mut self) {
        let line_end = self.line_end(self.cursor);
        if line_end == self.content.len() {
            return;
        }
        let column = self.content[self.line_start(self.cursor)..self.cursor]
            .chars()
            .count();
        let next_start = line_end + 1;
        let next_end = self.line_end(next_start);
        self.cursor = self.offset_at_column(next_start, next_end, column);
    }

    /// Row and display column of the cursor, for placing the terminal cursor.
    pub fn cursor_position(&self) -> (u16, u16) {
        let before = &self.content[..self.cursor];
        let row = before.matches('\n').count();
        let line = &before[self.line_start(self.cursor)..];
        (
            u16::try_from(row).unwrap_or(u16::MAX),
            u16::try_from(line.width()).unwrap_or(u16::MAX),
        )
    }

    fn prev_boundary(&self) -> Option<usize> {
        self.content[..self.cursor]
            .char_indices()
            .next_back()
            .map(|(i, _)| i)
    }

    fn next_boundary(&self) -> Option<usize> {
        self.content[self.cursor..]
            .chars()
            .next()
            .map(|c| self.cursor + c.len_utf8())
    }

    fn line_start(&self, offset: usize) -> usize {
        self.content[..offset].rfind('\n').map_or(0, |i| i + 1)
    }

    fn line_end(&self, offset: usize) -> usize {
        self.content[offset..]
            .find('\n')
            .map_or(self.content.len(), |i| offset + i)
    }

    fn offset_at_column(&self, start: usize, end: usize, column: usize) -> usize {
        self.content[start..end]
            .char_indices()
            .nth(column)
            .map_or(end, |(i, _)| start + i)
    }
}
