use ratatui::layout::Rect;
use std::cmp;

/// Small text buffer behind the form fields.
///
/// Cursor columns count chars, not bytes. A single-line editor ignores
/// newlines.
#[derive(Debug, Clone)]
pub struct Editor {
    pub lines: Vec<String>,
    pub cursor_line: usize,
    pub cursor_col: usize,
    pub scroll_offset: usize, // Vertical scroll (line offset)
    pub scroll_col: usize,    // Horizontal scroll (column offset)
    multi_line: bool,
}

impl Default for Editor {
    fn default() -> Self {
        Self::single_line()
    }
}

impl Editor {
    pub fn single_line() -> Self {
        Self {
            lines: vec![String::new()],
            cursor_line: 0,
            cursor_col: 0,
            scroll_offset: 0,
            scroll_col: 0,
            multi_line: false,
        }
    }

    pub fn multi_line() -> Self {
        Self {
            multi_line: true,
            ..Self::single_line()
        }
    }

    /// Editor pre-filled with `content`, cursor at the end
    pub fn with_text(mut self, content: &str) -> Self {
        self.lines = if self.multi_line {
            content.split('\n').map(str::to_string).collect()
        } else {
            vec![content.replace('\n', " ")]
        };
        if self.lines.is_empty() {
            self.lines.push(String::new());
        }
        self.cursor_line = self.lines.len() - 1;
        self.cursor_col = self.current_line_len();
        self
    }

    pub fn is_multi_line(&self) -> bool {
        self.multi_line
    }

    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    fn current_line_len(&self) -> usize {
        self.lines
            .get(self.cursor_line)
            .map(|l| l.chars().count())
            .unwrap_or(0)
    }

    fn byte_index(line: &str, col: usize) -> usize {
        line.char_indices()
            .nth(col)
            .map(|(i, _)| i)
            .unwrap_or(line.len())
    }

    pub fn insert_char(&mut self, ch: char) {
        if ch == '\n' {
            self.insert_newline();
            return;
        }
        let col = cmp::min(self.cursor_col, self.current_line_len());
        if let Some(line) = self.lines.get_mut(self.cursor_line) {
            let at = Self::byte_index(line, col);
            line.insert(at, ch);
            self.cursor_col = col + 1;
        }
    }

    pub fn insert_newline(&mut self) {
        if !self.multi_line {
            return;
        }
        let col = cmp::min(self.cursor_col, self.current_line_len());
        if let Some(line) = self.lines.get_mut(self.cursor_line) {
            let at = Self::byte_index(line, col);
            let remainder = line.split_off(at);
            self.lines.insert(self.cursor_line + 1, remainder);
            self.cursor_line += 1;
            self.cursor_col = 0;
        }
    }

    /// Backspace: delete the char before the cursor, joining lines at column 0
    pub fn delete_char(&mut self) {
        let col = cmp::min(self.cursor_col, self.current_line_len());
        if col > 0 {
            if let Some(line) = self.lines.get_mut(self.cursor_line) {
                let at = Self::byte_index(line, col - 1);
                line.remove(at);
                self.cursor_col = col - 1;
            }
        } else if self.cursor_line > 0 {
            let current = self.lines.remove(self.cursor_line);
            self.cursor_line -= 1;
            self.cursor_col = self.current_line_len();
            if let Some(previous) = self.lines.get_mut(self.cursor_line) {
                previous.push_str(&current);
            }
        }
    }

    /// Delete: remove the char under the cursor, joining the next line at the end
    pub fn delete_forward(&mut self) {
        let len = self.current_line_len();
        let col = cmp::min(self.cursor_col, len);
        if col < len {
            if let Some(line) = self.lines.get_mut(self.cursor_line) {
                let at = Self::byte_index(line, col);
                line.remove(at);
            }
        } else if self.cursor_line + 1 < self.lines.len() {
            let next = self.lines.remove(self.cursor_line + 1);
            if let Some(line) = self.lines.get_mut(self.cursor_line) {
                line.push_str(&next);
            }
        }
    }

    pub fn move_cursor_up(&mut self) {
        if self.cursor_line > 0 {
            self.cursor_line -= 1;
            self.cursor_col = cmp::min(self.cursor_col, self.current_line_len());
        }
    }

    pub fn move_cursor_down(&mut self) {
        if self.cursor_line + 1 < self.lines.len() {
            self.cursor_line += 1;
            self.cursor_col = cmp::min(self.cursor_col, self.current_line_len());
        }
    }

    pub fn move_cursor_left(&mut self) {
        if self.cursor_col > 0 {
            self.cursor_col -= 1;
        } else if self.cursor_line > 0 {
            self.cursor_line -= 1;
            self.cursor_col = self.current_line_len();
        }
    }

    pub fn move_cursor_right(&mut self) {
        if self.cursor_col < self.current_line_len() {
            self.cursor_col += 1;
        } else if self.cursor_line + 1 < self.lines.len() {
            self.cursor_line += 1;
            self.cursor_col = 0;
        }
    }

    pub fn move_cursor_home(&mut self) {
        self.cursor_col = 0;
    }

    pub fn move_cursor_end(&mut self) {
        self.cursor_col = self.current_line_len();
    }

    /// Lines visible in a `viewport_height` x `viewport_width` box (borders included)
    pub fn get_visible_lines(&self, viewport_height: usize, viewport_width: usize) -> Vec<String> {
        let start = cmp::min(self.scroll_offset, self.lines.len());
        let end = cmp::min(start + viewport_height, self.lines.len());
        let width = viewport_width.saturating_sub(2);

        self.lines[start..end]
            .iter()
            .map(|line| line.chars().skip(self.scroll_col).take(width).collect())
            .collect()
    }

    /// Keep the cursor inside the viewport
    pub fn update_scroll(&mut self, viewport_height: usize, viewport_width: usize) {
        let viewport_height = viewport_height.max(1);
        if self.cursor_line < self.scroll_offset {
            self.scroll_offset = self.cursor_line;
        } else if self.cursor_line >= self.scroll_offset + viewport_height {
            self.scroll_offset = self.cursor_line + 1 - viewport_height;
        }

        let width = viewport_width.saturating_sub(2).max(1);
        if self.cursor_col < self.scroll_col {
            self.scroll_col = self.cursor_col;
        } else if self.cursor_col >= self.scroll_col + width {
            self.scroll_col = self.cursor_col + 1 - width;
        }
    }

    /// Terminal position of the cursor inside a bordered `area`, if visible
    pub fn get_cursor_screen_pos(&self, area: Rect) -> Option<(u16, u16)> {
        let inner_height = area.height.saturating_sub(2) as usize;
        let inner_width = area.width.saturating_sub(2) as usize;

        let row = self.cursor_line.checked_sub(self.scroll_offset)?;
        let col = cmp::min(self.cursor_col, self.current_line_len()).checked_sub(self.scroll_col)?;
        if row >= inner_height || col >= inner_width {
            return None;
        }

        Some((area.x + 1 + col as u16, area.y + 1 + row as u16))
    }
}
