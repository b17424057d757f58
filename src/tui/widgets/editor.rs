use ratatui::layout::Rect;
use std::cmp;
use unicode_width::UnicodeWidthChar;

/// Snapshot taken before each edit, restored by undo
#[derive(Debug, Clone)]
struct Snapshot {
    lines: Vec<String>,
    cursor_line: usize,
    cursor_col: usize,
}

/// Small line-based text editor backing the field popup and the sync id input.
/// Cursor columns count chars, not bytes; screen positions use display width.
#[derive(Debug, Clone)]
pub struct Editor {
    pub lines: Vec<String>,
    pub cursor_line: usize,
    pub cursor_col: usize,
    pub scroll_offset: usize,
    pub scroll_col: usize,
    pub multi_line: bool,
    history: Vec<Snapshot>,
}

const MAX_HISTORY: usize = 100;

impl Default for Editor {
    fn default() -> Self {
        Self::new()
    }
}

impl Editor {
    pub fn new() -> Self {
        Self::from_string(String::new(), true)
    }

    pub fn single_line() -> Self {
        Self::from_string(String::new(), false)
    }

    /// Start editing `content` with the cursor at its end
    pub fn from_string(content: String, multi_line: bool) -> Self {
        let mut lines: Vec<String> = if multi_line {
            content.split('\n').map(str::to_string).collect()
        } else {
            vec![content.replace('\n', " ")]
        };
        if lines.is_empty() {
            lines.push(String::new());
        }
        let cursor_line = lines.len() - 1;
        let cursor_col = char_len(&lines[cursor_line]);
        Self {
            lines,
            cursor_line,
            cursor_col,
            scroll_offset: 0,
            scroll_col: 0,
            multi_line,
            history: Vec::new(),
        }
    }

    fn snapshot(&mut self) {
        self.history.push(Snapshot {
            lines: self.lines.clone(),
            cursor_line: self.cursor_line,
            cursor_col: self.cursor_col,
        });
        if self.history.len() > MAX_HISTORY {
            self.history.remove(0);
        }
    }

    fn current_line_len(&self) -> usize {
        self.lines.get(self.cursor_line).map(|l| char_len(l)).unwrap_or(0)
    }

    pub fn insert_char(&mut self, ch: char) {
        if ch == '\n' {
            self.insert_newline();
            return;
        }
        self.snapshot();
        let col = cmp::min(self.cursor_col, self.current_line_len());
        let line = &mut self.lines[self.cursor_line];
        let at = byte_index(line, col);
        line.insert(at, ch);
        self.cursor_col = col + 1;
    }

    /// Split the line at the cursor. Ignored by single-line editors.
    pub fn insert_newline(&mut self) {
        if !self.multi_line {
            return;
        }
        self.snapshot();
        let col = cmp::min(self.cursor_col, self.current_line_len());
        let line = &mut self.lines[self.cursor_line];
        let rest = line.split_off(byte_index(line, col));
        self.lines.insert(self.cursor_line + 1, rest);
        self.cursor_line += 1;
        self.cursor_col = 0;
    }

    /// Backspace: delete before the cursor, joining lines at column 0
    pub fn delete_char(&mut self) {
        let col = cmp::min(self.cursor_col, self.current_line_len());
        if col > 0 {
            self.snapshot();
            let line = &mut self.lines[self.cursor_line];
            line.remove(byte_index(line, col - 1));
            self.cursor_col = col - 1;
        } else if self.cursor_line > 0 {
            self.snapshot();
            let current = self.lines.remove(self.cursor_line);
            self.cursor_line -= 1;
            self.cursor_col = self.current_line_len();
            self.lines[self.cursor_line].push_str(&current);
        }
    }

    /// Delete: remove the char under the cursor, joining the next line at end of line
    pub fn delete_forward(&mut self) {
        let len = self.current_line_len();
        let col = cmp::min(self.cursor_col, len);
        if col < len {
            self.snapshot();
            let line = &mut self.lines[self.cursor_line];
            line.remove(byte_index(line, col));
        } else if self.cursor_line + 1 < self.lines.len() {
            self.snapshot();
            let next = self.lines.remove(self.cursor_line + 1);
            self.lines[self.cursor_line].push_str(&next);
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
            self.cursor_col = cmp::min(self.cursor_col, self.current_line_len()) - 1;
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

    pub fn move_cursor_word_left(&mut self) {
        if self.cursor_col == 0 {
            self.move_cursor_left();
            return;
        }
        let chars: Vec<char> = self.lines[self.cursor_line].chars().collect();
        let mut pos = cmp::min(self.cursor_col, chars.len());
        while pos > 0 && chars[pos - 1].is_whitespace() {
            pos -= 1;
        }
        while pos > 0 && is_word_char(chars[pos - 1]) {
            pos -= 1;
        }
        // Punctuation run with no word before it still moves one step
        if pos == self.cursor_col {
            pos -= 1;
        }
        self.cursor_col = pos;
    }

    pub fn move_cursor_word_right(&mut self) {
        let chars: Vec<char> = self.lines[self.cursor_line].chars().collect();
        if self.cursor_col >= chars.len() {
            self.move_cursor_right();
            return;
        }
        let mut pos = self.cursor_col;
        while pos < chars.len() && is_word_char(chars[pos]) {
            pos += 1;
        }
        while pos < chars.len() && chars[pos].is_whitespace() {
            pos += 1;
        }
        if pos == self.cursor_col {
            pos += 1;
        }
        self.cursor_col = pos;
    }

    /// Restore the state before the last edit. Returns false when there is nothing to undo.
    pub fn undo(&mut self) -> bool {
        match self.history.pop() {
            Some(snapshot) => {
                self.lines = snapshot.lines;
                self.cursor_line = snapshot.cursor_line;
                self.cursor_col = snapshot.cursor_col;
                true
            }
            None => false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.lines.iter().all(|l| l.is_empty())
    }

    /// Keep the cursor inside a viewport of the given size (borders excluded)
    pub fn update_scroll(&mut self, viewport_height: usize, viewport_width: usize) {
        let height = viewport_height.max(1);
        if self.cursor_line < self.scroll_offset {
            self.scroll_offset = self.cursor_line;
        } else if self.cursor_line >= self.scroll_offset + height {
            self.scroll_offset = self.cursor_line + 1 - height;
        }

        let width = viewport_width.max(1);
        let line = self.lines.get(self.cursor_line).map(String::as_str).unwrap_or("");
        if self.cursor_col < self.scroll_col {
            self.scroll_col = self.cursor_col;
        }
        // Text before the cursor plus the cursor cell must fit
        while self.scroll_col < self.cursor_col
            && span_width(line, self.scroll_col, self.cursor_col) + 1 > width
        {
            self.scroll_col += 1;
        }
    }

    /// Lines currently in view, horizontally clipped
    pub fn visible_lines(&self, viewport_height: usize, viewport_width: usize) -> Vec<String> {
        self.lines
            .iter()
            .skip(self.scroll_offset)
            .take(viewport_height)
            .map(|line| {
                let mut used = 0;
                line.chars()
                    .skip(self.scroll_col)
                    .take_while(|ch| {
                        used += char_width(*ch);
                        used <= viewport_width
                    })
                    .collect()
            })
            .collect()
    }

    /// Terminal position of the cursor for a bordered `area`, if it is in view
    pub fn cursor_screen_pos(&self, area: Rect) -> Option<(u16, u16)> {
        let inner_height = area.height.saturating_sub(2) as usize;
        let inner_width = area.width.saturating_sub(2) as usize;
        let row = self.cursor_line.checked_sub(self.scroll_offset)?;
        if self.cursor_col < self.scroll_col {
            return None;
        }
        let line = self.lines.get(self.cursor_line)?;
        let col = span_width(line, self.scroll_col, self.cursor_col);
        if row >= inner_height || col >= inner_width {
            return None;
        }
        Some((area.x + 1 + col as u16, area.y + 1 + row as u16))
    }

    pub fn to_string(&self) -> String {
        self.lines.join("\n")
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn char_width(ch: char) -> usize {
    ch.width().unwrap_or(0)
}

/// Display width of chars `from..to` of `line`
fn span_width(line: &str, from: usize, to: usize) -> usize {
    line.chars().skip(from).take(to.saturating_sub(from)).map(char_width).sum()
}

/// Byte offset of the `col`-th char, or the end of the string
fn byte_index(s: &str, col: usize) -> usize {
    s.char_indices().nth(col).map(|(i, _)| i).unwrap_or(s.len())
}

fn is_word_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_' || ch == '#'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn type_str(editor: &mut Editor, s: &str) {
        for ch in s.chars() {
            editor.insert_char(ch);
        }
    }

    #[test]
    fn typing_handles_multibyte_chars() {
        let mut editor = Editor::new();
        type_str(&mut editor, "Promoção");
        assert_eq!(editor.cursor_col, 8);
        editor.move_cursor_left();
        editor.move_cursor_left();
        editor.delete_char();
        assert_eq!(editor.to_string(), "Promoão");
    }

    #[test]
    fn newline_and_backspace_join_lines() {
        let mut editor = Editor::from_string("antes depois".to_string(), true);
        for _ in 0..6 {
            editor.move_cursor_left();
        }
        editor.insert_newline();
        assert_eq!(editor.lines, vec!["antes ", "depois"]);
        editor.delete_char();
        assert_eq!(editor.to_string(), "antes depois");
    }

    #[test]
    fn single_line_editor_ignores_newlines() {
        let mut editor = Editor::from_string("a\nb".to_string(), false);
        assert_eq!(editor.to_string(), "a b");
        editor.insert_char('\n');
        assert_eq!(editor.lines.len(), 1);
    }

    #[test]
    fn delete_forward_joins_next_line() {
        let mut editor = Editor::from_string("ab\ncd".to_string(), true);
        editor.move_cursor_up();
        editor.move_cursor_end();
        editor.delete_forward();
        assert_eq!(editor.to_string(), "abcd");
    }

    #[test]
    fn undo_restores_previous_text_and_cursor() {
        let mut editor = Editor::from_string("oi".to_string(), true);
        editor.insert_char('!');
        editor.insert_newline();
        assert!(editor.undo());
        assert_eq!(editor.to_string(), "oi!");
        assert!(editor.undo());
        assert_eq!(editor.to_string(), "oi");
        assert_eq!(editor.cursor_col, 2);
        assert!(!editor.undo());
    }

    #[test]
    fn word_movement_skips_hashtags_and_spaces() {
        let mut editor = Editor::from_string("#limpeza #sp hoje".to_string(), false);
        editor.move_cursor_word_left();
        assert_eq!(editor.cursor_col, 13);
        editor.move_cursor_word_left();
        assert_eq!(editor.cursor_col, 9);
        editor.move_cursor_home();
        editor.move_cursor_word_right();
        assert_eq!(editor.cursor_col, 9);
    }

    #[test]
    fn scroll_follows_cursor() {
        let mut editor = Editor::from_string("1\n2\n3\n4\n5".to_string(), true);
        editor.update_scroll(2, 10);
        assert_eq!(editor.scroll_offset, 3);
        assert_eq!(editor.visible_lines(2, 10), vec!["4", "5"]);

        let area = Rect::new(0, 0, 12, 4);
        assert_eq!(editor.cursor_screen_pos(area), Some((2, 2)));
    }

    #[test]
    fn cursor_accounts_for_wide_chars() {
        let mut editor = Editor::from_string("😀😀ab".to_string(), false);
        editor.update_scroll(1, 18);
        assert_eq!(editor.cursor_screen_pos(Rect::new(0, 0, 20, 3)), Some((7, 1)));
    }

    #[test]
    fn horizontal_scroll_uses_display_width() {
        let mut editor = Editor::from_string("漢字漢字漢字".to_string(), false);
        editor.update_scroll(1, 5);
        assert_eq!(editor.scroll_col, 4);
        assert_eq!(editor.visible_lines(1, 5), vec!["漢字"]);
        assert_eq!(editor.cursor_screen_pos(Rect::new(0, 0, 7, 3)), Some((5, 1)));
    }
}
