/// Text being written plus a cursor, addressed in chars
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextBuffer {
    text: String,
    cursor: usize,
}

impl TextBuffer {
    /// Restored text places the cursor at the end
    pub fn new(text: String) -> Self {
        let cursor = text.chars().count();
        Self { text, cursor }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    fn byte_index(&self, char_idx: usize) -> usize {
        self.text
            .char_indices()
            .nth(char_idx)
            .map(|(i, _)| i)
            .unwrap_or(self.text.len())
    }

    fn len_chars(&self) -> usize {
        self.text.chars().count()
    }

    pub fn insert_char(&mut self, c: char) {
        let at = self.byte_index(self.cursor);
        self.text.insert(at, c);
        self.cursor += 1;
    }

    pub fn insert_str(&mut self, s: &str) {
        let at = self.byte_index(self.cursor);
        self.text.insert_str(at, s);
        self.cursor += s.chars().count();
    }

    /// Remove the char before the cursor
    pub fn backspace(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        let at = self.byte_index(self.cursor - 1);
        self.text.remove(at);
        self.cursor -= 1;
        true
    }

    /// Remove the char under the cursor
    pub fn delete(&mut self) -> bool {
        if self.cursor >= self.len_chars() {
            return false;
        }
        let at = self.byte_index(self.cursor);
        self.text.remove(at);
        true
    }

    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.len_chars());
    }

    pub fn move_home(&mut self) {
        let before: Vec<char> = self.text.chars().take(self.cursor).collect();
        let line_start = before
            .iter()
            .rposition(|c| *c == '\n')
            .map(|i| i + 1)
            .unwrap_or(0);
        self.cursor = line_start;
    }

    pub fn move_end(&mut self) {
        let rest = self.text.chars().skip(self.cursor).take_while(|c| *c != '\n');
        self.cursor += rest.count();
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.cursor = 0;
    }

    /// (line, column) of the cursor, column in chars
    pub fn cursor_line_col(&self) -> (usize, usize) {
        let mut line = 0;
        let mut col = 0;
        for c in self.text.chars().take(self.cursor) {
            if c == '\n' {
                line += 1;
                col = 0;
            } else {
                col += 1;
            }
        }
        (line, col)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typing_and_backspace() {
        let mut b = TextBuffer::default();
        for c in "hey".chars() {
            b.insert_char(c);
        }
        assert_eq!(b.as_str(), "hey");
        assert!(b.backspace());
        assert_eq!(b.as_str(), "he");
        assert_eq!(b.cursor(), 2);
    }

    #[test]
    fn edits_in_the_middle_respect_multibyte_chars() {
        let mut b = TextBuffer::new("naïve".into());
        b.move_left();
        b.move_left();
        assert!(b.backspace());
        assert_eq!(b.as_str(), "nave");
        b.insert_char('ï');
        b.insert_str("ï");
        assert_eq!(b.as_str(), "naïïve");
        assert!(b.delete());
        assert_eq!(b.as_str(), "naïïe");
    }

    #[test]
    fn boundaries_are_no_ops() {
        let mut b = TextBuffer::new("ab".into());
        assert!(!b.delete());
        b.move_right();
        assert_eq!(b.cursor(), 2);
        b.move_home();
        assert!(!b.backspace());
        b.move_left();
        assert_eq!(b.cursor(), 0);
    }

    #[test]
    fn home_end_work_per_line() {
        let mut b = TextBuffer::new("first\nsecond".into());
        b.move_home();
        assert_eq!(b.cursor_line_col(), (1, 0));
        b.move_end();
        assert_eq!(b.cursor_line_col(), (1, 6));
        b.move_home();
        b.move_left();
        assert_eq!(b.cursor_line_col(), (0, 5));
        b.move_home();
        assert_eq!(b.cursor(), 0);
    }

    #[test]
    fn clear_resets_cursor() {
        let mut b = TextBuffer::new("something".into());
        b.clear();
        assert!(b.is_empty());
        assert_eq!(b.cursor(), 0);
    }
}
