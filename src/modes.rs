use crate::settings::Settings;

/// An edit the user attempted on the writing surface
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditAction {
    Insert(char),
    Newline,
    Paste(String),
    Backspace,
    Delete,
    Copy,
    Cut,
    SelectAll,
    CursorLeft,
    CursorRight,
    CursorHome,
    CursorEnd,
}

impl EditAction {
    pub fn is_deletion(&self) -> bool {
        matches!(self, EditAction::Backspace | EditAction::Delete)
    }

    pub fn is_clipboard(&self) -> bool {
        matches!(
            self,
            EditAction::Paste(_) | EditAction::Copy | EditAction::Cut | EditAction::SelectAll
        )
    }
}

/// Why an edit was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum Blocked {
    #[strum(serialize = "no-delete mode is on")]
    NoDelete,
    #[strum(serialize = "no-copy-paste mode is on")]
    NoCopyPaste,
}

/// The editing restrictions currently in force
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FocusModes {
    pub no_delete: bool,
    pub no_copy_paste: bool,
    pub redact: bool,
}

impl From<&Settings> for FocusModes {
    fn from(s: &Settings) -> Self {
        Self {
            no_delete: s.no_delete_mode,
            no_copy_paste: s.no_copy_paste_mode,
            redact: s.redact_mode,
        }
    }
}

impl FocusModes {
    pub fn check(&self, action: &EditAction) -> Result<(), Blocked> {
        if self.no_delete && action.is_deletion() {
            return Err(Blocked::NoDelete);
        }
        if self.no_copy_paste && action.is_clipboard() {
            return Err(Blocked::NoCopyPaste);
        }
        Ok(())
    }
}

pub const REDACT_CHAR: char = '•';

/// Mask everything except whitespace and the word under construction at the
/// cursor, so the writer keeps their place without rereading.
pub fn redact(text: &str, cursor: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    let cursor = cursor.min(chars.len());
    let word_start = chars[..cursor]
        .iter()
        .rposition(|c| c.is_whitespace())
        .map(|i| i + 1)
        .unwrap_or(0);

    chars
        .iter()
        .enumerate()
        .map(|(i, c)| {
            if c.is_whitespace() || (word_start..cursor).contains(&i) {
                *c
            } else {
                REDACT_CHAR
            }
        })
        .collect()
}
