//! Viewer state: layout, modes, and the placeholder page text.

// ---------------------------------------------------------------------------
// Layout
// ---------------------------------------------------------------------------

/// Pixels per terminal column when the terminal does not report pixel size.
const CELL_W_ESTIMATE: u32 = 10;

pub(super) struct Layout {
    pub cols: u16,
    pub body_rows: u16,  // rows above the status bar
    pub status_row: u16, // = rows - 1
    pub menu_cols: u16,  // menu panel width
    pub viewport_px: u32,
}

pub(super) fn compute_layout(cols: u16, rows: u16, pixel_w: u16) -> Layout {
    let viewport_px = if pixel_w > 0 {
        pixel_w as u32
    } else {
        cols as u32 * CELL_W_ESTIMATE
    };
    Layout {
        cols,
        body_rows: rows.saturating_sub(1),
        status_row: rows.saturating_sub(1),
        menu_cols: (cols / 2).clamp(20, 40).min(cols),
        viewport_px,
    }
}

// ---------------------------------------------------------------------------
// Modes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum ViewerMode {
    /// No book: path prompt.
    Upload,
    Reading,
    /// The page box has focus.
    PageInput,
}

pub(super) struct ViewerState {
    pub mode: ViewerMode,
    pub upload_input: String,
    /// Highlighted contents entry in the menu.
    pub toc_cursor: usize,
    /// One-shot message for the status bar, cleared on the next key.
    pub flash: Option<String>,
}

impl ViewerState {
    pub(super) fn new() -> Self {
        Self {
            mode: ViewerMode::Upload,
            upload_input: String::new(),
            toc_cursor: 0,
            flash: None,
        }
    }

    pub(super) fn move_cursor(&mut self, up: bool, len: usize) {
        if len == 0 {
            self.toc_cursor = 0;
        } else if up {
            self.toc_cursor = self.toc_cursor.saturating_sub(1);
        } else {
            self.toc_cursor = (self.toc_cursor + 1).min(len - 1);
        }
    }
}

// ---------------------------------------------------------------------------
// Page text
// ---------------------------------------------------------------------------

const FILLER: &str = "Call me Ishmael. Some years ago, never mind how long precisely, having \
    little or no money in my purse, and nothing particular to interest me on shore, I thought \
    I would sail about a little and see the watery part of the world. It is a way I have of \
    driving off the spleen and regulating the circulation. Whenever I find myself growing grim \
    about the mouth, I account it high time to get to sea as soon as I can. ";

/// Placeholder text for a page starting at character `offset`: `lines` rows
/// of at most `width` columns, wrapped at spaces. The scripted engine only
/// knows lengths, so the words are filler that moves with the offset.
pub(super) fn page_lines(offset: u32, width: usize, lines: usize) -> Vec<String> {
    if width == 0 || lines == 0 {
        return Vec::new();
    }
    let start = offset as usize % FILLER.len();
    let mut words = FILLER[start..]
        .split_whitespace()
        .chain(FILLER.split_whitespace().cycle());

    let mut out = Vec::with_capacity(lines);
    let mut line = String::new();
    while out.len() < lines {
        let Some(word) = words.next() else { break };
        let word: String = word.chars().take(width).collect();
        let needed = if line.is_empty() { word.len() } else { line.len() + 1 + word.len() };
        if needed > width && !line.is_empty() {
            out.push(std::mem::take(&mut line));
            if out.len() == lines {
                break;
            }
        }
        if !line.is_empty() {
            line.push(' ');
        }
        line.push_str(&word);
    }
    out
}

/// Text columns for a page at `font_px`: larger type fits fewer characters.
pub(super) fn text_width(cols: u16, font_px: f64) -> usize {
    let px = (font_px.round() as usize).max(1);
    cols as usize * 18 / px
}

/// Text rows for a page at `line_height`: looser lines fit fewer rows.
pub(super) fn text_rows(rows: u16, line_height: f64) -> usize {
    let tenths = ((line_height * 10.0).round() as usize).max(1);
    rows as usize * 16 / tenths
}
