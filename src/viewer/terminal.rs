//! Terminal I/O layer: raw mode, screen regions, status bar.

use crossterm::{
    ExecutableCommand, QueueableCommand, cursor,
    style::{self, Stylize},
    terminal,
};
use std::io::{self, Write, stdout};

use super::state::{Layout, page_lines, text_rows, text_width};
use crate::engine::Spread;
use crate::engine::scripted::ViewSnapshot;

// ---------------------------------------------------------------------------
// RawGuard — restores raw mode / alternate screen / cursor on Drop
// ---------------------------------------------------------------------------

pub(super) struct RawGuard {
    cleaned: bool,
}

impl RawGuard {
    pub(super) fn enter() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        stdout().execute(terminal::EnterAlternateScreen)?;
        stdout().execute(cursor::Hide)?;
        Ok(Self { cleaned: false })
    }

    pub(super) fn cleanup(&mut self) {
        if self.cleaned {
            return;
        }
        self.cleaned = true;
        let mut out = stdout();
        let _ = out.execute(cursor::Show);
        let _ = out.execute(terminal::LeaveAlternateScreen);
        let _ = terminal::disable_raw_mode();
    }
}

impl Drop for RawGuard {
    fn drop(&mut self) {
        self.cleanup();
    }
}

pub(super) fn clear_screen() -> io::Result<()> {
    let mut out = stdout();
    out.queue(terminal::Clear(terminal::ClearType::All))?;
    out.flush()
}

fn fit(text: &str, width: usize) -> String {
    let clipped: String = text.chars().take(width).collect();
    format!("{clipped:<width$}")
}

// ---------------------------------------------------------------------------
// Screens
// ---------------------------------------------------------------------------

/// Upload screen labels, already localized.
pub(super) struct UploadScreen<'a> {
    pub title: &'a str,
    pub tagline: &'a str,
    pub prompt: &'a str,
    pub hint: &'a str,
    /// Which book format the engine actually reads.
    pub note: &'a str,
    pub input: &'a str,
}

pub(super) fn draw_upload(layout: &Layout, screen: &UploadScreen) -> io::Result<()> {
    let mut out = stdout();
    let width = layout.cols as usize;
    let top = layout.body_rows / 3;

    out.queue(cursor::MoveTo(2, top))?;
    write!(out, "{}", screen.title.bold())?;
    out.queue(cursor::MoveTo(2, top + 1))?;
    write!(out, "{}", screen.tagline.dark_grey())?;
    out.queue(cursor::MoveTo(2, top + 3))?;
    write!(out, "{}:", screen.prompt)?;
    out.queue(cursor::MoveTo(2, top + 4))?;
    let field = fit(&format!("> {}_", screen.input), width.saturating_sub(4));
    write!(out, "{}", field.on_dark_grey().white())?;
    out.queue(style::ResetColor)?;
    out.queue(cursor::MoveTo(2, top + 6))?;
    write!(out, "{}", screen.hint.dark_grey())?;
    out.queue(cursor::MoveTo(2, top + 7))?;
    let note = fit(screen.note, width.saturating_sub(4));
    write!(out, "{}", note.dark_grey())?;
    out.flush()
}

/// Draw the rendition: a header with the chapter label, then one column per
/// visible page.
pub(super) fn draw_page(layout: &Layout, title: &str, view: &ViewSnapshot) -> io::Result<()> {
    let mut out = stdout();
    let width = layout.cols as usize;

    out.queue(cursor::MoveTo(0, 0))?;
    let header = format!(" {title} · {}", view.chapter_label);
    write!(out, "{}", fit(&header, width).bold())?;

    let columns: u16 = match view.spread {
        Spread::Auto if layout.cols >= 60 => 2,
        _ => 1,
    };
    let gutter = 4;
    let col_w = (layout.cols.saturating_sub(gutter * (columns + 1))) / columns;
    let body_rows = layout.body_rows.saturating_sub(2);
    let chars = text_width(col_w, view.font_size_px).min(col_w as usize);
    let rows = text_rows(body_rows, view.line_height).min(body_rows as usize);
    let page_len = view.page_len / columns as u32;

    for c in 0..columns {
        let x = gutter + c * (col_w + gutter);
        let offset = view.offset + page_len * c as u32;
        if offset >= view.chapter_length && c > 0 {
            break;
        }
        for (i, line) in page_lines(offset, chars, rows).iter().enumerate() {
            // spread rows apart as line height grows
            let y = 2 + (i * body_rows as usize / rows.max(1)) as u16;
            out.queue(cursor::MoveTo(x, y))?;
            write!(out, "{line}")?;
        }
    }
    out.flush()
}

/// Loading overlay with a progress bar.
pub(super) fn draw_progress(layout: &Layout, label: &str, percent: u8) -> io::Result<()> {
    let mut out = stdout();
    let bar_w = (layout.cols as usize).saturating_sub(8).min(40);
    let filled = bar_w * percent.min(100) as usize / 100;
    let y = layout.body_rows / 2;
    let x = (layout.cols as usize).saturating_sub(bar_w) as u16 / 2;

    out.queue(cursor::MoveTo(x, y.saturating_sub(1)))?;
    write!(out, "{}", label.bold())?;
    out.queue(cursor::MoveTo(x, y))?;
    let bar = format!(
        "{}{} {percent:>3}%",
        "█".repeat(filled),
        "░".repeat(bar_w - filled)
    );
    write!(out, "{bar}")?;
    out.flush()
}

/// Menu panel contents, already localized.
pub(super) struct MenuPanel {
    pub title: String,
    pub tabs: [(String, bool); 2],
    pub lines: Vec<MenuLine>,
    pub footer: &'static str,
}

pub(super) struct MenuLine {
    pub text: String,
    pub selected: bool,
    pub dimmed: bool,
}

pub(super) fn draw_menu(layout: &Layout, panel: &MenuPanel) -> io::Result<()> {
    let mut out = stdout();
    let w = layout.menu_cols as usize;

    for row in 0..layout.body_rows {
        out.queue(cursor::MoveTo(0, row))?;
        write!(out, "{}", " ".repeat(w).on_black())?;
    }
    out.queue(cursor::MoveTo(1, 0))?;
    write!(out, "{}", panel.title.as_str().bold().on_black())?;

    out.queue(cursor::MoveTo(1, 1))?;
    for (label, active) in &panel.tabs {
        let tab = format!(" {label} ");
        if *active {
            write!(out, "{}", tab.black().on_white())?;
        } else {
            write!(out, "{}", tab.grey().on_black())?;
        }
    }

    let list_rows = layout.body_rows.saturating_sub(5) as usize;
    let cursor_at = panel.lines.iter().position(|l| l.selected).unwrap_or(0);
    let skip = cursor_at.saturating_sub(list_rows.saturating_sub(1));
    for (i, line) in panel.lines.iter().skip(skip).take(list_rows).enumerate() {
        out.queue(cursor::MoveTo(1, 3 + i as u16))?;
        let text = fit(&line.text, w.saturating_sub(2));
        if line.selected {
            write!(out, "{}", text.black().on_white())?;
        } else if line.dimmed {
            write!(out, "{}", text.dark_grey().on_black())?;
        } else {
            write!(out, "{}", text.white().on_black())?;
        }
    }

    out.queue(cursor::MoveTo(1, layout.body_rows.saturating_sub(1)))?;
    write!(out, "{}", fit(panel.footer, w.saturating_sub(2)).dark_grey().on_black())?;
    out.queue(style::ResetColor)?;
    out.flush()
}

/// Draw the status bar on the last terminal row.
pub(super) fn draw_status_bar(layout: &Layout, text: &str) -> io::Result<()> {
    let mut out = stdout();
    out.queue(cursor::MoveTo(0, layout.status_row))?;
    let padded = fit(text, layout.cols as usize);
    write!(out, "{}", padded.on_dark_grey().white())?;
    out.queue(style::ResetColor)?;
    out.flush()
}

pub(super) fn check_tty() -> anyhow::Result<()> {
    use std::io::IsTerminal;
    // Only stdout matters. crossterm's `use-dev-tty` reads keyboard from /dev/tty
    // (Unix) or Console API (Windows), so stdin being a pipe is always fine.
    if !io::stdout().is_terminal() {
        anyhow::bail!(
            "folio viewer requires an interactive terminal.\n\
             \n\
             To print a book's contents and page count, use: folio inspect <book>"
        );
    }
    Ok(())
}
