//! Server and DB node cards in a responsive grid, with row scrolling and a scrollbar.

use crossterm::event::{KeyCode, KeyEvent};
use fleettop::card::Card;
use fleettop::poller::{Dashboard, DbArea};
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

use crate::ui::theme::{DETAIL, HEADING, LABEL, SB_ARROW, SB_THUMB, SB_TRACK, WARN};
use crate::ui::util::{truncate_middle, wrap_chars};

/// Minimum width of one card, borders included.
pub const CARD_WIDTH: u16 = 50;
const LABEL_WIDTH: usize = 20;

enum Row<'a> {
    Heading(&'static str),
    Note(&'a str),
    Cards(&'a [Card]),
}

fn columns(width: u16) -> usize {
    (width / CARD_WIDTH).max(1) as usize
}

fn layout_rows(d: &Dashboard, cols: usize) -> Vec<Row<'_>> {
    let mut rows = vec![Row::Heading("App servers")];
    if d.loading {
        rows.push(Row::Note("Loading…"));
    }
    rows.extend(d.servers.chunks(cols).map(Row::Cards));

    rows.push(Row::Heading("Database nodes"));
    match &d.db_area {
        DbArea::Cards(cards) => rows.extend(cards.chunks(cols).map(Row::Cards)),
        DbArea::Placeholder(text) => rows.push(Row::Note(text)),
        DbArea::Cleared => {}
    }
    rows
}

/// Number of scrollable rows for the given content width.
pub fn total_rows(d: &Dashboard, width: u16) -> usize {
    layout_rows(d, columns(width.saturating_sub(1))).len()
}

fn card_body(card: &Card, inner_width: usize) -> Vec<Line<'static>> {
    if let Some(err) = &card.error {
        let style = Style::default().fg(WARN).add_modifier(Modifier::BOLD);
        return wrap_chars(err, inner_width)
            .into_iter()
            .map(|l| Line::from(Span::styled(l, style)))
            .collect();
    }

    let mut lines = Vec::with_capacity(card.metrics.len() * 2 + 1);
    for m in &card.metrics {
        let value_style = if m.warn {
            Style::default().fg(WARN).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        lines.push(Line::from(vec![
            Span::styled(format!("{:<LABEL_WIDTH$}", m.label), Style::default().fg(LABEL)),
            Span::styled(m.value.clone(), value_style),
        ]));
        if let Some(detail) = &m.detail {
            lines.push(Line::from(Span::styled(
                format!("  {detail}"),
                Style::default().fg(DETAIL),
            )));
        }
    }
    if let Some(db) = &card.db_line {
        lines.push(Line::from(Span::styled(
            db.clone(),
            Style::default().fg(DETAIL).add_modifier(Modifier::ITALIC),
        )));
    }
    lines
}

fn row_height(row: &Row<'_>, card_width: u16) -> u16 {
    match row {
        Row::Heading(_) | Row::Note(_) => 1,
        Row::Cards(cards) => {
            let inner = card_width.saturating_sub(2) as usize;
            let body = cards
                .iter()
                .map(|c| card_body(c, inner).len())
                .max()
                .unwrap_or(0);
            body as u16 + 2
        }
    }
}

pub fn draw_cards(f: &mut ratatui::Frame<'_>, area: Rect, d: &Dashboard, scroll_offset: usize) {
    if area.height == 0 || area.width < 4 {
        return;
    }
    // Reserve the last column for the scrollbar
    let content = Rect {
        width: area.width.saturating_sub(1),
        ..area
    };
    let cols = columns(content.width);
    let card_width = content.width / cols as u16;
    let rows = layout_rows(d, cols);
    let offset = scroll_offset.min(rows.len().saturating_sub(1));

    let mut y = content.y;
    for row in rows.iter().skip(offset) {
        let remaining = content.bottom().saturating_sub(y);
        if remaining == 0 {
            break;
        }
        let h = row_height(row, card_width).min(remaining);
        let rect = Rect {
            x: content.x,
            y,
            width: content.width,
            height: h,
        };
        match row {
            Row::Heading(title) => {
                let line = Line::from(Span::styled(
                    format!("▌{title}"),
                    Style::default().fg(HEADING).add_modifier(Modifier::BOLD),
                ));
                f.render_widget(Paragraph::new(line), rect);
            }
            Row::Note(text) => {
                let line = Line::from(Span::styled(
                    format!("  {text}"),
                    Style::default().fg(DETAIL).add_modifier(Modifier::ITALIC),
                ));
                f.render_widget(Paragraph::new(line), rect);
            }
            Row::Cards(cards) => {
                for (i, card) in cards.iter().enumerate() {
                    let cell = Rect {
                        x: rect.x + card_width * i as u16,
                        y: rect.y,
                        width: card_width,
                        height: rect.height,
                    };
                    draw_card(f, cell, card);
                }
            }
        }
        y += h;
    }

    draw_scrollbar(
        f,
        Rect {
            x: area.x + area.width.saturating_sub(1),
            y: area.y,
            width: 1,
            height: area.height,
        },
        rows.len(),
        offset,
    );
}

fn draw_card(f: &mut ratatui::Frame<'_>, area: Rect, card: &Card) {
    let inner_width = area.width.saturating_sub(2) as usize;
    let title = truncate_middle(&card.title, inner_width.saturating_sub(2));
    let border = if card.error.is_some() {
        Style::default().fg(WARN)
    } else {
        Style::default()
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border)
        .title(Span::styled(
            format!(" {title} "),
            Style::default().add_modifier(Modifier::BOLD),
        ));
    f.render_widget(Paragraph::new(card_body(card, inner_width)).block(block), area);
}

fn draw_scrollbar(f: &mut ratatui::Frame<'_>, area: Rect, total_rows: usize, offset: usize) {
    if area.height < 3 || total_rows <= 1 {
        return;
    }
    let track = (area.height - 2) as usize;
    let total = total_rows.max(1);
    let max_off = total.saturating_sub(1);
    let thumb_len = (track / total).max(1).min(track);
    let thumb_top = if max_off == 0 {
        0
    } else {
        ((track - thumb_len) * offset + max_off / 2) / max_off
    };

    let mut lines: Vec<Line> = Vec::with_capacity(area.height as usize);
    lines.push(Line::from(Span::styled("▲", Style::default().fg(SB_ARROW))));
    for i in 0..track {
        if i >= thumb_top && i < thumb_top + thumb_len {
            lines.push(Line::from(Span::styled("█", Style::default().fg(SB_THUMB))));
        } else {
            lines.push(Line::from(Span::styled("│", Style::default().fg(SB_TRACK))));
        }
    }
    lines.push(Line::from(Span::styled("▼", Style::default().fg(SB_ARROW))));
    f.render_widget(Paragraph::new(lines), area);
}

/// Handle keyboard scrolling (Up/Down/PageUp/PageDown/Home/End)
pub fn cards_handle_key(scroll_offset: &mut usize, key: KeyEvent, page_size: usize) {
    match key.code {
        KeyCode::Up => *scroll_offset = scroll_offset.saturating_sub(1),
        KeyCode::Down => *scroll_offset = scroll_offset.saturating_add(1),
        KeyCode::PageUp => *scroll_offset = scroll_offset.saturating_sub(page_size.max(1)),
        KeyCode::PageDown => *scroll_offset = scroll_offset.saturating_add(page_size.max(1)),
        KeyCode::Home => *scroll_offset = 0,
        KeyCode::End => *scroll_offset = usize::MAX,
        _ => {}
    }
}

/// Clamp to the last row so End and over-scrolling stay in range.
pub fn cards_clamp(scroll_offset: &mut usize, total_rows: usize) {
    *scroll_offset = (*scroll_offset).min(total_rows.saturating_sub(1));
}
