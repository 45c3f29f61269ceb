//! Controls bar: interval field, status line and key hints.

use fleettop::monitor::Monitor;
use fleettop::poller::Status;
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
};

use crate::ui::theme::{DETAIL, WARN};

pub fn draw_controls(
    f: &mut ratatui::Frame<'_>,
    area: Rect,
    interval_input: &str,
    editing: bool,
    monitor: &Monitor,
    status: &Status,
) {
    let field_style = if editing {
        Style::default().fg(Color::Black).bg(Color::White)
    } else {
        Style::default().add_modifier(Modifier::BOLD)
    };
    let cursor = if editing { "▏" } else { "" };

    let refresh_hint = if monitor.allows_manual_refresh() {
        Span::raw("r refresh  ")
    } else {
        // disabled while polling
        Span::styled("r refresh  ", Style::default().fg(DETAIL).add_modifier(Modifier::CROSSED_OUT))
    };
    let monitor_hint = if monitor.is_polling() { "m stop monitoring  " } else { "m start monitoring  " };

    let mut spans = vec![
        Span::raw("Interval: "),
        Span::styled(format!(" {interval_input}{cursor} "), field_style),
        Span::raw("s   "),
        refresh_hint,
        Span::raw(monitor_hint),
        Span::raw("i interval  e/E environment  q quit"),
    ];
    if !status.text.is_empty() {
        let style = if status.is_error {
            Style::default().fg(WARN).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(DETAIL)
        };
        spans.push(Span::raw("   "));
        spans.push(Span::styled(status.text.clone(), style));
    }

    f.render_widget(Paragraph::new(Line::from(spans)), area);
}
