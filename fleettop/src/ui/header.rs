//! Top header: product name, environment badge, monitoring state, last update.

use fleettop::environment::EnvironmentContext;
use fleettop::monitor::Monitor;
use fleettop::poller::Dashboard;
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

use crate::ui::theme::{BADGE, DETAIL, POLLING};

pub fn draw_header(
    f: &mut ratatui::Frame<'_>,
    area: Rect,
    env: &EnvironmentContext,
    monitor: &Monitor,
    d: &Dashboard,
) {
    let mut spans = vec![Span::styled(
        "fleettop",
        Style::default().add_modifier(Modifier::BOLD),
    )];

    spans.push(Span::raw(" — env: "));
    spans.push(Span::styled(
        env.badge().unwrap_or("default").to_string(),
        Style::default().fg(BADGE).add_modifier(Modifier::BOLD),
    ));

    spans.push(Span::raw(" | "));
    match monitor.interval() {
        Some(iv) => spans.push(Span::styled(
            format!("● monitoring every {}s", iv.as_secs()),
            Style::default().fg(POLLING),
        )),
        None => spans.push(Span::styled("manual refresh", Style::default().fg(DETAIL))),
    }

    if let Some(ts) = &d.last_updated {
        spans.push(Span::raw(format!(" | Last updated: {ts}")));
    }

    f.render_widget(
        Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::BOTTOM)),
        area,
    );
}
