//! Screen layout: endpoint bar, rendered document, key hints.
//!
//! The document is handed to `tui-markdown` in full on every draw; the
//! renderer copes with arbitrary truncation (an unterminated code block just
//! renders as far as it goes).

use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Paragraph, Wrap};
use ratatui::Frame;
use tui_markdown as md;

use crate::app::ViewerApp;
use crate::connection::ConnectionState;

const PLACEHOLDER: &str = "_not connected_";

pub fn draw(frame: &mut Frame, app: &mut ViewerApp) {
    let [header, body, footer] =
        Layout::vertical([Constraint::Length(1), Constraint::Min(1), Constraint::Length(1)])
            .areas(frame.area());

    draw_header(frame, header, app);
    draw_document(frame, body, app);
    draw_footer(frame, footer, app);
}

fn draw_header(frame: &mut Frame, area: Rect, app: &ViewerApp) {
    let (dot, color) = match app.state {
        ConnectionState::Connected => ("● ", Color::Green),
        ConnectionState::Connecting => ("● ", Color::Yellow),
        ConnectionState::Disconnected => ("○ ", Color::DarkGray),
    };

    let mut spans = vec![Span::styled(dot, Style::default().fg(color))];
    match &app.url_draft {
        Some(draft) => {
            spans.push(Span::styled(
                draft.clone(),
                Style::default().add_modifier(Modifier::BOLD),
            ));
            spans.push(Span::styled("▏", Style::default().fg(Color::Cyan)));
        }
        None => spans.push(Span::raw(app.url.clone())),
    }

    frame.render_widget(Line::from(spans), area);
}

fn draw_document(frame: &mut Frame, area: Rect, app: &mut ViewerApp) {
    if area.width == 0 || area.height == 0 {
        return;
    }

    let document = app.buffer.document();
    let source = if document.is_empty() && app.state != ConnectionState::Connected {
        PLACEHOLDER
    } else {
        document
    };

    let paragraph = Paragraph::new(md::from_str(source)).wrap(Wrap { trim: false });
    let content = paragraph
        .line_count(area.width)
        .min(usize::from(u16::MAX)) as u16;
    app.scroll.sync(area.height, content);

    frame.render_widget(paragraph.scroll((app.scroll.offset(), 0)), area);
}

fn draw_footer(frame: &mut Frame, area: Rect, app: &ViewerApp) {
    let dim = Style::default().fg(Color::DarkGray);
    let hints = if app.url_draft.is_some() {
        "enter confirm · esc cancel"
    } else if app.state == ConnectionState::Disconnected {
        "c connect · e edit url · q quit"
    } else {
        "d disconnect · s screenshot · x clear · q quit"
    };

    let mut spans = vec![Span::styled(hints, dim)];
    if app.scroll.is_following() {
        spans.push(Span::styled(" · following", dim));
    }
    if let Some(status) = &app.status {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(
            status.clone(),
            Style::default().fg(Color::LightRed),
        ));
    }

    frame.render_widget(Line::from(spans), area);
}
