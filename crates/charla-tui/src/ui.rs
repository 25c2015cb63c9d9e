use std::time::Instant;

use charla_core::NAV_ITEMS;
use ratatui::{
    layout::{Alignment, Constraint, Layout, Margin, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{
        Block, BorderType, Borders, Clear, Padding, Paragraph, Scrollbar,
        ScrollbarOrientation, ScrollbarState,
    },
    Frame,
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::app::{App, InputMode};

type Rgb = (u8, u8, u8);

const BACKGROUND: Rgb = (0x12, 0x12, 0x12);
const HEADER_BG: Rgb = (0x1E, 0x1E, 0x1E);
const BORDER: Rgb = (0x33, 0x33, 0x33);
const NAV_BG: Rgb = (0x18, 0x18, 0x18);
const NAV_TEXT: Rgb = (0xBD, 0xBD, 0xBD);
const TOOLTIP_BG: Rgb = (0x33, 0x33, 0x33);
const TOOLTIP_TEXT: Rgb = (0xFF, 0xFF, 0xFF);
const USER_BUBBLE: Rgb = (0x2A, 0x2A, 0x2A);
const BOT_BUBBLE: Rgb = (0x1E, 0x3A, 0x5F);
const MESSAGE_TEXT: Rgb = (0xE0, 0xE0, 0xE0);
const INPUT_BG: Rgb = (0x33, 0x33, 0x33);
const PLACEHOLDER: Rgb = (0xAA, 0xAA, 0xAA);
const SEND_BG: Rgb = (0x2A, 0x2A, 0x2A);
const FOOTER_TEXT: Rgb = (0x88, 0x88, 0x88);

const TITLE: &str = "Chat con Chat Bot";
const PLACEHOLDER_TEXT: &str = "Escribe un mensaje...";
const FOOTER: &str = "ChatBot Capital One © 2025";

/// Rows a new bubble starts below its resting place
const SLIDE_ROWS: u16 = 1;
const TOOLTIP_MIN_WIDTH: u16 = 16;
const TOOLTIP_MAX_WIDTH: u16 = 34;

fn rgb(c: Rgb) -> Color {
    Color::Rgb(c.0, c.1, c.2)
}

/// Terminals have no alpha, so opacity is faked by mixing towards the backdrop
fn blend(from: Rgb, to: Rgb, t: f32) -> Color {
    let t = t.clamp(0.0, 1.0);
    let mix = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round() as u8;
    Color::Rgb(mix(from.0, to.0), mix(from.1, to.1), mix(from.2, to.2))
}

/// Break a single word into pieces no wider than `width`
fn split_word(word: &str, width: usize) -> Vec<String> {
    let mut parts = Vec::new();
    let mut cur = String::new();
    for c in word.chars() {
        let w = c.width().unwrap_or(0);
        if !cur.is_empty() && cur.width() + w > width {
            parts.push(std::mem::take(&mut cur));
        }
        cur.push(c);
    }
    if !cur.is_empty() {
        parts.push(cur);
    }
    parts
}

/// Word-wrap to a display width, splitting words that do not fit on a line
fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut out = Vec::new();

    for paragraph in text.lines() {
        let mut cur = String::new();

        for word in paragraph.split_whitespace() {
            if word.width() > width {
                if !cur.is_empty() {
                    out.push(std::mem::take(&mut cur));
                }
                let mut parts = split_word(word, width);
                cur = parts.pop().unwrap_or_default();
                out.extend(parts);
            } else if cur.is_empty() {
                cur.push_str(word);
            } else if cur.width() + 1 + word.width() <= width {
                cur.push(' ');
                cur.push_str(word);
            } else {
                out.push(std::mem::replace(&mut cur, word.to_string()));
            }
        }

        if !cur.is_empty() || paragraph.trim().is_empty() {
            out.push(cur);
        }
    }

    if out.is_empty() {
        out.push(String::new());
    }

    out
}

pub fn render(app: &mut App, frame: &mut Frame) {
    render_at(app, frame, Instant::now());
}

/// Render the whole screen as it looks at `now`
pub fn render_at(app: &mut App, frame: &mut Frame, now: Instant) {
    let area = frame.area();
    frame.render_widget(Block::default().style(Style::default().bg(rgb(BACKGROUND))), area);

    let [header_area, nav_area, chat_area, input_area, footer_area] = Layout::vertical([
        Constraint::Length(2),
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(3),
        Constraint::Length(2),
    ])
    .areas(area);

    render_header(frame, header_area);
    render_nav(app, frame, nav_area);
    render_messages(app, frame, chat_area, now);
    render_input(app, frame, input_area);
    render_footer(app, frame, footer_area);

    // Overlay, drawn last so it sits above the message list
    render_tooltip(app, frame, now);
}

fn render_header(frame: &mut Frame, area: Rect) {
    let title = Paragraph::new(Line::from(Span::styled(
        TITLE,
        Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
    )))
    .alignment(Alignment::Center)
    .block(
        Block::default()
            .borders(Borders::BOTTOM)
            .border_style(Style::default().fg(rgb(BORDER)))
            .style(Style::default().bg(rgb(HEADER_BG))),
    );
    frame.render_widget(title, area);
}

fn render_nav(app: &mut App, frame: &mut Frame, area: Rect) {
    let items: [Rect; 3] = Layout::horizontal([Constraint::Ratio(1, 3); 3]).areas(area);
    app.nav_areas = items.to_vec();

    let active = app.tooltip.shown_index();
    for (i, (item, item_area)) in NAV_ITEMS.iter().zip(items).enumerate() {
        let mut style = Style::default().fg(rgb(NAV_TEXT)).bg(rgb(NAV_BG));
        if active == Some(i) {
            style = style.fg(Color::White).add_modifier(Modifier::BOLD);
        }
        let label = Paragraph::new(item.label)
            .alignment(Alignment::Center)
            .style(style);
        frame.render_widget(label, item_area);
    }
}

fn render_tooltip(app: &App, frame: &mut Frame, now: Instant) {
    let (Some(index), Some(item)) = (app.tooltip.shown_index(), app.tooltip.shown_for()) else {
        return;
    };
    let Some(anchor) = app.nav_areas.get(index).copied() else {
        return;
    };
    let opacity = app.tooltip.opacity(now);
    if opacity <= 0.0 {
        return;
    }

    let screen = frame.area();
    let max_width = TOOLTIP_MAX_WIDTH.min(screen.width);
    let lines = wrap_text(item.tooltip.trim_end(), max_width.saturating_sub(2) as usize);
    let text_width = lines.iter().map(|l| l.width()).max().unwrap_or(0) as u16;
    let width = (text_width + 2).max(TOOLTIP_MIN_WIDTH).min(max_width);
    let height = (lines.len() as u16 + 2).min(screen.height.saturating_sub(anchor.y + 1));

    // Centered under the nav item, kept on screen
    let center = anchor.x + anchor.width / 2;
    let x = center
        .saturating_sub(width / 2)
        .min(screen.x + screen.width.saturating_sub(width));
    let popup = Rect::new(x, anchor.y + 1, width, height);

    let text: Vec<Line> = lines.into_iter().map(Line::from).collect();
    let tooltip = Paragraph::new(text)
        .alignment(Alignment::Center)
        .style(
            Style::default()
                .bg(blend(BACKGROUND, TOOLTIP_BG, opacity))
                .fg(blend(TOOLTIP_BG, TOOLTIP_TEXT, opacity)),
        )
        .block(Block::default().borders(Borders::NONE).padding(Padding::vertical(1)));

    frame.render_widget(Clear, popup);
    frame.render_widget(tooltip, popup);
}

fn message_lines(app: &mut App, width: u16, now: Instant) -> Vec<Line<'static>> {
    let max_bubble = (width as usize * 4 / 5).max(4);
    let text_width = max_bubble - 2;
    let mut lines = Vec::new();

    for msg in app.store.records() {
        let entrance = app.entrances.observe(msg.id(), now);
        let opacity = entrance.opacity(now);
        let slide = entrance.slide_rows(now, SLIDE_ROWS);

        let (bubble, alignment) = if msg.is_user() {
            (USER_BUBBLE, Alignment::Right)
        } else {
            (BOT_BUBBLE, Alignment::Left)
        };
        let style = Style::default()
            .bg(blend(BACKGROUND, bubble, opacity))
            .fg(blend(BACKGROUND, MESSAGE_TEXT, opacity));

        let wrapped = wrap_text(msg.text(), text_width);
        let bubble_width = wrapped.iter().map(|l| l.width()).max().unwrap_or(0);

        // The slide moves the bubble inside a fixed slot so the list height stays put
        for _ in 0..slide {
            lines.push(Line::default());
        }
        for text in wrapped {
            let pad = " ".repeat(bubble_width - text.width());
            lines.push(
                Line::from(Span::styled(format!(" {}{} ", text, pad), style)).alignment(alignment),
            );
        }
        for _ in slide..SLIDE_ROWS {
            lines.push(Line::default());
        }
    }

    lines
}

fn render_messages(app: &mut App, frame: &mut Frame, area: Rect, now: Instant) {
    let inner = area.inner(Margin {
        horizontal: 1,
        vertical: 0,
    });

    app.chat_area = Some(area);
    app.chat_height = inner.height;

    let lines = message_lines(app, inner.width, now);
    app.chat_total_lines = u16::try_from(lines.len()).unwrap_or(u16::MAX);

    if app.follow_bottom {
        app.chat_scroll = app.max_scroll();
    } else {
        app.chat_scroll = app.chat_scroll.min(app.max_scroll());
    }

    let list = Paragraph::new(lines).scroll((app.chat_scroll, 0));
    frame.render_widget(list, inner);

    if app.chat_total_lines > app.chat_height {
        let scrollbar = Scrollbar::default()
            .orientation(ScrollbarOrientation::VerticalRight)
            .begin_symbol(None)
            .end_symbol(None)
            .style(Style::default().fg(rgb(BORDER)));
        let mut state =
            ScrollbarState::new(app.max_scroll() as usize).position(app.chat_scroll as usize);
        frame.render_stateful_widget(scrollbar, area, &mut state);
    }
}

fn render_input(app: &mut App, frame: &mut Frame, area: Rect) {
    let area = area.inner(Margin {
        horizontal: 1,
        vertical: 0,
    });
    let [field_area, _, button_area] = Layout::horizontal([
        Constraint::Min(0),
        Constraint::Length(1),
        Constraint::Length(7),
    ])
    .areas(area);

    let editing = app.input_mode == InputMode::Editing;
    let border_color = if editing { Color::Gray } else { rgb(BORDER) };
    let field_block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(border_color))
        .style(Style::default().bg(rgb(INPUT_BG)));

    // Calculate visible portion of input with horizontal scrolling
    let inner_width = field_area.width.saturating_sub(2) as usize;
    let draft = app.store.current_text();
    let cursor_pos = app.input_cursor;
    let scroll_offset = if inner_width == 0 {
        0
    } else if cursor_pos >= inner_width {
        cursor_pos - inner_width + 1
    } else {
        0
    };

    let field = if draft.is_empty() {
        Paragraph::new(Span::styled(PLACEHOLDER_TEXT, Style::default().fg(rgb(PLACEHOLDER))))
    } else {
        let visible_text: String = draft.chars().skip(scroll_offset).take(inner_width).collect();
        Paragraph::new(visible_text).style(Style::default().fg(rgb(MESSAGE_TEXT)))
    };
    frame.render_widget(field.block(field_block), field_area);

    if editing {
        let cursor_x = (cursor_pos - scroll_offset) as u16;
        frame.set_cursor_position((field_area.x + cursor_x + 1, field_area.y + 1));
    }

    let button = Paragraph::new("➤")
        .alignment(Alignment::Center)
        .style(Style::default().fg(rgb(MESSAGE_TEXT)))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(Style::default().fg(rgb(BORDER)))
                .style(Style::default().bg(rgb(SEND_BG))),
        );
    frame.render_widget(button, button_area);
    app.send_area = Some(button_area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let [hints_area, copyright_area] =
        Layout::vertical([Constraint::Length(1), Constraint::Length(1)]).areas(area);

    let (mode_text, mode_style) = match app.input_mode {
        InputMode::Normal => (" NORMAL ", Style::default().bg(Color::Blue).fg(Color::White)),
        InputMode::Editing => (" EDIT ", Style::default().bg(Color::Yellow).fg(Color::Black)),
    };

    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let mut hints = vec![Span::styled(mode_text, mode_style), Span::raw(" ")];
    let pairs: &[(&str, &str)] = match app.input_mode {
        InputMode::Editing => &[
            (" Enter ", " send "),
            (" Esc ", " normal "),
            (" F1-F3 ", " tips "),
            (" PgUp/PgDn ", " scroll "),
        ],
        InputMode::Normal => &[
            (" j/k ", " scroll "),
            (" i ", " type "),
            (" 1-3 ", " tips "),
            (" q ", " quit "),
        ],
    };
    for (key, label) in pairs {
        hints.push(Span::styled(*key, key_style));
        hints.push(Span::styled(*label, label_style));
    }

    let pending = app.scheduler.pending_replies();
    if pending > 0 {
        hints.push(Span::styled(
            format!("  🤖 escribiendo ({})", pending),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        ));
    }

    frame.render_widget(Paragraph::new(Line::from(hints)), hints_area);

    let copyright = Paragraph::new(FOOTER)
        .alignment(Alignment::Center)
        .style(Style::default().fg(rgb(FOOTER_TEXT)));
    frame.render_widget(copyright, copyright_area);
}
