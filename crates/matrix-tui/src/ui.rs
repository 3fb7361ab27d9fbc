use std::time::Instant;

use matrix_core::{Author, DisplayEntry, RainCanvas, RainSurface};
use ratatui::{
    Frame,
    buffer::Buffer,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph, Widget, Wrap},
};
use crate::app::App;

/// #00FF41
const MATRIX_GREEN: Color = Color::Rgb(0, 255, 65);
const DIM_GREEN: Color = Color::Rgb(0, 140, 36);

const AVATAR_IDLE: [&str; 3] = [" ┌───┐ ", " │o o│ ", " └─-─┘ "];
const AVATAR_SPEAKING: [&str; 3] = [" ┌───┐ ", " │o o│ ", " └─O─┘ "];
const AVATAR_LISTENING: [&str; 3] = [" ┌───┐ ", " │O O│ ", " └─-─┘ "];

/// Draws the rain canvas, one cell per terminal cell.
struct RainBackground<'a> {
    canvas: &'a RainCanvas,
}

impl Widget for RainBackground<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let size = self.canvas.size();
        for row in 0..area.height.min(size.height as u16) {
            for col in 0..area.width.min(size.width as u16) {
                let Some(cell) = self.canvas.cell(col as u32, row as u32) else {
                    continue;
                };
                let level = cell.intensity.clamp(0.0, 1.0);
                let color = Color::Rgb(0, (255.0 * level) as u8, (65.0 * level) as u8);
                buf[(area.x + col, area.y + row)]
                    .set_char(cell.glyph)
                    .set_fg(color)
                    .set_bg(Color::Black);
            }
        }
    }
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();
    let now = Instant::now();

    frame.render_widget(Block::default().style(Style::default().bg(Color::Black)), area);
    frame.render_widget(RainBackground { canvas: &app.canvas }, area);

    // Chat console floats over the rain
    let panel_width = (area.width * 4 / 5).max(40).min(area.width);
    let panel_height = area.height.saturating_sub(2);
    let panel = Rect::new(
        area.x + (area.width.saturating_sub(panel_width)) / 2,
        area.y + 1,
        panel_width,
        panel_height,
    );
    frame.render_widget(Clear, panel);

    let [header_area, chat_area, input_row, footer_area] = Layout::vertical([
        Constraint::Length(5),
        Constraint::Min(3),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(panel);

    render_header(app, frame, header_area, now);
    render_chat(app, frame, chat_area, now);
    render_input(app, frame, input_row);
    render_footer(app, frame, footer_area);
}

fn render_header(app: &mut App, frame: &mut Frame, area: Rect, now: Instant) {
    let state = app.widget.state();
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(DIM_GREEN))
        .title(Span::styled(" MATRIX-AI ", Style::default().fg(MATRIX_GREEN).bold()))
        .title_bottom(Line::from(format!(" {} ", app.server_url)).left_aligned())
        .title_bottom(Line::from(format!(" v{} ", env!("CARGO_PKG_VERSION"))).right_aligned())
        .style(Style::default().bg(Color::Black));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let [avatar_area, welcome_area] = Layout::horizontal([
        Constraint::Length(8),
        Constraint::Min(0),
    ])
    .areas(inner);
    app.avatar_area = Some(avatar_area);

    let (face, face_style) = if state.listening {
        (AVATAR_LISTENING, Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
    } else if state.speaking {
        (AVATAR_SPEAKING, Style::default().fg(MATRIX_GREEN).add_modifier(Modifier::BOLD))
    } else {
        (AVATAR_IDLE, Style::default().fg(DIM_GREEN))
    };
    let avatar: Vec<Line> = face.iter().map(|l| Line::styled(*l, face_style)).collect();
    frame.render_widget(Paragraph::new(avatar), avatar_area);

    let welcome = app.widget.welcome();
    let mut spans = vec![Span::styled(
        welcome.visible(now).to_string(),
        Style::default().fg(MATRIX_GREEN),
    )];
    if !welcome.is_complete(now) {
        spans.push(Span::styled("▌", Style::default().fg(MATRIX_GREEN)));
    }
    frame.render_widget(
        Paragraph::new(Line::from(spans)).wrap(Wrap { trim: true }),
        welcome_area,
    );
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect, now: Instant) {
    // Store chat area dimensions for scroll calculations (inner size minus borders)
    app.chat_area = Some(area);
    app.chat_height = area.height.saturating_sub(2);
    app.chat_width = area.width.saturating_sub(2);
    if app.follow_tail {
        app.scroll_to_bottom();
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(DIM_GREEN))
        .title(" Transmission Log ")
        .style(Style::default().bg(Color::Black));

    let chat_text = if app.widget.is_empty() {
        Text::from(Span::styled(
            "Type a message and press Enter, or Ctrl+Space to speak...",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        let mut lines: Vec<Line> = Vec::new();

        for shown in app.widget.display_entries() {
            lines.extend(entry_lines(shown, now));
        }

        Text::from(lines)
    };

    let chat = Paragraph::new(chat_text)
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((app.chat_scroll, 0));

    frame.render_widget(chat, area);
}

/// Label, revealed text shown verbatim, reveal cursor, then a spacer.
fn entry_lines(shown: &DisplayEntry, now: Instant) -> Vec<Line<'static>> {
    let (label_style, text_style) = match shown.entry.author {
        Author::User => (
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            Style::default().fg(Color::White),
        ),
        Author::Assistant => (
            Style::default().fg(MATRIX_GREEN).add_modifier(Modifier::BOLD),
            Style::default().fg(MATRIX_GREEN),
        ),
    };

    let mut lines = vec![Line::from(Span::styled(App::author_label(shown.entry.author), label_style))];
    for line in shown.reveal.visible(now).lines() {
        lines.push(Line::styled(line.to_string(), text_style));
    }
    if !shown.reveal.is_complete(now) {
        lines.push(Line::from(Span::styled("▌", text_style)));
    }
    lines.push(Line::default());
    lines
}

fn render_input(app: &mut App, frame: &mut Frame, area: Rect) {
    let state = app.widget.state();
    let [input_area, send_area, voice_area] = Layout::horizontal([
        Constraint::Min(10),
        Constraint::Length(8),
        Constraint::Length(13),
    ])
    .areas(area);
    app.send_area = Some(send_area);
    app.voice_area = Some(voice_area);

    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(MATRIX_GREEN))
        .title(" Enter your message ")
        .style(Style::default().bg(Color::Black));

    // Keep the cursor in view on long input
    let inner_width = input_area.width.saturating_sub(2) as usize;
    let skip = app.cursor.saturating_sub(inner_width.saturating_sub(1));
    let shown: String = app.input.chars().skip(skip).take(inner_width).collect();
    frame.render_widget(
        Paragraph::new(shown).style(Style::default().fg(Color::White)).block(input_block),
        input_area,
    );
    frame.set_cursor_position((
        input_area.x + 1 + (app.cursor - skip) as u16,
        input_area.y + 1,
    ));

    let send = Paragraph::new(Line::from(" SEND ").centered())
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(DIM_GREEN)))
        .style(Style::default().fg(MATRIX_GREEN).bg(Color::Black));
    frame.render_widget(send, send_area);

    let (voice_style, voice_border) = if state.listening {
        (Style::default().fg(Color::Black).bg(MATRIX_GREEN).add_modifier(Modifier::BOLD), MATRIX_GREEN)
    } else {
        (Style::default().fg(MATRIX_GREEN).bg(Color::Black), DIM_GREEN)
    };
    let voice = Paragraph::new(Line::from(state.voice_label()).centered())
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(voice_border)))
        .style(voice_style);
    frame.render_widget(voice, voice_area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let state = app.widget.state();
    let (indicator, indicator_color) = if state.speaking {
        ("●", MATRIX_GREEN)
    } else if state.listening {
        ("●", Color::Cyan)
    } else {
        ("○", DIM_GREEN)
    };

    let link = if app.push_connected {
        Span::styled(" LINKED ", Style::default().fg(Color::Black).bg(MATRIX_GREEN))
    } else {
        Span::styled(" OFFLINE ", Style::default().fg(Color::White).bg(Color::Red))
    };

    let footer = Line::from(vec![
        link,
        Span::raw(" "),
        Span::styled(indicator, Style::default().fg(indicator_color)),
        Span::styled(
            format!(" Agent: {} ", app.widget.agent_status()),
            Style::default().fg(MATRIX_GREEN),
        ),
        Span::styled(
            " Enter send | ^Space voice | F2 avatar | F3 rain | F5 status | Esc quit",
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    frame.render_widget(Paragraph::new(footer).style(Style::default().bg(Color::Black)), area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use matrix_core::{ConversationEntry, Reveal};

    fn texts(lines: &[Line]) -> Vec<String> {
        lines.iter().map(|l| l.to_string()).collect()
    }

    #[test]
    fn entry_text_is_shown_verbatim() {
        let text = "there is **no** spoon\n`follow` _the_ rabbit";
        let shown = DisplayEntry {
            entry: ConversationEntry::assistant(text),
            reveal: Reveal::instant(text),
        };
        let lines = entry_lines(&shown, Instant::now());
        assert_eq!(
            texts(&lines),
            vec!["MATRIX-AI:", "there is **no** spoon", "`follow` _the_ rabbit", ""]
        );
        assert!(!lines[1].spans.iter().any(|s| s.style.add_modifier.contains(Modifier::BOLD)));
    }

    #[test]
    fn partial_reveal_ends_with_cursor() {
        let start = Instant::now();
        let text = "wake **up";
        let shown = DisplayEntry {
            entry: ConversationEntry::user(text),
            reveal: Reveal::starting_at(text, Duration::from_millis(10), start),
        };
        let lines = entry_lines(&shown, start + Duration::from_millis(70));
        assert_eq!(texts(&lines), vec!["You:", "wake **", "▌", ""]);
    }
}
