use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget},
};

use pacekeep::util::format_clock;
use pacekeep::SessionPhase;

use crate::WatchView;

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 2;

impl Widget for &WatchView {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let bold_style = Style::default().add_modifier(Modifier::BOLD);
        let dim_style = Style::default().add_modifier(Modifier::DIM);
        let italic_style = Style::default().add_modifier(Modifier::ITALIC);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .horizontal_margin(HORIZONTAL_MARGIN)
            .vertical_margin(VERTICAL_MARGIN)
            .constraints([
                Constraint::Length(3), // header
                Constraint::Min(3),    // clock
                Constraint::Length(1), // notice
                Constraint::Length(1), // keys
            ])
            .split(area);

        let snapshot = &self.snapshot;
        let (phase_text, phase_color) = match snapshot.phase() {
            SessionPhase::NoSession => ("NO SESSION", Color::DarkGray),
            SessionPhase::Running => ("RUNNING", Color::Green),
            SessionPhase::Paused => ("PAUSED", Color::Yellow),
        };

        let mut header = vec![Span::styled(
            phase_text,
            bold_style.patch(Style::default().fg(phase_color)),
        )];
        if let (Some(id), Some(kind)) = (&self.session_id, snapshot.active_workout_kind) {
            header.push(Span::raw("  "));
            header.push(Span::styled(format!("{kind} · {id}"), italic_style));
        }
        if let Some(cursor) = self.cursor {
            header.push(Span::styled(format!("  #{}", cursor + 1), dim_style));
        }
        Paragraph::new(Line::from(header))
            .block(Block::default().borders(Borders::ALL).title("pacekeep"))
            .alignment(Alignment::Center)
            .render(chunks[0], buf);

        let clock = if snapshot.has_active_session {
            format_clock(snapshot.elapsed_seconds)
        } else {
            "--:--".to_string()
        };
        let clock_style = if snapshot.is_paused {
            bold_style.patch(dim_style)
        } else {
            bold_style.fg(Color::Cyan)
        };
        let clock_area = chunks[1];
        let clock_row = Rect {
            y: clock_area.y + clock_area.height / 2,
            height: 1,
            ..clock_area
        };
        Paragraph::new(Span::styled(clock, clock_style))
            .alignment(Alignment::Center)
            .render(clock_row, buf);

        if let Some(notice) = &self.notice {
            Paragraph::new(Span::styled(notice.as_str(), italic_style.fg(Color::Magenta)))
                .alignment(Alignment::Center)
                .render(chunks[2], buf);
        }

        let keys = match snapshot.phase() {
            SessionPhase::NoSession => "(q)uit",
            SessionPhase::Running => "(p)ause / (e)nd / (d)iscard / ↑↓ cursor / (q)uit",
            SessionPhase::Paused => "(r)esume / (e)nd / (d)iscard / ↑↓ cursor / (q)uit",
        };
        Paragraph::new(Span::styled(keys, italic_style.patch(dim_style)))
            .alignment(Alignment::Center)
            .render(chunks[3], buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pacekeep::{SessionSnapshot, WorkoutKind};

    fn buffer_text(buf: &Buffer) -> String {
        buf.content().iter().map(|c| c.symbol()).collect()
    }

    fn render(view: &WatchView) -> String {
        let area = Rect::new(0, 0, 80, 14);
        let mut buf = Buffer::empty(area);
        view.render(area, &mut buf);
        buffer_text(&buf)
    }

    #[test]
    fn renders_running_session() {
        let view = WatchView {
            snapshot: SessionSnapshot {
                has_active_session: true,
                is_paused: false,
                elapsed_seconds: 140,
                session_started_at: None,
                active_workout_kind: Some(WorkoutKind::Strength),
            },
            session_id: Some("S1".into()),
            cursor: Some(0),
            notice: None,
        };
        let text = render(&view);
        assert!(text.contains("RUNNING"));
        assert!(text.contains("02:20"));
        assert!(text.contains("S1"));
        assert!(text.contains("(p)ause"));
    }

    #[test]
    fn renders_empty_state() {
        let view = WatchView::default();
        let text = render(&view);
        assert!(text.contains("NO SESSION"));
        assert!(text.contains("--:--"));
    }
}
