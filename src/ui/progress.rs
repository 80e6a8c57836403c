//! The progress panel.
//!
//! Shows the task kind and queue position in the title, the roots being worked on, the
//! current entry, counters, a gauge and either the key hint or the conflict prompt.

use crate::app::Session;
use crate::config::Theme;
use crate::core::formatter::{fit_path, format_bytes_ratio, format_mode};
use crate::core::task::{Phase, Task, TaskKind};
use crate::utils::shorten_home_path;

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Gauge, Paragraph},
};
use std::path::Path;

const PANEL_WIDTH: u16 = 72;
const PANEL_HEIGHT: u16 = 9;
const LABEL_WIDTH: usize = 6;

pub(crate) fn render(frame: &mut Frame, session: &Session, theme: &Theme) {
    let area = centered(frame.area(), PANEL_WIDTH, PANEL_HEIGHT);
    frame.render_widget(Clear, area);

    let (index, total) = session.position();
    let title = match session.current() {
        Some(task) if total > 1 => format!(" {} ({}/{}) ", task.kind().verb(), index, total),
        Some(task) => format!(" {} ", task.kind().verb()),
        None => " burrow ".to_string(),
    };
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(theme.accent_style());
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let Some(task) = session.current() else {
        return;
    };

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(inner);

    let width = (inner.width as usize).saturating_sub(LABEL_WIDTH);
    let label = Style::default().fg(theme.accent());

    frame.render_widget(
        Paragraph::new(labeled("From", &display_path(task.source_root(), width), label)),
        rows[0],
    );
    frame.render_widget(Paragraph::new(second_line(task, session, width, label)), rows[1]);

    let current = task
        .current_path()
        .map(|p| fit_path(p, width))
        .unwrap_or_default();
    frame.render_widget(
        Paragraph::new(labeled("Now", &current, label)).style(Style::default().fg(Color::Gray)),
        rows[2],
    );
    frame.render_widget(Paragraph::new(counters(task)), rows[3]);

    let gauge = Gauge::default()
        .gauge_style(Style::default().fg(theme.gauge()))
        .ratio(task.completion())
        .label(gauge_label(task))
        .use_unicode(true);
    frame.render_widget(gauge, rows[4]);

    let footer = match session.prompt() {
        Some(n) => Line::from(vec![
            Span::styled(
                format!("{} destination(s) already exist ", n),
                Style::default()
                    .fg(theme.error())
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw("[s]kip [o]verwrite [a]bort"),
        ]),
        None => Line::from(Span::styled(
            "q/Esc: cancel",
            Style::default().fg(Color::DarkGray),
        )),
    };
    frame.render_widget(Paragraph::new(footer), rows[6]);
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let w = width.min(area.width);
    let h = height.min(area.height);
    Rect {
        x: area.x + (area.width - w) / 2,
        y: area.y + (area.height - h) / 2,
        width: w,
        height: h,
    }
}

fn display_path(path: &Path, width: usize) -> String {
    fit_path(Path::new(&shorten_home_path(path)), width)
}

fn labeled<'a>(name: &'a str, value: &str, style: Style) -> Line<'a> {
    Line::from(vec![
        Span::styled(format!("{:<w$}", name, w = LABEL_WIDTH), style),
        Span::raw(value.to_string()),
    ])
}

fn second_line<'a>(task: &Task, session: &Session, width: usize, style: Style) -> Line<'a> {
    match task.kind() {
        TaskKind::Copy | TaskKind::Move => {
            labeled("To", &display_path(task.dest_root(), width), style)
        }
        TaskKind::Remove => Line::from(""),
        TaskKind::Chmod => {
            let spec = task.chmod_spec();
            let mut text = format!(
                "{}  set {} clear {}",
                session.mode_change(),
                format_mode(spec.set),
                format_mode(spec.clear)
            );
            if let Some(uid) = spec.owner {
                text.push_str(&format!("  owner {}", uid));
            }
            if let Some(gid) = spec.group {
                text.push_str(&format!("  group {}", gid));
            }
            labeled("Mode", &text, style)
        }
    }
}

fn counters(task: &Task) -> Line<'static> {
    let p = task.progress();
    let mut text = if task.phase() == Phase::Estimating {
        format!(
            "Scanning: {} files, {} directories",
            p.files_total, p.dirs_total
        )
    } else {
        format!(
            "Files {}/{}  Dirs {}/{}",
            p.files_done, p.files_total, p.dirs_done, p.dirs_total
        )
    };
    if p.conflicts > 0 {
        text.push_str(&format!("  Conflicts {}", p.conflicts));
    }
    if p.specials > 0 {
        text.push_str(&format!("  Special {}", p.specials));
    }
    Line::from(text)
}

fn gauge_label(task: &Task) -> String {
    let p = task.progress();
    if p.size_total > 0 {
        format_bytes_ratio(p.size_done + task.in_flight_bytes(), p.size_total)
    } else {
        format!("{:.0}%", task.completion() * 100.0)
    }
}
