use std::{
    collections::VecDeque,
    sync::mpsc::{Receiver, TryRecvError},
    time::Duration,
};

use anyhow::Result;
use crossterm::{
    event::{self, Event as CEvent, KeyCode},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use pixmatrix_surface::MemorySurface;
use pixmatrix_types::{
    events::{EventPayload, SessionEvent},
    frame::FrameBuffer,
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Terminal,
};

const MAX_LOG_ENTRIES: usize = 120;

pub enum UiMessage {
    Event(SessionEvent),
    Shutdown,
}

pub fn run(receiver: Receiver<UiMessage>, surface: MemorySurface, summary: String) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.hide_cursor()?;

    let res = run_loop(&mut terminal, receiver, &surface, summary.as_str());

    terminal.show_cursor()?;
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    res
}

fn run_loop<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    receiver: Receiver<UiMessage>,
    surface: &MemorySurface,
    summary: &str,
) -> Result<()> {
    let mut logs: VecDeque<String> = VecDeque::with_capacity(MAX_LOG_ENTRIES);
    let mut last_status = String::from("waiting");
    let mut should_close = false;

    loop {
        loop {
            match receiver.try_recv() {
                Ok(UiMessage::Event(event)) => {
                    last_status = summarize_status(&event);
                    if logs.len() == MAX_LOG_ENTRIES {
                        logs.pop_front();
                    }
                    logs.push_back(format_event(&event));
                }
                Ok(UiMessage::Shutdown) | Err(TryRecvError::Disconnected) => {
                    should_close = true;
                    break;
                }
                Err(TryRecvError::Empty) => break,
            }
        }
        if should_close {
            break;
        }

        let frame = surface.current()?;
        terminal.draw(|f| {
            let rows = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Length(3), Constraint::Min(0)].as_ref())
                .split(f.size());

            let header = Paragraph::new(Line::from(vec![
                Span::styled(
                    "pixmatrix",
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::raw("  "),
                Span::raw(last_status.clone()),
                Span::raw("  "),
                Span::styled("matrix:", Style::default().fg(Color::Magenta)),
                Span::raw(" "),
                Span::raw(summary),
                Span::raw("  "),
                Span::styled("q", Style::default().fg(Color::Yellow)),
                Span::raw(" to quit"),
            ]))
            .block(Block::default().borders(Borders::ALL).title("Status"));
            f.render_widget(header, rows[0]);

            // Two terminal cells per LED keep the preview roughly square.
            let preview_width = (frame.width() * 2 + 2) as u16;
            let columns = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Length(preview_width), Constraint::Min(0)].as_ref())
                .split(rows[1]);

            let preview = Paragraph::new(preview_lines(&frame))
                .block(Block::default().borders(Borders::ALL).title("Preview"));
            f.render_widget(preview, columns[0]);

            let items: Vec<ListItem> = logs
                .iter()
                .rev()
                .map(|entry| ListItem::new(entry.clone()))
                .collect();
            let list = List::new(items)
                .block(Block::default().borders(Borders::ALL).title("Recent events"));
            f.render_widget(list, columns[1]);
        })?;

        if event::poll(Duration::from_millis(50))? {
            if let CEvent::Key(key) = event::read()? {
                if matches!(key.code, KeyCode::Char('q') | KeyCode::Esc) {
                    break;
                }
            }
        }
    }

    Ok(())
}

fn preview_lines(frame: &FrameBuffer) -> Vec<Line<'static>> {
    (0..frame.height())
        .map(|y| {
            let cells: Vec<Span> = (0..frame.width())
                .map(|x| {
                    let px = frame.pixel(x, y);
                    Span::styled("  ", Style::default().bg(Color::Rgb(px.r, px.g, px.b)))
                })
                .collect();
            Line::from(cells)
        })
        .collect()
}

fn summarize_status(event: &SessionEvent) -> String {
    match &event.payload {
        EventPayload::Lifecycle(lifecycle) => format!("lifecycle: {:?}", lifecycle.phase),
        EventPayload::Store(store) => format!(
            "{} frames, generation {}/{}",
            store.frames,
            store.generation + 1,
            store.history_len
        ),
        EventPayload::Correction(params) => format!(
            "brightness {:.2} gamma {:.2}",
            params.brightness, params.gamma
        ),
        EventPayload::Scheduler(scheduler) if scheduler.running => {
            format!("animating @ {} fps", scheduler.fps)
        }
        EventPayload::Scheduler(_) => "animation stopped".to_string(),
        EventPayload::Broadcast(broadcast) => match broadcast.frame_index {
            Some(index) => format!("frame {index}"),
            None => "edit sent".to_string(),
        },
    }
}

fn format_event(event: &SessionEvent) -> String {
    let timestamp = event.timestamp.format("%H:%M:%S%.3f");
    match &event.payload {
        EventPayload::Lifecycle(lifecycle) => format!(
            "[{}] Lifecycle::{:?} {}",
            timestamp,
            lifecycle.phase,
            lifecycle.details.clone().unwrap_or_default()
        ),
        EventPayload::Store(store) => format!(
            "[{}] Store {} frames={} selected={}",
            timestamp, store.action, store.frames, store.selected
        ),
        EventPayload::Correction(params) => format!(
            "[{}] Correction brightness={:.2} gamma={:.2} gains=({:.2}, {:.2}, {:.2})",
            timestamp,
            params.brightness,
            params.gamma,
            params.gains.red,
            params.gains.green,
            params.gains.blue
        ),
        EventPayload::Scheduler(scheduler) => format!(
            "[{}] Scheduler running={} fps={} broadcast={}",
            timestamp, scheduler.running, scheduler.fps, scheduler.broadcast
        ),
        EventPayload::Broadcast(broadcast) => format!(
            "[{}] Broadcast frame={:?} bytes={} delivered={}",
            timestamp, broadcast.frame_index, broadcast.bytes, broadcast.delivered
        ),
    }
}
