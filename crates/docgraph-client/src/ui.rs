use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

use docgraph_client::DocumentBackend;
use docgraph_shared::Document;

use crate::app::{App, LinkRow, Panel, View};

pub fn draw<B: DocumentBackend>(f: &mut Frame, app: &App<B>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(f.area());

    match app.view {
        View::Documents => draw_documents(f, app, chunks[0]),
        View::Relationships => draw_relationships(f, app, chunks[0]),
    }
    draw_status_bar(f, app, chunks[1]);

    // Draw error overlay if present
    if let Some(ref error) = app.error_message {
        draw_error_popup(f, error);
    }

    // Draw loading overlay if loading
    if app.loading {
        draw_loading_overlay(f, &app.loading_message);
    }
}

fn border_style(active: bool) -> Style {
    if active {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    }
}

fn highlight() -> Style {
    Style::default()
        .bg(Color::DarkGray)
        .add_modifier(Modifier::BOLD)
}

fn version_badge(doc: &Document) -> Span<'static> {
    let style = if doc.is_current_version {
        Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::Gray)
    };
    Span::styled(format!("v{:<3}", doc.version_number), style)
}

fn draw_documents<B: DocumentBackend>(f: &mut Frame, app: &App<B>, area: Rect) {
    let items: Vec<ListItem> = app
        .documents
        .iter()
        .map(|doc| {
            let marker = if app.link_source == Some(doc.id) { "* " } else { "  " };
            let mut spans = vec![
                Span::styled(marker, Style::default().fg(Color::Yellow)),
                version_badge(doc),
                Span::raw(" "),
                Span::raw(doc.title.clone()),
            ];
            if !doc.folder_path.is_empty() {
                spans.push(Span::styled(
                    format!("  {}", doc.folder_display()),
                    Style::default().fg(Color::DarkGray),
                ));
            }
            if !doc.links.is_empty() {
                spans.push(Span::styled(
                    format!("  [{} links]", doc.links.len()),
                    Style::default().fg(Color::Blue),
                ));
            }
            ListItem::new(Line::from(spans))
        })
        .collect();

    let block = Block::default()
        .title(format!(" Documents ({}) ", app.documents.len()))
        .borders(Borders::ALL)
        .border_style(border_style(true));

    if items.is_empty() {
        let empty = Paragraph::new("No documents in this workspace. Press r to reload.")
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center)
            .block(block);
        f.render_widget(empty, area);
        return;
    }

    let list = List::new(items).block(block).highlight_style(highlight());
    let mut state = ListState::default().with_selected(Some(app.selected_document));
    f.render_stateful_widget(list, area, &mut state);
}

fn draw_relationships<B: DocumentBackend>(f: &mut Frame, app: &App<B>, area: Rect) {
    let Some(focus) = app.focus_document() else {
        return;
    };

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)])
        .split(area);

    let mut header = vec![
        Span::styled(
            focus.title.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        version_badge(focus),
    ];
    if let Some(ref warning) = app.integrity_warning {
        header.push(Span::styled(
            format!("  ! {}", warning),
            Style::default().fg(Color::Red),
        ));
    }
    f.render_widget(
        Paragraph::new(Line::from(header)).block(Block::default().borders(Borders::ALL)),
        rows[0],
    );

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(40),
            Constraint::Percentage(40),
            Constraint::Percentage(20),
        ])
        .split(rows[1]);

    draw_versions(f, app, focus, columns[0]);
    draw_links(f, app, columns[1]);
    draw_candidates(f, app, columns[2]);
}

fn draw_versions<B: DocumentBackend>(f: &mut Frame, app: &App<B>, focus: &Document, area: Rect) {
    let items: Vec<ListItem> = app
        .versions
        .iter()
        .map(|doc| {
            let mut spans = vec![version_badge(doc), Span::raw(" ")];
            let title_style = if doc.id == focus.id {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default()
            };
            spans.push(Span::styled(doc.title.clone(), title_style));
            if doc.is_current_version {
                spans.push(Span::styled(" (current)", Style::default().fg(Color::Green)));
            }
            spans.push(Span::styled(
                format!("  {}", doc.created_at.format("%Y-%m-%d %H:%M")),
                Style::default().fg(Color::DarkGray),
            ));
            ListItem::new(Line::from(spans))
        })
        .collect();

    let active = app.panel == Panel::Versions;
    let list = List::new(items)
        .block(
            Block::default()
                .title(" Versions ")
                .borders(Borders::ALL)
                .border_style(border_style(active)),
        )
        .highlight_style(if active { highlight() } else { Style::default() });
    let mut state = ListState::default().with_selected(Some(app.selected_version));
    f.render_stateful_widget(list, area, &mut state);
}

fn draw_links<B: DocumentBackend>(f: &mut Frame, app: &App<B>, area: Rect) {
    let items: Vec<ListItem> = app
        .link_rows
        .iter()
        .map(|row| {
            let line = match row {
                LinkRow::Outgoing {
                    document,
                    link_type,
                } => Line::from(vec![
                    Span::styled("-> ", Style::default().fg(Color::Cyan)),
                    Span::raw(document.title.clone()),
                    Span::styled(format!("  {}", link_type), Style::default().fg(Color::DarkGray)),
                ]),
                LinkRow::Incoming(document) => Line::from(vec![
                    Span::styled("<- ", Style::default().fg(Color::Magenta)),
                    Span::raw(document.title.clone()),
                ]),
                LinkRow::Broken(id) => Line::from(vec![
                    Span::styled("x  ", Style::default().fg(Color::Red)),
                    Span::styled(format!("missing {}", id), Style::default().fg(Color::Red)),
                ]),
            };
            ListItem::new(line)
        })
        .collect();

    let active = app.panel == Panel::Links;
    let list = List::new(items)
        .block(
            Block::default()
                .title(" Links ")
                .borders(Borders::ALL)
                .border_style(border_style(active)),
        )
        .highlight_style(if active { highlight() } else { Style::default() });
    let mut state = ListState::default().with_selected(Some(app.selected_link));
    f.render_stateful_widget(list, area, &mut state);
}

fn draw_candidates<B: DocumentBackend>(f: &mut Frame, app: &App<B>, area: Rect) {
    let items: Vec<ListItem> = app
        .candidates
        .iter()
        .map(|doc| ListItem::new(Line::from(vec![version_badge(doc), Span::raw(doc.title.clone())])))
        .collect();

    let list = List::new(items).block(
        Block::default()
            .title(" Possible versions ")
            .borders(Borders::ALL)
            .border_style(border_style(false)),
    );
    f.render_widget(list, area);
}

fn draw_status_bar<B: DocumentBackend>(f: &mut Frame, app: &App<B>, area: Rect) {
    let hints = match (app.view, app.panel) {
        (View::Documents, _) => "j/k move  Enter open  m mark  l link marked  r reload  q quit",
        (View::Relationships, Panel::Versions) => {
            "Tab links  c set current  u unlink  J/K move  n new version  D delete  r refresh  Esc back"
        }
        (View::Relationships, Panel::Links) => {
            "Tab versions  Enter open  d remove link  r refresh  Esc back"
        }
    };

    let line = match app.status_message {
        Some(ref message) => Line::from(vec![
            Span::styled(message.clone(), Style::default().fg(Color::Green)),
            Span::raw("  "),
            Span::styled(hints, Style::default().fg(Color::DarkGray)),
        ]),
        None => Line::from(Span::styled(hints, Style::default().fg(Color::DarkGray))),
    };
    f.render_widget(Paragraph::new(line), area);
}

fn draw_loading_overlay(f: &mut Frame, message: &str) {
    let area = centered_rect(40, 10, f.area());

    f.render_widget(Clear, area);

    let text = Paragraph::new(message)
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Yellow)),
        );

    f.render_widget(text, area);
}

fn draw_error_popup(f: &mut Frame, error: &str) {
    let area = centered_rect(60, 20, f.area());

    f.render_widget(Clear, area);

    let block = Block::default()
        .title(" Error ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red));

    let text = Paragraph::new(error)
        .style(Style::default().fg(Color::Red))
        .wrap(Wrap { trim: true })
        .block(block);

    f.render_widget(text, area);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
