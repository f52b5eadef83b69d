use ratatui::layout::{Alignment, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::Frame;

pub mod layout;

use crate::app::{App, Focus, InputMode, QueryMode, StatusLevel};
use crate::domain::aggregate::parse_amount;
use crate::domain::{BatchSummary, ChainResult, PriceSnapshot, QueryOutput, Totals, MAX_SELECTED};

const SPINNER: [&str; 4] = ["|", "/", "-", "\\"];

pub fn draw(f: &mut Frame, app: &App) {
    let areas = layout::areas(f.size());

    draw_header(f, areas.header, app);
    draw_catalog(f, areas.catalog, app);
    draw_history(f, areas.history, app);
    draw_results(f, areas.results, app);
    draw_status_line(f, areas.status_line, app);
    draw_command_line(f, areas.command_line, app);
}

fn panel_block(title: String, focused: bool) -> Block<'static> {
    let border_style = if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };
    Block::default()
        .borders(Borders::ALL)
        .title(title)
        .border_style(border_style)
}

fn highlight(focused: bool) -> Style {
    if focused {
        Style::default()
            .fg(Color::Black)
            .bg(Color::Cyan)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().add_modifier(Modifier::BOLD)
    }
}

fn draw_header(f: &mut Frame, area: Rect, app: &App) {
    let mut spans = vec![
        Span::styled(
            "Tally",
            Style::default()
                .fg(Color::LightCyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        Span::styled("Mode", Style::default().fg(Color::DarkGray)),
        Span::raw(format!(" {}  ", app.mode.title())),
        Span::styled("Networks", Style::default().fg(Color::DarkGray)),
        Span::raw(format!(" {}/{}  ", app.selection.len(), MAX_SELECTED)),
    ];
    let names: Vec<&str> = app
        .selection
        .networks()
        .iter()
        .map(|n| n.name.as_str())
        .collect();
    if !names.is_empty() {
        spans.push(Span::raw(names.join(", ")));
    }
    if app.is_loading() {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(
            format!("{} loading", SPINNER[app.spinner % SPINNER.len()]),
            Style::default().fg(Color::LightYellow),
        ));
    }

    let paragraph = Paragraph::new(Line::from(spans))
        .block(Block::default().borders(Borders::ALL))
        .alignment(Alignment::Left);
    f.render_widget(paragraph, area);
}

fn draw_catalog(f: &mut Frame, area: Rect, app: &App) {
    let focused = app.focus == Focus::Catalog;
    let mut title = match &app.catalog_keyword {
        Some(keyword) => format!("Networks /{keyword}"),
        None => "Networks".to_string(),
    };
    if app.catalog_loading {
        title.push_str(" …");
    }

    let items: Vec<ListItem> = app
        .catalog
        .iter()
        .map(|network| {
            let selected = app.selection.contains(&network.key);
            let mark = if selected { "[x]" } else { "[ ]" };
            let style = if selected {
                Style::default().fg(Color::LightGreen)
            } else {
                Style::default()
            };
            ListItem::new(Line::from(vec![
                Span::styled(format!("{mark} "), style),
                Span::raw(network.name.clone()),
                Span::styled(
                    format!("  {}", network.key),
                    Style::default().fg(Color::DarkGray),
                ),
            ]))
        })
        .collect();

    let list = List::new(items)
        .block(panel_block(title, focused))
        .highlight_style(highlight(focused))
        .highlight_symbol(">> ");

    let mut state = ListState::default();
    if !app.catalog.is_empty() {
        state.select(Some(app.selected_catalog));
    }
    f.render_stateful_widget(list, area, &mut state);
}

fn draw_history(f: &mut Frame, area: Rect, app: &App) {
    let focused = app.focus == Focus::History;
    let items: Vec<ListItem> = app
        .history
        .entries()
        .iter()
        .map(|entry| {
            let networks: Vec<&str> = entry.networks.iter().map(|n| n.key.as_str()).collect();
            ListItem::new(Line::from(vec![
                Span::raw(short_addr(&entry.address)),
                Span::styled(
                    format!("  {}", entry.timestamp.format("%m-%d %H:%M")),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::styled(
                    format!("  {}", networks.join(",")),
                    Style::default().fg(Color::DarkGray),
                ),
            ]))
        })
        .collect();

    let list = List::new(items)
        .block(panel_block(
            format!("History ({})", app.history.len()),
            focused,
        ))
        .highlight_style(highlight(focused))
        .highlight_symbol(">> ");

    let mut state = ListState::default();
    if !app.history.is_empty() {
        state.select(Some(app.selected_history));
    }
    f.render_stateful_widget(list, area, &mut state);
}

fn draw_results(f: &mut Frame, area: Rect, app: &App) {
    let focused = app.focus == Focus::Results;
    let lines = match &app.output {
        Some(QueryOutput::Single {
            address,
            chains,
            totals,
            price,
        }) => single_lines(app, address, chains, totals, price.as_ref()),
        Some(QueryOutput::Batch { addresses, summary }) => batch_lines(app, addresses, summary),
        None => empty_lines(app),
    };

    let paragraph = Paragraph::new(lines)
        .block(panel_block("Results".to_string(), focused))
        .wrap(Wrap { trim: false });
    f.render_widget(paragraph, area);
}

fn empty_lines(app: &App) -> Vec<Line<'static>> {
    let hint = if app.selection.is_empty() {
        "Select up to 5 networks (Enter in the network list, or :chain <key>)"
    } else if app.is_loading() {
        "Fetching balances…"
    } else {
        match app.mode {
            QueryMode::Single => "Press a to enter an address or .eth name",
            QueryMode::Batch => "Press b to paste addresses (newline, comma or space separated)",
        }
    };
    let mut lines = vec![Line::from(Span::styled(
        hint.to_string(),
        Style::default().fg(Color::DarkGray),
    ))];
    if let Some(error) = app.query.last_error() {
        lines.push(Line::from(Span::styled(
            format!("Last attempt failed: {error} (r to retry)"),
            Style::default().fg(Color::LightRed),
        )));
    }
    lines
}

fn single_lines(
    app: &App,
    address: &str,
    chains: &[ChainResult],
    totals: &Totals,
    price: Option<&PriceSnapshot>,
) -> Vec<Line<'static>> {
    let currency = app.local_currency.clone();
    let mut lines = vec![
        Line::from(vec![
            Span::styled("Address ", Style::default().fg(Color::DarkGray)),
            Span::raw(address.to_string()),
        ]),
        Line::from(vec![
            Span::styled("Total ", Style::default().fg(Color::DarkGray)),
            Span::raw(format!(
                "{:.6} ETH  ${:.2}  {:.2} {}",
                totals.native, totals.usd, totals.local, currency
            )),
        ]),
    ];
    if let Some(price) = price {
        lines.push(price_line(price, &currency));
    }
    lines.push(Line::from(""));

    for row in chains {
        if let Some(error) = &row.error {
            lines.push(Line::from(vec![
                Span::styled(format!("{:<14}", row.chain), Style::default().fg(Color::LightRed)),
                Span::styled(error.clone(), Style::default().fg(Color::LightRed)),
            ]));
            continue;
        }
        lines.push(Line::from(vec![
            Span::styled(format!("{:<14}", row.chain), Style::default().fg(Color::LightCyan)),
            Span::raw(format!(
                "{:>14.6}  ${:>12.2}  {:>12.2}",
                parse_amount(row.balance_native.as_deref()),
                parse_amount(row.balance_usd.as_deref()),
                parse_amount(row.balance_local.as_deref()),
            )),
        ]));
        if let Some(url) = row.explorer_address_url(address) {
            lines.push(Line::from(Span::styled(
                format!("  {url}"),
                Style::default().fg(Color::DarkGray),
            )));
        }
    }
    lines
}

fn batch_lines(app: &App, addresses: &[String], summary: &BatchSummary) -> Vec<Line<'static>> {
    let currency = app.local_currency.clone();
    let grand = summary.grand;
    let mut lines = vec![
        Line::from(vec![
            Span::styled("Addresses ", Style::default().fg(Color::DarkGray)),
            Span::raw(format!("{}", addresses.len())),
        ]),
        Line::from(vec![
            Span::styled("Total ", Style::default().fg(Color::DarkGray)),
            Span::raw(format!(
                "{:.6} ETH  ${:.2}  {:.2} {}",
                grand.native, grand.usd, grand.local, currency
            )),
        ]),
    ];
    if let Some(price) = &summary.price {
        lines.push(price_line(price, &currency));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        format!(
            "{:<14}{:>14}  {:>13}  {:>12}  {:>5}",
            "chain", "native", "usd", currency, "addrs"
        ),
        Style::default().fg(Color::DarkGray),
    )));
    for chain in &summary.chains {
        lines.push(Line::from(vec![
            Span::styled(format!("{:<14}", chain.chain), Style::default().fg(Color::LightCyan)),
            Span::raw(format!(
                "{:>14.6}  ${:>12.2}  {:>12.2}  {:>5}",
                chain.total_native, chain.total_usd, chain.total_local, chain.address_count
            )),
        ]));
    }
    lines
}

fn price_line(price: &PriceSnapshot, currency: &str) -> Line<'static> {
    Line::from(vec![
        Span::styled("ETH ", Style::default().fg(Color::DarkGray)),
        Span::raw(format!("${:.2}  {:.2} {}", price.usd, price.local, currency)),
    ])
}

fn draw_status_line(f: &mut Frame, area: Rect, app: &App) {
    let mut spans = vec![
        Span::styled("Focus ", Style::default().fg(Color::DarkGray)),
        Span::raw(format!("{}  ", app.focus.title())),
    ];
    match app.mode {
        QueryMode::Single => {
            if let Some(address) = &app.address {
                spans.push(Span::styled("Query ", Style::default().fg(Color::DarkGray)));
                spans.push(Span::raw(short_addr(address)));
            }
        }
        QueryMode::Batch => {
            spans.push(Span::styled("Batch ", Style::default().fg(Color::DarkGray)));
            spans.push(Span::raw(format!("{} addresses", app.batch.len())));
        }
    }

    let paragraph = Paragraph::new(Line::from(spans))
        .style(Style::default().fg(Color::White))
        .alignment(Alignment::Left);
    f.render_widget(paragraph, area);
}

fn draw_command_line(f: &mut Frame, area: Rect, app: &App) {
    let content = match app.input_mode {
        InputMode::Normal => {
            if let Some((text, level)) = app.status_text() {
                let color = match level {
                    StatusLevel::Info => Color::LightGreen,
                    StatusLevel::Warn => Color::LightYellow,
                    StatusLevel::Error => Color::LightRed,
                };
                Line::from(vec![
                    Span::styled("msg: ", Style::default().fg(Color::DarkGray)),
                    Span::styled(text.to_string(), Style::default().fg(color)),
                ])
            } else {
                action_hints(app)
            }
        }
        mode => Line::from(vec![
            Span::styled(mode.prompt(), Style::default().fg(Color::Yellow)),
            Span::raw(app.input.clone()),
            Span::styled(
                "  Enter=ok Esc=cancel",
                Style::default().fg(Color::DarkGray),
            ),
        ]),
    };

    let paragraph = Paragraph::new(content).style(Style::default().fg(Color::White));
    f.render_widget(paragraph, area);
}

fn action_hints(app: &App) -> Line<'static> {
    let hints = match app.focus {
        Focus::Catalog => "Enter toggle  / search  c clear",
        Focus::History => "Enter recall  d remove  y copy  X clear",
        Focus::Results => "r refresh",
    };
    Line::from(vec![
        Span::styled(hints, Style::default().fg(Color::DarkGray)),
        Span::styled(
            "  a address  b batch  m mode  Tab focus  : command  q quit",
            Style::default().fg(Color::DarkGray),
        ),
    ])
}

fn short_addr(value: &str) -> String {
    let value = value.trim();
    if value.len() <= 14 || !value.is_ascii() {
        return value.to_string();
    }
    format!("{}..{}", &value[..8], &value[value.len() - 4..])
}
