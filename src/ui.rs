use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{
        Axis, Bar, BarChart, BarGroup, Block, Borders, Cell, Chart, Dataset as ChartDataset,
        GraphType, Paragraph, Row, Table, TableState,
    },
    Frame, Terminal,
};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::io;

use sales_dashboard::{load_dashboard, Dashboard, DashboardConfig, DashboardResult, LoadCache};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Overview,
    SourceData,
}

impl Page {
    pub fn next(&self) -> Self {
        match self {
            Page::Overview => Page::SourceData,
            Page::SourceData => Page::Overview,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Page::Overview => "Overview",
            Page::SourceData => "Source Data",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceTable {
    Clients,
    Products,
    Sales,
}

impl SourceTable {
    pub fn title(&self) -> &str {
        match self {
            SourceTable::Clients => "clients",
            SourceTable::Products => "products",
            SourceTable::Sales => "sales",
        }
    }
}

pub struct App {
    pub config: DashboardConfig,
    pub cache: LoadCache,
    pub dashboard: Dashboard,
    pub current_page: Page,
    pub source_table: SourceTable,
    pub state: TableState,
    pub status: Option<String>,
}

impl App {
    pub fn new(config: DashboardConfig) -> DashboardResult<Self> {
        let mut cache = LoadCache::new();
        let dashboard = load_dashboard(&mut cache, &config)?;

        let mut state = TableState::default();
        state.select(Some(0));

        Ok(Self {
            config,
            cache,
            dashboard,
            current_page: Page::Overview,
            source_table: SourceTable::Clients,
            state,
            status: None,
        })
    }

    /// Drop the cached dataset and re-query the store
    pub fn reload(&mut self) {
        self.cache.invalidate();
        match load_dashboard(&mut self.cache, &self.config) {
            Ok(dashboard) => {
                self.dashboard = dashboard;
                self.status = Some("Reloaded".to_string());
                self.clamp_selection();
            }
            Err(e) => self.status = Some(format!("Reload failed: {e}")),
        }
    }

    pub fn next_page(&mut self) {
        self.current_page = self.current_page.next();
    }

    pub fn select_table(&mut self, table: SourceTable) {
        self.source_table = table;
        self.current_page = Page::SourceData;
        self.state.select(Some(0));
    }

    pub fn row_count(&self) -> usize {
        let source = &self.dashboard.source;
        match self.source_table {
            SourceTable::Clients => source.clients.len(),
            SourceTable::Products => source.products.len(),
            SourceTable::Sales => source.sales.len(),
        }
    }

    pub fn next(&mut self) {
        let len = self.row_count();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) if i + 1 < len => i + 1,
            _ => 0,
        };
        self.state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let len = self.row_count();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        self.state.select(Some(i));
    }

    fn clamp_selection(&mut self) {
        let len = self.row_count();
        match self.state.selected() {
            _ if len == 0 => self.state.select(None),
            Some(i) if i >= len => self.state.select(Some(len - 1)),
            None => self.state.select(Some(0)),
            _ => {}
        }
    }
}

pub fn run_ui(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res.map_err(Into::into)
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => return Ok(()),
                KeyCode::Tab | KeyCode::BackTab => app.next_page(),
                KeyCode::Char('r') => app.reload(),
                KeyCode::Char('1') => app.select_table(SourceTable::Clients),
                KeyCode::Char('2') => app.select_table(SourceTable::Products),
                KeyCode::Char('3') => app.select_table(SourceTable::Sales),
                KeyCode::Down | KeyCode::Char('j') => app.next(),
                KeyCode::Up | KeyCode::Char('k') => app.previous(),
                _ => {}
            }
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header with navigation
            Constraint::Min(0),    // Content area
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);

    match app.current_page {
        Page::Overview => render_overview(f, chunks[1], app),
        Page::SourceData => render_source_table(f, chunks[1], app),
    }

    render_status_bar(f, chunks[2], app);
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let mut tab_spans = vec![];
    for (i, page) in [Page::Overview, Page::SourceData].iter().enumerate() {
        if i > 0 {
            tab_spans.push(Span::raw(" │ "));
        }

        let style = if *page == app.current_page {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::DarkGray)
        };

        tab_spans.push(Span::styled(page.title().to_string(), style));
    }

    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(
        app.config.db_path().display().to_string(),
        Style::default().fg(Color::White),
    ));

    let header = Paragraph::new(Line::from(tab_spans))
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Cyan)));

    f.render_widget(header, area);
}

// ============================================================================
// OVERVIEW PAGE
// ============================================================================

fn render_overview(f: &mut Frame, area: Rect, app: &App) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),      // KPI cards
            Constraint::Percentage(50), // Region + products
            Constraint::Min(8),         // Monthly line
        ])
        .split(area);

    render_kpis(f, rows[0], &app.dashboard);

    let charts = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(rows[1]);

    let regions: Vec<(String, Decimal)> = app
        .dashboard
        .revenue_by_region
        .iter()
        .map(|r| (r.region.clone(), r.revenue))
        .collect();
    render_revenue_bars(f, charts[0], " Revenue by Region ", &regions, Color::Blue);

    let products: Vec<(String, Decimal)> = app
        .dashboard
        .top_products
        .iter()
        .map(|p| (p.product_name.clone(), p.revenue))
        .collect();
    render_revenue_bars(f, charts[1], " Top Products ", &products, Color::LightRed);

    render_monthly(f, rows[2], &app.dashboard);
}

fn render_kpis(f: &mut Frame, area: Rect, dashboard: &Dashboard) {
    let kpis = &dashboard.kpis;
    let cards = [
        ("Total revenue", format!("{:.2} €", kpis.total_revenue)),
        ("Units sold", kpis.total_quantity.to_string()),
        ("Average order", format!("{:.2} €", kpis.average_order_value)),
        ("Active clients", kpis.active_clients.to_string()),
    ];

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 4); 4])
        .split(area);

    for (i, (label, value)) in cards.iter().enumerate() {
        let card = Paragraph::new(Line::from(Span::styled(
            value.clone(),
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        )))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::White))
                .title(format!(" {label} ")),
        );
        f.render_widget(card, columns[i]);
    }
}

fn render_revenue_bars(
    f: &mut Frame,
    area: Rect,
    title: &str,
    series: &[(String, Decimal)],
    color: Color,
) {
    let bars: Vec<Bar> = series
        .iter()
        .map(|(label, revenue)| {
            Bar::default()
                .value(bar_value(*revenue))
                .label(Line::from(truncate(label, 18)))
                .text_value(format!("{:.2}", revenue))
                .style(Style::default().fg(color))
        })
        .collect();

    let chart = BarChart::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::White))
                .title(title.to_string()),
        )
        .direction(Direction::Horizontal)
        .bar_width(1)
        .bar_gap(1)
        .data(BarGroup::default().bars(&bars));

    f.render_widget(chart, area);
}

fn render_monthly(f: &mut Frame, area: Rect, dashboard: &Dashboard) {
    let points: Vec<(f64, f64)> = dashboard
        .revenue_by_month
        .iter()
        .enumerate()
        .map(|(i, m)| (i as f64, m.revenue.to_f64().unwrap_or(0.0)))
        .collect();

    let max_y = points.iter().map(|(_, y)| *y).fold(0.0, f64::max).max(1.0);
    let max_x = (points.len().max(2) - 1) as f64;

    let x_labels: Vec<Span> = dashboard
        .revenue_by_month
        .iter()
        .map(|m| Span::raw(m.month.format("%Y-%m").to_string()))
        .collect();

    let datasets = vec![ChartDataset::default()
        .name("Revenue")
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(Color::Green))
        .data(&points)];

    let chart = Chart::new(datasets)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::White))
                .title(" Monthly Revenue "),
        )
        .x_axis(
            Axis::default()
                .style(Style::default().fg(Color::DarkGray))
                .bounds([0.0, max_x])
                .labels(x_labels),
        )
        .y_axis(
            Axis::default()
                .style(Style::default().fg(Color::DarkGray))
                .bounds([0.0, max_y * 1.1])
                .labels(vec![
                    Span::raw("0"),
                    Span::raw(format!("{:.0}", max_y / 2.0)),
                    Span::raw(format!("{:.0}", max_y)),
                ]),
        );

    f.render_widget(chart, area);
}

// ============================================================================
// SOURCE DATA PAGE
// ============================================================================

fn render_source_table(f: &mut Frame, area: Rect, app: &mut App) {
    let source = &app.dashboard.source;

    let (headers, rows, widths): (Vec<&str>, Vec<Vec<String>>, Vec<Constraint>) = match app.source_table {
        SourceTable::Clients => (
            vec!["ID", "Name", "Region"],
            source
                .clients
                .iter()
                .map(|c| vec![c.id.to_string(), c.name.clone(), c.region.clone()])
                .collect(),
            vec![Constraint::Length(6), Constraint::Length(30), Constraint::Length(20)],
        ),
        SourceTable::Products => (
            vec!["ID", "Name", "Category", "List price"],
            source
                .products
                .iter()
                .map(|p| {
                    vec![
                        p.id.to_string(),
                        p.name.clone(),
                        p.category.clone(),
                        format!("{:.2}", p.list_price),
                    ]
                })
                .collect(),
            vec![
                Constraint::Length(6),
                Constraint::Length(30),
                Constraint::Length(18),
                Constraint::Length(12),
            ],
        ),
        SourceTable::Sales => (
            vec!["ID", "Client", "Product", "Date", "Qty", "Unit price"],
            source
                .sales
                .iter()
                .map(|s| {
                    vec![
                        s.id.to_string(),
                        s.client_id.to_string(),
                        s.product_id.to_string(),
                        s.date_string(),
                        s.quantity.to_string(),
                        format!("{:.2}", s.unit_price),
                    ]
                })
                .collect(),
            vec![
                Constraint::Length(6),
                Constraint::Length(8),
                Constraint::Length(8),
                Constraint::Length(12),
                Constraint::Length(6),
                Constraint::Length(12),
            ],
        ),
    };

    let header_cells = headers.iter().map(|h| {
        Cell::from(*h).style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
    });

    let header = Row::new(header_cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1);

    let body = rows
        .into_iter()
        .map(|cells| Row::new(cells.into_iter().map(Cell::from)).height(1));

    let table = Table::new(body, widths)
        .header(header)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::White))
                .title(format!(" Source data - {} ", app.source_table.title())),
        )
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.state);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let mut status_spans = vec![];

    if let Some(status) = &app.status {
        status_spans.push(Span::styled(format!(" {status} "), Style::default().fg(Color::Green)));
        status_spans.push(Span::raw("|"));
    }

    let gaps = app.dashboard.referential_gaps.len();
    if gaps > 0 {
        status_spans.push(Span::styled(
            format!(" {gaps} sale(s) skipped "),
            Style::default().fg(Color::Red),
        ));
        status_spans.push(Span::raw("|"));
    }

    status_spans.push(Span::raw(" "));
    status_spans.push(Span::styled("Tab", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Page | "));
    status_spans.push(Span::styled("1/2/3", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Tables | "));
    status_spans.push(Span::styled("↑/↓", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Nav | "));
    status_spans.push(Span::styled("r", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Reload | "));
    status_spans.push(Span::styled("q", Style::default().fg(Color::Red)));
    status_spans.push(Span::raw(" Quit"));

    let status_bar = Paragraph::new(Line::from(status_spans)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}

/// Bar heights are u64; revenue is rounded to whole units.
fn bar_value(revenue: Decimal) -> u64 {
    revenue.round().to_u64().unwrap_or(0)
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_page_cycle() {
        assert_eq!(Page::Overview.next(), Page::SourceData);
        assert_eq!(Page::SourceData.next(), Page::Overview);
    }

    #[test]
    fn test_bar_value_rounds() {
        assert_eq!(bar_value(dec!(493.5)), 494);
        assert_eq!(bar_value(dec!(0)), 0);
    }

    #[test]
    fn test_truncate_is_char_safe() {
        assert_eq!(truncate("Café en grains 1kg", 10), "Café en...");
        assert_eq!(truncate("Short", 10), "Short");
    }
}
