use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use diarias_dashboard::report::truncate;
use diarias_dashboard::{query, DashboardView, EntityFilter, GroupTotal, MonthRange, Table};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table as TableWidget, TableState},
    Frame, Terminal,
};
use std::io;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Summary,
    Rankings,
    Detail,
}

impl Page {
    pub fn next(&self) -> Self {
        match self {
            Page::Summary => Page::Rankings,
            Page::Rankings => Page::Detail,
            Page::Detail => Page::Summary,
        }
    }

    pub fn previous(&self) -> Self {
        match self {
            Page::Summary => Page::Detail,
            Page::Rankings => Page::Summary,
            Page::Detail => Page::Rankings,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Page::Summary => "Resumo",
            Page::Rankings => "Rankings",
            Page::Detail => "Maiores Diárias",
        }
    }
}

pub struct App {
    pub table: Arc<Table>,
    pub entities: Vec<String>,
    /// None selects every entity
    pub entity_index: Option<usize>,
    pub months: MonthRange,
    pub view: DashboardView,
    pub current_page: Page,
    pub detail_state: TableState,
}

impl App {
    pub fn new(table: Arc<Table>) -> Self {
        let entities = table.entities();
        let view = query(&table, &EntityFilter::All, MonthRange::FULL_YEAR);

        let mut app = Self {
            table,
            entities,
            entity_index: None,
            months: MonthRange::FULL_YEAR,
            view,
            current_page: Page::Summary,
            detail_state: TableState::default(),
        };
        app.reset_selection();
        app
    }

    pub fn entity_filter(&self) -> EntityFilter {
        match self.entity_index {
            Some(i) => EntityFilter::Only(self.entities[i].clone()),
            None => EntityFilter::All,
        }
    }

    /// Re-run the query after any filter change.
    pub fn refresh(&mut self) {
        self.view = query(&self.table, &self.entity_filter(), self.months);
        self.reset_selection();
    }

    fn reset_selection(&mut self) {
        if self.view.detail.is_empty() {
            self.detail_state.select(None);
        } else {
            self.detail_state.select(Some(0));
        }
    }

    pub fn next_entity(&mut self) {
        if self.entities.is_empty() {
            return;
        }
        self.entity_index = match self.entity_index {
            None => Some(0),
            Some(i) if i + 1 >= self.entities.len() => None,
            Some(i) => Some(i + 1),
        };
        self.refresh();
    }

    pub fn previous_entity(&mut self) {
        if self.entities.is_empty() {
            return;
        }
        self.entity_index = match self.entity_index {
            None => Some(self.entities.len() - 1),
            Some(0) => None,
            Some(i) => Some(i - 1),
        };
        self.refresh();
    }

    /// Move the start of the month range; out-of-range moves are ignored.
    pub fn shift_min_month(&mut self, delta: i32) {
        let min = self.months.min() as i32 + delta;
        self.set_months(min, self.months.max() as i32);
    }

    /// Move the end of the month range; out-of-range moves are ignored.
    pub fn shift_max_month(&mut self, delta: i32) {
        let max = self.months.max() as i32 + delta;
        self.set_months(self.months.min() as i32, max);
    }

    fn set_months(&mut self, min: i32, max: i32) {
        if min < 1 || max < 1 {
            return;
        }
        if let Ok(months) = MonthRange::new(min as u32, max as u32) {
            self.months = months;
            self.refresh();
        }
    }

    pub fn reset_filters(&mut self) {
        self.entity_index = None;
        self.months = MonthRange::FULL_YEAR;
        self.refresh();
    }

    pub fn next_page(&mut self) {
        self.current_page = self.current_page.next();
    }

    pub fn previous_page(&mut self) {
        self.current_page = self.current_page.previous();
    }

    pub fn next(&mut self) {
        let len = self.view.detail.len();
        if len == 0 {
            return;
        }
        let i = match self.detail_state.selected() {
            Some(i) if i + 1 < len => i + 1,
            _ => 0,
        };
        self.detail_state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let len = self.view.detail.len();
        if len == 0 {
            return;
        }
        let i = match self.detail_state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        self.detail_state.select(Some(i));
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

    res?;
    Ok(())
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
                KeyCode::Tab => app.next_page(),
                KeyCode::BackTab => app.previous_page(),
                KeyCode::Char('e') => app.next_entity(),
                KeyCode::Char('E') => app.previous_entity(),
                KeyCode::Char('[') => app.shift_min_month(-1),
                KeyCode::Char(']') => app.shift_min_month(1),
                KeyCode::Char('{') => app.shift_max_month(-1),
                KeyCode::Char('}') => app.shift_max_month(1),
                KeyCode::Char('r') => app.reset_filters(),
                KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                    return Ok(())
                }
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
        Page::Summary => render_summary(f, chunks[1], app),
        Page::Rankings => render_rankings(f, chunks[1], app),
        Page::Detail => render_detail(f, chunks[1], app),
    }

    render_status_bar(f, chunks[2], app);
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let pages = [Page::Summary, Page::Rankings, Page::Detail];

    let mut tab_spans = vec![];
    for (i, page) in pages.iter().enumerate() {
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

        tab_spans.push(Span::styled(page.title(), style));
    }

    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(
        format!("Entidade: {}", app.view.entity_filter),
        Style::default().fg(Color::Cyan),
    ));
    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(
        format!("Meses: {}", app.months.label()),
        Style::default().fg(Color::Cyan),
    ));

    let header = Paragraph::new(vec![Line::from(tab_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .title(" Dashboard de Diárias "),
    );

    f.render_widget(header, area);
}

fn render_summary(f: &mut Frame, area: Rect, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(9), Constraint::Min(0)])
        .split(area);

    let s = &app.view.summary;
    let value_style = Style::default().fg(Color::Green).add_modifier(Modifier::BOLD);
    let line = |label: &'static str, value: String| {
        Line::from(vec![
            Span::styled(format!("  {:<18}", label), Style::default().fg(Color::White)),
            Span::styled(value, value_style),
        ])
    };

    let content = vec![
        Line::from(""),
        line("Total de Diárias", s.total_display.clone()),
        line("Média por Diária", s.mean_display.clone()),
        line("Maior Diária", s.max_display.clone()),
        line("Beneficiários", s.distinct_payees.to_string()),
        line("Registros", s.record_count.to_string()),
    ];

    let summary = Paragraph::new(content).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Resumo Financeiro "),
    );
    f.render_widget(summary, chunks[0]);

    render_groups(f, chunks[1], " Diárias por Entidade ", &app.view.entity_totals);
}

fn render_rankings(f: &mut Frame, area: Rect, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    render_groups(f, chunks[0], " Top 10 Beneficiários ", &app.view.top_payees);
    render_groups(f, chunks[1], " Distribuição por Cargo ", &app.view.top_roles);
}

fn render_groups(f: &mut Frame, area: Rect, title: &str, groups: &[GroupTotal]) {
    let header = Row::new(["Nome", "Valor Total"].iter().map(|h| {
        Cell::from(*h).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
    }))
    .style(Style::default().bg(Color::DarkGray))
    .height(1);

    let rows = groups.iter().map(|g| {
        Row::new(vec![
            Cell::from(truncate(&g.key, 36)),
            Cell::from(g.total_display.clone()).style(Style::default().fg(Color::Green)),
        ])
        .height(1)
    });

    let table = TableWidget::new(rows, [Constraint::Min(20), Constraint::Length(20)])
        .header(header)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::White))
                .title(title.to_string()),
        );

    f.render_widget(table, area);
}

fn render_detail(f: &mut Frame, area: Rect, app: &mut App) {
    let header_cells = ["Data", "Valor", "Beneficiário", "Cargo", "Entidade"]
        .iter()
        .map(|h| {
            Cell::from(*h).style(
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            )
        });

    let header = Row::new(header_cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1);

    let rows = app.view.detail.iter().map(|row| {
        Row::new(vec![
            Cell::from(row.issue_date.clone()),
            Cell::from(row.amount_display.clone()).style(Style::default().fg(Color::Green)),
            Cell::from(truncate(&row.payee, 30)),
            Cell::from(truncate(&row.role, 22)),
            Cell::from(truncate(&row.entity, 24)),
        ])
        .height(1)
    });

    let table = TableWidget::new(
        rows,
        [
            Constraint::Length(12),
            Constraint::Length(18),
            Constraint::Length(32),
            Constraint::Length(24),
            Constraint::Min(10),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Maiores Diárias "),
    )
    .highlight_style(
        Style::default()
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.detail_state);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let key = |k: &'static str| Span::styled(k, Style::default().fg(Color::Yellow));

    let status_spans = vec![
        Span::styled(
            format!(" {} registros ", app.view.summary.record_count),
            Style::default().fg(Color::Cyan),
        ),
        Span::raw(" | "),
        key("e/E"),
        Span::raw(" Entidade | "),
        key("[ ]"),
        Span::raw(" Início | "),
        key("{ }"),
        Span::raw(" Fim | "),
        key("r"),
        Span::raw(" Limpar | "),
        key("Tab"),
        Span::raw(" Página | "),
        Span::styled("q", Style::default().fg(Color::Red)),
        Span::raw(" Sair"),
    ];

    let status_bar = Paragraph::new(vec![Line::from(status_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use diarias_dashboard::{LoadStats, Record};
    use chrono::NaiveDate;

    fn app() -> App {
        let record = |entity: &str, month: u32, amount: f64| Record {
            entity: entity.to_string(),
            payee: format!("{} payee", entity),
            role: "Vereador".to_string(),
            expense_kind: "Diária".to_string(),
            commitment_ref: "1".to_string(),
            issue_date: NaiveDate::from_ymd_opt(2023, month, 1),
            transport_amount: 0.0,
            allowance_amount: amount,
        };
        let table = Table::new(
            vec![
                record("Prefeitura", 3, 100.0),
                record("Camara", 5, 40.0),
                record("Camara", 9, 60.0),
            ],
            LoadStats::default(),
        );
        App::new(Arc::new(table))
    }

    #[test]
    fn test_starts_unfiltered() {
        let app = app();
        assert_eq!(app.entity_filter(), EntityFilter::All);
        assert_eq!(app.view.summary.record_count, 3);
        assert_eq!(app.detail_state.selected(), Some(0));
    }

    #[test]
    fn test_entity_cycle_wraps_through_all() {
        let mut app = app();
        app.next_entity();
        assert_eq!(app.entity_filter(), EntityFilter::Only("Camara".to_string()));
        assert_eq!(app.view.summary.record_count, 2);

        app.next_entity();
        assert_eq!(app.entity_filter(), EntityFilter::Only("Prefeitura".to_string()));

        app.next_entity();
        assert_eq!(app.entity_filter(), EntityFilter::All);

        app.previous_entity();
        assert_eq!(app.entity_filter(), EntityFilter::Only("Prefeitura".to_string()));
    }

    #[test]
    fn test_month_shifts_stay_valid() {
        let mut app = app();
        app.shift_min_month(-1);
        assert_eq!(app.months, MonthRange::FULL_YEAR);

        app.shift_max_month(-7);
        assert_eq!(app.months, MonthRange::new(1, 5).unwrap());
        assert_eq!(app.view.summary.record_count, 2);

        for _ in 0..10 {
            app.shift_min_month(1);
        }
        assert_eq!(app.months, MonthRange::new(5, 5).unwrap());
        assert_eq!(app.view.summary.record_count, 1);

        app.reset_filters();
        assert_eq!(app.months, MonthRange::FULL_YEAR);
        assert_eq!(app.view.summary.record_count, 3);
    }

    #[test]
    fn test_empty_table_has_no_selection() {
        let mut app = App::new(Arc::new(Table::empty()));
        assert_eq!(app.detail_state.selected(), None);
        app.next();
        app.next_entity();
        assert_eq!(app.detail_state.selected(), None);
        assert_eq!(app.entity_filter(), EntityFilter::All);
    }

    #[test]
    fn test_detail_navigation_wraps() {
        let mut app = app();
        app.previous();
        assert_eq!(app.detail_state.selected(), Some(2));
        app.next();
        assert_eq!(app.detail_state.selected(), Some(0));
    }

    #[test]
    fn test_page_cycle() {
        assert_eq!(Page::Summary.next(), Page::Rankings);
        assert_eq!(Page::Summary.previous(), Page::Detail);
        assert_eq!(Page::Detail.next(), Page::Summary);
    }
}
