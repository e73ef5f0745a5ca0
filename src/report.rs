// Plain-text rendering of a dashboard view, for the `report` command

use crate::query::{DashboardView, GroupTotal};
use std::fmt;

/// Text layout of a dashboard view.
pub struct Report<'a>(pub &'a DashboardView);

impl fmt::Display for Report<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let view = self.0;
        let s = &view.summary;

        writeln!(f, "Diárias: {} | {}", view.entity_filter, view.month_range.label())?;
        writeln!(f, "{}", "━".repeat(60))?;
        writeln!(f, "Total de Diárias : {:>20}", s.total_display)?;
        writeln!(f, "Média por Diária : {:>20}", s.mean_display)?;
        writeln!(f, "Maior Diária     : {:>20}", s.max_display)?;
        writeln!(f, "Beneficiários    : {:>20}", s.distinct_payees)?;
        writeln!(f, "Registros        : {:>20}", s.record_count)?;

        write_groups(f, "Diárias por Entidade", &view.entity_totals)?;
        write_groups(f, "Top 10 Beneficiários", &view.top_payees)?;
        write_groups(f, "Distribuição por Cargo", &view.top_roles)?;

        writeln!(f, "\nMaiores Diárias")?;
        if view.detail.is_empty() {
            writeln!(f, "  (sem dados)")?;
        }
        for row in &view.detail {
            writeln!(
                f,
                "  {:<10} {:>16}  {:<28} {:<24} {}",
                row.issue_date,
                row.amount_display,
                truncate(&row.payee, 28),
                truncate(&row.role, 24),
                row.entity
            )?;
        }

        Ok(())
    }
}

/// Render every section of `view` as aligned text.
pub fn render_report(view: &DashboardView) -> String {
    Report(view).to_string()
}

fn write_groups(f: &mut fmt::Formatter<'_>, title: &str, groups: &[GroupTotal]) -> fmt::Result {
    writeln!(f, "\n{}", title)?;
    if groups.is_empty() {
        writeln!(f, "  (sem dados)")?;
    }
    for g in groups {
        writeln!(f, "  {:<40} {:>18}", truncate(&g.key, 40), g.total_display)?;
    }
    Ok(())
}

/// Cut to `max_chars` characters, marking the cut with `...`.
pub fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
