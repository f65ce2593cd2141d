//! Dashboard and monthly report commands.

use std::path::Path;

use officine_client::dashboard::{ChartSeries, DashboardRow};
use officine_client::pdf::monthly_report_pdf;
use officine_client::{DashboardController, DashboardFilter};
use officine_core::{
    Month, Operation, PeriodFilter, QuickPeriod, StatusBucket, Year, format_date,
};

use super::{CommandError, Context};
use crate::output;

/// Dashboard selection from the command line.
#[derive(Debug, Clone, Copy, Default)]
pub struct Selection {
    pub month: Option<Month>,
    pub year: Option<Year>,
    pub period: Option<QuickPeriod>,
    pub status: Option<StatusBucket>,
}

impl Selection {
    fn filter(self, today: chrono::NaiveDate) -> DashboardFilter {
        let base = DashboardFilter {
            period: PeriodFilter {
                month: self.month,
                year: self.year,
            },
            status: None,
        };
        let base = match self.period {
            Some(preset) => base.with_quick_period(preset, today),
            None => base,
        };
        base.with_status(self.status)
    }
}

fn print_chart(title: &str, series: &ChartSeries) {
    output::title(title);
    if series.is_empty() {
        output::message("(aucune donnée)");
        return;
    }
    let rows: Vec<Vec<String>> = series
        .points()
        .map(|(label, value)| vec![label.to_owned(), format!("{value:.2}")])
        .collect();
    output::table(&["", series.label], &rows);
}

fn row_cells(row: &DashboardRow) -> Vec<String> {
    vec![
        if row.is_credit_note() { "Avoir" } else { "Facture" }.to_owned(),
        row.number.clone(),
        row.supplier_name.clone(),
        format_date(row.date),
        row.amount.format(),
        row.status.clone().unwrap_or_default(),
    ]
}

/// Load the dashboard, apply the selection and print KPIs, charts and rows.
///
/// # Errors
///
/// Returns error if the global snapshot or the period snapshot cannot be
/// fetched.
pub async fn show(ctx: &Context, selection: Selection) -> Result<(), CommandError> {
    ctx.client.guard(Operation::ViewDashboard).await?;
    let controller = DashboardController::new(ctx.client.clone());
    controller.load().await?;
    controller
        .set_filter(selection.filter(Context::today()))
        .await?;

    let view = controller.view();
    output::title(&format!("Indicateurs - {}", view.kpis.period_label));
    for (key, value) in &view.kpis.values {
        output::field(key.label_fr(), &value.to_string());
    }

    print_chart("Évolution mensuelle", &view.monthly);
    print_chart("Top fournisseurs", &view.suppliers);

    output::title(if view.filter.is_active() {
        "Opérations filtrées"
    } else {
        "Factures récentes"
    });
    let rows: Vec<Vec<String>> = view.rows.iter().map(row_cells).collect();
    output::table(
        &["Type", "Numéro", "Fournisseur", "Date", "Montant", "Statut"],
        &rows,
    );
    Ok(())
}

/// Print the monthly report, optionally writing it as PDF into `pdf_dir`.
///
/// # Errors
///
/// Returns error if the report cannot be fetched or the PDF written.
pub async fn report(
    ctx: &Context,
    month: Month,
    year: Year,
    pdf_dir: Option<&Path>,
) -> Result<(), CommandError> {
    ctx.client.guard(Operation::ViewReports).await?;
    let report = ctx.client.monthly_report(month, year).await?;

    output::title(&format!("Rapport mensuel - {}", report.period_label()));
    output::field("Factures", &report.invoices_count.to_string());
    output::field("Montant factures", &report.total_invoices_amount.format());
    output::field("Avoirs", &report.credit_notes_count.to_string());
    output::field("Montant avoirs", &report.total_credit_notes_amount.format());
    output::field("Net à payer", &report.net_to_pay.format());

    let rows: Vec<Vec<String>> = report
        .supplier_breakdown
        .iter()
        .map(|line| {
            vec![
                line.supplier.name.clone(),
                line.invoice_count.to_string(),
                line.total_amount.format(),
                line.credit_note_count.to_string(),
                line.total_credit_amount.format(),
                line.net_amount.format(),
            ]
        })
        .collect();
    output::title("Détail par fournisseur");
    output::table(
        &["Fournisseur", "Factures", "Montant", "Avoirs", "Montant avoirs", "Net"],
        &rows,
    );

    if let Some(dir) = pdf_dir {
        let path = monthly_report_pdf(&report, Context::today())?.write_to(dir)?;
        output::message(&format!("PDF généré: {}", path.display()));
    }
    Ok(())
}
