//! Read-only views over persisted history: product rows in Postgres and the
//! JSON report histories.

use shelfwatch_core::{AppConfig, ProductRecord};
use shelfwatch_db::{PgProductStore, ProductStore, Report, ReportStore, REPORT_DATE_FORMAT};

pub(crate) fn print_records(currency: &str, records: &[ProductRecord]) {
    if records.is_empty() {
        println!("no products extracted");
        return;
    }
    for record in records {
        println!("{}", record_line(currency, record));
    }
    println!("{} product(s)", records.len());
}

fn record_line(currency: &str, record: &ProductRecord) -> String {
    format!(
        "{currency}{} | {} | {} | {} | {} | {}",
        record.price,
        record.name,
        record.seller,
        record.weight,
        record.pet_category,
        record.source_url
    )
}

/// Prints the newest `limit` product history rows.
///
/// # Errors
///
/// Returns an error if `DATABASE_URL` is not set or the query fails.
pub(crate) async fn history(config: &AppConfig, limit: i64) -> anyhow::Result<()> {
    if config.database_url.is_none() {
        anyhow::bail!("DATABASE_URL is not set; product history is only kept in Postgres");
    }
    let pool = shelfwatch_db::connect_pool_from_config(config).await?;
    shelfwatch_db::run_migrations(&pool).await?;
    let rows = PgProductStore::new(pool).recent_rows(limit).await?;

    if rows.is_empty() {
        println!("no product history rows");
        return Ok(());
    }
    for row in &rows {
        println!(
            "{} | {} | {}{} | {} | {} | {} | {}",
            row.run_at.format("%Y-%m-%d %H:%M:%S"),
            row.report_name,
            config.scrape.currency,
            row.price,
            row.product_name,
            row.seller,
            row.weight,
            row.pet
        );
    }
    Ok(())
}

/// Prints the most recent report of the history called `name`.
///
/// # Errors
///
/// Returns an error if the name is invalid or the history cannot be read.
pub(crate) fn report(config: &AppConfig, name: &str) -> anyhow::Result<()> {
    let store = ReportStore::new(&config.reports_dir);
    match store.latest(name)? {
        Some(report) => print!("{}", report_summary(&report)),
        None => println!("no reports for '{name}' in {}", store.dir().display()),
    }
    Ok(())
}

fn report_summary(report: &Report) -> String {
    let best = report.best_item.as_ref().map_or_else(
        || "none".to_string(),
        |item| record_line(&report.currency, item),
    );
    format!(
        "title:    {}\ndate:     {}\nbest:     {}\nproducts: {}\n",
        report.title,
        report.date.format(REPORT_DATE_FORMAT),
        best,
        report.products.len()
    )
}
