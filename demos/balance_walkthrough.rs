use statement_analytics::{
    format_optional, AnalyticsConfig, CsvSheetWriter, DerivedView, EditController, EditQueue,
    EditRejection, EditRequest, LineItem, Statement, StatementKind, ViewObserver, ViewUpdate,
};

struct ConsoleObserver;

impl ViewObserver for ConsoleObserver {
    fn view_refreshed(&mut self, update: &ViewUpdate, _queue: &mut EditQueue) {
        println!(
            "\nEdited {} [{}] -> {}",
            update.request.code,
            update.request.year,
            format_optional(update.value, "N/A")
        );
        for (code, total) in &update.totals {
            println!("  total {} = {:.2}", code, total);
        }
        if let Some(c) = update.coefficients {
            println!(
                "  coefficients [{}]: K1 = {:.4}, K2 = {:.4}, liquidity = {:.4}",
                c.year, c.k1, c.k2, c.liquidity
            );
        }
        print_view(&update.view);
    }

    fn edit_rejected(&mut self, rejection: &EditRejection, _queue: &mut EditQueue) {
        println!(
            "\nRejected {} [{}] '{}': {} (cell shows {})",
            rejection.request.code,
            rejection.request.year,
            rejection.request.raw_text,
            rejection.error,
            format_optional(rejection.committed_value, "N/A")
        );
    }
}

fn print_view(view: &DerivedView) {
    println!("  {} {}", view.kind.title(), view.year);
    for section in &view.sections {
        if let Some(name) = &section.name {
            println!("  {}", name);
        }
        for row in &section.rows {
            let indent = if row.is_subitem { "    " } else { "  " };
            println!(
                "{}{:<40} {:>14} {:>14} {:>9} {:>14}",
                indent,
                row.label,
                format_optional(row.values.current, "N/A"),
                format_optional(row.values.previous, "N/A"),
                format_optional(row.values.growth_rate, "N/A"),
                format_optional(row.values.absolute_deviation, "N/A"),
            );
        }
    }
}

fn main() -> anyhow::Result<()> {
    let section = "I. ВНЕОБОРОТНЫЕ АКТИВЫ";
    let statement = Statement::new(
        StatementKind::Balance,
        [2013, 2014, 2015],
        vec![
            LineItem::new("1110", "Нематериальные активы")
                .in_section(section)
                .with_value(2014, 290000.0)
                .with_value(2015, 293430.0),
            LineItem::new("1120", "Результаты исследований и разработок")
                .in_section(section)
                .with_value(2015, 169.0),
            LineItem::new("1140", "Материальные поисковые активы")
                .in_section(section)
                .with_value(2015, 37388.0),
            LineItem::new("1160", "Доходные вложения в материальные ценности")
                .in_section(section)
                .with_value(2015, 1500.0),
            LineItem::new("1170", "Финансовые вложения")
                .in_section(section)
                .with_value(2015, 101566.0),
            LineItem::new("1100", "Итого по разделу I").in_section(section),
            LineItem::new("1600", "БАЛАНС"),
            LineItem::new("1510", "Заемные средства")
                .in_section("V. КРАТКОСРОЧНЫЕ ОБЯЗАТЕЛЬСТВА")
                .with_value(2015, 50977.0),
        ],
    )?;

    let mut controller = EditController::with_observer(AnalyticsConfig::default(), ConsoleObserver);
    controller.load(statement);

    controller.enqueue(EditRequest::new(StatementKind::Balance, "1120", 2015, "169"));
    controller.enqueue(EditRequest::new(StatementKind::Balance, "1110", 2014, "295 000"));
    controller.enqueue(EditRequest::new(StatementKind::Balance, "1100", 2015, "1"));
    controller.enqueue(EditRequest::new(StatementKind::Balance, "1170", 2015, "abc"));
    controller.process_pending();

    println!("\nCSV export:");
    let mut writer = CsvSheetWriter::new(std::io::stdout());
    controller.export(StatementKind::Balance, &mut writer)?;

    Ok(())
}
