use statement_analytics::*;
use std::io::Write;

fn text(s: &str) -> Cell {
    Cell::from(s)
}

fn num(n: f64) -> Cell {
    Cell::from(n)
}

/// Balance sheet as printed: reporting year first, then the two prior years.
fn balance_sheet() -> Vec<Vec<Cell>> {
    vec![
        vec![text("Бухгалтерский баланс на 31 декабря 2015 г.")],
        vec![],
        vec![text("Организация: ООО \"Ромашка\"")],
        vec![
            text("Наименование показателя"),
            text("Код"),
            text("На 31 декабря 2015 г."),
            text("На 31 декабря 2014 г."),
            text("На 31 декабря 2013 г."),
        ],
        vec![text("АКТИВ")],
        vec![text("I. ВНЕОБОРОТНЫЕ АКТИВЫ")],
        vec![
            text("Нематериальные активы"),
            num(1110.0),
            num(293430.0),
            num(290000.0),
            num(280000.0),
        ],
        vec![text("Результаты исследований и разработок"), num(1120.0), num(169.0), num(150.0)],
        vec![text("Нематериальные поисковые активы"), num(1130.0), num(0.0), num(0.0), num(0.0)],
        vec![text("Материальные поисковые активы"), num(1140.0), text("37 388"), text("30 000")],
        vec![text("Основные средства"), num(1150.0), num(0.0), text("-"), text("-")],
        vec![
            text("Доходные вложения в материальные ценности"),
            num(1160.0),
            num(1500.0),
            num(1500.0),
        ],
        vec![text("Финансовые вложения"), num(1170.0), num(101566.0), num(90000.0)],
        vec![text("Итого по разделу I"), num(1100.0), num(434053.0), num(400000.0)],
        vec![text("II. ОБОРОТНЫЕ АКТИВЫ")],
        vec![text("Запасы"), text("1210"), num(5000.0), num(4000.0)],
        vec![text("  в том числе сырье"), text(""), num(1200.0), num(1000.0)],
        vec![text("Итого по разделу II"), num(1200.0), num(5000.0), num(4000.0)],
        vec![text("БАЛАНС"), num(1600.0), num(439053.0), num(404000.0)],
        vec![text("ПАССИВ")],
        vec![text("V. КРАТКОСРОЧНЫЕ ОБЯЗАТЕЛЬСТВА")],
        vec![text("Заемные средства"), num(1510.0), num(20000.0), num(15000.0)],
        vec![text("Кредиторская задолженность"), num(1520.0), num(30977.0), num(25000.0)],
        vec![text("Итого по разделу V"), num(1500.0), num(50977.0), num(40000.0)],
    ]
}

/// Profit and loss: code first, years in ascending order.
fn profit_loss_sheet() -> Vec<Vec<Cell>> {
    vec![
        vec![text(""), text("Отчет о финансовых результатах за 2015 г.")],
        vec![],
        vec![
            text("Код"),
            text("Наименование показателя"),
            text("За 2013 г."),
            text("За 2014 г."),
            text("За 2015 г."),
        ],
        vec![text("2110"), text("Выручка"), num(800.0), num(900.0), text("1 000")],
        vec![
            text("2120"),
            text("Себестоимость продаж"),
            text("(500)"),
            text("(550)"),
            text("(600)"),
        ],
        vec![text("2100"), text("Валовая прибыль (убыток)"), num(300.0), num(350.0), num(400.0)],
        vec![text("2210"), text("Коммерческие расходы"), text("н/д"), text("(50)"), text("(60)")],
        vec![text("2200"), text("Прибыль (убыток) от продаж"), num(300.0), num(300.0), num(340.0)],
    ]
}

fn workbook() -> InMemoryWorkbook {
    InMemoryWorkbook::new()
        .with_sheet("Баланс", balance_sheet())
        .with_sheet("Отчет о фин. результатах", profit_loss_sheet())
}

fn load_statements(config: &AnalyticsConfig) -> anyhow::Result<Vec<Statement>> {
    let loader = SpreadsheetLoader::new(config, 2015);
    Ok(loader.load_workbook(&mut workbook(), WorkbookProfile::financial_results())?)
}

fn balance_controller() -> anyhow::Result<EditController> {
    let config = AnalyticsConfig::default();
    let mut controller = EditController::new(config.clone());
    for statement in load_statements(&config)? {
        controller.load(statement);
    }
    Ok(controller)
}

#[test]
fn test_workbook_import() -> anyhow::Result<()> {
    let statements = load_statements(&AnalyticsConfig::default())?;
    assert_eq!(statements.len(), 2);

    let balance = &statements[0];
    assert_eq!(balance.kind(), StatementKind::Balance);
    assert_eq!(balance.years().iter().copied().collect::<Vec<_>>(), vec![2013, 2014, 2015]);
    assert_eq!(balance.find("1110").unwrap().value(2013), Some(280000.0));
    assert_eq!(balance.find("1140").unwrap().value(2015), Some(37388.0));
    assert_eq!(balance.find("1150").unwrap().value(2014), None);

    let subitem = balance
        .items()
        .iter()
        .find(|item| item.label == "в том числе сырье")
        .unwrap();
    assert!(subitem.is_subitem);
    assert!(subitem.code.is_empty());
    assert_eq!(subitem.section.as_deref(), Some("II. ОБОРОТНЫЕ АКТИВЫ"));

    let profit_loss = &statements[1];
    assert_eq!(profit_loss.kind(), StatementKind::ProfitLoss);
    let cost_of_sales = profit_loss.find("2120").unwrap();
    assert_eq!(cost_of_sales.value(2013), Some(-500.0));
    assert_eq!(cost_of_sales.value(2015), Some(-600.0));
    assert_eq!(profit_loss.find("2210").unwrap().value(2013), None);
    assert_eq!(profit_loss.find("2110").unwrap().value(2015), Some(1000.0));

    Ok(())
}

#[test]
fn test_initial_view_hides_blank_rows() -> anyhow::Result<()> {
    let controller = balance_controller()?;
    assert_eq!(controller.selected_year(StatementKind::Balance)?, 2015);

    let view = controller.current_view(StatementKind::Balance)?;
    assert!(view.row("1150").is_none());
    assert!(view.row("1130").is_none());

    let intangibles = view.row("1110").unwrap();
    assert_eq!(intangibles.values.current, Some(293430.0));
    assert_eq!(intangibles.values.previous, Some(290000.0));
    assert!((intangibles.values.growth_rate.unwrap() - 293430.0 / 290000.0 * 100.0).abs() < 1e-9);
    assert_eq!(intangibles.values.absolute_deviation, Some(3430.0));

    let names: Vec<Option<&str>> = view.sections.iter().map(|s| s.name.as_deref()).collect();
    assert_eq!(
        names,
        vec![
            Some("I. ВНЕОБОРОТНЫЕ АКТИВЫ"),
            Some("II. ОБОРОТНЫЕ АКТИВЫ"),
            Some("V. КРАТКОСРОЧНЫЕ ОБЯЗАТЕЛЬСТВА"),
        ]
    );

    Ok(())
}

#[test]
fn test_edit_recomputes_section_total() -> anyhow::Result<()> {
    let mut controller = balance_controller()?;

    let outcomes = controller.submit(EditRequest::new(StatementKind::Balance, "1150", 2015, "0"));
    let update = outcomes[0].as_ref().unwrap();

    assert_eq!(update.value, Some(0.0));
    assert!(update.totals.contains(&("1100".to_string(), 434053.0)));
    assert!(update.totals.contains(&("1600".to_string(), 439053.0)));

    let coefficients = update.coefficients.unwrap();
    assert!((coefficients.k1 - 50977.0 / 439053.0).abs() < 1e-12);
    assert_eq!(controller.state(), ControllerState::Idle);

    Ok(())
}

#[test]
fn test_prior_year_edit_refreshes_selected_view() -> anyhow::Result<()> {
    let mut controller = balance_controller()?;

    let outcomes =
        controller.submit(EditRequest::new(StatementKind::Balance, "1110", 2014, "295 000"));
    let update = outcomes[0].as_ref().unwrap();

    // edited row, edited year
    assert_eq!(update.row.current, Some(295000.0));
    assert_eq!(update.row.previous, Some(280000.0));

    // 2014 totals rebuilt from members
    let stored = controller.store().get(StatementKind::Balance)?;
    assert_eq!(stored.find("1100").unwrap().value(2014), Some(416650.0));
    assert_eq!(stored.find("1600").unwrap().value(2014), Some(420650.0));
    assert_eq!(stored.find("1100").unwrap().value(2015), Some(434053.0));

    // 2015 view sees the new prior-year values
    assert_eq!(update.view.year, 2015);
    let row = update.view.row("1110").unwrap();
    assert_eq!(row.values.previous, Some(295000.0));
    assert_eq!(row.values.absolute_deviation, Some(293430.0 - 295000.0));
    let total = update.view.row("1100").unwrap();
    assert_eq!(total.values.previous, Some(416650.0));
    assert_eq!(total.values.absolute_deviation, Some(434053.0 - 416650.0));

    let coefficients = update.coefficients.unwrap();
    assert_eq!(coefficients.year, 2014);
    assert!((coefficients.k1 - 40000.0 / 420650.0).abs() < 1e-12);

    Ok(())
}

#[test]
fn test_rejected_edits_leave_store_untouched() -> anyhow::Result<()> {
    let mut controller = balance_controller()?;
    let before = controller.store().get(StatementKind::Balance)?.clone();

    let outcomes = controller.submit(EditRequest::new(StatementKind::Balance, "1100", 2015, "1"));
    let rejection = outcomes[0].as_ref().unwrap_err();
    assert!(matches!(rejection.error, AnalyticsError::ReadOnlyCell { .. }));
    assert_eq!(rejection.committed_value, Some(434053.0));

    let outcomes =
        controller.submit(EditRequest::new(StatementKind::Balance, "1110", 2015, "много"));
    let rejection = outcomes[0].as_ref().unwrap_err();
    assert!(matches!(rejection.error, AnalyticsError::InvalidInput { .. }));
    assert_eq!(rejection.committed_value, Some(293430.0));

    let outcomes = controller.submit(EditRequest::new(StatementKind::Balance, "9999", 2015, "1"));
    assert!(matches!(
        outcomes[0].as_ref().unwrap_err().error,
        AnalyticsError::NotFound(_)
    ));

    assert_eq!(controller.store().get(StatementKind::Balance)?, &before);
    assert_eq!(controller.state(), ControllerState::Idle);

    Ok(())
}

#[test]
fn test_queued_edits_apply_in_order() -> anyhow::Result<()> {
    let mut controller = balance_controller()?;

    controller.enqueue(EditRequest::new(StatementKind::Balance, "1210", 2015, "6 000"));
    controller.enqueue(EditRequest::new(StatementKind::Balance, "1210", 2015, "7 000"));
    controller.enqueue(EditRequest::new(StatementKind::Balance, "1210", 2015, "н/д"));
    assert_eq!(controller.pending(), 3);

    let outcomes = controller.process_pending();
    let values: Vec<Option<f64>> = outcomes
        .iter()
        .map(|o| o.as_ref().unwrap().value)
        .collect();
    assert_eq!(values, vec![Some(6000.0), Some(7000.0), None]);
    assert_eq!(controller.pending(), 0);

    let stored = controller.store().get(StatementKind::Balance)?;
    assert_eq!(stored.find("1210").unwrap().value(2015), None);
    assert_eq!(stored.find("1200").unwrap().value(2015), Some(0.0));

    Ok(())
}

#[test]
fn test_year_selection_and_profit_loss() -> anyhow::Result<()> {
    let mut controller = balance_controller()?;

    let view = controller.select_year(StatementKind::ProfitLoss, 2013)?;
    let revenue = view.row("2110").unwrap();
    assert_eq!(revenue.values.previous, None);
    assert_eq!(revenue.values.growth_rate, None);

    assert!(controller.coefficients(StatementKind::ProfitLoss)?.is_none());
    assert!(matches!(
        controller.select_year(StatementKind::ProfitLoss, 2016),
        Err(AnalyticsError::NotFound(_))
    ));
    assert_eq!(controller.selected_year(StatementKind::ProfitLoss)?, 2013);

    let outcomes =
        controller.submit(EditRequest::new(StatementKind::ProfitLoss, "2120", 2015, "(700)"));
    let update = outcomes[0].as_ref().unwrap();
    assert!(update.totals.contains(&("2100".to_string(), 300.0)));
    assert!(update.totals.contains(&("2200".to_string(), 240.0)));
    assert_eq!(update.view.year, 2013);

    Ok(())
}

#[test]
fn test_csv_export() -> anyhow::Result<()> {
    let controller = balance_controller()?;

    let mut writer = CsvSheetWriter::new(Vec::new());
    controller.export(StatementKind::Balance, &mut writer)?;
    let output = String::from_utf8(writer.into_inner()?)?;
    let lines: Vec<&str> = output.lines().collect();

    assert_eq!(
        lines[0],
        "Parameter,Current Year,Previous Year,Growth Rate %,Absolute Deviation"
    );
    assert_eq!(lines[1], "I. ВНЕОБОРОТНЫЕ АКТИВЫ,,,,");
    let total_line = "Итого по разделу I,\"434,053.00\",\"400,000.00\",108.51,\"34,053.00\"";
    assert!(lines.contains(&total_line));
    assert!(lines.contains(&"  в том числе сырье,\"1,200.00\",\"1,000.00\",120.00,200.00"));
    assert!(!output.contains("Основные средства"));

    Ok(())
}

#[test]
fn test_export_sheet_model() -> anyhow::Result<()> {
    let controller = balance_controller()?;
    let view = controller.current_view(StatementKind::Balance)?;
    let sheet = build_export_sheet(&view, controller.config());

    assert_eq!(sheet.name, "Balance Sheet");
    assert_eq!(sheet.number_format, "#,##0.00");

    let sections = sheet
        .rows
        .iter()
        .filter(|row| matches!(row, ExportRow::Section { span: 5, .. }))
        .count();
    assert_eq!(sections, view.sections.len());

    Ok(())
}

#[test]
fn test_json_file_store_round_trip() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let mut file_store = JsonFileStore::new(dir.path());

    let mut controller = balance_controller()?;
    controller.submit(EditRequest::new(StatementKind::Balance, "1110", 2014, "295 000"));
    controller.save_to(&mut file_store, StatementKind::Balance)?;
    assert!(file_store.saved_at(StatementKind::Balance).is_ok());

    let mut restored = EditController::new(AnalyticsConfig::default());
    assert!(matches!(
        restored.load_from(&file_store, StatementKind::ProfitLoss),
        Err(AnalyticsError::NotFound(_))
    ));
    restored.load_from(&file_store, StatementKind::Balance)?;

    assert_eq!(
        restored.current_view(StatementKind::Balance)?,
        controller.current_view(StatementKind::Balance)?
    );
    assert_eq!(
        restored
            .store()
            .find_by_code(StatementKind::Balance, "1100")?
            .value(2014),
        Some(416650.0)
    );

    Ok(())
}

#[test]
fn test_config_file_drives_import() -> anyhow::Result<()> {
    let mut file = tempfile::NamedTempFile::new()?;
    write!(
        file,
        r#"{{
            "absent_markers": ["нет"],
            "coefficient_ratios": {{
                "short_term_liabilities": 0.5,
                "cash": 0.2,
                "financial_investments": 0.0,
                "non_overdue_liabilities": 1.0
            }}
        }}"#
    )?;

    let config = AnalyticsConfig::from_json_file(file.path())?;
    assert_eq!(config.display_marker(), "нет");

    let rows = vec![
        vec![text("Затраты на производство")],
        vec![],
        vec![text("Наименование"), text("Код"), text("2015"), text("2014"), text("2013")],
        vec![text("Материальные затраты"), num(5610.0), num(100.0), text("нет")],
        vec![text("Расходы на оплату труда"), num(5620.0), num(50.0), num(40.0)],
        vec![text("Итого по элементам"), num(5640.0), text("N/A")],
    ];

    let loader = SpreadsheetLoader::new(&config, 2015);
    let result = loader.load_sheet(StatementKind::ProductionCosts, &rows);
    let err = result.unwrap_err();
    assert!(err.is_io());
    assert!(err.to_string().contains("row 6, column 3"));

    let statement = loader.load_sheet(StatementKind::ProductionCosts, &rows[..5])?;
    assert_eq!(statement.find("5610").unwrap().value(2014), None);

    let report = analyze_statement(&statement, 2015, &config)?;
    assert!(report.coefficients.is_none());

    let mut controller = EditController::new(config);
    controller.load(statement);
    let outcomes = controller.submit(EditRequest::new(
        StatementKind::ProductionCosts,
        "5610",
        2015,
        "нет",
    ));
    assert_eq!(outcomes[0].as_ref().unwrap().value, None);

    Ok(())
}

#[test]
fn test_missing_sheet_is_reported() {
    let config = AnalyticsConfig::default();
    let loader = SpreadsheetLoader::new(&config, 2015);
    let mut source = InMemoryWorkbook::new().with_sheet("Баланс", balance_sheet());

    let err = loader
        .load_workbook(&mut source, WorkbookProfile::financial_results())
        .unwrap_err();
    assert!(err.is_io());
    assert!(err.to_string().contains("Отчет о фин. результатах"));
}

#[test]
fn test_config_schema_generation() {
    let schema = AnalyticsConfig::schema_as_json().unwrap();
    assert!(schema.contains("absent_markers"));
    assert!(schema.contains("coefficient_ratios"));
}
