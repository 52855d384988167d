//! Subcommand bodies, kept free of argument parsing and printing.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use quotekit_engine::memory::{MemoryDocumentStore, MemoryHistoryLog, RecordingNotifier};
use quotekit_engine::{
    DocumentGenerator, DocumentStore, HistoryLog, Notifier, ReportGeneration,
    SpecGenerateRequest,
};
use quotekit_io_fs::{EnumPatternMode, ReportBackup, SpecBackupOptions, backup_folders};
use quotekit_io_xlsx::{XlsxDocumentStore, XlsxWorkbook};
use quotekit_manifest::{CsvHistoryLog, SpecHistoryTable, read_history};
use quotekit_schema::{EnumDocumentType, EnumSheetRole, SchemaRegistry};

use crate::config::SpecAppConfig;
use crate::notify::SmtpNotifier;

/// Lock files Excel leaves next to open workbooks.
const PATTERN_EXCEL_LOCK: &str = "~$*";

/// Switches of the `generate` subcommand.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpecGenerateArgs {
    pub if_notify: bool,
    pub if_dry_run: bool,
}

/// Run one generation from the input workbook at `path_input`.
///
/// A dry run renders into memory and records nothing on disk; notifications
/// are composed but not sent.
pub fn run_generate(
    path_config: &Path,
    path_input: &Path,
    spec_args: SpecGenerateArgs,
) -> anyhow::Result<ReportGeneration> {
    let config = SpecAppConfig::from_path(path_config)?;
    let registry = &config.registry;
    let input = XlsxWorkbook::open(
        path_input,
        BTreeMap::from([(
            EnumSheetRole::Input,
            registry.input_sheet().to_string(),
        )]),
    )?;
    let request = SpecGenerateRequest {
        if_notify: spec_args.if_notify,
        timestamp: None,
    };

    if spec_args.if_dry_run {
        tracing::info!("dry run: documents, history and mail stay in memory");
        return generate_with(
            registry,
            MemoryDocumentStore::new(),
            MemoryHistoryLog::new(),
            Some(RecordingNotifier::new()),
            &input,
            &request,
        );
    }

    let documents = XlsxDocumentStore::new(config.xlsx_store_options());
    let history = CsvHistoryLog::open(&config.path_history, registry.history_labels())?;
    let notifier = match (&config.smtp, spec_args.if_notify) {
        (Some(spec_smtp), true) => Some(SmtpNotifier::from_config(spec_smtp)?),
        _ => None,
    };
    generate_with(registry, documents, history, notifier, &input, &request)
}

fn generate_with<D, H, N>(
    registry: &SchemaRegistry,
    documents: D,
    history: H,
    notifier: Option<N>,
    input: &XlsxWorkbook,
    request: &SpecGenerateRequest,
) -> anyhow::Result<ReportGeneration>
where
    D: DocumentStore,
    H: HistoryLog,
    N: Notifier,
{
    let mut generator = DocumentGenerator::new(registry, documents, history, notifier);
    let report = generator
        .generate(input, request)
        .context("document generation failed")?;
    Ok(report)
}

/// Validate the configuration and describe what it resolved to.
pub fn run_check_config(path_config: &Path) -> anyhow::Result<Vec<String>> {
    let config = SpecAppConfig::from_path(path_config)?;
    let registry = &config.registry;

    let mut l_lines = vec![
        format!(
            "sheets: input={} template={} history={}",
            registry.input_sheet(),
            registry.template_sheet(),
            registry
                .sheet_name(EnumSheetRole::History)
                .unwrap_or("(csv only)"),
        ),
        format!(
            "items: input={} template rows={}",
            registry.input_item_range(),
            registry.template_item_window().max_rows,
        ),
        format!("root: {}", config.path_dir_root.display()),
    ];
    for document_type in EnumDocumentType::ALL {
        let path_template = &config.dict_templates[&document_type];
        l_lines.push(format!(
            "{document_type}: label={} folder={} template={}{}",
            registry.document_label(document_type),
            registry.folder(document_type),
            path_template.display(),
            if path_template.is_file() { "" } else { " (missing)" },
        ));
    }
    l_lines.push(format!("history: {}", config.path_history.display()));
    l_lines.push(format!(
        "smtp: {}",
        config
            .smtp
            .as_ref()
            .map(|s| format!("{}:{}", s.host, s.port))
            .unwrap_or_else(|| "disabled".to_string())
    ));
    Ok(l_lines)
}

/// Switches of the `backup` subcommand.
#[derive(Debug, Clone, Default)]
pub struct SpecBackupArgs {
    pub patterns: Vec<String>,
    pub num_workers_max: Option<usize>,
    pub if_dry_run: bool,
}

/// Copy both document folders into the backup folder.
pub fn run_backup(path_config: &Path, spec_args: &SpecBackupArgs) -> anyhow::Result<ReportBackup> {
    let config = SpecAppConfig::from_path(path_config)?;
    let registry = &config.registry;
    let l_folders = EnumDocumentType::ALL
        .iter()
        .map(|t| registry.folder(*t))
        .collect::<Vec<_>>();

    let spec_options = SpecBackupOptions {
        patterns_include: (!spec_args.patterns.is_empty()).then(|| spec_args.patterns.clone()),
        patterns_exclude: Some(vec![PATTERN_EXCEL_LOCK.to_string()]),
        rule_pattern: EnumPatternMode::Glob,
        num_workers_max: spec_args.num_workers_max,
        if_dry_run: spec_args.if_dry_run,
        ..SpecBackupOptions::default()
    };
    let report = backup_folders(
        &config.path_dir_root,
        &l_folders,
        registry.backup_folder(),
        &spec_options,
    )?;
    Ok(report)
}

pub fn run_history(path_config: &Path) -> anyhow::Result<SpecHistoryTable> {
    let config = SpecAppConfig::from_path(path_config)?;
    if !config.path_history.exists() {
        return Ok(SpecHistoryTable {
            headers: config.registry.history_labels(),
            rows: Vec::new(),
        });
    }
    Ok(read_history(&config.path_history)?)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::fs;
    use std::path::Path;

    use chrono::NaiveDate;
    use quotekit_engine::{CellStore, EnumCellValue, EnumNotificationStatus};
    use quotekit_io_xlsx::XlsxWorkbook;
    use quotekit_schema::{EnumSheetRole, SpecCellCoordinate};
    use rust_decimal::Decimal;

    use super::{
        SpecBackupArgs, SpecGenerateArgs, run_backup, run_check_config, run_generate, run_history,
    };
    use crate::config::tests::{derive_test_config_raw, write_test_config};

    fn coord(a1: &str) -> SpecCellCoordinate {
        SpecCellCoordinate::from_a1(a1).unwrap()
    }

    fn seed_workspace(path_dir: &Path) -> (std::path::PathBuf, std::path::PathBuf) {
        let path_config = write_test_config(path_dir, &derive_test_config_raw());

        fs::create_dir_all(path_dir.join("templates")).unwrap();
        for name in ["estimate.xlsx", "invoice.xlsx"] {
            let mut template =
                XlsxWorkbook::new().with_sheet(EnumSheetRole::Template, "テンプレート");
            template
                .write_cell(EnumSheetRole::Template, coord("H1"), "株式会社サンプル".into())
                .unwrap();
            template.save(&path_dir.join("templates").join(name)).unwrap();
        }

        let mut input = XlsxWorkbook::new().with_sheet(EnumSheetRole::Input, "入力");
        let l_cells: [(&str, EnumCellValue); 12] = [
            ("B2", "請求書".into()),
            ("B3", NaiveDate::from_ymd_opt(2024, 4, 1).unwrap().into()),
            ("B4", "ACME".into()),
            ("B5", "花子".into()),
            ("B6", "東京都千代田区1-1".into()),
            ("B8", "お支払いは月末まで".into()),
            ("A10", "Widget".into()),
            ("B10", Decimal::from(2).into()),
            ("C10", Decimal::from(1000).into()),
            ("D10", Decimal::from(2000).into()),
            ("F15", Decimal::from(2000).into()),
            ("F17", Decimal::from(2200).into()),
        ];
        for (a1, value) in l_cells {
            input.write_cell(EnumSheetRole::Input, coord(a1), value).unwrap();
        }
        let path_input = path_dir.join("input.xlsx");
        input.save(&path_input).unwrap();
        (path_config, path_input)
    }

    #[test]
    fn generate_backup_and_history_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let (path_config, path_input) = seed_workspace(dir.path());

        let report = run_generate(&path_config, &path_input, SpecGenerateArgs::default()).unwrap();
        assert_eq!(report.document_name, "請求書_ACME_20240401");
        assert_eq!(report.totals.tax, Decimal::from(200));
        assert!(!report.outcome.is_flagged());
        assert_eq!(report.notification, EnumNotificationStatus::NotRequested);

        let path_document = dir
            .path()
            .join("docs")
            .join("請求書")
            .join("請求書_ACME_20240401.xlsx");
        let document = XlsxWorkbook::open(
            &path_document,
            BTreeMap::from([(EnumSheetRole::Template, "テンプレート".to_string())]),
        )
        .unwrap();
        assert_eq!(
            document.read_cell(EnumSheetRole::Template, coord("F17")).unwrap(),
            EnumCellValue::Number(Decimal::from(2200))
        );
        assert_eq!(
            document.read_cell(EnumSheetRole::Template, coord("A4")).unwrap(),
            EnumCellValue::Text("ACME".to_string())
        );

        let table = run_history(&path_config).unwrap();
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0][1], "請求書");
        assert_eq!(table.rows[0][2], "ACME");

        let report_backup = run_backup(&path_config, &SpecBackupArgs::default()).unwrap();
        assert_eq!(report_backup.cnt_copied, 1);
        assert!(
            dir.path()
                .join("docs")
                .join("バックアップ")
                .join("請求書")
                .join("請求書_ACME_20240401.xlsx")
                .is_file()
        );
    }

    #[test]
    fn dry_run_touches_nothing_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let (path_config, path_input) = seed_workspace(dir.path());

        let report = run_generate(
            &path_config,
            &path_input,
            SpecGenerateArgs {
                if_notify: true,
                if_dry_run: true,
            },
        )
        .unwrap();
        assert_eq!(report.notification, EnumNotificationStatus::NoRecipient);
        assert!(!dir.path().join("docs").exists());
        assert!(!dir.path().join("history.csv").exists());
        assert!(run_history(&path_config).unwrap().rows.is_empty());
    }

    #[test]
    fn check_config_lists_templates() {
        let dir = tempfile::tempdir().unwrap();
        let (path_config, _) = seed_workspace(dir.path());
        let l_lines = run_check_config(&path_config).unwrap();
        assert!(l_lines.iter().any(|l| l.starts_with("invoice: label=請求書 folder=請求書")));
        assert!(l_lines.iter().all(|l| !l.contains("(missing)")));
        assert_eq!(l_lines.last().map(String::as_str), Some("smtp: disabled"));
    }
}
