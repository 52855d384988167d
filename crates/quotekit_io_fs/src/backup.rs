//! Mirror document folders into a backup folder.

use std::fs;
use std::path::{Path, PathBuf};

use rayon::ThreadPoolBuilder;
use rayon::prelude::*;

use crate::report::{ReportBackup, ReportBackupBuilder};
use crate::spec::{BackupError, EnumFileConflictStrategy, SpecBackupOptions};
use crate::util::{
    SpecFilePatterns, calculate_worker_limit, copy_file_with_metadata, derive_available_path,
    is_overlap, validate_destination_path_safety,
};

#[derive(Debug, Clone)]
struct SpecBackupTask {
    path_file_src: PathBuf,
    path_file_dst: PathBuf,
}

type TypeCopyResult = (PathBuf, Result<(), String>);

/// Copy the files of `folders` (under `path_dir_root`) into
/// `path_dir_root/backup_folder/<folder>/`.
///
/// Only regular files directly inside each folder are considered. Missing
/// source folders produce a warning. Per-file failures are collected in the
/// report; only setup problems return `Err`.
pub fn backup_folders(
    path_dir_root: &Path,
    folders: &[&str],
    backup_folder: &str,
    spec_options: &SpecBackupOptions,
) -> Result<ReportBackup, BackupError> {
    validate_folder_name(backup_folder)?;
    for folder in folders {
        validate_folder_name(folder)?;
    }
    let spec_patterns = SpecFilePatterns::from_raw(
        spec_options.patterns_include.as_deref(),
        spec_options.patterns_exclude.as_deref(),
        spec_options.rule_pattern,
    )?;

    let path_dir_backup = path_dir_root.join(backup_folder);
    for folder in folders {
        let path_dir_src = path_dir_root.join(folder);
        if is_overlap(&path_dir_src, &path_dir_backup) {
            return Err(BackupError::SourceBackupOverlap {
                source: path_dir_src,
                backup: path_dir_backup,
            });
        }
    }

    let mut builder_report = ReportBackupBuilder::default();
    let mut l_tasks = Vec::new();
    for folder in folders {
        let path_dir_src = path_dir_root.join(folder);
        let path_dir_dst = path_dir_backup.join(folder);
        collect_folder_tasks(
            &path_dir_src,
            &path_dir_dst,
            &spec_patterns,
            spec_options,
            &mut builder_report,
            &mut l_tasks,
        );
    }

    if spec_options.if_dry_run {
        for _ in &l_tasks {
            builder_report.add_skipped();
        }
        return Ok(builder_report.build());
    }

    for folder in folders {
        let path_dir_dst = path_dir_backup.join(folder);
        fs::create_dir_all(&path_dir_dst).map_err(|e| BackupError::BackupInitFailed {
            path: path_dir_dst.clone(),
            message: e.to_string(),
        })?;
    }

    let n_workers_max = calculate_worker_limit(spec_options.num_workers_max);
    let l_results = run_backup_tasks(l_tasks, &path_dir_backup, n_workers_max, &mut builder_report);
    for (path_file_dst, res_copy) in l_results {
        match res_copy {
            Ok(()) => builder_report.add_copied(),
            Err(msg) => builder_report.add_error(path_file_dst, msg),
        }
    }

    let report = builder_report.build();
    tracing::info!(%report, "backup finished");
    Ok(report)
}

fn validate_folder_name(folder: &str) -> Result<(), BackupError> {
    let path = Path::new(folder);
    let if_single_component = path.components().count() == 1
        && matches!(path.components().next(), Some(std::path::Component::Normal(_)));
    if folder.trim().is_empty() || !if_single_component {
        return Err(BackupError::InvalidFolderName(folder.to_string()));
    }
    Ok(())
}

fn collect_folder_tasks(
    path_dir_src: &Path,
    path_dir_dst: &Path,
    spec_patterns: &SpecFilePatterns,
    spec_options: &SpecBackupOptions,
    builder_report: &mut ReportBackupBuilder,
    l_tasks: &mut Vec<SpecBackupTask>,
) {
    let iter_entries = match fs::read_dir(path_dir_src) {
        Ok(v) => v,
        Err(e) => {
            builder_report.add_warning(format!(
                "Source folder unavailable: {} ({e})",
                path_dir_src.display()
            ));
            return;
        }
    };

    let mut l_entries = iter_entries.filter_map(Result::ok).collect::<Vec<_>>();
    l_entries.sort_by_key(|entry| entry.file_name());

    for entry in l_entries {
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        if !file_type.is_file() {
            continue;
        }
        builder_report.add_scanned();

        let name_file = entry.file_name().to_string_lossy().into_owned();
        if !spec_patterns.is_selected(&name_file) {
            continue;
        }
        builder_report.add_matched();

        let path_file_dst = path_dir_dst.join(&name_file);
        let path_file_dst = if path_file_dst.is_dir() {
            builder_report.add_error(
                path_file_dst.clone(),
                format!("Destination is a directory: {}", path_file_dst.display()),
            );
            continue;
        } else if path_file_dst.exists() {
            match spec_options.rule_conflict {
                EnumFileConflictStrategy::Skip => {
                    builder_report.add_skipped();
                    continue;
                }
                EnumFileConflictStrategy::Error => {
                    builder_report.add_error(
                        path_file_dst.clone(),
                        format!("Destination exists: {}", path_file_dst.display()),
                    );
                    continue;
                }
                EnumFileConflictStrategy::Overwrite => path_file_dst,
                EnumFileConflictStrategy::Rename => derive_available_path(path_dir_dst, &name_file),
            }
        } else {
            path_file_dst
        };

        l_tasks.push(SpecBackupTask {
            path_file_src: entry.path(),
            path_file_dst,
        });
    }
}

fn run_backup_task(spec_task: &SpecBackupTask, path_dir_backup: &Path) -> TypeCopyResult {
    let res_copy = validate_destination_path_safety(&spec_task.path_file_dst, path_dir_backup)
        .and_then(|_| {
            copy_file_with_metadata(&spec_task.path_file_src, &spec_task.path_file_dst)
                .map_err(|e| e.to_string())
        });
    (spec_task.path_file_dst.clone(), res_copy)
}

fn run_backup_tasks(
    l_tasks: Vec<SpecBackupTask>,
    path_dir_backup: &Path,
    n_workers_max: usize,
    builder_report: &mut ReportBackupBuilder,
) -> Vec<TypeCopyResult> {
    if l_tasks.is_empty() {
        return Vec::new();
    }
    if n_workers_max <= 1 {
        return l_tasks
            .iter()
            .map(|spec_task| run_backup_task(spec_task, path_dir_backup))
            .collect();
    }

    let Ok(thread_pool) = ThreadPoolBuilder::new().num_threads(n_workers_max).build() else {
        builder_report.add_warning(format!(
            "Failed to initialize thread pool (workers={n_workers_max}); fallback to serial copy."
        ));
        return l_tasks
            .iter()
            .map(|spec_task| run_backup_task(spec_task, path_dir_backup))
            .collect();
    };

    thread_pool.install(|| {
        l_tasks
            .par_iter()
            .map(|spec_task| run_backup_task(spec_task, path_dir_backup))
            .collect()
    })
}
