//! Application configuration: schema, storage and optional SMTP sections.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use quotekit_io_fs::EnumFileConflictStrategy;
use quotekit_io_xlsx::SpecXlsxStoreOptions;
use quotekit_schema::{EnumDocumentType, SchemaRegistry, SpecSchemaRaw};
use serde::{Deserialize, Serialize};

/// Name conflict policy as written in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnumNameConflictRaw {
    #[default]
    Rename,
    Overwrite,
    Error,
}

impl EnumNameConflictRaw {
    pub fn strategy(self) -> EnumFileConflictStrategy {
        match self {
            EnumNameConflictRaw::Rename => EnumFileConflictStrategy::Rename,
            EnumNameConflictRaw::Overwrite => EnumFileConflictStrategy::Overwrite,
            EnumNameConflictRaw::Error => EnumFileConflictStrategy::Error,
        }
    }
}

/// Template workbook per document type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpecTemplatePathsRaw {
    pub estimate: PathBuf,
    pub invoice: PathBuf,
}

/// Where documents, templates and the history file live.
///
/// Relative paths are resolved against the configuration file's folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpecStorageRaw {
    /// Folder holding the document folders and the backup folder.
    pub root: PathBuf,
    pub templates: SpecTemplatePathsRaw,
    /// CSV history file.
    pub history: PathBuf,
    #[serde(default)]
    pub on_name_conflict: EnumNameConflictRaw,
}

fn derive_default_smtp_port() -> u16 {
    587
}

fn derive_default_use_tls() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpecSmtpRaw {
    pub host: String,
    #[serde(default = "derive_default_smtp_port")]
    pub port: u16,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// Sender mailbox, e.g. `営業部 <sales@example.co.jp>`.
    pub from: String,
    #[serde(default = "derive_default_use_tls")]
    pub use_tls: bool,
}

/// Whole configuration file as deserialized from YAML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpecAppConfigRaw {
    pub schema: SpecSchemaRaw,
    pub storage: SpecStorageRaw,
    #[serde(default)]
    pub smtp: Option<SpecSmtpRaw>,
}

/// Validated configuration with absolute storage paths.
#[derive(Debug, Clone)]
pub struct SpecAppConfig {
    pub registry: SchemaRegistry,
    pub path_dir_root: PathBuf,
    pub dict_templates: BTreeMap<EnumDocumentType, PathBuf>,
    pub path_history: PathBuf,
    pub rule_conflict: EnumFileConflictStrategy,
    pub smtp: Option<SpecSmtpRaw>,
}

impl SpecAppConfig {
    pub fn from_path(path_config: &Path) -> anyhow::Result<Self> {
        let txt = fs::read_to_string(path_config)
            .with_context(|| format!("failed to read config {}", path_config.display()))?;
        let raw: SpecAppConfigRaw = serde_yaml::from_str(&txt)
            .with_context(|| format!("failed to parse config {}", path_config.display()))?;
        let path_dir_base = path_config.parent().unwrap_or_else(|| Path::new("."));
        Self::from_raw(raw, path_dir_base)
            .with_context(|| format!("invalid config {}", path_config.display()))
    }

    pub fn from_raw(raw: SpecAppConfigRaw, path_dir_base: &Path) -> anyhow::Result<Self> {
        let registry = SchemaRegistry::from_raw(&raw.schema)?;
        let resolve = |path: &Path| {
            if path.is_absolute() {
                path.to_path_buf()
            } else {
                path_dir_base.join(path)
            }
        };

        Ok(Self {
            path_dir_root: resolve(&raw.storage.root),
            dict_templates: BTreeMap::from([
                (
                    EnumDocumentType::Estimate,
                    resolve(&raw.storage.templates.estimate),
                ),
                (
                    EnumDocumentType::Invoice,
                    resolve(&raw.storage.templates.invoice),
                ),
            ]),
            path_history: resolve(&raw.storage.history),
            rule_conflict: raw.storage.on_name_conflict.strategy(),
            smtp: raw.smtp,
            registry,
        })
    }

    pub fn xlsx_store_options(&self) -> SpecXlsxStoreOptions {
        SpecXlsxStoreOptions {
            path_dir_root: self.path_dir_root.clone(),
            dict_templates: self.dict_templates.clone(),
            template_sheet: self.registry.template_sheet().to_string(),
            rule_conflict: self.rule_conflict,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::fs;
    use std::path::{Path, PathBuf};

    use quotekit_io_fs::EnumFileConflictStrategy;
    use quotekit_schema::{EnumDocumentType, derive_default_schema_raw};
    use rust_decimal::Decimal;

    use super::{
        EnumNameConflictRaw, SpecAppConfig, SpecAppConfigRaw, SpecStorageRaw,
        SpecTemplatePathsRaw,
    };

    /// Default layout with a 10% tax rate and relative storage paths.
    pub(crate) fn derive_test_config_raw() -> SpecAppConfigRaw {
        let mut schema = derive_default_schema_raw();
        schema.tax.rate = Some(Decimal::new(10, 2));
        SpecAppConfigRaw {
            schema,
            storage: SpecStorageRaw {
                root: PathBuf::from("docs"),
                templates: SpecTemplatePathsRaw {
                    estimate: PathBuf::from("templates/estimate.xlsx"),
                    invoice: PathBuf::from("templates/invoice.xlsx"),
                },
                history: PathBuf::from("history.csv"),
                on_name_conflict: EnumNameConflictRaw::Rename,
            },
            smtp: None,
        }
    }

    pub(crate) fn write_test_config(path_dir: &Path, raw: &SpecAppConfigRaw) -> PathBuf {
        let path_config = path_dir.join("quotekit.yaml");
        fs::write(&path_config, serde_yaml::to_string(raw).unwrap()).unwrap();
        path_config
    }

    #[test]
    fn relative_paths_resolve_against_config_folder() {
        let dir = tempfile::tempdir().unwrap();
        let path_config = write_test_config(dir.path(), &derive_test_config_raw());

        let config = SpecAppConfig::from_path(&path_config).unwrap();
        assert_eq!(config.path_dir_root, dir.path().join("docs"));
        assert_eq!(config.path_history, dir.path().join("history.csv"));
        assert_eq!(
            config.dict_templates[&EnumDocumentType::Invoice],
            dir.path().join("templates/invoice.xlsx")
        );
        assert_eq!(config.rule_conflict, EnumFileConflictStrategy::Rename);
        assert_eq!(config.xlsx_store_options().template_sheet, "テンプレート");
    }

    #[test]
    fn missing_tax_rate_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut raw = derive_test_config_raw();
        raw.schema.tax.rate = None;
        let path_config = write_test_config(dir.path(), &raw);
        assert!(SpecAppConfig::from_path(&path_config).is_err());
    }

    #[test]
    fn smtp_defaults_apply() {
        let txt = "host: smtp.example.co.jp\nfrom: sales@example.co.jp\n";
        let smtp: super::SpecSmtpRaw = serde_yaml::from_str(txt).unwrap();
        assert_eq!(smtp.port, 587);
        assert!(smtp.use_tls);
        assert_eq!(smtp.user, None);
    }
}
