//! Layout constants and default preset factories.

use crate::spec::{
    EnumHistoryHeaderRaw, SpecDispatchPolicy, SpecDocumentLabels, SpecEmailIdentity,
    SpecFieldMapRaw, SpecFoldersRaw, SpecInputRangesRaw, SpecSchemaRaw, SpecSheetsRaw,
    SpecTaxPolicyRaw, SpecTemplateRangesRaw,
};

/// Worksheet maximum row count.
pub const N_NROWS_SHEET_MAX: u32 = 1_048_576;
/// Worksheet maximum column count.
pub const N_NCOLS_SHEET_MAX: u32 = 16_384;
/// Sheet name maximum length.
pub const N_LEN_SHEET_NAME_MAX: usize = 31;
/// Characters not allowed in sheet names.
pub const TUP_SHEET_NAME_ILLEGAL: [char; 7] = ['*', ':', '?', '/', '\\', '[', ']'];
/// Item columns: name, quantity, unit price, subtotal.
pub const N_ITEM_COLUMNS: u32 = 4;
/// Largest supported currency scale.
pub const N_CURRENCY_SCALE_MAX: u32 = 4;

/// Default literal labels per document type.
pub fn derive_default_document_labels() -> SpecDocumentLabels {
    SpecDocumentLabels {
        estimate: "見積書".to_string(),
        invoice: "請求書".to_string(),
    }
}

/// Default history header labels, in positional column order.
pub fn derive_default_history_headers() -> Vec<EnumHistoryHeaderRaw> {
    [
        "送信日時",
        "書類種別",
        "宛先会社",
        "メールアドレス",
        "ファイル名",
        "ファイルURL",
    ]
    .into_iter()
    .map(|c_label| EnumHistoryHeaderRaw::Label(c_label.to_string()))
    .collect()
}

/// Build the stock form layout.
///
/// The tax rate is left unset on purpose: the registry refuses to load until
/// the caller supplies one.
pub fn derive_default_schema_raw() -> SpecSchemaRaw {
    let cell = |a1: &str| Some(a1.to_string());

    SpecSchemaRaw {
        sheets: SpecSheetsRaw {
            input: "入力".to_string(),
            template: "テンプレート".to_string(),
            history: None,
        },
        cells: SpecFieldMapRaw {
            document_type: cell("B2"),
            issue_date: cell("B3"),
            company_name: cell("B4"),
            contact_name: cell("B5"),
            address: cell("B6"),
            email: cell("B7"),
            remarks: cell("B8"),
            total_amount: cell("F15"),
            tax: cell("F16"),
            grand_total: cell("F17"),
        },
        ranges: SpecInputRangesRaw {
            items: "A10:D14".to_string(),
        },
        template_cells: SpecFieldMapRaw {
            document_type: cell("A1"),
            issue_date: cell("F2"),
            company_name: cell("A4"),
            contact_name: cell("A5"),
            address: cell("A6"),
            email: None,
            remarks: cell("A20"),
            total_amount: cell("F15"),
            tax: cell("F16"),
            grand_total: cell("F17"),
        },
        template_ranges: SpecTemplateRangesRaw {
            items_start_row: 10,
            items_max_rows: 5,
            items_start_column: None,
        },
        folders: SpecFoldersRaw {
            estimates: "見積書".to_string(),
            invoices: "請求書".to_string(),
            backup: "バックアップ".to_string(),
        },
        email: SpecEmailIdentity {
            sender_company: "株式会社サンプル".to_string(),
            sender_department: "営業部".to_string(),
            sender_name: "山田太郎".to_string(),
        },
        history_headers: derive_default_history_headers(),
        labels: derive_default_document_labels(),
        tax: SpecTaxPolicyRaw::default(),
        dispatch: SpecDispatchPolicy::default(),
    }
}
