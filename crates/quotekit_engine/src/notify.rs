//! Notification message composition.

use quotekit_schema::SchemaRegistry;

use crate::spec::{SpecInputData, SpecNotification};

/// Build the outbound message for a persisted document.
///
/// Returns `None` when the input carries no recipient.
pub fn compose_notification(
    registry: &SchemaRegistry,
    input: &SpecInputData,
    document_name: &str,
    location_ref: &str,
) -> Option<SpecNotification> {
    let recipient = input.email.as_deref()?.to_string();
    let label = registry.document_label(input.document_type);
    let identity = registry.email_identity();

    let mut l_lines: Vec<String> = vec![input.company_name.clone()];
    if !input.contact_name.is_empty() {
        l_lines.push(format!("{} 様", input.contact_name));
    } else {
        l_lines[0].push_str(" 御中");
    }
    l_lines.push(String::new());
    l_lines.push("いつもお世話になっております。".to_string());
    let c_sender_unit = if identity.sender_department.is_empty() {
        identity.sender_company.clone()
    } else {
        format!("{} {}", identity.sender_company, identity.sender_department)
    };
    l_lines.push(format!("{c_sender_unit}の{}です。", identity.sender_name));
    l_lines.push(String::new());
    l_lines.push(format!("{label}をお送りいたします。ご確認のほどよろしくお願いいたします。"));
    l_lines.push(String::new());
    l_lines.push(format!("書類名: {document_name}"));
    l_lines.push(format!("保存先: {location_ref}"));
    l_lines.push(String::new());
    l_lines.push("--".to_string());
    l_lines.push(identity.sender_company.clone());
    if !identity.sender_department.is_empty() {
        l_lines.push(identity.sender_department.clone());
    }
    l_lines.push(identity.sender_name.clone());

    Some(SpecNotification {
        recipient,
        subject: format!("【{label}】{} 様", input.company_name),
        body: l_lines.join("\n") + "\n",
        attachment_ref: location_ref.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use quotekit_schema::{EnumDocumentType, SchemaRegistry, derive_default_schema_raw};
    use rust_decimal::Decimal;

    use super::compose_notification;
    use crate::spec::{SpecClaimedTotals, SpecInputData};

    fn registry(department: &str) -> SchemaRegistry {
        let mut raw = derive_default_schema_raw();
        raw.tax.rate = Some(Decimal::new(10, 2));
        raw.email.sender_department = department.to_string();
        SchemaRegistry::from_raw(&raw).unwrap()
    }

    fn input(contact: &str, email: Option<&str>) -> SpecInputData {
        SpecInputData {
            document_type: EnumDocumentType::Invoice,
            issue_date: NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
            company_name: "ACME株式会社".to_string(),
            contact_name: contact.to_string(),
            address: String::new(),
            email: email.map(str::to_string),
            remarks: String::new(),
            items: vec![],
            claimed: SpecClaimedTotals::default(),
        }
    }

    #[test]
    fn subject_and_signature_follow_identity() {
        let msg = compose_notification(
            &registry("営業部"),
            &input("佐藤花子", Some("hanako@acme.example")),
            "請求書_ACME株式会社_20240401",
            "file:///srv/請求書/a.xlsx",
        )
        .unwrap();
        assert_eq!(msg.recipient, "hanako@acme.example");
        assert_eq!(msg.subject, "【請求書】ACME株式会社 様");
        assert!(msg.body.starts_with("ACME株式会社\n佐藤花子 様\n"));
        assert!(msg.body.contains("株式会社サンプル 営業部の山田太郎です。"));
        assert!(msg.body.contains("書類名: 請求書_ACME株式会社_20240401"));
        assert!(msg.body.ends_with("株式会社サンプル\n営業部\n山田太郎\n"));
        assert_eq!(msg.attachment_ref, "file:///srv/請求書/a.xlsx");
    }

    #[test]
    fn missing_contact_and_department_are_omitted() {
        let msg = compose_notification(
            &registry(""),
            &input("", Some("hanako@acme.example")),
            "doc",
            "loc",
        )
        .unwrap();
        assert!(msg.body.starts_with("ACME株式会社 御中\n\n"));
        assert!(msg.body.contains("株式会社サンプルの山田太郎です。"));
        assert!(msg.body.ends_with("--\n株式会社サンプル\n山田太郎\n"));
    }

    #[test]
    fn no_recipient_means_no_message() {
        assert!(
            compose_notification(&registry("営業部"), &input("x", None), "doc", "loc").is_none()
        );
    }
}
