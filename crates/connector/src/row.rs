//! Positional row decoding.
//!
//! The gateway returns each ledger row as a fixed-width positional array in
//! a stable, documented column order. Decoding into a typed [`LedgerEntry`]
//! happens here, once, so nothing downstream ever indexes tuples.

use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;

use ledgersync_core::ledger::{normalize_revision_id, LedgerEntry};

use crate::error::{ConnectorError, Result};

// Gateway column order. Positions are part of the wire contract.
pub const COL_COMPANY_ID: usize = 0;
pub const COL_REVISION_ID: usize = 1;
pub const COL_TXN_ID: usize = 2;
pub const COL_LINE_NAME: usize = 3;
pub const COL_TXN_DATE: usize = 4;
pub const COL_TXN_TYPE: usize = 5;
pub const COL_DEBIT: usize = 6;
pub const COL_CREDIT: usize = 7;
pub const COL_ACCOUNT_NAME: usize = 8;
pub const COL_MEMO: usize = 9;

pub const COLUMN_COUNT: usize = 10;

fn column<'a>(row: &'a [Value], index: usize, name: &str) -> Result<&'a Value> {
    row.get(index).ok_or_else(|| {
        ConnectorError::decode(format!(
            "Row has {} columns, expected {} ('{}' at position {})",
            row.len(),
            COLUMN_COUNT,
            name,
            index
        ))
    })
}

/// The connector renders numeric fields inconsistently (a revision id can
/// arrive as the number 95278.0 or the string "95278"), so every scalar is
/// read permissively and normalized after.
fn text_at(row: &[Value], index: usize, name: &str) -> Result<String> {
    match column(row, index, name)? {
        Value::String(v) => Ok(v.clone()),
        Value::Number(v) => Ok(v.to_string()),
        Value::Null => Ok(String::new()),
        other => Err(ConnectorError::decode(format!(
            "Column '{}' at position {} has unsupported type: {}",
            name, index, other
        ))),
    }
}

fn required_text_at(row: &[Value], index: usize, name: &str) -> Result<String> {
    let value = text_at(row, index, name)?;
    if value.trim().is_empty() {
        return Err(ConnectorError::decode(format!(
            "Column '{}' at position {} is empty",
            name, index
        )));
    }
    Ok(value.trim().to_string())
}

fn decimal_at(row: &[Value], index: usize, name: &str) -> Result<Decimal> {
    let raw = text_at(row, index, name)?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(Decimal::ZERO);
    }
    Decimal::from_str(trimmed).map_err(|e| {
        ConnectorError::decode(format!(
            "Column '{}' at position {} is not a valid amount '{}': {}",
            name, index, trimmed, e
        ))
    })
}

fn date_at(row: &[Value], index: usize, name: &str) -> Result<String> {
    let raw = required_text_at(row, index, name)?;
    // Some drivers append a midnight time component to plain dates.
    let date_part = raw.split(|c| c == 'T' || c == ' ').next().unwrap_or(&raw);
    chrono::NaiveDate::parse_from_str(date_part, "%Y-%m-%d").map_err(|e| {
        ConnectorError::decode(format!(
            "Column '{}' at position {} is not an ISO date '{}': {}",
            name, index, raw, e
        ))
    })?;
    Ok(date_part.to_string())
}

/// Decode one positional gateway row into a typed ledger entry.
pub fn decode_row(row: &[Value]) -> Result<LedgerEntry> {
    let company_id = required_text_at(row, COL_COMPANY_ID, "company_id")?;
    let revision_id =
        normalize_revision_id(&required_text_at(row, COL_REVISION_ID, "revision_id")?);
    let txn_id = required_text_at(row, COL_TXN_ID, "txn_id")?;
    let line_name = required_text_at(row, COL_LINE_NAME, "line_name")?;
    let txn_date = date_at(row, COL_TXN_DATE, "txn_date")?;
    let txn_type = text_at(row, COL_TXN_TYPE, "txn_type")?;
    let debit = decimal_at(row, COL_DEBIT, "debit")?;
    let credit = decimal_at(row, COL_CREDIT, "credit")?;
    let account_name = text_at(row, COL_ACCOUNT_NAME, "account_name")?;
    let memo = text_at(row, COL_MEMO, "memo")?;

    Ok(LedgerEntry {
        company_id,
        revision_id,
        txn_id,
        line_name,
        txn_date,
        txn_type,
        debit,
        credit,
        account_name,
        memo: if memo.trim().is_empty() {
            None
        } else {
            Some(memo)
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn sample_row() -> Vec<Value> {
        vec![
            json!("acme"),
            json!(95278.0),
            json!("TXN-100"),
            json!("Office Supplies"),
            json!("2024-04-03"),
            json!("Bill"),
            json!("120.50"),
            json!(0),
            json!("Expenses:Office"),
            json!("April order"),
        ]
    }

    #[test]
    fn decodes_full_row_with_numeric_revision() {
        let entry = decode_row(&sample_row()).expect("decode");
        assert_eq!(entry.company_id, "acme");
        assert_eq!(entry.revision_id, "95278");
        assert_eq!(entry.txn_id, "TXN-100");
        assert_eq!(entry.line_name, "Office Supplies");
        assert_eq!(entry.txn_date, "2024-04-03");
        assert_eq!(entry.debit, dec!(120.50));
        assert_eq!(entry.credit, Decimal::ZERO);
        assert_eq!(entry.memo.as_deref(), Some("April order"));
    }

    #[test]
    fn amounts_accept_numbers_and_strings() {
        let mut row = sample_row();
        row[COL_DEBIT] = json!(99.25);
        row[COL_CREDIT] = json!("10.00");
        let entry = decode_row(&row).expect("decode");
        assert_eq!(entry.debit, dec!(99.25));
        assert_eq!(entry.credit, dec!(10.00));
    }

    #[test]
    fn empty_amount_defaults_to_zero() {
        let mut row = sample_row();
        row[COL_CREDIT] = json!("");
        let entry = decode_row(&row).expect("decode");
        assert_eq!(entry.credit, Decimal::ZERO);
    }

    #[test]
    fn null_memo_becomes_none() {
        let mut row = sample_row();
        row[COL_MEMO] = Value::Null;
        let entry = decode_row(&row).expect("decode");
        assert_eq!(entry.memo, None);
    }

    #[test]
    fn short_row_errors_name_the_missing_column() {
        let row = sample_row()[..COL_TXN_DATE].to_vec();
        let err = decode_row(&row).expect_err("short row");
        assert!(err.to_string().contains("txn_date"));
    }

    #[test]
    fn date_with_time_component_is_truncated() {
        let mut row = sample_row();
        row[COL_TXN_DATE] = json!("2024-04-03 00:00:00");
        let entry = decode_row(&row).expect("decode");
        assert_eq!(entry.txn_date, "2024-04-03");
    }

    #[test]
    fn invalid_date_is_rejected() {
        let mut row = sample_row();
        row[COL_TXN_DATE] = json!("03/04/2024");
        assert!(decode_row(&row).is_err());
    }

    #[test]
    fn empty_txn_id_is_rejected() {
        let mut row = sample_row();
        row[COL_TXN_ID] = json!("");
        assert!(decode_row(&row).is_err());
    }
}
