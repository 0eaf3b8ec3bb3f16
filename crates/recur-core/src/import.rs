//! CSV import of transaction histories
//!
//! Columns are located by header name (case-insensitive):
//! `date`, `amount` and `description` are required; `id` and `user_id` are
//! optional. Without an `id` column the 1-based row number is used, and
//! without `user_id` every row belongs to user 0.

use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord};
use rust_decimal::Decimal;
use std::io::Read;
use std::str::FromStr;
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::Transaction;

const DATE_HEADERS: &[&str] = &["date", "transaction date", "posted date"];
const AMOUNT_HEADERS: &[&str] = &["amount"];
const DESCRIPTION_HEADERS: &[&str] = &["description", "merchant", "payee"];
const ID_HEADERS: &[&str] = &["id", "transaction_id"];
const USER_HEADERS: &[&str] = &["user_id", "user"];

struct Columns {
    date: usize,
    amount: usize,
    description: usize,
    id: Option<usize>,
    user_id: Option<usize>,
}

impl Columns {
    fn locate(headers: &StringRecord) -> Result<Self> {
        let find = |names: &[&str]| {
            headers.iter().position(|h| {
                let header = h.trim().to_lowercase();
                names.iter().any(|n| *n == header)
            })
        };
        let require = |names: &[&str]| {
            find(names)
                .ok_or_else(|| Error::InvalidInput(format!("Missing '{}' column", names[0])))
        };

        Ok(Self {
            date: require(DATE_HEADERS)?,
            amount: require(AMOUNT_HEADERS)?,
            description: require(DESCRIPTION_HEADERS)?,
            id: find(ID_HEADERS),
            user_id: find(USER_HEADERS),
        })
    }
}

/// Parse a transaction CSV
pub fn parse_csv<R: Read>(reader: R) -> Result<Vec<Transaction>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let columns = Columns::locate(rdr.headers()?)?;
    let mut transactions = Vec::new();

    for (index, result) in rdr.records().enumerate() {
        let record = result?;
        let row = index + 1;
        let field = |i: usize, name: &str| {
            record
                .get(i)
                .filter(|s| !s.is_empty())
                .ok_or_else(|| Error::InvalidInput(format!("Row {}: missing {}", row, name)))
        };

        let date = parse_date(field(columns.date, "date")?).map_err(|e| at_row(row, e))?;
        let amount = parse_amount(field(columns.amount, "amount")?).map_err(|e| at_row(row, e))?;
        let description = field(columns.description, "description")?;

        let id = match columns.id.and_then(|i| record.get(i)).filter(|s| !s.is_empty()) {
            Some(s) => parse_integer(s, row, "id")?,
            None => row as i64,
        };
        let user_id = match columns.user_id.and_then(|i| record.get(i)).filter(|s| !s.is_empty()) {
            Some(s) => parse_integer(s, row, "user_id")?,
            None => 0,
        };

        transactions.push(Transaction::new(id, date, amount, description, user_id));
    }

    debug!("Parsed {} transactions", transactions.len());
    Ok(transactions)
}

fn at_row(row: usize, err: Error) -> Error {
    match err {
        Error::InvalidInput(msg) => Error::InvalidInput(format!("Row {}: {}", row, msg)),
        other => other,
    }
}

fn parse_integer(s: &str, row: usize, name: &str) -> Result<i64> {
    s.parse::<i64>()
        .map_err(|_| Error::InvalidInput(format!("Row {}: invalid {} '{}'", row, name, s)))
}

/// Parse a date in any of the common bank export formats
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    let s = s.trim();

    let formats = [
        "%Y-%m-%d", // 2024-01-15
        "%m/%d/%Y", // 01/15/2024
        "%m/%d/%y", // 01/15/24
        "%m-%d-%Y", // 01-15-2024
        "%d/%m/%Y", // 15/01/2024 (European)
        "%Y/%m/%d", // 2024/01/15
    ];

    for fmt in formats {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(date);
        }
    }

    Err(Error::InvalidInput(format!("Unable to parse date: {}", s)))
}

/// Parse an amount exactly, handling currency symbols, thousands separators
/// and accounting-style negatives
pub fn parse_amount(s: &str) -> Result<Decimal> {
    let cleaned: String = s
        .trim()
        .replace(['$', '£', '€', ',', ' '], "")
        .replace('(', "-")
        .replace(')', "");

    Decimal::from_str(&cleaned)
        .map_err(|_| Error::InvalidInput(format!("Unable to parse amount: {}", s)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::dec;

    #[test]
    fn test_parse_date() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        assert_eq!(parse_date("01/15/2024").unwrap(), expected);
        assert_eq!(parse_date("2024-01-15").unwrap(), expected);
        assert_eq!(parse_date("15/01/2024").unwrap(), expected);
        assert!(matches!(parse_date("yesterday"), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("$1,234.56").unwrap(), dec("1234.56"));
        assert_eq!(parse_amount("(12.00)").unwrap(), dec("-12.00"));
        assert_eq!(parse_amount("-15.49").unwrap(), dec("-15.49"));
        assert_eq!(parse_amount("0.1").unwrap() + parse_amount("0.2").unwrap(), dec("0.3"));
        assert!(parse_amount("twelve").is_err());
    }

    #[test]
    fn test_parse_csv_with_all_columns() {
        let data = "id,date,amount,description,user_id\n\
                    10,2024-01-15,-15.49,NETFLIX.COM,7\n\
                    11,2024-02-15,-15.49,NETFLIX.COM,7\n";
        let txs = parse_csv(data.as_bytes()).unwrap();
        assert_eq!(txs.len(), 2);
        assert_eq!(txs[0].id, 10);
        assert_eq!(txs[1].user_id, 7);
        assert_eq!(txs[1].amount, dec("-15.49"));
        assert_eq!(txs[0].description, "NETFLIX.COM");
    }

    #[test]
    fn test_parse_csv_defaults_and_header_order() {
        let data = "Description,Amount,Date\n\
                    \"SPOTIFY USA\",\"$9.99\",01/03/2024\n\
                    \"CITY WATER\",\"(61.20)\",01/05/2024\n";
        let txs = parse_csv(data.as_bytes()).unwrap();
        assert_eq!(txs[0].id, 1);
        assert_eq!(txs[1].id, 2);
        assert_eq!(txs[0].user_id, 0);
        assert_eq!(txs[1].amount, dec("-61.20"));
        assert_eq!(txs[1].date, NaiveDate::from_ymd_opt(2024, 1, 5).unwrap());
    }

    #[test]
    fn test_parse_csv_reports_row_numbers() {
        let data = "date,amount,description\n\
                    2024-01-15,-15.49,NETFLIX\n\
                    2024-02-30,-15.49,NETFLIX\n";
        let err = parse_csv(data.as_bytes()).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(ref m) if m.starts_with("Row 2")));

        let missing = "date,description\n2024-01-15,NETFLIX\n";
        assert!(matches!(parse_csv(missing.as_bytes()), Err(Error::InvalidInput(_))));
    }
}
