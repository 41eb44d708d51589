//! CSV export of the joined dataset.

use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;

use crate::entities::JoinedRecord;

/// Write one CSV row per joined record, header first.
pub fn write_joined_csv<W: Write>(writer: W, joined: &[JoinedRecord]) -> Result<usize> {
    let mut wtr = csv::Writer::from_writer(writer);

    for record in joined {
        wtr.serialize(record)
            .with_context(|| format!("Failed to serialize sale {}", record.sale_id))?;
    }

    wtr.flush().context("Failed to flush CSV writer")?;
    Ok(joined.len())
}

pub fn export_joined_csv(path: &Path, joined: &[JoinedRecord]) -> Result<usize> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    write_joined_csv(file, joined)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{Client, Product, Sale};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    #[test]
    fn test_csv_header_and_rows() {
        let client = Client::new(1, "Alice SARL", "Europe");
        let product = Product::new(2, "Book - Data BI", "books", dec!(39));
        let sale = Sale {
            id: 6,
            client_id: 1,
            product_id: 2,
            date: NaiveDate::from_ymd_opt(2025, 3, 25).unwrap(),
            quantity: 2,
            unit_price: dec!(39),
        };
        let rows = vec![JoinedRecord::new(&sale, &client, &product).unwrap()];

        let mut buf = Vec::new();
        let written = write_joined_csv(&mut buf, &rows).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(written, 1);
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("sale_id,client_id,product_id,date,quantity,unit_price"));
        assert!(lines[0].ends_with(",revenue"));
        assert!(lines[1].starts_with("6,1,2,2025-03-25,2,39,"));
        assert!(lines[1].ends_with(",78"));
    }
}
