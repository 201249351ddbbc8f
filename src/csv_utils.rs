//! CSV helpers for catalog imports and transaction table exports.
//!
//! Imports are all-or-nothing, so a file is read completely before any row
//! is used. Fields are trimmed on the way in.

use std::io::Write;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::Result;

/// Reads every record of a CSV file with a header row.
/// Fails on the first row that does not deserialize into `T`.
pub fn read_csv<T, P>(path: P) -> Result<Vec<T>>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let records = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)?
        .into_deserialize()
        .collect::<csv::Result<Vec<T>>>()?;
    tracing::debug!(path = %path.display(), records = records.len(), "csv read");
    Ok(records)
}

/// Writes a header row followed by one row per record.
/// Returns how many records were written.
pub fn write_csv<T, W>(writer: W, records: impl IntoIterator<Item = T>) -> Result<usize>
where
    T: Serialize,
    W: Write,
{
    let mut csv_writer = csv::Writer::from_writer(writer);
    let mut written = 0;
    for record in records {
        csv_writer.serialize(record)?;
        written += 1;
    }
    csv_writer.flush()?;
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dto::NewProduct;
    use crate::Error;
    use rust_decimal_macros::dec;

    const CATALOG: &str = "name, description, price, image, category, stock
Desk Lamp, Warm LED lamp, 39.90, lamp.jpg, Home, 12
Notebook, A5 dotted, 4.5, notebook.jpg, Office, 0
";

    fn catalog_file(dir: &tempfile::TempDir) -> std::path::PathBuf {
        let path = dir.path().join("catalog.csv");
        std::fs::write(&path, CATALOG).expect("write catalog");
        path
    }

    #[test]
    fn test_read_csv_trims_fields() -> Result<()> {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let products: Vec<NewProduct> = read_csv(catalog_file(&dir))?;

        let expected_products = vec![
            NewProduct {
                name: "Desk Lamp".into(),
                description: "Warm LED lamp".into(),
                price: dec!(39.90),
                image: "lamp.jpg".into(),
                category: "Home".into(),
                stock: 12,
            },
            NewProduct {
                name: "Notebook".into(),
                description: "A5 dotted".into(),
                price: dec!(4.5),
                image: "notebook.jpg".into(),
                category: "Office".into(),
                stock: 0,
            },
        ];
        assert_eq!(products, expected_products);

        Ok(())
    }

    #[test]
    fn test_read_csv_missing_file() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let result = read_csv::<NewProduct, _>(dir.path().join("nope.csv"));
        assert!(matches!(result, Err(Error::Csv(_))));
    }

    #[test]
    fn test_write_csv_emits_header() -> Result<()> {
        let products = vec![NewProduct {
            name: "Pen".into(),
            description: "Blue".into(),
            price: dec!(1.25),
            image: "pen.jpg".into(),
            category: "Office".into(),
            stock: 3,
        }];
        let mut output = Vec::new();
        assert_eq!(write_csv(&mut output, products)?, 1);

        let expected = "name,description,price,image,category,stock
Pen,Blue,1.25,pen.jpg,Office,3
";
        assert_eq!(String::from_utf8(output).unwrap(), expected);
        Ok(())
    }
}
