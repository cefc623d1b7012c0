use crate::core::{Identifier, Storage};
use crate::utils::error::Result;

/// Reads NITs from the first column of a CSV or plain-text file. Cells are
/// normalized with [`Identifier::normalize`]; cells left without digits
/// (headers, blanks) are skipped.
pub fn parse_identifiers(data: &[u8]) -> Result<Vec<Identifier>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(data);

    let mut identifiers = Vec::new();
    for record in reader.records() {
        let record = record?;
        if let Some(identifier) = record.get(0).and_then(Identifier::normalize) {
            identifiers.push(identifier);
        }
    }
    Ok(identifiers)
}

pub async fn load_identifiers<S: Storage>(storage: &S, path: &str) -> Result<Vec<Identifier>> {
    let data = storage.read_file(path).await?;
    let identifiers = parse_identifiers(&data)?;
    tracing::info!("📄 {} NIT(s) found in {}", identifiers.len(), path);
    Ok(identifiers)
}
