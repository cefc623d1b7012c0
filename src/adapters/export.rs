use crate::core::ResultRow;
use crate::utils::error::{Result, RuesError};

pub const EXPORT_HEADERS: [&str; 8] = [
    "NIT",
    "Nombre Empresa",
    "Categoría de la Matrícula",
    "Cámara de Comercio",
    "Estado de la Matrícula",
    "Último Año Renovado",
    "Actividad Económica",
    "Error",
];

/// Serializes rows as CSV with the spreadsheet column headers.
pub fn rows_to_csv(rows: &[ResultRow]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(EXPORT_HEADERS)?;

    for row in rows {
        writer.write_record([
            row.identifier.as_str(),
            row.company_name.as_str(),
            row.category.as_str(),
            row.chamber.as_str(),
            row.status.as_str(),
            row.last_renewal_year.as_str(),
            row.activity.as_str(),
            row.error.as_deref().unwrap_or(""),
        ])?;
    }

    writer.into_inner().map_err(|e| RuesError::ProcessingError {
        message: format!("Failed to flush CSV export: {}", e),
    })
}
