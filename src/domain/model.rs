use crate::utils::error::{Result, RuesError};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Registration status that makes a candidate preferred.
pub const ACTIVE_STATUS: &str = "ACTIVA";
/// `codigo_error` value the detail registry uses for success.
pub const SUCCESS_CODE: &str = "0000";
pub const MAX_IDENTIFIER_DIGITS: usize = 9;

/// A normalized NIT: 1 to 9 ASCII digits, no separators.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Identifier(String);

impl Identifier {
    /// Strict parse used at the lookup endpoint.
    pub fn parse(raw: &str) -> Result<Self> {
        let value = raw.trim();
        if value.is_empty() {
            return Err(RuesError::MissingIdentifier);
        }
        if !value.bytes().all(|b| b.is_ascii_digit()) {
            return Err(RuesError::InvalidIdentifier {
                value: value.to_string(),
                reason: "only digits are allowed".to_string(),
            });
        }
        if value.len() > MAX_IDENTIFIER_DIGITS {
            return Err(RuesError::InvalidIdentifier {
                value: value.to_string(),
                reason: format!("at most {} digits are allowed", MAX_IDENTIFIER_DIGITS),
            });
        }
        Ok(Self(value.to_string()))
    }

    /// Lenient normalization applied to spreadsheet cells: drops every
    /// non-digit (dots, dashes, check digit separators) and keeps the first
    /// nine digits. Returns `None` when nothing is left.
    pub fn normalize(raw: &str) -> Option<Self> {
        let digits: String = raw
            .chars()
            .filter(char::is_ascii_digit)
            .take(MAX_IDENTIFIER_DIGITS)
            .collect();
        (!digits.is_empty()).then_some(Self(digits))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Identifier {
    type Err = RuesError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Accepts strings, numbers or null. The open-data registry is not
/// consistent about quoting numeric columns.
fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        Some(serde_json::Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

/// One match returned by the primary (open-data) registry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateRecord {
    #[serde(rename = "nit", default, deserialize_with = "lenient_string")]
    pub identifier: Option<String>,
    #[serde(rename = "razon_social", default, deserialize_with = "lenient_string")]
    pub legal_name: Option<String>,
    #[serde(rename = "codigo_camara", default, deserialize_with = "lenient_string")]
    pub chamber_code: Option<String>,
    #[serde(rename = "matricula", default, deserialize_with = "lenient_string")]
    pub registration_number: Option<String>,
    #[serde(rename = "estado_matricula", default, deserialize_with = "lenient_string")]
    pub status: Option<String>,
    #[serde(rename = "categoria_matricula", default, deserialize_with = "lenient_string")]
    pub category: Option<String>,
    #[serde(rename = "camara_comercio", default, deserialize_with = "lenient_string")]
    pub chamber_name: Option<String>,
    #[serde(rename = "ultimo_ano_renovado", default, deserialize_with = "lenient_string")]
    pub last_renewal_year: Option<String>,
    #[serde(rename = "cod_ciiu_act_econ_pri", default, deserialize_with = "lenient_string")]
    pub activity_code: Option<String>,
}

impl CandidateRecord {
    pub fn is_active(&self) -> bool {
        self.status.as_deref() == Some(ACTIVE_STATUS)
    }

    pub fn compound_key(&self) -> CompoundKey {
        CompoundKey::new(
            self.chamber_code.as_deref().unwrap_or(""),
            self.registration_number.as_deref().unwrap_or(""),
        )
    }
}

/// Address of a record in the detail registry:
/// 2-digit chamber code followed by 10-digit registration number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompoundKey(String);

impl CompoundKey {
    pub fn new(chamber_code: &str, registration_number: &str) -> Self {
        // Left-pad only, longer values are kept whole.
        Self(format!("{:0>2}{:0>10}", chamber_code, registration_number))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CompoundKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Detail record from the secondary registry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentRecord {
    #[serde(rename = "razon_social", default, deserialize_with = "lenient_string")]
    pub legal_name: Option<String>,
    #[serde(rename = "categoria_matricula", default, deserialize_with = "lenient_string")]
    pub category: Option<String>,
    #[serde(rename = "camara", default, deserialize_with = "lenient_string")]
    pub chamber_name: Option<String>,
    #[serde(rename = "estado", default, deserialize_with = "lenient_string")]
    pub status: Option<String>,
    #[serde(rename = "ultimo_ano_renovado", default, deserialize_with = "lenient_string")]
    pub last_renewal_year: Option<String>,
    #[serde(rename = "cod_ciiu_act_econ_pri", default, deserialize_with = "lenient_string")]
    pub activity_code: Option<String>,
    #[serde(rename = "desc_ciiu_act_econ_pri", default, deserialize_with = "lenient_string")]
    pub activity_description: Option<String>,
}

impl EnrichmentRecord {
    /// A detail record without a legal name is as good as no record.
    pub fn is_usable(&self) -> bool {
        self.legal_name.as_deref().is_some_and(|name| !name.is_empty())
    }
}

/// Response envelope of the secondary registry.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DetailEnvelope {
    #[serde(rename = "codigo_error", default, deserialize_with = "lenient_string")]
    pub code: Option<String>,
    #[serde(rename = "registros", default)]
    pub record: Option<EnrichmentRecord>,
}

impl DetailEnvelope {
    /// Usable only when the code is success *and* a legal name came back.
    /// A success code with an empty name is treated as no data.
    pub fn into_enrichment(self) -> Option<EnrichmentRecord> {
        if self.code.as_deref() != Some(SUCCESS_CODE) {
            return None;
        }
        self.record.filter(EnrichmentRecord::is_usable)
    }
}

/// Merged, externally visible view of one identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultRow {
    #[serde(rename = "nit")]
    pub identifier: String,
    #[serde(rename = "nombre_empresa")]
    pub company_name: String,
    #[serde(rename = "categoria_matricula")]
    pub category: String,
    #[serde(rename = "camara_comercio")]
    pub chamber: String,
    #[serde(rename = "estado_matricula")]
    pub status: String,
    #[serde(rename = "ultimo_ano_renovado")]
    pub last_renewal_year: String,
    #[serde(rename = "actividad_economica")]
    pub activity: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ResultRow {
    /// Row for an identifier whose pipeline failed: every data field empty.
    pub fn failed(identifier: &Identifier, message: impl Into<String>) -> Self {
        Self {
            identifier: identifier.to_string(),
            error: Some(message.into()),
            ..Default::default()
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// (completed, total) snapshot of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
}

impl Progress {
    pub fn is_complete(&self) -> bool {
        self.completed >= self.total
    }

    pub fn percent(&self) -> f32 {
        if self.total == 0 {
            return 100.0;
        }
        self.completed as f32 * 100.0 / self.total as f32
    }
}

/// One completion emitted by the worker pool.
#[derive(Debug, Clone, Serialize)]
pub struct BatchEvent {
    pub row: ResultRow,
    pub progress: Progress,
}
