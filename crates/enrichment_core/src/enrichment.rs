use serde_json::Value;

use crate::contract::{MissingField, Record};

/// Closed set of enrichment strategies. Each strategy is a pure function
/// from one record to one enriched record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    ProfessionalEmail,
}

impl StrategyKind {
    /// Resolves a configured strategy name. Unknown names fall back to the
    /// default strategy rather than failing the worker.
    pub fn from_name(name: &str) -> Self {
        match name {
            "professional_email" => Self::ProfessionalEmail,
            _ => Self::default(),
        }
    }

    pub fn enrich(self, record: &Record) -> Result<Record, MissingField> {
        match self {
            Self::ProfessionalEmail => enrich_professional_email(record),
        }
    }
}

impl Default for StrategyKind {
    fn default() -> Self {
        Self::ProfessionalEmail
    }
}

/// Derives `professional_email` as
/// `{first_name.lower()}.{last_name.lower()}@{company_domain}`.
fn enrich_professional_email(record: &Record) -> Result<Record, MissingField> {
    let first_name = require_string(record, "first_name")?;
    let last_name = require_string(record, "last_name")?;
    let company_domain = require_string(record, "company_domain")?;

    let mut enriched = record.clone();
    enriched.insert(
        "professional_email".to_string(),
        Value::String(format!(
            "{}.{}@{company_domain}",
            first_name.to_lowercase(),
            last_name.to_lowercase()
        )),
    );
    Ok(enriched)
}

fn require_string<'a>(record: &'a Record, field: &str) -> Result<&'a str, MissingField> {
    record
        .get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| MissingField::new(field))
}
