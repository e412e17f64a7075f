//! Configuration validation.
//!
//! Validates config values before any artifact is read.

use crate::domain::error::PendtagError;
use crate::domain::store::StoreLayout;

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> PendtagError {
    PendtagError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

/// A binding must be a plain identifier so it can be located as a whole word.
pub fn validate_binding(section: &str, binding: &str) -> Result<(), PendtagError> {
    let mut chars = binding.chars();
    let starts_ok = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == '$');
    if !starts_ok || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$') {
        return Err(invalid(
            section,
            "binding",
            format!("'{}' is not a valid identifier", binding),
        ));
    }
    Ok(())
}

pub fn validate_layout(layout: &StoreLayout) -> Result<(), PendtagError> {
    for (key, value) in [
        ("series", &layout.series),
        ("summary", &layout.summary),
        ("tag", &layout.tag),
    ] {
        if value.trim().is_empty() {
            return Err(invalid("layout", key, format!("{} key must not be empty", key)));
        }
    }
    if layout.series == layout.summary {
        return Err(invalid(
            "layout",
            "summary",
            "summary key must differ from series key",
        ));
    }
    if !layout.contract.is_empty()
        && (layout.contract == layout.series || layout.contract == layout.summary)
    {
        return Err(invalid(
            "layout",
            "contract",
            "contract key must differ from series and summary keys",
        ));
    }
    Ok(())
}

/// Contract keys examined by a scan: at least one, no repeats.
pub fn validate_contracts(contracts: &[String]) -> Result<(), PendtagError> {
    if contracts.is_empty() {
        return Err(invalid("scan", "contracts", "at least one contract key is required"));
    }
    for (i, key) in contracts.iter().enumerate() {
        if contracts[..i].contains(key) {
            return Err(invalid(
                "scan",
                "contracts",
                format!("contract '{}' listed twice", key),
            ));
        }
    }
    Ok(())
}
