//! Request payload validation.
//!
//! Shape checks only. Naming rules and duplicate detection belong to
//! provisioning.

use crate::error::{ApiError, ApiResult};
use tenement_provisioning::DeleteTenantInput;
use uuid::Uuid;

pub const MIN_PASSWORD_LEN: usize = 8;

/// Normalize an email address, rejecting anything without a local part and
/// a dotted domain.
pub fn validate_email(value: &str) -> ApiResult<String> {
    let email = value.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if !valid {
        return Err(ApiError::BadRequest(format!(
            "'{}' is not a valid email address",
            value.trim()
        )));
    }
    Ok(email)
}

pub fn validate_password(value: &str) -> ApiResult<()> {
    if value.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::BadRequest(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

/// `^[a-z0-9]+(?:-[a-z0-9]+)*$`
pub fn is_valid_label(label: &str) -> bool {
    !label.is_empty()
        && !label.starts_with('-')
        && !label.ends_with('-')
        && !label.contains("--")
        && label
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

/// Normalize a requested subdomain.
///
/// Blank means "derive from the name". A bare label is qualified with the
/// root domain. Fully-qualified hosts must be made of valid labels.
pub fn normalize_subdomain(value: Option<&str>, root_domain: &str) -> ApiResult<Option<String>> {
    let Some(raw) = value.map(|v| v.trim().to_ascii_lowercase()) else {
        return Ok(None);
    };
    if raw.is_empty() {
        return Ok(None);
    }
    if !raw.split('.').all(is_valid_label) {
        return Err(ApiError::BadRequest(format!(
            "'{raw}' is not a valid subdomain"
        )));
    }
    if raw.contains('.') {
        Ok(Some(raw))
    } else {
        Ok(Some(format!("{raw}.{root_domain}")))
    }
}

/// A UUID selects by id, anything else by name.
pub fn parse_identifier(identifier: &str) -> ApiResult<DeleteTenantInput> {
    let identifier = identifier.trim();
    if identifier.is_empty() {
        return Err(ApiError::BadRequest(
            "Provide a tenant id or name to delete".to_string(),
        ));
    }
    Ok(match Uuid::parse_str(identifier) {
        Ok(id) => DeleteTenantInput {
            id: Some(id),
            name: None,
        },
        Err(_) => DeleteTenantInput {
            id: None,
            name: Some(identifier.to_string()),
        },
    })
}

/// Trim an optional string, mapping blanks to `None`.
pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
