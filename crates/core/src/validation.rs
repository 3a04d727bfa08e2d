//! Required-field policy applied before an explicit save.
//!
//! The field rules themselves are declared with `validator` attributes on
//! [`ListingDraft`]; this module turns the resulting errors into a stable
//! field -> [`FieldErrorKind`] map the editor can render next to inputs.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::listing::ListingDraft;
use crate::slug::is_valid_slug;

/// Fields that must be present before a listing can be saved explicitly.
pub const REQUIRED_FIELDS: &[&str] = &["slug", "property_type", "location", "price"];

/// Why a single field failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldErrorKind {
    /// Missing, empty or whitespace-only.
    Required,
    /// A numeric amount that must be strictly greater than zero.
    NotPositive,
    /// Any other rule violation.
    Invalid,
}

impl FieldErrorKind {
    fn from_code(code: &str) -> Self {
        match code {
            "required" | "length" => Self::Required,
            "range" => Self::NotPositive,
            _ => Self::Invalid,
        }
    }
}

/// Field-level validation errors, keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, FieldErrorKind>);

impl FieldErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, field: &str) -> Option<FieldErrorKind> {
        self.0.get(field).copied()
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, FieldErrorKind)> {
        self.0.iter().map(|(field, kind)| (field.as_str(), *kind))
    }

    /// Record an error, keeping the more specific kind when a field fails
    /// several rules.
    fn insert(&mut self, field: impl Into<String>, kind: FieldErrorKind) {
        self.0
            .entry(field.into())
            .and_modify(|existing| *existing = (*existing).min(kind))
            .or_insert(kind);
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid fields: ")?;
        for (i, (field, kind)) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{field} ({kind:?})")?;
        }
        Ok(())
    }
}

impl std::error::Error for FieldErrors {}

/// Check a draft against the required-field policy: identifier,
/// classification and location non-blank, price present and positive.
/// A hand-typed slug must also already be in slug form.
pub fn validate_required(draft: &ListingDraft) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::default();

    if let Err(report) = draft.validate() {
        for (field, violations) in report.field_errors() {
            for violation in violations.iter() {
                errors.insert(field.to_string(), FieldErrorKind::from_code(&violation.code));
            }
        }
    }

    // `length(min = 1)` accepts whitespace.
    for (field, value) in [
        ("slug", &draft.slug),
        ("property_type", &draft.property_type),
        ("location", &draft.location),
    ] {
        if value.trim().is_empty() {
            errors.insert(field, FieldErrorKind::Required);
        }
    }

    if !draft.slug.trim().is_empty() && !is_valid_slug(&draft.slug) {
        errors.insert("slug", FieldErrorKind::Invalid);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
