//! Input validation for operator-declared specs.
//!
//! Each check returns `Err(message)` with an operator-facing message;
//! [`collect`] folds several checks into one `ConvergeError::Validation`
//! listing every problem at once.

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use crate::error::{ConvergeError, Result};

pub type Check = std::result::Result<(), String>;

/// Database and index names: letters, digits, underscore, hyphen.
static NAME_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("static regex"));

/// Node tags: one to four uppercase alphanumerics.
static TAG_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z0-9]{1,4}$").expect("static regex"));

pub fn is_valid_url(url: &str) -> bool {
    match Url::parse(url) {
        Ok(parsed) => matches!(parsed.scheme(), "http" | "https") && parsed.host().is_some(),
        Err(_) => false,
    }
}

/// True when the URL's host is an IPv4/IPv6 literal rather than a name.
pub fn is_ip_host(url: &str) -> bool {
    matches!(
        Url::parse(url).ok().and_then(|u| u.host().map(|h| h.to_owned())),
        Some(url::Host::Ipv4(_)) | Some(url::Host::Ipv6(_))
    )
}

pub fn validate_url(url: &str) -> Check {
    if is_valid_url(url) {
        Ok(())
    } else {
        Err(format!("Invalid URL: {}", url))
    }
}

pub fn validate_database_name(name: &str) -> Check {
    if NAME_REGEX.is_match(name) {
        Ok(())
    } else {
        Err(format!(
            "Invalid database name: {}. Only letters, numbers, dashes, and underscores are allowed.",
            name
        ))
    }
}

pub fn validate_index_name(name: &str) -> Check {
    if NAME_REGEX.is_match(name) {
        Ok(())
    } else {
        Err(format!(
            "Invalid index name: {}. Only letters, numbers, dashes, and underscores are allowed.",
            name
        ))
    }
}

pub fn validate_tag(tag: &str) -> Check {
    if TAG_REGEX.is_match(tag) {
        Ok(())
    } else {
        Err(format!(
            "Invalid node tag: {}. Must be uppercase alphanumeric (1-4 chars).",
            tag
        ))
    }
}

pub fn validate_replication_factor(factor: u32) -> Check {
    if factor > 0 {
        Ok(())
    } else {
        Err(format!(
            "Invalid replication factor: {}. Must be a positive integer.",
            factor
        ))
    }
}

/// An explicit member list must name exactly `replication_factor` nodes.
pub fn validate_members(members: &[String], replication_factor: u32) -> Check {
    if members.is_empty() {
        return Ok(());
    }
    for tag in members {
        validate_tag(tag)?;
    }
    if members.len() != replication_factor as usize {
        return Err(format!(
            "members length ({}) must equal replication_factor ({}).",
            members.len(),
            replication_factor
        ));
    }
    Ok(())
}

pub fn validate_path_exists(path: Option<&Path>) -> Check {
    match path {
        Some(p) if !p.is_file() => Err(format!("Path does not exist: {}", p.display())),
        _ => Ok(()),
    }
}

/// Fold several checks into a single validation error joined by `"; "`.
pub fn collect(checks: Vec<Check>) -> Result<()> {
    let errors: Vec<String> = checks.into_iter().filter_map(|c| c.err()).collect();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConvergeError::Validation(errors.join("; ")))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
