//! Operator-facing result messages.
//!
//! Every `msg` a reconciler returns is built here so wording stays
//! consistent between the live and dry-run paths.

use crate::types::connection_string::ConnectionStringKind;
use crate::types::node::NodeType;
use crate::types::topology::NodeRole;

fn enc_suffix(encrypted: bool) -> &'static str {
    if encrypted {
        " (encrypted)"
    } else {
        ""
    }
}

fn cluster_suffix(cluster_wide: bool) -> &'static str {
    if cluster_wide {
        " cluster-wide"
    } else {
        ""
    }
}

// ---------------------------------------------------------------------------
// Databases
// ---------------------------------------------------------------------------

pub fn db_exists(name: &str) -> String {
    format!("Database '{}' already exists.", name)
}

pub fn db_not_exists(name: &str) -> String {
    format!("Database '{}' does not exist.", name)
}

pub fn db_created(name: &str, encrypted: bool) -> String {
    format!("Database '{}' created successfully{}.", name, enc_suffix(encrypted))
}

pub fn db_would_create(name: &str, encrypted: bool) -> String {
    format!("Database '{}' would be created{}.", name, enc_suffix(encrypted))
}

pub fn db_deleted(name: &str) -> String {
    format!("Database '{}' deleted successfully.", name)
}

pub fn db_would_delete(name: &str) -> String {
    format!("Database '{}' would be deleted.", name)
}

pub fn db_delete_not_confirmed(name: &str, error: &str) -> String {
    format!("Database '{}' delete was issued but not confirmed: {}", name, error)
}

pub fn db_no_changes(base: &str) -> String {
    format!("{} No changes.", base)
}

/// `keys` must already be sorted and joined.
pub fn settings_applied(prefix: &str, keys: &str) -> String {
    format!("{} Applied settings ({}) and reloaded.", prefix, keys)
}

pub fn settings_would_apply(prefix: &str, keys: &str) -> String {
    format!("{} Would apply settings ({}) and reload.", prefix, keys)
}

pub fn encryption_mismatch(name: &str, actual: bool, desired: bool) -> String {
    format!(
        "Database '{}' already exists but encryption status is '{}' while requested '{}'. \
         Encryption cannot be toggled on an existing database. \
         Delete and recreate it, or back up and restore with the desired key.",
        name, actual, desired
    )
}

pub fn unknown_member_tags(tags: &[String]) -> String {
    format!("Unknown node tags in members: {}", tags.join(", "))
}

pub fn encrypted_add_requires_key(name: &str) -> String {
    format!(
        "Database '{}' is encrypted; adding members requires encryption.key_path so the key can be distributed to the new nodes.",
        name
    )
}

fn fmt_tags(tags: &[String]) -> String {
    tags.join(", ")
}

pub fn members_would_reconcile(db: &str, to_add: &[String], to_remove: &[String]) -> String {
    match (to_add.is_empty(), to_remove.is_empty()) {
        (false, false) => format!(
            "Database '{}' would reconcile members: add [{}]; remove [{}].",
            db,
            fmt_tags(to_add),
            fmt_tags(to_remove)
        ),
        (false, true) => format!("Database '{}' would add members: [{}].", db, fmt_tags(to_add)),
        (true, false) => format!("Database '{}' would remove members: [{}].", db, fmt_tags(to_remove)),
        (true, true) => format!("Database '{}' membership already matches.", db),
    }
}

pub fn members_reconciled(db: &str, to_add: &[String], to_remove: &[String]) -> String {
    match (to_add.is_empty(), to_remove.is_empty()) {
        (false, false) => format!(
            "Database '{}' reconciled members: added [{}]; removed [{}].",
            db,
            fmt_tags(to_add),
            fmt_tags(to_remove)
        ),
        (false, true) => format!("Database '{}' added members: [{}].", db, fmt_tags(to_add)),
        (true, false) => format!("Database '{}' removed members: [{}].", db, fmt_tags(to_remove)),
        (true, true) => format!("Database '{}' membership already matched.", db),
    }
}

pub fn members_not_converged(db: &str, detail: &str) -> String {
    format!("Database '{}' membership did not converge in time: {}", db, detail)
}

// ---------------------------------------------------------------------------
// Indexes
// ---------------------------------------------------------------------------

pub fn idx_created(name: &str) -> String {
    format!("Index '{}' created successfully.", name)
}

pub fn idx_would_create(name: &str) -> String {
    format!("Index '{}' would be created.", name)
}

pub fn idx_exists(name: &str) -> String {
    format!("Index '{}' already exists.", name)
}

pub fn idx_deleted(name: &str) -> String {
    format!("Index '{}' deleted successfully.", name)
}

pub fn idx_would_delete(name: &str) -> String {
    format!("Index '{}' would be deleted.", name)
}

pub fn idx_already_absent(name: &str) -> String {
    format!("Index '{}' is already absent.", name)
}

pub fn idx_definition_required(name: &str) -> String {
    format!("Index '{}' does not exist and no definition was given to create it.", name)
}

pub fn idx_not_exist_cannot_apply_mode(name: &str) -> String {
    format!("Index '{}' does not exist. Cannot apply mode.", name)
}

pub fn idx_enabled(name: &str, cluster_wide: bool) -> String {
    format!("Index '{}' enabled successfully{}.", name, cluster_suffix(cluster_wide))
}

pub fn idx_would_enable(name: &str, cluster_wide: bool) -> String {
    format!("Index '{}' would be enabled{}.", name, cluster_suffix(cluster_wide))
}

pub fn idx_already_enabled(name: &str) -> String {
    format!("Index '{}' is already enabled.", name)
}

pub fn idx_disabled(name: &str, cluster_wide: bool) -> String {
    format!("Index '{}' disabled successfully{}.", name, cluster_suffix(cluster_wide))
}

pub fn idx_would_disable(name: &str, cluster_wide: bool) -> String {
    format!("Index '{}' would be disabled{}.", name, cluster_suffix(cluster_wide))
}

pub fn idx_already_disabled(name: &str) -> String {
    format!("Index '{}' is already disabled.", name)
}

pub fn idx_resumed(name: &str) -> String {
    format!("Index '{}' resumed successfully.", name)
}

pub fn idx_would_resume(name: &str) -> String {
    format!("Index '{}' would be resumed.", name)
}

pub fn idx_already_running(name: &str) -> String {
    format!("Index '{}' is already running.", name)
}

pub fn idx_paused(name: &str) -> String {
    format!("Index '{}' paused successfully.", name)
}

pub fn idx_would_pause(name: &str) -> String {
    format!("Index '{}' would be paused.", name)
}

pub fn idx_already_paused(name: &str) -> String {
    format!("Index '{}' is already paused.", name)
}

pub fn idx_reset(name: &str) -> String {
    format!("Index '{}' reset successfully.", name)
}

pub fn idx_would_reset(name: &str) -> String {
    format!("Index '{}' would be reset.", name)
}

pub fn idx_cfg_applied(name: &str, keys: &str) -> String {
    format!("Applied configuration for index '{}' (keys: {}).", name, keys)
}

pub fn idx_cfg_would_apply(name: &str, keys: &str) -> String {
    format!("Would apply configuration for index '{}' (keys: {}).", name, keys)
}

// ---------------------------------------------------------------------------
// Nodes
// ---------------------------------------------------------------------------

pub fn node_already_present(tag: &str, role: NodeRole, url: &str) -> String {
    format!("Node '{}' already present as {} at {}.", tag, role, url)
}

pub fn node_would_add(tag: &str, node_type: NodeType) -> String {
    format!("Node '{}' would be added as {}.", tag, node_type)
}

pub fn node_added(tag: &str, node_type: NodeType) -> String {
    format!("Node '{}' added as {}.", tag, node_type)
}

pub fn node_already_member(tag: &str) -> String {
    format!("Node '{}' is already part of the cluster topology.", tag)
}

pub fn failed_add_node(tag: &str, error: &str) -> String {
    format!("Failed to add node '{}': {}", tag, error)
}

pub fn node_not_confirmed(tag: &str, error: &str) -> String {
    format!("Node '{}' was added but did not appear in the topology: {}", tag, error)
}

// ---------------------------------------------------------------------------
// Connection strings
// ---------------------------------------------------------------------------

pub fn cs_exists(name: &str, kind: ConnectionStringKind) -> String {
    format!("Connection string '{}' ({}) already exists.", name, kind)
}

pub fn cs_created(name: &str, kind: ConnectionStringKind) -> String {
    format!("Connection string '{}' ({}) created successfully.", name, kind)
}

pub fn cs_would_create(name: &str, kind: ConnectionStringKind) -> String {
    format!("Connection string '{}' ({}) would be created.", name, kind)
}

pub fn cs_not_found(name: &str, kind: ConnectionStringKind) -> String {
    format!("Connection string '{}' ({}) does not exist.", name, kind)
}

pub fn cs_deleted(name: &str, kind: ConnectionStringKind) -> String {
    format!("Connection string '{}' ({}) deleted successfully.", name, kind)
}

pub fn cs_would_delete(name: &str, kind: ConnectionStringKind) -> String {
    format!("Connection string '{}' ({}) would be deleted.", name, kind)
}

pub fn cs_type_unsupported(kind: ConnectionStringKind) -> String {
    format!("Connection string type '{}' is not supported by this server.", kind)
}

pub fn cs_requires_version(feature: &str, needed: (u32, u32, u32), server: &str) -> String {
    format!(
        "{} connection strings require server version >= {}.{}.{}; server is '{}'.",
        feature, needed.0, needed.1, needed.2, server
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
