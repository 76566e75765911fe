//! Database existence, encryption, membership and settings.
//!
//! `ensure_present` runs its concerns in order (existence, encryption
//! conflict, membership, settings), each idempotent on its own. The first
//! failing step ends the call; mutations already issued stay applied and
//! are reflected in `changed`.

use std::collections::BTreeMap;

use serde_json::json;
use tracing::{debug, info, warn};

use crate::convergence::planner::{diff_settings, joined_keys};
use crate::convergence::retry::{retry_until, Poll, RetryOutcome, RetryPolicy};
use crate::convergence::topology::{delta, MembersDelta};
use crate::error::{ConvergeError, ErrorClass, Result};
use crate::infrastructure::ClusterApi;
use crate::messages as msg;
use crate::secrets;
use crate::types::database::{CreateDatabase, DatabaseSpec, DeleteOptions, EncryptionSpec};
use crate::types::result::ReconcileResult;

/// Confirmation wait the server applies when dropping replicas.
pub const REMOVE_CONFIRM_SECS: u64 = 30;

pub struct DatabaseReconciler<'a> {
    api: &'a mut dyn ClusterApi,
    confirm: Option<RetryPolicy>,
}

impl<'a> DatabaseReconciler<'a> {
    pub fn new(api: &'a mut dyn ClusterApi) -> Self {
        DatabaseReconciler { api, confirm: None }
    }

    /// After membership changes, poll the record until it matches.
    pub fn with_confirmation(mut self, policy: RetryPolicy) -> Self {
        self.confirm = Some(policy);
        self
    }

    pub fn ensure_present(&mut self, spec: &DatabaseSpec, check_mode: bool) -> ReconcileResult {
        let mut changed = false;
        match self.converge(spec, check_mode, &mut changed) {
            Ok(result) => result,
            Err(e) => {
                warn!(db = %spec.name, error = %e, changed, "database reconcile failed");
                ReconcileResult::partial_error(e.to_string(), changed)
            }
        }
    }

    pub fn ensure_absent(&mut self, name: &str, options: &DeleteOptions, check_mode: bool) -> ReconcileResult {
        let existing = match self.api.list_databases() {
            Ok(names) => names,
            Err(e) => return e.into(),
        };
        if !existing.iter().any(|n| n == name) {
            return ReconcileResult::ok(msg::db_not_exists(name), false);
        }
        if check_mode {
            return ReconcileResult::ok(msg::db_would_delete(name), true);
        }
        if let Err(e) = self.api.delete_database(name, options) {
            return e.into();
        }
        info!(db = name, hard = ?options.hard_delete, "database deleted");

        if let Some(policy) = self.confirm {
            let outcome = self.wait_deleted(name, options, &policy);
            if !outcome.ok {
                return ReconcileResult::partial_error(
                    msg::db_delete_not_confirmed(name, outcome.error_text()),
                    true,
                )
                .with_extra("wait", serde_json::to_value(&outcome).unwrap_or_default());
            }
        }
        ReconcileResult::ok(msg::db_deleted(name), true)
    }

    /// Poll until the database is gone, or for a node-scoped delete, until
    /// none of `from_nodes` still hold it.
    fn wait_deleted(&self, name: &str, options: &DeleteOptions, policy: &RetryPolicy) -> RetryOutcome {
        let api = &*self.api;
        retry_until(policy, || {
            let names = match api.list_databases() {
                Ok(names) => names,
                Err(e) => return Poll::pending(e.to_string()),
            };
            if !names.iter().any(|n| n == name) {
                return Poll::Ready(json!({"deleted": name}));
            }
            if options.from_nodes.is_empty() {
                return Poll::pending(format!("database '{}' still listed", name));
            }
            match api.database_record(name) {
                Ok(r) => {
                    let left: Vec<&String> =
                        options.from_nodes.iter().filter(|t| r.topology.contains(t)).collect();
                    if left.is_empty() {
                        Poll::Ready(json!({"removed_from": options.from_nodes}))
                    } else {
                        Poll::Pending(json!({"still_on": left}))
                    }
                }
                Err(ConvergeError::NotFound(_)) => Poll::Ready(json!({"deleted": name})),
                Err(e) => Poll::pending(e.to_string()),
            }
        })
    }

    fn converge(&mut self, spec: &DatabaseSpec, check_mode: bool, changed: &mut bool) -> Result<ReconcileResult> {
        let name = spec.name.as_str();
        let encrypted = spec.encryption.enabled;
        let members = spec.unique_members();
        let existing = self.api.list_databases()?;

        let created = !existing.iter().any(|n| n == name);
        let base = if created {
            if !members.is_empty() {
                let topology = match self.api.cluster_topology() {
                    Ok(t) => t,
                    Err(e) => {
                        return Ok(ReconcileResult::error(format!("Failed to fetch cluster topology: {}", e)))
                    }
                };
                let known = topology.all_tags();
                let unknown: Vec<String> = members.iter().filter(|t| !known.contains(t)).cloned().collect();
                if !unknown.is_empty() {
                    return Ok(ReconcileResult::error(msg::unknown_member_tags(&unknown)));
                }
            }
            if check_mode {
                return Ok(ReconcileResult::ok(msg::db_would_create(name, encrypted), true));
            }
            if encrypted {
                self.distribute_creation_key(name, &spec.encryption, &members, changed)?;
            }
            self.api.create_database(&CreateDatabase {
                name: name.to_string(),
                replication_factor: spec.replication_factor,
                encrypted,
                members: members.clone(),
            })?;
            *changed = true;
            info!(db = name, rf = spec.replication_factor, encrypted, "database created");
            msg::db_created(name, encrypted)
        } else {
            let record = self.api.database_record(name)?;
            if record.encrypted != encrypted {
                return Ok(ReconcileResult::error(msg::encryption_mismatch(name, record.encrypted, encrypted)));
            }
            msg::db_exists(name)
        };

        let mut message = base.clone();
        let mut membership: Option<MembersDelta> = None;

        if !created && !members.is_empty() {
            if let Some((text, d)) = self.reconcile_members(spec, &members, check_mode, changed)? {
                message = format!("{} {}", message, text);
                membership = Some(d);
            }
        }

        if !spec.settings.is_empty() {
            if let Some(text) = self.reconcile_settings(name, &spec.settings, &message, check_mode, changed)? {
                message = text;
            }
        }

        if !*changed && !created {
            message = msg::db_no_changes(&base);
        }
        let mut result = ReconcileResult::ok(message, *changed);
        if let Some(d) = membership {
            result = result
                .with_extra("to_add", json!(d.to_add))
                .with_extra("to_remove", json!(d.to_remove));
        }
        Ok(result)
    }

    fn distribute_creation_key(
        &mut self,
        name: &str,
        encryption: &EncryptionSpec,
        members: &[String],
        changed: &mut bool,
    ) -> Result<()> {
        let key = if encryption.generate_key {
            let key = self.api.generate_secret()?;
            if let Some(out) = &encryption.output_path {
                secrets::write_key_safe(out, &key)?;
                info!(db = name, path = %out.display(), "generated key written");
            }
            key
        } else {
            match &encryption.key_path {
                Some(path) => secrets::read_key(path)?,
                None => {
                    return Err(ConvergeError::Policy(
                        "encrypted=true requires either generate_key=true or key_path=<path>.".into(),
                    ))
                }
            }
        };

        let tags = if members.is_empty() {
            self.api.cluster_topology()?.all_tags()
        } else {
            members.to_vec()
        };
        if tags.is_empty() {
            return Err(ConvergeError::Policy("No nodes found in cluster topology.".into()));
        }
        self.api.distribute_secret(name, &key, &tags)?;
        *changed = true;
        info!(db = name, nodes = ?tags, "encryption key distributed");
        Ok(())
    }

    /// Converge the replica set of an existing database.
    fn reconcile_members(
        &mut self,
        spec: &DatabaseSpec,
        members: &[String],
        check_mode: bool,
        changed: &mut bool,
    ) -> Result<Option<(String, MembersDelta)>> {
        let name = spec.name.as_str();
        let record = self.api.database_record(name)?;
        let d = delta(&record.topology, members);
        if d.is_empty() {
            return Ok(None);
        }
        if check_mode {
            *changed = true;
            return Ok(Some((msg::members_would_reconcile(name, &d.to_add, &d.to_remove), d)));
        }

        if !d.to_add.is_empty() {
            if record.encrypted {
                let key_path = spec
                    .encryption
                    .key_path
                    .as_deref()
                    .ok_or_else(|| ConvergeError::Policy(msg::encrypted_add_requires_key(name)))?;
                let key = secrets::read_key(key_path)?;
                self.api.distribute_secret(name, &key, &d.to_add)?;
                *changed = true;
            }
            for tag in &d.to_add {
                if self.api.database_record(name)?.topology.contains(tag) {
                    debug!(db = name, tag = %tag, "member appeared before add");
                    continue;
                }
                match self.api.add_database_node(name, tag) {
                    Ok(()) => {
                        *changed = true;
                        info!(db = name, tag = %tag, "member added");
                    }
                    Err(e) if e.class() == ErrorClass::BenignConflict => {
                        warn!(db = name, tag = %tag, error = %e, "member already present");
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        if !d.to_remove.is_empty() {
            self.api
                .delete_database(name, &DeleteOptions::soft_from(&d.to_remove, REMOVE_CONFIRM_SECS))?;
            *changed = true;
            info!(db = name, nodes = ?d.to_remove, "members removed");
        }

        if let Some(policy) = self.confirm {
            let api = &*self.api;
            let outcome = retry_until(&policy, || match api.database_record(name) {
                Ok(r) => {
                    let left = delta(&r.topology, members);
                    if left.is_empty() {
                        Poll::Ready(json!({"members": members}))
                    } else {
                        Poll::Pending(json!(left))
                    }
                }
                Err(e) => Poll::pending(e.to_string()),
            });
            if !outcome.ok {
                return Err(ConvergeError::Policy(msg::members_not_converged(
                    name,
                    &outcome.detail.to_string(),
                )));
            }
        }

        Ok(Some((msg::members_reconciled(name, &d.to_add, &d.to_remove), d)))
    }

    /// Apply changed settings and reload the database so they take effect.
    fn reconcile_settings(
        &mut self,
        name: &str,
        desired: &BTreeMap<String, String>,
        prefix: &str,
        check_mode: bool,
        changed: &mut bool,
    ) -> Result<Option<String>> {
        let current = self.api.database_settings(name)?;
        let to_apply = diff_settings(desired, &current);
        if to_apply.is_empty() {
            return Ok(None);
        }
        let keys = joined_keys(&to_apply);
        *changed = true;
        if check_mode {
            return Ok(Some(msg::settings_would_apply(prefix, &keys)));
        }
        self.api.put_database_settings(name, &to_apply)?;
        self.api.set_database_disabled(name, true)?;
        self.api.set_database_disabled(name, false)?;
        info!(db = name, keys = %keys, "settings applied and database reloaded");
        Ok(Some(msg::settings_applied(prefix, &keys)))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::time::Duration;

    use super::*;
    use crate::infrastructure::mock::{MockCluster, GENERATED_KEY};

    fn tags(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    fn plain(name: &str, rf: u32) -> DatabaseSpec {
        DatabaseSpec::new("http://a:8080", name, rf).unwrap()
    }

    fn kv(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn encryption_with_key(path: PathBuf) -> EncryptionSpec {
        EncryptionSpec {
            enabled: true,
            certificate_path: Some("/certs/admin.pem".into()),
            key_path: Some(path),
            ..Default::default()
        }
    }

    #[test]
    fn create_then_already_exists() {
        let mut cluster = MockCluster::with_members("http://a:8080", &["A"]);
        let spec = plain("orders", 1);

        let first = DatabaseReconciler::new(&mut cluster).ensure_present(&spec, false);
        assert!(first.changed && !first.failed);
        assert_eq!(first.msg, "Database 'orders' created successfully.");

        let second = DatabaseReconciler::new(&mut cluster).ensure_present(&spec, false);
        assert!(!second.changed && !second.failed);
        assert_eq!(second.msg, "Database 'orders' already exists. No changes.");
        assert_eq!(cluster.calls, vec!["create_database:orders"]);
    }

    #[test]
    fn dry_run_create_does_not_mutate() {
        let mut cluster = MockCluster::with_members("http://a:8080", &["A"]);
        let spec = plain("orders", 1).with_settings(kv(&[("Indexing.MapBatchSize", "128")]));
        let result = DatabaseReconciler::new(&mut cluster).ensure_present(&spec, true);
        assert!(result.changed);
        assert_eq!(result.msg, "Database 'orders' would be created.");
        assert!(!cluster.mutated());
    }

    #[test]
    fn create_with_explicit_members() {
        let mut cluster = MockCluster::with_members("http://a:8080", &["A", "B", "C"]);
        let spec = plain("orders", 2).with_members(tags(&["C", "B"])).unwrap();
        let result = DatabaseReconciler::new(&mut cluster).ensure_present(&spec, false);
        assert!(result.changed);
        let record = cluster.database_record("orders").unwrap();
        assert_eq!(record.topology.all_tags().into_iter().collect::<Vec<_>>(), tags(&["B", "C"]));
    }

    #[test]
    fn unknown_member_tags_fail_before_mutation() {
        let mut cluster = MockCluster::with_members("http://a:8080", &["A"]);
        let spec = plain("orders", 2).with_members(tags(&["A", "Z"])).unwrap();
        let result = DatabaseReconciler::new(&mut cluster).ensure_present(&spec, false);
        assert!(result.failed);
        assert_eq!(result.msg, "Unknown node tags in members: Z");
        assert!(!cluster.mutated());
    }

    #[test]
    fn encryption_mismatch_fails_without_mutation() {
        let mut cluster = MockCluster::with_members("http://a:8080", &["A"]);
        cluster.seed_database("orders", &["A"], false);
        let dir = tempfile::tempdir().unwrap();
        let spec = plain("orders", 1)
            .with_encryption(encryption_with_key(dir.path().join("k")))
            .unwrap();
        let result = DatabaseReconciler::new(&mut cluster).ensure_present(&spec, false);
        assert!(result.failed && !result.changed);
        assert!(result.msg.contains("encryption status is 'false' while requested 'true'"));
        assert!(!cluster.mutated());
    }

    #[test]
    fn encrypted_create_distributes_generated_key_first() {
        let mut cluster = MockCluster::with_members("http://a:8080", &["A", "B"]);
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("keys/vault.key");
        let enc = EncryptionSpec {
            enabled: true,
            certificate_path: Some("/certs/admin.pem".into()),
            generate_key: true,
            output_path: Some(out.clone()),
            ..Default::default()
        };
        let spec = plain("vault", 2).with_encryption(enc).unwrap();

        let result = DatabaseReconciler::new(&mut cluster).ensure_present(&spec, false);
        assert!(!result.failed, "{}", result.msg);
        assert_eq!(result.msg, "Database 'vault' created successfully (encrypted).");
        assert_eq!(cluster.calls, vec!["distribute_secret:vault:A,B", "create_database:vault"]);
        assert_eq!(secrets::read_key(&out).unwrap(), GENERATED_KEY);
    }

    #[test]
    fn dry_run_members_reports_delta() {
        let mut cluster = MockCluster::with_members("http://a:8080", &["A", "B"]);
        cluster.seed_database("orders", &["A"], false);
        let spec = plain("orders", 2).with_members(tags(&["A", "B"])).unwrap();
        let result = DatabaseReconciler::new(&mut cluster).ensure_present(&spec, true);
        assert!(result.changed && !result.failed);
        assert_eq!(result.extra("to_add"), Some(&json!(["B"])));
        assert_eq!(result.extra("to_remove"), Some(&json!([])));
        assert_eq!(
            result.msg,
            "Database 'orders' already exists. Database 'orders' would add members: [B]."
        );
        assert!(!cluster.mutated());
    }

    #[test]
    fn adds_missing_member_then_idempotent() {
        let mut cluster = MockCluster::with_members("http://a:8080", &["A", "B"]);
        cluster.seed_database("orders", &["A"], false);
        let spec = plain("orders", 2).with_members(tags(&["A", "B"])).unwrap();

        let first = DatabaseReconciler::new(&mut cluster).ensure_present(&spec, false);
        assert!(first.changed && !first.failed);
        assert_eq!(cluster.calls, vec!["add_database_node:orders:B"]);

        let second = DatabaseReconciler::new(&mut cluster).ensure_present(&spec, false);
        assert!(!second.changed);
        assert!(second.extra("to_add").is_none());
    }

    #[test]
    fn removes_extra_member_with_soft_delete() {
        let mut cluster = MockCluster::with_members("http://a:8080", &["A", "B"]);
        cluster.seed_database("orders", &["A", "B"], false);
        let spec = plain("orders", 1).with_members(tags(&["A"])).unwrap();
        let result = DatabaseReconciler::new(&mut cluster).ensure_present(&spec, false);
        assert!(result.changed);
        assert_eq!(result.msg, "Database 'orders' already exists. Database 'orders' removed members: [B].");
        assert_eq!(cluster.calls, vec!["delete_database:orders:B"]);
        assert!(cluster.databases.contains_key("orders"));
    }

    #[test]
    fn add_race_is_tolerated() {
        let mut cluster = MockCluster::with_members("http://a:8080", &["A", "B"]);
        cluster.seed_database("orders", &["A"], false);
        cluster.fail_on(
            "add_database_node",
            "Can't add node B to database 'orders' topology because it is already part of it",
        );
        let spec = plain("orders", 2).with_members(tags(&["A", "B"])).unwrap();
        let result = DatabaseReconciler::new(&mut cluster).ensure_present(&spec, false);
        assert!(!result.failed, "{}", result.msg);
    }

    #[test]
    fn encrypted_add_requires_key_path() {
        let mut cluster = MockCluster::with_members("http://a:8080", &["A", "B"]);
        cluster.seed_database("vault", &["A"], true);
        let enc = EncryptionSpec {
            enabled: true,
            certificate_path: Some("/certs/admin.pem".into()),
            generate_key: true,
            ..Default::default()
        };
        let spec = plain("vault", 2)
            .with_encryption(enc)
            .unwrap()
            .with_members(tags(&["A", "B"]))
            .unwrap();
        let result = DatabaseReconciler::new(&mut cluster).ensure_present(&spec, false);
        assert!(result.failed && !result.changed);
        assert!(result.msg.contains("requires encryption.key_path"));
        assert!(!cluster.mutated());
    }

    #[test]
    fn encrypted_add_distributes_key_to_new_tags_only() {
        let mut cluster = MockCluster::with_members("http://a:8080", &["A", "B"]);
        cluster.seed_database("vault", &["A"], true);
        let dir = tempfile::tempdir().unwrap();
        let key_path = dir.path().join("vault.key");
        secrets::write_key_safe(&key_path, "a2V5").unwrap();
        let spec = plain("vault", 2)
            .with_encryption(encryption_with_key(key_path))
            .unwrap()
            .with_members(tags(&["A", "B"]))
            .unwrap();

        let result = DatabaseReconciler::new(&mut cluster).ensure_present(&spec, false);
        assert!(result.changed && !result.failed, "{}", result.msg);
        assert_eq!(cluster.calls, vec!["distribute_secret:vault:B", "add_database_node:vault:B"]);
    }

    #[test]
    fn settings_apply_then_reload() {
        let mut cluster = MockCluster::with_members("http://a:8080", &["A"]);
        cluster.seed_database("orders", &["A"], false).settings = kv(&[("Indexing.MapBatchSize", "64")]);
        let spec = plain("orders", 1)
            .with_settings(kv(&[("Indexing.MapBatchSize", "128"), ("Queries.MaxClauseCount", "2048")]));

        let result = DatabaseReconciler::new(&mut cluster).ensure_present(&spec, false);
        assert_eq!(
            result.msg,
            "Database 'orders' already exists. Applied settings (Indexing.MapBatchSize, Queries.MaxClauseCount) and reloaded."
        );
        assert_eq!(
            cluster.calls,
            vec!["put_database_settings:orders", "disable_database:orders", "enable_database:orders"]
        );

        let again = DatabaseReconciler::new(&mut cluster).ensure_present(&spec, false);
        assert!(!again.changed);
        assert_eq!(again.msg, "Database 'orders' already exists. No changes.");
    }

    #[test]
    fn settings_dry_run_lists_sorted_keys() {
        let mut cluster = MockCluster::with_members("http://a:8080", &["A"]);
        cluster.seed_database("orders", &["A"], false);
        let spec = plain("orders", 1).with_settings(kv(&[("b", "1"), ("a", "2")]));
        let result = DatabaseReconciler::new(&mut cluster).ensure_present(&spec, true);
        assert!(result.changed);
        assert_eq!(result.msg, "Database 'orders' already exists. Would apply settings (a, b) and reload.");
        assert!(!cluster.mutated());
    }

    #[test]
    fn settings_failure_after_create_keeps_changed() {
        let mut cluster = MockCluster::with_members("http://a:8080", &["A"]);
        cluster.fail_on("put_database_settings", "boom");
        let spec = plain("orders", 1).with_settings(kv(&[("a", "1")]));
        let result = DatabaseReconciler::new(&mut cluster).ensure_present(&spec, false);
        assert!(result.failed && result.changed);
        assert!(cluster.databases.contains_key("orders"));
    }

    #[test]
    fn membership_confirmation_wait() {
        let mut cluster = MockCluster::with_members("http://a:8080", &["A", "B"]);
        cluster.seed_database("orders", &["A"], false);
        let spec = plain("orders", 2).with_members(tags(&["A", "B"])).unwrap();
        let policy = RetryPolicy::new(Duration::from_millis(50), Duration::from_millis(5)).unwrap();
        let result = DatabaseReconciler::new(&mut cluster)
            .with_confirmation(policy)
            .ensure_present(&spec, false);
        assert!(result.changed && !result.failed, "{}", result.msg);
    }

    #[test]
    fn membership_timeout_is_not_a_benign_conflict() {
        let mut cluster = MockCluster::with_members("http://a:8080", &["A", "B"]);
        cluster.seed_database("orders", &["A"], false);
        // The server claims B is already a member but the record never shows it.
        cluster.fail_on(
            "add_database_node",
            "Can't add node B to database 'orders' topology because it is already part of it",
        );
        let spec = plain("orders", 2).with_members(tags(&["A", "B"])).unwrap();
        let policy = RetryPolicy::new(Duration::from_millis(20), Duration::from_millis(5)).unwrap();

        let mut changed = false;
        let err = DatabaseReconciler::new(&mut cluster)
            .with_confirmation(policy)
            .reconcile_members(&spec, &spec.members, false, &mut changed)
            .unwrap_err();
        assert!(matches!(err, ConvergeError::Policy(_)));
        assert_ne!(err.class(), ErrorClass::BenignConflict);

        let result = DatabaseReconciler::new(&mut cluster)
            .with_confirmation(policy)
            .ensure_present(&spec, false);
        assert!(result.failed);
        assert!(result.msg.contains("membership did not converge"), "{}", result.msg);
    }

    #[test]
    fn ensure_absent_lifecycle() {
        let mut cluster = MockCluster::new("http://a:8080");
        let opts = DeleteOptions::default();
        let missing = DatabaseReconciler::new(&mut cluster).ensure_absent("orders", &opts, false);
        assert!(!missing.changed);
        assert_eq!(missing.msg, "Database 'orders' does not exist.");

        cluster.seed_database("orders", &["A"], false);
        let dry = DatabaseReconciler::new(&mut cluster).ensure_absent("orders", &opts, true);
        assert!(dry.changed);
        assert_eq!(dry.msg, "Database 'orders' would be deleted.");
        assert!(!cluster.mutated());

        let gone = DatabaseReconciler::new(&mut cluster).ensure_absent("orders", &opts, false);
        assert_eq!(gone.msg, "Database 'orders' deleted successfully.");
        assert!(!cluster.databases.contains_key("orders"));
    }

    #[test]
    fn node_scoped_delete_confirmed() {
        let mut cluster = MockCluster::with_members("http://a:8080", &["A", "B"]);
        cluster.seed_database("orders", &["A", "B"], false);
        let policy = RetryPolicy::new(Duration::from_millis(50), Duration::from_millis(5)).unwrap();
        let opts = DeleteOptions::soft_from(&tags(&["B"]), 10);
        let result = DatabaseReconciler::new(&mut cluster)
            .with_confirmation(policy)
            .ensure_absent("orders", &opts, false);
        assert!(result.changed && !result.failed, "{}", result.msg);
        assert_eq!(cluster.calls, vec!["delete_database:orders:B"]);
        assert!(!cluster.database_record("orders").unwrap().topology.contains("B"));
    }

    #[test]
    fn list_failure_is_failed_result() {
        let mut cluster = MockCluster::new("http://a:8080");
        cluster.fail_on("list_databases", "unavailable");
        let result = DatabaseReconciler::new(&mut cluster).ensure_present(&plain("orders", 1), false);
        assert!(result.failed && !result.changed);
    }
}
