//! Named connection strings on a database.
//!
//! Presence is by name within a kind; an existing connection string is
//! left as it is.

use tracing::{info, warn};

use crate::error::{ConvergeError, Result};
use crate::infrastructure::ClusterApi;
use crate::messages as msg;
use crate::types::connection_string::{parse_version, ConnectionStringKind, ConnectionStringSpec};
use crate::types::result::ReconcileResult;

pub struct ConnectionStringReconciler<'a> {
    api: &'a mut dyn ClusterApi,
}

impl<'a> ConnectionStringReconciler<'a> {
    pub fn new(api: &'a mut dyn ClusterApi) -> Self {
        ConnectionStringReconciler { api }
    }

    pub fn ensure_present(&mut self, spec: &ConnectionStringSpec, check_mode: bool) -> ReconcileResult {
        match self.converge(spec, check_mode) {
            Ok(result) => result,
            Err(e) => {
                warn!(db = %spec.db_name, name = %spec.name, kind = %spec.kind, error = %e, "connection string reconcile failed");
                e.into()
            }
        }
    }

    pub fn ensure_absent(
        &mut self,
        db: &str,
        kind: ConnectionStringKind,
        name: &str,
        check_mode: bool,
    ) -> ReconcileResult {
        let name = name.trim();
        let inventory = match self.api.connection_strings(db) {
            Ok(inv) => inv,
            Err(e) => return e.into(),
        };
        // A kind the server does not know cannot have instances.
        if !inventory.contains(kind, name) {
            return ReconcileResult::ok(msg::cs_not_found(name, kind), false);
        }
        if check_mode {
            return ReconcileResult::ok(msg::cs_would_delete(name, kind), true);
        }
        if let Err(e) = self.api.remove_connection_string(db, kind, name) {
            return e.into();
        }
        info!(db, kind = %kind, name, "connection string removed");
        ReconcileResult::ok(msg::cs_deleted(name, kind), true)
    }

    fn converge(&mut self, spec: &ConnectionStringSpec, check_mode: bool) -> Result<ReconcileResult> {
        if let Some((needed, feature)) = spec.min_server_version() {
            let server = self.api.server_version()?;
            if parse_version(&server) < needed {
                return Err(ConvergeError::Policy(msg::cs_requires_version(&feature, needed, &server)));
            }
        }

        let inventory = self.api.connection_strings(&spec.db_name)?;
        if !inventory.supports(spec.kind) {
            return Err(ConvergeError::Policy(msg::cs_type_unsupported(spec.kind)));
        }
        if inventory.contains(spec.kind, &spec.name) {
            return Ok(ReconcileResult::ok(msg::cs_exists(&spec.name, spec.kind), false));
        }

        // Built before the dry-run answer so unreadable secrets surface in check mode.
        let payload = spec.payload()?;
        if check_mode {
            return Ok(ReconcileResult::ok(msg::cs_would_create(&spec.name, spec.kind), true));
        }
        self.api.put_connection_string(&spec.db_name, spec.kind, &payload)?;
        info!(db = %spec.db_name, kind = %spec.kind, name = %spec.name, "connection string created");
        Ok(ReconcileResult::ok(msg::cs_created(&spec.name, spec.kind), true))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
