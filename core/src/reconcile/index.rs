//! Index existence, definition and run mode.

use tracing::{info, warn};

use crate::convergence::planner::{definition_matches, diff_settings, joined_keys, merged_definition};
use crate::error::{ConvergeError, Result};
use crate::infrastructure::ClusterApi;
use crate::messages as msg;
use crate::types::index::{
    IndexDefinition, IndexDefinitionSpec, IndexMode, IndexRunningStatus, IndexSpec, IndexState,
    IndexStatusChange,
};
use crate::types::result::ReconcileResult;

pub struct IndexReconciler<'a> {
    api: &'a mut dyn ClusterApi,
}

impl<'a> IndexReconciler<'a> {
    pub fn new(api: &'a mut dyn ClusterApi) -> Self {
        IndexReconciler { api }
    }

    pub fn ensure_present(&mut self, spec: &IndexSpec, check_mode: bool) -> ReconcileResult {
        let mut changed = false;
        match self.converge(spec, check_mode, &mut changed) {
            Ok(result) => result,
            Err(e) => {
                warn!(db = %spec.db_name, index = %spec.name, error = %e, "index reconcile failed");
                ReconcileResult::partial_error(e.to_string(), changed)
            }
        }
    }

    pub fn ensure_absent(&mut self, db: &str, name: &str, check_mode: bool) -> ReconcileResult {
        let exists = match self.find(db, name) {
            Ok(found) => found.is_some(),
            Err(e) => return e.into(),
        };
        if !exists {
            return ReconcileResult::ok(msg::idx_already_absent(name), false);
        }
        if check_mode {
            return ReconcileResult::ok(msg::idx_would_delete(name), true);
        }
        if let Err(e) = self.api.delete_index(db, name) {
            return e.into();
        }
        ReconcileResult::ok(msg::idx_deleted(name), true)
    }

    fn find(&self, db: &str, name: &str) -> Result<Option<IndexDefinition>> {
        Ok(self.api.index_definitions(db)?.into_iter().find(|d| d.name == name))
    }

    fn converge(&mut self, spec: &IndexSpec, check_mode: bool, changed: &mut bool) -> Result<ReconcileResult> {
        let db = spec.db_name.as_str();
        let existing = self.find(db, &spec.name)?;
        // An index created only in dry-run has no server state to consult.
        let mut assumed_new = false;

        let mut message = match (&existing, &spec.definition) {
            (None, None) => {
                let text = if spec.mode.is_some() {
                    msg::idx_not_exist_cannot_apply_mode(&spec.name)
                } else {
                    msg::idx_definition_required(&spec.name)
                };
                return Ok(ReconcileResult::error(text));
            }
            (None, Some(definition)) => {
                assumed_new = check_mode;
                self.put_definition(db, &spec.name, definition, None, check_mode, changed)?
            }
            (Some(current), Some(definition)) if !definition_matches(current, definition) => {
                self.put_definition(db, &spec.name, definition, Some(current), check_mode, changed)?
            }
            (Some(_), _) => msg::idx_exists(&spec.name),
        };

        if let Some(mode) = spec.mode {
            let (mode_changed, text) = self.apply_mode(spec, mode, assumed_new, check_mode)?;
            if mode_changed {
                *changed = true;
                message = format!("{} {}", message, text);
            } else if *changed {
                message = format!("{} {}", message, text);
            } else {
                message = text;
            }
        }

        if !spec.configuration.is_empty() {
            let current = if assumed_new {
                Default::default()
            } else {
                self.find(db, &spec.name)?.map(|d| d.configuration).unwrap_or_default()
            };
            let to_apply = diff_settings(&spec.configuration, &current);
            if !to_apply.is_empty() {
                let keys = joined_keys(&to_apply);
                *changed = true;
                if check_mode {
                    message = format!("{} {}", message, msg::idx_cfg_would_apply(&spec.name, &keys));
                } else {
                    let definition = self.find(db, &spec.name)?.ok_or_else(|| {
                        ConvergeError::NotFound(format!(
                            "index '{}' while applying configuration",
                            spec.name
                        ))
                    })?;
                    self.api.put_index(db, &merged_definition(&definition, &to_apply))?;
                    info!(db, index = %spec.name, keys = %keys, "index configuration applied");
                    message = format!("{} {}", message, msg::idx_cfg_applied(&spec.name, &keys));
                }
            }
        }

        Ok(ReconcileResult::ok(message, *changed))
    }

    /// Create or replace the definition. A replaced index keeps its existing
    /// per-index configuration.
    fn put_definition(
        &mut self,
        db: &str,
        name: &str,
        definition: &IndexDefinitionSpec,
        current: Option<&IndexDefinition>,
        check_mode: bool,
        changed: &mut bool,
    ) -> Result<String> {
        *changed = true;
        if check_mode {
            return Ok(msg::idx_would_create(name));
        }
        let mut body = IndexDefinition::from_spec(name, definition);
        if let Some(current) = current {
            body.configuration = current.configuration.clone();
        }
        self.api.put_index(db, &body)?;
        info!(db, index = name, maps = body.maps.len(), "index definition put");
        Ok(msg::idx_created(name))
    }

    fn apply_mode(
        &mut self,
        spec: &IndexSpec,
        mode: IndexMode,
        assumed_new: bool,
        check_mode: bool,
    ) -> Result<(bool, String)> {
        let db = spec.db_name.as_str();
        let name = spec.name.as_str();
        let cw = spec.cluster_wide;

        let state = |api: &dyn ClusterApi| -> Result<IndexState> {
            if assumed_new {
                Ok(IndexState::Normal)
            } else {
                api.index_state(db, name)
            }
        };
        let running = |api: &dyn ClusterApi| -> Result<IndexRunningStatus> {
            if assumed_new {
                Ok(IndexRunningStatus::Running)
            } else {
                api.index_running_status(db, name)
            }
        };

        let (change, done, would) = match mode {
            IndexMode::Enabled => {
                if state(&*self.api)? != IndexState::Disabled {
                    return Ok((false, msg::idx_already_enabled(name)));
                }
                (IndexStatusChange::Enable, msg::idx_enabled(name, cw), msg::idx_would_enable(name, cw))
            }
            IndexMode::Disabled => {
                if state(&*self.api)? == IndexState::Disabled {
                    return Ok((false, msg::idx_already_disabled(name)));
                }
                (IndexStatusChange::Disable, msg::idx_disabled(name, cw), msg::idx_would_disable(name, cw))
            }
            IndexMode::Resumed => {
                if running(&*self.api)? == IndexRunningStatus::Running {
                    return Ok((false, msg::idx_already_running(name)));
                }
                (IndexStatusChange::Resume, msg::idx_resumed(name), msg::idx_would_resume(name))
            }
            IndexMode::Paused => {
                if running(&*self.api)? == IndexRunningStatus::Paused {
                    return Ok((false, msg::idx_already_paused(name)));
                }
                (IndexStatusChange::Pause, msg::idx_paused(name), msg::idx_would_pause(name))
            }
            IndexMode::Reset => (IndexStatusChange::Reset, msg::idx_reset(name), msg::idx_would_reset(name)),
        };

        if check_mode {
            return Ok((true, would));
        }
        self.api.set_index_status(db, name, change, cw)?;
        info!(db, index = name, %mode, cluster_wide = cw, "index mode applied");
        Ok((true, done))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
