use std::{cmp::Reverse, sync::Arc};

use shared::{
    domain::{NewStarter, NewStarterId, NewStarterStatus},
    protocol::{GenerateCredentialsRequest, NewStarterForm},
};
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::{
    error::{ActionError, ActionResult},
    remote::OnboardingRemote,
    store::{StoreCell, StoreEvent, StoreKind, TrackedState},
};

#[derive(Debug, Clone, Default)]
pub struct NewStarterState {
    pub starters: Vec<NewStarter>,
    pub loading: bool,
    pub last_error: Option<String>,
}

impl TrackedState for NewStarterState {
    fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }

    fn set_last_error(&mut self, error: Option<String>) {
        self.last_error = error;
    }
}

impl NewStarterState {
    pub fn with_status(&self, status: NewStarterStatus) -> Vec<NewStarter> {
        self.starters
            .iter()
            .filter(|s| s.status == status)
            .cloned()
            .collect()
    }

    pub fn pending(&self) -> Vec<NewStarter> {
        self.with_status(NewStarterStatus::Created)
    }

    pub fn sent(&self) -> Vec<NewStarter> {
        self.with_status(NewStarterStatus::Sent)
    }

    pub fn confirmed(&self) -> Vec<NewStarter> {
        self.with_status(NewStarterStatus::Confirmed)
    }

    /// Newest first. Sorts a copy; `starters` keeps its order.
    pub fn recent_starters(&self) -> Vec<NewStarter> {
        let mut recent = self.starters.clone();
        recent.sort_by_key(|s| Reverse(s.created_at));
        recent
    }

    /// Share of starters past `CREATED`, as a percentage.
    pub fn delivery_rate(&self) -> f64 {
        if self.starters.is_empty() {
            return 0.0;
        }
        let delivered = self
            .starters
            .iter()
            .filter(|s| s.status != NewStarterStatus::Created)
            .count();
        delivered as f64 / self.starters.len() as f64 * 100.0
    }

    pub fn replace_starter(&mut self, updated: NewStarter) -> bool {
        match self.starters.iter_mut().find(|s| s.id == updated.id) {
            Some(slot) => {
                *slot = updated;
                true
            }
            None => false,
        }
    }

    pub fn set_status(&mut self, id: &NewStarterId, status: NewStarterStatus) -> bool {
        match self.starters.iter_mut().find(|s| &s.id == id) {
            Some(starter) => {
                starter.status = status;
                true
            }
            None => false,
        }
    }
}

pub struct NewStarterStore {
    remote: Arc<dyn OnboardingRemote>,
    cell: StoreCell<NewStarterState>,
}

impl NewStarterStore {
    pub fn new(remote: Arc<dyn OnboardingRemote>) -> Self {
        Self {
            remote,
            cell: StoreCell::new(StoreKind::NewStarter),
        }
    }

    pub async fn snapshot(&self) -> NewStarterState {
        self.cell.snapshot().await
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.cell.subscribe()
    }

    pub fn is_loading(&self) -> bool {
        self.cell.is_loading()
    }

    pub async fn fetch_all(&self) -> ActionResult<()> {
        let _flight = self.cell.begin()?;
        let starters = match self.remote.list_new_starters().await {
            Ok(starters) => starters,
            Err(err) => return self.cell.fail("fetch_all", err).await,
        };
        let count = starters.len();
        self.cell.commit(|state| state.starters = starters).await;
        info!(count, "new starters fetched");
        Ok(())
    }

    pub async fn create_new_starter(&self, form: NewStarterForm) -> ActionResult<NewStarter> {
        if form.systems.is_empty() {
            return Err(ActionError::InvalidRequest(
                "a new starter needs at least one system".to_string(),
            ));
        }

        let _flight = self.cell.begin()?;
        let created = match self.remote.create_new_starter(&form).await {
            Ok(starter) => starter,
            Err(err) => return self.cell.fail("create_new_starter", err).await,
        };
        let appended = created.clone();
        self.cell.commit(|state| state.starters.push(appended)).await;
        info!(
            starter_id = %created.id,
            employee_id = %created.employee_id,
            systems = created.systems.len(),
            "new starter created"
        );
        Ok(created)
    }

    /// Records returned for ids not held locally are ignored.
    pub async fn generate_credentials(
        &self,
        starter_ids: Vec<NewStarterId>,
        sent_by_user: impl Into<String>,
    ) -> ActionResult<Vec<NewStarter>> {
        let request = GenerateCredentialsRequest {
            starter_ids,
            sent_by_user: sent_by_user.into(),
        };

        let _flight = self.cell.begin()?;
        let updated = match self.remote.generate_credentials(&request).await {
            Ok(updated) => updated,
            Err(err) => return self.cell.fail("generate_credentials", err).await,
        };
        let batch = updated.clone();
        let applied = self
            .cell
            .commit(|state| {
                batch
                    .into_iter()
                    .filter(|starter| state.replace_starter(starter.clone()))
                    .count()
            })
            .await;
        info!(
            requested = request.starter_ids.len(),
            returned = updated.len(),
            applied,
            sent_by = %request.sent_by_user,
            "credentials generated"
        );
        Ok(updated)
    }

    pub async fn send_welcome_email(&self, starter_id: &NewStarterId) -> ActionResult<NewStarter> {
        let _flight = self.cell.begin()?;
        let updated = match self.remote.send_welcome_email(starter_id).await {
            Ok(starter) => starter,
            Err(err) => return self.cell.fail("send_welcome_email", err).await,
        };
        let replacement = updated.clone();
        let replaced = self
            .cell
            .commit(|state| state.replace_starter(replacement))
            .await;
        info!(starter_id = %updated.id, replaced, "welcome email sent");
        Ok(updated)
    }

    /// Local override; the remote is not told.
    pub async fn update_status(&self, id: &NewStarterId, status: NewStarterStatus) -> bool {
        let updated = self.cell.mutate(|state| state.set_status(id, status)).await;
        debug!(starter_id = %id, ?status, updated, "new starter status overridden locally");
        updated
    }

    /// Entry point for the out-of-band confirmation pushed or polled by a collaborator.
    pub async fn apply_remote_update(&self, starter: NewStarter) -> bool {
        let id = starter.id.clone();
        let applied = self
            .cell
            .mutate(|state| state.replace_starter(starter))
            .await;
        debug!(starter_id = %id, applied, "remote new starter update applied");
        applied
    }
}

#[cfg(test)]
#[path = "tests/new_starter_tests.rs"]
mod tests;
