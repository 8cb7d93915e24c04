//! Banking letters and system-password orders.

use std::{cmp::Reverse, str::FromStr, sync::Arc};

use chrono::{DateTime, Utc};
use shared::{
    domain::{BankingItem, BankingItemId, BankingItemType, BankingStatus, EmployeeId},
    protocol::{ConfirmCollectionRequest, CreateBankingItemRequest},
    time::whole_days_between,
};
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::{
    error::{ActionError, ActionResult},
    remote::OnboardingRemote,
    store::{StoreCell, StoreEvent, StoreKind, TrackedState},
};

/// A filter slot that either admits everything or a single value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Selection<T> {
    #[default]
    All,
    Only(T),
}

impl<T: PartialEq> Selection<T> {
    pub fn admits(&self, value: &T) -> bool {
        match self {
            Self::All => true,
            Self::Only(expected) => expected == value,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortKey {
    #[default]
    OrderedDate,
    /// Items with a ready date are reordered, newest first, among the
    /// positions they already hold; items without one keep their position.
    ReadyDate,
    DaysWaiting,
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "ordereddate" => Ok(Self::OrderedDate),
            "readydate" => Ok(Self::ReadyDate),
            "dayswaiting" => Ok(Self::DaysWaiting),
            _ => Err(format!("unknown sort key '{raw}'")),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BankingFilters {
    pub status: Selection<BankingStatus>,
    pub item_type: Selection<BankingItemType>,
    /// Kept for the presentation layer; banking items carry no department.
    pub department: Selection<String>,
    pub search_query: String,
    pub sort_by: SortKey,
}

/// Partial filter change; `None` leaves the current value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BankingFilterUpdate {
    pub status: Option<Selection<BankingStatus>>,
    pub item_type: Option<Selection<BankingItemType>>,
    pub department: Option<Selection<String>>,
    pub search_query: Option<String>,
    pub sort_by: Option<SortKey>,
}

impl BankingFilters {
    pub fn merge(&mut self, update: BankingFilterUpdate) {
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(item_type) = update.item_type {
            self.item_type = item_type;
        }
        if let Some(department) = update.department {
            self.department = department;
        }
        if let Some(search_query) = update.search_query {
            self.search_query = search_query;
        }
        if let Some(sort_by) = update.sort_by {
            self.sort_by = sort_by;
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BankingStats {
    /// Items still in `ORDERED`.
    pub total_ordered: usize,
    pub ready: usize,
    pub overdue: usize,
    pub collected: usize,
    pub average_days_to_collection: f64,
    pub collection_rate: f64,
}

#[derive(Debug, Clone, Default)]
pub struct BankingState {
    pub items: Vec<BankingItem>,
    pub loading: bool,
    pub filters: BankingFilters,
    pub last_error: Option<String>,
}

impl TrackedState for BankingState {
    fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }

    fn set_last_error(&mut self, error: Option<String>) {
        self.last_error = error;
    }
}

impl BankingState {
    pub fn with_status(&self, status: BankingStatus) -> Vec<BankingItem> {
        self.items
            .iter()
            .filter(|item| item.status == status)
            .cloned()
            .collect()
    }

    pub fn pending(&self) -> Vec<BankingItem> {
        self.with_status(BankingStatus::Ordered)
    }

    pub fn ready(&self) -> Vec<BankingItem> {
        self.with_status(BankingStatus::Ready)
    }

    pub fn overdue(&self) -> Vec<BankingItem> {
        self.with_status(BankingStatus::Overdue)
    }

    pub fn collected(&self) -> Vec<BankingItem> {
        self.with_status(BankingStatus::Collected)
    }

    pub fn filtered_items(&self) -> Vec<BankingItem> {
        self.filtered_items_at(Utc::now())
    }

    /// Status, type and search filters, then a stable descending sort.
    pub fn filtered_items_at(&self, now: DateTime<Utc>) -> Vec<BankingItem> {
        let filters = &self.filters;
        let query = filters.search_query.to_lowercase();
        let mut result: Vec<BankingItem> = self
            .items
            .iter()
            .filter(|item| filters.status.admits(&item.status))
            .filter(|item| filters.item_type.admits(&item.item_type))
            .filter(|item| matches_query(item, &query))
            .cloned()
            .collect();

        match filters.sort_by {
            SortKey::OrderedDate => result.sort_by_key(|item| Reverse(item.ordered_date)),
            SortKey::ReadyDate => sort_by_ready_date(&mut result),
            SortKey::DaysWaiting => result.sort_by_key(|item| Reverse(days_waiting(item, now))),
        }
        result
    }

    pub fn stats(&self) -> BankingStats {
        let count = |status: BankingStatus| self.items.iter().filter(|i| i.status == status).count();
        let collected = count(BankingStatus::Collected);
        let total = self.items.len();

        let collection_days: Vec<i64> = self
            .items
            .iter()
            .filter_map(|item| match (item.ready_date, item.collected_date) {
                (Some(ready), Some(collected)) => Some(whole_days_between(ready, collected)),
                _ => None,
            })
            .collect();
        let average_days = if collection_days.is_empty() {
            0.0
        } else {
            collection_days.iter().sum::<i64>() as f64 / collection_days.len() as f64
        };

        BankingStats {
            total_ordered: count(BankingStatus::Ordered),
            ready: count(BankingStatus::Ready),
            overdue: count(BankingStatus::Overdue),
            collected,
            average_days_to_collection: round_to_tenth(average_days),
            collection_rate: if total > 0 {
                collected as f64 / total as f64 * 100.0
            } else {
                0.0
            },
        }
    }

    pub fn find(&self, id: &BankingItemId) -> Option<&BankingItem> {
        self.items.iter().find(|item| &item.id == id)
    }

    /// Swaps in the record with the same id; false when it is not held locally.
    pub fn replace_item(&mut self, updated: BankingItem) -> bool {
        match self.items.iter_mut().find(|item| item.id == updated.id) {
            Some(slot) => {
                *slot = updated;
                true
            }
            None => false,
        }
    }

    pub fn set_item_status(&mut self, id: &BankingItemId, status: BankingStatus) -> bool {
        match self.items.iter_mut().find(|item| &item.id == id) {
            Some(item) => {
                item.status = status;
                true
            }
            None => false,
        }
    }
}

fn matches_query(item: &BankingItem, query: &str) -> bool {
    if query.is_empty() {
        return true;
    }
    [item.bank_name.as_deref(), item.system_name.as_deref()]
        .into_iter()
        .flatten()
        .any(|name| name.to_lowercase().contains(query))
}

/// Whole days since the item became ready, 0 while it is not.
pub fn days_waiting(item: &BankingItem, now: DateTime<Utc>) -> i64 {
    item.ready_date
        .map(|ready| whole_days_between(ready, now))
        .unwrap_or(0)
}

/// Dated items are reordered among the slots they occupy; undated items stay put.
fn sort_by_ready_date(items: &mut [BankingItem]) {
    let slots: Vec<usize> = items
        .iter()
        .enumerate()
        .filter(|(_, item)| item.ready_date.is_some())
        .map(|(idx, _)| idx)
        .collect();
    let mut dated: Vec<BankingItem> = slots.iter().map(|&idx| items[idx].clone()).collect();
    dated.sort_by_key(|item| Reverse(item.ready_date));
    for (slot, item) in slots.into_iter().zip(dated) {
        items[slot] = item;
    }
}

fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0 + 0.5).floor() / 10.0
}

pub struct BankingStore {
    remote: Arc<dyn OnboardingRemote>,
    cell: StoreCell<BankingState>,
}

impl BankingStore {
    pub fn new(remote: Arc<dyn OnboardingRemote>) -> Self {
        Self {
            remote,
            cell: StoreCell::new(StoreKind::Banking),
        }
    }

    pub async fn snapshot(&self) -> BankingState {
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
        let items = match self.remote.list_banking_items().await {
            Ok(items) => items,
            Err(err) => return self.cell.fail("fetch_all", err).await,
        };
        let count = items.len();
        self.cell.commit(|state| state.items = items).await;
        info!(count, "banking items fetched");
        Ok(())
    }

    /// Orders a bank letter when a non-blank `bank_name` is given, a system
    /// password otherwise.
    pub async fn create_order(
        &self,
        employee_id: EmployeeId,
        bank_name: Option<String>,
        system_name: Option<String>,
    ) -> ActionResult<BankingItem> {
        let request = CreateBankingItemRequest::infer(employee_id, bank_name, system_name);
        if request.target_name().is_none() {
            return Err(ActionError::InvalidRequest(
                "an order needs a bank name or a system name".to_string(),
            ));
        }

        let _flight = self.cell.begin()?;
        let created = match self.remote.create_banking_item(&request).await {
            Ok(item) => item,
            Err(err) => return self.cell.fail("create_order", err).await,
        };
        let appended = created.clone();
        self.cell.commit(|state| state.items.push(appended)).await;
        info!(
            item_id = %created.id,
            employee_id = %created.employee_id,
            item_type = ?created.item_type,
            "banking order created"
        );
        Ok(created)
    }

    /// Returns the remote's view of the confirmed item even when it is not held locally.
    pub async fn confirm_collection(&self, token: &str) -> ActionResult<BankingItem> {
        let request = ConfirmCollectionRequest {
            token: token.to_string(),
        };

        let _flight = self.cell.begin()?;
        let updated = match self.remote.confirm_collection(&request).await {
            Ok(item) => item,
            Err(err) => return self.cell.fail("confirm_collection", err).await,
        };
        let replacement = updated.clone();
        let replaced = self
            .cell
            .commit(|state| state.replace_item(replacement))
            .await;
        if replaced {
            info!(item_id = %updated.id, "collection confirmed");
        } else {
            debug!(item_id = %updated.id, "confirmed item is not held locally");
        }
        Ok(updated)
    }

    pub async fn set_filters(&self, update: BankingFilterUpdate) {
        self.cell.mutate(|state| state.filters.merge(update)).await;
    }

    /// Local administrative override; the remote is not told.
    pub async fn update_item_status(&self, id: &BankingItemId, status: BankingStatus) -> bool {
        let updated = self
            .cell
            .mutate(|state| state.set_item_status(id, status))
            .await;
        debug!(item_id = %id, ?status, updated, "banking status overridden locally");
        updated
    }

    /// Entry point for server-driven transitions (ready, overdue) pushed or polled
    /// by a collaborator.
    pub async fn apply_remote_update(&self, item: BankingItem) -> bool {
        let id = item.id.clone();
        let applied = self.cell.mutate(|state| state.replace_item(item)).await;
        debug!(item_id = %id, applied, "remote banking update applied");
        applied
    }
}

#[cfg(test)]
#[path = "tests/banking_tests.rs"]
mod tests;
