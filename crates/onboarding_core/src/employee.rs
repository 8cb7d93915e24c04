use std::sync::Arc;

use chrono::{DateTime, Utc};
use shared::{
    domain::{Employee, EmployeeId},
    protocol::DirectoryUser,
};
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::{
    error::ActionResult,
    remote::OnboardingRemote,
    store::{StoreCell, StoreEvent, StoreKind, TrackedState},
};

#[derive(Debug, Clone, Default)]
pub struct EmployeeState {
    pub employees: Vec<Employee>,
    pub loading: bool,
    pub selected_employee: Option<Employee>,
    pub search_query: String,
    pub last_error: Option<String>,
}

impl TrackedState for EmployeeState {
    fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }

    fn set_last_error(&mut self, error: Option<String>) {
        self.last_error = error;
    }
}

impl EmployeeState {
    pub fn filtered_employees(&self) -> Vec<Employee> {
        let query = self.search_query.to_lowercase();
        self.employees
            .iter()
            .filter(|emp| {
                emp.name.to_lowercase().contains(&query) || emp.email.to_lowercase().contains(&query)
            })
            .cloned()
            .collect()
    }

    pub fn needs_banking(&self) -> Vec<Employee> {
        self.employees
            .iter()
            .filter(|emp| emp.awaiting_banking())
            .cloned()
            .collect()
    }

    pub fn banking_completed(&self) -> Vec<Employee> {
        self.employees
            .iter()
            .filter(|emp| emp.banking_completed_date.is_some())
            .cloned()
            .collect()
    }

    pub fn find(&self, id: &EmployeeId) -> Option<&Employee> {
        self.employees.iter().find(|emp| &emp.id == id)
    }

    pub fn update_employee(&mut self, id: &EmployeeId, update: EmployeeUpdate) -> bool {
        match self.employees.iter_mut().find(|emp| &emp.id == id) {
            Some(employee) => {
                update.apply_to(employee);
                true
            }
            None => false,
        }
    }
}

/// Shallow patch for an [`Employee`]. `banking_completed_date: Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmployeeUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub manager_email: Option<String>,
    pub department: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub needs_banking: Option<bool>,
    pub banking_completed_date: Option<Option<DateTime<Utc>>>,
}

impl EmployeeUpdate {
    pub fn apply_to(self, employee: &mut Employee) {
        if let Some(v) = self.name {
            employee.name = v;
        }
        if let Some(v) = self.email {
            employee.email = v;
        }
        if let Some(v) = self.manager_email {
            employee.manager_email = v;
        }
        if let Some(v) = self.department {
            employee.department = v;
        }
        if let Some(v) = self.start_date {
            employee.start_date = v;
        }
        if let Some(v) = self.needs_banking {
            employee.needs_banking = v;
        }
        if let Some(v) = self.banking_completed_date {
            employee.banking_completed_date = v;
        }
    }
}

/// Directory records start with no banking requirement; a missing start date
/// defaults to `now`.
pub fn employee_from_directory(user: DirectoryUser, now: DateTime<Utc>) -> Employee {
    Employee {
        id: EmployeeId::new(user.sam_account_name),
        name: user.display_name,
        email: user.mail,
        manager_email: user.manager,
        department: user.department,
        start_date: user.start_date.unwrap_or(now),
        needs_banking: false,
        banking_completed_date: None,
    }
}

pub struct EmployeeStore {
    remote: Arc<dyn OnboardingRemote>,
    cell: StoreCell<EmployeeState>,
}

impl EmployeeStore {
    pub fn new(remote: Arc<dyn OnboardingRemote>) -> Self {
        Self {
            remote,
            cell: StoreCell::new(StoreKind::Employee),
        }
    }

    pub async fn snapshot(&self) -> EmployeeState {
        self.cell.snapshot().await
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.cell.subscribe()
    }

    pub fn is_loading(&self) -> bool {
        self.cell.is_loading()
    }

    /// Replaces the whole employee list with the directory results for `query`.
    pub async fn search_directory(&self, query: &str) -> ActionResult<()> {
        let _flight = self.cell.begin()?;
        let users = match self.remote.search_directory_users(query).await {
            Ok(users) => users,
            Err(err) => return self.cell.fail("search_directory", err).await,
        };
        let now = Utc::now();
        let employees: Vec<Employee> = users
            .into_iter()
            .map(|user| employee_from_directory(user, now))
            .collect();
        let count = employees.len();
        self.cell.commit(|state| state.employees = employees).await;
        info!(query, count, "directory search completed");
        Ok(())
    }

    pub async fn set_selected_employee(&self, employee: Employee) {
        self.cell
            .mutate(|state| state.selected_employee = Some(employee))
            .await;
    }

    pub async fn set_search_query(&self, query: impl Into<String>) {
        let query = query.into();
        self.cell.mutate(|state| state.search_query = query).await;
    }

    pub async fn clear_search(&self) {
        self.cell
            .mutate(|state| {
                state.search_query.clear();
                state.selected_employee = None;
            })
            .await;
    }

    pub async fn update_employee(&self, id: &EmployeeId, update: EmployeeUpdate) -> bool {
        let updated = self
            .cell
            .mutate(|state| state.update_employee(id, update))
            .await;
        debug!(employee_id = %id, updated, "employee updated locally");
        updated
    }

    pub async fn mark_needs_banking(&self, id: &EmployeeId) -> bool {
        self.update_employee(
            id,
            EmployeeUpdate {
                needs_banking: Some(true),
                ..EmployeeUpdate::default()
            },
        )
        .await
    }
}

#[cfg(test)]
#[path = "tests/employee_tests.rs"]
mod tests;
