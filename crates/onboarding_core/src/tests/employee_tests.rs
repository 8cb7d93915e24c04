use super::*;
use crate::fake_remote::{day, directory_user, FakeRemote};

fn employee(id: &str, name: &str, email: &str) -> Employee {
    Employee {
        id: EmployeeId::from(id),
        name: name.to_string(),
        email: email.to_string(),
        manager_email: "manager@example.com".to_string(),
        department: "Operations".to_string(),
        start_date: day(2024, 2, 1),
        needs_banking: false,
        banking_completed_date: None,
    }
}

fn names(employees: &[Employee]) -> Vec<&str> {
    employees.iter().map(|e| e.name.as_str()).collect()
}

#[test]
fn filtered_employees_match_name_or_email_case_insensitively() {
    let mut state = EmployeeState {
        employees: vec![
            employee("jdoe", "Jane Doe", "jane.doe@example.com"),
            employee("asmith", "Alan Smith", "alan@contractors.example"),
            employee("bwu", "Bo Wu", "bo.wu@example.com"),
        ],
        ..EmployeeState::default()
    };

    assert_eq!(state.filtered_employees().len(), 3);

    state.search_query = "SMITH".to_string();
    assert_eq!(names(&state.filtered_employees()), vec!["Alan Smith"]);

    state.search_query = "CONTRACTORS".to_string();
    assert_eq!(names(&state.filtered_employees()), vec!["Alan Smith"]);

    state.search_query = "example.com".to_string();
    assert_eq!(names(&state.filtered_employees()), vec!["Jane Doe", "Bo Wu"]);
}

#[test]
fn needs_banking_excludes_completed_employees() {
    let mut waiting = employee("jdoe", "Jane Doe", "jane@example.com");
    waiting.needs_banking = true;
    let mut done = employee("asmith", "Alan Smith", "alan@example.com");
    done.needs_banking = true;
    done.banking_completed_date = Some(day(2024, 2, 10));
    let untouched = employee("bwu", "Bo Wu", "bo@example.com");
    let state = EmployeeState {
        employees: vec![waiting, done, untouched],
        ..EmployeeState::default()
    };

    assert_eq!(names(&state.needs_banking()), vec!["Jane Doe"]);
    assert_eq!(names(&state.banking_completed()), vec!["Alan Smith"]);
}

#[test]
fn directory_mapping_defaults_start_date_and_banking_flags() {
    let now = day(2024, 5, 1);
    let mut user = directory_user("jdoe", "Jane Doe");
    user.start_date = None;

    let mapped = employee_from_directory(user, now);
    assert_eq!(mapped.id, EmployeeId::from("jdoe"));
    assert_eq!(mapped.email, "jdoe@example.com");
    assert_eq!(mapped.manager_email, "manager@example.com");
    assert_eq!(mapped.start_date, now);
    assert!(!mapped.needs_banking);
    assert!(mapped.banking_completed_date.is_none());
}

#[test]
fn update_can_set_and_clear_completion_date() {
    let mut state = EmployeeState {
        employees: vec![employee("jdoe", "Jane Doe", "jane@example.com")],
        ..EmployeeState::default()
    };
    let id = EmployeeId::from("jdoe");

    assert!(state.update_employee(
        &id,
        EmployeeUpdate {
            department: Some("Trading".to_string()),
            banking_completed_date: Some(Some(day(2024, 3, 1))),
            ..EmployeeUpdate::default()
        }
    ));
    let updated = state.find(&id).expect("employee");
    assert_eq!(updated.department, "Trading");
    assert_eq!(updated.name, "Jane Doe");
    assert!(updated.banking_completed_date.is_some());

    assert!(state.update_employee(
        &id,
        EmployeeUpdate {
            banking_completed_date: Some(None),
            ..EmployeeUpdate::default()
        }
    ));
    assert!(state.find(&id).expect("employee").banking_completed_date.is_none());
}

#[tokio::test]
async fn search_replaces_previous_results() {
    let remote = FakeRemote::new()
        .with_directory_users(vec![
            directory_user("jdoe", "Jane Doe"),
            directory_user("jdunn", "Jack Dunn"),
            directory_user("asmith", "Alan Smith"),
        ])
        .await;
    let store = EmployeeStore::new(remote);

    store.search_directory("ja").await.expect("first search");
    assert_eq!(
        names(&store.snapshot().await.employees),
        vec!["Jane Doe", "Jack Dunn"]
    );

    store.search_directory("smith").await.expect("second search");
    let snapshot = store.snapshot().await;
    assert_eq!(names(&snapshot.employees), vec!["Alan Smith"]);
    assert!(!snapshot.loading);
}

#[tokio::test]
async fn search_failure_keeps_previous_results() {
    let remote = FakeRemote::new()
        .with_directory_users(vec![directory_user("jdoe", "Jane Doe")])
        .await;
    let store = EmployeeStore::new(remote.clone());
    store.search_directory("jane").await.expect("search");

    remote.fail_next(502, "ldap unreachable").await;
    let err = store.search_directory("jane").await.expect_err("must fail");
    assert_eq!(err.status(), Some(502));

    let snapshot = store.snapshot().await;
    assert_eq!(snapshot.employees.len(), 1);
    assert!(!snapshot.loading);
    assert!(snapshot.last_error.is_some());
}

#[tokio::test]
async fn selection_query_and_local_updates() {
    let remote = FakeRemote::new()
        .with_directory_users(vec![
            directory_user("jdoe", "Jane Doe"),
            directory_user("asmith", "Alan Smith"),
        ])
        .await;
    let store = EmployeeStore::new(remote);
    store.search_directory("").await.expect("search");

    let jane = store.snapshot().await.employees[0].clone();
    store.set_selected_employee(jane.clone()).await;
    store.set_search_query("alan").await;
    let snapshot = store.snapshot().await;
    assert_eq!(snapshot.selected_employee, Some(jane));
    assert_eq!(names(&snapshot.filtered_employees()), vec!["Alan Smith"]);

    assert!(store.mark_needs_banking(&EmployeeId::from("asmith")).await);
    assert!(!store.mark_needs_banking(&EmployeeId::from("ghost")).await);
    assert_eq!(
        names(&store.snapshot().await.needs_banking()),
        vec!["Alan Smith"]
    );

    store.clear_search().await;
    let snapshot = store.snapshot().await;
    assert!(snapshot.search_query.is_empty());
    assert!(snapshot.selected_employee.is_none());
    assert_eq!(snapshot.employees.len(), 2);
}
