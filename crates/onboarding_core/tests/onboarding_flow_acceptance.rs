use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{Duration, Utc};
use onboarding_core::{
    BankingStore, ClientSettings, EmployeeStore, HttpRemote, NewStarterStore, OnboardingRemote,
    StoreEvent, StoreKind,
};
use shared::{
    domain::{
        BankingItem, BankingItemId, BankingStatus, EmployeeId, NewStarter, NewStarterId,
        NewStarterStatus, SystemType,
    },
    error::{ApiError, ErrorCode},
    protocol::{
        ConfirmCollectionRequest, CreateBankingItemRequest, DirectoryUser,
        GenerateCredentialsRequest, NewStarterForm,
    },
};
use tokio::{net::TcpListener, sync::Mutex};

#[derive(Clone, Default)]
struct Backend {
    items: Arc<Mutex<Vec<BankingItem>>>,
    starters: Arc<Mutex<Vec<NewStarter>>>,
}

type ApiFailure = (StatusCode, Json<ApiError>);

fn not_found(message: &str) -> ApiFailure {
    (
        StatusCode::NOT_FOUND,
        Json(ApiError::new(ErrorCode::NotFound, message)),
    )
}

async fn list_items(State(backend): State<Backend>) -> Json<Vec<BankingItem>> {
    Json(backend.items.lock().await.clone())
}

async fn create_item(
    State(backend): State<Backend>,
    Json(request): Json<CreateBankingItemRequest>,
) -> Json<BankingItem> {
    let mut items = backend.items.lock().await;
    let ordered = Utc::now() - Duration::days(6);
    let item = BankingItem {
        id: BankingItemId::new(format!("bi-{}", items.len() + 1)),
        employee_id: request.employee_id,
        item_type: request.item_type,
        bank_name: request.bank_name,
        system_name: request.system_name,
        status: BankingStatus::Ordered,
        ordered_date: ordered,
        ready_date: None,
        collected_date: None,
        collected_confirmed_by_user: false,
        reminder_count: 0,
        confirmation_token: None,
    };
    items.push(item.clone());
    Json(item)
}

async fn confirm(
    State(backend): State<Backend>,
    Json(request): Json<ConfirmCollectionRequest>,
) -> Result<Json<BankingItem>, ApiFailure> {
    let mut items = backend.items.lock().await;
    let item = items
        .iter_mut()
        .find(|item| item.confirmation_token.as_deref() == Some(request.token.as_str()))
        .ok_or_else(|| not_found("unknown token"))?;
    item.status = BankingStatus::Collected;
    item.collected_date = item.ready_date.map(|ready| ready + Duration::days(2));
    item.collected_confirmed_by_user = true;
    item.confirmation_token = None;
    Ok(Json(item.clone()))
}

async fn search_users(Query(params): Query<HashMap<String, String>>) -> Json<Vec<DirectoryUser>> {
    let query = params.get("q").cloned().unwrap_or_default().to_lowercase();
    let users = vec![
        DirectoryUser {
            sam_account_name: "jdoe".into(),
            display_name: "Jane Doe".into(),
            mail: "jane.doe@example.com".into(),
            manager: "lead@example.com".into(),
            department: "Markets".into(),
            title: Some("Analyst".into()),
            start_date: None,
        },
        DirectoryUser {
            sam_account_name: "rroe".into(),
            display_name: "Rick Roe".into(),
            mail: "rick.roe@example.com".into(),
            manager: "lead@example.com".into(),
            department: "Markets".into(),
            title: None,
            start_date: None,
        },
    ];
    Json(
        users
            .into_iter()
            .filter(|u| u.display_name.to_lowercase().contains(&query))
            .collect(),
    )
}

async fn list_starters(State(backend): State<Backend>) -> Json<Vec<NewStarter>> {
    Json(backend.starters.lock().await.clone())
}

async fn create_starter(
    State(backend): State<Backend>,
    Json(form): Json<NewStarterForm>,
) -> Json<NewStarter> {
    let mut starters = backend.starters.lock().await;
    let starter = NewStarter {
        id: NewStarterId::new(format!("ns-{}", starters.len() + 1)),
        employee_id: form.employee_id,
        systems: form.systems,
        created_at: Utc::now(),
        status: NewStarterStatus::Created,
        sent_by_user: None,
        notes: form.notes,
    };
    starters.push(starter.clone());
    Json(starter)
}

async fn generate(
    State(backend): State<Backend>,
    Json(request): Json<GenerateCredentialsRequest>,
) -> Json<Vec<NewStarter>> {
    let mut starters = backend.starters.lock().await;
    let updated = starters
        .iter_mut()
        .filter(|s| request.starter_ids.contains(&s.id))
        .map(|s| {
            s.status = NewStarterStatus::Sent;
            s.sent_by_user = Some(request.sent_by_user.clone());
            s.clone()
        })
        .collect();
    Json(updated)
}

async fn welcome(
    State(backend): State<Backend>,
    Path(id): Path<String>,
) -> Result<Json<NewStarter>, ApiFailure> {
    let mut starters = backend.starters.lock().await;
    let starter = starters
        .iter_mut()
        .find(|s| s.id.as_str() == id)
        .ok_or_else(|| not_found("unknown starter"))?;
    starter.status = NewStarterStatus::Sent;
    Ok(Json(starter.clone()))
}

async fn spawn_backend() -> (Arc<dyn OnboardingRemote>, Backend) {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let backend = Backend::default();
    let app = Router::new()
        .route("/api/banking-items", get(list_items).post(create_item))
        .route("/api/banking-items/confirm", post(confirm))
        .route("/api/ad/users", get(search_users))
        .route("/api/new-starters", get(list_starters).post(create_starter))
        .route("/api/new-starters/generate-credentials", post(generate))
        .route("/api/new-starters/:id/send-welcome", post(welcome))
        .with_state(backend.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    let settings = ClientSettings::default()
        .with_api_url(&format!("http://{addr}/api"))
        .expect("api url");
    let remote = HttpRemote::new(&settings).expect("http remote");
    (Arc::new(remote), backend)
}

#[tokio::test]
async fn new_hire_banking_and_credentials_acceptance() {
    let (remote, backend) = spawn_backend().await;
    let employees = EmployeeStore::new(Arc::clone(&remote));
    let banking = BankingStore::new(Arc::clone(&remote));
    let starters = NewStarterStore::new(Arc::clone(&remote));

    // directory lookup and banking flag
    employees.search_directory("jane").await.expect("search");
    let jane_id = EmployeeId::from("jdoe");
    assert!(employees.mark_needs_banking(&jane_id).await);
    let roster = employees.snapshot().await;
    assert_eq!(roster.employees.len(), 1);
    assert_eq!(roster.needs_banking().len(), 1);

    // order a letter and a password, then the bank reports the letter ready
    let mut banking_events = banking.subscribe();
    let letter = banking
        .create_order(jane_id.clone(), Some("HSBC".into()), None)
        .await
        .expect("letter");
    banking
        .create_order(jane_id.clone(), None, Some("Bloomberg".into()))
        .await
        .expect("password");
    assert_eq!(
        banking_events.recv().await.expect("event"),
        StoreEvent::LoadingChanged {
            store: StoreKind::Banking,
            loading: true
        }
    );

    {
        let mut items = backend.items.lock().await;
        let ready = items
            .iter_mut()
            .find(|item| item.id == letter.id)
            .expect("letter on server");
        ready.status = BankingStatus::Ready;
        ready.ready_date = Some(Utc::now() - Duration::days(3));
        ready.confirmation_token = Some("tok-letter".into());
    }
    banking.fetch_all().await.expect("fetch");
    let snapshot = banking.snapshot().await;
    assert_eq!(snapshot.ready().len(), 1);
    assert_eq!(snapshot.pending().len(), 1);

    banking
        .confirm_collection("tok-letter")
        .await
        .expect("confirm");
    let stats = banking.snapshot().await.stats();
    assert_eq!(stats.collected, 1);
    assert_eq!(stats.total_ordered, 1);
    assert_eq!(stats.collection_rate, 50.0);
    assert_eq!(stats.average_days_to_collection, 2.0);

    // a reused token is rejected by the server and recorded locally
    let err = banking
        .confirm_collection("tok-letter")
        .await
        .expect_err("token consumed");
    assert_eq!(err.status(), Some(404));
    let snapshot = banking.snapshot().await;
    assert!(!snapshot.loading);
    assert!(snapshot
        .last_error
        .as_deref()
        .is_some_and(|e| e.contains("unknown token")));

    // credentials for the new starter
    let created = starters
        .create_new_starter(NewStarterForm {
            employee_id: jane_id.clone(),
            systems: vec![SystemType::Email, SystemType::TradingPlatform],
            notes: None,
        })
        .await
        .expect("create starter");
    let batch = starters
        .generate_credentials(vec![created.id.clone()], "ops@example.com")
        .await
        .expect("generate");
    assert_eq!(batch.len(), 1);
    let welcomed = starters
        .send_welcome_email(&created.id)
        .await
        .expect("welcome");
    assert_eq!(welcomed.sent_by_user.as_deref(), Some("ops@example.com"));

    starters.fetch_all().await.expect("sync starters");
    let snapshot = starters.snapshot().await;
    assert_eq!(snapshot.sent().len(), 1);
    assert_eq!(snapshot.delivery_rate(), 100.0);
}
