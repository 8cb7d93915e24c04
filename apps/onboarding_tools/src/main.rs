use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use onboarding_core::{
    banking::days_waiting, load_settings, BankingFilterUpdate, BankingStore, EmployeeStore,
    HttpRemote, NewStarterStore, OnboardingRemote, Selection, SortKey,
};
use shared::{
    domain::{
        BankingItem, BankingItemType, BankingStatus, EmployeeId, NewStarter, NewStarterId,
        SystemType,
    },
    protocol::NewStarterForm,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "onboarding-tools")]
struct Cli {
    /// Overrides the configured API base URL.
    #[arg(long)]
    api_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    #[command(subcommand)]
    Banking(BankingCommand),
    #[command(subcommand)]
    Employees(EmployeeCommand),
    #[command(subcommand)]
    Starters(StarterCommand),
}

#[derive(Subcommand, Debug)]
enum BankingCommand {
    List {
        #[arg(long)]
        status: Option<BankingStatus>,
        #[arg(long = "type")]
        item_type: Option<BankingItemType>,
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        sort_by: Option<SortKey>,
    },
    Stats,
    Order {
        #[arg(long)]
        employee_id: String,
        #[arg(long, required_unless_present = "system_name", conflicts_with = "system_name")]
        bank_name: Option<String>,
        #[arg(long, required_unless_present = "bank_name")]
        system_name: Option<String>,
    },
    Confirm {
        token: String,
    },
}

#[derive(Subcommand, Debug)]
enum EmployeeCommand {
    Search {
        query: String,
        /// Narrows the directory results by name or email.
        #[arg(long)]
        filter: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum StarterCommand {
    List {
        #[arg(long)]
        recent: bool,
    },
    Create {
        #[arg(long)]
        employee_id: String,
        #[arg(long = "system", required = true)]
        systems: Vec<SystemType>,
        #[arg(long)]
        notes: Option<String>,
    },
    Generate {
        #[arg(required = true)]
        ids: Vec<String>,
        #[arg(long)]
        sent_by: Option<String>,
    },
    Welcome {
        id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut settings = load_settings()?;
    if let Some(api_url) = cli.api_url.as_deref() {
        settings = settings.with_api_url(api_url)?;
    }
    let http = HttpRemote::new(&settings)?;
    tracing::debug!(api_url = %http.base_url(), "using onboarding api");
    let remote: Arc<dyn OnboardingRemote> = Arc::new(http);

    match cli.command {
        Command::Banking(command) => run_banking(command, remote).await?,
        Command::Employees(command) => run_employees(command, remote).await?,
        Command::Starters(command) => {
            run_starters(command, remote, settings.current_user_email).await?
        }
    }

    Ok(())
}

async fn run_banking(command: BankingCommand, remote: Arc<dyn OnboardingRemote>) -> Result<()> {
    let store = BankingStore::new(remote);

    match command {
        BankingCommand::List {
            status,
            item_type,
            search,
            sort_by,
        } => {
            store.fetch_all().await?;
            store
                .set_filters(BankingFilterUpdate {
                    status: status.map(Selection::Only),
                    item_type: item_type.map(Selection::Only),
                    search_query: search,
                    sort_by,
                    ..BankingFilterUpdate::default()
                })
                .await;
            let items = store.snapshot().await.filtered_items();
            for item in &items {
                print_banking_item(item);
            }
            println!("{} item(s)", items.len());
        }
        BankingCommand::Stats => {
            store.fetch_all().await?;
            let stats = store.snapshot().await.stats();
            println!("ordered={}", stats.total_ordered);
            println!("ready={}", stats.ready);
            println!("overdue={}", stats.overdue);
            println!("collected={}", stats.collected);
            println!("average_days_to_collection={:.1}", stats.average_days_to_collection);
            println!("collection_rate={:.1}%", stats.collection_rate);
        }
        BankingCommand::Order {
            employee_id,
            bank_name,
            system_name,
        } => {
            let item = store
                .create_order(EmployeeId::new(employee_id), bank_name, system_name)
                .await?;
            println!("created banking item {}", item.id);
            print_banking_item(&item);
        }
        BankingCommand::Confirm { token } => {
            let item = store.confirm_collection(&token).await?;
            println!("confirmed collection of {}", item.id);
            print_banking_item(&item);
        }
    }

    Ok(())
}

async fn run_employees(command: EmployeeCommand, remote: Arc<dyn OnboardingRemote>) -> Result<()> {
    let store = EmployeeStore::new(remote);

    match command {
        EmployeeCommand::Search { query, filter } => {
            store.search_directory(&query).await?;
            if let Some(filter) = filter {
                store.set_search_query(filter).await;
            }
            let employees = store.snapshot().await.filtered_employees();
            for employee in &employees {
                println!(
                    "{}\t{}\t{}\t{}\tstarts {}",
                    employee.id,
                    employee.name,
                    employee.email,
                    employee.department,
                    employee.start_date.format("%Y-%m-%d")
                );
            }
            println!("{} employee(s)", employees.len());
        }
    }

    Ok(())
}

async fn run_starters(
    command: StarterCommand,
    remote: Arc<dyn OnboardingRemote>,
    current_user_email: Option<String>,
) -> Result<()> {
    let store = NewStarterStore::new(remote);

    match command {
        StarterCommand::List { recent } => {
            store.fetch_all().await?;
            let snapshot = store.snapshot().await;
            let starters = if recent {
                snapshot.recent_starters()
            } else {
                snapshot.starters.clone()
            };
            for starter in &starters {
                print_starter(starter);
            }
            println!(
                "{} starter(s), pending={} sent={} confirmed={}, delivery_rate={:.1}%",
                starters.len(),
                snapshot.pending().len(),
                snapshot.sent().len(),
                snapshot.confirmed().len(),
                snapshot.delivery_rate()
            );
        }
        StarterCommand::Create {
            employee_id,
            systems,
            notes,
        } => {
            let starter = store
                .create_new_starter(NewStarterForm {
                    employee_id: EmployeeId::new(employee_id),
                    systems,
                    notes,
                })
                .await?;
            println!("created new starter {}", starter.id);
            print_starter(&starter);
        }
        StarterCommand::Generate { ids, sent_by } => {
            let sent_by = sent_by
                .or(current_user_email)
                .context("no sender given; pass --sent-by or set ONBOARDING_USER_EMAIL")?;
            let ids = ids.into_iter().map(NewStarterId::new).collect();
            let batch = store.generate_credentials(ids, sent_by).await?;
            for starter in &batch {
                print_starter(starter);
            }
            println!("credentials generated for {} starter(s)", batch.len());
        }
        StarterCommand::Welcome { id } => {
            let starter = store.send_welcome_email(&NewStarterId::new(id)).await?;
            println!("welcome email sent to {}", starter.employee_id);
            print_starter(&starter);
        }
    }

    Ok(())
}

fn print_banking_item(item: &BankingItem) {
    println!(
        "{}\t{:?}\t{:?}\t{}\t{}\tordered {}\twaiting {}d",
        item.id,
        item.item_type,
        item.status,
        item.employee_id,
        item.label().unwrap_or("-"),
        item.ordered_date.format("%Y-%m-%d"),
        days_waiting(item, Utc::now())
    );
}

fn print_starter(starter: &NewStarter) {
    let systems: Vec<String> = starter.systems.iter().map(|s| format!("{s:?}")).collect();
    println!(
        "{}\t{:?}\t{}\t{}\tcreated {}\t{}",
        starter.id,
        starter.status,
        starter.employee_id,
        systems.join(","),
        starter.created_at.format("%Y-%m-%d"),
        starter.sent_by_user.as_deref().unwrap_or("-")
    );
}
