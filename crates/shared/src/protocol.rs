use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{BankingItemType, EmployeeId, NewStarterId, SystemType};

/// Body of `POST /banking-items`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBankingItemRequest {
    #[serde(rename = "type")]
    pub item_type: BankingItemType,
    pub employee_id: EmployeeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bank_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_name: Option<String>,
}

impl CreateBankingItemRequest {
    /// Letters are ordered whenever a bank is named, passwords otherwise.
    /// Blank names count as absent, and only the name matching the inferred
    /// type is kept.
    pub fn infer(
        employee_id: EmployeeId,
        bank_name: Option<String>,
        system_name: Option<String>,
    ) -> Self {
        let bank_name = non_blank(bank_name);
        let system_name = non_blank(system_name);
        match bank_name {
            Some(bank) => Self {
                item_type: BankingItemType::BankLetter,
                employee_id,
                bank_name: Some(bank),
                system_name: None,
            },
            None => Self {
                item_type: BankingItemType::SystemPassword,
                employee_id,
                bank_name: None,
                system_name,
            },
        }
    }

    /// The name the order is for; `None` when neither name was usable.
    pub fn target_name(&self) -> Option<&str> {
        self.bank_name.as_deref().or(self.system_name.as_deref())
    }
}

fn non_blank(name: Option<String>) -> Option<String> {
    name.filter(|n| !n.trim().is_empty())
}

/// Body of `POST /banking-items/confirm`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmCollectionRequest {
    pub token: String,
}

/// Body of `POST /new-starters`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewStarterForm {
    pub employee_id: EmployeeId,
    pub systems: Vec<SystemType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Body of `POST /new-starters/generate-credentials`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateCredentialsRequest {
    pub starter_ids: Vec<NewStarterId>,
    pub sent_by_user: String,
}

/// A user record as returned by the directory search endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryUser {
    pub sam_account_name: String,
    pub display_name: String,
    pub mail: String,
    /// Manager email or distinguished name, passed through untouched.
    pub manager: String,
    pub department: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "crate::time::iso_opt"
    )]
    pub start_date: Option<DateTime<Utc>>,
}
