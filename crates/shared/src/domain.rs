use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

/// Accepts the wire name in any case, with `-`, `_` or nothing between words.
macro_rules! parse_by_wire_name {
    ($name:ident { $($variant:ident => $wire:literal),+ $(,)? }) => {
        impl FromStr for $name {
            type Err = String;

            fn from_str(raw: &str) -> Result<Self, Self::Err> {
                let normalized = raw.trim().to_ascii_uppercase().replace(['-', '_'], "");
                $(
                    if normalized == $wire.replace('_', "") {
                        return Ok(Self::$variant);
                    }
                )+
                Err(format!("unknown {} '{raw}'", stringify!($name)))
            }
        }
    };
}

id_newtype!(EmployeeId);
id_newtype!(BankingItemId);
id_newtype!(NewStarterId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BankingItemType {
    BankLetter,
    SystemPassword,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BankingStatus {
    Ordered,
    Ready,
    Collected,
    Overdue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SystemType {
    Crm,
    TradingPlatform,
    HrPortal,
    Email,
    Vpn,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NewStarterStatus {
    Created,
    Sent,
    Confirmed,
}

parse_by_wire_name!(BankingItemType {
    BankLetter => "BANK_LETTER",
    SystemPassword => "SYSTEM_PASSWORD",
});

parse_by_wire_name!(BankingStatus {
    Ordered => "ORDERED",
    Ready => "READY",
    Collected => "COLLECTED",
    Overdue => "OVERDUE",
});

parse_by_wire_name!(SystemType {
    Crm => "CRM",
    TradingPlatform => "TRADING_PLATFORM",
    HrPortal => "HR_PORTAL",
    Email => "EMAIL",
    Vpn => "VPN",
    Other => "OTHER",
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub id: EmployeeId,
    pub name: String,
    pub email: String,
    pub manager_email: String,
    pub department: String,
    #[serde(with = "crate::time::iso")]
    pub start_date: DateTime<Utc>,
    pub needs_banking: bool,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "crate::time::iso_opt"
    )]
    pub banking_completed_date: Option<DateTime<Utc>>,
}

impl Employee {
    pub fn awaiting_banking(&self) -> bool {
        self.needs_banking && self.banking_completed_date.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankingItem {
    pub id: BankingItemId,
    pub employee_id: EmployeeId,
    #[serde(rename = "type")]
    pub item_type: BankingItemType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bank_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_name: Option<String>,
    pub status: BankingStatus,
    #[serde(with = "crate::time::iso")]
    pub ordered_date: DateTime<Utc>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "crate::time::iso_opt"
    )]
    pub ready_date: Option<DateTime<Utc>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "crate::time::iso_opt"
    )]
    pub collected_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub collected_confirmed_by_user: bool,
    #[serde(default)]
    pub reminder_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmation_token: Option<String>,
}

impl BankingItem {
    /// Bank name for letters, system name for passwords.
    pub fn label(&self) -> Option<&str> {
        let preferred = match self.item_type {
            BankingItemType::BankLetter => self.bank_name.as_deref(),
            BankingItemType::SystemPassword => self.system_name.as_deref(),
        };
        preferred
            .or(self.bank_name.as_deref())
            .or(self.system_name.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewStarter {
    pub id: NewStarterId,
    pub employee_id: EmployeeId,
    pub systems: Vec<SystemType>,
    #[serde(with = "crate::time::iso")]
    pub created_at: DateTime<Utc>,
    pub status: NewStarterStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sent_by_user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}
