use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use utoipa::ToSchema;
use uuid::Uuid;

pub const SOURCE_WEBSITE: &str = "website";
pub const SOURCE_SHOWROOM_VISIT: &str = "showroom_visit";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Type, ToSchema)]
#[sqlx(type_name = "lead_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
    #[default]
    New,
    Contacted,
    Interested,
    NotInterested,
    Converted,
}

impl LeadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeadStatus::New => "new",
            LeadStatus::Contacted => "contacted",
            LeadStatus::Interested => "interested",
            LeadStatus::NotInterested => "not_interested",
            LeadStatus::Converted => "converted",
        }
    }

    /// Leads still being worked by the sales floor.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            LeadStatus::New | LeadStatus::Contacted | LeadStatus::Interested
        )
    }

    /// Statuses the sales process expects to follow this one.
    pub fn intended_next(&self) -> &'static [LeadStatus] {
        match self {
            LeadStatus::New => &[
                LeadStatus::Contacted,
                LeadStatus::Interested,
                LeadStatus::NotInterested,
            ],
            LeadStatus::Contacted => &[
                LeadStatus::Interested,
                LeadStatus::NotInterested,
                LeadStatus::Converted,
            ],
            LeadStatus::Interested => &[
                LeadStatus::Contacted,
                LeadStatus::NotInterested,
                LeadStatus::Converted,
            ],
            LeadStatus::NotInterested | LeadStatus::Converted => &[],
        }
    }
}

impl FromStr for LeadStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "new" => Ok(LeadStatus::New),
            "contacted" => Ok(LeadStatus::Contacted),
            "interested" => Ok(LeadStatus::Interested),
            "not_interested" => Ok(LeadStatus::NotInterested),
            "converted" => Ok(LeadStatus::Converted),
            other => Err(format!("unknown lead status '{}'", other)),
        }
    }
}

impl fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, ToSchema)]
pub struct Lead {
    pub id: Uuid,
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_email: Option<String>,
    pub message: Option<String>,
    pub source: Option<String>,
    pub interested_car_id: Option<Uuid>,
    pub status: LeadStatus,
    pub assigned_to: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Default for Lead {
    fn default() -> Self {
        Lead {
            id: Uuid::new_v4(),
            customer_name: String::new(),
            customer_phone: String::new(),
            customer_email: None,
            message: None,
            source: None,
            interested_car_id: None,
            status: LeadStatus::New,
            assigned_to: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }
}

/// Insert payload. Status is not part of it: every lead starts as `new`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLead {
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_email: Option<String>,
    pub message: Option<String>,
    pub source: String,
    pub interested_car_id: Option<Uuid>,
}

impl From<NewLead> for Lead {
    fn from(new_lead: NewLead) -> Self {
        Lead {
            customer_name: new_lead.customer_name,
            customer_phone: new_lead.customer_phone,
            customer_email: new_lead.customer_email,
            message: new_lead.message,
            source: Some(new_lead.source),
            interested_car_id: new_lead.interested_car_id,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LeadChanges {
    pub status: Option<LeadStatus>,
    pub assigned_to: Option<Uuid>,
}

impl LeadChanges {
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.assigned_to.is_none()
    }
}
