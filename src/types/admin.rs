use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{CarStatus, LeadStatus};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ReadFilter {
    #[default]
    All,
    Read,
    Unread,
}

impl ReadFilter {
    pub fn as_is_read(&self) -> Option<bool> {
        match self {
            ReadFilter::All => None,
            ReadFilter::Read => Some(true),
            ReadFilter::Unread => Some(false),
        }
    }
}

/// Page size of a console list. Absent means no limit.
pub fn page_limit(limit: Option<i64>) -> Result<Option<i64>, AppError> {
    match limit {
        Some(limit) if limit < 1 => Err(AppError::validation("Limit must be at least 1")),
        limit => Ok(limit),
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LeadListQuery {
    pub search: Option<String>,
    /// Omit, or `all`, for every status.
    pub status: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct InquiryListQuery {
    pub search: Option<String>,
    #[serde(default)]
    pub filter: ReadFilter,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CarListQuery {
    pub search: Option<String>,
    pub status: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateLeadStatusRequest {
    pub status: LeadStatus,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AssignLeadRequest {
    pub assigned_to: Uuid,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RespondInquiryRequest {
    /// Kept in the log only; nothing is sent to the customer.
    pub reply: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateCarStatusRequest {
    pub status: CarStatus,
}
