use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Headline counters for the admin dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq, FromRow, Serialize, Deserialize, ToSchema)]
pub struct DashboardStats {
    pub total_cars: i64,
    pub available_cars: i64,
    pub total_leads: i64,
    pub active_leads: i64,
    pub total_inquiries: i64,
    pub unread_inquiries: i64,
}
