//! Staff-side mutations of leads and inquiries.

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::TransitionPolicy;
use crate::error::AppError;
use crate::models::{Inquiry, InquiryChanges, Lead, LeadChanges, LeadStatus};
use crate::store::{EntityStore, InquiryFilter, LeadFilter};
use crate::types::{page_limit, InquiryListQuery, LeadListQuery};

/// Decides whether a lead may move from `from` to `to` under `policy`.
/// Re-setting the current status is always allowed.
pub fn check_transition(
    policy: TransitionPolicy,
    from: LeadStatus,
    to: LeadStatus,
) -> Result<(), AppError> {
    if from == to || from.intended_next().contains(&to) {
        return Ok(());
    }

    match policy {
        TransitionPolicy::Open => {
            warn!("Lead moved off the sales flow: {} -> {}", from, to);
            Ok(())
        }
        TransitionPolicy::Guarded => Err(AppError::InvalidTransition { from, to }),
    }
}

pub async fn set_lead_status(
    store: &dyn EntityStore,
    policy: TransitionPolicy,
    lead_id: Uuid,
    status: LeadStatus,
) -> Result<Lead, AppError> {
    let lead = store
        .get_lead(lead_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Lead {}", lead_id)))?;

    check_transition(policy, lead.status, status)?;

    let changes = LeadChanges {
        status: Some(status),
        ..Default::default()
    };
    let updated = store.update_lead(lead_id, &changes).await?;
    info!("Lead {} status {} -> {}", lead_id, lead.status, status);
    Ok(updated)
}

/// Only admin and staff profiles can own a lead.
pub async fn assign_lead(
    store: &dyn EntityStore,
    lead_id: Uuid,
    assignee: Uuid,
) -> Result<Lead, AppError> {
    let profile = store
        .get_profile(assignee)
        .await?
        .ok_or_else(|| AppError::validation(format!("No profile {}", assignee)))?;
    if !profile.role.has_admin_access() {
        return Err(AppError::validation(format!(
            "{} is not a staff member",
            profile.display_name()
        )));
    }

    let changes = LeadChanges {
        assigned_to: Some(assignee),
        ..Default::default()
    };
    let lead = store.update_lead(lead_id, &changes).await?;
    info!("Lead {} assigned to {}", lead_id, assignee);
    Ok(lead)
}

pub async fn mark_inquiry_read(store: &dyn EntityStore, inquiry_id: Uuid) -> Result<Inquiry, AppError> {
    Ok(store
        .update_inquiry(inquiry_id, &InquiryChanges::mark_read())
        .await?)
}

/// Records that `staff_id` answered. The reply text goes to the log, not the customer.
pub async fn respond_to_inquiry(
    store: &dyn EntityStore,
    inquiry_id: Uuid,
    staff_id: Uuid,
    reply: Option<&str>,
) -> Result<Inquiry, AppError> {
    let inquiry = store
        .update_inquiry(inquiry_id, &InquiryChanges::responded(staff_id, Utc::now()))
        .await?;

    match reply.map(str::trim).filter(|r| !r.is_empty()) {
        Some(reply) => info!("Inquiry {} answered by {}: {}", inquiry_id, staff_id, reply),
        None => info!("Inquiry {} marked responded by {}", inquiry_id, staff_id),
    }
    Ok(inquiry)
}

pub fn lead_filter(query: &LeadListQuery) -> Result<LeadFilter, AppError> {
    let status = match query.status.as_deref().map(str::trim) {
        None | Some("") | Some("all") => None,
        Some(status) => Some(status.parse::<LeadStatus>().map_err(AppError::Validation)?),
    };
    Ok(LeadFilter {
        search: query.search.clone(),
        status,
        limit: page_limit(query.limit)?,
    })
}

pub fn inquiry_filter(query: &InquiryListQuery) -> Result<InquiryFilter, AppError> {
    Ok(InquiryFilter {
        search: query.search.clone(),
        is_read: query.filter.as_is_read(),
        limit: page_limit(query.limit)?,
    })
}
