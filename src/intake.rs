//! Public forms turned into leads and inquiries.
//!
//! Every producer validates before touching the store, writes exactly one
//! record, then announces it to staff. There is no idempotency key: the same
//! payload submitted twice is two records.

use serde::Serialize;
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::car::format_naira;
use crate::models::lead::{SOURCE_SHOWROOM_VISIT, SOURCE_WEBSITE};
use crate::models::{Car, Inquiry, Lead, NewInquiry, NewLead};
use crate::notify;
use crate::store::EntityStore;
use crate::types::{CarInquiryForm, ContactForm, ShowroomVisitForm, ValidShowroomVisit};

/// The committed record and how many staff notifications actually landed.
/// `notified_staff` can be zero while the record still exists.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Submission<T> {
    pub record: T,
    pub notified_staff: usize,
}

pub async fn submit_contact(
    store: &dyn EntityStore,
    form: &ContactForm,
) -> Result<Submission<Inquiry>, AppError> {
    let contact = form.validate()?;

    let inquiry = store
        .insert_inquiry(NewInquiry {
            customer_name: contact.name,
            customer_email: contact.email,
            customer_phone: contact.phone,
            subject: contact.subject,
            message: contact.message,
        })
        .await?;
    info!("Inquiry {} received from {}", inquiry.id, inquiry.customer_name);

    let notified_staff = notify::announce_inquiry(store, &inquiry).await;
    Ok(Submission {
        record: inquiry,
        notified_staff,
    })
}

pub async fn submit_car_inquiry(
    store: &dyn EntityStore,
    car_id: Uuid,
    form: &CarInquiryForm,
) -> Result<Submission<Lead>, AppError> {
    let contact = form.validate()?;
    let car = store
        .get_car(car_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Car {}", car_id)))?;

    let message = contact
        .message
        .unwrap_or_else(|| default_car_message(&car));

    let lead = store
        .insert_lead(NewLead {
            customer_name: contact.name,
            customer_phone: contact.phone,
            customer_email: contact.email,
            message: Some(message),
            source: SOURCE_WEBSITE.to_string(),
            interested_car_id: Some(car.id),
        })
        .await?;
    info!("Lead {} received for {}", lead.id, car.title());

    let notified_staff = notify::announce_lead(store, &lead).await;
    Ok(Submission {
        record: lead,
        notified_staff,
    })
}

pub async fn submit_showroom_visit(
    store: &dyn EntityStore,
    form: &ShowroomVisitForm,
) -> Result<Submission<Lead>, AppError> {
    let visit = form.validate()?;
    let message = showroom_message(&visit);

    let lead = store
        .insert_lead(NewLead {
            customer_name: visit.name,
            customer_phone: visit.phone,
            customer_email: visit.email,
            message: Some(message),
            source: SOURCE_SHOWROOM_VISIT.to_string(),
            interested_car_id: None,
        })
        .await?;
    info!("Showroom visit lead {} for {}", lead.id, visit.preferred_date);

    let notified_staff = notify::announce_lead(store, &lead).await;
    Ok(Submission {
        record: lead,
        notified_staff,
    })
}

pub fn default_car_message(car: &Car) -> String {
    format!(
        "I'm interested in the {} {} {} for {}. Please contact me with more details.",
        car.year,
        car.make,
        car.model,
        // Prices are checked non-negative on the way in.
        format_naira(u64::try_from(car.price).unwrap_or_default())
    )
}

pub fn showroom_message(visit: &ValidShowroomVisit) -> String {
    let mut message = format!(
        "Showroom visit requested for {}",
        visit.preferred_date.format("%A, %B %-d, %Y")
    );
    if let Some(time) = visit.preferred_time {
        message.push_str(" at ");
        message.push_str(time);
    }
    message.push('.');
    if let Some(car) = &visit.car_interest {
        message.push_str(&format!(" Car of interest: {}.", car));
    }
    if let Some(notes) = &visit.notes {
        message.push_str(&format!(" Notes: {}", notes));
    }
    message
}
