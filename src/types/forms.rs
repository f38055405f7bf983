use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::ToSchema;

use crate::error::AppError;
use crate::models::{CarDraft, CarStatus};

/// Trimmed text, or `None` when nothing but whitespace was submitted.
pub fn clean(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn required(value: &Option<String>, message: &str) -> Result<String, AppError> {
    clean(value).ok_or_else(|| AppError::validation(message))
}

/// Public contact page. Becomes an inquiry.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ContactForm {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub subject: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidContact {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub subject: Option<String>,
    pub message: String,
}

impl ContactForm {
    pub fn validate(&self) -> Result<ValidContact, AppError> {
        Ok(ValidContact {
            name: required(&self.name, "Name is required")?,
            message: required(&self.message, "Message is required")?,
            email: clean(&self.email),
            phone: clean(&self.phone),
            subject: clean(&self.subject),
        })
    }
}

/// "Contact about this car" form on a listing. Becomes a lead.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct CarInquiryForm {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidCarInquiry {
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub message: Option<String>,
}

impl CarInquiryForm {
    pub fn validate(&self) -> Result<ValidCarInquiry, AppError> {
        Ok(ValidCarInquiry {
            name: required(&self.name, "Name is required")?,
            phone: required(&self.phone, "Phone number is required")?,
            email: clean(&self.email),
            message: clean(&self.message),
        })
    }
}

/// Hourly slots the showroom takes visits in.
pub const SHOWROOM_SLOTS: [&str; 9] = [
    "9:00 AM", "10:00 AM", "11:00 AM", "12:00 PM", "1:00 PM", "2:00 PM", "3:00 PM", "4:00 PM",
    "5:00 PM",
];

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ShowroomVisitForm {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub car_interest: Option<String>,
    /// `YYYY-MM-DD`
    pub preferred_date: Option<String>,
    /// One of the hourly slots, e.g. `10:00 AM`.
    pub preferred_time: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidShowroomVisit {
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub car_interest: Option<String>,
    pub preferred_date: NaiveDate,
    pub preferred_time: Option<&'static str>,
    pub notes: Option<String>,
}

impl ShowroomVisitForm {
    pub fn validate(&self) -> Result<ValidShowroomVisit, AppError> {
        let name = required(&self.name, "Name is required")?;
        let phone = required(&self.phone, "Phone number is required")?;
        let date = required(&self.preferred_date, "Preferred date is required")?;
        let preferred_date = NaiveDate::parse_from_str(&date, "%Y-%m-%d")
            .map_err(|_| AppError::validation("Preferred date must be YYYY-MM-DD"))?;

        let preferred_time = match clean(&self.preferred_time) {
            Some(time) => Some(
                SHOWROOM_SLOTS
                    .iter()
                    .copied()
                    .find(|slot| slot.eq_ignore_ascii_case(&time))
                    .ok_or_else(|| {
                        AppError::validation(format!("'{}' is not an available time slot", time))
                    })?,
            ),
            None => None,
        };

        Ok(ValidShowroomVisit {
            name,
            phone,
            email: clean(&self.email),
            car_interest: clean(&self.car_interest),
            preferred_date,
            preferred_time,
            notes: clean(&self.notes),
        })
    }
}

/// Inventory editor payload, all text as typed into the form.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct CarForm {
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<String>,
    pub price: Option<String>,
    pub mileage: Option<String>,
    pub fuel_type: Option<String>,
    pub transmission: Option<String>,
    pub color: Option<String>,
    pub description: Option<String>,
    /// Comma separated, e.g. `Leather seats, Sunroof`.
    pub features: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    pub status: Option<CarStatus>,
}

impl CarForm {
    pub fn into_draft(self) -> Result<CarDraft, AppError> {
        let make = required(&self.make, "Make is required")?;
        let model = required(&self.model, "Model is required")?;

        let year = clean(&self.year)
            .ok_or_else(|| AppError::validation("Year is required"))?
            .parse::<i32>()
            .map_err(|_| AppError::validation("Year must be a whole number"))?;

        let price = clean(&self.price)
            .ok_or_else(|| AppError::validation("Price is required"))?
            .parse::<i64>()
            .map_err(|_| AppError::validation("Price must be a whole number"))?;
        if price < 0 {
            return Err(AppError::validation("Price cannot be negative"));
        }

        let mileage = match clean(&self.mileage) {
            Some(text) => {
                let mileage = text
                    .parse::<i32>()
                    .map_err(|_| AppError::validation("Mileage must be a whole number"))?;
                if mileage < 0 {
                    return Err(AppError::validation("Mileage cannot be negative"));
                }
                Some(mileage)
            }
            None => None,
        };

        let features = self
            .features
            .as_deref()
            .map(split_list)
            .unwrap_or_default();

        let images = self
            .images
            .iter()
            .map(|url| url.trim())
            .filter(|url| !url.is_empty())
            .map(str::to_string)
            .collect();

        Ok(CarDraft {
            make,
            model,
            year,
            price,
            mileage,
            fuel_type: clean(&self.fuel_type),
            transmission: clean(&self.transmission),
            color: clean(&self.color),
            description: clean(&self.description),
            features,
            images,
            status: self.status,
        })
    }
}

fn split_list(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}
