use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, Type, ToSchema)]
#[sqlx(type_name = "car_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CarStatus {
    #[default]
    Available,
    Sold,
    Reserved,
    Maintenance,
}

impl CarStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CarStatus::Available => "available",
            CarStatus::Sold => "sold",
            CarStatus::Reserved => "reserved",
            CarStatus::Maintenance => "maintenance",
        }
    }
}

impl FromStr for CarStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "available" => Ok(CarStatus::Available),
            "sold" => Ok(CarStatus::Sold),
            "reserved" => Ok(CarStatus::Reserved),
            "maintenance" => Ok(CarStatus::Maintenance),
            other => Err(format!("unknown car status '{}'", other)),
        }
    }
}

impl fmt::Display for CarStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Catalogue grouping shown on the public listing. Derived from the free-text
/// description since the inventory has no dedicated column for it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum CarCategory {
    BrandNew,
    Toks,
    GradeA,
}

impl FromStr for CarCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "brand-new" => Ok(CarCategory::BrandNew),
            "toks" => Ok(CarCategory::Toks),
            "grade-a" => Ok(CarCategory::GradeA),
            other => Err(format!("unknown car category '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, ToSchema)]
pub struct Car {
    pub id: Uuid,
    pub make: String,
    pub model: String,
    pub year: i32,
    /// Whole naira.
    pub price: i64,
    pub mileage: Option<i32>,
    pub fuel_type: Option<String>,
    pub transmission: Option<String>,
    pub color: Option<String>,
    pub description: Option<String>,
    pub features: Vec<String>,
    pub images: Vec<String>,
    pub status: CarStatus,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Default for Car {
    fn default() -> Self {
        Car {
            id: Uuid::new_v4(),
            make: String::new(),
            model: String::new(),
            year: 0,
            price: 0,
            mileage: None,
            fuel_type: None,
            transmission: None,
            color: None,
            description: None,
            features: Vec::new(),
            images: Vec::new(),
            status: CarStatus::Available,
            created_by: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }
}

impl Car {
    /// "2020 Toyota Camry"
    pub fn title(&self) -> String {
        format!("{} {} {}", self.year, self.make, self.model)
    }

    pub fn category(&self) -> CarCategory {
        let description = self
            .description
            .as_deref()
            .unwrap_or_default()
            .to_lowercase();

        if description.contains("brand new") {
            CarCategory::BrandNew
        } else if description.contains("toks") {
            CarCategory::Toks
        } else {
            CarCategory::GradeA
        }
    }

    /// Builds a fresh record from validated form fields.
    pub fn from_draft(draft: CarDraft, created_by: Option<Uuid>) -> Self {
        Car {
            make: draft.make,
            model: draft.model,
            year: draft.year,
            price: draft.price,
            mileage: draft.mileage,
            fuel_type: draft.fuel_type,
            transmission: draft.transmission,
            color: draft.color,
            description: draft.description,
            features: draft.features,
            images: draft.images,
            status: draft.status.unwrap_or_default(),
            created_by,
            ..Default::default()
        }
    }

    /// Overwrites every editable column with the draft, keeping identity and ownership.
    /// Status only changes when the draft names one.
    pub fn apply_draft(&mut self, draft: CarDraft) {
        self.make = draft.make;
        self.model = draft.model;
        self.year = draft.year;
        self.price = draft.price;
        self.mileage = draft.mileage;
        self.fuel_type = draft.fuel_type;
        self.transmission = draft.transmission;
        self.color = draft.color;
        self.description = draft.description;
        self.features = draft.features;
        self.images = draft.images;
        if let Some(status) = draft.status {
            self.status = status;
        }
        self.updated_at = Utc::now();
    }
}

/// Car columns after form coercion. Produced only by `CarForm::into_draft`.
#[derive(Debug, Clone, PartialEq)]
pub struct CarDraft {
    pub make: String,
    pub model: String,
    pub year: i32,
    pub price: i64,
    pub mileage: Option<i32>,
    pub fuel_type: Option<String>,
    pub transmission: Option<String>,
    pub color: Option<String>,
    pub description: Option<String>,
    pub features: Vec<String>,
    pub images: Vec<String>,
    /// `None` keeps the current status on update and means available on create.
    pub status: Option<CarStatus>,
}

/// Formats a whole-naira amount the way the site prints prices, e.g. `₦7,500,000`.
pub fn format_naira(price: u64) -> String {
    let digits = price.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    format!("₦{}", grouped)
}
