use tracing::info;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{Car, CarCategory, CarStatus};
use crate::store::{CarFilter, EntityStore};
use crate::types::{page_limit, CarForm, CarListQuery, CatalogueQuery};

pub const FEATURED_COUNT: i64 = 6;

pub async fn create_car(
    store: &dyn EntityStore,
    form: CarForm,
    created_by: Uuid,
) -> Result<Car, AppError> {
    let draft = form.into_draft()?;
    let car = store.insert_car(draft, Some(created_by)).await?;
    info!("Car {} added: {}", car.id, car.title());
    Ok(car)
}

pub async fn update_car(store: &dyn EntityStore, car_id: Uuid, form: CarForm) -> Result<Car, AppError> {
    let draft = form.into_draft()?;
    let car = store.update_car(car_id, draft).await?;
    info!("Car {} updated", car.id);
    Ok(car)
}

/// Any status may follow any other.
pub async fn set_car_status(
    store: &dyn EntityStore,
    car_id: Uuid,
    status: CarStatus,
) -> Result<Car, AppError> {
    let car = store.set_car_status(car_id, status).await?;
    info!("Car {} is now {}", car.id, status);
    Ok(car)
}

pub async fn delete_car(store: &dyn EntityStore, car_id: Uuid) -> Result<(), AppError> {
    store.delete_car(car_id).await?;
    info!("Car {} deleted", car_id);
    Ok(())
}

pub fn admin_filter(query: &CarListQuery) -> Result<CarFilter, AppError> {
    let status = match query.status.as_deref().map(str::trim) {
        None | Some("") | Some("all") => None,
        Some(status) => Some(status.parse::<CarStatus>().map_err(AppError::Validation)?),
    };
    Ok(CarFilter {
        search: query.search.clone(),
        status,
        limit: page_limit(query.limit)?,
        ..Default::default()
    })
}

/// Public listing: available cars only, narrowed by search, price and category.
pub async fn catalogue(store: &dyn EntityStore, query: &CatalogueQuery) -> Result<Vec<Car>, AppError> {
    let category = match query.category.as_deref().map(str::trim) {
        None | Some("") | Some("all") => None,
        Some(category) => Some(category.parse::<CarCategory>().map_err(AppError::Validation)?),
    };

    let filter = CarFilter {
        search: query.search.clone(),
        status: Some(CarStatus::Available),
        min_price: query.min_price,
        max_price: query.max_price,
        limit: None,
    };
    let cars = store.list_cars(&filter).await?;

    Ok(match category {
        Some(category) => cars.into_iter().filter(|c| c.category() == category).collect(),
        None => cars,
    })
}

pub async fn featured(store: &dyn EntityStore) -> Result<Vec<Car>, AppError> {
    let filter = CarFilter {
        status: Some(CarStatus::Available),
        limit: Some(FEATURED_COUNT),
        ..Default::default()
    };
    Ok(store.list_cars(&filter).await?)
}

pub async fn public_car(store: &dyn EntityStore, car_id: Uuid) -> Result<Car, AppError> {
    store
        .get_car(car_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Car {}", car_id)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn form(make: &str, model: &str, price: &str, description: &str) -> CarForm {
        CarForm {
            make: Some(make.to_string()),
            model: Some(model.to_string()),
            year: Some("2020".to_string()),
            price: Some(price.to_string()),
            description: Some(description.to_string()),
            ..Default::default()
        }
    }

    async fn stocked() -> (MemoryStore, Uuid) {
        let store = MemoryStore::new();
        let staff = Uuid::new_v4();
        for (make, model, price, description) in [
            ("Toyota", "Camry", "7500000", "Clean Toks"),
            ("Toyota", "Camry Hybrid", "12000000", "Brand new"),
            ("Honda", "Accord", "6200000", "Nigerian used"),
            ("Lexus", "ES 350", "15800000", "Brand New, full option"),
        ] {
            create_car(&store, form(make, model, price, description), staff)
                .await
                .unwrap();
        }
        (store, staff)
    }

    #[tokio::test]
    async fn search_and_status_combine() {
        let (store, _) = stocked().await;
        let cars = store.list_cars(&CarFilter::default()).await.unwrap();
        let hybrid = cars.iter().find(|c| c.model == "Camry Hybrid").unwrap();
        set_car_status(&store, hybrid.id, CarStatus::Sold).await.unwrap();

        let filter = admin_filter(&CarListQuery {
            search: Some("CAMRY".to_string()),
            status: Some("available".to_string()),
            limit: None,
        })
        .unwrap();
        let cars = store.list_cars(&filter).await.unwrap();

        assert_eq!(cars.len(), 1);
        assert_eq!(cars[0].model, "Camry");
        assert_eq!(cars[0].status, CarStatus::Available);
    }

    #[tokio::test]
    async fn deleted_car_is_gone_for_good() {
        let (store, _) = stocked().await;
        let cars = store.list_cars(&CarFilter::default()).await.unwrap();
        let victim = cars[0].id;

        delete_car(&store, victim).await.unwrap();

        let remaining = store.list_cars(&CarFilter::default()).await.unwrap();
        assert!(remaining.iter().all(|c| c.id != victim));
        assert!(matches!(
            delete_car(&store, victim).await,
            Err(AppError::Store(crate::store::StoreError::NotFound(_)))
        ));
    }

    #[tokio::test]
    async fn created_by_is_the_session_user() {
        let (store, staff) = stocked().await;
        let cars = store.list_cars(&CarFilter::default()).await.unwrap();
        assert!(cars.iter().all(|c| c.created_by == Some(staff)));
    }

    #[tokio::test]
    async fn catalogue_filters_category_and_price() {
        let (store, _) = stocked().await;

        let brand_new = catalogue(
            &store,
            &CatalogueQuery {
                category: Some("brand-new".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(brand_new.len(), 2);

        let affordable = catalogue(
            &store,
            &CatalogueQuery {
                max_price: Some(8_000_000),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        let mut models: Vec<_> = affordable.iter().map(|c| c.model.as_str()).collect();
        models.sort();
        assert_eq!(models, vec!["Accord", "Camry"]);

        let err = catalogue(
            &store,
            &CatalogueQuery {
                category: Some("salvage".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn editing_a_sold_car_keeps_it_sold() {
        let (store, _) = stocked().await;
        let cars = store.list_cars(&CarFilter::default()).await.unwrap();
        let camry = cars.iter().find(|c| c.model == "Camry").unwrap();
        set_car_status(&store, camry.id, CarStatus::Sold).await.unwrap();

        let edited = update_car(&store, camry.id, form("Toyota", "Camry", "6900000", "Clean Toks"))
            .await
            .unwrap();
        assert_eq!(edited.price, 6_900_000);
        assert_eq!(edited.status, CarStatus::Sold);

        let listed = catalogue(&store, &CatalogueQuery::default()).await.unwrap();
        assert!(listed.iter().all(|c| c.id != camry.id));

        let mut reserve = form("Toyota", "Camry", "6900000", "Clean Toks");
        reserve.status = Some(CarStatus::Reserved);
        let edited = update_car(&store, camry.id, reserve).await.unwrap();
        assert_eq!(edited.status, CarStatus::Reserved);
    }

    #[test]
    fn admin_filter_rejects_non_positive_limits() {
        for limit in [0, -5] {
            let query = CarListQuery {
                search: None,
                status: None,
                limit: Some(limit),
            };
            assert!(matches!(admin_filter(&query), Err(AppError::Validation(_))));
        }

        let query = CarListQuery {
            search: None,
            status: None,
            limit: Some(2),
        };
        assert_eq!(admin_filter(&query).unwrap().limit, Some(2));
    }

    #[tokio::test]
    async fn featured_hides_unavailable_cars() {
        let (store, _) = stocked().await;
        let cars = store.list_cars(&CarFilter::default()).await.unwrap();
        set_car_status(&store, cars[0].id, CarStatus::Reserved).await.unwrap();

        let featured = featured(&store).await.unwrap();
        assert_eq!(featured.len(), 3);
        assert!(featured.iter().all(|c| c.status == CarStatus::Available));
    }
}
