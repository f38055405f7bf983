use actix_web::web;
use utoipa::OpenApi;

pub mod auth;
pub mod cars;
pub mod dashboard;
pub mod inquiries;
pub mod intake;
pub mod inventory;
pub mod leads;
pub mod messages;
pub mod notifications;

#[derive(OpenApi)]
#[openapi(
    paths(
        intake::submit_contact,
        intake::submit_car_inquiry,
        intake::submit_showroom_visit,
        cars::list_cars,
        cars::featured_cars,
        cars::get_car,
        auth::current_session,
        auth::sign_out,
        leads::list_leads,
        leads::update_lead_status,
        leads::assign_lead,
        inquiries::list_inquiries,
        inquiries::mark_inquiry_read,
        inquiries::respond_to_inquiry,
        inventory::list_inventory,
        inventory::create_car,
        inventory::update_car,
        inventory::update_car_status,
        inventory::delete_car,
        notifications::list_notifications,
        notifications::mark_notification_read,
        dashboard::dashboard_stats,
        messages::list_conversations,
        messages::create_conversation,
        messages::conversation_events,
        messages::thread_events,
        messages::list_messages,
        messages::send_message,
    ),
    tags(
        (name = "intake", description = "Public contact, car inquiry and showroom forms"),
        (name = "catalogue", description = "Public car listings"),
        (name = "session", description = "Signed-in user"),
        (name = "triage", description = "Lead and inquiry console"),
        (name = "inventory", description = "Car inventory management"),
        (name = "notifications", description = "Staff notifications"),
        (name = "messaging", description = "Customer and dealer conversations"),
    )
)]
pub struct ApiDoc;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(intake::submit_contact)
        .service(intake::submit_car_inquiry)
        .service(intake::submit_showroom_visit)
        // "featured" would otherwise be parsed as a car id
        .service(cars::featured_cars)
        .service(cars::list_cars)
        .service(cars::get_car)
        .service(
            web::scope("/auth")
                .service(auth::current_session)
                .service(auth::sign_out),
        )
        .service(
            web::scope("/admin")
                .service(leads::list_leads)
                .service(leads::update_lead_status)
                .service(leads::assign_lead)
                .service(inquiries::list_inquiries)
                .service(inquiries::mark_inquiry_read)
                .service(inquiries::respond_to_inquiry)
                .service(inventory::list_inventory)
                .service(inventory::create_car)
                .service(inventory::update_car)
                .service(inventory::update_car_status)
                .service(inventory::delete_car)
                .service(notifications::list_notifications)
                .service(notifications::mark_notification_read)
                .service(dashboard::dashboard_stats),
        )
        .service(
            web::scope("/conversations")
                .service(messages::conversation_events)
                .service(messages::list_conversations)
                .service(messages::create_conversation)
                .service(messages::thread_events)
                .service(messages::list_messages)
                .service(messages::send_message),
        );
}

#[cfg(test)]
pub mod test_support {
    use std::collections::HashMap;
    use std::sync::Arc;

    use actix_web::body::MessageBody;
    use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
    use actix_web::{web, App};
    use uuid::Uuid;

    use super::configure;
    use crate::auth::JwtKeys;
    use crate::config::AppConfig;
    use crate::middleware::auth::Authentication;
    use crate::models::{Car, CarDraft, CarStatus, Profile, Role};
    use crate::state::AppState;
    use crate::store::{ChangeFeed, EntityStore, MemoryStore};

    const SECRET: &str = "test-secret";

    pub fn bearer(token: &str) -> String {
        format!("Bearer {}", token)
    }

    /// A service wired to an in-memory store, plus handles for seeding it.
    pub struct Harness {
        pub store: MemoryStore,
        pub state: Arc<AppState>,
        pub keys: Arc<JwtKeys>,
    }

    impl Harness {
        pub async fn new() -> Self {
            Self::with_settings(&[]).await
        }

        pub async fn with_settings(settings: &[(&str, &str)]) -> Self {
            let mut values: HashMap<String, String> = HashMap::from([
                ("DATABASE_URL".to_string(), "memory://".to_string()),
                ("JWT_SECRET".to_string(), SECRET.to_string()),
            ]);
            for (key, value) in settings {
                values.insert(key.to_string(), value.to_string());
            }
            let config = AppConfig::from_lookup(|key| values.get(key).cloned()).unwrap();

            let store = MemoryStore::new();
            let entities: Arc<dyn EntityStore> = Arc::new(store.clone());
            let feed: Arc<dyn ChangeFeed> = Arc::new(store.clone());
            Harness {
                keys: Arc::new(JwtKeys::new(config.jwt_secret.as_bytes())),
                state: Arc::new(AppState::new(config, entities, feed)),
                store,
            }
        }

        /// Seeds a profile and returns its id with a valid token.
        pub async fn user(&self, role: Role) -> (Uuid, String) {
            let id = Uuid::new_v4();
            let email = format!("{}@dealer.ng", id.simple());
            self.store.put_profile(Profile::new(id, &email, role)).await;
            (id, self.keys.issue(id, 3600))
        }

        pub async fn car(&self, make: &str, model: &str, price: i64, created_by: Uuid) -> Car {
            let draft = CarDraft {
                make: make.to_string(),
                model: model.to_string(),
                year: 2020,
                price,
                mileage: Some(45_000),
                fuel_type: Some("Petrol".to_string()),
                transmission: Some("Automatic".to_string()),
                color: None,
                description: None,
                features: Vec::new(),
                images: Vec::new(),
                status: Some(CarStatus::Available),
            };
            self.store.insert_car(draft, Some(created_by)).await.unwrap()
        }

        pub async fn assign_dealer(&self, conversation_id: Uuid, dealer_id: Uuid) {
            self.store.assign_dealer(conversation_id, dealer_id).await;
        }

        pub fn app(
            &self,
        ) -> App<
            impl ServiceFactory<
                ServiceRequest,
                Config = (),
                Response = ServiceResponse<impl MessageBody>,
                Error = actix_web::Error,
                InitError = (),
            >,
        > {
            App::new()
                .wrap(Authentication {
                    keys: self.keys.clone(),
                })
                .app_data(web::Data::new(self.state.clone()))
                .configure(configure)
        }
    }
}
