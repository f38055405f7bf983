//! Who is calling, resolved once per request.
//!
//! The bearer token only names a profile id. [`Session`] hydrates the profile
//! from the store on first use and keeps it in a short-lived cache, so role
//! changes take effect within the session TTL. Signing out tears the cached
//! entry down.

use std::sync::Arc;
use std::time::Duration;

use actix_web::{dev::Payload, web, FromRequest, HttpMessage, HttpRequest};
use anyhow::anyhow;
use futures_util::future::LocalBoxFuture;
use moka::future::Cache;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::Profile;
use crate::state::AppState;
use crate::store::EntityStore;

const MAX_CACHED_SESSIONS: u64 = 10_000;

#[derive(Clone, Debug)]
pub struct Session {
    pub profile: Profile,
}

impl Session {
    pub fn user_id(&self) -> Uuid {
        self.profile.id
    }

    pub fn is_admin(&self) -> bool {
        self.profile.role.has_admin_access()
    }
}

/// A session whose profile may work the triage console.
#[derive(Clone, Debug)]
pub struct AdminSession(pub Session);

impl AdminSession {
    pub fn user_id(&self) -> Uuid {
        self.0.user_id()
    }
}

pub struct Sessions {
    cache: Cache<Uuid, Session>,
}

impl Sessions {
    pub fn new(ttl: Duration) -> Self {
        Sessions {
            cache: Cache::builder()
                .max_capacity(MAX_CACHED_SESSIONS)
                .time_to_live(ttl)
                .build(),
        }
    }

    pub async fn hydrate(
        &self,
        store: &dyn EntityStore,
        user_id: Uuid,
    ) -> Result<Session, AppError> {
        if let Some(session) = self.cache.get(&user_id).await {
            return Ok(session);
        }

        // A valid token without a profile row is treated like no token at all.
        let profile = store
            .get_profile(user_id)
            .await?
            .ok_or(AppError::Unauthorized)?;

        debug!("Session hydrated for {} ({:?})", profile.email, profile.role);
        let session = Session { profile };
        self.cache.insert(user_id, session.clone()).await;
        Ok(session)
    }

    pub async fn teardown(&self, user_id: Uuid) {
        self.cache.invalidate(&user_id).await;
        info!("Session torn down for {}", user_id);
    }
}

impl FromRequest for Session {
    type Error = AppError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let user = req.extensions().get::<AuthenticatedUser>().copied();
        let state = req.app_data::<web::Data<Arc<AppState>>>().cloned();

        Box::pin(async move {
            let user = user.ok_or(AppError::Unauthorized)?;
            let state = state.ok_or_else(|| AppError::Internal(anyhow!("app state not configured")))?;
            state
                .sessions
                .hydrate(state.store.as_ref(), user.user_id)
                .await
        })
    }
}

impl FromRequest for AdminSession {
    type Error = AppError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let session = Session::from_request(req, payload);

        Box::pin(async move {
            let session = session.await?;
            if !session.is_admin() {
                return Err(AppError::Forbidden);
            }
            Ok(AdminSession(session))
        })
    }
}
