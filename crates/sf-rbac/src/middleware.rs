//! `tower` `Layer`/`Service` wrapping [`authorize`] around any inner
//! service keyed by [`GatedRequest`]. No HTTP framework is assumed here -
//! callers adapt their own request type into `GatedRequest` at the edge.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};

use crate::authorize::{authorize, AuthContext, AuthDecision};
use crate::catalogue::HttpMethod;
use crate::error::{RbacError, Result};
use sf_core::db::SprintforgeDb;

#[derive(Debug, Clone)]
pub struct GatedRequest<T> {
    pub ctx: AuthContext,
    pub path: String,
    pub method: HttpMethod,
    pub inner: T,
}

#[derive(Clone)]
pub struct AuthzLayer {
    db: Arc<SprintforgeDb>,
}

impl AuthzLayer {
    pub fn new(db: Arc<SprintforgeDb>) -> Self {
        Self { db }
    }
}

impl<S> Layer<S> for AuthzLayer {
    type Service = AuthzMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthzMiddleware { inner, db: self.db.clone() }
    }
}

#[derive(Clone)]
pub struct AuthzMiddleware<S> {
    inner: S,
    db: Arc<SprintforgeDb>,
}

impl<S, T> Service<GatedRequest<T>> for AuthzMiddleware<S>
where
    S: Service<T, Error = RbacError> + Clone + Send + 'static,
    S::Future: Send + 'static,
    T: Send + 'static,
{
    type Response = S::Response;
    type Error = RbacError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<()>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: GatedRequest<T>) -> Self::Future {
        let db = self.db.clone();
        let mut inner = self.inner.clone();

        Box::pin(async move {
            match authorize(&db, &req.ctx, &req.path, req.method).await? {
                AuthDecision::Granted => inner.call(req.inner).await,
                AuthDecision::Denied(reason) => Err(RbacError::AccessDenied(reason)),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authorize::AuthContext;
    use tower::{service_fn, ServiceExt};

    fn ctx(active: bool, superuser: bool) -> AuthContext {
        AuthContext { user_id: "bob".into(), is_active: active, is_superuser: superuser }
    }

    fn echo_service() -> impl Service<&'static str, Response = &'static str, Error = RbacError, Future = Pin<Box<dyn Future<Output = Result<&'static str>> + Send>>>
           + Clone {
        service_fn(|req: &'static str| {
            Box::pin(async move { Ok::<_, RbacError>(req) })
                as Pin<Box<dyn Future<Output = Result<&'static str>> + Send>>
        })
    }

    #[tokio::test]
    async fn superuser_request_reaches_the_inner_service() {
        let db = Arc::new(SprintforgeDb::new_in_memory().await.unwrap());
        let mut svc = AuthzLayer::new(db).layer(echo_service());
        let resp = svc
            .ready()
            .await
            .unwrap()
            .call(GatedRequest { ctx: ctx(true, true), path: "/admin/roles".into(), method: HttpMethod::Delete, inner: "ok" })
            .await
            .unwrap();
        assert_eq!(resp, "ok");
    }

    #[tokio::test]
    async fn denied_request_never_reaches_the_inner_service() {
        let db = Arc::new(SprintforgeDb::new_in_memory().await.unwrap());
        let mut svc = AuthzLayer::new(db).layer(echo_service());
        let result = svc
            .ready()
            .await
            .unwrap()
            .call(GatedRequest { ctx: ctx(true, false), path: "/admin/roles".into(), method: HttpMethod::Delete, inner: "ok" })
            .await;
        assert!(matches!(result, Err(RbacError::AccessDenied(_))));
    }
}
