//! Permission resolution and the `user active ∧ (superuser ∨ required ∈
//! permissions(user))` authorization check.

use serde_json::json;
use sf_audit::events::record_authorization_event;
use sf_core::db::SprintforgeDb;
use std::collections::HashSet;

use crate::catalogue::{required_permission, HttpMethod};
use crate::error::Result;

/// What the authorization gate knows about the caller; the session/SSO
/// machinery that populates this is out of scope here.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: String,
    pub is_active: bool,
    pub is_superuser: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthDecision {
    Granted,
    Denied(String),
}

/// Union of permissions across every role assigned to `user_id`.
pub async fn user_permissions(db: &SprintforgeDb, user_id: &str) -> Result<HashSet<String>> {
    let roles = db.list_roles_for_user(user_id).await?;
    Ok(roles.into_iter().flat_map(|r| r.permissions).collect())
}

/// Decides whether `ctx` may perform `method` on `path`, and records the
/// decision as a Security Event.
pub async fn authorize(db: &SprintforgeDb, ctx: &AuthContext, path: &str, method: HttpMethod) -> Result<AuthDecision> {
    let required = required_permission(path, method);

    let decision = if !ctx.is_active {
        AuthDecision::Denied("user is not active".into())
    } else if ctx.is_superuser {
        AuthDecision::Granted
    } else {
        match required {
            None => AuthDecision::Granted,
            Some(permission) => {
                let granted = user_permissions(db, &ctx.user_id).await?.contains(permission);
                if granted {
                    AuthDecision::Granted
                } else {
                    AuthDecision::Denied(format!("missing permission '{permission}'"))
                }
            }
        }
    };

    record_authorization_event(
        db,
        json!({ "user_id": ctx.user_id }),
        json!({ "path": path, "method": format!("{method:?}") }),
        required.unwrap_or("none"),
        matches!(decision, AuthDecision::Granted),
    )
    .await?;

    Ok(decision)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn ctx(user_id: &str, active: bool, superuser: bool) -> AuthContext {
        AuthContext { user_id: user_id.to_string(), is_active: active, is_superuser: superuser }
    }

    async fn seed_role(db: &SprintforgeDb, user_id: &str, permissions: &[&str]) {
        let role = sf_core::types::Role {
            id: 0,
            name: "editor".into(),
            permissions: permissions.iter().map(|p| p.to_string()).collect(),
            is_system_role: false,
        };
        let role_id = db.upsert_role(&role).await.unwrap();
        db.assign_role(user_id, role_id, None, Utc::now()).await.unwrap();
    }

    #[tokio::test]
    async fn inactive_user_is_always_denied() {
        let db = SprintforgeDb::new_in_memory().await.unwrap();
        let decision = authorize(&db, &ctx("bob", false, true), "/sprints", HttpMethod::Get).await.unwrap();
        assert_eq!(decision, AuthDecision::Denied("user is not active".into()));
    }

    #[tokio::test]
    async fn superuser_bypasses_the_permission_check() {
        let db = SprintforgeDb::new_in_memory().await.unwrap();
        let decision = authorize(&db, &ctx("bob", true, true), "/admin/roles", HttpMethod::Delete).await.unwrap();
        assert_eq!(decision, AuthDecision::Granted);
    }

    #[tokio::test]
    async fn user_with_role_permission_is_granted() {
        let db = SprintforgeDb::new_in_memory().await.unwrap();
        seed_role(&db, "bob", &["sprint.read"]).await;
        let decision = authorize(&db, &ctx("bob", true, false), "/sprints", HttpMethod::Get).await.unwrap();
        assert_eq!(decision, AuthDecision::Granted);
    }

    #[tokio::test]
    async fn user_without_role_permission_is_denied() {
        let db = SprintforgeDb::new_in_memory().await.unwrap();
        seed_role(&db, "bob", &["sprint.read"]).await;
        let decision = authorize(&db, &ctx("bob", true, false), "/sprints", HttpMethod::Post).await.unwrap();
        assert!(matches!(decision, AuthDecision::Denied(_)));
    }

    #[tokio::test]
    async fn unprotected_path_is_granted_without_any_role() {
        let db = SprintforgeDb::new_in_memory().await.unwrap();
        let decision = authorize(&db, &ctx("bob", true, false), "/healthz", HttpMethod::Get).await.unwrap();
        assert_eq!(decision, AuthDecision::Granted);
    }
}
