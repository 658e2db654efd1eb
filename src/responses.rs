use serde::{Deserialize, Serialize};

use crate::auth::role::Role;
use crate::auth::session::SessionState;

/// Error body for every JSON error response.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ApiErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// List wrapper so collections can grow fields without breaking clients.
#[derive(Serialize, Debug, Clone)]
pub struct ListResponse<T: Serialize> {
    pub items: Vec<T>,
    pub total: usize,
}

impl<T: Serialize> From<Vec<T>> for ListResponse<T> {
    fn from(items: Vec<T>) -> Self {
        ListResponse {
            total: items.len(),
            items,
        }
    }
}

/// Entry page body: where the session stands and where to go next.
#[derive(Serialize, Debug, Clone)]
pub struct SessionResponse {
    #[serde(flatten)]
    pub state: SessionState,
    /// Landing route for the assigned role.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub home: Option<String>,
    /// Roles this identity may still choose from.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub available_roles: Vec<Role>,
}

impl SessionResponse {
    pub fn new(state: SessionState, available_roles: Vec<Role>) -> Self {
        let home = state
            .role()
            .map(|role| format!("{}/dashboard", role.route_prefix()));
        let available_roles = match state {
            SessionState::RoleUnset { .. } => available_roles,
            _ => Vec::new(),
        };
        SessionResponse {
            state,
            home,
            available_roles,
        }
    }
}

#[derive(Deserialize, Debug)]
pub struct ChooseRoleRequest {
    pub role: Role,
}

#[derive(Deserialize, Debug, Default)]
pub struct SearchQuery {
    #[serde(default)]
    pub search: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
pub struct LimitQuery {
    #[serde(default)]
    pub limit: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::identity::Identity;

    #[test]
    fn session_response_shape() {
        let ident = Identity::new("u1", "u1@example.com");
        let body = SessionResponse::new(
            SessionState::RoleAssigned {
                identity: ident.clone(),
                role: Role::Patient,
            },
            Role::ALL.to_vec(),
        );
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["state"], "role_assigned");
        assert_eq!(json["role"], "patient");
        assert_eq!(json["home"], "/patient/dashboard");
        assert!(json.get("available_roles").is_none());

        let body = SessionResponse::new(SessionState::RoleUnset { identity: ident }, Role::ALL.to_vec());
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["state"], "role_unset");
        assert_eq!(json["available_roles"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn error_body_omits_missing_details() {
        let body = ApiErrorResponse {
            error: "Not found".to_string(),
            details: None,
        };
        assert_eq!(serde_json::to_string(&body).unwrap(), r#"{"error":"Not found"}"#);
    }
}
