//! Domain DTOs for the inventory API.
//!
//! # Design
//! Field names follow the backend's JSON (`nombre`, `precioCents`, `rolId`)
//! through serde renames; the Rust side uses English names. Patch payloads
//! skip absent fields so the backend only touches what was sent.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::query::Params;

/// Role ids as stored by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub fn id(self) -> u32 {
        match self {
            Role::Admin => 1,
            Role::User => 2,
        }
    }
}

/// Why a user payload was rejected by `User::from_dto`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserDtoError {
    Missing,
    InvalidId,
    InvalidName,
    InvalidEmail,
    InvalidRole,
}

impl UserDtoError {
    pub fn code(self) -> &'static str {
        match self {
            UserDtoError::Missing => "USER_DTO_REQUIRED",
            UserDtoError::InvalidId => "USER_INVALID_ID",
            UserDtoError::InvalidName => "USER_INVALID_NAME",
            UserDtoError::InvalidEmail => "USER_INVALID_EMAIL",
            UserDtoError::InvalidRole => "USER_INVALID_ROL",
        }
    }
}

/// The authenticated user as cached by `AuthService`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: u64,
    #[serde(rename = "nombre")]
    pub name: String,
    pub email: String,
    pub rol_id: u32,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl User {
    /// Validate and normalize a user object from a backend payload.
    pub fn from_dto(dto: &Value) -> Result<Self, UserDtoError> {
        let dto = dto.as_object().ok_or(UserDtoError::Missing)?;

        let id = dto
            .get("id")
            .and_then(Value::as_u64)
            .filter(|id| *id > 0)
            .ok_or(UserDtoError::InvalidId)?;
        let name = dto
            .get("nombre")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|name| name.chars().count() >= 3)
            .ok_or(UserDtoError::InvalidName)?;
        let email = dto
            .get("email")
            .and_then(Value::as_str)
            .filter(|email| email.contains('@'))
            .ok_or(UserDtoError::InvalidEmail)?;
        let rol_id = dto
            .get("rolId")
            .and_then(numeric)
            .filter(|rol| *rol > 0)
            .and_then(|rol| u32::try_from(rol).ok())
            .ok_or(UserDtoError::InvalidRole)?;

        let timestamp = |key: &str| dto.get(key).and_then(Value::as_str).map(str::to_string);
        Ok(Self {
            id,
            name: name.to_string(),
            email: email.trim().to_lowercase(),
            rol_id,
            created_at: timestamp("createdAt"),
            updated_at: timestamp("updatedAt"),
        })
    }

    pub fn role(&self) -> Option<Role> {
        match self.rol_id {
            1 => Some(Role::Admin),
            2 => Some(Role::User),
            _ => None,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role() == Some(Role::Admin)
    }

    pub fn is_user(&self) -> bool {
        self.role() == Some(Role::User)
    }
}

/// Integer from a JSON number or a numeric string.
fn numeric(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    #[serde(rename = "nombre")]
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    #[serde(rename = "nombre")]
    pub name: String,
    pub precio_cents: i64,
    pub stock: i64,
    #[serde(rename = "categoriaId")]
    pub category_id: u64,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPatch {
    #[serde(rename = "nombre", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub precio_cents: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stock: Option<i64>,
    #[serde(rename = "categoriaId", skip_serializing_if = "Option::is_none")]
    pub category_id: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryInput {
    #[serde(rename = "nombre")]
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    #[serde(rename = "nombre")]
    pub name: String,
    pub email: String,
    pub password: String,
    pub rol_id: u32,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPatch {
    #[serde(rename = "nombre", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rol_id: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderDir {
    Asc,
    #[default]
    Desc,
}

impl OrderDir {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderDir::Asc => "ASC",
            OrderDir::Desc => "DESC",
        }
    }
}

/// Paging and ordering for list endpoints. Unset fields are left out of the
/// query string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub limit: Option<u32>,
    pub offset: Option<u64>,
    pub order_by: Option<String>,
    pub order_dir: Option<OrderDir>,
}

impl ListQuery {
    pub fn to_params(&self) -> Params {
        Params::new()
            .with("limit", self.limit)
            .with("offset", self.offset)
            .with("orderBy", self.order_by.clone())
            .with("orderDir", self.order_dir.map(OrderDir::as_str))
    }
}

/// `meta` block of a paged list response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub limit: u32,
    #[serde(default)]
    pub offset: u64,
    pub order_by: Option<String>,
    pub order_dir: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn user_from_dto_normalizes() {
        let user = User::from_dto(&json!({
            "id": 7,
            "nombre": "  Ana Pérez ",
            "email": " Ana@Example.COM ",
            "rolId": "1",
            "createdAt": "2024-05-01T10:00:00Z"
        }))
        .unwrap();
        assert_eq!(user.id, 7);
        assert_eq!(user.name, "Ana Pérez");
        assert_eq!(user.email, "ana@example.com");
        assert!(user.is_admin());
        assert!(!user.is_user());
        assert_eq!(user.created_at.as_deref(), Some("2024-05-01T10:00:00Z"));
        assert_eq!(user.updated_at, None);
    }

    #[test]
    fn user_from_dto_rejects_bad_fields() {
        let base = json!({"id": 1, "nombre": "Ana", "email": "a@b.c", "rolId": 2});
        assert!(User::from_dto(&base).is_ok());

        let cases = [
            ("id", json!(0), UserDtoError::InvalidId),
            ("id", json!("3"), UserDtoError::InvalidId),
            ("nombre", json!(" Al "), UserDtoError::InvalidName),
            ("email", json!("nope"), UserDtoError::InvalidEmail),
            ("rolId", json!(0), UserDtoError::InvalidRole),
            ("rolId", json!("admin"), UserDtoError::InvalidRole),
        ];
        for (key, value, expected) in cases {
            let mut dto = base.clone();
            dto[key] = value;
            assert_eq!(User::from_dto(&dto).unwrap_err(), expected, "{key}");
        }
        assert_eq!(User::from_dto(&json!(null)).unwrap_err(), UserDtoError::Missing);
    }

    #[test]
    fn list_query_skips_unset_fields() {
        let query = ListQuery {
            limit: Some(10),
            offset: Some(0),
            order_by: None,
            order_dir: Some(OrderDir::Desc),
        };
        assert_eq!(
            query.to_params().encode().as_deref(),
            Some("limit=10&offset=0&orderDir=DESC")
        );
        assert_eq!(ListQuery::default().to_params().encode(), None);
    }

    #[test]
    fn patch_skips_absent_fields() {
        let patch = ProductPatch {
            stock: Some(4),
            ..ProductPatch::default()
        };
        assert_eq!(serde_json::to_value(&patch).unwrap(), json!({"stock": 4}));

        let product = NewProduct {
            name: "Martillo".into(),
            precio_cents: 1250,
            stock: 3,
            category_id: 2,
        };
        assert_eq!(
            serde_json::to_value(&product).unwrap(),
            json!({"nombre": "Martillo", "precioCents": 1250, "stock": 3, "categoriaId": 2})
        );
    }
}
