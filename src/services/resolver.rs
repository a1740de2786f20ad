//! Identifier parsing and existence checks shared by the services.
//!
//! Parsing failures are `InvalidInput` (400); well-formed identifiers that do
//! not name a row are `NotFound` (404). The `require_*` helpers take any
//! connection so they can run inside the caller's transaction.

use crate::entities::{product, supplier, warehouse};
use crate::errors::ServiceError;
use sea_orm::{ConnectionTrait, EntityTrait};
use uuid::Uuid;

const CANONICAL_UUID_LEN: usize = 36;

/// Parses a canonical hyphenated UUID (`8-4-4-4-12` hex digits).
pub fn parse_id(kind: &str, raw: &str) -> Result<Uuid, ServiceError> {
    let well_formed = raw.len() == CANONICAL_UUID_LEN
        && raw
            .char_indices()
            .all(|(i, c)| match i {
                8 | 13 | 18 | 23 => c == '-',
                _ => c.is_ascii_hexdigit(),
            });

    well_formed
        .then(|| Uuid::parse_str(raw).ok())
        .flatten()
        .ok_or_else(|| ServiceError::InvalidInput(format!("Invalid {} id: {:?}", kind, raw)))
}

pub async fn require_warehouse<C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
) -> Result<warehouse::Model, ServiceError> {
    warehouse::Entity::find_by_id(id)
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::NotFound(format!("Warehouse {} not found", id)))
}

pub async fn require_product<C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
) -> Result<product::Model, ServiceError> {
    product::Entity::find_by_id(id)
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", id)))
}

pub async fn require_supplier<C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
) -> Result<supplier::Model, ServiceError> {
    supplier::Entity::find_by_id(id)
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::NotFound(format!("Supplier {} not found", id)))
}
