//! # Discount Repository
//!
//! Lookup of discount codes referenced by orders and order items.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use eshop_core::{Discount, ValidationError};

/// Repository for discount database operations.
#[derive(Debug, Clone)]
pub struct DiscountRepository {
    pool: SqlitePool,
}

impl DiscountRepository {
    /// Creates a new DiscountRepository.
    pub fn new(pool: SqlitePool) -> Self {
        DiscountRepository { pool }
    }

    /// Gets a discount by its code.
    pub async fn get_by_code(&self, code: &str) -> DbResult<Option<Discount>> {
        let discount = sqlx::query_as::<_, Discount>(
            r#"
            SELECT id, code, name, kind, value, starts_at, ends_at,
                   total_usage_limit, usage_count, is_active, created_at
            FROM discounts
            WHERE code = ?1
            "#,
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(discount)
    }

    /// Resolves a code supplied on an order request to a discount id.
    ///
    /// `Ok(Ok(id))` when the code exists and is active at `now`;
    /// `Ok(Err(..))` with a field-level validation error otherwise.
    pub async fn resolve_active(
        &self,
        field: &str,
        code: &str,
        now: DateTime<Utc>,
    ) -> DbResult<Result<String, ValidationError>> {
        debug!(code = %code, "Resolving discount code");

        let resolved = match self.get_by_code(code).await? {
            None => Err(ValidationError::UnknownDiscount {
                field: field.to_string(),
                code: code.to_string(),
            }),
            Some(discount) if !discount.is_active_at(now) => {
                Err(ValidationError::InactiveDiscount {
                    field: field.to_string(),
                    code: code.to_string(),
                })
            }
            Some(discount) => Ok(discount.id),
        };

        Ok(resolved)
    }

    /// Inserts a new discount.
    pub async fn insert(&self, discount: &Discount) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO discounts (
                id, code, name, kind, value, starts_at, ends_at,
                total_usage_limit, usage_count, is_active, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&discount.id)
        .bind(&discount.code)
        .bind(&discount.name)
        .bind(discount.kind)
        .bind(discount.value)
        .bind(discount.starts_at)
        .bind(discount.ends_at)
        .bind(discount.total_usage_limit)
        .bind(discount.usage_count)
        .bind(discount.is_active)
        .bind(discount.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
