use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::core::error::{map_db_error, AppError, Result};
use crate::features::service_types::dtos::{
    CreateServiceTypeDto, ServiceTypeFilter, ServiceTypeResponseDto, UpdateServiceTypeDto,
};
use crate::features::service_types::models::ServiceType;
use crate::shared::types::{Paginated, PaginationQuery};

const SERVICE_TYPE_COLUMNS: &str = "id, name, description, price, currency, document_requirements, \
     is_active, created_at, updated_at";

const DUPLICATE_NAME: &str = "A service type with this name already exists";

/// Service for the service type catalogue
pub struct ServiceTypeService {
    pool: PgPool,
}

impl ServiceTypeService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(
        &self,
        filter: &ServiceTypeFilter,
        page: &PaginationQuery,
    ) -> Result<Paginated<ServiceTypeResponseDto>> {
        let search = filter.search.as_ref().map(|s| format!("%{}%", s));

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM service_types
            WHERE ($1 OR is_active = TRUE)
              AND ($2::text IS NULL OR name ILIKE $2)
            "#,
        )
        .bind(filter.include_inactive)
        .bind(&search)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to count service types: {:?}", e);
            AppError::Database(e)
        })?;

        let rows = sqlx::query_as::<_, ServiceType>(&format!(
            r#"
            SELECT {SERVICE_TYPE_COLUMNS} FROM service_types
            WHERE ($1 OR is_active = TRUE)
              AND ($2::text IS NULL OR name ILIKE $2)
            ORDER BY name
            OFFSET $3 LIMIT $4
            "#
        ))
        .bind(filter.include_inactive)
        .bind(&search)
        .bind(page.offset())
        .bind(page.limit())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list service types: {:?}", e);
            AppError::Database(e)
        })?;

        Ok(Paginated::new(rows, total, page.skip, page.take).map(Into::into))
    }

    /// Get a service type. Inactive types are hidden unless `include_inactive`.
    pub async fn get(&self, id: Uuid, include_inactive: bool) -> Result<ServiceTypeResponseDto> {
        let service_type = self.find(id).await?;
        if !service_type.is_active && !include_inactive {
            return Err(not_found(id));
        }
        Ok(service_type.into())
    }

    /// Load a service type row for use by other features
    pub async fn find(&self, id: Uuid) -> Result<ServiceType> {
        sqlx::query_as::<_, ServiceType>(&format!(
            "SELECT {SERVICE_TYPE_COLUMNS} FROM service_types WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to get service type: {:?}", e);
            AppError::Database(e)
        })?
        .ok_or_else(|| not_found(id))
    }

    pub async fn create(&self, dto: CreateServiceTypeDto) -> Result<ServiceTypeResponseDto> {
        let service_type = sqlx::query_as::<_, ServiceType>(&format!(
            r#"
            INSERT INTO service_types (name, description, price, currency, document_requirements, is_active)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {SERVICE_TYPE_COLUMNS}
            "#
        ))
        .bind(dto.name.trim())
        .bind(&dto.description)
        .bind(dto.price)
        .bind(&dto.currency)
        .bind(Json(&dto.document_requirements))
        .bind(dto.is_active.unwrap_or(true))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_db_error(e, DUPLICATE_NAME))?;

        tracing::info!(
            "Created service type {} ({})",
            service_type.id,
            service_type.name
        );
        Ok(service_type.into())
    }

    pub async fn update(&self, id: Uuid, dto: UpdateServiceTypeDto) -> Result<ServiceTypeResponseDto> {
        let service_type = sqlx::query_as::<_, ServiceType>(&format!(
            r#"
            UPDATE service_types SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                price = COALESCE($4, price),
                currency = COALESCE($5, currency),
                document_requirements = COALESCE($6, document_requirements),
                is_active = COALESCE($7, is_active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {SERVICE_TYPE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(dto.name.as_deref().map(str::trim))
        .bind(&dto.description)
        .bind(dto.price)
        .bind(&dto.currency)
        .bind(dto.document_requirements.as_ref().map(Json))
        .bind(dto.is_active)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_db_error(e, DUPLICATE_NAME))?
        .ok_or_else(|| not_found(id))?;

        Ok(service_type.into())
    }

    /// Delete a service type. FAQs pointing at it are detached by the schema;
    /// types with service requests cannot be deleted (deactivate them instead).
    pub async fn delete(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM service_types WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| match map_db_error(e, DUPLICATE_NAME) {
                AppError::BadRequest(_) => AppError::Conflict(
                    "Service type has service requests; deactivate it instead".to_string(),
                ),
                other => other,
            })?;

        if result.rows_affected() == 0 {
            return Err(not_found(id));
        }

        tracing::info!("Deleted service type {}", id);
        Ok(())
    }
}

fn not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Service type '{}' not found", id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn create_dto(name: &str) -> CreateServiceTypeDto {
        CreateServiceTypeDto {
            name: name.to_string(),
            description: None,
            price: Decimal::new(2500, 2),
            currency: "usd".to_string(),
            document_requirements: vec![],
            is_active: None,
        }
    }

    #[sqlx::test(migrator = "crate::core::database::MIGRATOR")]
    #[ignore = "requires a running Postgres (DATABASE_URL)"]
    async fn test_duplicate_name_is_conflict(pool: PgPool) {
        let service = ServiceTypeService::new(pool);
        service.create(create_dto("Apostille")).await.unwrap();

        let err = service.create(create_dto("Apostille")).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[sqlx::test(migrator = "crate::core::database::MIGRATOR")]
    #[ignore = "requires a running Postgres (DATABASE_URL)"]
    async fn test_inactive_hidden_from_public(pool: PgPool) {
        let service = ServiceTypeService::new(pool);
        let mut dto = create_dto("Archived");
        dto.is_active = Some(false);
        let created = service.create(dto).await.unwrap();

        assert!(matches!(
            service.get(created.id, false).await,
            Err(AppError::NotFound(_))
        ));
        assert!(service.get(created.id, true).await.is_ok());

        let page = service
            .list(&ServiceTypeFilter::default(), &PaginationQuery::default())
            .await
            .unwrap();
        assert_eq!(page.total, 0);
    }
}
