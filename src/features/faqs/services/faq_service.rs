use sqlx::PgPool;
use uuid::Uuid;

use crate::core::error::{map_db_error, AppError, Result};
use crate::features::faqs::dtos::{
    CreateFaqDto, FaqFilter, FaqResponseDto, PublicFaqDto, UpdateFaqDto,
};
use crate::features::faqs::models::Faq;
use crate::shared::types::{Paginated, PaginationQuery};

const FAQ_COLUMNS: &str = "id, question, answer, category, service_type_id, display_order, \
     is_published, created_at, updated_at";

/// Service for FAQ operations
pub struct FaqService {
    pool: PgPool,
}

impl FaqService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Admin listing: every FAQ, filtered and paginated
    pub async fn list(
        &self,
        filter: &FaqFilter,
        page: &PaginationQuery,
    ) -> Result<Paginated<FaqResponseDto>> {
        let search = filter.search.as_ref().map(|s| format!("%{}%", s));
        let where_clause = r#"
            WHERE ($1::text IS NULL OR category = $1)
              AND ($2::uuid IS NULL OR service_type_id = $2)
              AND ($3::text IS NULL OR question ILIKE $3 OR answer ILIKE $3)
        "#;

        let total: i64 =
            sqlx::query_scalar(&format!("SELECT COUNT(*) FROM faqs {where_clause}"))
                .bind(&filter.category)
                .bind(filter.service_type_id)
                .bind(&search)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| {
                    tracing::error!("Failed to count FAQs: {:?}", e);
                    AppError::Database(e)
                })?;

        let faqs = sqlx::query_as::<_, Faq>(&format!(
            "SELECT {FAQ_COLUMNS} FROM faqs {where_clause} \
             ORDER BY display_order, created_at OFFSET $4 LIMIT $5"
        ))
        .bind(&filter.category)
        .bind(filter.service_type_id)
        .bind(&search)
        .bind(page.offset())
        .bind(page.limit())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list FAQs: {:?}", e);
            AppError::Database(e)
        })?;

        Ok(Paginated::new(faqs, total, page.skip, page.take).map(Into::into))
    }

    /// Published FAQs for the public help page
    pub async fn list_public(&self, filter: &FaqFilter) -> Result<Vec<PublicFaqDto>> {
        let faqs = sqlx::query_as::<_, Faq>(&format!(
            r#"
            SELECT {FAQ_COLUMNS} FROM faqs
            WHERE is_published = TRUE
              AND ($1::text IS NULL OR category = $1)
              AND ($2::uuid IS NULL OR service_type_id = $2)
            ORDER BY display_order, created_at
            "#
        ))
        .bind(&filter.category)
        .bind(filter.service_type_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list public FAQs: {:?}", e);
            AppError::Database(e)
        })?;

        Ok(faqs.into_iter().map(Into::into).collect())
    }

    /// Distinct categories of published FAQs
    pub async fn categories(&self) -> Result<Vec<String>> {
        sqlx::query_scalar(
            r#"
            SELECT DISTINCT category FROM faqs
            WHERE is_published = TRUE AND category IS NOT NULL
            ORDER BY category
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list FAQ categories: {:?}", e);
            AppError::Database(e)
        })
    }

    pub async fn get(&self, id: Uuid) -> Result<FaqResponseDto> {
        let faq = sqlx::query_as::<_, Faq>(&format!(
            "SELECT {FAQ_COLUMNS} FROM faqs WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to get FAQ: {:?}", e);
            AppError::Database(e)
        })?;

        faq.map(Into::into).ok_or_else(|| not_found(id))
    }

    pub async fn create(&self, dto: CreateFaqDto) -> Result<FaqResponseDto> {
        let faq = sqlx::query_as::<_, Faq>(&format!(
            r#"
            INSERT INTO faqs (question, answer, category, service_type_id, display_order, is_published)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {FAQ_COLUMNS}
            "#
        ))
        .bind(&dto.question)
        .bind(&dto.answer)
        .bind(&dto.category)
        .bind(dto.service_type_id)
        .bind(dto.display_order)
        .bind(dto.is_published.unwrap_or(true))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_db_error(e, "FAQ already exists"))?;

        tracing::info!("Created FAQ {}", faq.id);
        Ok(faq.into())
    }

    pub async fn update(&self, id: Uuid, dto: UpdateFaqDto) -> Result<FaqResponseDto> {
        let faq = sqlx::query_as::<_, Faq>(&format!(
            r#"
            UPDATE faqs SET
                question = COALESCE($2, question),
                answer = COALESCE($3, answer),
                category = CASE WHEN $4 THEN $5 ELSE category END,
                service_type_id = CASE WHEN $6 THEN $7 ELSE service_type_id END,
                display_order = COALESCE($8, display_order),
                is_published = COALESCE($9, is_published),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {FAQ_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&dto.question)
        .bind(&dto.answer)
        .bind(dto.category.is_some())
        .bind(dto.category.as_ref().and_then(|c| c.as_deref()))
        .bind(dto.service_type_id.is_some())
        .bind(dto.service_type_id.flatten())
        .bind(dto.display_order)
        .bind(dto.is_published)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_db_error(e, "FAQ already exists"))?;

        faq.map(Into::into).ok_or_else(|| not_found(id))
    }

    pub async fn delete(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM faqs WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to delete FAQ: {:?}", e);
                AppError::Database(e)
            })?;

        if result.rows_affected() == 0 {
            return Err(not_found(id));
        }
        Ok(())
    }
}

fn not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("FAQ '{}' not found", id))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_dto(service_type_id: Option<Uuid>) -> CreateFaqDto {
        CreateFaqDto {
            question: "Can I pay in installments?".to_string(),
            answer: "No, payment is due upfront.".to_string(),
            category: Some("payments".to_string()),
            service_type_id,
            display_order: 1,
            is_published: None,
        }
    }

    #[sqlx::test(migrator = "crate::core::database::MIGRATOR")]
    #[ignore = "requires a running Postgres (DATABASE_URL)"]
    async fn test_service_type_delete_detaches_faq(pool: PgPool) {
        let service_type_id: Uuid =
            sqlx::query_scalar("INSERT INTO service_types (name) VALUES ('Notary') RETURNING id")
                .fetch_one(&pool)
                .await
                .unwrap();

        let service = FaqService::new(pool.clone());
        let faq = service.create(create_dto(Some(service_type_id))).await.unwrap();
        assert_eq!(faq.service_type_id, Some(service_type_id));

        sqlx::query("DELETE FROM service_types WHERE id = $1")
            .bind(service_type_id)
            .execute(&pool)
            .await
            .unwrap();

        let faq = service.get(faq.id).await.unwrap();
        assert_eq!(faq.service_type_id, None);
    }

    #[sqlx::test(migrator = "crate::core::database::MIGRATOR")]
    #[ignore = "requires a running Postgres (DATABASE_URL)"]
    async fn test_unknown_service_type_is_bad_request(pool: PgPool) {
        let service = FaqService::new(pool);
        let err = service.create(create_dto(Some(Uuid::new_v4()))).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[sqlx::test(migrator = "crate::core::database::MIGRATOR")]
    #[ignore = "requires a running Postgres (DATABASE_URL)"]
    async fn test_public_listing_hides_unpublished(pool: PgPool) {
        let service = FaqService::new(pool);
        service.create(create_dto(None)).await.unwrap();
        let mut hidden = create_dto(None);
        hidden.is_published = Some(false);
        hidden.category = Some("internal".to_string());
        service.create(hidden).await.unwrap();

        let public = service.list_public(&FaqFilter::default()).await.unwrap();
        assert_eq!(public.len(), 1);
        assert_eq!(service.categories().await.unwrap(), vec!["payments".to_string()]);

        let all = service
            .list(&FaqFilter::default(), &PaginationQuery::default())
            .await
            .unwrap();
        assert_eq!(all.total, 2);
    }

    #[sqlx::test(migrator = "crate::core::database::MIGRATOR")]
    #[ignore = "requires a running Postgres (DATABASE_URL)"]
    async fn test_update_clears_category_and_service_type(pool: PgPool) {
        let service_type_id: Uuid =
            sqlx::query_scalar("INSERT INTO service_types (name) VALUES ('Notary') RETURNING id")
                .fetch_one(&pool)
                .await
                .unwrap();

        let service = FaqService::new(pool);
        let faq = service.create(create_dto(Some(service_type_id))).await.unwrap();

        let untouched = UpdateFaqDto {
            question: None,
            answer: Some("Yes, in two parts.".to_string()),
            category: None,
            service_type_id: None,
            display_order: None,
            is_published: None,
        };
        let updated = service.update(faq.id, untouched).await.unwrap();
        assert_eq!(updated.category.as_deref(), Some("payments"));
        assert_eq!(updated.service_type_id, Some(service_type_id));

        let cleared = UpdateFaqDto {
            question: None,
            answer: None,
            category: Some(None),
            service_type_id: Some(None),
            display_order: None,
            is_published: None,
        };
        let updated = service.update(faq.id, cleared).await.unwrap();
        assert_eq!(updated.category, None);
        assert_eq!(updated.service_type_id, None);
        assert_eq!(updated.answer, "Yes, in two parts.");
    }
}
