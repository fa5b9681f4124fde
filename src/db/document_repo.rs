// src/db/document_repo.rs

use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::documents::{AttachDocumentPayload, Document},
};

#[derive(Clone, Default)]
pub struct DocumentRepository;

impl DocumentRepository {
    pub fn new() -> Self {
        Self
    }

    pub async fn insert_for_load<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        load_id: Uuid,
        driver_id: Option<Uuid>,
        carrier_id: Option<Uuid>,
        uploaded_by: Uuid,
        payload: &AttachDocumentPayload,
    ) -> Result<Document, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let doc = sqlx::query_as::<_, Document>(
            r#"
            INSERT INTO documents (
                tenant_id, load_id, driver_id, carrier_id, file_name, file_path,
                file_size, document_type, visibility, uploaded_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(load_id)
        .bind(driver_id)
        .bind(carrier_id)
        .bind(&payload.file_name)
        .bind(&payload.file_path)
        .bind(payload.file_size)
        .bind(payload.document_type)
        .bind(payload.visibility)
        .bind(uploaded_by)
        .fetch_one(executor)
        .await?;
        Ok(doc)
    }

    pub async fn list_for_load<'e, E>(
        &self,
        executor: E,
        tenant_id: Option<Uuid>,
        load_id: Uuid,
    ) -> Result<Vec<Document>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let docs = sqlx::query_as::<_, Document>(
            r#"
            SELECT * FROM documents
            WHERE load_id = $1 AND ($2::uuid IS NULL OR tenant_id = $2)
            ORDER BY created_at DESC
            "#,
        )
        .bind(load_id)
        .bind(tenant_id)
        .fetch_all(executor)
        .await?;
        Ok(docs)
    }
}
