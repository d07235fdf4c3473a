use uuid::Uuid;

use crate::{
    api::error,
    modules::property::{repository::PropertyRepository, schema::PropertyEntity},
};

#[derive(Clone)]
pub struct PropertyRepositoryPg {
    pool: sqlx::PgPool,
}

impl PropertyRepositoryPg {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl PropertyRepository for PropertyRepositoryPg {
    async fn find_by_id(
        &self,
        property_id: &Uuid,
    ) -> Result<Option<PropertyEntity>, error::SystemError> {
        let property =
            sqlx::query_as::<_, PropertyEntity>("SELECT * FROM properties WHERE id = $1")
                .bind(property_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(property)
    }
}
