use std::collections::HashMap;

use uuid::Uuid;

use crate::{
    api::error,
    modules::message::{
        model::{AppendMessage, MessageCursor},
        repository::MessageRepository,
        schema::MessageEntity,
    },
};

#[derive(Clone)]
pub struct MessageRepositoryPg {
    pool: sqlx::PgPool,
}

impl MessageRepositoryPg {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl MessageRepository for MessageRepositoryPg {
    async fn append(
        &self,
        message: &AppendMessage,
    ) -> Result<MessageEntity, error::SystemError> {
        let mut tx = self.pool.begin().await?;

        let id = Uuid::now_v7();
        let inserted = sqlx::query_as::<_, MessageEntity>(
            r#"
            INSERT INTO messages (id, conversation_id, sender_id, sender_role, content, attachments)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(message.conversation_id)
        .bind(message.sender_id)
        .bind(message.sender_role)
        .bind(&message.content)
        .bind(&message.attachments)
        .fetch_one(tx.as_mut())
        .await?;

        sqlx::query(
            r#"
            INSERT INTO last_messages (conversation_id, message_id, sender_id, content, created_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (conversation_id) DO UPDATE
            SET message_id = EXCLUDED.message_id,
                sender_id = EXCLUDED.sender_id,
                content = EXCLUDED.content,
                created_at = EXCLUDED.created_at
            "#,
        )
        .bind(inserted.conversation_id)
        .bind(inserted.id)
        .bind(inserted.sender_id)
        .bind(&inserted.content)
        .bind(inserted.created_at)
        .execute(tx.as_mut())
        .await?;

        sqlx::query("UPDATE conversations SET updated_at = NOW() WHERE id = $1")
            .bind(inserted.conversation_id)
            .execute(tx.as_mut())
            .await?;

        tx.commit().await?;

        Ok(inserted)
    }

    async fn find_by_id(
        &self,
        message_id: &Uuid,
    ) -> Result<Option<MessageEntity>, error::SystemError> {
        let message =
            sqlx::query_as::<_, MessageEntity>("SELECT * FROM messages WHERE id = $1")
                .bind(message_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(message)
    }

    async fn list_page(
        &self,
        conversation_id: &Uuid,
        limit: i64,
        after: Option<MessageCursor>,
    ) -> Result<Vec<MessageEntity>, error::SystemError> {
        // has index on (conversation_id, created_at, id) where deleted_at IS NULL

        let messages = if let Some((created_at, id)) = after {
            sqlx::query_as::<_, MessageEntity>(
                r#"
                SELECT * FROM messages
                WHERE conversation_id = $1
                AND deleted_at IS NULL
                AND (created_at, id) > ($2, $3)
                ORDER BY created_at ASC, id ASC
                LIMIT $4
                "#,
            )
            .bind(conversation_id)
            .bind(created_at)
            .bind(id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query_as::<_, MessageEntity>(
                r#"
                SELECT * FROM messages
                WHERE conversation_id = $1
                AND deleted_at IS NULL
                ORDER BY created_at ASC, id ASC
                LIMIT $2
                "#,
            )
            .bind(conversation_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?
        };

        Ok(messages)
    }

    async fn mark_read(
        &self,
        conversation_id: &Uuid,
        user_id: &Uuid,
        message_ids: Option<&[Uuid]>,
    ) -> Result<u64, error::SystemError> {
        let result = if let Some(ids) = message_ids {
            sqlx::query(
                r#"
                INSERT INTO message_reads (message_id, user_id)
                SELECT m.id, $2
                FROM messages m
                WHERE m.conversation_id = $1
                AND m.sender_id <> $2
                AND m.deleted_at IS NULL
                AND m.id = ANY($3)
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(conversation_id)
            .bind(user_id)
            .bind(ids)
            .execute(&self.pool)
            .await?
        } else {
            sqlx::query(
                r#"
                INSERT INTO message_reads (message_id, user_id)
                SELECT m.id, $2
                FROM messages m
                WHERE m.conversation_id = $1
                AND m.sender_id <> $2
                AND m.deleted_at IS NULL
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(conversation_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?
        };

        Ok(result.rows_affected())
    }

    async fn edit(
        &self,
        message_id: &Uuid,
        sender_id: &Uuid,
        content: &str,
    ) -> Result<Option<MessageEntity>, error::SystemError> {
        let message = sqlx::query_as::<_, MessageEntity>(
            r#"
            UPDATE messages
            SET content = $3, is_edited = TRUE, updated_at = NOW()
            WHERE id = $1
            AND sender_id = $2
            AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(message_id)
        .bind(sender_id)
        .bind(content)
        .fetch_optional(&self.pool)
        .await?;

        Ok(message)
    }

    async fn soft_delete(
        &self,
        message_id: &Uuid,
        sender_id: &Uuid,
    ) -> Result<bool, error::SystemError> {
        let result = sqlx::query(
            r#"
            UPDATE messages
            SET deleted_at = NOW(), updated_at = NOW()
            WHERE id = $1
            AND sender_id = $2
            AND deleted_at IS NULL
            "#,
        )
        .bind(message_id)
        .bind(sender_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn unread_by_thread(
        &self,
        conversation_id: &Uuid,
        user_id: &Uuid,
    ) -> Result<i64, error::SystemError> {
        let row: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*)
            FROM messages m
            WHERE m.conversation_id = $1
            AND m.sender_id <> $2
            AND m.deleted_at IS NULL
            AND NOT EXISTS (
                SELECT 1 FROM message_reads r
                WHERE r.message_id = m.id AND r.user_id = $2
            )
            "#,
        )
        .bind(conversation_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.0)
    }

    async fn unread_by_threads(
        &self,
        user_id: &Uuid,
        conversation_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, i64>, error::SystemError> {
        let rows: Vec<(Uuid, i64)> = sqlx::query_as(
            r#"
            SELECT m.conversation_id, COUNT(*)
            FROM messages m
            WHERE m.conversation_id = ANY($2)
            AND m.sender_id <> $1
            AND m.deleted_at IS NULL
            AND NOT EXISTS (
                SELECT 1 FROM message_reads r
                WHERE r.message_id = m.id AND r.user_id = $1
            )
            GROUP BY m.conversation_id
            "#,
        )
        .bind(user_id)
        .bind(conversation_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().collect())
    }

    async fn unread_total(&self, user_id: &Uuid) -> Result<i64, error::SystemError> {
        let row: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*)
            FROM messages m
            JOIN participants p
                ON p.conversation_id = m.conversation_id
            AND p.user_id = $1
            AND p.deleted_at IS NULL
            WHERE m.sender_id <> $1
            AND m.deleted_at IS NULL
            AND NOT EXISTS (
                SELECT 1 FROM message_reads r
                WHERE r.message_id = m.id AND r.user_id = $1
            )
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.0)
    }
}
