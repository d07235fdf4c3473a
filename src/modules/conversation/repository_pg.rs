use uuid::Uuid;

use crate::api::error;
use crate::modules::conversation::model::{ConversationRow, LastMessageRow, NewConversation};
use crate::modules::conversation::repository::ConversationRepository;
use crate::modules::conversation::schema::{ConversationEntity, ParticipantEntity};

use super::model::ConversationRaw;

#[derive(Clone)]
pub struct ConversationPgRepository {
    pool: sqlx::PgPool,
}

impl ConversationPgRepository {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ConversationRepository for ConversationPgRepository {
    async fn find_by_id(
        &self,
        conversation_id: &Uuid,
    ) -> Result<Option<ConversationEntity>, error::SystemError> {
        let conversation =
            sqlx::query_as::<_, ConversationEntity>("SELECT * FROM conversations WHERE id = $1")
                .bind(conversation_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(conversation)
    }

    async fn find_by_participants(
        &self,
        user_low: &Uuid,
        user_high: &Uuid,
        property_id: Option<&Uuid>,
    ) -> Result<Option<ConversationEntity>, error::SystemError> {
        let conversation = sqlx::query_as::<_, ConversationEntity>(
            r#"
            SELECT *
            FROM conversations
            WHERE user_low = $1
            AND user_high = $2
            AND COALESCE(property_id, '00000000-0000-0000-0000-000000000000'::uuid)
                = COALESCE($3, '00000000-0000-0000-0000-000000000000'::uuid)
            LIMIT 1
            "#,
        )
        .bind(user_low)
        .bind(user_high)
        .bind(property_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(conversation)
    }

    async fn create(
        &self,
        new: &NewConversation,
    ) -> Result<ConversationEntity, error::SystemError> {
        let mut tx = self.pool.begin().await?;

        let id = Uuid::now_v7();
        let conversation = sqlx::query_as::<_, ConversationEntity>(
            r#"
            INSERT INTO conversations (id, type, property_id, user_low, user_high)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(new._type)
        .bind(new.property_id)
        .bind(new.user_low)
        .bind(new.user_high)
        .fetch_one(tx.as_mut())
        .await?;

        for participant in &new.participants {
            sqlx::query(
                r#"
                INSERT INTO participants (conversation_id, user_id, role)
                VALUES ($1, $2, $3)
                "#,
            )
            .bind(conversation.id)
            .bind(participant.user_id)
            .bind(participant.role)
            .execute(tx.as_mut())
            .await?;
        }

        tx.commit().await?;

        Ok(conversation)
    }

    async fn find_participants_by_conversation_id(
        &self,
        conversation_ids: &[Uuid],
    ) -> Result<Vec<ParticipantEntity>, error::SystemError> {
        let participants = sqlx::query_as::<_, ParticipantEntity>(
            r#"
            SELECT conversation_id, user_id, role, joined_at, deleted_at
            FROM participants
            WHERE conversation_id = ANY($1)
            AND deleted_at IS NULL
            "#,
        )
        .bind(conversation_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(participants)
    }

    async fn is_participant(
        &self,
        conversation_id: &Uuid,
        user_id: &Uuid,
    ) -> Result<bool, error::SystemError> {
        let row: (bool,) = sqlx::query_as(
            r#"
            SELECT EXISTS(
                SELECT 1
                FROM participants p
                WHERE p.conversation_id = $1
                AND p.user_id = $2
                AND p.deleted_at IS NULL
            )
            "#,
        )
        .bind(conversation_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.0)
    }

    async fn find_last_message(
        &self,
        conversation_id: &Uuid,
    ) -> Result<Option<LastMessageRow>, error::SystemError> {
        let last = sqlx::query_as::<_, LastMessageRowPg>(
            r#"
            SELECT message_id, sender_id, content, created_at
            FROM last_messages
            WHERE conversation_id = $1
            "#,
        )
        .bind(conversation_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(last.map(Into::into))
    }

    async fn list_by_user(
        &self,
        user_id: &Uuid,
    ) -> Result<Vec<ConversationRow>, error::SystemError> {
        let rows = sqlx::query_as::<_, ConversationRaw>(
            r#"
            SELECT
                c.id,
                c.type,
                c.property_id,
                c.created_at,
                c.updated_at,

                lm.message_id   AS last_message_id,
                lm.sender_id    AS last_sender_id,
                lm.content      AS last_content,
                lm.created_at   AS last_created_at

            FROM conversations c

            JOIN participants p
                ON p.conversation_id = c.id
            AND p.user_id = $1
            AND p.deleted_at IS NULL

            LEFT JOIN last_messages lm
                ON lm.conversation_id = c.id

            ORDER BY c.updated_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let result = rows
            .into_iter()
            .map(|r| {
                let last_message = match (r.last_message_id, r.last_sender_id, r.last_created_at)
                {
                    (Some(message_id), Some(sender_id), Some(created_at)) => Some(LastMessageRow {
                        message_id,
                        sender_id,
                        content: r.last_content,
                        created_at,
                    }),
                    _ => None,
                };

                ConversationRow {
                    conversation_id: r.id,
                    _type: r._type,
                    property_id: r.property_id,
                    last_message,
                    created_at: r.created_at,
                    updated_at: r.updated_at,
                }
            })
            .collect();

        Ok(result)
    }
}

#[derive(sqlx::FromRow)]
struct LastMessageRowPg {
    message_id: Uuid,
    sender_id: Uuid,
    content: Option<String>,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl From<LastMessageRowPg> for LastMessageRow {
    fn from(r: LastMessageRowPg) -> Self {
        LastMessageRow {
            message_id: r.message_id,
            sender_id: r.sender_id,
            content: r.content,
            created_at: r.created_at,
        }
    }
}
