use async_trait::async_trait;
use sqlx::{postgres::PgArguments, query::QueryScalar, PgPool, Postgres};

use super::{MessageRepository, ThreadRepository, UserRepository};
use crate::{
	domain::{message::MessageView, thread::ThreadPreview},
	services::response::ServiceError,
};

const MESSAGE_VIEW_COLUMNS: &str = r#"
	customer_message.id,
	customer_message.thread_id,
	customer_message.to_user_id,
	customer_message.from_user_id,
	customer_message.content,
	customer_message.readed,
	customer_message.created_at,
	customer_message.updated_at,
	customer_message.deleted,
	from_user_info.first_name AS from_first_name,
	from_user_info.last_name AS from_last_name,
	to_user_info.first_name AS to_first_name,
	to_user_info.last_name AS to_last_name
	FROM customer_message
	LEFT JOIN "user" from_user_info ON from_user_info.id = customer_message.from_user_id
	LEFT JOIN "user" to_user_info ON to_user_info.id = customer_message.to_user_id
"#;

// Tail for a data-modifying CTE named `changed` returning `thread_id`. The thread's `updated_at`
// moves in the same statement, and the row count comes from `changed`.
const TOUCH_THREAD_AND_COUNT: &str = r#"
	, touched AS (
		UPDATE message_thread SET updated_at = now()
		WHERE id IN (SELECT thread_id FROM changed)
	)
	SELECT count(*) FROM changed
"#;

/// Postgres-backed store. Every call is a single statement against the pool, no transaction
/// is held across calls. A message write and its thread's `updated_at` bump share one statement.
#[derive(Clone)]
pub struct PgRepository {
	pool: PgPool,
}

impl PgRepository {
	pub fn new(pool: PgPool) -> Self {
		Self { pool }
	}

	async fn write_counted(
		&self,
		query: QueryScalar<'_, Postgres, i64, PgArguments>,
	) -> Result<u64, ServiceError> {
		let affected = query.fetch_one(&self.pool).await?;
		Ok(u64::try_from(affected).unwrap_or_default())
	}

	async fn exists(
		&self,
		sql: &str,
		id: i64,
	) -> Result<bool, ServiceError> {
		let exists: bool = sqlx::query_scalar(sql).bind(id).fetch_one(&self.pool).await.map_err(|err| {
			tracing::error!("error checking if row exists: {}", err);
			ServiceError::from(err)
		})?;
		Ok(exists)
	}
}

#[async_trait]
impl UserRepository for PgRepository {
	async fn user_exists(
		&self,
		user_id: i64,
	) -> Result<bool, ServiceError> {
		self.exists(r#"SELECT EXISTS (SELECT id FROM "user" WHERE id = $1)"#, user_id).await
	}
}

#[async_trait]
impl ThreadRepository for PgRepository {
	async fn thread_exists(
		&self,
		thread_id: i64,
	) -> Result<bool, ServiceError> {
		self.exists("SELECT EXISTS (SELECT id FROM message_thread WHERE id = $1 AND deleted = FALSE)", thread_id)
			.await
	}

	async fn create_thread(
		&self,
		title: &str,
		to_user_id: i64,
		from_user_id: i64,
	) -> Result<i64, ServiceError> {
		let id: i64 = sqlx::query_scalar("INSERT INTO message_thread (to_user_id, from_user_id, title) VALUES ($1, $2, $3) RETURNING id")
			.bind(to_user_id)
			.bind(from_user_id)
			.bind(title)
			.fetch_one(&self.pool)
			.await?;
		Ok(id)
	}

	async fn list_threads_by_user(
		&self,
		user_id: i64,
		count: i64,
		offset: i64,
	) -> Result<Vec<ThreadPreview>, ServiceError> {
		let threads = sqlx::query_as::<_, ThreadPreview>(
			r#"
			SELECT message_thread.id,
				message_thread.to_user_id,
				message_thread.from_user_id,
				message_thread.title,
				last_message.content,
				message_thread.created_at,
				message_thread.updated_at
			FROM message_thread
			JOIN LATERAL (
				SELECT content, created_at, id
				FROM customer_message
				WHERE customer_message.thread_id = message_thread.id AND customer_message.deleted = FALSE
				ORDER BY created_at DESC, id DESC
				LIMIT 1
			) last_message ON TRUE
			WHERE (message_thread.to_user_id = $1 OR message_thread.from_user_id = $1)
				AND message_thread.deleted = FALSE
			ORDER BY last_message.created_at DESC, last_message.id DESC
			LIMIT $2 OFFSET $3
			"#,
		)
		.bind(user_id)
		.bind(count)
		.bind(offset)
		.fetch_all(&self.pool)
		.await?;
		Ok(threads)
	}
}

#[async_trait]
impl MessageRepository for PgRepository {
	async fn message_exists(
		&self,
		message_id: i64,
	) -> Result<bool, ServiceError> {
		self.exists("SELECT EXISTS (SELECT id FROM customer_message WHERE id = $1 AND deleted = FALSE)", message_id)
			.await
	}

	async fn create_message(
		&self,
		to_user_id: i64,
		from_user_id: i64,
		thread_id: i64,
		content: &str,
	) -> Result<(), ServiceError> {
		let sql = format!(
			"WITH changed AS (
				INSERT INTO customer_message (to_user_id, from_user_id, content, thread_id) VALUES ($1, $2, $3, $4)
				RETURNING thread_id
			) {TOUCH_THREAD_AND_COUNT}"
		);
		self.write_counted(sqlx::query_scalar(&sql).bind(to_user_id).bind(from_user_id).bind(content).bind(thread_id))
			.await?;
		Ok(())
	}

	async fn update_message_content(
		&self,
		content: &str,
		from_user_id: i64,
		message_id: i64,
		thread_id: i64,
	) -> Result<u64, ServiceError> {
		let sql = format!(
			"WITH changed AS (
				UPDATE customer_message SET content = $1, updated_at = now()
				WHERE id = $2 AND thread_id = $3 AND from_user_id = $4 AND deleted = FALSE
				RETURNING thread_id
			) {TOUCH_THREAD_AND_COUNT}"
		);
		self.write_counted(sqlx::query_scalar(&sql).bind(content).bind(message_id).bind(thread_id).bind(from_user_id)).await
	}

	async fn mark_read(
		&self,
		read: bool,
		to_user_id: i64,
		message_id: i64,
		thread_id: i64,
	) -> Result<u64, ServiceError> {
		let sql = format!(
			"WITH changed AS (
				UPDATE customer_message SET readed = $1, updated_at = now()
				WHERE id = $2 AND thread_id = $3 AND to_user_id = $4 AND deleted = FALSE
				RETURNING thread_id
			) {TOUCH_THREAD_AND_COUNT}"
		);
		self.write_counted(sqlx::query_scalar(&sql).bind(read).bind(message_id).bind(thread_id).bind(to_user_id)).await
	}

	async fn delete_message(
		&self,
		from_user_id: i64,
		message_id: i64,
		thread_id: i64,
	) -> Result<u64, ServiceError> {
		let sql = format!(
			"WITH changed AS (
				DELETE FROM customer_message WHERE id = $1 AND thread_id = $2 AND from_user_id = $3
				RETURNING thread_id
			) {TOUCH_THREAD_AND_COUNT}"
		);
		self.write_counted(sqlx::query_scalar(&sql).bind(message_id).bind(thread_id).bind(from_user_id)).await
	}

	async fn list_messages_by_thread(
		&self,
		thread_id: i64,
		user_id: i64,
		count: i64,
		offset: i64,
	) -> Result<Vec<MessageView>, ServiceError> {
		let sql = format!(
			"SELECT {MESSAGE_VIEW_COLUMNS}
			WHERE customer_message.thread_id = $1
				AND (customer_message.to_user_id = $2 OR customer_message.from_user_id = $2)
				AND customer_message.deleted = FALSE
			ORDER BY customer_message.created_at DESC, customer_message.id DESC
			LIMIT $3 OFFSET $4"
		);
		let messages = sqlx::query_as::<_, MessageView>(&sql)
			.bind(thread_id)
			.bind(user_id)
			.bind(count)
			.bind(offset)
			.fetch_all(&self.pool)
			.await?;
		Ok(messages)
	}

	async fn get_message_by_id(
		&self,
		to_user_id: i64,
		message_id: i64,
	) -> Result<Option<MessageView>, ServiceError> {
		let sql = format!(
			"SELECT {MESSAGE_VIEW_COLUMNS}
			WHERE customer_message.id = $1 AND customer_message.to_user_id = $2 AND customer_message.deleted = FALSE
			LIMIT 1"
		);
		let message = sqlx::query_as::<_, MessageView>(&sql)
			.bind(message_id)
			.bind(to_user_id)
			.fetch_optional(&self.pool)
			.await?;
		Ok(message)
	}
}
