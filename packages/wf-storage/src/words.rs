use sqlx::types::Json;
use time::OffsetDateTime;

use wf_domain::Example;

use crate::{Error, Result, db::Db};

/// Overwrites the examples of one word. Mastery counters are never touched.
///
/// `updated_at` only moves when the examples actually change, so repeating a call is a no-op.
pub async fn update_examples(
	db: &Db,
	user_id: &str,
	profile_id: &str,
	word_id: &str,
	examples: &[Example],
	now: OffsetDateTime,
) -> Result<()> {
	let result = sqlx::query(
		"\
UPDATE words
SET examples = $4,
	updated_at = CASE WHEN examples IS DISTINCT FROM $4 THEN $5 ELSE updated_at END
WHERE user_id = $1 AND profile_id = $2 AND word_id = $3",
	)
	.bind(user_id)
	.bind(profile_id)
	.bind(word_id)
	.bind(Json(examples))
	.bind(now)
	.execute(&db.pool)
	.await?;

	if result.rows_affected() == 0 {
		return Err(Error::NotFound(format!("Word {word_id} for profile {profile_id}.")));
	}

	Ok(())
}
