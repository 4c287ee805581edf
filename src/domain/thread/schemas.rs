use serde::{Deserialize, Serialize};

use super::ThreadPreview;

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct ListThreads {
	pub count: i64,
	#[serde(default, alias = "offseet")]
	pub offset: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadResp {
	pub id: i64,
	pub to_user_id: i64,
	pub from_user_id: i64,
	pub title: String,
	pub content: String,
	pub created_at: String,
}

impl From<ThreadPreview> for ThreadResp {
	fn from(value: ThreadPreview) -> Self {
		Self {
			id: value.id,
			to_user_id: value.to_user_id,
			from_user_id: value.from_user_id,
			title: value.title,
			content: value.content,
			created_at: value.created_at.to_rfc3339(),
		}
	}
}

#[test]
fn test_offset_accepts_legacy_spelling() {
	let req = serde_json::from_str::<ListThreads>(r#"{"count": 10, "offseet": 5}"#).unwrap();
	assert_eq!(req.count, 10);
	assert_eq!(req.offset, 5);

	let req = serde_json::from_str::<ListThreads>(r#"{"count": 3}"#).unwrap();
	assert_eq!(req.offset, 0);
}
