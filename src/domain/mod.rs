pub mod message;
pub mod thread;
pub mod user;

use serde::{Deserialize, Deserializer};

/// Ids travel as unsigned 32 bit integers and are widened for storage.
pub(crate) fn deserialize_id<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
	D: Deserializer<'de>,
{
	u32::deserialize(deserializer).map(i64::from)
}
