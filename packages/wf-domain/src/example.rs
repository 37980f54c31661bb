use serde::{Deserialize, Serialize};

/// One example sentence with its optional translation.
///
/// The field names are shared with existing clients: `chinese` carries the sentence for either
/// language and `english` carries the translation, which generated examples leave empty.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Example {
	#[serde(rename = "chinese")]
	pub sentence: String,
	#[serde(rename = "english", default)]
	pub translation: String,
}
impl Example {
	pub fn generated(sentence: impl Into<String>) -> Self {
		Self { sentence: sentence.into(), translation: String::new() }
	}
}
