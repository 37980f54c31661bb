use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use unicode_script::{Script, UnicodeScript};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
	Zh,
	En,
}
impl Language {
	/// Generation order for mixed batches.
	pub const ALL: [Self; 2] = [Self::Zh, Self::En];

	pub fn as_str(self) -> &'static str {
		match self {
			Self::Zh => "zh",
			Self::En => "en",
		}
	}
}
impl fmt::Display for Language {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}
impl FromStr for Language {
	type Err = String;

	fn from_str(raw: &str) -> Result<Self, Self::Err> {
		match raw.trim().to_ascii_lowercase().as_str() {
			"zh" => Ok(Self::Zh),
			"en" => Ok(Self::En),
			other => Err(format!("Unsupported language {other:?}.")),
		}
	}
}

/// Any Han codepoint marks the word as Chinese; everything else is treated as English.
pub fn detect_language(text: &str) -> Language {
	if text.chars().any(|ch| ch.script() == Script::Han) { Language::Zh } else { Language::En }
}
