//! Content Generator: example sentences for vocabulary words.
//!
//! Words are grouped by language and each group costs one provider call. Responses are mapped
//! back by exact word text; a word missing from the response keeps its examples. Nothing here
//! retries. Retry policy belongs to the queue processor.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::OffsetDateTime;

use crate::{Error, Result, WfService, prompt, store::WordRef};
use wf_domain::{Example, Language, detect_language, text};
use wf_providers::generator::GenerationCall;

/// A word as seen by the generator. Unknown fields pass through untouched.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WordEntry {
	#[serde(alias = "id", alias = "wordId")]
	pub word_id: String,
	pub text: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub language: Option<Language>,
	#[serde(default)]
	pub examples: Vec<Example>,
	#[serde(flatten)]
	pub extra: Map<String, Value>,
}
impl WordEntry {
	pub fn new(word_id: impl Into<String>, text: impl Into<String>) -> Self {
		let text = text.into();

		Self {
			word_id: word_id.into(),
			language: Some(detect_language(&text)),
			text,
			examples: Vec::new(),
			extra: Map::new(),
		}
	}

	/// Stated language, or the script heuristic when the caller did not say.
	pub fn resolved_language(&self) -> Language {
		self.language.unwrap_or_else(|| detect_language(&self.text))
	}
}

#[derive(Clone, Debug, Deserialize)]
pub struct SessionFillRequest {
	#[serde(default, alias = "profileId")]
	pub profile_id: Option<String>,
	pub words: Vec<WordEntry>,
	#[serde(default, alias = "contextWords")]
	pub context_words: Vec<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct SingleExampleRequest {
	pub word: String,
	#[serde(default, alias = "existingExamples")]
	pub existing_examples: Vec<String>,
	#[serde(default, alias = "contextWords")]
	pub context_words: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct SingleExampleResponse {
	pub example: String,
}

/// Result of a generate-and-store call.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StoreReport {
	pub updated: Vec<String>,
	/// Word ids the provider returned nothing for. Their stored examples are unchanged.
	pub missing: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct GeneratedWord {
	character: String,
	#[serde(default)]
	examples: Vec<GeneratedExample>,
}

#[derive(Debug, Deserialize)]
struct GeneratedExample {
	#[serde(default)]
	chinese: String,
}

impl WfService {
	/// Generates examples for the words of one profile and writes them to the word store.
	pub async fn generate_and_store(
		&self,
		user_id: &str,
		profile_id: &str,
		words: &[WordEntry],
	) -> Result<StoreReport> {
		let generated = self.generate_examples(words, &[]).await?;
		let now = OffsetDateTime::now_utc();
		let mut report = StoreReport::default();

		for (word, examples) in words.iter().zip(generated) {
			let Some(examples) = examples else {
				tracing::warn!(
					word_id = %word.word_id,
					text = %word.text,
					"Generator response did not include the word."
				);
				report.missing.push(word.word_id.clone());

				continue;
			};
			let word_ref = WordRef { user_id, profile_id, word_id: &word.word_id };

			self.words.update_examples(word_ref, &examples, now).await?;
			tracing::info!(
				word_id = %word.word_id,
				examples = examples.len(),
				"Stored generated examples."
			);
			report.updated.push(word.word_id.clone());
		}

		Ok(report)
	}

	/// Generates examples for a study session and returns the words without persisting them.
	pub async fn fill_session(&self, req: SessionFillRequest) -> Result<Vec<WordEntry>> {
		if req.words.iter().any(|word| word.text.trim().is_empty()) {
			return Err(Error::InvalidRequest {
				message: "Every word must have non-empty text.".to_string(),
			});
		}

		tracing::info!(
			profile_id = req.profile_id.as_deref().unwrap_or("-"),
			words = req.words.len(),
			"Generating session content."
		);

		let generated = self.generate_examples(&req.words, &req.context_words).await?;
		let mut words = req.words;

		for (word, examples) in words.iter_mut().zip(generated) {
			if let Some(examples) = examples {
				word.examples = examples;
			}
		}

		Ok(words)
	}

	/// Generates one new sentence for `word`, avoiding its existing examples.
	pub async fn generate_single_example(
		&self,
		req: SingleExampleRequest,
	) -> Result<SingleExampleResponse> {
		let word = req.word.trim();

		if word.is_empty() {
			return Err(Error::InvalidRequest { message: "word is required.".to_string() });
		}

		let context = prompt::sample_context(
			&req.context_words,
			&[word],
			self.cfg.generation.max_context_words as usize,
		);
		let prompt = prompt::single_example_prompt(
			detect_language(word),
			word,
			&req.existing_examples,
			&context,
		);
		let call =
			GenerationCall { prompt: &prompt, schema_name: "single_example", response_schema: None };
		let raw = self.providers.generator.complete(&self.cfg.providers.generator, &call).await?;
		let example = text::strip_wrapping_quotes(text::strip_code_fence(&raw)).trim();

		if example.is_empty() {
			return Err(Error::Generation {
				message: "Generator returned an empty sentence.".to_string(),
			});
		}

		Ok(SingleExampleResponse { example: example.to_string() })
	}

	/// Returns generated examples aligned with `words`; `None` where the response had no entry.
	async fn generate_examples(
		&self,
		words: &[WordEntry],
		context_words: &[String],
	) -> Result<Vec<Option<Vec<Example>>>> {
		let mut out = vec![None; words.len()];

		for language in Language::ALL {
			let indices: Vec<usize> = words
				.iter()
				.enumerate()
				.filter(|(_, word)| word.resolved_language() == language)
				.map(|(idx, _)| idx)
				.collect();

			if indices.is_empty() {
				continue;
			}

			let texts: Vec<&str> = indices.iter().map(|&idx| words[idx].text.as_str()).collect();
			let context = prompt::sample_context(
				context_words,
				&texts,
				self.cfg.generation.max_context_words as usize,
			);
			let generated = self.generate_group(language, &texts, &context).await?;

			for idx in indices {
				out[idx] = generated.get(words[idx].text.as_str()).cloned();
			}
		}

		Ok(out)
	}

	async fn generate_group(
		&self,
		language: Language,
		texts: &[&str],
		context: &[String],
	) -> Result<HashMap<String, Vec<Example>>> {
		let examples_per_word = self.cfg.generation.examples_per_word;
		let prompt = prompt::batch_prompt(language, texts, context, examples_per_word);
		let schema = prompt::examples_schema();
		let call = GenerationCall {
			prompt: &prompt,
			schema_name: prompt::EXAMPLES_SCHEMA_NAME,
			response_schema: Some(&schema),
		};
		let started = std::time::Instant::now();
		let raw = self.providers.generator.complete(&self.cfg.providers.generator, &call).await?;

		tracing::debug!(
			language = %language,
			words = texts.len(),
			elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
			"Generator call finished."
		);

		parse_generated(&raw, examples_per_word as usize)
	}
}

/// Parses a provider response into examples keyed by word text.
///
/// Sentences are trimmed, stripped of wrapping quotes, blank ones are dropped, and each word
/// keeps at most `examples_per_word`. The first entry wins when a word appears twice.
pub fn parse_generated(raw: &str, examples_per_word: usize) -> Result<HashMap<String, Vec<Example>>> {
	let body = text::extract_json_array(raw);
	let parsed: Vec<GeneratedWord> = serde_json::from_str(body).map_err(|err| Error::Generation {
		message: format!("Generator response is not a valid example array: {err}"),
	})?;
	let mut out = HashMap::new();

	for entry in parsed {
		let examples: Vec<Example> = entry
			.examples
			.iter()
			.map(|example| text::strip_wrapping_quotes(example.chinese.trim()).trim())
			.filter(|sentence| !sentence.is_empty())
			.take(examples_per_word)
			.map(Example::generated)
			.collect();

		out.entry(entry.character).or_insert(examples);
	}

	Ok(out)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parse_generated_strips_fence_and_quotes() {
		let raw = "```json\n[{\"character\":\"apple\",\"examples\":[{\"chinese\":\"\\\"I eat an apple.\\\"\"},{\"chinese\":\"  \"}]}]\n```";
		let parsed = parse_generated(raw, 3).expect("Expected parse to succeed.");

		assert_eq!(parsed["apple"], vec![Example::generated("I eat an apple.")]);
	}

	#[test]
	fn parse_generated_keeps_quoted_speech() {
		let raw = r#"[{"character":"你好","examples":[{"chinese":"他說：「你好。」"}]}]"#;
		let parsed = parse_generated(raw, 3).expect("Expected parse to succeed.");

		assert_eq!(parsed["你好"], vec![Example::generated("他說：「你好。」")]);
	}

	#[test]
	fn parse_generated_truncates_and_keeps_first_duplicate() {
		let raw = r#"[
			{"character":"貓","examples":[{"chinese":"一"},{"chinese":"二"},{"chinese":"三"},{"chinese":"四"}]},
			{"character":"貓","examples":[{"chinese":"五"}]}
		]"#;
		let parsed = parse_generated(raw, 3).expect("Expected parse to succeed.");
		let sentences: Vec<&str> =
			parsed["貓"].iter().map(|example| example.sentence.as_str()).collect();

		assert_eq!(sentences, vec!["一", "二", "三"]);
	}

	#[test]
	fn parse_generated_finds_array_inside_prose() {
		let raw = "Here you go: [{\"character\":\"sun\",\"examples\":[{\"chinese\":\"The sun is hot.\"}]}] Enjoy!";
		let parsed = parse_generated(raw, 3).expect("Expected parse to succeed.");

		assert_eq!(parsed["sun"].len(), 1);
	}

	#[test]
	fn parse_generated_rejects_non_arrays() {
		let err = parse_generated("{\"character\":\"sun\"}", 3).expect_err("Expected parse error.");

		assert!(matches!(err, Error::Generation { .. }));
	}

	#[test]
	fn word_entry_accepts_client_shape() {
		let entry: WordEntry = serde_json::from_value(serde_json::json!({
			"id": "w1",
			"text": "蘋果",
			"revisedCount": 4
		}))
		.expect("Expected word entry to parse.");

		assert_eq!(entry.word_id, "w1");
		assert_eq!(entry.resolved_language(), Language::Zh);
		assert_eq!(entry.extra.get("revisedCount"), Some(&serde_json::json!(4)));
	}
}
