//! Prompt text and response schema for the generative text service.

use std::collections::HashSet;

use rand::{Rng, seq::SliceRandom};
use serde_json::Value;

use wf_domain::Language;

pub const EXAMPLES_SCHEMA_NAME: &str = "word_examples";

/// Builds the batch prompt for one language group.
pub fn batch_prompt(
	language: Language,
	words: &[&str],
	context_words: &[String],
	examples_per_word: u32,
) -> String {
	let targets = serde_json::to_string(words).unwrap_or_default();
	let mut prompt = format!(
		"Write example sentences for a young learner's flashcards.\n\nTarget words ({}):\n{targets}\n",
		language_name(language),
	);

	if !context_words.is_empty() {
		prompt.push_str(&format!(
			"\nKnown vocabulary. Reuse these words in the sentences where it feels natural:\n{}\n",
			context_words.join(", "),
		));
	}

	prompt.push_str(&format!(
		"\nRules:\n\
- The reader is a primary school pupil aged 6 to 7.\n\
- Write exactly {examples_per_word} different sentences for every target word, and use the target word in each one.\n\
- Keep every sentence short, simple, and about everyday life.\n\
- {}\n\
- Answer with a JSON array. Each element has \"character\" set to the target word exactly as given and \"examples\" set to a list of objects whose \"chinese\" field holds one sentence.\n",
		register_rule(language),
	));

	prompt
}

/// Builds the prompt for one additional example sentence.
pub fn single_example_prompt(
	language: Language,
	word: &str,
	existing_examples: &[String],
	context_words: &[String],
) -> String {
	let mut prompt = format!(
		"Write ONE new {} example sentence for the word \"{word}\" for a young learner's flashcard.\n",
		language_name(language),
	);

	if !existing_examples.is_empty() {
		prompt.push_str("\nExisting sentences. Do not repeat them:\n");

		for example in existing_examples {
			prompt.push_str(&format!("- {example}\n"));
		}
	}
	if !context_words.is_empty() {
		prompt.push_str(&format!(
			"\nKnown vocabulary. Reuse some of these words if it feels natural:\n{}\n",
			context_words.join(", "),
		));
	}

	prompt.push_str(&format!(
		"\nRules:\n\
- The reader is a primary school pupil aged 6 to 7.\n\
- Keep the sentence short, between 5 and 10 words.\n\
- {}\n\
- Reply with the sentence only. No JSON, no romanization, no translation.\n",
		register_rule(language),
	));

	prompt
}

/// JSON schema for `[{ character, examples: [{ chinese }] }]`.
pub fn examples_schema() -> Value {
	serde_json::json!({
		"type": "array",
		"items": {
			"type": "object",
			"properties": {
				"character": { "type": "string" },
				"examples": {
					"type": "array",
					"items": {
						"type": "object",
						"properties": { "chinese": { "type": "string" } },
						"required": ["chinese"],
						"additionalProperties": false
					}
				}
			},
			"required": ["character", "examples"],
			"additionalProperties": false
		}
	})
}

/// Picks at most `max` distinct, non-blank context words at random, excluding the targets.
pub fn sample_context(context_words: &[String], targets: &[&str], max: usize) -> Vec<String> {
	sample_context_with(context_words, targets, max, &mut rand::thread_rng())
}

pub fn sample_context_with<R>(
	context_words: &[String],
	targets: &[&str],
	max: usize,
	rng: &mut R,
) -> Vec<String>
where
	R: Rng + ?Sized,
{
	let mut seen: HashSet<&str> = targets.iter().copied().collect();
	let mut pool = Vec::new();

	for word in context_words {
		let word = word.trim();

		if !word.is_empty() && seen.insert(word) {
			pool.push(word);
		}
	}

	pool.choose_multiple(rng, max).map(|word| word.to_string()).collect()
}

fn language_name(language: Language) -> &'static str {
	match language {
		Language::Zh => "Chinese",
		Language::En => "English",
	}
}

fn register_rule(language: Language) -> &'static str {
	match language {
		Language::Zh =>
			"Use Traditional Chinese in standard written register (書面語). Never use colloquial Cantonese (口語).",
		Language::En => "Use English only. Do not add Chinese translations.",
	}
}
