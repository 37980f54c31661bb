use std::sync::OnceLock;

use regex::Regex;

const QUOTE_PAIRS: [(char, char); 6] =
	[('"', '"'), ('\'', '\''), ('“', '”'), ('‘', '’'), ('「', '」'), ('『', '』')];

fn fenced_body(text: &str) -> Option<&str> {
	static FENCE: OnceLock<Option<Regex>> = OnceLock::new();

	let fence = FENCE
		.get_or_init(|| Regex::new(r"```(?:[A-Za-z]+)?\s*([\s\S]*?)\s*```").ok())
		.as_ref()?;

	fence.captures(text).and_then(|caps| caps.get(1)).map(|body| body.as_str().trim())
}

/// Returns the body of the first Markdown code fence, or the trimmed input when there is none.
pub fn strip_code_fence(raw: &str) -> &str {
	let trimmed = raw.trim();

	fenced_body(trimmed).unwrap_or(trimmed)
}

/// Extracts the JSON array payload from a model response.
///
/// A fenced block wins. Without a fence the outermost `[` ... `]` span is used, which drops any
/// prose the model wrapped around the array.
pub fn extract_json_array(raw: &str) -> &str {
	let trimmed = raw.trim();

	if let Some(body) = fenced_body(trimmed) {
		return body;
	}

	match (trimmed.find('['), trimmed.rfind(']')) {
		(Some(open), Some(close)) if close > open => &trimmed[open..=close],
		_ => trimmed,
	}
}

/// Trims whitespace and one layer of quotes wrapping the whole text.
///
/// The first and last characters must be a matching pair, and the quotes inside must stay
/// balanced once the pair is removed, so quoted speech at either end of a sentence survives.
pub fn strip_wrapping_quotes(raw: &str) -> &str {
	let trimmed = raw.trim();

	for (open, close) in QUOTE_PAIRS {
		let Some(inner) = trimmed.strip_prefix(open).and_then(|rest| rest.strip_suffix(close))
		else {
			continue;
		};

		if quotes_balanced(inner, open, close) {
			return inner.trim();
		}
	}

	trimmed
}

fn quotes_balanced(inner: &str, open: char, close: char) -> bool {
	if open == close {
		return !inner.contains(open);
	}

	let mut depth = 0_usize;

	for ch in inner.chars() {
		if ch == open {
			depth += 1;
		} else if ch == close {
			let Some(next) = depth.checked_sub(1) else {
				return false;
			};

			depth = next;
		}
	}

	depth == 0
}
