//! Recognizing "prompt too large" failures in provider error text.
//!
//! OpenAI-compatible servers (OpenAI itself, vLLM, llama.cpp, LM Studio,
//! OpenRouter, Groq) all report an oversized prompt differently. Tellers run
//! their error bodies through [`is_context_overflow`] so the story layer sees
//! a single [`Error::ContextTooLarge`](crate::Error::ContextTooLarge).

use std::sync::LazyLock;

use regex::Regex;

static OVERFLOW_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)context.?length.?exceed",
        r"(?i)maximum.?context.?length",
        r"(?i)context.?window.?(exceed|full|limit)",
        r"(?i)too.?many.?tokens",
        r"(?i)prompt.?is.?too.?long",
        r"(?i)input.?too.?long",
        r"(?i)token.?limit.?(exceed|reach)",
        r"(?i)reduce.?the.?length",
        r"(?i)context_length_exceeded",
        r"(?i)max_tokens.*(exceed|limit|too|overflow)",
        r"(?i)sequence.?too.?long",
        r"(?i)context.?size.?exceed",
        r"(?i)n_ctx",
        r"\b413\b",
    ]
    .iter()
    .filter_map(|p| Regex::new(p).ok())
    .collect()
});

/// Check if provider error text describes an oversized prompt
pub fn is_context_overflow(error: &str) -> bool {
    OVERFLOW_PATTERNS.iter().any(|re| re.is_match(error))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openai_wording() {
        assert!(is_context_overflow(
            "This model's maximum context length is 4097 tokens. However, your messages resulted in 5012 tokens."
        ));
        assert!(is_context_overflow("context_length_exceeded"));
        assert!(is_context_overflow("Please reduce the length of the messages."));
    }

    #[test]
    fn test_local_server_wording() {
        assert!(is_context_overflow("the request exceeds the available context size exceeded"));
        assert!(is_context_overflow("n_ctx too small for prompt"));
        assert!(is_context_overflow("input sequence too long"));
    }

    #[test]
    fn test_payload_too_large_status() {
        assert!(is_context_overflow("HTTP 413 Payload Too Large"));
    }

    #[test]
    fn test_max_tokens_needs_overflow_language() {
        assert!(is_context_overflow("max_tokens exceeds the model limit"));
        assert!(!is_context_overflow("max_tokens must be a positive integer"));
    }

    #[test]
    fn test_unrelated_errors() {
        assert!(!is_context_overflow("401 Unauthorized"));
        assert!(!is_context_overflow("rate limit exceeded"));
        assert!(!is_context_overflow("internal server error 500"));
        assert!(!is_context_overflow("listening on port 14130"));
    }
}
