//! Prompt construction and response parsing
//!
//! Prompts depend only on the state's content, so the same state always
//! produces the same prompt text.

use arbiter_model::{Analysis, DecisionOption, EntityError, CONFIDENCE_MAX, CONFIDENCE_MIN};
use std::fmt::Write as _;

/// Prompt asking for a structured pros/cons analysis of one option
#[must_use]
pub fn analysis_prompt(query: &str, position: usize, option: &DecisionOption) -> String {
    let mut prompt = String::new();
    let _ = writeln!(prompt, "Analyze the following option and provide pros and cons.");
    let _ = writeln!(prompt);
    let _ = writeln!(prompt, "Decision question: {query}");
    let _ = writeln!(prompt);
    let _ = writeln!(prompt, "Option {position}: {}", option.title());
    if !option.description().trim().is_empty() {
        let _ = writeln!(prompt, "{}", option.description().trim());
    }
    let extra: Vec<_> = option
        .data()
        .iter()
        .filter(|(key, _)| !matches!(key.as_str(), "id" | "title" | "name"))
        .collect();
    if !extra.is_empty() {
        let _ = writeln!(prompt);
        let _ = writeln!(prompt, "Details:");
        for (key, value) in extra {
            match value.as_str() {
                Some(text) => {
                    let _ = writeln!(prompt, "- {key}: {text}");
                }
                None => {
                    let _ = writeln!(prompt, "- {key}: {value}");
                }
            }
        }
    }
    prompt.push_str(
        "\nRespond using exactly these sections:\n\
         PROS:\n- <one advantage per line>\n\
         CONS:\n- <one disadvantage per line>\n\
         SUMMARY: <one or two sentences>\n\
         CONFIDENCE: <number from 0 to 10>\n",
    );
    prompt
}

/// Prompt asking for the final recommendation over ranked options
///
/// `ranked` pairs each option with its analysis and score, best first.
#[must_use]
pub fn decision_prompt(query: &str, ranked: &[(&DecisionOption, &Analysis, f64)]) -> String {
    let mut prompt = String::new();
    let _ = writeln!(
        prompt,
        "Based on the analysis below, recommend the best option for the question and explain why."
    );
    let _ = writeln!(prompt);
    let _ = writeln!(prompt, "Decision question: {query}");
    for (i, (option, analysis, score)) in ranked.iter().enumerate() {
        let _ = writeln!(prompt);
        let _ = writeln!(prompt, "{}. {} (score {score:.2})", i + 1, option.title());
        let _ = writeln!(prompt, "Summary: {}", analysis.summary());
        if !analysis.pros().is_empty() {
            let _ = writeln!(prompt, "Pros: {}", analysis.pros().join("; "));
        }
        if !analysis.cons().is_empty() {
            let _ = writeln!(prompt, "Cons: {}", analysis.cons().join("; "));
        }
    }
    let _ = writeln!(prompt);
    let _ = writeln!(
        prompt,
        "Answer in a short paragraph naming the recommended option first."
    );
    prompt
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Section {
    Preamble,
    Pros,
    Cons,
    Summary,
    Confidence,
}

fn section_header(line: &str) -> Option<(Section, &str)> {
    let trimmed = line.trim().trim_start_matches(['#', '*']).trim_start();
    let (head, rest) = trimmed.split_once(':')?;
    let section = match head.trim().trim_end_matches('*').to_ascii_uppercase().as_str() {
        "PROS" => Section::Pros,
        "CONS" => Section::Cons,
        "SUMMARY" => Section::Summary,
        "CONFIDENCE" => Section::Confidence,
        _ => return None,
    };
    Some((section, rest.trim().trim_start_matches('*').trim()))
}

fn strip_bullet(line: &str) -> &str {
    let line = line.trim();
    for marker in ["- ", "* ", "• "] {
        if let Some(rest) = line.strip_prefix(marker) {
            return rest.trim();
        }
    }
    let digits = line.chars().take_while(char::is_ascii_digit).count();
    if digits > 0 {
        let rest = &line[digits..];
        if let Some(rest) = rest.strip_prefix('.').or_else(|| rest.strip_prefix(')')) {
            return rest.trim();
        }
    }
    line
}

fn first_number(text: &str) -> Option<f64> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let tail = &text[start..];
    let end = tail
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(tail.len());
    tail[..end].trim_end_matches('.').parse().ok()
}

/// Turn a free-text response into an [`Analysis`]
///
/// Lenient about layout: section headers are case-insensitive and may carry
/// markdown emphasis, items may use `-`, `*`, `•` or numbered bullets. A
/// missing summary falls back to the whole response; a missing confidence
/// falls back to `default_confidence`. Confidence is clamped to `[0, 10]`.
///
/// # Errors
/// Returns [`EntityError`] if the response is blank or `option_id` is blank
pub fn parse_analysis(
    option_id: &str,
    response: &str,
    default_confidence: f64,
) -> Result<Analysis, EntityError> {
    let mut section = Section::Preamble;
    let mut pros = Vec::new();
    let mut cons = Vec::new();
    let mut summary: Vec<&str> = Vec::new();
    let mut confidence = None;

    for line in response.lines() {
        let (current, text) = match section_header(line) {
            Some((header, rest)) => {
                section = header;
                (header, rest)
            }
            None => (section, line.trim()),
        };
        if text.is_empty() {
            continue;
        }
        match current {
            Section::Preamble => {}
            Section::Pros => pros.push(strip_bullet(text).to_string()),
            Section::Cons => cons.push(strip_bullet(text).to_string()),
            Section::Summary => summary.push(text),
            Section::Confidence => {
                if confidence.is_none() {
                    confidence = first_number(text);
                }
            }
        }
    }

    pros.retain(|p| !p.is_empty());
    cons.retain(|c| !c.is_empty());
    let summary = if summary.is_empty() {
        response.trim().to_string()
    } else {
        summary.join(" ")
    };
    let confidence = confidence
        .unwrap_or(default_confidence)
        .clamp(CONFIDENCE_MIN, CONFIDENCE_MAX);

    Analysis::new(option_id, pros, cons, summary, confidence)
}
