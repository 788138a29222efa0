/*!
 * In-process implementation of the transform stages.
 *
 * English and Chinese are told apart per line: a line containing at least
 * one CJK ideograph is Chinese, anything else is English. Input must be
 * UTF-8; other encodings are left to the external backend.
 */

use async_trait::async_trait;
use log::debug;

use crate::errors::TransformError;
use crate::subtitle_processor::{SubtitleCollection, SubtitleEntry};

use super::{StageName, TransformStage, WrapOptions};

/// Radius, in characters, searched around an ideal break position
const BREAK_SEARCH_RADIUS: usize = 3;

/// Native transform backend
#[derive(Debug, Default, Clone)]
pub struct NativeTransforms;

impl NativeTransforms {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TransformStage for NativeTransforms {
    async fn merge_bilingual(&self, content: &[u8]) -> Result<Vec<u8>, TransformError> {
        let collection = parse_non_empty(StageName::MergeBilingual, content)?;
        Ok(merge_bilingual(&collection).to_srt_string().into_bytes())
    }

    async fn extract_primary_language(&self, content: &[u8]) -> Result<Vec<u8>, TransformError> {
        let collection = parse_non_empty(StageName::ExtractPrimaryLanguage, content)?;
        Ok(extract_primary_language(&collection).to_srt_string().into_bytes())
    }

    async fn wrap_lines(&self, content: &[u8], options: WrapOptions) -> Result<Vec<u8>, TransformError> {
        // Extraction may legitimately leave nothing to wrap
        let content = decode(StageName::WrapLines, content)?;
        let collection = SubtitleCollection::parse_srt_string(content);
        Ok(wrap_lines(&collection, options).to_srt_string().into_bytes())
    }
}

fn decode(stage: StageName, content: &[u8]) -> Result<&str, TransformError> {
    std::str::from_utf8(content).map_err(|e| {
        TransformError::stage_failed(stage, format!("input is not valid UTF-8 ({})", e))
    })
}

fn parse_non_empty(stage: StageName, content: &[u8]) -> Result<SubtitleCollection, TransformError> {
    let content = decode(stage, content)?;
    let collection = SubtitleCollection::parse_srt_string(content);
    if collection.is_empty() && !content.trim().is_empty() {
        return Err(TransformError::stage_failed(stage, "input contains no parsable subtitle records"));
    }
    debug!("{}: {} input records", stage, collection.len());
    Ok(collection)
}

/// Whether a character is a CJK ideograph
pub fn is_cjk(c: char) -> bool {
    matches!(c as u32,
        0x3400..=0x4DBF
        | 0x4E00..=0x9FFF
        | 0xF900..=0xFAFF
        | 0x20000..=0x2A6DF
        | 0x2A700..=0x2EBEF)
}

pub fn is_chinese_line(line: &str) -> bool {
    line.chars().any(is_cjk)
}

/// Fold records sharing a time range and order English lines before Chinese
pub fn merge_bilingual(collection: &SubtitleCollection) -> SubtitleCollection {
    let mut merged: Vec<SubtitleEntry> = Vec::with_capacity(collection.len());

    for entry in &collection.entries {
        match merged.last_mut() {
            Some(last) if last.same_time_range(entry) => last.lines.extend(entry.lines.iter().cloned()),
            _ => merged.push(entry.clone()),
        }
    }

    for entry in &mut merged {
        let (english, chinese): (Vec<String>, Vec<String>) =
            entry.lines.drain(..).partition(|line| !is_chinese_line(line));
        entry.lines = english;
        entry.lines.extend(chinese);
    }

    let mut result = SubtitleCollection::new(merged);
    result.renumber();
    result
}

/// Keep only Chinese text, one logical line per record
pub fn extract_primary_language(collection: &SubtitleCollection) -> SubtitleCollection {
    let entries = collection
        .entries
        .iter()
        .filter_map(|entry| {
            let chinese: Vec<&str> = entry
                .lines
                .iter()
                .map(String::as_str)
                .filter(|line| is_chinese_line(line))
                .collect();

            if chinese.is_empty() {
                return None;
            }

            Some(SubtitleEntry::new(
                entry.seq_num,
                entry.start_time_ms,
                entry.end_time_ms,
                vec![chinese.join(" ")],
            ))
        })
        .collect();

    let mut result = SubtitleCollection::new(entries);
    result.renumber();
    result
}

/// Re-flow every line of every record
pub fn wrap_lines(collection: &SubtitleCollection, options: WrapOptions) -> SubtitleCollection {
    let entries = collection
        .entries
        .iter()
        .map(|entry| {
            let lines = entry.lines.iter().flat_map(|line| wrap_line(line, options)).collect();
            SubtitleEntry::new(entry.seq_num, entry.start_time_ms, entry.end_time_ms, lines)
        })
        .collect();

    SubtitleCollection::new(entries)
}

fn is_open_bracket(c: char) -> bool {
    matches!(c, '(' | '（' | '[' | '【')
}

fn is_close_bracket(c: char) -> bool {
    matches!(c, ')' | '）' | ']' | '】')
}

fn is_break_punctuation(c: char) -> bool {
    matches!(c, '，' | '。' | '、' | '！' | '？' | '；' | '：' | '…' | ',' | '.' | '!' | '?' | ';' | ':')
}

/// Per-character effective widths, inflated inside brackets
pub fn char_weights(line: &str, bracket_factor: usize) -> Vec<usize> {
    let mut depth = 0usize;

    line.chars()
        .map(|c| {
            if is_open_bracket(c) {
                depth += 1;
            }
            let weight = if depth > 0 { bracket_factor } else { 1 };
            if is_close_bracket(c) {
                depth = depth.saturating_sub(1);
            }
            weight
        })
        .collect()
}

/// Effective width of a line, saturating at `usize::MAX`
pub fn effective_width(line: &str, bracket_factor: usize) -> usize {
    char_weights(line, bracket_factor)
        .iter()
        .fold(0usize, |acc, w| acc.saturating_add(*w))
}

/// Split one line into balanced pieces no wider than needed
pub fn wrap_line(line: &str, options: WrapOptions) -> Vec<String> {
    let chars: Vec<char> = line.chars().collect();
    let weights = char_weights(line, options.bracket_factor);
    let total = effective_width(line, options.bracket_factor);

    if options.threshold == 0 || total <= options.threshold || chars.len() < 2 {
        return vec![line.to_string()];
    }

    // Never more pieces than characters, however wide they are
    let pieces = total.div_ceil(options.threshold).min(chars.len());

    // prefix[i] = width of chars[..i]
    let mut prefix = Vec::with_capacity(chars.len() + 1);
    prefix.push(0);
    for w in &weights {
        prefix.push(prefix.last().copied().unwrap_or(0usize).saturating_add(*w));
    }

    let mut breaks = Vec::with_capacity(pieces);
    let mut last_break = 0;
    for k in 1..pieces {
        let target = (total as u128 * k as u128 / pieces as u128) as usize;
        let ideal = (1..chars.len()).find(|&i| prefix[i] >= target).unwrap_or(chars.len() - 1);
        let lo = last_break + 1;
        let hi = chars.len() - 1;
        if lo > hi {
            break;
        }
        let ideal = ideal.clamp(lo, hi);
        let chosen = preferred_break(&chars, ideal, lo, hi).unwrap_or(ideal);
        breaks.push(chosen);
        last_break = chosen;
    }

    let mut result = Vec::with_capacity(breaks.len() + 1);
    let mut start = 0;
    for end in breaks.into_iter().chain(std::iter::once(chars.len())) {
        let piece: String = chars[start..end].iter().collect();
        let piece = piece.trim();
        if !piece.is_empty() {
            result.push(piece.to_string());
        }
        start = end;
    }

    result
}

/// Closest natural break position to `ideal` within the search radius
fn preferred_break(chars: &[char], ideal: usize, lo: usize, hi: usize) -> Option<usize> {
    let is_natural = |pos: usize| {
        chars[pos].is_whitespace() || chars[pos - 1].is_whitespace() || is_break_punctuation(chars[pos - 1])
    };

    for offset in 0..=BREAK_SEARCH_RADIUS {
        let candidates = [ideal.checked_sub(offset), ideal.checked_add(offset)];
        for pos in candidates.into_iter().flatten() {
            if (lo..=hi).contains(&pos) && is_natural(pos) {
                return Some(pos);
            }
        }
    }

    None
}
