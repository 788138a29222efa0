use std::fmt;
use regex::Regex;
use once_cell::sync::Lazy;
use anyhow::{Result, Context, anyhow};
use log::{warn, debug};

// @module: Subtitle parsing and serialization

// @const: SRT timing line regex
static TIMESTAMP_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{2}:\d{2}:\d{2}[,.]\d{3})\s*-->\s*(\d{2}:\d{2}:\d{2}[,.]\d{3})").unwrap()
});

// @struct: Single subtitle entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleEntry {
    // @field: Sequence number
    pub seq_num: usize,

    // @field: Start time in ms
    pub start_time_ms: u64,

    // @field: End time in ms
    pub end_time_ms: u64,

    // @field: Subtitle text lines
    pub lines: Vec<String>,
}

impl SubtitleEntry {
    pub fn new(seq_num: usize, start_time_ms: u64, end_time_ms: u64, lines: Vec<String>) -> Self {
        SubtitleEntry {
            seq_num,
            start_time_ms,
            end_time_ms,
            lines,
        }
    }

    /// Parse an SRT timestamp to milliseconds
    pub fn parse_timestamp(timestamp: &str) -> Result<u64> {
        // Parse HH:MM:SS,mmm format
        let parts: Vec<&str> = timestamp.split(&[':', ',', '.'][..]).collect();

        if parts.len() != 4 {
            return Err(anyhow!("Invalid timestamp format: {}", timestamp));
        }

        let hours: u64 = parts[0].parse().context("Failed to parse hours")?;
        let minutes: u64 = parts[1].parse().context("Failed to parse minutes")?;
        let seconds: u64 = parts[2].parse().context("Failed to parse seconds")?;
        let millis: u64 = parts[3].parse().context("Failed to parse milliseconds")?;

        if minutes >= 60 || seconds >= 60 || millis >= 1000 {
            return Err(anyhow!("Invalid time components in timestamp: {}", timestamp));
        }

        Ok(hours * 3_600_000 + minutes * 60_000 + seconds * 1_000 + millis)
    }

    /// Format a timestamp in milliseconds to SRT format (HH:MM:SS,mmm)
    pub fn format_timestamp(ms: u64) -> String {
        let hours = ms / 3_600_000;
        let minutes = (ms % 3_600_000) / 60_000;
        let seconds = (ms % 60_000) / 1_000;
        let millis = ms % 1_000;

        format!("{:02}:{:02}:{:02},{:03}", hours, minutes, seconds, millis)
    }

    /// Whether two entries cover exactly the same time range
    pub fn same_time_range(&self, other: &SubtitleEntry) -> bool {
        self.start_time_ms == other.start_time_ms && self.end_time_ms == other.end_time_ms
    }
}

impl fmt::Display for SubtitleEntry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{}", self.seq_num)?;
        writeln!(
            f,
            "{} --> {}",
            Self::format_timestamp(self.start_time_ms),
            Self::format_timestamp(self.end_time_ms)
        )?;
        for line in &self.lines {
            writeln!(f, "{}", line)?;
        }
        writeln!(f)
    }
}

/// Ordered collection of subtitle entries
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubtitleCollection {
    /// List of subtitle entries
    pub entries: Vec<SubtitleEntry>,
}

impl SubtitleCollection {
    pub fn new(entries: Vec<SubtitleEntry>) -> Self {
        SubtitleCollection { entries }
    }

    /// Parse SRT format string into a collection.
    ///
    /// Parsing is lenient: malformed blocks are skipped with a warning and
    /// source order is preserved. Timing is not validated.
    pub fn parse_srt_string(content: &str) -> Self {
        let content = content.strip_prefix('\u{feff}').unwrap_or(content);
        let mut entries = Vec::new();

        let mut current_seq_num: Option<usize> = None;
        let mut current_times: Option<(u64, u64)> = None;
        let mut current_lines: Vec<String> = Vec::new();

        let mut finish = |seq_num: Option<usize>, times: Option<(u64, u64)>, lines: &mut Vec<String>| {
            if let (Some(seq_num), Some((start_ms, end_ms))) = (seq_num, times) {
                if lines.is_empty() {
                    debug!("Skipping empty subtitle entry {}", seq_num);
                } else {
                    entries.push(SubtitleEntry::new(seq_num, start_ms, end_ms, std::mem::take(lines)));
                }
            }
            lines.clear();
        };

        for (line_no, line) in content.lines().enumerate() {
            let trimmed = line.trim();

            if trimmed.is_empty() {
                if current_times.is_some() {
                    finish(current_seq_num.take(), current_times.take(), &mut current_lines);
                }
                continue;
            }

            if current_seq_num.is_none() {
                match trimmed.parse::<usize>() {
                    Ok(num) => current_seq_num = Some(num),
                    Err(_) => warn!("Unexpected text at line {} before sequence number: {}", line_no + 1, trimmed),
                }
                continue;
            }

            if current_times.is_none() {
                match Self::parse_timing(trimmed) {
                    Ok(times) => current_times = Some(times),
                    Err(e) => {
                        warn!("Invalid timestamp line {}: {}", line_no + 1, e);
                        current_seq_num = None;
                    }
                }
                continue;
            }

            current_lines.push(trimmed.to_string());
        }

        finish(current_seq_num, current_times, &mut current_lines);

        SubtitleCollection { entries }
    }

    /// Renumber entries sequentially starting at 1
    pub fn renumber(&mut self) {
        for (i, entry) in self.entries.iter_mut().enumerate() {
            entry.seq_num = i + 1;
        }
    }

    /// Serialize to SRT text with LF line endings
    pub fn to_srt_string(&self) -> String {
        self.entries.iter().map(|entry| entry.to_string()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Parse a `start --> end` timing line into milliseconds
    fn parse_timing(line: &str) -> Result<(u64, u64)> {
        let caps = TIMESTAMP_REGEX
            .captures(line)
            .ok_or_else(|| anyhow!("Not a timing line: {}", line))?;

        let start = SubtitleEntry::parse_timestamp(&caps[1])?;
        let end = SubtitleEntry::parse_timestamp(&caps[2])?;
        Ok((start, end))
    }
}
