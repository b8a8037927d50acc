//! Runtime options and the optional on-disk configuration file.
//!
//! `General` is the per-document display state; the same struct doubles as
//! the serialized shape of `~/.config/peruse/config.json` so a partial file
//! overrides only the fields it names.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Per-document display options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct General {
    /// Tab stop interval.
    pub tab_width: usize,
    /// Number of frozen header lines.
    pub header: isize,
    /// Lines to skip before the header.
    pub skip_lines: isize,
    /// Wrap long lines instead of scrolling horizontally.
    pub wrap_mode: bool,
    /// Show the line-number gutter.
    pub line_num_mode: bool,
    /// Strip original escape-sequence styling.
    pub plain_mode: bool,
    /// Column-cursor navigation.
    pub column_mode: bool,
    /// Columns come from guessed widths instead of a delimiter.
    pub column_width: bool,
    /// Shade each column with a rotating palette.
    pub column_rainbow: bool,
    /// Shade odd rows.
    pub alternate_rows: bool,
    /// Tail the input.
    pub follow_mode: bool,
    /// Column delimiter; `/re/` makes it a regular expression.
    pub column_delimiter: String,
    /// Section delimiter regular expression.
    pub section_delimiter: String,
    /// Pin the enclosing section header above the body.
    pub section_header: bool,
    /// Rows the section header occupies.
    pub section_header_num: isize,
    /// Offset between the delimiter line and the section start.
    pub section_start_position: isize,
    /// Words highlighted with rotating colors.
    pub multi_color_words: Vec<String>,
    /// Columns painted on marked lines.
    pub mark_style_width: usize,
    /// Row the search target lands on after a jump, 0 for top.
    pub jump_target: isize,
}

impl Default for General {
    fn default() -> Self {
        General {
            tab_width: 8,
            header: 0,
            skip_lines: 0,
            wrap_mode: true,
            line_num_mode: false,
            plain_mode: false,
            column_mode: false,
            column_width: false,
            column_rainbow: false,
            alternate_rows: false,
            follow_mode: false,
            column_delimiter: String::new(),
            section_delimiter: String::new(),
            section_header: false,
            section_header_num: 1,
            section_start_position: 0,
            multi_color_words: Vec::new(),
            mark_style_width: 1,
            jump_target: 0,
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    pub general: General,
    /// Maximum resident chunks per document.
    pub memory_limit: Option<usize>,
    /// Case-sensitive search by default.
    pub case_sensitive: bool,
    /// Case-insensitive unless the pattern contains an upper-case letter.
    pub smart_case: bool,
    /// Treat search patterns as regular expressions.
    pub regex_search: bool,
}

impl Config {
    /// Load from a JSON file; a missing file yields the defaults.
    pub fn load(path: &Path) -> anyhow::Result<Config> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Default config file location.
    pub fn default_path() -> Option<PathBuf> {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("peruse").join("config.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let g = General::default();
        assert_eq!(g.tab_width, 8);
        assert!(g.wrap_mode);
        assert_eq!(g.section_header_num, 1);
        assert_eq!(g.mark_style_width, 1);
    }

    #[test]
    fn test_partial_config_overrides() {
        let config: Config =
            serde_json::from_str(r#"{"general": {"tabWidth": 4}, "smartCase": true}"#).unwrap();
        assert_eq!(config.general.tab_width, 4);
        assert!(config.smart_case);
        // Unnamed fields keep their defaults.
        assert!(config.general.wrap_mode);
        assert!(!config.case_sensitive);
    }

    #[test]
    fn test_load_missing_file_is_default() {
        let config = Config::load(Path::new("/nonexistent/peruse.json")).unwrap();
        assert_eq!(config.general.tab_width, 8);
    }
}
