//! Command-line interface parsing for clara
//!
//! This module handles parsing of CLI arguments using clap and applying the
//! global flags on top of the loaded configuration.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use thiserror::Error;
use url::Url;

use crate::config::ClientConfig;
use crate::data::{MangaFilters, PublicationStatus};

/// Error types for CLI argument handling
#[derive(Debug, Error)]
pub enum CliError {
    /// The --base-url value is not an absolute http(s) URL
    #[error("Invalid base URL: '{0}'. Expected something like https://api.mangadex.org")]
    InvalidBaseUrl(String),
}

/// clara - browse MangaDex from the terminal
#[derive(Parser, Debug)]
#[command(name = "clara")]
#[command(about = "Browse the MangaDex catalog from the terminal")]
#[command(version)]
pub struct Cli {
    /// Path to a JSON config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Print results as pretty JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Log requests, cache hits and retries to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Override the API root
    #[arg(long, global = true, value_name = "URL")]
    pub base_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Latest updated series
    Latest {
        #[arg(long, default_value_t = 1)]
        page: u32,
    },

    /// Search series by title
    Search {
        query: String,
        #[arg(long, default_value_t = 1)]
        page: u32,
    },

    /// Browse series with filters
    List {
        #[arg(long, default_value_t = 1)]
        page: u32,
        /// Tag id to include; repeat for several
        #[arg(long = "tag", value_name = "TAG_ID")]
        tags: Vec<String>,
        /// ongoing, completed, hiatus or cancelled
        #[arg(long)]
        status: Option<PublicationStatus>,
    },

    /// Series details and chapter list
    Detail { id: String },

    /// Page image URLs of a chapter
    ///
    /// With --manga, the chapter is also recorded in the reading history.
    Chapter {
        id: String,
        #[arg(long, value_name = "MANGA_ID")]
        manga: Option<String>,
    },

    /// Top rated series
    Trending,

    /// Most followed series
    Popular,

    /// Latest updates and trending series
    Home,

    /// Check that the API is reachable
    Health,

    /// List bookmarked series
    Bookmarks,

    /// Bookmark a series
    Bookmark { id: String },

    /// Remove a bookmark
    Unbookmark { id: String },

    /// Recently read chapters
    History,

    /// Show or save reading progress for a series
    Progress {
        manga_id: String,
        #[arg(long, requires = "page")]
        chapter: Option<String>,
        #[arg(long, requires = "chapter")]
        page: Option<u32>,
    },
}

impl Command {
    /// List filters for the `list` command
    pub fn filters(&self) -> Option<MangaFilters> {
        match self {
            Command::List { tags, status, .. } => Some(MangaFilters {
                tags: tags.clone(),
                status: *status,
                search: None,
            }),
            _ => None,
        }
    }
}

/// Validates a base URL given on the command line, dropping any trailing slash
pub fn parse_base_url(s: &str) -> Result<String, CliError> {
    match Url::parse(s) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => {
            Ok(s.trim_end_matches('/').to_string())
        }
        _ => Err(CliError::InvalidBaseUrl(s.to_string())),
    }
}

impl Cli {
    /// Applies global flags that override configuration values
    pub fn apply_overrides(&self, config: &mut ClientConfig) -> Result<(), CliError> {
        if let Some(base_url) = &self.base_url {
            config.base_url = parse_base_url(base_url)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_base_url_accepts_https() {
        assert_eq!(
            parse_base_url("https://api.example.org/").unwrap(),
            "https://api.example.org"
        );
        assert_eq!(
            parse_base_url("http://127.0.0.1:8080").unwrap(),
            "http://127.0.0.1:8080"
        );
    }

    #[test]
    fn test_parse_base_url_invalid() {
        for bad in ["not a url", "ftp://example.org", "api.mangadex.org"] {
            let err = parse_base_url(bad).unwrap_err();
            assert!(err.to_string().contains("Invalid base URL"));
        }
    }

    #[test]
    fn test_cli_parse_latest_default_page() {
        let cli = Cli::parse_from(["clara", "latest"]);
        assert_eq!(cli.command, Command::Latest { page: 1 });
        assert!(!cli.json);
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_cli_parse_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["clara", "search", "one piece", "--page", "2", "--json", "-v"]);
        assert_eq!(
            cli.command,
            Command::Search {
                query: "one piece".to_string(),
                page: 2
            }
        );
        assert!(cli.json);
        assert!(cli.verbose);
    }

    #[test]
    fn test_cli_parse_list_filters() {
        let cli = Cli::parse_from([
            "clara", "list", "--tag", "t1", "--tag", "t2", "--status", "completed",
        ]);
        let filters = cli.command.filters().unwrap();
        assert_eq!(filters.tags, vec!["t1".to_string(), "t2".to_string()]);
        assert_eq!(filters.status, Some(PublicationStatus::Completed));
        assert!(filters.search.is_none());
    }

    #[test]
    fn test_cli_rejects_unknown_status() {
        let result = Cli::try_parse_from(["clara", "list", "--status", "finished"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_progress_requires_both_chapter_and_page() {
        assert!(Cli::try_parse_from(["clara", "progress", "m1", "--chapter", "c1"]).is_err());
        assert!(Cli::try_parse_from(["clara", "progress", "m1", "--page", "3"]).is_err());

        let cli = Cli::parse_from(["clara", "progress", "m1", "--chapter", "c1", "--page", "3"]);
        assert_eq!(
            cli.command,
            Command::Progress {
                manga_id: "m1".to_string(),
                chapter: Some("c1".to_string()),
                page: Some(3)
            }
        );
    }

    #[test]
    fn test_cli_requires_subcommand() {
        assert!(Cli::try_parse_from(["clara"]).is_err());
    }

    #[test]
    fn test_apply_overrides_base_url() {
        let cli = Cli::parse_from(["clara", "--base-url", "http://localhost:9000/", "health"]);
        let mut config = ClientConfig::default();
        cli.apply_overrides(&mut config).unwrap();
        assert_eq!(config.base_url, "http://localhost:9000");
    }

    #[test]
    fn test_apply_overrides_without_flags_keeps_config() {
        let cli = Cli::parse_from(["clara", "home"]);
        let mut config = ClientConfig::default();
        cli.apply_overrides(&mut config).unwrap();
        assert_eq!(config, ClientConfig::default());
    }

    #[test]
    fn test_filters_only_for_list() {
        let cli = Cli::parse_from(["clara", "trending"]);
        assert!(cli.command.filters().is_none());
    }
}
