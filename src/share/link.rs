//! Share Links and Messages
//!
//! Turns an encoded challenge into a link and the human-readable text that
//! goes with it.

use serde::{Deserialize, Serialize};

use crate::share::codec::{Challenge, GAME_PARAM};

/// Where the token sits in the link.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkStyle {
    /// `https://host/path?game=<token>`
    #[default]
    Query,
    /// `https://host/path#/?game=<token>` for hash-routed shells.
    Fragment,
}

/// How challenge links are built.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShareConfig {
    /// Origin and path of the hosted game
    pub base_url: String,
    /// Token placement
    pub link_style: LinkStyle,
}

impl Default for ShareConfig {
    fn default() -> Self {
        Self {
            base_url: "https://hitta.app/".to_string(),
            link_style: LinkStyle::Query,
        }
    }
}

impl ShareConfig {
    /// Link carrying `token`.
    pub fn link(&self, token: &str) -> String {
        let base = self.base_url.split(['?', '#']).next().unwrap_or_default();
        match self.link_style {
            LinkStyle::Query => format!("{base}?{GAME_PARAM}={token}"),
            LinkStyle::Fragment => format!("{base}#/?{GAME_PARAM}={token}"),
        }
    }
}

/// Text handed to a messenger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareMessage {
    /// Short title (share-sheet subject)
    pub title: String,
    /// Full message body
    pub text: String,
    /// Link, if the message carries one
    pub url: Option<String>,
}

impl ShareMessage {
    /// Message inviting the peer to a challenge.
    pub fn challenge(challenge: &Challenge, link: String, round_seconds: u32) -> Self {
        let minutes = round_seconds.div_ceil(60);
        let unit = if minutes == 1 { "minute" } else { "minutes" };
        let text = format!(
            "🎯 Hitta! - {} challenges you!\n\nFind a {}!\n\nYou have {} {}!\n\nPlay here: {}",
            challenge.originator_name, challenge.target_label, minutes, unit, link
        );
        Self {
            title: "Hitta! - Game challenge".to_string(),
            text,
            url: Some(link),
        }
    }

    /// Message announcing a found object.
    pub fn score(player_name: &str, score: u32, found_label: &str) -> Self {
        Self {
            title: "Hitta! - Score update".to_string(),
            text: format!("🎉 {player_name} found a {found_label}!\n\nScore: {score}\n\nWell done! 🏆"),
            url: None,
        }
    }

    /// What to show when every delivery mechanism failed.
    pub fn manual_text(&self) -> String {
        match &self.url {
            Some(url) => format!("Copy this link and send it to your friend:\n\n{url}"),
            None => self.text.clone(),
        }
    }
}
