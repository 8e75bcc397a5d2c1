use serde::Serialize;

use crate::analysis::types::clip;

/// Slack rejects section text longer than this many characters.
pub const SECTION_TEXT_CHARS: usize = 3000;

/// Slack incoming-webhook payload using Block Kit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlackMessage {
    /// Plain fallback shown in notifications
    pub text: String,
    pub blocks: Vec<Block>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Header {
        text: Text,
    },
    Divider,
    Section {
        #[serde(skip_serializing_if = "Option::is_none")]
        text: Option<Text>,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        fields: Vec<Text>,
    },
    Actions {
        elements: Vec<Button>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Text {
    PlainText { text: String, emoji: bool },
    Mrkdwn { text: String },
}

impl Text {
    pub fn plain(text: impl Into<String>) -> Self {
        Text::PlainText {
            text: text.into(),
            emoji: true,
        }
    }

    pub fn mrkdwn(text: impl Into<String>) -> Self {
        Text::Mrkdwn { text: text.into() }
    }

    #[cfg(test)]
    pub fn as_str(&self) -> &str {
        match self {
            Text::PlainText { text, .. } | Text::Mrkdwn { text } => text,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Button {
    #[serde(rename = "type")]
    kind: ButtonKind,
    pub text: Text,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<ButtonStyle>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum ButtonKind {
    Button,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonStyle {
    Primary,
}

impl Button {
    pub fn link(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            kind: ButtonKind::Button,
            text: Text::plain(label),
            url: url.into(),
            style: None,
        }
    }

    pub fn primary(mut self) -> Self {
        self.style = Some(ButtonStyle::Primary);
        self
    }
}

impl Block {
    pub fn header(text: impl Into<String>) -> Self {
        Block::Header {
            text: Text::plain(text),
        }
    }

    /// Section with mrkdwn text, clipped to [`SECTION_TEXT_CHARS`].
    pub fn section(text: impl Into<String>) -> Self {
        let text = text.into();
        Block::Section {
            text: Some(Text::mrkdwn(clip(&text, SECTION_TEXT_CHARS))),
            fields: Vec::new(),
        }
    }

    pub fn fields(fields: Vec<Text>) -> Self {
        Block::Section { text: None, fields }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_kit_serialization() {
        let message = SlackMessage {
            text: "fallback".to_string(),
            blocks: vec![
                Block::header("Title"),
                Block::Divider,
                Block::section("*bold*"),
                Block::Actions {
                    elements: vec![Button::link("Open", "https://example.com").primary()],
                },
            ],
        };
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(
            value["blocks"][0],
            serde_json::json!({"type": "header", "text": {"type": "plain_text", "text": "Title", "emoji": true}})
        );
        assert_eq!(value["blocks"][1], serde_json::json!({"type": "divider"}));
        assert_eq!(
            value["blocks"][2],
            serde_json::json!({"type": "section", "text": {"type": "mrkdwn", "text": "*bold*"}})
        );
        assert_eq!(
            value["blocks"][3]["elements"][0],
            serde_json::json!({
                "type": "button",
                "text": {"type": "plain_text", "text": "Open", "emoji": true},
                "url": "https://example.com",
                "style": "primary"
            })
        );
    }

    #[test]
    fn test_section_text_is_clipped() {
        let Block::Section { text: Some(text), .. } = Block::section("a".repeat(5000)) else {
            panic!("expected section text");
        };
        assert_eq!(text.as_str().chars().count(), SECTION_TEXT_CHARS);
        assert!(text.as_str().ends_with('…'));
    }

    #[test]
    fn test_fields_section_omits_text() {
        let value = serde_json::to_value(Block::fields(vec![Text::mrkdwn("a")])).unwrap();
        assert!(value.get("text").is_none());
        assert_eq!(value["fields"][0]["text"], "a");
    }
}
