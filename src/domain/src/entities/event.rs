use serde::{Deserialize, Serialize};
use shared::types::{ChannelId, ChannelKind, UserId};

/// Something the messaging platform delivered to the bot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InboundEvent {
    /// The bot was @-mentioned in a channel.
    Mention { channel: ChannelId, user: UserId },
    /// The `/k2sobot` slash command.
    SlashCommand { channel: ChannelId, user: UserId },
    /// A plain message. Edits, joins and bot posts carry a subtype or bot id.
    Message {
        channel: ChannelId,
        user: Option<UserId>,
        text: String,
        subtype: Option<String>,
        bot_id: Option<String>,
    },
    /// A choice made in one of the wizard menus.
    Selection {
        channel: ChannelId,
        user: Option<UserId>,
        action_id: String,
        value: String,
    },
}

impl InboundEvent {
    pub fn channel(&self) -> &str {
        match self {
            InboundEvent::Mention { channel, .. }
            | InboundEvent::SlashCommand { channel, .. }
            | InboundEvent::Message { channel, .. }
            | InboundEvent::Selection { channel, .. } => channel,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            InboundEvent::Mention { .. } => "mention",
            InboundEvent::SlashCommand { .. } => "slash_command",
            InboundEvent::Message { .. } => "message",
            InboundEvent::Selection { .. } => "selection",
        }
    }

    /// Text of a human-authored direct message, trimmed; `None` for anything
    /// the chat loop must not answer.
    pub fn direct_message_text(&self, bot_user_id: Option<&str>) -> Option<(&str, &str)> {
        let InboundEvent::Message {
            channel,
            user,
            text,
            subtype,
            bot_id,
        } = self
        else {
            return None;
        };
        if subtype.is_some() || bot_id.is_some() {
            return None;
        }
        let user = user.as_deref()?;
        if Some(user) == bot_user_id || ChannelKind::of(channel) != ChannelKind::Direct {
            return None;
        }
        let text = text.trim();
        if text.is_empty() {
            None
        } else {
            Some((user, text))
        }
    }
}
