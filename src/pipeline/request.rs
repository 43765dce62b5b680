use crate::foundation::core::Character;
use crate::foundation::error::{ReelError, ReelResult};
use crate::overlay::{MediaFile, OverlaySpec};

/// One dialogue-to-video request.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DialogueRequest {
    /// Turns in speaking order.
    pub conversation: Vec<ConversationTurn>,
    /// Media referenced by overlay specs, keyed by filename.
    #[serde(default)]
    pub media_files: Vec<MediaFile>,
}

/// One exchange: up to one line per character plus overlays for the turn.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ConversationTurn {
    /// Stewie's line; blank or missing means silent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stewie: Option<String>,
    /// Peter's line; blank or missing means silent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peter: Option<String>,
    /// Overlays shown for this turn.
    #[serde(rename = "imageOverlays", default)]
    pub overlays: Vec<OverlaySpec>,
}

impl ConversationTurn {
    /// Raw line for `character`, if any.
    pub fn line(&self, character: Character) -> Option<&str> {
        match character {
            Character::Stewie => self.stewie.as_deref(),
            Character::Peter => self.peter.as_deref(),
        }
    }

    /// Non-blank lines in speaking order: Stewie before Peter.
    pub fn spoken_lines(&self) -> impl Iterator<Item = (Character, &str)> + '_ {
        Character::ALL.into_iter().filter_map(|c| {
            self.line(c)
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(|l| (c, l))
        })
    }
}

impl DialogueRequest {
    /// Parse a request body.
    pub fn from_json(json: &str) -> ReelResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reject requests that cannot produce any speech.
    pub fn validate(&self) -> ReelResult<()> {
        if self.conversation.is_empty() {
            return Err(ReelError::validation("conversation is empty"));
        }
        if self.spoken_line_count() == 0 {
            return Err(ReelError::validation("conversation has no spoken lines"));
        }
        Ok(())
    }

    /// Number of non-blank lines across all turns.
    pub fn spoken_line_count(&self) -> usize {
        self.conversation
            .iter()
            .map(|t| t.spoken_lines().count())
            .sum()
    }

    /// Overlay specs grouped by turn, in turn order.
    pub fn overlay_turns(&self) -> impl Iterator<Item = &[OverlaySpec]> + '_ {
        self.conversation.iter().map(|t| t.overlays.as_slice())
    }
}
