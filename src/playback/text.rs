use serde::{Deserialize, Serialize};

use crate::error::{PlaybackError, PlaybackResult};
use crate::view::{Element, ElementKind, Mount, NodeId};

use super::{sleep, CancelToken};

/// Colour treatment of a typed line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextStyle {
    #[default]
    Plain,
    Text,
    Error,
    Accent,
    Success,
    Info,
    Highlight,
}

impl TextStyle {
    const ALL: [TextStyle; 6] = [
        TextStyle::Text,
        TextStyle::Error,
        TextStyle::Accent,
        TextStyle::Success,
        TextStyle::Info,
        TextStyle::Highlight,
    ];

    pub fn class(self) -> &'static str {
        match self {
            TextStyle::Plain => "",
            TextStyle::Text => "text",
            TextStyle::Error => "error",
            TextStyle::Accent => "accent",
            TextStyle::Success => "success",
            TextStyle::Info => "info",
            TextStyle::Highlight => "highlight",
        }
    }

    /// Palette key the line is drawn with.
    pub fn palette_key(self) -> &'static str {
        match self {
            TextStyle::Plain | TextStyle::Text => "text",
            TextStyle::Error => "error",
            TextStyle::Accent | TextStyle::Highlight => "accent",
            TextStyle::Success => "success",
            TextStyle::Info => "info",
        }
    }

    pub fn is_bold(self) -> bool {
        matches!(self, TextStyle::Highlight | TextStyle::Accent)
    }

    pub fn from_classes(classes: &[String]) -> TextStyle {
        TextStyle::ALL
            .into_iter()
            .find(|style| classes.iter().any(|c| c == style.class()))
            .unwrap_or_default()
    }
}

/// One line to reveal character by character.
#[derive(Debug, Clone, Copy)]
pub struct TypeLine<'a> {
    pub text: &'a str,
    /// Base class of the line element, e.g. `game-text`.
    pub class: &'a str,
    pub style: TextStyle,
    pub speed_ms: u64,
    /// Show a block cursor while typing.
    pub cursor: bool,
}

/// Append a line under `parent` and type `line.text` into it.
///
/// Cancellation is checked before every character and every inter-character
/// delay is itself cancellable, so an abort lands within one character delay.
/// Partial text is left as is; the caller's stop path clears the mount.
pub async fn type_line(
    mount: &Mount,
    token: &CancelToken,
    parent: NodeId,
    line: TypeLine<'_>,
) -> PlaybackResult<NodeId> {
    token.check()?;
    let element = Element::new(ElementKind::Text)
        .with_class(line.class)
        .with_class(line.style.class());
    let (id, cursor) = mount.update(|tree| {
        let id = tree.append(parent, element)?;
        let cursor = if line.cursor {
            tree.append(id, Element::new(ElementKind::Cursor).with_class("game-cursor"))
        } else {
            None
        };
        Some((id, cursor))
    })
    .ok_or(PlaybackError::Detached)?;

    for ch in line.text.chars() {
        token.check()?;
        if !mount.update(|tree| tree.push_text(id, ch)) {
            return Err(PlaybackError::Detached);
        }
        sleep(token, line.speed_ms).await?;
    }

    if let Some(cursor) = cursor {
        mount.update(|tree| tree.remove(cursor));
    }
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use crate::playback::CancelSource;

    fn line(text: &str) -> TypeLine<'_> {
        TypeLine {
            text,
            class: "game-text",
            style: TextStyle::Accent,
            speed_ms: 10,
            cursor: true,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn types_full_line_and_drops_cursor() {
        let mount = Mount::new();
        let source = CancelSource::new();
        let root = mount.read(|t| t.root());
        let id = type_line(&mount, &source.token(), root, line("OK")).await.unwrap();
        mount.read(|tree| {
            let el = tree.get(id).unwrap();
            assert_eq!(el.text, "OK");
            assert!(el.has_class("game-text"));
            assert!(el.has_class("accent"));
            assert!(el.children().is_empty());
        });
    }

    #[tokio::test(start_paused = true)]
    async fn cursor_is_present_while_typing() {
        let mount = Mount::new();
        let source = CancelSource::new();
        let token = source.token();
        let root = mount.read(|t| t.root());
        let (_, _) = tokio::join!(type_line(&mount, &token, root, line("SITESYNC")), async {
            tokio::time::sleep(Duration::from_millis(25)).await;
            assert_eq!(mount.count_class("game-cursor"), 1);
        });
        assert_eq!(mount.count_class("game-cursor"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn abort_stops_insertion() {
        let mount = Mount::new();
        let source = CancelSource::new();
        let token = source.token();
        let root = mount.read(|t| t.root());
        let (result, typed) = tokio::join!(type_line(&mount, &token, root, line("SITESYNC")), async {
            tokio::time::sleep(Duration::from_millis(35)).await;
            source.cancel();
            mount.text()
        });
        assert_eq!(result, Err(PlaybackError::Aborted));
        assert_eq!(mount.text(), typed);
        assert!(typed.len() < "SITESYNC".len());
    }

    #[test]
    fn style_round_trips_through_classes() {
        let classes = vec!["terminal-line".to_string(), "success".to_string()];
        assert_eq!(TextStyle::from_classes(&classes), TextStyle::Success);
        assert_eq!(TextStyle::from_classes(&[]), TextStyle::Plain);
    }
}
