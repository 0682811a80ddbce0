use std::io::Write;

use crossterm::{queue, style};

use crate::config::KeyBindings;
use crate::player::Screen;

/// Key hints for the menu bar on `screen`.
pub fn menu_items(screen: Screen, keys: &KeyBindings) -> Vec<String> {
    match screen {
        Screen::Launcher => vec![
            format!("[{}] terminal", keys.advance),
            format!("[{}] cinematic", keys.open_cinematic),
            format!("[{}] quit", keys.quit),
        ],
        Screen::Cinematic => vec![
            format!("[{}] dismiss", keys.advance),
            format!("[{}] close", keys.close),
            format!("[{}] quit", keys.quit),
        ],
        Screen::Game => vec![
            format!("[{}][{}] continue", keys.advance, keys.advance_alt),
            format!("[{}] close", keys.close),
            format!("[{}] quit", keys.quit),
        ],
    }
}

/// Print a menu item string, bolding any text inside `[...]` brackets.
/// Text outside brackets is printed dim.
pub fn print_menu_item(out: &mut impl Write, item: &str) -> anyhow::Result<()> {
    let mut rest = item;
    while !rest.is_empty() {
        let Some(open) = rest.find('[') else {
            queue!(
                out,
                style::SetAttribute(style::Attribute::Dim),
                style::Print(rest),
                style::SetAttribute(style::Attribute::Reset),
            )?;
            break;
        };
        if open > 0 {
            queue!(
                out,
                style::SetAttribute(style::Attribute::Dim),
                style::Print(&rest[..open]),
                style::SetAttribute(style::Attribute::Reset),
            )?;
        }
        rest = &rest[open..];
        let Some(close) = rest.find(']') else {
            queue!(out, style::Print(rest))?;
            break;
        };
        queue!(
            out,
            style::SetAttribute(style::Attribute::Bold),
            style::Print(&rest[..=close]),
            style::SetAttribute(style::Attribute::Reset),
        )?;
        rest = &rest[close + 1..];
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn printed(item: &str) -> String {
        let mut out = Vec::new();
        print_menu_item(&mut out, item).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn brackets_are_kept_and_text_survives() {
        let out = printed("[Esc] close");
        assert!(out.contains("[Esc]"));
        assert!(out.contains(" close"));
    }

    #[test]
    fn unterminated_bracket_prints_the_rest() {
        assert!(printed("[oops").contains("[oops"));
    }

    #[test]
    fn game_hints_follow_the_bindings() {
        let keys = KeyBindings {
            advance: "Tab".into(),
            ..KeyBindings::default()
        };
        let items = menu_items(Screen::Game, &keys);
        assert_eq!(items[0], "[Tab][Space] continue");
    }
}
