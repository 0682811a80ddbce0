//! Shared boundary types for the SiteSync terminal.
//!
//! This module defines the data contracts between the stages:
//! - Sprite table → renderer: palette colour strings resolved into `Color`
//! - View tree → renderer (in-memory): `Cell` grids and `CellChange` diffs
//! - Renderer → host: a `TerminalContract` describing the canvas size

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Shared style primitives
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Color {
    Named(NamedColor),
    Rgb { r: u8, g: u8, b: u8 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamedColor {
    Black,
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
    White,
}

impl Color {
    /// Parse a colour value as it appears in the palette or in a sprite cell:
    /// `#rrggbb`, `#rgb`, or one of the named terminal colours.
    pub fn parse(value: &str) -> Option<Color> {
        let value = value.trim();
        if let Some(hex) = value.strip_prefix('#') {
            return parse_hex(hex);
        }
        let named = match value.to_ascii_lowercase().as_str() {
            "black" => NamedColor::Black,
            "red" => NamedColor::Red,
            "green" => NamedColor::Green,
            "yellow" => NamedColor::Yellow,
            "blue" => NamedColor::Blue,
            "magenta" => NamedColor::Magenta,
            "cyan" => NamedColor::Cyan,
            "white" => NamedColor::White,
            _ => return None,
        };
        Some(Color::Named(named))
    }
}

fn parse_hex(hex: &str) -> Option<Color> {
    if !hex.is_ascii() {
        return None;
    }
    let channel = |s: &str| u8::from_str_radix(s, 16).ok();
    match hex.len() {
        6 => Some(Color::Rgb {
            r: channel(&hex[0..2])?,
            g: channel(&hex[2..4])?,
            b: channel(&hex[4..6])?,
        }),
        3 => {
            // #abc is shorthand for #aabbcc
            let expand = |i: usize| channel(&hex[i..i + 1]).map(|v| v * 17);
            Some(Color::Rgb {
                r: expand(0)?,
                g: expand(1)?,
                b: expand(2)?,
            })
        }
        _ => None,
    }
}

fn is_false(b: &bool) -> bool {
    !*b
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Style {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fg: Option<Color>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bg: Option<Color>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub bold: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub dim: bool,
}

impl Style {
    pub fn is_default(&self) -> bool {
        self.fg.is_none() && self.bg.is_none() && !self.bold && !self.dim
    }

    pub fn fg(color: Option<Color>) -> Self {
        Style {
            fg: color,
            ..Style::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Renderer → host boundary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminalContract {
    pub width: u16,
    pub height: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub ch: char,
    #[serde(default, skip_serializing_if = "Style::is_default")]
    pub style: Style,
}

impl Default for Cell {
    fn default() -> Self {
        Cell {
            ch: ' ',
            style: Style::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellChange {
    pub x: u16,
    pub y: u16,
    pub cell: Cell,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_long_and_short_hex() {
        assert_eq!(
            Color::parse("#f0883e"),
            Some(Color::Rgb { r: 0xf0, g: 0x88, b: 0x3e })
        );
        assert_eq!(
            Color::parse("#fff"),
            Some(Color::Rgb { r: 255, g: 255, b: 255 })
        );
    }

    #[test]
    fn parses_named_colours_case_insensitively() {
        assert_eq!(Color::parse("Cyan"), Some(Color::Named(NamedColor::Cyan)));
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(Color::parse("#12"), None);
        assert_eq!(Color::parse("#gg0000"), None);
        assert_eq!(Color::parse("wallDark"), None);
    }
}
