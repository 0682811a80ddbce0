//! Renderer: the deterministic rasterizer.
//!
//! Lays out a `ViewTree` onto a fixed-size cell grid for the terminal host.
//! The renderer is pure and stateless. Given the same tree and contract, it
//! always produces the same canvas. It knows nothing about time or playback;
//! the tree's classes are the only layout input.

pub mod canvas;

pub use canvas::{Canvas, Hotspot, Rect};

use crate::cinematic::{OPEN_CLASS, OVERLAY_CLASS};
use crate::game::GAME_CLASS;
use crate::playback::TextStyle;
use crate::sprites::{Palette, SpriteRenderer, SpriteTable, Visual};
use crate::types::{Cell, CellChange, Color, NamedColor, Style, TerminalContract};
use crate::view::{Element, ElementKind, NodeId, UiAction, ViewTree};

/// Stage size in terminal cells. Sprite rows pack two to a cell.
pub const STAGE_COLS: u16 = 64;
pub const STAGE_ROWS: u16 = 14;

const OVERLAY_MAX_WIDTH: u16 = 78;
const METER_CELLS: u8 = 10;
pub const LAUNCH_LABEL: &str = "[ >_ TERMINAL ]";

pub struct Renderer;

impl Renderer {
    /// Lay out whatever is mounted: the overlay (only while open), the game,
    /// or nothing.
    pub fn rasterize(tree: &ViewTree, contract: TerminalContract) -> Canvas {
        let mut canvas = Canvas::new(contract);
        let Some(root) = tree.get(tree.root()) else {
            return canvas;
        };
        if root.has_class(OVERLAY_CLASS) {
            if root.has_class(OPEN_CLASS) {
                overlay(tree, &mut canvas);
            }
        } else if root.has_class(GAME_CLASS) {
            game(tree, &mut canvas);
        }
        canvas
    }

    /// Host screen shown when nothing is mounted: the logo and the terminal
    /// button.
    pub fn launcher(contract: TerminalContract) -> Canvas {
        let mut canvas = Canvas::new(contract);
        let cw = canvas.width() as i32;
        let ch = canvas.height() as i32;

        let logo = SpriteRenderer::builtin()
            .render("logo", 0)
            .map(|visual| Renderer::sprite_cells(&visual))
            .unwrap_or_default();
        let logo_w = logo.first().map_or(0, |row| row.len()) as i32;
        let block = logo.len() as i32 + 4;
        let top = ((ch - block) / 2).max(0);
        blit(&mut canvas, (cw - logo_w) / 2, top, &logo, false);

        let title_y = top + logo.len() as i32 + 1;
        let title = "SITESYNC";
        canvas.put_str(
            (cw - title.len() as i32) / 2,
            title_y,
            title,
            &palette_style("accent", true),
        );

        let button_y = title_y + 2;
        let bx = (cw - LAUNCH_LABEL.len() as i32) / 2;
        let used = canvas.put_str(bx, button_y, LAUNCH_LABEL, &palette_style("success", true));
        canvas.add_hotspot(bx, button_y, used, UiAction::Launch);
        canvas
    }

    /// Half-block cells for a sprite frame: two sprite rows per cell, one
    /// sprite column per cell. `None` cells are transparent.
    pub fn sprite_cells(visual: &Visual) -> Vec<Vec<Option<Cell>>> {
        let scale = visual.scale.max(1);
        let cols = (visual.width / scale) as usize;
        let rows = (visual.height / scale) as usize;
        let mut halves: Vec<Vec<Option<Color>>> = vec![vec![None; cols]; rows];
        for pixel in &visual.pixels {
            let size = pixel.size.max(1);
            let (gx, gy) = ((pixel.x / size) as usize, (pixel.y / size) as usize);
            if let Some(slot) = halves.get_mut(gy).and_then(|row| row.get_mut(gx)) {
                *slot = Some(Color::parse(&pixel.color).unwrap_or(Color::Named(NamedColor::White)));
            }
        }

        halves
            .chunks(2)
            .map(|pair| {
                (0..cols)
                    .map(|x| {
                        let top = pair[0][x];
                        let bottom = pair.get(1).and_then(|row| row[x]);
                        match (top, bottom) {
                            (Some(top), bottom) => Some(Cell {
                                ch: '▀',
                                style: Style {
                                    fg: Some(top),
                                    bg: bottom,
                                    ..Style::default()
                                },
                            }),
                            (None, Some(bottom)) => Some(Cell {
                                ch: '▄',
                                style: Style::fg(Some(bottom)),
                            }),
                            (None, None) => None,
                        }
                    })
                    .collect()
            })
            .collect()
    }

    /// Compute a cell-level diff between two canvases. A size change redraws
    /// every cell.
    pub fn diff(prev: &Canvas, next: &Canvas) -> Vec<CellChange> {
        let mut changes = Vec::new();
        let resized = prev.contract != next.contract;
        for (y, next_row) in next.cells.iter().enumerate() {
            for (x, next_cell) in next_row.iter().enumerate() {
                let changed = resized
                    || prev
                        .cells
                        .get(y)
                        .and_then(|row| row.get(x))
                        .is_none_or(|prev_cell| prev_cell != next_cell);
                if changed {
                    changes.push(CellChange {
                        x: x as u16,
                        y: y as u16,
                        cell: next_cell.clone(),
                    });
                }
            }
        }
        changes
    }
}

fn palette() -> &'static Palette {
    &SpriteTable::builtin().palette
}

fn palette_style(key: &str, bold: bool) -> Style {
    Style {
        fg: palette().color(key),
        bold,
        ..Style::default()
    }
}

fn text_style(el: &Element) -> Style {
    if el.has_class("click-continue") {
        return Style {
            dim: true,
            ..palette_style("info", false)
        };
    }
    let style = TextStyle::from_classes(&el.classes);
    palette_style(style.palette_key(), style.is_bold())
}

fn faded(mut style: Style, fade: bool) -> Style {
    style.dim |= fade;
    style
}

// ---------------------------------------------------------------------------
// Flow layout: text lines, buttons and meters stacked top to bottom
// ---------------------------------------------------------------------------

struct Row {
    spans: Vec<(String, Style)>,
    centered: bool,
    action: Option<UiAction>,
}

impl Row {
    fn text(text: String, style: Style) -> Self {
        Row {
            spans: vec![(text, style)],
            centered: false,
            action: None,
        }
    }

    fn width(&self) -> usize {
        self.spans.iter().map(|(s, _)| s.chars().count()).sum()
    }
}

fn flow(tree: &ViewTree, node: NodeId, width: usize, rows: &mut Vec<Row>) {
    for &child in tree.children(node) {
        let Some(el) = tree.get(child) else {
            continue;
        };
        if el.hidden {
            continue;
        }
        match &el.kind {
            ElementKind::Text => text_rows(tree, el, width, rows),
            ElementKind::Button(action) => rows.push(Row {
                spans: vec![(format!("[ {} ]", el.text), palette_style("accent", true))],
                centered: true,
                action: Some(*action),
            }),
            ElementKind::Meter { fill } => rows.push(Row {
                spans: meter_spans(&el.text, *fill),
                centered: false,
                action: None,
            }),
            ElementKind::Block => flow(tree, child, width, rows),
            ElementKind::Stage
            | ElementKind::Cursor
            | ElementKind::Sprite(_)
            | ElementKind::Connection { .. } => {}
        }
    }
}

fn text_rows(tree: &ViewTree, el: &Element, width: usize, rows: &mut Vec<Row>) {
    let style = text_style(el);
    let cursor = el.children().iter().any(|c| {
        tree.get(*c)
            .is_some_and(|c| matches!(c.kind, ElementKind::Cursor) && !c.hidden)
    });
    let wrap_width = if cursor { width.saturating_sub(1) } else { width };
    let centered = el.has_class("click-continue");

    let mut wrapped: Vec<Row> = wrap(&el.text, wrap_width)
        .into_iter()
        .map(|line| Row {
            centered,
            ..Row::text(line, style.clone())
        })
        .collect();
    if cursor {
        if let Some(last) = wrapped.last_mut() {
            last.spans.push(("█".to_string(), palette_style("accent", false)));
        }
    }
    rows.extend(wrapped);
}

fn meter_spans(label: &str, fill: u8) -> Vec<(String, Style)> {
    let filled = (fill.min(100) as u32 * METER_CELLS as u32 / 100) as usize;
    let empty = METER_CELLS as usize - filled;
    vec![
        (format!("{label} "), palette_style("text", true)),
        ("█".repeat(filled), palette_style("success", false)),
        (
            "░".repeat(empty),
            Style {
                dim: true,
                ..Style::default()
            },
        ),
    ]
}

/// Word-wrap one logical line. Breaks at spaces and hard-breaks words
/// longer than `width`. An empty line still occupies one row.
fn wrap(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut len = 0;

    for word in text.split(' ') {
        let mut word: Vec<char> = word.chars().collect();
        let sep = usize::from(len > 0);
        if len + sep + word.len() <= width {
            if sep == 1 {
                current.push(' ');
            }
            current.extend(word.iter());
            len += sep + word.len();
            continue;
        }
        if len > 0 {
            lines.push(std::mem::take(&mut current));
        }
        while word.len() > width {
            let rest = word.split_off(width);
            lines.push(word.into_iter().collect());
            word = rest;
        }
        current.extend(word.iter());
        len = word.len();
    }
    lines.push(current);
    lines
}

/// Draw the last rows that fit into `area`, so the newest content stays
/// visible once the flow overflows.
fn draw_rows(canvas: &mut Canvas, area: Rect, rows: &[Row], fade: bool) {
    let skip = rows.len().saturating_sub(area.h as usize);
    for (i, row) in rows[skip..].iter().enumerate() {
        let y = area.y as i32 + i as i32;
        let width = row.width() as i32;
        let mut x = if row.centered {
            area.x as i32 + (area.w as i32 - width).max(0) / 2
        } else {
            area.x as i32
        };
        if let Some(action) = row.action {
            canvas.add_hotspot(x, y, width, action);
        }
        for (text, style) in &row.spans {
            let style = faded(style.clone(), fade);
            let max = area.x as i32 + area.w as i32 - x;
            let clipped: String = text.chars().take(max.max(0) as usize).collect();
            x += canvas.put_str(x, y, &clipped, &style);
        }
    }
}

fn blit(canvas: &mut Canvas, x: i32, y: i32, cells: &[Vec<Option<Cell>>], fade: bool) {
    for (dy, row) in cells.iter().enumerate() {
        for (dx, cell) in row.iter().enumerate() {
            if let Some(cell) = cell {
                let style = faded(cell.style.clone(), fade);
                canvas.put(x + dx as i32, y + dy as i32, cell.ch, &style);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Overlay
// ---------------------------------------------------------------------------

fn overlay(tree: &ViewTree, canvas: &mut Canvas) {
    let (cw, ch) = (canvas.width(), canvas.height());
    let w = cw.saturating_sub(4).min(OVERLAY_MAX_WIDTH);
    let h = ch.saturating_sub(2);
    if w < 12 || h < 4 {
        return;
    }
    let rect = Rect {
        x: (cw - w) / 2,
        y: (ch - h) / 2,
        w,
        h,
    };
    canvas.window = Some(rect);
    canvas.frame(rect, &palette_style("wall", false));

    if let Some(header) = tree
        .first_by_class("terminal-header")
        .and_then(|id| tree.get(id))
    {
        let title = format!(" {} ", header.text);
        canvas.put_str(rect.x as i32 + 2, rect.y as i32, &title, &palette_style("accent", true));
        for &child in header.children() {
            let Some(el) = tree.get(child) else {
                continue;
            };
            if let ElementKind::Button(action) = el.kind {
                let label = format!("[{}]", el.text);
                let x = (rect.x + rect.w) as i32 - 2 - label.chars().count() as i32;
                let used = canvas.put_str(x, rect.y as i32, &label, &palette_style("error", true));
                canvas.add_hotspot(x, rect.y as i32, used, action);
            }
        }
    }

    if let Some(body) = tree.first_by_class("terminal-body") {
        let inner = Rect {
            x: rect.x + 2,
            y: rect.y + 1,
            w: rect.w - 4,
            h: rect.h - 2,
        };
        let mut rows = Vec::new();
        flow(tree, body, inner.w as usize, &mut rows);
        draw_rows(canvas, inner, &rows, false);
    }
}

// ---------------------------------------------------------------------------
// Game
// ---------------------------------------------------------------------------

fn marker(el: &Element) -> (char, Style) {
    if el.has_class("complete") {
        ('●', palette_style("success", false))
    } else if el.has_class("active") {
        ('◉', palette_style("accent", true))
    } else {
        (
            '○',
            Style {
                dim: true,
                ..palette_style("text", false)
            },
        )
    }
}

fn game(tree: &ViewTree, canvas: &mut Canvas) {
    let cw = canvas.width() as i32;
    let left = (cw - STAGE_COLS as i32).max(0) / 2;

    if let Some(progress) = tree.first_by_class("game-progress") {
        let dots = tree.children(progress);
        let width = (dots.len() * 2).saturating_sub(1) as i32;
        let mut x = (cw - width).max(0) / 2;
        for dot in dots.iter().filter_map(|d| tree.get(*d)) {
            let (glyph, style) = marker(dot);
            canvas.put(x, 0, glyph, &style);
            x += 2;
        }
    }

    let Some(scene) = tree.first_by_class("game-scene") else {
        return;
    };
    let fade = tree.get(scene).is_some_and(|el| el.has_class("fade-out"));
    let stage_top = 2;
    let mut below = stage_top;
    for &child in tree.children(scene) {
        if matches!(tree.get(child).map(|el| &el.kind), Some(ElementKind::Stage)) {
            draw_stage(tree, child, canvas, left, stage_top, fade);
            below = stage_top + STAGE_ROWS as i32 + 1;
        }
    }

    let area = Rect {
        x: left as u16,
        y: below as u16,
        w: STAGE_COLS.min(canvas.width()),
        h: canvas.height().saturating_sub(below as u16),
    };
    let mut rows = Vec::new();
    flow(tree, scene, area.w as usize, &mut rows);
    draw_rows(canvas, area, &rows, fade);
}

fn draw_stage(tree: &ViewTree, stage: NodeId, canvas: &mut Canvas, left: i32, top: i32, fade: bool) {
    let ground = top + STAGE_ROWS as i32 - 1;
    let ground_style = faded(palette_style("gbDark", false), fade);
    for c in 0..STAGE_COLS as i32 {
        canvas.put(left + c, ground, '▀', &ground_style);
    }

    let children: Vec<&Element> = tree
        .children(stage)
        .iter()
        .filter_map(|id| tree.get(*id))
        .filter(|el| !el.hidden)
        .collect();

    // Scenery first so sprites always sit on top of it.
    for el in &children {
        match &el.kind {
            ElementKind::Connection { broken } => {
                let y = ground - 3;
                let (key, glyph) = if *broken { ("error", '╌') } else { ("success", '━') };
                let style = faded(palette_style(key, false), fade);
                for c in 0..STAGE_COLS as i32 {
                    let ch = if *broken && c % 4 == 3 { ' ' } else { glyph };
                    canvas.put(left + c, y, ch, &style);
                }
            }
            ElementKind::Meter { fill } => {
                let mut x = left + el.x;
                let y = top + el.y.unwrap_or(0);
                for (text, style) in meter_spans(&el.text, *fill) {
                    x += canvas.put_str(x, y, &text, &faded(style, fade));
                }
            }
            _ => {}
        }
    }

    for el in &children {
        if let ElementKind::Sprite(instance) = &el.kind {
            let cells = Renderer::sprite_cells(&instance.visual);
            let y = match el.y {
                Some(y) => top + y,
                None => ground - cells.len() as i32,
            };
            blit(canvas, left + el.x, y, &cells, fade);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONTRACT: TerminalContract = TerminalContract {
        width: 80,
        height: 30,
    };

    fn game_tree(dots: &[&str]) -> (ViewTree, NodeId) {
        let mut tree = ViewTree::new();
        let root = tree.root();
        tree.add_class(root, GAME_CLASS);
        let scene = tree.append(root, Element::block("game-scene")).unwrap();
        let progress = tree.append(root, Element::block("game-progress")).unwrap();
        for class in dots {
            let dot = tree.append(progress, Element::block("progress-dot")).unwrap();
            if !class.is_empty() {
                tree.add_class(dot, class);
            }
        }
        (tree, scene)
    }

    #[test]
    fn progress_markers_use_distinct_glyphs() {
        let (tree, _) = game_tree(&["complete", "active", ""]);
        let canvas = Renderer::rasterize(&tree, CONTRACT);
        assert_eq!(canvas.row_text(0).trim(), "● ◉ ○");
    }

    #[test]
    fn empty_mount_draws_nothing() {
        let canvas = Renderer::rasterize(&ViewTree::new(), CONTRACT);
        assert!((0..CONTRACT.height).all(|y| canvas.row_text(y).is_empty()));
        assert!(canvas.hotspots.is_empty());
    }

    #[test]
    fn sprite_cells_pack_two_rows_per_cell() {
        let visual = SpriteRenderer::builtin().render("dataPacket", 0).unwrap();
        let cells = Renderer::sprite_cells(&visual);
        // 4x4 grid becomes 4 columns by 2 rows
        assert_eq!(cells.len(), 2);
        assert_eq!(cells[0].len(), 4);
        // Top-left corner is transparent above a painted cell.
        let corner = cells[0][0].as_ref().unwrap();
        assert_eq!(corner.ch, '▄');
        let inner = cells[0][1].as_ref().unwrap();
        assert_eq!(inner.ch, '▀');
        assert!(inner.style.fg.is_some() && inner.style.bg.is_some());
    }

    #[test]
    fn unknown_palette_colour_still_paints() {
        let visual = Visual {
            width: 1,
            height: 1,
            scale: 1,
            pixels: vec![crate::sprites::Pixel {
                x: 0,
                y: 0,
                size: 1,
                color: "nonsense".into(),
            }],
        };
        let cells = Renderer::sprite_cells(&visual);
        assert_eq!(cells[0][0].as_ref().map(|c| c.ch), Some('▀'));
    }

    #[test]
    fn stage_sprites_stand_on_the_ground() {
        let (mut tree, scene) = game_tree(&["active"]);
        let stage = tree
            .append(scene, Element::new(ElementKind::Stage).with_class("game-stage"))
            .unwrap();
        let sprite = SpriteRenderer::builtin()
            .create_element("dataPacket", 0, "")
            .unwrap()
            .at(0, None);
        tree.append(stage, sprite);

        let canvas = Renderer::rasterize(&tree, CONTRACT);
        let left = (CONTRACT.width - STAGE_COLS) / 2;
        let ground = 2 + STAGE_ROWS - 1;
        assert_eq!(canvas.get(left + 1, ground - 1).map(|c| c.ch), Some('▀'));
        assert_eq!(canvas.get(left + 1, ground - 3).map(|c| c.ch), Some(' '));
    }

    #[test]
    fn hidden_sprites_are_not_drawn() {
        let (mut tree, scene) = game_tree(&[]);
        let stage = tree.append(scene, Element::new(ElementKind::Stage)).unwrap();
        let sprite = SpriteRenderer::builtin()
            .create_element("dataPacket", 0, "")
            .unwrap()
            .at(0, Some(0))
            .hidden(true);
        tree.append(stage, sprite);

        let canvas = Renderer::rasterize(&tree, CONTRACT);
        let left = (CONTRACT.width - STAGE_COLS) / 2;
        assert_eq!(canvas.get(left + 1, 2).map(|c| c.ch), Some(' '));
    }

    #[test]
    fn closed_overlay_draws_nothing() {
        let mut tree = ViewTree::new();
        let root = tree.root();
        tree.add_class(root, OVERLAY_CLASS);
        tree.append(root, Element::block("terminal-body"));
        let canvas = Renderer::rasterize(&tree, CONTRACT);
        assert!(canvas.window.is_none());
    }

    fn open_overlay() -> (ViewTree, NodeId) {
        let mut tree = ViewTree::new();
        let root = tree.root();
        tree.add_class(root, OVERLAY_CLASS);
        tree.add_class(root, OPEN_CLASS);
        let window = tree.append(root, Element::block("terminal-window")).unwrap();
        let header = tree
            .append(
                window,
                Element::new(ElementKind::Text)
                    .with_class("terminal-header")
                    .with_text("SITESYNC_TERMINAL_V4.0"),
            )
            .unwrap();
        tree.append(
            header,
            Element::new(ElementKind::Button(UiAction::Close)).with_text("x"),
        );
        let body = tree.append(window, Element::block("terminal-body")).unwrap();
        (tree, body)
    }

    #[test]
    fn overlay_body_scrolls_to_the_newest_line() {
        let (mut tree, body) = open_overlay();
        for i in 0..40 {
            tree.append(
                body,
                Element::new(ElementKind::Text)
                    .with_class("terminal-line")
                    .with_text(format!("line {i}")),
            );
        }
        let canvas = Renderer::rasterize(&tree, CONTRACT);
        let window = canvas.window.unwrap();
        let last_inner = window.y + window.h - 2;
        assert_eq!(canvas.row_text(last_inner).trim_matches(['│', ' ']), "line 39");
        assert!(canvas.row_text(window.y).contains("SITESYNC_TERMINAL_V4.0"));
    }

    #[test]
    fn overlay_buttons_become_hotspots() {
        let (mut tree, body) = open_overlay();
        let keycap = tree.append(body, Element::block("keycap-container")).unwrap();
        tree.append(
            keycap,
            Element::new(ElementKind::Button(UiAction::Close))
                .with_class("keycap-btn")
                .with_text("ESC"),
        );
        let canvas = Renderer::rasterize(&tree, CONTRACT);
        // close control plus keycap
        assert_eq!(canvas.hotspots.len(), 2);
        assert!(canvas.hotspots.iter().all(|h| h.action == UiAction::Close));
        assert!(canvas.on_backdrop(0, 0));
        let inside = canvas.window.unwrap();
        assert!(!canvas.on_backdrop(inside.x + 1, inside.y + 1));
    }

    #[test]
    fn cursor_trails_the_typed_text() {
        let (mut tree, scene) = game_tree(&[]);
        let text = tree.append(scene, Element::block("game-text-container")).unwrap();
        let line = tree
            .append(
                text,
                Element::new(ElementKind::Text)
                    .with_class("game-text error")
                    .with_text("THE"),
            )
            .unwrap();
        tree.append(line, Element::new(ElementKind::Cursor).with_class("game-cursor"));
        let canvas = Renderer::rasterize(&tree, CONTRACT);
        assert_eq!(canvas.row_text(2).trim(), "THE█");
    }

    #[test]
    fn wrap_breaks_at_spaces_and_splits_long_words() {
        assert_eq!(wrap("your building loses", 10), ["your", "building", "loses"]);
        assert_eq!(wrap("abcdefghij", 4), ["abcd", "efgh", "ij"]);
        assert_eq!(wrap("", 4), [""]);
    }

    #[test]
    fn diff_reports_only_changed_cells() {
        let prev = Canvas::new(CONTRACT);
        let mut next = prev.clone();
        next.put(3, 4, 'x', &Style::default());
        let changes = Renderer::diff(&prev, &next);
        assert_eq!(changes.len(), 1);
        assert_eq!((changes[0].x, changes[0].y, changes[0].cell.ch), (3, 4, 'x'));

        let resized = Canvas::new(TerminalContract {
            width: 2,
            height: 2,
        });
        assert_eq!(Renderer::diff(&prev, &resized).len(), 4);
    }

    #[test]
    fn launcher_exposes_the_terminal_button() {
        let canvas = Renderer::launcher(CONTRACT);
        assert_eq!(canvas.hotspots.len(), 1);
        assert_eq!(canvas.hotspots[0].action, UiAction::Launch);
        assert_eq!(canvas.hotspots[0].rect.w as usize, LAUNCH_LABEL.len());
    }
}
