use crate::types::{Cell, Style, TerminalContract};
use crate::view::UiAction;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Rect {
    pub x: u16,
    pub y: u16,
    pub w: u16,
    pub h: u16,
}

impl Rect {
    pub fn contains(&self, x: u16, y: u16) -> bool {
        x >= self.x
            && y >= self.y
            && x < self.x.saturating_add(self.w)
            && y < self.y.saturating_add(self.h)
    }
}

/// Clickable region produced for a button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hotspot {
    pub rect: Rect,
    pub action: UiAction,
}

/// A fixed-size grid of cells plus the interactive regions drawn on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Canvas {
    pub contract: TerminalContract,
    pub cells: Vec<Vec<Cell>>,
    pub hotspots: Vec<Hotspot>,
    /// Overlay window; clicks outside it land on the backdrop.
    pub window: Option<Rect>,
}

impl Canvas {
    pub fn new(contract: TerminalContract) -> Self {
        let w = contract.width as usize;
        let h = contract.height as usize;
        Canvas {
            contract,
            cells: vec![vec![Cell::default(); w]; h],
            hotspots: Vec::new(),
            window: None,
        }
    }

    pub fn width(&self) -> u16 {
        self.contract.width
    }

    pub fn height(&self) -> u16 {
        self.contract.height
    }

    pub fn get(&self, x: u16, y: u16) -> Option<&Cell> {
        self.cells.get(y as usize)?.get(x as usize)
    }

    /// Write one cell. Anything off the grid is clipped.
    pub fn put(&mut self, x: i32, y: i32, ch: char, style: &Style) {
        if x < 0 || y < 0 {
            return;
        }
        if let Some(cell) = self
            .cells
            .get_mut(y as usize)
            .and_then(|row| row.get_mut(x as usize))
        {
            *cell = Cell {
                ch,
                style: style.clone(),
            };
        }
    }

    /// Write a string left to right and return the number of columns used.
    pub fn put_str(&mut self, x: i32, y: i32, text: &str, style: &Style) -> i32 {
        let mut cx = x;
        for ch in text.chars() {
            self.put(cx, y, ch, style);
            cx += 1;
        }
        cx - x
    }

    /// Box-drawing border around `rect`.
    pub fn frame(&mut self, rect: Rect, style: &Style) {
        if rect.w < 2 || rect.h < 2 {
            return;
        }
        let (x, y) = (rect.x as i32, rect.y as i32);
        let (r, b) = (x + rect.w as i32 - 1, y + rect.h as i32 - 1);

        self.put(x, y, '┌', style);
        self.put(r, y, '┐', style);
        self.put(x, b, '└', style);
        self.put(r, b, '┘', style);
        for i in x + 1..r {
            self.put(i, y, '─', style);
            self.put(i, b, '─', style);
        }
        for j in y + 1..b {
            self.put(x, j, '│', style);
            self.put(r, j, '│', style);
        }
    }

    pub fn add_hotspot(&mut self, x: i32, y: i32, w: i32, action: UiAction) {
        if x < 0 || y < 0 || w <= 0 {
            return;
        }
        self.hotspots.push(Hotspot {
            rect: Rect {
                x: x as u16,
                y: y as u16,
                w: w as u16,
                h: 1,
            },
            action,
        });
    }

    /// Topmost action under `(x, y)`.
    pub fn hit(&self, x: u16, y: u16) -> Option<UiAction> {
        self.hotspots
            .iter()
            .rev()
            .find(|spot| spot.rect.contains(x, y))
            .map(|spot| spot.action)
    }

    pub fn on_backdrop(&self, x: u16, y: u16) -> bool {
        self.window.is_some_and(|window| !window.contains(x, y))
    }

    /// Characters of row `y` with trailing blanks trimmed.
    pub fn row_text(&self, y: u16) -> String {
        self.cells
            .get(y as usize)
            .map(|row| row.iter().map(|c| c.ch).collect::<String>())
            .unwrap_or_default()
            .trim_end()
            .to_string()
    }
}
