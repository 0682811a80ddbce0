//! Player: the terminal host.
//!
//! Owns the terminal, the shared mount point and both story players. The
//! event loop runs on the same `LocalSet` as the playback tasks: each frame
//! it drains pending input, lets playback advance, and redraws whatever
//! changed. Input is translated into the host operations the players expose
//! (open, close, click); the host never reaches into a running playback.

pub mod gesture;

use std::io::{self, Write};
use std::time::Duration;

use anyhow::{bail, Result};
use crossterm::event::{
    self, Event, KeyEvent, KeyEventKind, MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::{cursor, execute, queue, style, terminal};
use tokio::time::{Instant, MissedTickBehavior};

use crate::cinematic::script::CinematicScript;
use crate::cinematic::CinematicPlayer;
use crate::config::{matches_binding, PlayerConfig};
use crate::game::story::Story;
use crate::game::SceneSequencer;
use crate::menubar::{menu_items, print_menu_item};
use crate::renderer::{Canvas, Renderer};
use crate::types::{Color, NamedColor, Style, TerminalContract};
use crate::view::{Mount, UiAction};

use gesture::{PressKind, PressTracker};

/// Rows reserved above the canvas for the menu bar.
const CANVAS_OFFSET: u16 = 1;
const MIN_WIDTH: u16 = 40;
const MIN_HEIGHT: u16 = 14;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Launcher,
    Cinematic,
    Game,
}

pub struct Player {
    config: PlayerConfig,
    mount: Mount,
    cinematic: CinematicPlayer,
    game: SceneSequencer,
    screen: Screen,
    press: PressTracker,
    canvas: Option<Canvas>,
    quit: bool,
}

impl Player {
    pub fn new(config: PlayerConfig, script: CinematicScript, story: Story) -> Self {
        let mount = Mount::new();
        Player {
            press: PressTracker::new(config.long_press()),
            config,
            cinematic: CinematicPlayer::new(mount.clone(), script),
            game: SceneSequencer::new(mount.clone(), story),
            mount,
            screen: Screen::Launcher,
            canvas: None,
            quit: false,
        }
    }

    pub fn screen(&self) -> Screen {
        self.screen
    }

    pub fn mount(&self) -> &Mount {
        &self.mount
    }

    pub fn cinematic(&self) -> &CinematicPlayer {
        &self.cinematic
    }

    pub fn game(&self) -> &SceneSequencer {
        &self.game
    }

    pub fn should_quit(&self) -> bool {
        self.quit
    }

    // -----------------------------------------------------------------------
    // Host operations
    // -----------------------------------------------------------------------

    pub fn open_cinematic(&mut self) {
        self.game.destroy();
        self.cinematic.open();
        self.screen = Screen::Cinematic;
    }

    pub fn open_game(&mut self) {
        self.cinematic.destroy();
        if self.game.is_playing() {
            return;
        }
        // A finished run still owns the mount; clear it before restarting.
        self.game.destroy();
        self.game.start();
        self.screen = Screen::Game;
    }

    /// Back to the launcher, cancelling whatever is playing.
    pub fn close(&mut self) {
        match self.screen {
            Screen::Cinematic => self.cinematic.close(),
            Screen::Game => self.game.destroy(),
            Screen::Launcher => return,
        }
        tracing::debug!(screen = ?self.screen, "closed");
        self.screen = Screen::Launcher;
    }

    /// Enter/Space: continue past a click gate, or dismiss a finished story.
    fn advance(&mut self) {
        match self.screen {
            Screen::Launcher => self.open_cinematic(),
            Screen::Cinematic => {
                if self.mount.count_class("keycap-btn") > 0 {
                    self.close();
                }
            }
            Screen::Game => {
                if self.mount.click() == 0 && self.mount.count_class("game-cta") > 0 {
                    self.close();
                }
            }
        }
    }

    fn activate(&mut self, action: UiAction, now: Instant) {
        match action {
            UiAction::Close => self.close(),
            UiAction::Launch => self.press.press(now),
        }
    }

    // -----------------------------------------------------------------------
    // Input
    // -----------------------------------------------------------------------

    pub fn handle_event(&mut self, event: Event, now: Instant) {
        match event {
            Event::Key(key) if key.kind != KeyEventKind::Release => self.handle_key(&key),
            Event::Mouse(mouse) => self.handle_mouse(mouse, now),
            _ => {}
        }
    }

    pub fn handle_key(&mut self, key: &KeyEvent) {
        let keys = self.config.key_bindings.clone();
        if matches_binding(&keys.quit, key) {
            self.quit = true;
        } else if matches_binding(&keys.close, key) {
            if self.screen == Screen::Launcher {
                self.quit = true;
            } else {
                self.close();
            }
        } else if matches_binding(&keys.advance, key) || matches_binding(&keys.advance_alt, key) {
            self.advance();
        } else if matches_binding(&keys.open_cinematic, key) {
            self.open_cinematic();
        } else if matches_binding(&keys.open_game, key) {
            self.open_game();
        }
    }

    /// Mouse coordinates are terminal cells; the menu bar row is not part of
    /// the canvas.
    pub fn handle_mouse(&mut self, mouse: MouseEvent, now: Instant) {
        let Some(y) = mouse.row.checked_sub(CANVAS_OFFSET) else {
            return;
        };
        let x = mouse.column;
        let hit = self.canvas.as_ref().and_then(|c| c.hit(x, y));

        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                if let Some(action) = hit {
                    self.activate(action, now);
                } else if self.screen == Screen::Cinematic
                    && self.canvas.as_ref().is_some_and(|c| c.on_backdrop(x, y))
                {
                    self.close();
                } else if self.screen == Screen::Game {
                    self.mount.click();
                }
            }
            MouseEventKind::Up(MouseButton::Left) => {
                if !self.press.is_pressed() {
                    return;
                }
                if hit == Some(UiAction::Launch) {
                    let kind = self.press.release(now);
                    self.on_press(kind);
                } else {
                    self.press.cancel();
                }
            }
            MouseEventKind::Drag(MouseButton::Left) | MouseEventKind::Moved => {
                if self.press.is_pressed() && hit != Some(UiAction::Launch) {
                    self.press.cancel();
                }
            }
            _ => {}
        }
    }

    fn on_press(&mut self, kind: Option<PressKind>) {
        match kind {
            Some(PressKind::Short) => self.open_cinematic(),
            Some(PressKind::Long) => {
                tracing::debug!("long press on terminal button");
                self.open_game();
            }
            None => {}
        }
    }

    /// Per-frame housekeeping: a held launcher press turns long here.
    pub fn tick(&mut self, now: Instant) {
        let kind = self.press.poll(now);
        self.on_press(kind);
    }

    // -----------------------------------------------------------------------
    // Layout
    // -----------------------------------------------------------------------

    /// Rasterize the current screen and keep it for hit testing.
    pub fn layout(&mut self, contract: TerminalContract) -> &Canvas {
        let canvas = match self.screen {
            Screen::Launcher => Renderer::launcher(contract),
            Screen::Cinematic | Screen::Game => {
                self.mount.read(|tree| Renderer::rasterize(tree, contract))
            }
        };
        self.canvas.insert(canvas)
    }

    // -----------------------------------------------------------------------
    // Terminal
    // -----------------------------------------------------------------------

    /// Take over the terminal and run until the user quits.
    ///
    /// Sets up the terminal, enters the event loop, and restores the terminal
    /// on exit (even on error).
    pub async fn play(&mut self) -> Result<()> {
        let (term_w, term_h) = terminal::size()?;
        if term_w < MIN_WIDTH || term_h < MIN_HEIGHT {
            bail!("Terminal too small: need {MIN_WIDTH}x{MIN_HEIGHT}, have {term_w}x{term_h}");
        }

        let mut stdout = io::stdout();
        terminal::enable_raw_mode()?;
        execute!(
            stdout,
            terminal::EnterAlternateScreen,
            event::EnableMouseCapture,
            cursor::Hide,
            terminal::Clear(terminal::ClearType::All),
        )?;

        let result = self.run_loop(&mut stdout).await;

        // Always restore terminal state.
        let _ = execute!(
            stdout,
            event::DisableMouseCapture,
            cursor::Show,
            terminal::LeaveAlternateScreen
        );
        let _ = terminal::disable_raw_mode();

        self.cinematic.destroy();
        self.game.destroy();
        result
    }

    /// Start straight into one of the stories instead of the launcher.
    pub fn open(&mut self, screen: Screen) {
        match screen {
            Screen::Launcher => self.close(),
            Screen::Cinematic => self.open_cinematic(),
            Screen::Game => self.open_game(),
        }
    }

    async fn run_loop(&mut self, stdout: &mut io::Stdout) -> Result<()> {
        let mut interval = tokio::time::interval(self.config.frame_interval());
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut drawn: Option<(Canvas, Screen)> = None;

        loop {
            // Yields to the playback tasks on this LocalSet.
            interval.tick().await;

            while event::poll(Duration::ZERO)? {
                match event::read()? {
                    Event::Resize(_, _) => drawn = None,
                    other => self.handle_event(other, Instant::now()),
                }
            }
            if self.quit {
                break;
            }
            self.tick(Instant::now());

            let (w, h) = terminal::size()?;
            let contract = TerminalContract {
                width: w,
                height: h.saturating_sub(CANVAS_OFFSET + 1),
            };
            let next = self.layout(contract).clone();
            match &drawn {
                Some((prev, screen)) if *screen == self.screen => {
                    self.render_diff(stdout, prev, &next)?;
                }
                _ => {
                    queue!(stdout, terminal::Clear(terminal::ClearType::All))?;
                    self.render_menubar(stdout)?;
                    self.render_full(stdout, &next)?;
                }
            }
            self.render_status(stdout, contract)?;
            drawn = Some((next, self.screen));
        }

        Ok(())
    }

    fn render_menubar(&self, stdout: &mut io::Stdout) -> Result<()> {
        queue!(
            stdout,
            cursor::MoveTo(0, 0),
            terminal::Clear(terminal::ClearType::CurrentLine),
            style::Print(" "),
        )?;
        for (i, item) in menu_items(self.screen, &self.config.key_bindings)
            .iter()
            .enumerate()
        {
            if i > 0 {
                queue!(stdout, style::Print("  "))?;
            }
            print_menu_item(stdout, item)?;
        }
        stdout.flush()?;
        Ok(())
    }

    fn render_full(&self, stdout: &mut io::Stdout, canvas: &Canvas) -> Result<()> {
        for (y, row) in canvas.cells.iter().enumerate() {
            queue!(stdout, cursor::MoveTo(0, y as u16 + CANVAS_OFFSET))?;
            for cell in row {
                let cs = to_content_style(&cell.style);
                queue!(
                    stdout,
                    style::PrintStyledContent(style::StyledContent::new(cs, cell.ch))
                )?;
            }
        }
        stdout.flush()?;
        Ok(())
    }

    fn render_diff(&self, stdout: &mut io::Stdout, prev: &Canvas, next: &Canvas) -> Result<()> {
        let changes = Renderer::diff(prev, next);
        if changes.is_empty() {
            return Ok(());
        }
        for change in changes {
            let cs = to_content_style(&change.cell.style);
            queue!(
                stdout,
                cursor::MoveTo(change.x, change.y + CANVAS_OFFSET),
                style::PrintStyledContent(style::StyledContent::new(cs, change.cell.ch)),
            )?;
        }
        stdout.flush()?;
        Ok(())
    }

    fn render_status(&self, stdout: &mut io::Stdout, contract: TerminalContract) -> Result<()> {
        let status_y = contract.height + CANVAS_OFFSET;
        let status = match self.screen {
            Screen::Launcher => " hold the terminal button for more ".to_string(),
            Screen::Cinematic if self.cinematic.is_playing() => " playing ".to_string(),
            Screen::Cinematic => " done ".to_string(),
            Screen::Game => format!(
                " scene {}/{} ",
                self.game.current_scene() + 1,
                self.game.scene_count()
            ),
        };

        let mut cs = style::ContentStyle::default();
        cs.attributes.set(style::Attribute::Dim);

        queue!(
            stdout,
            cursor::MoveTo(0, status_y),
            terminal::Clear(terminal::ClearType::CurrentLine),
            style::PrintStyledContent(style::StyledContent::new(cs, status)),
        )?;
        stdout.flush()?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Style conversion
// ---------------------------------------------------------------------------

pub fn to_content_style(s: &Style) -> style::ContentStyle {
    let mut cs = style::ContentStyle::default();
    if let Some(fg) = &s.fg {
        cs.foreground_color = Some(to_ct_color(fg));
    }
    if let Some(bg) = &s.bg {
        cs.background_color = Some(to_ct_color(bg));
    }
    if s.bold {
        cs.attributes.set(style::Attribute::Bold);
    }
    if s.dim {
        cs.attributes.set(style::Attribute::Dim);
    }
    cs
}

pub fn to_ct_color(c: &Color) -> style::Color {
    match c {
        Color::Named(n) => match n {
            NamedColor::Black => style::Color::Black,
            NamedColor::Red => style::Color::Red,
            NamedColor::Green => style::Color::Green,
            NamedColor::Yellow => style::Color::Yellow,
            NamedColor::Blue => style::Color::Blue,
            NamedColor::Magenta => style::Color::Magenta,
            NamedColor::Cyan => style::Color::Cyan,
            NamedColor::White => style::Color::White,
        },
        Color::Rgb { r, g, b } => style::Color::Rgb {
            r: *r,
            g: *g,
            b: *b,
        },
    }
}
