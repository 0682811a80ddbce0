pub mod cinematic;
pub mod config;
pub mod error;
pub mod game;
pub mod logging;
pub mod menubar;
pub mod playback;
pub mod player;
pub mod renderer;
pub mod sprites;
pub mod types;
pub mod view;
