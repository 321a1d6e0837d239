pub mod analysis;
pub mod console_display;
pub mod cursor;
pub mod driver;
pub mod geometry;
pub mod interval_color;
pub mod player;
pub mod renderer;
pub mod session;
pub mod sync;
pub mod timeline;
pub mod types;
pub mod ws_server;

#[cfg(feature = "gui")]
pub mod webview_app;
