pub mod controls;
pub mod debug;
pub mod setup;
pub mod tiles;
pub mod ui;
pub mod window;

// Systems are imported directly where needed
