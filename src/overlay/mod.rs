mod controller;
mod library;
mod loop_worker;
mod state;

pub use controller::OverlayController;
pub use library::GameLibrary;
pub use state::OverlayState;
