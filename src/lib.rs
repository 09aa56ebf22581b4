pub mod config;
pub mod engine;
pub mod error;
pub mod i18n;
pub mod input;
pub mod session;
pub mod theme;
pub mod viewer;

pub use engine::RenderingEngine;
pub use error::{NavigationInputError, SessionError};
pub use session::ReadingSession;
