pub mod command;
pub mod session;

pub use command::{EditorCommand, EditorHandle};
pub use session::Editor;
