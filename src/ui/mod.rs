pub mod markup;
pub mod renderer;

pub use renderer::{OutputFormat, write_line};
