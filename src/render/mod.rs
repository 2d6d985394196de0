//! Message rendering for the terminal
//!
//! Out of the send pipeline's core: converts message text to display
//! markup, parses pipe tables, and produces the simulated-streaming frames.
//! Everything here is a pure function of its input; the cosmetic delay
//! between frames belongs to the frontend, not to this module.

pub mod markdown;
pub mod streaming;
pub mod table;

pub use markdown::render_message;
pub use table::{extract_tables, render_table, TableData};
