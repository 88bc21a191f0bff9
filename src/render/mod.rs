// src/render/mod.rs
// HTML projections of dashboard state. Every render returns a complete fragment; nothing is patched in place
pub mod form;
pub mod html;
pub mod page;
pub mod results;

pub use form::render_parameter_form;
pub use page::render_page;
pub use results::{render_results, render_results_panel};
