pub mod diagnostics;
pub mod javascript;
pub mod numbers;
pub mod screenshot;

pub use diagnostics::{with_diagnostics, with_test_diagnostics};
pub use javascript::ScriptBuilder;
pub use numbers::{extract_float, extract_int, extract_number, extract_numbers};
pub use screenshot::ScreenshotManager;
