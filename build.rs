//! Build script for the Model Bench Tauri app.
//!
//! Only the standard Tauri codegen step; there are no platform-specific
//! build phases.

fn main() {
    tauri_build::build();
}
