//! Output generation for pipeline results.
//!
//! # Output Structure
//!
//! ```text
//! json_output_dir/
//! ├── 2025-05-06/
//! │   ├── morning.json
//! │   ├── morning.diagnostics.json
//! │   ├── afternoon.json
//! │   └── afternoon.diagnostics.json
//! ```

pub mod json;
