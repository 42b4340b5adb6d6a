// This module re-exports handlers for each kernel operation.

mod common;

// Accumulation
pub mod fls_accumulate_op;
pub use fls_accumulate_op::handle_fls_accumulate;
pub mod msis_accumulate_op;
pub use msis_accumulate_op::handle_msis_accumulate;
pub mod sss_accumulate_op;
pub use sss_accumulate_op::handle_sss_accumulate;

// Encoding and history
pub mod fls_encode_op;
pub use fls_encode_op::handle_fls_encode;
pub mod msis_update_op;
pub use msis_update_op::handle_msis_update;
pub mod sss_shift_op;
pub use sss_shift_op::handle_sss_shift;
pub mod sss_line_op;
pub use sss_line_op::handle_sss_line;

// Display
pub mod visualize_op;
pub use visualize_op::handle_visualize;
