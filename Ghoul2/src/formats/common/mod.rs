//! Common building blocks shared by the `.gla` and `.glm` codecs
//!
//! - fixed-size `MAX_QPATH` strings
//! - row-major 3x4 bone matrices
//! - offset-checked cursors for reading and writing section layouts

mod layout;
mod matrix;
mod strings;

pub use layout::{FormatWarning, SectionCursor, SectionWriter, count_to_i32, offset_from_i32};
pub use matrix::Mat34;
pub use strings::{MAX_QPATH, read_qpath, write_qpath};
