//! Frame numbers and output path templates.
//!
//! Rendered sequences carry their frame number as the last run of digits in
//! the file name (`beauty.1023.exr`). [`extract_frame_number`] recovers it,
//! and [`output_path`] substitutes it back into a `#`-padded template.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::{Path, PathBuf};

/// The frame a file belongs to.
///
/// Files whose names contain no digits are [`Unnumbered`](FrameNumber::Unnumbered).
/// The derived ordering places every numbered frame before the unnumbered
/// one, so grouped sequences always end with the unnumbered group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FrameNumber {
    /// A frame number parsed from the path.
    Numbered(u64),
    /// The path carries no frame number.
    Unnumbered,
}

impl FrameNumber {
    /// The parsed number, if any.
    pub fn number(self) -> Option<u64> {
        match self {
            FrameNumber::Numbered(number) => Some(number),
            FrameNumber::Unnumbered => None,
        }
    }
}

impl Display for FrameNumber {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            FrameNumber::Numbered(number) => write!(f, "{number}"),
            FrameNumber::Unnumbered => write!(f, "(unnumbered)"),
        }
    }
}

/// Extract the frame number from a file name.
///
/// Trailing non-digit characters (extension, suffix) are skipped and the
/// run of digits immediately before them is parsed. Digits anywhere else in
/// the name are ignored, so `a7b22.exr` is frame 22.
///
/// A digit run too large for `u64` is treated as no frame number.
///
/// # Example
///
/// ```
/// use exrmerge::{FrameNumber, extract_frame_number};
///
/// assert_eq!(extract_frame_number("beauty.1023.exr"), FrameNumber::Numbered(1023));
/// assert_eq!(extract_frame_number("beauty.exr"), FrameNumber::Unnumbered);
/// ```
pub fn extract_frame_number(file_name: &str) -> FrameNumber {
    let bytes = file_name.as_bytes();

    let mut end = bytes.len();
    while end > 0 && !bytes[end - 1].is_ascii_digit() {
        end -= 1;
    }

    let mut begin = end;
    while begin > 0 && bytes[begin - 1].is_ascii_digit() {
        begin -= 1;
    }

    if begin == end {
        return FrameNumber::Unnumbered;
    }

    // The run is pure ASCII digits, so slicing on these byte offsets is
    // always on a char boundary.
    match file_name[begin..end].parse::<u64>() {
        Ok(number) => FrameNumber::Numbered(number),
        Err(_) => {
            log::debug!("Frame number in {file_name:?} overflows, treating as unnumbered");
            FrameNumber::Unnumbered
        }
    }
}

/// Extract the frame number from a whole path.
///
/// The full path string is scanned, so when the file name has no digits a
/// numbered directory supplies the frame: `shots/v2/beauty.exr` is frame 2.
pub fn frame_number_of_path(path: &Path) -> FrameNumber {
    extract_frame_number(&path.to_string_lossy())
}

/// Compute the output path for `frame` from a template.
///
/// The rightmost run of `#` characters is replaced by the frame number,
/// zero-padded to the run's length. Unnumbered frames and templates without
/// `#` use the template verbatim; avoiding collisions between frames is then
/// up to the caller.
///
/// # Example
///
/// ```
/// use exrmerge::{FrameNumber, output_path};
///
/// let path = output_path("out.####.exr", FrameNumber::Numbered(7));
/// assert_eq!(path.to_str(), Some("out.0007.exr"));
/// ```
pub fn output_path(template: &str, frame: FrameNumber) -> PathBuf {
    let (Some(number), Some(end)) = (frame.number(), template.rfind('#')) else {
        return PathBuf::from(template);
    };

    let begin = template[..end].trim_end_matches('#').len();
    let width = end + 1 - begin;

    let mut name = String::with_capacity(template.len() + 8);
    name.push_str(&template[..begin]);
    name.push_str(&format!("{number:0width$}"));
    name.push_str(&template[end + 1..]);
    PathBuf::from(name)
}
