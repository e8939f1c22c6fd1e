//! Frame number extraction and output template tests.

use std::path::{Path, PathBuf};

use exrmerge::{FrameNumber, extract_frame_number, frame_number_of_path, output_path};

// ── extract_frame_number ───────────────────────────────────────────

#[test]
fn numbered_sequence_file() {
    assert_eq!(extract_frame_number("beauty.1023.exr"), FrameNumber::Numbered(1023));
}

#[test]
fn unnumbered_file() {
    assert_eq!(extract_frame_number("beauty.exr"), FrameNumber::Unnumbered);
}

#[test]
fn only_rightmost_digit_run_counts() {
    assert_eq!(extract_frame_number("a7b22.exr"), FrameNumber::Numbered(22));
}

#[test]
fn leading_zeros_are_dropped() {
    assert_eq!(extract_frame_number("shot.0001.exr"), FrameNumber::Numbered(1));
}

#[test]
fn digits_in_extension_count() {
    // The extension is not special; its digits are the rightmost run.
    assert_eq!(extract_frame_number("beauty.0010.v2"), FrameNumber::Numbered(2));
}

#[test]
fn frame_zero_is_not_unnumbered() {
    let zero = extract_frame_number("beauty.0000.exr");
    assert_eq!(zero, FrameNumber::Numbered(0));
    assert_ne!(zero, FrameNumber::Unnumbered);
}

#[test]
fn max_u32_is_a_real_frame() {
    let frame = extract_frame_number("beauty.4294967295.exr");
    assert_eq!(frame, FrameNumber::Numbered(u32::MAX as u64));
    assert_ne!(frame, FrameNumber::Unnumbered);
}

#[test]
fn file_name_digits_win_over_directories() {
    let frame = frame_number_of_path(Path::new("shots/sh010/v003/beauty.0042.exr"));
    assert_eq!(frame, FrameNumber::Numbered(42));
}

#[test]
fn numbered_directory_supplies_frame() {
    let frame = frame_number_of_path(Path::new("renders/v2/beauty.exr"));
    assert_eq!(frame, FrameNumber::Numbered(2));
}

#[test]
fn frame_number_display() {
    assert_eq!(FrameNumber::Numbered(7).to_string(), "7");
    assert_eq!(FrameNumber::Unnumbered.number(), None);
}

// ── output_path ─────────────────────────────────────────────────────

#[test]
fn template_pads_frame_number() {
    let path = output_path("out.####.exr", FrameNumber::Numbered(7));
    assert_eq!(path, PathBuf::from("out.0007.exr"));
}

#[test]
fn template_without_hash_is_verbatim() {
    assert_eq!(output_path("out.exr", FrameNumber::Numbered(7)), PathBuf::from("out.exr"));
    assert_eq!(output_path("out.exr", FrameNumber::Unnumbered), PathBuf::from("out.exr"));
}

#[test]
fn unnumbered_frame_keeps_template() {
    let path = output_path("out.####.exr", FrameNumber::Unnumbered);
    assert_eq!(path, PathBuf::from("out.####.exr"));
}

#[test]
fn single_hash() {
    let path = output_path("frame_#.exr", FrameNumber::Numbered(3));
    assert_eq!(path, PathBuf::from("frame_3.exr"));
}

#[test]
fn hash_at_end_of_template() {
    let path = output_path("merged_###", FrameNumber::Numbered(12));
    assert_eq!(path, PathBuf::from("merged_012"));
}

#[test]
fn distinct_frames_collide_without_hash() {
    // Collisions are not detected; the caller picks a template with a `#` run.
    let first = output_path("out.exr", FrameNumber::Numbered(1));
    let second = output_path("out.exr", FrameNumber::Numbered(2));
    assert_eq!(first, second);
}

#[test]
fn narrow_run_widens_instead_of_truncating() {
    let path = output_path("out.##.exr", FrameNumber::Numbered(12345));
    assert_eq!(path, PathBuf::from("out.12345.exr"));
}
