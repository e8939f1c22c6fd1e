//! End-to-end merges through real OpenEXR files.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use exrmerge::{
    ChannelInfo, Codec, Composite, ExrCodec, ImageHeader, InputFileSpec, MergeJob, MergeOptions,
    MergedChannel, PixelType,
};

const WIDTH: usize = 4;
const HEIGHT: usize = 3;

const HALF_ONE: u16 = 0x3c00;
const HALF_TWO: u16 = 0x4000;
const HALF_HALF: u16 = 0x3800;

fn half_plane(bits: u16) -> Vec<u8> {
    bits.to_le_bytes().repeat(WIDTH * HEIGHT)
}

fn float_plane(value: f32) -> Vec<u8> {
    value.to_le_bytes().repeat(WIDTH * HEIGHT)
}

/// Write an image whose channels are `(name, type, plane)`.
fn write_exr(path: &Path, channels: &[(&str, PixelType, Vec<u8>)]) {
    let header = ImageHeader {
        width: WIDTH,
        height: HEIGHT,
        channels: channels
            .iter()
            .map(|(name, pixel_type, _)| ChannelInfo::new(*name, *pixel_type))
            .collect(),
    };
    let merged: Vec<MergedChannel<'_>> = channels
        .iter()
        .map(|(name, pixel_type, data)| MergedChannel {
            name: *name,
            pixel_type: *pixel_type,
            source: 0,
            data: data.as_slice(),
        })
        .collect();

    ExrCodec::new()
        .save_image(
            path,
            &Composite {
                header: &header,
                channels: &merged,
            },
        )
        .expect("Failed to write test image");
}

fn read_exr(path: &Path) -> (ImageHeader, Vec<Vec<u8>>) {
    let codec = ExrCodec::new();
    let version = codec.parse_version(path).expect("Failed to read version");
    let header = codec.parse_header(path, &version).expect("Failed to read header");
    let image = codec.load_image(path, &header).expect("Failed to read pixels");
    (header, image.planes)
}

fn plane<'a>(header: &ImageHeader, planes: &'a [Vec<u8>], name: &str) -> &'a [u8] {
    let index = header
        .channels
        .iter()
        .position(|channel| channel.name == name)
        .unwrap_or_else(|| panic!("Channel {name} missing"));
    &planes[index]
}

fn path_str(path: PathBuf) -> String {
    path.to_str().unwrap().to_string()
}

#[test]
fn codec_round_trips_pixels() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("beauty.0001.exr");
    write_exr(
        &path,
        &[
            ("R", PixelType::Half, half_plane(HALF_ONE)),
            ("Z", PixelType::Float, float_plane(42.5)),
        ],
    );

    let codec = ExrCodec::new();
    let version = codec.parse_version(&path).unwrap();
    assert_eq!(version.number, 2);
    assert!(!version.tiled);

    let (header, planes) = read_exr(&path);
    assert_eq!((header.width, header.height), (WIDTH, HEIGHT));
    assert_eq!(header.channel_names(), vec!["R".to_string(), "Z".to_string()]);
    assert_eq!(header.channels[0].pixel_type, PixelType::Half);
    assert_eq!(header.channels[1].pixel_type, PixelType::Float);
    assert_eq!(plane(&header, &planes, "R"), half_plane(HALF_ONE).as_slice());
    assert_eq!(plane(&header, &planes, "Z"), float_plane(42.5).as_slice());
}

#[test]
fn merges_sibling_sequences() {
    let dir = tempfile::tempdir().unwrap();
    let mut files = Vec::new();
    for frame in 1..=2 {
        let beauty = dir.path().join(format!("beauty.{frame:04}.exr"));
        let aux = dir.path().join(format!("aux.{frame:04}.exr"));
        write_exr(
            &beauty,
            &[
                ("G", PixelType::Half, half_plane(HALF_HALF)),
                ("R", PixelType::Half, half_plane(HALF_ONE)),
                ("Z", PixelType::Float, float_plane(1.0)),
            ],
        );
        write_exr(
            &aux,
            &[
                ("AO.R", PixelType::Half, half_plane(HALF_TWO)),
                ("Z", PixelType::Float, float_plane(7.0)),
            ],
        );
        files.push(InputFileSpec::new(beauty, ["R", "G", "Z"]));
        files.push(InputFileSpec::new(aux, ["Z", "AO.R"]));
    }

    let template = path_str(dir.path().join("merged.####.exr"));
    let report = MergeJob::new(files, template, MergeOptions::new().with_threads(2))
        .start(Arc::new(ExrCodec::new()))
        .release();
    assert!(report.is_full_success(), "Unexpected errors: {:?}", report.errors);
    assert_eq!(report.done, report.max);

    for frame in 1..=2 {
        let (header, planes) = read_exr(&dir.path().join(format!("merged.{frame:04}.exr")));
        assert_eq!((header.width, header.height), (WIDTH, HEIGHT));
        assert_eq!(
            header.channel_names(),
            vec!["AO.R".to_string(), "G".to_string(), "R".to_string(), "Z".to_string()]
        );
        assert_eq!(plane(&header, &planes, "R"), half_plane(HALF_ONE).as_slice());
        assert_eq!(plane(&header, &planes, "AO.R"), half_plane(HALF_TWO).as_slice());
        // aux was submitted after beauty, so its depth wins.
        assert_eq!(plane(&header, &planes, "Z"), float_plane(7.0).as_slice());
    }
}

#[test]
fn non_exr_input_fails_its_frame_only() {
    let dir = tempfile::tempdir().unwrap();
    let good = dir.path().join("beauty.0001.exr");
    let bad = dir.path().join("beauty.0002.exr");
    write_exr(&good, &[("R", PixelType::Half, half_plane(HALF_ONE))]);
    fs::write(&bad, b"this is not an image").unwrap();

    let template = path_str(dir.path().join("out.####.exr"));
    let report = MergeJob::new(
        vec![
            InputFileSpec::new(good, ["R"]),
            InputFileSpec::new(bad, ["R"]),
        ],
        template,
        MergeOptions::new().with_threads(1),
    )
    .start(Arc::new(ExrCodec::new()))
    .release();

    assert_eq!(report.failed_count(), 1);
    assert!(report.errors[0].starts_with("Failed to parse image version"));
    assert!(dir.path().join("out.0001.exr").exists());
    assert!(!dir.path().join("out.0002.exr").exists());
}

#[test]
fn truncated_file_is_a_version_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("short.exr");
    fs::write(&path, [0x76u8, 0x2f, 0x31]).unwrap();

    assert!(ExrCodec::new().parse_version(&path).is_err());
}

#[test]
fn mismatched_plane_size_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let header = ImageHeader {
        width: WIDTH,
        height: HEIGHT,
        channels: vec![ChannelInfo::new("R", PixelType::Half)],
    };
    let short = vec![0u8; 2];
    let channels = [MergedChannel {
        name: "R",
        pixel_type: PixelType::Half,
        source: 0,
        data: &short,
    }];

    let error = ExrCodec::new()
        .save_image(
            &dir.path().join("out.exr"),
            &Composite {
                header: &header,
                channels: &channels,
            },
        )
        .unwrap_err();
    assert!(error.to_string().contains("expected 24"));
}

#[test]
fn multipart_header_and_pixels_come_from_the_same_part() {
    use exr::image::write::WritableImage;
    use exr::image::{AnyChannel, AnyChannels, Encoding, FlatSamples, Image, Layer};
    use exr::meta::header::{ImageAttributes, LayerAttributes};

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("parts.0001.exr");

    let beauty = Layer::new(
        (WIDTH, HEIGHT),
        LayerAttributes::named("beauty"),
        Encoding::FAST_LOSSLESS,
        AnyChannels::sort(
            vec![AnyChannel::new("R", FlatSamples::F32(vec![3.0; WIDTH * HEIGHT]))].into(),
        ),
    );
    let aux = Layer::new(
        (2, 2),
        LayerAttributes::named("aux"),
        Encoding::FAST_LOSSLESS,
        AnyChannels::sort(vec![AnyChannel::new("Z", FlatSamples::F32(vec![9.0; 4]))].into()),
    );
    Image::from_layers(ImageAttributes::with_size((WIDTH, HEIGHT)), vec![beauty, aux])
        .write()
        .to_file(&path)
        .unwrap();

    let codec = ExrCodec::new();
    let version = codec.parse_version(&path).unwrap();
    assert!(version.multipart);

    let (header, planes) = read_exr(&path);
    assert_eq!((header.width, header.height), (WIDTH, HEIGHT));
    assert_eq!(header.channel_names(), vec!["R".to_string()]);
    assert_eq!(planes.len(), 1);
    assert_eq!(plane(&header, &planes, "R"), float_plane(3.0).as_slice());
}
