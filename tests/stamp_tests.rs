//! Electronic seal compositing tests


use std::sync::Arc;

use ofd_x::core::*;
use ofd_x::rendering::*;
use test_utils::*;

fn raster_stamp(bytes: Vec<u8>, boundary: Boundary, clip: Option<Boundary>) -> StampAnnotation {
    StampAnnotation {
        id: Some("3".into()),
        page_ref: "1".into(),
        boundary,
        clip,
        appearance: StampAppearance::Raster(Arc::from(bytes)),
    }
}

/// A one-row PNG: white on the left, red on the right.
#[cfg(feature = "png-decoding")]
fn white_red_png() -> Vec<u8> {
    use std::io::Cursor;

    let pixels = vec![255, 255, 255, 255, 255, 0, 0, 255];
    let img = ::image::RgbaImage::from_raw(2, 1, pixels).expect("2x1 buffer");
    let mut out = Vec::new();
    img.write_to(&mut Cursor::new(&mut out), ::image::ImageFormat::Png)
        .expect("png encoding");
    out
}

fn page_with_stamp(stamp: StampAnnotation) -> Document {
    let mut doc = document(vec![page("1", Vec::new())], Resources::new());
    doc.stamps = vec![stamp];
    doc
}

#[cfg(feature = "png-decoding")]
#[test]
fn test_raster_stamp_fills_its_box() {
    init_logging();
    let doc = page_with_stamp(raster_stamp(
        white_red_png(),
        Boundary::new(10.0, 10.0, 40.0, 20.0),
        None,
    ));

    let mut device = RecordingDevice::new(210.0, 297.0);
    let report = renderer(RenderConfig::default())
        .render_page(&doc, 0, &mut device)
        .unwrap();
    assert!(report.is_clean());
    assert_eq!(call_tags(&device), vec!["begin_group", "image", "end_group"]);

    match &device.calls()[0] {
        DrawCall::BeginGroup { blend, alpha } => {
            assert_eq!(*blend, BlendMode::Multiply);
            assert_eq!(*alpha, 1.0);
        }
        other => panic!("unexpected call {:?}", other),
    }
    match &device.calls()[1] {
        DrawCall::DrawImage {
            width,
            height,
            transform,
            alpha,
        } => {
            assert_eq!((*width, *height), (2, 1));
            assert_eq!(*alpha, 1.0);
            assert_eq!(transform.transform_point(0.0, 0.0), (10.0, 10.0));
            assert_eq!(transform.transform_point(2.0, 1.0), (50.0, 30.0));
        }
        other => panic!("unexpected call {:?}", other),
    }
}

#[cfg(feature = "png-decoding")]
#[test]
fn test_stamp_clip_is_relative_to_its_box() {
    let doc = page_with_stamp(raster_stamp(
        white_red_png(),
        Boundary::new(10.0, 10.0, 40.0, 20.0),
        Some(Boundary::new(0.0, 0.0, 20.0, 20.0)),
    ));

    let mut device = RecordingDevice::new(210.0, 297.0);
    renderer(RenderConfig::default())
        .render_page(&doc, 0, &mut device)
        .unwrap();

    assert_eq!(
        call_tags(&device),
        vec!["push_clip", "begin_group", "image", "end_group", "pop_clip"]
    );
    let DrawCall::PushClip(region) = &device.calls()[0] else {
        panic!("expected a clip");
    };
    assert_eq!(region.path.bounding_box(), Some((10.0, 10.0, 30.0, 30.0)));
    assert_eq!(device.open_depths(), (0, 0));
}

#[cfg(feature = "png-decoding")]
#[test]
fn test_stamp_opacity_applies_to_the_multiply_layer() {
    let doc = page_with_stamp(raster_stamp(
        white_red_png(),
        Boundary::new(0.0, 0.0, 10.0, 10.0),
        None,
    ));

    let mut device = RecordingDevice::new(210.0, 297.0);
    renderer(RenderConfig::default().with_stamp_opacity(0.5))
        .render_page(&doc, 0, &mut device)
        .unwrap();

    assert_eq!(
        device.calls()[0],
        DrawCall::BeginGroup {
            blend: BlendMode::Multiply,
            alpha: 0.5
        }
    );
}

#[test]
fn test_undecodable_stamp_is_reported() {
    let doc = page_with_stamp(raster_stamp(
        b"not an image".to_vec(),
        Boundary::new(0.0, 0.0, 10.0, 10.0),
        Some(Boundary::new(0.0, 0.0, 5.0, 5.0)),
    ));

    let mut device = RecordingDevice::new(210.0, 297.0);
    let report = renderer(RenderConfig::default())
        .render_page(&doc, 0, &mut device)
        .unwrap();

    assert_eq!(report.diagnostics.len(), 1);
    assert_eq!(report.diagnostics[0].block, BlockKind::Stamp);
    assert_eq!(report.diagnostics[0].id, Some(3));
    // Clip and group are unwound even though the appearance failed
    assert_eq!(device.open_depths(), (0, 0));
}

#[test]
fn test_document_stamp_reports_nested_failures() {
    let mut seal_resources = Resources::new();
    seal_resources.add_composite(CompositeGraphic {
        id: "C1".into(),
        width: 10.0,
        height: 10.0,
        content: Vec::new(),
    });
    let mut missing = GraphicUnit::with_boundary(Boundary::new(0.0, 0.0, 10.0, 10.0));
    missing.id = Some(5);
    let seal_page = Page {
        id: "s".into(),
        physical_box: Boundary::new(0.0, 0.0, 40.0, 40.0),
        layers: vec![Layer {
            id: None,
            draw_param: None,
            blocks: vec![
                Block::Composite(CompositeObject {
                    unit: missing,
                    resource: "C2".into(),
                }),
                path_block(6, Boundary::new(0.0, 0.0, 40.0, 40.0), "M 0 0 L 40 40"),
            ],
        }],
    };
    let seal = Document::new(vec![seal_page], Arc::new(seal_resources));

    let doc = page_with_stamp(StampAnnotation {
        id: None,
        page_ref: "1".into(),
        boundary: Boundary::new(0.0, 0.0, 20.0, 20.0),
        clip: None,
        appearance: StampAppearance::Document(Arc::new(seal)),
    });

    let mut device = RecordingDevice::new(210.0, 297.0);
    let report = renderer(RenderConfig::default().with_clip_to_boundary(false))
        .render_page(&doc, 0, &mut device)
        .unwrap();

    // The nested composite fails, the stamp itself still counts as drawn
    assert_eq!(report.diagnostics.len(), 1);
    assert_eq!(report.diagnostics[0].block, BlockKind::Composite);
    assert_eq!(report.diagnostics[0].id, Some(5));
    assert_eq!(call_tags(&device), vec!["begin_group", "stroke", "end_group"]);

    let DrawCall::StrokePath { transform, .. } = &device.calls()[1] else {
        panic!("expected a stroke");
    };
    assert_eq!(transform.transform_point(40.0, 40.0), (20.0, 20.0));
}

#[test]
fn test_document_stamp_fonts_stay_out_of_host_cache() {
    let mut host_resources = resources_with_font();
    host_resources.add_file("Res/font_1.ttf", vec![0u8; 8]);
    let mut seal_resources = resources_with_font();
    seal_resources.add_file("Res/font_1.ttf", vec![1u8; 8]);

    let seal_page = page(
        "s",
        vec![text_block(
            1,
            Boundary::new(0.0, 0.0, 100.0, 100.0),
            "F1",
            10.0,
            vec![TextCode::at(0.0, 20.0, "A")],
        )],
    );
    let seal = Document::new(vec![seal_page], Arc::new(seal_resources));
    let mut doc = document(vec![page("1", Vec::new())], host_resources);
    doc.stamps = vec![StampAnnotation {
        id: None,
        page_ref: "1".into(),
        boundary: Boundary::new(0.0, 0.0, 21.0, 29.7),
        clip: None,
        appearance: StampAppearance::Document(Arc::new(seal)),
    }];

    let renderer = renderer(RenderConfig::default());
    let mut device = RecordingDevice::new(210.0, 297.0);
    let report = renderer.render_page(&doc, 0, &mut device).unwrap();

    assert!(report.is_clean());
    assert_eq!(glyph_origins(&device).len(), 1);
    // the seal's descriptor was resolved in a cache of its own
    assert!(renderer.fonts().is_empty());
}

#[cfg(all(feature = "rendering", feature = "png-decoding"))]
mod raster {
    use super::*;

    fn render(clear: bool) -> SkiaDevice {
        let mut doc = page_with_stamp(raster_stamp(
            white_red_png(),
            Boundary::new(0.0, 0.0, 4.0, 2.0),
            None,
        ));
        doc.pages[0].physical_box = Boundary::new(0.0, 0.0, 4.0, 2.0);

        let config = RenderConfig::default().with_stamp_background(clear, 255);
        let mut device = SkiaDevice::new(4, 2).unwrap();
        renderer(config).render_page(&doc, 0, &mut device).unwrap();
        device
    }

    #[test]
    fn test_white_background_becomes_transparent() {
        let device = render(true);
        assert_eq!(device.pixmap().pixel(0, 0).unwrap().alpha(), 0);

        let ink = device.pixmap().pixel(3, 1).unwrap();
        assert!(ink.red() >= 250 && ink.alpha() >= 250);
        assert!(ink.green() <= 5 && ink.blue() <= 5);
    }

    #[test]
    fn test_background_kept_when_clearing_is_off() {
        let device = render(false);
        let paper = device.pixmap().pixel(0, 0).unwrap();
        assert!(paper.alpha() >= 250);
        assert!(paper.red() >= 250 && paper.green() >= 250);
    }
}
