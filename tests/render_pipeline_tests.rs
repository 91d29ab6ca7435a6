//! End-to-end page rendering tests
//!
//! Pages are built in memory and rendered onto a RecordingDevice, so the
//! assertions look at the exact primitive stream a host surface would see.


use std::sync::Arc;

use ofd_x::core::*;
use ofd_x::rendering::*;
use test_utils::*;

// ============================================================================
// Text
// ============================================================================

#[test]
fn test_text_codes_with_delta_x() {
    init_logging();
    let mut code = TextCode::at(0.0, 5.0, "AB");
    code.delta_x = Some("3".into());
    let text = text_block(1, Boundary::new(10.0, 20.0, 50.0, 10.0), "F1", 5.0, vec![code]);
    let doc = document(vec![page("1", vec![text])], resources_with_font());

    let mut device = RecordingDevice::new(210.0, 297.0);
    let report = renderer(RenderConfig::default())
        .render_page(&doc, 0, &mut device)
        .unwrap();

    assert!(report.is_clean());
    assert_eq!(report.blocks_drawn, 1);
    assert_eq!(glyph_origins(&device), vec![(65, 10.0, 25.0), (66, 13.0, 25.0)]);
    // Text is never clipped to its boundary
    assert_eq!(call_tags(&device), vec!["glyph", "glyph"]);

    match &device.calls()[0] {
        DrawCall::DrawGlyph { stroke, fill, .. } => {
            assert_eq!(fill.as_ref(), Some(&Paint::black()));
            assert!(stroke.is_none());
        }
        other => panic!("unexpected call {:?}", other),
    }
}

#[test]
fn test_glyph_transform_scales_font_units() {
    let text = text_block(
        1,
        Boundary::new(0.0, 0.0, 50.0, 50.0),
        "F1",
        10.0,
        vec![TextCode::at(0.0, 10.0, "A")],
    );
    let doc = document(vec![page("1", vec![text])], resources_with_font());

    let mut device = RecordingDevice::new(420.0, 594.0);
    renderer(RenderConfig::default().with_scale(2.0))
        .render_page(&doc, 0, &mut device)
        .unwrap();

    let DrawCall::DrawGlyph { transform, .. } = &device.calls()[0] else {
        panic!("expected a glyph call");
    };
    // One em up from the baseline in font units lands `size` above it on the page
    let (x, y) = transform.transform_point(0.0, 1000.0);
    assert!(approx_eq(x, 0.0));
    assert!(approx_eq(y, 0.0));
    let (x, y) = transform.transform_point(1000.0, 0.0);
    assert!(approx_eq(x, 20.0));
    assert!(approx_eq(y, 20.0));
}

#[test]
fn test_substituted_font_ignores_glyph_overrides() {
    let mut unit = GraphicUnit::with_boundary(Boundary::new(0.0, 0.0, 50.0, 10.0));
    unit.id = Some(9);
    let mut text = TextObject::new(unit, "F1", 5.0);
    text.codes = vec![TextCode::at(0.0, 5.0, "A")];
    text.glyph_overrides = vec![GlyphOverride {
        code_position: Some(0),
        code_count: 1,
        glyph_count: Some(1),
        glyphs: vec![500],
    }];
    let doc = document(vec![page("1", vec![Block::Text(text)])], resources_with_font());

    let mut device = RecordingDevice::new(210.0, 297.0);
    renderer(RenderConfig::default())
        .render_page(&doc, 0, &mut device)
        .unwrap();

    let ids: Vec<u16> = glyph_origins(&device).iter().map(|g| g.0).collect();
    assert_eq!(ids, vec![65]);
}

#[test]
fn test_unknown_font_reference_uses_default_font() {
    let text = text_block(
        1,
        Boundary::new(0.0, 0.0, 50.0, 10.0),
        "NoSuchResource",
        5.0,
        vec![TextCode::at(0.0, 5.0, "A B")],
    );
    let doc = document(vec![page("1", vec![text])], Resources::new());

    let mut device = RecordingDevice::new(210.0, 297.0);
    let report = renderer(RenderConfig::default())
        .render_page(&doc, 0, &mut device)
        .unwrap();

    assert!(report.is_clean());
    // The space has a glyph but no outline
    let ids: Vec<u16> = glyph_origins(&device).iter().map(|g| g.0).collect();
    assert_eq!(ids, vec![65, 66]);
}

// ============================================================================
// Transforms
// ============================================================================

#[test]
fn test_nested_group_composite_path_transform() {
    let inner = path_block(3, Boundary::new(1.0, 1.0, 4.0, 4.0), "M 0 0 L 1 0");
    let mut resources = Resources::new();
    resources.add_composite(CompositeGraphic {
        id: "C1".into(),
        width: 20.0,
        height: 20.0,
        content: vec![inner],
    });

    let mut unit = GraphicUnit::with_boundary(Boundary::new(5.0, 5.0, 20.0, 20.0));
    unit.id = Some(2);
    unit.ctm = Some(Matrix::scale(2.0, 2.0));
    let composite = Block::Composite(CompositeObject {
        unit,
        resource: "C1".into(),
    });
    let group = Block::Group(GroupBlock {
        id: Some(1),
        boundary: Some(Boundary::new(10.0, 10.0, 100.0, 100.0)),
        draw_param: None,
        blocks: vec![composite],
    });
    let doc = document(vec![page("1", vec![group])], resources);

    let config = RenderConfig::default()
        .with_scale(2.0)
        .with_clip_to_boundary(false);
    let mut device = RecordingDevice::new(420.0, 594.0);
    let report = renderer(config).render_page(&doc, 0, &mut device).unwrap();
    assert!(report.is_clean());

    let DrawCall::StrokePath { transform, .. } = &device.calls()[0] else {
        panic!("expected a stroke call");
    };
    assert_eq!(transform.transform_point(0.0, 0.0), (34.0, 34.0));
    assert_eq!(transform.transform_point(1.0, 0.0), (38.0, 34.0));
}

// ============================================================================
// Failure isolation
// ============================================================================

#[test]
fn test_failed_blocks_do_not_stop_the_page() {
    init_logging();
    let mut image_unit = GraphicUnit::with_boundary(Boundary::new(0.0, 0.0, 10.0, 10.0));
    image_unit.id = Some(2);
    let mut composite_unit = GraphicUnit::with_boundary(Boundary::new(0.0, 0.0, 10.0, 10.0));
    composite_unit.id = Some(3);

    let blocks = vec![
        path_block(1, Boundary::new(0.0, 0.0, 10.0, 10.0), "M 0 0 L 5 5"),
        Block::Image(ImageObject::new(image_unit, "M9")),
        Block::Composite(CompositeObject {
            unit: composite_unit,
            resource: "C9".into(),
        }),
        path_block(4, Boundary::new(0.0, 0.0, 10.0, 10.0), "M 5 5 L 0 0"),
    ];
    let doc = document(vec![page("1", blocks)], Resources::new());

    let mut device = RecordingDevice::new(210.0, 297.0);
    let report = renderer(RenderConfig::default())
        .render_page(&doc, 0, &mut device)
        .unwrap();

    assert_eq!(report.blocks_drawn, 2);
    let failed: Vec<(BlockKind, Option<u32>)> =
        report.diagnostics.iter().map(|d| (d.block, d.id)).collect();
    assert_eq!(
        failed,
        vec![(BlockKind::Image, Some(2)), (BlockKind::Composite, Some(3))]
    );
    assert!(matches!(
        report.diagnostics[0].error,
        RenderError::MissingResource { .. }
    ));
    assert_eq!(
        call_tags(&device)
            .iter()
            .filter(|t| **t == "stroke")
            .count(),
        2
    );
    assert_eq!(device.open_depths(), (0, 0));
}

#[test]
fn test_out_of_range_page_is_an_error() {
    let doc = document(vec![page("1", Vec::new())], Resources::new());
    let mut device = RecordingDevice::new(210.0, 297.0);
    let result = renderer(RenderConfig::default()).render_page(&doc, 1, &mut device);
    assert!(matches!(result, Err(RenderError::InvalidPageTree(_))));
    assert!(device.calls().is_empty());
}

// ============================================================================
// DrawParam cascade
// ============================================================================

#[test]
fn test_cascade_through_layer_and_group() {
    let mut resources = Resources::new();
    resources
        .add_draw_param(DrawParam {
            line_width: Some(1.0),
            stroke_color: Some(ColorSpec::literal("255 0 0")),
            ..DrawParam::new("L")
        })
        .add_draw_param(DrawParam {
            relative: Some("R".into()),
            ..DrawParam::new("G")
        })
        .add_draw_param(DrawParam {
            line_width: Some(0.75),
            ..DrawParam::new("R")
        });

    let grouped = path_block(1, Boundary::new(0.0, 0.0, 10.0, 10.0), "M 0 0 L 5 5");
    let sibling = path_block(2, Boundary::new(0.0, 0.0, 10.0, 10.0), "M 0 0 L 5 5");
    let group = Block::Group(GroupBlock {
        id: Some(10),
        boundary: None,
        draw_param: Some("G".into()),
        blocks: vec![grouped],
    });

    let mut page = page("1", vec![group, sibling]);
    page.layers[0].draw_param = Some("L".into());
    let doc = document(vec![page], resources);

    let config = RenderConfig::default().with_clip_to_boundary(false);
    let mut device = RecordingDevice::new(210.0, 297.0);
    renderer(config).render_page(&doc, 0, &mut device).unwrap();

    let strokes: Vec<(f64, Option<Color>)> = device
        .calls()
        .iter()
        .filter_map(|call| match call {
            DrawCall::StrokePath { stroke, paint, .. } => Some((stroke.line_width, paint.solid_color())),
            _ => None,
        })
        .collect();
    let red = Some(Color::rgb(255, 0, 0));
    assert_eq!(strokes, vec![(0.75, red), (1.0, red)]);
}

// ============================================================================
// Page compositing order
// ============================================================================

fn seal_document() -> Document {
    let seal_page = Page {
        id: "s1".into(),
        physical_box: Boundary::new(0.0, 0.0, 100.0, 100.0),
        layers: vec![Layer {
            id: None,
            draw_param: None,
            blocks: vec![path_block(
                1,
                Boundary::new(0.0, 0.0, 100.0, 100.0),
                "M 0 0 L 100 100",
            )],
        }],
    };
    Document::new(vec![seal_page], Arc::new(Resources::new()))
}

#[test]
fn test_layers_then_stamps_then_annotations() {
    let mut doc = document(
        vec![page(
            "1",
            vec![path_block(1, Boundary::new(0.0, 0.0, 10.0, 10.0), "M 0 0 L 1 1")],
        )],
        Resources::new(),
    );
    let seal = Arc::new(seal_document());
    doc.stamps = vec![
        StampAnnotation {
            id: Some("1".into()),
            page_ref: "1".into(),
            boundary: Boundary::new(50.0, 50.0, 20.0, 20.0),
            clip: None,
            appearance: StampAppearance::Document(seal.clone()),
        },
        StampAnnotation {
            id: Some("2".into()),
            page_ref: "2".into(),
            boundary: Boundary::new(50.0, 50.0, 20.0, 20.0),
            clip: None,
            appearance: StampAppearance::Document(seal),
        },
    ];
    let note = |visible: bool| PageAnnotation {
        id: Some(7),
        page_ref: "1".into(),
        visible,
        appearance: GroupBlock {
            id: None,
            boundary: Some(Boundary::new(100.0, 100.0, 20.0, 20.0)),
            draw_param: None,
            blocks: vec![path_block(1, Boundary::new(0.0, 0.0, 20.0, 20.0), "M 0 0 L 2 0")],
        },
    };
    doc.annotations = vec![note(false), note(true)];

    let config = RenderConfig::default().with_clip_to_boundary(false);
    let mut device = RecordingDevice::new(210.0, 297.0);
    let report = renderer(config).render_page(&doc, 0, &mut device).unwrap();

    assert!(report.is_clean());
    assert_eq!(
        call_tags(&device),
        vec!["stroke", "begin_group", "stroke", "end_group", "stroke"]
    );

    let transforms: Vec<Matrix> = device
        .calls()
        .iter()
        .filter_map(|call| match call {
            DrawCall::StrokePath { transform, .. } => Some(*transform),
            _ => None,
        })
        .collect();
    // 100mm seal page squeezed into a 20mm box at (50, 50)
    assert_eq!(transforms[1].transform_point(100.0, 100.0), (70.0, 70.0));
    // Annotation appearance sits at its own boundary
    assert_eq!(transforms[2].transform_point(2.0, 0.0), (102.0, 100.0));
}

#[test]
fn test_failed_stamp_is_reported() {
    let mut doc = document(vec![page("1", Vec::new())], Resources::new());
    doc.stamps = vec![StampAnnotation {
        id: Some("42".into()),
        page_ref: "1".into(),
        boundary: Boundary::new(0.0, 0.0, 0.0, 20.0),
        clip: None,
        appearance: StampAppearance::Document(Arc::new(seal_document())),
    }];

    let mut device = RecordingDevice::new(210.0, 297.0);
    let report = renderer(RenderConfig::default())
        .render_page(&doc, 0, &mut device)
        .unwrap();

    assert_eq!(report.diagnostics.len(), 1);
    assert_eq!(report.diagnostics[0].block, BlockKind::Stamp);
    assert_eq!(report.diagnostics[0].id, Some(42));
    assert!(matches!(
        report.diagnostics[0].error,
        RenderError::InvalidBoundary(_)
    ));
    assert_eq!(device.open_depths(), (0, 0));
}

// ============================================================================
// Parallel rendering
// ============================================================================

#[cfg(feature = "parallel")]
#[test]
fn test_parallel_pages_keep_request_order() {
    let first = page(
        "1",
        vec![path_block(1, Boundary::new(0.0, 0.0, 10.0, 10.0), "M 0 0 L 1 1")],
    );
    let second = page(
        "2",
        vec![
            path_block(1, Boundary::new(0.0, 0.0, 10.0, 10.0), "M 0 0 L 1 1"),
            path_block(2, Boundary::new(0.0, 0.0, 10.0, 10.0), "M 1 1 L 2 2"),
        ],
    );
    let doc = document(vec![first, second], Resources::new());
    let renderer = renderer(RenderConfig::default());

    let results = renderer.render_pages_parallel(&doc, &[1, 0, 5], |page| {
        let (w, h) = device_size(page, 1.0);
        RecordingDevice::new(w, h)
    });

    assert_eq!(results.len(), 3);
    let (_, report) = results[0].as_ref().unwrap();
    assert_eq!(report.blocks_drawn, 2);
    let (_, report) = results[1].as_ref().unwrap();
    assert_eq!(report.blocks_drawn, 1);
    assert!(matches!(results[2], Err(RenderError::InvalidPageTree(_))));
}

// ============================================================================
// Raster output
// ============================================================================

#[cfg(feature = "rendering")]
#[test]
fn test_filled_path_reaches_pixels() {
    let mut unit = GraphicUnit::with_boundary(Boundary::new(5.0, 5.0, 10.0, 10.0));
    unit.id = Some(1);
    let mut square = PathObject::new(unit, "M 0 0 L 10 0 L 10 10 L 0 10 C");
    square.stroke = false;
    square.fill = true;
    square.fill_color = Some(ColorSpec::literal("255 0 0"));

    let doc = document(
        vec![Page {
            id: "1".into(),
            physical_box: Boundary::new(0.0, 0.0, 20.0, 20.0),
            layers: vec![Layer {
                id: None,
                draw_param: None,
                blocks: vec![Block::Path(square)],
            }],
        }],
        Resources::new(),
    );

    let mut device = SkiaDevice::new(20, 20).unwrap();
    device.clear(Color::white());
    renderer(RenderConfig::default())
        .render_page(&doc, 0, &mut device)
        .unwrap();

    let inside = device.pixmap().pixel(10, 10).unwrap();
    assert_eq!((inside.red(), inside.green(), inside.blue()), (255, 0, 0));
    let outside = device.pixmap().pixel(2, 2).unwrap();
    assert_eq!((outside.red(), outside.green(), outside.blue()), (255, 255, 255));
}
