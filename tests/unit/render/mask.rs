use super::*;
use crate::foundation::core::{Affine, Color};
use crate::scene::{Canvas, Document, Resources};

fn doc() -> Document {
    Document {
        canvas: Canvas {
            width: 4,
            height: 4,
        },
        resources: Resources::default(),
        root: Node::group(Vec::new()),
    }
}

fn fill(color: Color) -> Node {
    Node::shape(
        Shape::Rect {
            x: 0.0,
            y: 0.0,
            width: 4.0,
            height: 4.0,
        },
        color,
    )
}

#[test]
fn luminance_weights_channels() {
    let buf = ImageBuffer::from_premul_bytes(
        4,
        1,
        vec![
            255, 255, 255, 255, //
            255, 0, 0, 255, //
            0, 255, 0, 255, //
            0, 0, 255, 255,
        ],
    )
    .unwrap();
    let lum = luminance_coverage(&buf, ChannelMap::RGBA, 255);
    assert_eq!(lum, vec![255, 54, 183, 18]);
    let half = luminance_coverage(&buf, ChannelMap::RGBA, 128);
    assert_eq!(half[0], 128);
}

#[test]
fn luminance_respects_channel_order() {
    let buf = ImageBuffer::from_premul_bytes(1, 1, vec![0, 0, 255, 255]).unwrap();
    assert_eq!(luminance_coverage(&buf, ChannelMap::RGBA, 255), vec![18]);
    assert_eq!(luminance_coverage(&buf, ChannelMap::BGRA, 255), vec![54]);
}

#[test]
fn default_region_grows_the_bbox() {
    let bbox = BoundingBox::with_rect(Rect::new(10.0, 20.0, 20.0, 40.0), Affine::IDENTITY);
    let r = Mask::default().region(&bbox, (100.0, 100.0));
    assert!((r.x0 - 9.0).abs() < 1e-9);
    assert!((r.y0 - 18.0).abs() < 1e-9);
    assert!((r.x1 - 21.0).abs() < 1e-9);
    assert!((r.y1 - 42.0).abs() < 1e-9);
}

#[test]
fn user_space_region_uses_viewport_percentages() {
    let mask = Mask {
        units: CoordUnits::UserSpaceOnUse,
        x: Length::Percent(0.5),
        y: Length::User(1.0),
        width: Length::Percent(0.25),
        height: Length::User(2.0),
        ..Mask::default()
    };
    let bbox = BoundingBox::new(Affine::IDENTITY);
    assert_eq!(mask.region(&bbox, (8.0, 8.0)), Rect::new(4.0, 1.0, 6.0, 3.0));
}

#[test]
fn region_clips_mask_content() {
    let d = doc();
    let mut ctx = DrawingCtx::new(&d, 4, 4, ChannelMap::RGBA).unwrap();
    let mask = Mask {
        units: CoordUnits::UserSpaceOnUse,
        x: Length::User(0.0),
        y: Length::User(0.0),
        width: Length::User(2.0),
        height: Length::User(4.0),
        children: vec![fill(Color::WHITE)],
        ..Mask::default()
    };
    let cov = ctx
        .mask_coverage(&mask, &BoundingBox::new(Affine::IDENTITY), 255)
        .unwrap();
    assert_eq!(&cov[0..4], &[255, 255, 0, 0]);
    assert_eq!(ctx.layer_depth(), 0);
}

#[test]
fn content_units_follow_the_bbox() {
    let d = doc();
    let mut ctx = DrawingCtx::new(&d, 4, 4, ChannelMap::RGBA).unwrap();
    let mask = Mask {
        content_units: CoordUnits::ObjectBoundingBox,
        children: vec![Node::shape(
            Shape::Rect {
                x: 0.0,
                y: 0.0,
                width: 0.5,
                height: 0.5,
            },
            Color::WHITE,
        )],
        ..Mask::default()
    };
    let bbox = BoundingBox::with_rect(Rect::new(0.0, 0.0, 4.0, 4.0), Affine::IDENTITY);
    let cov = ctx.mask_coverage(&mask, &bbox, 255).unwrap();
    let covered: Vec<usize> = (0..16).filter(|&i| cov[i] == 255).collect();
    assert_eq!(covered, vec![0, 1, 4, 5]);
    assert_eq!(ctx.affine(), Affine::IDENTITY);
}
