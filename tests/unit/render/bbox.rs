use super::*;

fn approx(a: Rect, b: Rect) -> bool {
    (a.x0 - b.x0).abs() < 1e-9
        && (a.y0 - b.y0).abs() < 1e-9
        && (a.x1 - b.x1).abs() < 1e-9
        && (a.y1 - b.y1).abs() < 1e-9
}

#[test]
fn virgin_source_is_ignored() {
    let mut dst = BoundingBox::with_rect(Rect::new(0.0, 0.0, 1.0, 1.0), Affine::IDENTITY);
    dst.insert(&BoundingBox::new(Affine::scale(3.0)));
    dst.clip(&BoundingBox::new(Affine::scale(3.0)));
    assert_eq!(dst.rect, Rect::new(0.0, 0.0, 1.0, 1.0));
}

#[test]
fn insert_into_virgin_adopts_projected_rect() {
    let mut dst = BoundingBox::new(Affine::IDENTITY);
    let src = BoundingBox::with_rect(Rect::new(1.0, 1.0, 2.0, 3.0), Affine::scale(2.0));
    dst.insert(&src);
    assert!(!dst.virgin);
    assert!(approx(dst.rect, Rect::new(2.0, 2.0, 4.0, 6.0)));
}

#[test]
fn insert_reprojects_into_destination_basis() {
    let mut dst = BoundingBox::with_rect(Rect::new(0.0, 0.0, 1.0, 1.0), Affine::scale(10.0));
    let src = BoundingBox::with_rect(Rect::new(10.0, 10.0, 20.0, 20.0), Affine::IDENTITY);
    dst.insert(&src);
    assert!(approx(dst.rect, Rect::new(0.0, 0.0, 2.0, 2.0)));
}

#[test]
fn insert_of_rotated_box_takes_all_corners() {
    let mut dst = BoundingBox::new(Affine::IDENTITY);
    let src = BoundingBox::with_rect(
        Rect::new(0.0, 0.0, 2.0, 2.0),
        Affine::rotate(std::f64::consts::FRAC_PI_4),
    );
    dst.insert(&src);
    let half_diag = 2.0_f64.sqrt();
    assert!(approx(
        dst.rect,
        Rect::new(-half_diag, 0.0, half_diag, 2.0 * half_diag)
    ));
}

#[test]
fn clip_intersects_in_common_basis() {
    let mut dst = BoundingBox::with_rect(Rect::new(0.0, 0.0, 10.0, 10.0), Affine::IDENTITY);
    let src = BoundingBox::with_rect(
        Rect::new(0.0, 0.0, 1.0, 1.0),
        Affine::new([20.0, 0.0, 0.0, 4.0, 5.0, 2.0]),
    );
    dst.clip(&src);
    assert!(approx(dst.rect, Rect::new(5.0, 2.0, 10.0, 6.0)));
}

#[test]
fn unit_transform_maps_unit_square() {
    let b = BoundingBox::with_rect(Rect::new(3.0, 4.0, 13.0, 24.0), Affine::IDENTITY);
    let p = b.unit_transform() * Point::new(1.0, 1.0);
    assert_eq!(p, Point::new(13.0, 24.0));
}
