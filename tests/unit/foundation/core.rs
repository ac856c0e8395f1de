use super::*;

#[test]
fn irect_intersection_and_emptiness() {
    let a = IRect::new(0, 0, 10, 10);
    let b = IRect::new(5, -3, 20, 4);
    assert_eq!(a.intersect(b), IRect::new(5, 0, 10, 4));
    assert!(!a.intersect(b).is_empty());
    assert!(IRect::new(4, 4, 4, 9).is_empty());
    assert!(IRect::new(6, 0, 2, 3).is_empty());
    assert_eq!(IRect::new(6, 0, 2, 3).width(), 0);
}

#[test]
fn irect_from_rect_truncates_toward_zero() {
    let r = IRect::from_rect_trunc(Rect::new(-1.7, 2.9, 10.2, 11.99));
    assert_eq!(r, IRect::new(-1, 2, 10, 11));
}

#[test]
fn irect_clamps_to_surface() {
    let r = IRect::new(-4, -4, 40, 3).clamp_to_size(16, 8);
    assert_eq!(r, IRect::new(0, 0, 16, 3));
}

#[test]
fn length_percent_resolves_against_reference() {
    assert_eq!(Length::Percent(-0.1).normalize(1.0), -0.1);
    assert_eq!(Length::Percent(0.5).normalize(200.0), 100.0);
    assert_eq!(Length::User(7.0).normalize(200.0), 7.0);
}

#[test]
fn channel_map_parses_orders() {
    let bgra = ChannelMap::from_order("2103").unwrap();
    assert_eq!(bgra, ChannelMap::BGRA);
    assert_eq!(bgra.of(Channel::R), 2);
    assert_eq!(bgra.alpha(), 3);
    assert_eq!(ChannelMap::from_order("0123").unwrap(), ChannelMap::RGBA);

    assert!(ChannelMap::from_order("012").is_err());
    assert!(ChannelMap::from_order("0124").is_err());
    assert!(ChannelMap::from_order("0012").is_err());
}

#[test]
fn color_premultiplies_with_rounding() {
    assert_eq!(Color::rgba(255, 128, 0, 128).to_premul(), [128, 64, 0, 128]);
    assert_eq!(Color::WHITE.to_premul(), [255, 255, 255, 255]);
}

#[test]
fn color_alpha_defaults_to_opaque_in_json() {
    let c: Color = serde_json::from_str(r#"{"r":1,"g":2,"b":3}"#).unwrap();
    assert_eq!(c, Color::rgb(1, 2, 3));
}
