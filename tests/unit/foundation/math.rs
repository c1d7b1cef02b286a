use super::*;

#[test]
fn rng_is_deterministic_and_bounded() {
    let mut a = Rng64::new(7);
    let mut b = Rng64::new(7);
    for _ in 0..100 {
        let x = a.jitter(2.0);
        assert_eq!(x, b.jitter(2.0));
        assert!((-2.0..2.0).contains(&x));
    }
}

#[test]
fn seed_depends_on_inputs() {
    assert_eq!(seed_from(&[1.0, 2.0]), seed_from(&[1.0, 2.0]));
    assert_ne!(seed_from(&[1.0, 2.0]), seed_from(&[2.0, 1.0]));
}

#[test]
fn mul_div255_rounds() {
    assert_eq!(mul_div255_u8(255, 255), 255);
    assert_eq!(mul_div255_u8(128, 255), 128);
    assert_eq!(mul_div255_u8(0, 200), 0);
}
