use super::*;

#[test]
fn effect_seed_is_stable_and_phase_sensitive() {
    assert_eq!(effect_seed("glitch", 40), effect_seed("glitch", 40));
    assert_ne!(effect_seed("glitch", 40), effect_seed("glitch", 41));
    assert_ne!(effect_seed("glitch", 40), effect_seed("bloom", 40));
}

#[test]
fn fnv_continues_across_chunks() {
    let whole = fnv1a(FNV_OFFSET, b"scenereel");
    let split = fnv1a(fnv1a(FNV_OFFSET, b"scene"), b"reel");
    assert_eq!(whole, split);
    assert_ne!(sub_seed(whole, 0), sub_seed(whole, 1));
}

#[test]
fn mul_div255_rounds() {
    assert_eq!(mul_div255(255, 255), 255);
    assert_eq!(mul_div255(255, 0), 0);
    assert_eq!(mul_div255(128, 255), 128);
    assert_eq!(mul_div255(255, 128), 128);
    assert_eq!(mul_div255(1, 127), 0);
    assert_eq!(mul_div255(1, 128), 1);
}

#[test]
fn lerp_endpoints() {
    assert_eq!(lerp(100.0, 150.0, 0.0), 100.0);
    assert_eq!(lerp(100.0, 150.0, 1.0), 150.0);
    assert_eq!(lerp(100.0, 150.0, 0.5), 125.0);
}
