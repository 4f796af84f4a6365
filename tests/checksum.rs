use semq::queue::checksum;
use semq::queue::layout::Message;

#[test]
fn empty_payload_checksum_is_kind() {
    assert_eq!(checksum::compute(0, &[]), 0);
    assert_eq!(checksum::compute(7, &[]), 7);
    assert_eq!(checksum::compute(255, &[]), 255);
}

#[test]
fn sum_matches_manual_accumulation() {
    fastrand::seed(0x5eed);
    for _ in 0..100 {
        let kind = fastrand::u8(..);
        let len = fastrand::usize(1..=255);
        let payload: Vec<u8> = (0..len).map(|_| fastrand::u8(..)).collect();

        let total = payload.iter().fold(kind as u32, |sum, &b| sum + b as u32);
        assert_eq!(checksum::compute(kind, &payload), (total % 65536) as u16);
    }
}

#[test]
fn wraps_at_16_bits() {
    // 1000 bytes of 0xFF plus a 0xFF kind overflows u16 several times.
    let payload = vec![0xFFu8; 1000];
    let expected = ((255u32 * 1001) % 65536) as u16;
    assert_eq!(checksum::compute(0xFF, &payload), expected);
}

#[test]
fn message_stamp_matches_compute() {
    let data = [1u8, 2, 3, 4, 5];
    let msg = Message::new(42, &data);
    assert_eq!(msg.checksum(), checksum::compute(42, &data));
    assert_eq!(msg.size, 5);
    assert_eq!(msg.data(), &data);
    assert!(msg.verify());
}

#[test]
fn size_zero_message_checksums_kind_alone() {
    let msg = Message::new(9, &[]);
    assert_eq!(msg.size, 0);
    assert_eq!(msg.checksum(), 9);
    assert!(msg.verify());
}

#[test]
fn corruption_within_declared_size_is_detected() {
    let mut msg = Message::new(1, &[10, 20, 30]);
    msg.payload[1] = msg.payload[1].wrapping_add(1);
    assert!(!msg.verify());
}

#[test]
fn corruption_beyond_declared_size_is_ignored() {
    let mut msg = Message::new(1, &[10, 20, 30]);
    // Bytes past `size` are padding; the checksum never covers them.
    msg.payload[100] = 0xAB;
    assert!(msg.verify());
}

#[test]
fn stored_checksum_corruption_is_detected() {
    let mut msg = Message::new(1, &[10, 20, 30]);
    msg.checksum[0] ^= 0xFF;
    assert!(!msg.verify());
}

#[test]
#[should_panic(expected = "declared payload length")]
fn payload_longer_than_declared_maximum_panics() {
    let data = [0u8; 256];
    let _ = Message::new(0, &data);
}
