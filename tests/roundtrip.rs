use proptest::prelude::*;
use qr_fountain::{
    transport, CodedBlock, Container, DecodeState, FountainDecoder, FountainEncoder, Ingested,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn framed(name: &str, content: &[u8]) -> Vec<u8> {
    Container::new(name, "application/octet-stream", content.to_vec())
        .encode()
        .unwrap()
}

proptest! {
    #[test]
    fn roundtrip_source_blocks(
        content in prop::collection::vec(any::<u8>(), 0..2048),
        slice_size in 1usize..256,
    ) {
        let frame = framed("payload.bin", &content);
        let encoder = FountainEncoder::new(frame.clone(), slice_size).unwrap();

        let mut decoder = FountainDecoder::new();
        for i in (0..encoder.symbol_count()).rev() {
            let wire = encoder.source_block(i).unwrap().encode().unwrap();
            let block = CodedBlock::decode(&wire, slice_size).unwrap();
            decoder.ingest(&block).unwrap();
        }

        prop_assert_eq!(decoder.state(), DecodeState::Complete);
        let recovered = decoder.reconstruct().unwrap();
        prop_assert_eq!(&recovered, &frame);

        let container = Container::decode(&recovered).unwrap();
        prop_assert_eq!(&container.meta.filename, "payload.bin");
        prop_assert_eq!(&container.meta.content_type, "application/octet-stream");
        prop_assert_eq!(container.content().unwrap(), content);
    }
}

#[test]
fn fountain_blocks_recover_through_lossy_channel() {
    let content: Vec<u8> = (0..5000u32).map(|i| (i * 31 % 251) as u8).collect();
    let frame = framed("lossy.dat", &content);

    let mut encoder =
        FountainEncoder::with_rng(frame.clone(), 200, StdRng::seed_from_u64(2024)).unwrap();
    let k = encoder.symbol_count() as u64;
    let mut channel = StdRng::seed_from_u64(7);
    let mut decoder = FountainDecoder::new();

    let mut received = 0u64;
    while !decoder.is_complete() {
        assert!(encoder.emitted() < 100_000, "decoder never converged");
        let block = encoder.next_block();
        // A third of the frames never make it to the camera.
        if channel.gen_bool(1.0 / 3.0) {
            continue;
        }
        let text = transport::encode_block(&block, "qrss://#").unwrap();
        let scanned = transport::decode_block(&text, "qrss://#", 200).unwrap();
        decoder.ingest(&scanned).unwrap();
        received += 1;
    }

    assert!(received >= k);
    let recovered = decoder.reconstruct().unwrap();
    assert_eq!(recovered, frame);
    assert_eq!(Container::decode(&recovered).unwrap().content().unwrap(), content);
}

#[test]
fn duplicated_and_reordered_blocks() {
    let frame = framed("dup.txt", b"every block arrives twice, out of order");
    let mut encoder = FountainEncoder::with_rng(frame.clone(), 8, StdRng::seed_from_u64(11)).unwrap();
    let mut decoder = FountainDecoder::new();

    let mut held = Vec::new();
    while !decoder.is_complete() {
        assert!(encoder.emitted() < 100_000, "decoder never converged");
        let block = encoder.next_block();
        held.push(block.clone());
        if held.len() == 4 {
            for b in held.drain(..).rev() {
                decoder.ingest(&b).unwrap();
                let again = decoder.ingest(&b).unwrap();
                assert!(matches!(
                    again,
                    Ingested::Redundant | Ingested::Duplicate
                ));
            }
        }
    }
    assert_eq!(decoder.reconstruct().unwrap(), frame);
}

#[test]
fn corrupted_payload_fails_checksum() {
    let frame = framed("bad.bin", &[0x55; 300]);
    let encoder = FountainEncoder::new(frame, 64).unwrap();
    let mut decoder = FountainDecoder::new();

    for i in 0..encoder.symbol_count() {
        let mut block = encoder.source_block(i).unwrap();
        if i == 1 {
            block.payload[3] ^= 0x80;
        }
        decoder.ingest(&block).unwrap();
    }
    assert!(decoder.is_complete());
    assert!(matches!(
        decoder.reconstruct(),
        Err(qr_fountain::FountainError::ChecksumFailure { .. })
    ));
}
