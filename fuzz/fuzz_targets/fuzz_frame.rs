#![no_main]

use bytes::BytesMut;
use libfuzzer_sys::fuzz_target;
use rcon_protocol::core::codec::FrameCodec;
use rcon_protocol::core::frame::Frame;
use tokio_util::codec::Decoder;

fuzz_target!(|data: &[u8]| {
    // Single-frame parse must never panic
    let _ = Frame::from_bytes(data);

    // Nor may stream reassembly, whatever the bytes claim about their size
    let mut codec = FrameCodec::with_max_frame_size(64 * 1024);
    let mut buf = BytesMut::from(data);
    while let Ok(Some(_)) = codec.decode(&mut buf) {}
});
