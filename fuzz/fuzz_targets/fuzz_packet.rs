#![no_main]

use libfuzzer_sys::fuzz_target;
use auth_rpc::Packet;

fuzz_target!(|data: &[u8]| {
    // Packet parsing must fail cleanly on any input
    let _ = Packet::from_bytes(data);
});
