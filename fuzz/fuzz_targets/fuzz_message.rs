#![no_main]

use std::sync::Arc;

use libfuzzer_sys::fuzz_target;
use auth_rpc::core::serialization::decode;
use auth_rpc::directory::ServiceRegistry;
use auth_rpc::protocol::dispatcher::Dispatcher;

fuzz_target!(|data: &[u8]| {
    let _ = decode(data);

    // whatever arrives, the dispatcher answers with a response
    if let Ok(dispatcher) = Dispatcher::for_registry(Arc::new(ServiceRegistry::in_memory())) {
        let _ = dispatcher.handle_bytes(data);
    }
});
