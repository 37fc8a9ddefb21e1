#![no_main]

use libfuzzer_sys::fuzz_target;
use periph_hal::coprocessor::protocol::ResponseHeader;
use periph_hal::coprocessor::{state, ConnectEventData, EventFrame, Response, Session};

fuzz_target!(|data: &[u8]| {
    // Decoders must reject malformed frames without panicking
    let _ = Response::decode(data);
    let _ = ResponseHeader::decode(data);
    let _ = ConnectEventData::decode(data);

    if let Ok(event) = EventFrame::decode(data) {
        // A decoded frame re-encodes to the bytes it was read from
        let encoded = event.encode();
        assert_eq!(&encoded[..], &data[..encoded.len()]);

        // Any event applies to any session without panicking
        for session in [Session::default(), Session::default().begin_connect().unwrap()] {
            let _ = state::apply(&session, &event);
        }
    }
});
