#![no_main]

use hypertext::{Kind, Message, Result};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let body_len = data.first().copied().unwrap_or(0) as usize;

    let mut req = Message::new();
    if req.parse_request(data, body_len).is_ok() {
        check(
            &req,
            |m, compat| m.output_request(None, compat),
            |m, compat| m.to_request_bytes(compat),
        );
    } else {
        assert_eq!(req.kind(), Kind::Empty);
    }

    let mut res = Message::new();
    if res.parse_response(data, body_len).is_ok() {
        check(
            &res,
            |m, compat| m.output_response(None, true, compat),
            |m, compat| m.to_response_bytes(true, compat),
        );
    } else {
        assert_eq!(res.kind(), Kind::Empty);
    }
});

fn check(
    m: &Message,
    measure: impl Fn(&Message, bool) -> Result<usize>,
    write: impl Fn(&Message, bool) -> Result<Vec<u8>>,
) {
    for compat in [true, false] {
        let len = measure(m, compat).expect("measure parsed message");
        let bytes = write(m, compat).expect("write parsed message");
        assert_eq!(bytes.len(), len);
    }
}
