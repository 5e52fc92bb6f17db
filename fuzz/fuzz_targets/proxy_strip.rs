//! Strip the GATT proxy header from arbitrary bytes.

#![no_main]

use bytes::Bytes;
use libfuzzer_sys::fuzz_target;
use meshprov_proto::ProxyHeader;

fuzz_target!(|data: &[u8]| {
    let message = Bytes::copy_from_slice(data);
    if let Ok(pdu) = ProxyHeader::strip(&message) {
        assert_eq!(ProxyHeader::wrap(&pdu), message);
    }
});
