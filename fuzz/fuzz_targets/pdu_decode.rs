//! Decode arbitrary bytes as a provisioning PDU.
//!
//! Anything that decodes must encode back to the same bytes.

#![no_main]

use libfuzzer_sys::fuzz_target;
use meshprov_proto::{PduFrame, ProvisioningData};

fuzz_target!(|data: &[u8]| {
    if let Ok(frame) = PduFrame::decode(data) {
        assert_eq!(frame.encode().as_ref(), data);
    }

    if let Ok(provisioning) = ProvisioningData::from_bytes(data) {
        assert_eq!(provisioning.to_bytes().as_slice(), data);
    }
});
