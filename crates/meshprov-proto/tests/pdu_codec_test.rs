//! Codec property tests.
//!
//! Decoding sees bytes written by anyone in radio range, so the interesting
//! properties are that it never panics and that whatever it accepts encodes
//! back to the same bytes.

use meshprov_proto::{
    Algorithm, Algorithms, AuthenticationMethod, Capabilities, DecodeError, ErrorCode,
    InputAction, InputOobActions, OutputAction, OutputOobActions, PduFrame, PduType,
    PublicKeyType, PublicKeyTypes, StartParams, StaticOobTypes,
};
use proptest::prelude::*;

fn capabilities_strategy() -> impl Strategy<Value = Capabilities> {
    (
        any::<u8>(),
        any::<u16>(),
        any::<u8>(),
        any::<u8>(),
        any::<u8>(),
        any::<u16>(),
        any::<u8>(),
        any::<u16>(),
    )
        .prop_map(|(elements, algs, pk, st, out_size, out_act, in_size, in_act)| Capabilities {
            element_count: elements,
            algorithms: Algorithms::from_bits_retain(algs),
            public_key_types: PublicKeyTypes::from_bits_retain(pk),
            static_oob_types: StaticOobTypes::from_bits_retain(st),
            output_oob_size: out_size,
            output_oob_actions: OutputOobActions::from_bits_retain(out_act),
            input_oob_size: in_size,
            input_oob_actions: InputOobActions::from_bits_retain(in_act),
        })
}

fn auth_method_strategy() -> impl Strategy<Value = AuthenticationMethod> {
    let output = prop_oneof![
        Just(OutputAction::Blink),
        Just(OutputAction::Beep),
        Just(OutputAction::Vibrate),
        Just(OutputAction::OutputNumeric),
        Just(OutputAction::OutputAlphanumeric),
    ];
    let input = prop_oneof![
        Just(InputAction::Push),
        Just(InputAction::Twist),
        Just(InputAction::InputNumeric),
        Just(InputAction::InputAlphanumeric),
    ];

    prop_oneof![
        Just(AuthenticationMethod::NoOob),
        Just(AuthenticationMethod::StaticOob),
        (output, 1..=8u8)
            .prop_map(|(action, size)| AuthenticationMethod::OutputOob { action, size }),
        (input, 1..=8u8).prop_map(|(action, size)| AuthenticationMethod::InputOob { action, size }),
    ]
}

fn start_strategy() -> impl Strategy<Value = StartParams> {
    (
        prop_oneof![Just(Algorithm::P256CmacAes128), Just(Algorithm::P256HmacSha256)],
        prop_oneof![Just(PublicKeyType::InBand), Just(PublicKeyType::OutOfBand)],
        auth_method_strategy(),
    )
        .prop_map(|(algorithm, public_key_type, auth_method)| StartParams {
            algorithm,
            public_key_type,
            auth_method,
        })
}

fn frame_strategy() -> impl Strategy<Value = PduFrame> {
    let bytes = || prop::collection::vec(any::<u8>(), 0..80);

    prop_oneof![
        any::<u8>().prop_map(|attention_duration| PduFrame::Invite { attention_duration }),
        capabilities_strategy().prop_map(PduFrame::Capabilities),
        start_strategy().prop_map(PduFrame::Start),
        bytes().prop_map(|key| PduFrame::PublicKey { key }),
        bytes().prop_map(|value| PduFrame::Confirmation { value }),
        bytes().prop_map(|value| PduFrame::Random { value }),
        (bytes(), any::<[u8; 8]>()).prop_map(|(encrypted, mic)| PduFrame::Data { encrypted, mic }),
        Just(PduFrame::Complete),
        any::<u8>()
            .prop_map(|code| PduFrame::Failed { error_code: ErrorCode::from_u8(code) }),
    ]
}

proptest! {
    #[test]
    fn prop_decode_inverts_encode(frame in frame_strategy()) {
        let wire = frame.encode();
        prop_assert_eq!(wire.first().copied(), Some(frame.pdu_type().to_u8()));
        prop_assert_eq!(PduFrame::decode(&wire), Ok(frame));
    }

    #[test]
    fn prop_decode_never_panics(bytes in prop::collection::vec(any::<u8>(), 0..128)) {
        let _ = PduFrame::decode(&bytes);
    }

    #[test]
    fn prop_accepted_frames_reencode_verbatim(bytes in prop::collection::vec(any::<u8>(), 0..128)) {
        if let Ok(frame) = PduFrame::decode(&bytes) {
            let encoded = frame.encode();
            prop_assert_eq!(encoded.as_ref(), bytes.as_slice());
        }
    }

    #[test]
    fn prop_truncated_fixed_frames_rejected(
        discriminant in prop_oneof![Just(0u8), Just(1u8), Just(2u8), Just(8u8)]
    ) {
        let result = PduFrame::decode(&[discriminant]);
        let rejected_for_length = matches!(result, Err(DecodeError::InvalidLength { .. }));
        prop_assert!(rejected_for_length);
    }
}

#[test]
fn every_prefix_of_a_valid_start_is_rejected_cleanly() {
    let frame = PduFrame::Start(StartParams {
        algorithm: Algorithm::P256CmacAes128,
        public_key_type: PublicKeyType::InBand,
        auth_method: AuthenticationMethod::InputOob { action: InputAction::Twist, size: 3 },
    });
    let wire = frame.encode();

    for len in 0..wire.len() {
        assert!(PduFrame::decode(&wire[..len]).is_err(), "prefix of {len} bytes decoded");
    }
    assert_eq!(PduFrame::decode(&wire).map(|f| f.pdu_type()), Ok(PduType::Start));
}
