//! Fuzz target: `InboundMessage::new` (broker receive path)
//!
//! Splits the input into an arbitrary topic and payload and checks:
//! - No panics under any byte sequence
//! - Stored topic is a char-boundary prefix of the input topic
//! - Stored lengths never exceed the fixed capacities
//! - `truncated` is set exactly when something was cut
//!
//! cargo fuzz run fuzz_inbound_message

#![no_main]

use libfuzzer_sys::fuzz_target;
use thermolink::app::events::{INBOUND_PAYLOAD_CAP, INBOUND_TOPIC_CAP, InboundMessage};

fuzz_target!(|data: &[u8]| {
    let Some((&split, rest)) = data.split_first() else {
        return;
    };
    let cut = (split as usize * 4).min(rest.len());
    let (topic_bytes, payload) = rest.split_at(cut);
    let topic = String::from_utf8_lossy(topic_bytes);

    let msg = InboundMessage::new(&topic, payload);

    assert!(msg.topic.len() <= INBOUND_TOPIC_CAP);
    assert!(msg.payload.len() <= INBOUND_PAYLOAD_CAP);
    assert!(topic.starts_with(msg.topic.as_str()));
    assert!(payload.starts_with(&msg.payload));

    let cut_something = msg.topic.len() < topic.len() || msg.payload.len() < payload.len();
    assert_eq!(msg.truncated, cut_something);
});
