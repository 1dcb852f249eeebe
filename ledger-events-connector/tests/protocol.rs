mod common;

use common::{event, event_with};
use ledger_events_connector::{
    events::{BlockCommit, EventParseError, BLOCK_COMMIT, STATE_DELTA},
    protocol::{
        encode, ClientEventsSubscribeResponse, EventFilter, EventSubscription, FilterType,
        SubscribeStatus,
    },
};
use prost::Message;

#[test]
fn event_subscription_survives_encoding() {
    let subscription = EventSubscription::new(STATE_DELTA).with_filters([
        EventFilter::address_prefix("a4d219"),
        EventFilter::exact("address", "a4d219aa"),
        EventFilter::regex_all("address", "^a4.*"),
    ]);

    let bytes = encode(&subscription).unwrap();
    let decoded = EventSubscription::decode(bytes.as_slice()).unwrap();

    assert_eq!(decoded, subscription);
    assert_eq!(decoded.event_type, STATE_DELTA);
    assert_eq!(decoded.filters.len(), 3);
    assert_eq!(decoded.filters[0].match_string, "a4d219.*");
    assert_eq!(decoded.filters[2].filter_type(), FilterType::RegexAll);
}

#[test]
fn filter_constructors_use_validator_filter_types() {
    assert_eq!(EventFilter::exact("k", "v").filter_type(), FilterType::SimpleAny);
    assert_eq!(EventFilter::exact_all("k", "v").filter_type(), FilterType::SimpleAll);
    assert_eq!(EventFilter::regex_any("k", "v").filter_type(), FilterType::RegexAny);
    assert_eq!(EventFilter::regex_all("k", "v").filter_type(), FilterType::RegexAll);

    let prefix = EventFilter::address_prefix("a4d219");
    assert_eq!(prefix.key, "address");
    assert_eq!(prefix.filter_type(), FilterType::RegexAny);
}

#[test]
fn unknown_status_values_read_as_unset() {
    let response = ClientEventsSubscribeResponse {
        status: 42,
        response_message: String::new(),
    };
    assert_eq!(response.status(), SubscribeStatus::StatusUnset);
}

#[test]
fn block_commit_is_parsed_from_attributes() {
    let event = event_with(
        BLOCK_COMMIT,
        &[
            ("block_id", "b2"),
            ("block_num", "17"),
            ("state_root_hash", "root"),
            ("previous_block_id", "b1"),
        ],
    );

    let commit = BlockCommit::try_from(&event).unwrap();
    assert_eq!(
        commit,
        BlockCommit {
            block_id: "b2".into(),
            block_num: 17,
            state_root_hash: "root".into(),
            previous_block_id: "b1".into(),
        }
    );
}

#[test]
fn block_commit_rejects_other_events_and_bad_attributes() {
    assert!(matches!(
        BlockCommit::try_from(&event(STATE_DELTA, b"")),
        Err(EventParseError::WrongType { .. })
    ));

    let missing = event_with(BLOCK_COMMIT, &[("block_num", "1")]);
    assert_eq!(
        BlockCommit::try_from(&missing),
        Err(EventParseError::MissingAttribute("block_id"))
    );

    let bad_num = event_with(BLOCK_COMMIT, &[("block_num", "seventeen")]);
    assert_eq!(
        BlockCommit::try_from(&bad_num),
        Err(EventParseError::InvalidAttribute {
            key: "block_num",
            value: "seventeen".into(),
        })
    );
}

#[test]
fn event_display_lists_attributes_and_data_size() {
    let mut event = event_with(STATE_DELTA, &[("address", "a4d219ff"), ("kind", "set")]);
    event.data = vec![1, 2, 3];

    assert_eq!(
        event.to_string(),
        "sawtooth/state-delta [address=a4d219ff, kind=set] (3 bytes of data)"
    );
    assert_eq!(event.attribute("kind"), Some("set"));
    assert_eq!(event.attribute("missing"), None);
}
