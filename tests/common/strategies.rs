use proptest::prelude::*;

use a2a_core::Message;

/// Conversation histories of up to 20 distinct messages
pub fn history_strategy() -> impl Strategy<Value = Vec<Message>> {
    prop::collection::vec("[a-z]{1,12}", 0..20).prop_map(|texts| {
        texts
            .into_iter()
            .enumerate()
            .map(|(index, text)| Message::user_text(format!("{index}:{text}")))
            .collect()
    })
}

/// Requested history lengths, including non-positive "unlimited" values
pub fn history_length_strategy() -> impl Strategy<Value = Option<i32>> {
    prop_oneof![Just(None), (-3i32..25).prop_map(Some)]
}
