//! Cross-connection delivery: presence fan-out, direct messages, signals.
//!
//! Nothing here holds the registry lock while writing to a socket, and
//! nothing is retried or queued.

use crate::clock;
use crate::protocol::{AckStatus, ContactInfo, Msg, PresenceStatus, UserName};
use crate::server::state::ServerState;
use crate::store::{StoreError, UserId};
use crate::{sink_debug, sink_info};

pub const MIN_INTENSITY: u8 = 1;
pub const MAX_INTENSITY: u8 = 10;

/// Tell every other online user that `username` is now `status`.
/// Returns how many peers the event reached.
pub fn broadcast_presence(state: &ServerState, username: &str, status: PresenceStatus) -> usize {
    let event = Msg::Presence {
        username: username.to_owned(),
        status,
    };

    let mut reached = 0;
    for (peer, session) in state.registry.snapshot() {
        if peer == username {
            continue;
        }
        if session.send(&event) {
            reached += 1;
        } else {
            sink_debug!(state.log, "presence for {} not delivered to {}", username, peer);
        }
    }

    sink_info!(
        state.log,
        "presence: {} is {:?} (notified {} peers)",
        username,
        status,
        reached
    );
    reached
}

/// One delivery attempt of a direct message. The result is the sender's ack.
pub fn deliver_message(
    state: &ServerState,
    from: &str,
    to: &str,
    content: String,
    msg_id: &str,
) -> AckStatus {
    if to.is_empty() || content.is_empty() {
        return AckStatus::InvalidMessage;
    }
    let Some(recipient) = state.registry.lookup(to) else {
        return AckStatus::UserOffline;
    };

    let event = Msg::ReceiveMessage {
        from: from.to_owned(),
        content,
        msg_id: msg_id.to_owned(),
        timestamp: clock::iso8601_utc(clock::now_millis()),
    };
    if recipient.send(&event) {
        sink_info!(state.log, "message {} -> {}", from, to);
        AckStatus::Delivered
    } else {
        sink_debug!(state.log, "message {} -> {} failed to write", from, to);
        AckStatus::DeliveryFailed
    }
}

/// Forward an attention signal. `false` means the recipient is offline; a
/// failed write to an online recipient is only logged.
pub fn forward_signal(state: &ServerState, from: &str, to: &str, intensity: u8) -> bool {
    let Some(recipient) = state.registry.lookup(to) else {
        return false;
    };
    let intensity = intensity.clamp(MIN_INTENSITY, MAX_INTENSITY);
    let event = Msg::SignalReceive {
        from: from.to_owned(),
        intensity,
    };
    if recipient.send(&event) {
        sink_info!(state.log, "signal {} -> {} (intensity {})", from, to, intensity);
    } else {
        sink_debug!(state.log, "signal {} -> {} failed to write", from, to);
    }
    true
}

/// Contacts of `owner` with presence read from the registry right now.
pub fn contact_list(state: &ServerState, owner: UserId) -> Result<Vec<ContactInfo>, StoreError> {
    let names = state.store.list_contacts(owner)?;
    Ok(names
        .into_iter()
        .map(|username| {
            let status = PresenceStatus::from_online(state.registry.contains(&username));
            ContactInfo { username, status }
        })
        .collect())
}

/// Online usernames other than `exclude`, sorted.
pub fn online_users(state: &ServerState, exclude: &str) -> Vec<UserName> {
    state
        .registry
        .usernames()
        .into_iter()
        .filter(|name| name != exclude)
        .collect()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use crate::server::testing::{MemoryWire, session_pair, test_state};
    use crate::store::Store;
    use std::sync::Arc;

    fn online(state: &ServerState, id: u64, name: &str) -> MemoryWire {
        let (session, wire) = session_pair(id);
        assert!(state.registry.insert(name, Arc::new(session)));
        wire
    }

    #[test]
    fn presence_skips_subject_and_survives_dead_peers() {
        let state = test_state();
        let a = online(&state, 1, "a");
        let b = online(&state, 2, "b");
        let c = online(&state, 3, "c");
        b.fail_writes();

        assert_eq!(broadcast_presence(&state, "a", PresenceStatus::Online), 1);
        assert!(a.frames().is_empty());
        assert!(b.frames().is_empty());
        assert_eq!(
            c.frames(),
            vec![Msg::Presence {
                username: "a".into(),
                status: PresenceStatus::Online
            }]
        );
    }

    #[test]
    fn message_outcomes() {
        let state = test_state();
        let bob = online(&state, 1, "bob");

        assert_eq!(
            deliver_message(&state, "alice", "", "hi".into(), "m0"),
            AckStatus::InvalidMessage
        );
        assert_eq!(
            deliver_message(&state, "alice", "bob", String::new(), "m1"),
            AckStatus::InvalidMessage
        );
        assert_eq!(
            deliver_message(&state, "alice", "carol", "hi".into(), "m2"),
            AckStatus::UserOffline
        );
        assert!(bob.frames().is_empty());

        assert_eq!(
            deliver_message(&state, "alice", "bob", "hi".into(), "m3"),
            AckStatus::Delivered
        );
        match &bob.frames()[..] {
            [Msg::ReceiveMessage { from, content, msg_id, timestamp }] => {
                assert_eq!(from, "alice");
                assert_eq!(content, "hi");
                assert_eq!(msg_id, "m3");
                assert!(timestamp.ends_with('Z'));
            }
            other => panic!("unexpected frames {other:?}"),
        }

        bob.fail_writes();
        assert_eq!(
            deliver_message(&state, "alice", "bob", "again".into(), "m4"),
            AckStatus::DeliveryFailed
        );
    }

    #[test]
    fn signal_intensity_is_clamped() {
        let state = test_state();
        let bob = online(&state, 1, "bob");

        assert!(forward_signal(&state, "alice", "bob", 0));
        assert!(forward_signal(&state, "alice", "bob", 200));
        assert!(!forward_signal(&state, "alice", "nobody", 5));

        let intensities: Vec<u8> = bob
            .frames()
            .into_iter()
            .map(|m| match m {
                Msg::SignalReceive { intensity, .. } => intensity,
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert_eq!(intensities, vec![1, 10]);
    }

    #[test]
    fn contact_presence_is_read_live() {
        let state = test_state();
        let me = state.store.register_account("me", "pw12").unwrap();
        state.store.register_account("zed", "pw12").unwrap();
        state.store.register_account("amy", "pw12").unwrap();
        state.store.add_contact(me, "zed").unwrap();
        state.store.add_contact(me, "amy").unwrap();

        let before = contact_list(&state, me).unwrap();
        assert!(before.iter().all(|c| c.status == PresenceStatus::Offline));

        let _zed = online(&state, 1, "zed");
        let after = contact_list(&state, me).unwrap();
        assert_eq!(
            after,
            vec![
                ContactInfo {
                    username: "amy".into(),
                    status: PresenceStatus::Offline
                },
                ContactInfo {
                    username: "zed".into(),
                    status: PresenceStatus::Online
                },
            ]
        );
    }

    #[test]
    fn online_users_excludes_caller() {
        let state = test_state();
        let _b = online(&state, 1, "bob");
        let _a = online(&state, 2, "alice");
        let _c = online(&state, 3, "carol");
        assert_eq!(online_users(&state, "bob"), vec!["alice", "carol"]);
    }
}
