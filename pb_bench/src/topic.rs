use pb_bus::TopicId;

/// Control-plane and data topics of the benchmark protocol.
///
/// The wire ids are fixed so independently built roles interoperate;
/// everything except `Data` is an empty-payload signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    /// Benchmark payload traffic
    Data,
    /// A publisher has a live connection and is waiting for subscribers
    PublisherReady,
    /// A publisher finished its send loop
    PublisherDone,
    /// A subscriber is attached and ready to count
    SubscriberReady,
    /// A subscriber left its receive loop
    SubscriberDone,
    /// Global abort broadcast
    Exit,
}

impl Topic {
    pub const fn id(self) -> TopicId {
        match self {
            Topic::Exit => 0,
            Topic::Data => 1234,
            Topic::PublisherReady => 5677,
            Topic::PublisherDone => 5678,
            Topic::SubscriberReady => 5679,
            Topic::SubscriberDone => 5680,
        }
    }

    pub const fn from_id(id: TopicId) -> Option<Self> {
        match id {
            0 => Some(Topic::Exit),
            1234 => Some(Topic::Data),
            5677 => Some(Topic::PublisherReady),
            5678 => Some(Topic::PublisherDone),
            5679 => Some(Topic::SubscriberReady),
            5680 => Some(Topic::SubscriberDone),
            _ => None,
        }
    }

    /// Dense index for the four readiness/completion signals; `None` for
    /// topics the barrier does not count
    pub const fn signal_index(self) -> Option<usize> {
        match self {
            Topic::PublisherReady => Some(0),
            Topic::PublisherDone => Some(1),
            Topic::SubscriberReady => Some(2),
            Topic::SubscriberDone => Some(3),
            Topic::Data | Topic::Exit => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Topic; 6] =
        [Topic::Data, Topic::PublisherReady, Topic::PublisherDone, Topic::SubscriberReady, Topic::SubscriberDone, Topic::Exit];

    #[test]
    fn test_id_roundtrip() {
        for topic in ALL {
            assert_eq!(Topic::from_id(topic.id()), Some(topic));
        }
    }

    #[test]
    fn test_unknown_id() {
        assert_eq!(Topic::from_id(9999), None);
    }

    #[test]
    fn test_signal_indices_are_dense_and_distinct() {
        let mut seen = [false; 4];
        for topic in ALL {
            if let Some(idx) = topic.signal_index() {
                assert!(!seen[idx]);
                seen[idx] = true;
            }
        }
        assert!(seen.iter().all(|s| *s));
    }

    #[test]
    fn test_data_and_exit_are_not_signals() {
        assert_eq!(Topic::Data.signal_index(), None);
        assert_eq!(Topic::Exit.signal_index(), None);
    }
}
