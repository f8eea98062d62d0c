//! Per-topic inbound queues
//!
//! Envelopes received but not yet consumed by a wait are filed by topic and
//! stamped with their arrival number. A wait for one topic skips past others
//! without dropping them; a wait for "whatever is next" takes the lowest stamp
//! across all topics, so arrival order is preserved.

use std::collections::VecDeque;

use crate::protocol::ServerEnvelope;

/// Routing class of an inbound envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    /// `joined`, `resumed`, `full_state`
    Session,
    /// `players_update`, `score_broadcast`, `player_finished`
    Roster,
    /// `start`
    Start,
    /// `host_update`
    Host,
    /// `end_session`, `error`, `info`
    Notice,
}

impl Topic {
    const ALL: [Topic; 5] = [
        Topic::Session,
        Topic::Roster,
        Topic::Start,
        Topic::Host,
        Topic::Notice,
    ];

    pub fn of(envelope: &ServerEnvelope) -> Topic {
        match envelope {
            ServerEnvelope::Joined(_) | ServerEnvelope::Resumed(_) | ServerEnvelope::FullState(_) => {
                Topic::Session
            }
            ServerEnvelope::PlayersUpdate(_)
            | ServerEnvelope::ScoreBroadcast(_)
            | ServerEnvelope::PlayerFinished(_) => Topic::Roster,
            ServerEnvelope::Start(_) => Topic::Start,
            ServerEnvelope::HostUpdate(_) => Topic::Host,
            ServerEnvelope::EndSession(_) | ServerEnvelope::Error(_) | ServerEnvelope::Info(_) => {
                Topic::Notice
            }
        }
    }

    fn index(self) -> usize {
        match self {
            Topic::Session => 0,
            Topic::Roster => 1,
            Topic::Start => 2,
            Topic::Host => 3,
            Topic::Notice => 4,
        }
    }
}

#[derive(Debug)]
struct Stamped {
    seq: u64,
    envelope: ServerEnvelope,
}

#[derive(Debug, Default)]
pub(crate) struct Inbox {
    queues: [VecDeque<Stamped>; 5],
    next_seq: u64,
}

impl Inbox {
    pub(crate) fn push(&mut self, envelope: ServerEnvelope) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queues[Topic::of(&envelope).index()].push_back(Stamped { seq, envelope });
    }

    /// Oldest queued envelope of `topic`.
    pub(crate) fn pop_topic(&mut self, topic: Topic) -> Option<ServerEnvelope> {
        self.queues[topic.index()].pop_front().map(|s| s.envelope)
    }

    /// Oldest queued envelope of any topic.
    pub(crate) fn pop_earliest(&mut self) -> Option<ServerEnvelope> {
        let topic = Topic::ALL
            .into_iter()
            .filter_map(|t| self.queues[t.index()].front().map(|s| (s.seq, t)))
            .min_by_key(|(seq, _)| *seq)
            .map(|(_, t)| t)?;
        self.pop_topic(topic)
    }

    pub(crate) fn len(&self) -> usize {
        self.queues.iter().map(VecDeque::len).sum()
    }

    pub(crate) fn clear(&mut self) {
        for q in &mut self.queues {
            q.clear();
        }
    }
}
