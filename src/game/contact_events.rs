//! Normalizes rapier collision events into per-substep contact
//! transitions for the level's contact resolver.

use crossbeam_channel::Receiver;
use rapier2d::prelude::{ColliderHandle, CollisionEvent};

/// Pair-wise contact lifecycle for one substep.
#[derive(Debug, Default, Clone)]
pub struct ContactTransitions {
    pub began: Vec<(ColliderHandle, ColliderHandle)>,
    pub ended: Vec<(ColliderHandle, ColliderHandle)>,
}

impl ContactTransitions {
    pub fn is_empty(&self) -> bool {
        self.began.is_empty() && self.ended.is_empty()
    }
}

/// Drain the collision-event channel filled by the last physics step into
/// begin/end lists. Pair order inside each tuple is whatever rapier
/// reported; the resolver orients pairs by tag.
pub fn collect_transitions(events: &Receiver<CollisionEvent>) -> ContactTransitions {
    let mut transitions = ContactTransitions::default();
    for event in events.try_iter() {
        match event {
            CollisionEvent::Started(a, b, _) => transitions.began.push((a, b)),
            CollisionEvent::Stopped(a, b, _) => transitions.ended.push((a, b)),
        }
    }
    transitions
}

#[cfg(test)]
mod tests {
    use super::*;
    use rapier2d::prelude::CollisionEventFlags;

    #[test]
    fn test_collect_transitions_splits_started_and_stopped() {
        let mut colliders = rapier2d::prelude::ColliderSet::new();
        let a = colliders.insert(rapier2d::prelude::ColliderBuilder::ball(0.5).build());
        let b = colliders.insert(rapier2d::prelude::ColliderBuilder::ball(0.5).build());
        let c = colliders.insert(rapier2d::prelude::ColliderBuilder::ball(0.5).build());

        let (send, recv) = crossbeam_channel::unbounded();
        send.send(CollisionEvent::Started(a, b, CollisionEventFlags::empty()))
            .unwrap();
        send.send(CollisionEvent::Stopped(a, c, CollisionEventFlags::empty()))
            .unwrap();

        let transitions = collect_transitions(&recv);
        assert_eq!(transitions.began, vec![(a, b)]);
        assert_eq!(transitions.ended, vec![(a, c)]);
        assert!(!transitions.is_empty());

        // Channel is drained; a second collect sees nothing.
        assert!(collect_transitions(&recv).is_empty());
    }
}
