//! Packed entity states and per-recipient deltas between them.
//!
//! The server packs every networked object once per snapshot. A packed state
//! keeps the full encoding, the recipients its proxies allowed, and the list
//! of ticks at which each property last changed. Consecutive packs of one
//! object hand the change-frame list forward, so a delta against any older
//! snapshot is a single scan of that list.

use schema::{FlatTable, ObjectId, Recipients};

use crate::change_frames::ChangeFrameList;
use crate::delta::{calc_delta, prop_indices, write_prop_list};
use crate::encode::{encode_props, EncodeMode};
use crate::error::CodecResult;
use crate::proxy::{cull_props_for_recipient, ProxyResults};
use crate::types::{EncodedProps, SnapshotTick};

/// One object's encoded state at one snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct PackedEntity {
    object_id: ObjectId,
    tick: SnapshotTick,
    props: EncodedProps,
    change_frames: Option<ChangeFrameList>,
    recipients: Vec<Recipients>,
}

impl PackedEntity {
    pub const fn object_id(&self) -> ObjectId {
        self.object_id
    }

    pub const fn tick(&self) -> SnapshotTick {
        self.tick
    }

    pub fn props(&self) -> &EncodedProps {
        &self.props
    }

    pub fn recipients(&self) -> &[Recipients] {
        &self.recipients
    }

    /// Change frames, unless a newer pack has already taken them.
    pub fn change_frames(&self) -> Option<&ChangeFrameList> {
        self.change_frames.as_ref()
    }

    /// Moves the change frames out, leaving this state without them.
    pub fn take_change_frames(&mut self) -> Option<ChangeFrameList> {
        self.change_frames.take()
    }

    /// Independent copy of the change frames for a diverging history.
    pub fn snapshot_change_frames(&self) -> Option<ChangeFrameList> {
        self.change_frames.clone()
    }

    /// Indices changed after `tick`, if the change frames are still here.
    pub fn props_changed_after(&self, tick: SnapshotTick) -> Option<Vec<usize>> {
        self.change_frames
            .as_ref()
            .map(|frames| frames.props_changed_after(tick))
    }
}

/// Result of [`pack_entity`].
#[derive(Debug, Clone, PartialEq)]
pub enum PackOutcome {
    /// Nothing changed; the previous packed state still describes the object.
    Unchanged,
    Packed(PackedEntity),
}

/// Encodes `object` at `tick` and diffs it against `previous`.
///
/// A new state takes the change frames of `previous` and stamps the changed
/// properties with `tick`. Without a previous state, or when the previous
/// frames were already taken or have a different length, every property
/// counts as changed at `tick`.
pub fn pack_entity<T>(
    flat: &FlatTable<T>,
    object: &T,
    object_id: ObjectId,
    tick: SnapshotTick,
    previous: Option<&mut PackedEntity>,
) -> CodecResult<PackOutcome> {
    let proxies = ProxyResults::evaluate(flat, object, object_id);
    let props = encode_props(flat, object, object_id, &proxies, EncodeMode::Full)?;
    let recipients = proxies.into_recipients();

    let change_frames = match previous {
        Some(previous) => {
            let changed = calc_delta(flat, &previous.props, &props)?;
            if changed.is_empty() && previous.recipients == recipients {
                return Ok(PackOutcome::Unchanged);
            }
            match previous.take_change_frames() {
                Some(mut frames) if frames.len() == flat.len() => {
                    frames.set_changed_at(&changed, tick);
                    frames
                }
                _ => ChangeFrameList::new(flat.len(), tick),
            }
        }
        None => ChangeFrameList::new(flat.len(), tick),
    };

    Ok(PackOutcome::Packed(PackedEntity {
        object_id,
        tick,
        props,
        change_frames: Some(change_frames),
        recipients,
    }))
}

/// Builds the delta `client` needs to move from `from` to `to`.
///
/// Without `from` the client gets every property it may see.
pub fn write_delta_for_recipient<T>(
    flat: &FlatTable<T>,
    from: Option<&PackedEntity>,
    to: &PackedEntity,
    client: usize,
) -> CodecResult<EncodedProps> {
    let changed = match from {
        None => prop_indices(flat, &to.props)?,
        Some(from) => match to.props_changed_after(from.tick) {
            Some(changed) => changed,
            None => calc_delta(flat, &from.props, &to.props)?,
        },
    };
    let culled = cull_props_for_recipient(
        flat,
        client,
        &changed,
        from.map(|from| from.recipients.as_slice()),
        &to.recipients,
    );
    write_prop_list(flat, &to.props, &culled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use schema::{PropFlags, SendTable};
    use std::sync::Arc;

    struct Soldier {
        owner: usize,
        health: i32,
        ammo: i32,
    }

    fn flat() -> FlatTable<Soldier> {
        let local: Arc<SendTable<Soldier>> = SendTable::builder("DT_LocalData")
            .int("ammo", 8, PropFlags::UNSIGNED, |s: &Soldier| s.ammo)
            .build()
            .unwrap();
        let root = SendTable::builder("DT_Soldier")
            .int("health", 8, PropFlags::UNSIGNED, |s: &Soldier| s.health)
            .gated_table("local", local, |s: &Soldier, _, recipients: &mut Recipients| {
                recipients.only(s.owner);
                true
            })
            .build()
            .unwrap();
        FlatTable::build(&root).unwrap()
    }

    fn packed(outcome: PackOutcome) -> PackedEntity {
        match outcome {
            PackOutcome::Packed(entity) => entity,
            PackOutcome::Unchanged => panic!("expected a new packed state"),
        }
    }

    fn soldier(owner: usize, health: i32, ammo: i32) -> Soldier {
        Soldier { owner, health, ammo }
    }

    #[test]
    fn first_pack_marks_everything() {
        let flat = flat();
        let first = packed(pack_entity(&flat, &soldier(1, 100, 30), 7, SnapshotTick::new(10), None).unwrap());
        assert_eq!(first.object_id(), 7);
        assert_eq!(first.props_changed_after(SnapshotTick::new(9)), Some(vec![0, 1]));

        let owner_view = write_delta_for_recipient(&flat, None, &first, 1).unwrap();
        assert_eq!(prop_indices(&flat, &owner_view).unwrap(), vec![0, 1]);
        let other_view = write_delta_for_recipient(&flat, None, &first, 2).unwrap();
        assert_eq!(prop_indices(&flat, &other_view).unwrap(), vec![0]);
    }

    #[test]
    fn unchanged_object() {
        let flat = flat();
        let mut first = packed(pack_entity(&flat, &soldier(1, 100, 30), 7, SnapshotTick::new(10), None).unwrap());
        let outcome = pack_entity(&flat, &soldier(1, 100, 30), 7, SnapshotTick::new(11), Some(&mut first)).unwrap();
        assert_eq!(outcome, PackOutcome::Unchanged);
        assert!(first.change_frames().is_some());
    }

    #[test]
    fn change_frames_move_forward() {
        let flat = flat();
        let mut first = packed(pack_entity(&flat, &soldier(1, 100, 30), 7, SnapshotTick::new(10), None).unwrap());
        let second = packed(
            pack_entity(&flat, &soldier(1, 90, 30), 7, SnapshotTick::new(20), Some(&mut first)).unwrap(),
        );
        assert!(first.change_frames().is_none());
        assert_eq!(second.props_changed_after(SnapshotTick::new(10)), Some(vec![0]));

        let delta = write_delta_for_recipient(&flat, Some(&first), &second, 1).unwrap();
        assert_eq!(prop_indices(&flat, &delta).unwrap(), vec![0]);
    }

    #[test]
    fn delta_without_frames_falls_back_to_diff() {
        let flat = flat();
        let mut first = packed(pack_entity(&flat, &soldier(1, 100, 30), 7, SnapshotTick::new(10), None).unwrap());
        let mut second = packed(
            pack_entity(&flat, &soldier(1, 100, 25), 7, SnapshotTick::new(20), Some(&mut first)).unwrap(),
        );
        second.take_change_frames();
        let delta = write_delta_for_recipient(&flat, Some(&first), &second, 1).unwrap();
        assert_eq!(prop_indices(&flat, &delta).unwrap(), vec![1]);
    }

    #[test]
    fn new_recipient_receives_whole_subtree() {
        let flat = flat();
        let mut first = packed(pack_entity(&flat, &soldier(1, 100, 30), 7, SnapshotTick::new(10), None).unwrap());
        let second = packed(
            pack_entity(&flat, &soldier(2, 100, 30), 7, SnapshotTick::new(20), Some(&mut first)).unwrap(),
        );
        assert_eq!(second.props_changed_after(SnapshotTick::new(10)), Some(vec![]));

        let new_owner = write_delta_for_recipient(&flat, Some(&first), &second, 2).unwrap();
        assert_eq!(prop_indices(&flat, &new_owner).unwrap(), vec![1]);
        let old_owner = write_delta_for_recipient(&flat, Some(&first), &second, 1).unwrap();
        assert!(prop_indices(&flat, &old_owner).unwrap().is_empty());
    }

    #[test]
    fn diverging_history_keeps_copy() {
        let flat = flat();
        let mut first = packed(pack_entity(&flat, &soldier(1, 100, 30), 7, SnapshotTick::new(10), None).unwrap());
        let copy = first.snapshot_change_frames().unwrap();
        packed(pack_entity(&flat, &soldier(1, 50, 30), 7, SnapshotTick::new(20), Some(&mut first)).unwrap());
        assert!(copy.props_changed_after(SnapshotTick::new(10)).is_empty());
    }
}
