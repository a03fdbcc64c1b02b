//! Nested-table visibility proxies and per-recipient culling.
//!
//! A gated nested table runs its proxy once per encode. The proxy decides
//! whether the subtree is sent at all and narrows the set of recipients that
//! may see it. Recipient sets combine along the proxy path: a property is
//! visible to a client only if every gating table above it admits the client.

use schema::{FlatTable, ObjectId, Recipients, SendNode, NO_PROXY};

/// Proxy outcomes of one object for one encode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyResults {
    node_sent: Vec<bool>,
    recipients: Vec<Recipients>,
}

impl ProxyResults {
    /// Runs every proxy of `flat` against `object`.
    ///
    /// Proxies below an unsent table are not run.
    pub fn evaluate<T>(flat: &FlatTable<T>, object: &T, object_id: ObjectId) -> Self {
        let mut results = Self {
            node_sent: vec![false; flat.node_count()],
            recipients: vec![Recipients::none(); flat.data_table_proxy_count()],
        };
        results.visit(flat, flat.root_node(), object, object_id, true);
        results
    }

    /// Results in which every table is sent to everyone.
    pub fn all_sent<T>(flat: &FlatTable<T>) -> Self {
        Self {
            node_sent: vec![true; flat.node_count()],
            recipients: vec![Recipients::all(); flat.data_table_proxy_count()],
        }
    }

    fn visit<T>(
        &mut self,
        flat: &FlatTable<T>,
        node: &SendNode,
        object: &T,
        object_id: ObjectId,
        parent_sent: bool,
    ) {
        let mut sent = parent_sent;
        let proxy = node.data_table_proxy();
        if proxy != NO_PROXY {
            let mut recipients = Recipients::all();
            if sent {
                let proxy_fn = node
                    .datatable_prop()
                    .and_then(|index| flat.datatable_props().get(index))
                    .and_then(|prop| prop.table_proxy());
                if let Some(proxy_fn) = proxy_fn {
                    sent = proxy_fn(object, object_id, &mut recipients);
                }
            }
            if let Some(slot) = self.recipients.get_mut(proxy as usize) {
                *slot = if sent { recipients } else { Recipients::none() };
            }
        }
        if let Some(slot) = self.node_sent.get_mut(node.recursive_proxy() as usize) {
            *slot = sent;
        }
        for child in node.children() {
            self.visit(flat, child, object, object_id, sent);
        }
    }

    /// Returns true if the node with recursive index `node` is sent.
    pub fn is_node_sent(&self, node: u16) -> bool {
        self.node_sent.get(node as usize).copied().unwrap_or(false)
    }

    /// Returns true if the flat property at `index` is sent.
    pub fn is_prop_sent<T>(&self, flat: &FlatTable<T>, index: usize) -> bool {
        flat.prop_node(index).is_some_and(|node| self.is_node_sent(node))
    }

    /// Recipient sets indexed by data-table proxy slot.
    pub fn recipients(&self) -> &[Recipients] {
        &self.recipients
    }

    pub fn into_recipients(self) -> Vec<Recipients> {
        self.recipients
    }
}

/// Returns true if every gating table on the path to `proxy` admits `client`.
pub fn is_visible_to<T>(flat: &FlatTable<T>, proxy: u16, client: usize, recipients: &[Recipients]) -> bool {
    proxy == NO_PROXY
        || flat.proxy_path(proxy).iter().all(|entry| {
            recipients
                .get(entry.proxy as usize)
                .is_some_and(|set| set.contains(client))
        })
}

/// Filters `changed` down to the properties `client` may see, and adds every
/// property of a subtree that became visible to `client` since `old`.
///
/// `changed` must be sorted; the result is sorted and free of duplicates.
pub fn cull_props_for_recipient<T>(
    flat: &FlatTable<T>,
    client: usize,
    changed: &[usize],
    old: Option<&[Recipients]>,
    new: &[Recipients],
) -> Vec<usize> {
    let mut culled: Vec<usize> = changed
        .iter()
        .copied()
        .filter(|&index| is_visible_to(flat, flat.prop_proxy(index), client, new))
        .collect();

    if let Some(old) = old {
        let before = culled.len();
        collect_newly_visible(flat, flat.root_node(), client, old, new, &mut culled);
        if culled.len() != before {
            culled.sort_unstable();
            culled.dedup();
        }
    }
    culled
}

fn collect_newly_visible<T>(
    flat: &FlatTable<T>,
    node: &SendNode,
    client: usize,
    old: &[Recipients],
    new: &[Recipients],
    out: &mut Vec<usize>,
) {
    let proxy = node.data_table_proxy();
    if proxy != NO_PROXY {
        if !is_visible_to(flat, proxy, client, new) {
            return;
        }
        if !is_visible_to(flat, proxy, client, old) {
            let start = node.first_prop();
            out.extend(
                (start..start + node.recursive_props())
                    .filter(|&index| is_visible_to(flat, flat.prop_proxy(index), client, new)),
            );
            return;
        }
    }
    for child in node.children() {
        collect_newly_visible(flat, child, client, old, new, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schema::{PropFlags, SendTable};
    use std::sync::Arc;

    struct Soldier {
        owner: usize,
        alive: bool,
    }

    fn flat() -> FlatTable<Soldier> {
        let local: Arc<SendTable<Soldier>> = SendTable::builder("DT_LocalData")
            .int("ammo", 8, PropFlags::UNSIGNED, |_| 5)
            .build()
            .unwrap();
        let root = SendTable::builder("DT_Soldier")
            .int("health", 8, PropFlags::UNSIGNED, |_| 100)
            .gated_table("local", local, |s: &Soldier, _, recipients: &mut Recipients| {
                recipients.only(s.owner);
                s.alive
            })
            .build()
            .unwrap();
        FlatTable::build(&root).unwrap()
    }

    #[test]
    fn proxy_narrows_recipients() {
        let flat = flat();
        let results = ProxyResults::evaluate(&flat, &Soldier { owner: 2, alive: true }, 1);
        assert!(results.is_prop_sent(&flat, 0));
        assert!(results.is_prop_sent(&flat, 1));
        assert!(results.recipients()[0].contains(2));
        assert!(!results.recipients()[0].contains(3));
    }

    #[test]
    fn unsent_subtree_has_no_recipients() {
        let flat = flat();
        let results = ProxyResults::evaluate(&flat, &Soldier { owner: 2, alive: false }, 1);
        assert!(results.is_prop_sent(&flat, 0));
        assert!(!results.is_prop_sent(&flat, 1));
        assert!(results.recipients()[0].is_empty());
    }

    #[test]
    fn cull_hides_gated_props() {
        let flat = flat();
        let results = ProxyResults::evaluate(&flat, &Soldier { owner: 2, alive: true }, 1);
        let changed = [0, 1];
        assert_eq!(
            cull_props_for_recipient(&flat, 2, &changed, None, results.recipients()),
            vec![0, 1]
        );
        assert_eq!(
            cull_props_for_recipient(&flat, 3, &changed, None, results.recipients()),
            vec![0]
        );
    }

    #[test]
    fn cull_adds_newly_visible_subtree() {
        let flat = flat();
        let old = ProxyResults::evaluate(&flat, &Soldier { owner: 4, alive: true }, 1);
        let new = ProxyResults::evaluate(&flat, &Soldier { owner: 2, alive: true }, 1);
        // Nothing changed, but client 2 just gained sight of the local data.
        let culled = cull_props_for_recipient(&flat, 2, &[], Some(old.recipients()), new.recipients());
        assert_eq!(culled, vec![1]);
        let culled = cull_props_for_recipient(&flat, 4, &[], Some(old.recipients()), new.recipients());
        assert!(culled.is_empty());
    }

    #[test]
    fn all_sent_admits_everyone() {
        let flat = flat();
        let results = ProxyResults::all_sent(&flat);
        assert!(results.is_node_sent(0) && results.is_node_sent(1));
        assert!(is_visible_to(&flat, 0, 200, results.recipients()));
    }
}
