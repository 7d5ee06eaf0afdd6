/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Maps a document's own ids for GL objects (`ClientId`, never a real GL
//! name) to the real names allocated in the host's GL context (spec §4.7:
//! "The scheduler owns one GLObjectManager...").

use std::collections::HashMap;

use conclave_messages::{ClientId, GlObjectKind};

#[derive(Default)]
pub struct GlObjectManager {
    names: HashMap<(GlObjectKind, ClientId), u32>,
}

impl GlObjectManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, kind: GlObjectKind, client_id: ClientId, real_name: u32) {
        self.names.insert((kind, client_id), real_name);
    }

    pub fn lookup(&self, kind: GlObjectKind, client_id: ClientId) -> Option<u32> {
        self.names.get(&(kind, client_id)).copied()
    }

    /// Removes and returns the real name backing `client_id`, if any.
    /// Deleting the currently-used program's client id is the caller's cue
    /// to reset that binding slot to `0` (spec §4.7).
    pub fn remove(&mut self, kind: GlObjectKind, client_id: ClientId) -> Option<u32> {
        self.names.remove(&(kind, client_id))
    }

    pub fn contains(&self, kind: GlObjectKind, client_id: ClientId) -> bool {
        self.names.contains_key(&(kind, client_id))
    }

    /// Drops every mapping for one document kind, used when a document's
    /// `ContentRuntime` is torn down so orphaned GL names don't outlive it.
    pub fn retain_kind(&mut self, keep: impl Fn(GlObjectKind, ClientId) -> bool) {
        self.names.retain(|&(kind, id), _| keep(kind, id));
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn distinct_client_ids_never_alias_to_the_same_entry() {
        let mut mgr = GlObjectManager::new();
        mgr.insert(GlObjectKind::Shader, ClientId(1), 100);
        mgr.insert(GlObjectKind::Shader, ClientId(2), 101);
        assert_eq!(mgr.lookup(GlObjectKind::Shader, ClientId(1)), Some(100));
        assert_eq!(mgr.lookup(GlObjectKind::Shader, ClientId(2)), Some(101));
    }

    #[test]
    fn removing_an_unknown_id_is_a_no_op() {
        let mut mgr = GlObjectManager::new();
        assert_eq!(mgr.remove(GlObjectKind::Buffer, ClientId(9)), None);
    }
}
