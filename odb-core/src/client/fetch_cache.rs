//! Client-side fetch cache: collapses repeated register info/value queries
//! into the minimum number of batched server calls, indexed by both id and
//! name.

use std::collections::HashMap;

use crate::types::{RegId, RegInfos};
use crate::wire::{Request, Response, Sizes};
use crate::{Error, Result};

use super::backend::Backend;

/// Sequence of cached `RegInfos` plus two side maps indexing into it.
/// Insert-only for infos; value bytes are cleared on every resume.
#[derive(Default)]
pub struct FetchCache {
    arr: Vec<RegInfos>,
    by_id: HashMap<RegId, usize>,
    by_name: HashMap<String, usize>,
}

impl FetchCache {
    pub fn new() -> Self {
        FetchCache::default()
    }

    /// Clears every cached value (infos survive). Called on `resume`.
    pub fn discard_values(&mut self) {
        for info in &mut self.arr {
            info.val = None;
        }
    }

    fn insert(&mut self, mut infos: RegInfos) {
        infos.val = None;
        let idx = self.arr.len();
        self.by_id.insert(infos.id, idx);
        self.by_name.insert(infos.name.clone(), idx);
        self.arr.push(infos);
    }

    /// Ensures every id in `ids` has cached infos, issuing one batched
    /// server call for whatever is missing.
    pub fn fetch_infos_by_id(&mut self, backend: &mut dyn Backend, ids: &[RegId]) -> Result<()> {
        let miss: Vec<RegId> = ids
            .iter()
            .copied()
            .filter(|id| !self.by_id.contains_key(id))
            .collect();
        if miss.is_empty() {
            return Ok(());
        }
        let resp = backend.call(Request::GetRegsInfos { ids: miss })?;
        match resp {
            Response::GetRegsInfos { infos } => {
                for info in infos {
                    self.insert(info);
                }
                Ok(())
            }
            Response::Err { message } => Err(Error::Remote(message)),
            _ => Err(Error::Codec("unexpected response to get_regs_infos".into())),
        }
    }

    /// Resolves any uncached names to ids with one batched call, then feeds
    /// those ids through [`Self::fetch_infos_by_id`].
    pub fn fetch_infos_by_name(&mut self, backend: &mut dyn Backend, names: &[String]) -> Result<()> {
        let miss: Vec<String> = names
            .iter()
            .filter(|n| !self.by_name.contains_key(n.as_str()))
            .cloned()
            .collect();
        if miss.is_empty() {
            return Ok(());
        }
        let resp = backend.call(Request::FindRegsIds { names: miss })?;
        let ids = match resp {
            Response::FindRegsIds { ids } => ids,
            Response::Err { message } => return Err(Error::Remote(message)),
            _ => return Err(Error::Codec("unexpected response to find_regs_ids".into())),
        };
        self.fetch_infos_by_id(backend, &ids)
    }

    /// Ensures every id has both cached infos and a cached value, issuing at
    /// most one batched info call and one batched value call.
    pub fn fetch_vals_by_id(&mut self, backend: &mut dyn Backend, ids: &[RegId]) -> Result<()> {
        self.fetch_infos_by_id(backend, ids)?;

        let mut miss_ids = Vec::new();
        let mut miss_sizes = Vec::new();
        for &id in ids {
            let idx = self.by_id[&id];
            if self.arr[idx].val.is_none() {
                miss_ids.push(id);
                miss_sizes.push(self.arr[idx].size);
            }
        }
        if miss_ids.is_empty() {
            return Ok(());
        }

        let sizes = Sizes::from_caller(&uniform_or_variable(&miss_sizes));
        let resp = backend.call(Request::GetRegs {
            ids: miss_ids.clone(),
            sizes,
        })?;
        let values = match resp {
            Response::GetRegs { values } => values,
            Response::Err { message } => return Err(Error::Remote(message)),
            _ => return Err(Error::Codec("unexpected response to get_regs".into())),
        };
        for (id, val) in miss_ids.into_iter().zip(values) {
            let idx = self.by_id[&id];
            self.arr[idx].val = Some(val);
        }
        Ok(())
    }

    pub fn get_infos(&self, id: RegId) -> &RegInfos {
        &self.arr[self.by_id[&id]]
    }

    pub fn get_val(&self, id: RegId) -> &[u8] {
        self.arr[self.by_id[&id]]
            .val
            .as_deref()
            .expect("value must be fetched before read")
    }

    pub fn id_of_name(&self, name: &str) -> RegId {
        self.arr[self.by_name[name]].id
    }

    pub fn set_val(&mut self, id: RegId, val: Vec<u8>) {
        let idx = self.by_id[&id];
        self.arr[idx].val = Some(val);
    }
}

/// Packs per-register sizes into the caller convention (`[0]` when uniform,
/// otherwise the full array with the real second element).
fn uniform_or_variable(sizes: &[u64]) -> Vec<u64> {
    if sizes.iter().all(|&s| s == sizes[0]) {
        vec![sizes[0]]
    } else {
        sizes.to_vec()
    }
}
