//! The client-side state machine: gates every operation on connection state,
//! and is the only thing callers (the CLI evaluator, an embedding
//! application) ever see. Delegates register lookups through the fetch
//! cache; everything else is a direct, uncached call through the backend.

use log::trace;

use crate::types::{Addr, RegId, RegInfos, ResumeType, Size, StoppedState, StoppedUpdate, SymId, SymbolInfos, VmInfos};
use crate::wire::{Request, Response, Sizes};
use crate::{Error, Result};

use super::backend::Backend;
use super::fetch_cache::FetchCache;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    NotConnected,
    Disconnected,
    VmStopped,
    VmRunning,
}

pub struct ClientFacade<B> {
    backend: B,
    state: ClientState,
    cache: FetchCache,
    vm_infos: Option<VmInfos>,
}

impl<B: Backend> ClientFacade<B> {
    pub fn new(backend: B) -> Self {
        ClientFacade {
            backend,
            state: ClientState::NotConnected,
            cache: FetchCache::new(),
            vm_infos: None,
        }
    }

    pub fn vm_infos(&self) -> Option<&VmInfos> {
        self.vm_infos.as_ref()
    }

    pub fn state(&self) -> ClientState {
        self.state
    }

    fn require(&self, allowed: &[ClientState]) -> Result<()> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(Error::precondition(format!(
                "operation not valid in state {:?} (need one of {allowed:?})",
                self.state
            )))
        }
    }

    fn call(&mut self, req: Request) -> Result<Response> {
        let resp = self.backend.call(req)?;
        if let Response::Err { message } = resp {
            return Err(Error::Remote(message));
        }
        Ok(resp)
    }

    fn state_from_update(update: &StoppedUpdate) -> ClientState {
        if update.stopped {
            ClientState::VmStopped
        } else {
            ClientState::VmRunning
        }
    }

    pub fn connect(&mut self) -> Result<VmInfos> {
        self.require(&[ClientState::NotConnected])?;
        match self.call(Request::Connect)? {
            Response::Connect { vm_infos, update } => {
                self.state = Self::state_from_update(&update);
                trace!("connected, initial state {:?}", self.state);
                self.vm_infos = Some(vm_infos.clone());
                Ok(vm_infos)
            }
            _ => Err(Error::Codec("unexpected response to connect".into())),
        }
    }

    pub fn stop(&mut self) -> Result<()> {
        self.require(&[ClientState::VmRunning])?;
        self.call(Request::Stop)?;
        Ok(())
    }

    /// Polls server state; transitions running→stopped (clearing the value
    /// cache) when the server reports the VM has paused.
    pub fn check_stopped(&mut self) -> Result<StoppedUpdate> {
        self.require(&[ClientState::VmRunning, ClientState::VmStopped])?;
        match self.call(Request::CheckStopped)? {
            Response::CheckStopped { update } => {
                let was_running = self.state == ClientState::VmRunning;
                self.state = Self::state_from_update(&update);
                if was_running && update.stopped {
                    self.cache.discard_values();
                }
                Ok(update)
            }
            _ => Err(Error::Codec("unexpected response to check_stopped".into())),
        }
    }

    pub fn resume(&mut self, ty: ResumeType) -> Result<()> {
        self.require(&[ClientState::VmStopped])?;
        self.call(Request::Resume { ty })?;
        self.cache.discard_values();
        self.state = ClientState::VmRunning;
        Ok(())
    }

    pub fn get_regs(&mut self, ids: &[RegId], sizes: &Sizes) -> Result<Vec<Vec<u8>>> {
        self.require(&[ClientState::VmStopped])?;
        self.cache.fetch_vals_by_id(&mut self.backend, ids)?;
        let full_sizes = sizes.expand(ids.len());
        Ok(ids
            .iter()
            .zip(full_sizes.iter())
            .map(|(&id, &size)| {
                let v = self.cache.get_val(id);
                v[..(size as usize).min(v.len())].to_vec()
            })
            .collect())
    }

    pub fn set_regs(&mut self, ids: &[RegId], sizes: &Sizes, values: Vec<Vec<u8>>) -> Result<()> {
        self.require(&[ClientState::VmStopped])?;
        self.cache.fetch_infos_by_id(&mut self.backend, ids)?;
        self.call(Request::SetRegs {
            ids: ids.to_vec(),
            sizes: sizes.clone(),
            values: values.clone(),
        })?;
        for (&id, val) in ids.iter().zip(values.into_iter()) {
            self.cache.set_val(id, val);
        }
        Ok(())
    }

    pub fn get_regs_infos(&mut self, ids: &[RegId]) -> Result<Vec<RegInfos>> {
        self.require(&[ClientState::VmStopped])?;
        self.cache.fetch_infos_by_id(&mut self.backend, ids)?;
        Ok(ids.iter().map(|&id| self.cache.get_infos(id).clone()).collect())
    }

    pub fn find_regs_ids(&mut self, names: &[String]) -> Result<Vec<RegId>> {
        self.require(&[ClientState::VmStopped])?;
        self.cache.fetch_infos_by_name(&mut self.backend, names)?;
        Ok(names.iter().map(|n| self.cache.id_of_name(n)).collect())
    }

    pub fn read_mem(&mut self, addrs: &[Addr], sizes: &Sizes) -> Result<Vec<Vec<u8>>> {
        self.require(&[ClientState::VmStopped])?;
        match self.call(Request::ReadMem {
            addrs: addrs.to_vec(),
            sizes: sizes.clone(),
        })? {
            Response::ReadMem { values } => Ok(values),
            _ => Err(Error::Codec("unexpected response to read_mem".into())),
        }
    }

    pub fn write_mem(&mut self, addrs: &[Addr], sizes: &Sizes, values: Vec<Vec<u8>>) -> Result<()> {
        self.require(&[ClientState::VmStopped])?;
        self.call(Request::WriteMem {
            addrs: addrs.to_vec(),
            sizes: sizes.clone(),
            values,
        })?;
        Ok(())
    }

    pub fn get_syms_by_ids(&mut self, ids: &[SymId]) -> Result<Vec<SymbolInfos>> {
        self.require(&[ClientState::VmStopped])?;
        match self.call(Request::GetSymsByIds { ids: ids.to_vec() })? {
            Response::GetSymsByIds { infos } => Ok(infos),
            _ => Err(Error::Codec("unexpected response to get_syms_by_ids".into())),
        }
    }

    pub fn get_syms_by_addr(&mut self, addr: Addr, size: Size) -> Result<Vec<SymbolInfos>> {
        self.require(&[ClientState::VmStopped])?;
        match self.call(Request::GetSymsByAddr { addr, size })? {
            Response::GetSymsByAddr { infos } => Ok(infos),
            _ => Err(Error::Codec("unexpected response to get_syms_by_addr".into())),
        }
    }

    pub fn get_syms_by_names(&mut self, names: &[String]) -> Result<Vec<SymbolInfos>> {
        self.require(&[ClientState::VmStopped])?;
        match self.call(Request::GetSymsByNames {
            names: names.to_vec(),
        })? {
            Response::GetSymsByNames { infos } => Ok(infos),
            _ => Err(Error::Codec("unexpected response to get_syms_by_names".into())),
        }
    }

    pub fn get_code_text(&mut self, addr: Addr, nins: u64) -> Result<(Vec<String>, Vec<Size>)> {
        self.require(&[ClientState::VmStopped])?;
        match self.call(Request::GetCodeText { addr, nins })? {
            Response::GetCodeText { texts, sizes } => Ok((texts, sizes)),
            _ => Err(Error::Codec("unexpected response to get_code_text".into())),
        }
    }

    pub fn add_bkps(&mut self, addrs: &[Addr]) -> Result<()> {
        self.require(&[ClientState::VmStopped])?;
        self.call(Request::AddBkps {
            addrs: addrs.to_vec(),
        })?;
        Ok(())
    }

    pub fn del_bkps(&mut self, addrs: &[Addr]) -> Result<()> {
        self.require(&[ClientState::VmStopped])?;
        self.call(Request::DelBkps {
            addrs: addrs.to_vec(),
        })?;
        Ok(())
    }
}

impl<B> ClientFacade<B> {
    /// Reports a transport-level disconnect, independent of the backend.
    pub fn mark_disconnected(&mut self) {
        self.state = ClientState::Disconnected;
    }

    /// Rebuilds a façade around a fresh backend, carrying over state and
    /// cache from a previous one. Used where the backend only borrows for
    /// the duration of one call (the in-process backend borrows the
    /// debugger) and so cannot be stored long-term itself.
    pub fn from_parts(backend: B, state: ClientState, cache: FetchCache, vm_infos: Option<VmInfos>) -> Self {
        ClientFacade {
            backend,
            state,
            cache,
            vm_infos,
        }
    }

    pub fn into_parts(self) -> (ClientState, FetchCache, Option<VmInfos>) {
        (self.state, self.cache, self.vm_infos)
    }
}

pub(crate) fn stopped_state_label(s: StoppedState) -> &'static str {
    match s {
        StoppedState::Ready => "ready",
        StoppedState::Exit => "exit",
        StoppedState::Error => "error",
    }
}
